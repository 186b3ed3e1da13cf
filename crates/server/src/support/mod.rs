#![forbid(unsafe_code)]

mod args;
mod envelope;
mod errors;
mod time;

pub(crate) use args::*;
pub(crate) use envelope::*;
pub(crate) use errors::*;
pub(crate) use self::time::*;
