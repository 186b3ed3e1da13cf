#![forbid(unsafe_code)]

mod sql;
mod time;

pub(super) use sql::*;
pub(super) use time::*;
