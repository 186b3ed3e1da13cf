#![forbid(unsafe_code)]

use crate::{PlanoServer, bad_request, with_request_id};
use serde_json::Value;
use std::io::{BufRead, Write};

pub(crate) fn run_stdio(server: &mut PlanoServer) -> Result<usize, Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve_lines(server, stdin.lock(), stdout.lock())
}

/// Answers one response line per non-blank request line until EOF.
pub(crate) fn serve_lines<R: BufRead, W: Write>(
    server: &mut PlanoServer,
    reader: R,
    mut writer: W,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut served = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(server, &line);
        writeln!(writer, "{}", serde_json::to_string(&response)?)?;
        writer.flush()?;
        served += 1;
    }
    Ok(served)
}

fn handle_line(server: &mut PlanoServer, line: &str) -> Value {
    let request = match serde_json::from_str::<Value>(line) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "malformed request line");
            return with_request_id(bad_request(&format!("invalid JSON: {err}")), Value::Null);
        }
    };
    let Value::Object(mut request) = request else {
        tracing::warn!("request is not a JSON object");
        return with_request_id(bad_request("request must be a JSON object"), Value::Null);
    };

    let id = request.remove("id").unwrap_or(Value::Null);
    let Some(op) = request.get("op").and_then(|v| v.as_str()).map(str::to_string) else {
        return with_request_id(bad_request("op is required"), id);
    };
    let args = match request.remove("args") {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return with_request_id(bad_request("args must be an object"), id),
    };

    tracing::debug!(op = %op, request_id = %id, "request");
    with_request_id(server.dispatch(&op, &args), id)
}
