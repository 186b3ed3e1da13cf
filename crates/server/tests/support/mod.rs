#![forbid(unsafe_code)]
#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub(crate) struct Server {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    storage_dir: PathBuf,
    next_id: i64,
    _temp: Option<tempfile::TempDir>,
}

impl Server {
    pub(crate) fn start() -> Self {
        Self::start_with_args(&[])
    }

    pub(crate) fn start_with_args(extra_args: &[&str]) -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let storage_dir = temp.path().join("store");
        let mut server = Self::start_with_storage_dir(&storage_dir, extra_args);
        server._temp = Some(temp);
        server
    }

    /// The caller keeps ownership of `storage_dir`, so a second server can reopen it.
    pub(crate) fn start_with_storage_dir(storage_dir: &Path, extra_args: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_pm_server"))
            .arg("--storage-dir")
            .arg(storage_dir)
            .args(extra_args)
            .env_remove("PLANOMAP_CONFIG")
            .env_remove("PLANOMAP_STORAGE_DIR")
            .env("PLANOMAP_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn pm_server");

        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));

        Self {
            child,
            stdin: Some(stdin),
            stdout,
            storage_dir: storage_dir.to_path_buf(),
            next_id: 1,
            _temp: None,
        }
    }

    pub(crate) fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub(crate) fn send_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{line}").expect("write request");
        stdin.flush().expect("flush request");
    }

    pub(crate) fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response");
        assert!(!line.trim().is_empty(), "empty response line");
        serde_json::from_str(&line).expect("parse response json")
    }

    /// Sends `op` with a fresh request id and checks the id is echoed back.
    pub(crate) fn call(&mut self, op: &str, args: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send_line(&json!({ "id": id, "op": op, "args": args }).to_string());
        let resp = self.recv();
        assert_eq!(resp["id"], id, "response id mismatch: {resp}");
        resp
    }

    /// Like [`Server::call`] but asserts success and returns `result`.
    pub(crate) fn call_ok(&mut self, op: &str, args: Value) -> Value {
        let resp = self.call(op, args);
        assert_eq!(resp["success"], true, "{op} failed: {resp}");
        assert_eq!(resp["error"], Value::Null);
        resp["result"].clone()
    }

    /// Closes stdin and waits for a clean exit.
    pub(crate) fn shutdown(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("wait for pm_server")
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub(crate) fn assert_error(resp: &Value, code: &str, status: i64) {
    assert_eq!(resp["success"], false, "expected failure: {resp}");
    assert_eq!(resp["result"], Value::Null);
    assert_eq!(resp["error"]["code"], code, "{resp}");
    assert_eq!(resp["error"]["status"], status, "{resp}");
}
