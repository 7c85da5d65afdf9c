// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for specs.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub use tempfile::TempDir;

/// Upper bound for anything a spec waits on.
pub const SPEC_WAIT_MAX_MS: u64 = 30_000;

/// Poll `check` until it holds or `max_ms` passes.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    check()
}

/// Path of a workspace binary.
///
/// `CARGO_BIN_EXE_<name>` wins when set; otherwise the binary sits next to
/// the spec runner's `deps/` directory, built on first use if missing.
pub fn bin(name: &str) -> PathBuf {
    if let Some(path) = std::env::var_os(format!("CARGO_BIN_EXE_{name}")) {
        return PathBuf::from(path);
    }
    let path = target_dir().join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
    if !path.exists() {
        build_binaries();
    }
    assert!(path.exists(), "binary not found: {}", path.display());
    path
}

/// `target/<profile>`, derived from the running spec executable.
fn target_dir() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let deps = exe.parent().unwrap();
    deps.parent().unwrap().to_path_buf()
}

fn build_binaries() {
    static BUILT: OnceLock<bool> = OnceLock::new();
    let ok = *BUILT.get_or_init(|| {
        let mut cmd = Command::new(env!("CARGO"));
        cmd.current_dir(env!("CARGO_MANIFEST_DIR")).args(["build", "-p", "ck", "-p", "ck-daemon", "--bins"]);
        if !cfg!(debug_assertions) {
            cmd.arg("--release");
        }
        cmd.status().is_ok_and(|s| s.success())
    });
    assert!(ok, "building ck and ckd failed");
}

/// A port nothing listens on right now.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap().local_addr().unwrap().port()
}

/// Temporary state and provider directories for one spec.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let project = Self { dir: TempDir::new().unwrap() };
        std::fs::create_dir_all(project.providers()).unwrap();
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn providers(&self) -> PathBuf {
        self.path().join("providers")
    }

    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn command(&self, name: &str, state: &str) -> Command {
        let mut cmd = Command::new(bin(name));
        cmd.current_dir(self.path())
            .env("CK_STATE_DIR", self.path().join(state))
            .env("CK_PROVIDERS", self.providers())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("CK_LOG");
        cmd
    }

    /// `ck` with the controller's own state directory.
    pub fn ck(&self) -> CliBuilder {
        CliBuilder { cmd: self.command("ck", "state") }
    }

    pub fn ckd(&self, port: u16) -> CliBuilder {
        let mut cmd = self.command("ckd", "agent-state");
        cmd.env("CK_AGENT_PORT", port.to_string());
        CliBuilder { cmd }
    }

    /// Start `ckd` in the background and wait for it to report READY.
    pub fn spawn_agent(&self, port: u16) -> Agent {
        let mut cmd = self.ckd(port).cmd;
        let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::null()).spawn().unwrap();
        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        assert!(line.starts_with("READY"), "agent did not start: {line:?}");
        Agent { child, _stdout: stdout }
    }
}

/// A running agent, killed on drop.
pub struct Agent {
    child: Child,
    _stdout: BufReader<ChildStdout>,
}

impl Agent {
    /// SIGKILL, as a reboot would.
    pub fn kill(mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn into_command(self) -> Command {
        self.cmd
    }

    pub fn passes(self) -> RunResult {
        let assert = assert_cmd::Command::from_std(self.cmd).assert().success();
        RunResult { output: assert.get_output().clone() }
    }

    pub fn fails(self) -> RunResult {
        let assert = assert_cmd::Command::from_std(self.cmd).assert().failure();
        RunResult { output: assert.get_output().clone() }
    }
}

pub struct RunResult {
    output: Output,
}

impl RunResult {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    fn describe(&self) -> String {
        format!("status: {:?}\nstdout:\n{}\nstderr:\n{}", self.output.status, self.stdout(), self.stderr())
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "stdout lacks {needle:?}:\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "stderr lacks {needle:?}:\n{}", self.describe());
        self
    }
}

pub fn cli() -> CliBuilder {
    let mut cmd = Command::new(bin("ck"));
    cmd.env("NO_COLOR", "1");
    CliBuilder { cmd }
}
