// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a temp project with a memory-broker config and a
//! fluent wrapper around the `kr` binary.

use std::path::Path;
use std::process::Output;

pub use similar_asserts::assert_eq;
use tempfile::TempDir;

/// Five partitions, six records.
pub const ORDERS: &str = r#"{"topics": [
    {"name": "orders", "partitions": [
        [{"timestamp": 0, "key": "a", "value": {"id": 1, "kind": "new"}},
         {"timestamp": 1, "key": "b", "value": {"id": 2, "kind": "paid"}},
         {"timestamp": 3, "key": "a", "value": {"id": 3, "kind": "paid"}}],
        [{"timestamp": 1, "key": "c", "value": {"id": 4, "kind": "new"}},
         {"timestamp": 2, "key": "d", "value": {"id": 5, "kind": "shipped"}}],
        [{"timestamp": 0, "key": "e", "value": {"id": 6, "kind": "new"}}],
        [],
        []
    ]},
    {"name": "__consumer_offsets", "partitions": [[]]}
]}"#;

/// Temp directory holding `config.toml` and a topic fixture.
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// No config file at all.
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("temp dir") }
    }

    /// Local runner over the memory broker seeded with `fixture`.
    pub fn memory(fixture: &str) -> Self {
        let project = Self::empty();
        project.file("topics.json", fixture);
        project.file(
            "config.toml",
            "runner = \"local\"\n\n[local]\nbroker = \"memory\"\nfixture = \"topics.json\"\npool_size = 4\n",
        );
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, contents: &str) {
        std::fs::write(self.path().join(name), contents).expect("write project file");
    }

    pub fn kr(&self) -> Kr {
        let mut kr = cli();
        kr.cmd.env("KR_CONFIG", self.path().join("config.toml")).current_dir(self.path());
        kr
    }
}

/// `kr` with a scrubbed environment and no config file.
pub fn cli() -> Kr {
    let mut cmd = assert_cmd::Command::cargo_bin("kr").expect("kr binary (run `cargo build -p kr`)");
    for var in [
        "KR_CONFIG",
        "KR_RUNNER",
        "KR_BROKER",
        "KR_FIXTURE",
        "KR_BOOTSTRAP_SERVERS",
        "KR_TIMEOUT_MS",
        "KR_LAMBDA_FUNCTION",
        "KR_K8S_NAMESPACE",
        "KR_K8S_IMAGE",
        "KR_LOG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    let nowhere = std::env::temp_dir().join("kr-specs-no-config");
    cmd.env("NO_COLOR", "1").env("HOME", &nowhere).env("XDG_CONFIG_HOME", &nowhere);
    Kr { cmd }
}

pub struct Kr {
    cmd: assert_cmd::Command,
}

impl Kr {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn stdin(mut self, input: &str) -> Self {
        self.cmd.write_stdin(input.to_string());
        self
    }

    fn run(mut self) -> Run {
        Run { output: self.cmd.output().expect("run kr") }
    }

    pub fn passes(self) -> Run {
        let run = self.run();
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\nstdout:\n{}\nstderr:\n{}",
            run.output.status.code(),
            run.stdout(),
            run.stderr()
        );
        run
    }

    pub fn fails(self) -> Run {
        let run = self.run();
        assert!(!run.output.status.success(), "expected failure\nstdout:\n{}", run.stdout());
        run
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(needle), "stdout unexpectedly has {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }

    pub fn code_is(self, code: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(code), "stderr:\n{}", self.stderr());
        self
    }

    /// Each stdout line parsed as JSON.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("{e}: {line}")))
            .collect()
    }
}
