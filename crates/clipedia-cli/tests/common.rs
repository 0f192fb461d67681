#![allow(dead_code)]
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _dir: TempDir,
    pub db: PathBuf,
    pub cfg: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        std::fs::create_dir_all(&cfg).expect("cfg dir");
        let db = dir.path().join("clipedia.db");
        Self { _dir: dir, db, cfg }
    }

    /// Binary with an isolated config dir and this env's database.
    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("clipedia").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg);
        cmd.env_remove("RUST_LOG");
        cmd.arg("--db").arg(&self.db);
        cmd
    }

    pub fn add(&self, text: &str) -> String {
        let out = self
            .bin()
            .args(["add", text])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let line = String::from_utf8(out).unwrap();
        line.trim().trim_start_matches("added ").to_string()
    }

    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let out = self
            .bin()
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).unwrap()
    }

    pub fn write_settings(&self, toml: &str) {
        let dir = self.cfg.join("clipedia");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("settings.toml"), toml).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
