//! Shared helpers for bridge integration tests.

#![allow(dead_code)]

use glirc_lua_core::{BridgeConfig, Extension, Host, HostToken, Message, MessageCode};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Host that records diagnostics and outbound messages.
#[derive(Default)]
pub struct TestHost {
    reports: Mutex<Vec<(MessageCode, String)>>,
    sent: Mutex<Vec<Message>>,
    resolved: Mutex<Vec<String>>,
    base: Mutex<Option<PathBuf>>,
}

impl TestHost {
    /// Host resolving relative script paths against `base`.
    pub fn rooted_at(base: &Path) -> Arc<Self> {
        let host = Self::default();
        *host.base.lock().unwrap() = Some(base.to_path_buf());
        Arc::new(host)
    }

    pub fn reports(&self) -> Vec<(MessageCode, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn printed(&self) -> Vec<String> {
        self.by_code(MessageCode::Normal)
    }

    pub fn errors(&self) -> Vec<String> {
        self.by_code(MessageCode::Error)
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    fn by_code(&self, code: MessageCode) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter(|(c, _)| *c == code)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Host for TestHost {
    fn report(&self, code: MessageCode, message: &str) {
        self.reports.lock().unwrap().push((code, message.to_string()));
    }

    fn resolve_path(&self, raw: &str) -> String {
        self.resolved.lock().unwrap().push(raw.to_string());
        match self.base.lock().unwrap().as_ref() {
            Some(base) => base.join(raw).to_string_lossy().into_owned(),
            None => raw.to_string(),
        }
    }

    fn send_message(&self, message: &Message) -> Result<(), String> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A scratch directory holding extension scripts.
pub struct ScriptDir {
    pub dir: tempfile::TempDir,
    pub host: Arc<TestHost>,
}

impl ScriptDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let host = TestHost::rooted_at(dir.path());
        Self { dir, host }
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Path the host would pass for the loaded extension library.
    pub fn library_path(&self) -> String {
        self.dir
            .path()
            .join("libglirc-lua.so")
            .to_string_lossy()
            .into_owned()
    }

    pub fn extension(&self) -> Extension {
        let token: HostToken = self.host.clone();
        Extension::new(token, BridgeConfig::default())
    }

    /// Write `glirc.lua` and start it through the default-path rule.
    pub fn start_default(&self, body: &str) -> Extension {
        self.write("glirc.lua", body);
        let mut ext = self.extension();
        ext.start(&self.library_path(), &[]).unwrap();
        ext
    }
}
