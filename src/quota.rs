use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Subscription tiers with their monthly scan allowances. The caps are a
/// product choice, not part of the scanning contract; the core only needs a
/// numeric limit and a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Starter,
    Pro,
    Business,
}

impl Plan {
    pub fn scan_limit(&self) -> u32 {
        match self {
            Plan::Free => 25,
            Plan::Starter => 500,
            Plan::Pro => 5_000,
            Plan::Business => 50_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Business => "business",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            "business" => Some(Plan::Business),
            _ => None,
        }
    }
}

/// Usage meter for one logical session, passed explicitly to call sites
/// rather than looked up through ambient state. Call sites increment it
/// exactly once per persisted scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub plan: Plan,
    pub scans_used: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            plan: Plan::Free,
            scans_used: 0,
        }
    }
}

impl Session {
    pub fn limit(&self) -> u32 {
        self.plan.scan_limit()
    }

    pub fn remaining(&self) -> u32 {
        self.limit().saturating_sub(self.scans_used)
    }

    pub fn exhausted(&self) -> bool {
        self.scans_used >= self.limit()
    }

    pub fn increment_usage(&mut self) {
        self.scans_used = self.scans_used.saturating_add(1);
    }
}

/// Fail-safe JSON persistence for the session, mirroring the history
/// store's recovery behavior: an unreadable file yields a fresh session.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Session {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Session::default(),
        };
        match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                log::warn!(
                    "session file at {} is unreadable, starting fresh: {e}",
                    self.path.display()
                );
                Session::default()
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create session directory: {}", parent.display())
                })?;
            }
        }
        let blob = serde_json::to_string_pretty(session).context("failed to serialize session")?;
        fs::write(&self.path, blob)
            .with_context(|| format!("failed to write session file: {}", self.path.display()))
    }
}
