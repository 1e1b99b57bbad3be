pub mod config;
pub mod domain_utils;
pub mod engine;
pub mod features;
pub mod history;
pub mod quota;
pub mod record;
pub mod remote;

pub use config::{HeuristicConfig, RuleWeights, VerdictThresholds};
pub use engine::ScanEngine;
pub use history::{export_csv, HistoryFilter, HistoryStore};
pub use quota::{Plan, Session, SessionStore};
pub use record::{DomainAge, ScanKind, ScanRecord, SslCertificate, Verdict};
pub use remote::RemoteScanner;
