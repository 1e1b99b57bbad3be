use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Banded risk classification of a scan. Ordered by ascending risk for
/// display purposes only; the score is the underlying measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Suspicious,
    Malicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "safe",
            Verdict::Suspicious => "suspicious",
            Verdict::Malicious => "malicious",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "safe" => Some(Verdict::Safe),
            "suspicious" => Some(Verdict::Suspicious),
            "malicious" => Some(Verdict::Malicious),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Url,
    Qr,
    Email,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Url => "url",
            ScanKind::Qr => "qr",
            ScanKind::Email => "email",
        }
    }
}

/// Registration data supplied by an external lookup, never computed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainAge {
    pub created: String,
    pub age_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslCertificate {
    pub valid_from: String,
    pub valid_to: String,
    pub valid: bool,
    pub issuer: String,
}

/// One completed scan. Created by the engine (or the remote client) at the
/// moment scoring completes and never mutated afterwards; the history store
/// only ever appends or clears whole records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub kind: ScanKind,
    /// The scanned URL exactly as the user entered it. Absent for email scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub verdict: Verdict,
    pub score: u8,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suspicious_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_age: Option<DomainAge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_certificate: Option<SslCertificate>,
    pub timestamp: DateTime<Utc>,
}

impl ScanRecord {
    pub fn url_scan(
        kind: ScanKind,
        target: String,
        verdict: Verdict,
        score: u8,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            target: Some(target),
            verdict,
            score,
            reasons,
            sender: None,
            subject: None,
            suspicious_links: Vec::new(),
            domain_age: None,
            ssl_certificate: None,
            timestamp: Utc::now(),
        }
    }

    pub fn email_scan(
        sender: Option<String>,
        subject: Option<String>,
        verdict: Verdict,
        score: u8,
        reasons: Vec<String>,
        suspicious_links: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: ScanKind::Email,
            target: None,
            verdict,
            score,
            reasons,
            sender,
            subject,
            suspicious_links,
            domain_age: None,
            ssl_certificate: None,
            timestamp: Utc::now(),
        }
    }

    /// Label shown in listings and the CSV target column.
    pub fn display_target(&self) -> &str {
        match self.kind {
            ScanKind::Email => "Email Scan",
            _ => self.target.as_deref().unwrap_or(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse("safe"), Some(Verdict::Safe));
        assert_eq!(Verdict::parse("Malicious"), Some(Verdict::Malicious));
        assert_eq!(Verdict::parse("phishing"), None);
    }

    #[test]
    fn test_verdict_display_order() {
        assert!(Verdict::Safe < Verdict::Suspicious);
        assert!(Verdict::Suspicious < Verdict::Malicious);
    }

    #[test]
    fn test_record_ids_unique() {
        let a = ScanRecord::url_scan(
            ScanKind::Url,
            "https://example.com".to_string(),
            Verdict::Safe,
            0,
            Vec::new(),
        );
        let b = ScanRecord::url_scan(
            ScanKind::Url,
            "https://example.com".to_string(),
            Verdict::Safe,
            0,
            Vec::new(),
        );
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_email_display_target() {
        let record = ScanRecord::email_scan(
            Some("a@b.com".to_string()),
            None,
            Verdict::Safe,
            0,
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(record.display_target(), "Email Scan");
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = ScanRecord::url_scan(
            ScanKind::Qr,
            "paypa1.net".to_string(),
            Verdict::Suspicious,
            45,
            vec!["Brand lookalike".to_string()],
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: ScanRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.kind, ScanKind::Qr);
        assert_eq!(back.score, 45);
        assert_eq!(back.verdict, Verdict::Suspicious);
        assert_eq!(back.timestamp, record.timestamp);
    }
}
