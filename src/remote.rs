use crate::record::{DomainAge, ScanKind, ScanRecord, SslCertificate, Verdict};
use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    url: &'a str,
}

/// Wire shape of the external scanning backend. Optional fields may be
/// missing entirely; the response is taken as-is and never re-scored.
#[derive(Debug, Deserialize)]
pub struct RemoteScanResponse {
    #[serde(default)]
    pub url: Option<String>,
    pub label: String,
    pub score: i32,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub domain_age: Option<DomainAge>,
    #[serde(default)]
    pub ssl_certificate: Option<SslCertificate>,
}

/// Client for the optional remote URL-scanning service. Failures surface as
/// connectivity errors to the caller; nothing is written to history and no
/// quota is consumed on this path.
pub struct RemoteScanner {
    client: Client,
    base_url: String,
}

impl RemoteScanner {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn scan_url(&self, url: &str) -> Result<ScanRecord> {
        let endpoint = format!("{}/scan/url", self.base_url.trim_end_matches('/'));
        log::debug!("requesting remote scan of {url} via {endpoint}");

        let response = self
            .client
            .post(&endpoint)
            .json(&ScanRequest { url })
            .send()
            .await
            .with_context(|| format!("failed to reach scan service at {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("scan service returned {status}");
        }

        let body: RemoteScanResponse = response
            .json()
            .await
            .context("scan service returned an unreadable response")?;
        Ok(record_from_response(url, body))
    }
}

/// Convert the backend's response into a local record. The backend's
/// `phishing` label is this crate's `malicious` verdict; an unknown label
/// falls back to banding nothing and trusting the safest reading.
fn record_from_response(requested_url: &str, response: RemoteScanResponse) -> ScanRecord {
    let verdict = match response.label.to_lowercase().as_str() {
        "phishing" | "malicious" => Verdict::Malicious,
        "suspicious" => Verdict::Suspicious,
        _ => Verdict::Safe,
    };
    let score = response.score.clamp(0, 100) as u8;
    let target = response
        .url
        .unwrap_or_else(|| requested_url.to_string());

    let mut record = ScanRecord::url_scan(ScanKind::Url, target, verdict, score, response.reasons);
    record.domain_age = response.domain_age;
    record.ssl_certificate = response.ssl_certificate;
    record
}
