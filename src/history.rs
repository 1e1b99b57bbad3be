use crate::record::{ScanKind, ScanRecord, Verdict};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Optional narrowing of a history query. `text` matches case-insensitively
/// against the target for URL/QR records and against each reason for email
/// records.
#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    pub verdict: Option<Verdict>,
    pub text: Option<String>,
}

impl HistoryFilter {
    fn matches(&self, record: &ScanRecord) -> bool {
        if let Some(verdict) = self.verdict {
            if record.verdict != verdict {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = match record.kind {
                ScanKind::Email => record
                    .reasons
                    .iter()
                    .any(|r| r.to_lowercase().contains(&needle)),
                _ => record
                    .target
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&needle),
            };
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Append-only log of scan records persisted as a single JSON blob, read in
/// full and rewritten in full on every mutation. A missing or unparsable
/// blob degrades to an empty history instead of failing the caller.
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Never rejects a well-formed record; the record is
    /// visible to every subsequent `query` in this process.
    pub fn append(&self, record: ScanRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut records = self.load();
        records.push(record);
        self.write(&records)
    }

    /// All matching records, most recent first by each record's own
    /// timestamp.
    pub fn query(&self, filter: &HistoryFilter) -> Vec<ScanRecord> {
        let mut records = self.load();
        records.retain(|r| filter.matches(r));
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record. Irreversible.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        self.write(&[])
    }

    fn load(&self) -> Vec<ScanRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "history blob at {} is unreadable, treating as empty: {e}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    fn write(&self, records: &[ScanRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create history directory: {}", parent.display())
                })?;
            }
        }
        let blob = serde_json::to_string_pretty(records).context("failed to serialize history")?;
        fs::write(&self.path, blob)
            .with_context(|| format!("failed to write history file: {}", self.path.display()))
    }
}

/// Serialize records as CSV with the fixed column order
/// `id,type,target,verdict,score,timestamp,reasons`. Reasons are joined with
/// "; "; fields containing the delimiter, quotes, or newlines are quoted.
pub fn export_csv(records: &[ScanRecord]) -> String {
    let mut csv = String::new();
    csv.push_str("id,type,target,verdict,score,timestamp,reasons\n");
    for record in records {
        let row = [
            record.id.clone(),
            record.kind.as_str().to_string(),
            record.display_target().to_string(),
            record.verdict.to_string(),
            record.score.to_string(),
            record.timestamp.to_rfc3339(),
            record.reasons.join("; "),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
        csv.push_str(&escaped.join(","));
        csv.push('\n');
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ScanKind;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn record(target: &str, verdict: Verdict, score: u8) -> ScanRecord {
        ScanRecord::url_scan(ScanKind::Url, target.to_string(), verdict, score, Vec::new())
    }

    #[test]
    fn test_append_then_query_round_trip() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store
            .append(record("https://example.com", Verdict::Safe, 0))
            .unwrap();
        store
            .append(record("http://paypa1.tk", Verdict::Malicious, 80))
            .unwrap();

        let all = store.query(&HistoryFilter::default());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_query_most_recent_first() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut older = record("https://first.example", Verdict::Safe, 0);
        older.timestamp = Utc::now() - Duration::hours(2);
        let newer = record("https://second.example", Verdict::Safe, 0);

        // Append out of order; display order comes from timestamps.
        store.append(newer.clone()).unwrap();
        store.append(older.clone()).unwrap();

        let all = store.query(&HistoryFilter::default());
        assert_eq!(all[0].id, newer.id);
        assert_eq!(all[1].id, older.id);
    }

    #[test]
    fn test_verdict_filter_returns_exact_subset() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store
            .append(record("https://a.example", Verdict::Safe, 5))
            .unwrap();
        store
            .append(record("http://b.example", Verdict::Malicious, 75))
            .unwrap();
        store
            .append(record("http://c.example", Verdict::Malicious, 90))
            .unwrap();

        let malicious = store.query(&HistoryFilter {
            verdict: Some(Verdict::Malicious),
            text: None,
        });
        assert_eq!(malicious.len(), 2);
        assert!(malicious.iter().all(|r| r.verdict == Verdict::Malicious));
    }

    #[test]
    fn test_text_filter_matches_target_and_email_reasons() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store
            .append(record("https://PayPal-login.example", Verdict::Suspicious, 40))
            .unwrap();
        store
            .append(ScanRecord::email_scan(
                Some("x@y.com".to_string()),
                None,
                Verdict::Suspicious,
                45,
                vec!["Suspicious link in body: http://paypa1.net".to_string()],
                vec!["http://paypa1.net".to_string()],
            ))
            .unwrap();
        store
            .append(record("https://example.org", Verdict::Safe, 0))
            .unwrap();

        let hits = store.query(&HistoryFilter {
            verdict: None,
            text: Some("paypal".to_string()),
        });
        assert_eq!(hits.len(), 1);

        let email_hits = store.query(&HistoryFilter {
            verdict: None,
            text: Some("paypa1".to_string()),
        });
        assert_eq!(email_hits.len(), 1);
        assert_eq!(email_hits[0].kind, ScanKind::Email);
    }

    #[test]
    fn test_clear_empties_history() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        store
            .append(record("https://example.com", Verdict::Safe, 0))
            .unwrap();
        store.clear().unwrap();
        assert!(store.query(&HistoryFilter::default()).is_empty());
    }

    #[test]
    fn test_corrupted_blob_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{this is not json").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.query(&HistoryFilter::default()).is_empty());

        // The store recovers: appends work after corruption.
        store
            .append(record("https://example.com", Verdict::Safe, 0))
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nope/history.json"));
        assert!(store.query(&HistoryFilter::default()).is_empty());
    }

    #[test]
    fn test_csv_export_columns() {
        let mut rec = record("https://example.com", Verdict::Safe, 12);
        rec.reasons = vec!["No HTTPS".to_string(), "Odd host".to_string()];
        let csv = export_csv(&[rec.clone()]);

        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "id,type,target,verdict,score,timestamp,reasons");
        let row = lines.next().unwrap();
        assert!(row.starts_with(&rec.id));
        assert!(row.contains(",url,https://example.com,safe,12,"));
        assert!(row.ends_with("No HTTPS; Odd host"));
    }

    #[test]
    fn test_csv_escapes_embedded_delimiters() {
        let mut rec = record("https://example.com/a,b", Verdict::Safe, 1);
        rec.reasons = vec!["contains \"quotes\", and commas".to_string()];
        let csv = export_csv(&[rec]);
        assert!(csv.contains("\"https://example.com/a,b\""));
        assert!(csv.contains("\"contains \"\"quotes\"\", and commas\""));
    }

    #[test]
    fn test_csv_round_trip_preserves_fields() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        store
            .append(record("https://example.com/a,b", Verdict::Suspicious, 44))
            .unwrap();
        store
            .append(ScanRecord::email_scan(
                Some("x@y.com".to_string()),
                Some("hello".to_string()),
                Verdict::Safe,
                3,
                vec!["one".to_string(), "two".to_string()],
                Vec::new(),
            ))
            .unwrap();

        let records = store.query(&HistoryFilter::default());
        let csv = export_csv(&records);
        let parsed = parse_csv(&csv);

        assert_eq!(parsed.len(), records.len());
        for (row, rec) in parsed.iter().zip(records.iter()) {
            assert_eq!(row[0], rec.id);
            assert_eq!(row[1], rec.kind.as_str());
            assert_eq!(row[2], rec.display_target());
            assert_eq!(row[3], rec.verdict.to_string());
            assert_eq!(row[4], rec.score.to_string());
            assert_eq!(row[5], rec.timestamp.to_rfc3339());
            assert_eq!(row[6], rec.reasons.join("; "));
        }
    }

    /// Tiny RFC-style CSV reader, enough to verify the export round-trips.
    fn parse_csv(csv: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for line in csv.lines().skip(1) {
            let mut fields = Vec::new();
            let mut field = String::new();
            let mut in_quotes = false;
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '"' if in_quotes && chars.peek() == Some(&'"') => {
                        field.push('"');
                        chars.next();
                    }
                    '"' => in_quotes = !in_quotes,
                    ',' if !in_quotes => {
                        fields.push(std::mem::take(&mut field));
                    }
                    _ => field.push(c),
                }
            }
            fields.push(field);
            rows.push(fields);
        }
        rows
    }
}
