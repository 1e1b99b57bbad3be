use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Heuristic rule table. Every weight and phrase list the engine consults
/// lives here so the scoring logic itself carries no magic numbers. The
/// defaults below are the shipped table; a YAML file can override any part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    #[serde(default)]
    pub weights: RuleWeights,
    #[serde(default)]
    pub thresholds: VerdictThresholds,
    #[serde(default = "default_brand_domains")]
    pub brand_domains: Vec<String>,
    #[serde(default = "default_suspicious_tlds")]
    pub suspicious_tlds: Vec<String>,
    #[serde(default = "default_host_keywords")]
    pub host_keywords: Vec<String>,
    #[serde(default = "default_auth_failure_phrases")]
    pub auth_failure_phrases: Vec<String>,
    #[serde(default = "default_urgency_phrases")]
    pub urgency_phrases: Vec<String>,
    /// Domains younger than this (in days) are flagged when external
    /// registration data is available.
    #[serde(default = "default_young_domain_days")]
    pub young_domain_max_age_days: u32,
    /// Hosts with at least this many labels before the registrable domain
    /// are considered suspiciously deep.
    #[serde(default = "default_max_subdomain_depth")]
    pub max_subdomain_depth: usize,
    /// Hosts with at least this many hyphens are considered hyphen-heavy.
    #[serde(default = "default_hyphen_alert_count")]
    pub hyphen_alert_count: usize,
    /// Registrable labels with at least this fraction of digits are
    /// considered digit-heavy.
    #[serde(default = "default_digit_ratio_alert")]
    pub digit_ratio_alert: f32,
}

/// Per-rule score contributions. All nonnegative; a triggered rule adds its
/// weight once and appends one reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    pub ip_in_host: i32,
    pub no_https: i32,
    pub deep_subdomains: i32,
    pub hyphenated_host: i32,
    pub digit_heavy_host: i32,
    pub brand_lookalike: i32,
    pub host_keyword: i32,
    pub suspicious_tld: i32,
    pub unparsable_url: i32,
    pub young_domain: i32,
    pub invalid_certificate: i32,
    pub auth_failure: i32,
    pub urgency_language: i32,
    pub sender_mismatch: i32,
    pub suspicious_link: i32,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            ip_in_host: 30,
            no_https: 10,
            deep_subdomains: 10,
            hyphenated_host: 10,
            digit_heavy_host: 10,
            brand_lookalike: 30,
            host_keyword: 15,
            suspicious_tld: 20,
            unparsable_url: 10,
            young_domain: 25,
            invalid_certificate: 25,
            auth_failure: 25,
            urgency_language: 20,
            sender_mismatch: 25,
            suspicious_link: 20,
        }
    }
}

/// Score-to-verdict banding, applied in exactly one place (the engine).
/// `score < suspicious` is safe, `score >= malicious` is malicious.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    pub suspicious: u8,
    pub malicious: u8,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            suspicious: 30,
            malicious: 60,
        }
    }
}

fn default_brand_domains() -> Vec<String> {
    [
        "paypal.com",
        "google.com",
        "microsoft.com",
        "apple.com",
        "amazon.com",
        "facebook.com",
        "netflix.com",
        "linkedin.com",
        "github.com",
        "twitter.com",
        "instagram.com",
        "docusign.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_suspicious_tlds() -> Vec<String> {
    ["tk", "ml", "ga", "cf", "icu", "xyz", "top", "click", "link", "zip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_host_keywords() -> Vec<String> {
    [
        "login", "signin", "verify", "secure", "account", "update", "billing", "password",
        "confirm", "wallet",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_auth_failure_phrases() -> Vec<String> {
    [
        "spf fail",
        "spf=fail",
        "dkim fail",
        "dkim=fail",
        "dmarc fail",
        "dmarc=fail",
        "authentication failed",
        "sender not verified",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_urgency_phrases() -> Vec<String> {
    [
        "urgent",
        "immediately",
        "act now",
        "verify your account",
        "confirm your identity",
        "account suspended",
        "account will be closed",
        "unusual activity",
        "reset your password",
        "update your payment",
        "within 24 hours",
        "enter your credentials",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_young_domain_days() -> u32 {
    180
}

fn default_max_subdomain_depth() -> usize {
    3
}

fn default_hyphen_alert_count() -> usize {
    3
}

fn default_digit_ratio_alert() -> f32 {
    0.3
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            weights: RuleWeights::default(),
            thresholds: VerdictThresholds::default(),
            brand_domains: default_brand_domains(),
            suspicious_tlds: default_suspicious_tlds(),
            host_keywords: default_host_keywords(),
            auth_failure_phrases: default_auth_failure_phrases(),
            urgency_phrases: default_urgency_phrases(),
            young_domain_max_age_days: default_young_domain_days(),
            max_subdomain_depth: default_max_subdomain_depth(),
            hyphen_alert_count: default_hyphen_alert_count(),
            digit_ratio_alert: default_digit_ratio_alert(),
        }
    }
}

impl HeuristicConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: HeuristicConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.thresholds.suspicious >= self.thresholds.malicious {
            anyhow::bail!(
                "suspicious threshold ({}) must be below malicious threshold ({})",
                self.thresholds.suspicious,
                self.thresholds.malicious
            );
        }
        if self.thresholds.malicious > 100 {
            anyhow::bail!("malicious threshold must not exceed 100");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_band() {
        let config = HeuristicConfig::default();
        assert_eq!(config.thresholds.suspicious, 30);
        assert_eq!(config.thresholds.malicious, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = HeuristicConfig::default();
        config.thresholds.suspicious = 70;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = HeuristicConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: HeuristicConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.weights.brand_lookalike, config.weights.brand_lookalike);
        assert_eq!(back.brand_domains, config.brand_domains);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "weights:\n  no_https: 5\n";
        let config: HeuristicConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.weights.no_https, 5);
        assert_eq!(config.weights.ip_in_host, 30);
        assert_eq!(config.thresholds.malicious, 60);
        assert!(!config.brand_domains.is_empty());
    }
}
