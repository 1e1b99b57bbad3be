use crate::config::HeuristicConfig;
use crate::features::url::{brand_lookalike, UrlFeatures};
use crate::features::EmailFeatures;
use crate::record::{DomainAge, ScanKind, ScanRecord, SslCertificate, Verdict};

/// Heuristic scan engine. A pure function of its inputs plus the configured
/// rule table: it never persists, never touches the history store, and never
/// increments quota. Call sites own persistence and metering.
pub struct ScanEngine {
    config: HeuristicConfig,
}

impl ScanEngine {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Band a score into a verdict. The only place the thresholds are read.
    pub fn verdict_for(&self, score: u8) -> Verdict {
        if score >= self.config.thresholds.malicious {
            Verdict::Malicious
        } else if score >= self.config.thresholds.suspicious {
            Verdict::Suspicious
        } else {
            Verdict::Safe
        }
    }

    pub fn score_url(&self, raw_url: &str) -> ScanRecord {
        self.score_target(ScanKind::Url, raw_url, None, None)
    }

    /// Score a decoded QR payload. Same checks as a URL scan; only the
    /// record kind differs.
    pub fn score_qr(&self, payload: &str) -> ScanRecord {
        self.score_target(ScanKind::Qr, payload, None, None)
    }

    /// Score a URL together with externally supplied registration and
    /// certificate data. The engine never looks these up itself.
    pub fn score_url_with_intel(
        &self,
        raw_url: &str,
        domain_age: Option<DomainAge>,
        ssl_certificate: Option<SslCertificate>,
    ) -> ScanRecord {
        self.score_target(ScanKind::Url, raw_url, domain_age, ssl_certificate)
    }

    fn score_target(
        &self,
        kind: ScanKind,
        raw: &str,
        domain_age: Option<DomainAge>,
        ssl_certificate: Option<SslCertificate>,
    ) -> ScanRecord {
        let weights = &self.config.weights;
        let features = UrlFeatures::extract(raw);
        let (mut score, mut reasons) = self.url_indicators(&features);

        if let Some(age) = &domain_age {
            if age.age_days < self.config.young_domain_max_age_days {
                score += weights.young_domain;
                reasons.push(format!(
                    "Domain is newly registered ({} days old)",
                    age.age_days
                ));
            }
        }
        if let Some(cert) = &ssl_certificate {
            if !cert.valid {
                score += weights.invalid_certificate;
                reasons.push(format!(
                    "SSL certificate is invalid or untrusted (issuer: {})",
                    cert.issuer
                ));
            }
        }

        let score = clamp_score(score);
        let verdict = self.verdict_for(score);
        let mut record = ScanRecord::url_scan(kind, features.original.clone(), verdict, score, reasons);
        record.domain_age = domain_age;
        record.ssl_certificate = ssl_certificate;
        record
    }

    /// Ordered lexical rule battery shared by URL scans and email link
    /// checks. Each rule fires at most once.
    fn url_indicators(&self, features: &UrlFeatures) -> (i32, Vec<String>) {
        let weights = &self.config.weights;
        let mut score = 0i32;
        let mut reasons = Vec::new();

        if features.embedded_ip {
            score += weights.ip_in_host;
            reasons.push(format!(
                "Host embeds an IP address pattern: {}",
                features.host
            ));
        }
        if !features.https {
            score += weights.no_https;
            reasons.push("Connection does not use HTTPS".to_string());
        }
        if features.subdomain_depth >= self.config.max_subdomain_depth {
            score += weights.deep_subdomains;
            reasons.push(format!(
                "Unusually deep subdomain nesting ({} levels)",
                features.subdomain_depth
            ));
        }
        if features.hyphen_count >= self.config.hyphen_alert_count {
            score += weights.hyphenated_host;
            reasons.push(format!(
                "Hyphen-heavy host name ({} hyphens)",
                features.hyphen_count
            ));
        }
        if features.digit_ratio >= self.config.digit_ratio_alert {
            score += weights.digit_heavy_host;
            reasons.push("Digit-heavy domain label".to_string());
        }
        if let Some(brand) = brand_lookalike(&features.host, &self.config.brand_domains) {
            score += weights.brand_lookalike;
            reasons.push(format!(
                "Host {} imitates known brand {}",
                features.host, brand
            ));
        }
        if let Some(keyword) = self
            .config
            .host_keywords
            .iter()
            .find(|kw| features.host.contains(kw.as_str()))
        {
            score += weights.host_keyword;
            reasons.push(format!(
                "Suspicious keyword '{}' in host {}",
                keyword, features.host
            ));
        }
        if let Some(tld) = &features.tld {
            if self.config.suspicious_tlds.iter().any(|t| t == tld) {
                score += weights.suspicious_tld;
                reasons.push(format!("High-risk top-level domain: .{tld}"));
            }
        }
        if !features.parsed {
            score += weights.unparsable_url;
            reasons.push("Input could not be parsed as a URL; lexical checks only".to_string());
        }

        (score, reasons)
    }

    /// Score email metadata. Callers must guarantee at least one of the
    /// text fields is non-empty. `links` are links the caller already pulled
    /// from the message; any further links found in the body are checked too.
    pub fn score_email(
        &self,
        sender: &str,
        subject: &str,
        links: &[String],
        body: &str,
    ) -> ScanRecord {
        let weights = &self.config.weights;
        let features = EmailFeatures::extract(sender, subject, body);
        let text = features.combined_text();

        let mut candidate_links: Vec<String> = links.to_vec();
        for link in &features.links {
            if !candidate_links.contains(link) {
                candidate_links.push(link.clone());
            }
        }
        let mut score = 0i32;
        let mut reasons = Vec::new();

        if let Some(phrase) = self
            .config
            .auth_failure_phrases
            .iter()
            .find(|p| text.contains(p.to_lowercase().as_str()))
        {
            score += weights.auth_failure;
            reasons.push(format!(
                "Authentication failure indicator present: '{phrase}'"
            ));
        }

        if let Some(phrase) = self
            .config
            .urgency_phrases
            .iter()
            .find(|p| text.contains(p.to_lowercase().as_str()))
        {
            score += weights.urgency_language;
            reasons.push(format!(
                "Urgency or credential-harvesting phrasing: '{phrase}'"
            ));
        }

        if let Some(brand) = self.display_name_mismatch(&features) {
            score += weights.sender_mismatch;
            reasons.push(format!(
                "Display name claims {} but sender domain is {}",
                brand,
                features.sender_domain.as_deref().unwrap_or("missing")
            ));
        }

        let suspicious_links: Vec<String> = candidate_links
            .iter()
            .filter(|link| {
                let link_features = UrlFeatures::extract(link);
                let (link_score, _) = self.url_indicators(&link_features);
                link_score >= i32::from(self.config.thresholds.suspicious)
            })
            .cloned()
            .collect();
        if !suspicious_links.is_empty() {
            score += weights.suspicious_link;
            reasons.push(format!(
                "Suspicious link in body: {}",
                suspicious_links.join(", ")
            ));
        }

        let score = clamp_score(score);
        let verdict = self.verdict_for(score);
        ScanRecord::email_scan(
            non_empty(&features.sender),
            non_empty(&features.subject),
            verdict,
            score,
            reasons,
            suspicious_links,
        )
    }

    /// A display name that carries a configured brand while the address
    /// domain belongs to someone else.
    fn display_name_mismatch(&self, features: &EmailFeatures) -> Option<String> {
        let display = features.display_name.as_ref()?.to_lowercase();
        let sender_domain = features.sender_domain.as_deref().unwrap_or("");

        for brand in &self.config.brand_domains {
            let brand_label = brand.split('.').next().unwrap_or(brand);
            if display.contains(brand_label)
                && !crate::domain_utils::DomainUtils::matches_domain_list(
                    sender_domain,
                    std::slice::from_ref(brand),
                )
            {
                return Some(brand.clone());
            }
        }
        None
    }
}

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
