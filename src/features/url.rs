use crate::domain_utils::DomainUtils;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref EMBEDDED_IPV4: Regex = Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap();
}

/// Lexical signals derived from a raw URL string. Extraction is total: when
/// the string does not parse as a URL the host-shaped prefix is analyzed
/// instead and `parsed` is false.
#[derive(Debug, Clone)]
pub struct UrlFeatures {
    /// The string exactly as the user entered it.
    pub original: String,
    /// The copy used for parsing, with a default scheme prepended if absent.
    pub canonical: String,
    /// Lowercased host, or best-effort host-shaped fragment on parse failure.
    pub host: String,
    pub https: bool,
    pub parsed: bool,
    pub embedded_ip: bool,
    pub subdomain_depth: usize,
    pub hyphen_count: usize,
    /// Fraction of digits in the registrable label of the host.
    pub digit_ratio: f32,
    pub tld: Option<String>,
}

impl UrlFeatures {
    pub fn extract(raw: &str) -> Self {
        let original = raw.to_string();
        let trimmed = raw.trim();
        let canonical = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let (host, parsed) = match Url::parse(&canonical) {
            Ok(url) => (
                url.host_str().map(|h| h.to_lowercase()).unwrap_or_default(),
                true,
            ),
            Err(_) => (fallback_host(&canonical), false),
        };

        let https = canonical.to_lowercase().starts_with("https://");
        let embedded_ip = EMBEDDED_IPV4.is_match(&host);
        let subdomain_depth = if host.is_empty() {
            0
        } else {
            DomainUtils::subdomain_depth(&host)
        };
        let hyphen_count = host.matches('-').count();
        let digit_ratio = registrable_label_digit_ratio(&host);
        let tld = DomainUtils::tld(&host);

        Self {
            original,
            canonical,
            host,
            https,
            parsed,
            embedded_ip,
            subdomain_depth,
            hyphen_count,
            digit_ratio,
            tld,
        }
    }

    /// Registrable domain of the host, e.g. "paypa1-secure.net".
    pub fn registrable_domain(&self) -> String {
        DomainUtils::registrable_domain(&self.host)
    }
}

/// Closest configured brand the host imitates without being it, if any.
/// Every dot- or hyphen-separated label of the host is compared against the
/// brand's name label; an exact hit means the brand name is buried in a
/// foreign host ("paypal.secure-check.com"), a near miss (edit distance
/// <= 2) means a typosquat ("paypa1-secure.net").
pub fn brand_lookalike(host: &str, brand_domains: &[String]) -> Option<String> {
    if host.is_empty() || DomainUtils::matches_domain_list(host, brand_domains) {
        return None;
    }

    let labels: Vec<&str> = host
        .split(['.', '-'])
        .filter(|l| l.len() >= 4)
        .collect();

    for brand in brand_domains {
        let brand_label = brand.split('.').next().unwrap_or(brand);
        if brand_label.len() < 4 {
            continue;
        }
        for label in &labels {
            if strsim::levenshtein(label, brand_label) <= 2 {
                return Some(brand.clone());
            }
        }
    }
    None
}

/// Best-effort host extraction when full URL parsing fails: take what sits
/// between the scheme separator and the first path/query delimiter.
fn fallback_host(canonical: &str) -> String {
    let after_scheme = match canonical.find("://") {
        Some(pos) => &canonical[pos + 3..],
        None => canonical,
    };
    after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split('@')
        .last()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

fn registrable_label_digit_ratio(host: &str) -> f32 {
    let registrable = DomainUtils::registrable_domain(host);
    let label = registrable.split('.').next().unwrap_or("");
    if label.is_empty() {
        return 0.0;
    }
    let digits = label.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f32 / label.len() as f32
}
