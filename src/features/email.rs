use crate::domain_utils::DomainUtils;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BODY_LINK: Regex = Regex::new(r#"https?://[^\s<>"')\]]+"#).unwrap();
}

/// Structural signals pulled from raw email fields before any scoring.
/// Phrase matching against the configured keyword lists happens in the
/// engine; this type only captures what the text itself contains.
#[derive(Debug, Clone)]
pub struct EmailFeatures {
    pub sender: String,
    pub subject: String,
    pub body: String,
    /// Domain part of the sender address, when one is present.
    pub sender_domain: Option<String>,
    /// Display name in front of an angle-bracketed address, when present.
    pub display_name: Option<String>,
    /// Links extracted from the body, in order of appearance.
    pub links: Vec<String>,
}

impl EmailFeatures {
    pub fn extract(sender: &str, subject: &str, body: &str) -> Self {
        let sender = sender.trim().to_string();
        let sender_domain = DomainUtils::email_domain(&sender);
        let display_name = extract_display_name(&sender);

        let links = BODY_LINK
            .find_iter(body)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
            .collect();

        Self {
            sender,
            subject: subject.trim().to_string(),
            body: body.to_string(),
            sender_domain,
            display_name,
            links,
        }
    }

    /// Subject and body as one lowercased haystack for phrase matching.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.subject, self.body).to_lowercase()
    }
}

fn extract_display_name(sender: &str) -> Option<String> {
    let open = sender.find('<')?;
    let name = sender[..open].trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_extraction() {
        let features = EmailFeatures::extract(
            "a@b.com",
            "hi",
            "Click http://paypa1-secure.net/login now, or visit https://example.com.",
        );
        assert_eq!(
            features.links,
            vec![
                "http://paypa1-secure.net/login".to_string(),
                "https://example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_no_links() {
        let features = EmailFeatures::extract("a@b.com", "hi", "no links here");
        assert!(features.links.is_empty());
    }

    #[test]
    fn test_display_name_and_domain() {
        let features = EmailFeatures::extract("PayPal Support <help@scam.example.net>", "", "");
        assert_eq!(features.display_name.as_deref(), Some("PayPal Support"));
        assert_eq!(features.sender_domain.as_deref(), Some("scam.example.net"));
    }

    #[test]
    fn test_bare_address_has_no_display_name() {
        let features = EmailFeatures::extract("security@example.com", "", "");
        assert_eq!(features.display_name, None);
        assert_eq!(features.sender_domain.as_deref(), Some("example.com"));
    }
}
