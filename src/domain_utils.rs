/// Minimal domain hierarchy utilities shared by the feature extractors.
pub struct DomainUtils;

impl DomainUtils {
    /// Extract domain from email address
    pub fn email_domain(email: &str) -> Option<String> {
        let at_pos = email.rfind('@')?;
        if at_pos == 0 {
            return None;
        }
        let domain = email[at_pos + 1..]
            .trim()
            .trim_end_matches('>')
            .to_lowercase();
        if domain.contains('.') && !domain.is_empty() {
            Some(domain)
        } else {
            None
        }
    }

    /// Reduce a host to its registrable domain, e.g.
    /// "mail.accounts.example.co.uk" -> "example.co.uk"
    pub fn registrable_domain(host: &str) -> String {
        let host = host.to_lowercase();
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() < 2 {
            return host;
        }

        let two_part_tlds = [
            "co.uk", "com.au", "co.jp", "co.kr", "com.br", "co.za", "com.mx", "co.in", "com.sg",
            "co.nz", "org.uk", "net.au", "gov.uk", "ac.uk",
        ];

        let last_two = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if parts.len() >= 3 && two_part_tlds.contains(&last_two.as_str()) {
            return format!("{}.{}", parts[parts.len() - 3], last_two);
        }
        last_two
    }

    /// Number of labels in front of the registrable domain.
    pub fn subdomain_depth(host: &str) -> usize {
        let total = host.split('.').filter(|p| !p.is_empty()).count();
        let registrable = Self::registrable_domain(host)
            .split('.')
            .filter(|p| !p.is_empty())
            .count();
        total.saturating_sub(registrable)
    }

    /// Check if host matches any domain in the list, including subdomains.
    pub fn matches_domain_list(host: &str, domain_list: &[String]) -> bool {
        let host_lower = host.to_lowercase();
        domain_list.iter().any(|pattern| {
            let pattern_lower = pattern.to_lowercase();
            host_lower == pattern_lower || host_lower.ends_with(&format!(".{pattern_lower}"))
        })
    }

    /// Extract the TLD (last label) from a host with at least two labels.
    pub fn tld(host: &str) -> Option<String> {
        let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
        if parts.len() >= 2 {
            parts.last().map(|s| s.to_lowercase())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain() {
        assert_eq!(
            DomainUtils::email_domain("user@example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            DomainUtils::email_domain("Security Team <it@corp.example.org>"),
            Some("corp.example.org".to_string())
        );
        assert_eq!(DomainUtils::email_domain("invalid"), None);
        assert_eq!(DomainUtils::email_domain("@example.com"), None);
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(
            DomainUtils::registrable_domain("mail.example.com"),
            "example.com"
        );
        assert_eq!(
            DomainUtils::registrable_domain("a.b.example.co.uk"),
            "example.co.uk"
        );
        assert_eq!(DomainUtils::registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn test_subdomain_depth() {
        assert_eq!(DomainUtils::subdomain_depth("example.com"), 0);
        assert_eq!(DomainUtils::subdomain_depth("mail.example.com"), 1);
        assert_eq!(
            DomainUtils::subdomain_depth("login.secure.mail.example.com"),
            3
        );
    }

    #[test]
    fn test_matches_domain_list() {
        let domains = vec!["example.com".to_string(), "test.org".to_string()];
        assert!(DomainUtils::matches_domain_list("example.com", &domains));
        assert!(DomainUtils::matches_domain_list("mail.example.com", &domains));
        assert!(!DomainUtils::matches_domain_list("notexample.com", &domains));
    }

    #[test]
    fn test_tld() {
        assert_eq!(DomainUtils::tld("example.com"), Some("com".to_string()));
        assert_eq!(DomainUtils::tld("spam.tk"), Some("tk".to_string()));
        assert_eq!(DomainUtils::tld("localhost"), None);
    }
}
