// src/crawl/scope.rs
// =============================================================================
// Decides whether a discovered URL belongs to the crawl.
//
// A URL is in scope when its host has the same registrable domain as the
// seed (e.g. "example.com"), or is a subdomain of it ("a.example.com").
// The registrable domain comes from the Public Suffix List, so
// "a.example.co.uk" maps to "example.co.uk" and not to "co.uk".
//
// The policy is computed once from the seed and never changes, so it can be
// shared between workers without locking.
// =============================================================================

use url::{Host, Url};

#[derive(Debug, Clone)]
pub struct ScopePolicy {
    // Registrable domain of the seed, lower-case
    seed_domain: String,
}

impl ScopePolicy {
    // Builds the policy from the seed URL
    //
    // Returns None when the seed has no host (e.g. "file:///tmp/x")
    pub fn from_seed(seed: &Url) -> Option<Self> {
        let host = seed.host()?;
        Some(Self {
            seed_domain: registrable_domain(&host),
        })
    }

    pub fn seed_domain(&self) -> &str {
        &self.seed_domain
    }

    // Returns true if the URL should be crawled
    //
    // Only http/https URLs with a host can be in scope
    pub fn in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host() else {
            return false;
        };

        if registrable_domain(&host) == self.seed_domain {
            return true;
        }

        // Strict subdomain: the label boundary is required, so
        // "notexample.com" never matches "example.com"
        match host {
            Host::Domain(name) => name
                .trim_end_matches('.')
                .ends_with(&format!(".{}", self.seed_domain)),
            _ => false,
        }
    }

    // Same check for raw strings; anything unparsable is out of scope
    pub fn in_scope_str(&self, url: &str) -> bool {
        Url::parse(url).map(|u| self.in_scope(&u)).unwrap_or(false)
    }
}

// Finds the registrable domain of a host
//
// IP literals and hosts unknown to the suffix list (like "localhost")
// are their own registrable domain
fn registrable_domain(host: &Host<&str>) -> String {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            psl::domain_str(&name)
                .map(str::to_string)
                .unwrap_or(name)
        }
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(seed: &str) -> ScopePolicy {
        ScopePolicy::from_seed(&Url::parse(seed).unwrap()).unwrap()
    }

    #[test]
    fn test_subdomain_in_scope() {
        let scope = policy("http://example.com");
        assert!(scope.in_scope_str("http://a.example.com/x"));
        assert!(scope.in_scope_str("https://deep.a.example.com/"));
        assert!(scope.in_scope_str("http://example.com/page"));
    }

    #[test]
    fn test_other_domain_out_of_scope() {
        let scope = policy("http://example.com");
        assert!(!scope.in_scope_str("http://example.org"));
    }

    #[test]
    fn test_suffix_boundary() {
        let scope = policy("http://example.com");
        assert!(!scope.in_scope_str("http://notexample.com"));
        assert!(!scope.in_scope_str("http://example.com.evil.net/"));
    }

    #[test]
    fn test_seed_on_subdomain_covers_whole_site() {
        let scope = policy("https://blog.example.co.uk/posts");
        assert_eq!(scope.seed_domain(), "example.co.uk");
        assert!(scope.in_scope_str("https://shop.example.co.uk/"));
        assert!(!scope.in_scope_str("https://other.co.uk/"));
    }

    #[test]
    fn test_unknown_tld_uses_last_two_labels() {
        let scope = policy("http://site.test");
        assert!(scope.in_scope_str("http://site.test/a"));
        assert!(!scope.in_scope_str("http://other.test"));
    }

    #[test]
    fn test_non_http_and_malformed_are_out_of_scope() {
        let scope = policy("http://example.com");
        assert!(!scope.in_scope_str("mailto:admin@example.com"));
        assert!(!scope.in_scope_str("ftp://example.com/file"));
        assert!(!scope.in_scope_str("not a url"));
        assert!(!scope.in_scope_str("http://[::1"));
    }

    #[test]
    fn test_ip_seed_matches_only_itself() {
        let scope = policy("http://127.0.0.1:8080/");
        assert!(scope.in_scope_str("http://127.0.0.1:8080/a"));
        assert!(!scope.in_scope_str("http://127.0.0.2/"));
    }

    #[test]
    fn test_file_url_has_no_scope() {
        assert!(ScopePolicy::from_seed(&Url::parse("file:///tmp/x").unwrap()).is_none());
    }
}
