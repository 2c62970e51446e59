//! Which URLs the crawler may visit.

use std::net::IpAddr;

use regex::Regex;
use url::Url;

use campuscorpus_shared::CrawlConfig;

/// Determines which URLs are "in scope" for a crawl.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    /// Lowercased hosts; a URL host must equal one or be a subdomain of one.
    allowed_domains: Vec<String>,
    /// Lowercased extensions without the leading dot.
    ignored_extensions: Vec<String>,
    /// Include patterns (if non-empty, the path must match at least one).
    include_patterns: Vec<Regex>,
    /// Exclude patterns (if the path matches any, it's excluded).
    exclude_patterns: Vec<Regex>,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl CrawlScope {
    /// Build a scope from config. With no allowed domains configured, the
    /// hosts of the start URLs are used.
    pub fn new(config: &CrawlConfig) -> Self {
        let mut allowed_domains: Vec<String> = config
            .allowed_domains
            .iter()
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        if allowed_domains.is_empty() {
            allowed_domains = config
                .start_urls
                .iter()
                .filter_map(|u| Url::parse(u).ok())
                .filter_map(|u| u.host_str().map(str::to_lowercase))
                .collect();
        }

        Self {
            allowed_domains,
            ignored_extensions: config
                .ignored_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            include_patterns: config
                .include_patterns
                .iter()
                .filter_map(|p| glob_to_regex(p))
                .collect(),
            exclude_patterns: config
                .exclude_patterns
                .iter()
                .filter_map(|p| glob_to_regex(p))
                .collect(),
            allow_localhost: false,
        }
    }

    /// Allow crawling localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    pub fn in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        if !self.allow_localhost && is_ssrf_target(url) {
            return false;
        }

        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return false;
        };
        let host_allowed = self
            .allowed_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")));
        if !host_allowed {
            return false;
        }

        let path = url.path();
        if self.has_ignored_extension(path) {
            return false;
        }

        if self.exclude_patterns.iter().any(|p| p.is_match(path)) {
            return false;
        }
        if !self.include_patterns.is_empty() {
            return self.include_patterns.iter().any(|p| p.is_match(path));
        }
        true
    }

    fn has_ignored_extension(&self, path: &str) -> bool {
        let last = path.rsplit('/').next().unwrap_or("");
        match last.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.ignored_extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

/// Convert a glob-like pattern to a regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
