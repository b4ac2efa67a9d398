use crate::{UrlError, UrlResult};
use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips a leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// The boundary of the audited site
///
/// A URL is internal when it has the same host and explicit port as the
/// seed, or the same host once a leading `www.` is removed on either side.
/// Default ports are not explicit, so `http` and `https` links to the seed
/// host are both internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    host: String,
    port: Option<u16>,
}

impl SiteScope {
    /// Builds the scope from the seed URL
    ///
    /// # Errors
    ///
    /// * `UrlError::InvalidScheme` - the seed is not http(s)
    /// * `UrlError::MissingDomain` - the seed has no host
    pub fn from_seed(seed: &Url) -> UrlResult<Self> {
        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(UrlError::InvalidScheme(seed.scheme().to_string()));
        }
        let host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            host,
            port: seed.port(),
        })
    }

    /// The seed host, lowercase, including any `www.`
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the seed host is an IP address rather than a domain name
    pub fn is_ip(&self) -> bool {
        matches!(
            Host::parse(&self.host),
            Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_))
        )
    }

    /// Returns true if `url` belongs to the audited site
    ///
    /// Relative URLs are internal by definition.
    pub fn is_internal(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.contains(&parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }

    /// Same as [`is_internal`](Self::is_internal) for an already parsed URL
    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = extract_domain(url) else {
            return false;
        };
        if url.port() != self.port {
            return false;
        }
        host == self.host || strip_www(&host) == strip_www(&self.host)
    }
}
