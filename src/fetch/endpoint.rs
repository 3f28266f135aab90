//! Connection endpoint resolution
//!
//! An [`Endpoint`] is resolved once per engine and shared read-only by every
//! fetch task of the batch.

use crate::fetch::FetchError;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use url::Url;

/// Transport security of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain TCP; the handshake stage is a pass-through
    Http,

    /// TLS over TCP
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol version written in request lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    /// Accepts "1.0"/"1.1", "10"/"11" and "HTTP/1.0"/"HTTP/1.1"
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches("HTTP/") {
            "1.0" | "10" => Some(Self::Http10),
            "1.1" | "11" => Some(Self::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

/// A resolved connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    scheme: Scheme,
    version: HttpVersion,
    addrs: Arc<[SocketAddr]>,
}

impl Endpoint {
    /// Resolves `host:port` through the system resolver
    ///
    /// # Returns
    ///
    /// * `Ok(Endpoint)` - At least one socket address was found
    /// * `Err(FetchError::Resolve)` - Lookup failed or produced no addresses
    pub fn resolve(
        host: &str,
        port: u16,
        scheme: Scheme,
        version: HttpVersion,
    ) -> Result<Self, FetchError> {
        let resolve_error = |source: std::io::Error| FetchError::Resolve {
            host: host.to_string(),
            port,
            source: Arc::new(source),
        };

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .collect();

        if addrs.is_empty() {
            return Err(resolve_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses found",
            )));
        }

        tracing::debug!(host, port, addrs = addrs.len(), "Resolved endpoint");
        Ok(Self::with_addrs(host, port, scheme, version, addrs))
    }

    /// Resolves the origin (scheme, host, port) of an absolute URL
    pub fn resolve_url(url: &str, version: HttpVersion) -> Result<Self, FetchError> {
        let invalid = |message: String| FetchError::Resolve {
            host: url.to_string(),
            port: 0,
            source: Arc::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                message,
            )),
        };

        let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        let scheme = Scheme::parse(parsed.scheme())
            .ok_or_else(|| invalid(format!("unsupported scheme '{}'", parsed.scheme())))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = parsed.port().unwrap_or_else(|| scheme.default_port());

        Self::resolve(host, port, scheme, version)
    }

    /// Builds an endpoint from already known addresses
    pub fn with_addrs(
        host: &str,
        port: u16,
        scheme: Scheme,
        version: HttpVersion,
        addrs: Vec<SocketAddr>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            scheme,
            version,
            addrs: addrs.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Value of the Host header; the port is omitted when it is the scheme default
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute URL for a request target on this endpoint
    pub fn url_for(&self, target: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host_header(), target)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_version_parse() {
        assert_eq!(HttpVersion::parse("1.1"), Some(HttpVersion::Http11));
        assert_eq!(HttpVersion::parse("11"), Some(HttpVersion::Http11));
        assert_eq!(HttpVersion::parse("HTTP/1.0"), Some(HttpVersion::Http10));
        assert_eq!(HttpVersion::parse("2"), None);
        assert_eq!(HttpVersion::default().as_str(), "HTTP/1.1");
    }

    #[test]
    fn test_scheme_default_ports() {
        assert_eq!(Scheme::Http.default_port(), 80);
        assert_eq!(Scheme::Https.default_port(), 443);
        assert_eq!(Scheme::parse("https"), Some(Scheme::Https));
        assert_eq!(Scheme::parse("ftp"), None);
    }

    #[test]
    fn test_resolve_loopback() {
        let endpoint =
            Endpoint::resolve("127.0.0.1", 8080, Scheme::Http, HttpVersion::Http11).unwrap();
        assert_eq!(endpoint.addrs().len(), 1);
        assert_eq!(endpoint.addrs()[0].port(), 8080);
        assert_eq!(endpoint.to_string(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_resolve_url_uses_scheme_default_port() {
        let endpoint = Endpoint::resolve_url("https://127.0.0.1", HttpVersion::Http11).unwrap();
        assert_eq!(endpoint.port(), 443);
        assert_eq!(endpoint.scheme(), Scheme::Https);
        assert_eq!(endpoint.host_header(), "127.0.0.1");
    }

    #[test]
    fn test_resolve_url_rejects_unsupported_scheme() {
        let result = Endpoint::resolve_url("ftp://127.0.0.1/", HttpVersion::Http11);
        assert!(matches!(result, Err(FetchError::Resolve { .. })));
    }

    #[test]
    fn test_host_header_includes_non_default_port() {
        let addr: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        let endpoint = Endpoint::with_addrs(
            "shop.example",
            8443,
            Scheme::Https,
            HttpVersion::Http11,
            vec![addr],
        );
        assert_eq!(endpoint.host_header(), "shop.example:8443");
        assert_eq!(
            endpoint.url_for("/item/1"),
            "https://shop.example:8443/item/1"
        );
    }
}
