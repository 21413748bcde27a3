// fingerprint.rs: Endpoint fingerprints and requested-URL resolution.
//
// A fingerprint is SHA-256 over the method name followed by the canonical
// URL (`host + feature + template`). The same canonical URL is produced for
// a declared route and for a concrete request against it, so both sides
// agree on identity without any shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::EndpointError;
use crate::method::HttpMethod;
use crate::template::{clean_segments, PathTemplate};

/// Opaque endpoint identity: 32 bytes, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointFingerprint([u8; 32]);

impl EndpointFingerprint {
    /// Fingerprint a declared endpoint.
    pub fn compute(
        method: HttpMethod,
        host: &str,
        feature: &str,
        template: &PathTemplate,
    ) -> Result<Self, EndpointError> {
        let url = canonical_url(host, feature, template)?;
        Ok(Self::of_canonical(method, &url))
    }

    fn of_canonical(method: HttpMethod, url: &Url) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(url.as_str().as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero fingerprint stands for "not assigned".
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for EndpointFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for EndpointFingerprint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| EndpointError::InvalidFingerprint {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for EndpointFingerprint {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EndpointFingerprint> for String {
    fn from(fingerprint: EndpointFingerprint) -> Self {
        fingerprint.to_string()
    }
}

/// Normalize an application host: absolute http(s) URL, lowercase host,
/// default port dropped, any path prefix cleaned, no trailing slash.
pub fn normalize_host(host: &str) -> Result<String, EndpointError> {
    let invalid = |reason: &str| EndpointError::InvalidHost {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(host).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    let prefix = clean_segments(url.path());
    let mut normalized = url.origin().ascii_serialization();
    for seg in prefix {
        normalized.push('/');
        normalized.push_str(seg);
    }
    Ok(normalized)
}

/// Normalize a feature root to a cleaned, rooted path (`"v1/"` -> `"/v1"`).
pub fn normalize_feature(root: &str) -> String {
    let segments = clean_segments(root);
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().map(|seg| format!("/{}", seg)).collect()
}

/// Join host, feature root and template into the URL a fingerprint covers.
pub fn canonical_url(
    host: &str,
    feature: &str,
    template: &PathTemplate,
) -> Result<Url, EndpointError> {
    let host = normalize_host(host)?;
    let joined = format!("{}/{}/{}", host, feature, template.as_str());

    // Re-clean only the path part; the scheme's `//` must survive.
    let origin_len = host.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = host[origin_len..]
        .find('/')
        .map(|i| origin_len + i)
        .unwrap_or(host.len());
    let mut path = String::new();
    for seg in clean_segments(&joined[path_start..]) {
        path.push('/');
        path.push_str(seg);
    }
    if path.is_empty() {
        path.push('/');
    }
    let uri = format!("{}{}", &host[..path_start], path);

    let url = Url::parse(&uri).map_err(|e| EndpointError::InvalidUri {
        uri: uri.clone(),
        reason: e.to_string(),
    })?;
    if url.path() != path {
        return Err(EndpointError::InvalidUri {
            uri,
            reason: "path contains characters that must be percent-encoded".to_string(),
        });
    }
    Ok(url)
}

/// A concrete incoming request, resolved to the endpoint it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedEndpoint {
    pub method: HttpMethod,
    /// `scheme://host[:port]` of the request.
    pub host: String,
    /// Path up to and including the first `v<N>` segment.
    pub feature: String,
    /// Remainder with every resource-id slot wildcarded.
    pub template: PathTemplate,
    /// Concrete remainder; this is what access rules are checked against.
    pub subset: String,
    pub fingerprint: EndpointFingerprint,
}

impl RequestedEndpoint {
    pub fn resolve(method: HttpMethod, requested_url: &str) -> Result<Self, EndpointError> {
        let invalid = |reason: String| EndpointError::InvalidRequestUrl {
            url: requested_url.to_string(),
            reason,
        };

        let url = Url::parse(requested_url).map_err(|e| invalid(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        let host = url.origin().ascii_serialization();

        let segments = clean_segments(url.path());
        let version_at = segments
            .iter()
            .position(|seg| is_version_segment(seg))
            .ok_or_else(|| EndpointError::MissingVersionSegment {
                path: url.path().to_string(),
            })?;

        let feature = normalize_feature(&segments[..=version_at].join("/"));
        let subset = normalize_feature(&segments[version_at + 1..].join("/"));
        let template = PathTemplate::from_concrete(&subset);
        let fingerprint = EndpointFingerprint::compute(method, &host, &feature, &template)?;

        Ok(Self {
            method,
            host,
            feature,
            template,
            subset,
            fingerprint,
        })
    }
}

/// `v` followed by one or more ASCII digits, as a whole segment.
fn is_version_segment(seg: &str) -> bool {
    seg.strip_prefix('v')
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://api.example.com";

    fn fp(method: HttpMethod, host: &str, feature: &str, path: &str) -> EndpointFingerprint {
        EndpointFingerprint::compute(method, host, feature, &PathTemplate::parse(path)).unwrap()
    }

    #[test]
    fn digest_is_sha256_of_method_and_canonical_url() {
        let fingerprint = fp(HttpMethod::Get, HOST, "/v1", "/users/:id");
        assert_eq!(
            fingerprint.to_string(),
            "adec2a8bfa3d2a89e775da60b5ec921b2c7856af9a0b384ff66b0e7d9ec8931d"
        );
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(
            fp(HttpMethod::Post, HOST, "/v2", "/orders"),
            fp(HttpMethod::Post, HOST, "/v2", "/orders")
        );
    }

    #[test]
    fn parameter_names_do_not_affect_identity() {
        assert_eq!(
            fp(HttpMethod::Get, HOST, "/v1", "/users/:id"),
            fp(HttpMethod::Get, HOST, "/v1", "/users/:user_id")
        );
    }

    #[test]
    fn method_is_part_of_identity() {
        assert_ne!(
            fp(HttpMethod::Get, HOST, "/v1", "/users"),
            fp(HttpMethod::Post, HOST, "/v1", "/users")
        );
    }

    #[test]
    fn equivalent_host_spellings_collide() {
        let base = fp(HttpMethod::Get, HOST, "/v1", "/users");
        assert_eq!(base, fp(HttpMethod::Get, "https://API.example.com/", "/v1", "/users"));
        assert_eq!(base, fp(HttpMethod::Get, "https://api.example.com:443", "v1/", "users/"));
    }

    #[test]
    fn canonical_url_joins_and_cleans() {
        let template = PathTemplate::parse("/a/:b");
        let url = canonical_url("https://example.com/svc/", "//v1/", &template).unwrap();
        assert_eq!(url.as_str(), "https://example.com/svc/v1/a/*");
    }

    #[test]
    fn invalid_host_is_configuration_error() {
        for host in ["not a url", "ftp://example.com", "/relative"] {
            let template = PathTemplate::parse("/x");
            let err = EndpointFingerprint::compute(HttpMethod::Get, host, "/v1", &template)
                .unwrap_err();
            assert!(err.is_configuration(), "{}: {}", host, err);
        }
    }

    #[test]
    fn unencodable_template_is_invalid_uri() {
        let template = PathTemplate::parse("/a b");
        let err =
            EndpointFingerprint::compute(HttpMethod::Get, HOST, "/v1", &template).unwrap_err();
        assert!(matches!(err, EndpointError::InvalidUri { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn hex_form_parses_back() {
        let fingerprint = fp(HttpMethod::Delete, HOST, "/v1", "/users/:id");
        let parsed: EndpointFingerprint = fingerprint.to_string().parse().unwrap();
        assert_eq!(parsed, fingerprint);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!("abc".parse::<EndpointFingerprint>().is_err());
        assert!("zz".repeat(32).parse::<EndpointFingerprint>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let fingerprint = EndpointFingerprint::from_bytes([0xab; 32]);
        let json = serde_json::to_value(fingerprint).unwrap();
        assert_eq!(json, serde_json::Value::String("ab".repeat(32)));
        let back: EndpointFingerprint = serde_json::from_value(json).unwrap();
        assert_eq!(back, fingerprint);
    }

    #[test]
    fn zero_fingerprint_means_unassigned() {
        assert!(EndpointFingerprint::default().is_zero());
        assert!(!fp(HttpMethod::Get, HOST, "/v1", "/").is_zero());
    }

    // ── Requested URL resolution ──

    #[test]
    fn resolve_splits_on_version_segment() {
        let url = "https://api.example.com/v1/users/42?expand=1";
        let requested = RequestedEndpoint::resolve(HttpMethod::Get, url).unwrap();
        assert_eq!(requested.host, "https://api.example.com");
        assert_eq!(requested.feature, "/v1");
        assert_eq!(requested.template.as_str(), "/users/*");
        assert_eq!(requested.subset, "/users/42");
    }

    #[test]
    fn resolved_request_matches_declared_fingerprint() {
        let declared = fp(HttpMethod::Get, HOST, "/v1", "/users/:id");
        let url = "https://api.example.com/v1/users/42";
        let requested = RequestedEndpoint::resolve(HttpMethod::Get, url).unwrap();
        assert_eq!(requested.fingerprint, declared);
    }

    #[test]
    fn differing_resource_ids_share_a_fingerprint() {
        let a = RequestedEndpoint::resolve(HttpMethod::Get, "https://h.io/v3/a/1/b/2").unwrap();
        let b = RequestedEndpoint::resolve(HttpMethod::Get, "https://h.io/v3/a/9/b/8").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.subset, b.subset);
    }

    #[test]
    fn feature_root_may_have_a_prefix() {
        let url = "https://h.io/billing/v2/invoices";
        let requested = RequestedEndpoint::resolve(HttpMethod::Get, url).unwrap();
        assert_eq!(requested.feature, "/billing/v2");
        assert_eq!(requested.subset, "/invoices");
        assert_eq!(
            requested.fingerprint,
            fp(HttpMethod::Get, "https://h.io", "/billing/v2", "/invoices")
        );
    }

    #[test]
    fn request_at_feature_root_has_root_subset() {
        let requested = RequestedEndpoint::resolve(HttpMethod::Get, "https://h.io/v1").unwrap();
        assert_eq!(requested.subset, "/");
        assert_eq!(requested.template.as_str(), "/");
    }

    #[test]
    fn version_marker_must_be_a_whole_segment() {
        let url = "https://h.io/video/v1x/items";
        let err = RequestedEndpoint::resolve(HttpMethod::Get, url).unwrap_err();
        assert!(matches!(err, EndpointError::MissingVersionSegment { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn malformed_request_url_is_validation_error() {
        let err = RequestedEndpoint::resolve(HttpMethod::Get, "/v1/users").unwrap_err();
        assert!(matches!(err, EndpointError::InvalidRequestUrl { .. }));
        assert!(err.is_validation());
    }
}
