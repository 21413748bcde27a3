// fingerprint.rs: Fingerprint of an endpoint declaration.

use serde_json::{json, Value};
use sg_endpoint::{canonical_url, normalize_feature, EndpointFingerprint, HttpMethod, PathTemplate};

pub fn execute(host: &str, feature: &str, method: HttpMethod, path: &str) -> anyhow::Result<()> {
    let described = describe(host, feature, method, path)?;
    println!("{}", serde_json::to_string_pretty(&described)?);
    Ok(())
}

fn describe(host: &str, feature: &str, method: HttpMethod, path: &str) -> anyhow::Result<Value> {
    let feature = normalize_feature(feature);
    let template = PathTemplate::parse(path);
    let url = canonical_url(host, &feature, &template)?;
    let fingerprint = EndpointFingerprint::compute(method, host, &feature, &template)?;
    Ok(json!({
        "method": method,
        "url": url.as_str(),
        "feature": feature,
        "template": template.as_str(),
        "params": template.param_names(),
        "fingerprint": fingerprint,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_declaration() {
        let v = describe("https://api.example.com/", "v1", HttpMethod::Get, "/users/:id").unwrap();
        assert_eq!(v["url"], "https://api.example.com/v1/users/*");
        assert_eq!(v["template"], "/users/*");
        assert_eq!(v["params"], json!(["id"]));
        assert_eq!(
            v["fingerprint"],
            "adec2a8bfa3d2a89e775da60b5ec921b2c7856af9a0b384ff66b0e7d9ec8931d"
        );
    }

    #[test]
    fn rejects_bad_host() {
        assert!(describe("not a host", "/v1", HttpMethod::Get, "/users").is_err());
    }
}
