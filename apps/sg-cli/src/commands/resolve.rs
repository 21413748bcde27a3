// resolve.rs: How a concrete request URL maps onto a declared endpoint.

use serde_json::{json, Value};
use sg_endpoint::{HttpMethod, RequestedEndpoint};

pub fn execute(method: HttpMethod, url: &str) -> anyhow::Result<()> {
    let resolved = describe(method, url)?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn describe(method: HttpMethod, url: &str) -> anyhow::Result<Value> {
    let requested = RequestedEndpoint::resolve(method, url)?;
    Ok(json!({
        "method": requested.method,
        "host": requested.host,
        "feature": requested.feature,
        "template": requested.template.as_str(),
        "subset": requested.subset,
        "fingerprint": requested.fingerprint,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_collides_with_declaration() {
        let v = describe(HttpMethod::Get, "https://api.example.com/v1/users/42").unwrap();
        assert_eq!(v["feature"], "/v1");
        assert_eq!(v["template"], "/users/*");
        assert_eq!(v["subset"], "/users/42");
        assert_eq!(
            v["fingerprint"],
            "adec2a8bfa3d2a89e775da60b5ec921b2c7856af9a0b384ff66b0e7d9ec8931d"
        );
    }

    #[test]
    fn unversioned_url_fails() {
        let err = describe(HttpMethod::Get, "https://api.example.com/users/42").unwrap_err();
        assert!(err.to_string().contains("version"));
    }
}
