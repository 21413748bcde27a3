//! [`AuthorityClient`] over HTTP+JSON, using a blocking `reqwest` client.
//!
//! | Operation          | Request                                       | Success |
//! |--------------------|-----------------------------------------------|---------|
//! | register scopes    | `POST {resources}/scopes`                     | 201     |
//! | register endpoints | `POST {resources}/endpoints`                  | 201     |
//! | list endpoints     | `GET {resources}/endpoints?host=..`, then `paging.next` | 200 |
//! | commit rules       | `POST {permissions}/{kind}/{id}`              | 201     |
//! | check access       | `POST {permissions}/check`                    | 200     |

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sg_endpoint::{EndpointRecord, Scope};

use crate::client::AuthorityClient;
use crate::config::AuthorityConfig;
use crate::error::{AuthorityError, Result};
use crate::wire::{
    AccessCheck, AccessVerdict, ApiMessage, EndpointPage, RuleCommit, ACTING_IDENTITY_HEADER,
    ENDPOINT_ID_HEADER, SUBJECT_ID_HEADER,
};

pub struct HttpAuthority {
    config: AuthorityConfig,
    http: Client,
}

impl HttpAuthority {
    pub fn new(config: AuthorityConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AuthorityError::Config(format!("http client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response> {
        request.send().map_err(|e| AuthorityError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// POST a JSON body and require `201 Created`.
    fn create<T>(&self, operation: &str, url: &str, body: &T) -> Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        let response = self.send(url, self.http.post(url).json(body))?;
        expect(operation, response, StatusCode::CREATED).map(|_| ())
    }
}

fn expect(operation: &str, response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    Err(AuthorityError::Rejected {
        operation: operation.to_string(),
        status: status.as_u16(),
        message: error_message(response),
    })
}

/// The authority's `{"message": ..}`, or the raw body when it has none.
fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    serde_json::from_str::<ApiMessage>(&body)
        .ok()
        .map(|m| m.message)
        .filter(|m| !m.is_empty())
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.to_string())
}

fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let body = response.text().map_err(|e| AuthorityError::MalformedResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&body).map_err(|e| AuthorityError::MalformedResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

impl AuthorityClient for HttpAuthority {
    fn name(&self) -> &str {
        "http"
    }

    fn register_scopes(&self, scopes: &[Scope]) -> Result<()> {
        if scopes.is_empty() {
            tracing::debug!("no scopes to register");
            return Ok(());
        }
        let url = self.config.resources_url("scopes");
        self.create("scope registration", &url, scopes)?;
        tracing::info!(count = scopes.len(), "registered scopes");
        Ok(())
    }

    fn register_endpoints(&self, endpoints: &[EndpointRecord]) -> Result<()> {
        if endpoints.is_empty() {
            tracing::debug!("no endpoints to register");
            return Ok(());
        }
        let url = self.config.resources_url("endpoints");
        self.create("endpoint registration", &url, endpoints)?;
        tracing::info!(count = endpoints.len(), "registered endpoints");
        Ok(())
    }

    fn list_endpoints(&self, host: &str, cursor: Option<&str>) -> Result<EndpointPage> {
        let (url, request) = match cursor {
            Some(cursor) => {
                let url = self.config.cursor_url(cursor);
                let request = self.http.get(&url);
                (url, request)
            }
            None => {
                let url = self.config.resources_url("endpoints");
                let request = self.http.get(&url).query(&[("host", host)]);
                (url, request)
            }
        };
        let response = self.send(&url, request)?;
        let response = expect("endpoint listing", response, StatusCode::OK)?;
        let page: EndpointPage = decode(&url, response)?;
        tracing::debug!(
            %url,
            count = page.endpoints.len(),
            more = page.paging.next.is_some(),
            "fetched endpoint page"
        );
        Ok(page)
    }

    fn commit_rules(&self, commit: &RuleCommit) -> Result<()> {
        let url = self.config.permissions_url(&commit.subject.path());
        let mut request = self
            .http
            .post(&url)
            .header(ACTING_IDENTITY_HEADER, commit.acting_identity.to_string())
            .header(SUBJECT_ID_HEADER, commit.subject.id.to_string())
            .json(&commit.records);
        if let Some(origin) = commit.origin {
            request = request.header(ENDPOINT_ID_HEADER, origin.to_string());
        }
        let response = self.send(&url, request)?;
        expect("rule commit", response, StatusCode::CREATED)?;
        Ok(())
    }

    fn check_access(&self, check: &AccessCheck) -> Result<bool> {
        let url = self.config.permissions_url("check");
        let response = self.send(&url, self.http.post(&url).json(check))?;
        if !response.status().is_success() {
            return Err(AuthorityError::Forbidden {
                message: error_message(response),
            });
        }
        let verdict: AccessVerdict = decode(&url, response)?;
        Ok(verdict.can_access)
    }
}
