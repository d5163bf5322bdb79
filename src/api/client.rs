//! HTTP client for the site API
//!
//! Every call goes to `{site}/api/{resource}/` with the stored token as a
//! bearer credential. `list` is a GET with the params as query string and
//! follows `next` links on the same site, visiting each page at most once;
//! `create` POSTs the params as a JSON body.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{CliError, ServiceCredential};
use crate::storage::{site_credential, Keychain};

/// Request parameters; passed through to the site untouched
pub type Params = Map<String, Value>;

/// Anything that can execute a resource/action call against the site
pub trait SiteApi {
    fn call(&self, resource: &str, action: &str, params: &Params) -> Result<Value, CliError>;
}

/// Supported actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
    List,
    Create,
}

impl ApiAction {
    pub fn parse(action: &str) -> Result<Self, CliError> {
        match action {
            "list" => Ok(ApiAction::List),
            "create" => Ok(ApiAction::Create),
            other => Err(CliError::validation(
                "api action",
                format!("'{}' is not supported (expected list or create)", other),
            )),
        }
    }
}

/// Authenticated client bound to one site
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(credential: &ServiceCredential, timeout: Duration) -> Result<Self, CliError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("metaci-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: credential.url.trim_end_matches('/').to_string(),
            token: credential.token.clone(),
        })
    }

    /// Builds a client for the site stored in the keychain
    pub fn from_keychain(keychain: &dyn Keychain, timeout: Duration) -> anyhow::Result<Self> {
        let credential = site_credential(keychain)?.ok_or_else(CliError::no_site)?;
        Ok(Self::new(&credential, timeout)?)
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/api/{}/", self.base_url, resource.trim_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, CliError> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(CliError::remote(status.as_u16(), body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|_| CliError::remote(status.as_u16(), body))
    }

    fn list(&self, resource: &str, params: &Params) -> Result<Value, CliError> {
        let query: Vec<(String, String)> = params
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), query_value(v)))
            .collect();

        let url = self.endpoint(resource);
        debug!(%url, ?query, "GET");
        let mut page = self.send(self.http.get(&url).query(&query))?;

        // Unpaginated endpoints return a bare list
        if !page.is_object() {
            return Ok(page);
        }

        let mut results = take_results(&mut page);
        let mut visited = HashSet::new();
        while let Some(next) = page.get("next").and_then(Value::as_str).map(String::from) {
            let next = self.next_page(&url, &next)?;
            if !visited.insert(next.clone()) {
                return Err(CliError::remote(
                    200,
                    format!("Pagination loops back to {}", next),
                ));
            }
            debug!(url = %next, "GET next page");
            page = self.send(self.http.get(next))?;
            results.extend(take_results(&mut page));
        }

        let mut merged = Map::new();
        merged.insert("count".into(), Value::from(results.len()));
        merged.insert("results".into(), Value::Array(results));
        Ok(Value::Object(merged))
    }

    /// Resolves a `next` link, refusing any that leave the site
    fn next_page(&self, current: &str, next: &str) -> Result<Url, CliError> {
        let invalid = |reason: &str| CliError::remote(200, format!("Invalid next page '{}': {}", next, reason));

        let base = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        let url = Url::parse(current)
            .and_then(|current| current.join(next))
            .map_err(|e| invalid(&e.to_string()))?;
        if url.origin() != base.origin() {
            return Err(invalid("points outside the site"));
        }
        Ok(url)
    }

    fn create(&self, resource: &str, params: &Params) -> Result<Value, CliError> {
        let url = self.endpoint(resource);
        debug!(%url, "POST");
        self.send(self.http.post(&url).json(params))
    }
}

impl SiteApi for ApiClient {
    fn call(&self, resource: &str, action: &str, params: &Params) -> Result<Value, CliError> {
        match ApiAction::parse(action)? {
            ApiAction::List => self.list(resource, params),
            ApiAction::Create => self.create(resource, params),
        }
    }
}

fn take_results(page: &mut Value) -> Vec<Value> {
    match page.get_mut("results").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_supported_actions() {
        assert_eq!(ApiAction::parse("list").unwrap(), ApiAction::List);
        assert_eq!(ApiAction::parse("create").unwrap(), ApiAction::Create);
        assert_eq!(ApiAction::parse("delete").unwrap_err().step(), Some("api action"));
    }

    #[test]
    fn endpoint_normalizes_slashes() {
        let cred = ServiceCredential::new("https://ci.example.com/", "t");
        let client = ApiClient::new(&cred, Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint("plans"), "https://ci.example.com/api/plans/");
        assert_eq!(client.endpoint("/orgs/"), "https://ci.example.com/api/orgs/");
    }

    #[test]
    fn next_page_stays_on_the_site() {
        let cred = ServiceCredential::new("https://ci.example.com", "t");
        let client = ApiClient::new(&cred, Duration::from_secs(5)).unwrap();
        let current = "https://ci.example.com/api/plans/";

        assert_eq!(
            client.next_page(current, "https://ci.example.com/api/plans/?page=2").unwrap().as_str(),
            "https://ci.example.com/api/plans/?page=2"
        );
        assert_eq!(
            client.next_page(current, "?page=3").unwrap().as_str(),
            "https://ci.example.com/api/plans/?page=3"
        );
        assert!(client.next_page(current, "https://evil.example.net/api/plans/?page=2").is_err());
        assert!(client.next_page(current, "http://ci.example.com/api/plans/?page=2").is_err());
    }

    #[test]
    fn query_values_are_unquoted_strings() {
        assert_eq!(query_value(&json!("Cumulus")), "Cumulus");
        assert_eq!(query_value(&json!(12)), "12");
        assert_eq!(query_value(&json!(true)), "true");
    }

    #[test]
    fn take_results_handles_missing_key() {
        let mut page = json!({"results": [1, 2]});
        assert_eq!(take_results(&mut page).len(), 2);
        assert!(take_results(&mut json!({"detail": "x"})).is_empty());
    }

    #[test]
    fn client_requires_a_site() {
        let keychain = crate::storage::MemoryKeychain::new();
        let err = ApiClient::from_keychain(&keychain, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(err.to_string().contains("No site is currently connected"));
    }
}
