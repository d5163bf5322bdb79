//! Heroku Platform API provider

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use rustls::ClientConfig;
use serde_json::{json, Value};
use tracing::debug;

use super::input::SiteRequest;
use super::provider::Provider;
use super::rendezvous;
use crate::domain::{CliError, ProvisioningJob};

const API_VERSION: &str = "application/vnd.heroku+json; version=3";

/// One-off dynos can run well past the HTTP timeout
const SESSION_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for [`HerokuClient`]
#[derive(Debug, Clone)]
pub struct HerokuSettings {
    pub api_url: String,
    pub source_blob_url: String,
    pub timeout: Duration,
}

pub struct HerokuClient {
    http: Client,
    stream: Client,
    tls: Arc<ClientConfig>,
    api_url: String,
    source_blob_url: String,
}

impl HerokuClient {
    pub fn new(settings: &HerokuSettings, token: &str) -> Result<Self, CliError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| CliError::validation("heroku token", "contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let user_agent = concat!("metaci-cli/", env!("CARGO_PKG_VERSION"));
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        // Build logs stay open until the build finishes
        let stream = Client::builder()
            .timeout(None)
            .connect_timeout(settings.timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            stream,
            tls: rendezvous::webpki_config()?,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            source_blob_url: settings.source_blob_url.clone(),
        })
    }

    /// Replaces the TLS settings used to attach to one-off dynos
    pub fn with_tls(mut self, tls: Arc<ClientConfig>) -> Self {
        self.tls = tls;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn send(&self, request: RequestBuilder, expected: StatusCode) -> Result<Value, CliError> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if status != expected {
            return Err(CliError::remote(status.as_u16(), body));
        }
        serde_json::from_str(&body).map_err(|_| CliError::remote(status.as_u16(), body))
    }

    fn setup_payload(&self, request: &SiteRequest) -> Value {
        json!({
            "app": {"name": request.app_name},
            "source_blob": {"url": self.source_blob_url},
            "overrides": {"env": request.env},
        })
    }
}

impl Provider for HerokuClient {
    fn create_app_setup(&self, request: &SiteRequest) -> Result<ProvisioningJob, CliError> {
        let url = self.url("/app-setups");
        debug!(%url, app = %request.app_name, "POST");
        let body = self.send(
            self.http.post(&url).json(&self.setup_payload(request)),
            StatusCode::ACCEPTED,
        )?;
        ProvisioningJob::from_value(body)
    }

    fn app_setup(&self, id: &str) -> Result<ProvisioningJob, CliError> {
        let url = self.url(&format!("/app-setups/{}", id));
        debug!(%url, "GET");
        let body = self.send(self.http.get(&url), StatusCode::OK)?;
        ProvisioningJob::from_value(body)
    }

    fn build(&self, app_id: Option<&str>, build_id: &str) -> Result<Value, CliError> {
        let url = match app_id {
            Some(app) => self.url(&format!("/apps/{}/builds/{}", app, build_id)),
            None => self.url(&format!("/builds/{}", build_id)),
        };
        debug!(%url, "GET");
        self.send(self.http.get(&url), StatusCode::OK)
    }

    fn stream_output(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), CliError> {
        debug!(%url, "streaming build output");
        let mut response: Response = self.stream.get(url).send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(CliError::remote(status, response.text()?));
        }

        let mut buf = [0u8; 4096];
        loop {
            let n = response.read(&mut buf).map_err(CliError::network)?;
            if n == 0 {
                return Ok(());
            }
            sink(&buf[..n]);
        }
    }

    fn run_command(
        &self,
        app_id: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<String, CliError> {
        let url = self.url(&format!("/apps/{}/dynos", app_id));
        debug!(%url, %command, "POST");
        let payload = json!({
            "command": command,
            "attach": true,
            "env": env,
            "type": "run",
        });
        let dyno = self.send(self.http.post(&url).json(&payload), StatusCode::CREATED)?;

        let attach_url = dyno
            .get("attach_url")
            .and_then(Value::as_str)
            .ok_or_else(|| CliError::remote(201, format!("Dyno response has no attach_url: {}", dyno)))?;
        rendezvous::read_session(attach_url, self.tls.clone(), SESSION_READ_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AppShape;

    fn client() -> HerokuClient {
        HerokuClient::new(
            &HerokuSettings {
                api_url: "https://api.heroku.com/".into(),
                source_blob_url: "https://example.com/tarball/main/".into(),
                timeout: Duration::from_secs(5),
            },
            "secret",
        )
        .unwrap()
    }

    #[test]
    fn payload_carries_name_blob_and_env() {
        let mut env = BTreeMap::new();
        env.insert("SITE_URL".to_string(), "https://ci.herokuapp.com".to_string());
        let request = SiteRequest {
            provider_token: "secret".into(),
            app_name: "ci".into(),
            shape: AppShape::Dev,
            site_url: "https://ci.herokuapp.com".into(),
            env,
        };

        let payload = client().setup_payload(&request);
        assert_eq!(payload["app"]["name"], "ci");
        assert_eq!(payload["source_blob"]["url"], "https://example.com/tarball/main/");
        assert_eq!(payload["overrides"]["env"]["SITE_URL"], "https://ci.herokuapp.com");
    }

    #[test]
    fn urls_are_rooted_at_api() {
        assert_eq!(client().url("/app-setups"), "https://api.heroku.com/app-setups");
    }

    #[test]
    fn rejects_token_with_newline() {
        let err = HerokuClient::new(
            &HerokuSettings {
                api_url: "https://api.heroku.com".into(),
                source_blob_url: String::new(),
                timeout: Duration::from_secs(5),
            },
            "bad\ntoken",
        )
        .err()
        .unwrap();
        assert_eq!(err.step(), Some("heroku token"));
    }

    #[test]
    fn unreachable_stream_host_gives_up() {
        let client = HerokuClient::new(
            &HerokuSettings {
                api_url: "https://api.heroku.com".into(),
                source_blob_url: String::new(),
                timeout: Duration::from_millis(200),
            },
            "secret",
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = client
            .stream_output("http://10.255.255.1:81/streams/build-1", &mut |_| {})
            .unwrap_err();

        assert!(matches!(err, CliError::Network(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
