use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::bridge::envelope::{failure_message, parse_legacy, parse_modern};
use crate::bridge::throttle::{CallWeight, Throttle, ThrottlePolicy};
use crate::bridge::{Api, Bridge, Reply};
use crate::error::{BulbError, Result};

const APPLICATION_KEY_HEADER: &str = "hue-application-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the bridge is and who we are to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub host: String,
    pub username: String,
    /// Accept the bridge's self-signed certificate.
    pub insecure: bool,
    pub timeout: Duration,
    pub throttle: ThrottlePolicy,
}

impl BridgeConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: normalize_host(&host.into()),
            username: username.into(),
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
            throttle: ThrottlePolicy::default(),
        }
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Strip any scheme and trailing slashes the operator typed.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

/// Rewrite a plain-HTTP URL to HTTPS; the bridge only serves its APIs over TLS.
pub fn ensure_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// The modern API wants the application key on everything except plain GETs,
/// and on GETs of the `resource` collections as well.
pub fn needs_application_key(api: Api, method: &Method, path: &str) -> bool {
    match api {
        Api::Legacy => false,
        Api::Modern => *method != Method::GET || path.starts_with("resource"),
    }
}

pub struct HttpBridge {
    client: Client,
    config: BridgeConfig,
    throttle: Throttle,
}

impl HttpBridge {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;
        Ok(Self {
            client,
            throttle: Throttle::new(config.throttle),
            config,
        })
    }

    pub fn url(&self, api: Api, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let url = match api {
            Api::Legacy => format!(
                "https://{}/api/{}/{}",
                self.config.host, self.config.username, path
            ),
            Api::Modern => format!("https://{}/clip/v2/{}", self.config.host, path),
        };
        ensure_https(&url)
    }

    async fn send(&self, api: Api, method: Method, path: &str, body: Option<Value>) -> Result<Reply> {
        let url = self.url(api, path);
        let mut request = self.client.request(method.clone(), &url);
        if needs_application_key(api, &method, path) {
            request = request.header(APPLICATION_KEY_HEADER, &self.config.username);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(&self.config.host, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&self.config.host, e))?;

        classify_status(status, url, &text)?;
        parse_body(api, &text)
    }
}

/// Map a non-2xx status to its error; 2xx passes.
fn classify_status(status: StatusCode, url: String, text: &str) -> Result<()> {
    match status {
        StatusCode::FORBIDDEN => Err(BulbError::Forbidden(url)),
        StatusCode::NOT_FOUND => Err(BulbError::NotFound(url)),
        s if !s.is_success() => Err(BulbError::Status {
            status: s.as_u16(),
            url,
            message: failure_message(text),
        }),
        _ => Ok(()),
    }
}

/// Decode a 2xx body and unwrap the envelope of `api`.
fn parse_body(api: Api, text: &str) -> Result<Reply> {
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text)?
    };
    match api {
        Api::Legacy => parse_legacy(body),
        Api::Modern => parse_modern(body),
    }
}

#[async_trait]
impl Bridge for HttpBridge {
    async fn get(&self, api: Api, path: &str) -> Result<Reply> {
        self.send(api, Method::GET, path, None).await
    }

    async fn put(&self, api: Api, path: &str, body: Value, weight: CallWeight) -> Result<Reply> {
        let _permit = self.throttle.acquire(weight).await;
        self.send(api, Method::PUT, path, Some(body)).await
    }
}

fn classify_transport_error(host: &str, err: reqwest::Error) -> BulbError {
    if err.is_timeout() {
        return BulbError::Timeout {
            host: host.to_string(),
        };
    }
    let chain = error_chain(&err);
    if let Some(reason) = chain.iter().find(|m| looks_like_tls_failure(m)) {
        return BulbError::UntrustedCertificate {
            host: host.to_string(),
            reason: reason.clone(),
        };
    }
    if err.is_connect() {
        return BulbError::Unreachable {
            host: host.to_string(),
            reason: chain.last().cloned().unwrap_or_else(|| err.to_string()),
        };
    }
    BulbError::Http(err)
}

fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        messages.push(inner.to_string());
        source = inner.source();
    }
    messages
}

fn looks_like_tls_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("certificate") || lower.contains("self signed") || lower.contains("self-signed")
}
