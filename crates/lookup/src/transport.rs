//! Transport trait and the `reqwest`-backed implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use voidcheck_core::{Config, Indicator};

use crate::error::LookupError;
use crate::request::{HttpMethod, LookupRequest};

/// Errors raised while talking to the upstream API, before any status is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("HTTP request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Status, headers and (when it parsed as JSON) body of one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
    /// Header names are stored lower-cased.
    pub headers: HashMap<String, String>,
}

impl RawResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Exactly one per issued request, tagged with the indicator it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOutcome {
    pub indicator: Indicator,
    pub result: Result<RawResponse, TransportError>,
}

/// Sends one built request. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &LookupRequest) -> Result<RawResponse, TransportError>;

    /// Human-readable name for logs (e.g., "http").
    fn transport_name(&self) -> &str;
}

/// Resolved client settings plus TLS material the caller has already loaded.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub reject_unauthorized: bool,
    /// PEM-encoded CA bundle added to the trust store.
    pub ca_pem: Option<Vec<u8>>,
    /// PEM-encoded client certificate followed by its private key.
    pub identity_pem: Option<Vec<u8>>,
    pub passphrase: Option<String>,
}

impl TransportOptions {
    /// Options from config, without any TLS material attached yet.
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.lookup.timeout_secs),
            proxy: config.tls.proxy.clone(),
            reject_unauthorized: config.tls.reject_unauthorized,
            ca_pem: None,
            identity_pem: None,
            passphrase: config.tls.passphrase.clone(),
        }
    }

    pub fn with_ca_pem(mut self, pem: Vec<u8>) -> Self {
        self.ca_pem = Some(pem);
        self
    }

    pub fn with_identity_pem(mut self, pem: Vec<u8>) -> Self {
        self.identity_pem = Some(pem);
        self
    }
}

/// Sends lookups over HTTPS with a single pooled client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(options.timeout);

        // Only the configured proxy is used, never the process environment's.
        match options.proxy {
            Some(ref proxy) => {
                let proxy = reqwest::Proxy::all(proxy)
                    .map_err(|e| LookupError::Client(format!("invalid proxy '{proxy}': {e}")))?;
                builder = builder.proxy(proxy);
            }
            None => builder = builder.no_proxy(),
        }

        if let Some(ref pem) = options.ca_pem {
            let ca = reqwest::Certificate::from_pem(pem)
                .map_err(|e| LookupError::Client(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(ca);
        }

        if let Some(ref pem) = options.identity_pem {
            if options.passphrase.is_some() {
                tracing::warn!("encrypted client keys are not supported, passphrase ignored");
            }
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|e| LookupError::Client(format!("invalid client identity: {e}")))?;
            builder = builder.identity(identity);
        }

        if !options.reject_unauthorized {
            tracing::warn!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| LookupError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &LookupRequest) -> Result<RawResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = response.text().await?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                if !text.is_empty() {
                    tracing::debug!(
                        indicator = %request.indicator.value,
                        status,
                        error = %e,
                        "response body is not JSON"
                    );
                }
                None
            }
        };

        tracing::debug!(
            indicator = %request.indicator.value,
            status,
            "response received"
        );

        Ok(RawResponse {
            status,
            body,
            headers,
        })
    }

    fn transport_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use voidcheck_core::{ApiConfig, AuthScheme, SchemaVersion};

    use crate::request::RequestBuilder;

    fn options() -> TransportOptions {
        TransportOptions::from_config(&Config::default())
    }

    /// Accept one connection, answer it with `response`, and hand back the
    /// raw request bytes as text.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8(buf).unwrap()
        });

        (format!("http://{addr}"), handle)
    }

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        let length = body.len();
        format!(
            "HTTP/1.1 {status}\r\n{extra_headers}Content-Length: {length}\r\n\
             Connection: close\r\n\r\n{body}"
        )
    }

    #[tokio::test]
    async fn post_lookup_reaches_the_wire() {
        let body = json!({"blacklists": {"detections": 1}}).to_string();
        let (url, server) = serve_once(http_response(
            "200 OK",
            "Content-Type: application/json\r\nX-RateLimit-Quota: limit=10;used=1\r\n",
            &body,
        ))
        .await;
        let builder = RequestBuilder::new(&ApiConfig {
            url,
            api_key: Some("k3y".into()),
            ..ApiConfig::default()
        });
        let request = builder.build(&Indicator::domain("example.com")).unwrap();

        let raw = HttpTransport::new(&options()).unwrap().send(&request).await.unwrap();
        let received = server.await.unwrap();

        assert!(received.starts_with("POST /v2/domain-reputation HTTP/1.1\r\n"));
        let lowered = received.to_lowercase();
        assert!(lowered.contains("x-api-key: k3y\r\n"));
        assert!(lowered.contains("content-type: application/json\r\n"));
        assert!(received.ends_with(r#"{"host":"example.com"}"#));

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, Some(json!({"blacklists": {"detections": 1}})));
        assert_eq!(raw.header("x-ratelimit-quota"), Some("limit=10;used=1"));
    }

    #[tokio::test]
    async fn get_lookup_carries_query_and_tolerates_non_json() {
        let (url, server) =
            serve_once(http_response("502 Bad Gateway", "", "<html>bad gateway</html>")).await;
        let builder = RequestBuilder::new(&ApiConfig {
            url,
            api_key: Some("k3y".into()),
            auth: AuthScheme::query(),
            schema: SchemaVersion::Envelope,
            ..ApiConfig::default()
        });
        let request = builder.build(&Indicator::ipv4("8.8.8.8")).unwrap();

        let raw = HttpTransport::new(&options()).unwrap().send(&request).await.unwrap();
        let received = server.await.unwrap();

        let request_line = received.lines().next().unwrap();
        assert!(request_line.starts_with("GET /iprep/v1/pay-as-you-go/?"));
        assert!(request_line.contains("key=k3y"));
        assert!(request_line.contains("ip=8.8.8.8"));

        assert_eq!(raw.status, 502);
        assert!(raw.body.is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let builder = RequestBuilder::new(&ApiConfig {
            url: format!("http://{addr}"),
            api_key: Some("k3y".into()),
            ..ApiConfig::default()
        });
        let request = builder.build(&Indicator::ipv4("8.8.8.8")).unwrap();

        let err = HttpTransport::new(&options()).unwrap().send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got: {err:?}");
    }

    #[test]
    fn builds_default_client() {
        assert!(HttpTransport::new(&options()).is_ok());
    }

    #[test]
    fn builds_with_proxy_and_insecure_tls() {
        let mut opts = options();
        opts.proxy = Some("http://proxy.internal:3128".into());
        opts.reject_unauthorized = false;
        assert!(HttpTransport::new(&opts).is_ok());
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.lookup.timeout_secs = 7;
        config.tls.reject_unauthorized = false;
        let opts = TransportOptions::from_config(&config);
        assert_eq!(opts.timeout, Duration::from_secs(7));
        assert!(!opts.reject_unauthorized);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let raw = RawResponse::json(200, Value::Null).with_header("X-RateLimit-Quota", "a=1");
        assert_eq!(raw.header("x-ratelimit-quota"), Some("a=1"));
        assert_eq!(raw.header("X-RATELIMIT-QUOTA"), Some("a=1"));
    }
}
