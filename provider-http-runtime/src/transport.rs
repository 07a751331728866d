//! Generic outbound HTTP transport: the transport the reconcilers use to
//! call the third-party API, distinct from the apiserver transport
//! `kube::Client` builds internally.
use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Request as HttpRequest};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;

use crate::error::{Error, Result};

/// A fully-resolved outbound HTTP call: method, URL, body, and headers,
/// after template substitution has been applied.
#[derive(Clone, Debug, Default)]
pub struct OutboundRequest {
    pub method: http::Method,
    pub url: String,
    pub body: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

/// What came back: status code, body, and headers, shaped to match
/// [`provider_http_api::ResponseState`].
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Thin wrapper around a `hyper_util` legacy client configured with a given
/// TLS client config, plus the bearer token and deadline this call carries.
pub struct Transport {
    client: LegacyClient<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Transport {
    pub fn new(tls_config: ClientConfig) -> Self {
        let https = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();
        let client = LegacyClient::builder(TokioExecutor::new()).build(https);
        Self { client }
    }

    /// Issue `req`, injecting `bearer_token` as an `Authorization` header
    /// when present, and bounding the call with `wait_timeout` if given.
    pub async fn send(
        &self,
        req: OutboundRequest,
        bearer_token: Option<&str>,
        wait_timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let uri: http::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = HttpRequest::builder().method(req.method.clone()).uri(uri);
        for (name, values) in &req.headers {
            for value in values {
                let header_name = HeaderName::try_from(name.as_str())
                    .map_err(|e| Error::Transport(format!("invalid header name {name}: {e}")))?;
                let header_value = HeaderValue::try_from(value.as_str())
                    .map_err(|e| Error::Transport(format!("invalid header value for {name}: {e}")))?;
                builder = builder.header(header_name, header_value);
            }
        }
        let has_authorization = req.headers.keys().any(|name| name.eq_ignore_ascii_case("authorization"));
        if let Some(token) = bearer_token {
            if !has_authorization && !token.is_empty() {
                builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        let http_req = builder
            .body(Full::new(Bytes::from(req.body.clone())))
            .map_err(|e| Error::Transport(e.to_string()))?;

        let call = self.client.request(http_req);
        let response = match wait_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| Error::Transport("request timed out".into()))?
                .map_err(|e| Error::Transport(e.to_string()))?,
            None => call.await.map_err(|e| Error::Transport(e.to_string()))?,
        };

        let status_code = response.status().as_u16();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.entry(name.to_string()).or_default().push(value.to_string());
            }
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .to_bytes();
        let body = String::from_utf8_lossy(&body_bytes).into_owned();

        Ok(RawResponse {
            status_code,
            body,
            headers,
        })
    }
}
