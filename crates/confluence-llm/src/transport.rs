//! HTTP collaborator behind the providers

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use serde_json::Value;

use crate::error::TransportError;

/// Response body as a stream of network reads
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// One outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body; `None` for GET
    pub body: Option<Value>,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
    /// Limit on establishing the connection alone
    pub connect_timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            timeout: None,
            connect_timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
            connect_timeout: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// Value of the first header named `name`, case-insensitive
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Sends requests on behalf of a provider
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST and read the whole body; non-2xx becomes [`TransportError::Status`]
    async fn post_json(&self, request: HttpRequest) -> Result<Bytes, TransportError>;

    /// POST and hand back the body as it arrives
    async fn post_stream(&self, request: HttpRequest) -> Result<ByteStream, TransportError>;

    /// GET and report the status code
    async fn get(&self, request: HttpRequest) -> Result<u16, TransportError>;

    /// GET and read the whole body; non-2xx becomes [`TransportError::Status`]
    async fn get_json(&self, request: HttpRequest) -> Result<Bytes, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Transport with a default per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Wrap an existing client
    ///
    /// Requests carrying their own connect timeout still get a dedicated client.
    pub const fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// reqwest only applies connect timeouts per client
    fn client_for(&self, request: &HttpRequest) -> Result<Client, TransportError> {
        match request.connect_timeout {
            Some(limit) => Client::builder()
                .connect_timeout(limit)
                .build()
                .map_err(|e| TransportError::Request(e.to_string())),
            None => Ok(self.client.clone()),
        }
    }

    fn build(&self, method: reqwest::Method, request: &HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self
            .client_for(request)?
            .request(method, &request.url)
            .timeout(request.timeout.unwrap_or(self.timeout));

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    async fn send(&self, method: reqwest::Method, request: &HttpRequest) -> Result<reqwest::Response, TransportError> {
        let response = self
            .build(method, request)?
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %request.url, status = %status, "upstream returned error");
            return Err(TransportError::status(status.as_u16(), &body));
        }

        Ok(response)
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_body() || error.is_decode() {
        TransportError::Body(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<Bytes, TransportError> {
        let response = self.send(reqwest::Method::POST, &request).await?;
        response.bytes().await.map_err(map_reqwest_error)
    }

    async fn post_stream(&self, request: HttpRequest) -> Result<ByteStream, TransportError> {
        let response = self.send(reqwest::Method::POST, &request).await?;
        Ok(response.bytes_stream().map(|read| read.map_err(map_reqwest_error)).boxed())
    }

    async fn get(&self, request: HttpRequest) -> Result<u16, TransportError> {
        let response = self
            .build(reqwest::Method::GET, &request)?
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Ok(response.status().as_u16())
    }

    async fn get_json(&self, request: HttpRequest) -> Result<Bytes, TransportError> {
        let response = self.send(reqwest::Method::GET, &request).await?;
        response.bytes().await.map_err(map_reqwest_error)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builder_collects_headers() {
        let request = HttpRequest::post("https://api.example.com/v1/messages", json!({}))
            .header("x-api-key", "k")
            .bearer("t")
            .timeout(Duration::from_secs(5));

        assert_eq!(request.header_value("X-API-KEY"), Some("k"));
        assert_eq!(request.header_value("authorization"), Some("Bearer t"));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.connect_timeout, None);

        let quick = HttpRequest::get("http://localhost:11434/api/tags").connect_timeout(Duration::from_secs(1));
        assert_eq!(quick.connect_timeout, Some(Duration::from_secs(1)));
        assert!(quick.body.is_none());
    }

    #[tokio::test]
    async fn scripted_transport_splits_reads() {
        let transport = testing::ScriptedTransport::new("abcdefg").read_size(3);
        let reads: Vec<_> = transport
            .post_stream(HttpRequest::post("u", json!({})))
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(reads, [Bytes::from("abc"), Bytes::from("def"), Bytes::from("g")]);
    }
}
