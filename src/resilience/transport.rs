use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{MigrateError, Result};

const REQUEST_TIMEOUT_SECONDS: u64 = 100;

/// A fully buffered request, so it can be sent again unchanged.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: Url, body: &impl serde::Serialize) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            url,
            headers: vec![(CONTENT_TYPE.to_string(), "application/json".to_string())],
            body: Some(serde_json::to_vec(body)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup, first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into an error. Rate-limit responses that survived the
    /// transport look like any other failure from here on.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        match self.status {
            401 => Err(MigrateError::Unauthorized),
            status => Err(MigrateError::ApiError {
                status,
                message: self.body,
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Anything that can carry an [`HttpRequest`] to a server.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl<T: Transport> Transport for &T {
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).send(request)
    }
}

#[derive(Clone)]
enum Credentials {
    Bearer(Token),
    /// Personal access token sent as the password of an empty user name.
    Basic(Token),
}

/// `reqwest`-backed transport with the caller's credentials attached to every request.
pub struct ReqwestTransport {
    client: Client,
    credentials: Option<Credentials>,
}

impl ReqwestTransport {
    fn new(credentials: Option<Credentials>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repoferry/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| MigrateError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// GitHub style `Authorization: Bearer <token>`.
    pub fn bearer(token: Option<&Token>) -> Result<Self> {
        Self::new(token.cloned().map(Credentials::Bearer))
    }

    /// Azure DevOps style basic auth for a personal access token.
    pub fn basic(pat: &Token) -> Result<Self> {
        Self::new(Some(Credentials::Basic(pat.clone())))
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &self.credentials {
            Some(Credentials::Bearer(token)) => builder.bearer_auth(token.as_str()),
            Some(Credentials::Basic(pat)) => builder.basic_auth("", Some(pat.as_str())),
            None => builder,
        };
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
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
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::response;
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut resp = response(200, "");
        resp.headers
            .push(("Retry-After".to_string(), "30".to_string()));
        assert_eq!(resp.header("retry-after"), Some("30"));
        assert_eq!(resp.header("x-ratelimit-reset"), None);
    }

    #[test]
    fn test_error_for_status() {
        assert!(response(204, "").error_for_status().is_ok());
        assert!(matches!(
            response(401, "").error_for_status(),
            Err(MigrateError::Unauthorized)
        ));
        match response(403, "forbidden").error_for_status() {
            Err(MigrateError::ApiError { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reqwest_transport_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "Bearer ghp_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::bearer(Some(&Token::from("ghp_test"))).unwrap();
        let url = Url::parse(&format!("{}/graphql", server.url())).unwrap();
        let request = HttpRequest::post_json(url, &serde_json::json!({"query": "{}"})).unwrap();

        let resp = transport.send(&request).await.unwrap();
        assert_eq!(resp.status, 200);
        let body: serde_json::Value = resp.json().unwrap();
        assert_eq!(body["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_basic_transport_sends_pat_as_password() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/_apis/projects")
            .match_header("authorization", "Basic OmFiYw==")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let transport = ReqwestTransport::basic(&Token::from("abc")).unwrap();
        let url = Url::parse(&format!("{}/_apis/projects", server.url())).unwrap();

        let resp = transport.send(&HttpRequest::get(url)).await.unwrap();
        assert_eq!(resp.status, 200);
        mock.assert_async().await;
    }
}
