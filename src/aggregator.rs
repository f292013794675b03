// HTTP client for the k8s aggregator REST API
use http::header::AUTHORIZATION;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::DashboardConfig;
use crate::models::audit::LogEntry;
use crate::models::dashboard::RestartTarget;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP status {}", .status.as_u16())]
    Http { status: StatusCode, body: Value },
    /// The request never completed.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid aggregator URL: {0}")]
    Url(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Restart responses are opaque: the body is shown verbatim whatever the status.
#[derive(Debug, Clone)]
pub struct RestartResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Clone)]
pub struct AggregatorClient {
    http: Client,
    base_url: Url,
}

impl AggregatorClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let base_url = Url::parse(&config.aggregator_url)
            .map_err(|e| ApiError::Url(format!("{}: {e}", config.aggregator_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Url(config.aggregator_url.clone()));
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Password-grant login. Credentials go out form-encoded, not as JSON.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(&["login"]))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<Value>()
                .await
                .unwrap_or_else(|_| serde_json::json!({ "detail": "error" }));
            return Err(ApiError::Http { status, body });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn clusters(&self, token: Option<&str>) -> Result<Vec<String>, ApiError> {
        self.get_names(&["clusters"], token).await
    }

    pub async fn namespaces(
        &self,
        cluster: &str,
        token: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        self.get_names(&["namespaces", cluster], token).await
    }

    pub async fn deployments(
        &self,
        cluster: &str,
        namespace: &str,
        token: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        self.get_names(&["deployments", cluster, namespace], token).await
    }

    /// GETs a JSON array of names. A non-2xx status fails without reading the body.
    async fn get_names(
        &self,
        segments: &[&str],
        token: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        let request = Self::authorize(self.http.get(self.endpoint(segments)), token);
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status,
                body: Value::Null,
            });
        }

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Triggers a rollout restart. The JSON body is parsed regardless of status,
    /// so callers can show the server's explanation of a failure.
    pub async fn restart(
        &self,
        target: &RestartTarget,
        token: Option<&str>,
    ) -> Result<RestartResponse, ApiError> {
        let mut url = self.endpoint(&["restart"]);
        url.query_pairs_mut()
            .append_pair("cluster", &target.cluster)
            .append_pair("namespace", &target.namespace)
            .append_pair("deployment_name", &target.deployment);

        let response = Self::authorize(self.http.get(url), token).send().await?;
        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(RestartResponse { status, body })
    }

    /// Forwards one audit entry. The aggregator requires a bearer token here.
    pub async fn post_log(&self, entry: &LogEntry, token: &str) -> Result<(), ApiError> {
        let request = self.http.post(self.endpoint(&["log"])).json(entry);
        Self::authorize(request, Some(token))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
