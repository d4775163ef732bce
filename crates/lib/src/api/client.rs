//! HTTP client for the backend REST API.
//!
//! Two flavors share one implementation: `public` sends no credential, `private`
//! attaches `Authorization: Bearer <token>` from the auth context. Both apply the
//! 401 policy (sign out and redirect) before returning the error to the caller.

use super::endpoints::{Endpoint, Query};
use super::error::{ApiError, ApiResult};
use crate::config::{self, Config};
use crate::identity::AuthContext;
use anyhow::Context;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// REST client bound to one backend host.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    auth: Arc<AuthContext>,
    with_bearer: bool,
}

impl ApiClient {
    /// Unauthenticated client (sign-in, sign-up).
    pub fn public(config: &Config, auth: Arc<AuthContext>) -> anyhow::Result<Self> {
        Self::build(
            &config::resolve_api_host(config),
            config.api.request_timeout(),
            auth,
            false,
        )
    }

    /// Authenticated client: every request carries the cached bearer token.
    pub fn private(config: &Config, auth: Arc<AuthContext>) -> anyhow::Result<Self> {
        Self::build(
            &config::resolve_api_host(config),
            config.api.request_timeout(),
            auth,
            true,
        )
    }

    fn build(
        host: &str,
        timeout: Option<Duration>,
        auth: Arc<AuthContext>,
        with_bearer: bool,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(&format!("{}/api/", host.trim_end_matches('/')))
            .with_context(|| format!("invalid api host {:?}", host))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("api host {:?} cannot carry paths", host);
        }
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().context("building http client")?;
        Ok(Self {
            http,
            base,
            auth,
            with_bearer,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        query: Option<&Query>,
    ) -> ApiResult<T> {
        let bytes = self.execute(Method::GET, endpoint, query, None).await?;
        decode(&bytes)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint<'_>,
        body: &B,
    ) -> ApiResult<T> {
        let bytes = self
            .execute(Method::POST, endpoint, None, Some(encode(body)?))
            .await?;
        decode(&bytes)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint<'_>,
        body: &B,
    ) -> ApiResult<T> {
        let bytes = self
            .execute(Method::PUT, endpoint, None, Some(encode(body)?))
            .await?;
        decode(&bytes)
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint<'_>,
        body: &B,
    ) -> ApiResult<T> {
        let bytes = self
            .execute(Method::PATCH, endpoint, None, Some(encode(body)?))
            .await?;
        decode(&bytes)
    }

    /// DELETE; the response body is ignored.
    pub async fn delete(&self, endpoint: Endpoint<'_>) -> ApiResult<()> {
        self.execute(Method::DELETE, endpoint, None, None).await?;
        Ok(())
    }

    /// Send one request. Returns the body of a 2xx response; every other outcome is normalized to `ApiError`.
    async fn execute(
        &self,
        method: Method,
        endpoint: Endpoint<'_>,
        query: Option<&Query>,
        body: Option<serde_json::Value>,
    ) -> ApiResult<Vec<u8>> {
        let url = endpoint.url(&self.base)?;
        log::debug!("{} {}", method, url);
        let mut req = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if self.with_bearer {
            let token = self.auth.token().unwrap_or_default();
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            req = req.query(q.pairs());
        }
        if let Some(b) = body {
            req = req.json(&b);
        }

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("{} {:?} failed: {}", method, endpoint, e);
                return Err(ApiError::unexpected());
            }
        };
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            self.auth.handle_unauthorized().await;
        }
        let bytes = match res.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => {
                log::warn!("reading {:?} response failed: {}", endpoint, e);
                return Err(ApiError::unexpected());
            }
        };
        if !status.is_success() {
            let err = ApiError::from_failure_bytes(&bytes);
            log::debug!("{} {:?} -> {} ({})", method, endpoint, status, err.message);
            return Err(err);
        }
        Ok(bytes)
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ApiResult<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| {
        log::warn!("encoding request body failed: {}", e);
        ApiError::unexpected()
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    // Empty 2xx bodies decode as JSON null so `Option`/`()` targets still succeed.
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| {
        log::warn!("decoding response body failed: {}", e);
        ApiError::unexpected()
    })
}

/// `{ data, meta }` wrapper used by entity endpoints.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Meta {
    #[serde(default)]
    pub pagination: Option<crate::models::Pagination>,
}

/// Decode a 2xx body that may still carry an `error` object into `T`.
pub(crate) fn decode_checked<T: DeserializeOwned>(value: serde_json::Value) -> ApiResult<T> {
    if let Some(err) = ApiError::from_error_body(&value) {
        return Err(err);
    }
    serde_json::from_value(value).map_err(|e| {
        log::warn!("decoding response body failed: {}", e);
        ApiError::unexpected()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Navigator, Route};
    use crate::storage::MemoryStorage;

    fn auth() -> Arc<AuthContext> {
        Arc::new(AuthContext::new(
            Arc::new(MemoryStorage::new()),
            Navigator::new(Route::SignIn),
        ))
    }

    #[test]
    fn base_url_gets_api_suffix() {
        let mut config = Config::default();
        config.api.base_url = "https://backend.example/".into();
        let client = ApiClient::public(&config, auth()).unwrap();
        if std::env::var("AYNA_API_URL").is_err() {
            assert_eq!(client.base_url().as_str(), "https://backend.example/api/");
        }
    }

    #[test]
    fn decode_empty_body_as_null() {
        let v: Option<serde_json::Value> = decode(b"").unwrap();
        assert!(v.is_none());
        let e = decode::<u32>(b"oops").unwrap_err();
        assert_eq!(e, ApiError::unexpected());
    }

    #[test]
    fn checked_decode_reports_embedded_error() {
        let v = serde_json::json!({ "data": null, "error": { "status": 400, "name": "ApplicationError", "message": "Email or Username are already taken" } });
        let e = decode_checked::<serde_json::Value>(v).unwrap_err();
        assert_eq!(e.message, "Email or Username are already taken");
    }

    #[test]
    fn envelope_of_a_single_record() {
        let v = serde_json::json!({ "data": { "documentId": "s1", "lastMessage": "hi" }, "meta": {} });
        let env: Envelope<crate::models::Session> = serde_json::from_value(v).unwrap();
        assert_eq!(env.data.map(|s| s.document_id).as_deref(), Some("s1"));

        let env: Envelope<crate::models::Message> = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(env.data.is_none());
        assert!(env.meta.is_none());
    }
}
