//! HTTP backend speaking PostgREST, GoTrue and storage endpoints.

use super::{Backend, ChangeFeed, Query, Session, Table};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
}

/// Backend reached over HTTP.
///
/// Requests carry the anon key as `apikey` and, once signed in, the
/// session token as bearer so row-level security applies server side.
/// There is no push channel, so [`Backend::subscribe`] is unsupported.
pub struct RestBackend {
    base_url: Url,
    anon_key: String,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    /// Create a client from configuration.
    pub fn new(config: &BackendConfig, timeout: Duration) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::config("backend.url is not set"))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| Error::config("backend.anon_key is not set"))?;
        let base_url =
            Url::parse(url).map_err(|e| Error::config(format!("invalid backend.url: {}", e)))?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            anon_key,
            http,
            session: RwLock::new(None),
        })
    }

    /// Replace the session used for authorization.
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn table_url(&self, table: Table) -> String {
        self.url(&format!("rest/v1/{}", table.as_str()))
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).await.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Error::network(e.to_string())
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::auth(message)),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited(60)),
            _ => Err(Error::api(status.as_u16(), message)),
        }
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn open_session(&self, response: Response, email: &str) -> Result<Session> {
        let auth: AuthResponse = response.json().await?;
        let token = auth
            .access_token
            .ok_or_else(|| Error::auth("email confirmation required before signing in"))?;
        let user = auth
            .user
            .ok_or_else(|| Error::auth("auth response did not include a user"))?;

        let session = Session {
            access_token: token,
            user_id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
            expires_at: auth
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        };
        self.set_session(Some(session.clone())).await;
        Ok(session)
    }
}

/// Pull a human message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(&query.to_params());
        self.rows(request).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::backend(format!("insert into {} returned no row", table)))
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .json(&patch);
        self.rows(request).await
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        if query.filters().is_empty() {
            return Err(Error::validation(format!(
                "refusing to delete every row of {}",
                table
            )));
        }
        let request = self
            .http
            .delete(self.table_url(table))
            .query(&query.to_params())
            .header("Prefer", "return=representation");
        Ok(self.rows(request).await?.len())
    }

    fn subscribe(&self, table: Table, _filter: Query) -> Result<ChangeFeed> {
        Err(Error::unsupported(format!(
            "change feed for {} is not available over REST",
            table
        )))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .http
            .post(self.url("auth/v1/signup"))
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request).await?;
        self.open_session(response, email).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .http
            .post(self.url("auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request).await?;
        self.open_session(response, email).await
    }

    async fn sign_out(&self) -> Result<()> {
        let signed_in = self.session.read().await.is_some();
        if signed_in {
            let request = self.http.post(self.url("auth/v1/logout"));
            if let Err(e) = self.send(request).await {
                tracing::warn!("Sign-out request failed: {}", e);
            }
        }
        self.set_session(None).await;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let request = self
            .http
            .post(self.url(&format!("storage/v1/object/{}/{}", bucket, path)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send(request).await?;
        Ok(self.url(&format!("storage/v1/object/public/{}/{}", bucket, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_url_and_key() {
        let config = BackendConfig::default();
        assert!(matches!(
            RestBackend::new(&config, Duration::from_secs(5)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"message":"JWT expired"}"#), "JWT expired");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
