//! Auth and user endpoints.
//!
//! Sign-in and sign-up go through the public client; the rest need the bearer token.
//! These endpoints may report an `error` object alongside a 2xx status, which is treated as a failure.

use super::client::{decode_checked, ApiClient};
use super::endpoints::Endpoint;
use super::error::ApiResult;
use crate::models::UserInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest<'a> {
    /// The backend accepts the email as `identifier`.
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest<'a> {
    pub password: &'a str,
    pub new_password: &'a str,
    pub confirm_new_password: &'a str,
}

/// Bearer token plus profile returned by sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordUpdateResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct UsersApi {
    public: ApiClient,
    private: ApiClient,
}

impl UsersApi {
    pub fn new(public: ApiClient, private: ApiClient) -> Self {
        Self { public, private }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let body = SignInRequest {
            identifier: email,
            password,
        };
        let v: serde_json::Value = self.public.post(Endpoint::SignIn, &body).await?;
        decode_checked(v)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> ApiResult<AuthResponse> {
        let body = SignUpRequest {
            email,
            password,
            username,
        };
        let v: serde_json::Value = self.public.post(Endpoint::SignUp, &body).await?;
        decode_checked(v)
    }

    /// Profile of the token's owner. Accepts both a bare profile and a `{ data: profile }` wrapper.
    pub async fn current_user(&self) -> ApiResult<UserInfo> {
        let v: serde_json::Value = self.private.get(Endpoint::CurrentUser, None).await?;
        let v = match v.get("data") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => v,
        };
        decode_checked(v)
    }

    pub async fn update_password(
        &self,
        password: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> ApiResult<PasswordUpdateResponse> {
        let body = PasswordUpdateRequest {
            password,
            new_password,
            confirm_new_password,
        };
        let v: serde_json::Value = self.private.put(Endpoint::PasswordUpdate, &body).await?;
        decode_checked(v)
    }
}
