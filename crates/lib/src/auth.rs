//! Sign-in, sign-up, logout and account flows.
//!
//! Each flow validates its form, calls the users API and records the outcome in the
//! shared `AuthContext`. Success and failure are also reported as notices.

use crate::api::{ApiError, UsersApi};
use crate::identity::AuthContext;
use crate::models::UserInfo;
use crate::notify::Notifier;
use crate::routing::Route;
use crate::storage::StorageError;
use crate::validation::{self, FormErrors, SignInForm, SignUpForm};
use std::sync::Arc;

const SIGNED_IN_NOTICE: &str = "Welcome! Ayna missed you!";
const SIGNED_UP_NOTICE: &str = "Signed In Successfully!!!";
const PASSWORD_UPDATED_NOTICE: &str = "Password updated";

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("saving credentials: {0}")]
    Storage(#[from] StorageError),
}

pub struct AuthFlow {
    users: UsersApi,
    auth: Arc<AuthContext>,
    notifier: Notifier,
}

impl AuthFlow {
    pub fn new(users: UsersApi, auth: Arc<AuthContext>, notifier: Notifier) -> Self {
        Self {
            users,
            auth,
            notifier,
        }
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<UserInfo, FlowError> {
        let errors = validation::validate_sign_in(form);
        if !errors.is_empty() {
            return Err(FlowError::Invalid(errors));
        }
        let res = self.users.sign_in(&form.email, &form.password).await;
        self.complete(res, SIGNED_IN_NOTICE).await
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<UserInfo, FlowError> {
        let errors = validation::validate_sign_up(form);
        if !errors.is_empty() {
            return Err(FlowError::Invalid(errors));
        }
        let res = self
            .users
            .sign_up(&form.email, &form.password, &form.username)
            .await;
        self.complete(res, SIGNED_UP_NOTICE).await
    }

    async fn complete(
        &self,
        res: Result<crate::api::AuthResponse, ApiError>,
        notice: &str,
    ) -> Result<UserInfo, FlowError> {
        let res = match res {
            Ok(r) => r,
            Err(e) => {
                self.notifier.error(e.message.clone());
                return Err(e.into());
            }
        };
        if let Err(e) = self.auth.login(&res.user, &res.jwt).await {
            log::warn!("persisting sign-in failed: {}", e);
            self.notifier.error("");
            return Err(e.into());
        }
        self.notifier.success(notice);
        self.auth.navigator().navigate(Route::Home);
        Ok(res.user)
    }

    pub async fn logout(&self) -> Result<(), FlowError> {
        self.auth.logout().await?;
        self.auth.navigator().navigate(Route::SignIn);
        log::info!("signed out");
        Ok(())
    }

    pub async fn current_user(&self) -> Result<UserInfo, FlowError> {
        Ok(self.users.current_user().await?)
    }

    /// Change the password; the new one must pass the same strength rules as sign-up.
    pub async fn update_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), FlowError> {
        let errors = FormErrors {
            password: validation::validate_password(new_password),
            confirm_password: (new_password != confirm)
                .then(|| "Passwords do not match".to_string()),
            ..FormErrors::default()
        };
        if !errors.is_empty() {
            return Err(FlowError::Invalid(errors));
        }
        match self
            .users
            .update_password(current, new_password, confirm)
            .await
        {
            Ok(res) => {
                self.notifier
                    .success(res.message.unwrap_or_else(|| PASSWORD_UPDATED_NOTICE.to_string()));
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.message.clone());
                Err(e.into())
            }
        }
    }
}
