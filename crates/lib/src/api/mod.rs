//! REST API gateway clients.
//!
//! `ApiClient` does transport, bearer attachment, the 401 policy and error
//! normalization; the resource modules map typed calls onto endpoints.

mod client;
mod endpoints;
mod error;
mod messages;
mod sessions;
mod users;

pub use client::ApiClient;
pub use endpoints::{Endpoint, Query, SortOrder};
pub use error::{
    ApiError, ApiErrorKind, ApiResult, UNEXPECTED_MESSAGE, UNEXPECTED_NAME, UNEXPECTED_STATUS,
};
pub use messages::{MessageInput, MessagePage, MessagesApi, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
pub use sessions::{SessionInput, SessionsApi};
pub use users::{AuthResponse, PasswordUpdateResponse, UsersApi};

/// Create/update bodies are wrapped as `{ "data": ... }`.
#[derive(serde::Serialize)]
struct DataBody<'a, T: serde::Serialize> {
    data: &'a T,
}
