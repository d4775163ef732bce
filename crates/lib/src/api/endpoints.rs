//! Typed endpoints and structured query parameters.
//!
//! Ids are pushed as path segments (percent-encoded by `Url`); filters, sort and
//! pagination are carried as query pairs in bracket notation, never spliced into paths.

use super::error::ApiError;
use reqwest::Url;

/// A backend REST endpoint, relative to `<host>/api/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    SignIn,
    SignUp,
    CurrentUser,
    PasswordUpdate,
    Sessions,
    Session(&'a str),
    Messages,
    Message(&'a str),
}

impl Endpoint<'_> {
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Endpoint::SignIn => vec!["auth", "local"],
            Endpoint::SignUp => vec!["auth", "local", "register"],
            Endpoint::CurrentUser => vec!["users", "me"],
            Endpoint::PasswordUpdate => vec!["auth", "update-password"],
            Endpoint::Sessions => vec!["sessions"],
            Endpoint::Session(id) => vec!["sessions", *id],
            Endpoint::Messages => vec!["messages"],
            Endpoint::Message(id) => vec!["messages", *id],
        }
    }

    /// Absolute URL under `base` (which must be a hierarchical URL such as `http://host/api/`).
    pub fn url(&self, base: &Url) -> Result<Url, ApiError> {
        let mut url = base.clone();
        {
            let mut segs = url.path_segments_mut().map_err(|_| {
                log::warn!("api base url cannot carry paths: {}", base);
                ApiError::unexpected()
            })?;
            segs.pop_if_empty();
            segs.extend(self.segments());
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Structured query in the backend's bracket notation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
    sorts: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sort[i]=field:order`, indexed in call order.
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.pairs.push((
            format!("sort[{}]", self.sorts),
            format!("{}:{}", field, order.as_str()),
        ));
        self.sorts += 1;
        self
    }

    /// `filters[a][b]...[$eq]=value` for the nested field path.
    pub fn filter_eq(mut self, path: &[&str], value: impl Into<String>) -> Self {
        let key = path
            .iter()
            .fold(String::from("filters"), |acc, p| format!("{}[{}]", acc, p));
        self.pairs.push((format!("{}[$eq]", key), value.into()));
        self
    }

    /// `pagination[page]` and `pagination[pageSize]`.
    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.pairs
            .push(("pagination[page]".to_string(), page.to_string()));
        self.pairs
            .push(("pagination[pageSize]".to_string(), page_size.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
