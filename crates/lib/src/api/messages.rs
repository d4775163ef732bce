//! Chat message endpoints.

use super::client::{ApiClient, Envelope};
use super::endpoints::{Endpoint, Query, SortOrder};
use super::error::ApiResult;
use super::DataBody;
use crate::models::{Message, Pagination, SenderType};
use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Body for create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInput {
    pub text: String,
    pub sender_type: SenderType,
    pub session: String,
    pub user: String,
}

/// One page of a thread's history, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePage {
    pub items: Vec<Message>,
    pub pagination: Option<Pagination>,
}

#[derive(Clone)]
pub struct MessagesApi {
    client: ApiClient,
}

impl MessagesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Page `page` (1-based) of a session's messages, sorted by creation time descending.
    pub async fn list_by_session(
        &self,
        session_id: &str,
        page: u32,
        page_size: u32,
    ) -> ApiResult<MessagePage> {
        let query = Query::new()
            .filter_eq(&["session", "documentId"], session_id)
            .sort("createdAt", SortOrder::Desc)
            .paginate(page, page_size);
        let res: Envelope<Vec<Message>> = self.client.get(Endpoint::Messages, Some(&query)).await?;
        Ok(MessagePage {
            items: res.data.unwrap_or_default(),
            pagination: res.meta.and_then(|m| m.pagination),
        })
    }

    pub async fn get(&self, id: &str) -> ApiResult<Option<Message>> {
        let res: Envelope<Message> = self.client.get(Endpoint::Message(id), None).await?;
        Ok(res.data)
    }

    pub async fn create(&self, input: &MessageInput) -> ApiResult<Option<Message>> {
        let res: Envelope<Message> = self
            .client
            .post(Endpoint::Messages, &DataBody { data: input })
            .await?;
        Ok(res.data)
    }

    pub async fn update(&self, id: &str, input: &MessageInput) -> ApiResult<Option<Message>> {
        let res: Envelope<Message> = self
            .client
            .patch(Endpoint::Message(id), &DataBody { data: input })
            .await?;
        Ok(res.data)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete(Endpoint::Message(id)).await
    }
}
