//! Chat session endpoints.

use super::client::{ApiClient, Envelope};
use super::endpoints::{Endpoint, Query, SortOrder};
use super::error::ApiResult;
use super::DataBody;
use crate::models::Session;
use serde::Serialize;

/// Body for create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    pub last_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Clone)]
pub struct SessionsApi {
    client: ApiClient,
}

impl SessionsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All sessions of the signed-in user, newest first.
    pub async fn list(&self) -> ApiResult<Vec<Session>> {
        let query = Query::new().sort("createdAt", SortOrder::Desc);
        let res: Envelope<Vec<Session>> = self.client.get(Endpoint::Sessions, Some(&query)).await?;
        Ok(res.data.unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> ApiResult<Option<Session>> {
        let res: Envelope<Session> = self.client.get(Endpoint::Session(id), None).await?;
        Ok(res.data)
    }

    pub async fn create(&self, input: &SessionInput) -> ApiResult<Option<Session>> {
        let res: Envelope<Session> = self
            .client
            .post(Endpoint::Sessions, &DataBody { data: input })
            .await?;
        Ok(res.data)
    }

    pub async fn update(&self, id: &str, input: &SessionInput) -> ApiResult<Option<Session>> {
        let res: Envelope<Session> = self
            .client
            .patch(Endpoint::Session(id), &DataBody { data: input })
            .await?;
        Ok(res.data)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete(Endpoint::Session(id)).await
    }
}
