//! Thin REST client for the task service.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::ApiError;
use crate::model::{Comment, Item, ItemPatch, Label, NewItem, Project, Section, Snapshot};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct TaskClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl TaskClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = base_url.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|_| ApiError::BaseUrl(base_url.to_string()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .user_agent(concat!("tasklane/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.base, path.trim_start_matches('/')))
            .map_err(|_| ApiError::BaseUrl(self.base.clone()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.url(path, query)?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response, "GET", path).await?;
        Ok(response.json().await?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(self.url(path, &[])?)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        let response = check_status(response, "POST", path).await?;
        Ok(response.json().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(path, &[])?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response, "POST", path).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(path, &[])?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response, "DELETE", path).await?;
        Ok(())
    }

    pub async fn items(&self) -> Result<Vec<Item>, ApiError> {
        self.get("tasks", &[]).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("projects", &[]).await
    }

    pub async fn sections(&self) -> Result<Vec<Section>, ApiError> {
        self.get("sections", &[]).await
    }

    pub async fn labels(&self) -> Result<Vec<Label>, ApiError> {
        self.get("labels", &[]).await
    }

    /// Fetches every collection the session caches, concurrently.
    pub async fn snapshot(&self) -> Result<Snapshot, ApiError> {
        let (items, projects, sections, labels) =
            tokio::try_join!(self.items(), self.projects(), self.sections(), self.labels())?;
        Ok(Snapshot {
            items,
            projects,
            sections,
            labels,
        })
    }

    pub async fn comments(&self, item_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.get("comments", &[("task_id", item_id)]).await
    }

    pub async fn create_item(&self, item: &NewItem) -> Result<Item, ApiError> {
        self.post("tasks", item).await
    }

    pub async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Item, ApiError> {
        self.post(&format!("tasks/{id}"), patch).await
    }

    pub async fn close_item(&self, id: &str) -> Result<(), ApiError> {
        self.post_empty(&format!("tasks/{id}/close")).await
    }

    pub async fn reopen_item(&self, id: &str) -> Result<(), ApiError> {
        self.post_empty(&format!("tasks/{id}/reopen")).await
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("tasks/{id}")).await
    }

    pub async fn add_comment(&self, item_id: &str, text: &str) -> Result<Comment, ApiError> {
        self.post("comments", &json!({ "task_id": item_id, "content": text }))
            .await
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        self.post("projects", &json!({ "name": name })).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("projects/{id}")).await
    }

    pub async fn create_section(&self, project_id: &str, name: &str) -> Result<Section, ApiError> {
        self.post(
            "sections",
            &json!({ "project_id": project_id, "name": name }),
        )
        .await
    }

    pub async fn rename_section(&self, id: &str, name: &str) -> Result<Section, ApiError> {
        self.post(&format!("sections/{id}"), &json!({ "name": name }))
            .await
    }

    pub async fn delete_section(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("sections/{id}")).await
    }
}

async fn check_status(
    response: reqwest::Response,
    method: &'static str,
    path: &str,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    tracing::warn!(method, path, status = status.as_u16(), "request rejected");
    Err(ApiError::Status {
        method,
        path: path.to_string(),
        status: status.as_u16(),
        body,
    })
}
