use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tarea_shared::{
    Ack, CategoriesEnvelope, Category, CategoryCreate, CategoryEnvelope, CategoryPatch, ErrorBody,
    Health, ReorderItem, ReorderRequest, StatsSummary, Task, TaskCreate, TaskEnvelope,
    TaskListQuery, TaskPatch, TasksEnvelope,
};

use crate::service::TaskService;

/// `TaskService` over the REST API. Non-success responses surface the
/// service's `{error}` message when the body carries one, else a bare
/// `HTTP <status>`; transport and decode failures read the same way to the
/// store.
pub struct HttpTaskService {
    base: String,
    http: reqwest::Client,
}

impl HttpTaskService {
    /// `base_url` points at the API root, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn health(&self) -> anyhow::Result<Health> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .context("task service unreachable")?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        return Err(anyhow!(message));
    }

    response
        .json::<T>()
        .await
        .context("failed to decode service response")
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list_tasks(&self, query: &TaskListQuery) -> anyhow::Result<Vec<Task>> {
        let response = self
            .http
            .get(self.url("/tasks"))
            .query(query)
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<TasksEnvelope>(response).await?.tasks)
    }

    async fn get_task(&self, id: &str) -> anyhow::Result<Task> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{id}")))
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<TaskEnvelope>(response).await?.task)
    }

    async fn create_task(&self, input: &TaskCreate) -> anyhow::Result<Task> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(input)
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<TaskEnvelope>(response).await?.task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> anyhow::Result<Task> {
        let response = self
            .http
            .put(self.url(&format!("/tasks/{id}")))
            .json(patch)
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<TaskEnvelope>(response).await?.task)
    }

    async fn reorder_tasks(&self, items: &[ReorderItem]) -> anyhow::Result<()> {
        let body = ReorderRequest {
            items: items.to_vec(),
        };
        let response = self
            .http
            .put(self.url("/tasks/batch/reorder"))
            .json(&body)
            .send()
            .await
            .context("task service unreachable")?;
        decode::<Ack>(response).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/tasks/{id}")))
            .send()
            .await
            .context("task service unreachable")?;
        decode::<Ack>(response).await?;
        Ok(())
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let response = self
            .http
            .get(self.url("/categories"))
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<CategoriesEnvelope>(response).await?.categories)
    }

    async fn create_category(&self, input: &CategoryCreate) -> anyhow::Result<Category> {
        let response = self
            .http
            .post(self.url("/categories"))
            .json(input)
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<CategoryEnvelope>(response).await?.category)
    }

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> anyhow::Result<Category> {
        let response = self
            .http
            .put(self.url(&format!("/categories/{id}")))
            .json(patch)
            .send()
            .await
            .context("task service unreachable")?;
        Ok(decode::<CategoryEnvelope>(response).await?.category)
    }

    async fn delete_category(&self, id: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/categories/{id}")))
            .send()
            .await
            .context("task service unreachable")?;
        decode::<Ack>(response).await?;
        Ok(())
    }

    async fn stats(&self) -> anyhow::Result<StatsSummary> {
        let response = self
            .http
            .get(self.url("/tasks/stats/summary"))
            .send()
            .await
            .context("task service unreachable")?;
        decode(response).await
    }
}
