use async_trait::async_trait;
use tarea_shared::{
    Category, CategoryCreate, CategoryPatch, ReorderItem, StatsSummary, Task, TaskCreate,
    TaskListQuery, TaskPatch,
};

/// The REST task/category service the store talks to. The store treats any
/// error from these methods as a uniform failure carrying a human-readable
/// message; it never inspects the cause.
#[async_trait]
pub trait TaskService {
    async fn list_tasks(&self, query: &TaskListQuery) -> anyhow::Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> anyhow::Result<Task>;

    async fn create_task(&self, input: &TaskCreate) -> anyhow::Result<Task>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> anyhow::Result<Task>;

    async fn reorder_tasks(&self, items: &[ReorderItem]) -> anyhow::Result<()>;

    async fn delete_task(&self, id: &str) -> anyhow::Result<()>;

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;

    async fn create_category(&self, input: &CategoryCreate) -> anyhow::Result<Category>;

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> anyhow::Result<Category>;

    async fn delete_category(&self, id: &str) -> anyhow::Result<()>;

    async fn stats(&self) -> anyhow::Result<StatsSummary>;
}
