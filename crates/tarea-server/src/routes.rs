//! REST surface of the task service. Handlers validate, call into the
//! store, and wrap rows in the response envelopes the client consumes.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use regex::Regex;
use tarea_shared::{
    Ack, CategoriesEnvelope, CategoryCreate, CategoryEnvelope, CategoryPatch, Health,
    ReorderRequest, StatsSummary, TaskCreate, TaskEnvelope, TaskListQuery, TaskPatch,
    TasksEnvelope,
};
use tracing::{info, instrument};

use crate::db::Db;
use crate::error::ApiError;

pub fn router(db: Arc<Db>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/stats/summary", get(stats_summary))
        .route("/api/tasks/batch/reorder", put(reorder_tasks))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            put(update_category).delete(delete_category),
        )
        .with_state(db)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

#[instrument(skip_all)]
async fn list_tasks(
    State(db): State<Arc<Db>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TasksEnvelope>, ApiError> {
    let tasks = db.list_tasks(&query).map_err(ApiError::internal)?;
    Ok(Json(TasksEnvelope { tasks }))
}

#[instrument(skip_all)]
async fn get_task(
    State(db): State<Arc<Db>>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let task = db
        .get_task(&id)
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(TaskEnvelope { task }))
}

#[instrument(skip_all)]
async fn create_task(
    State(db): State<Arc<Db>>,
    Json(input): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    validate_task_create(&input).map_err(ApiError::BadRequest)?;
    let task = db.create_task(&input).map_err(ApiError::internal)?;
    info!(id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(TaskEnvelope { task })))
}

#[instrument(skip_all)]
async fn update_task(
    State(db): State<Arc<Db>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    validate_task_patch(&patch).map_err(ApiError::BadRequest)?;
    let task = db
        .update_task(&id, &patch)
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(TaskEnvelope { task }))
}

#[instrument(skip_all)]
async fn reorder_tasks(
    State(db): State<Arc<Db>>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Ack>, ApiError> {
    db.reorder_tasks(&request.items).map_err(ApiError::internal)?;
    info!(count = request.items.len(), "tasks reordered");
    Ok(Json(Ack { success: true }))
}

#[instrument(skip_all)]
async fn delete_task(
    State(db): State<Arc<Db>>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    db.delete_task(&id).map_err(ApiError::internal)?;
    Ok(Json(Ack { success: true }))
}

#[instrument(skip_all)]
async fn list_categories(State(db): State<Arc<Db>>) -> Result<Json<CategoriesEnvelope>, ApiError> {
    let categories = db.list_categories().map_err(ApiError::internal)?;
    Ok(Json(CategoriesEnvelope { categories }))
}

#[instrument(skip_all)]
async fn create_category(
    State(db): State<Arc<Db>>,
    Json(input): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryEnvelope>), ApiError> {
    validate_category_create(&input).map_err(ApiError::BadRequest)?;
    let category = db.create_category(&input).map_err(ApiError::internal)?;
    info!(id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(CategoryEnvelope { category })))
}

#[instrument(skip_all)]
async fn update_category(
    State(db): State<Arc<Db>>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Json<CategoryEnvelope>, ApiError> {
    validate_category_patch(&patch).map_err(ApiError::BadRequest)?;
    let category = db
        .update_category(&id, &patch)
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(CategoryEnvelope { category }))
}

#[instrument(skip_all)]
async fn delete_category(
    State(db): State<Arc<Db>>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    db.delete_category(&id).map_err(ApiError::internal)?;
    Ok(Json(Ack { success: true }))
}

#[instrument(skip_all)]
async fn stats_summary(State(db): State<Arc<Db>>) -> Result<Json<StatsSummary>, ApiError> {
    let stats = db.stats().map_err(ApiError::internal)?;
    Ok(Json(stats))
}

fn validate_task_create(input: &TaskCreate) -> Result<(), String> {
    validate_title(&input.title)?;
    validate_notes(&input.notes)
}

fn validate_task_patch(patch: &TaskPatch) -> Result<(), String> {
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(notes) = &patch.notes {
        validate_notes(notes)?;
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.is_empty() || title.chars().count() > 500 {
        return Err("Validation failed: title must be 1-500 characters".to_string());
    }
    Ok(())
}

fn validate_notes(notes: &str) -> Result<(), String> {
    if notes.chars().count() > 5000 {
        return Err("Validation failed: notes must be at most 5000 characters".to_string());
    }
    Ok(())
}

fn validate_category_create(input: &CategoryCreate) -> Result<(), String> {
    if let Some(id) = &input.id
        && (id.is_empty() || id.chars().count() > 50)
    {
        return Err("Validation failed: id must be 1-50 characters".to_string());
    }
    validate_category_name(&input.name)?;
    if let Some(color) = &input.color {
        validate_color(color)?;
    }
    if let Some(icon) = &input.icon {
        validate_icon(icon)?;
    }
    Ok(())
}

fn validate_category_patch(patch: &CategoryPatch) -> Result<(), String> {
    if let Some(name) = &patch.name {
        validate_category_name(name)?;
    }
    if let Some(color) = &patch.color {
        validate_color(color)?;
    }
    if let Some(icon) = &patch.icon {
        validate_icon(icon)?;
    }
    Ok(())
}

fn validate_category_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.chars().count() > 100 {
        return Err("Validation failed: name must be 1-100 characters".to_string());
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<(), String> {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    let pattern = COLOR.get_or_init(|| {
        Regex::new("^#[0-9a-fA-F]{6}$").expect("color pattern is a valid regex")
    });
    if !pattern.is_match(color) {
        return Err("Validation failed: color must be a 6-digit hex value".to_string());
    }
    Ok(())
}

fn validate_icon(icon: &str) -> Result<(), String> {
    if icon.chars().count() > 10 {
        return Err("Validation failed: icon must be at most 10 characters".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds_are_enforced() {
        assert!(validate_title("x").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(500)).is_ok());
        assert!(validate_title(&"x".repeat(501)).is_err());
    }

    #[test]
    fn color_must_be_six_hex_digits() {
        assert!(validate_color("#6366f1").is_ok());
        assert!(validate_color("#ABCDEF").is_ok());
        assert!(validate_color("6366f1").is_err());
        assert!(validate_color("#6366f").is_err());
        assert!(validate_color("#6366g1").is_err());
    }
}
