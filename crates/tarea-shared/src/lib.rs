//! Wire types exchanged between the task store client and the task service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Position,
    DueDate,
    Priority,
    Created,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Position => "position",
            SortMode::DueDate => "due_date",
            SortMode::Priority => "priority",
            SortMode::Created => "created",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub category_id: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub position: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub position: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
}

/// Partial task update. Nullable columns use a double `Option` so the wire
/// distinguishes "leave unchanged" (absent) from "clear" (null).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.category_id.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.start_date.is_none()
            && self.completed.is_none()
            && self.position.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    pub id: Option<String>,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderItem {
    pub id: String,
    pub position: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<ReorderItem>,
}

/// Query parameters for the task listing endpoint. `category` is either a
/// category id or the literal `all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksEnvelope {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesEnvelope {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEnvelope {
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total: i64,
    pub completed: i64,
    pub active: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Serde adapter for `Option<Option<T>>` fields: a missing key deserializes
/// to `None` via `#[serde(default)]`, an explicit `null` to `Some(None)`.
pub mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_round_trips_with_camel_case_keys() {
        let raw = r#"{
            "id": "t1",
            "title": "Buy milk",
            "notes": "",
            "categoryId": null,
            "priority": "high",
            "dueDate": "2024-01-03",
            "startDate": null,
            "completed": false,
            "completedAt": null,
            "position": 2.0,
            "createdAt": "2024-01-01T10:00:00Z",
            "updatedAt": "2024-01-01T10:00:00Z"
        }"#;

        let task: Task = serde_json::from_str(raw).expect("deserialize task");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(
            task.due_date,
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );

        let value = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(value["categoryId"], serde_json::Value::Null);
        assert_eq!(value["dueDate"], "2024-01-03");
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let absent: TaskPatch = serde_json::from_str(r#"{"title":"x"}"#).expect("parse");
        assert!(absent.category_id.is_none());

        let cleared: TaskPatch =
            serde_json::from_str(r#"{"categoryId":null}"#).expect("parse");
        assert_eq!(cleared.category_id, Some(None));

        let set: TaskPatch =
            serde_json::from_str(r#"{"categoryId":"work"}"#).expect("parse");
        assert_eq!(set.category_id, Some(Some("work".to_string())));
    }

    #[test]
    fn sort_mode_uses_snake_case_wire_names() {
        let mode: SortMode = serde_json::from_str(r#""due_date""#).expect("parse");
        assert_eq!(mode, SortMode::DueDate);
        assert_eq!(mode.as_str(), "due_date");
    }

    #[test]
    fn priority_orders_by_severity() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
