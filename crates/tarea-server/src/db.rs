//! SQLite persistence for tasks and categories. One WAL-mode connection
//! behind a mutex; every operation runs scoped to the lock (and a
//! transaction where more than one statement is involved), so the
//! connection is released on every path.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tarea_shared::{
    Category, CategoryCreate, CategoryPatch, Priority, ReorderItem, SortMode, StatsSummary, Task,
    TaskCreate, TaskListQuery, TaskPatch,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Seeded on first start, ids stable so reinstalls keep task references.
const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str, i64)] = &[
    ("work", "Trabajo", "#6366f1", "💼", 0),
    ("personal", "Personal", "#f43f5e", "🏠", 1),
    ("health", "Salud", "#10b981", "💪", 2),
    ("learning", "Aprender", "#f59e0b", "📚", 3),
    ("finance", "Finanzas", "#8b5cf6", "💰", 4),
    ("urgent", "Urgente", "#ef4444", "🔥", 5),
];

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        let db = Self::init(conn)?;
        info!(db = %path.display(), "database opened");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA foreign_keys=ON;

                CREATE TABLE IF NOT EXISTS categories (
                  id TEXT PRIMARY KEY,
                  name TEXT NOT NULL,
                  color TEXT NOT NULL DEFAULT '#6366f1',
                  icon TEXT NOT NULL DEFAULT '📋',
                  position INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS tasks (
                  id TEXT PRIMARY KEY,
                  title TEXT NOT NULL,
                  notes TEXT NOT NULL DEFAULT '',
                  category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
                  priority TEXT NOT NULL DEFAULT 'medium',
                  due_date TEXT,
                  start_date TEXT,
                  completed INTEGER NOT NULL DEFAULT 0,
                  completed_at TEXT,
                  position REAL NOT NULL DEFAULT 0,
                  created_at TEXT NOT NULL,
                  updated_at TEXT NOT NULL
                );
                "#,
            )
            .context("failed to run migrations")
    }

    #[instrument(skip(self))]
    pub fn seed_default_categories(&self) -> Result<()> {
        let conn = self.conn.lock();
        for (id, name, color, icon, position) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT OR IGNORE INTO categories (id, name, color, icon, position)
                 VALUES (?, ?, ?, ?, ?)",
                params![id, name, color, icon, position],
            )
            .context("failed to seed categories")?;
        }
        debug!(count = DEFAULT_CATEGORIES.len(), "default categories ready");
        Ok(())
    }

    #[instrument(skip(self, query))]
    pub fn list_tasks(&self, query: &TaskListQuery) -> Result<Vec<Task>> {
        let conn = self.conn.lock();

        let mut clauses: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(category) = &query.category
            && category != "all"
        {
            clauses.push("category_id = ?");
            values.push(Box::new(category.clone()));
        }
        if let Some(completed) = query.completed {
            clauses.push("completed = ?");
            values.push(Box::new(completed));
        }
        if let Some(priority) = query.priority {
            clauses.push("priority = ?");
            values.push(Box::new(priority.as_str().to_string()));
        }
        if let Some(search) = &query.search
            && !search.is_empty()
        {
            clauses.push("(title LIKE ? OR notes LIKE ?)");
            let needle = format!("%{search}%");
            values.push(Box::new(needle.clone()));
            values.push(Box::new(needle));
        }

        let mut sql = String::from("SELECT * FROM tasks");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order_clause(query.sort.unwrap_or_default()));

        let mut stmt = conn.prepare(&sql).context("failed to prepare task listing")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter().map(|v| &**v)), task_from_row)
            .context("failed to list tasks")?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.context("failed to read task row")?);
        }
        Ok(tasks)
    }

    #[instrument(skip(self))]
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM tasks WHERE id = ?", params![id], task_from_row)
            .optional()
            .context("failed to load task")
    }

    /// New tasks always append: position is max(existing)+1, computed and
    /// inserted in one transaction.
    #[instrument(skip(self, input), fields(title_len = input.title.len()))]
    pub fn create_task(&self, input: &TaskCreate) -> Result<Task> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("failed to start transaction")?;

        let max: f64 = tx
            .query_row("SELECT COALESCE(MAX(position), -1) FROM tasks", [], |row| row.get(0))
            .context("failed to compute max position")?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            notes: input.notes.clone(),
            category_id: input.category_id.clone(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            start_date: input.start_date,
            completed: false,
            completed_at: None,
            position: max + 1.0,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO tasks (id, title, notes, category_id, priority, due_date, start_date,
                                completed, completed_at, position, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                task.id,
                task.title,
                task.notes,
                task.category_id,
                task.priority.as_str(),
                task.due_date,
                task.start_date,
                task.completed,
                task.completed_at,
                task.position,
                task.created_at,
                task.updated_at,
            ],
        )
        .context("failed to insert task")?;
        tx.commit().context("failed to commit task insert")?;

        info!(id = %task.id, position = task.position, "task created");
        Ok(task)
    }

    /// Partial update. Refreshes updated_at on every call; a completed
    /// transition also sets or clears completed_at so the pairing invariant
    /// holds at the row level.
    #[instrument(skip(self, patch))]
    pub fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("failed to start transaction")?;
        let now = Utc::now();

        let mut sets: Vec<&'static str> = vec!["updated_at = ?"];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(now)];

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(notes) = &patch.notes {
            sets.push("notes = ?");
            values.push(Box::new(notes.clone()));
        }
        if let Some(category_id) = &patch.category_id {
            sets.push("category_id = ?");
            values.push(Box::new(category_id.clone()));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Box::new(priority.as_str().to_string()));
        }
        if let Some(due_date) = patch.due_date {
            sets.push("due_date = ?");
            values.push(Box::new(due_date));
        }
        if let Some(start_date) = patch.start_date {
            sets.push("start_date = ?");
            values.push(Box::new(start_date));
        }
        if let Some(position) = patch.position {
            sets.push("position = ?");
            values.push(Box::new(position));
        }
        if let Some(completed) = patch.completed {
            sets.push("completed = ?");
            values.push(Box::new(completed));
            sets.push("completed_at = ?");
            values.push(Box::new(completed.then_some(now)));
        }

        values.push(Box::new(id.to_string()));
        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        tx.execute(&sql, params_from_iter(values.iter().map(|v| &**v)))
            .context("failed to update task")?;

        let task = tx
            .query_row("SELECT * FROM tasks WHERE id = ?", params![id], task_from_row)
            .optional()
            .context("failed to reload task")?;
        tx.commit().context("failed to commit task update")?;

        if let Some(task) = &task {
            debug!(id = %task.id, "task updated");
        }
        Ok(task)
    }

    /// The whole batch lands in one transaction; either every position
    /// moves or none does.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub fn reorder_tasks(&self, items: &[ReorderItem]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("failed to start transaction")?;
        let now = Utc::now();
        {
            let mut stmt = tx
                .prepare("UPDATE tasks SET position = ?, updated_at = ? WHERE id = ?")
                .context("failed to prepare reorder update")?;
            for item in items {
                stmt.execute(params![item.position, now, item.id])
                    .context("failed to apply reorder item")?;
            }
        }
        tx.commit().context("failed to commit reorder")?;
        debug!(count = items.len(), "reorder batch applied");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM tasks WHERE id = ?", params![id])
            .context("failed to delete task")?;
        debug!(id, deleted = changed > 0, "task delete");
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, color, icon, position FROM categories ORDER BY position ASC")
            .context("failed to prepare category listing")?;
        let rows = stmt
            .query_map([], category_from_row)
            .context("failed to list categories")?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.context("failed to read category row")?);
        }
        Ok(categories)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_category(&self, input: &CategoryCreate) -> Result<Category> {
        let conn = self.conn.lock();
        let category = Category {
            id: input
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: input.name.clone(),
            color: input.color.clone().unwrap_or_else(|| "#6366f1".to_string()),
            icon: input.icon.clone().unwrap_or_else(|| "📋".to_string()),
            position: input.position.unwrap_or(0),
        };
        conn.execute(
            "INSERT INTO categories (id, name, color, icon, position) VALUES (?, ?, ?, ?, ?)",
            params![
                category.id,
                category.name,
                category.color,
                category.icon,
                category.position,
            ],
        )
        .context("failed to insert category")?;
        info!(id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, patch))]
    pub fn update_category(&self, id: &str, patch: &CategoryPatch) -> Result<Option<Category>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("failed to start transaction")?;

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(color) = &patch.color {
            sets.push("color = ?");
            values.push(Box::new(color.clone()));
        }
        if let Some(icon) = &patch.icon {
            sets.push("icon = ?");
            values.push(Box::new(icon.clone()));
        }
        if let Some(position) = patch.position {
            sets.push("position = ?");
            values.push(Box::new(position));
        }

        if !sets.is_empty() {
            values.push(Box::new(id.to_string()));
            let sql = format!("UPDATE categories SET {} WHERE id = ?", sets.join(", "));
            tx.execute(&sql, params_from_iter(values.iter().map(|v| &**v)))
                .context("failed to update category")?;
        }

        let category = tx
            .query_row(
                "SELECT id, name, color, icon, position FROM categories WHERE id = ?",
                params![id],
                category_from_row,
            )
            .optional()
            .context("failed to reload category")?;
        tx.commit().context("failed to commit category update")?;
        Ok(category)
    }

    /// Tasks survive their category: the FK is ON DELETE SET NULL, so the
    /// delete itself nulls their category_id.
    #[instrument(skip(self))]
    pub fn delete_category(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM categories WHERE id = ?", params![id])
            .context("failed to delete category")?;
        debug!(id, deleted = changed > 0, "category delete");
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    pub fn stats(&self) -> Result<StatsSummary> {
        let conn = self.conn.lock();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .context("failed to count tasks")?;
        let completed: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks WHERE completed = 1", [], |row| row.get(0))
            .context("failed to count completed tasks")?;
        let overdue: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tasks
                 WHERE completed = 0 AND due_date IS NOT NULL AND due_date < date('now')",
                [],
                |row| row.get(0),
            )
            .context("failed to count overdue tasks")?;

        Ok(StatsSummary {
            total,
            completed,
            active: total - completed,
            overdue,
        })
    }
}

fn order_clause(sort: SortMode) -> &'static str {
    match sort {
        SortMode::Position => "position ASC",
        SortMode::DueDate => "due_date ASC NULLS LAST",
        SortMode::Priority => "CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END ASC",
        SortMode::Created => "created_at DESC",
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get("priority")?;
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        notes: row.get("notes")?,
        category_id: row.get("category_id")?,
        priority: Priority::parse(&priority).unwrap_or_default(),
        due_date: row.get("due_date")?,
        start_date: row.get("start_date")?,
        completed: row.get("completed")?,
        completed_at: row.get("completed_at")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        position: row.get("position")?,
    })
}

#[cfg(test)]
mod tests {
    use tarea_shared::TaskCreate;

    use super::*;

    fn titled(title: &str) -> TaskCreate {
        TaskCreate {
            title: title.to_string(),
            ..TaskCreate::default()
        }
    }

    #[test]
    fn positions_append_with_max_plus_one() {
        let db = Db::open_in_memory().expect("open db");
        let first = db.create_task(&titled("a")).expect("create");
        let second = db.create_task(&titled("b")).expect("create");
        assert_eq!(first.position, 0.0);
        assert_eq!(second.position, 1.0);

        // a gap does not change the append rule: still strictly above max
        db.reorder_tasks(&[ReorderItem {
            id: second.id.clone(),
            position: 10.5,
        }])
        .expect("reorder");
        let third = db.create_task(&titled("c")).expect("create");
        assert_eq!(third.position, 11.5);
    }

    #[test]
    fn completed_at_tracks_completed_transitions() {
        let db = Db::open_in_memory().expect("open db");
        let task = db.create_task(&titled("a")).expect("create");
        assert!(task.completed_at.is_none());

        let done = db
            .update_task(
                &task.id,
                &TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )
            .expect("update")
            .expect("task exists");
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let reopened = db
            .update_task(
                &task.id,
                &TaskPatch {
                    completed: Some(false),
                    ..TaskPatch::default()
                },
            )
            .expect("update")
            .expect("task exists");
        assert!(!reopened.completed);
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn deleting_a_category_keeps_its_tasks_uncategorized() {
        let db = Db::open_in_memory().expect("open db");
        db.seed_default_categories().expect("seed");

        let task = db
            .create_task(&TaskCreate {
                title: "informe".to_string(),
                category_id: Some("work".to_string()),
                ..TaskCreate::default()
            })
            .expect("create");

        assert!(db.delete_category("work").expect("delete category"));
        let survivor = db.get_task(&task.id).expect("get").expect("still there");
        assert_eq!(survivor.category_id, None);
    }

    #[test]
    fn rows_survive_a_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("tarea.db");

        let task = {
            let db = Db::open(&path).expect("open db");
            db.create_task(&titled("persistente")).expect("create")
        };

        let reopened = Db::open(&path).expect("reopen db");
        let loaded = reopened
            .get_task(&task.id)
            .expect("get")
            .expect("row survived restart");
        assert_eq!(loaded.title, "persistente");
        assert_eq!(loaded.position, task.position);
    }

    #[test]
    fn update_on_missing_id_is_none() {
        let db = Db::open_in_memory().expect("open db");
        let missing = db
            .update_task(
                "nope",
                &TaskPatch {
                    title: Some("x".to_string()),
                    ..TaskPatch::default()
                },
            )
            .expect("update");
        assert!(missing.is_none());
    }
}
