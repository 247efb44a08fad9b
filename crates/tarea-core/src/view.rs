//! The derived task view: a pure, synchronous transform from the full task
//! list plus the active filters to the ordered list the UI renders. Never
//! mutates its input; same inputs, same output.

use std::cmp::Ordering;

use tarea_shared::{SortMode, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Id(String),
}

/// The active filter settings. `completed` is a hard partition: the view
/// shows either pending or completed tasks, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub category: CategoryFilter,
    pub completed: bool,
    pub search: String,
    pub sort: SortMode,
}

pub fn matches(task: &Task, view: &ViewState) -> bool {
    if let CategoryFilter::Id(id) = &view.category
        && task.category_id.as_deref() != Some(id.as_str())
    {
        return false;
    }

    if task.completed != view.completed {
        return false;
    }

    if !view.search.is_empty() {
        let needle = view.search.to_lowercase();
        if !task.title.to_lowercase().contains(&needle)
            && !task.notes.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    true
}

pub fn compare(a: &Task, b: &Task, sort: SortMode) -> Ordering {
    match sort {
        SortMode::Position => a.position.total_cmp(&b.position),
        // tasks without a due date sort last regardless of position
        SortMode::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortMode::Priority => b.priority.cmp(&a.priority),
        SortMode::Created => b.created_at.cmp(&a.created_at),
    }
}

/// Filter and sort without touching the source list. The sort is stable, so
/// ties keep their incoming order.
pub fn visible_tasks<'a>(tasks: &'a [Task], view: &ViewState) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = tasks.iter().filter(|task| matches(task, view)).collect();
    out.sort_by(|a, b| compare(a, b, view.sort));
    out
}
