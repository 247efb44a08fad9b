//! Manual-ordering planner for drag-and-drop. Positions are rewritten only
//! for the visible subset; tasks outside the active filter keep whatever
//! position they last had, so values are meaningful relative to the view
//! they were assigned in.

use tarea_shared::{ReorderItem, Task};

/// Move one element from `from` to `to`, shifting the rest. The same simple
/// array move a sortable list widget performs on drop.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    let item = out.remove(from);
    out.insert(to, item);
    out
}

/// Plan the batch update for dragging the visible row at `from` onto `to`:
/// every visible task gets its 0-based index in the new order as position.
/// Degenerate moves produce an empty plan.
pub fn plan_reorder(visible: &[&Task], from: usize, to: usize) -> Vec<ReorderItem> {
    if from == to || from >= visible.len() || to >= visible.len() {
        return Vec::new();
    }

    let ids: Vec<&str> = visible.iter().map(|task| task.id.as_str()).collect();
    array_move(&ids, from, to)
        .into_iter()
        .enumerate()
        .map(|(index, id)| ReorderItem {
            id: id.to_string(),
            position: index as f64,
        })
        .collect()
}
