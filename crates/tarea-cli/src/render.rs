use tarea_core::{HttpTaskService, Store};
use tarea_shared::Category;

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn tasks(store: &Store<HttpTaskService>) {
    let state = store.state();
    let visible = store.visible();
    if visible.is_empty() {
        println!("No tasks in this view.");
        return;
    }

    println!(
        "{:<10} {:<8} {:<12} {:<16} Title",
        "ID", "Pri", "Due", "Category"
    );
    for task in visible {
        let category = task
            .category_id
            .as_deref()
            .and_then(|id| state.categories.iter().find(|c| c.id == id))
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        let due = task
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<8} {:<12} {:<16} {}",
            short_id(&task.id),
            task.priority.as_str(),
            due,
            category,
            task.title
        );
    }
}

pub fn categories(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories.");
        return;
    }

    println!("{:<12} {:<4} {:<9} {:<4} Name", "ID", "Pos", "Color", "");
    for category in categories {
        println!(
            "{:<12} {:<4} {:<9} {:<4} {}",
            category.id, category.position, category.color, category.icon, category.name
        );
    }
}
