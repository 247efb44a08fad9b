use anyhow::{Context, anyhow};
use tarea_core::{CategoryFilter, HttpTaskService, Store, TaskService};
use tarea_shared::{CategoryCreate, CategoryPatch, SortMode, TaskCreate, TaskPatch};
use tracing::debug;

use crate::cli::{CategoryCommand, Cli, Command};
use crate::render;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let base = cli
        .url
        .or_else(|| std::env::var("TAREA_URL").ok())
        .unwrap_or_else(|| "http://localhost:3000/api".to_string());
    debug!(url = %base, "using task service");
    let service = HttpTaskService::new(base);

    match cli.command {
        Command::List {
            category,
            completed,
            search,
            sort,
        } => {
            let sort = sort.map(SortMode::from).unwrap_or_default();
            cmd_list(service, category, completed, search, sort).await
        }
        Command::Add {
            title,
            notes,
            category,
            priority,
            due,
            start,
        } => {
            cmd_add(
                service,
                TaskCreate {
                    title,
                    notes,
                    category_id: category,
                    priority: priority.map(Into::into),
                    due_date: due,
                    start_date: start,
                },
            )
            .await
        }
        Command::Modify {
            id,
            title,
            notes,
            category,
            no_category,
            priority,
            due,
            no_due,
            start,
            no_start,
        } => {
            let patch = TaskPatch {
                title,
                notes,
                category_id: if no_category { Some(None) } else { category.map(Some) },
                priority: priority.map(Into::into),
                due_date: if no_due { Some(None) } else { due.map(Some) },
                start_date: if no_start { Some(None) } else { start.map(Some) },
                completed: None,
                position: None,
            };
            cmd_modify(service, id, patch).await
        }
        Command::Done { id } => cmd_done(service, id).await,
        Command::Delete { id } => cmd_delete(service, id).await,
        Command::Move {
            id,
            index,
            category,
            search,
        } => cmd_move(service, id, index, category, search).await,
        Command::Categories { command } => cmd_categories(service, command).await,
        Command::Stats => cmd_stats(service).await,
        Command::Health => cmd_health(service).await,
    }
}

/// Any store action that failed left its message in the error field; turn
/// that into a failed invocation.
fn store_result(store: &Store<HttpTaskService>) -> anyhow::Result<()> {
    match &store.state().error {
        Some(message) => Err(anyhow!("{message}")),
        None => Ok(()),
    }
}

/// Accept a full id or a unique prefix of one, the way short commit hashes
/// work.
fn resolve_id(store: &Store<HttpTaskService>, id: &str) -> anyhow::Result<String> {
    let tasks = &store.state().tasks;
    if tasks.iter().any(|t| t.id == id) {
        return Ok(id.to_string());
    }

    let mut matches = tasks.iter().filter(|t| t.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(anyhow!("ambiguous task id prefix: {id}")),
        (None, _) => Err(anyhow!("no task matches id: {id}")),
    }
}

fn apply_filters(
    store: &mut Store<HttpTaskService>,
    category: Option<String>,
    completed: bool,
    search: Option<String>,
    sort: SortMode,
) {
    match category {
        Some(id) if id != "all" => store.set_category_filter(CategoryFilter::Id(id)),
        _ => store.set_category_filter(CategoryFilter::All),
    }
    store.set_completed_filter(completed);
    if let Some(search) = search {
        store.set_search(search);
    }
    store.set_sort(sort);
}

async fn cmd_list(
    service: HttpTaskService,
    category: Option<String>,
    completed: bool,
    search: Option<String>,
    sort: SortMode,
) -> anyhow::Result<()> {
    let mut store = Store::new(service);
    apply_filters(&mut store, category, completed, search, sort);
    store.fetch_all().await;
    store_result(&store)?;
    render::tasks(&store);
    Ok(())
}

async fn cmd_add(service: HttpTaskService, input: TaskCreate) -> anyhow::Result<()> {
    let mut store = Store::new(service);
    store.create(input).await;
    store_result(&store)?;
    let created = store
        .state()
        .tasks
        .last()
        .context("created task missing from local state")?;
    println!("Added {} ({})", render::short_id(&created.id), created.title);
    Ok(())
}

async fn cmd_modify(
    service: HttpTaskService,
    id: String,
    patch: TaskPatch,
) -> anyhow::Result<()> {
    if patch.is_empty() {
        return Err(anyhow!("nothing to modify; pass at least one field flag"));
    }
    let mut store = Store::new(service);
    store.fetch_all().await;
    store_result(&store)?;
    let id = resolve_id(&store, &id)?;

    store.update(&id, patch).await;
    store_result(&store)?;
    println!("Updated {}", render::short_id(&id));
    Ok(())
}

async fn cmd_done(service: HttpTaskService, id: String) -> anyhow::Result<()> {
    let mut store = Store::new(service);
    store.fetch_all().await;
    store_result(&store)?;
    let id = resolve_id(&store, &id)?;

    store.toggle_completed(&id).await;
    store_result(&store)?;

    let task = store
        .state()
        .tasks
        .iter()
        .find(|t| t.id == id)
        .context("toggled task missing from local state")?;
    if task.completed {
        println!("Completed {} ({})", render::short_id(&id), task.title);
    } else {
        println!("Reopened {} ({})", render::short_id(&id), task.title);
    }
    Ok(())
}

async fn cmd_delete(service: HttpTaskService, id: String) -> anyhow::Result<()> {
    let mut store = Store::new(service);
    store.fetch_all().await;
    store_result(&store)?;
    let id = resolve_id(&store, &id)?;

    store.delete(&id).await;
    store_result(&store)?;
    println!("Deleted {}", render::short_id(&id));
    Ok(())
}

async fn cmd_move(
    service: HttpTaskService,
    id: String,
    index: usize,
    category: Option<String>,
    search: Option<String>,
) -> anyhow::Result<()> {
    let mut store = Store::new(service);
    apply_filters(&mut store, category, false, search, SortMode::Position);
    store.fetch_all().await;
    store_result(&store)?;
    let id = resolve_id(&store, &id)?;

    let from = store
        .visible()
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| anyhow!("task {id} is not in the current view"))?;
    if index >= store.visible().len() {
        return Err(anyhow!(
            "index {index} out of range; the view has {} tasks",
            store.visible().len()
        ));
    }

    store.reorder_visible(from, index).await;
    store_result(&store)?;
    render::tasks(&store);
    Ok(())
}

async fn cmd_categories(
    service: HttpTaskService,
    command: CategoryCommand,
) -> anyhow::Result<()> {
    match command {
        CategoryCommand::List => {
            let categories = service.list_categories().await?;
            render::categories(&categories);
        }
        CategoryCommand::Add {
            name,
            id,
            color,
            icon,
            position,
        } => {
            let created = service
                .create_category(&CategoryCreate {
                    id,
                    name,
                    color,
                    icon,
                    position,
                })
                .await?;
            println!("Added category {} ({})", created.id, created.name);
        }
        CategoryCommand::Modify {
            id,
            name,
            color,
            icon,
            position,
        } => {
            let updated = service
                .update_category(
                    &id,
                    &CategoryPatch {
                        name,
                        color,
                        icon,
                        position,
                    },
                )
                .await?;
            println!("Updated category {} ({})", updated.id, updated.name);
        }
        CategoryCommand::Delete { id } => {
            service.delete_category(&id).await?;
            println!("Deleted category {id}; its tasks are now uncategorized");
        }
    }
    Ok(())
}

async fn cmd_stats(service: HttpTaskService) -> anyhow::Result<()> {
    let stats = service.stats().await?;
    println!("total     {}", stats.total);
    println!("active    {}", stats.active);
    println!("completed {}", stats.completed);
    println!("overdue   {}", stats.overdue);
    Ok(())
}

async fn cmd_health(service: HttpTaskService) -> anyhow::Result<()> {
    let health = service.health().await?;
    println!("{} ({})", health.status, health.timestamp.to_rfc3339());
    Ok(())
}
