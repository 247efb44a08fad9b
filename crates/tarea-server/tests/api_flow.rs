//! End-to-end exercise of the REST surface: real router, real listener,
//! real HTTP client, in-memory database per test.

use std::sync::Arc;

use chrono::NaiveDate;
use tarea_core::{HttpTaskService, TaskService};
use tarea_server::{Db, router};
use tarea_shared::{
    CategoryCreate, CategoryPatch, Priority, ReorderItem, SortMode, TaskCreate, TaskListQuery,
    TaskPatch,
};

async fn spawn_server() -> HttpTaskService {
    let db = Db::open_in_memory().expect("open in-memory db");
    db.seed_default_categories().expect("seed categories");
    let app = router(Arc::new(db));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    HttpTaskService::new(format!("http://{addr}/api"))
}

fn titled(title: &str) -> TaskCreate {
    TaskCreate {
        title: title.to_string(),
        ..TaskCreate::default()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let service = spawn_server().await;
    let health = service.health().await.expect("health");
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn create_appends_and_round_trips_fields() {
    let service = spawn_server().await;

    let first = service.create_task(&titled("primera")).await.expect("create");
    let second = service
        .create_task(&TaskCreate {
            title: "segunda".to_string(),
            notes: "con notas".to_string(),
            category_id: Some("work".to_string()),
            priority: Some(Priority::High),
            due_date: NaiveDate::from_ymd_opt(2030, 6, 1),
            start_date: NaiveDate::from_ymd_opt(2030, 5, 1),
        })
        .await
        .expect("create");

    assert_eq!(first.position, 0.0);
    assert!(second.position > first.position);
    assert!(!second.completed);
    assert!(second.completed_at.is_none());

    let fetched = service.get_task(&second.id).await.expect("get");
    assert_eq!(fetched.id, second.id);
    assert_eq!(fetched.title, "segunda");
    assert_eq!(fetched.position, second.position);
    assert_eq!(fetched.notes, "con notas");
    assert_eq!(fetched.category_id.as_deref(), Some("work"));
    assert_eq!(fetched.priority, Priority::High);
    assert_eq!(fetched.due_date, NaiveDate::from_ymd_opt(2030, 6, 1));
}

#[tokio::test]
async fn create_rejects_out_of_bounds_input() {
    let service = spawn_server().await;

    let empty = service.create_task(&titled("")).await;
    let message = empty.expect_err("empty title rejected").to_string();
    assert!(message.contains("Validation failed"), "got: {message}");

    let long = service
        .create_task(&titled(&"x".repeat(501)))
        .await
        .expect_err("long title rejected")
        .to_string();
    assert!(long.contains("Validation failed"), "got: {long}");
}

#[tokio::test]
async fn completed_at_follows_the_completed_flag() {
    let service = spawn_server().await;
    let task = service.create_task(&titled("a")).await.expect("create");

    let done = service
        .update_task(
            &task.id,
            &TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");
    assert!(done.completed);
    assert!(done.completed_at.is_some());

    let reopened = service
        .update_task(
            &task.id,
            &TaskPatch {
                completed: Some(false),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");
    assert!(!reopened.completed);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn patch_distinguishes_clearing_from_leaving_untouched() {
    let service = spawn_server().await;
    let task = service
        .create_task(&TaskCreate {
            title: "con fecha".to_string(),
            category_id: Some("work".to_string()),
            due_date: NaiveDate::from_ymd_opt(2030, 6, 1),
            ..TaskCreate::default()
        })
        .await
        .expect("create");

    // a patch that only renames leaves category and due date alone
    let renamed = service
        .update_task(
            &task.id,
            &TaskPatch {
                title: Some("renombrada".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.category_id.as_deref(), Some("work"));
    assert_eq!(renamed.due_date, NaiveDate::from_ymd_opt(2030, 6, 1));

    // an explicit null clears
    let cleared = service
        .update_task(
            &task.id,
            &TaskPatch {
                category_id: Some(None),
                due_date: Some(None),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(cleared.category_id, None);
    assert_eq!(cleared.due_date, None);
}

#[tokio::test]
async fn missing_ids_surface_the_not_found_message() {
    let service = spawn_server().await;

    let get = service.get_task("missing").await;
    assert_eq!(get.expect_err("missing").to_string(), "Task not found");

    let update = service
        .update_task(
            "missing",
            &TaskPatch {
                title: Some("x".to_string()),
                ..TaskPatch::default()
            },
        )
        .await;
    assert_eq!(update.expect_err("missing").to_string(), "Task not found");
}

#[tokio::test]
async fn delete_acks_and_is_idempotent_on_the_wire() {
    let service = spawn_server().await;
    let task = service.create_task(&titled("efímera")).await.expect("create");

    service.delete_task(&task.id).await.expect("first delete");
    service.delete_task(&task.id).await.expect("second delete acks too");

    let listed = service
        .list_tasks(&TaskListQuery::default())
        .await
        .expect("list");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn reorder_batch_persists_every_pair() {
    let service = spawn_server().await;
    let a = service.create_task(&titled("a")).await.expect("create");
    let b = service.create_task(&titled("b")).await.expect("create");

    service
        .reorder_tasks(&[
            ReorderItem { id: b.id.clone(), position: 0.0 },
            ReorderItem { id: a.id.clone(), position: 1.0 },
        ])
        .await
        .expect("reorder");

    let listed = service
        .list_tasks(&TaskListQuery {
            sort: Some(SortMode::Position),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["b", "a"]);
}

#[tokio::test]
async fn list_filters_compose_server_side() {
    let service = spawn_server().await;
    service
        .create_task(&TaskCreate {
            title: "informe mensual".to_string(),
            category_id: Some("work".to_string()),
            priority: Some(Priority::High),
            ..TaskCreate::default()
        })
        .await
        .expect("create");
    service
        .create_task(&TaskCreate {
            title: "correr".to_string(),
            notes: "parque, 5k".to_string(),
            category_id: Some("health".to_string()),
            ..TaskCreate::default()
        })
        .await
        .expect("create");
    let done = service.create_task(&titled("archivada")).await.expect("create");
    service
        .update_task(
            &done.id,
            &TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("complete");

    let work = service
        .list_tasks(&TaskListQuery {
            category: Some("work".to_string()),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].title, "informe mensual");

    let all = service
        .list_tasks(&TaskListQuery {
            category: Some("all".to_string()),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(all.len(), 3);

    let searched = service
        .list_tasks(&TaskListQuery {
            search: Some("parque".to_string()),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].title, "correr");

    let pending = service
        .list_tasks(&TaskListQuery {
            completed: Some(false),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(pending.len(), 2);

    let high = service
        .list_tasks(&TaskListQuery {
            priority: Some(Priority::High),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(high.len(), 1);
}

#[tokio::test]
async fn due_date_sort_puts_undated_tasks_last() {
    let service = spawn_server().await;
    service
        .create_task(&TaskCreate {
            title: "sin fecha".to_string(),
            ..TaskCreate::default()
        })
        .await
        .expect("create");
    service
        .create_task(&TaskCreate {
            title: "tarde".to_string(),
            due_date: NaiveDate::from_ymd_opt(2030, 1, 3),
            ..TaskCreate::default()
        })
        .await
        .expect("create");
    service
        .create_task(&TaskCreate {
            title: "pronto".to_string(),
            due_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..TaskCreate::default()
        })
        .await
        .expect("create");

    let listed = service
        .list_tasks(&TaskListQuery {
            sort: Some(SortMode::DueDate),
            ..TaskListQuery::default()
        })
        .await
        .expect("list");
    let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["pronto", "tarde", "sin fecha"]);
}

#[tokio::test]
async fn deleting_a_category_unlinks_but_keeps_tasks() {
    let service = spawn_server().await;
    let task = service
        .create_task(&TaskCreate {
            title: "huérfana pronto".to_string(),
            category_id: Some("work".to_string()),
            ..TaskCreate::default()
        })
        .await
        .expect("create");

    service.delete_category("work").await.expect("delete category");

    let survivor = service.get_task(&task.id).await.expect("task survives");
    assert_eq!(survivor.category_id, None);

    let categories = service.list_categories().await.expect("list categories");
    assert!(categories.iter().all(|c| c.id != "work"));
}

#[tokio::test]
async fn categories_crud_and_ordering() {
    let service = spawn_server().await;

    let seeded = service.list_categories().await.expect("list");
    assert_eq!(seeded.len(), 6);
    assert!(seeded.windows(2).all(|w| w[0].position <= w[1].position));

    let created = service
        .create_category(&CategoryCreate {
            name: "Proyectos".to_string(),
            color: Some("#123abc".to_string()),
            icon: Some("🗂".to_string()),
            position: Some(6),
            ..CategoryCreate::default()
        })
        .await
        .expect("create");
    assert_eq!(created.color, "#123abc");

    let renamed = service
        .update_category(
            &created.id,
            &CategoryPatch {
                name: Some("Proyectos 2030".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.name, "Proyectos 2030");

    let bad_color = service
        .create_category(&CategoryCreate {
            name: "Rota".to_string(),
            color: Some("red".to_string()),
            ..CategoryCreate::default()
        })
        .await;
    let message = bad_color.expect_err("invalid color rejected").to_string();
    assert!(message.contains("Validation failed"), "got: {message}");
}

#[tokio::test]
async fn stats_summary_counts_the_whole_set() {
    let service = spawn_server().await;
    service
        .create_task(&TaskCreate {
            title: "atrasada".to_string(),
            due_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..TaskCreate::default()
        })
        .await
        .expect("create");
    service.create_task(&titled("pendiente")).await.expect("create");
    let done = service.create_task(&titled("hecha")).await.expect("create");
    service
        .update_task(
            &done.id,
            &TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("complete");

    let stats = service.stats().await.expect("stats");
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.overdue, 1);
}
