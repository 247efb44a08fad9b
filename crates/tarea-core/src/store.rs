//! The client state store: one snapshot of tasks, categories and UI state,
//! mutated only through actions that follow the optimistic-update
//! discipline — apply locally, call the service, reconcile or roll back.

use std::future::Future;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::reorder;
use crate::service::TaskService;
use crate::view::{self, CategoryFilter, ViewState};
use tarea_shared::{Category, ReorderItem, SortMode, Task, TaskCreate, TaskListQuery, TaskPatch};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Modal {
    #[default]
    Closed,
    Create,
    Edit(Task),
}

/// The store's whole world. Cloning it yields the snapshots the rollback
/// rules are defined over.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub view: ViewState,
    pub loading: bool,
    /// Single replaceable error message; each failed action overwrites it.
    pub error: Option<String>,
    pub dark: bool,
    pub modal: Modal,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            categories: Vec::new(),
            view: ViewState::default(),
            loading: false,
            error: None,
            dark: true,
            modal: Modal::Closed,
        }
    }
}

/// What happens to local state when the remote step of an action fails.
#[derive(Debug, Clone)]
pub enum Rollback {
    /// Leave local state as-is; the error message is the only signal.
    Keep,
    /// Put the pre-mutation copy of one task back.
    RestoreTask(Task),
    /// Restore the full pre-mutation task list.
    RestoreTasks(Vec<Task>),
    /// Discard optimistic state and refetch from the service.
    Resync,
}

/// The uniform optimistic-action step: the local apply has already run by
/// the time this is called. Awaits the remote call, reconciles on success,
/// otherwise records the error and applies the rollback. Returns true when
/// the failure asks for a full resync, which the caller performs.
async fn settle<T, Fut>(
    state: &mut StoreState,
    remote: Fut,
    reconcile: impl FnOnce(&mut StoreState, T),
    rollback: Rollback,
) -> bool
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    match remote.await {
        Ok(value) => {
            reconcile(state, value);
            false
        }
        Err(err) => {
            debug!(error = %err, "remote step failed, applying rollback");
            state.error = Some(format!("{err:#}"));
            match rollback {
                Rollback::Keep => false,
                Rollback::RestoreTask(prior) => {
                    if let Some(task) = state.tasks.iter_mut().find(|t| t.id == prior.id) {
                        *task = prior;
                    }
                    false
                }
                Rollback::RestoreTasks(prior) => {
                    state.tasks = prior;
                    false
                }
                Rollback::Resync => true,
            }
        }
    }
}

pub struct Store<S> {
    state: StoreState,
    service: S,
}

impl<S: TaskService> Store<S> {
    pub fn new(service: S) -> Self {
        Self {
            state: StoreState::default(),
            service,
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The filtered, sorted list the UI renders right now.
    pub fn visible(&self) -> Vec<&Task> {
        view::visible_tasks(&self.state.tasks, &self.state.view)
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.state.view.category = category;
    }

    pub fn set_completed_filter(&mut self, completed: bool) {
        self.state.view.completed = completed;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.state.view.search = search.into();
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.state.view.sort = sort;
    }

    pub fn toggle_dark(&mut self) {
        self.state.dark = !self.state.dark;
    }

    pub fn open_modal(&mut self, editing: Option<Task>) {
        self.state.modal = match editing {
            Some(task) => Modal::Edit(task),
            None => Modal::Create,
        };
    }

    pub fn close_modal(&mut self) {
        self.state.modal = Modal::Closed;
    }

    /// Replace local tasks and categories with the service's current full
    /// set. Also the recovery path after a failed reorder. A task-list
    /// failure lands in the error flag; a category-list failure is silent
    /// and keeps the stale local list.
    #[instrument(skip(self))]
    pub async fn fetch_all(&mut self) {
        self.state.loading = true;
        self.state.error = None;

        match self.service.list_tasks(&TaskListQuery::default()).await {
            Ok(tasks) => self.state.tasks = tasks,
            Err(err) => self.state.error = Some(format!("{err:#}")),
        }

        if let Ok(categories) = self.service.list_categories().await {
            self.state.categories = categories;
        }

        self.state.loading = false;
    }

    /// No optimistic insert: the server assigns id and position, so the row
    /// is appended only once it exists authoritatively.
    #[instrument(skip(self, input), fields(title_len = input.title.len()))]
    pub async fn create(&mut self, input: TaskCreate) {
        settle(
            &mut self.state,
            self.service.create_task(&input),
            |state, task| state.tasks.push(task),
            Rollback::Keep,
        )
        .await;
    }

    /// Generic update waits for confirmation, then swaps in the returned
    /// authoritative row.
    #[instrument(skip(self, patch))]
    pub async fn update(&mut self, id: &str, patch: TaskPatch) {
        settle(
            &mut self.state,
            self.service.update_task(id, &patch),
            |state, task: Task| {
                if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == task.id) {
                    *slot = task;
                }
            },
            Rollback::Keep,
        )
        .await;
    }

    /// Optimistic flip of `completed`. `completed_at` flips with it so the
    /// local cache keeps the pairing invariant without waiting for a
    /// refetch. On failure the prior row comes back; on success the
    /// response is discarded — the flip already happened.
    #[instrument(skip(self))]
    pub async fn toggle_completed(&mut self, id: &str) {
        let Some(prior) = self.state.tasks.iter().find(|t| t.id == id).cloned() else {
            return;
        };
        let next = !prior.completed;

        if let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = next;
            task.completed_at = next.then(Utc::now);
        }

        let patch = TaskPatch {
            completed: Some(next),
            ..TaskPatch::default()
        };
        settle(
            &mut self.state,
            self.service.update_task(id, &patch),
            |_, _: Task| {},
            Rollback::RestoreTask(prior),
        )
        .await;
    }

    /// Optimistic removal. Failure restores the full prior list, not just
    /// the row, so ordering artifacts cannot creep in.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) {
        let prior = self.state.tasks.clone();
        self.state.tasks.retain(|t| t.id != id);

        settle(
            &mut self.state,
            self.service.delete_task(id),
            |_, ()| {},
            Rollback::RestoreTasks(prior),
        )
        .await;
    }

    /// Apply every (id, position) pair optimistically and persist the batch.
    /// A failure does NOT snap back to the prior snapshot — the drag has
    /// already visually completed — it discards the optimistic positions by
    /// resyncing from the service.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn reorder(&mut self, items: Vec<ReorderItem>) {
        for item in &items {
            if let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == item.id) {
                task.position = item.position;
            }
        }

        let resync = settle(
            &mut self.state,
            self.service.reorder_tasks(&items),
            |_, ()| {},
            Rollback::Resync,
        )
        .await;

        if resync {
            self.fetch_all().await;
        }
    }

    /// Plan and submit a drag of the visible row at `from` onto `to`. Only
    /// meaningful under manual ordering; the other sort modes derive order
    /// from task fields, so the gesture is ignored there.
    #[instrument(skip(self))]
    pub async fn reorder_visible(&mut self, from: usize, to: usize) {
        if self.state.view.sort != SortMode::Position {
            debug!(
                sort = self.state.view.sort.as_str(),
                "drag ignored outside manual ordering"
            );
            return;
        }

        let items = {
            let visible = self.visible();
            reorder::plan_reorder(&visible, from, to)
        };
        if items.is_empty() {
            return;
        }

        self.reorder(items).await;
    }
}
