//! Client-side core of the tarea task tracker: the state store with its
//! optimistic-mutation discipline, the derived task view, the
//! manual-ordering planner, and the HTTP client for the task service.

pub mod http;
pub mod reorder;
pub mod service;
pub mod store;
pub mod view;

pub use http::HttpTaskService;
pub use service::TaskService;
pub use store::{Modal, Rollback, Store, StoreState};
pub use view::{CategoryFilter, ViewState};
