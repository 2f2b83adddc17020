//! Services module for billing-tracker.

pub mod checklist_store;
pub mod database;
pub mod metrics;
pub mod record_store;
pub mod todo_store;
pub mod user_store;

pub use checklist_store::{ChecklistStore, InMemoryChecklistStore, MongoChecklistStore};
pub use database::MongoDb;
pub use metrics::{
    get_metrics, init_metrics, record_export, record_http_request, record_inserted,
    record_store_operation,
};
pub use record_store::{InMemoryRecordStore, MongoRecordStore, RecordStore};
pub use todo_store::{InMemoryTodoStore, MongoTodoStore, TodoStore};
pub use user_store::{InMemoryUserStore, MongoUserStore, UserStore};
