pub mod access;
pub mod billing;
pub mod checklist;
pub mod todo;
pub mod user;

pub use access::{Access, AccessTokenClaims, Permissions, Resource, Role};
pub use billing::{BillingRecord, EntryType, NewBillingRecord, DEFAULT_USAGE_UNIT};
pub use checklist::{ChecklistQuery, ChecklistTask};
pub use todo::{TodoPriority, TodoQuery, TodoStatus, TodoTask, TodoUpdate};
pub use user::{normalize_email, AccessUpdate, User};
