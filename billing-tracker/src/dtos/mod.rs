pub mod auth;
pub mod billing;
pub mod checklist;
pub mod instance;
pub mod todo;

pub use auth::{AuthResponse, ProfileResponse, SigninRequest, SignupRequest, UserResponse};
pub use billing::{BillingRecordResponse, DeleteRecordsResponse, SummaryParams};
pub use checklist::{
    ChecklistListParams, CreateChecklistTaskRequest, MessageResponse, UpdateCompletionRequest,
};
pub use instance::{CalculateRequest, CalculateResponse, DurationUnit};
pub use todo::{CreateTodoRequest, TodoListParams, UpdateTodoRequest};
