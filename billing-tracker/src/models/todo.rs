use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(TodoStatus::Todo),
            "in-progress" => Ok(TodoStatus::InProgress),
            "done" => Ok(TodoStatus::Done),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl FromStr for TodoPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TodoPriority::Low),
            "medium" => Ok(TodoPriority::Medium),
            "high" => Ok(TodoPriority::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// A kanban card. Assignment refers to user ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub assigned_to: Option<String>,
    pub assigned_by: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoTask {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: String::new(),
            status: TodoStatus::default(),
            priority: TodoPriority::default(),
            assigned_to: None,
            assigned_by: None,
            due_date: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign to a user, recording who made the assignment.
    pub fn assign(&mut self, assignee: Option<String>, assigner: &str) {
        self.assigned_by = assignee.as_ref().map(|_| assigner.to_string());
        self.assigned_to = assignee;
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, update: TodoUpdate, actor: &str) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(assignee) = update.assigned_to {
            if self.assigned_to != assignee {
                self.assign(assignee, actor);
            }
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Partial update. The outer `Option` means "leave unchanged"; inner `None`
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub assigned_to: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoQuery {
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
}

impl TodoQuery {
    pub fn matches(&self, task: &TodoTask) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.priority.map_or(true, |priority| task.priority == priority)
    }
}
