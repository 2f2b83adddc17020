use super::metrics::record_store_operation;
use super::MongoDb;
use crate::models::{TodoPriority, TodoQuery, TodoStatus, TodoTask, TodoUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;
use tokio::sync::RwLock;

#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, task: TodoTask) -> Result<TodoTask, AppError>;

    /// Matching tasks, most recently created first.
    async fn list(&self, query: &TodoQuery) -> Result<Vec<TodoTask>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<TodoTask>, AppError>;

    /// Apply a partial update on behalf of `actor`. `None` when the id is unknown.
    async fn update(
        &self,
        id: &str,
        update: TodoUpdate,
        actor: &str,
    ) -> Result<Option<TodoTask>, AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub assigned_to: Option<String>,
    pub assigned_by: Option<String>,
    pub due_date: Option<bson::DateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<TodoTask> for TodoDocument {
    fn from(task: TodoTask) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to,
            assigned_by: task.assigned_by,
            due_date: task.due_date.map(bson::DateTime::from_chrono),
            tags: task.tags,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl From<TodoDocument> for TodoTask {
    fn from(doc: TodoDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            status: doc.status,
            priority: doc.priority,
            assigned_to: doc.assigned_to,
            assigned_by: doc.assigned_by,
            due_date: doc.due_date.map(|at| at.to_chrono()),
            tags: doc.tags,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

fn filter_document(query: &TodoQuery) -> Result<Document, AppError> {
    let mut filter = Document::new();
    if let Some(status) = query.status {
        filter.insert("status", to_bson(&status)?);
    }
    if let Some(priority) = query.priority {
        filter.insert("priority", to_bson(&priority)?);
    }
    Ok(filter)
}

fn to_bson<T: Serialize>(value: &T) -> Result<bson::Bson, AppError> {
    bson::to_bson(value)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize filter: {}", e)))
}

pub struct MongoTodoStore {
    db: MongoDb,
}

impl MongoTodoStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    async fn insert(&self, task: TodoTask) -> Result<TodoTask, AppError> {
        let started = Instant::now();
        self.db
            .todos()
            .insert_one(TodoDocument::from(task.clone()), None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to insert todo");
                AppError::from(e)
            })?;
        record_store_operation("todo_insert", started);
        Ok(task)
    }

    async fn list(&self, query: &TodoQuery) -> Result<Vec<TodoTask>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();

        let mut cursor = self
            .db
            .todos()
            .find(filter_document(query)?, options)
            .await
            .map_err(AppError::from)?;

        let mut tasks = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(AppError::from)? {
            tasks.push(TodoTask::from(doc));
        }

        record_store_operation("todo_list", started);
        Ok(tasks)
    }

    async fn get(&self, id: &str) -> Result<Option<TodoTask>, AppError> {
        let task = self
            .db
            .todos()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)?;
        Ok(task.map(TodoTask::from))
    }

    async fn update(
        &self,
        id: &str,
        update: TodoUpdate,
        actor: &str,
    ) -> Result<Option<TodoTask>, AppError> {
        let started = Instant::now();
        let Some(mut task) = self.get(id).await? else {
            return Ok(None);
        };
        task.apply(update, actor);

        let result = self
            .db
            .todos()
            .replace_one(doc! { "_id": id }, TodoDocument::from(task.clone()), None)
            .await
            .map_err(AppError::from)?;

        record_store_operation("todo_update", started);
        // Deleted between the read and the write.
        if result.matched_count == 0 {
            return Ok(None);
        }
        Ok(Some(task))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = self
            .db
            .todos()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)?;
        record_store_operation("todo_delete", started);
        Ok(result.deleted_count > 0)
    }
}

#[derive(Default)]
pub struct InMemoryTodoStore {
    tasks: RwLock<Vec<TodoTask>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, task: TodoTask) -> Result<TodoTask, AppError> {
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list(&self, query: &TodoQuery) -> Result<Vec<TodoTask>, AppError> {
        let mut tasks: Vec<TodoTask> = self
            .tasks
            .read()
            .await
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        // Newest insert first among equal timestamps.
        tasks.reverse();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn get(&self, id: &str) -> Result<Option<TodoTask>, AppError> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|task| task.id == id)
            .cloned())
    }

    async fn update(
        &self,
        id: &str,
        update: TodoUpdate,
        actor: &str,
    ) -> Result<Option<TodoTask>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|task| task.id == id).map(|task| {
            task.apply(update, actor);
            task.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        Ok(tasks.len() < before)
    }
}
