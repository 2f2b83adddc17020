use super::metrics::record_store_operation;
use super::MongoDb;
use crate::models::checklist::{completion_stamp, sort_newest_first};
use crate::models::{ChecklistQuery, ChecklistTask};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;
use tokio::sync::RwLock;

#[async_trait]
pub trait ChecklistStore: Send + Sync {
    async fn insert(&self, task: ChecklistTask) -> Result<ChecklistTask, AppError>;

    /// Matching tasks, newest day first then newest created.
    async fn list(&self, query: &ChecklistQuery) -> Result<Vec<ChecklistTask>, AppError>;

    /// Returns `None` when no task has this id.
    async fn set_completion(
        &self,
        id: &str,
        completed: bool,
        checked_by: Option<String>,
    ) -> Result<Option<ChecklistTask>, AppError>;

    /// Returns `false` when no task has this id.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Distinct areas, sorted.
    async fn areas(&self) -> Result<Vec<String>, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub area: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
    pub checked_by: Option<String>,
    pub checked_at: Option<bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<ChecklistTask> for ChecklistDocument {
    fn from(task: ChecklistTask) -> Self {
        Self {
            id: task.id,
            area: task.area,
            date: task.date,
            task_name: task.task_name,
            description: task.description,
            is_completed: task.is_completed,
            checked_by: task.checked_by,
            checked_at: task.checked_at.map(bson::DateTime::from_chrono),
            created_at: task.created_at,
        }
    }
}

impl From<ChecklistDocument> for ChecklistTask {
    fn from(doc: ChecklistDocument) -> Self {
        Self {
            id: doc.id,
            area: doc.area,
            date: doc.date,
            task_name: doc.task_name,
            description: doc.description,
            is_completed: doc.is_completed,
            checked_by: doc.checked_by,
            checked_at: doc.checked_at.map(|at| at.to_chrono()),
            created_at: doc.created_at,
        }
    }
}

fn filter_document(query: &ChecklistQuery) -> Document {
    let mut filter = Document::new();
    if let Some(area) = &query.area {
        filter.insert("area", area.as_str());
    }
    let mut range = Document::new();
    if let Some(from) = query.date_from {
        range.insert("$gte", bson::DateTime::from_chrono(from));
    }
    if let Some(until) = query.date_until {
        range.insert("$lt", bson::DateTime::from_chrono(until));
    }
    if !range.is_empty() {
        filter.insert("date", range);
    }
    filter
}

pub struct MongoChecklistStore {
    db: MongoDb,
}

impl MongoChecklistStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChecklistStore for MongoChecklistStore {
    async fn insert(&self, task: ChecklistTask) -> Result<ChecklistTask, AppError> {
        let started = Instant::now();
        self.db
            .checklist_tasks()
            .insert_one(ChecklistDocument::from(task.clone()), None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to insert checklist task");
                AppError::from(e)
            })?;
        record_store_operation("checklist_insert", started);
        Ok(task)
    }

    async fn list(&self, query: &ChecklistQuery) -> Result<Vec<ChecklistTask>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder()
            .sort(doc! { "date": -1, "createdAt": -1 })
            .build();

        let mut cursor = self
            .db
            .checklist_tasks()
            .find(filter_document(query), options)
            .await
            .map_err(AppError::from)?;

        let mut tasks = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(AppError::from)? {
            tasks.push(ChecklistTask::from(doc));
        }

        record_store_operation("checklist_list", started);
        Ok(tasks)
    }

    async fn set_completion(
        &self,
        id: &str,
        completed: bool,
        checked_by: Option<String>,
    ) -> Result<Option<ChecklistTask>, AppError> {
        let started = Instant::now();
        let (checked_by, checked_at) = completion_stamp(completed, checked_by);
        let checked_by = checked_by.map_or(Bson::Null, Bson::String);
        let checked_at = checked_at
            .map(bson::DateTime::from_chrono)
            .map_or(Bson::Null, Bson::DateTime);
        let update = doc! {
            "$set": {
                "isCompleted": completed,
                "checkedBy": checked_by,
                "checkedAt": checked_at,
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .db
            .checklist_tasks()
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await
            .map_err(AppError::from)?;

        record_store_operation("checklist_update", started);
        Ok(updated.map(ChecklistTask::from))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = self
            .db
            .checklist_tasks()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)?;
        record_store_operation("checklist_delete", started);
        Ok(result.deleted_count > 0)
    }

    async fn areas(&self) -> Result<Vec<String>, AppError> {
        let values = self
            .db
            .checklist_tasks()
            .distinct("area", None, None)
            .await
            .map_err(AppError::from)?;

        let mut areas: Vec<String> = values
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(area) => Some(area),
                _ => None,
            })
            .collect();
        areas.sort();
        Ok(areas)
    }
}

#[derive(Default)]
pub struct InMemoryChecklistStore {
    tasks: RwLock<Vec<ChecklistTask>>,
}

impl InMemoryChecklistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChecklistStore for InMemoryChecklistStore {
    async fn insert(&self, task: ChecklistTask) -> Result<ChecklistTask, AppError> {
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list(&self, query: &ChecklistQuery) -> Result<Vec<ChecklistTask>, AppError> {
        let mut tasks: Vec<ChecklistTask> = self
            .tasks
            .read()
            .await
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn set_completion(
        &self,
        id: &str,
        completed: bool,
        checked_by: Option<String>,
    ) -> Result<Option<ChecklistTask>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|task| task.id == id).map(|task| {
            task.set_completion(completed, checked_by);
            task.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        Ok(tasks.len() < before)
    }

    async fn areas(&self) -> Result<Vec<String>, AppError> {
        let mut areas: Vec<String> = self
            .tasks
            .read()
            .await
            .iter()
            .map(|task| task.area.clone())
            .collect();
        areas.sort();
        areas.dedup();
        Ok(areas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(area: &str, day: u32) -> ChecklistTask {
        ChecklistTask::new(
            area,
            Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            "Check alarms".to_string(),
            String::new(),
        )
    }

    #[tokio::test]
    async fn areas_are_distinct_and_sorted() {
        let store = InMemoryChecklistStore::new();
        for area in ["network", "backups", "network"] {
            store.insert(task(area, 5)).await.unwrap();
        }
        assert_eq!(store.areas().await.unwrap(), vec!["backups", "network"]);
    }

    #[tokio::test]
    async fn completion_on_unknown_id_is_none() {
        let store = InMemoryChecklistStore::new();
        assert!(store
            .set_completion("missing", true, None)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_area_and_window() {
        let store = InMemoryChecklistStore::new();
        store.insert(task("backups", 4)).await.unwrap();
        store.insert(task("backups", 5)).await.unwrap();
        store.insert(task("network", 5)).await.unwrap();

        let query = ChecklistQuery {
            area: Some("backups".to_string()),
            date_from: Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
            date_until: None,
        };
        let tasks = store.list(&query).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].area, "backups");
    }

    #[test]
    fn empty_query_has_empty_filter() {
        assert!(filter_document(&ChecklistQuery::default()).is_empty());
    }
}
