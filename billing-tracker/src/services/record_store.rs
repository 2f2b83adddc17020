//! Billing record persistence.

use super::metrics::record_store_operation;
use super::MongoDb;
use crate::billing::{aggregate, Granularity, PeriodSummary, RecordQuery};
use crate::models::{BillingRecord, EntryType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;
use tokio::sync::RwLock;

/// Append-only store of billing line items.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: BillingRecord) -> Result<BillingRecord, AppError>;

    /// Matching records, date ascending.
    async fn query(&self, query: &RecordQuery) -> Result<Vec<BillingRecord>, AppError>;

    /// Period sums computed by the store, ascending by period.
    async fn aggregate_by_period(
        &self,
        query: &RecordQuery,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummary>, AppError>;

    /// Administrative bulk delete. Returns the number of records removed.
    async fn delete_matching(&self, query: &RecordQuery) -> Result<u64, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Stored shape of a billing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub service: String,
    pub resource_type: String,
    pub sku: String,
    pub usage: f64,
    pub usage_unit: String,
    pub price: f64,
    pub discounted_price: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub entry_type: EntryType,
}

impl From<BillingRecord> for RecordDocument {
    fn from(record: BillingRecord) -> Self {
        Self {
            id: record.id,
            service: record.service,
            resource_type: record.resource_type,
            sku: record.sku,
            usage: record.usage,
            usage_unit: record.usage_unit,
            price: record.price,
            discounted_price: record.discounted_price,
            date: record.date,
            entry_type: record.entry_type,
        }
    }
}

impl From<RecordDocument> for BillingRecord {
    fn from(doc: RecordDocument) -> Self {
        Self {
            id: doc.id,
            service: doc.service,
            resource_type: doc.resource_type,
            sku: doc.sku,
            usage: doc.usage,
            usage_unit: doc.usage_unit,
            price: doc.price,
            discounted_price: doc.discounted_price,
            date: doc.date,
            entry_type: doc.entry_type,
        }
    }
}

/// Translate a resolved query into a MongoDB filter document.
pub fn filter_document(query: &RecordQuery) -> Document {
    let mut filter = doc! { "service": query.service.as_str() };

    if let Some(sku) = &query.sku {
        filter.insert("sku", sku.as_str());
    }
    if let Some(resource_type) = &query.resource_type {
        filter.insert("resourceType", resource_type.as_str());
    }
    if let Some(entry_type) = query.entry_type {
        filter.insert("entryType", entry_type.as_str());
    }
    if let Some(period) = &query.period {
        filter.insert(
            "date",
            doc! {
                "$gte": bson::DateTime::from_chrono(period.start),
                "$lt": bson::DateTime::from_chrono(period.end),
            },
        );
    }

    filter
}

/// `$match` → `$group` by formatted date → `$project` → `$sort`.
pub fn period_pipeline(query: &RecordQuery, granularity: Granularity) -> Vec<Document> {
    vec![
        doc! { "$match": filter_document(query) },
        doc! {
            "$group": {
                "_id": {
                    "$dateToString": {
                        "format": granularity.date_format(),
                        "date": "$date",
                        "timezone": "UTC",
                    }
                },
                "usage": { "$sum": "$usage" },
                "price": { "$sum": "$price" },
                "discountedPrice": { "$sum": "$discountedPrice" },
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "period": "$_id",
                "usage": 1,
                "price": 1,
                "discountedPrice": 1,
            }
        },
        doc! { "$sort": { "period": 1 } },
    ]
}

pub struct MongoRecordStore {
    db: MongoDb,
}

impl MongoRecordStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn insert(&self, record: BillingRecord) -> Result<BillingRecord, AppError> {
        let started = Instant::now();
        self.db
            .billing_records()
            .insert_one(RecordDocument::from(record.clone()), None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to insert billing record");
                AppError::from(e)
            })?;
        record_store_operation("record_insert", started);
        Ok(record)
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<BillingRecord>, AppError> {
        let started = Instant::now();
        let options = FindOptions::builder().sort(doc! { "date": 1 }).build();

        let mut cursor = self
            .db
            .billing_records()
            .find(filter_document(query), options)
            .await
            .map_err(AppError::from)?;

        let mut records = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(AppError::from)? {
            records.push(BillingRecord::from(doc));
        }

        record_store_operation("record_query", started);
        Ok(records)
    }

    async fn aggregate_by_period(
        &self,
        query: &RecordQuery,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummary>, AppError> {
        let started = Instant::now();
        let mut cursor = self
            .db
            .billing_records()
            .aggregate(period_pipeline(query, granularity), None)
            .await
            .map_err(AppError::from)?;

        let mut periods = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(AppError::from)? {
            let summary: PeriodSummary = bson::from_document(doc).map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Malformed aggregation row: {}", e))
            })?;
            periods.push(summary);
        }

        record_store_operation("record_aggregate", started);
        Ok(periods)
    }

    async fn delete_matching(&self, query: &RecordQuery) -> Result<u64, AppError> {
        let started = Instant::now();
        let result = self
            .db
            .billing_records()
            .delete_many(filter_document(query), None)
            .await
            .map_err(AppError::from)?;
        record_store_operation("record_delete", started);
        Ok(result.deleted_count)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

/// Process-local record store.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<BillingRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: BillingRecord) -> Result<BillingRecord, AppError> {
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<BillingRecord>, AppError> {
        let mut matched: Vec<BillingRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matched.sort_by_key(|record| record.date);
        Ok(matched)
    }

    async fn aggregate_by_period(
        &self,
        query: &RecordQuery,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummary>, AppError> {
        let records = self.query(query).await?;
        Ok(aggregate(&records, granularity))
    }

    async fn delete_matching(&self, query: &RecordQuery) -> Result<u64, AppError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| !query.matches(record));
        Ok((before - records.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
