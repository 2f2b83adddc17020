use super::checklist_store::ChecklistDocument;
use super::record_store::RecordDocument;
use super::todo_store::TodoDocument;
use super::user_store::UserDocument;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for billing-tracker");

        create_index(
            &self.billing_records(),
            doc! { "service": 1, "date": 1 },
            "service_date_lookup",
            false,
        )
        .await?;
        create_index(
            &self.billing_records(),
            doc! { "service": 1, "entryType": 1 },
            "service_entry_type_lookup",
            false,
        )
        .await?;
        create_index(
            &self.checklist_tasks(),
            doc! { "area": 1, "date": -1 },
            "area_date_lookup",
            false,
        )
        .await?;
        create_index(&self.todos(), doc! { "status": 1 }, "status_lookup", false).await?;
        create_index(&self.todos(), doc! { "createdAt": -1 }, "created_at_order", false).await?;
        create_index(&self.users(), doc! { "email": 1 }, "email_unique", true).await?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn billing_records(&self) -> Collection<RecordDocument> {
        self.db.collection("billing_records")
    }

    pub fn checklist_tasks(&self) -> Collection<ChecklistDocument> {
        self.db.collection("checklist_tasks")
    }

    pub fn todos(&self) -> Collection<TodoDocument> {
        self.db.collection("todos")
    }

    pub fn users(&self) -> Collection<UserDocument> {
        self.db.collection("users")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

async fn create_index<T>(
    collection: &Collection<T>,
    keys: Document,
    name: &str,
    unique: bool,
) -> Result<(), AppError>
where
    T: Send + Sync,
{
    let index = IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(unique)
                .build(),
        )
        .build();

    collection.create_index(index, None).await.map_err(|e| {
        tracing::error!(
            "Failed to create index {} on {} collection: {}",
            name,
            collection.name(),
            e
        );
        AppError::from(e)
    })?;
    tracing::info!("Created index {} on {}", name, collection.name());
    Ok(())
}
