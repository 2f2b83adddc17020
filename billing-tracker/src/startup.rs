//! Application startup and lifecycle management.

use crate::config::{BillingTrackerConfig, StoreBackend};
use crate::handlers;
use crate::middleware::{http_metrics_middleware, JwtKeys};
use crate::models::{Role, User};
use crate::services::{
    init_metrics, ChecklistStore, InMemoryChecklistStore, InMemoryRecordStore,
    InMemoryTodoStore, InMemoryUserStore, MongoChecklistStore, MongoDb, MongoRecordStore,
    MongoTodoStore, MongoUserStore, RecordStore, TodoStore, UserStore,
};
use crate::utils::hash_password;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingTrackerConfig,
    pub records: Arc<dyn RecordStore>,
    pub checklist: Arc<dyn ChecklistStore>,
    pub todos: Arc<dyn TodoStore>,
    pub users: Arc<dyn UserStore>,
    /// `None` disables token checking.
    pub jwt: Option<JwtKeys>,
}

impl AppState {
    /// State over fresh in-memory stores.
    pub fn in_memory(config: BillingTrackerConfig) -> Self {
        let jwt = config.auth.jwt_secret.as_deref().map(JwtKeys::new);
        Self {
            config,
            records: Arc::new(InMemoryRecordStore::new()),
            checklist: Arc::new(InMemoryChecklistStore::new()),
            todos: Arc::new(InMemoryTodoStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            jwt,
        }
    }

    async fn from_config(config: BillingTrackerConfig) -> Result<Self, AppError> {
        if config.store.backend == StoreBackend::Memory {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            return Ok(Self::in_memory(config));
        }

        let mongo = config.store.mongodb.as_ref().ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("MongoDB settings missing for mongo backend"))
        })?;
        let db = MongoDb::connect(&mongo.uri, &mongo.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let jwt = config.auth.jwt_secret.as_deref().map(JwtKeys::new);
        Ok(Self {
            config,
            records: Arc::new(MongoRecordStore::new(db.clone())),
            checklist: Arc::new(MongoChecklistStore::new(db.clone())),
            todos: Arc::new(MongoTodoStore::new(db.clone())),
            users: Arc::new(MongoUserStore::new(db)),
            jwt,
        })
    }
}

/// Create the configured administrator when no user exists yet.
async fn seed_default_admin(state: &AppState) -> Result<(), AppError> {
    if state.users.count().await? > 0 {
        return Ok(());
    }

    let admin = &state.config.auth.default_admin;
    let user = User::new(
        &admin.email,
        "Administrator".to_string(),
        hash_password(&admin.password)?,
        Role::Admin,
    );
    let user = state.users.insert(user).await?;
    tracing::warn!(
        user_id = %user.id,
        email = %user.email,
        "Created default administrator; change its credentials after first sign-in"
    );
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let billing = Router::new()
        .route(
            "/",
            get(handlers::summary).delete(handlers::delete_records),
        )
        .route("/add", post(handlers::add_record))
        .route("/raw", get(handlers::raw_records))
        .route("/breakdown", get(handlers::breakdown))
        .route("/export-csv", get(handlers::export_csv))
        .route("/export-excel", get(handlers::export_excel));

    let checklist = Router::new()
        .route("/", get(handlers::list_tasks))
        .route("/add", post(handlers::add_task))
        .route("/areas", get(handlers::list_areas))
        .route("/export-csv", get(handlers::export_checklist_csv))
        .route(
            "/:id",
            patch(handlers::update_completion).delete(handlers::delete_task),
        );

    let todo = Router::new()
        .route("/", get(handlers::list_todos).post(handlers::create_todo))
        .route(
            "/:id",
            get(handlers::get_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        );

    let auth = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/signin", post(handlers::signin))
        .route("/me", get(handlers::me))
        .route("/users", get(handlers::list_users))
        .route("/users/:id/permissions", patch(handlers::update_permissions));

    let api = Router::new()
        .nest("/billing", billing)
        .nest("/checklist", checklist)
        .nest("/todo", todo)
        .route("/instance/calculate", post(handlers::calculate))
        .nest("/auth", auth)
        .route_layer(middleware::from_fn(http_metrics_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BillingTrackerConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config).await?;
        Self::with_state(state).await
    }

    /// Bind and serve over prepared state.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        init_metrics()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to register metrics: {}", e)))?;
        seed_default_admin(&state).await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            service = %state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            port = port,
            auth_enabled = state.jwt.is_some(),
            "Service ready to accept connections"
        );

        let server = axum::serve(listener, router(state.clone()));

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
