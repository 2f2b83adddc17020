#![allow(dead_code)]

use billing_tracker::config::{BillingTrackerConfig, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
use billing_tracker::startup::{AppState, Application};
use serde_json::{json, Map, Value};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "hunter22";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Token checking disabled: every request is a trusted administrator.
    pub async fn spawn() -> Self {
        Self::spawn_with_secret(None).await
    }

    /// Bearer tokens required, signed with [`TEST_JWT_SECRET`].
    pub async fn spawn_with_auth() -> Self {
        Self::spawn_with_secret(Some(TEST_JWT_SECRET)).await
    }

    async fn spawn_with_secret(secret: Option<&str>) -> Self {
        let mut config = BillingTrackerConfig::in_memory(0); // Random port for testing
        config.auth.jwt_secret = secret.map(str::to_string);

        let app = Application::with_state(AppState::in_memory(config))
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let address = format!("http://127.0.0.1:{}", port);
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Sign in and return the bearer token.
    pub async fn signin(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/signin"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200, "sign-in failed for {}", email);
        let body: Value = response.json().await.expect("Invalid sign-in body");
        body["token"].as_str().expect("Missing token").to_string()
    }

    /// Token for the seeded administrator.
    pub async fn admin_token(&self) -> String {
        self.signin(DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD).await
    }

    /// Sign up a user, have the administrator apply `access`, and return the
    /// new user's token.
    pub async fn create_user(&self, email: &str, access: Value) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200, "sign-up failed for {}", email);
        let body: Value = response.json().await.expect("Invalid sign-up body");
        let token = body["token"].as_str().expect("Missing token").to_string();
        let id = body["user"]["id"].as_str().expect("Missing user id").to_string();

        let admin = self.admin_token().await;
        let response = self
            .client
            .patch(self.url(&format!("/api/auth/users/{}/permissions", id)))
            .bearer_auth(&admin)
            .json(&access)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200, "grant update failed for {}", email);

        token
    }

    pub async fn add_record(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/billing/add"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

pub fn daily_record(date: &str, price: f64) -> Value {
    json!({
        "service": "aws",
        "resourceType": "compute",
        "sku": "c1",
        "usage": 10,
        "price": price,
        "date": date,
        "type": "daily"
    })
}

/// Permission update body: per-service `(name, can_read, can_write)` and the
/// kanban grant.
pub fn grants(services: &[(&str, bool, bool)], kanban: (bool, bool)) -> Value {
    let services: Map<String, Value> = services
        .iter()
        .map(|(service, can_read, can_write)| {
            (
                service.to_string(),
                json!({ "canRead": can_read, "canWrite": can_write }),
            )
        })
        .collect();
    json!({
        "services": services,
        "kanban": { "canRead": kanban.0, "canWrite": kanban.1 }
    })
}
