//! Test helpers: a migrated Postgres container and a `Memoria` facade over it.
//!
//! Requires Docker. Migrations path from this crate root: `../../migrations`.

#![allow(dead_code)]

use async_trait::async_trait;
use memoria_core::{
    models::{
        Account, AccountRole, Coordinates, MediaKind, SignupRequest, StoredPayload,
    },
    AppError, Config,
};
use memoria_db::MIGRATOR;
use memoria_services::{DisabledGeocoder, Geocoder, Memoria, PasswordVerifier};
use memoria_storage::{LocalStorage, Storage};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::{runners::AsyncRunner, ContainerAsync};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "orbit-password";

/// Test application: facade, pool, and owned resources.
pub struct TestApp {
    pub app: Memoria,
    pub pool: PgPool,
    pub config: Config,
    pub _container: ContainerAsync<Postgres>,
    pub temp_dir: TempDir,
}

/// A signed-up account with a live session.
pub struct TestUser {
    pub account: Account,
    pub session_id: Uuid,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.account.id
    }
}

/// Cheap reversible hashing so tests do not pay for Argon2.
pub struct PlainVerifier;

impl PasswordVerifier for PlainVerifier {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        Ok(format!("plain:{}", secret))
    }

    fn verify(&self, account: &Account, secret: &str) -> Result<bool, AppError> {
        Ok(account.password_hash == format!("plain:{}", secret))
    }
}

/// Geocoder that always answers with the same coordinates.
pub struct FixedGeocoder(pub Coordinates);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, _place: &str) -> Option<Coordinates> {
        Some(self.0)
    }
}

/// Geocoder that never answers in time.
pub struct StalledGeocoder;

#[async_trait]
impl Geocoder for StalledGeocoder {
    async fn geocode(&self, _place: &str) -> Option<Coordinates> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        None
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Arc::new(DisabledGeocoder)).await
}

/// Setup a test app with an isolated database, temp-dir storage and the given geocoder.
pub async fn setup_test_app_with(geocoder: Arc<dyn Geocoder>) -> TestApp {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start Postgres container");
    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get Postgres port");

    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPoolOptions::new()
        .max_connections(30)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&connection_string)
        .await
        .expect("Failed to connect to test database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut config = Config::for_database(&connection_string);
    config.uploads.local_storage_path = temp_dir.path().display().to_string();
    config.geocoding.connect_timeout_ms = 100;
    config.geocoding.read_timeout_ms = 100;

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path(), "http://localhost:3000/uploads".to_string())
            .await
            .expect("Failed to create local storage"),
    );

    let app = Memoria::new(
        pool.clone(),
        &config,
        storage,
        geocoder,
        Arc::new(PlainVerifier),
    );

    TestApp {
        app,
        pool,
        config,
        _container: container,
        temp_dir,
    }
}

impl TestApp {
    pub async fn register_user(&self, username: &str) -> TestUser {
        self.app
            .signup(signup_request(username))
            .await
            .expect("Failed to sign up");
        self.login(username).await
    }

    pub async fn register_admin(&self, username: &str) -> TestUser {
        self.app
            .accounts()
            .create_account(signup_request(username), AccountRole::Admin)
            .await
            .expect("Failed to create admin");
        self.login(username).await
    }

    pub async fn login(&self, username: &str) -> TestUser {
        let session = self
            .app
            .login(username, TEST_PASSWORD)
            .await
            .expect("Failed to log in");
        let account = self
            .app
            .session(session.id)
            .await
            .expect("Fresh session rejected")
            .account()
            .clone();
        TestUser {
            account,
            session_id: session.id,
        }
    }

    /// Live items under a sub-collection, the thumbnail included.
    pub async fn live_item_count(&self, sub_collection_id: Uuid) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM items WHERE sub_collection_id = $1 AND is_deleted = FALSE",
        )
        .bind(sub_collection_id)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to count items")
    }

    pub async fn thumbnail_of(&self, sub_collection_id: Uuid) -> Option<Uuid> {
        sqlx::query_scalar("SELECT thumbnail_item_id FROM sub_collections WHERE id = $1")
            .bind(sub_collection_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read thumbnail")
    }
}

pub fn signup_request(username: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: TEST_PASSWORD.to_string(),
        nickname: username.to_uppercase(),
    }
}

/// Reference to content that was "stored" elsewhere; nothing is written to disk.
pub fn payload(name: &str) -> StoredPayload {
    let key = format!("media/test/{}-{}", Uuid::new_v4().simple(), name);
    StoredPayload {
        url: format!("http://localhost:3000/uploads/{}", key),
        storage_key: key,
        original_name: name.to_string(),
        mime_type: "image/png".to_string(),
        size_bytes: 1024,
        kind: MediaKind::Image,
    }
}

/// Count files written under the test storage root.
pub fn stored_file_count(app: &TestApp) -> usize {
    fn walk(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| {
                        let path = entry.path();
                        if path.is_dir() {
                            walk(&path)
                        } else {
                            1
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }
    walk(app.temp_dir.path())
}
