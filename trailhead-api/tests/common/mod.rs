//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An app wired to the in-memory store
//! - A mailer that records messages and can be told to fail
//! - A payment provider that records checkout requests
//! - User/tour creation and JWT token generation
//! - A one-shot request helper returning status, headers and JSON body

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use trailhead_api::app::{build_router, AppState};
use trailhead_api::config::Config;
use trailhead_shared::auth::jwt::{create_token, Claims};
use trailhead_shared::auth::password::hash_password;
use trailhead_shared::auth::roles::Role;
use trailhead_shared::models::tour::{CreateTour, Difficulty, GeoPoint, Tour};
use trailhead_shared::models::user::{CreateUser, User};
use trailhead_shared::services::mailer::{MailError, MailMessage, Mailer};
use trailhead_shared::services::payments::{CheckoutRequest, PaymentError, PaymentProvider};
use trailhead_shared::store::Stores;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub const TEST_PASSWORD: &str = "test1234";

/// Mailer that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<MailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if *self.fail.lock().unwrap() {
            return Err(MailError::Delivery("smtp unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Payment provider answering every request with a fixed checkout link
#[derive(Default)]
pub struct FakePayments {
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_preference(&self, request: &CheckoutRequest) -> Result<Value, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(json!({
            "id": "pref-123",
            "init_point": "https://payments.example.com/checkout/pref-123",
        }))
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub stores: Stores,
    pub config: Config,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<FakePayments>,
}

/// Response pieces the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Creates a new test context on a fresh in-memory store
    pub fn new() -> Self {
        let config = Config::from_vars(|key| match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })
        .expect("test configuration is valid");

        let stores = Stores::memory();
        let mailer = Arc::new(RecordingMailer::default());
        let payments = Arc::new(FakePayments::default());

        let state = AppState::new(
            stores.clone(),
            config.clone(),
            mailer.clone(),
            payments.clone(),
        );

        TestContext {
            app: build_router(state),
            stores,
            config,
            mailer,
            payments,
        }
    }

    /// Creates an active user with [`TEST_PASSWORD`]
    pub async fn create_user(&self, role: Role) -> User {
        self.stores
            .users
            .create(CreateUser {
                name: "Test User".to_string(),
                email: format!("test-{}@example.com", Uuid::new_v4().simple()),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                role,
                photo: None,
            })
            .await
            .expect("Failed to create user")
    }

    pub async fn create_tour(&self, name: &str, price: f64) -> Tour {
        self.stores
            .tours
            .create(tour_input(name, price))
            .await
            .expect("Failed to create tour")
    }

    /// Session token for `user`, valid for a day
    pub fn token_for(&self, user: &User) -> String {
        create_token(&Claims::new(user.id, Duration::days(1)), TEST_SECRET).unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    /// Sends one request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub fn tour_input(name: &str, price: f64) -> CreateTour {
    CreateTour {
        name: name.to_string(),
        duration: 5,
        max_group_size: 25,
        difficulty: Difficulty::Easy,
        price,
        price_discount: None,
        summary: "Breathtaking hike through the Canadian Banff National Park".to_string(),
        description: None,
        image_cover: "tour-1-cover.jpg".to_string(),
        images: Vec::new(),
        start_dates: Vec::new(),
        secret_tour: false,
        start_location: GeoPoint::new(-116.214531, 51.417611),
        locations: Vec::new(),
        guides: Vec::new(),
    }
}

/// JSON body accepted by `POST /api/v1/tours`
pub fn tour_body(name: &str, price: f64) -> Value {
    json!({
        "name": name,
        "duration": 5,
        "maxGroupSize": 25,
        "difficulty": "easy",
        "price": price,
        "summary": "Breathtaking hike through the Canadian Banff National Park",
        "imageCover": "tour-1-cover.jpg",
        "startLocation": {
            "type": "Point",
            "coordinates": [-116.214531, 51.417611],
            "description": "Banff, CAN"
        }
    })
}
