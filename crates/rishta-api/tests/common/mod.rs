#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use rishta_api::{AppState, AppStateInner, auth};
use rishta_db::Database;
use rishta_notify::Notifier;
use rishta_notify::push::DisabledPush;

pub const USER_SECRET: &str = "test-member-secret-0123456789abcdef";
pub const ADMIN_SECRET: &str = "test-admin-secret-fedcba9876543210";
pub const ADMIN_EMAIL: &str = "admin@rishta.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Member {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        auth::seed_admin(&db, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
        let notifier = Notifier::new(db.clone(), Arc::new(DisabledPush));
        let state: AppState = Arc::new(AppStateInner {
            db,
            user_jwt_secret: USER_SECRET.into(),
            admin_jwt_secret: ADMIN_SECRET.into(),
            token_ttl_days: 1,
            notifier,
        });
        Self {
            router: rishta_api::router(state.clone()),
            state,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn register(&self, email: &str, role: &str) -> Member {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": email.split('@').next().unwrap(),
                    "email": email,
                    "phone": "+91 98765 43210",
                    "password": "password123",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Member {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// A verified member holding a 30 day boost.
    pub async fn boosted(&self, email: &str, role: &str) -> Member {
        let member = self.register(email, role).await;
        let now = Utc::now();
        self.db().set_verified(member.id, true, now).unwrap();
        self.db().grant_boost(member.id, 30, "INR", now).unwrap().unwrap();
        member
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/admin/auth/login",
                None,
                Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Waits for fire-and-forget notification tasks to land.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
