//! Router test harness: in-memory stores, in-memory sessions and a cookie jar
//! of one.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
    routing::post,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::Session;

use bazaar_core::{AccountId, AccountRole};

use crate::config::{LogFormat, SentryConfig, StorefrontConfig};
use crate::db::{MemoryStore, Stores};
use crate::middleware::{ACCOUNT_HEADER, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Product};
use crate::services::PricePolicy;
use crate::state::AppState;

pub const ADMIN_TOKEN: &str = "kX9#mPq2$vL7nR4wT8zB3cF6hJ1dG5sA";

pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/bazaar_test"),
        host: std::net::Ipv4Addr::LOCALHOST.into(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        admin_token: SecretString::from(ADMIN_TOKEN),
        trust_account_header: true,
        price_policy: PricePolicy::Submitted,
        log_format: LogFormat::Pretty,
        sentry: SentryConfig::default(),
    }
}

#[derive(serde::Deserialize)]
struct SignIn {
    id: AccountId,
    #[serde(default)]
    admin: bool,
}

/// Stand-in for the external sign-in flow.
async fn sign_in(session: Session, axum::Json(body): axum::Json<SignIn>) -> StatusCode {
    let user = CurrentUser {
        id: body.id,
        email: None,
        role: if body.admin {
            AccountRole::Admin
        } else {
            AccountRole::Customer
        },
    };
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn sign_out(session: Session) -> StatusCode {
    match clear_current_user(&session).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
    cookie: Option<String>,
    account: Option<AccountId>,
    bearer: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_stores(config, &Stores::in_memory(&store), None);
        let routes = super::routes()
            .route("/test/sign-in", post(sign_in))
            .route("/test/sign-out", post(sign_out));
        let router = super::with_layers(routes, state, tower_sessions::MemoryStore::default());
        Self {
            store,
            router,
            cookie: None,
            account: None,
            bearer: None,
        }
    }

    pub async fn product(&self, name: &str, price: u32, stock: u32) -> Product {
        self.store
            .insert_product(name, Decimal::from(price), stock)
            .await
    }

    /// Send subsequent requests as this account via the trusted header.
    pub fn as_account(&mut self, id: i32) -> &mut Self {
        self.account = Some(AccountId::new(id));
        self
    }

    /// Send subsequent requests anonymously (session cookie kept).
    pub fn as_guest(&mut self) -> &mut Self {
        self.account = None;
        self
    }

    pub fn with_admin_token(&mut self, token: &str) -> &mut Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn call(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(account) = self.account {
            builder = builder.header(ACCOUNT_HEADER, account.to_string());
        }
        if let Some(token) = &self.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Sign in through the session, as the external auth flow would.
    pub async fn sign_in(&mut self, id: i32, admin: bool) {
        let (status, _) = self
            .call(
                Method::POST,
                "/test/sign-in",
                Some(serde_json::json!({ "id": id, "admin": admin })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    pub async fn sign_out(&mut self) {
        let (status, _) = self.call(Method::POST, "/test/sign-out", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
