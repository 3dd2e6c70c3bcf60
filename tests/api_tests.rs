use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use ride_dispatch::config::EnvironmentConfig;
use ride_dispatch::models::{CityPricing, CorporateCreditAccount, Identity};
use ride_dispatch::notifications::BroadcastBus;
use ride_dispatch::repositories::InMemoryStore;
use ride_dispatch::utils::jwt::{generate_token, JwtConfig};
use ride_dispatch::{create_router, AppState};

struct TestApp {
    router: Router,
    jwt: JwtConfig,
    pricing: CityPricing,
    store: InMemoryStore,
}

impl TestApp {
    fn token(&self, identity: &Identity) -> String {
        generate_token(identity, &self.jwt).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Identity>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(identity) = caller {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(identity)),
            );
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
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn ride_body(&self, distance_km: f64) -> Value {
        json!({
            "vehicle_type_id": self.pricing.vehicle_type_id,
            "city_id": self.pricing.city_id,
            "pickup": { "latitude": 28.61, "longitude": 77.20, "address": "Connaught Place" },
            "drop": { "latitude": 28.55, "longitude": 77.10, "address": "IGI Airport T3" },
            "distance_km": distance_km,
            "payment_mode": "DIRECT"
        })
    }
}

async fn create_test_app() -> TestApp {
    let store = InMemoryStore::new();
    let pricing = CityPricing {
        id: Uuid::new_v4(),
        city_id: Uuid::new_v4(),
        vehicle_type_id: Uuid::new_v4(),
        base_km: Decimal::new(5, 0),
        base_fare: Decimal::new(100, 0),
        per_km_after_base: Decimal::new(20, 0),
        updated_at: Utc::now(),
    };
    store.upsert_pricing(pricing.clone()).await;

    let config = EnvironmentConfig {
        jwt_secret: "api-test-secret".to_string(),
        environment: "test".to_string(),
        ..EnvironmentConfig::default()
    };
    let jwt = JwtConfig::from(&config);
    let shared = Arc::new(store.clone());
    let state = AppState::new(
        config,
        shared.clone(),
        shared.clone(),
        shared,
        Arc::new(BroadcastBus::default()),
    );

    TestApp {
        router: create_router(state),
        jwt,
        pricing,
        store,
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ride_dispatch");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = create_test_app().await;
    let (status, body) = app
        .send(Method::GET, "/api/rides", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/rides")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quote_endpoint() {
    let app = create_test_app().await;
    let user = Identity::User(Uuid::new_v4());
    let (status, body) = app
        .send(
            Method::POST,
            "/api/rides/quote",
            Some(&user),
            Some(json!({
                "distance_km": 5.0001,
                "city_id": app.pricing.city_id,
                "vehicle_type_id": app.pricing.vehicle_type_id
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["fare"], "100.01");
    assert_eq!(app.store.ride_count().await, 0);
}

#[tokio::test]
async fn test_ride_lifecycle_over_http() {
    let app = create_test_app().await;
    let user = Identity::User(Uuid::new_v4());
    let partner = Identity::Partner(Uuid::new_v4());

    let (status, body) = app
        .send(Method::POST, "/api/rides", Some(&user), Some(app.ride_body(8.0)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["fare"], "160");
    let ride_id = body["data"]["id"].as_str().unwrap().to_string();
    let otp = body["data"]["otp"].as_str().unwrap().to_string();

    // El partner no ve el OTP
    let (status, body) = app
        .send(Method::GET, &format!("/api/rides/{ride_id}"), Some(&partner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("otp").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/rides/{ride_id}/accept"),
            Some(&partner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACCEPTED");

    let other = Identity::Partner(Uuid::new_v4());
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/rides/{ride_id}/accept"),
            Some(&other),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    for next in ["ARRIVED", "STARTED"] {
        let (status, body) = app
            .send(
                Method::PUT,
                &format!("/api/rides/{ride_id}/status"),
                Some(&partner),
                Some(json!({ "status": next })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], next);
    }

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/rides/{ride_id}/location"),
            Some(&partner),
            Some(json!({ "latitude": 28.58, "longitude": 77.15 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["partner_id"], partner.id().to_string());

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/rides/{ride_id}/location"),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let wrong = if otp == "0000" { "1111" } else { "0000" };
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/rides/{ride_id}/complete"),
            Some(&partner),
            Some(json!({ "otp": wrong })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/rides/{ride_id}/complete"),
            Some(&partner),
            Some(json!({ "otp": otp })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");
}

#[tokio::test]
async fn test_partner_cannot_book() {
    let app = create_test_app().await;
    let partner = Identity::Partner(Uuid::new_v4());
    let (status, body) = app
        .send(Method::POST, "/api/rides", Some(&partner), Some(app.ride_body(3.0)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_invalid_payload_is_bad_request() {
    let app = create_test_app().await;
    let user = Identity::User(Uuid::new_v4());
    let mut body = app.ride_body(3.0);
    body["pickup"]["latitude"] = json!(123.0);

    let (status, body) = app
        .send(Method::POST, "/api/rides", Some(&user), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_corporate_credit_endpoints() {
    let app = create_test_app().await;
    let corporate_id = Uuid::new_v4();
    app.store
        .upsert_account(CorporateCreditAccount::new(corporate_id, Decimal::new(500, 0)))
        .await;

    let admin = Identity::Admin(Uuid::new_v4());
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/corporates/{corporate_id}/credit-limit"),
            Some(&admin),
            Some(json!({ "credit_limit": "120.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["credit_balance"], "120.50");

    let corporate = Identity::Corporate(corporate_id);
    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/corporates/{corporate_id}/credit"),
            Some(&corporate),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["credit_limit"], "120.50");

    let user = Identity::User(Uuid::new_v4());
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/corporates/{corporate_id}/credit-limit"),
            Some(&user),
            Some(json!({ "credit_limit": "1000" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
