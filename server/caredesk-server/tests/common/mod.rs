//! Shared harness: an in-memory server driven through the full router
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, DurationRound, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use caredesk_server::{create_app, AppConfig, CareDeskServer};

pub const ADMIN_EMAIL: &str = "admin@caredesk.test";
pub const ADMIN_PASSWORD: &str = "Admin-pass-2030";

pub struct TestApp {
    pub router: Router,
    pub server: CareDeskServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// `data` of the success envelope
    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let server = CareDeskServer::in_memory(AppConfig::for_tests()).expect("server builds");
        server
            .identity
            .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("admin seeded");
        let router = create_app(server.clone());
        Self { router, server }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
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
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK);
        response.data()["token"].as_str().unwrap().to_string()
    }

    /// Creates an account with `role` through the admin API and logs it in
    pub async fn token_for_role(&self, admin: &str, role: &str) -> String {
        let email = format!("{role}@caredesk.test");
        let password = "Staff-pass-2030";
        let created = self
            .post(
                "/api/v1/users",
                admin,
                json!({ "email": email, "password": password, "full_name": format!("Test {role}"), "role": role }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
        let response = self.login(&email, password).await;
        response.data()["token"].as_str().unwrap().to_string()
    }

    pub async fn create_patient(&self, token: &str, first_name: &str) -> Value {
        let response = self
            .post(
                "/api/v1/patients",
                token,
                json!({
                    "first_name": first_name,
                    "last_name": "Okafor",
                    "date_of_birth": "1990-04-12",
                    "gender": "female",
                    "blood_group": "O+",
                    "phone": "+234 801 555 0101",
                    "allergies": ["penicillin"]
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.data()
    }

    pub async fn create_doctor(&self, token: &str, email: &str, fee: &str) -> Value {
        self.create_named_doctor(token, "Tunde", "Bello", email, fee).await
    }

    pub async fn create_named_doctor(
        &self,
        token: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        fee: &str,
    ) -> Value {
        let response = self
            .post(
                "/api/v1/doctors",
                token,
                json!({
                    "first_name": first_name,
                    "last_name": last_name,
                    "email": email,
                    "phone": "+234 802 555 0199",
                    "department": "Cardiology",
                    "specialization": "Cardiologist",
                    "license_number": "MDCN-20931",
                    "consultation_fee": fee
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.data()
    }

    pub async fn create_medicine(&self, token: &str, name: &str, stock: i32) -> Value {
        let response = self
            .post(
                "/api/v1/pharmacy/medicines",
                token,
                json!({
                    "name": name,
                    "category": "Antibiotic",
                    "unit": "tablet",
                    "unit_price": "2.50",
                    "stock_quantity": stock,
                    "reorder_level": 10
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.data()
    }
}

/// Whole hour two days from now
pub fn future_slot() -> DateTime<Utc> {
    (Utc::now() + Duration::days(2))
        .duration_trunc(Duration::hours(1))
        .unwrap()
}

/// `hour:00` UTC on `date`
pub fn at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}
