//! Reports through the HTTP router over the in-memory store
//!
//! These tests verify that:
//! 1. Availability leaves out booked slots
//! 2. Pharmacy reports cover expired stock and stock value
//! 3. Analytics endpoints are admin-only and return ordered, zero-filled data
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{at_hour, future_slot, id_of, TestApp};

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn book(app: &TestApp, token: &str, patient_id: &str, doctor_id: &str, at: DateTime<Utc>) -> String {
    let response = app
        .post(
            "/api/v1/appointments",
            token,
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": at.to_rfc3339(),
                "reason": "Review"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    id_of(&response.data())
}

async fn medicine_with_expiry(app: &TestApp, token: &str, name: &str, stock: i32, expiry: chrono::NaiveDate) {
    let response = app
        .post(
            "/api/v1/pharmacy/medicines",
            token,
            json!({
                "name": name,
                "category": "Antibiotic",
                "unit": "tablet",
                "unit_price": "2.50",
                "stock_quantity": stock,
                "reorder_level": 1,
                "expiry_date": expiry
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
}

#[tokio::test]
async fn test_availability_skips_booked_slot() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor_id = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let patient_id = id_of(&app.create_patient(&admin, "Amara").await);
    let date = future_slot().date_naive();
    book(&app, &admin, &patient_id, &doctor_id, at_hour(date, 10)).await;

    let response = app
        .get(
            &format!(
                "/api/v1/appointments/availability?doctor_id={doctor_id}&date={date}&start_hour=9&end_hour=12&slot_minutes=30"
            ),
            &admin,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());

    let starts: Vec<DateTime<Utc>> = response.data()["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| serde_json::from_value(slot["start"].clone()).unwrap())
        .collect();
    let half_past = |hour| at_hour(date, hour) + Duration::minutes(30);
    assert_eq!(
        starts,
        vec![at_hour(date, 9), half_past(9), half_past(10), at_hour(date, 11), half_past(11)]
    );

    let unknown = app
        .get(
            &format!("/api/v1/appointments/availability?doctor_id={patient_id}&date={date}"),
            &admin,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expiring_and_inventory_summary() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let today = Utc::now().date_naive();
    medicine_with_expiry(&app, &admin, "Amoxicillin", 4, today - Duration::days(3)).await;
    medicine_with_expiry(&app, &admin, "Ceftriaxone", 10, today + Duration::days(10)).await;
    medicine_with_expiry(&app, &admin, "Doxycycline", 2, today + Duration::days(400)).await;

    let expiring = app.get("/api/v1/pharmacy/expiring?days=30", &admin).await;
    assert_eq!(expiring.status, StatusCode::OK);
    let names: Vec<String> = expiring
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Amoxicillin", "Ceftriaxone"]);

    let summary = app.get("/api/v1/pharmacy/summary", &admin).await;
    assert_eq!(summary.status, StatusCode::OK);
    let summary = summary.data();
    assert_eq!(summary["medicine_count"], 3);
    assert_eq!(decimal(&summary["total_stock_value"]), Decimal::new(4000, 2));
    assert_eq!(summary["expired_count"], 1);
}

#[tokio::test]
async fn test_analytics_requires_admin() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let nurse = app.token_for_role(&admin, "nurse").await;

    for uri in [
        "/api/v1/analytics/dashboard",
        "/api/v1/analytics/doctors/workload",
        "/api/v1/analytics/patients/demographics",
    ] {
        assert_eq!(app.get(uri, &nurse).await.status, StatusCode::FORBIDDEN, "{uri}");
    }

    let dashboard = app.get("/api/v1/analytics/dashboard", &admin).await;
    assert_eq!(dashboard.status, StatusCode::OK);
}

#[tokio::test]
async fn test_doctor_workload_busiest_first() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let bello = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let yusuf = id_of(
        &app.create_named_doctor(&admin, "Amina", "Yusuf", "dr.yusuf@caredesk.test", "120.00")
            .await,
    );
    let patient_id = id_of(&app.create_patient(&admin, "Amara").await);
    let date = future_slot().date_naive();

    book(&app, &admin, &patient_id, &yusuf, at_hour(date, 9)).await;
    book(&app, &admin, &patient_id, &bello, at_hour(date, 10)).await;
    book(&app, &admin, &patient_id, &bello, at_hour(date, 11)).await;

    let response = app.get("/api/v1/analytics/doctors/workload", &admin).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let rows: Vec<(String, u64)> = response
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|row| (row["doctor_name"].as_str().unwrap().to_string(), row["total"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        rows,
        vec![("Tunde Bello".to_string(), 2), ("Amina Yusuf".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_revenue_trend_is_zero_filled() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let patient_id = id_of(&app.create_patient(&admin, "Amara").await);

    let invoice = app
        .post(
            "/api/v1/billing/invoices",
            &admin,
            json!({
                "patient_id": patient_id,
                "items": [{ "description": "Dressing change", "category": "procedure", "quantity": 1, "unit_price": "40.00" }]
            }),
        )
        .await;
    assert_eq!(invoice.status, StatusCode::CREATED, "{}", invoice.text());
    let invoice_id = id_of(&invoice.data());
    let paid = app
        .post(
            &format!("/api/v1/billing/invoices/{invoice_id}/payments"),
            &admin,
            json!({ "amount": "40.00", "method": "cash" }),
        )
        .await;
    assert_eq!(paid.status, StatusCode::CREATED, "{}", paid.text());

    let response = app.get("/api/v1/analytics/revenue/trend?months=3", &admin).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let months = response.data();
    let months = months.as_array().unwrap();
    assert_eq!(months.len(), 3);
    assert_eq!(decimal(&months[0]["collected"]), Decimal::ZERO);
    assert_eq!(decimal(&months[1]["collected"]), Decimal::ZERO);
    assert_eq!(months[2]["month"], Utc::now().format("%Y-%m").to_string());
    assert_eq!(decimal(&months[2]["collected"]), Decimal::new(4000, 2));
    assert_eq!(months[2]["payment_count"], 1);

    let empty_window = app.get("/api/v1/analytics/revenue/trend?months=0", &admin).await;
    assert_eq!(empty_window.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_demographics_counts_unknown_blood_group() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.create_patient(&admin, "Amara").await;
    let untyped = app
        .post(
            "/api/v1/patients",
            &admin,
            json!({
                "first_name": "Chidi",
                "last_name": "Okeke",
                "date_of_birth": "1958-09-30",
                "gender": "male",
                "phone": "+234 803 555 0177"
            }),
        )
        .await;
    assert_eq!(untyped.status, StatusCode::CREATED, "{}", untyped.text());

    let response = app.get("/api/v1/analytics/patients/demographics", &admin).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let stats = response.data();
    assert_eq!(stats["total_patients"], 2);

    let share = |group: &str, label: &str| -> Value {
        stats[group]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["label"] == label)
            .cloned()
            .unwrap()
    };
    assert_eq!(share("blood_groups", "O+")["count"], 1);
    assert_eq!(share("blood_groups", "unknown")["count"], 1);
    assert_eq!(share("blood_groups", "unknown")["percentage"], 50.0);
    assert_eq!(share("gender", "male")["count"], 1);
    assert_eq!(share("gender", "other")["count"], 0);
}
