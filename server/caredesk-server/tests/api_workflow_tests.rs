//! End-to-end tests through the HTTP router over the in-memory store
//!
//! These tests verify that:
//! 1. Requests without a valid token are rejected before any handler logic
//! 2. Role permissions are enforced per endpoint
//! 3. Booking refuses overlapping appointments but allows back-to-back ones
//! 4. Dispensing moves stock all or nothing
//! 5. Invoices come from completed appointments and reject overpayment
//! 6. Disabled or demoted accounts lose access with their old token
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;

use common::{future_slot, id_of, TestApp, ADMIN_EMAIL};

fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "in_memory");
    assert_eq!(body["storage"]["reachable"], true);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new().await;

    let wrong = app.login(ADMIN_EMAIL, "not-the-password-1").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await;
    let me = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], ADMIN_EMAIL);
    assert_eq!(me.data()["role"], "admin");
    assert!(me.data().get("password_hash").is_none());
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/v1/patients", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json()["error_type"], "authentication_error");

    let forged = app.get("/api/v1/patients", "abc.def.ghi").await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_account_token_is_refused() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let nurse = app.token_for_role(&admin, "nurse").await;
    let nurse_id = id_of(&app.get("/api/v1/auth/me", &nurse).await.data());

    assert_eq!(app.get("/api/v1/patients", &nurse).await.status, StatusCode::OK);

    let disabled = app
        .put(&format!("/api/v1/users/{nurse_id}/status"), &admin, json!({ "is_active": false }))
        .await;
    assert_eq!(disabled.status, StatusCode::OK, "{}", disabled.text());

    let replay = app.get("/api/v1/patients", &nurse).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.json()["code"], error_common::codes::authentication::ACCOUNT_DISABLED);
}

#[tokio::test]
async fn test_demoted_account_loses_permissions_immediately() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let pharmacist = app.token_for_role(&admin, "pharmacist").await;
    let pharmacist_id = id_of(&app.get("/api/v1/auth/me", &pharmacist).await.data());

    app.create_medicine(&pharmacist, "Paracetamol", 40).await;

    let demoted = app
        .put(
            &format!("/api/v1/users/{pharmacist_id}/role"),
            &admin,
            json!({ "role": "receptionist" }),
        )
        .await;
    assert_eq!(demoted.status, StatusCode::OK, "{}", demoted.text());

    let refused = app
        .post(
            "/api/v1/pharmacy/medicines",
            &pharmacist,
            json!({ "name": "Ibuprofen", "category": "Analgesic", "unit": "tablet", "unit_price": "0.80" }),
        )
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/v1/auth/me", &pharmacist).await.data()["role"], "receptionist");
}

#[tokio::test]
async fn test_role_permissions_are_enforced() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let receptionist = app.token_for_role(&admin, "receptionist").await;

    // Receptionists register patients but do not touch stock or exports
    app.create_patient(&receptionist, "Amara").await;

    let medicine = app
        .post(
            "/api/v1/pharmacy/medicines",
            &receptionist,
            json!({ "name": "Amoxicillin", "category": "Antibiotic", "unit": "capsule", "unit_price": "1.20" }),
        )
        .await;
    assert_eq!(medicine.status, StatusCode::FORBIDDEN);

    let export = app.get("/api/v1/export/patients.csv", &receptionist).await;
    assert_eq!(export.status, StatusCode::FORBIDDEN);

    let users = app.get("/api/v1/users", &receptionist).await;
    assert_eq!(users.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_patient_registration_assigns_mrn() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let patient = app.create_patient(&admin, "Amara").await;
    assert!(patient["mrn"].as_str().unwrap().starts_with("MRN-"));
    assert_eq!(patient["allergies"], json!(["penicillin"]));

    let invalid = app
        .post(
            "/api/v1/patients",
            &admin,
            json!({
                "first_name": "",
                "last_name": "Okafor",
                "date_of_birth": "1990-04-12",
                "gender": "female",
                "phone": "not a phone"
            }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    let fields = &invalid.json()["field_errors"];
    assert!(fields.get("first_name").is_some());
    assert!(fields.get("phone").is_some());

    let listed = app.get("/api/v1/patients?search=amara", &admin).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_staff_kinds_do_not_leak_across_routes() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor = app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await;
    let doctor_id = id_of(&doctor);

    let as_doctor = app.get(&format!("/api/v1/doctors/{doctor_id}"), &admin).await;
    assert_eq!(as_doctor.status, StatusCode::OK);

    let as_nurse = app.get(&format!("/api/v1/nurses/{doctor_id}"), &admin).await;
    assert_eq!(as_nurse.status, StatusCode::NOT_FOUND);

    let missing_license = app
        .post(
            "/api/v1/doctors",
            &admin,
            json!({
                "first_name": "Ngozi",
                "last_name": "Eze",
                "email": "dr.eze@caredesk.test",
                "phone": "+234 803 555 0123",
                "department": "Paediatrics",
                "specialization": "Paediatrician"
            }),
        )
        .await;
    assert_eq!(missing_license.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_conflicts_and_back_to_back_slots() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor_id = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let first_patient = id_of(&app.create_patient(&admin, "Amara").await);
    let second_patient = id_of(&app.create_patient(&admin, "Chidi").await);
    let start = future_slot();

    let book = |patient_id: String, at: chrono::DateTime<chrono::Utc>| {
        json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "scheduled_at": at.to_rfc3339(),
            "duration_minutes": 30,
            "reason": "Follow-up"
        })
    };

    let first = app.post("/api/v1/appointments", &admin, book(first_patient.clone(), start)).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text());

    // Overlaps the first half hour for the same doctor
    let overlapping = app
        .post(
            "/api/v1/appointments",
            &admin,
            book(second_patient.clone(), start + Duration::minutes(15)),
        )
        .await;
    assert_eq!(overlapping.status, StatusCode::CONFLICT);

    // Starts exactly when the first ends
    let adjacent = app
        .post(
            "/api/v1/appointments",
            &admin,
            book(second_patient, start + Duration::minutes(30)),
        )
        .await;
    assert_eq!(adjacent.status, StatusCode::CREATED, "{}", adjacent.text());

    let past = app
        .post(
            "/api/v1/appointments",
            &admin,
            book(first_patient, chrono::Utc::now() - Duration::hours(1)),
        )
        .await;
    assert_eq!(past.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_dispense_is_all_or_nothing() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor_id = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let patient_id = id_of(&app.create_patient(&admin, "Amara").await);
    let plenty = id_of(&app.create_medicine(&admin, "Paracetamol", 100).await);
    let scarce = id_of(&app.create_medicine(&admin, "Amoxicillin", 5).await);

    let prescription = app
        .post(
            "/api/v1/prescriptions",
            &admin,
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "diagnosis": "Acute sinusitis",
                "items": [
                    { "medicine_id": plenty, "dosage": "500mg", "frequency": "three times daily", "duration_days": 5, "quantity": 15 },
                    { "medicine_id": scarce, "dosage": "250mg", "frequency": "twice daily", "duration_days": 5, "quantity": 10 }
                ]
            }),
        )
        .await;
    assert_eq!(prescription.status, StatusCode::CREATED, "{}", prescription.text());
    let prescription_id = id_of(&prescription.data());
    let dispense_uri = format!("/api/v1/prescriptions/{prescription_id}/dispense");

    let refused = app.post(&dispense_uri, &admin, json!({})).await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
    assert_eq!(refused.json()["code"], error_common::codes::pharmacy::INSUFFICIENT_STOCK);

    let untouched = app.get(&format!("/api/v1/pharmacy/medicines/{plenty}"), &admin).await;
    assert_eq!(untouched.data()["stock_quantity"], 100);
    let still_active = app.get(&format!("/api/v1/prescriptions/{prescription_id}"), &admin).await;
    assert_eq!(still_active.data()["status"], "active");

    let restock = app
        .post(
            &format!("/api/v1/pharmacy/medicines/{scarce}/restock"),
            &admin,
            json!({ "quantity": 20 }),
        )
        .await;
    assert_eq!(restock.status, StatusCode::OK, "{}", restock.text());

    let dispensed = app.post(&dispense_uri, &admin, json!({})).await;
    assert_eq!(dispensed.status, StatusCode::OK, "{}", dispensed.text());
    assert_eq!(dispensed.data()["status"], "dispensed");

    let after = app.get(&format!("/api/v1/pharmacy/medicines/{scarce}"), &admin).await;
    assert_eq!(after.data()["stock_quantity"], 15);

    let movements = app
        .get(&format!("/api/v1/pharmacy/medicines/{scarce}/movements"), &admin)
        .await
        .data();
    let dispense = movements
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["kind"] == "dispense")
        .cloned()
        .unwrap();
    assert_eq!(dispense["reference_id"], prescription_id.as_str());
    assert_eq!(dispense["quantity_change"], -10);
    assert_eq!(dispense["quantity_after"], 15);

    let again = app.post(&dispense_uri, &admin, json!({})).await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invoice_from_completed_appointment() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor_id = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let patient_id = id_of(&app.create_patient(&admin, "Amara").await);

    let appointment = app
        .post(
            "/api/v1/appointments",
            &admin,
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": future_slot().to_rfc3339(),
                "reason": "Chest pain review"
            }),
        )
        .await;
    let appointment_id = id_of(&appointment.data());
    let invoice_uri = format!("/api/v1/billing/invoices/from-appointment/{appointment_id}");

    let too_early = app.post(&invoice_uri, &admin, json!({})).await;
    assert_eq!(too_early.status, StatusCode::UNPROCESSABLE_ENTITY);

    let completed = app
        .put(
            &format!("/api/v1/appointments/{appointment_id}/status"),
            &admin,
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(completed.status, StatusCode::OK, "{}", completed.text());

    let invoice = app.post(&invoice_uri, &admin, json!({})).await;
    assert_eq!(invoice.status, StatusCode::CREATED, "{}", invoice.text());
    let invoice = invoice.data();
    assert_eq!(decimal(&invoice["total"]), Decimal::new(150, 0));
    assert_eq!(invoice["status"], "unpaid");
    let invoice_id = id_of(&invoice);

    let duplicate = app.post(&invoice_uri, &admin, json!({})).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let payments_uri = format!("/api/v1/billing/invoices/{invoice_id}/payments");
    let overpaid = app
        .post(&payments_uri, &admin, json!({ "amount": "200.00", "method": "cash" }))
        .await;
    assert_eq!(overpaid.status, StatusCode::UNPROCESSABLE_ENTITY);

    let partial = app
        .post(&payments_uri, &admin, json!({ "amount": "100.00", "method": "card" }))
        .await;
    assert_eq!(partial.status, StatusCode::CREATED, "{}", partial.text());
    assert_eq!(partial.data()["invoice"]["status"], "partially_paid");
    assert_eq!(decimal(&partial.data()["invoice"]["balance_due"]), Decimal::new(50, 0));

    let rest = app
        .post(&payments_uri, &admin, json!({ "amount": "50", "method": "mobile_money" }))
        .await;
    assert_eq!(rest.status, StatusCode::CREATED);
    assert_eq!(rest.data()["invoice"]["status"], "paid");
    assert_eq!(decimal(&rest.data()["invoice"]["balance_due"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_manual_invoice_links_must_match_patient() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let doctor_id = id_of(&app.create_doctor(&admin, "dr.bello@caredesk.test", "150.00").await);
    let owner = id_of(&app.create_patient(&admin, "Amara").await);
    let stranger = id_of(&app.create_patient(&admin, "Chidi").await);

    let appointment = app
        .post(
            "/api/v1/appointments",
            &admin,
            json!({
                "patient_id": owner,
                "doctor_id": doctor_id,
                "scheduled_at": future_slot().to_rfc3339(),
                "reason": "Follow-up"
            }),
        )
        .await;
    let appointment_id = id_of(&appointment.data());
    let manual = |patient_id: &str, appointment_id: String| {
        json!({
            "patient_id": patient_id,
            "appointment_id": appointment_id,
            "items": [{ "description": "Dressing", "category": "procedure", "quantity": 1, "unit_price": "10.00" }]
        })
    };

    let foreign = app
        .post("/api/v1/billing/invoices", &admin, manual(&stranger, appointment_id.clone()))
        .await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
    assert!(foreign.json()["field_errors"].get("appointment_id").is_some());

    let missing = app
        .post("/api/v1/billing/invoices", &admin, manual(&owner, uuid::Uuid::new_v4().to_string()))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    app.put(
        &format!("/api/v1/appointments/{appointment_id}/status"),
        &admin,
        json!({ "status": "completed" }),
    )
    .await;
    let generated = app
        .post(
            &format!("/api/v1/billing/invoices/from-appointment/{appointment_id}"),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(generated.status, StatusCode::CREATED, "{}", generated.text());
}

#[tokio::test]
async fn test_csv_export() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.create_patient(&admin, "Amara").await;

    let response = app.get("/api/v1/export/patients.csv", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = response.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"patients-"));

    let text = response.text();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("mrn,first_name,last_name,date_of_birth,age"));
    assert!(lines.next().unwrap().contains("Amara"));
    assert!(lines.next().is_none());

    let unknown = app.get("/api/v1/export/users.csv", &admin).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let doc = response.json();
    assert!(doc["paths"].get("/api/v1/appointments").is_some());
    assert!(doc["components"]["securitySchemes"].get("bearer_auth").is_some());
}
