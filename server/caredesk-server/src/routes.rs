pub mod paths;

use axum::{
    routing::{get, post, put},
    Extension, Router,
};

use crate::{
    handlers::{
        analytics, appointments, auth, billing, export, health, lab, patients, pharmacy, prescriptions, staff, users,
    },
    models::StaffKind,
    openapi,
    server::CareDeskServer,
};

/// Create health check routes
pub fn health_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

/// Create authentication routes
pub fn auth_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::auth::LOGIN, post(auth::login))
        .route(paths::auth::ME, get(auth::me))
        .route(paths::auth::PASSWORD, put(auth::change_password))
}

/// Create account administration routes
pub fn user_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::USERS, get(users::list_users).post(users::create_user))
        .route(paths::api_v1::USER_BY_ID, get(users::get_user))
        .route(paths::api_v1::USER_ROLE, put(users::set_role))
        .route(paths::api_v1::USER_STATUS, put(users::set_status))
        .route(paths::api_v1::PROFILE, get(users::get_profile))
}

/// Create patient registry routes
pub fn patient_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::PATIENTS, get(patients::list_patients).post(patients::create_patient))
        .route(
            paths::api_v1::PATIENT_BY_ID,
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(paths::api_v1::PATIENT_APPOINTMENTS, get(patients::patient_appointments))
        .route(paths::api_v1::PATIENT_PRESCRIPTIONS, get(patients::patient_prescriptions))
        .route(paths::api_v1::PATIENT_LAB_TESTS, get(patients::patient_lab_tests))
        .route(paths::api_v1::PATIENT_INVOICES, get(patients::patient_invoices))
}

/// Routes for one staff kind, nested under its plural prefix
pub fn staff_routes(kind: StaffKind) -> Router<CareDeskServer> {
    let mut router = Router::new()
        .route(paths::api_v1::STAFF_ROOT, get(staff::list_staff).post(staff::create_staff))
        .route(
            paths::api_v1::STAFF_BY_ID,
            get(staff::get_staff).put(staff::update_staff).delete(staff::delete_staff),
        );
    if kind == StaffKind::Doctor {
        router = router.route(paths::api_v1::DOCTOR_SCHEDULE, get(staff::doctor_schedule));
    }
    router.layer(Extension(kind))
}

/// Create appointment routes
pub fn appointment_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(
            paths::api_v1::APPOINTMENTS,
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(paths::api_v1::APPOINTMENT_AVAILABILITY, get(appointments::availability))
        .route(
            paths::api_v1::APPOINTMENT_BY_ID,
            get(appointments::get_appointment).delete(appointments::delete_appointment),
        )
        .route(paths::api_v1::APPOINTMENT_STATUS, put(appointments::update_status))
        .route(paths::api_v1::APPOINTMENT_RESCHEDULE, put(appointments::reschedule))
}

/// Create prescription routes
pub fn prescription_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(
            paths::api_v1::PRESCRIPTIONS,
            get(prescriptions::list_prescriptions).post(prescriptions::create_prescription),
        )
        .route(paths::api_v1::PRESCRIPTION_BY_ID, get(prescriptions::get_prescription))
        .route(paths::api_v1::PRESCRIPTION_DISPENSE, post(prescriptions::dispense))
        .route(paths::api_v1::PRESCRIPTION_CANCEL, post(prescriptions::cancel))
}

/// Create pharmacy inventory routes
pub fn pharmacy_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::MEDICINES, get(pharmacy::list_medicines).post(pharmacy::create_medicine))
        .route(
            paths::api_v1::MEDICINE_BY_ID,
            get(pharmacy::get_medicine).put(pharmacy::update_medicine),
        )
        .route(paths::api_v1::MEDICINE_RESTOCK, post(pharmacy::restock))
        .route(paths::api_v1::MEDICINE_ADJUST, post(pharmacy::adjust))
        .route(paths::api_v1::MEDICINE_WRITE_OFF, post(pharmacy::write_off_expired))
        .route(paths::api_v1::MEDICINE_MOVEMENTS, get(pharmacy::movements))
        .route(paths::api_v1::LOW_STOCK, get(pharmacy::low_stock))
        .route(paths::api_v1::EXPIRING, get(pharmacy::expiring))
        .route(paths::api_v1::INVENTORY_SUMMARY, get(pharmacy::summary))
}

/// Create lab test routes
pub fn lab_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::LAB_TESTS, get(lab::list_lab_tests).post(lab::order_lab_test))
        .route(paths::api_v1::LAB_TEST_BY_ID, get(lab::get_lab_test))
        .route(paths::api_v1::LAB_TEST_ASSIGN, put(lab::assign_technician))
        .route(paths::api_v1::LAB_TEST_STATUS, put(lab::update_lab_status))
        .route(paths::api_v1::LAB_TEST_RESULT, put(lab::record_result))
}

/// Create billing routes
pub fn billing_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::INVOICES, get(billing::list_invoices).post(billing::create_invoice))
        .route(paths::api_v1::INVOICE_FROM_APPOINTMENT, post(billing::invoice_from_appointment))
        .route(paths::api_v1::INVOICE_FROM_PRESCRIPTION, post(billing::invoice_from_prescription))
        .route(paths::api_v1::INVOICE_BY_ID, get(billing::get_invoice))
        .route(paths::api_v1::INVOICE_PAYMENTS, post(billing::record_payment))
        .route(paths::api_v1::INVOICE_CANCEL, post(billing::cancel_invoice))
        .route(paths::api_v1::REVENUE_SUMMARY, get(billing::revenue_summary))
}

/// Create analytics routes
pub fn analytics_routes() -> Router<CareDeskServer> {
    Router::new()
        .route(paths::api_v1::DASHBOARD, get(analytics::dashboard))
        .route(paths::api_v1::APPOINTMENT_STATS, get(analytics::appointment_stats))
        .route(paths::api_v1::APPOINTMENT_TREND, get(analytics::appointment_trend))
        .route(paths::api_v1::REVENUE_TREND, get(analytics::revenue_trend))
        .route(paths::api_v1::DOCTOR_WORKLOAD, get(analytics::doctor_workload))
        .route(paths::api_v1::DEMOGRAPHICS, get(analytics::demographics))
}

/// Create CSV export routes
pub fn export_routes() -> Router<CareDeskServer> {
    Router::new().route(paths::api_v1::EXPORT, get(export::export_csv))
}

/// Create API v1 routes
pub fn api_v1_routes() -> Router<CareDeskServer> {
    let mut router = Router::new()
        .nest("/auth", auth_routes())
        .merge(user_routes())
        .merge(patient_routes())
        .merge(appointment_routes())
        .merge(prescription_routes())
        .merge(pharmacy_routes())
        .merge(lab_routes())
        .merge(billing_routes())
        .merge(analytics_routes())
        .merge(export_routes());

    for kind in StaffKind::ALL {
        router = router.nest(&format!("/{}", kind.plural()), staff_routes(kind));
    }
    router
}

/// Create all application routes
pub fn create_routes() -> Router<CareDeskServer> {
    Router::new()
        // Health check routes (no authentication required)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        // API v1 routes (authentication per handler)
        .nest(paths::API_V1, api_v1_routes())
}
