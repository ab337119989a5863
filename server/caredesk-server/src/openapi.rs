use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::server::CareDeskServer;

/// Registers the `bearer_auth` scheme referenced by secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,

        // Authentication and accounts
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::set_role,
        crate::handlers::users::set_status,
        crate::handlers::users::get_profile,

        // Patients
        crate::handlers::patients::list_patients,
        crate::handlers::patients::create_patient,
        crate::handlers::patients::get_patient,
        crate::handlers::patients::update_patient,
        crate::handlers::patients::delete_patient,
        crate::handlers::patients::patient_appointments,
        crate::handlers::patients::patient_prescriptions,
        crate::handlers::patients::patient_lab_tests,
        crate::handlers::patients::patient_invoices,

        // Staff
        crate::handlers::staff::list_staff,
        crate::handlers::staff::create_staff,
        crate::handlers::staff::get_staff,
        crate::handlers::staff::update_staff,
        crate::handlers::staff::delete_staff,
        crate::handlers::staff::doctor_schedule,

        // Appointments
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::availability,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::update_status,
        crate::handlers::appointments::reschedule,
        crate::handlers::appointments::delete_appointment,

        // Prescriptions
        crate::handlers::prescriptions::list_prescriptions,
        crate::handlers::prescriptions::create_prescription,
        crate::handlers::prescriptions::get_prescription,
        crate::handlers::prescriptions::dispense,
        crate::handlers::prescriptions::cancel,

        // Pharmacy
        crate::handlers::pharmacy::list_medicines,
        crate::handlers::pharmacy::create_medicine,
        crate::handlers::pharmacy::get_medicine,
        crate::handlers::pharmacy::update_medicine,
        crate::handlers::pharmacy::restock,
        crate::handlers::pharmacy::adjust,
        crate::handlers::pharmacy::write_off_expired,
        crate::handlers::pharmacy::movements,
        crate::handlers::pharmacy::low_stock,
        crate::handlers::pharmacy::expiring,
        crate::handlers::pharmacy::summary,

        // Lab
        crate::handlers::lab::list_lab_tests,
        crate::handlers::lab::order_lab_test,
        crate::handlers::lab::get_lab_test,
        crate::handlers::lab::assign_technician,
        crate::handlers::lab::update_lab_status,
        crate::handlers::lab::record_result,

        // Billing
        crate::handlers::billing::list_invoices,
        crate::handlers::billing::create_invoice,
        crate::handlers::billing::invoice_from_appointment,
        crate::handlers::billing::invoice_from_prescription,
        crate::handlers::billing::get_invoice,
        crate::handlers::billing::record_payment,
        crate::handlers::billing::cancel_invoice,
        crate::handlers::billing::revenue_summary,

        // Analytics and export
        crate::handlers::analytics::dashboard,
        crate::handlers::analytics::appointment_stats,
        crate::handlers::analytics::appointment_trend,
        crate::handlers::analytics::revenue_trend,
        crate::handlers::analytics::doctor_workload,
        crate::handlers::analytics::demographics,
        crate::handlers::export::export_csv,
    ),
    components(
        schemas(
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::error::PaginationInfo,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::StorageHealth,
            crate::handlers::health::VersionResponse,
            crate::handlers::auth::MessageResponse,
            crate::handlers::users::UpdateRoleRequest,
            crate::handlers::users::UpdateStatusRequest,
            crate::handlers::users::ProfileResponse,
            crate::handlers::billing::PaymentReceipt,

            auth_identity::User,
            auth_identity::Role,
            auth_identity::Permission,
            auth_identity::CreateUserRequest,
            auth_identity::LoginRequest,
            auth_identity::LoginResponse,
            auth_identity::ChangePasswordRequest,

            crate::models::Patient,
            crate::models::PatientView,
            crate::models::Gender,
            crate::models::BloodGroup,
            crate::models::AccountRequest,
            crate::models::CreatePatientRequest,
            crate::models::UpdatePatientRequest,

            crate::models::StaffKind,
            crate::models::Shift,
            crate::models::StaffMember,
            crate::models::CreateStaffRequest,
            crate::models::UpdateStaffRequest,

            crate::models::Appointment,
            crate::models::AppointmentStatus,
            crate::models::CreateAppointmentRequest,
            crate::models::UpdateAppointmentStatusRequest,
            crate::models::RescheduleRequest,
            crate::models::TimeSlot,
            crate::models::Availability,

            crate::models::Prescription,
            crate::models::PrescriptionItem,
            crate::models::PrescriptionStatus,
            crate::models::NewPrescriptionItem,
            crate::models::CreatePrescriptionRequest,

            crate::models::Medicine,
            crate::models::StockMovement,
            crate::models::MovementKind,
            crate::models::CreateMedicineRequest,
            crate::models::UpdateMedicineRequest,
            crate::models::RestockRequest,
            crate::models::AdjustStockRequest,
            crate::models::InventorySummary,

            crate::models::LabTest,
            crate::models::LabPriority,
            crate::models::LabStatus,
            crate::models::OrderLabTestRequest,
            crate::models::AssignTechnicianRequest,
            crate::models::UpdateLabStatusRequest,
            crate::models::LabResultRequest,

            billing_service::Invoice,
            billing_service::InvoiceItem,
            billing_service::ItemCategory,
            billing_service::InvoiceStatus,
            billing_service::Payment,
            billing_service::PaymentMethod,
            billing_service::NewInvoiceItem,
            billing_service::CreateInvoiceRequest,
            billing_service::RecordPaymentRequest,
            billing_service::InvoiceWithPayments,
            billing_service::RevenueSummary,
            billing_service::MonthlyRevenue,

            crate::services::analytics::DashboardStats,
            crate::services::analytics::StatusShare,
            crate::services::analytics::AppointmentStats,
            crate::services::analytics::DailyCount,
            crate::services::analytics::DoctorWorkload,
            crate::services::analytics::Share,
            crate::services::analytics::Demographics,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Login, current user and password"),
        (name = "users", description = "Account administration and the caller's profile"),
        (name = "patients", description = "Patient registry and per-patient records"),
        (name = "staff", description = "Doctors, nurses and lab technicians"),
        (name = "appointments", description = "Booking with doctor and patient conflict checks"),
        (name = "prescriptions", description = "Prescribing and dispensing against stock"),
        (name = "pharmacy", description = "Medicine catalogue, stock ledger and reports"),
        (name = "lab", description = "Lab orders and results"),
        (name = "billing", description = "Invoices, payments and revenue"),
        (name = "analytics", description = "Statistics, trends and dashboards"),
        (name = "export", description = "CSV downloads"),
    ),
    info(
        title = "CareDesk API",
        description = "Hospital administration backend: patients, staff, appointments, pharmacy, lab and billing.",
        contact(name = "CareDesk Team", email = "team@caredesk.dev", url = "https://caredesk.dev"),
        license(name = "AGPL-3.0-only"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// `/api-docs/openapi.json`
pub fn create_docs_routes() -> Router<CareDeskServer> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
