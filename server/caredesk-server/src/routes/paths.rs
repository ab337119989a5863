//! Route path constants
//!
//! Paths under `api_v1` are relative to [`API_V1`].

pub const API_V1: &str = "/api/v1";

pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

pub mod auth {
    pub const LOGIN: &str = "/login";
    pub const ME: &str = "/me";
    pub const PASSWORD: &str = "/password";
}

pub mod api_v1 {
    // Accounts
    pub const USERS: &str = "/users";
    pub const USER_BY_ID: &str = "/users/:id";
    pub const USER_ROLE: &str = "/users/:id/role";
    pub const USER_STATUS: &str = "/users/:id/status";
    pub const PROFILE: &str = "/profile";

    // Patients
    pub const PATIENTS: &str = "/patients";
    pub const PATIENT_BY_ID: &str = "/patients/:id";
    pub const PATIENT_APPOINTMENTS: &str = "/patients/:id/appointments";
    pub const PATIENT_PRESCRIPTIONS: &str = "/patients/:id/prescriptions";
    pub const PATIENT_LAB_TESTS: &str = "/patients/:id/lab-tests";
    pub const PATIENT_INVOICES: &str = "/patients/:id/invoices";

    // Staff, relative to the kind prefix
    pub const STAFF_ROOT: &str = "/";
    pub const STAFF_BY_ID: &str = "/:id";
    pub const DOCTOR_SCHEDULE: &str = "/:id/schedule";

    // Appointments
    pub const APPOINTMENTS: &str = "/appointments";
    pub const APPOINTMENT_AVAILABILITY: &str = "/appointments/availability";
    pub const APPOINTMENT_BY_ID: &str = "/appointments/:id";
    pub const APPOINTMENT_STATUS: &str = "/appointments/:id/status";
    pub const APPOINTMENT_RESCHEDULE: &str = "/appointments/:id/reschedule";

    // Prescriptions
    pub const PRESCRIPTIONS: &str = "/prescriptions";
    pub const PRESCRIPTION_BY_ID: &str = "/prescriptions/:id";
    pub const PRESCRIPTION_DISPENSE: &str = "/prescriptions/:id/dispense";
    pub const PRESCRIPTION_CANCEL: &str = "/prescriptions/:id/cancel";

    // Pharmacy
    pub const MEDICINES: &str = "/pharmacy/medicines";
    pub const MEDICINE_BY_ID: &str = "/pharmacy/medicines/:id";
    pub const MEDICINE_RESTOCK: &str = "/pharmacy/medicines/:id/restock";
    pub const MEDICINE_ADJUST: &str = "/pharmacy/medicines/:id/adjust";
    pub const MEDICINE_WRITE_OFF: &str = "/pharmacy/medicines/:id/write-off";
    pub const MEDICINE_MOVEMENTS: &str = "/pharmacy/medicines/:id/movements";
    pub const LOW_STOCK: &str = "/pharmacy/low-stock";
    pub const EXPIRING: &str = "/pharmacy/expiring";
    pub const INVENTORY_SUMMARY: &str = "/pharmacy/summary";

    // Lab
    pub const LAB_TESTS: &str = "/lab-tests";
    pub const LAB_TEST_BY_ID: &str = "/lab-tests/:id";
    pub const LAB_TEST_ASSIGN: &str = "/lab-tests/:id/assign";
    pub const LAB_TEST_STATUS: &str = "/lab-tests/:id/status";
    pub const LAB_TEST_RESULT: &str = "/lab-tests/:id/result";

    // Billing
    pub const INVOICES: &str = "/billing/invoices";
    pub const INVOICE_FROM_APPOINTMENT: &str = "/billing/invoices/from-appointment/:appointment_id";
    pub const INVOICE_FROM_PRESCRIPTION: &str = "/billing/invoices/from-prescription/:prescription_id";
    pub const INVOICE_BY_ID: &str = "/billing/invoices/:id";
    pub const INVOICE_PAYMENTS: &str = "/billing/invoices/:id/payments";
    pub const INVOICE_CANCEL: &str = "/billing/invoices/:id/cancel";
    pub const REVENUE_SUMMARY: &str = "/billing/summary";

    // Analytics
    pub const DASHBOARD: &str = "/analytics/dashboard";
    pub const APPOINTMENT_STATS: &str = "/analytics/appointments";
    pub const APPOINTMENT_TREND: &str = "/analytics/appointments/trend";
    pub const REVENUE_TREND: &str = "/analytics/revenue/trend";
    pub const DOCTOR_WORKLOAD: &str = "/analytics/doctors/workload";
    pub const DEMOGRAPHICS: &str = "/analytics/patients/demographics";

    // Export
    pub const EXPORT: &str = "/export/:file";
}
