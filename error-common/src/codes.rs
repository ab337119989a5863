// Standardized error codes returned in the `code` field of API error bodies.

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
    pub const MALFORMED_REQUEST: &str = "VALIDATION_1004";
}

pub mod authentication {
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
    pub const TOKEN_EXPIRED: &str = "AUTH_2002";
    pub const TOKEN_INVALID: &str = "AUTH_2003";
    pub const ACCOUNT_DISABLED: &str = "AUTH_2004";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
    pub const INSUFFICIENT_PERMISSIONS: &str = "AUTHZ_3002";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RESOURCE_4001";
    pub const ALREADY_EXISTS: &str = "RESOURCE_4002";
    pub const INVALID_STATE: &str = "RESOURCE_4003";
}

pub mod scheduling {
    pub const DOCTOR_DOUBLE_BOOKED: &str = "APPOINTMENT_DOCTOR_CONFLICT";
    pub const PATIENT_DOUBLE_BOOKED: &str = "APPOINTMENT_PATIENT_CONFLICT";
    pub const INVALID_TRANSITION: &str = "APPOINTMENT_INVALID_TRANSITION";
    pub const IN_THE_PAST: &str = "APPOINTMENT_IN_THE_PAST";
    pub const STATUS_CHANGED: &str = "APPOINTMENT_STATUS_CHANGED";
}

pub mod pharmacy {
    pub const INSUFFICIENT_STOCK: &str = "PHARMACY_INSUFFICIENT_STOCK";
    pub const MEDICINE_INACTIVE: &str = "PHARMACY_MEDICINE_INACTIVE";
}

pub mod billing {
    pub const OVERPAYMENT: &str = "BILLING_OVERPAYMENT";
    pub const INVOICE_CLOSED: &str = "BILLING_INVOICE_CLOSED";
    pub const ALREADY_INVOICED: &str = "BILLING_ALREADY_INVOICED";
}

pub mod database {
    pub const CONNECTION_FAILED: &str = "DB_5001";
    pub const QUERY_FAILED: &str = "DB_5002";
    pub const CONSTRAINT_VIOLATION: &str = "DB_5003";
}

pub mod internal {
    pub const UNEXPECTED: &str = "INTERNAL_9001";
}
