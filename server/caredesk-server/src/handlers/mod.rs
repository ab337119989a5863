pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod billing;
pub mod export;
pub mod health;
pub mod lab;
pub mod patients;
pub mod pharmacy;
pub mod prescriptions;
pub mod staff;
pub mod users;
