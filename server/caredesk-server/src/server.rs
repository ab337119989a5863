use std::sync::Arc;
use std::time::Instant;

use auth_identity::IdentityService;
use billing_service::BillingService;
use error_common::{CareError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::AppConfig;
use crate::repository::Repositories;
use crate::services::{
    AnalyticsService, ExportService, InvoicingService, LabService, PatientService, PharmacyService,
    PrescriptionService, SchedulingService, StaffService,
};

/// Backing store selected at startup
#[derive(Clone)]
pub enum Storage {
    InMemory,
    Postgres(PgPool),
}

impl Storage {
    pub fn backend(&self) -> &'static str {
        match self {
            Storage::InMemory => "in_memory",
            Storage::Postgres(_) => "postgres",
        }
    }

    /// Round trip to the store
    pub async fn ping(&self) -> std::result::Result<(), String> {
        match self {
            Storage::InMemory => Ok(()),
            Storage::Postgres(pool) => sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
        }
    }
}

/// Main CareDesk server state
#[derive(Clone)]
pub struct CareDeskServer {
    pub config: Arc<AppConfig>,
    pub storage: Storage,
    pub started_at: Instant,
    pub identity: Arc<IdentityService>,
    pub patients: Arc<PatientService>,
    pub staff: Arc<StaffService>,
    pub scheduling: Arc<SchedulingService>,
    pub pharmacy: Arc<PharmacyService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub lab: Arc<LabService>,
    pub invoicing: Arc<InvoicingService>,
    pub analytics: Arc<AnalyticsService>,
    pub export: Arc<ExportService>,
}

impl CareDeskServer {
    /// Server over the in-memory store
    pub fn in_memory(config: AppConfig) -> Result<Self> {
        Self::build(config, Repositories::in_memory(), Storage::InMemory)
    }

    /// Server over PostgreSQL, or the in-memory store when no URL is configured
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let Some(url) = config.database.url.clone() else {
            tracing::warn!("database.url is not set, using the in-memory store");
            return Self::in_memory(config);
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&url)
            .await
            .map_err(|e| CareError::DatabaseError(format!("Failed to connect to PostgreSQL: {e}")))?;
        info!(max_connections = config.database.max_connections, "Connected to PostgreSQL");

        if config.database.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| CareError::DatabaseError(format!("Migrations failed: {e}")))?;
            info!("Database migrations applied");
        }

        Self::build(config, Repositories::postgres(pool.clone()), Storage::Postgres(pool))
    }

    fn build(config: AppConfig, repos: Repositories, storage: Storage) -> Result<Self> {
        let identity = Arc::new(
            IdentityService::new(repos.users.clone(), config.identity())
                .map_err(|e| CareError::ConfigError(e.to_string()))?,
        );
        let billing = Arc::new(BillingService::new(repos.invoices.clone(), config.billing.clone()));

        let patients = Arc::new(PatientService::new(repos.patients.clone(), identity.clone()));
        let staff = Arc::new(StaffService::new(
            repos.staff.clone(),
            repos.appointments.clone(),
            identity.clone(),
        ));
        let scheduling = Arc::new(SchedulingService::new(
            repos.appointments.clone(),
            patients.clone(),
            staff.clone(),
        ));
        let pharmacy = Arc::new(PharmacyService::new(
            repos.medicines.clone(),
            config.pharmacy.expiry_warning_days,
        ));
        let prescriptions = Arc::new(PrescriptionService::new(
            repos.prescriptions.clone(),
            repos.appointments.clone(),
            patients.clone(),
            staff.clone(),
            pharmacy.clone(),
        ));
        let lab = Arc::new(LabService::new(repos.lab_tests.clone(), patients.clone(), staff.clone()));
        let invoicing = Arc::new(InvoicingService::new(
            billing,
            repos.appointments.clone(),
            repos.prescriptions.clone(),
            patients.clone(),
            staff.clone(),
            pharmacy.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            patients.clone(),
            staff.clone(),
            scheduling.clone(),
            lab.clone(),
            pharmacy.clone(),
            invoicing.clone(),
        ));
        let export = Arc::new(ExportService::new(
            patients.clone(),
            staff.clone(),
            scheduling.clone(),
            pharmacy.clone(),
            invoicing.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            storage,
            started_at: Instant::now(),
            identity,
            patients,
            staff,
            scheduling,
            pharmacy,
            prescriptions,
            lab,
            invoicing,
            analytics,
            export,
        })
    }

    /// Seed the configured bootstrap admin when both credentials are set
    pub async fn bootstrap_admin(&self) -> Result<()> {
        let (Some(email), Some(password)) = (
            self.config.auth.bootstrap_admin_email.as_deref(),
            self.config.auth.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(());
        };
        let created = self
            .identity
            .ensure_admin(email, password)
            .await
            .map_err(|e| CareError::ConfigError(format!("Bootstrap admin rejected: {e}")))?;
        if created {
            info!("Bootstrap admin account created");
        }
        Ok(())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
