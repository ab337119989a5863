//! Statistics, trends and dashboard figures
//!
//! Everything here is computed in process from repository reads, so both
//! storage backends give identical numbers. Percentages are
//! `count / total * 100` rounded to two places, and 0 for an empty total.

use std::collections::HashMap;
use std::sync::Arc;

use billing_service::{InvoiceFilter, InvoiceStatus, MonthlyRevenue};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{InvoicingService, LabService, PatientService, PharmacyService, SchedulingService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    day_bounds, Appointment, AppointmentFilter, AppointmentStatus, BloodGroup, Gender, LabTestFilter, Patient,
    PatientFilter, StaffFilter, StaffKind, StaffMember,
};

pub const MAX_TREND_DAYS: u32 = 365;
pub const MAX_TREND_MONTHS: u32 = 36;
const AGE_GROUPS: [(&str, u32, u32); 5] = [
    ("0-17", 0, 17),
    ("18-35", 18, 35),
    ("36-50", 36, 50),
    ("51-65", 51, 65),
    ("66+", 66, u32::MAX),
];

/// Rounded share of `count` in `total`, in percent
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = count as f64 / total as f64;
    (ratio * 10_000.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub active_patients: u64,
    pub active_doctors: u64,
    pub active_nurses: u64,
    pub active_lab_technicians: u64,
    pub appointments_today: u64,
    pub upcoming_appointments: u64,
    pub pending_lab_tests: u64,
    pub low_stock_medicines: u64,
    pub revenue_this_month: Decimal,
    pub outstanding_balance: Decimal,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusShare {
    pub status: AppointmentStatus,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentStats {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub total: u64,
    pub by_status: Vec<StatusShare>,
    pub completion_rate: f64,
    pub cancellation_rate: f64,
    pub no_show_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DoctorWorkload {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialization: Option<String>,
    pub total: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Share {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Demographics {
    pub total_patients: u64,
    pub gender: Vec<Share>,
    pub age_groups: Vec<Share>,
    pub blood_groups: Vec<Share>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendQuery {
    #[param(example = 30)]
    pub days: Option<u32>,
    #[param(example = 12)]
    pub months: Option<u32>,
}

pub fn appointment_stats(
    appointments: &[Appointment],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> AppointmentStats {
    let total = appointments.len() as u64;
    let counts = appointments.iter().counts_by(|a| a.status);
    let count_of = |status: AppointmentStatus| counts.get(&status).copied().unwrap_or(0) as u64;

    AppointmentStats {
        from,
        to,
        total,
        by_status: AppointmentStatus::ALL
            .into_iter()
            .map(|status| StatusShare {
                status,
                count: count_of(status),
                percentage: percentage(count_of(status), total),
            })
            .collect(),
        completion_rate: percentage(count_of(AppointmentStatus::Completed), total),
        cancellation_rate: percentage(count_of(AppointmentStatus::Cancelled), total),
        no_show_rate: percentage(count_of(AppointmentStatus::NoShow), total),
    }
}

/// Per-day counts for `days` days ending on `today`, oldest first, zero-filled
pub fn daily_counts(appointments: &[Appointment], today: NaiveDate, days: u32) -> Vec<DailyCount> {
    let counts = appointments.iter().counts_by(|a| a.scheduled_at.date_naive());
    (0..i64::from(days))
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0) as u64,
            }
        })
        .collect()
}

/// Every doctor in `doctors`, busiest first, then by name
pub fn doctor_workload(doctors: &[StaffMember], appointments: &[Appointment]) -> Vec<DoctorWorkload> {
    let by_doctor: HashMap<Uuid, Vec<&Appointment>> = appointments.iter().into_group_map_by(|a| a.doctor_id);

    doctors
        .iter()
        .map(|doctor| {
            let visits = by_doctor.get(&doctor.id).map(Vec::as_slice).unwrap_or_default();
            let total = visits.len() as u64;
            let completed = visits.iter().filter(|a| a.status == AppointmentStatus::Completed).count() as u64;
            let cancelled = visits.iter().filter(|a| a.status == AppointmentStatus::Cancelled).count() as u64;
            DoctorWorkload {
                doctor_id: doctor.id,
                doctor_name: doctor.full_name(),
                specialization: doctor.specialization.clone(),
                total,
                completed,
                cancelled,
                completion_rate: percentage(completed, total),
            }
        })
        .sorted_by(|a, b| b.total.cmp(&a.total).then_with(|| a.doctor_name.cmp(&b.doctor_name)))
        .collect()
}

fn age_group(age: u32) -> &'static str {
    AGE_GROUPS
        .iter()
        .find(|(_, low, high)| (*low..=*high).contains(&age))
        .map_or("66+", |(label, _, _)| *label)
}

fn shares<'a>(labels: impl IntoIterator<Item = &'a str>, counts: &HashMap<&str, usize>, total: u64) -> Vec<Share> {
    labels
        .into_iter()
        .map(|label| {
            let count = counts.get(label).copied().unwrap_or(0) as u64;
            Share {
                label: label.to_string(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}

pub fn demographics(patients: &[Patient], today: NaiveDate) -> Demographics {
    let total = patients.len() as u64;
    let genders = patients.iter().counts_by(|p| p.gender.as_str());
    let ages = patients.iter().counts_by(|p| age_group(p.age_on(today)));
    let bloods = patients
        .iter()
        .counts_by(|p| p.blood_group.as_ref().map_or("unknown", BloodGroup::as_str));

    Demographics {
        total_patients: total,
        gender: shares(Gender::ALL.iter().map(Gender::as_str), &genders, total),
        age_groups: shares(AGE_GROUPS.iter().map(|(label, _, _)| *label), &ages, total),
        blood_groups: shares(
            BloodGroup::ALL.iter().map(BloodGroup::as_str).chain(["unknown"]),
            &bloods,
            total,
        ),
    }
}

fn month_start(today: NaiveDate) -> DateTime<Utc> {
    let (start, _) = day_bounds(today.with_day(1).unwrap_or(today));
    start
}

pub struct AnalyticsService {
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
    scheduling: Arc<SchedulingService>,
    lab: Arc<LabService>,
    pharmacy: Arc<PharmacyService>,
    invoicing: Arc<InvoicingService>,
}

impl AnalyticsService {
    pub fn new(
        patients: Arc<PatientService>,
        staff: Arc<StaffService>,
        scheduling: Arc<SchedulingService>,
        lab: Arc<LabService>,
        pharmacy: Arc<PharmacyService>,
        invoicing: Arc<InvoicingService>,
    ) -> Self {
        Self {
            patients,
            staff,
            scheduling,
            lab,
            pharmacy,
            invoicing,
        }
    }

    async fn active_staff(&self, kind: StaffKind) -> ApiResult<u64> {
        let filter = StaffFilter {
            is_active: Some(true),
            ..Default::default()
        };
        Ok(self.staff.all(Some(kind), &filter).await?.len() as u64)
    }

    pub async fn dashboard(&self) -> ApiResult<DashboardStats> {
        let now = Utc::now();
        let today = now.date_naive();

        let active_patients = self
            .patients
            .all(&PatientFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .await?
            .len() as u64;

        let (day_start, day_end) = day_bounds(today);
        let appointments_today = self
            .scheduling
            .all(&AppointmentFilter {
                from: Some(day_start),
                to: Some(day_end),
                ..Default::default()
            })
            .await?
            .len() as u64;
        let upcoming_appointments = self
            .scheduling
            .all(&AppointmentFilter {
                from: Some(now),
                ..Default::default()
            })
            .await?
            .iter()
            .filter(|a| a.status.is_blocking() && a.scheduled_at > now)
            .count() as u64;

        let pending_lab_tests = self
            .lab
            .all(&LabTestFilter::default())
            .await?
            .iter()
            .filter(|t| t.is_pending())
            .count() as u64;

        let billing = self.invoicing.billing();
        let revenue_this_month = billing
            .payments_between(Some(month_start(today)), None)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum::<Decimal>();
        let outstanding_balance = billing
            .all_invoices(&InvoiceFilter::default())
            .await?
            .iter()
            .filter(|i| i.status != InvoiceStatus::Cancelled)
            .map(|i| i.balance_due)
            .sum::<Decimal>();

        Ok(DashboardStats {
            active_patients,
            active_doctors: self.active_staff(StaffKind::Doctor).await?,
            active_nurses: self.active_staff(StaffKind::Nurse).await?,
            active_lab_technicians: self.active_staff(StaffKind::LabTechnician).await?,
            appointments_today,
            upcoming_appointments,
            pending_lab_tests,
            low_stock_medicines: self.pharmacy.low_stock().await?.len() as u64,
            revenue_this_month,
            outstanding_balance,
            generated_at: now,
        })
    }

    pub async fn appointments(&self, period: PeriodQuery) -> ApiResult<AppointmentStats> {
        let filter = AppointmentFilter {
            from: period.from,
            to: period.to,
            ..Default::default()
        };
        let appointments = self.scheduling.all(&filter).await?;
        Ok(appointment_stats(&appointments, period.from, period.to))
    }

    pub async fn appointment_trend(&self, days: Option<u32>) -> ApiResult<Vec<DailyCount>> {
        let days = days.unwrap_or(30);
        if !(1..=MAX_TREND_DAYS).contains(&days) {
            return Err(ApiError::validation(format!("days must be between 1 and {MAX_TREND_DAYS}")));
        }
        let today = Utc::now().date_naive();
        let (first_day, _) = day_bounds(today - Duration::days(i64::from(days) - 1));
        let (_, end) = day_bounds(today);
        let appointments = self
            .scheduling
            .all(&AppointmentFilter {
                from: Some(first_day),
                to: Some(end),
                ..Default::default()
            })
            .await?;
        Ok(daily_counts(&appointments, today, days))
    }

    pub async fn revenue_trend(&self, months: Option<u32>) -> ApiResult<Vec<MonthlyRevenue>> {
        let months = months.unwrap_or(12);
        if !(1..=MAX_TREND_MONTHS).contains(&months) {
            return Err(ApiError::validation(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}"
            )));
        }
        Ok(self.invoicing.billing().monthly_revenue(months).await?)
    }

    pub async fn doctor_workload(&self, period: PeriodQuery) -> ApiResult<Vec<DoctorWorkload>> {
        let doctors = self.staff.all(Some(StaffKind::Doctor), &StaffFilter::default()).await?;
        let appointments = self
            .scheduling
            .all(&AppointmentFilter {
                from: period.from,
                to: period.to,
                ..Default::default()
            })
            .await?;
        Ok(doctor_workload(&doctors, &appointments))
    }

    pub async fn demographics(&self) -> ApiResult<Demographics> {
        let patients = self.patients.all(&PatientFilter::default()).await?;
        Ok(demographics(&patients, Utc::now().date_naive()))
    }
}
