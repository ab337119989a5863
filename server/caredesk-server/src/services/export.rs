use std::str::FromStr;
use std::sync::Arc;

use billing_service::InvoiceFilter;
use chrono::{DateTime, NaiveDate, Utc};
use csv::Writer;

use super::{InvoicingService, PatientService, PharmacyService, SchedulingService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{AppointmentFilter, MedicineFilter, PatientFilter, StaffFilter, StaffKind};

/// Downloadable record sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Patients,
    Staff(StaffKind),
    Appointments,
    Invoices,
    Medicines,
}

impl ExportKind {
    pub const ALL: [ExportKind; 7] = [
        ExportKind::Patients,
        ExportKind::Staff(StaffKind::Doctor),
        ExportKind::Staff(StaffKind::Nurse),
        ExportKind::Staff(StaffKind::LabTechnician),
        ExportKind::Appointments,
        ExportKind::Invoices,
        ExportKind::Medicines,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::Patients => "patients",
            ExportKind::Staff(kind) => kind.plural(),
            ExportKind::Appointments => "appointments",
            ExportKind::Invoices => "invoices",
            ExportKind::Medicines => "medicines",
        }
    }

    /// `<name>-YYYYMMDD.csv`
    pub fn file_name(&self, on: NaiveDate) -> String {
        format!("{}-{}.csv", self.name(), on.format("%Y%m%d"))
    }
}

/// Accepts both `patients` and `patients.csv`
impl FromStr for ExportKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(".csv").unwrap_or(s);
        ExportKind::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| ApiError::not_found(format!("export '{name}'")))
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn finish(writer: Writer<Vec<u8>>) -> ApiResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("CSV export failed: {}", e.error())))
}

pub struct ExportService {
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
    scheduling: Arc<SchedulingService>,
    pharmacy: Arc<PharmacyService>,
    invoicing: Arc<InvoicingService>,
}

impl ExportService {
    pub fn new(
        patients: Arc<PatientService>,
        staff: Arc<StaffService>,
        scheduling: Arc<SchedulingService>,
        pharmacy: Arc<PharmacyService>,
        invoicing: Arc<InvoicingService>,
    ) -> Self {
        Self {
            patients,
            staff,
            scheduling,
            pharmacy,
            invoicing,
        }
    }

    /// Header row plus one row per record, unpaginated
    pub async fn export(&self, kind: ExportKind) -> ApiResult<Vec<u8>> {
        let bytes = match kind {
            ExportKind::Patients => self.patients_csv().await?,
            ExportKind::Staff(staff_kind) => self.staff_csv(staff_kind).await?,
            ExportKind::Appointments => self.appointments_csv().await?,
            ExportKind::Invoices => self.invoices_csv().await?,
            ExportKind::Medicines => self.medicines_csv().await?,
        };
        tracing::info!(export = kind.name(), bytes = bytes.len(), "CSV export generated");
        Ok(bytes)
    }

    async fn patients_csv(&self) -> ApiResult<Vec<u8>> {
        let today = Utc::now().date_naive();
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "mrn",
            "first_name",
            "last_name",
            "date_of_birth",
            "age",
            "gender",
            "blood_group",
            "phone",
            "email",
            "address",
            "allergies",
            "is_active",
            "created_at",
        ])?;
        for p in self.patients.all(&PatientFilter::default()).await? {
            writer.write_record([
                p.mrn.clone(),
                p.first_name.clone(),
                p.last_name.clone(),
                p.date_of_birth.to_string(),
                p.age_on(today).to_string(),
                p.gender.as_str().to_string(),
                opt(p.blood_group),
                p.phone.clone(),
                opt(p.email.as_deref()),
                opt(p.address.as_deref()),
                p.allergies.join("; "),
                p.is_active.to_string(),
                timestamp(p.created_at),
            ])?;
        }
        finish(writer)
    }

    async fn staff_csv(&self, kind: StaffKind) -> ApiResult<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "id",
            "first_name",
            "last_name",
            "email",
            "phone",
            "department",
            "specialization",
            "qualification",
            "license_number",
            "experience_years",
            "consultation_fee",
            "shift",
            "is_active",
            "joined_on",
        ])?;
        for m in self.staff.all(Some(kind), &StaffFilter::default()).await? {
            writer.write_record([
                m.id.to_string(),
                m.first_name,
                m.last_name,
                m.email,
                m.phone,
                m.department,
                opt(m.specialization),
                opt(m.qualification),
                opt(m.license_number),
                opt(m.experience_years),
                opt(m.consultation_fee),
                opt(m.shift.map(|s| s.as_str())),
                m.is_active.to_string(),
                opt(m.joined_on),
            ])?;
        }
        finish(writer)
    }

    async fn appointments_csv(&self) -> ApiResult<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "id",
            "patient_id",
            "doctor_id",
            "scheduled_at",
            "duration_minutes",
            "status",
            "reason",
            "cancellation_reason",
        ])?;
        for a in self.scheduling.all(&AppointmentFilter::default()).await? {
            writer.write_record([
                a.id.to_string(),
                a.patient_id.to_string(),
                a.doctor_id.to_string(),
                timestamp(a.scheduled_at),
                a.duration_minutes.to_string(),
                a.status.as_str().to_string(),
                a.reason,
                opt(a.cancellation_reason),
            ])?;
        }
        finish(writer)
    }

    async fn invoices_csv(&self) -> ApiResult<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "invoice_number",
            "patient_id",
            "status",
            "subtotal",
            "discount",
            "tax_amount",
            "total",
            "amount_paid",
            "balance_due",
            "due_date",
            "created_at",
        ])?;
        for i in self.invoicing.billing().all_invoices(&InvoiceFilter::default()).await? {
            writer.write_record([
                i.invoice_number,
                i.patient_id.to_string(),
                i.status.as_str().to_string(),
                i.subtotal.to_string(),
                i.discount.to_string(),
                i.tax_amount.to_string(),
                i.total.to_string(),
                i.amount_paid.to_string(),
                i.balance_due.to_string(),
                i.due_date.to_string(),
                timestamp(i.created_at),
            ])?;
        }
        finish(writer)
    }

    async fn medicines_csv(&self) -> ApiResult<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "name",
            "generic_name",
            "category",
            "unit",
            "unit_price",
            "stock_quantity",
            "reorder_level",
            "batch_number",
            "expiry_date",
            "is_active",
        ])?;
        for m in self.pharmacy.all(&MedicineFilter::default()).await? {
            writer.write_record([
                m.name,
                opt(m.generic_name),
                m.category,
                m.unit,
                m.unit_price.to_string(),
                m.stock_quantity.to_string(),
                m.reorder_level.to_string(),
                opt(m.batch_number),
                opt(m.expiry_date),
                m.is_active.to_string(),
            ])?;
        }
        finish(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_names() {
        assert_eq!("lab-technicians.csv".parse::<ExportKind>().unwrap(), ExportKind::Staff(StaffKind::LabTechnician));
        assert_eq!("invoices".parse::<ExportKind>().unwrap(), ExportKind::Invoices);
        assert!("users.csv".parse::<ExportKind>().is_err());

        let day = NaiveDate::from_ymd_opt(2030, 1, 9).unwrap();
        assert_eq!(ExportKind::Medicines.file_name(day), "medicines-20300109.csv");
    }

    #[test]
    fn test_csv_quoting() {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(["name", "address"]).unwrap();
        writer.write_record(["Okafor, Amara", "12 \"Palm\" Road"]).unwrap();
        let text = String::from_utf8(finish(writer).unwrap()).unwrap();
        assert_eq!(text, "name,address\n\"Okafor, Amara\",\"12 \"\"Palm\"\" Road\"\n");
    }
}
