//! Role to permission matrix.
//!
//! Permissions marked "own only" for patients are granted here; handlers
//! narrow patient callers to their own records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewPatients,
    ManagePatients,
    ViewStaff,
    ManageStaff,
    ViewAppointments,
    ManageAppointments,
    ViewPrescriptions,
    Prescribe,
    Dispense,
    ViewInventory,
    ManageInventory,
    ViewLabTests,
    OrderLabTests,
    ProcessLabTests,
    ViewBilling,
    ManageBilling,
    ViewAnalytics,
    ExportData,
    ManageUsers,
}

impl Permission {
    pub const ALL: [Permission; 19] = [
        Permission::ViewPatients,
        Permission::ManagePatients,
        Permission::ViewStaff,
        Permission::ManageStaff,
        Permission::ViewAppointments,
        Permission::ManageAppointments,
        Permission::ViewPrescriptions,
        Permission::Prescribe,
        Permission::Dispense,
        Permission::ViewInventory,
        Permission::ManageInventory,
        Permission::ViewLabTests,
        Permission::OrderLabTests,
        Permission::ProcessLabTests,
        Permission::ViewBilling,
        Permission::ManageBilling,
        Permission::ViewAnalytics,
        Permission::ExportData,
        Permission::ManageUsers,
    ];
}

impl Role {
    pub fn can(&self, permission: Permission) -> bool {
        use Permission::*;
        use Role::*;

        match permission {
            ViewPatients => !matches!(self, Patient),
            ManagePatients => matches!(self, Admin | Doctor | Nurse | Receptionist),
            ViewStaff => self.is_staff(),
            ManageStaff => matches!(self, Admin),
            ViewAppointments => matches!(self, Admin | Doctor | Nurse | Receptionist | Patient),
            ManageAppointments => matches!(self, Admin | Doctor | Receptionist),
            ViewPrescriptions => matches!(self, Admin | Doctor | Nurse | Pharmacist | Patient),
            Prescribe => matches!(self, Admin | Doctor),
            Dispense => matches!(self, Admin | Pharmacist),
            ViewInventory => matches!(self, Admin | Doctor | Nurse | Pharmacist),
            ManageInventory => matches!(self, Admin | Pharmacist),
            ViewLabTests => matches!(self, Admin | Doctor | Nurse | LabTechnician | Patient),
            OrderLabTests => matches!(self, Admin | Doctor),
            ProcessLabTests => matches!(self, Admin | LabTechnician),
            ViewBilling => matches!(self, Admin | Receptionist | Patient),
            ManageBilling => matches!(self, Admin | Receptionist),
            ViewAnalytics | ExportData | ManageUsers => matches!(self, Admin),
        }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.can(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        assert_eq!(Role::Admin.permissions().len(), Permission::ALL.len());
    }

    #[test]
    fn test_patient_permissions() {
        assert_eq!(
            Role::Patient.permissions(),
            vec![
                Permission::ViewAppointments,
                Permission::ViewPrescriptions,
                Permission::ViewLabTests,
                Permission::ViewBilling,
            ]
        );
    }

    #[test]
    fn test_clinical_separation() {
        assert!(Role::Doctor.can(Permission::Prescribe));
        assert!(!Role::Doctor.can(Permission::Dispense));
        assert!(Role::Pharmacist.can(Permission::Dispense));
        assert!(!Role::Pharmacist.can(Permission::Prescribe));
        assert!(Role::LabTechnician.can(Permission::ProcessLabTests));
        assert!(!Role::LabTechnician.can(Permission::OrderLabTests));
        assert!(!Role::Receptionist.can(Permission::ViewInventory));
        assert!(!Role::Nurse.can(Permission::ViewAnalytics));
    }
}
