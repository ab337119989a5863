use auth_identity::Permission;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::server::CareDeskServer;
use crate::services::ExportKind;

#[utoipa::path(
    get,
    path = "/api/v1/export/{file}",
    params((
        "file" = String,
        Path,
        description = "patients, doctors, nurses, lab-technicians, appointments, invoices or medicines, with .csv"
    )),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown export")
    ),
    tag = "export",
    security(("bearer_auth" = []))
)]
pub async fn export_csv(
    State(server): State<CareDeskServer>,
    Path(file): Path<String>,
    auth: AuthContext,
) -> Result<Response, ApiError> {
    auth.require(Permission::ExportData)?;
    let kind: ExportKind = file.parse()?;
    let body = server.export.export(kind).await?;

    let file_name = kind.file_name(chrono::Utc::now().date_naive());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .map_err(|e| ApiError::internal(format!("invalid export file name: {e}")))?;

    tracing::info!(export = kind.name(), user_id = %auth.user_id, "Data exported");
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
