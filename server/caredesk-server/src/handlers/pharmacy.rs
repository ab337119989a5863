use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{
    AdjustStockRequest, CreateMedicineRequest, ExpiringQuery, InventorySummary, Medicine, MedicineFilter,
    RestockRequest, StockMovement, UpdateMedicineRequest,
};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

// ============================================================================
// CATALOGUE
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/medicines",
    params(PaginationParams, MedicineFilter),
    responses((status = 200, description = "Medicines by name", body = Vec<Medicine>)),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn list_medicines(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<MedicineFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Medicine>>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    let (items, total) = server
        .pharmacy
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/pharmacy/medicines",
    request_body = CreateMedicineRequest,
    responses(
        (status = 201, description = "Medicine added; opening stock booked as a restock", body = Medicine),
        (status = 400, description = "Invalid medicine")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn create_medicine(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Medicine>>), ApiError> {
    auth.require(Permission::ManageInventory)?;
    let medicine = server.pharmacy.create(request, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(medicine))))
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/medicines/{id}",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    responses(
        (status = 200, description = "Medicine", body = Medicine),
        (status = 404, description = "Medicine not found")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn get_medicine(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Medicine>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    Ok(Json(api_success(server.pharmacy.get(id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/pharmacy/medicines/{id}",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    request_body = UpdateMedicineRequest,
    responses(
        (status = 200, description = "Catalogue fields updated", body = Medicine),
        (status = 404, description = "Medicine not found")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn update_medicine(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateMedicineRequest>,
) -> Result<Json<ApiResponse<Medicine>>, ApiError> {
    auth.require(Permission::ManageInventory)?;
    Ok(Json(api_success(server.pharmacy.update(id, request).await?)))
}

// ============================================================================
// STOCK
// ============================================================================

#[utoipa::path(
    post,
    path = "/api/v1/pharmacy/medicines/{id}/restock",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock added", body = Medicine),
        (status = 400, description = "Quantity must be positive")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn restock(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<RestockRequest>,
) -> Result<Json<ApiResponse<Medicine>>, ApiError> {
    auth.require(Permission::ManageInventory)?;
    Ok(Json(api_success(server.pharmacy.restock(id, request, auth.user_id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/pharmacy/medicines/{id}/adjust",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock corrected", body = Medicine),
        (status = 409, description = "Adjustment would make stock negative")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn adjust(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<Medicine>>, ApiError> {
    auth.require(Permission::ManageInventory)?;
    Ok(Json(api_success(server.pharmacy.adjust(id, request, auth.user_id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/pharmacy/medicines/{id}/write-off",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    responses(
        (status = 200, description = "Expired stock written off", body = Medicine),
        (status = 422, description = "Medicine is not expired or has no stock")
    ),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn write_off_expired(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Medicine>>, ApiError> {
    auth.require(Permission::ManageInventory)?;
    Ok(Json(api_success(server.pharmacy.write_off_expired(id, auth.user_id).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/medicines/{id}/movements",
    params(("id" = Uuid, Path, description = "Medicine ID")),
    responses((status = 200, description = "Stock ledger, newest first", body = Vec<StockMovement>)),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn movements(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<StockMovement>>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    Ok(Json(api_success(server.pharmacy.movements(id).await?)))
}

// ============================================================================
// REPORTS
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/low-stock",
    responses((status = 200, description = "At or below reorder level, most depleted first", body = Vec<Medicine>)),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn low_stock(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Medicine>>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    Ok(Json(api_success(server.pharmacy.low_stock().await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/expiring",
    params(ExpiringQuery),
    responses((status = 200, description = "Expiring within the window, including expired", body = Vec<Medicine>)),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn expiring(
    State(server): State<CareDeskServer>,
    Query(query): Query<ExpiringQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Medicine>>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    Ok(Json(api_success(server.pharmacy.expiring(query.days).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacy/summary",
    responses((status = 200, description = "Inventory totals", body = InventorySummary)),
    tag = "pharmacy",
    security(("bearer_auth" = []))
)]
pub async fn summary(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<InventorySummary>>, ApiError> {
    auth.require(Permission::ViewInventory)?;
    Ok(Json(api_success(server.pharmacy.summary().await?)))
}
