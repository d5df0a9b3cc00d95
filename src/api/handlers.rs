use crate::{
    api::models::*,
    auth::jwt::Claims,
    core::{
        errors::TripError,
        models::{
            audit::{AppLog, TripAudit},
            expense::{CategorySummary, ExpensePatch, ExpenseRecord, NewExpense},
            trip::Trip,
            user::User,
        },
        services::{SplitSummary, TripService},
        settlement::SettlementPlan,
    },
    infrastructure::{logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use http::header;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type AppService = TripService<InMemoryLogging, InMemoryStorage>;

/// Middleware to validate JWT
async fn auth_middleware(
    State(service): State<Arc<AppService>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| TripError::InvalidToken("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| TripError::InvalidToken("Invalid Authorization header".to_string()))?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// Define API routes
pub fn api_routes(service: Arc<AppService>) -> Router {
    let protected_routes = Router::new()
        .route("/users/{user_id}", get(get_user))
        .route("/trips", post(create_trip).get(list_trips))
        .route("/trips/{trip_id}", get(get_trip))
        .route("/trips/{trip_id}/members", post(add_trip_member))
        .route("/trips/{trip_id}/members/{user_id}", delete(remove_trip_member))
        .route("/trips/{trip_id}/expenses", post(add_expense).get(list_expenses))
        .route("/expenses/{expense_id}", put(update_expense).delete(delete_expense))
        .route("/trips/{trip_id}/settle-up", get(settle_up))
        .route("/trips/{trip_id}/split-summary", get(split_summary))
        .route("/trips/{trip_id}/category-summary", get(category_summary))
        .route("/trips/{trip_id}/audits", get(get_trip_audits))
        .route("/logs", get(get_app_logs))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn register(
    State(service): State<Arc<AppService>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = service.register_user(req.name, req.email, req.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(service): State<Arc<AppService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.authenticate(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "ID of the user")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_user(
    State(service): State<Arc<AppService>>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = service
        .get_user(&user_id)
        .await?
        .ok_or_else(|| TripError::UserNotFound(user_id))?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 201, description = "Trip created", body = Trip),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Member not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_trip(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let creator = service
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| TripError::UserNotFound(claims.sub.clone()))?;
    let trip = service
        .create_trip(req.name, req.destination, req.member_ids, &creator)
        .await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

#[utoipa::path(
    get,
    path = "/api/trips",
    responses(
        (status = 200, description = "Trips of the caller", body = Vec<Trip>)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn list_trips(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Trip>>, ApiError> {
    Ok(Json(service.list_user_trips(&claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Trip found", body = Trip),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_trip(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(service.get_trip(&trip_id, &claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/members",
    request_body = AddMemberRequest,
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Member added", body = Trip),
        (status = 403, description = "Not trip owner", body = ErrorResponse),
        (status = 404, description = "Trip or user not found", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn add_trip_member(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(service.add_trip_member(&trip_id, &req.user_id, &claims.sub).await?))
}

#[utoipa::path(
    delete,
    path = "/api/trips/{trip_id}/members/{user_id}",
    params(
        ("trip_id" = String, Path, description = "ID of the trip"),
        ("user_id" = String, Path, description = "ID of the member to remove")
    ),
    responses(
        (status = 200, description = "Member removed", body = Trip),
        (status = 403, description = "Not trip owner", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 409, description = "Member still has expenses", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn remove_trip_member(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path((trip_id, user_id)): Path<(String, String)>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(service.remove_trip_member(&trip_id, &user_id, &claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/expenses",
    request_body = NewExpense,
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 201, description = "Expense recorded", body = ExpenseRecord),
        (status = 400, description = "Invalid expense", body = ErrorResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn add_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Json(req): Json<NewExpense>,
) -> Result<(StatusCode, Json<ExpenseRecord>), ApiError> {
    let expense = service.add_expense(&trip_id, req, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/expenses",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Expenses, newest first", body = Vec<ExpenseRecord>),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn list_expenses(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<ExpenseRecord>>, ApiError> {
    Ok(Json(service.list_expenses(&trip_id, &claims.sub).await?))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{expense_id}",
    request_body = ExpensePatch,
    params(
        ("expense_id" = String, Path, description = "ID of the expense")
    ),
    responses(
        (status = 200, description = "Expense updated", body = ExpenseRecord),
        (status = 400, description = "Invalid expense", body = ErrorResponse),
        (status = 403, description = "Not allowed to edit", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn update_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
    Json(req): Json<ExpensePatch>,
) -> Result<Json<ExpenseRecord>, ApiError> {
    Ok(Json(service.update_expense(&expense_id, req, &claims.sub).await?))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{expense_id}",
    params(
        ("expense_id" = String, Path, description = "ID of the expense")
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Not allowed to delete", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn delete_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete_expense(&expense_id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/settle-up",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Balances and suggested transfers", body = SettlementPlan),
        (status = 400, description = "Stored expenses cannot be settled", body = ErrorResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn settle_up(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<SettlementPlan>, ApiError> {
    Ok(Json(service.settle_trip(&trip_id, &claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/split-summary",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Totals, rounded balances and transfers", body = SplitSummary),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn split_summary(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<SplitSummary>, ApiError> {
    Ok(Json(service.split_summary(&trip_id, &claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/category-summary",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Spending per category", body = BTreeMap<String, CategorySummary>),
        (status = 403, description = "Not a trip member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn category_summary(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<BTreeMap<String, CategorySummary>>, ApiError> {
    let summary = service
        .category_summary(&trip_id, &claims.sub)
        .await?
        .into_iter()
        .map(|(category, entry)| (category.to_string(), entry))
        .collect();
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/audits",
    params(
        ("trip_id" = String, Path, description = "ID of the trip")
    ),
    responses(
        (status = 200, description = "Audit trail of the trip", body = Vec<TripAudit>),
        (status = 403, description = "Not a trip member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_trip_audits(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<TripAudit>>, ApiError> {
    Ok(Json(service.get_trip_audits(&trip_id, &claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Application log", body = Vec<AppLog>)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_app_logs(State(service): State<Arc<AppService>>) -> Result<Json<Vec<AppLog>>, ApiError> {
    Ok(Json(service.get_app_logs().await?))
}
