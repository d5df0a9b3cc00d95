use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::models::{AddMemberRequest, CreateTripRequest, ErrorResponse, LoginRequest, LoginResponse, RegisterRequest},
    core::{
        models::{
            audit::{AppLog, TripAudit},
            expense::{CategoryItem, CategorySummary, ExpenseCategory, ExpensePatch, ExpenseRecord, NewExpense},
            trip::{Role, Trip, TripMember},
            user::User,
        },
        services::SplitSummary,
        settlement::{Settlement, SettlementPlan},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::register,
        super::handlers::login,
        super::handlers::get_user,
        super::handlers::create_trip,
        super::handlers::list_trips,
        super::handlers::get_trip,
        super::handlers::add_trip_member,
        super::handlers::remove_trip_member,
        super::handlers::add_expense,
        super::handlers::list_expenses,
        super::handlers::update_expense,
        super::handlers::delete_expense,
        super::handlers::settle_up,
        super::handlers::split_summary,
        super::handlers::category_summary,
        super::handlers::get_trip_audits,
        super::handlers::get_app_logs
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        CreateTripRequest,
        AddMemberRequest,
        ErrorResponse,
        User,
        Role,
        Trip,
        TripMember,
        ExpenseCategory,
        ExpenseRecord,
        NewExpense,
        ExpensePatch,
        CategoryItem,
        CategorySummary,
        Settlement,
        SettlementPlan,
        SplitSummary,
        AppLog,
        TripAudit
    )),
    modifiers(&SecurityAddon),
    info(
        title = "Tripsplit API",
        description = "API for sharing trip expenses and settling up",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}
