use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    routing::{get, patch, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::{debug, instrument};

use super::{
    categories::{list_categories, CategoryDescriptor},
    dto::{
        CreateListingRequest, ListQuery, ListingPage, ModerationRequest, RateRequest,
        RatingEnvelope, ServiceDetailsEnvelope, ServiceEnvelope, ServicesEnvelope,
        UpdateListingRequest,
    },
    services,
};
use crate::{
    auth::{
        extractors::{CurrentUser, MaybeUser},
        gate::{authenticate, authenticate_optional, authorize, require_role, require_verified},
    },
    error::{ApiResponse, AppError},
    state::AppState,
    users::repo_types::Role,
};

const PROVIDERS: &[Role] = &[Role::ServiceProvider];
const CUSTOMERS: &[Role] = &[Role::Customer];

pub fn routes(state: AppState) -> Router<AppState> {
    let browse = Router::new()
        .route("/services", get(list_services))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate_optional));

    let public = Router::new()
        .route("/services/categories", get(categories))
        .route("/services/provider/:provider_id", get(list_by_provider))
        .route("/services/:id", get(get_service));

    let publish = Router::new()
        .route("/services", post(create_service))
        .route_layer(middleware::from_fn(require_verified))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            authorize(PROVIDERS, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let owner = Router::new()
        .route("/services/:id", put(update_service).delete(delete_service))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let review = Router::new()
        .route("/services/:id/rate", post(rate_service))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            authorize(CUSTOMERS, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let moderation = Router::new()
        .route("/services/:id/moderation", patch(moderate_service))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .merge(browse)
        .merge(public)
        .merge(publish)
        .merge(owner)
        .merge(review)
        .merge(moderation)
}

#[instrument(skip(state, provider, payload), fields(user_id = %provider.id))]
pub async fn create_service(
    State(state): State<AppState>,
    CurrentUser(provider): CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateListingRequest>, AppError>,
) -> Result<(StatusCode, ApiResponse<ServiceEnvelope>), AppError> {
    let service = services::create(&state, &provider, payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "Service created successfully and pending review",
            ServiceEnvelope { service },
        ),
    ))
}

#[instrument(skip(state, viewer))]
pub async fn list_services(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<ApiResponse<ListingPage>, AppError> {
    if let Some(viewer) = &viewer {
        debug!(user_id = %viewer.id, "authenticated browse");
    }
    Ok(ApiResponse::data(services::list(&state, query).await?))
}

pub async fn categories() -> ApiResponse<Vec<CategoryDescriptor>> {
    ApiResponse::data(list_categories())
}

#[instrument(skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ServiceDetailsEnvelope>, AppError> {
    let service = services::get_by_id(&state, &id).await?;
    Ok(ApiResponse::data(ServiceDetailsEnvelope { service }))
}

#[instrument(skip(state))]
pub async fn list_by_provider(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<ApiResponse<ServicesEnvelope>, AppError> {
    let services = services::list_by_provider(&state, &provider_id).await?;
    Ok(ApiResponse::data(ServicesEnvelope { services }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateListingRequest>, AppError>,
) -> Result<ApiResponse<ServiceEnvelope>, AppError> {
    let service = services::update(&state, &user, &id, payload).await?;
    Ok(ApiResponse::with_message(
        "Service updated successfully",
        ServiceEnvelope { service },
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    services::delete(&state, &user, &id).await?;
    Ok(ApiResponse::message("Service deleted successfully"))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn rate_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<RateRequest>, AppError>,
) -> Result<ApiResponse<RatingEnvelope>, AppError> {
    let rating = services::rate(&state, &user, &id, payload.rating).await?;
    Ok(ApiResponse::with_message(
        "Rating submitted",
        RatingEnvelope { rating },
    ))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn moderate_service(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<ModerationRequest>, AppError>,
) -> Result<ApiResponse<ServiceEnvelope>, AppError> {
    let service = services::moderate(&state, &admin, &id, payload).await?;
    Ok(ApiResponse::with_message(
        "Service moderation updated",
        ServiceEnvelope { service },
    ))
}
