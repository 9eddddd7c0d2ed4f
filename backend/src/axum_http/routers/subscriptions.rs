use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Response,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            month_year::MonthYear,
            subscriptions::{
                CreatedSubscriptionDto, InsertSubscriptionModel, SubscriptionCostFilter,
                SubscriptionCostSumDto, UpdateSubscriptionModel,
            },
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::subscriptions::SubscriptionPostgres,
    },
};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    axum_http::error_responses::{AppError, EmptyResponse, success},
    usecases::subscriptions::SubscriptionUseCase,
};

pub const INVALID_BODY_ERROR: &str = "invalid request body";
pub const INVALID_ID_ERROR: &str = "invalid id parameter";
pub const INVALID_QUERY_ERROR: &str = "invalid query parameters";
pub const INVALID_USER_ID_ERROR: &str = "invalid user_id parameter";
pub const INVALID_SERVICE_NAME_ERROR: &str = "invalid service_name parameter";
pub const INVALID_DATE_FROM_ERROR: &str = "invalid date_from parameter";
pub const INVALID_DATE_TO_ERROR: &str = "invalid date_to parameter";
pub const DATE_FROM_AFTER_DATE_TO_ERROR: &str = "date_from cannot be after date_to";

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let subscription_usecase = SubscriptionUseCase::new(Arc::new(subscription_repository));

    routes_with_usecase(Arc::new(subscription_usecase))
}

pub fn routes_with_usecase<T>(subscription_usecase: Arc<SubscriptionUseCase<T>>) -> Router
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/subscribe", post(create::<T>))
        .route("/subscribe/all", get(list_all::<T>))
        .route("/subscribe/sum", get(sum_cost::<T>))
        .route(
            "/subscribe/:id",
            get(get_by_id::<T>).put(update::<T>).delete(delete::<T>),
        )
        .with_state(subscription_usecase)
}

pub async fn create<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    payload: Result<Json<InsertSubscriptionModel>, JsonRejection>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Json(insert_subscription_model) = payload.map_err(invalid_body)?;

    insert_subscription_model
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let id = subscription_usecase.create(insert_subscription_model).await?;

    Ok(success(CreatedSubscriptionDto { id }))
}

pub async fn get_by_id<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let subscription_id = parse_id(&raw_id)?;

    let subscription = subscription_usecase.get(subscription_id).await?;

    Ok(success(subscription))
}

pub async fn update<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateSubscriptionModel>, JsonRejection>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    // Body problems are reported before a bad id.
    let Json(update_subscription_model) = payload.map_err(invalid_body)?;
    let subscription_id = parse_id(&raw_id)?;

    update_subscription_model
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    subscription_usecase
        .update(subscription_id, update_subscription_model)
        .await?;

    Ok(success(EmptyResponse::default()))
}

pub async fn delete<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let subscription_id = parse_id(&raw_id)?;

    subscription_usecase.delete(subscription_id).await?;

    Ok(success(EmptyResponse::default()))
}

pub async fn list_all<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let subscriptions = subscription_usecase.list_all().await?;

    Ok(success(subscriptions))
}

#[derive(Debug, Default, Deserialize)]
pub struct SumCostQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

pub async fn sum_cost<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    query: Result<Query<SumCostQuery>, QueryRejection>,
) -> Result<Response, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Query(sum_cost_query) = query.map_err(|rejection| {
        warn!(rejection = %rejection, "subscriptions: rejected sum query");
        AppError::BadRequest(INVALID_QUERY_ERROR.to_string())
    })?;

    let cost_filter = parse_cost_filter(sum_cost_query)?;

    let sum = subscription_usecase.sum_cost(cost_filter).await?;

    Ok(success(SubscriptionCostSumDto { sum }))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    debug!(rejection = %rejection, "subscriptions: rejected request body");
    AppError::BadRequest(INVALID_BODY_ERROR.to_string())
}

/// Path ids must be positive integers.
pub fn parse_id(raw_id: &str) -> Result<i64, AppError> {
    match raw_id.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(INVALID_ID_ERROR.to_string())),
    }
}

/// Validates the aggregation query in a fixed order and stops at the first
/// failure.
pub fn parse_cost_filter(query: SumCostQuery) -> Result<SubscriptionCostFilter, AppError> {
    let bad_request = |message: &str| AppError::BadRequest(message.to_string());

    let user_id = query
        .user_id
        .filter(|v| !v.is_empty())
        .and_then(|v| Uuid::parse_str(&v).ok())
        .ok_or_else(|| bad_request(INVALID_USER_ID_ERROR))?;

    let service_name = query
        .service_name
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| bad_request(INVALID_SERVICE_NAME_ERROR))?;

    let date_from = query
        .date_from
        .unwrap_or_default()
        .parse::<MonthYear>()
        .map_err(|_| bad_request(INVALID_DATE_FROM_ERROR))?;

    let date_to = query
        .date_to
        .unwrap_or_default()
        .parse::<MonthYear>()
        .map_err(|_| bad_request(INVALID_DATE_TO_ERROR))?;

    if date_from > date_to {
        return Err(bad_request(DATE_FROM_AFTER_DATE_TO_ERROR));
    }

    Ok(SubscriptionCostFilter {
        user_id,
        service_name,
        date_from,
        date_to,
    })
}
