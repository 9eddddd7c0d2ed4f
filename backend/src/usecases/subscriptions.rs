use std::sync::Arc;

use axum::http::StatusCode;
use crates::domain::{
    repositories::subscriptions::{RepositoryError, SubscriptionRepository},
    value_objects::subscriptions::{
        InsertSubscriptionModel, SubscriptionCostFilter, SubscriptionModel,
        SubscriptionValidationError, UpdateSubscriptionModel, ensure_period,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),
    #[error("subscription {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Storage(anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for SubscriptionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => SubscriptionError::NotFound(id),
            RepositoryError::Storage(err) => SubscriptionError::Storage(err),
        }
    }
}

impl From<SubscriptionValidationError> for SubscriptionError {
    fn from(err: SubscriptionValidationError) -> Self {
        SubscriptionError::Validation(err.to_string())
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Orchestrates subscription storage. Transport input is validated by the
/// caller; this layer only guards invariants that need stored state.
pub struct SubscriptionUseCase<T>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repository: Arc<T>,
}

impl<T> SubscriptionUseCase<T>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repository: Arc<T>) -> Self {
        Self {
            subscription_repository,
        }
    }

    pub async fn create(&self, insert_subscription_model: InsertSubscriptionModel) -> UseCaseResult<i64> {
        info!(
            user_id = %insert_subscription_model.user_id,
            service_name = %insert_subscription_model.service_name,
            "subscriptions: create requested"
        );

        let id = self
            .subscription_repository
            .create(insert_subscription_model.to_entity())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to create subscription");
                SubscriptionError::from(err)
            })?;

        info!(id, "subscriptions: created");
        Ok(id)
    }

    pub async fn get(&self, subscription_id: i64) -> UseCaseResult<SubscriptionModel> {
        let entity = self
            .subscription_repository
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                log_repository_error(subscription_id, &err, "subscriptions: failed to load subscription");
                SubscriptionError::from(err)
            })?;

        Ok(SubscriptionModel::from(entity))
    }

    pub async fn update(
        &self,
        subscription_id: i64,
        update_subscription_model: UpdateSubscriptionModel,
    ) -> UseCaseResult<()> {
        info!(
            subscription_id,
            no_op = update_subscription_model.is_empty(),
            "subscriptions: update requested"
        );

        if update_subscription_model.needs_stored_period() {
            let stored = self.get(subscription_id).await?;

            let start_date = update_subscription_model
                .start_date
                .unwrap_or(stored.start_date);
            let end_date = update_subscription_model
                .end_date
                .unwrap_or(stored.end_date);

            ensure_period(start_date, end_date).map_err(|err| {
                warn!(
                    subscription_id,
                    %start_date,
                    end_date = ?end_date.map(|end_date| end_date.to_string()),
                    "subscriptions: update would end before it starts"
                );
                SubscriptionError::from(err)
            })?;
        }

        self.subscription_repository
            .update(subscription_id, update_subscription_model.to_entity())
            .await
            .map_err(|err| {
                log_repository_error(subscription_id, &err, "subscriptions: failed to update subscription");
                SubscriptionError::from(err)
            })?;

        info!(subscription_id, "subscriptions: updated");
        Ok(())
    }

    pub async fn delete(&self, subscription_id: i64) -> UseCaseResult<()> {
        info!(subscription_id, "subscriptions: delete requested");

        self.subscription_repository
            .delete(subscription_id)
            .await
            .map_err(|err| {
                log_repository_error(subscription_id, &err, "subscriptions: failed to delete subscription");
                SubscriptionError::from(err)
            })?;

        info!(subscription_id, "subscriptions: deleted");
        Ok(())
    }

    pub async fn list_all(&self) -> UseCaseResult<Vec<SubscriptionModel>> {
        let entities = self
            .subscription_repository
            .list_all()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to list subscriptions");
                SubscriptionError::from(err)
            })?;

        let count = entities.len();
        info!(count, "subscriptions: listed");
        Ok(entities.into_iter().map(SubscriptionModel::from).collect())
    }

    pub async fn sum_cost(&self, cost_filter: SubscriptionCostFilter) -> UseCaseResult<i64> {
        info!(
            user_id = %cost_filter.user_id,
            service_name = %cost_filter.service_name,
            date_from = %cost_filter.date_from,
            date_to = %cost_filter.date_to,
            "subscriptions: cost sum requested"
        );

        let sum = self
            .subscription_repository
            .sum_cost(cost_filter)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to sum subscription cost");
                SubscriptionError::from(err)
            })?;

        info!(sum, "subscriptions: cost sum computed");
        Ok(sum)
    }
}

fn log_repository_error(subscription_id: i64, err: &RepositoryError, message: &'static str) {
    match err {
        RepositoryError::NotFound(_) => warn!(subscription_id, "{message}: not found"),
        RepositoryError::Storage(_) => error!(subscription_id, db_error = ?err, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crates::domain::{
        entities::subscriptions::{EditSubscriptionEntity, SubscriptionEntity},
        repositories::subscriptions::MockSubscriptionRepository,
        value_objects::month_year::MonthYear,
    };
    use mockall::predicate::{always, eq};
    use uuid::Uuid;

    fn month(raw: &str) -> MonthYear {
        raw.parse().unwrap()
    }

    fn sample_entity(id: i64) -> SubscriptionEntity {
        SubscriptionEntity {
            id,
            service_name: "Yandex Plus".to_string(),
            price: 400,
            user_id: Uuid::parse_str("60601fee-2bf1-4721-ae6f-7636e79a0cba").unwrap(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn create_passes_entity_through_and_returns_id() {
        let model = InsertSubscriptionModel {
            service_name: "Yandex Plus".to_string(),
            price: 400,
            user_id: Uuid::new_v4(),
            start_date: month("07-2025"),
            end_date: None,
        };
        let expected_entity = model.to_entity();

        let mut repo = MockSubscriptionRepository::new();
        repo.expect_create()
            .with(eq(expected_entity))
            .times(1)
            .returning(|_| Box::pin(async { Ok(42) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));

        assert_eq!(usecase.create(model).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn get_maps_entity_to_model() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .with(eq(7))
            .returning(|id| Box::pin(async move { Ok(sample_entity(id)) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let model = usecase.get(7).await.unwrap();

        assert_eq!(model.id, 7);
        assert_eq!(model.start_date, month("07-2025"));
        assert_eq!(model.end_date, None);
    }

    #[tokio::test]
    async fn get_reports_not_found() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Box::pin(async move { Err(RepositoryError::NotFound(id)) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase.get(99).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::NotFound(99)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn storage_failures_surface_as_internal_errors() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_list_all().returning(|| {
            Box::pin(async { Err(RepositoryError::Storage(anyhow::anyhow!("connection refused"))) })
        });

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase.list_all().await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn list_all_returns_empty_sequence() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_list_all()
            .returning(|| Box::pin(async { Ok(Vec::new()) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));

        assert!(usecase.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_only_update_skips_period_lookup() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id().never();
        repo.expect_update()
            .with(
                eq(3),
                eq(EditSubscriptionEntity {
                    price: Some(999),
                    ..Default::default()
                }),
            )
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let update = UpdateSubscriptionModel {
            price: Some(999),
            ..Default::default()
        };

        usecase.update(3, update).await.unwrap();
    }

    #[tokio::test]
    async fn end_date_only_update_is_checked_against_stored_start() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .with(eq(5))
            .returning(|id| Box::pin(async move { Ok(sample_entity(id)) }));
        repo.expect_update().never();

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let update = UpdateSubscriptionModel {
            end_date: Some(Some(month("06-2025"))),
            ..Default::default()
        };

        let err = usecase.update(5, update).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "end_date cannot be before start_date");
    }

    #[tokio::test]
    async fn end_date_only_update_after_stored_start_is_applied() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Box::pin(async move { Ok(sample_entity(id)) }));
        repo.expect_update()
            .with(eq(5), always())
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let update = UpdateSubscriptionModel {
            end_date: Some(Some(month("12-2025"))),
            ..Default::default()
        };

        usecase.update(5, update).await.unwrap();
    }

    #[tokio::test]
    async fn update_of_missing_subscription_is_not_found() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_update()
            .returning(|id, _| Box::pin(async move { Err(RepositoryError::NotFound(id)) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase
            .update(11, UpdateSubscriptionModel::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::NotFound(11)));
    }

    #[tokio::test]
    async fn delete_propagates_not_found() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_delete()
            .with(eq(8))
            .returning(|id| Box::pin(async move { Err(RepositoryError::NotFound(id)) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));
        let err = usecase.delete(8).await.unwrap_err();

        assert_eq!(err.to_string(), "subscription 8 not found");
    }

    #[tokio::test]
    async fn sum_cost_forwards_the_filter() {
        let cost_filter = SubscriptionCostFilter {
            user_id: Uuid::new_v4(),
            service_name: "Netflix".to_string(),
            date_from: month("03-2024"),
            date_to: month("05-2024"),
        };

        let mut repo = MockSubscriptionRepository::new();
        repo.expect_sum_cost()
            .with(eq(cost_filter.clone()))
            .times(1)
            .returning(|_| Box::pin(async { Ok(1000) }));

        let usecase = SubscriptionUseCase::new(Arc::new(repo));

        assert_eq!(usecase.sum_cost(cost_filter).await.unwrap(), 1000);
    }
}
