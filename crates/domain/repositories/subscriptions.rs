use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::domain::{
    entities::subscriptions::{
        EditSubscriptionEntity, InsertSubscriptionEntity, SubscriptionEntity,
    },
    value_objects::subscriptions::SubscriptionCostFilter,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("subscription {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        RepositoryError::Storage(err.into())
    }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::Storage(err.into())
    }
}

impl From<tokio::task::JoinError> for RepositoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        RepositoryError::Storage(err.into())
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> RepositoryResult<i64>;

    async fn find_by_id(&self, subscription_id: i64) -> RepositoryResult<SubscriptionEntity>;

    async fn update(
        &self,
        subscription_id: i64,
        edit_subscription_entity: EditSubscriptionEntity,
    ) -> RepositoryResult<()>;

    async fn delete(&self, subscription_id: i64) -> RepositoryResult<()>;

    async fn list_all(&self) -> RepositoryResult<Vec<SubscriptionEntity>>;

    async fn sum_cost(&self, cost_filter: SubscriptionCostFilter) -> RepositoryResult<i64>;
}
