use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, dsl::sum, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain::{
        entities::subscriptions::{
            EditSubscriptionEntity, InsertSubscriptionEntity, SubscriptionEntity,
        },
        repositories::subscriptions::{RepositoryError, RepositoryResult, SubscriptionRepository},
        value_objects::subscriptions::SubscriptionCostFilter,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

// Diesel is synchronous; every query runs on the blocking threadpool and holds
// its pooled connection only for that one statement.
#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> RepositoryResult<i64> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<i64> {
            let mut conn = db_pool.get()?;

            let id = insert_into(subscriptions::table)
                .values(&insert_subscription_entity)
                .returning(subscriptions::id)
                .get_result::<i64>(&mut conn)?;

            Ok(id)
        })
        .await?
    }

    async fn find_by_id(&self, subscription_id: i64) -> RepositoryResult<SubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<SubscriptionEntity> {
            let mut conn = db_pool.get()?;

            subscriptions::table
                .find(subscription_id)
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(&mut conn)
                .optional()?
                .ok_or(RepositoryError::NotFound(subscription_id))
        })
        .await?
    }

    async fn update(
        &self,
        subscription_id: i64,
        edit_subscription_entity: EditSubscriptionEntity,
    ) -> RepositoryResult<()> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<()> {
            let mut conn = db_pool.get()?;

            // Diesel refuses to render an empty changeset, so a no-op update
            // only confirms the row exists.
            let affected = if edit_subscription_entity.is_empty() {
                subscriptions::table
                    .find(subscription_id)
                    .count()
                    .get_result::<i64>(&mut conn)?
            } else {
                update(subscriptions::table.find(subscription_id))
                    .set(&edit_subscription_entity)
                    .execute(&mut conn)? as i64
            };

            if affected == 0 {
                return Err(RepositoryError::NotFound(subscription_id));
            }

            Ok(())
        })
        .await?
    }

    async fn delete(&self, subscription_id: i64) -> RepositoryResult<()> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<()> {
            let mut conn = db_pool.get()?;

            let affected = delete(subscriptions::table.find(subscription_id)).execute(&mut conn)?;

            if affected == 0 {
                return Err(RepositoryError::NotFound(subscription_id));
            }

            Ok(())
        })
        .await?
    }

    async fn list_all(&self) -> RepositoryResult<Vec<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<Vec<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let results = subscriptions::table
                .select(SubscriptionEntity::as_select())
                .order(subscriptions::id.asc())
                .load::<SubscriptionEntity>(&mut conn)?;

            Ok(results)
        })
        .await?
    }

    async fn sum_cost(&self, cost_filter: SubscriptionCostFilter) -> RepositoryResult<i64> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> RepositoryResult<i64> {
            let mut conn = db_pool.get()?;

            let date_from = cost_filter.date_from.first_day();
            let date_to = cost_filter.date_to.first_day();

            // Same predicate as SubscriptionCostFilter::overlaps.
            let total = subscriptions::table
                .filter(subscriptions::user_id.eq(cost_filter.user_id))
                .filter(subscriptions::service_name.eq(cost_filter.service_name))
                .filter(subscriptions::start_date.le(date_to))
                .filter(
                    subscriptions::end_date
                        .is_null()
                        .or(subscriptions::end_date.ge(date_from)),
                )
                .select(sum(subscriptions::price))
                .first::<Option<i64>>(&mut conn)?;

            Ok(total.unwrap_or(0))
        })
        .await?
    }
}
