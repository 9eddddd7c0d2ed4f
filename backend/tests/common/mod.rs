use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use crates::domain::{
    entities::subscriptions::{
        EditSubscriptionEntity, InsertSubscriptionEntity, SubscriptionEntity,
    },
    repositories::subscriptions::{RepositoryError, RepositoryResult, SubscriptionRepository},
    value_objects::subscriptions::{SubscriptionCostFilter, SubscriptionModel},
};

/// Keeps rows in a map keyed by id. Ids are never reused.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    state: Mutex<State>,
    offline: AtomicBool,
}

#[derive(Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, SubscriptionEntity>,
}

impl InMemorySubscriptionRepository {
    /// Makes every call fail as if the database were unreachable.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage(anyhow::anyhow!(
                "connection refused"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> RepositoryResult<i64> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.insert(
            id,
            SubscriptionEntity {
                id,
                service_name: insert_subscription_entity.service_name,
                price: insert_subscription_entity.price,
                user_id: insert_subscription_entity.user_id,
                start_date: insert_subscription_entity.start_date,
                end_date: insert_subscription_entity.end_date,
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, subscription_id: i64) -> RepositoryResult<SubscriptionEntity> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        state
            .rows
            .get(&subscription_id)
            .cloned()
            .ok_or(RepositoryError::NotFound(subscription_id))
    }

    async fn update(
        &self,
        subscription_id: i64,
        edit_subscription_entity: EditSubscriptionEntity,
    ) -> RepositoryResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .get_mut(&subscription_id)
            .ok_or(RepositoryError::NotFound(subscription_id))?;

        if let Some(service_name) = edit_subscription_entity.service_name {
            row.service_name = service_name;
        }
        if let Some(price) = edit_subscription_entity.price {
            row.price = price;
        }
        if let Some(user_id) = edit_subscription_entity.user_id {
            row.user_id = user_id;
        }
        if let Some(start_date) = edit_subscription_entity.start_date {
            row.start_date = start_date;
        }
        if let Some(end_date) = edit_subscription_entity.end_date {
            row.end_date = end_date;
        }
        Ok(())
    }

    async fn delete(&self, subscription_id: i64) -> RepositoryResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state
            .rows
            .remove(&subscription_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(subscription_id))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<SubscriptionEntity>> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(state.rows.values().cloned().collect())
    }

    async fn sum_cost(&self, cost_filter: SubscriptionCostFilter) -> RepositoryResult<i64> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .values()
            .cloned()
            .map(SubscriptionModel::from)
            .filter(|subscription| cost_filter.matches(subscription))
            .map(|subscription| i64::from(subscription.price))
            .sum())
    }
}
