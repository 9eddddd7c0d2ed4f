use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{
        EditSubscriptionEntity, InsertSubscriptionEntity, SubscriptionEntity,
    },
    value_objects::month_year::MonthYear,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionValidationError {
    #[error("invalid service_name")]
    EmptyServiceName,
    #[error("invalid price")]
    NegativePrice,
    #[error("end_date cannot be before start_date")]
    EndBeforeStart,
}

/// Checks that an optional end month does not precede the start month.
pub fn ensure_period(
    start_date: MonthYear,
    end_date: Option<MonthYear>,
) -> Result<(), SubscriptionValidationError> {
    match end_date {
        Some(end_date) if end_date < start_date => Err(SubscriptionValidationError::EndBeforeStart),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: i64,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: MonthYear,
    pub end_date: Option<MonthYear>,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: MonthYear::from(value.start_date),
            end_date: value.end_date.map(MonthYear::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsertSubscriptionModel {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: MonthYear,
    #[serde(default)]
    pub end_date: Option<MonthYear>,
}

impl InsertSubscriptionModel {
    pub fn validate(&self) -> Result<(), SubscriptionValidationError> {
        if self.service_name.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyServiceName);
        }
        if self.price < 0 {
            return Err(SubscriptionValidationError::NegativePrice);
        }
        ensure_period(self.start_date, self.end_date)
    }

    pub fn to_entity(&self) -> InsertSubscriptionEntity {
        InsertSubscriptionEntity {
            service_name: self.service_name.clone(),
            price: self.price,
            user_id: self.user_id,
            start_date: self.start_date.first_day(),
            end_date: self.end_date.map(|end_date| end_date.first_day()),
        }
    }
}

/// Partial update body. Absent fields keep their stored value. `end_date`
/// distinguishes an absent key (`None`) from an explicit `null`
/// (`Some(None)`), which reopens the subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateSubscriptionModel {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<MonthYear>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<MonthYear>>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateSubscriptionModel {
    pub fn is_empty(&self) -> bool {
        self.to_entity().is_empty()
    }

    /// Validates the fields that are present. Period ordering is only checked
    /// here when both ends arrive together.
    pub fn validate(&self) -> Result<(), SubscriptionValidationError> {
        if let Some(service_name) = &self.service_name {
            if service_name.trim().is_empty() {
                return Err(SubscriptionValidationError::EmptyServiceName);
            }
        }
        if matches!(self.price, Some(price) if price < 0) {
            return Err(SubscriptionValidationError::NegativePrice);
        }
        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            ensure_period(start_date, end_date)?;
        }
        Ok(())
    }

    /// True when the new period depends on a stored value that is not part of
    /// this update.
    pub fn needs_stored_period(&self) -> bool {
        matches!(
            (self.start_date, self.end_date),
            (Some(_), None) | (None, Some(Some(_)))
        )
    }

    pub fn to_entity(&self) -> EditSubscriptionEntity {
        EditSubscriptionEntity {
            service_name: self.service_name.clone(),
            price: self.price,
            user_id: self.user_id,
            start_date: self.start_date.map(|start_date| start_date.first_day()),
            end_date: self
                .end_date
                .map(|end_date| end_date.map(|end_date| end_date.first_day())),
        }
    }
}

/// Aggregation request: subscriptions of `user_id` for `service_name` that
/// are active at any month within `[date_from, date_to]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionCostFilter {
    pub user_id: Uuid,
    pub service_name: String,
    pub date_from: MonthYear,
    pub date_to: MonthYear,
}

impl SubscriptionCostFilter {
    /// Month-granular, inclusive overlap between the filter window and a
    /// subscription's active interval. An open end counts as unbounded.
    pub fn overlaps(&self, start_date: MonthYear, end_date: Option<MonthYear>) -> bool {
        start_date <= self.date_to && end_date.is_none_or(|end_date| end_date >= self.date_from)
    }

    pub fn matches(&self, subscription: &SubscriptionModel) -> bool {
        subscription.user_id == self.user_id
            && subscription.service_name == self.service_name
            && self.overlaps(subscription.start_date, subscription.end_date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedSubscriptionDto {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionCostSumDto {
    pub sum: i64,
}
