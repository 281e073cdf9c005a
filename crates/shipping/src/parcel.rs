use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, OrderId, ParcelId};
use storefront_sales::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    Created,
    InTransit,
    OutForDelivery,
    Delivered,
    Returned,
}

impl ParcelStatus {
    pub const ALL: [ParcelStatus; 5] = [
        ParcelStatus::Created,
        ParcelStatus::InTransit,
        ParcelStatus::OutForDelivery,
        ParcelStatus::Delivered,
        ParcelStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Created => "created",
            ParcelStatus::InTransit => "in_transit",
            ParcelStatus::OutForDelivery => "out_for_delivery",
            ParcelStatus::Delivered => "delivered",
            ParcelStatus::Returned => "returned",
        }
    }

    pub fn can_transition_to(&self, next: ParcelStatus) -> bool {
        use ParcelStatus::*;
        matches!(
            (self, next),
            (Created, InTransit)
                | (Created, Returned)
                | (InTransit, OutForDelivery)
                | (InTransit, Delivered)
                | (InTransit, Returned)
                | (OutForDelivery, Delivered)
                | (OutForDelivery, Returned)
        )
    }

    /// Order status a parcel in this status implies, if any.
    pub fn implied_order_status(&self) -> Option<OrderStatus> {
        match self {
            ParcelStatus::InTransit | ParcelStatus::OutForDelivery => Some(OrderStatus::Shipped),
            ParcelStatus::Delivered => Some(OrderStatus::Delivered),
            ParcelStatus::Created | ParcelStatus::Returned => None,
        }
    }
}

impl core::fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParcelStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown parcel status '{s}'")))
    }
}

/// One entry of a parcel's tracking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelEvent {
    pub status: ParcelStatus,
    pub location: Option<String>,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub order_id: OrderId,
    pub carrier: String,
    pub tracking_number: String,
    pub status: ParcelStatus,
    pub events: Vec<ParcelEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Parcel {
    type Id = ParcelId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Orders can be handed to a carrier once paid and before shipping.
pub fn ensure_shippable(order_status: OrderStatus) -> DomainResult<()> {
    match order_status {
        OrderStatus::Confirmed | OrderStatus::Processing => Ok(()),
        other => Err(DomainError::invariant(format!(
            "cannot ship an order that is {other}"
        ))),
    }
}

pub fn validate_tracking_number(raw: &str) -> DomainResult<String> {
    let value = raw.trim();
    let len = value.chars().count();
    if !(4..=64).contains(&len) {
        return Err(DomainError::validation(
            "tracking number must be between 4 and 64 characters",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(DomainError::validation(
            "tracking number may contain only letters, digits and '-'",
        ));
    }
    Ok(value.to_ascii_uppercase())
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Parcel {
    pub fn new(
        order_id: OrderId,
        carrier: &str,
        tracking_number: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let carrier = carrier.trim();
        if carrier.is_empty() {
            return Err(DomainError::validation("carrier must not be empty"));
        }
        Ok(Self {
            id: ParcelId::new(),
            order_id,
            carrier: carrier.to_string(),
            tracking_number: validate_tracking_number(tracking_number)?,
            status: ParcelStatus::Created,
            events: vec![ParcelEvent {
                status: ParcelStatus::Created,
                location: None,
                note: None,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        })
    }

    /// Move the parcel to `next`, appending a history event.
    ///
    /// Returns the appended event and the order status to apply, if the
    /// order (currently `order_status`) should move as a consequence.
    pub fn advance(
        &mut self,
        next: ParcelStatus,
        location: Option<String>,
        note: Option<String>,
        order_status: OrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<(ParcelEvent, Option<OrderStatus>)> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move parcel from {} to {}",
                self.status, next
            )));
        }

        let order_next = next
            .implied_order_status()
            .filter(|target| *target != order_status && order_status.can_transition_to(*target));

        let event = ParcelEvent {
            status: next,
            location: clean(location),
            note: clean(note),
            at: now,
        };
        self.status = next;
        self.updated_at = now;
        self.events.push(event.clone());
        Ok((event, order_next))
    }
}
