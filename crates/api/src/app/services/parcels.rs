use chrono::Utc;
use tracing::{info, instrument};

use storefront_core::{OrderId, ParcelId};
use storefront_shipping::{ensure_shippable, validate_tracking_number, Parcel, ParcelStatus};

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};
use crate::context::CurrentUser;

impl AppServices {
    #[instrument(skip(self))]
    pub async fn create_parcel(&self, order_id: OrderId, carrier: &str, tracking_number: &str) -> ApiResult<Parcel> {
        let order = self.find_order(order_id).await?;
        ensure_shippable(order.status)?;
        if self.store.parcel_for_order(order_id).await?.is_some() {
            return Err(ApiError::Conflict("order already has a parcel".to_string()));
        }

        let parcel = Parcel::new(order_id, carrier, tracking_number, Utc::now())?;
        self.store.insert_parcel(&parcel).await?;
        info!(parcel_id = %parcel.id, %order_id, tracking_number = %parcel.tracking_number, "parcel created");
        Ok(parcel)
    }

    /// Advance a parcel and, when its new status implies it, the order.
    #[instrument(skip(self, location, note))]
    pub async fn update_parcel_status(
        &self,
        id: ParcelId,
        status: ParcelStatus,
        location: Option<String>,
        note: Option<String>,
    ) -> ApiResult<Parcel> {
        let mut parcel = self
            .store
            .get_parcel(id)
            .await?
            .ok_or_else(|| ApiError::not_found("parcel"))?;
        let order = self.find_order(parcel.order_id).await?;

        let (event, order_status) = parcel.advance(status, location, note, order.status, Utc::now())?;
        self.store
            .record_parcel_status(&parcel, &event, order.status, order_status)
            .await?;

        info!(parcel_id = %id, %status, order_status = ?order_status, "parcel status recorded");
        Ok(parcel)
    }

    pub async fn order_parcel(&self, user: &CurrentUser, order_id: OrderId) -> ApiResult<Parcel> {
        self.order_for(user, order_id).await?;
        self.store
            .parcel_for_order(order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("parcel"))
    }

    /// Public lookup; a malformed number cannot match anything.
    pub async fn track_parcel(&self, tracking_number: &str) -> ApiResult<Parcel> {
        let normalized = validate_tracking_number(tracking_number).map_err(|_| ApiError::not_found("parcel"))?;
        self.store
            .find_parcel_by_tracking(&normalized)
            .await?
            .ok_or_else(|| ApiError::not_found("parcel"))
    }
}
