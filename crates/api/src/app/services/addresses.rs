use chrono::Utc;

use storefront_core::{AddressId, UserId};
use storefront_sales::{Address, AddressPatch, NewAddress};

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

impl AppServices {
    pub async fn list_addresses(&self, user_id: UserId) -> ApiResult<Vec<Address>> {
        Ok(self.store.list_addresses(user_id).await?)
    }

    /// A user's first address becomes their default.
    pub async fn create_address(&self, user_id: UserId, input: NewAddress) -> ApiResult<Address> {
        let mut address = input.into_address(user_id, Utc::now())?;
        if self.store.list_addresses(user_id).await?.is_empty() {
            address.is_default = true;
        }
        self.store.save_address(&address).await?;
        Ok(address)
    }

    pub async fn update_address(&self, user_id: UserId, id: AddressId, patch: AddressPatch) -> ApiResult<Address> {
        let mut address = self.own_address(user_id, id).await?;
        patch.apply(&mut address)?;
        self.store.save_address(&address).await?;
        Ok(address)
    }

    pub async fn delete_address(&self, user_id: UserId, id: AddressId) -> ApiResult<()> {
        self.own_address(user_id, id).await?;
        self.store.delete_address(id).await?;
        Ok(())
    }

    async fn own_address(&self, user_id: UserId, id: AddressId) -> ApiResult<Address> {
        self.store
            .get_address(id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| ApiError::not_found("address"))
    }
}
