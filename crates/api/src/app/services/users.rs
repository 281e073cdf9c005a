use chrono::Utc;
use tracing::{info, instrument};

use storefront_auth::{Role, User, UserPatch};
use storefront_core::{Page, PageRequest, UserId};

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

impl AppServices {
    pub async fn update_profile(&self, user_id: UserId, patch: UserPatch) -> ApiResult<User> {
        let mut user = self.current_user(user_id).await?;
        patch.apply(&mut user, Utc::now())?;
        self.store.update_user(&user).await?;
        Ok(user)
    }

    pub async fn list_users(&self, page: PageRequest) -> ApiResult<Page<User>> {
        Ok(self.store.list_users(page).await?)
    }

    pub async fn get_user(&self, id: UserId) -> ApiResult<User> {
        self.store.get_user(id).await?.ok_or_else(|| ApiError::not_found("user"))
    }

    #[instrument(skip(self))]
    pub async fn set_role(&self, actor: UserId, id: UserId, role: Role) -> ApiResult<User> {
        if actor == id {
            return Err(ApiError::Unprocessable("admins cannot change their own role".to_string()));
        }
        let mut user = self.get_user(id).await?;
        user.role = role;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        info!(user_id = %id, %role, "role changed");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor: UserId, id: UserId) -> ApiResult<()> {
        if actor == id {
            return Err(ApiError::Unprocessable("admins cannot delete themselves".to_string()));
        }
        self.store.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
