use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::AddressId;

use crate::app::dto::{self, AddressResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id", patch(update_address).delete(delete_address))
}

pub async fn list_addresses(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<AddressResponse>>> {
    authz::require(&user, &permissions::ADDRESSES_MANAGE)?;
    let addresses = services.list_addresses(user.user_id()).await?;
    Ok(Json(addresses.into_iter().map(Into::into).collect()))
}

pub async fn create_address(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<AddressResponse>)> {
    authz::require(&user, &permissions::ADDRESSES_MANAGE)?;
    let address = services.create_address(user.user_id(), body.into()).await?;
    Ok((StatusCode::CREATED, Json(address.into())))
}

pub async fn update_address(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::UpdateAddressRequest>,
) -> ApiResult<Json<AddressResponse>> {
    authz::require(&user, &permissions::ADDRESSES_MANAGE)?;
    let address = services
        .update_address(user.user_id(), AddressId::from_uuid(id), body.into())
        .await?;
    Ok(Json(address.into()))
}

pub async fn delete_address(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::ADDRESSES_MANAGE)?;
    services.delete_address(user.user_id(), AddressId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
