use utoipa::OpenApi;

use crate::app::dto::*;

/// Schema document served at `/api/docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API", description = "Catalog, cart, orders, YooKassa payments and parcel tracking."),
    components(schemas(
        HealthResponse,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        UpdateProfileRequest,
        SetRoleRequest,
        UserResponse,
        AuthResponse,
        CreateAddressRequest,
        UpdateAddressRequest,
        AddressResponse,
        ShippingAddressResponse,
        CreateCategoryRequest,
        UpdateCategoryRequest,
        CategoryResponse,
        CreateProductRequest,
        UpdateProductRequest,
        CreateVariantRequest,
        UpdateVariantRequest,
        VariantResponse,
        ProductResponse,
        DeleteProductResponse,
        AddCartItemRequest,
        UpdateCartItemRequest,
        CartLineResponse,
        CartResponse,
        CheckoutRequest,
        SetOrderStatusRequest,
        OrderItemResponse,
        OrderResponse,
        CreatePaymentRequest,
        PaymentResponse,
        WebhookResponse,
        CreateParcelRequest,
        ParcelStatusRequest,
        ParcelEventResponse,
        ParcelResponse,
        TrackingResponse,
        UploadResponse,
        ProductPage,
        OrderPage,
        UserPage,
    )),
    tags(
        (name = "auth"),
        (name = "catalog"),
        (name = "cart"),
        (name = "orders"),
        (name = "payments"),
        (name = "parcels"),
    )
)]
pub struct ApiDoc;
