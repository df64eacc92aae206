//! # API Endpoint Handlers
//!
//! Handlers authorize the caller, take the platform lock (read for queries,
//! write for changes) and translate between JSON and core calls.

use super::{
    AppState,
    auth::{Principal, Role},
    error::ApiError,
    types::{
        DeleteMenuResponse, DiscardResponse, DocumentResponse, DocumentUploadRequest,
        DocumentUploadResponse, HealthResponse, MoveItemRequest, OnboardingResponse,
        PublicMenuQuery, RestaurantListQuery, RestaurantListResponse, RestaurantUpdateRequest,
        VerificationRequest, WizardUpdate,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use dizmen_core::{
    ClockTime, DizmenError, DocumentId, ItemInput, ItemReviews, Menu, MenuId, MenuInput,
    MenuItem, MenuItemId, MenuSummary, OnboardingEntry, OnboardingWizard, Platform, PublicMenu,
    Restaurant, RestaurantId, Review, ReviewInput, UserId,
};

/// Header carrying the client's submission idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

// =============================================================================
// AUTHORIZATION HELPERS
// =============================================================================

fn authorize_restaurant(
    platform: &Platform,
    principal: &Principal,
    id: &RestaurantId,
) -> Result<Restaurant, ApiError> {
    let restaurant = platform.restaurant(id)?;
    principal.require_owner_of(&restaurant)?;
    Ok(restaurant)
}

fn authorize_menu(
    platform: &Platform,
    principal: &Principal,
    id: &MenuId,
) -> Result<Menu, ApiError> {
    let menu = platform.menu(id)?;
    authorize_restaurant(platform, principal, &menu.restaurant_id)?;
    Ok(menu)
}

fn authorize_item(
    platform: &Platform,
    principal: &Principal,
    id: &MenuItemId,
) -> Result<MenuItem, ApiError> {
    let item = platform.item(id)?;
    authorize_restaurant(platform, principal, &item.restaurant_id)?;
    Ok(item)
}

/// The wizard the owner is working on, prefilled for resubmission if rejected.
fn current_wizard(platform: &Platform, user: &UserId) -> Result<OnboardingWizard, ApiError> {
    match platform.onboarding_entry(user)? {
        OnboardingEntry::Wizard(wizard) | OnboardingEntry::Resubmit { wizard, .. } => Ok(wizard),
        OnboardingEntry::Dashboard(_) => Err(DizmenError::AlreadyOnboarded(user.clone()).into()),
    }
}

// =============================================================================
// PUBLIC
// =============================================================================

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// The customer menu reached through the QR code.
pub async fn public_menu_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PublicMenuQuery>,
) -> ApiResult<PublicMenu> {
    let platform = state.platform.read().await;
    let id = RestaurantId::new(id);
    let menu = match query.at.as_deref() {
        Some(at) => platform.public_menu_at(&id, ClockTime::parse(at)?)?,
        None => platform.public_menu(&id)?,
    };
    Ok(Json(menu))
}

/// Reviews of an item. The restaurant's owner and administrators still see
/// them while the restaurant is hidden from customers.
pub async fn list_reviews_handler(
    State(state): State<AppState>,
    principal: Option<Principal>,
    Path(id): Path<String>,
) -> ApiResult<ItemReviews> {
    let platform = state.platform.read().await;
    let id = MenuItemId::new(id);
    let privileged = match &principal {
        Some(principal) => {
            let item = platform.item(&id)?;
            let restaurant = platform.restaurant(&item.restaurant_id)?;
            principal.require_owner_of(&restaurant).is_ok()
        }
        None => false,
    };
    let reviews = if privileged {
        platform.item_reviews(&id)?
    } else {
        platform.public_item_reviews(&id)?
    };
    Ok(Json(reviews))
}

// =============================================================================
// ONBOARDING
// =============================================================================

pub async fn onboarding_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
) -> ApiResult<OnboardingResponse> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let platform = state.platform.read().await;
    Ok(Json(platform.onboarding_entry(&user)?.into()))
}

pub async fn get_draft_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
) -> ApiResult<OnboardingWizard> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let platform = state.platform.read().await;
    Ok(Json(current_wizard(&platform, &user)?))
}

/// Save the form as the user's draft without validating it.
pub async fn save_draft_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
    Json(update): Json<WizardUpdate>,
) -> ApiResult<OnboardingWizard> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let mut platform = state.platform.write().await;
    let mut wizard = current_wizard(&platform, &user)?;
    update.apply_to(&mut wizard);
    platform.onboarding().save_draft(&mut wizard)?;
    tracing::debug!(user_id = %user, revision = ?wizard.revision, "Draft saved");
    Ok(Json(wizard))
}

pub async fn discard_draft_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
) -> ApiResult<DiscardResponse> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let mut platform = state.platform.write().await;
    let discarded = platform.onboarding().discard_draft(&user)?;
    Ok(Json(DiscardResponse { discarded }))
}

pub async fn advance_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
    Json(update): Json<WizardUpdate>,
) -> ApiResult<OnboardingWizard> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let mut platform = state.platform.write().await;
    let mut wizard = current_wizard(&platform, &user)?;
    update.apply_to(&mut wizard);
    platform.onboarding().advance(&mut wizard)?;
    Ok(Json(wizard))
}

pub async fn back_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
) -> ApiResult<OnboardingWizard> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let mut platform = state.platform.write().await;
    let mut wizard = current_wizard(&platform, &user)?;
    let mut flow = platform.onboarding();
    flow.back(&mut wizard)?;
    flow.save_draft(&mut wizard)?;
    Ok(Json(wizard))
}

pub async fn upload_document_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(user): Path<String>,
    Json(request): Json<DocumentUploadRequest>,
) -> Created<DocumentUploadResponse> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let upload = request.to_upload()?;
    let mut platform = state.platform.write().await;
    let mut wizard = current_wizard(&platform, &user)?;
    if request.revision.is_some() {
        wizard.revision = request.revision;
    }
    let document = platform.onboarding().attach_document(&mut wizard, upload)?;
    tracing::info!(
        event = "document_uploaded",
        user_id = %user,
        document_id = %document.id,
        size = document.size,
        "Verification document uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(DocumentUploadResponse { document, wizard }),
    ))
}

pub async fn remove_document_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path((user, document)): Path<(String, String)>,
) -> ApiResult<OnboardingWizard> {
    let user = UserId::new(user);
    principal.require_user(&user)?;
    let mut platform = state.platform.write().await;
    let mut wizard = current_wizard(&platform, &user)?;
    platform
        .onboarding()
        .remove_document(&mut wizard, &DocumentId::new(document))?;
    Ok(Json(wizard))
}

/// Submit the caller's wizard.
///
/// Repeating a request with the same `Idempotency-Key` returns the restaurant
/// created the first time with `200` instead of `201`.
pub async fn submit_handler(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
) -> Created<Restaurant> {
    principal.require_role(Role::Owner)?;
    let user = principal.user_id;
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let mut platform = state.platform.write().await;
    if let Some(key) = key {
        if let Some(existing) = platform.submission(key)? {
            if existing.owner_id != user {
                return Err(ApiError::forbidden(
                    "idempotency key was used by another user",
                ));
            }
            return Ok((StatusCode::OK, Json(existing)));
        }
    }

    let mut wizard = current_wizard(&platform, &user)?;
    let restaurant = platform.onboarding().submit(&mut wizard, key)?;
    tracing::info!(
        event = "restaurant_submitted",
        restaurant_id = %restaurant.id,
        owner_id = %user,
        status = %restaurant.verification_status,
        "Restaurant submitted"
    );
    Ok((StatusCode::CREATED, Json(restaurant)))
}

// =============================================================================
// VERIFICATION
// =============================================================================

pub async fn list_restaurants_handler(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<RestaurantListQuery>,
) -> ApiResult<RestaurantListResponse> {
    principal.require_admin()?;
    let status = query.status()?;
    let platform = state.platform.read().await;
    let restaurants = platform.list_restaurants(status)?;
    let counts = platform
        .status_counts()?
        .into_iter()
        .map(|(status, n)| (status.to_string(), n))
        .collect();
    Ok(Json(RestaurantListResponse {
        restaurants,
        counts,
    }))
}

pub async fn get_restaurant_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Restaurant> {
    let platform = state.platform.read().await;
    Ok(Json(authorize_restaurant(
        &platform,
        &principal,
        &RestaurantId::new(id),
    )?))
}

/// Owner edit of name, description, address and phone.
pub async fn update_restaurant_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<RestaurantUpdateRequest>,
) -> ApiResult<Restaurant> {
    let id = RestaurantId::new(id);
    let mut platform = state.platform.write().await;
    authorize_restaurant(&platform, &principal, &id)?;
    let restaurant =
        platform.update_restaurant_info(&id, request.info, request.expected_revision)?;
    tracing::info!(
        event = "restaurant_updated",
        restaurant_id = %id,
        user_id = %principal.user_id,
        revision = restaurant.revision,
        "Restaurant information updated"
    );
    Ok(Json(restaurant))
}

/// Administrator verify / reject / block / unblock.
pub async fn verification_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<VerificationRequest>,
) -> ApiResult<Restaurant> {
    principal.require_admin()?;
    let action = request.to_action()?;
    let id = RestaurantId::new(id);
    let mut platform = state.platform.write().await;
    let restaurant = platform
        .verification()
        .act(&id, &action, request.expected_revision)?;
    tracing::info!(
        event = "verification_changed",
        restaurant_id = %id,
        admin_id = %principal.user_id,
        action = action.verb(),
        status = %restaurant.verification_status,
        "Verification status changed"
    );
    Ok(Json(restaurant))
}

/// A verification document, for administrators and the uploading owner.
pub async fn document_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<DocumentResponse> {
    let id = DocumentId::new(id);
    let platform = state.platform.read().await;
    let stored = platform.document(&id)?;
    principal.require_user(&stored.owner)?;
    Ok(Json(DocumentResponse::new(id, stored)))
}

// =============================================================================
// MENUS
// =============================================================================

pub async fn list_menus_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Vec<MenuSummary>> {
    let id = RestaurantId::new(id);
    let platform = state.platform.read().await;
    authorize_restaurant(&platform, &principal, &id)?;
    Ok(Json(platform.menus_for_restaurant(&id)?))
}

pub async fn create_menu_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(input): Json<MenuInput>,
) -> Created<Menu> {
    let id = RestaurantId::new(id);
    let mut platform = state.platform.write().await;
    authorize_restaurant(&platform, &principal, &id)?;
    let menu = platform.catalog().create_menu(&id, input)?;
    Ok((StatusCode::CREATED, Json(menu)))
}

pub async fn update_menu_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(input): Json<MenuInput>,
) -> ApiResult<Menu> {
    let id = MenuId::new(id);
    let mut platform = state.platform.write().await;
    authorize_menu(&platform, &principal, &id)?;
    Ok(Json(platform.catalog().update_menu(&id, input)?))
}

pub async fn toggle_menu_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Menu> {
    let id = MenuId::new(id);
    let mut platform = state.platform.write().await;
    authorize_menu(&platform, &principal, &id)?;
    Ok(Json(platform.catalog().toggle_menu_active(&id)?))
}

pub async fn delete_menu_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<DeleteMenuResponse> {
    let id = MenuId::new(id);
    let mut platform = state.platform.write().await;
    authorize_menu(&platform, &principal, &id)?;
    let removed = platform.catalog().delete_menu(&id)?;
    tracing::info!(menu_id = %id, deleted_items = removed.len(), "Menu deleted");
    Ok(Json(DeleteMenuResponse {
        menu_id: id,
        deleted_items: removed.len(),
    }))
}

// =============================================================================
// ITEMS
// =============================================================================

pub async fn add_item_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(menu): Path<String>,
    Json(input): Json<ItemInput>,
) -> Created<MenuItem> {
    let menu = MenuId::new(menu);
    let mut platform = state.platform.write().await;
    authorize_menu(&platform, &principal, &menu)?;
    let item = platform.catalog().add_item(&menu, input)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(input): Json<ItemInput>,
) -> ApiResult<MenuItem> {
    let id = MenuItemId::new(id);
    let mut platform = state.platform.write().await;
    authorize_item(&platform, &principal, &id)?;
    Ok(Json(platform.catalog().update_item(&id, input)?))
}

pub async fn toggle_item_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<MenuItem> {
    let id = MenuItemId::new(id);
    let mut platform = state.platform.write().await;
    authorize_item(&platform, &principal, &id)?;
    Ok(Json(platform.catalog().toggle_item_availability(&id)?))
}

pub async fn delete_item_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = MenuItemId::new(id);
    let mut platform = state.platform.write().await;
    authorize_item(&platform, &principal, &id)?;
    platform.catalog().delete_item(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_item_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<MoveItemRequest>,
) -> ApiResult<MenuItem> {
    let id = MenuItemId::new(id);
    let mut platform = state.platform.write().await;
    authorize_item(&platform, &principal, &id)?;
    Ok(Json(platform.catalog().move_item(&id, &request.menu_id)?))
}

// =============================================================================
// REVIEWS
// =============================================================================

pub async fn add_review_handler(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(input): Json<ReviewInput>,
) -> Created<Review> {
    let id = MenuItemId::new(id);
    let mut platform = state.platform.write().await;
    let review = platform
        .catalog()
        .add_review(&id, &principal.user_id, input)?;
    Ok((StatusCode::CREATED, Json(review)))
}
