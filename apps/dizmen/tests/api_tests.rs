//! Integration tests for the Dizmen HTTP API.
//!
//! Uses axum-test to drive the router without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use dizmen::api::{
    AppState, DeleteMenuResponse, DocumentResponse, DocumentUploadResponse, ErrorResponse,
    HealthResponse, OnboardingResponse, RestaurantListResponse, Role, TokenService,
    create_router,
};
use dizmen::config::ServerConfig;
use dizmen_core::{
    ItemReviews, ManualClock, Menu, MenuItem, MenuSummary, NoSleep, OnboardingStep,
    OnboardingWizard, Platform, PlatformSettings, PublicMenu, Restaurant, ReviewMode, UserId,
    VerificationStatus,
};
use serde_json::json;
use std::sync::Arc;

const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Harness {
    server: TestServer,
    state: AppState,
}

impl Harness {
    fn new(review_mode: ReviewMode) -> Self {
        Self::with_server_config(
            review_mode,
            ServerConfig {
                rate_limit: 0,
                ..ServerConfig::default()
            },
        )
    }

    fn with_server_config(review_mode: ReviewMode, server: ServerConfig) -> Self {
        // Monday 10:30 UTC
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 14, 10, 30, 0).single().unwrap(),
        ));
        let platform = Platform::new()
            .with_clock(clock)
            .with_sleeper(Arc::new(NoSleep))
            .with_settings(PlatformSettings {
                review_mode,
                timezone: Some(chrono_tz::UTC),
                ..PlatformSettings::default()
            });
        let tokens = TokenService::new(SECRET, "dizmen", "dizmen-clients", 3600);
        let state = AppState::new(platform, tokens);
        let router = create_router(state.clone(), &server);
        Self {
            server: TestServer::new(router).unwrap(),
            state,
        }
    }

    fn bearer(&self, user: &str, role: Role) -> HeaderValue {
        let token = self.state.tokens.issue(&UserId::new(user), role).unwrap();
        format!("Bearer {token}").parse().unwrap()
    }

    fn owner(&self, user: &str) -> HeaderValue {
        self.bearer(user, Role::Owner)
    }

    fn admin(&self) -> HeaderValue {
        self.bearer("admin-1", Role::Admin)
    }

    /// Fill step 1, advance, attach one document.
    async fn prepare_wizard(&self, owner: &str) -> OnboardingWizard {
        let auth = self.owner(owner);
        self.server
            .put(&format!("/users/{owner}/draft"))
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({
                "form": {
                    "name": "Test Cafe",
                    "address": "12 Istiklal Caddesi, Istanbul",
                    "website": "https://testcafe.example"
                }
            }))
            .await
            .assert_status_ok();
        self.server
            .post(&format!("/users/{owner}/draft/advance"))
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({}))
            .await
            .assert_status_ok();
        let upload = self
            .server
            .post(&format!("/users/{owner}/draft/documents"))
            .add_header(header::AUTHORIZATION, auth)
            .json(&json!({
                "file_name": "license.pdf",
                "content_type": "application/pdf",
                "document_type": "business_license",
                "content_base64": STANDARD.encode(b"%PDF-1.7 license"),
            }))
            .await;
        upload.assert_status(StatusCode::CREATED);
        upload.json::<DocumentUploadResponse>().wizard
    }

    async fn submit(&self, owner: &str, key: &str) -> axum_test::TestResponse {
        self.server
            .post("/restaurants")
            .add_header(header::AUTHORIZATION, self.owner(owner))
            .add_header(
                HeaderName::from_static("idempotency-key"),
                key.parse::<HeaderValue>().unwrap(),
            )
            .await
    }

    async fn onboard(&self, owner: &str) -> Restaurant {
        self.prepare_wizard(owner).await;
        let response = self.submit(owner, &format!("{owner}-submit")).await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn act(&self, id: &str, body: serde_json::Value) -> axum_test::TestResponse {
        self.server
            .patch(&format!("/restaurants/{id}/verification"))
            .add_header(header::AUTHORIZATION, self.admin())
            .json(&body)
            .await
    }

    async fn create_menu(&self, owner: &str, restaurant: &str, body: serde_json::Value) -> Menu {
        let response = self
            .server
            .post(&format!("/restaurants/{restaurant}/menus"))
            .add_header(header::AUTHORIZATION, self.owner(owner))
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn add_item(&self, owner: &str, menu: &str, name: &str) -> MenuItem {
        let response = self
            .server
            .post(&format!("/menus/{menu}/items"))
            .add_header(header::AUTHORIZATION, self.owner(owner))
            .json(&json!({ "name": name, "price": 1250 }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }
}

fn error_code(response: &axum_test::TestResponse) -> String {
    response.json::<ErrorResponse>().code
}

// =============================================================================
// HEALTH & AUTH
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h.server.get("/users/owner-1/draft").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response), "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h
        .server
        .get("/users/owner-1/draft")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_owner_cannot_read_draft() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h
        .server
        .get("/users/owner-1/draft")
        .add_header(header::AUTHORIZATION, h.owner("owner-2"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_code(&response), "forbidden");
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let h = Harness::with_server_config(
        ReviewMode::DocumentGated,
        ServerConfig {
            rate_limit: 1,
            ..ServerConfig::default()
        },
    );
    h.server.get("/health").await.assert_status_ok();
    let response = h.server.get("/health").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response), "rate_limited");
}

// =============================================================================
// ONBOARDING
// =============================================================================

#[tokio::test]
async fn test_fresh_owner_lands_on_wizard() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h
        .server
        .get("/users/owner-1/onboarding")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await;
    response.assert_status_ok();
    let entry: OnboardingResponse = response.json();
    assert_eq!(entry.state, "wizard");
    let wizard = entry.wizard.unwrap();
    assert_eq!(wizard.step, OnboardingStep::RestaurantInfo);
    assert!(!wizard.restored);
}

#[tokio::test]
async fn test_saved_draft_is_restored() {
    let h = Harness::new(ReviewMode::DocumentGated);
    h.prepare_wizard("owner-1").await;

    let response = h
        .server
        .get("/users/owner-1/draft")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await;
    response.assert_status_ok();
    let wizard: OnboardingWizard = response.json();
    assert!(wizard.restored);
    assert_eq!(wizard.step, OnboardingStep::VerificationDocuments);
    assert_eq!(wizard.form.name, "Test Cafe");
    assert_eq!(wizard.documents.len(), 1);
}

#[tokio::test]
async fn test_advance_with_short_name_is_422() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h
        .server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({ "form": { "name": "A", "address": "12 Main Street" } }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "validation_failed");
    assert!(body.fields.iter().any(|f| f.field == "name"));
    assert!(!body.fields.iter().any(|f| f.field == "address"));
}

#[tokio::test]
async fn test_stale_draft_revision_is_409() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let auth = h.owner("owner-1");
    for name in ["First", "Second"] {
        h.server
            .put("/users/owner-1/draft")
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({ "form": { "name": name } }))
            .await
            .assert_status_ok();
    }

    let response = h
        .server
        .put("/users/owner-1/draft")
        .add_header(header::AUTHORIZATION, auth)
        .json(&json!({ "form": { "name": "Stale tab" }, "revision": 1 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response), "draft_conflict");
}

#[tokio::test]
async fn test_submit_without_documents_is_400() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let auth = h.owner("owner-1");
    h.server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, auth)
        .json(&json!({ "form": { "name": "Test Cafe", "address": "12 Main Street" } }))
        .await
        .assert_status_ok();

    let response = h.submit("owner-1", "k-1").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "no_documents");
}

#[tokio::test]
async fn test_rejected_upload_type_is_422() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let auth = h.owner("owner-1");
    h.server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "form": { "name": "Test Cafe", "address": "12 Main Street" } }))
        .await
        .assert_status_ok();

    let response = h
        .server
        .post("/users/owner-1/draft/documents")
        .add_header(header::AUTHORIZATION, auth)
        .json(&json!({
            "file_name": "script.exe",
            "content_type": "application/x-msdownload",
            "content_base64": STANDARD.encode(b"MZ"),
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_submission_is_idempotent() {
    let h = Harness::new(ReviewMode::DocumentGated);
    h.prepare_wizard("owner-1").await;

    let first = h.submit("owner-1", "submit-once").await;
    first.assert_status(StatusCode::CREATED);
    let created: Restaurant = first.json();
    assert_eq!(created.verification_status, VerificationStatus::Pending);
    assert_eq!(created.qr_code, created.id.to_string());

    let replay = h.submit("owner-1", "submit-once").await;
    replay.assert_status_ok();
    assert_eq!(replay.json::<Restaurant>().id, created.id);

    let other_key = h.submit("owner-1", "submit-twice").await;
    other_key.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&other_key), "already_onboarded");

    let list: RestaurantListResponse = h
        .server
        .get("/restaurants")
        .add_header(header::AUTHORIZATION, h.admin())
        .await
        .json();
    assert_eq!(list.restaurants.len(), 1);
}

#[tokio::test]
async fn test_immediate_mode_goes_live_without_documents() {
    let h = Harness::new(ReviewMode::Immediate);
    h.server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({ "form": { "name": "Test Cafe", "address": "12 Main Street" } }))
        .await
        .assert_status_ok();

    let response = h.submit("owner-1", "k").await;
    response.assert_status(StatusCode::CREATED);
    let restaurant: Restaurant = response.json();
    assert_eq!(restaurant.verification_status, VerificationStatus::Verified);

    h.server
        .get(&format!("/menu/{}", restaurant.id))
        .await
        .assert_status_ok();
}

// =============================================================================
// VERIFICATION
// =============================================================================

#[tokio::test]
async fn test_only_admins_list_restaurants() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let response = h
        .server
        .get("/restaurants")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_pending_queue_and_counts() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let first = h.onboard("owner-1").await;
    h.onboard("owner-2").await;
    h.act(first.id.as_str(), json!({ "action": "verify" }))
        .await
        .assert_status_ok();

    let response = h
        .server
        .get("/restaurants")
        .add_query_param("status", "pending")
        .add_header(header::AUTHORIZATION, h.admin())
        .await;
    response.assert_status_ok();
    let list: RestaurantListResponse = response.json();
    assert_eq!(list.restaurants.len(), 1);
    assert_eq!(list.counts["pending"], 1);
    assert_eq!(list.counts["verified"], 1);
    assert_eq!(list.counts["blocked"], 0);

    let bad = h
        .server
        .get("/restaurants")
        .add_query_param("status", "archived")
        .add_header(header::AUTHORIZATION, h.admin())
        .await;
    bad.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reject_requires_reason_then_owner_resubmits() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let id = restaurant.id.to_string();

    let missing = h.act(&id, json!({ "action": "reject", "reason": "  " })).await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&missing), "missing_reason");

    let rejected = h
        .act(&id, json!({ "action": "reject", "reason": "Document unreadable" }))
        .await;
    rejected.assert_status_ok();

    let entry: OnboardingResponse = h
        .server
        .get("/users/owner-1/onboarding")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert_eq!(entry.state, "resubmit");
    assert_eq!(
        entry.restaurant.unwrap().rejection_reason.as_deref(),
        Some("Document unreadable")
    );
    assert_eq!(entry.wizard.unwrap().form.name, "Test Cafe");

    h.server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({}))
        .await
        .assert_status_ok();
    let resubmitted = h.submit("owner-1", "resubmit-1").await;
    resubmitted.assert_status(StatusCode::CREATED);
    let resubmitted: Restaurant = resubmitted.json();
    assert_eq!(resubmitted.id, restaurant.id);
    assert_eq!(resubmitted.verification_status, VerificationStatus::Pending);
    assert!(resubmitted.rejection_reason.is_none());
}

#[tokio::test]
async fn test_invalid_transition_and_stale_revision_are_409() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let id = restaurant.id.to_string();

    let unblock = h.act(&id, json!({ "action": "unblock" })).await;
    unblock.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&unblock), "invalid_transition");

    h.act(&id, json!({ "action": "verify" }))
        .await
        .assert_status_ok();
    let stale = h
        .act(
            &id,
            json!({
                "action": "block",
                "reason": "late",
                "expected_revision": restaurant.revision
            }),
        )
        .await;
    stale.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&stale), "revision_conflict");
}

#[tokio::test]
async fn test_blocked_restaurant_menu_is_unavailable() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let id = restaurant.id.to_string();

    let pending = h.server.get(&format!("/menu/{id}")).await;
    pending.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&pending), "restaurant_unavailable");

    h.act(&id, json!({ "action": "verify" }))
        .await
        .assert_status_ok();
    h.server
        .get(&format!("/menu/{id}"))
        .await
        .assert_status_ok();

    h.act(&id, json!({ "action": "block", "reason": "Health inspection" }))
        .await
        .assert_status_ok();
    let blocked = h.server.get(&format!("/menu/{id}")).await;
    blocked.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&blocked), "restaurant_unavailable");
}

#[tokio::test]
async fn test_admin_downloads_document() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let document = &restaurant.verification_documents[0];

    let response = h
        .server
        .get(&format!("/documents/{}", document.id))
        .add_header(header::AUTHORIZATION, h.admin())
        .await;
    response.assert_status_ok();
    let body: DocumentResponse = response.json();
    assert_eq!(body.owner_id, UserId::new("owner-1"));
    assert_eq!(
        STANDARD.decode(body.content_base64).unwrap(),
        b"%PDF-1.7 license"
    );

    h.server
        .get(&format!("/documents/{}", document.id))
        .add_header(header::AUTHORIZATION, h.owner("owner-2"))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stale_upload_revision_is_409() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let wizard = h.prepare_wizard("owner-1").await;
    let stale = wizard.revision.unwrap() - 1;

    let response = h
        .server
        .post("/users/owner-1/draft/documents")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({
            "file_name": "menu-photo.png",
            "content_type": "image/png",
            "content_base64": STANDARD.encode(b"\x89PNG"),
            "revision": stale,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response), "draft_conflict");

    let draft: OnboardingWizard = h
        .server
        .get("/users/owner-1/draft")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert_eq!(draft.documents, wizard.documents);
    assert_eq!(draft.revision, wizard.revision);
}

#[tokio::test]
async fn test_resubmission_keeps_removed_document_until_submitted() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let id = restaurant.id.to_string();
    let original = restaurant.verification_documents[0].id.clone();
    h.act(&id, json!({ "action": "reject", "reason": "Expired license" }))
        .await
        .assert_status_ok();

    let wizard: OnboardingWizard = h
        .server
        .delete(&format!("/users/owner-1/draft/documents/{original}"))
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert!(wizard.documents.is_empty());

    // The rejected restaurant still lists it, so reviewers can open it.
    h.server
        .get(&format!("/documents/{original}"))
        .add_header(header::AUTHORIZATION, h.admin())
        .await
        .assert_status_ok();

    h.server
        .post("/users/owner-1/draft/advance")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({}))
        .await
        .assert_status_ok();
    h.server
        .post("/users/owner-1/draft/documents")
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({
            "file_name": "license-2025.pdf",
            "content_type": "application/pdf",
            "content_base64": STANDARD.encode(b"%PDF-1.7 renewed"),
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let resubmitted = h.submit("owner-1", "resubmit-1").await;
    resubmitted.assert_status(StatusCode::CREATED);
    let resubmitted: Restaurant = resubmitted.json();
    assert_eq!(resubmitted.verification_documents.len(), 1);
    assert_ne!(resubmitted.verification_documents[0].id, original);

    let gone = h
        .server
        .get(&format!("/documents/{original}"))
        .add_header(header::AUTHORIZATION, h.admin())
        .await;
    gone.assert_status(StatusCode::NOT_FOUND);

    // A repeated resubmission returns the same restaurant.
    let again = h.submit("owner-1", "resubmit-1").await;
    again.assert_status_ok();
    assert_eq!(again.json::<Restaurant>().id, restaurant.id);
}

#[tokio::test]
async fn test_owner_edits_restaurant_info() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let path = format!("/restaurants/{}", restaurant.id);

    let response = h
        .server
        .patch(&path)
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({
            "name": "Test Cafe Karakoy",
            "phone": " +90 212 555 01 02 ",
            "expected_revision": restaurant.revision
        }))
        .await;
    response.assert_status_ok();
    let updated: Restaurant = response.json();
    assert_eq!(updated.name, "Test Cafe Karakoy");
    assert_eq!(updated.phone, "+90 212 555 01 02");
    assert_eq!(updated.address, restaurant.address);
    assert_eq!(updated.website, restaurant.website);
    assert_eq!(updated.verification_status, VerificationStatus::Verified);

    let invalid = h
        .server
        .patch(&path)
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({ "address": "x" }))
        .await;
    invalid.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&invalid), "validation_failed");

    let stale = h
        .server
        .patch(&path)
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({ "name": "Old Tab", "expected_revision": restaurant.revision }))
        .await;
    stale.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&stale), "revision_conflict");

    h.server
        .patch(&path)
        .add_header(header::AUTHORIZATION, h.owner("owner-2"))
        .json(&json!({ "name": "Hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let current: Restaurant = h
        .server
        .get(&path)
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert_eq!(current.name, "Test Cafe Karakoy");
}

// =============================================================================
// CATALOG
// =============================================================================

#[tokio::test]
async fn test_menu_windows_drive_public_menu() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let rid = restaurant.id.to_string();

    let breakfast = h
        .create_menu(
            "owner-1",
            &rid,
            json!({
                "name": "Breakfast",
                "time_ranges": [{ "start_time": "07:00", "end_time": "11:00" }]
            }),
        )
        .await;
    let dinner = h
        .create_menu(
            "owner-1",
            &rid,
            json!({
                "name": "Dinner",
                "time_ranges": [{ "start_time": "18:00", "end_time": "22:00" }]
            }),
        )
        .await;
    assert_eq!(breakfast.order, 1);
    assert_eq!(dinner.order, 2);
    let item = h.add_item("owner-1", breakfast.id.as_str(), "Menemen").await;

    // 10:30 by the harness clock
    let now: PublicMenu = h.server.get(&format!("/menu/{rid}")).await.json();
    assert_eq!(now.menus.len(), 1);
    assert_eq!(now.menus[0].items[0].id, item.id);

    let noon = h
        .server
        .get(&format!("/menu/{rid}"))
        .add_query_param("at", "12:00")
        .await;
    noon.assert_status_ok();
    assert!(noon.json::<PublicMenu>().menus.is_empty());

    let moved = h
        .server
        .post(&format!("/items/{}/move", item.id))
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .json(&json!({ "menu_id": dinner.id }))
        .await;
    moved.assert_status_ok();
    let evening: PublicMenu = h
        .server
        .get(&format!("/menu/{rid}"))
        .add_query_param("at", "19:00")
        .await
        .json();
    assert_eq!(evening.menus[0].items[0].id, item.id);

    let dashboard: Vec<MenuSummary> = h
        .server
        .get(&format!("/restaurants/{rid}/menus"))
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert!(dashboard[0].available_now);
    assert_eq!(dashboard[0].item_count, 0);
    assert_eq!(dashboard[1].item_count, 1);
}

#[tokio::test]
async fn test_bad_time_of_day_is_400() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let response = h
        .server
        .get(&format!("/menu/{}", restaurant.id))
        .add_query_param("at", "9:00")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "invalid_time");
}

#[tokio::test]
async fn test_toggle_and_delete_menu() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let rid = restaurant.id.to_string();
    let menu = h
        .create_menu("owner-1", &rid, json!({ "name": "Desserts" }))
        .await;
    let item = h.add_item("owner-1", menu.id.as_str(), "Baklava").await;

    let toggled: Menu = h
        .server
        .post(&format!("/menus/{}/toggle", menu.id))
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await
        .json();
    assert!(!toggled.is_active);
    let public: PublicMenu = h.server.get(&format!("/menu/{rid}")).await.json();
    assert!(public.menus.is_empty());

    let deleted = h
        .server
        .delete(&format!("/menus/{}", menu.id))
        .add_header(header::AUTHORIZATION, h.owner("owner-1"))
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<DeleteMenuResponse>().deleted_items, 1);

    h.server
        .get(&format!("/items/{}/reviews", item.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_owner_cannot_edit_catalog() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let menu = h
        .create_menu("owner-1", restaurant.id.as_str(), json!({ "name": "Lunch" }))
        .await;

    let response = h
        .server
        .patch(&format!("/menus/{}", menu.id))
        .add_header(header::AUTHORIZATION, h.owner("owner-2"))
        .json(&json!({ "name": "Hijacked" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = h
        .server
        .post(&format!("/restaurants/{}/menus", restaurant.id))
        .add_header(header::AUTHORIZATION, h.bearer("customer-1", Role::Customer))
        .json(&json!({ "name": "Sneaky" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reviews_and_average() {
    let h = Harness::new(ReviewMode::Immediate);
    let restaurant = h.onboard("owner-1").await;
    let menu = h
        .create_menu("owner-1", restaurant.id.as_str(), json!({ "name": "Mains" }))
        .await;
    let item = h.add_item("owner-1", menu.id.as_str(), "Iskender").await;
    let path = format!("/items/{}/reviews", item.id);

    h.server
        .post(&path)
        .json(&json!({ "rating": 5 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    for (customer, rating) in [("customer-1", 5), ("customer-2", 4), ("customer-3", 4)] {
        h.server
            .post(&path)
            .add_header(header::AUTHORIZATION, h.bearer(customer, Role::Customer))
            .json(&json!({ "rating": rating, "comment": "Tasty" }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    h.server
        .post(&path)
        .add_header(header::AUTHORIZATION, h.bearer("customer-4", Role::Customer))
        .json(&json!({ "rating": 6 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let reviews: ItemReviews = h.server.get(&path).await.json();
    assert_eq!(reviews.review_count, 3);
    assert_eq!(reviews.average_rating.to_string(), "4.3");
    assert_eq!(reviews.reviews[0].customer_name, "Anonymous");
}

#[tokio::test]
async fn test_reviews_hidden_until_verified() {
    let h = Harness::new(ReviewMode::DocumentGated);
    let restaurant = h.onboard("owner-1").await;
    let id = restaurant.id.to_string();
    let menu = h
        .create_menu("owner-1", &id, json!({ "name": "Mains" }))
        .await;
    let item = h.add_item("owner-1", menu.id.as_str(), "Lahmacun").await;
    let path = format!("/items/{}/reviews", item.id);

    let anonymous = h.server.get(&path).await;
    anonymous.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&anonymous), "restaurant_unavailable");

    let customer = h
        .server
        .get(&path)
        .add_header(header::AUTHORIZATION, h.bearer("customer-1", Role::Customer))
        .await;
    customer.assert_status(StatusCode::NOT_FOUND);

    for auth in [h.owner("owner-1"), h.admin()] {
        let own: ItemReviews = h
            .server
            .get(&path)
            .add_header(header::AUTHORIZATION, auth)
            .await
            .json();
        assert_eq!(own.review_count, 0);
    }

    h.server
        .get(&path)
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    h.act(&id, json!({ "action": "verify" }))
        .await
        .assert_status_ok();
    h.server.get(&path).await.assert_status_ok();

    h.act(&id, json!({ "action": "block", "reason": "Health inspection" }))
        .await
        .assert_status_ok();
    let blocked = h.server.get(&path).await;
    blocked.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&blocked), "restaurant_unavailable");
}
