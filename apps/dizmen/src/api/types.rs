//! # API Request/Response Types
//!
//! JSON structures of the HTTP API that are not core types. Core records
//! (`Restaurant`, `Menu`, `MenuItem`, `PublicMenu`, ...) are sent as they are.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dizmen_core::{
    DizmenError, DocumentId, DocumentType, DocumentUpload, FieldError, FieldErrors, MenuId,
    OnboardingEntry, OnboardingWizard, Restaurant, RestaurantForm, RestaurantInfoInput,
    StoredDocument,
    UserId, VerificationAction, VerificationDocument, VerificationStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH & ERRORS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    /// Inline form errors; empty unless `code` is `validation_failed`.
    #[serde(default)]
    pub fields: Vec<FieldError>,
}

// =============================================================================
// ONBOARDING
// =============================================================================

/// Where the owner lands: `dashboard`, `resubmit` or `wizard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingResponse {
    pub state: String,
    pub restaurant: Option<Restaurant>,
    pub wizard: Option<OnboardingWizard>,
}

impl From<OnboardingEntry> for OnboardingResponse {
    fn from(entry: OnboardingEntry) -> Self {
        match entry {
            OnboardingEntry::Dashboard(restaurant) => Self {
                state: "dashboard".to_string(),
                restaurant: Some(restaurant),
                wizard: None,
            },
            OnboardingEntry::Resubmit { restaurant, wizard } => Self {
                state: "resubmit".to_string(),
                restaurant: Some(restaurant),
                wizard: Some(wizard),
            },
            OnboardingEntry::Wizard(wizard) => Self {
                state: "wizard".to_string(),
                restaurant: None,
                wizard: Some(wizard),
            },
        }
    }
}

/// Body of `PUT /users/{id}/draft` and `POST /users/{id}/draft/advance`.
///
/// `revision` is the draft revision the client last saw; leaving it out
/// overwrites whatever is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardUpdate {
    pub form: Option<RestaurantForm>,
    pub revision: Option<u64>,
}

impl WizardUpdate {
    pub fn apply_to(self, wizard: &mut OnboardingWizard) {
        if let Some(form) = self.form {
            wizard.form = form;
        }
        wizard.revision = self.revision;
    }
}

/// A verification document sent as base64 inside JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadRequest {
    pub file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub document_type: DocumentType,
    pub content_base64: String,
    /// Draft revision the client last saw.
    #[serde(default)]
    pub revision: Option<u64>,
}

impl DocumentUploadRequest {
    /// Decode the payload. Size and type limits are checked by the core.
    pub fn to_upload(&self) -> Result<DocumentUpload, DizmenError> {
        let bytes = STANDARD.decode(self.content_base64.trim()).map_err(|e| {
            DizmenError::Validation(FieldErrors::single(
                "content_base64",
                format!("is not valid base64: {e}"),
            ))
        })?;
        Ok(DocumentUpload {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            document_type: self.document_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document: VerificationDocument,
    pub wizard: OnboardingWizard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardResponse {
    pub discarded: bool,
}

/// A stored document with its content, for administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: DocumentId,
    pub owner_id: UserId,
    pub file_name: String,
    pub content_type: String,
    pub document_type: DocumentType,
    pub size: u64,
    pub content_base64: String,
}

impl DocumentResponse {
    #[must_use]
    pub fn new(id: DocumentId, stored: StoredDocument) -> Self {
        Self {
            id,
            owner_id: stored.owner,
            size: stored.upload.bytes.len() as u64,
            content_base64: STANDARD.encode(&stored.upload.bytes),
            file_name: stored.upload.file_name,
            content_type: stored.upload.content_type,
            document_type: stored.upload.document_type,
        }
    }
}

// =============================================================================
// VERIFICATION
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantListQuery {
    pub status: Option<String>,
}

impl RestaurantListQuery {
    pub fn status(&self) -> Result<Option<VerificationStatus>, DizmenError> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<VerificationStatus>)
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantListResponse {
    pub restaurants: Vec<Restaurant>,
    /// Restaurants per status over the whole platform.
    pub counts: BTreeMap<String, usize>,
}

/// Body of `PATCH /restaurants/{id}`. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantUpdateRequest {
    #[serde(flatten)]
    pub info: RestaurantInfoInput,
    /// Revision the owner last saw; a stale one is a 409.
    pub expected_revision: Option<u64>,
}

/// Body of `PATCH /restaurants/{id}/verification`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationRequest {
    /// `verify`, `reject`, `block` or `unblock`.
    pub action: String,
    pub reason: Option<String>,
    /// Revision the administrator last saw; a stale one is a 409.
    pub expected_revision: Option<u64>,
}

impl VerificationRequest {
    pub fn to_action(&self) -> Result<VerificationAction, DizmenError> {
        let reason = self.reason.clone().unwrap_or_default();
        match self.action.as_str() {
            "verify" => Ok(VerificationAction::Verify),
            "reject" => Ok(VerificationAction::Reject { reason }),
            "block" => Ok(VerificationAction::Block { reason }),
            "unblock" => Ok(VerificationAction::Unblock),
            other => Err(DizmenError::Validation(FieldErrors::single(
                "action",
                format!("unknown action '{other}' (expected verify, reject, block or unblock)"),
            ))),
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveItemRequest {
    pub menu_id: MenuId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMenuResponse {
    pub menu_id: MenuId,
    pub deleted_items: usize,
}

/// `GET /menu/{id}?at=HH:mm` evaluates the menu at a chosen time of day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicMenuQuery {
    pub at: Option<String>,
}
