//! # Onboarding Wizard
//!
//! The linear, resumable path a new owner takes to register a restaurant:
//!
//! ```text
//! restaurant_info  ->  verification_documents  ->  complete
//!       (1)                     (2)                  (3)
//! ```
//!
//! - Step 1 collects the restaurant form. Advancing requires a valid name and
//!   address and auto-saves the draft.
//! - Step 2 collects verification documents. In document-gated review mode at
//!   least one is required to submit.
//! - Submission validates the full form, creates (or resubmits) the restaurant,
//!   and clears the draft.
//!
//! The wizard can be saved at any step without validation. Saves are retried on
//! transient storage failures and detect concurrent edits through the draft
//! revision. Every operation either succeeds completely or leaves the wizard as
//! it was.

use crate::primitives::{ALLOWED_DOCUMENT_TYPES, MAX_DOCUMENTS, MAX_DOCUMENT_BYTES};
use crate::store::{DocumentStore, DocumentUpload, DraftStore, RestaurantStore};
use crate::validation::{validate_restaurant_form, validate_restaurant_info};
use crate::{
    Clock, DizmenError, DocumentId, FieldErrors, OnboardingStep, PlatformSettings, Restaurant,
    RestaurantDraft, RestaurantForm, RestaurantId, ReviewMode, Sleeper, UserId,
    VerificationDocument, VerificationStatus,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// WIZARD STATE
// =============================================================================

/// The owner's in-progress wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingWizard {
    pub user_id: UserId,
    pub step: OnboardingStep,
    pub form: RestaurantForm,
    pub documents: Vec<VerificationDocument>,
    /// When the wizard was last persisted as a draft.
    pub last_saved: Option<DateTime<Utc>>,
    /// Draft revision this wizard was loaded from or last saved as.
    /// `None` means the next save overwrites whatever is stored.
    pub revision: Option<u64>,
    /// True when the wizard was restored from a saved draft.
    pub restored: bool,
}

impl OnboardingWizard {
    /// A fresh wizard at step 1.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            step: OnboardingStep::RestaurantInfo,
            form: RestaurantForm::default(),
            documents: Vec::new(),
            last_saved: None,
            revision: None,
            restored: false,
        }
    }

    fn from_draft(draft: RestaurantDraft) -> Self {
        Self {
            user_id: draft.user_id,
            step: draft.step,
            form: draft.form,
            documents: draft.documents,
            last_saved: Some(draft.last_saved),
            revision: Some(draft.revision),
            restored: true,
        }
    }

    /// A wizard prefilled from a rejected restaurant so the owner can fix and resubmit.
    fn for_resubmission(restaurant: &Restaurant) -> Self {
        Self {
            form: restaurant.to_form(),
            documents: restaurant.verification_documents.clone(),
            ..Self::new(restaurant.owner_id.clone())
        }
    }

    fn to_draft(&self, last_saved: DateTime<Utc>) -> RestaurantDraft {
        RestaurantDraft {
            user_id: self.user_id.clone(),
            step: self.step,
            form: self.form.clone(),
            documents: self.documents.clone(),
            last_saved,
            revision: self.revision.unwrap_or(0),
        }
    }
}

/// Where an owner lands when opening the owner area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingEntry {
    /// Onboarding is complete; show the dashboard.
    Dashboard(Restaurant),
    /// The restaurant was rejected; show the reason and a wizard to resubmit.
    Resubmit {
        restaurant: Restaurant,
        wizard: OnboardingWizard,
    },
    /// No restaurant yet; show the wizard (restored from a draft if one exists).
    Wizard(OnboardingWizard),
}

// =============================================================================
// READS
// =============================================================================

/// Where `user` lands: dashboard, resubmission, or the (possibly restored) wizard.
pub fn entry<S>(store: &S, user: &UserId) -> Result<OnboardingEntry, DizmenError>
where
    S: DraftStore + RestaurantStore + ?Sized,
{
    match store.restaurant_for_owner(user)? {
        Some(restaurant) if restaurant.verification_status == VerificationStatus::Rejected => {
            let wizard = match store.load_draft(user)? {
                Some(draft) => OnboardingWizard::from_draft(draft),
                None => OnboardingWizard::for_resubmission(&restaurant),
            };
            Ok(OnboardingEntry::Resubmit { restaurant, wizard })
        }
        Some(restaurant) => Ok(OnboardingEntry::Dashboard(restaurant)),
        None => Ok(OnboardingEntry::Wizard(resume(store, user)?)),
    }
}

/// The saved draft as a wizard, or a fresh wizard at step 1.
pub fn resume<S>(store: &S, user: &UserId) -> Result<OnboardingWizard, DizmenError>
where
    S: DraftStore + ?Sized,
{
    Ok(match store.load_draft(user)? {
        Some(draft) => OnboardingWizard::from_draft(draft),
        None => OnboardingWizard::new(user.clone()),
    })
}

// =============================================================================
// WORKFLOW
// =============================================================================

/// Wizard operations over a store.
pub struct OnboardingWorkflow<'a, S> {
    store: &'a mut S,
    clock: &'a dyn Clock,
    sleeper: &'a dyn Sleeper,
    settings: &'a PlatformSettings,
}

impl<'a, S> OnboardingWorkflow<'a, S>
where
    S: DraftStore + RestaurantStore + DocumentStore,
{
    pub fn new(
        store: &'a mut S,
        clock: &'a dyn Clock,
        sleeper: &'a dyn Sleeper,
        settings: &'a PlatformSettings,
    ) -> Self {
        Self {
            store,
            clock,
            sleeper,
            settings,
        }
    }

    /// Decide what the owner sees first.
    pub fn entry(&self, user: &UserId) -> Result<OnboardingEntry, DizmenError> {
        entry(&*self.store, user)
    }

    /// Restore the saved draft, or start a fresh wizard at step 1.
    pub fn resume(&self, user: &UserId) -> Result<OnboardingWizard, DizmenError> {
        resume(&*self.store, user)
    }

    /// Persist the wizard as the user's draft, whatever its step or validity.
    ///
    /// `last_saved` always moves forward, even when the clock does not.
    pub fn save_draft(&mut self, wizard: &mut OnboardingWizard) -> Result<(), DizmenError> {
        if wizard.step == OnboardingStep::Complete {
            return Err(DizmenError::InvalidStep {
                step: wizard.step,
                action: "save a draft",
            });
        }

        let mut now = self.clock.now();
        if let Some(previous) = wizard.last_saved {
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }
        }

        let draft = wizard.to_draft(now);
        let expected = wizard.revision;
        let store = &mut *self.store;
        let stored = self
            .settings
            .retry
            .run(self.sleeper, || store.save_draft(draft.clone(), expected))?;

        wizard.last_saved = Some(stored.last_saved);
        wizard.revision = Some(stored.revision);
        Ok(())
    }

    /// Step 1 -> step 2. Requires a valid name and address and saves the draft.
    pub fn advance(&mut self, wizard: &mut OnboardingWizard) -> Result<(), DizmenError> {
        if wizard.step != OnboardingStep::RestaurantInfo {
            return Err(DizmenError::InvalidStep {
                step: wizard.step,
                action: "advance",
            });
        }
        validate_restaurant_info(&wizard.form).into_result()?;

        let mut next = wizard.clone();
        next.step = OnboardingStep::VerificationDocuments;
        self.save_draft(&mut next)?;
        *wizard = next;
        Ok(())
    }

    /// Step 2 -> step 1. Nothing is saved.
    pub fn back(&self, wizard: &mut OnboardingWizard) -> Result<(), DizmenError> {
        if wizard.step != OnboardingStep::VerificationDocuments {
            return Err(DizmenError::InvalidStep {
                step: wizard.step,
                action: "go back",
            });
        }
        wizard.step = OnboardingStep::RestaurantInfo;
        Ok(())
    }

    /// Store a verification document, attach it to the wizard and save the draft.
    ///
    /// When the draft cannot be saved the stored file is deleted again and the
    /// wizard is left as it was.
    pub fn attach_document(
        &mut self,
        wizard: &mut OnboardingWizard,
        upload: DocumentUpload,
    ) -> Result<VerificationDocument, DizmenError> {
        if wizard.step != OnboardingStep::VerificationDocuments {
            return Err(DizmenError::InvalidStep {
                step: wizard.step,
                action: "attach a document",
            });
        }
        check_upload(&upload, wizard.documents.len())?;

        let id = DocumentId::generate();
        let document_url = self
            .store
            .put_document(&wizard.user_id, &id, &upload)
            .map_err(|e| DizmenError::UploadFailed(e.to_string()))?;

        let document = VerificationDocument {
            id,
            document_type: upload.document_type,
            file_name: upload.file_name.trim().to_string(),
            content_type: upload.content_type,
            size: upload.bytes.len() as u64,
            document_url,
            uploaded_at: self.clock.now(),
        };

        let mut next = wizard.clone();
        next.documents.push(document.clone());
        if let Err(e) = self.save_draft(&mut next) {
            // The save error is the one reported.
            let _ = self.store.delete_document(&document.id);
            return Err(e);
        }
        *wizard = next;
        Ok(document)
    }

    /// Drop a document from the wizard and save the draft.
    ///
    /// The stored file is deleted unless the owner's restaurant still lists it,
    /// which is the case for documents carried over into a resubmission.
    pub fn remove_document(
        &mut self,
        wizard: &mut OnboardingWizard,
        id: &DocumentId,
    ) -> Result<(), DizmenError> {
        let index = wizard
            .documents
            .iter()
            .position(|doc| &doc.id == id)
            .ok_or_else(|| DizmenError::not_found("document", id))?;
        let referenced = self.restaurant_documents(&wizard.user_id)?.contains(id);

        let mut next = wizard.clone();
        next.documents.remove(index);
        self.save_draft(&mut next)?;
        *wizard = next;
        if !referenced {
            self.store.delete_document(id)?;
        }
        Ok(())
    }

    /// Delete the user's draft and any documents it references.
    pub fn discard_draft(&mut self, user: &UserId) -> Result<bool, DizmenError> {
        let Some(draft) = self.store.load_draft(user)? else {
            return Ok(false);
        };
        let restaurant_docs = self.restaurant_documents(user)?;
        for doc in &draft.documents {
            if !restaurant_docs.contains(&doc.id) {
                self.store.delete_document(&doc.id)?;
            }
        }
        self.store.clear_draft(user)
    }

    /// Ids of the documents attached to the owner's existing restaurant.
    fn restaurant_documents(&self, user: &UserId) -> Result<Vec<DocumentId>, DizmenError> {
        Ok(self
            .store
            .restaurant_for_owner(user)?
            .map(|r| r.verification_documents.into_iter().map(|d| d.id).collect())
            .unwrap_or_default())
    }

    /// Final submission.
    ///
    /// A repeated `idempotency_key` returns the restaurant created the first time.
    /// In document-gated mode a wizard without documents is refused with
    /// `NoDocuments` and left unchanged.
    pub fn submit(
        &mut self,
        wizard: &mut OnboardingWizard,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        if let Some(key) = idempotency_key {
            if let Some(existing) = self.store.find_by_idempotency_key(key)? {
                if existing.owner_id != wizard.user_id {
                    return Err(DizmenError::Forbidden(
                        "idempotency key was used by another user".to_string(),
                    ));
                }
                wizard.step = OnboardingStep::Complete;
                return Ok(existing);
            }
        }

        if wizard.step != OnboardingStep::VerificationDocuments {
            return Err(DizmenError::InvalidStep {
                step: wizard.step,
                action: "submit",
            });
        }
        validate_restaurant_form(&wizard.form).into_result()?;
        if self.settings.review_mode == ReviewMode::DocumentGated && wizard.documents.is_empty() {
            return Err(DizmenError::NoDocuments);
        }

        let now = self.clock.now();
        let initial_status = match self.settings.review_mode {
            ReviewMode::DocumentGated => VerificationStatus::Pending,
            ReviewMode::Immediate => VerificationStatus::Verified,
        };
        let verified_at = (initial_status == VerificationStatus::Verified).then_some(now);

        let mut dropped: Vec<DocumentId> = Vec::new();
        let restaurant = match self.store.restaurant_for_owner(&wizard.user_id)? {
            Some(mut rejected) if rejected.verification_status == VerificationStatus::Rejected => {
                let expected = rejected.revision;
                let replaced = std::mem::replace(
                    &mut rejected.verification_documents,
                    wizard.documents.clone(),
                );
                rejected.apply_form(&wizard.form);
                rejected.verification_status = initial_status;
                rejected.onboarding_step = OnboardingStep::Complete;
                rejected.rejection_reason = None;
                rejected.verified_at = verified_at;
                let updated =
                    self.store
                        .update_restaurant(rejected, Some(expected), idempotency_key)?;
                dropped = replaced
                    .into_iter()
                    .filter(|doc| !wizard.documents.iter().any(|kept| kept.id == doc.id))
                    .map(|doc| doc.id)
                    .collect();
                updated
            }
            Some(_) => return Err(DizmenError::AlreadyOnboarded(wizard.user_id.clone())),
            None => {
                let id = RestaurantId::generate();
                let mut restaurant = Restaurant {
                    qr_code: id.to_string(),
                    id,
                    owner_id: wizard.user_id.clone(),
                    name: String::new(),
                    description: String::new(),
                    address: String::new(),
                    phone: String::new(),
                    website: String::new(),
                    google_location_url: String::new(),
                    social_media_links: Vec::new(),
                    profile_image: None,
                    verification_status: initial_status,
                    onboarding_step: OnboardingStep::Complete,
                    rejection_reason: None,
                    block_reason: None,
                    verification_documents: wizard.documents.clone(),
                    created_at: now,
                    verified_at,
                    revision: 0,
                };
                restaurant.apply_form(&wizard.form);
                self.store.insert_restaurant(restaurant, idempotency_key)?
            }
        };

        self.store.clear_draft(&wizard.user_id)?;
        wizard.step = OnboardingStep::Complete;
        wizard.revision = None;
        // Documents the resubmission no longer lists.
        for id in &dropped {
            self.store.delete_document(id)?;
        }
        Ok(restaurant)
    }
}

/// Size, type and count limits for a single upload.
fn check_upload(upload: &DocumentUpload, attached: usize) -> Result<(), DizmenError> {
    let mut errors = FieldErrors::new();
    if upload.file_name.trim().is_empty() {
        errors.push("file_name", "is required");
    }
    if upload.bytes.is_empty() {
        errors.push("document", "file is empty");
    } else if upload.bytes.len() > MAX_DOCUMENT_BYTES {
        errors.push(
            "document",
            format!("file exceeds {} MiB", MAX_DOCUMENT_BYTES / (1024 * 1024)),
        );
    }
    let content_type = upload.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_DOCUMENT_TYPES.contains(&content_type.as_str()) {
        errors.push(
            "content_type",
            format!("unsupported type '{}'", upload.content_type),
        );
    }
    if attached >= MAX_DOCUMENTS {
        errors.push(
            "documents",
            format!("at most {MAX_DOCUMENTS} documents can be attached"),
        );
    }
    errors.into_result()
}

// =============================================================================
// TESTS
// =============================================================================
