//! Blog post draft entity and the editor form it is saved from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::DomainError,
    value_objects::{DraftId, Tags},
};

/// The form payload an editing session feeds in on every change
///
/// Mirrors the editor fields one-to-one. `tags` stays comma-joined here and
/// is normalised into [`Tags`] when the draft is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct DraftForm {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub tags: String,
    pub cover_image: String,
    pub is_paid: bool,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl DraftForm {
    /// Create a form with a title and body; other fields default
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// A form with neither title nor content has nothing worth persisting
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// Check field constraints before the form is persisted
    ///
    /// # Errors
    /// Returns `DomainError::ValidationError` for a negative or non-finite price
    pub fn validate_form(&self) -> Result<(), DomainError> {
        if !self.price.is_finite() {
            return Err(DomainError::ValidationError(
                "price must be a finite number".to_string(),
            ));
        }
        self.validate()
            .map_err(|e| DomainError::ValidationError(e.to_string()))
    }

    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    #[must_use]
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    #[must_use]
    pub fn with_cover_image(mut self, url: impl Into<String>) -> Self {
        self.cover_image = url.into();
        self
    }

    /// Mark the post as paid at the given price
    #[must_use]
    pub fn paid(mut self, price: f64) -> Self {
        self.is_paid = true;
        self.price = price;
        self
    }

    #[must_use]
    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }
}

impl From<&Draft> for DraftForm {
    fn from(draft: &Draft) -> Self {
        Self {
            title: draft.title.clone(),
            slug: draft.slug.clone(),
            content: draft.content.clone(),
            excerpt: draft.excerpt.clone(),
            tags: draft.tags.to_string(),
            cover_image: draft.cover_image.clone(),
            is_paid: draft.is_paid,
            price: draft.price,
            scheduled_at: draft.scheduled_at,
        }
    }
}

/// A persisted blog post draft
///
/// `id` never changes after the first save. `updated_at` never decreases
/// across saves of the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub tags: Tags,
    pub cover_image: String,
    pub is_paid: bool,
    pub price: f64,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    /// Build a draft record from form data and bookkeeping fields
    pub fn from_form(
        id: DraftId,
        form: &DraftForm,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: form.title.clone(),
            slug: form.slug.clone(),
            content: form.content.clone(),
            excerpt: form.excerpt.clone(),
            tags: Tags::parse(&form.tags),
            cover_image: form.cover_image.clone(),
            is_paid: form.is_paid,
            price: form.price,
            scheduled_at: form.scheduled_at,
            created_at,
            updated_at,
        }
    }

    /// Whether the editable fields match a form, ignoring bookkeeping
    pub fn has_content_of(&self, form: &DraftForm) -> bool {
        DraftForm::from(self) == DraftForm {
            tags: Tags::parse(&form.tags).to_string(),
            ..form.clone()
        }
    }

    /// Title for display, with a placeholder for untitled drafts
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { "(untitled)" } else { title }
    }
}
