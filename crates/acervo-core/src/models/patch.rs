use std::collections::BTreeSet;

use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppResult;
use crate::taxonomy::{Category, Taxonomy};
use crate::validation::validate_document_name;

/// Partial update sent as `PATCH /documents/{id}`. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct DocumentPatch {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Document name must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    pub category: Option<Category>,
    /// `Some(None)` clears the subcategory
    pub subcategory: Option<Option<String>>,
    #[validate(length(max = 20, message = "Too many tags"))]
    pub tags: Option<BTreeSet<String>>,
    pub private: Option<bool>,
    pub shared_with_accountant: Option<bool>,
}

impl DocumentPatch {
    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == DocumentPatch::default()
    }

    /// Field-level checks plus the taxonomy check when the category moves.
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(title) = &self.title {
            validate_document_name(title)?;
        }
        if let Some(category) = self.category {
            let subcategory = self.subcategory.as_ref().and_then(|s| s.as_deref());
            Taxonomy::global().resolve(category, subcategory)?;
        }
        Ok(())
    }

    /// JSON body with backend field names.
    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();
        if let Some(title) = &self.title {
            body.insert("title".into(), Value::String(title.trim().to_string()));
        }
        if let Some(description) = &self.description {
            body.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(category) = self.category {
            body.insert("type".into(), Value::String(category.code().to_string()));
        }
        if let Some(subcategory) = &self.subcategory {
            body.insert(
                "subcategory".into(),
                subcategory.clone().map(Value::String).unwrap_or(Value::Null),
            );
        }
        if let Some(tags) = &self.tags {
            body.insert(
                "tags".into(),
                Value::Array(tags.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(private) = self.private {
            body.insert("private".into(), Value::Bool(private));
        }
        if let Some(shared) = self.shared_with_accountant {
            body.insert("sharedWithAccountant".into(), Value::Bool(shared));
        }
        Value::Object(body)
    }
}
