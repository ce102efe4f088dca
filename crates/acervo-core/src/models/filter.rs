use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::period::ReferencePeriod;
use crate::taxonomy::Category;

/// Inclusive range over the upload date. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Catalog filter state. An absent dimension matches everything; dimensions combine with
/// AND, selected tags combine with OR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub text: Option<String>,
    pub date_range: Option<DateRange>,
    pub reference_period: Option<ReferencePeriod>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = Some(text).filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range).filter(|r| !r.is_open());
        self
    }

    pub fn with_reference_period(mut self, period: ReferencePeriod) -> Self {
        self.reference_period = Some(period);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_category(mut self, category: Category, subcategory: Option<&str>) -> Self {
        self.category = Some(category);
        self.subcategory = subcategory
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.date_range.is_none()
            && self.reference_period.is_none()
            && self.tags.is_empty()
            && self.category.is_none()
            && self.subcategory.is_none()
    }

    /// Full predicate across every dimension.
    pub fn matches(&self, doc: &Document) -> bool {
        self.matches_text(doc)
            && self.matches_date_range(doc)
            && self.matches_reference_period(doc)
            && self.matches_category(doc)
            && self.matches_tags(doc)
    }

    /// Case-insensitive substring match on name, original filename, description and tags.
    pub fn matches_text(&self, doc: &Document) -> bool {
        let Some(text) = self.text.as_deref() else {
            return true;
        };
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        doc.name.to_lowercase().contains(&needle)
            || doc.original_filename.to_lowercase().contains(&needle)
            || doc
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || doc.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    pub fn matches_date_range(&self, doc: &Document) -> bool {
        self.date_range
            .map_or(true, |range| range.contains(doc.uploaded_at.date_naive()))
    }

    /// A document without an explicit period falls back to its reference date.
    pub fn matches_reference_period(&self, doc: &Document) -> bool {
        let Some(period) = self.reference_period else {
            return true;
        };
        match (doc.reference_period, doc.reference_date) {
            (Some(doc_period), _) => doc_period == period,
            (None, Some(date)) => period.contains(date),
            (None, None) => false,
        }
    }

    pub fn matches_category(&self, doc: &Document) -> bool {
        if let Some(category) = self.category {
            if doc.category != category {
                return false;
            }
        }
        match self.subcategory.as_deref() {
            Some(sub) => doc.subcategory.as_deref() == Some(sub),
            None => true,
        }
    }

    pub fn matches_tags(&self, doc: &Document) -> bool {
        self.tags.is_empty() || doc.has_any_tag(&self.tags)
    }
}
