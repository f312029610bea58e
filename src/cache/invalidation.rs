//! Invalidation Registry Module
//!
//! Maps cached-operation categories to the key template they use for a
//! subject (e.g. a ticker), so every key belonging to one subject can be
//! enumerated and deleted.

use std::collections::BTreeMap;

use crate::error::{CacheError, Result};

/// Placeholder replaced by the subject id in a key template.
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Categories registered by `KeyRegistry::with_defaults`.
pub const DEFAULT_CATEGORIES: [(&str, &str); 6] = [
    ("stock_price", "stock_price_{subject}"),
    ("fundamental", "fundamental_{subject}"),
    ("technical", "technical_{subject}"),
    ("ai_report", "ai_report_{subject}"),
    ("news", "news_{subject}"),
    ("trading_agents", "trading_agents_{subject}"),
];

// == Key Template ==
/// Key pattern containing exactly one `{subject}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate(String);

impl KeyTemplate {
    /// Validates and wraps a template.
    pub fn parse(template: &str) -> Result<Self> {
        if template.matches(SUBJECT_PLACEHOLDER).count() != 1 {
            return Err(CacheError::InvalidKey(format!(
                "Template '{}' must contain {} exactly once",
                template, SUBJECT_PLACEHOLDER
            )));
        }
        Ok(Self(template.to_string()))
    }

    /// Expands the template for one subject.
    pub fn key_for(&self, subject: &str) -> String {
        self.0.replace(SUBJECT_PLACEHOLDER, subject)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// == Key Registry ==
/// Allow-list of per-subject key templates, keyed by category name.
#[derive(Debug, Default, Clone)]
pub struct KeyRegistry {
    templates: BTreeMap<String, KeyTemplate>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the market-data categories.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (category, template) in DEFAULT_CATEGORIES {
            registry
                .templates
                .insert(category.to_string(), KeyTemplate(template.to_string()));
        }
        registry
    }

    /// Registers (or replaces) the template of `category`.
    pub fn register(&mut self, category: &str, template: KeyTemplate) -> Option<KeyTemplate> {
        self.templates.insert(category.to_string(), template)
    }

    /// Registered category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Every key registered for `subject`, one per category.
    pub fn keys_for(&self, subject: &str) -> Vec<String> {
        self.templates
            .values()
            .map(|template| template.key_for(subject))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
