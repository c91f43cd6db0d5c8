//! Tag suggestion sources.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mr_common::{Entity, TagCategory};
use tracing::{debug, warn};

use super::classifier::{classify_with_deadline, TextClassifier};
use crate::catalog::CatalogSnapshot;
use crate::logging::event_names;

/// Produces candidate tag codes for an entity. Never fails: a source that
/// cannot answer returns what it has, possibly nothing.
pub trait SuggestionSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn suggest(&self, entity: &Entity) -> BTreeSet<String>;
}

/// Catalog pattern matches over the entity's ability text.
#[derive(Debug, Clone)]
pub struct PatternSuggester {
    catalog: Arc<CatalogSnapshot>,
}

impl PatternSuggester {
    pub fn new(catalog: Arc<CatalogSnapshot>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }
}

impl SuggestionSource for PatternSuggester {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn suggest(&self, entity: &Entity) -> BTreeSet<String> {
        self.catalog.matched_codes(entity)
    }
}

/// Pattern suggestions plus corroborated suggestions from an external
/// classifier.
///
/// An external code not already produced by the patterns is kept only when it
/// is a known catalog code with a keyword present in the ability text. Guarded
/// codes are never accepted on keywords alone. Classifier timeouts and errors
/// are logged and leave the pattern suggestions as the result.
///
/// After [`MAX_CONSECUTIVE_FAILURES`] failed calls in a row the classifier is
/// no longer asked for the lifetime of this source (one batch), so a hung
/// service costs a bounded number of abandoned workers.
pub struct ExternalAssisted {
    patterns: PatternSuggester,
    classifier: Arc<dyn TextClassifier>,
    timeout: Duration,
    consecutive_failures: AtomicUsize,
}

/// Failed classifier calls in a row before a source stops asking.
pub const MAX_CONSECUTIVE_FAILURES: usize = 3;

impl ExternalAssisted {
    pub fn new(
        catalog: Arc<CatalogSnapshot>,
        classifier: Arc<dyn TextClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            patterns: PatternSuggester::new(catalog),
            classifier,
            timeout,
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    /// True once the classifier has failed too often to be worth asking.
    pub fn is_suspended(&self) -> bool {
        self.consecutive_failures.load(Ordering::Acquire) >= MAX_CONSECUTIVE_FAILURES
    }
}

impl SuggestionSource for ExternalAssisted {
    fn name(&self) -> &'static str {
        "external"
    }

    fn suggest(&self, entity: &Entity) -> BTreeSet<String> {
        let mut suggested = self.patterns.suggest(entity);
        let text = entity.ability_blob();
        if text.is_empty() || self.is_suspended() {
            return suggested;
        }

        let external = match classify_with_deadline(self.classifier.clone(), &text, self.timeout)
        {
            Ok(tags) => {
                self.consecutive_failures.store(0, Ordering::Release);
                tags
            }
            Err(e) => {
                warn!(
                    target: event_names::CLASSIFIER_FALLBACK,
                    entity_id = %entity.id,
                    error = %e,
                    "external classifier unavailable; using pattern suggestions only"
                );
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures == MAX_CONSECUTIVE_FAILURES {
                    warn!(
                        target: event_names::CLASSIFIER_SUSPENDED,
                        failures,
                        "external classifier suspended for this source"
                    );
                }
                return suggested;
            }
        };

        let catalog = self.patterns.catalog();
        for code in external {
            let code = code.trim().to_string();
            if suggested.contains(&code) {
                continue;
            }
            if TagCategory::of_tag(&code).is_some() && catalog.corroborates(&code, &text) {
                suggested.insert(code);
            } else {
                debug!(entity_id = %entity.id, tag = %code, "uncorroborated suggestion dropped");
            }
        }
        suggested
    }
}
