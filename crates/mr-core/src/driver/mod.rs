//! Recompute driver.
//!
//! Orchestrates the engine for one entity or the whole corpus:
//! extract signals → raw scores → percentiles → role → tag repair, then one
//! atomic `save_derived` per entity.
//!
//! # Consistency
//!
//! A single recompute builds its percentile context from the persisted
//! corpus at call time. A batch builds the context once at start and updates
//! it in place after each save, so later entities see earlier results. Only
//! one batch may run at a time per [`Engine`]; a second one is refused with
//! [`Error::BatchInProgress`].

pub mod job;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mr_common::{
    DerivedRecord, Entity, EntityId, Error, ErrorCategory, InputSnapshot, JobId, FORMULA_VERSION,
};
use mr_config::{BatchSettings, LoadedSettings, SettingsSnapshot};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::catalog::{CatalogHandle, CatalogSnapshot, CatalogSource};
use crate::logging::{event_names, generate_run_id, Stage};
use crate::normalize::{build_context, NormContext};
use crate::role::classify_role;
use crate::scoring::compute_scores;
use crate::signals::extract_signals;
use crate::store::EntityStore;
use crate::tags::{
    ensure_category_tags, ExternalAssisted, PatternSuggester, RepairOutcome, SuggestionSource,
    TextClassifier,
};

pub use job::{
    BatchDriver, BatchProgressSink, CancellationToken, JobHandle, JobProgress, JobStatus, NoopSink,
};

/// Default deadline for the external classifier.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_millis(2500);

/// A derived record together with the tag repair that accompanies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recomputed {
    pub record: DerivedRecord,
    pub repair: RepairOutcome,
}

/// Compute the derived record and merged tags for one entity.
///
/// Pure with respect to the store: the caller decides whether to persist.
/// `ctx` is the corpus sample; the entity's own previous scores in it are
/// replaced by the fresh ones.
pub fn compute_derived(
    entity: &Entity,
    catalog: &CatalogSnapshot,
    ctx: &NormContext,
    source: &dyn SuggestionSource,
) -> Result<Recomputed, Error> {
    entity.validate()?;

    // Signals read the merged tags, so a re-run over the saved tags agrees.
    let repair = ensure_category_tags(entity, source);
    let repaired;
    let tagged = if repair.changed() {
        let mut copy = entity.clone();
        copy.tags = repair.tags.clone();
        repaired = copy;
        &repaired
    } else {
        entity
    };

    let extraction = extract_signals(tagged, catalog);
    let scores = compute_scores(tagged, &extraction.signals);
    let (percentiles, corpus_size) = ctx.normalize_including(entity.id, &scores);
    let decision = classify_role(&percentiles, &extraction.signals);

    let record = DerivedRecord {
        entity_id: entity.id,
        scores,
        percentiles,
        role: Some(decision.role),
        confidence: Some(decision.confidence),
        rationale: Some(decision.rationale),
        inputs: InputSnapshot {
            fingerprint: entity.input_fingerprint(),
            attributes: entity.attributes.sanitized(),
            signals: extraction.signals.to_snapshot(),
            matched_tags: extraction.matched_tags.into_iter().collect(),
            catalog_version: catalog.version().to_string(),
            corpus_size,
        },
        formula_version: FORMULA_VERSION.to_string(),
        updated_at: Utc::now(),
    };

    Ok(Recomputed { record, repair })
}

/// Options for one whole-corpus recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Skip entities whose stored record is still fresh.
    pub only_stale: bool,
    /// Log progress every N entities.
    pub progress_every: usize,
    /// Job id to report under; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_settings(&BatchSettings::default())
    }
}

impl BatchOptions {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            only_stale: settings.only_stale,
            progress_every: settings.progress_every.max(1),
            job_id: None,
        }
    }

    pub fn with_only_stale(mut self, only_stale: bool) -> Self {
        self.only_stale = only_stale;
        self
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

/// One entity the batch could not recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailedEntity {
    /// None when the store failed before yielding an entity.
    pub entity_id: Option<EntityId>,
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
}

impl FailedEntity {
    fn new(entity_id: Option<EntityId>, err: &Error) -> Self {
        Self {
            entity_id: entity_id.or_else(|| err.entity_id().map(EntityId)),
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
        }
    }
}

/// Wall-clock bounds of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchTimings {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Outcome of a whole-corpus recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub job_id: JobId,
    pub run_id: String,
    /// Entities recomputed and saved.
    pub processed: usize,
    /// Entities left alone because their record was fresh.
    pub skipped: usize,
    pub failed: Vec<FailedEntity>,
    /// Entity count at batch start.
    pub total: usize,
    /// True when the batch stopped early on request.
    pub cancelled: bool,
    pub catalog_version: String,
    pub timings: BatchTimings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsSnapshot>,
}

impl BatchReport {
    /// Entities visited so far, whatever the outcome.
    pub fn attempted(&self) -> usize {
        self.processed + self.skipped + self.failed.len()
    }

    /// `Err(Cancelled)` when the batch stopped early, for callers that treat
    /// a partial batch as a failure.
    pub fn into_result(self) -> Result<Self, Error> {
        if self.cancelled {
            Err(Error::Cancelled {
                processed: self.processed,
            })
        } else {
            Ok(self)
        }
    }
}

/// Held for the duration of a batch; releases the single-flight flag on drop.
#[derive(Debug)]
pub struct BatchGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The recompute engine and its collaborators.
pub struct Engine {
    store: Arc<dyn EntityStore>,
    catalog: Arc<dyn CatalogSource>,
    classifier: Option<Arc<dyn TextClassifier>>,
    classifier_timeout: Duration,
    batch_running: Arc<AtomicBool>,
    settings: Option<SettingsSnapshot>,
}

impl Engine {
    pub fn new(store: Arc<dyn EntityStore>, catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            store,
            catalog,
            classifier: None,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            batch_running: Arc::new(AtomicBool::new(false)),
            settings: None,
        }
    }

    /// Use an external classifier for tag suggestions, with a deadline.
    pub fn with_classifier(mut self, classifier: Arc<dyn TextClassifier>, timeout: Duration) -> Self {
        self.classifier = Some(classifier);
        self.classifier_timeout = timeout;
        self
    }

    /// Build an engine from loaded settings: catalog handle, optional
    /// classifier, and the settings snapshot embedded in batch reports.
    pub fn from_settings(loaded: &LoadedSettings, store: Arc<dyn EntityStore>) -> Result<Self, Error> {
        let settings = &loaded.settings;
        let catalog = CatalogHandle::from_settings(&settings.catalog)?;
        let mut engine = Self::new(store, Arc::new(catalog));
        if let Some(classifier) = crate::config::classifier_from_settings(&settings.classifier) {
            engine = engine.with_classifier(classifier, settings.classifier_timeout());
        }
        engine.settings = Some(loaded.snapshot());
        Ok(engine)
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// True while a batch holds the single-flight guard.
    pub fn batch_running(&self) -> bool {
        self.batch_running.load(Ordering::Acquire)
    }

    fn suggestion_source(&self, catalog: Arc<CatalogSnapshot>) -> Box<dyn SuggestionSource> {
        match &self.classifier {
            Some(classifier) => Box::new(ExternalAssisted::new(
                catalog,
                classifier.clone(),
                self.classifier_timeout,
            )),
            None => Box::new(PatternSuggester::new(catalog)),
        }
    }

    /// Recompute and persist one entity by id.
    pub fn recompute_one(&self, id: EntityId) -> Result<DerivedRecord, Error> {
        let entity = self.store.get_entity(id)?;
        self.recompute_entity(&entity)
    }

    /// Recompute and persist one entity.
    ///
    /// The percentile context is built from the persisted corpus at call
    /// time. Nothing is written unless the whole computation succeeds.
    pub fn recompute_entity(&self, entity: &Entity) -> Result<DerivedRecord, Error> {
        let span = info_span!("recompute", entity_id = entity.id.0, stage = %Stage::Recompute);
        let _enter = span.enter();

        let result = self.catalog.acquire().map_err(Error::from).and_then(|catalog| {
            let ctx = build_context(&self.store.list_derived()?);
            let source = self.suggestion_source(catalog.clone());
            self.compute_and_save(entity, &catalog, &ctx, source.as_ref())
        });

        if let Err(e) = &result {
            warn!(
                target: event_names::RECOMPUTE_FAILED,
                code = e.code(),
                category = %e.category(),
                error = %e,
                "recompute failed"
            );
        }
        result
    }

    fn compute_and_save(
        &self,
        entity: &Entity,
        catalog: &CatalogSnapshot,
        ctx: &NormContext,
        source: &dyn SuggestionSource,
    ) -> Result<DerivedRecord, Error> {
        let Recomputed { record, repair } = compute_derived(entity, catalog, ctx, source)?;
        self.store.save_derived(entity.id, &record, &repair.tags)?;

        info!(
            target: event_names::RECOMPUTE_DONE,
            role = record.role.map(|r| r.as_str()).unwrap_or("none"),
            confidence = record.confidence.unwrap_or(0.0),
            tags_added = repair.added.len(),
            catalog_version = %record.inputs.catalog_version,
            "entity recomputed"
        );
        Ok(record)
    }

    /// One batch step. `Ok(None)` means skipped as fresh.
    fn batch_entity(
        &self,
        entity: &Entity,
        options: &BatchOptions,
        catalog: &CatalogSnapshot,
        ctx: &NormContext,
        source: &dyn SuggestionSource,
    ) -> Result<Option<DerivedRecord>, Error> {
        let span = info_span!("recompute", entity_id = entity.id.0, stage = %Stage::Recompute);
        let _enter = span.enter();

        let fresh = options.only_stale
            && entity
                .derived
                .as_ref()
                .is_some_and(|record| !record.is_stale_for(entity, catalog.version()));
        if fresh {
            debug!("record fresh; skipped");
            return Ok(None);
        }
        self.compute_and_save(entity, catalog, ctx, source).map(Some)
    }

    /// Take the single-flight guard for a batch.
    pub fn begin_batch(&self) -> Result<BatchGuard, Error> {
        match self
            .batch_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(BatchGuard {
                flag: self.batch_running.clone(),
            }),
            Err(_) => {
                warn!(target: event_names::BATCH_REFUSED, "corpus recompute already running");
                Err(Error::BatchInProgress)
            }
        }
    }

    /// Recompute every entity in the store, synchronously.
    ///
    /// Per-entity failures are recorded in the report and the batch goes on.
    /// A catalog or store failure before the first entity fails the whole
    /// batch. Cancellation is checked between entities and yields a report
    /// with `cancelled` set.
    pub fn recompute_all(
        &self,
        options: &BatchOptions,
        sink: &dyn BatchProgressSink,
    ) -> Result<BatchReport, Error> {
        let guard = self.begin_batch()?;
        self.run_batch(guard, options, sink)
    }

    pub(crate) fn run_batch(
        &self,
        _guard: BatchGuard,
        options: &BatchOptions,
        sink: &dyn BatchProgressSink,
    ) -> Result<BatchReport, Error> {
        let job_id = options.job_id.clone().unwrap_or_default();
        let run_id = generate_run_id();
        let span = info_span!("batch", run_id = %run_id, job_id = %job_id, stage = %Stage::Batch);
        let _enter = span.enter();

        let started_at = Utc::now();
        let clock = Instant::now();
        let every = options.progress_every.max(1);

        // Failures here would score every entity against no rules or a bogus corpus
        let catalog = self.catalog.acquire()?;
        let mut ctx = build_context(&self.store.list_derived()?);
        let total = self.store.count_entities()?;
        let source = self.suggestion_source(catalog.clone());

        info!(
            target: event_names::BATCH_STARTED,
            total,
            corpus = ctx.len(),
            only_stale = options.only_stale,
            catalog_version = %catalog.version(),
            "corpus recompute started"
        );
        sink.report_started(&job_id, total);

        let mut report = BatchReport {
            job_id,
            run_id,
            processed: 0,
            skipped: 0,
            failed: Vec::new(),
            total,
            cancelled: false,
            catalog_version: catalog.version().to_string(),
            timings: BatchTimings {
                started_at,
                finished_at: started_at,
                elapsed_ms: 0,
            },
            settings: self.settings.clone(),
        };

        for item in self.store.list_all_entities() {
            if sink.check_cancelled() {
                report.cancelled = true;
                break;
            }

            let outcome = match item {
                Ok(entity) => self
                    .batch_entity(&entity, options, &catalog, &ctx, source.as_ref())
                    .map_err(|e| (Some(entity.id), e)),
                Err(e) => Err((None, Error::from(e))),
            };

            match outcome {
                Ok(Some(record)) => {
                    ctx.upsert(record.entity_id, record.scores);
                    report.processed += 1;
                }
                Ok(None) => report.skipped += 1,
                Err((entity_id, e)) => {
                    let failure = FailedEntity::new(entity_id, &e);
                    warn!(
                        target: event_names::BATCH_ENTITY_FAILED,
                        entity_id = failure.entity_id.map(|id| id.0),
                        code = failure.code,
                        category = %failure.category,
                        error = %failure.message,
                        "entity skipped"
                    );
                    sink.report_failure(&failure);
                    report.failed.push(failure);
                }
            }

            let done = report.attempted();
            sink.report_progress(done, total);
            if done % every == 0 {
                info!(
                    target: event_names::BATCH_PROGRESS,
                    done,
                    total,
                    failed = report.failed.len(),
                    "corpus recompute progress"
                );
            }
        }

        report.timings.finished_at = Utc::now();
        report.timings.elapsed_ms = clock.elapsed().as_millis() as u64;

        if report.cancelled {
            info!(
                target: event_names::BATCH_CANCELLED,
                processed = report.processed,
                remaining = total.saturating_sub(report.attempted()),
                "corpus recompute cancelled"
            );
        } else {
            info!(
                target: event_names::BATCH_FINISHED,
                processed = report.processed,
                skipped = report.skipped,
                failed = report.failed.len(),
                elapsed_ms = report.timings.elapsed_ms,
                "corpus recompute finished"
            );
        }
        sink.report_finished(&report);
        Ok(report)
    }
}
