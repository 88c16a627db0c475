//! Evaluation orchestrator.
//!
//! Drives one assessment from `pending` to a terminal state:
//!
//! 1. `pending -> analyzing`
//! 2. resolve the framework's controls and domains
//! 3. build the evidence corpus (fails fast when empty, before any oracle call)
//! 4. fan out one evaluation task per control, bounded by a semaphore; each
//!    task owns exactly one slot of a pre-sized result vector
//! 5. assemble the verdict set (one verdict per control, checked)
//! 6. score, then `analyzing -> completed`
//!
//! Any structural error in steps 2-6 moves the assessment to `failed`.

use std::sync::Arc;
use std::time::Instant;

use evidence_store::BlobStore;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{instrument, warn, Instrument};

use crate::catalog::ControlCatalog;
use crate::config::EngineConfig;
use crate::corpus::{
    CorpusBuilder, EvidenceCorpus, EvidenceDocument, SkippedDocument, StoredDocument,
    TextExtractor,
};
use crate::domain::assessment::AssessmentRun;
use crate::domain::control::{Control, Domain};
use crate::domain::error::Result;
use crate::domain::verdict::{Verdict, VerdictSet};
use crate::evaluator::ControlEvaluator;
use crate::metrics::EngineMetrics;
use crate::obs;
use crate::oracle::{JudgmentOracle, OracleAdapter};
use crate::scoring::{self, ScoreCard};

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentOutcome {
    pub assessment_id: String,
    pub framework_id: String,
    pub framework_name: String,
    pub verdicts: VerdictSet,
    pub scores: ScoreCard,
    pub skipped_documents: Vec<SkippedDocument>,
}

/// Where a run's evidence comes from.
#[derive(Clone, Copy)]
enum Evidence<'a> {
    Inline(&'a [EvidenceDocument]),
    Stored(&'a dyn BlobStore, &'a [StoredDocument]),
}

impl Evidence<'_> {
    fn len(&self) -> usize {
        match self {
            Evidence::Inline(docs) => docs.len(),
            Evidence::Stored(_, docs) => docs.len(),
        }
    }
}

/// Runs assessments against an injected catalog and oracle.
pub struct Orchestrator {
    catalog: Arc<dyn ControlCatalog>,
    oracle: Arc<dyn JudgmentOracle>,
    corpus_builder: CorpusBuilder,
    config: EngineConfig,
    metrics: Arc<EngineMetrics>,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<dyn ControlCatalog>,
        oracle: Arc<dyn JudgmentOracle>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            oracle,
            corpus_builder: CorpusBuilder::default(),
            config,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Replace the built-in text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.corpus_builder = CorpusBuilder::new(extractor);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Run `assessment` over inline documents.
    ///
    /// Returns [`EngineError::InvalidTransition`] without doing any work if
    /// the assessment is not pending.
    ///
    /// [`EngineError::InvalidTransition`]: crate::EngineError::InvalidTransition
    #[instrument(skip(self, assessment, documents), fields(documents = documents.len()))]
    pub async fn run(
        &self,
        assessment: &AssessmentRun,
        framework_id: &str,
        documents: &[EvidenceDocument],
    ) -> Result<AssessmentOutcome> {
        self.drive(assessment, framework_id, Evidence::Inline(documents))
            .await
    }

    /// Run `assessment` over documents held in `store`.
    #[instrument(skip(self, assessment, store, documents), fields(documents = documents.len()))]
    pub async fn run_stored(
        &self,
        assessment: &AssessmentRun,
        framework_id: &str,
        store: &dyn BlobStore,
        documents: &[StoredDocument],
    ) -> Result<AssessmentOutcome> {
        self.drive(assessment, framework_id, Evidence::Stored(store, documents))
            .await
    }

    async fn drive(
        &self,
        assessment: &AssessmentRun,
        framework_id: &str,
        evidence: Evidence<'_>,
    ) -> Result<AssessmentOutcome> {
        assessment.begin_analysis()?;

        let assessment_id = assessment.assessment_id();
        let started = Instant::now();
        obs::emit_assessment_started(&assessment_id, framework_id, evidence.len());

        let result = self
            .analyze(&assessment_id, framework_id, evidence)
            .instrument(obs::assessment_span(&assessment_id))
            .await;

        match result {
            Ok(outcome) => {
                assessment.complete(outcome.scores.overall)?;
                obs::emit_assessment_completed(
                    &assessment_id,
                    outcome.scores.overall,
                    outcome.verdicts.len(),
                    outcome.verdicts.fallbacks().count(),
                    started.elapsed().as_millis() as u64,
                );
                self.metrics.flush();
                Ok(outcome)
            }
            Err(err) => {
                obs::emit_assessment_failed(&assessment_id, &err);
                if let Err(transition) = assessment.fail(err.to_string()) {
                    warn!(error = %transition, "could not record assessment failure");
                }
                self.metrics.flush();
                Err(err)
            }
        }
    }

    async fn analyze(
        &self,
        assessment_id: &str,
        framework_id: &str,
        evidence: Evidence<'_>,
    ) -> Result<AssessmentOutcome> {
        let framework = self.catalog.framework(framework_id)?;
        let framework_name = framework.name.clone();
        let controls = self.catalog.list_controls(framework_id)?;
        let domains: Vec<Domain> = self.catalog.list_domains(framework_id)?;

        let corpus = match evidence {
            Evidence::Inline(docs) => self.corpus_builder.build(docs).await,
            Evidence::Stored(store, docs) => self.corpus_builder.build_from_store(store, docs).await,
        };
        let corpus = match corpus {
            Ok(corpus) => corpus,
            Err(err) => {
                self.metrics.add_documents_skipped(evidence.len() as u64);
                return Err(err);
            }
        };
        self.metrics
            .add_documents_extracted(corpus.document_count() as u64);
        self.metrics
            .add_documents_skipped(corpus.skipped().len() as u64);
        obs::emit_corpus_built(
            assessment_id,
            corpus.document_count(),
            corpus.skipped().len(),
            corpus.text().len(),
        );

        let skipped_documents = corpus.skipped().to_vec();
        let verdicts = self
            .evaluate_all(&framework_name, Arc::new(corpus), &controls)
            .await;
        let verdicts = VerdictSet::assemble(&controls, verdicts)?;
        let scores = scoring::score(&verdicts, &domains)?;

        Ok(AssessmentOutcome {
            assessment_id: assessment_id.to_string(),
            framework_id: framework_id.to_string(),
            framework_name,
            verdicts,
            scores,
            skipped_documents,
        })
    }

    /// One task per control; at most `max_concurrency` oracle calls in
    /// flight. Returns one verdict per control, in catalog order.
    async fn evaluate_all(
        &self,
        framework_name: &str,
        corpus: Arc<EvidenceCorpus>,
        controls: &[Control],
    ) -> Vec<Verdict> {
        let adapter = OracleAdapter::new(
            Arc::clone(&self.oracle),
            self.config.oracle_timeout,
            self.config.window,
        );
        let evaluator = Arc::new(ControlEvaluator::with_metrics(
            adapter,
            framework_name,
            Arc::clone(&self.metrics),
        ));
        let sem = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut join_set = JoinSet::new();
        for (idx, control) in controls.iter().cloned().enumerate() {
            let evaluator = Arc::clone(&evaluator);
            let corpus = Arc::clone(&corpus);
            let sem = Arc::clone(&sem);
            join_set.spawn(
                async move {
                    let _permit = sem.acquire_owned().await.ok();
                    (idx, evaluator.evaluate(&corpus, &control).await)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<Verdict>> = vec![None; controls.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, verdict)) => slots[idx] = Some(verdict),
                Err(e) => warn!(error = %e, "control evaluation task aborted"),
            }
        }

        // A slot is only empty if its task panicked.
        controls
            .iter()
            .zip(slots)
            .map(|(control, slot)| {
                slot.unwrap_or_else(|| {
                    self.metrics.inc_fallback_verdicts();
                    obs::emit_control_fallback(&control.id, &"evaluation task panicked");
                    Verdict::fallback(control)
                })
            })
            .collect()
    }
}
