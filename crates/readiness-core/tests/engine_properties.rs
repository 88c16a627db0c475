//! End-to-end properties of the control evaluation engine.
//!
//! Every test drives a full assessment through the orchestrator with a
//! scripted or instrumented in-process oracle, so results are deterministic
//! and need no network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evidence_store::{BlobStore, MemoryBlobStore};
use readiness_core::oracle::fakes::{answer, Scripted, ScriptedOracle};
use readiness_core::oracle::JudgmentResult;
use readiness_core::scoring::score;
use readiness_core::{
    AssessmentRun, AssessmentStatus, Catalog, ComplianceStatus, ControlCatalog, EngineConfig,
    EngineError, EvidenceDocument, Framework, JudgmentFailure, JudgmentOracle, JudgmentRequest,
    Orchestrator, StoredDocument, WindowStrategy, FALLBACK_RATIONALE,
};
use serde_json::{json, Value};

/// Oracle that tracks how many calls are in flight at once.
#[derive(Default)]
struct GaugeOracle {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl JudgmentOracle for GaugeOracle {
    async fn judge(&self, _request: &JudgmentRequest) -> JudgmentResult<Value> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(answer(ComplianceStatus::Met, 90, "ok"))
    }
}

fn three_control_catalog() -> Arc<Catalog> {
    let framework: Framework = serde_json::from_value(json!({
        "id": "iso27001",
        "name": "ISO/IEC 27001:2022",
        "short_name": "ISO 27001",
        "description": "Information security management",
        "version": "2022",
        "category": "security",
        "domains": [
            {
                "id": "A.5",
                "name": "Organizational controls",
                "controls": [
                    {
                        "id": "A.5.1",
                        "name": "Policies for information security",
                        "description": "Information security policy shall be defined and approved",
                        "required_evidence": ["Information security policy", "Approval record"],
                        "keywords": ["policy"]
                    },
                    {
                        "id": "A.5.15",
                        "name": "Access control",
                        "description": "Rules to control access shall be established",
                        "required_evidence": ["Access control policy"],
                        "keywords": ["access"]
                    }
                ]
            },
            {
                "id": "A.8",
                "name": "Technological controls",
                "controls": [
                    {
                        "id": "A.8.13",
                        "name": "Information backup",
                        "description": "Backup copies shall be maintained and tested",
                        "required_evidence": ["Backup policy", "Restore test log"],
                        "keywords": ["backup"]
                    }
                ]
            }
        ]
    }))
    .expect("valid framework");
    Arc::new(Catalog::from_frameworks(vec![framework]).expect("valid catalog"))
}

fn evidence() -> Vec<EvidenceDocument> {
    vec![
        EvidenceDocument::text("isms-policy.txt", "Our information security policy, approved 2025."),
        EvidenceDocument::text("backup.md", "Nightly backups; restore tested quarterly."),
    ]
}

fn engine(oracle: Arc<ScriptedOracle>) -> Orchestrator {
    Orchestrator::new(three_control_catalog(), oracle, EngineConfig::default())
}

#[tokio::test]
async fn all_met_scores_100() {
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let run = AssessmentRun::new("asmt-all-met");

    let outcome = engine(oracle).run(&run, "iso27001", &evidence()).await.unwrap();

    assert_eq!(outcome.scores.overall, 100);
    assert_eq!(run.status(), AssessmentStatus::Completed);
    assert_eq!(run.overall_score(), Some(100));
}

#[tokio::test]
async fn met_partial_not_met_scores_50() {
    let oracle = Arc::new(
        ScriptedOracle::new(Scripted::judged(ComplianceStatus::Met, 90, "Approved policy"))
            .with("A.5.15", Scripted::judged(ComplianceStatus::Partial, 60, "Draft only"))
            .with("A.8.13", Scripted::judged(ComplianceStatus::NotMet, 75, "No restore log")),
    );
    let run = AssessmentRun::new("asmt-mixed");

    let outcome = engine(oracle).run(&run, "iso27001", &evidence()).await.unwrap();

    assert_eq!(outcome.scores.overall, 50);
    let v = outcome.verdicts.get("A.5.15").unwrap();
    assert_eq!(v.status, ComplianceStatus::Partial);
    assert_eq!(v.confidence, 60);
    assert_eq!(v.rationale, "Draft only");
    assert_eq!(outcome.verdicts.fallbacks().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn always_timing_out_oracle_yields_all_fallbacks_and_completes() {
    let oracle = Arc::new(ScriptedOracle::always_timeout());
    let orch = Orchestrator::new(
        three_control_catalog(),
        oracle.clone(),
        EngineConfig::default().with_oracle_timeout(Duration::from_secs(30)),
    );
    let run = AssessmentRun::new("asmt-timeouts");

    let outcome = orch.run(&run, "iso27001", &evidence()).await.unwrap();

    assert_eq!(outcome.verdicts.len(), 3);
    for verdict in &outcome.verdicts {
        assert_eq!(verdict.status, ComplianceStatus::NotMet);
        assert_eq!(verdict.confidence, 0);
        assert_eq!(verdict.rationale, FALLBACK_RATIONALE);
    }
    assert_eq!(outcome.scores.overall, 0);
    assert_eq!(run.status(), AssessmentStatus::Completed);
    assert_eq!(oracle.calls(), 3);
    assert_eq!(orch.metrics().snapshot().fallback_verdicts, 3);
}

#[tokio::test]
async fn oracle_errors_are_contained_per_control() {
    let oracle = Arc::new(
        ScriptedOracle::always(ComplianceStatus::Met)
            .with(
                "A.5.1",
                Scripted::Fail(JudgmentFailure::HttpStatus {
                    status: 429,
                    body: "rate limited".to_string(),
                }),
            )
            .with("A.8.13", Scripted::Answer(json!({"status": "yes"}))),
    );
    let run = AssessmentRun::new("asmt-partial-failure");

    let outcome = engine(oracle).run(&run, "iso27001", &evidence()).await.unwrap();

    let fallbacks: Vec<&str> = outcome
        .verdicts
        .fallbacks()
        .map(|v| v.control_id.as_str())
        .collect();
    assert_eq!(fallbacks, vec!["A.5.1", "A.8.13"]);
    assert_eq!(outcome.scores.overall, 33);
    assert_eq!(run.status(), AssessmentStatus::Completed);
}

#[tokio::test]
async fn empty_corpus_fails_fast_without_oracle_calls() {
    for documents in [
        vec![],
        vec![
            EvidenceDocument::text("blank.txt", "   \n"),
            EvidenceDocument::new("empty.pdf", Vec::new(), "application/pdf"),
        ],
    ] {
        let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
        let run = AssessmentRun::new("asmt-empty");

        let err = engine(oracle.clone())
            .run(&run, "iso27001", &documents)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::EmptyCorpus { .. }));
        assert!(err.is_structural());
        assert_eq!(run.status(), AssessmentStatus::Failed);
        assert_eq!(run.overall_score(), None);
        assert_eq!(oracle.calls(), 0);
    }
}

#[tokio::test]
async fn unknown_framework_fails_run() {
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let run = AssessmentRun::new("asmt-unknown");

    let err = engine(oracle.clone())
        .run(&run, "soc2", &evidence())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnknownFramework(_)));
    let snap = run.snapshot();
    assert_eq!(snap.status, AssessmentStatus::Failed);
    assert!(snap.failure.unwrap().contains("soc2"));
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn bad_document_does_not_sink_the_run() {
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let run = AssessmentRun::new("asmt-bad-doc");
    let mut documents = evidence();
    documents.push(EvidenceDocument::new(
        "noise.bin",
        vec![0u8, 1, 2, 3],
        "application/octet-stream",
    ));

    let outcome = engine(oracle).run(&run, "iso27001", &documents).await.unwrap();

    assert_eq!(outcome.skipped_documents.len(), 1);
    assert_eq!(outcome.skipped_documents[0].label, "noise.bin");
    assert_eq!(run.status(), AssessmentStatus::Completed);
}

#[tokio::test]
async fn verdict_set_matches_catalog_one_to_one() {
    let catalog = three_control_catalog();
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Partial));
    let orch = Orchestrator::new(catalog.clone(), oracle, EngineConfig::default());
    let run = AssessmentRun::new("asmt-complete");

    let outcome = orch.run(&run, "iso27001", &evidence()).await.unwrap();

    let catalog_ids: Vec<String> = catalog
        .list_controls("iso27001")
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    let verdict_ids: Vec<String> = outcome.verdicts.iter().map(|v| v.control_id.clone()).collect();
    assert_eq!(verdict_ids, catalog_ids);
}

#[tokio::test]
async fn domain_rollup_is_consistent_and_scoring_idempotent() {
    let catalog = three_control_catalog();
    let oracle = Arc::new(
        ScriptedOracle::always(ComplianceStatus::Met)
            .with("A.5.15", Scripted::judged(ComplianceStatus::NotMet, 80, "none")),
    );
    let orch = Orchestrator::new(catalog.clone(), oracle, EngineConfig::default());
    let run = AssessmentRun::new("asmt-rollup");

    let outcome = orch.run(&run, "iso27001", &evidence()).await.unwrap();

    let totals: usize = outcome.scores.by_domain.iter().map(|d| d.total).sum();
    assert_eq!(totals, outcome.verdicts.len());
    assert_eq!(outcome.scores.by_domain[0].domain_id, "A.5");
    assert_eq!(outcome.scores.by_domain[0].score, 50);
    assert_eq!(outcome.scores.by_domain[1].score, 100);

    let domains = catalog.list_domains("iso27001").unwrap();
    let first = score(&outcome.verdicts, &domains).unwrap();
    let second = score(&outcome.verdicts, &domains).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, outcome.scores);
}

#[tokio::test]
async fn subscribers_see_analyzing_then_completed() {
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let orch = engine(oracle);
    let run = AssessmentRun::new("asmt-watch");
    let mut rx = run.subscribe();

    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status;
            seen.push(status);
            if status.is_terminal() {
                break;
            }
        }
        seen
    });

    orch.run(&run, "iso27001", &evidence()).await.unwrap();
    let seen = watcher.await.unwrap();

    assert_eq!(seen.last(), Some(&AssessmentStatus::Completed));
    assert!(!seen.contains(&AssessmentStatus::Failed));
}

#[tokio::test]
async fn second_run_on_same_assessment_is_rejected() {
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let orch = engine(oracle.clone());
    let run = AssessmentRun::new("asmt-twice");
    orch.run(&run, "iso27001", &evidence()).await.unwrap();

    let err = orch.run(&run, "iso27001", &evidence()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: AssessmentStatus::Completed,
            to: AssessmentStatus::Analyzing
        }
    ));
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn stored_documents_feed_the_corpus() {
    let store = MemoryBlobStore::new();
    let handle = store
        .store(b"Backups run nightly and restores are tested.")
        .await
        .unwrap();
    let documents = vec![StoredDocument {
        label: "backup.txt".to_string(),
        handle,
        mime_type: "text/plain".to_string(),
    }];
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let run = AssessmentRun::new("asmt-stored");

    let outcome = engine(oracle.clone())
        .run_stored(&run, "iso27001", &store, &documents)
        .await
        .unwrap();

    assert_eq!(outcome.scores.overall, 100);
    let request = &oracle.requests()[0];
    assert!(request.corpus_window.contains("--- Document: backup.txt ---"));
}

#[tokio::test]
async fn keyword_window_is_used_when_configured() {
    let filler = "Company history and org chart. ".repeat(40);
    let documents = vec![
        EvidenceDocument::text("overview.txt", filler),
        EvidenceDocument::text("backup.md", "Backup restore test passed."),
    ];
    let oracle = Arc::new(ScriptedOracle::always(ComplianceStatus::Met));
    let orch = Orchestrator::new(
        three_control_catalog(),
        oracle.clone(),
        EngineConfig::default().with_window(200, WindowStrategy::KeywordFocused),
    );
    let run = AssessmentRun::new("asmt-keyword");

    orch.run(&run, "iso27001", &documents).await.unwrap();

    let backup_request = oracle
        .requests()
        .into_iter()
        .find(|r| r.control_id == "A.8.13")
        .unwrap();
    assert!(backup_request.corpus_window.contains("Backup restore test passed."));
    assert!(backup_request.corpus_window.chars().count() <= 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oracle_calls_in_flight_never_exceed_max_concurrency() {
    let catalog = Catalog::builtin().unwrap();
    let controls = catalog.control_count("iso27001").unwrap();
    for limit in [1, 3] {
        let oracle = Arc::new(GaugeOracle::default());
        let orch = Orchestrator::new(
            Arc::new(catalog),
            oracle.clone(),
            EngineConfig::default().with_max_concurrency(limit),
        );
        let run = AssessmentRun::new(format!("asmt-gauge-{limit}"));

        let outcome = orch.run(&run, "iso27001", &evidence()).await.unwrap();

        assert_eq!(outcome.verdicts.len(), controls);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), controls);
        let peak = oracle.peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= limit, "peak {peak} exceeded limit {limit}");
    }
}
