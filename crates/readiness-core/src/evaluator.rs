//! Control evaluator: one oracle call in, exactly one verdict out.

use std::sync::Arc;

use tracing::instrument;

use crate::corpus::EvidenceCorpus;
use crate::domain::control::Control;
use crate::domain::verdict::Verdict;
use crate::metrics::EngineMetrics;
use crate::obs;
use crate::oracle::OracleAdapter;

/// Turns oracle judgments into verdicts, substituting the fallback verdict
/// for any failure.
#[derive(Clone)]
pub struct ControlEvaluator {
    adapter: OracleAdapter,
    framework_name: String,
    metrics: Arc<EngineMetrics>,
}

impl ControlEvaluator {
    pub fn new(adapter: OracleAdapter, framework_name: impl Into<String>) -> Self {
        Self::with_metrics(adapter, framework_name, Arc::new(EngineMetrics::new()))
    }

    pub fn with_metrics(
        adapter: OracleAdapter,
        framework_name: impl Into<String>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            adapter,
            framework_name: framework_name.into(),
            metrics,
        }
    }

    /// Evaluate one control. Never fails: a judgment failure yields
    /// [`Verdict::fallback`].
    #[instrument(skip_all, fields(control_id = %control.id))]
    pub async fn evaluate(&self, corpus: &EvidenceCorpus, control: &Control) -> Verdict {
        self.metrics.inc_oracle_calls();
        match self
            .adapter
            .judge(&self.framework_name, corpus, control)
            .await
        {
            Ok(judgment) => {
                let verdict = Verdict::from_judgment(control, judgment);
                obs::emit_control_evaluated(&verdict);
                verdict
            }
            Err(failure) => {
                self.metrics.inc_oracle_failures();
                self.metrics.inc_fallback_verdicts();
                obs::emit_control_fallback(&control.id, &failure);
                Verdict::fallback(control)
            }
        }
    }
}
