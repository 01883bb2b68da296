//! Workflow engine: the risk-adaptive verification state machine.
//!
//! States run `Classify → AssessRisk → {ParallelAnalysis |
//! DirectVerification} → SourceAttribution → CalculateConsensus →
//! GenerateReport`. High-risk content fans out to every configured
//! evaluator concurrently; low- and medium-risk content takes the lighter
//! single-evaluator path. Both branches converge at source attribution.
//!
//! Failure policy:
//! - One evaluator failing (or timing out) is local; its result is
//!   excluded from aggregation.
//! - The fan-out succeeds if at least one evaluator succeeds. If all
//!   fail, the request fails with [`AnalysisError::AllEvaluatorsFailed`].
//! - If the overall deadline elapses, outstanding evaluator calls are
//!   cancelled and any verdicts already collected still feed consensus.
//!   Zero collected verdicts at the deadline is
//!   [`AnalysisError::AnalysisTimedOut`].
//! - A fatal failure emits no partial report, writes no cache entry, and
//!   consumes no quota.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crosscheck_core::{
    aggregate, assess_risk, classify, AnalysisRequest, ConsensusResult, ContentCategory,
    Fingerprint, ProviderVerdict, RequestError, RiskLevel, Verdict,
};

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::providers::Evaluator;
use crate::quota::{QuotaError, QuotaLedger};
use crate::sources::{attribute_sources, trusted_sources};

/// Errors surfaced by [`WorkflowEngine::analyze`].
///
/// This is the complete error surface: everything below the engine is
/// absorbed and translated into a degraded result or one of these
/// classes.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Every evaluator in the selected branch failed.
    #[error("all evaluators failed")]
    AllEvaluatorsFailed,

    /// The overall deadline elapsed with zero verdicts collected.
    #[error("analysis deadline elapsed before any verdict was collected")]
    AnalysisTimedOut,

    /// The caller is out of quota for the current period.
    #[error(transparent)]
    Quota(#[from] QuotaError),

    /// The submission itself was invalid.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// An invariant the engine is supposed to uphold was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors constructing a [`WorkflowEngine`].
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no evaluators registered")]
    NoEvaluators,
}

/// Stages of the verification workflow, in visit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CacheHit,
    ClassifyContent,
    AssessRisk,
    ParallelAnalysis,
    DirectVerification,
    SourceAttribution,
    CalculateConsensus,
    GenerateReport,
}

impl Stage {
    /// Stage name as recorded in the audit trail.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CacheHit => "cache_hit",
            Stage::ClassifyContent => "classify_content",
            Stage::AssessRisk => "assess_risk",
            Stage::ParallelAnalysis => "parallel_analysis",
            Stage::DirectVerification => "direct_verification",
            Stage::SourceAttribution => "source_attribution",
            Stage::CalculateConsensus => "calculate_consensus",
            Stage::GenerateReport => "generate_report",
        }
    }
}

/// Mutable record threaded through the state machine.
///
/// Fields accumulate monotonically stage by stage and are never
/// retracted. `processing_path` is the append-only audit trail of
/// visited stages.
#[derive(Debug, Default)]
struct WorkflowState {
    category: Option<ContentCategory>,
    risk: Option<RiskLevel>,
    verdicts: Vec<ProviderVerdict>,
    sources: BTreeSet<String>,
    processing_path: Vec<Stage>,
}

impl WorkflowState {
    fn visit(&mut self, stage: Stage) {
        self.processing_path.push(stage);
    }

    fn path_names(&self) -> Vec<String> {
        self.processing_path
            .iter()
            .map(|stage| stage.as_str().to_string())
            .collect()
    }
}

/// The assembled outcome of one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub verdict: Verdict,
    pub confidence: f64,
    pub model_count: usize,
    pub agreement: f64,
    pub sources: Vec<String>,
    pub category: ContentCategory,
    pub risk: RiskLevel,
    pub processing_path: Vec<String>,
    pub cached: bool,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisReport {
    /// Fields for the audit record the storage collaborator persists.
    pub fn audit_record(&self, caller_id: &str, fingerprint: &Fingerprint) -> AuditRecord {
        AuditRecord {
            caller_id: caller_id.to_string(),
            content_hash: fingerprint.as_hex().to_string(),
            verdict: self.verdict,
            confidence: self.confidence,
            processing_time_ms: self.processing_time_ms,
            sources: serde_json::json!(self.sources),
            created_at: self.timestamp,
        }
    }
}

/// Analysis log entry supplied to the excluded storage collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub caller_id: String,
    pub content_hash: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub sources: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The orchestrating state machine for content verification.
pub struct WorkflowEngine {
    evaluators: Vec<Arc<dyn Evaluator>>,
    cache: Arc<dyn ResultCache>,
    quota: Arc<QuotaLedger>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Start building an engine.
    pub fn builder() -> WorkflowEngineBuilder {
        WorkflowEngineBuilder::new()
    }

    /// Names of the configured evaluators, in fan-out order.
    pub fn evaluator_names(&self) -> Vec<&str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// The shared quota ledger.
    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    /// Run one analysis for a caller.
    ///
    /// Checks the result cache first; a hit short-circuits straight to
    /// the report and consumes no quota. On a miss, one unit of quota is
    /// reserved before any evaluator call, committed on success, and
    /// released on failure.
    pub async fn analyze(
        &self,
        caller: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = std::time::Instant::now();
        let fingerprint = Fingerprint::of(request.content());

        // Cache short-circuit. Backend errors degrade to a miss.
        match self.cache.get(&fingerprint).await {
            Ok(Some(cached)) => {
                tracing::debug!(fingerprint = %fingerprint, "cache hit");
                return Ok(Self::report_from_cache(request, cached, started));
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(error = %error, "cache lookup failed, proceeding as miss");
            }
        }

        self.quota.check_and_reserve(caller)?;

        match self.run_stages(request).await {
            Ok((state, consensus)) => {
                if let Err(error) = self.cache.put(&fingerprint, consensus.clone()).await {
                    tracing::warn!(error = %error, "cache write failed");
                }
                self.quota.commit(caller);
                Ok(Self::assemble_report(state, consensus, started))
            }
            Err(error) => {
                self.quota.release(caller);
                Err(error)
            }
        }
    }

    /// Run the state machine from classification through consensus.
    async fn run_stages(
        &self,
        request: &AnalysisRequest,
    ) -> Result<(WorkflowState, ConsensusResult), AnalysisError> {
        let deadline = Instant::now() + self.config.overall_deadline;
        let mut state = WorkflowState::default();

        state.visit(Stage::ClassifyContent);
        let category = classify(request.content());
        state.category = Some(category);

        state.visit(Stage::AssessRisk);
        let risk = assess_risk(request.content(), category, request.priority());
        state.risk = Some(risk);
        tracing::debug!(category = %category, risk = %risk, "content assessed");

        let hints: Vec<String> = trusted_sources(category)
            .iter()
            .map(|s| s.to_string())
            .collect();

        let verdicts = match risk {
            RiskLevel::High => {
                state.visit(Stage::ParallelAnalysis);
                self.fan_out(&self.evaluators, request.content(), &hints, deadline)
                    .await
            }
            RiskLevel::Low | RiskLevel::Medium => {
                state.visit(Stage::DirectVerification);
                self.fan_out(&self.evaluators[..1], request.content(), &hints, deadline)
                    .await
            }
        };

        if verdicts.is_empty() {
            return Err(if Instant::now() >= deadline {
                AnalysisError::AnalysisTimedOut
            } else {
                AnalysisError::AllEvaluatorsFailed
            });
        }
        state.verdicts = verdicts;

        state.visit(Stage::SourceAttribution);
        let cited: BTreeSet<String> = state
            .verdicts
            .iter()
            .flat_map(|verdict| verdict.sources.iter().cloned())
            .collect();
        state.sources = attribute_sources(category, &cited);

        state.visit(Stage::CalculateConsensus);
        let mut consensus = aggregate(&state.verdicts)
            .map_err(|error| AnalysisError::Internal(error.to_string()))?;
        consensus.sources = state.sources.clone();

        Ok((state, consensus))
    }

    /// Invoke evaluators concurrently, each bounded by the smaller of the
    /// per-adapter timeout and the remaining overall deadline.
    ///
    /// Sub-tasks are independent: a failure or timeout in one never
    /// propagates to its siblings, and a timed-out call is cancelled by
    /// dropping its future.
    async fn fan_out(
        &self,
        evaluators: &[Arc<dyn Evaluator>],
        content: &str,
        hints: &[String],
        deadline: Instant,
    ) -> Vec<ProviderVerdict> {
        let calls = evaluators.iter().map(|evaluator| async move {
            let budget = self
                .config
                .adapter_timeout
                .min(deadline.saturating_duration_since(Instant::now()));

            match tokio::time::timeout(budget, evaluator.evaluate(content, hints)).await {
                Ok(Ok(verdict)) => Some(verdict),
                Ok(Err(error)) => {
                    tracing::warn!(evaluator = evaluator.name(), error = %error, "evaluator failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        evaluator = evaluator.name(),
                        budget_ms = budget.as_millis() as u64,
                        "evaluator timed out"
                    );
                    None
                }
            }
        });

        join_all(calls).await.into_iter().flatten().collect()
    }

    fn report_from_cache(
        request: &AnalysisRequest,
        consensus: ConsensusResult,
        started: std::time::Instant,
    ) -> AnalysisReport {
        // Classification is pure and cheap, so the cached report still
        // carries category and risk without any evaluator work.
        let category = classify(request.content());
        let risk = assess_risk(request.content(), category, request.priority());

        AnalysisReport {
            verdict: consensus.verdict,
            confidence: consensus.confidence,
            model_count: consensus.model_count,
            agreement: consensus.agreement,
            sources: consensus.sources.into_iter().collect(),
            category,
            risk,
            processing_path: vec![
                Stage::CacheHit.as_str().to_string(),
                Stage::GenerateReport.as_str().to_string(),
            ],
            cached: true,
            processing_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    fn assemble_report(
        mut state: WorkflowState,
        consensus: ConsensusResult,
        started: std::time::Instant,
    ) -> AnalysisReport {
        state.visit(Stage::GenerateReport);

        AnalysisReport {
            verdict: consensus.verdict,
            confidence: consensus.confidence,
            model_count: consensus.model_count,
            agreement: consensus.agreement,
            sources: consensus.sources.into_iter().collect(),
            category: state.category.unwrap_or(ContentCategory::General),
            risk: state.risk.unwrap_or(RiskLevel::Low),
            processing_path: state.path_names(),
            cached: false,
            processing_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

/// Builder for [`WorkflowEngine`].
pub struct WorkflowEngineBuilder {
    evaluators: Vec<Arc<dyn Evaluator>>,
    cache: Option<Arc<dyn ResultCache>>,
    quota: Option<Arc<QuotaLedger>>,
    config: EngineConfig,
}

impl WorkflowEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
            cache: None,
            quota: None,
            config: EngineConfig::default(),
        }
    }

    /// Register an evaluator. Order matters: the first registered
    /// evaluator serves the direct-verification path.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    /// Set the result cache.
    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the quota ledger.
    pub fn quota(mut self, quota: Arc<QuotaLedger>) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine. At least one evaluator must be registered.
    pub fn build(self) -> Result<WorkflowEngine, BuildError> {
        if self.evaluators.is_empty() {
            return Err(BuildError::NoEvaluators);
        }

        Ok(WorkflowEngine {
            evaluators: self.evaluators,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(crate::cache::MokaResultCache::default())),
            quota: self
                .quota
                .unwrap_or_else(|| Arc::new(QuotaLedger::new(crate::quota::Plan::Free))),
            config: self.config,
        })
    }
}

impl Default for WorkflowEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MokaResultCache};
    use crate::providers::ProviderError;
    use crate::quota::Plan;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Content that classifies health + viral → high risk → fan-out.
    const HIGH_RISK: &str =
        "BREAKING: drinking bleach cures all diseases. Share before they delete this!";

    // Content that classifies general, no viral markers → low risk → direct.
    const LOW_RISK: &str = "A local bakery sold out of croissants this morning.";

    #[derive(Clone)]
    enum Script {
        Succeed(Verdict, f64),
        SucceedWithSources(Verdict, f64, &'static [&'static str]),
        Fail,
        Hang,
    }

    struct ScriptedEvaluator {
        name: String,
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEvaluator {
        fn new(name: &str, script: Script) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let evaluator = Arc::new(Self {
                name: name.to_string(),
                script,
                calls: Arc::clone(&calls),
            });
            (evaluator, calls)
        }
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(
            &self,
            _content: &str,
            _sources: &[String],
        ) -> Result<ProviderVerdict, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Succeed(verdict, confidence) => Ok(ProviderVerdict {
                    provider: self.name.clone(),
                    verdict: *verdict,
                    confidence: *confidence,
                    raw_text: format!("VERDICT: {verdict}\nCONFIDENCE: {confidence}"),
                    sources: Default::default(),
                }),
                Script::SucceedWithSources(verdict, confidence, sources) => Ok(ProviderVerdict {
                    provider: self.name.clone(),
                    verdict: *verdict,
                    confidence: *confidence,
                    raw_text: String::new(),
                    sources: sources.iter().map(|s| s.to_string()).collect(),
                }),
                Script::Fail => Err(ProviderError::HttpError("connection refused".to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Err(ProviderError::HttpError("unreachable".to_string()))
                }
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn engine_with(scripts: &[(&str, Script)]) -> (WorkflowEngine, Vec<Arc<AtomicUsize>>) {
        let mut builder = WorkflowEngine::builder();
        let mut counters = Vec::new();
        for (name, script) in scripts {
            let (evaluator, calls) = ScriptedEvaluator::new(name, script.clone());
            builder = builder.evaluator(evaluator);
            counters.push(calls);
        }
        (builder.build().unwrap(), counters)
    }

    fn request(content: &str) -> AnalysisRequest {
        AnalysisRequest::text(content).unwrap()
    }

    #[test]
    fn test_build_requires_an_evaluator() {
        assert!(matches!(
            WorkflowEngine::builder().build(),
            Err(BuildError::NoEvaluators)
        ));
    }

    #[tokio::test]
    async fn test_weighted_consensus_end_to_end() {
        // TRUE/90, TRUE/80, FALSE/60 → TRUE, confidence 79, agreement ≈ 0.74
        let (engine, _) = engine_with(&[
            ("gpt-4", Script::Succeed(Verdict::True, 90.0)),
            ("gemini", Script::Succeed(Verdict::True, 80.0)),
            ("perplexity", Script::Succeed(Verdict::False, 60.0)),
        ]);

        let report = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();

        assert_eq!(report.verdict, Verdict::True);
        assert_eq!(report.confidence, 79.0);
        assert_eq!(report.model_count, 3);
        assert!((report.agreement - 1.7 / 2.3).abs() < 1e-9);
        assert_eq!(report.risk, RiskLevel::High);
        assert!(!report.cached);
    }

    #[tokio::test]
    async fn test_high_risk_audit_trail() {
        let (engine, _) = engine_with(&[("gpt-4", Script::Succeed(Verdict::False, 95.0))]);

        let report = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();

        assert_eq!(
            report.processing_path,
            vec![
                "classify_content",
                "assess_risk",
                "parallel_analysis",
                "source_attribution",
                "calculate_consensus",
                "generate_report",
            ]
        );
    }

    #[tokio::test]
    async fn test_low_risk_takes_direct_path() {
        let (engine, counters) = engine_with(&[
            ("gpt-4", Script::Succeed(Verdict::True, 85.0)),
            ("gemini", Script::Succeed(Verdict::True, 85.0)),
            ("perplexity", Script::Succeed(Verdict::True, 85.0)),
        ]);

        let report = engine.analyze("alice", &request(LOW_RISK)).await.unwrap();

        assert_eq!(report.risk, RiskLevel::Low);
        assert_eq!(report.model_count, 1);
        assert!(report
            .processing_path
            .contains(&"direct_verification".to_string()));

        // Only the first evaluator runs on the direct path.
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
        assert_eq!(counters[1].load(Ordering::SeqCst), 0);
        assert_eq!(counters[2].load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_degrades_gracefully() {
        // Two evaluators time out, one returns MIXED/70: the analysis
        // succeeds with the reduced contributor count visible.
        let (engine, _) = engine_with(&[
            ("gpt-4", Script::Hang),
            ("gemini", Script::Succeed(Verdict::Mixed, 70.0)),
            ("perplexity", Script::Hang),
        ]);

        let report = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();

        assert_eq!(report.verdict, Verdict::Mixed);
        assert_eq!(report.confidence, 70.0);
        assert_eq!(report.agreement, 1.0);
        assert_eq!(report.model_count, 1);
    }

    #[tokio::test]
    async fn test_all_evaluators_failed() {
        let (engine, _) = engine_with(&[
            ("gpt-4", Script::Fail),
            ("gemini", Script::Fail),
            ("perplexity", Script::Fail),
        ]);

        let error = engine
            .analyze("alice", &request(HIGH_RISK))
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::AllEvaluatorsFailed));

        // No cache entry was written and no quota consumed.
        let retry_error = engine
            .analyze("alice", &request(HIGH_RISK))
            .await
            .unwrap_err();
        assert!(matches!(retry_error, AnalysisError::AllEvaluatorsFailed));
        assert_eq!(engine.quota().usage("alice").daily.used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_with_zero_verdicts_times_out() {
        let config = EngineConfig {
            adapter_timeout: Duration::from_secs(15),
            overall_deadline: Duration::from_secs(10),
        };
        let (evaluator, _) = ScriptedEvaluator::new("gpt-4", Script::Hang);
        let engine = WorkflowEngine::builder()
            .evaluator(evaluator)
            .config(config)
            .build()
            .unwrap();

        let error = engine
            .analyze("alice", &request(HIGH_RISK))
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::AnalysisTimedOut));
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_fan_out() {
        let (engine, counters) =
            engine_with(&[("gpt-4", Script::Succeed(Verdict::True, 90.0))]);

        let first = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();
        assert!(!first.cached);
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);

        let second = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.verdict, first.verdict);
        assert_eq!(second.confidence, first.confidence);
        assert_eq!(second.processing_path, vec!["cache_hit", "generate_report"]);

        // Zero additional evaluator calls, and only one quota unit spent.
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
        assert_eq!(engine.quota().usage("alice").daily.used, 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_before_any_evaluator_call() {
        let quota = Arc::new(QuotaLedger::new(Plan::Free));
        let (evaluator, calls) =
            ScriptedEvaluator::new("gpt-4", Script::Succeed(Verdict::True, 90.0));
        let engine = WorkflowEngine::builder()
            .evaluator(evaluator)
            .quota(Arc::clone(&quota))
            .build()
            .unwrap();

        // Free plan: 10 per day. Distinct content avoids cache hits.
        for i in 0..10 {
            let content = format!("{HIGH_RISK} variant {i}");
            engine.analyze("alice", &request(&content)).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 10);

        let error = engine
            .analyze("alice", &request(&format!("{HIGH_RISK} variant 10")))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AnalysisError::Quota(QuotaError::Exceeded { .. })
        ));

        // The denied request made no evaluator calls.
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_sources_merge_trusted_and_cited() {
        let (engine, _) = engine_with(&[(
            "perplexity",
            Script::SucceedWithSources(Verdict::False, 90.0, &["https://who.int/bleach"]),
        )]);

        let report = engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();

        // Health category brings WHO/CDC/PubMed; the citation is merged in.
        assert!(report.sources.contains(&"WHO".to_string()));
        assert!(report.sources.contains(&"CDC".to_string()));
        assert!(report
            .sources
            .contains(&"https://who.int/bleach".to_string()));
    }

    struct FailingCache;

    #[async_trait]
    impl ResultCache for FailingCache {
        async fn get(
            &self,
            _fingerprint: &Fingerprint,
        ) -> Result<Option<ConsensusResult>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn put(
            &self,
            _fingerprint: &Fingerprint,
            _result: ConsensusResult,
        ) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn invalidate(&self, _fingerprint: &Fingerprint) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_to_miss() {
        let (evaluator, calls) =
            ScriptedEvaluator::new("gpt-4", Script::Succeed(Verdict::True, 90.0));
        let engine = WorkflowEngine::builder()
            .evaluator(evaluator)
            .cache(Arc::new(FailingCache))
            .build()
            .unwrap();

        // Both runs succeed; each pays the evaluator cost.
        engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();
        engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_result_expires_with_store() {
        let cache = Arc::new(MokaResultCache::new(16, Duration::from_millis(50)));
        let (evaluator, calls) =
            ScriptedEvaluator::new("gpt-4", Script::Succeed(Verdict::True, 90.0));
        let engine = WorkflowEngine::builder()
            .evaluator(evaluator)
            .cache(cache)
            .build()
            .unwrap();

        engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.analyze("alice", &request(HIGH_RISK)).await.unwrap();

        // TTL elapsed between runs, so the second paid the full cost.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_audit_record_fields() {
        let (engine, _) = engine_with(&[("gpt-4", Script::Succeed(Verdict::False, 88.0))]);

        let req = request(HIGH_RISK);
        let fingerprint = Fingerprint::of(req.content());
        let report = engine.analyze("alice", &req).await.unwrap();
        let record = report.audit_record("alice", &fingerprint);

        assert_eq!(record.caller_id, "alice");
        assert_eq!(record.content_hash.len(), 64);
        assert_eq!(record.verdict, Verdict::False);
        assert_eq!(record.confidence, 88.0);
        assert!(record.sources.is_array());
    }
}
