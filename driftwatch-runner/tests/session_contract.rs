//! Collaborator contract of the evaluation session.
//!
//! Uses in-memory fakes to verify call order, exactly-once delivery, and that
//! collaborator failures are reported as warnings instead of errors.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use driftwatch_core::synthetic::{simulate_features, simulate_pair, DriftInjection};
use driftwatch_core::{DriftTier, EvaluationConfig, EvaluationRecord, InvalidInputError, SampleRole};
use driftwatch_runner::{
    Collaborator, CsvDriftLog, Diagnostic, DriftAlert, EdgeCache, EvaluationSession, FeatureFrame,
    FeatureStreamMonitor, InMemoryMetrics, LogAppender, MetricsSink, MonitorConfig, Notifier,
    SinkError,
};

// ── Fakes ────────────────────────────────────────────────────────────

type Journal = Arc<Mutex<Vec<&'static str>>>;

struct FakeLog {
    journal: Journal,
    records: Mutex<Vec<EvaluationRecord>>,
    fail: bool,
}

impl FakeLog {
    fn new(journal: &Journal, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            records: Mutex::new(Vec::new()),
            fail,
        })
    }
}

impl LogAppender for FakeLog {
    fn append(&self, record: &EvaluationRecord) -> Result<(), SinkError> {
        self.journal.lock().unwrap().push("log");
        if self.fail {
            return Err(SinkError::Rejected("disk full".into()));
        }
        self.records.lock().unwrap().push(*record);
        Ok(())
    }
}

struct FakeMetrics {
    journal: Journal,
}

impl MetricsSink for FakeMetrics {
    fn observe(&self, _: &EvaluationRecord) -> Result<(), SinkError> {
        self.journal.lock().unwrap().push("metrics");
        Ok(())
    }
}

struct FakeNotifier {
    journal: Journal,
    alerts: Mutex<Vec<DriftAlert>>,
    fail: bool,
}

impl FakeNotifier {
    fn new(journal: &Journal, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            alerts: Mutex::new(Vec::new()),
            fail,
        })
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, alert: &DriftAlert) -> Result<(), SinkError> {
        self.journal.lock().unwrap().push("notify");
        if self.fail {
            return Err(SinkError::Rejected("webhook returned 503".into()));
        }
        self.alerts.lock().unwrap().push(*alert);
        Ok(())
    }
}

struct Harness {
    journal: Journal,
    log: Arc<FakeLog>,
    notifier: Arc<FakeNotifier>,
    session: EvaluationSession,
}

fn harness(log_fails: bool, notifier_fails: bool) -> Harness {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let log = FakeLog::new(&journal, log_fails);
    let notifier = FakeNotifier::new(&journal, notifier_fails);
    let session = EvaluationSession::new(EvaluationConfig::default())
        .unwrap()
        .with_log(log.clone())
        .with_metrics(Arc::new(FakeMetrics {
            journal: journal.clone(),
        }))
        .with_notifier(notifier.clone());
    Harness {
        journal,
        log,
        notifier,
        session,
    }
}

fn stable() -> (Vec<f64>, Vec<f64>) {
    let pair = simulate_pair(5, 2000, 0.0, 0.0, 1.0);
    (pair.reference, pair.current)
}

fn drifted() -> (Vec<f64>, Vec<f64>) {
    let pair = simulate_pair(42, 200, 50.0, 60.0, 5.0);
    (pair.reference, pair.current)
}

// ── Ordering and exactly-once ────────────────────────────────────────

#[test]
fn no_drift_logs_and_observes_without_notifying() {
    let h = harness(false, false);
    let (reference, current) = stable();

    let outcome = h.session.evaluate(&reference, &current).unwrap();

    assert_eq!(outcome.record.drift_tier, DriftTier::NoDrift);
    assert_eq!(*h.journal.lock().unwrap(), vec!["log", "metrics"]);
    assert_eq!(*h.log.records.lock().unwrap(), vec![outcome.record]);
    assert!(h.notifier.alerts.lock().unwrap().is_empty());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn drift_notifies_after_log_and_metrics() {
    let h = harness(false, false);
    let (reference, current) = drifted();

    let outcome = h.session.evaluate(&reference, &current).unwrap();

    assert_eq!(outcome.record.drift_tier, DriftTier::LikelyDrift);
    assert_eq!(*h.journal.lock().unwrap(), vec!["log", "metrics", "notify"]);

    let alerts = h.notifier.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0], DriftAlert::from(&outcome.record));
}

// ── Failure isolation ────────────────────────────────────────────────

#[test]
fn failing_notifier_does_not_block_log_or_raise() {
    let h = harness(false, true);
    let (reference, current) = drifted();

    let outcome = h.session.evaluate(&reference, &current).unwrap();

    assert_eq!(h.log.records.lock().unwrap().len(), 1);
    assert_eq!(
        outcome.warnings,
        vec![Diagnostic::CollaboratorFailure {
            collaborator: Collaborator::Notifier,
            message: "webhook returned 503".into(),
        }]
    );
}

#[test]
fn failing_log_still_reaches_metrics_and_notifier() {
    let h = harness(true, false);
    let (reference, current) = drifted();

    let outcome = h.session.evaluate(&reference, &current).unwrap();

    assert_eq!(*h.journal.lock().unwrap(), vec!["log", "metrics", "notify"]);
    assert_eq!(h.notifier.alerts.lock().unwrap().len(), 1);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [Diagnostic::CollaboratorFailure {
            collaborator: Collaborator::Log,
            ..
        }]
    ));
}

#[test]
fn invalid_input_calls_no_collaborator() {
    let h = harness(false, false);
    let err = h.session.evaluate(&[], &[1.0, 2.0, 3.0]).unwrap_err();

    assert_eq!(err, InvalidInputError::EmptySample(SampleRole::Reference));
    assert!(err.to_string().contains("Input arrays must not be empty"));
    assert!(h.journal.lock().unwrap().is_empty());
}

// ── Multi-feature ────────────────────────────────────────────────────

#[test]
fn feature_evaluation_records_the_mean_once() {
    let h = harness(false, false);
    let (ref_a, cur_a) = drifted();
    let (ref_b, cur_b) = stable();
    let reference = FeatureFrame::new()
        .with_column("a", ref_a)
        .with_column("b", ref_b)
        .with_column("only_ref", vec![1.0]);
    let current = FeatureFrame::new()
        .with_column("a", cur_a)
        .with_column("b", cur_b);

    let outcome = h.session.evaluate_features(&reference, &current).unwrap();

    assert_eq!(outcome.report.features.len(), 2);
    let mean = (outcome.report.features[0].psi + outcome.report.features[1].psi) / 2.0;
    assert_eq!(
        outcome.record.psi_score,
        driftwatch_core::round_psi(mean)
    );
    assert_eq!(h.log.records.lock().unwrap().len(), 1);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, Diagnostic::MissingFeature(m) if m.column == "only_ref")));
}

// ── Edge cache ───────────────────────────────────────────────────────

#[test]
fn cached_session_matches_uncached_and_reuses_edges() {
    let (reference, current) = drifted();
    let cache = Arc::new(EdgeCache::new());
    let cached = EvaluationSession::new(EvaluationConfig::default())
        .unwrap()
        .with_edge_cache(cache.clone());
    let plain = EvaluationSession::new(EvaluationConfig::default()).unwrap();

    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let a = cached.evaluate_at(&reference, &current, ts).unwrap();
    let b = cached.evaluate_at(&reference, &current, ts).unwrap();
    let c = plain.evaluate_at(&reference, &current, ts).unwrap();

    assert_eq!(a.record, c.record);
    assert_eq!(b.record, c.record);
    assert_eq!(cache.stats(), (1, 1));
}

// ── Log round-trip ───────────────────────────────────────────────────

#[test]
fn appended_records_read_back_with_matching_scores_and_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(CsvDriftLog::new(dir.path().join("logs/psi_drift_log.csv")));
    let metrics = Arc::new(InMemoryMetrics::new());
    let session = EvaluationSession::new(EvaluationConfig::default())
        .unwrap()
        .with_log(log.clone())
        .with_metrics(metrics.clone());

    let n = 12;
    let mut written = Vec::new();
    for i in 0..n {
        let pair = simulate_pair(i, 300, 0.0, i as f64 * 0.1, 1.0);
        let ts = Utc.timestamp_opt(1_714_521_600 + i as i64 * 60, 0).unwrap();
        written.push(session.evaluate_at(&pair.reference, &pair.current, ts).unwrap().record);
    }

    let read = log.read_all().unwrap();
    assert_eq!(read.len(), n as usize);
    for (w, r) in written.iter().zip(&read) {
        assert_eq!(format!("{:.4}", w.psi_score), format!("{:.4}", r.psi_score));
        assert_eq!(w.drift_tier, r.drift_tier);
        assert_eq!(w.timestamp, r.timestamp);
    }

    let snap = metrics.snapshot();
    assert_eq!(snap.evaluations, n);
    assert_eq!(snap.last_psi, Some(written[n as usize - 1].psi_score));
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn shared_session_is_usable_from_many_threads() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(CsvDriftLog::new(dir.path().join("drift.csv")));
    let session = EvaluationSession::new(EvaluationConfig::default())
        .unwrap()
        .with_log(log.clone());

    std::thread::scope(|scope| {
        for seed in 0..8u64 {
            let session = &session;
            scope.spawn(move || {
                let pair = simulate_pair(seed, 500, 0.0, 0.3, 1.0);
                session.evaluate(&pair.reference, &pair.current).unwrap();
            });
        }
    });

    let content = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(content.lines().count(), 9);
    assert_eq!(log.read_all().unwrap().len(), 8);
}

// ── Streaming feature rows ───────────────────────────────────────────

#[test]
fn streamed_feature_rows_alert_once_on_mean_psi() {
    let h = harness(false, false);
    let sim = simulate_features(42, 300, 5, DriftInjection::strong());
    let reference = sim
        .names
        .iter()
        .zip(&sim.reference)
        .fold(FeatureFrame::new(), |frame, (name, values)| {
            frame.with_column(name.as_str(), values.clone())
        });
    let config = MonitorConfig {
        window_size: 300,
        check_interval: 300,
        min_observations: 300,
    };
    let mut monitor = FeatureStreamMonitor::new(h.session, reference, config).unwrap();

    let mut outcomes = Vec::new();
    for i in 0..sim.rows() {
        let row: Vec<f64> = sim.current.iter().map(|column| column[i]).collect();
        if let Some(outcome) = monitor.push_row(&row).unwrap() {
            outcomes.push(outcome);
        }
    }

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.report.features.len(), 5);
    assert_eq!(outcome.record.drift_tier, DriftTier::LikelyDrift);
    let drifted: Vec<&str> = outcome.report.drifted().map(|f| f.name.as_str()).collect();
    assert!(drifted.contains(&"feature1"), "{drifted:?}");
    assert!(drifted.contains(&"feature2"), "{drifted:?}");

    assert_eq!(*h.journal.lock().unwrap(), vec!["log", "metrics", "notify"]);
    assert_eq!(h.log.records.lock().unwrap().as_slice(), &[outcome.record]);
    assert_eq!(h.notifier.alerts.lock().unwrap().len(), 1);
}
