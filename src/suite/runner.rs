//! Suite runner
//!
//! Drives a run through its phases: setup and pre-flight, spec execution,
//! teardown, then report emission. Phase failures are collected into the
//! report instead of aborting the process.

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::environment;
use super::{Spec, SuiteContext};
use crate::models::{SpecReport, SuitePhase, SuiteReport};
use crate::reporters::Reporter;
use crate::utils::timer::{PhaseClock, Timer};

pub struct SuiteRunner {
    description: String,
    context: Arc<SuiteContext>,
    specs: Vec<Arc<dyn Spec>>,
    reporters: Vec<Box<dyn Reporter>>,
    concurrency: usize,
    focus: Option<String>,
    skip: Option<String>,
    phase: SuitePhase,
    clock: PhaseClock,
}

impl SuiteRunner {
    pub fn new(description: impl Into<String>, context: SuiteContext) -> Self {
        Self {
            description: description.into(),
            context: Arc::new(context),
            specs: Vec::new(),
            reporters: Vec::new(),
            concurrency: 1,
            focus: None,
            skip: None,
            phase: SuitePhase::Unstarted,
            clock: PhaseClock::new(),
        }
    }

    pub fn with_specs(mut self, specs: Vec<Arc<dyn Spec>>) -> Self {
        self.specs = specs;
        self
    }

    pub fn with_reporters(mut self, reporters: Vec<Box<dyn Reporter>>) -> Self {
        self.reporters = reporters;
        self
    }

    /// Maximum specs in flight; values below 1 are treated as 1
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Only run specs whose name contains `focus`
    pub fn focus(mut self, focus: Option<String>) -> Self {
        self.focus = focus;
        self
    }

    /// Skip specs whose name contains `skip`
    pub fn skip(mut self, skip: Option<String>) -> Self {
        self.skip = skip;
        self
    }

    pub fn phase(&self) -> SuitePhase {
        self.phase
    }

    fn transition(&mut self, next: SuitePhase) {
        debug!("Suite phase {} -> {}", self.phase(), next);
        self.phase = next;
        self.clock.enter(next);
    }

    /// Run the whole suite and return its report.
    ///
    /// Teardown runs whenever setup created the namespace, even if the
    /// pre-flight check failed afterwards. Reporters see every run.
    pub async fn run(mut self) -> SuiteReport {
        let mut report = SuiteReport::new(&self.description);
        info!("Starting {}", self.description);

        self.transition(SuitePhase::Setup);
        let namespace_created = match environment::setup(&self.context).await {
            Ok(()) => true,
            Err(e) => {
                error!("Setup failed: {}", e);
                report.setup_failure = Some(e.to_string());
                false
            }
        };

        if namespace_created {
            if let Err(e) = environment::preflight(&self.context).await {
                error!("Pre-flight check failed: {}", e);
                report.setup_failure = Some(e.to_string());
            }
        }

        if report.setup_failure.is_none() {
            self.transition(SuitePhase::Running);
            report.specs = self.run_specs().await;
        } else {
            warn!("Skipping {} specs after setup failure", self.specs.len());
        }

        if namespace_created {
            self.transition(SuitePhase::Teardown);
            if let Err(e) = environment::teardown(&self.context).await {
                error!("Teardown failed: {}", e);
                report.teardown_failure = Some(e.to_string());
            }
        }

        self.clock.close();
        report.phases = self.clock.timings();
        report.finished_at = Utc::now();

        self.transition(SuitePhase::ReportEmission);
        self.emit(&report);

        self.transition(SuitePhase::Terminal);
        info!(
            "Finished {}: {}/{} specs passed",
            self.description,
            report.passed(),
            report.total()
        );
        report
    }

    fn is_filtered_out(&self, name: &str) -> bool {
        let unfocused = self
            .focus
            .as_deref()
            .map(|f| !name.contains(f))
            .unwrap_or(false);
        let skipped = self
            .skip
            .as_deref()
            .map(|s| name.contains(s))
            .unwrap_or(false);
        unfocused || skipped
    }

    async fn run_specs(&self) -> Vec<SpecReport> {
        info!(
            "Running {} specs (max {} concurrent)",
            self.specs.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::new();

        for spec in &self.specs {
            let name = spec.name();
            if self.is_filtered_out(&name) {
                handles.push(tokio::spawn(async move {
                    SpecReport::skipped(name, "filtered by focus/skip")
                }));
                continue;
            }

            let spec = spec.clone();
            let ctx = self.context.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();

                info!("Running spec: {}", name);
                let timer = Timer::start(&name);
                let outcome = AssertUnwindSafe(spec.run(&ctx)).catch_unwind().await;
                let duration_ms = timer.stop();

                let report = match outcome {
                    Ok(Ok(())) => SpecReport::passed(name, duration_ms),
                    Ok(Err(e)) => SpecReport::failed(name, duration_ms, format!("{e:#}")),
                    Err(payload) => {
                        SpecReport::panicked(name, duration_ms, panic_message(payload.as_ref()))
                    }
                };
                info!("  {}", report);
                report
            }));
        }

        let names: Vec<String> = self.specs.iter().map(|s| s.name()).collect();
        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, name)| {
                joined.unwrap_or_else(|e| SpecReport::panicked(name, 0, e.to_string()))
            })
            .collect()
    }

    fn emit(&self, report: &SuiteReport) {
        for reporter in &self.reporters {
            match reporter.render(report) {
                Ok(()) => info!("Rendered {} report", reporter.name()),
                Err(e) => warn!("{} reporter failed: {:#}", reporter.name(), e),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "spec panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{api_error, ClusterError, MockClusterClient};
    use crate::kubevirt::{VirtualMachineClusterInstancetype, VirtualMachineClusterPreference};
    use crate::models::SpecState;
    use crate::suite::context::testing::context_with;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct RecordingSpec {
        name: &'static str,
        journal: Journal,
        outcome: fn() -> anyhow::Result<()>,
    }

    #[async_trait]
    impl Spec for RecordingSpec {
        fn name(&self) -> String {
            self.name.to_string()
        }

        async fn run(&self, _ctx: &SuiteContext) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(format!("spec:{}", self.name));
            (self.outcome)()
        }
    }

    fn spec(
        name: &'static str,
        journal: &Journal,
        outcome: fn() -> anyhow::Result<()>,
    ) -> Arc<dyn Spec> {
        Arc::new(RecordingSpec {
            name,
            journal: journal.clone(),
            outcome,
        })
    }

    fn pass() -> anyhow::Result<()> {
        Ok(())
    }

    fn fail() -> anyhow::Result<()> {
        anyhow::bail!("guest never booted")
    }

    fn assert_panics() -> anyhow::Result<()> {
        assert_eq!(1 + 1, 3, "arithmetic is broken");
        Ok(())
    }

    /// Mock with a healthy cluster that journals namespace calls
    fn healthy_cluster(journal: &Journal) -> MockClusterClient {
        let mut mock = MockClusterClient::new();
        let j = journal.clone();
        mock.expect_create_namespace().times(1).returning(move |_| {
            j.lock().unwrap().push("create-namespace".to_string());
            Ok(())
        });
        mock.expect_list_cluster_instancetypes().returning(|| {
            Ok(vec![VirtualMachineClusterInstancetype::new(
                "u1.medium",
                Default::default(),
            )])
        });
        mock.expect_list_cluster_preferences().returning(|| {
            Ok(vec![VirtualMachineClusterPreference::new(
                "fedora",
                Default::default(),
            )])
        });
        let j = journal.clone();
        mock.expect_delete_namespace().times(1).returning(move |_| {
            j.lock().unwrap().push("delete-namespace".to_string());
            Ok(())
        });
        mock
    }

    struct FailingReporter;

    impl Reporter for FailingReporter {
        fn name(&self) -> &str {
            "failing"
        }

        fn render(&self, _report: &SuiteReport) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct CountingReporter(Arc<Mutex<Vec<usize>>>);

    impl Reporter for CountingReporter {
        fn name(&self) -> &str {
            "counting"
        }

        fn render(&self, report: &SuiteReport) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(report.total());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_end_to_end_order_and_success() {
        let journal: Journal = Arc::default();
        let ctx = context_with(healthy_cluster(&journal));

        let report = SuiteRunner::new("Functional test suite", ctx)
            .with_specs(vec![
                spec("first", &journal, pass),
                spec("second", &journal, pass),
            ])
            .run()
            .await;

        assert!(report.succeeded());
        assert_eq!(report.passed(), 2);
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "create-namespace",
                "spec:first",
                "spec:second",
                "delete-namespace"
            ]
        );
        let phases: Vec<_> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(
            phases,
            vec![SuitePhase::Setup, SuitePhase::Running, SuitePhase::Teardown]
        );
    }

    #[tokio::test]
    async fn test_spec_failures_are_isolated() {
        let journal: Journal = Arc::default();
        let ctx = context_with(healthy_cluster(&journal));

        let report = SuiteRunner::new("suite", ctx)
            .with_specs(vec![
                spec("boots", &journal, pass),
                spec("never boots", &journal, fail),
                spec("asserts", &journal, assert_panics),
                spec("also boots", &journal, pass),
            ])
            .concurrency(2)
            .run()
            .await;

        let states: Vec<_> = report.specs.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![
                SpecState::Passed,
                SpecState::Failed,
                SpecState::Panicked,
                SpecState::Passed
            ]
        );
        assert!(report.specs[1]
            .failure
            .as_deref()
            .unwrap()
            .contains("guest never booted"));
        assert!(report.specs[2]
            .failure
            .as_deref()
            .unwrap()
            .contains("arithmetic is broken"));
        assert!(!report.succeeded());
        assert!(journal
            .lock()
            .unwrap()
            .contains(&"delete-namespace".to_string()));
    }

    #[tokio::test]
    async fn test_preflight_failure_skips_specs_but_tears_down() {
        let journal: Journal = Arc::default();
        let mut mock = MockClusterClient::new();
        mock.expect_create_namespace().times(1).returning(|_| Ok(()));
        mock.expect_list_cluster_instancetypes().returning(|| Ok(vec![]));
        mock.expect_list_cluster_preferences().never();
        mock.expect_delete_namespace().times(1).returning(|_| Ok(()));

        let report = SuiteRunner::new("suite", context_with(mock))
            .with_specs(vec![spec("never runs", &journal, pass)])
            .run()
            .await;

        assert!(report.specs.is_empty());
        assert!(journal.lock().unwrap().is_empty());
        assert!(report
            .setup_failure
            .as_deref()
            .unwrap()
            .contains("VirtualMachineClusterInstancetypes"));
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn test_namespace_creation_failure_skips_teardown() {
        let journal: Journal = Arc::default();
        let mut mock = MockClusterClient::new();
        mock.expect_create_namespace().returning(|name| {
            Err(ClusterError::classify(
                api_error(409, "AlreadyExists"),
                "Namespace",
                name,
                "create",
            ))
        });
        mock.expect_list_cluster_instancetypes().never();
        mock.expect_delete_namespace().never();

        let rendered = Arc::new(Mutex::new(Vec::new()));
        let report = SuiteRunner::new("suite", context_with(mock))
            .with_specs(vec![spec("never runs", &journal, pass)])
            .with_reporters(vec![Box::new(CountingReporter(rendered.clone()))])
            .run()
            .await;

        assert!(report.setup_failure.is_some());
        assert!(report.teardown_failure.is_none());
        assert_eq!(*rendered.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_teardown_failure_fails_suite_after_specs_ran() {
        let journal: Journal = Arc::default();
        let mut mock = MockClusterClient::new();
        mock.expect_create_namespace().returning(|_| Ok(()));
        mock.expect_list_cluster_instancetypes().returning(|| {
            Ok(vec![VirtualMachineClusterInstancetype::new(
                "u1.small",
                Default::default(),
            )])
        });
        mock.expect_list_cluster_preferences().returning(|| {
            Ok(vec![VirtualMachineClusterPreference::new(
                "ubuntu",
                Default::default(),
            )])
        });
        mock.expect_delete_namespace().returning(|name| {
            Err(ClusterError::classify(
                api_error(403, "Forbidden"),
                "Namespace",
                name,
                "delete",
            ))
        });

        let report = SuiteRunner::new("suite", context_with(mock))
            .with_specs(vec![spec("passes", &journal, pass)])
            .run()
            .await;

        assert_eq!(report.passed(), 1);
        assert!(report.teardown_failure.is_some());
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn test_reporter_errors_do_not_change_outcome() {
        let journal: Journal = Arc::default();
        let rendered = Arc::new(Mutex::new(Vec::new()));

        let report = SuiteRunner::new("suite", context_with(healthy_cluster(&journal)))
            .with_specs(vec![spec("passes", &journal, pass)])
            .with_reporters(vec![
                Box::new(FailingReporter),
                Box::new(CountingReporter(rendered.clone())),
            ])
            .run()
            .await;

        assert!(report.succeeded());
        assert_eq!(*rendered.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_focus_and_skip() {
        let journal: Journal = Arc::default();

        let report = SuiteRunner::new("suite", context_with(healthy_cluster(&journal)))
            .with_specs(vec![
                spec("Fedora boots", &journal, pass),
                spec("Ubuntu 18.04 boots", &journal, pass),
                spec("Ubuntu 22.04 boots", &journal, pass),
            ])
            .focus(Some("Ubuntu".to_string()))
            .skip(Some("18.04".to_string()))
            .run()
            .await;

        let states: Vec<_> = report.specs.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![SpecState::Skipped, SpecState::Skipped, SpecState::Passed]
        );
        assert!(report.succeeded());
    }

    #[test]
    fn test_runner_starts_unstarted() {
        let runner =
            SuiteRunner::new("suite", context_with(MockClusterClient::new())).concurrency(0);
        assert_eq!(runner.phase(), SuitePhase::Unstarted);
        assert_eq!(runner.concurrency, 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "spec panicked");
    }
}
