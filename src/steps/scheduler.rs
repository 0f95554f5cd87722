// src/steps/scheduler.rs
//! Dependency-driven step execution.
//!
//! Steps start as soon as every dependency completed, up to `concurrency` at
//! once. A failed step takes its transitive dependents down with it without
//! invoking them; independent branches keep running and their data stays in
//! the job state.

use super::{ExecutionPlan, RunEnvironment, RunReport, Step, StepOutcome, StepStatus};
use crate::analytics;
use crate::constants::MAX_STEP_CONCURRENCY;
use crate::error::AppError;
use crate::error_recovery::panic_message;
use crate::types::StepId;
use chrono::Utc;
use futures::FutureExt;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use uuid::Uuid;

type StepResult = (StepId, Result<(), String>, Duration);

/// Executes plans with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Self::default_concurrency())
    }
}

impl Scheduler {
    /// A scheduler running at most `concurrency` steps at once.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.clamp(1, MAX_STEP_CONCURRENCY),
        }
    }

    /// CPU count, clamped to the supported range.
    pub fn default_concurrency() -> usize {
        num_cpus::get().clamp(1, MAX_STEP_CONCURRENCY)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Executes the plan and fails with the first failed step, if any.
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        env: &RunEnvironment,
    ) -> Result<RunReport, AppError> {
        self.execute(plan, env).await.into_result()
    }

    /// Executes the plan and reports every step's outcome.
    pub async fn execute(&self, plan: &ExecutionPlan, env: &RunEnvironment) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        env.logger.info(&format!(
            "Starting run {} with {} steps (concurrency {})",
            run_id,
            plan.len(),
            self.concurrency
        ));

        let steps: HashMap<&StepId, &Step> =
            plan.steps().iter().map(|step| (&step.id, step)).collect();
        let mut outcomes: IndexMap<StepId, StepOutcome> = IndexMap::with_capacity(plan.len());
        let mut waiting_on: HashMap<StepId, usize> = HashMap::with_capacity(plan.len());
        let mut ready: VecDeque<StepId> = VecDeque::new();

        for step in plan.steps() {
            let mut outcome = StepOutcome::pending();
            if step.depends_on.is_empty() {
                outcome.status = StepStatus::Ready;
                ready.push_back(step.id.clone());
            }
            waiting_on.insert(step.id.clone(), step.depends_on.len());
            outcomes.insert(step.id.clone(), outcome);
        }

        let mut running: JoinSet<StepResult> = JoinSet::new();
        let mut failed_step: Option<StepId> = None;

        loop {
            while running.len() < self.concurrency {
                let Some(id) = ready.pop_front() else {
                    break;
                };
                let Some(step) = steps.get(&id) else {
                    continue;
                };
                if let Some(outcome) = outcomes.get_mut(&id) {
                    outcome.status = StepStatus::Running;
                }
                env.logger.debug(&format!("Starting step {} ({})", id, step.name));
                running.spawn(run_step((*step).clone(), env.context_for(&id)));
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (id, result, elapsed) = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    env.logger
                        .warn(&format!("Step task ended without reporting: {}", e));
                    continue;
                }
            };

            let duration_ms = elapsed.as_millis() as u64;
            match result {
                Ok(()) => {
                    env.logger
                        .info(&format!("Step {} completed in {}ms", id, duration_ms));
                    if let Some(outcome) = outcomes.get_mut(&id) {
                        outcome.status = StepStatus::Completed;
                        outcome.duration_ms = Some(duration_ms);
                    }
                    for dependent in plan.dependents_of(&id) {
                        let Some(remaining) = waiting_on.get_mut(dependent) else {
                            continue;
                        };
                        *remaining = remaining.saturating_sub(1);
                        if *remaining > 0 {
                            continue;
                        }
                        if let Some(outcome) = outcomes.get_mut(dependent) {
                            if outcome.status == StepStatus::Pending {
                                outcome.status = StepStatus::Ready;
                                ready.push_back(dependent.clone());
                            }
                        }
                    }
                }
                Err(error) => {
                    log::error!("Step {} failed after {}ms: {}", id, duration_ms, error);
                    if let Some(outcome) = outcomes.get_mut(&id) {
                        outcome.status = StepStatus::Failed;
                        outcome.duration_ms = Some(duration_ms);
                        outcome.error = Some(error);
                    }
                    for dependent in plan.transitive_dependents(&id) {
                        if let Some(outcome) = outcomes.get_mut(&dependent) {
                            if matches!(outcome.status, StepStatus::Pending | StepStatus::Ready) {
                                outcome.status = StepStatus::FailedByPropagation;
                                outcome.caused_by = Some(id.clone());
                            }
                        }
                    }
                    failed_step.get_or_insert(id);
                }
            }
        }

        let snapshot = env.job_state.snapshot().await;
        let report = RunReport {
            run_id,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            outcomes,
            failed_step,
            summary: analytics::summarize(&snapshot),
            warn_events: env.logger.published_events(),
        };
        env.logger.info(&format!(
            "Run {} finished: {} completed, {} failed",
            report.run_id,
            report.count(StepStatus::Completed),
            report.count(StepStatus::Failed) + report.count(StepStatus::FailedByPropagation)
        ));
        report
    }
}

/// Runs one handler, turning errors and panics into a reportable message.
async fn run_step(step: Step, context: super::StepContext) -> StepResult {
    let started = Instant::now();
    let result = match AssertUnwindSafe(step.invoke(context)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("step panicked: {}", panic_message(panic.as_ref()))),
    };
    (step.id, result, started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebras::JobState;
    use crate::interpreters::{InMemoryJobState, RunLogger};
    use crate::steps::plan;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn env() -> RunEnvironment {
        RunEnvironment::new(
            Arc::new(InMemoryJobState::new()),
            Arc::new(RunLogger::new()),
        )
    }

    fn recording_step(
        id: &'static str,
        deps: &[&'static str],
        log: Arc<Mutex<Vec<&'static str>>>,
    ) -> Step {
        Step::new(StepId::from_static(id), id, move |_| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(id);
                Ok(())
            }
        })
        .depends_on(deps.iter().copied().map(StepId::from_static))
    }

    #[tokio::test]
    async fn sequential_run_respects_plan_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan(vec![
            recording_step("c", &["b"], log.clone()),
            recording_step("b", &["a"], log.clone()),
            recording_step("a", &[], log.clone()),
        ])
        .unwrap();

        let report = Scheduler::new(1).run(&plan, &env()).await.unwrap();

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(report.count(StepStatus::Completed), 3);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let steps = ["s1", "s2", "s3", "s4", "s5", "s6"]
            .into_iter()
            .map(|id| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                Step::new(StepId::from_static(id), id, move |_| {
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
            })
            .collect();
        let plan = plan(steps).unwrap();

        Scheduler::new(2).run(&plan, &env()).await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn panics_are_reported_as_failures() {
        let plan = plan(vec![Step::new(
            StepId::from_static("boom"),
            "boom",
            |_| async {
                let exploded = true;
                if exploded {
                    panic!("exploded");
                }
                Ok(())
            },
        )])
        .unwrap();

        let report = Scheduler::new(1).execute(&plan, &env()).await;

        let outcome = report.outcome("boom").unwrap();
        assert_eq!(outcome.status, StepStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("step panicked: exploded"));
    }

    #[tokio::test]
    async fn report_summarizes_job_state() {
        let plan = plan(vec![Step::new(
            StepId::from_static("fetch-users"),
            "Fetch users",
            |context: crate::steps::StepContext| async move {
                let user = crate::model::Entity::new("u1", "directory_user", ["User"])?;
                context.job_state.add_entity(user).await
            },
        )])
        .unwrap();

        let report = Scheduler::new(4).run(&plan, &env()).await.unwrap();

        assert_eq!(report.summary.total_entities, 1);
        assert_eq!(report.summary.entities_by_type.get("directory_user"), Some(&1));
    }

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(Scheduler::new(0).concurrency(), 1);
        assert_eq!(Scheduler::new(1000).concurrency(), MAX_STEP_CONCURRENCY);
    }
}
