use crate::flow::Flow;
use chrono::Utc;
use tokio::sync::broadcast;
use treecore::{
    Actor, EventBus, ExecutionEvent, ExecutionId, Outcome, RunOutcome, RunReport,
};

/// Drives a [`Flow`] through its lifecycle: setup, execution, the
/// guaranteed wrap-up, restart attempts and the post-run hook. The
/// event bus carries progress to any number of subscribers.
pub struct FlowRunner {
    events: EventBus,
}

impl FlowRunner {
    pub fn new() -> Self {
        Self {
            events: EventBus::new(256),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    /// Runs the flow to completion, re-running per its restart policy,
    /// and returns the report of the final attempt. The flow is
    /// destroyed afterwards and cannot be run again.
    pub async fn run(&self, flow: &mut Flow) -> RunReport {
        let mut attempt: u32 = 1;
        loop {
            let report = self.run_once(flow, attempt).await;
            if let Some(hook) = flow.post_run_hook() {
                hook(&report);
            }
            if flow.restart_policy().should_restart(&report) {
                tracing::info!(
                    flow = flow.name(),
                    attempt,
                    outcome = %report.outcome,
                    "restarting flow"
                );
                flow.reset();
                attempt += 1;
                continue;
            }
            flow.destroy();
            return report;
        }
    }

    async fn run_once(&self, flow: &mut Flow, attempt: u32) -> RunReport {
        let execution_id = ExecutionId::new_v4();
        let emitter = self.events.emitter(execution_id);
        let started_at = Utc::now();
        emitter.flow_started(flow.name());
        tracing::info!(flow = flow.name(), %execution_id, attempt, "starting flow");

        let ctx = flow.build_context(emitter.clone());
        let outcome = match flow.set_up(&ctx).await {
            Err(err) => {
                tracing::error!(flow = flow.name(), %err, "flow setup failed");
                ctx.push_message(format!("configuration error: {err}"));
                // children that did reach set-up still get their wrap-up
                flow.wrap_up().await;
                RunOutcome::Failed
            }
            Ok(()) => {
                let outcome = match flow.execute().await {
                    Ok(Outcome::Completed) => RunOutcome::Succeeded,
                    Ok(Outcome::Stopped) => RunOutcome::Stopped,
                    // already reported where it happened
                    Err(_) => RunOutcome::Failed,
                };
                flow.wrap_up().await;
                outcome
            }
        };

        let finished_at = Utc::now();
        let report = RunReport {
            execution_id,
            flow: flow.name().to_string(),
            outcome,
            messages: ctx.take_messages(),
            attempt,
            started_at,
            finished_at,
        };
        emitter.flow_finished(outcome, report.duration_ms());
        tracing::info!(
            flow = flow.name(),
            %execution_id,
            outcome = %outcome,
            duration_ms = report.duration_ms(),
            "flow finished"
        );
        report
    }
}

impl Default for FlowRunner {
    fn default() -> Self {
        Self::new()
    }
}
