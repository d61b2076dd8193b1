use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use treeactors::{
    Fail, IncVariable, InsertPosition, Recorder, SetStorageValue, SetVariable, StringConstants,
    StringInsert, VariableSource,
};
use tokio_util::sync::CancellationToken;
use treecore::{
    Actor, ActorBase, ActorKind, ActorState, ConfigError, ContinueOnError, EventEmitter,
    ExecError, ExecResult, FlowContext, Outcome, RestartLimit, RunOutcome, StopOnError, Storage,
    StorageName, Token, Value, VariableName, Variables,
};
use treeruntime::control::{Branch, Stop, StorageValueSequence, Tee, WhileLoop};
use treeruntime::{Expression, Flow, FlowRunner};

fn var(name: &str) -> VariableName {
    VariableName::new(name).expect("valid variable name")
}

fn slot(name: &str) -> StorageName {
    StorageName::new(name).expect("valid storage name")
}

/// Counter flow: SetVariable i=0, then a loop that emits, increments
/// and records. The recorded values are the pre-increment ones.
#[tokio::test]
async fn test_counter_flow_records_three_values() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("counter")
        .push(Box::new(SetVariable::new("init", var("i"), "0")))
        .push(Box::new(
            WhileLoop::new("loop", Box::new(Expression::new("@{i} < 3")))
                .push(Box::new(VariableSource::new("emit", var("i"))))
                .push(Box::new(IncVariable::new("inc", var("i"))))
                .push(Box::new(recorder)),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(
        records.values(),
        vec![Value::from("0"), Value::from("1"), Value::from("2")]
    );
}

/// Scenario C: a stored string is threaded through two insert steps,
/// the final value lands back in the slot and flows downstream.
#[tokio::test]
async fn test_storage_value_sequence_chains_and_forwards() {
    let recorder = Recorder::new("downstream");
    let records = recorder.handle();
    let mut flow = Flow::new("chain")
        .push(Box::new(
            StorageValueSequence::new("process", slot("s"))
                .push(Box::new(StringInsert::new(
                    "append",
                    InsertPosition::Back,
                    "-1",
                )))
                .push(Box::new(StringInsert::new(
                    "prepend",
                    InsertPosition::Front,
                    "1-",
                ))),
        ))
        .push(Box::new(recorder));
    let storage = Arc::clone(flow.storage());
    storage.put(slot("s"), Value::from("blah"));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(storage.get(&slot("s")), Some(Value::from("1-blah-1")));
    assert_eq!(records.values(), vec![Value::from("1-blah-1")]);
}

#[tokio::test]
async fn test_missing_storage_slot_fails_the_run() {
    let mut flow = Flow::new("chain").push(Box::new(
        StorageValueSequence::new("process", slot("absent")).push(Box::new(StringInsert::new(
            "append",
            InsertPosition::Back,
            "-1",
        ))),
    ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.messages[0].contains("absent"));
}

/// Sink probe that records its lifecycle transitions.
struct LifecycleProbe {
    base: ActorBase,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl LifecycleProbe {
    fn new(name: &str, log: Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            base: ActorBase::new(name),
            log,
        }
    }

    fn push(&self, entry: &'static str) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Actor for LifecycleProbe {
    fn actor_type(&self) -> &str {
        "test.lifecycle-probe"
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Sink
    }

    fn state(&self) -> ActorState {
        self.base.state()
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ConfigError> {
        self.base.begin_set_up(ctx)?;
        self.push("set_up");
        Ok(())
    }

    fn input(&mut self, _token: Token) -> Result<(), ExecError> {
        self.base.require_set_up()
    }

    async fn execute(&mut self) -> ExecResult {
        self.base.enter_execute()?;
        self.push("execute");
        self.base.leave_execute();
        Ok(Outcome::Completed)
    }

    async fn wrap_up(&mut self) {
        if !self.base.was_set_up() {
            return;
        }
        self.push("wrap_up");
        self.base.finish_wrap_up();
    }

    fn destroy(&mut self) {
        self.push("destroy");
        self.base.mark_destroyed();
    }
}

/// Strict policy: the failure aborts the run, actors downstream of the
/// failure never execute, and every set-up actor is wrapped up and
/// destroyed exactly once.
#[tokio::test]
async fn test_stop_on_error_skips_downstream_and_tears_down_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut flow = Flow::new("failing")
        .push(Box::new(StringConstants::new(
            "emit",
            vec!["x".into()],
        )))
        .push(Box::new(Fail::new("boom", "deliberate failure")))
        .push(Box::new(LifecycleProbe::new("probe", Arc::clone(&log))));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.messages, vec!["boom: actor 'boom' failed: deliberate failure".to_string()]);
    let log = log.lock().unwrap();
    assert_eq!(*log, vec!["set_up", "wrap_up", "destroy"]);
}

/// A failure deep inside a control actor surfaces exactly once: it is
/// recorded where it happened, and the enclosing levels unwind without
/// recording it again.
#[tokio::test]
async fn test_nested_failure_is_reported_once() {
    let mut flow = Flow::new("nested-failure")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(
            Tee::new("side").push(Box::new(Fail::new("boom", "deliberate failure"))),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(
        report.messages,
        vec!["boom: actor 'boom' failed: deliberate failure".to_string()]
    );
}

/// A failed activation leaves the actor idle and ready for the next
/// one, not stuck mid-execution.
#[tokio::test]
async fn test_failed_activation_leaves_actor_ready() {
    let mut source = VariableSource::new("emit", var("n"));
    let variables = Arc::new(Variables::new());
    let ctx = FlowContext::new(
        Arc::clone(&variables),
        Arc::new(Storage::new()),
        Arc::new(StopOnError),
        CancellationToken::new(),
        EventEmitter::disabled(),
    );
    source.set_up(&ctx).await.expect("set up");

    assert!(source.execute().await.is_err());
    assert_eq!(source.state(), ActorState::SetUp);

    variables.set(var("n"), "7");
    assert!(source.execute().await.is_ok());
    let token = source.output().expect("token after recovery");
    assert_eq!(*token.payload(), Value::from("7"));
}

/// Lenient policy: each failing activation is absorbed, the main path
/// keeps flowing and the run still succeeds, with every failure on
/// record.
#[tokio::test]
async fn test_continue_on_error_absorbs_failures() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("lenient")
        .push(Box::new(StringConstants::new(
            "emit",
            vec!["a".into(), "b".into()],
        )))
        .push(Box::new(
            Tee::new("side").push(Box::new(Fail::new("boom", "side failure"))),
        ))
        .push(Box::new(recorder))
        .with_error_policy(ContinueOnError);

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success());
    assert_eq!(report.messages.len(), 2);
    assert_eq!(records.values(), vec![Value::from("a"), Value::from("b")]);
}

/// `Stop` cancels the run cooperatively: remaining tokens are dropped,
/// the outcome is Stopped, not Failed.
#[tokio::test]
async fn test_stop_actor_cancels_the_run() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("stopping")
        .push(Box::new(StringConstants::new(
            "emit",
            vec!["a".into(), "b".into(), "c".into()],
        )))
        .push(Box::new(Tee::new("observe").push(Box::new(recorder))))
        .push(Box::new(Stop::new("halt").with_message("stopped on purpose")));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_stopped());
    assert_eq!(records.values(), vec![Value::from("a")]);
    assert_eq!(report.messages, vec!["halt: stopped on purpose".to_string()]);
}

/// The restart policy re-runs failed attempts with reset state; the
/// post-run hook fires exactly once per attempt.
#[tokio::test]
async fn test_restart_limit_reruns_failed_flow() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let hook_calls = Arc::new(AtomicU32::new(0));
    let hook_counter = Arc::clone(&hook_calls);
    let mut flow = Flow::new("flaky")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(Tee::new("observe").push(Box::new(recorder))))
        .push(Box::new(SetStorageValue::new("store", slot("seen"))))
        .push(Box::new(Fail::new("boom", "always down")))
        .with_restart_policy(RestartLimit::new(2))
        .with_post_run_hook(Box::new(move |report| {
            hook_counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(report.outcome, RunOutcome::Failed);
        }));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.attempt, 3);
    // each attempt reports its own failure, not the accumulated ones
    assert_eq!(report.messages.len(), 1);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 3);
    // the whole chain really re-ran every attempt
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_configuration_error_never_executes() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("misconfigured")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(Branch::new("empty")))
        .push(Box::new(recorder));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.messages[0].starts_with("configuration error"));
    assert!(records.is_empty());
}

/// Variables expand at execution time, so tokens materialized inside a
/// loop body observe the current values.
#[tokio::test]
async fn test_lazy_variable_expansion_in_loop_body() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("lazy")
        .push(Box::new(SetVariable::new("init", var("i"), "0")))
        .push(Box::new(
            WhileLoop::new("loop", Box::new(Expression::new("@{i} < 2")))
                .push(Box::new(StringConstants::new(
                    "emit",
                    vec!["round @{i}".into()],
                )))
                .push(Box::new(IncVariable::new("inc", var("i"))))
                .push(Box::new(recorder)),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(
        records.values(),
        vec![Value::from("round 0"), Value::from("round 1")]
    );
}
