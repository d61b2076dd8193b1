use std::sync::Arc;
use treeactors::{
    AppendArchive, CallableSink, CloseArchive, IncVariable, InsertPosition, NewArchive, Recorder,
    SetVariable, Start, StringConstants, StringInsert, VariableSource,
};
use treecore::{RunOutcome, StorageName, Value, VariableName};
use treeruntime::control::{Branch, CallableActors, Sequence, Tee, Trigger, WhileLoop};
use treeruntime::{Expression, Flow, FlowRunner};

fn var(name: &str) -> VariableName {
    VariableName::new(name).expect("valid variable name")
}

fn slot(name: &str) -> StorageName {
    StorageName::new(name).expect("valid storage name")
}

/// Tee invariant: the token leaving the Tee is the one that entered,
/// whatever the side branch derived from its copy.
#[tokio::test]
async fn test_tee_forwards_the_original_token() {
    let side = Recorder::new("side-record");
    let side_records = side.handle();
    let main = Recorder::new("main-record");
    let main_records = main.handle();
    let mut flow = Flow::new("tee")
        .push(Box::new(StringConstants::new(
            "emit",
            vec!["payload".into()],
        )))
        .push(Box::new(
            Tee::new("side")
                .push(Box::new(StringInsert::new(
                    "mangle",
                    InsertPosition::Back,
                    "-side",
                )))
                .push(Box::new(side)),
        ))
        .push(Box::new(main));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(side_records.values(), vec![Value::from("payload-side")]);
    assert_eq!(main_records.values(), vec![Value::from("payload")]);
}

/// Trigger discard: the sub-flow runs, the incoming token vanishes and
/// nothing downstream of the Trigger activates.
#[tokio::test]
async fn test_trigger_runs_children_and_discards_token() {
    let inner = Recorder::new("inner-record");
    let inner_records = inner.handle();
    let after = Recorder::new("after-record");
    let after_records = after.handle();
    let mut flow = Flow::new("trigger")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(
            Trigger::new("side")
                .push(Box::new(Start::new("go")))
                .push(Box::new(inner)),
        ))
        .push(Box::new(after));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(inner_records.values(), vec![Value::Null]);
    assert!(after_records.is_empty());
}

/// Scenario B: the archive is assembled and persisted inside a
/// Trigger, entry by entry, and the Trigger keeps it off the main path.
#[tokio::test]
async fn test_archive_flow_builds_two_entries() {
    let after = Recorder::new("after-record");
    let after_records = after.handle();
    let mut flow = Flow::new("archive")
        .push(Box::new(Start::new("go")))
        .push(Box::new(
            Trigger::new("build")
                .push(Box::new(NewArchive::new("new")))
                .push(Box::new(AppendArchive::new("first", "a", "alpha")))
                .push(Box::new(AppendArchive::new("second", "b", "beta")))
                .push(Box::new(CloseArchive::new("close", slot("archive")))),
        ))
        .push(Box::new(after));
    let storage = Arc::clone(flow.storage());

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert!(after_records.is_empty());
    let archive = storage.get(&slot("archive")).expect("archive stored");
    let entries = archive.as_object().expect("archive is an object");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["a"], Value::Bytes(b"alpha".to_vec()));
    assert_eq!(entries["b"], Value::Bytes(b"beta".to_vec()));
}

/// Zero iterations is a valid loop outcome: condition false on the
/// first check, body untouched.
#[tokio::test]
async fn test_while_loop_zero_iterations() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("idle-loop")
        .push(Box::new(SetVariable::new("init", var("i"), "5")))
        .push(Box::new(
            WhileLoop::new("loop", Box::new(Expression::new("@{i} < 3")))
                .push(Box::new(VariableSource::new("emit", var("i"))))
                .push(Box::new(IncVariable::new("inc", var("i"))))
                .push(Box::new(recorder)),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_while_loop_runs_exactly_n_times() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("counting-loop")
        .push(Box::new(SetVariable::new("init", var("i"), "0")))
        .push(Box::new(
            WhileLoop::new("loop", Box::new(Expression::new("@{i} < 4")))
                .push(Box::new(VariableSource::new("emit", var("i"))))
                .push(Box::new(IncVariable::new("inc", var("i"))))
                .push(Box::new(recorder)),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(records.len(), 4);
}

/// Each branch gets its own copy of the token; the Branch itself
/// forwards nothing.
#[tokio::test]
async fn test_branch_seeds_every_branch_sequentially() {
    let first = Recorder::new("first-record");
    let first_records = first.handle();
    let second = Recorder::new("second-record");
    let second_records = second.handle();
    let after = Recorder::new("after-record");
    let after_records = after.handle();
    let mut flow = Flow::new("branching")
        .push(Box::new(StringConstants::new("emit", vec!["t".into()])))
        .push(Box::new(
            Branch::new("fan-out")
                .push(Box::new(
                    Sequence::new("one")
                        .push(Box::new(StringInsert::new(
                            "suffix-1",
                            InsertPosition::Back,
                            "-1",
                        )))
                        .push(Box::new(first)),
                ))
                .push(Box::new(
                    Sequence::new("two")
                        .push(Box::new(StringInsert::new(
                            "suffix-2",
                            InsertPosition::Back,
                            "-2",
                        )))
                        .push(Box::new(second)),
                )),
        ))
        .push(Box::new(after));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(first_records.values(), vec![Value::from("t-1")]);
    assert_eq!(second_records.values(), vec![Value::from("t-2")]);
    assert!(after_records.is_empty());
}

/// Parallel mode joins every branch before the Branch completes.
#[tokio::test]
async fn test_branch_parallel_joins_all_branches() {
    let first = Recorder::new("first-record");
    let first_records = first.handle();
    let second = Recorder::new("second-record");
    let second_records = second.handle();
    let mut flow = Flow::new("parallel-branching")
        .push(Box::new(StringConstants::new("emit", vec!["t".into()])))
        .push(Box::new(
            Branch::new("fan-out")
                .parallel()
                .push(Box::new(
                    Sequence::new("one")
                        .push(Box::new(StringInsert::new(
                            "suffix-1",
                            InsertPosition::Back,
                            "-1",
                        )))
                        .push(Box::new(first)),
                ))
                .push(Box::new(
                    Sequence::new("two")
                        .push(Box::new(StringInsert::new(
                            "suffix-2",
                            InsertPosition::Back,
                            "-2",
                        )))
                        .push(Box::new(second)),
                )),
        ));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(first_records.values(), vec![Value::from("t-1")]);
    assert_eq!(second_records.values(), vec![Value::from("t-2")]);
}

/// One declared callable, two call sites: both resolve to the same
/// instance through the lexical scope chain.
#[tokio::test]
async fn test_callable_shared_between_call_sites() {
    let report_sink = Recorder::new("report");
    let records = report_sink.handle();
    let mut flow = Flow::new("callables")
        .push(Box::new(
            CallableActors::new("shared").push(Box::new(report_sink)),
        ))
        .push(Box::new(StringConstants::new(
            "emit",
            vec!["a".into(), "b".into()],
        )))
        .push(Box::new(
            Tee::new("side").push(Box::new(CallableSink::new("call-1", "report"))),
        ))
        .push(Box::new(CallableSink::new("call-2", "report")));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(
        records.values(),
        vec![
            Value::from("a"),
            Value::from("a"),
            Value::from("b"),
            Value::from("b")
        ]
    );
}

/// Referencing an undeclared callable is a configuration error, caught
/// before anything executes.
#[tokio::test]
async fn test_unresolved_callable_is_a_config_error() {
    let mut flow = Flow::new("dangling")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(CallableSink::new("call", "nowhere")));

    let report = FlowRunner::new().run(&mut flow).await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.messages[0].contains("nowhere"));
}

/// Skipped actors are invisible: the token passes them by.
#[tokio::test]
async fn test_skipped_actor_is_transparent() {
    let recorder = Recorder::new("record");
    let records = recorder.handle();
    let mut flow = Flow::new("skipping")
        .push(Box::new(StringConstants::new("emit", vec!["x".into()])))
        .push(Box::new(
            StringInsert::new("mangle", InsertPosition::Back, "-mangled").skipped(),
        ))
        .push(Box::new(recorder));

    let report = FlowRunner::new().run(&mut flow).await;

    assert!(report.is_success(), "messages: {:?}", report.messages);
    assert_eq!(records.values(), vec![Value::from("x")]);
}
