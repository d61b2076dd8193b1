// crates/treecli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use treeactors::{
    AppendArchive, CloseArchive, IncVariable, InsertPosition, NewArchive, Recorder,
    RecorderHandle, SetVariable, Start, StringConstants, StringInsert, VariableSource,
};
use treecore::{Actor, ExecutionEvent, StorageName, Value, VariableName};
use treeruntime::control::{Branch, Sequence, StorageValueSequence, Trigger, WhileLoop};
use treeruntime::{tree, ActorRegistry, Expression, Flow, FlowRunner};

#[derive(Parser)]
#[command(name = "treeflow")]
#[command(about = "Actor tree flow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoFlow {
    /// SetVariable + WhileLoop counter
    Counter,
    /// Archive assembly inside a Trigger
    Archive,
    /// StorageValueSequence string chain
    Chain,
    /// Parallel fan-out over two branches
    Branch,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one of the built-in demo flows
    Demo {
        /// Which demo flow to run
        #[arg(value_enum)]
        name: DemoFlow,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available actor types
    Actors,

    /// Print the actor tree of a demo flow
    Tree {
        /// Which demo flow to render
        #[arg(value_enum)]
        name: DemoFlow,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            name,
            verbose,
            json,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();
            run_demo(name, json).await?;
        }

        Commands::Actors => {
            list_actors();
        }

        Commands::Tree { name } => {
            let (flow, _) = build_demo(name)?;
            print!("{}", tree::render(&flow));
        }
    }

    Ok(())
}

fn var(name: &str) -> Result<VariableName> {
    Ok(VariableName::new(name)?)
}

fn slot(name: &str) -> Result<StorageName> {
    Ok(StorageName::new(name)?)
}

fn build_demo(name: DemoFlow) -> Result<(Flow, Vec<(&'static str, RecorderHandle)>)> {
    match name {
        DemoFlow::Counter => {
            let recorder = Recorder::new("record");
            let handle = recorder.handle();
            let flow = Flow::new("counter")
                .push(Box::new(SetVariable::new("init", var("i")?, "0")))
                .push(Box::new(
                    WhileLoop::new("loop", Box::new(Expression::new("@{i} < 5")))
                        .push(Box::new(VariableSource::new("emit", var("i")?)))
                        .push(Box::new(IncVariable::new("inc", var("i")?)))
                        .push(Box::new(recorder)),
                ));
            Ok((flow, vec![("counted", handle)]))
        }
        DemoFlow::Archive => {
            let flow = Flow::new("archive")
                .push(Box::new(Start::new("go")))
                .push(Box::new(
                    Trigger::new("build")
                        .push(Box::new(NewArchive::new("new")))
                        .push(Box::new(AppendArchive::new("first", "readme", "hello")))
                        .push(Box::new(AppendArchive::new("second", "data", "${USER}")))
                        .push(Box::new(CloseArchive::new("close", slot("archive")?))),
                ));
            Ok((flow, Vec::new()))
        }
        DemoFlow::Chain => {
            let recorder = Recorder::new("record");
            let handle = recorder.handle();
            let flow = Flow::new("chain")
                .push(Box::new(
                    StorageValueSequence::new("process", slot("s")?)
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
            flow.storage().put(slot("s")?, Value::from("blah"));
            Ok((flow, vec![("forwarded", handle)]))
        }
        DemoFlow::Branch => {
            let first = Recorder::new("first-record");
            let first_handle = first.handle();
            let second = Recorder::new("second-record");
            let second_handle = second.handle();
            let flow = Flow::new("branching")
                .push(Box::new(StringConstants::new(
                    "emit",
                    vec!["token".into()],
                )))
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
            Ok((
                flow,
                vec![("branch one", first_handle), ("branch two", second_handle)],
            ))
        }
    }
}

async fn run_demo(name: DemoFlow, json: bool) -> Result<()> {
    let (mut flow, recorders) = build_demo(name)?;
    let storage = Arc::clone(flow.storage());

    println!("Running flow '{}'", flow.name());
    println!();
    print!("{}", tree::render(&flow));
    println!();

    let runner = FlowRunner::new();
    let mut events = runner.subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::FlowStarted { flow, .. } => {
                    println!("> flow '{flow}' started");
                }
                ExecutionEvent::ActorFailed { actor, error, .. } => {
                    println!("! actor '{actor}' failed: {error}");
                }
                ExecutionEvent::ActorMessage { actor, message, .. } => {
                    println!("  [{actor}] {message}");
                }
                ExecutionEvent::StopRequested { origin, .. } => {
                    println!("> stop requested by '{origin}'");
                }
                ExecutionEvent::FlowFinished {
                    outcome,
                    duration_ms,
                    ..
                } => {
                    println!("> flow finished: {outcome} in {duration_ms}ms");
                }
            }
        }
    });

    let report = runner.run(&mut flow).await;

    // let the listener drain before tearing it down
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    event_task.abort();

    println!();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Outcome: {} (attempt {})", report.outcome, report.attempt);
        for message in &report.messages {
            println!("  message: {message}");
        }
    }

    for (label, handle) in recorders {
        println!("{label}: {:?}", handle.values());
    }
    for key in storage.keys() {
        if let Some(value) = storage.get(&key) {
            println!("storage '{key}': {value:?}");
        }
    }

    Ok(())
}

fn list_actors() {
    println!("Available actor types:");
    println!();

    let mut registry = ActorRegistry::new();
    treeactors::register_all(&mut registry);

    for actor_type in registry.list_types() {
        match registry.info(&actor_type) {
            Some(info) => {
                println!("  {} ({})", actor_type, info.category);
                if !info.description.is_empty() {
                    println!("    {}", info.description);
                }
            }
            None => println!("  {actor_type}"),
        }
    }
}
