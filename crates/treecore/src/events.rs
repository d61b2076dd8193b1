use crate::report::RunOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during flow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    FlowStarted {
        execution_id: ExecutionId,
        flow: String,
        timestamp: DateTime<Utc>,
    },
    FlowFinished {
        execution_id: ExecutionId,
        outcome: RunOutcome,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ActorFailed {
        execution_id: ExecutionId,
        actor: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    ActorMessage {
        execution_id: ExecutionId,
        actor: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    StopRequested {
        execution_id: ExecutionId,
        origin: String,
        timestamp: DateTime<Utc>,
    },
}

/// Emitter handed to actors via the flow context. Send failures are
/// ignored: events are best-effort observability, never control flow.
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    sender: Option<broadcast::Sender<ExecutionEvent>>,
}

impl EventEmitter {
    pub fn new(execution_id: ExecutionId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            execution_id,
            sender: Some(sender),
        }
    }

    /// Emitter that drops everything; for tests and embedded use.
    pub fn disabled() -> Self {
        Self {
            execution_id: ExecutionId::nil(),
            sender: None,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn flow_started(&self, flow: impl Into<String>) {
        self.emit(ExecutionEvent::FlowStarted {
            execution_id: self.execution_id,
            flow: flow.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn flow_finished(&self, outcome: RunOutcome, duration_ms: u64) {
        self.emit(ExecutionEvent::FlowFinished {
            execution_id: self.execution_id,
            outcome,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn actor_failed(&self, actor: impl Into<String>, error: impl Into<String>) {
        self.emit(ExecutionEvent::ActorFailed {
            execution_id: self.execution_id,
            actor: actor.into(),
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn message(&self, actor: impl Into<String>, message: impl Into<String>) {
        self.emit(ExecutionEvent::ActorMessage {
            execution_id: self.execution_id,
            actor: actor.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn stop_requested(&self, origin: impl Into<String>) {
        self.emit(ExecutionEvent::StopRequested {
            execution_id: self.execution_id,
            origin: origin.into(),
            timestamp: Utc::now(),
        });
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("execution_id", &self.execution_id)
            .field("enabled", &self.sender.is_some())
            .finish()
    }
}

/// In-process event bus over a broadcast channel
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emitter(&self, execution_id: ExecutionId) -> EventEmitter {
        EventEmitter::new(execution_id, self.sender.clone())
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
}
