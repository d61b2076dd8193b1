use futures::future::BoxFuture;
use futures::FutureExt;
use treecore::{
    ActorKind, BoxedActor, ConfigError, ErrorAction, ExecError, ExecResult, FlowContext, Outcome,
    Token,
};

/// Drives a child chain depth-first: each token a child produces is
/// pushed through the remaining chain before the child is asked for its
/// next one. At most one actor is active at a time; a chain holds at
/// most one in-flight token per nesting level.
#[derive(Debug, Clone, Copy)]
pub struct Director {
    record_final: bool,
}

impl Director {
    pub fn new() -> Self {
        Self {
            record_final: false,
        }
    }

    /// Collects tokens that fall off the end of the chain instead of
    /// discarding them, for containers that re-emit them.
    pub fn recording() -> Self {
        Self { record_final: true }
    }

    /// Runs the standalone pre-phase, then pushes `seed` (if any)
    /// through the chain. Returns the outcome plus any recorded final
    /// tokens.
    pub async fn run(
        &self,
        children: &mut [BoxedActor],
        ctx: &FlowContext,
        seed: Option<Token>,
    ) -> Result<(Outcome, Vec<Token>), ExecError> {
        // Standalones act once, before any token moves.
        for child in children.iter_mut() {
            if child.kind() != ActorKind::Standalone || child.is_skipped() {
                continue;
            }
            if ctx.is_stopped() {
                return Ok((Outcome::Stopped, Vec::new()));
            }
            match child.execute().await {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Stopped) => return Ok((Outcome::Stopped, Vec::new())),
                Err(err) => handle_failure(child.name(), err, ctx)?,
            }
        }

        let mut finals = Vec::new();
        match self.drive(children, ctx, seed, &mut finals).await {
            Ok(outcome) => Ok((outcome, finals)),
            Err(err) => Err(err),
        }
    }

    fn drive<'a>(
        &'a self,
        children: &'a mut [BoxedActor],
        ctx: &'a FlowContext,
        token: Option<Token>,
        finals: &'a mut Vec<Token>,
    ) -> BoxFuture<'a, ExecResult> {
        async move {
            // Standalones already ran in the pre-phase; skipped actors
            // are transparent.
            let mut chain = children;
            let (head, rest) = loop {
                match std::mem::take(&mut chain).split_first_mut() {
                    None => {
                        if self.record_final {
                            if let Some(t) = token {
                                finals.push(t);
                            }
                        }
                        return Ok(Outcome::Completed);
                    }
                    Some((head, rest)) => {
                        if head.kind() == ActorKind::Standalone || head.is_skipped() {
                            chain = rest;
                            continue;
                        }
                        break (head, rest);
                    }
                }
            };

            if ctx.is_stopped() {
                return Ok(Outcome::Stopped);
            }

            if let Some(t) = token {
                if !head.accepts_input() {
                    let err = ExecError::UnexpectedInput {
                        actor: head.name().to_string(),
                    };
                    handle_failure(head.name(), err, ctx)?;
                    return Ok(Outcome::Completed);
                }
                if let Err(err) = head.input(t) {
                    handle_failure(head.name(), err, ctx)?;
                    return Ok(Outcome::Completed);
                }
            }

            match head.execute().await {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Stopped) => return Ok(Outcome::Stopped),
                Err(err) => {
                    handle_failure(head.name(), err, ctx)?;
                    return Ok(Outcome::Completed);
                }
            }

            while let Some(out) = head.output() {
                if ctx.is_stopped() {
                    return Ok(Outcome::Stopped);
                }
                match self.drive(rest, ctx, Some(out), finals).await? {
                    Outcome::Completed => {}
                    Outcome::Stopped => return Ok(Outcome::Stopped),
                }
            }

            Ok(Outcome::Completed)
        }
        .boxed()
    }
}

impl Default for Director {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports the failure where it happened, then asks the policy whether
/// the run survives. `Continue` means the failing path simply produced
/// no token. An error that was already handled at a deeper nesting
/// level keeps unwinding untouched, so one failure yields one report
/// and one policy consult.
pub(crate) fn handle_failure(
    actor: &str,
    err: ExecError,
    ctx: &FlowContext,
) -> Result<(), ExecError> {
    if err.is_aborted() {
        return Err(err);
    }
    ctx.report_error(actor, &err);
    match ctx.error_policy().on_error(actor, &err) {
        ErrorAction::Abort => Err(err.into_abort()),
        ErrorAction::Continue => Ok(()),
    }
}

/// Validates a child chain at setup time: a child that follows a
/// producer must accept input. Children after a non-producer are legal,
/// they simply receive nothing for that activation. Standalones and
/// skipped actors are exempt.
pub fn check_chain(owner: &str, children: &[BoxedActor]) -> Result<(), ConfigError> {
    let mut producer: Option<&str> = None;
    for child in children {
        if child.kind() == ActorKind::Standalone || child.is_skipped() {
            continue;
        }
        if let Some(prev) = producer {
            if !child.accepts_input() {
                return Err(ConfigError::invalid_structure(
                    owner,
                    format!(
                        "'{}' does not accept the input produced by '{}'",
                        child.name(),
                        prev
                    ),
                ));
            }
        }
        producer = if child.produces_output() {
            Some(child.name())
        } else {
            None
        };
    }
    Ok(())
}
