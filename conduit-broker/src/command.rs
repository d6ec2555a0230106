//! Default command path

use async_trait::async_trait;
use conduit_core::{
    CommandRequest, CommandResult, CommandState, PipelineResult, Record, StoreRecord,
};
use conduit_storage::{RecordStore, SessionMode, StoreSession};
use std::time::Instant;

use crate::handler::CommandHandler;
use crate::pipeline::RecordPipeline;

fn outcome_messages(state: CommandState) -> (&'static str, &'static str) {
    match state {
        CommandState::Add => ("Record Added", "Error Adding Record"),
        CommandState::Update => ("Record Updated", "Error Updating Record"),
        CommandState::Delete => ("Record Deleted", "Error Deleting Record"),
    }
}

impl<S, D, P> RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn default_command(&self, request: &CommandRequest<D>) -> PipelineResult<CommandResult> {
        if !D::SUPPORTS_COMMANDS {
            return Ok(CommandResult::failure(format!(
                "{} does not support commands and cannot be changed directly",
                D::RECORD_NAME
            )));
        }

        let cancel = &request.cancellation;
        cancel.check()?;
        let mapper = self.require_mapper()?;
        let mut record = mapper.to_persistence(&request.item);

        let session = self.store.open_session(SessionMode::Tracking).await?;
        let affected = match request.state {
            CommandState::Add => session.insert(&mut record, cancel).await?,
            CommandState::Update => session.update(&record, cancel).await?,
            CommandState::Delete => session.remove(&record, cancel).await?,
        };

        let (success, failure) = outcome_messages(request.state);
        if affected != 1 {
            tracing::warn!(
                record = D::RECORD_NAME,
                state = %request.state,
                affected,
                "Command affected an unexpected number of records"
            );
            return Ok(CommandResult::failure(failure));
        }

        if request.state == CommandState::Add && P::STORE_ASSIGNED_KEY {
            return Ok(CommandResult::success_with_key(record.key_value(), success));
        }
        Ok(CommandResult::success(success))
    }
}

#[async_trait]
impl<S, D, P> CommandHandler<D> for RecordPipeline<S, D, P>
where
    S: RecordStore,
    D: Record,
    P: StoreRecord,
{
    async fn command(&self, request: CommandRequest<D>) -> PipelineResult<CommandResult> {
        if let Some(custom) = &self.command_handler {
            return custom.command(request).await;
        }

        if self.config.trace_requests {
            tracing::debug!(record = D::RECORD_NAME, state = %request.state, "Command");
        }

        let started = Instant::now();
        let outcome = self.default_command(&request).await;
        self.observe("command", started, &outcome);
        outcome
    }
}
