//! Progress tracking for a single command run.
//!
//! Write commands move through every stage in order; read-only commands skip
//! the stages that do not apply. Stages never move backwards and a finished
//! or failed run accepts no further transitions.

use std::fmt;

/// Where a command run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nothing has happened yet.
    Idle,
    /// Settings parsed and validated.
    ConfigResolved,
    /// Transaction broadcast.
    Submitted,
    /// Receipt observed.
    Confirmed,
    /// Events decoded from the receipt or a log query.
    EventsExtracted,
    /// Result recorded in the `.env` file.
    ConfigUpdated,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl Stage {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ConfigResolved => "config-resolved",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::EventsExtracted => "events-extracted",
            Self::ConfigUpdated => "config-updated",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An illegal stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Stage the run was in.
    pub from: Stage,
    /// Stage that was requested.
    pub to: Stage,
}

/// Stage tracker for one named command.
#[derive(Debug)]
pub struct Workflow {
    name: &'static str,
    stage: Stage,
    /// Last stage reached before [`Workflow::fail`].
    reached: Stage,
}

impl Workflow {
    /// Start a run of `name` in [`Stage::Idle`].
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            stage: Stage::Idle,
            reached: Stage::Idle,
        }
    }

    /// Command name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Move forward to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if `next` is not strictly later than the
    /// current stage, if the run is already terminal, or if `next` is
    /// [`Stage::Failed`] (use [`Workflow::fail`]).
    pub fn advance(&mut self, next: Stage) -> Result<(), TransitionError> {
        if self.stage.is_terminal() || next <= self.stage || next == Stage::Failed {
            return Err(TransitionError {
                from: self.stage,
                to: next,
            });
        }
        tracing::info!(workflow = self.name, from = %self.stage, to = %next, "stage");
        self.stage = next;
        self.reached = next;
        Ok(())
    }

    /// Mark the run failed and return the last stage it completed.
    pub fn fail(&mut self) -> Stage {
        if self.stage != Stage::Failed {
            tracing::warn!(workflow = self.name, after = %self.stage, "failed");
            self.stage = Stage::Failed;
        }
        self.reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_path_walks_every_stage() {
        let mut flow = Workflow::new("register");
        for stage in [
            Stage::ConfigResolved,
            Stage::Submitted,
            Stage::Confirmed,
            Stage::EventsExtracted,
            Stage::ConfigUpdated,
            Stage::Done,
        ] {
            flow.advance(stage).unwrap();
            assert_eq!(flow.stage(), stage, "now at {stage}");
        }
        assert!(flow.stage().is_terminal(), "done is terminal");
    }

    #[test]
    fn read_path_may_skip_stages() {
        let mut flow = Workflow::new("validation-responses");
        flow.advance(Stage::ConfigResolved).unwrap();
        flow.advance(Stage::EventsExtracted).unwrap();
        flow.advance(Stage::Done).unwrap();
        assert_eq!(flow.stage(), Stage::Done, "skipping forward is allowed");
    }

    #[test]
    fn stages_never_move_backwards_or_repeat() {
        let mut flow = Workflow::new("register");
        flow.advance(Stage::Confirmed).unwrap();
        assert!(flow.advance(Stage::Submitted).is_err(), "backwards");
        assert!(flow.advance(Stage::Confirmed).is_err(), "repeat");
        assert!(flow.advance(Stage::Failed).is_err(), "failing goes through fail()");
        assert_eq!(flow.stage(), Stage::Confirmed, "rejected moves change nothing");
    }

    #[test]
    fn failure_reports_last_completed_stage_and_is_terminal() {
        let mut flow = Workflow::new("request-validation");
        flow.advance(Stage::ConfigResolved).unwrap();
        flow.advance(Stage::Submitted).unwrap();

        assert_eq!(flow.fail(), Stage::Submitted, "failed while waiting for the receipt");
        assert_eq!(flow.stage(), Stage::Failed, "now failed");
        assert_eq!(flow.fail(), Stage::Submitted, "failing again is harmless");
        assert!(flow.advance(Stage::Done).is_err(), "no way out of failed");
    }
}
