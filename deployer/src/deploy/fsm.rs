//! Finite state machine for one orchestration run

use serde::{Deserialize, Serialize};

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// Request accepted, tag resolved
    Received,

    /// Plan built; nothing issued yet
    Planned,

    /// Groups in flight
    Executing,

    /// Every planned group completed
    Succeeded,

    /// Some planned groups failed or never ran
    PartiallyFailed,

    /// No planned group completed
    Failed,

    /// Planning failed; no remote call was made
    Rejected,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::PartiallyFailed | RunState::Failed | RunState::Rejected
        )
    }
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Plan built
    Planned,

    /// Planning failed
    PlanFailed(String),

    /// Dispatch started
    Execute,

    /// Every group reached a terminal status
    Complete { planned: usize, failed: usize },
}

/// Run FSM
#[derive(Debug, Clone)]
pub struct RunFsm {
    state: RunState,
    error: Option<String>,
}

impl RunFsm {
    /// Create a new FSM in the received state
    pub fn new() -> Self {
        Self {
            state: RunState::Received,
            error: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Planning error, if the run was rejected
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<RunState, String> {
        let new_state = match (self.state, &event) {
            (RunState::Received, RunEvent::Planned) => RunState::Planned,
            (RunState::Received, RunEvent::PlanFailed(err)) => {
                self.error = Some(err.clone());
                RunState::Rejected
            }

            (RunState::Planned, RunEvent::Execute) => RunState::Executing,

            (RunState::Executing, RunEvent::Complete { planned, failed }) => {
                if *failed == 0 {
                    RunState::Succeeded
                } else if failed >= planned {
                    RunState::Failed
                } else {
                    RunState::PartiallyFailed
                }
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}

impl Default for RunFsm {
    fn default() -> Self {
        Self::new()
    }
}
