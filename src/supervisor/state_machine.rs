use thiserror::Error;

/// Supervision loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Polling liveness; the server was seen running (or this is the first poll).
    Waiting,
    /// Server absent, waiting out the grace delay before a restart.
    IdleGrace,
    /// Startup sequence in flight.
    Starting,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition: {0:?} -> {1:?}")]
    InvalidTransition(State, State),
}

pub struct StateMachine {
    pub state: State,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self { state: State::Waiting }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_transition(&self, to: State) -> bool {
        matches!(
            (self.state, to),
            (State::Waiting, State::Waiting)
                | (State::Waiting, State::IdleGrace)
                | (State::IdleGrace, State::Starting)
                | (State::Starting, State::Waiting)
        )
    }

    pub fn transition(&mut self, to: State) -> Result<(), TransitionError> {
        if self.can_transition(to) {
            if self.state != to {
                tracing::info!("State transition: {:?} -> {:?}", self.state, to);
            }
            self.state = to;
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition(self.state, to))
        }
    }
}
