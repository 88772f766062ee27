use thiserror::Error;

/// Lifecycle state of a player instance. Exactly one state is current at a
/// time; `Disposed` is terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// No bundle attached, nothing scheduled.
    #[default]
    Idle,
    /// A load ticket is outstanding; the scene has already been cleared.
    Loading,
    /// A bundle is attached and a frame callback is pending.
    Playing,
    /// A bundle is attached but the loop is halted and the clock stopped.
    Paused,
    /// The player has released its output device. No transition leaves this.
    Disposed,
}

impl PlayerState {
    /// All states in display order.
    pub const ALL: &'static [PlayerState] = &[
        PlayerState::Idle,
        PlayerState::Loading,
        PlayerState::Playing,
        PlayerState::Paused,
        PlayerState::Disposed,
    ];

    /// Short human-readable label for overlay display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Disposed => "disposed",
        }
    }

    /// A bundle is attached in these states.
    pub fn has_bundle(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disposed)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An operation was invoked in a state that forbids it. This is a caller
/// error; the state machine is left untouched when it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("'{op}' is not allowed while the player is {state}")]
pub struct IllegalState {
    pub op: &'static str,
    pub state: PlayerState,
}

impl IllegalState {
    pub fn new(op: &'static str, state: PlayerState) -> Self {
        Self { op, state }
    }
}
