// ── Session lifecycle states ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Connection lifecycle of the tunneling engine as seen by the client.
///
/// The only edges are `Disconnected → Connecting → Connected →
/// Disconnecting → Disconnected`, plus the startup shortcut straight into
/// `Connected` when the config store reports an active session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl SessionState {
    /// The state a toggle request settles in, starting from a settled state.
    pub const fn toggle_target(self) -> Option<Self> {
        match self {
            Self::Disconnected => Some(Self::Connected),
            Self::Connected => Some(Self::Disconnected),
            Self::Connecting | Self::Disconnecting => None,
        }
    }

    /// Whether `self → next` is an edge of the lifecycle cycle.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connected, Self::Disconnecting)
                | (Self::Disconnecting, Self::Disconnected)
        )
    }
}
