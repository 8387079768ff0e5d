// ── Command API ──
//
// Every user-originated action as one typed value, so a presentation
// layer can route button presses through a single entry point:
// `Orchestrator::execute`.

use crate::model::{Category, Partition, RouteAction, SessionState};
use crate::routes::RefreshOutcome;

/// All user actions the orchestrator accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Session ──────────────────────────────────────────────────────
    Toggle,

    // ── Routing flags ────────────────────────────────────────────────
    /// `checked` is the enforcement switch value before the click.
    SetRouteEnforcement {
        checked: bool,
    },
    SetRoutesDisabled {
        disabled: bool,
    },

    // ── Route entries ────────────────────────────────────────────────
    Mutate {
        action: RouteAction,
        partition: Partition,
        category: Category,
        value: String,
    },
    SubmitPending {
        action: RouteAction,
        partition: Partition,
        category: Category,
    },
    /// Re-fetch one partition, or both when `None`.
    Refresh {
        partition: Option<Partition>,
    },
}

/// Result of a successfully executed [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Session(SessionState),
    Enforcement { blacklist_enforced: bool },
    RoutesDisabled { disabled: bool },
    Routes(RefreshOutcome),
    Ok,
}
