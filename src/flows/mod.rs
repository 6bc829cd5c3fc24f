//! Flow handlers: one short, linear state machine per product.
//!
//! Each step is a pure function `(state fields, input) -> StepOutcome`,
//! independently testable without a live store. The engine applies the
//! outcome: `Stay` counts an invalid attempt (escalating to the menu at
//! the retry ceiling), `Advance` replaces the session state, `Complete`
//! and `Menu` clear or restart it.

pub mod airtime;
pub mod bill;
pub mod electricity;
pub mod menu;

use crate::session::FlowState;
use uuid::Uuid;

/// Where a step leaves the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Invalid input: state unchanged, retry counter ticks
    Stay,
    /// Move to the given state, retry counter resets
    Advance(FlowState),
    /// Terminal step: the session is deleted
    Complete,
    /// Return to a fresh main-menu session
    Menu,
}

/// Result of one flow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Outbound reply text
    pub reply: String,
    /// Session disposition
    pub next: Next,
}

impl StepOutcome {
    /// Invalid input: keep the state and send a correction.
    #[must_use]
    pub fn stay(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            next: Next::Stay,
        }
    }

    /// Advance to the next step.
    #[must_use]
    pub fn advance(reply: impl Into<String>, state: FlowState) -> Self {
        Self {
            reply: reply.into(),
            next: Next::Advance(state),
        }
    }

    /// Terminal step: receipt sent, session cleared.
    #[must_use]
    pub fn complete(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            next: Next::Complete,
        }
    }

    /// Back to the main menu.
    #[must_use]
    pub fn menu(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            next: Next::Menu,
        }
    }
}

/// Generate a receipt reference like `PD-5F3A9C1B`.
#[must_use]
pub fn make_reference() -> String {
    let id = Uuid::new_v4().as_simple().to_string();
    format!("PD-{}", id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let reference = make_reference();
        assert!(reference.starts_with("PD-"));
        assert_eq!(reference.len(), 11);
        assert!(reference[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
