//! Generic named-action transition table.
//!
//! An [`Fsm`] is a pure table: action → (set of admissible from-states, to-state).
//! It holds no current state, no history, and runs no callbacks. The session
//! status machine and the per-tool phase machines are both built on it.

use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A single transition rule.
#[derive(Debug, Clone)]
struct Rule<S> {
    from: Vec<S>,
    to: S,
}

/// Table-driven finite state machine.
///
/// Rules are stored in registration order; `transition` is a pure lookup.
#[derive(Debug, Clone)]
pub struct Fsm<S, A: Hash + Eq> {
    rules: IndexMap<A, Rule<S>>,
}

/// Failure modes of [`Fsm::transition`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsmError<S: Debug, A: Debug> {
    /// The action is not in the table at all.
    #[error("unknown action {action:?}")]
    UnknownAction { action: A },

    /// The action exists but the current state is not in its from-set.
    /// `admissible` is the table's from-set for the action, verbatim.
    #[error("action {action:?} not admissible from {current:?} (expected one of {admissible:?})")]
    InvalidTransition { action: A, current: S, admissible: Vec<S> },
}

impl<S, A> Fsm<S, A>
where
    S: Copy + PartialEq + Debug,
    A: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self { rules: IndexMap::new() }
    }

    /// Add a rule. Re-registering an action replaces its rule.
    #[must_use]
    pub fn rule(mut self, action: A, from: &[S], to: S) -> Self {
        self.rules.insert(action, Rule { from: from.to_vec(), to });
        self
    }

    /// Apply `action` to `current`, returning the target state.
    pub fn transition(&self, current: S, action: A) -> Result<S, FsmError<S, A>> {
        let rule = self
            .rules
            .get(&action)
            .ok_or(FsmError::UnknownAction { action })?;
        if rule.from.contains(&current) {
            Ok(rule.to)
        } else {
            Err(FsmError::InvalidTransition {
                action,
                current,
                admissible: rule.from.clone(),
            })
        }
    }

    /// Actions admissible from `state`, in registration order.
    pub fn valid_actions(&self, state: S) -> Vec<A> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.from.contains(&state))
            .map(|(action, _)| *action)
            .collect()
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
