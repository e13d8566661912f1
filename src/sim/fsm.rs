//! Table-driven finite state machine
//!
//! The engine only applies transitions; deciding which event to raise is
//! the caller's job. States carry their own `enter`/`update`/`exit` hooks
//! through [`StateHooks`], each defaulting to a no-op.
//!
//! Tables are validated when built: every `(event, from)` pair maps to at
//! most one target, so lookups never depend on list order at runtime.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::FsmError;

/// Per-state behavior over a subject `T`
pub trait StateHooks<T: ?Sized>: Copy + Eq + Hash + Debug {
    fn enter(self, _subject: &mut T) {}
    fn update(self, _subject: &mut T) {}
    fn exit(self, _subject: &mut T) {}

    /// Name handed to renderers and logs
    fn name(self) -> String {
        format!("{self:?}")
    }
}

/// Read-only transition table, shared by every machine of one actor kind
#[derive(Debug, Clone)]
pub struct TransitionTable<S, E> {
    transitions: HashMap<(E, S), S>,
    initial: S,
    terminal: S,
}

impl<S, E> TransitionTable<S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn builder(initial: S, terminal: S) -> TableBuilder<S, E> {
        TableBuilder {
            edges: Vec::new(),
            initial,
            terminal,
        }
    }

    /// Target of `event` from `state`, if the table has one
    pub fn target(&self, state: S, event: E) -> Option<S> {
        self.transitions.get(&(event, state)).copied()
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    pub fn terminal(&self) -> S {
        self.terminal
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Collects `(event, from, to)` edges before validation
#[derive(Debug, Clone)]
pub struct TableBuilder<S, E> {
    edges: Vec<(E, S, S)>,
    initial: S,
    terminal: S,
}

impl<S, E> TableBuilder<S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn on(mut self, event: E, from: S, to: S) -> Self {
        self.edges.push((event, from, to));
        self
    }

    /// Same event from several states to one target
    pub fn on_any(mut self, event: E, from: &[S], to: S) -> Self {
        for &state in from {
            self.edges.push((event, state, to));
        }
        self
    }

    /// Reject ambiguous tables
    pub fn build(self) -> Result<TransitionTable<S, E>, FsmError> {
        let mut transitions = HashMap::with_capacity(self.edges.len());
        for (event, from, to) in self.edges {
            if transitions.insert((event, from), to).is_some() {
                return Err(FsmError::Ambiguous {
                    state: format!("{from:?}"),
                    event: format!("{event:?}"),
                });
            }
        }
        Ok(TransitionTable {
            transitions,
            initial: self.initial,
            terminal: self.terminal,
        })
    }
}

/// One machine instance: a current state over a shared table
#[derive(Debug, Clone)]
pub struct Fsm<S, E> {
    current: S,
    table: Arc<TransitionTable<S, E>>,
}

impl<S, E> Fsm<S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn new(table: Arc<TransitionTable<S, E>>) -> Self {
        let current = table.initial();
        Self { current, table }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current == self.table.terminal()
    }

    /// Apply `event`, running `exit` on the old state and `enter` on the new.
    ///
    /// Leaves the machine untouched when the table has no such transition.
    pub fn try_fire<T: ?Sized>(&mut self, event: E, subject: &mut T) -> Result<S, FsmError>
    where
        S: StateHooks<T>,
    {
        let Some(next) = self.table.target(self.current, event) else {
            return Err(FsmError::NoTransition {
                state: format!("{:?}", self.current),
                event: format!("{event:?}"),
            });
        };
        log::debug!("{:?} --{:?}--> {:?}", self.current, event, next);
        self.current.exit(subject);
        self.current = next;
        self.current.enter(subject);
        Ok(next)
    }

    /// One machine step.
    ///
    /// Fires `event` if given (an unknown transition is logged and skipped),
    /// then runs `update` on the current state. Returns `false` once the
    /// terminal state is reached, after running its `exit` hook.
    pub fn update<T: ?Sized>(&mut self, event: Option<E>, subject: &mut T) -> bool
    where
        S: StateHooks<T>,
    {
        if let Some(event) = event {
            if let Err(err) = self.try_fire(event, subject) {
                log::warn!("{err}");
            }
        }

        self.current.update(subject);

        if self.is_finished() {
            self.current.exit(subject);
            return false;
        }
        true
    }
}
