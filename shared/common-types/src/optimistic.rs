//! Apply / confirm / rollback bookkeeping for optimistic updates
//!
//! An action is applied to the local state as soon as it is issued. The write
//! that makes it durable runs elsewhere; its result either confirms the action
//! (nothing to do) or rolls it back, which reverts only that action's effect and
//! leaves every other pending action in place.

/// A state transition that can undo itself
pub trait Reversible<S> {
    /// Applies the transition, remembering whatever `revert` needs
    fn apply(&mut self, state: &mut S);

    /// Undoes what `apply` changed
    fn revert(&self, state: &mut S);
}

/// Handle to a pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// State with a list of applied but unconfirmed actions
#[derive(Debug)]
pub struct Optimistic<S, A> {
    state: S,
    pending: Vec<(Ticket, A)>,
    next_ticket: u64,
}

impl<S, A: Reversible<S>> Optimistic<S, A> {
    #[must_use]
    pub const fn new(state: S) -> Self {
        Self {
            state,
            pending: Vec::new(),
            next_ticket: 0,
        }
    }

    /// Current state, pending actions included
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Number of actions still waiting for their write
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Applies `action` and returns the ticket used to settle it
    pub fn begin(&mut self, mut action: A) -> Ticket {
        action.apply(&mut self.state);

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push((ticket, action));
        ticket
    }

    /// The write succeeded, keep the effect. Returns false for unknown tickets.
    pub fn confirm(&mut self, ticket: Ticket) -> bool {
        self.take(ticket).is_some()
    }

    /// The write failed, revert the effect. Returns false for unknown tickets.
    pub fn rollback(&mut self, ticket: Ticket) -> bool {
        match self.take(ticket) {
            Some(action) => {
                action.revert(&mut self.state);
                true
            }
            None => false,
        }
    }

    /// Replaces the state with a fresh server snapshot and re-applies the
    /// actions that are still pending on top of it.
    pub fn reset(&mut self, state: S) {
        self.state = state;
        for (_, action) in &mut self.pending {
            action.apply(&mut self.state);
        }
    }

    fn take(&mut self, ticket: Ticket) -> Option<A> {
        let position = self.pending.iter().position(|(t, _)| *t == ticket)?;
        Some(self.pending.remove(position).1)
    }
}
