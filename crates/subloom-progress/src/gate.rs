//! Ordering guard for overlapping job-list polls.

/// Sequence number handed out when a poll is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(u64);

impl PollTicket {
    /// Raw sequence number.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

/// Accepts a poll response only if no later-issued poll was applied first.
///
/// Responses may resolve out of order; reconciling against a stale snapshot
/// would re-open streams for jobs that already left the running set.
#[derive(Debug, Default)]
pub struct SnapshotGate {
    issued: u64,
    applied: u64,
}

impl SnapshotGate {
    /// Create a gate with nothing issued.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issued: 0,
            applied: 0,
        }
    }

    /// Issue a ticket for a poll about to start.
    pub const fn issue(&mut self) -> PollTicket {
        self.issued = self.issued.saturating_add(1);
        PollTicket(self.issued)
    }

    /// Decide whether the response for `ticket` may be applied, recording it if so.
    pub const fn accept(&mut self, ticket: PollTicket) -> bool {
        if ticket.0 <= self.applied || ticket.0 > self.issued {
            return false;
        }
        self.applied = ticket.0;
        true
    }

    /// Ticket of the most recently applied response.
    #[must_use]
    pub const fn last_applied(&self) -> Option<PollTicket> {
        if self.applied == 0 {
            None
        } else {
            Some(PollTicket(self.applied))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_responses_are_all_accepted() {
        let mut gate = SnapshotGate::new();
        let first = gate.issue();
        assert!(gate.accept(first));
        let second = gate.issue();
        assert!(gate.accept(second));
        assert_eq!(gate.last_applied(), Some(second));
    }

    #[test]
    fn older_response_after_newer_is_rejected() {
        let mut gate = SnapshotGate::new();
        let slow = gate.issue();
        let fast = gate.issue();
        assert!(gate.accept(fast));
        assert!(!gate.accept(slow));
        assert_eq!(gate.last_applied().map(PollTicket::sequence), Some(2));
    }

    #[test]
    fn duplicate_ticket_is_rejected() {
        let mut gate = SnapshotGate::new();
        let ticket = gate.issue();
        assert!(gate.accept(ticket));
        assert!(!gate.accept(ticket));
    }

    #[test]
    fn foreign_ticket_is_rejected() {
        let mut issuer = SnapshotGate::new();
        issuer.issue();
        let foreign = issuer.issue();
        let mut gate = SnapshotGate::new();
        gate.issue();
        assert!(!gate.accept(foreign));
        assert_eq!(gate.last_applied(), None);
    }
}
