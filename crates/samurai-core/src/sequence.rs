/// Monotonic request tickets for one state slice.
///
/// Each request takes a ticket when it is issued. Its result may only be
/// applied if no newer ticket has been applied already and the ticket is not
/// below the floor, so the slice ends up reflecting the newest request rather
/// than the slowest response.
#[derive(Debug, Default)]
pub struct Sequencer {
    issued: u64,
    applied: u64,
    floor: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 > self.applied && ticket.0 > self.floor
    }

    /// Marks the ticket as applied if it is still current.
    pub fn try_apply(&mut self, ticket: Ticket) -> bool {
        if self.is_current(ticket) {
            self.applied = ticket.0;
            true
        } else {
            false
        }
    }

    /// Rejects every ticket issued so far.
    pub fn raise_floor(&mut self) {
        self.floor = self.issued;
    }
}
