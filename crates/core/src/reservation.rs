//! LL/SC reservation set (C9).
//!
//! Each hart owns a single reservation slot (spec.md §3: "a per-hart
//! optional reserved-address register"). A store-conditional/`sc` succeeds
//! only if the issuing hart still holds a reservation at that address; any
//! store from *any* hart to a reserved address clears every hart's
//! reservation on that address, modeling the non-SMP-atomic single global
//! reservation-set Non-goal (spec.md: "no SMP atomicity beyond
//! single-reservation LR/SC").

/// Per-hart LL/SC reservation state, aligned down to 4 bytes (spec.md §3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reservation(Option<u64>);

impl Reservation {
    /// No reservation held.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Establishes a reservation at `addr` (aligned down to 4 bytes), as
    /// performed by `ll`/`lr.w`.
    pub fn set(&mut self, addr: u64) {
        self.0 = Some(addr & !0b11);
    }

    /// Returns `true` if a reservation is held at `addr` (aligned down to 4
    /// bytes) — the condition `sc`/`sc.w` must satisfy to succeed.
    #[must_use]
    pub fn holds(self, addr: u64) -> bool {
        self.0 == Some(addr & !0b11)
    }

    /// Clears the reservation unconditionally, as performed by a successful
    /// `sc`/`sc.w` regardless of outcome, and by context switches/exceptions
    /// in the original architectures.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// If this hart's reservation covers `addr` (aligned down to 4 bytes),
    /// clears it. Called for every store from every hart, including the
    /// storing hart's own plain stores.
    pub fn invalidate_if_matches(&mut self, addr: u64) {
        if self.holds(addr) {
            self.clear();
        }
    }
}

/// The machine-wide reservation set: one slot per hart, invalidated as a
/// unit whenever any hart stores to a reserved address.
#[derive(Debug, Default)]
pub struct ReservationSet {
    slots: Vec<Reservation>,
}

impl ReservationSet {
    /// Creates a reservation set sized for `hart_count` harts, all
    /// initially unreserved.
    #[must_use]
    pub fn new(hart_count: usize) -> Self {
        Self {
            slots: vec![Reservation::none(); hart_count],
        }
    }

    /// Establishes a reservation for `hart` at `addr`.
    pub fn set(&mut self, hart: usize, addr: u64) {
        self.slots[hart].set(addr);
    }

    /// Returns whether `hart` holds a reservation at `addr`.
    #[must_use]
    pub fn holds(&self, hart: usize, addr: u64) -> bool {
        self.slots[hart].holds(addr)
    }

    /// Clears `hart`'s reservation unconditionally.
    pub fn clear(&mut self, hart: usize) {
        self.slots[hart].clear();
    }

    /// Notifies the set that some hart stored to `addr`: every hart's
    /// reservation covering that address is cleared, including the
    /// storing hart's own.
    pub fn notify_store(&mut self, addr: u64) {
        for slot in &mut self.slots {
            slot.invalidate_if_matches(addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sc_succeeds_only_while_reservation_holds() {
        let mut set = ReservationSet::new(2);
        set.set(0, 0x1000);
        assert!(set.holds(0, 0x1000));
        assert!(set.holds(0, 0x1003)); // aligned down to the same word
        assert!(!set.holds(1, 0x1000));
    }

    #[test]
    fn any_store_invalidates_matching_reservations_across_harts() {
        let mut set = ReservationSet::new(2);
        set.set(0, 0x2000);
        set.set(1, 0x2000);
        set.notify_store(0x2000);
        assert!(!set.holds(0, 0x2000));
        assert!(!set.holds(1, 0x2000));
    }

    #[test]
    fn store_elsewhere_does_not_disturb_reservation() {
        let mut set = ReservationSet::new(1);
        set.set(0, 0x3000);
        set.notify_store(0x4000);
        assert!(set.holds(0, 0x3000));
    }
}
