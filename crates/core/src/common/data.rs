//! Memory access classification.

/// The kind of access being made to memory, used by the MMU/TLB for
/// permission checks and by the breakpoint engine for match classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessIntent {
    /// Instruction fetch.
    Fetch,
    /// Data load.
    Load,
    /// Data store.
    Store,
}

/// Bitset of access kinds a memory-access breakpoint watches for
/// (spec.md §3: "{R, W, R∪W}").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessFilter(u8);

impl AccessFilter {
    /// No access kind selected.
    pub const NONE: Self = Self(0);
    /// Read accesses (loads).
    pub const READ: Self = Self(1);
    /// Write accesses (stores).
    pub const WRITE: Self = Self(2);

    /// Combines two filters.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if this filter matches the given access.
    #[must_use]
    pub const fn matches(self, intent: AccessIntent) -> bool {
        match intent {
            AccessIntent::Load | AccessIntent::Fetch => self.0 & Self::READ.0 != 0,
            AccessIntent::Store => self.0 & Self::WRITE.0 != 0,
        }
    }

    /// Returns `true` if no access kind is selected.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Parses a `r`/`w`/`rw` token into an access filter.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut f = Self::NONE;
        if s.contains('r') {
            f = f.union(Self::READ);
        }
        if s.contains('w') {
            f = f.union(Self::WRITE);
        }
        f
    }
}

impl std::fmt::Display for AccessFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.0 & Self::READ.0 != 0, self.0 & Self::WRITE.0 != 0) {
            (true, true) => write!(f, "rw"),
            (true, false) => write!(f, "r"),
            (false, true) => write!(f, "w"),
            (false, false) => write!(f, "-"),
        }
    }
}
