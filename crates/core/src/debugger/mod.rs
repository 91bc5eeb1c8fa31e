//! External debugger interface stubs (spec.md §1 Out of scope;
//! SPEC_FULL.md §18: the GDB remote wire protocol itself is not
//! implemented, only the seam [`crate::breakpoint::BreakpointKind::Debugger`]
//! would notify through).

pub mod gdbstub;
