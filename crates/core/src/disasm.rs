//! Best-effort disassembly for the `dumpins` command (SPEC_FULL.md §18).
//!
//! Full mnemonic/operand formatting fidelity is out of scope (spec.md §1
//! Out of scope: "no... disassembler output formatting beyond what's needed
//! for `dumpins`"); this renders the already-decoded operation's `Debug`
//! form, which is readable enough to tell one instruction from another
//! without a hand-written formatter per opcode. Unknown/illegal encodings
//! render as `"unknown"` rather than panicking.

use crate::mips::decode::{self as mips_decode, MipsOp};
use crate::riscv::decode::{self as rv_decode, RvOp};

/// Disassembles one RV32IMA instruction word.
#[must_use]
pub fn disassemble_riscv(word: u32) -> String {
    match rv_decode::decode(word) {
        RvOp::Illegal => "unknown".to_string(),
        op => format!("{op:?}"),
    }
}

/// Disassembles one MIPS R4000 instruction word.
#[must_use]
pub fn disassemble_mips(word: u32) -> String {
    match mips_decode::decode(word) {
        MipsOp::Illegal => "unknown".to_string(),
        op => format!("{op:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_riscv_word_renders_as_unknown() {
        assert_eq!(disassemble_riscv(0), "unknown");
    }

    #[test]
    fn legal_riscv_word_renders_debug_form() {
        // addi x1, x0, 5
        let word = (5u32 << 20) | (0b000 << 12) | (1 << 7) | 0b0010011;
        assert_ne!(disassemble_riscv(word), "unknown");
    }
}
