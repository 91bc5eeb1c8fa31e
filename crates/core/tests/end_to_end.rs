//! Cross-module end-to-end scenarios from spec.md §8, exercised against
//! the public `Machine` API the way a config file or interactive session
//! would drive the simulator.

use msim_core::config::{Architecture, Config};
use msim_core::machine::Hart;
use msim_core::{Machine, Trap};

fn riscv_machine() -> Machine {
    let mut config = Config::default();
    config.general.arch = Architecture::Riscv;
    Machine::new(&config)
}

fn riscv_cpu(m: &Machine) -> &msim_core::riscv::RvCpu {
    match &m.harts()[0] {
        Hart::Riscv(cpu) => cpu,
        Hart::Mips(_) => unreachable!("default config creates an RV32IMA hart"),
    }
}

/// Scenario 2: `addi x1,x0,5; addi x2,x0,7; add x3,x1,x2; ecall` at
/// `0x80000000`, step 4 → x3=12, trap to M with mcause=11.
#[test]
fn scenario_2_arithmetic_then_ecall_traps_to_machine_mode() {
    let mut m = riscv_machine();
    let base = 0x8000_0000u64;
    let program: [u32; 4] = [
        (5u32 << 20) | (0 << 15) | (0b000 << 12) | (1 << 7) | 0b0010011, // addi x1, x0, 5
        (7u32 << 20) | (0 << 15) | (0b000 << 12) | (2 << 7) | 0b0010011, // addi x2, x0, 7
        (0u32 << 25) | (2 << 20) | (1 << 15) | (0b000 << 12) | (3 << 7) | 0b0110011, // add x3, x1, x2
        0x0000_0073, // ecall
    ];
    for (i, word) in program.iter().enumerate() {
        m.memory_mut().write32(base + i as u64 * 4, *word, false);
    }

    m.run_steps(4);

    let cpu = riscv_cpu(&m);
    assert_eq!(cpu.gpr[3], 12);
    assert_eq!(cpu.csr.mcause, 11, "ecall from M-mode is cause 11");
    assert_eq!(cpu.priv_mode, msim_core::riscv::mmu::Privilege::Machine);
}

/// Scenario 3: a Sv32 page table mapping V=0x1000 -> P=0x80001000 with
/// R=1,W=0,X=0,U=1; a load through it succeeds, a store to the same page
/// faults.
#[test]
fn scenario_3_user_mapped_page_allows_load_faults_store() {
    use msim_core::common::data::AccessIntent;
    use msim_core::memory::{PhysMemory, RegionKind};
    use msim_core::riscv::mmu::{translate, Privilege};

    let mut mem = PhysMemory::new();
    mem.map_region(0, 0x10_0000, RegionKind::Rwm); // backs the page tables only

    let root_ppn = 0u32;
    let leaf_ppn = 1u32;
    let vaddr = 0x1000u32;
    let paddr = 0x8000_1000u32;

    let vpn1 = (vaddr >> 22) & 0x3FF;
    let vpn0 = (vaddr >> 12) & 0x3FF;
    let root_pte_addr = (u64::from(root_ppn) << 12) + u64::from(vpn1) * 4;
    mem.write32(root_pte_addr, (leaf_ppn << 10) | 0b0000_0001, false); // V=1, non-leaf

    const PTE_V: u32 = 1 << 0;
    const PTE_R: u32 = 1 << 1;
    const PTE_U: u32 = 1 << 4;
    const PTE_A: u32 = 1 << 6;
    const PTE_D: u32 = 1 << 7;
    let leaf_pte_addr = (u64::from(leaf_ppn) << 12) + u64::from(vpn0) * 4;
    let leaf_flags = PTE_V | PTE_R | PTE_U | PTE_A | PTE_D;
    mem.write32(leaf_pte_addr, ((paddr >> 12) << 10) | leaf_flags, false);

    let load = translate(&mut mem, vaddr, AccessIntent::Load, Privilege::User, root_ppn, 0);
    assert_eq!(load, Ok(paddr));

    let store = translate(&mut mem, vaddr, AccessIntent::Store, Privilege::User, root_ppn, 0);
    assert_eq!(store, Err(Trap::StorePageFault(vaddr)));
}

/// Scenario 4: `break ADDR SIZE w; step 1000` halts on the first matching
/// store, `dumpbreak` shows one entry.
#[test]
fn scenario_4_write_breakpoint_halts_and_is_listed() {
    let mut m = riscv_machine();
    let base = 0x8000_0000u64;
    // sw x0, 0x100(x0) -> store to physical 0x100
    let imm = 0x100i32;
    let sw = (((imm >> 5) & 0x7F) as u32) << 25
        | (0 << 20)
        | (0 << 15)
        | (0b010 << 12)
        | (((imm & 0x1F) as u32) << 7)
        | 0b0100011;
    m.memory_mut().write32(base, sw, false);

    m.dispatch_line("break 0x100 4 w").unwrap();
    m.run_steps(1000);

    assert!(m.tohalt, "the write breakpoint should halt execution");
    let out = m.dispatch_line("dumpbreak").unwrap().unwrap();
    assert_eq!(out.lines().count(), 1);
}

/// Scenario 5: two harts share one address. Hart-0's `LR x1,(x5)` sets its
/// reservation; hart-1's plain `SW x0,(x5)` (any store, not just an SC)
/// invalidates it globally, so hart-0's later `SC` at that address fails
/// (rd=1) — the "any store from any hart invalidates matching reservations"
/// rule from §4.9/C9, not true per-hart SMP atomicity.
#[test]
fn scenario_5_any_hart_store_invalidates_another_harts_reservation() {
    use msim_core::reservation::ReservationSet;
    use msim_core::memory::{PhysMemory, RegionKind};
    use msim_core::decode_cache::DecodeCache;
    use msim_core::riscv::RvCpu;

    let mut mem = PhysMemory::new();
    mem.map_region(0, 0x8010_0000, RegionKind::Rwm); // covers both the code page and the 0x2000 target
    let mut reservations = ReservationSet::new(2);
    let mut cache = DecodeCache::new();

    let mut hart0 = RvCpu::new(0, 0x8000_0000);
    let mut hart1 = RvCpu::new(1, 0x8000_0000);
    hart0.gpr[5] = 0x2000;
    hart1.gpr[5] = 0x2000;

    // lr.w x1, (x5)
    let lr = (0b00010 << 27) | (0 << 25) | (0 << 20) | (5 << 15) | (0b010 << 12) | (1 << 7) | 0b0101111;
    mem.write32(0x8000_0000, lr, false);
    let _ = hart0.step(&mut mem, &mut cache, &mut reservations);
    assert!(reservations.holds(0, 0x2000));

    // sw x0, 0(x5) — an ordinary store, not an SC, from the other hart.
    let sw = (0 << 25) | (0 << 20) | (5 << 15) | (0b010 << 12) | (0 << 7) | 0b0100011;
    mem.write32(0x8000_0000, sw, false);
    let _ = hart1.step(&mut mem, &mut cache, &mut reservations);
    assert!(
        !reservations.holds(0, 0x2000),
        "any hart's store to a reserved address invalidates it, not just the reserving hart's own"
    );

    // sc.w x2, x3, (x5) from hart-0 now fails: rd=1, memory unchanged.
    // Rewind hart-0's pc: both harts share the one instruction address this
    // test writes to, and hart-0 already stepped past it once.
    hart0.pc = 0x8000_0000;
    let sc = (0b00011 << 27) | (0 << 25) | (3 << 20) | (5 << 15) | (0b010 << 12) | (2 << 7) | 0b0101111;
    mem.write32(0x8000_0000, sc, false);
    hart0.gpr[3] = 0xDEAD_BEEF;
    let _ = hart0.step(&mut mem, &mut cache, &mut reservations);
    assert_eq!(hart0.gpr[2], 1, "a stale reservation must fail sc.w");
    assert_eq!(mem.read32(0x2000, false), 0, "the failed sc must not touch memory");
}

/// Scenario 6: with `mtimecmp = mtime + 100`, run until `mtime >= mtimecmp`;
/// MTIP sets in mip.
#[test]
fn scenario_6_mtip_sets_once_mtime_reaches_mtimecmp() {
    let mut m = riscv_machine();
    {
        let Hart::Riscv(cpu) = &mut m.harts_mut()[0] else { unreachable!() };
        cpu.csr.mtimecmp = cpu.csr.mtime + 100;
    }
    m.run_steps(100);
    let cpu = riscv_cpu(&m);
    assert_eq!(
        cpu.csr.mip & msim_core::riscv::csr::interrupt_bits::MTIP,
        msim_core::riscv::csr::interrupt_bits::MTIP
    );
}

/// Invariant: x0 always reads as zero, even after an instruction targets it.
#[test]
fn invariant_x0_always_reads_zero() {
    let mut m = riscv_machine();
    let base = 0x8000_0000u64;
    // addi x0, x0, 5 (targets x0, must not stick)
    let word = (5u32 << 20) | (0 << 15) | (0b000 << 12) | (0 << 7) | 0b0010011;
    m.memory_mut().write32(base, word, false);
    m.run_steps(1);
    assert_eq!(riscv_cpu(&m).gpr[0], 0);
}

/// Invariant: a store through the bus clears decode-validity of the
/// touched frame until the next fetch re-decodes it.
#[test]
fn invariant_store_invalidates_decode_cache_entry() {
    let mut m = riscv_machine();
    let addr = 0x8000_2000u64;
    let mem = m.memory_mut();
    mem.read8(addr, false);
    mem.set_decode_valid(addr);
    assert!(mem.frame_decode_valid(addr));
    mem.write8(addr, 1, false);
    assert!(!mem.frame_decode_valid(addr));
}
