use super::*;
use crate::cpu::CompatibilityMode;
use crate::memory::Mmu;
use std::collections::HashMap;

fn ops(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
}

struct Harness {
    cpu: CpuState,
    mmu: Mmu,
    console: Console,
    labels: LabelTable,
    mode: CompatibilityMode,
    audio_events: Vec<AudioEvent>,
}

impl Harness {
    fn new() -> Self {
        Harness {
            cpu: CpuState::default(),
            mmu: Mmu::new(4, 4),
            console: Console::new(),
            labels: HashMap::new(),
            mode: CompatibilityMode::Educational,
            audio_events: Vec::new(),
        }
    }

    fn dispatch(&mut self, mnemonic: &str, operands: &[String]) -> Result<Flow, EngineError> {
        let mut ctx = Context {
            cpu: &mut self.cpu,
            mmu: &mut self.mmu,
            console: &mut self.console,
            labels: &self.labels,
            mode: self.mode,
            audio_events: &mut self.audio_events,
        };
        dispatch(mnemonic, operands, &mut ctx)
    }
}

#[test]
fn mov_writes_src_into_dest() {
    let mut h = Harness::new();
    h.dispatch("MOV", &ops(&["EAX", "5"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 5);
}

#[test]
fn mov_mem_to_mem_rejected_in_strict_mode() {
    let mut h = Harness::new();
    h.mode = CompatibilityMode::StrictX86;
    let err = h.dispatch("MOV", &ops(&["[0xF000]", "[0xF100]"])).unwrap_err();
    assert_eq!(err, EngineError::StrictMovMemToMem);
}

#[test]
fn mov_mem_to_mem_allowed_in_educational_mode() {
    let mut h = Harness::new();
    h.dispatch("MOV", &ops(&["[0x3000]", "5"])).unwrap();
    h.dispatch("MOV", &ops(&["[0x4000]", "[0x3000]"])).unwrap();
    assert_eq!(h.mmu.read_u32(0x4000), 5);
}

#[test]
fn xchg_swaps_without_touching_flags() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 1);
    h.cpu.set_r32(R::EBX, 2);
    h.cpu.flags.set_carry(true);
    h.dispatch("XCHG", &ops(&["EAX", "EBX"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 2);
    assert_eq!(h.cpu.get_r32(R::EBX), 1);
    assert!(h.cpu.flags.carry());
}

#[test]
fn lea_stores_address_without_reading_memory() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EBP, 0x100);
    h.dispatch("LEA", &ops(&["EAX", "[EBP-4]"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0xFC);
}

#[test]
fn movsx_sign_extends_negative_byte() {
    let mut h = Harness::new();
    h.cpu.set_r8(crate::cpu::R8::AL, 0xFF);
    h.dispatch("MOVSX", &ops(&["EBX", "AL"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EBX), 0xFFFF_FFFF);
}

#[test]
fn movzx_zero_extends() {
    let mut h = Harness::new();
    h.cpu.set_r8(crate::cpu::R8::AL, 0xFF);
    h.dispatch("MOVZX", &ops(&["EBX", "AL"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EBX), 0xFF);
}

#[test]
fn add_sets_zero_flag_on_wraparound_to_zero() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 0xFFFF_FFFF);
    h.dispatch("ADD", &ops(&["EAX", "1"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0);
    assert!(h.cpu.flags.zero());
    assert!(h.cpu.flags.carry());
}

#[test]
fn cmp_does_not_write_destination() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 5);
    h.dispatch("CMP", &ops(&["EAX", "5"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 5);
    assert!(h.cpu.flags.zero());
}

#[test]
fn inc_preserves_carry_flag() {
    let mut h = Harness::new();
    h.cpu.flags.set_carry(true);
    h.dispatch("INC", &ops(&["EAX"])).unwrap();
    assert!(h.cpu.flags.carry());
}

#[test]
fn xor_self_zeroes_and_sets_zf() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 42);
    h.dispatch("XOR", &ops(&["EAX", "EAX"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0);
    assert!(h.cpu.flags.zero());
    assert!(!h.cpu.flags.carry());
}

#[test]
fn shl_count_33_behaves_like_count_1() {
    let mut h1 = Harness::new();
    h1.cpu.set_r32(R::EAX, 1);
    h1.dispatch("SHL", &ops(&["EAX", "33"])).unwrap();

    let mut h2 = Harness::new();
    h2.cpu.set_r32(R::EAX, 1);
    h2.dispatch("SHL", &ops(&["EAX", "1"])).unwrap();

    assert_eq!(h1.cpu.get_r32(R::EAX), h2.cpu.get_r32(R::EAX));
    assert_eq!(h1.cpu.flags.carry(), h2.cpu.flags.carry());
}

#[test]
fn shift_with_count_zero_leaves_flags_and_result_unchanged() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 7);
    h.cpu.flags.set_overflow(true);
    h.dispatch("SHL", &ops(&["EAX", "0"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 7);
    assert!(h.cpu.flags.overflow());
}

#[test]
fn mul_sets_edx_to_high_word_and_cf_of_when_nonzero() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 0xFFFF_FFFF);
    h.dispatch("MUL", &ops(&["2"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0xFFFF_FFFE);
    assert_eq!(h.cpu.get_r32(R::EDX), 1);
    assert!(h.cpu.flags.carry());
    assert!(h.cpu.flags.overflow());
}

#[test]
fn div_by_zero_zeroes_eax_edx_and_leaves_flags_alone() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 99);
    h.cpu.flags.set_sign(true);
    h.dispatch("DIV", &ops(&["0"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0);
    assert_eq!(h.cpu.get_r32(R::EDX), 0);
    assert!(h.cpu.flags.sign());
}

#[test]
fn idiv_min_by_negative_one_is_swallowed_like_division_by_zero() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 0); // EDX:EAX = 0x8000_0000_0000_0000 = i64::MIN
    h.cpu.set_r32(R::EDX, 0x8000_0000);
    h.cpu.flags.set_sign(true);
    h.dispatch("IDIV", &ops(&["-1"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EAX), 0);
    assert_eq!(h.cpu.get_r32(R::EDX), 0);
    assert!(h.cpu.flags.sign());
}

#[test]
fn push_then_pop_round_trips_and_restores_esp() {
    let mut h = Harness::new();
    let esp_before = h.cpu.get_r32(R::ESP);
    h.cpu.set_r32(R::EAX, 0xDEAD_BEEF);
    h.dispatch("PUSH", &ops(&["EAX"])).unwrap();
    h.dispatch("POP", &ops(&["EBX"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::EBX), 0xDEAD_BEEF);
    assert_eq!(h.cpu.get_r32(R::ESP), esp_before);
}

#[test]
fn hlt_sets_halted_and_reports_halted_flow() {
    let mut h = Harness::new();
    let flow = h.dispatch("HLT", &[]).unwrap();
    assert_eq!(flow, Flow::Halted);
    assert!(h.cpu.halted);
}

#[test]
fn wrong_arity_is_silently_ignored() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::EAX, 7);
    let flow = h.dispatch("ADD", &ops(&["EAX"])).unwrap();
    assert_eq!(flow, Flow::Advance);
    assert_eq!(h.cpu.get_r32(R::EAX), 7);
}

#[test]
fn unknown_mnemonic_is_silently_ignored() {
    let mut h = Harness::new();
    let flow = h.dispatch("FROBNICATE", &ops(&["EAX"])).unwrap();
    assert_eq!(flow, Flow::Advance);
}

#[test]
fn jmp_to_unknown_label_is_fatal() {
    let mut h = Harness::new();
    let err = h.dispatch("JMP", &ops(&["nowhere"])).unwrap_err();
    assert_eq!(err, EngineError::UnknownLabel("nowhere".to_string()));
}

#[test]
fn conditional_jump_advances_when_condition_false() {
    let mut h = Harness::new();
    h.cpu.eip = 3;
    h.cpu.flags.set_zero(false);
    let flow = h.dispatch("JE", &ops(&["nowhere"])).unwrap();
    assert_eq!(flow, Flow::Advance);
    assert_eq!(h.cpu.eip, 3);
}

#[test]
fn call_then_ret_restores_eip_and_call_stack_depth() {
    let mut h = Harness::new();
    h.labels.insert("f".to_string(), 10);
    h.cpu.eip = 2;
    h.dispatch("CALL", &ops(&["f"])).unwrap();
    assert_eq!(h.cpu.eip, 10);
    assert_eq!(h.cpu.call_stack_depth(), 1);
    h.dispatch("RET", &[]).unwrap();
    assert_eq!(h.cpu.eip, 3);
    assert_eq!(h.cpu.call_stack_depth(), 0);
}

#[test]
fn ret_with_empty_call_stack_is_permissive() {
    let mut h = Harness::new();
    h.cpu.eip = 5;
    h.dispatch("RET", &[]).unwrap();
    assert_eq!(h.cpu.eip, 6);
}

#[test]
fn push_then_pop_wraps_esp_at_16_bits() {
    let mut h = Harness::new();
    h.cpu.set_r32(R::ESP, 1);
    h.cpu.set_r32(R::EAX, 0xDEAD_BEEF);
    h.dispatch("PUSH", &ops(&["EAX"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::ESP), 0xFFFD);
    h.dispatch("POP", &ops(&["EBX"])).unwrap();
    assert_eq!(h.cpu.get_r32(R::ESP), 1);
    assert_eq!(h.cpu.get_r32(R::EBX), 0xDEAD_BEEF);
}
