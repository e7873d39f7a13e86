//! component C7: parses and evaluates operand text into register reads/
//! writes, immediates, and `[base±disp]` memory expressions.
//!
//! grounded on dustbox-rs's `cpu/parameter.rs` `Parameter` enum (the decoded
//! shape an operand settles into before the dispatcher touches it), but
//! parsed directly from the parser's operand strings instead of decoded
//! from opcode bytes, since this engine's instruction stream already
//! arrives as text-form `Instruction` records.

use crate::cpu::{CpuState, R, R8};
use crate::devices::AudioEvent;
use crate::error::EngineError;
use crate::memory::Mmu;

/// the address form inside a `[...]` memory expression.
#[derive(Clone, Debug, PartialEq)]
pub enum MemRef {
    Absolute(u32),
    Base(R),
    BaseDisp(R, i64),
}

/// a parsed operand, ready to be read from or written to CPU/memory state.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Reg32(R),
    Reg8(R8),
    Imm(u32),
    Mem(MemRef),
}

/// parses `0x...` hex, `0b...` binary, signed decimal, or a `'X'` ASCII
/// character literal into its 32-bit (two's-complement, for negatives) value.
pub fn parse_immediate(text: &str) -> Option<u32> {
    let t = text.trim();
    if t.len() >= 3 && t.starts_with('\'') && t.ends_with('\'') {
        let inner = &t[1..t.len() - 1];
        let mut chars = inner.chars();
        let c = chars.next()?;
        if chars.next().is_none() && c.is_ascii() {
            return Some(c as u32);
        }
        return None;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return u32::from_str_radix(bin, 2).ok();
    }
    if let Ok(v) = t.parse::<i64>() {
        if v >= i64::from(i32::min_value()) && v <= i64::from(u32::max_value()) {
            return Some(v as u32);
        }
    }
    None
}

fn parse_mem_inner(inner: &str) -> Result<MemRef, EngineError> {
    let s = inner.trim();
    if let Some(reg) = R::parse(s) {
        return Ok(MemRef::Base(reg));
    }
    // look for a `+`/`-` splitting a base register from a displacement;
    // skip index 0 so a leading sign on a plain negative immediate (e.g.
    // "-4") isn't mistaken for one.
    if s.len() > 1 {
        if let Some(pos) = s[1..].find(|c| c == '+' || c == '-').map(|p| p + 1) {
            let (base_txt, rest) = s.split_at(pos);
            let sign = &rest[0..1];
            let disp_txt = rest[1..].trim();
            if let Some(reg) = R::parse(base_txt.trim()) {
                if let Some(mag) = parse_immediate(disp_txt) {
                    let mag = i64::from(mag);
                    let disp = if sign == "-" { -mag } else { mag };
                    return Ok(MemRef::BaseDisp(reg, disp));
                }
            }
        }
    }
    if let Some(v) = parse_immediate(s) {
        return Ok(MemRef::Absolute(v));
    }
    Err(EngineError::BadOperand(format!("[{}]", inner)))
}

impl Operand {
    /// parses operand text per spec.md §4.1's grammar.
    pub fn parse(text: &str) -> Result<Operand, EngineError> {
        let t = text.trim();
        if t.len() >= 2 && t.starts_with('[') && t.ends_with(']') {
            let inner = &t[1..t.len() - 1];
            return parse_mem_inner(inner).map(Operand::Mem);
        }
        if let Some(r) = R::parse(t) {
            return Ok(Operand::Reg32(r));
        }
        if let Some(r8) = R8::parse(t) {
            return Ok(Operand::Reg8(r8));
        }
        if let Some(v) = parse_immediate(t) {
            return Ok(Operand::Imm(v));
        }
        Err(EngineError::BadOperand(t.to_string()))
    }
}

/// resolves a memory expression to its effective address; never touches memory.
pub fn eval_address(m: &MemRef, cpu: &CpuState) -> u32 {
    match m {
        MemRef::Absolute(a) => *a,
        MemRef::Base(r) => cpu.get_r32(*r),
        MemRef::BaseDisp(r, disp) => {
            let base = i64::from(cpu.get_r32(*r));
            (base + disp) as u32
        }
    }
}

/// reads an operand's full 32-bit value. memory operands always read the
/// 32-bit word at their address (spec.md §4.1); only MOVZX/MOVSX special-case
/// a single byte, via `read_byte_operand`.
pub fn read_operand(op: &Operand, cpu: &CpuState, mmu: &mut Mmu) -> u32 {
    match op {
        Operand::Reg32(r) => cpu.get_r32(*r),
        Operand::Reg8(r8) => u32::from(cpu.get_r8(*r8)),
        Operand::Imm(v) => *v,
        Operand::Mem(m) => mmu.read_u32(eval_address(m, cpu)),
    }
}

/// reads the low 8 bits of an operand, for MOVZX/MOVSX's byte-sized source.
pub fn read_byte_operand(op: &Operand, cpu: &CpuState, mmu: &mut Mmu) -> u8 {
    match op {
        Operand::Reg32(r) => cpu.get_r32(*r) as u8,
        Operand::Reg8(r8) => cpu.get_r8(*r8),
        Operand::Imm(v) => *v as u8,
        Operand::Mem(m) => mmu.read_u8(eval_address(m, cpu)),
    }
}

/// writes a 32-bit value back to an operand. returns any audio events fired
/// by a write that lands on the audio MMIO range.
pub fn write_operand(
    op: &Operand,
    val: u32,
    cpu: &mut CpuState,
    mmu: &mut Mmu,
) -> Result<Vec<AudioEvent>, EngineError> {
    match op {
        Operand::Reg32(r) => {
            cpu.set_r32(*r, val);
            Ok(Vec::new())
        }
        Operand::Reg8(r8) => {
            cpu.set_r8(*r8, val as u8);
            Ok(Vec::new())
        }
        Operand::Imm(v) => Err(EngineError::BadOperand(format!(
            "cannot write to immediate destination {}",
            v
        ))),
        Operand::Mem(m) => {
            let addr = eval_address(m, cpu);
            Ok(mmu.write_u32(addr, val))
        }
    }
}
