//! component C9: mnemonic -> semantics. one large match over the
//! (case-folded) mnemonic string, each arm reading operands through the
//! evaluator (C7), computing flags through the kernel (C6), and writing
//! results back — the same read/compute/write/set-flags shape as
//! dustbox-rs's `cpu.rs::execute`'s per-`Op` match arms, generalized from a
//! decoded `Op` enum to this crate's string mnemonics since decoding lives
//! with the external parser here, not this crate.

use crate::console::Console;
use crate::cpu::{CompatibilityMode, CpuState, Flags, R};
use crate::devices::AudioEvent;
use crate::error::EngineError;
use crate::instruction::LabelTable;
use crate::interrupt;
use crate::memory::Mmu;
use crate::operand::{eval_address, read_byte_operand, read_operand, write_operand, Operand};

/// how a dispatched instruction wants EIP handled by the control-flow driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// non-branching instruction: the driver advances EIP by one.
    Advance,
    /// this instruction already set EIP itself (jump/call/ret/iret).
    Branched,
    /// HLT: EIP is left where it is.
    Halted,
}

/// the mutable state a single dispatch touches.
pub struct Context<'a> {
    pub cpu: &'a mut CpuState,
    pub mmu: &'a mut Mmu,
    pub console: &'a mut Console,
    pub labels: &'a LabelTable,
    pub mode: CompatibilityMode,
    pub audio_events: &'a mut Vec<AudioEvent>,
}

/// parses `operands` into exactly `n` `Operand`s. `Ok(None)` signals a
/// WrongArity mismatch, which callers treat as a silent no-op rather than
/// an error — required operand counts that don't match are never fatal.
fn parse_exact(operands: &[String], n: usize) -> Result<Option<Vec<Operand>>, EngineError> {
    if operands.len() != n {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(n);
    for o in operands {
        out.push(Operand::parse(o)?);
    }
    Ok(Some(out))
}

macro_rules! ops {
    ($operands:expr, $n:expr) => {
        match parse_exact($operands, $n)? {
            Some(o) => o,
            None => return Ok(Flow::Advance),
        }
    };
}

/// ESP lives in `[0, 0xFFFF]`; every PUSH/POP/IRET stack-pointer update goes
/// through this so the two sides of a push/pop pair can't drift apart.
fn wrap_esp(addend: i64, esp: u32) -> u32 {
    ((i64::from(esp) + addend) as u32) & 0xFFFF
}

fn jump_to(label: &str, ctx: &mut Context) -> Result<Flow, EngineError> {
    match ctx.labels.get(label) {
        Some(&idx) => {
            ctx.cpu.eip = idx;
            Ok(Flow::Branched)
        }
        None => Err(EngineError::UnknownLabel(label.to_string())),
    }
}

fn cond_jump(operands: &[String], ctx: &mut Context, taken: bool) -> Result<Flow, EngineError> {
    if operands.len() != 1 {
        return Ok(Flow::Advance);
    }
    if taken {
        jump_to(&operands[0], ctx)
    } else {
        Ok(Flow::Advance)
    }
}

/// dispatches one instruction. mnemonics are matched case-insensitively;
/// an unrecognized mnemonic is a silent no-op (spec.md §4.3).
pub fn dispatch(mnemonic: &str, operands: &[String], ctx: &mut Context) -> Result<Flow, EngineError> {
    let mnemonic = mnemonic.to_ascii_uppercase();
    match mnemonic.as_str() {
        "MOV" => {
            let o = ops!(operands, 2);
            let (dst, src) = (&o[0], &o[1]);
            if ctx.mode == CompatibilityMode::StrictX86 {
                if let (Operand::Mem(_), Operand::Mem(_)) = (dst, src) {
                    return Err(EngineError::StrictMovMemToMem);
                }
            }
            let val = read_operand(src, ctx.cpu, ctx.mmu);
            let events = write_operand(dst, val, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "XCHG" => {
            let o = ops!(operands, 2);
            let (a, b) = (&o[0], &o[1]);
            let av = read_operand(a, ctx.cpu, ctx.mmu);
            let bv = read_operand(b, ctx.cpu, ctx.mmu);
            let mut events = write_operand(a, bv, ctx.cpu, ctx.mmu)?;
            events.extend(write_operand(b, av, ctx.cpu, ctx.mmu)?);
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "LEA" => {
            let o = ops!(operands, 2);
            let (dst, src) = (&o[0], &o[1]);
            let addr = match src {
                Operand::Mem(m) => eval_address(m, ctx.cpu),
                _ => return Err(EngineError::BadOperand(operands[1].clone())),
            };
            write_operand(dst, addr, ctx.cpu, ctx.mmu)?;
            Ok(Flow::Advance)
        }

        "MOVZX" | "MOVSX" => {
            let o = ops!(operands, 2);
            let (dst, src) = (&o[0], &o[1]);
            let byte = read_byte_operand(src, ctx.cpu, ctx.mmu);
            let val = if mnemonic == "MOVZX" {
                u32::from(byte)
            } else {
                (byte as i8) as i32 as u32
            };
            let events = write_operand(dst, val, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "ADD" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv.wrapping_add(sv);
            ctx.cpu.flags.apply_add(dv, sv, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "SUB" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv.wrapping_sub(sv);
            ctx.cpu.flags.apply_sub(dv, sv, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "CMP" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv.wrapping_sub(sv);
            ctx.cpu.flags.apply_sub(dv, sv, result);
            Ok(Flow::Advance)
        }

        "INC" => {
            let o = ops!(operands, 1);
            let v = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let result = v.wrapping_add(1);
            ctx.cpu.flags.apply_inc(v, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "DEC" => {
            let o = ops!(operands, 1);
            let v = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let result = v.wrapping_sub(1);
            ctx.cpu.flags.apply_dec(v, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "NEG" => {
            let o = ops!(operands, 1);
            let v = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let result = 0u32.wrapping_sub(v);
            ctx.cpu.flags.apply_sub(0, v, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "AND" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv & sv;
            ctx.cpu.flags.apply_logical(result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "OR" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv | sv;
            ctx.cpu.flags.apply_logical(result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "XOR" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            let result = dv ^ sv;
            ctx.cpu.flags.apply_logical(result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "TEST" => {
            let o = ops!(operands, 2);
            let dv = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let sv = read_operand(&o[1], ctx.cpu, ctx.mmu);
            ctx.cpu.flags.apply_logical(dv & sv);
            Ok(Flow::Advance)
        }

        "NOT" => {
            let o = ops!(operands, 1);
            let v = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let events = write_operand(&o[0], !v, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "SHL" => {
            let o = ops!(operands, 2);
            let original = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let count = read_operand(&o[1], ctx.cpu, ctx.mmu) & 0x1F;
            let result = if count == 0 { original } else { original << count };
            ctx.cpu.flags.apply_shl(original, count, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "SHR" => {
            let o = ops!(operands, 2);
            let original = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let count = read_operand(&o[1], ctx.cpu, ctx.mmu) & 0x1F;
            let result = if count == 0 { original } else { original >> count };
            ctx.cpu.flags.apply_shr(original, count, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "SAR" => {
            let o = ops!(operands, 2);
            let original = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let count = read_operand(&o[1], ctx.cpu, ctx.mmu) & 0x1F;
            let result = if count == 0 {
                original
            } else {
                ((original as i32) >> count) as u32
            };
            ctx.cpu.flags.apply_sar(original, count, result);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "ROL" => {
            let o = ops!(operands, 2);
            let original = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let count = read_operand(&o[1], ctx.cpu, ctx.mmu) & 0x1F;
            let result = original.rotate_left(count);
            ctx.cpu.flags.apply_rol(count, result, ctx.mode);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "ROR" => {
            let o = ops!(operands, 2);
            let original = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let count = read_operand(&o[1], ctx.cpu, ctx.mmu) & 0x1F;
            let result = original.rotate_right(count);
            ctx.cpu.flags.apply_ror(count, result, ctx.mode);
            let events = write_operand(&o[0], result, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "MUL" => {
            let o = ops!(operands, 1);
            let src = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let eax = ctx.cpu.get_r32(R::EAX);
            let full = u64::from(eax) * u64::from(src);
            let low = full as u32;
            let high = (full >> 32) as u32;
            ctx.cpu.set_r32(R::EAX, low);
            ctx.cpu.set_r32(R::EDX, high);
            ctx.cpu.flags.apply_mul(high);
            Ok(Flow::Advance)
        }

        "IMUL" => match operands.len() {
            1 => {
                let o = ops!(operands, 1);
                let src = read_operand(&o[0], ctx.cpu, ctx.mmu) as i32;
                let eax = ctx.cpu.get_r32(R::EAX) as i32;
                let full = (i64::from(eax) * i64::from(src)) as u64;
                let low = full as u32;
                let high = (full >> 32) as u32;
                ctx.cpu.set_r32(R::EAX, low);
                ctx.cpu.set_r32(R::EDX, high);
                ctx.cpu.flags.apply_imul1(low, high);
                Ok(Flow::Advance)
            }
            2 => {
                let o = ops!(operands, 2);
                let dv = read_operand(&o[0], ctx.cpu, ctx.mmu) as i32;
                let sv = read_operand(&o[1], ctx.cpu, ctx.mmu) as i32;
                let full = i64::from(dv) * i64::from(sv);
                ctx.cpu.flags.apply_imul_trunc(full);
                let events = write_operand(&o[0], full as u32, ctx.cpu, ctx.mmu)?;
                ctx.audio_events.extend(events);
                Ok(Flow::Advance)
            }
            3 => {
                let o = ops!(operands, 3);
                let sv = read_operand(&o[1], ctx.cpu, ctx.mmu) as i32;
                let iv = read_operand(&o[2], ctx.cpu, ctx.mmu) as i32;
                let full = i64::from(sv) * i64::from(iv);
                ctx.cpu.flags.apply_imul_trunc(full);
                let events = write_operand(&o[0], full as u32, ctx.cpu, ctx.mmu)?;
                ctx.audio_events.extend(events);
                Ok(Flow::Advance)
            }
            _ => Ok(Flow::Advance),
        },

        "DIV" => {
            let o = ops!(operands, 1);
            let divisor = read_operand(&o[0], ctx.cpu, ctx.mmu);
            if divisor == 0 {
                ctx.cpu.set_r32(R::EAX, 0);
                ctx.cpu.set_r32(R::EDX, 0);
                return Ok(Flow::Advance);
            }
            let dividend = (u64::from(ctx.cpu.get_r32(R::EDX)) << 32) | u64::from(ctx.cpu.get_r32(R::EAX));
            let quotient = dividend / u64::from(divisor);
            let remainder = dividend % u64::from(divisor);
            ctx.cpu.set_r32(R::EAX, quotient as u32);
            ctx.cpu.set_r32(R::EDX, remainder as u32);
            Ok(Flow::Advance)
        }

        "IDIV" => {
            let o = ops!(operands, 1);
            let divisor = read_operand(&o[0], ctx.cpu, ctx.mmu) as i32;
            let dividend = ((u64::from(ctx.cpu.get_r32(R::EDX)) << 32) | u64::from(ctx.cpu.get_r32(R::EAX))) as i64;
            // divisor == 0 is the documented swallowed #DE; i64::MIN / -1 is
            // the same trap in disguise (quotient doesn't fit in i64), so it
            // gets the same treatment rather than panicking on valid operands.
            if divisor == 0 || (divisor == -1 && dividend == i64::min_value()) {
                ctx.cpu.set_r32(R::EAX, 0);
                ctx.cpu.set_r32(R::EDX, 0);
                return Ok(Flow::Advance);
            }
            let quotient = dividend / i64::from(divisor);
            let remainder = dividend % i64::from(divisor);
            ctx.cpu.set_r32(R::EAX, quotient as u32);
            ctx.cpu.set_r32(R::EDX, remainder as u32);
            Ok(Flow::Advance)
        }

        "PUSH" => {
            let o = ops!(operands, 1);
            let val = read_operand(&o[0], ctx.cpu, ctx.mmu);
            let esp = ctx.cpu.get_r32(R::ESP);
            let new_esp = wrap_esp(-4, esp);
            ctx.mmu.bank_a.write_u32(new_esp as u16, val);
            ctx.cpu.set_r32(R::ESP, new_esp);
            Ok(Flow::Advance)
        }

        "POP" => {
            let o = ops!(operands, 1);
            let esp = ctx.cpu.get_r32(R::ESP);
            let val = ctx.mmu.bank_a.read_u32(esp as u16);
            let new_esp = wrap_esp(4, esp);
            ctx.cpu.set_r32(R::ESP, new_esp);
            let events = write_operand(&o[0], val, ctx.cpu, ctx.mmu)?;
            ctx.audio_events.extend(events);
            Ok(Flow::Advance)
        }

        "HLT" => {
            ctx.cpu.halted = true;
            Ok(Flow::Halted)
        }

        "NOP" => Ok(Flow::Advance),

        "INT" => {
            let o = ops!(operands, 1);
            let vector = read_operand(&o[0], ctx.cpu, ctx.mmu) as u8;
            let halts = interrupt::handle(vector, ctx.cpu, ctx.console);
            if halts {
                ctx.cpu.halted = true;
                Ok(Flow::Halted)
            } else {
                Ok(Flow::Advance)
            }
        }

        "IRET" => {
            let esp = ctx.cpu.get_r32(R::ESP);
            let ret_addr = ctx.mmu.bank_a.read_u32(esp as u16);
            let esp2 = wrap_esp(4, esp);
            let flags_word = ctx.mmu.bank_a.read_u32(esp2 as u16);
            let esp3 = wrap_esp(4, esp2);
            ctx.cpu.set_r32(R::ESP, esp3);
            ctx.cpu.flags = Flags::from_u32(flags_word);
            ctx.cpu.eip = ret_addr as usize;
            Ok(Flow::Branched)
        }

        "JMP" => {
            if operands.len() != 1 {
                return Ok(Flow::Advance);
            }
            jump_to(&operands[0], ctx)
        }

        "JE" | "JZ" | "JNE" | "JNZ" | "JG" | "JGE" | "JL" | "JLE" | "JS" | "JNS" | "JA" | "JAE" | "JB" | "JBE" => {
            let f = ctx.cpu.flags;
            let taken = match mnemonic.as_str() {
                "JE" | "JZ" => f.zero(),
                "JNE" | "JNZ" => !f.zero(),
                "JG" => !f.zero() && f.sign() == f.overflow(),
                "JGE" => f.sign() == f.overflow(),
                "JL" => f.sign() != f.overflow(),
                "JLE" => f.zero() || f.sign() != f.overflow(),
                "JS" => f.sign(),
                "JNS" => !f.sign(),
                "JA" => !f.carry() && !f.zero(),
                "JAE" => !f.carry(),
                "JB" => f.carry(),
                "JBE" => f.carry() || f.zero(),
                _ => unreachable!(),
            };
            cond_jump(operands, ctx, taken)
        }

        "CALL" => {
            if operands.len() != 1 {
                return Ok(Flow::Advance);
            }
            let ret_eip = ctx.cpu.eip + 1;
            match ctx.labels.get(&operands[0]) {
                Some(&idx) => {
                    ctx.cpu.call_stack.push(ret_eip);
                    ctx.cpu.eip = idx;
                    Ok(Flow::Branched)
                }
                None => Err(EngineError::UnknownLabel(operands[0].clone())),
            }
        }

        "RET" => {
            match ctx.cpu.call_stack.pop() {
                Some(ret) => ctx.cpu.eip = ret,
                None => ctx.cpu.eip = ctx.cpu.eip.wrapping_add(1),
            }
            Ok(Flow::Branched)
        }

        // unrecognized mnemonic: tolerated by design, silently ignored.
        _ => Ok(Flow::Advance),
    }
}

#[cfg(test)]
#[path = "./dispatcher_test.rs"]
mod dispatcher_test;
