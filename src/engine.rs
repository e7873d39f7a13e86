//! `Engine`: the public API (§6) and the control-flow driver (C10).
//!
//! grounded on dustbox-rs's `Machine` (`machine.rs`) — an owning struct that
//! bundles CPU state and hardware, exposes `execute_instruction`/
//! `execute_instructions`/`register_snapshot` to a host loop, and knows how
//! to load a program atomically. This crate's `Engine` keeps that shape:
//! `step()` plays the role of `Machine::execute_instruction`, generalized
//! from dustbox-rs's single fixed real-mode loader to `loadInstructions`/
//! `loadData`/`loadProgram`'s three entry points, and `breakpoints`/`pause`/
//! `halt` generalize dustbox-rs's external `debugger` crate's step-loop
//! into the engine itself since this spec has no separate debugger binary.

use crate::console::Console;
use crate::cpu::{CompatibilityMode, CpuState};
use crate::devices::{AudioEvent, Display, KeyboardStatus};
use crate::dispatcher::{dispatch, Context, Flow};
use crate::error::EngineError;
use crate::instruction::{DataItem, Instruction, LabelTable};
use crate::memory::{MemoryBank, Mmu};

/// sentinel `step()`/`run()` return when the engine is halted or has run
/// past the end of the loaded instruction list.
pub const STEP_SENTINEL: i64 = -1;

/// an owned snapshot of CPU state, returned by `getState()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub registers: [u32; 8],
    pub flags: u32,
    pub eip: usize,
    pub pc: u64,
    pub halted: bool,
    pub running: bool,
    pub call_stack_depth: usize,
}

/// an owned snapshot of the framebuffer, returned by `getDisplay()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// the execution engine: CPU state, both memory banks, MMIO-routed
/// peripherals, the loaded program, and the console output buffer.
pub struct Engine {
    cpu: CpuState,
    mmu: Mmu,
    /// bank B: addressed directly via `getMemoryB`; no instruction in this
    /// ISA's operand grammar targets it (spec.md's memory expressions and
    /// MMIO router are both scoped to bank A's address space). kept as
    /// plain host-accessible storage, same role as dustbox-rs's auxiliary
    /// `hardware` buffers that the CPU never touches directly.
    mem_b: MemoryBank,
    instructions: Vec<Instruction>,
    labels: LabelTable,
    console: Console,
    mode: CompatibilityMode,
    /// the breakpoint this engine most recently paused at without
    /// executing, so the *next* call to `step()` at the same EIP goes
    /// through instead of pausing forever. cleared once EIP moves on.
    paused_at: Option<usize>,
    audio_sink: Option<Box<dyn FnMut(AudioEvent)>>,
}

impl Engine {
    /// constructs a fresh engine. ESP starts at `0xFFFF`; all registers,
    /// memory, and devices start zeroed; `mode` defaults to `Educational`.
    pub fn new(width: usize, height: usize, mode: CompatibilityMode) -> Self {
        Engine {
            cpu: CpuState::default(),
            mmu: Mmu::new(width, height),
            mem_b: MemoryBank::new(),
            instructions: Vec::new(),
            labels: LabelTable::new(),
            console: Console::new(),
            mode,
            paused_at: None,
            audio_sink: None,
        }
    }

    /// replaces the loaded program atomically and resets EIP to 0. does not
    /// touch registers, memory, or devices — only `reset()` does that.
    pub fn load_instructions(&mut self, instructions: Vec<Instruction>, labels: LabelTable) {
        self.instructions = instructions;
        self.labels = labels;
        self.cpu.eip = 0;
        self.cpu.halted = false;
        self.paused_at = None;
    }

    /// stores initialized bytes into bank A, little-endian, sequentially
    /// from each item's `address`.
    pub fn load_data(&mut self, items: &[DataItem]) {
        for item in items {
            let mut addr = item.address;
            for v in &item.values {
                match item.size {
                    1 => self.mmu.bank_a.write_u8(addr as u16, *v as u8),
                    2 => {
                        let w = *v as u16;
                        self.mmu.bank_a.write_u8(addr as u16, w as u8);
                        self.mmu.bank_a.write_u8(addr.wrapping_add(1) as u16, (w >> 8) as u8);
                    }
                    4 => self.mmu.bank_a.write_u32(addr as u16, *v as u32),
                    _ => {}
                }
                addr = addr.wrapping_add(u32::from(item.size.max(1)));
            }
        }
    }

    /// decodes a `bincode`-encoded `BytecodeProgram` and loads it exactly as
    /// `loadInstructions` + `loadData` would; resets the CPU first.
    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let program: crate::bytecode::BytecodeProgram = bincode::deserialize(bytes)
            .map_err(|e| EngineError::BadOperand(format!("malformed bytecode program: {}", e)))?;
        self.cpu = CpuState::default();
        let labels: LabelTable = program.labels.into_iter().collect();
        self.load_instructions(program.instructions, labels);
        self.load_data(&program.data);
        Ok(())
    }

    /// executes one instruction per spec.md §4.4's execution order. returns
    /// the source line executed, or `STEP_SENTINEL` if halted, past the end
    /// of the program, or paused at a not-yet-acknowledged breakpoint.
    pub fn step(&mut self) -> Result<i64, EngineError> {
        if self.cpu.halted {
            return Ok(STEP_SENTINEL);
        }
        if self.cpu.eip >= self.instructions.len() {
            self.cpu.halted = true;
            self.cpu.running = false;
            return Ok(STEP_SENTINEL);
        }
        if self.cpu.breakpoints.contains(&self.cpu.eip) {
            if self.paused_at != Some(self.cpu.eip) {
                self.paused_at = Some(self.cpu.eip);
                self.cpu.running = false;
                return Ok(STEP_SENTINEL);
            }
        } else if self.paused_at.is_some() {
            self.paused_at = None;
        }

        let (mnemonic, operands, line) = {
            let instr = &self.instructions[self.cpu.eip];
            (instr.mnemonic.clone(), instr.operands.clone(), instr.line)
        };

        let flow = self.dispatch_one(&mnemonic, &operands)?;

        match flow {
            Flow::Advance => self.cpu.eip += 1,
            Flow::Branched | Flow::Halted => {}
        }
        self.cpu.pc = self.cpu.pc.wrapping_add(1);

        Ok(line as i64)
    }

    /// runs to completion: repeatedly steps until halted, past the program
    /// end, paused at a breakpoint, or `pause()`d. stops and propagates on
    /// the first fatal error, leaving state as of the last committed step.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.cpu.running = true;
        while self.cpu.running && !self.cpu.halted {
            if self.step()? == STEP_SENTINEL {
                break;
            }
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        self.cpu.running = false;
    }

    pub fn halt(&mut self) {
        self.cpu.halted = true;
        self.cpu.running = false;
    }

    /// reconstructs CPU, memory, and device state to match a freshly
    /// constructed engine of the same width/height/mode, except the
    /// breakpoint set (preserved) and the currently loaded program
    /// (preserved, so a host's "restart" button re-runs the same code).
    pub fn reset(&mut self) {
        let breakpoints = self.cpu.breakpoints.clone();
        self.cpu = CpuState::default();
        self.cpu.breakpoints = breakpoints;
        self.mmu.reset();
        self.mem_b.clear();
        self.console.clear();
        self.paused_at = None;
    }

    /// dispatches a single named instruction without touching the loaded
    /// program or EIP's auto-advance, e.g. for host-side unit testing of a
    /// single opcode.
    pub fn execute_instruction(&mut self, mnemonic: &str, operands: &[String]) -> Result<(), EngineError> {
        self.dispatch_one(mnemonic, operands)?;
        Ok(())
    }

    fn dispatch_one(&mut self, mnemonic: &str, operands: &[String]) -> Result<Flow, EngineError> {
        let mut audio_events = Vec::new();
        let flow = {
            let mut ctx = Context {
                cpu: &mut self.cpu,
                mmu: &mut self.mmu,
                console: &mut self.console,
                labels: &self.labels,
                mode: self.mode,
                audio_events: &mut audio_events,
            };
            dispatch(mnemonic, operands, &mut ctx)?
        };
        if let Some(sink) = self.audio_sink.as_mut() {
            for ev in audio_events {
                sink(ev);
            }
        }
        Ok(flow)
    }

    pub fn get_state(&self) -> CpuSnapshot {
        CpuSnapshot {
            registers: self.cpu.registers_snapshot(),
            flags: self.cpu.flags.as_u32(),
            eip: self.cpu.eip,
            pc: self.cpu.pc,
            halted: self.cpu.halted,
            running: self.cpu.running,
            call_stack_depth: self.cpu.call_stack_depth(),
        }
    }

    pub fn get_registers(&self) -> [u32; 8] {
        self.cpu.registers_snapshot()
    }

    pub fn get_memory_a(&self, addr: u32, len: usize) -> Vec<u8> {
        self.mmu.bank_a.read(addr as u16, len)
    }

    pub fn get_memory_b(&self, addr: u32, len: usize) -> Vec<u8> {
        self.mem_b.read(addr as u16, len)
    }

    pub fn get_display(&self) -> DisplaySnapshot {
        let d: &Display = &self.mmu.display;
        DisplaySnapshot {
            width: d.width(),
            height: d.height(),
            pixels: d.snapshot(),
        }
    }

    pub fn get_keyboard_status(&self) -> KeyboardStatus {
        self.mmu.keyboard.status_snapshot()
    }

    pub fn get_console_output(&self) -> String {
        self.console.as_string()
    }

    pub fn clear_console_output(&mut self) {
        self.console.clear();
    }

    pub fn get_compatibility_mode(&self) -> CompatibilityMode {
        self.mode
    }

    pub fn set_compatibility_mode(&mut self, mode: CompatibilityMode) {
        self.mode = mode;
    }

    pub fn push_keyboard_event(&mut self, key_code: u8, pressed: bool) {
        self.mmu.keyboard.push_event(key_code, pressed);
    }

    pub fn add_breakpoint(&mut self, eip: usize) {
        self.cpu.breakpoints.insert(eip);
    }

    pub fn remove_breakpoint(&mut self, eip: usize) {
        self.cpu.breakpoints.remove(&eip);
    }

    /// installs the host's sole audio-event sink, invoked once per emitted
    /// `AudioEvent` in program order.
    pub fn set_audio_sink<F: FnMut(AudioEvent) + 'static>(&mut self, sink: F) {
        self.audio_sink = Some(Box::new(sink));
    }
}
