//! Execution engine for an educational subset of 32-bit x86 assembly:
//! registers and flags (`cpu`), two independent 64 KiB memory banks behind
//! an MMIO router (`memory`), the display/keyboard/audio peripherals
//! (`devices`), operand parsing (`operand`), mnemonic dispatch
//! (`dispatcher`), software interrupts (`interrupt`), and the public
//! `Engine` driver that ties them together (`engine`).
//!
//! same crate-root shape as dustbox-rs's `lib.rs`: `#[macro_use] extern
//! crate` for `quick_error`/`serde_derive`, then a flat list of `pub mod`s.

#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate serde_derive;

pub mod bytecode;
pub mod console;
pub mod cpu;
pub mod devices;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod interrupt;
pub mod memory;
pub mod operand;

pub use crate::bytecode::BytecodeProgram;
pub use crate::console::Console;
pub use crate::cpu::CompatibilityMode;
pub use crate::engine::{CpuSnapshot, DisplaySnapshot, Engine, STEP_SENTINEL};
pub use crate::error::EngineError;
pub use crate::instruction::{DataItem, Instruction, LabelTable};
