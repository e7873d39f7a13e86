//! INT 0x10/0x20/0x21 handling: console output and termination.
//!
//! grounded on dustbox-rs's `interrupt/int10.rs` and `interrupt/int21.rs`
//! (`match machine.cpu.get_r8(R::AH) { ... }` dispatch on the AH sub-register),
//! trimmed to the two teletype-style output calls and the terminate vector
//! this spec actually names — the rest of dustbox-rs's BIOS/DOS surface
//! (cursor positioning, video modes, file I/O) is out of scope per spec.md.

use crate::console::Console;
use crate::cpu::{CpuState, R};

/// dispatches a software interrupt vector. returns true iff it halts the machine.
pub fn handle(vector: u8, cpu: &mut CpuState, console: &mut Console) -> bool {
    match vector {
        0x10 => {
            // VIDEO - TELETYPE OUTPUT: AH=0x0E, AL=character
            if ah(cpu) == 0x0E {
                console.push_byte(al(cpu));
            }
            false
        }
        0x20 => true, // DOS - TERMINATE PROGRAM
        0x21 => {
            // DOS - WRITE CHARACTER TO STANDARD OUTPUT: AH=0x02, DL=character
            if ah(cpu) == 0x02 {
                console.push_byte(dl(cpu));
            }
            false
        }
        _ => false,
    }
}

fn ah(cpu: &CpuState) -> u8 {
    (cpu.get_r32(R::EAX) >> 8) as u8
}

fn al(cpu: &CpuState) -> u8 {
    cpu.get_r32(R::EAX) as u8
}

fn dl(cpu: &CpuState) -> u8 {
    cpu.get_r32(R::EDX) as u8
}
