//! component C8: routes logical addresses to bank A RAM or to a peripheral.
//!
//! grounded on dustbox-rs's `memory/mmu.rs` address-range dispatch (a single
//! `read`/`write` entry point fanning out by address, rather than the
//! `Vec<Box<dyn Component>>` scan dustbox's PC-bus model uses elsewhere,
//! since this spec's device set is fixed and small).

use crate::devices::{
    Audio, AudioEvent, Display, Keyboard, DISPLAY_BASE, KEYBOARD_KEY_CODE, KEYBOARD_KEY_STATE,
    KEYBOARD_STATUS,
};
use crate::memory::bank::{MemoryBank, BANK_SIZE};

const DEBUG_MMU: bool = false;

/// owns bank A and the three MMIO-mapped peripherals; bank B is addressed
/// directly by the engine and never passes through this router.
#[derive(Clone, Debug)]
pub struct Mmu {
    pub bank_a: MemoryBank,
    pub display: Display,
    pub keyboard: Keyboard,
    pub audio: Audio,
}

impl Mmu {
    pub fn new(width: usize, height: usize) -> Self {
        Mmu {
            bank_a: MemoryBank::new(),
            display: Display::new(width, height),
            keyboard: Keyboard::new(),
            audio: Audio::new(),
        }
    }

    fn is_display(&self, addr: u32) -> bool {
        let base = u64::from(DISPLAY_BASE);
        let len = self.display.len() as u64;
        let a = u64::from(addr);
        a >= base && a < base + len
    }

    /// reads a single byte, mutating keyboard state when `addr` is the key-code register
    pub fn read_u8(&mut self, addr: u32) -> u8 {
        if DEBUG_MMU {
            println!("mmu: read_u8 {:#x}", addr);
        }
        match addr {
            KEYBOARD_STATUS => self.keyboard.status() as u8,
            KEYBOARD_KEY_CODE => self.keyboard.pop_key_code(),
            KEYBOARD_KEY_STATE => self.keyboard.last_key_state() as u8,
            a if crate::devices::AUDIO_CTRL <= a && a <= crate::devices::AUDIO_VOLUME => {
                self.audio.read(a)
            }
            a if self.is_display(a) => {
                let offset = (a - DISPLAY_BASE) as usize;
                self.display.get_offset(offset)
            }
            a => self.bank_a.read_u8((a as usize % BANK_SIZE) as u16),
        }
    }

    /// writes a single byte; returns `Some(event)` iff this write fired the audio edge
    pub fn write_u8(&mut self, addr: u32, byte: u8) -> Option<AudioEvent> {
        if DEBUG_MMU {
            println!("mmu: write_u8 {:#x} <- {:#x}", addr, byte);
        }
        match addr {
            KEYBOARD_STATUS | KEYBOARD_KEY_CODE | KEYBOARD_KEY_STATE => None,
            a if crate::devices::AUDIO_CTRL <= a && a <= crate::devices::AUDIO_VOLUME => {
                self.audio.write(a, byte)
            }
            a if self.is_display(a) => {
                let offset = (a - DISPLAY_BASE) as usize;
                self.display.set_offset(offset, byte);
                None
            }
            a => {
                self.bank_a.write_u8((a as usize % BANK_SIZE) as u16, byte);
                None
            }
        }
    }

    /// reads four consecutive bytes as a little-endian word
    pub fn read_u32(&mut self, addr: u32) -> u32 {
        let b0 = u32::from(self.read_u8(addr));
        let b1 = u32::from(self.read_u8(addr.wrapping_add(1)));
        let b2 = u32::from(self.read_u8(addr.wrapping_add(2)));
        let b3 = u32::from(self.read_u8(addr.wrapping_add(3)));
        b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)
    }

    /// writes a little-endian 32-bit word across four bytes; collects any audio events fired
    pub fn write_u32(&mut self, addr: u32, val: u32) -> Vec<AudioEvent> {
        let bytes = [
            val as u8,
            (val >> 8) as u8,
            (val >> 16) as u8,
            (val >> 24) as u8,
        ];
        let mut events = Vec::new();
        for (i, b) in bytes.iter().enumerate() {
            if let Some(ev) = self.write_u8(addr.wrapping_add(i as u32), *b) {
                events.push(ev);
            }
        }
        events
    }

    pub fn reset(&mut self) {
        let (w, h) = (self.display.width(), self.display.height());
        self.bank_a.clear();
        self.display = Display::new(w, h);
        self.keyboard.clear();
        self.audio.clear();
    }
}
