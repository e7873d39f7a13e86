//! component C4: a FIFO of keyboard events, mapped at `0x10100..0x10102`.
//!
//! grounded on dustbox-rs's `mouse.rs` `Component`-shaped device (small
//! struct, plain getter/setter methods, no internal threading) applied to a
//! queue instead of an absolute pointer.

use std::collections::VecDeque;

pub const KEYBOARD_STATUS: u32 = 0x10100;
pub const KEYBOARD_KEY_CODE: u32 = 0x10101;
pub const KEYBOARD_KEY_STATE: u32 = 0x10102;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key_code: u8,
    pub pressed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Keyboard {
    queue: VecDeque<KeyEvent>,
    last_key_code: u8,
    last_key_state: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardStatus {
    pub queue_len: usize,
    pub last_key_code: u8,
    pub last_key_state: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// pushes an event onto the queue (host entry point)
    pub fn push_event(&mut self, key_code: u8, pressed: bool) {
        self.last_key_code = key_code;
        self.last_key_state = pressed;
        self.queue.push_back(KeyEvent { key_code, pressed });
    }

    /// true iff the queue is non-empty (`0x10100`, read-only)
    pub fn status(&self) -> bool {
        !self.queue.is_empty()
    }

    /// pops the head of the queue and returns its code (`0x10101`, read pops)
    pub fn pop_key_code(&mut self) -> u8 {
        match self.queue.pop_front() {
            Some(ev) => {
                self.last_key_code = ev.key_code;
                self.last_key_state = ev.pressed;
                ev.key_code
            }
            None => 0,
        }
    }

    /// state of the most recently observed (pushed or popped) event (`0x10102`)
    pub fn last_key_state(&self) -> bool {
        self.last_key_state
    }

    pub fn status_snapshot(&self) -> KeyboardStatus {
        KeyboardStatus {
            queue_len: self.queue.len(),
            last_key_code: self.last_key_code,
            last_key_state: self.last_key_state,
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.last_key_code = 0;
        self.last_key_state = false;
    }
}
