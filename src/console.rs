//! the console output buffer written by INT 0x10 AH=0x0E and INT 0x21 AH=0x02.
//!
//! grounded on dustbox-rs's interrupt handlers (`interrupt/int10.rs`,
//! `interrupt/int21.rs`), which write characters straight to stdout via
//! `print!`; this crate instead appends to an owned buffer so the host can
//! read it back through `getConsoleOutput` rather than capturing stdout.

#[derive(Clone, Debug, Default)]
pub struct Console {
    buffer: Vec<u8>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_byte(&mut self, b: u8) {
        self.buffer.push(b);
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_bytes_read_back_as_string() {
        let mut c = Console::new();
        c.push_byte(b'H');
        c.push_byte(b'i');
        assert_eq!(c.as_string(), "Hi");
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut c = Console::new();
        c.push_byte(b'x');
        c.clear();
        assert_eq!(c.as_string(), "");
    }
}
