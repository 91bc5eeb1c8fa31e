//! `dkeyboard`: a minimal two-register input terminal.
//!
//! Grounded in the teacher's `Uart` receive path: a background thread reads
//! raw bytes from stdin and feeds them through an `mpsc` channel into an
//! internal queue, so the step loop never blocks waiting on terminal input.

use std::collections::VecDeque;
use std::io::Read as _;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;

use super::Device;

const REG_STATUS: u64 = 0;
const REG_DATA: u64 = 4;

const STATUS_DATA_READY: u32 = 1;

/// Read-only character input device, polled via a status/data register
/// pair.
pub struct Terminal {
    name: String,
    base: u64,
    rx_queue: VecDeque<u8>,
    rx_receiver: Mutex<Receiver<u8>>,
}

impl Terminal {
    /// Creates a terminal device named `name`, claiming 8 bytes at `base`,
    /// and spawns the background stdin reader thread.
    #[must_use]
    pub fn new(name: impl Into<String>, base: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut byte = [0u8; 1];
            let mut stdin = std::io::stdin();
            while stdin.read_exact(&mut byte).is_ok() {
                if tx.send(byte[0]).is_err() {
                    break;
                }
            }
        });
        Self {
            name: name.into(),
            base,
            rx_queue: VecDeque::new(),
            rx_receiver: Mutex::new(rx),
        }
    }

    fn drain_stdin(&mut self) {
        if let Ok(recv) = self.rx_receiver.lock() {
            while let Ok(byte) = recv.try_recv() {
                self.rx_queue.push_back(byte);
            }
        }
    }

    /// Injects a byte directly into the input queue, bypassing stdin. Used
    /// by tests and by the `keyin` command to script input.
    pub fn feed(&mut self, byte: u8) {
        self.rx_queue.push_back(byte);
    }
}

impl Device for Terminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "dkeyboard"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, self.base + 8)
    }

    fn read(&mut self, offset: u64, _width: u8) -> u64 {
        match offset {
            REG_STATUS => u64::from(if self.rx_queue.is_empty() {
                0
            } else {
                STATUS_DATA_READY
            }),
            REG_DATA => u64::from(self.rx_queue.pop_front().unwrap_or(0)),
            _ => 0,
        }
    }

    fn step(&mut self) -> bool {
        self.drain_stdin();
        !self.rx_queue.is_empty()
    }

    fn stat(&self) -> String {
        format!("{}: {} bytes queued", self.name, self.rx_queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fed_byte_is_readable_and_drains_status() {
        let mut term = Terminal::new("kbd0", 0x1000_1000);
        assert_eq!(term.read(REG_STATUS, 4), 0);
        term.feed(b'a');
        assert_eq!(term.read(REG_STATUS, 4), u64::from(STATUS_DATA_READY));
        assert_eq!(term.read(REG_DATA, 4), u64::from(b'a'));
        assert_eq!(term.read(REG_STATUS, 4), 0);
    }
}
