//! `dprinter`: a single-register write-only character printer.
//!
//! Grounded in the original `dprinter.c` device (a one-register "write a
//! byte, it shows up on stdout" peripheral) but buffered the way the
//! teacher's `Uart` buffers its transmit path: bytes accumulate until a
//! newline or a size threshold, then flush together, to avoid a syscall per
//! character under a tight step loop. The `redir` command (spec.md §6
//! "Persistent state") swaps the flush target from stdout to a named file,
//! opened the same way the original `dprinter.c` opens its redirect target.

use std::fs::File;
use std::io::Write as _;

use crate::command::Token;
use crate::common::error::SimError;

use super::Device;

const FLUSH_THRESHOLD: usize = 4096;

enum Output {
    Stdout,
    File(File),
}

/// Write-only character printer mapped at a single 4-byte register.
pub struct Printer {
    name: String,
    base: u64,
    buffer: Vec<u8>,
    bytes_written: u64,
    output: Output,
}

impl Printer {
    /// Creates a printer device named `name`, claiming one 4-byte register
    /// at `base`, flushing to stdout until [`Printer::redirect`] is called.
    #[must_use]
    pub fn new(name: impl Into<String>, base: u64) -> Self {
        Self {
            name: name.into(),
            base,
            buffer: Vec::new(),
            bytes_written: 0,
            output: Output::Stdout,
        }
    }

    /// Redirects subsequent output to `path`, creating/truncating it.
    /// Flushes any buffered bytes to the *old* target first.
    pub fn redirect(&mut self, path: &str) -> Result<(), SimError> {
        self.flush();
        let file = File::create(path).map_err(|source| SimError::Io {
            path: path.to_string(),
            source,
        })?;
        self.output = Output::File(file);
        Ok(())
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        match &mut self.output {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(&self.buffer);
                let _ = stdout.flush();
            }
            Output::File(f) => {
                let _ = f.write_all(&self.buffer);
                let _ = f.flush();
            }
        }
        self.buffer.clear();
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        self.flush();
    }
}

impl Device for Printer {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "dprinter"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, self.base + 4)
    }

    fn write(&mut self, offset: u64, _width: u8, value: u64) {
        if offset != 0 {
            return;
        }
        let byte = value as u8;
        self.buffer.push(byte);
        self.bytes_written += 1;
        if byte == b'\n' || self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush();
        }
    }

    fn step4(&mut self) {
        self.flush();
    }

    fn stat(&self) -> String {
        format!("{}: {} bytes written", self.name, self.bytes_written)
    }

    fn handle_command(&mut self, tokens: &[Token]) -> Result<Option<String>, SimError> {
        match tokens {
            [Token::Str(sub), Token::Str(path)] if sub == "redir" => {
                self.redirect(path)?;
                Ok(Some(format!("{}: output redirected to {path}", self.name)))
            }
            [Token::Str(sub)] if sub == "redir" => {
                self.flush();
                self.output = Output::Stdout;
                Ok(Some(format!("{}: output redirected to stdout", self.name)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_buffers_and_flushes_on_newline() {
        let mut p = Printer::new("printer0", 0x1000_0000);
        p.write(0, 1, u64::from(b'h'));
        p.write(0, 1, u64::from(b'i'));
        assert_eq!(p.buffer.len(), 2);
        p.write(0, 1, u64::from(b'\n'));
        assert!(p.buffer.is_empty());
        assert_eq!(p.bytes_written, 3);
    }

    #[test]
    fn redir_command_writes_to_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("msim_printer_test_{}.txt", std::process::id()));
        let path_str = path.to_str().unwrap().to_string();

        let mut p = Printer::new("printer0", 0x1000_0000);
        let result = p
            .handle_command(&[Token::Str("redir".to_string()), Token::Str(path_str.clone())])
            .unwrap();
        assert!(result.is_some());
        p.write(0, 1, u64::from(b'x'));
        p.write(0, 1, u64::from(b'\n'));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "x\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unrecognized_command_returns_none() {
        let mut p = Printer::new("printer0", 0x1000_0000);
        assert_eq!(p.handle_command(&[Token::Str("bogus".to_string())]).unwrap(), None);
    }
}
