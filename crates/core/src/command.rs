//! Command language: tokenizer and the system command table (spec.md §6,
//! §9 "Function-pointer dispatch tables", SPEC_FULL.md §18-19).
//!
//! The original `msim` dispatches through a table of `cmd_t` descriptors
//! with callback function pointers. Per Design Notes item 2, this is
//! modeled instead as a tagged [`SystemCommand`] enum with one field per
//! argument and a single `dispatch` function (owned by [`crate::machine`])
//! that pattern-matches on it. The tokenizer itself is a thin, dependency-free
//! scanner (full line editing/completion is out of scope, SPEC_FULL.md §18).

use crate::common::data::AccessFilter;

/// One lexical token in a command line (spec.md §6: "string, unsigned int
/// (decimal/hex with 0x prefix), equals-sign, end").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bareword, unquoted or quoted string.
    Str(String),
    /// A decimal or `0x`-prefixed hexadecimal unsigned integer.
    Uint(u64),
    /// A bare `=` token, used by `set NAME = VAL`.
    Equals,
}

/// Splits a command line into tokens. Whitespace separates tokens;
/// `"..."` groups a quoted string into one `Token::Str`; everything else
/// is classified as `Uint` if it parses as decimal or `0x`-hex, else
/// `Str`.
#[must_use]
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '=' {
            chars.next();
            tokens.push(Token::Equals);
            continue;
        }
        if c == '"' {
            chars.next();
            let mut s = String::new();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                s.push(c);
            }
            tokens.push(Token::Str(s));
            continue;
        }
        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                break;
            }
            word.push(c);
            chars.next();
        }
        tokens.push(classify(&word));
    }
    tokens
}

fn classify(word: &str) -> Token {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        if let Ok(v) = u64::from_str_radix(hex, 16) {
            return Token::Uint(v);
        }
    } else if let Ok(v) = word.parse::<u64>() {
        return Token::Uint(v);
    }
    Token::Str(word.to_string())
}

/// The system command table (spec.md §6). A line whose first token does
/// not match a device name dispatches here; the tokens that remain after
/// the command word become its fields.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemCommand {
    /// `add TYPE NAME ...` — creates and initializes a device or hart.
    Add { ty: String, name: String, args: Vec<Token> },
    /// `quit` — exits with code 0.
    Quit,
    /// `continue` — runs until a breakpoint or halt condition.
    Continue,
    /// `step [N]` — executes `N` steps (default 1) on every active hart.
    Step(u64),
    /// `set [NAME [= VAL]]` — lists, reads, or assigns a runtime variable.
    Set { name: Option<String>, value: Option<String> },
    /// `unset NAME` — removes a runtime variable.
    Unset(String),
    /// `break ADDR SIZE r|w|rw` — installs a memory-access breakpoint.
    Break { addr: u64, size: u64, filter: AccessFilter },
    /// `rembreak ADDR` — removes the breakpoint starting at `ADDR`.
    RemBreak(u64),
    /// `dumpbreak` — lists all installed breakpoints.
    DumpBreak,
    /// `dumpmem ADDR CNT` — hex-dumps `CNT` bytes of physical memory.
    DumpMem { addr: u64, count: u64 },
    /// `dumpins ADDR CNT` — disassembles `CNT` instructions.
    DumpIns { addr: u64, count: u64 },
    /// `dumpdev` — lists attached devices in dispatch order.
    DumpDev,
    /// `dumpphys` — summarizes mapped physical memory regions.
    DumpPhys,
    /// `stat` — prints per-device and per-hart statistics.
    Stat,
    /// `echo ...` — prints its arguments verbatim.
    Echo(String),
    /// `help [CMD]` — prints command help (full text formatting is out of
    /// scope, SPEC_FULL.md §18; this only carries the requested topic).
    Help(Option<String>),
}

/// A parse failure: an unrecognized command word, or a command given the
/// wrong number/kind of arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

fn expect_uint(tokens: &[Token], idx: usize, what: &str) -> Result<u64, ParseError> {
    match tokens.get(idx) {
        Some(Token::Uint(v)) => Ok(*v),
        Some(other) => Err(ParseError(format!("expected {what}, found {other:?}"))),
        None => Err(ParseError(format!("missing {what}"))),
    }
}

fn expect_str(tokens: &[Token], idx: usize, what: &str) -> Result<String, ParseError> {
    match tokens.get(idx) {
        Some(Token::Str(s)) => Ok(s.clone()),
        Some(other) => Err(ParseError(format!("expected {what}, found {other:?}"))),
        None => Err(ParseError(format!("missing {what}"))),
    }
}

/// Parses a tokenized command line into a [`SystemCommand`]. The caller
/// (the machine driver) checks the first token against the device
/// registry before falling back to this table, per spec.md §6.
pub fn parse(tokens: &[Token]) -> Result<SystemCommand, ParseError> {
    let Some(Token::Str(cmd)) = tokens.first() else {
        return Err(ParseError("expected a command name".to_string()));
    };
    let rest = &tokens[1..];

    Ok(match cmd.as_str() {
        "add" => SystemCommand::Add {
            ty: expect_str(rest, 0, "device type")?,
            name: expect_str(rest, 1, "device name")?,
            args: rest[2.min(rest.len())..].to_vec(),
        },
        "quit" => SystemCommand::Quit,
        "continue" => SystemCommand::Continue,
        "step" => {
            let n = match rest.first() {
                Some(Token::Uint(v)) => *v,
                Some(other) => return Err(ParseError(format!("expected step count, found {other:?}"))),
                None => 1,
            };
            SystemCommand::Step(n)
        }
        "set" => match rest {
            [] => SystemCommand::Set { name: None, value: None },
            [Token::Str(name)] => SystemCommand::Set { name: Some(name.clone()), value: None },
            [Token::Str(name), Token::Equals, rest_val @ ..] => SystemCommand::Set {
                name: Some(name.clone()),
                value: Some(render_value(rest_val)),
            },
            _ => return Err(ParseError("usage: set [NAME [= VAL]]".to_string())),
        },
        "unset" => SystemCommand::Unset(expect_str(rest, 0, "variable name")?),
        "break" => {
            let addr = expect_uint(rest, 0, "address")?;
            let size = expect_uint(rest, 1, "size")?;
            let filter_str = expect_str(rest, 2, "r|w|rw")?;
            SystemCommand::Break { addr, size, filter: AccessFilter::parse(&filter_str) }
        }
        "rembreak" => SystemCommand::RemBreak(expect_uint(rest, 0, "address")?),
        "dumpbreak" => SystemCommand::DumpBreak,
        "dumpmem" => SystemCommand::DumpMem {
            addr: expect_uint(rest, 0, "address")?,
            count: expect_uint(rest, 1, "count")?,
        },
        "dumpins" => SystemCommand::DumpIns {
            addr: expect_uint(rest, 0, "address")?,
            count: expect_uint(rest, 1, "count")?,
        },
        "dumpdev" => SystemCommand::DumpDev,
        "dumpphys" => SystemCommand::DumpPhys,
        "stat" => SystemCommand::Stat,
        "echo" => SystemCommand::Echo(render_value(rest)),
        "help" => SystemCommand::Help(match rest.first() {
            Some(Token::Str(s)) => Some(s.clone()),
            _ => None,
        }),
        other => return Err(ParseError(format!("unknown command \"{other}\""))),
    })
}

fn render_value(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            Token::Str(s) => s.clone(),
            Token::Uint(v) => format!("{v:#x}"),
            Token::Equals => "=".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_hex_decimal_and_strings() {
        let tokens = tokenize("break 0x1000 4 rw");
        assert_eq!(
            tokens,
            vec![
                Token::Str("break".to_string()),
                Token::Uint(0x1000),
                Token::Uint(4),
                Token::Str("rw".to_string()),
            ]
        );
    }

    #[test]
    fn parses_step_with_default_count() {
        assert_eq!(parse(&tokenize("step")).unwrap(), SystemCommand::Step(1));
        assert_eq!(parse(&tokenize("step 1000")).unwrap(), SystemCommand::Step(1000));
    }

    #[test]
    fn parses_set_with_equals() {
        let cmd = parse(&tokenize("set trace = true")).unwrap();
        assert_eq!(
            cmd,
            SystemCommand::Set { name: Some("trace".to_string()), value: Some("true".to_string()) }
        );
    }

    #[test]
    fn parses_break_with_access_filter() {
        let cmd = parse(&tokenize("break 0x80000100 4 w")).unwrap();
        assert_eq!(
            cmd,
            SystemCommand::Break { addr: 0x8000_0100, size: 4, filter: AccessFilter::WRITE }
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse(&tokenize("frobnicate")).is_err());
    }
}
