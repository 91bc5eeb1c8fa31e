//! Interactive command-line front end for the msim-core simulator.
//!
//! Thin per SPEC_FULL.md §10: argument parsing (`clap`), config-file
//! loading, `tracing` subscriber setup, and the REPL loop. Almost all
//! behavior lives in `msim_core`.

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use msim_core::config::{Architecture, Config};
use msim_core::Machine;

/// Env var consulted for the config file path when `--config` is absent
/// (spec.md §6).
const CONFIG_ENV_VAR: &str = "MSIMCONF";

/// Config file name used when neither `--config` nor `$MSIMCONF` is set
/// (spec.md §6).
const DEFAULT_CONFIG_NAME: &str = "msim.conf";

#[derive(Parser, Debug)]
#[command(
    name = "msim",
    author,
    version,
    about = "Interactive instruction-set simulator for MIPS R4000 and RISC-V RV32IMA.",
    long_about = "Loads an optional line-oriented config file, then drops into an \
                   interactive prompt (`add`, `step`, `continue`, `break`, `dumpmem`, ...). \
                   See spec.md \u{a7}6 for the full command language."
)]
struct Cli {
    /// Path to a config file; falls back to $MSIMCONF, then ./msim.conf.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Architecture of the harts to create (overrides the config file).
    #[arg(long, value_enum)]
    arch: Option<CliArch>,

    /// Run non-interactively: execute the config file, then exit instead
    /// of dropping to a prompt.
    #[arg(long)]
    batch: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliArch {
    Riscv,
    Mips,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(arch) = cli.arch {
        config.general.arch = match arch {
            CliArch::Riscv => Architecture::Riscv,
            CliArch::Mips => Architecture::Mips,
        };
    }

    let mut machine = Machine::new(&config);

    let config_path = resolve_config_path(cli.config);
    if let Some(path) = &config_path {
        if let Err(code) = run_config_file(&mut machine, path) {
            return code;
        }
    }

    if cli.batch {
        return ExitCode::SUCCESS;
    }

    run_repl(&mut machine)
}

/// Resolves the config file path per spec.md §6: `--config`, else
/// `$MSIMCONF`, else `msim.conf` if that file exists (a missing default is
/// not an error — only an explicitly named config file that fails to open
/// is).
fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    default.exists().then_some(default)
}

/// Feeds each line of the config file at `path` to the machine's command
/// dispatcher. A parse/execution failure on any line aborts startup with a
/// line-numbered diagnostic and a nonzero exit code (spec.md §6, §7).
fn run_config_file(machine: &mut Machine, path: &PathBuf) -> Result<(), ExitCode> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("{}: {e}", path.display());
        ExitCode::FAILURE
    })?;

    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(err) = machine.dispatch_line(trimmed) {
            eprintln!("{}:{}: {err}", path.display(), lineno + 1);
            return Err(ExitCode::FAILURE);
        }
    }
    Ok(())
}

/// The interactive prompt: reads one line at a time from stdin, dispatches
/// it, and prints the result, until `quit` or EOF (spec.md §6 exit codes:
/// `quit` yields 0).
fn run_repl(machine: &mut Machine) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        machine.interactive = true;
        print!("msim> ");
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            return ExitCode::SUCCESS;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match machine.dispatch_line(line) {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(err) => eprintln!("error: {err}"),
        }

        if machine.tohalt && line == "quit" {
            return ExitCode::SUCCESS;
        }
    }
}
