//! # Calcsheet CLI
//!
//! Command-line driver for the expression engine.
//!
//! With an expression argument it evaluates once and prints the formatted
//! result. Without one it reads JSON requests from stdin, one per line, and
//! writes one JSON response per line to stdout. Logs go to stderr.
//!
//! ```text
//! calc_cli "2 * pi"
//! echo '{"op": "convert_unit", "value": 1, "from_unit": "km", "to_unit": "mi"}' | calc_cli
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use calc_core::{load_settings, save_settings, CalcResult, Engine, EngineSettings, Variables};
use clap::{Parser, ValueEnum};
use log::{error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Calcsheet - unit-aware expression engine
#[derive(Parser, Debug)]
#[command(name = "calc_cli", version, about)]
struct Cli {
    /// Expression to evaluate; omit to serve JSON-lines requests on stdin
    expression: Option<String>,

    /// Engine settings file (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Write the settings in force on exit to this file
    #[arg(long)]
    save_settings: Option<PathBuf>,

    /// Print the full result record as JSON instead of the formatted value
    #[arg(long)]
    json: bool,

    /// Log level for stderr
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn build_engine(path: Option<&PathBuf>) -> CalcResult<Engine> {
    let settings = match path {
        Some(path) => {
            info!("loading settings from {}", path.display());
            load_settings(path)?
        }
        None => EngineSettings::default(),
    };
    Engine::with_settings(settings)
}

fn print_json<T: serde::Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    let line = serde_json::to_string(value).map_err(io::Error::other)?;
    writeln!(out, "{}", line)
}

/// Answer one request per input line until stdin closes.
fn serve(engine: &Engine) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut handled = 0usize;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = engine.handle_json(&line);
        print_json(&mut stdout, &response)?;
        stdout.flush()?;
        handled += 1;
    }
    info!("stdin closed after {} request(s)", handled);
    Ok(())
}

fn evaluate_once(engine: &Engine, expression: &str, json: bool) -> io::Result<bool> {
    let result = engine.evaluate(expression, &Variables::new());
    let mut stdout = io::stdout().lock();
    if json {
        print_json(&mut stdout, &result)?;
    } else if let Some(report) = &result.error {
        eprintln!("{}: {}", report.code, report.message);
    } else {
        writeln!(stdout, "{}", result.formatted)?;
    }
    Ok(result.error.is_none())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if TermLogger::init(cli.log_level.into(), Config::default(), TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("logger already initialised");
    }

    let engine = match build_engine(cli.settings.as_ref()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e.report()) {
                eprintln!("{}", json);
            }
            return ExitCode::FAILURE;
        }
    };

    let outcome = match &cli.expression {
        Some(expression) => evaluate_once(&engine, expression, cli.json),
        None => serve(&engine).map(|_| true),
    };

    if let Some(path) = &cli.save_settings {
        if let Err(e) = save_settings(&engine.settings(), path) {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        info!("settings saved to {}", path.display());
    }

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("I/O error: {}", e);
            ExitCode::FAILURE
        }
    }
}
