//! Softconsole Headless Runner
//!
//! Drives a terminal without a window: writes text to it, optionally types
//! a line of keystrokes and reads it back, then prints a snapshot.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use softconsole::input::{keycode, RawKey};
use softconsole::{Config, Terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "softconsole-headless")]
#[command(version)]
#[command(about = "Run a headless softconsole terminal and print its snapshot", long_about = None)]
struct CliArgs {
    /// Path to a JSON config file (defaults to softconsole/config.json in
    /// the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Grid columns
    #[arg(long, value_name = "COLS")]
    columns: Option<usize>,

    /// Visible rows
    #[arg(long, value_name = "ROWS")]
    rows: Option<usize>,

    /// Rows remembered, visible rows included
    #[arg(long, value_name = "LINES")]
    scrollback: Option<usize>,

    /// File whose text is written to the terminal
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Keystrokes typed before one read_line. Escapes: \n \e \b \\ and
    /// \< \> for the arrow keys
    #[arg(short, long, value_name = "KEYS")]
    keys: Option<String>,

    /// Print plain text instead of JSON
    #[arg(short, long)]
    text: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();
    match run(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> softconsole::Result<String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };
    if let Some(columns) = args.columns {
        config.columns = columns;
    }
    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(scrollback) = args.scrollback {
        config.scrollback = scrollback;
    }

    let terminal = Terminal::new(&config)?;

    if let Some(path) = &args.input {
        let text = std::fs::read_to_string(path)?;
        terminal.write_str(&text);
    }

    if let Some(keys) = &args.keys {
        let mut raw = parse_keys(keys);
        if raw.last() != Some(&RawKey::char('\n')) {
            raw.push(RawKey::char('\n'));
        }
        for key in raw {
            terminal.key_pressed(key);
        }
        let line = terminal.read_line();
        tracing::info!(%line, "line read");
    }

    terminal.flush_render();
    let snapshot = terminal.snapshot();
    terminal.close();

    if args.text {
        Ok(snapshot.to_text())
    } else {
        Ok(snapshot.to_json()?)
    }
}

/// Turn the `--keys` argument into key notifications
fn parse_keys(keys: &str) -> Vec<RawKey> {
    let mut raw = Vec::new();
    let mut chars = keys.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            raw.push(RawKey::char(c));
            continue;
        }
        let key = match chars.next() {
            Some('n') => RawKey::char('\n'),
            Some('e') => RawKey::char('\u{1b}'),
            Some('b') => RawKey::char('\u{8}'),
            Some('<') => RawKey::code(keycode::LEFT),
            Some('>') => RawKey::code(keycode::RIGHT),
            Some(other) => RawKey::char(other),
            None => RawKey::char('\\'),
        };
        raw.push(key);
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_escapes() {
        let keys = parse_keys(r"ab\b\<\n\\");
        assert_eq!(
            keys,
            vec![
                RawKey::char('a'),
                RawKey::char('b'),
                RawKey::char('\u{8}'),
                RawKey::code(keycode::LEFT),
                RawKey::char('\n'),
                RawKey::char('\\'),
            ]
        );
    }

    #[test]
    fn test_run_types_line() {
        let args = CliArgs {
            config: None,
            columns: Some(20),
            rows: Some(3),
            scrollback: None,
            input: None,
            keys: Some("hellp\\bo".to_string()),
            text: true,
        };
        assert_eq!(run(&args).unwrap(), "hello\n");
    }
}
