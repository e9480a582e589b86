use clap::Parser;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod engine;
mod filter;
mod inputter;
mod loader;
mod model;
mod table;
mod ui;
mod view;

use controller::Controller;
use domain::{TFConfig, TFError};
use loader::{Encoding, LoadConfig, expand_path};
use model::{Model, Status};
use ui::TableUI;

const LOG_ENV: &str = "TABFILTER_LOG";

/// Filter delimited text files in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Arguments {
    /// Files to load, concatenated into one table
    files: Vec<String>,

    /// Field separator, `tab` or `\t` for tabs
    #[arg(short = 'd', long, default_value = ",", value_parser = parse_byte)]
    separator: u8,

    /// Lines starting with this character are skipped
    #[arg(long, value_parser = parse_byte)]
    comment: Option<u8>,

    /// Lines to skip before the header line
    #[arg(long, default_value_t = 0)]
    header_skip: usize,

    /// Maximum rows read per file
    #[arg(short = 'n', long)]
    row_cap: Option<usize>,

    #[arg(long, value_enum, default_value_t = Encoding::LossyUtf8)]
    encoding: Encoding,

    /// Cell contents read as missing
    #[arg(long = "null-value", default_values_t = [" ".to_string()])]
    null_values: Vec<String>,

    /// Keep rows where every cell is missing
    #[arg(long)]
    keep_blank_lines: bool,

    /// Keep columns where every cell is missing
    #[arg(long)]
    show_empty: bool,

    /// Column to leave out, can be repeated
    #[arg(short = 'x', long = "exclude")]
    excluded: Vec<String>,

    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_time: u64,

    /// Log file, defaults to tabfilter.log in the temp directory
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Arguments {
    fn load_config(&self) -> LoadConfig {
        let config = LoadConfig::default()
            .with_separator(self.separator)
            .with_header_skip(self.header_skip)
            .with_encoding(self.encoding)
            .with_null_values(self.null_values.clone())
            .with_skip_blank_lines(!self.keep_blank_lines)
            .with_hide_empty(!self.show_empty)
            .with_hide_undesired(!self.excluded.is_empty())
            .with_undesired_columns(self.excluded.iter().cloned().collect::<BTreeSet<_>>());
        let config = match self.comment {
            Some(c) => config.with_comment_char(c),
            None => config,
        };
        match self.row_cap {
            Some(n) => config.with_row_cap(n),
            None => config,
        }
    }

    fn config(&self) -> TFConfig {
        TFConfig {
            event_poll_time: self.poll_time,
            max_column_width: self.max_column_width,
        }
    }
}

fn parse_byte(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("expected a single ascii character, got {s:?}")),
        },
    }
}

fn init_logging(path: &Path) -> Result<(), TFError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("tabfilter.log"));
    if let Err(e) = init_logging(&log_file) {
        eprintln!("Cannot log to {}: {e}", log_file.display());
    }

    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Arguments) -> Result<(), TFError> {
    info!("Starting tabfilter with {:?}", args);
    let cfg = args.config();
    let files: Vec<PathBuf> = args.files.iter().map(|f| expand_path(f)).collect();

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, args.load_config(), size.width as usize, size.height as usize);
    if !files.is_empty() {
        model.open(files);
    }

    let mut ui = TableUI::new();
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }
    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators() {
        assert_eq!(parse_byte(";"), Ok(b';'));
        assert_eq!(parse_byte("tab"), Ok(b'\t'));
        assert_eq!(parse_byte("\\t"), Ok(b'\t'));
        assert!(parse_byte(";;").is_err());
        assert!(parse_byte("é").is_err());
    }

    #[test]
    fn arguments_to_load_config() {
        let args = Arguments::parse_from([
            "tabfilter", "-d", ";", "--comment", "#", "-n", "10", "-x", "id", "a.csv", "b.csv",
        ]);
        let config = args.load_config();
        assert_eq!(config.separator, b';');
        assert_eq!(config.comment_char, Some(b'#'));
        assert_eq!(config.row_cap, Some(10));
        assert!(config.hide_undesired);
        assert!(config.undesired_columns.contains("id"));
        assert_eq!(args.files, ["a.csv", "b.csv"]);
    }
}
