use std::io::Error;
use std::path::PathBuf;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::filter::FilterError;

#[derive(Debug, Error)]
pub enum TFError {
    #[error("{0}")]
    IoError(#[from] Error),
    #[error("{0}")]
    PolarsError(#[from] PolarsError),
    #[error("{0}")]
    FilterInvalid(#[from] FilterError),
    #[error("Filter \"{0}\" already exists")]
    DuplicateFilter(String),
    #[error("No filter \"{0}\"")]
    UnknownFilter(String),
    #[error("Cannot read {}: {reason}", path.display())]
    CsvRead { path: PathBuf, reason: String },
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("Permission denied for {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("No file to open")]
    NoInput,
}

#[derive(Debug, Clone)]
pub struct TFConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for TFConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Filter,
    NegatedFilter,
    Open,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Filter => "filter: ",
            CMDMode::NegatedFilter => "not: ",
            CMDMode::Open => "open: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    Filter,
    NegatedFilter,
    FocusFilters,
    ToggleFilter,
    RemoveFilter,
    ClearFilters,
    SortAscending,
    SortDescending,
    Unsort,
    Reload,
    Open,
    CopyCell,
    CopyRow,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
tabfilter - filter csv files

Navigation
  ←↓↑→ / hjkl   move            PgUp/PgDn  page
  g / G         first/last row  0 / $      first/last column

Filters
  /             add a filter, e.g.  Col1 < 12   Name : jo*n
  !             add a negated filter
  Tab           focus the filter bar (Space toggle, d remove, Esc back)
  x             remove all filters

  operators     text: ':' '='   numeric: '=' '<' '<=' '>' '>='
  wildcards     '*' any text, '?' one character, '*' alone: any value

Other
  s / S         sort column ascending/descending   u  unsort
  r             re-read files   o  open files
  c / C         copy cell/row   ?  help   q  quit";
