use derive_setters::Setters;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::TFError;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    Utf8,
    LossyUtf8,
}

impl From<Encoding> for CsvEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Utf8 => CsvEncoding::Utf8,
            Encoding::LossyUtf8 => CsvEncoding::LossyUtf8,
        }
    }
}

/// How delimited files are read.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(prefix = "with_")]
pub struct LoadConfig {
    pub encoding: Encoding,
    pub separator: u8,
    #[setters(strip_option)]
    pub comment_char: Option<u8>,
    /// Lines skipped before the header line.
    pub header_skip: usize,
    /// Drop rows where every cell is missing.
    pub skip_blank_lines: bool,
    /// Maximum rows read per file.
    #[setters(strip_option)]
    pub row_cap: Option<usize>,
    pub null_values: Vec<String>,
    /// Drop columns where every cell is missing.
    pub hide_empty: bool,
    pub hide_undesired: bool,
    pub undesired_columns: BTreeSet<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::LossyUtf8,
            separator: b',',
            comment_char: None,
            header_skip: 0,
            skip_blank_lines: true,
            row_cap: None,
            null_values: vec![" ".to_string()],
            hide_empty: true,
            hide_undesired: false,
            undesired_columns: BTreeSet::new(),
        }
    }
}

/// Read and concatenate `paths` into one table.
///
/// Columns missing from a file are filled with missing values.
pub fn read_files(paths: &[PathBuf], config: &LoadConfig) -> Result<Table, TFError> {
    if paths.is_empty() {
        return Err(TFError::NoInput);
    }
    let start_time = Instant::now();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        check_file(path)?;
        let df = read_file(path, config).map_err(|e| TFError::CsvRead {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
        frames.push(df.lazy());
    }

    let mut df = if frames.len() == 1 {
        frames.remove(0).collect()?
    } else {
        let args = UnionArgs {
            to_supertypes: true,
            ..Default::default()
        };
        concat_lf_diagonal(frames, args)?.collect()?
    };

    if config.skip_blank_lines {
        df = drop_blank_rows(df)?;
    }
    if config.hide_empty {
        df = drop_empty_columns(df)?;
    }

    info!(
        "Loading {} file(s) took {}ms",
        paths.len(),
        start_time.elapsed().as_millis()
    );
    Ok(Table::from_dataframe(title(paths), &df)?)
}

fn read_file(path: &Path, config: &LoadConfig) -> PolarsResult<DataFrame> {
    let mut parse_options = CsvParseOptions::default()
        .with_separator(config.separator)
        .with_encoding(config.encoding.into());
    if let Some(comment) = config.comment_char {
        parse_options = parse_options.with_comment_prefix(Some(CommentPrefix::Single(comment)));
    }
    if !config.null_values.is_empty() {
        let null_values = config.null_values.iter().map(|s| s.as_str().into()).collect();
        parse_options = parse_options.with_null_values(Some(NullValues::AllColumns(null_values)));
    }

    let df = CsvReadOptions::default()
        .with_parse_options(parse_options)
        .with_has_header(true)
        .with_skip_rows(config.header_skip)
        .with_n_rows(config.row_cap)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    if config.hide_undesired && !config.undesired_columns.is_empty() {
        let keep: Vec<PlSmallStr> = df
            .get_column_names()
            .into_iter()
            .filter(|name| !config.undesired_columns.contains(name.as_str()))
            .cloned()
            .collect();
        trace!("Keeping columns {keep:?}");
        return df.select(keep);
    }
    Ok(df)
}

fn drop_blank_rows(df: DataFrame) -> PolarsResult<DataFrame> {
    if df.width() == 0 {
        return Ok(df);
    }
    let mut keep = BooleanChunked::full("keep".into(), false, df.height());
    for column in df.get_columns() {
        keep = &keep | &column.is_not_null();
    }
    df.filter(&keep)
}

fn drop_empty_columns(df: DataFrame) -> PolarsResult<DataFrame> {
    if df.height() == 0 {
        return Ok(df);
    }
    let keep: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() < c.len())
        .map(|c| c.name().clone())
        .collect();
    df.select(keep)
}

fn check_file(path: &Path) -> Result<(), TFError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TFError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => TFError::PermissionDenied(path.to_path_buf()),
        _ => TFError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TFError::CsvRead {
            path: path.to_path_buf(),
            reason: "not a file".into(),
        });
    }
    Ok(())
}

/// Expand `~` and environment variables in a path typed by the user.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            trace!("Cannot expand {raw}: {e}");
            PathBuf::from(raw)
        }
    }
}

fn title(paths: &[PathBuf]) -> String {
    let first = paths[0].display();
    match paths.len() {
        1 => first.to_string(),
        2 => format!("{first} + 1 other"),
        n => format!("{first} + {} others", n - 1),
    }
}
