use indexmap::IndexMap;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

/// Rendering of a missing cell.
pub const MISSING: &str = "∅";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
        }
    }
}

#[derive(Debug)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    // Missing text cells are stored as empty strings.
    Text(Vec<String>),
}

#[derive(Debug)]
pub struct Column {
    name: String,
    values: ColumnValues,
    display: Vec<String>,
    max_width: usize,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        match self.values {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Text(_) => ColumnKind::Text,
        }
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn display(&self, row: usize) -> &str {
        self.display.get(row).map(String::as_str).unwrap_or(MISSING)
    }

    /// Widest rendered cell or header, in characters.
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn as_string(&self) -> String {
        format!(
            "\"{}\", {:?}, width_max: {}, # rows {}",
            self.name,
            self.kind(),
            self.max_width,
            self.display.len(),
        )
    }

    fn load(df: &DataFrame, name: &str) -> Result<Column, PolarsError> {
        let source = df.column(name)?;
        let as_text = source.cast(&DataType::String)?;
        let strings = as_text.str()?;

        let mut max_width = name.chars().count();
        let mut display = Vec::with_capacity(strings.len());
        for value in strings.into_iter() {
            let rendered = match value {
                Some(s) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
                None => MISSING.to_string(),
            };
            max_width = max_width.max(rendered.chars().count());
            display.push(rendered);
        }

        let values = if is_numeric_type(source.dtype()) {
            let numbers = source.cast(&DataType::Float64)?;
            ColumnValues::Numeric(numbers.f64()?.into_iter().collect())
        } else {
            ColumnValues::Text(
                strings
                    .into_iter()
                    .map(|v| v.unwrap_or_default().to_string())
                    .collect(),
            )
        };

        Ok(Column {
            name: name.to_string(),
            values,
            display,
            max_width,
        })
    }
}

/// Immutable, column-named data loaded once per file-open.
/// Row ids are positions in the loaded data and never change.
#[derive(Debug)]
pub struct Table {
    title: String,
    columns: IndexMap<String, Column>,
    nrows: usize,
}

impl Table {
    pub fn from_dataframe(title: impl Into<String>, df: &DataFrame) -> Result<Self, PolarsError> {
        let start_time = Instant::now();

        // Each column is converted in its own thread.
        let columns: Vec<Column> = df
            .get_column_names()
            .par_iter()
            .map(|name| Column::load(df, name.as_str()))
            .collect::<Result<_, _>>()?;

        info!(
            "Converted {} columns x {} rows in {}ms",
            columns.len(),
            df.height(),
            start_time.elapsed().as_millis()
        );
        for c in columns.iter() {
            debug!("Column: {}", c.as_string());
        }

        Ok(Table {
            title: title.into(),
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
            nrows: df.height(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_at(&self, idx: usize) -> Option<&Column> {
        self.columns.get_index(idx).map(|(_, c)| c)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.column_at(column).map(|c| c.display(row))
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Partition of a table's column names by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub numeric: BTreeSet<String>,
    pub text: BTreeSet<String>,
}

impl Classification {
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        if self.numeric.contains(column) {
            Some(ColumnKind::Numeric)
        } else if self.text.contains(column) {
            Some(ColumnKind::Text)
        } else {
            None
        }
    }
}

pub fn classify(table: &Table) -> Classification {
    let mut classification = Classification::default();
    for column in table.columns() {
        let set = match column.kind() {
            ColumnKind::Numeric => &mut classification.numeric,
            ColumnKind::Text => &mut classification.text,
        };
        set.insert(column.name().to_string());
    }
    classification
}
