//! In-memory tabular model shared by every pipeline stage.
//!
//! A [`Frame`] is an ordered list of column names plus row-major values.
//! Raw extracts enter as all-text frames; coercion introduces integers and
//! report building introduces dates.

use chrono::NaiveDate;
use std::fmt;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Canonical "no value" marker, loaded as SQL NULL.
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if the cell holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content as i64 for summation. Floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Ordered table of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a frame from parts without checking row widths.
    /// Use [`Frame::check_shape`] before trusting frames built this way.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Verify every row is exactly as wide as the header.
    pub fn check_shape(&self) -> std::result::Result<(), String> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(format!(
                    "row {} has {} values, header has {} columns",
                    i,
                    row.len(),
                    self.columns.len()
                ));
            }
        }
        Ok(())
    }

    /// Replace column names positionally. Lengths must match.
    pub fn rename_columns(&mut self, names: Vec<String>) {
        debug_assert_eq!(names.len(), self.columns.len());
        self.columns = names;
    }

    /// Append a column holding `fill` in every row.
    pub fn add_column(&mut self, name: impl Into<String>, fill: Value) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    /// Remove a column by name. Returns false when it does not exist.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        true
    }

    /// Copy of the frame restricted to `names`, in that order.
    /// Returns `None` when any name is absent.
    pub fn select(&self, names: &[&str]) -> Option<Frame> {
        let idxs: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Option<_>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| idxs.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Some(Frame {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Value at (row, column name).
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Rewrite every cell of one column.
    pub fn map_column(&mut self, idx: usize, mut f: impl FnMut(&Value) -> Value) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell);
            }
        }
    }

    /// Mutable access to every cell.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.rows.iter_mut().flat_map(|row| row.iter_mut())
    }

    /// Concatenate frames keeping only the columns shared by all of them,
    /// in the order of the first frame.
    pub fn concat_inner(frames: &[&Frame]) -> Frame {
        let Some(first) = frames.first() else {
            return Frame::default();
        };
        let shared: Vec<String> = first
            .columns
            .iter()
            .filter(|c| frames.iter().all(|f| f.has_column(c)))
            .cloned()
            .collect();
        let names: Vec<&str> = shared.iter().map(String::as_str).collect();

        let mut out = Frame::new(shared.clone());
        for frame in frames {
            if let Some(projected) = frame.select(&names) {
                out.rows.extend(projected.rows);
            }
        }
        out
    }

    /// Concatenate frames over the union of their columns (first-seen order),
    /// filling columns a frame lacks with [`Value::Null`].
    pub fn concat_outer(frames: &[Frame]) -> Frame {
        let mut columns: Vec<String> = Vec::new();
        for frame in frames {
            for c in &frame.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut out = Frame::new(columns);
        for frame in frames {
            let idxs: Vec<Option<usize>> =
                out.columns.iter().map(|c| frame.column_index(c)).collect();
            for row in &frame.rows {
                out.rows.push(
                    idxs.iter()
                        .map(|i| i.map(|i| row[i].clone()).unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }
        out
    }
}
