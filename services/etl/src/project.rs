//! Column projection onto a category's allow-list.

use crate::error::{EtlError, Result};
use crate::frame::{Frame, Value};
use crate::schema::CategorySchema;
use tracing::{debug, warn};

/// Restrict the frame to the schema's allow-list, in allow-list order.
///
/// Columns outside the allow-list are dropped. A missing required column
/// fails the category; any other missing column is materialized as nulls
/// and reported in the log.
pub fn project(frame: &Frame, schema: &CategorySchema) -> Result<Frame> {
    let allow = schema.allow_list();

    let dropped: Vec<&str> = frame
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !allow.contains(c))
        .collect();
    if !dropped.is_empty() {
        debug!(category = %schema.category, columns = ?dropped, "dropping unused columns");
    }

    let mut missing: Vec<&str> = Vec::new();
    for column in &allow {
        if !frame.has_column(column) {
            if schema.is_required(column) {
                return Err(EtlError::MissingColumn {
                    category: schema.category.clone(),
                    column: column.to_string(),
                });
            }
            missing.push(*column);
        }
    }
    if !missing.is_empty() {
        warn!(
            category = %schema.category,
            columns = ?missing,
            "allow-listed columns absent from source, filling with nulls"
        );
    }

    let idxs: Vec<Option<usize>> = allow.iter().map(|c| frame.column_index(c)).collect();
    let rows = frame
        .rows()
        .iter()
        .map(|row| {
            idxs.iter()
                .map(|i| i.and_then(|i| row.get(i).cloned()).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(Frame::from_parts(
        allow.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}
