//! Summary reports built from the normalized fact frames.
//!
//! Responsibilities:
//! - Count non-null `nombre` per `categoria`, per `fuente` and per
//!   (`provincia`, `categoria`) into one `report_main` table
//! - Sum the cinema measures per `provincia` into `report_cinemas`
//! - Stamp both tables with the same `fecha_carga`
//!
//! Group order is deterministic (ascending key). Rows whose group key holds
//! a null are not counted in any group.

use crate::error::{EtlError, Result};
use crate::frame::{Frame, Value};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

pub const COUNT_COLUMN: &str = "cantidad";
pub const LOAD_DATE_COLUMN: &str = "fecha_carga";

/// Count dimensions, in the order their tables are concatenated.
const COUNT_GROUPINGS: &[&[&str]] = &[&["categoria"], &["fuente"], &["provincia", "categoria"]];

/// Cinema measures and the column each sum is reported under.
pub const CINEMA_MEASURES: &[(&str, &str)] = &[
    ("pantallas", "cantidad_pantallas"),
    ("butacas", "cantidad_butacas"),
    ("espacio_incaa", "cantidad_espacios_incaa"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    pub report_main: Frame,
    pub report_cinemas: Frame,
    pub fecha_carga: NaiveDate,
}

/// Ensure an input is present, rectangular and has the needed columns.
fn validate_input<'a>(name: &str, frame: Option<&'a Frame>, needed: &[&str]) -> Result<&'a Frame> {
    let frame = frame.ok_or_else(|| EtlError::invalid_input(name, "frame not provided"))?;
    frame
        .check_shape()
        .map_err(|reason| EtlError::invalid_input(name, reason))?;
    let missing: Vec<&str> = needed.iter().copied().filter(|c| !frame.has_column(c)).collect();
    if !missing.is_empty() {
        return Err(EtlError::invalid_input(
            name,
            format!("missing columns {:?}", missing),
        ));
    }
    Ok(frame)
}

fn group_key(row: &[Value], idxs: &[usize]) -> Option<Vec<String>> {
    idxs.iter()
        .map(|&i| match &row[i] {
            Value::Null => None,
            Value::Float(f) if f.is_nan() => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Count non-null `value_column` entries per group of `keys`.
pub fn grouped_count(frame: &Frame, keys: &[&str], value_column: &str) -> Frame {
    let key_idxs: Vec<usize> = keys.iter().filter_map(|k| frame.column_index(k)).collect();
    let value_idx = frame.column_index(value_column);

    let mut groups: BTreeMap<Vec<String>, i64> = BTreeMap::new();
    for row in frame.rows() {
        let Some(key) = group_key(row, &key_idxs) else {
            continue;
        };
        let counted = value_idx.map(|i| !row[i].is_null()).unwrap_or(false);
        *groups.entry(key).or_insert(0) += i64::from(counted);
    }

    let mut columns: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    columns.push(COUNT_COLUMN.to_string());
    let mut out = Frame::new(columns);
    for (key, count) in groups {
        let mut row: Vec<Value> = key.into_iter().map(Value::Text).collect();
        row.push(Value::Int(count));
        out.push_row(row);
    }
    out
}

/// Sum each `(source, output)` measure per group of `keys`.
/// A sum that overflows `i64` fails the whole report.
pub fn grouped_sum(frame: &Frame, keys: &[&str], measures: &[(&str, &str)]) -> Result<Frame> {
    let key_idxs: Vec<usize> = keys.iter().filter_map(|k| frame.column_index(k)).collect();
    let measure_idxs: Vec<Option<usize>> =
        measures.iter().map(|(m, _)| frame.column_index(m)).collect();

    let mut groups: BTreeMap<Vec<String>, Vec<i64>> = BTreeMap::new();
    for row in frame.rows() {
        let Some(key) = group_key(row, &key_idxs) else {
            continue;
        };
        let sums = groups.entry(key).or_insert_with(|| vec![0; measures.len()]);
        for ((sum, idx), (measure, _)) in sums.iter_mut().zip(&measure_idxs).zip(measures) {
            if let Some(v) = idx.and_then(|i| row[i].as_i64()) {
                *sum = sum.checked_add(v).ok_or_else(|| {
                    EtlError::invalid_input(measure, "sum overflows a 64-bit integer")
                })?;
            }
        }
    }

    let columns: Vec<String> = keys
        .iter()
        .map(|k| k.to_string())
        .chain(measures.iter().map(|(_, out)| out.to_string()))
        .collect();
    let mut out = Frame::new(columns);
    for (key, sums) in groups {
        let row: Vec<Value> = key
            .into_iter()
            .map(Value::Text)
            .chain(sums.into_iter().map(Value::Int))
            .collect();
        out.push_row(row);
    }
    Ok(out)
}

/// Build `report_main` and `report_cinemas` stamped with `fecha_carga`.
///
/// Both inputs must be present; nothing is returned unless both reports
/// are complete.
pub fn build_reports(
    main: Option<&Frame>,
    cinemas: Option<&Frame>,
    fecha_carga: NaiveDate,
) -> Result<Reports> {
    info!("creating reports with summarized information");

    let main = validate_input("main", main, &["categoria", "fuente", "provincia", "nombre"])?;
    let cinema_columns: Vec<&str> = std::iter::once("provincia")
        .chain(CINEMA_MEASURES.iter().map(|(m, _)| *m))
        .collect();
    let cinemas = validate_input("cinemas", cinemas, &cinema_columns)?;

    let counts: Vec<Frame> = COUNT_GROUPINGS
        .iter()
        .map(|keys| grouped_count(main, keys, "nombre"))
        .collect();
    let mut report_main = Frame::concat_outer(&counts);
    report_main.add_column(LOAD_DATE_COLUMN, Value::Date(fecha_carga));

    let mut report_cinemas = grouped_sum(cinemas, &["provincia"], CINEMA_MEASURES)?;
    report_cinemas.add_column(LOAD_DATE_COLUMN, Value::Date(fecha_carga));

    info!(
        main_rows = report_main.height(),
        cinema_rows = report_cinemas.height(),
        fecha_carga = %fecha_carga,
        "created reports"
    );

    Ok(Reports {
        report_main,
        report_cinemas,
        fecha_carga,
    })
}
