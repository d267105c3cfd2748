//! Null canonicalization.
//!
//! After coercion and projection a frame may still hold NaN floats or
//! empty strings. Both become [`Value::Null`] so the load step writes SQL
//! NULL for every absent value.

use crate::frame::{Frame, Value};

pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Float(v) => v.is_nan(),
        Value::Text(s) => s.trim().is_empty(),
        Value::Int(_) | Value::Date(_) => false,
    }
}

/// Replace every absent value with [`Value::Null`]. Returns the count.
pub fn canonicalize_nulls(frame: &mut Frame) -> usize {
    let mut replaced = 0;
    for cell in frame.cells_mut() {
        if !cell.is_null() && is_absent(cell) {
            *cell = Value::Null;
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_become_null() {
        let mut frame = Frame::from_parts(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                vec![Value::Float(f64::NAN), Value::text(""), Value::text("  "), Value::Int(0)],
                vec![Value::Float(1.5), Value::text("x"), Value::Null, Value::text("\u{a0}")],
            ],
        );
        let replaced = canonicalize_nulls(&mut frame);
        assert_eq!(replaced, 4);
        assert_eq!(frame.rows()[0][..3], [Value::Null, Value::Null, Value::Null]);
        assert_eq!(frame.rows()[0][3], Value::Int(0));
        assert_eq!(frame.rows()[1][0], Value::Float(1.5));
        assert_eq!(frame.rows()[1][3], Value::Null);
    }

    #[test]
    fn test_no_nan_survives() {
        let mut frame = Frame::from_parts(
            vec!["x".into()],
            (0..10)
                .map(|i| vec![if i % 2 == 0 { Value::Float(f64::NAN) } else { Value::Int(i) }])
                .collect(),
        );
        canonicalize_nulls(&mut frame);
        assert!(frame
            .rows()
            .iter()
            .flatten()
            .all(|v| !matches!(v, Value::Float(f) if f.is_nan())));
    }
}
