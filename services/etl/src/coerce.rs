//! Numeric and flag coercion driven by [`CategorySchema`] declarations.
//!
//! Coerced values are always integers: counts default to 0 and flags are
//! stored as 0/1 rather than booleans so the destination schema stays
//! plain `BIGINT`.

use crate::frame::{Frame, Value};
use crate::normalize::strip_diacritics;
use crate::schema::{CategorySchema, Coercion};
use tracing::{debug, warn};

/// Largest count accepted; anything above is treated as a data error.
pub const MAX_COUNT: i64 = 1_000_000_000;

/// Parse a count. Surrounding and embedded spaces are tolerated; failures,
/// non-finite, negative and out-of-range numbers yield `None`.
///
/// `,` is not a thousands separator in these sources (it is the decimal
/// mark), so `"1,5"` and `"1,200"` do not parse.
pub fn parse_count(raw: &str) -> Option<i64> {
    let cleaned = raw.trim().replace([' ', '\u{a0}'], "");
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    count_from_f64(value)
}

fn count_from_f64(value: f64) -> Option<i64> {
    if !value.is_finite() || value < 0.0 || value > MAX_COUNT as f64 {
        return None;
    }
    Some(value as i64)
}

/// Coerce one cell for a declared coercion.
pub fn coerce_value(value: &Value, coercion: &Coercion) -> Value {
    match coercion {
        Coercion::Count => {
            let parsed = match value {
                Value::Text(s) => parse_count(s),
                Value::Int(v) if (0..=MAX_COUNT).contains(v) => Some(*v),
                Value::Float(v) => count_from_f64(*v),
                _ => None,
            };
            Value::Int(parsed.unwrap_or(0))
        }
        Coercion::Flag { affirmative } => {
            let hit = match value {
                Value::Text(s) => {
                    let token = strip_diacritics(s.trim()).to_lowercase();
                    affirmative
                        .iter()
                        .any(|a| strip_diacritics(a).to_lowercase() == token)
                }
                Value::Int(v) => *v == 1,
                _ => false,
            };
            Value::Int(i64::from(hit))
        }
    }
}

/// Apply the schema's declared coercions to the frame.
/// A declared field missing from the frame is added holding its default.
pub fn coerce_frame(frame: &mut Frame, schema: &CategorySchema) {
    for field in &schema.fields {
        match frame.column_index(&field.name) {
            Some(idx) => {
                frame.map_column(idx, |cell| coerce_value(cell, &field.coercion));
                debug!(category = %schema.category, field = %field.name, "coerced column");
            }
            None => {
                warn!(
                    category = %schema.category,
                    field = %field.name,
                    "declared field absent from source, filling with default"
                );
                frame.add_column(field.name.clone(), coerce_value(&Value::Null, &field.coercion));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    fn cinema_frame(butacas: &str, pantallas: &str, incaa: &str) -> Frame {
        Frame::from_parts(
            vec!["nombre".into(), "butacas".into(), "pantallas".into(), "espacio_incaa".into()],
            vec![vec![
                Value::text("Cine X"),
                Value::text(butacas),
                Value::text(pantallas),
                Value::text(incaa),
            ]],
        )
    }

    // -------------------------------------------------------------------------
    // COUNTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_count_parsing() {
        assert_eq!(parse_count("120"), Some(120));
        assert_eq!(parse_count(" 1 200 "), Some(1200));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count("-3"), None);
    }

    #[test]
    fn test_comma_is_not_a_thousands_separator() {
        assert_eq!(parse_count("1,5"), None);
        assert_eq!(parse_count("1,200"), None);
        assert_eq!(coerce_value(&Value::text("1,5"), &Coercion::Count), Value::Int(0));
    }

    #[test]
    fn test_out_of_range_counts_fall_back_to_zero() {
        assert_eq!(parse_count("1e19"), None);
        assert_eq!(parse_count("1000000001"), None);
        assert_eq!(parse_count("1000000000"), Some(MAX_COUNT));
        assert_eq!(coerce_value(&Value::text("1e19"), &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::Int(i64::MAX), &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::Float(1e19), &Coercion::Count), Value::Int(0));
    }

    #[test]
    fn test_count_fallback_is_zero() {
        assert_eq!(coerce_value(&Value::text("abc"), &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::text(""), &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::Null, &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::Float(f64::NAN), &Coercion::Count), Value::Int(0));
        assert_eq!(coerce_value(&Value::text("350"), &Coercion::Count), Value::Int(350));
    }

    // -------------------------------------------------------------------------
    // FLAGS
    // -------------------------------------------------------------------------

    #[test]
    fn test_flag_affirmative_tokens() {
        let flag = Coercion::flag();
        assert_eq!(coerce_value(&Value::text("SI"), &flag), Value::Int(1));
        assert_eq!(coerce_value(&Value::text("si"), &flag), Value::Int(1));
        assert_eq!(coerce_value(&Value::text("Sí"), &flag), Value::Int(1));
        assert_eq!(coerce_value(&Value::text("1"), &flag), Value::Int(1));
    }

    #[test]
    fn test_flag_everything_else_is_zero() {
        let flag = Coercion::flag();
        assert_eq!(coerce_value(&Value::text("no"), &flag), Value::Int(0));
        assert_eq!(coerce_value(&Value::text(""), &flag), Value::Int(0));
        assert_eq!(coerce_value(&Value::text("sin dato"), &flag), Value::Int(0));
        assert_eq!(coerce_value(&Value::Null, &flag), Value::Int(0));
    }

    // -------------------------------------------------------------------------
    // FRAME
    // -------------------------------------------------------------------------

    #[test]
    fn test_coerce_cinema_frame() {
        let mut frame = cinema_frame("abc", "3", "SI");
        coerce_frame(&mut frame, &CategorySchema::cinemas());
        assert_eq!(frame.get(0, "butacas"), Some(&Value::Int(0)));
        assert_eq!(frame.get(0, "pantallas"), Some(&Value::Int(3)));
        assert_eq!(frame.get(0, "espacio_incaa"), Some(&Value::Int(1)));
        assert_eq!(frame.get(0, "nombre"), Some(&Value::text("Cine X")));
    }

    #[test]
    fn test_missing_declared_field_gets_default() {
        let mut frame = Frame::from_parts(vec!["nombre".into()], vec![vec![Value::text("A")]]);
        coerce_frame(&mut frame, &CategorySchema::cinemas());
        assert_eq!(frame.get(0, "butacas"), Some(&Value::Int(0)));
        assert_eq!(frame.get(0, "espacio_incaa"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_plain_schema_leaves_frame_untouched() {
        let mut frame = cinema_frame("abc", "3", "SI");
        let before = frame.clone();
        coerce_frame(&mut frame, &CategorySchema::plain("museos"));
        assert_eq!(frame, before);
    }

    #[test]
    fn test_configured_category_needs_no_code_change() {
        let schema = CategorySchema {
            category: "teatros".into(),
            fields: vec![FieldSpec::new("asientos", Coercion::Count)],
        };
        let mut frame = Frame::from_parts(vec!["asientos".into()], vec![vec![Value::text("80")]]);
        coerce_frame(&mut frame, &schema);
        assert_eq!(frame.get(0, "asientos"), Some(&Value::Int(80)));
    }
}
