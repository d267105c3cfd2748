//! Categorical value reconciliation.
//!
//! Source files spell the same province or publishing institution in
//! several ways. Each field has an exact-match correction map; values with
//! no entry pass through untouched.

use crate::frame::{Frame, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const PROVINCIA_CORRECTIONS: &[(&str, &str)] = &[
    ("Neuquén\u{a0}", "Neuquén"),
    (
        "Tierra del Fuego",
        "Tierra del Fuego, Antártida e Islas del Atlántico Sur",
    ),
    ("Santa Fé", "Santa Fe"),
];

const FUENTE_CORRECTIONS: &[(&str, &str)] = &[
    ("Gob. Pcia.", "Gobierno de la Provincia"),
    ("Gobierno de la provincia", "Gobierno de la Provincia"),
    ("RCC- Córdoba", "RCC"),
    ("SInCA", "INCAA / SInCA"),
];

/// Per-field correction maps.
#[derive(Debug, Clone)]
pub struct Reconciler {
    maps: HashMap<String, HashMap<String, String>>,
}

impl Default for Reconciler {
    fn default() -> Self {
        let mut reconciler = Self::empty();
        reconciler.extend("provincia", PROVINCIA_CORRECTIONS.iter().copied());
        reconciler.extend("fuente", FUENTE_CORRECTIONS.iter().copied());
        reconciler
    }
}

impl Reconciler {
    pub fn empty() -> Self {
        Self {
            maps: HashMap::new(),
        }
    }

    /// Built-in maps with configured corrections merged on top.
    pub fn with_overrides(overrides: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut reconciler = Self::default();
        for (field, corrections) in overrides {
            reconciler.extend(
                field,
                corrections.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        reconciler
    }

    pub fn extend<'a>(&mut self, field: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let map = self.maps.entry(field.to_string()).or_default();
        for (raw, canonical) in pairs {
            map.insert(raw.to_string(), canonical.to_string());
        }
    }

    /// Canonical spelling for `value` in `field`.
    pub fn reconcile<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        self.maps
            .get(field)
            .and_then(|m| m.get(value))
            .map(String::as_str)
            .unwrap_or(value)
    }

    /// Apply every field map to the matching frame column.
    /// Returns the number of cells rewritten.
    pub fn apply(&self, frame: &mut Frame) -> usize {
        let mut changed = 0;
        for (field, map) in &self.maps {
            let Some(idx) = frame.column_index(field) else {
                continue;
            };
            frame.map_column(idx, |cell| match cell {
                Value::Text(s) => match map.get(s) {
                    Some(canonical) => {
                        changed += 1;
                        Value::Text(canonical.clone())
                    }
                    None => cell.clone(),
                },
                other => other.clone(),
            });
        }
        if changed > 0 {
            debug!(cells = changed, "reconciled categorical values");
        }
        changed
    }
}
