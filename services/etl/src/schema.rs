//! Per-category schema descriptors.
//!
//! Every category shares the canonical fact fields. Categories that carry
//! numeric or flag columns declare them as [`FieldSpec`]s; the coercer and
//! the projector read the declaration instead of branching on names.

use serde::{Deserialize, Serialize};

/// Fields present in every canonical fact record, in output order.
pub const SHARED_FIELDS: &[&str] = &[
    "cod_localidad",
    "id_provincia",
    "id_departamento",
    "categoria",
    "provincia",
    "localidad",
    "nombre",
    "domicilio",
    "codigo_postal",
    "telefono",
    "mail",
    "web",
    "fuente",
];

/// Shared fields a category cannot be loaded without.
pub const REQUIRED_FIELDS: &[&str] = &["nombre"];

pub const CINEMA_CATEGORY: &str = "salas_de_cine";

fn default_affirmative() -> Vec<String> {
    vec!["si".to_string(), "1".to_string()]
}

/// How a declared field is coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Coercion {
    /// Non-negative integer; anything unparseable becomes 0.
    Count,
    /// 1 when the value matches an affirmative token, else 0.
    Flag {
        #[serde(default = "default_affirmative")]
        affirmative: Vec<String>,
    },
}

impl Coercion {
    pub fn flag() -> Self {
        Coercion::Flag {
            affirmative: default_affirmative(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub coercion: Coercion,
}

impl FieldSpec {
    pub fn new(name: &str, coercion: Coercion) -> Self {
        Self {
            name: name.to_string(),
            coercion,
        }
    }
}

/// Schema for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySchema {
    pub category: String,
    pub fields: Vec<FieldSpec>,
}

impl CategorySchema {
    /// Schema with only the shared fields.
    pub fn plain(category: &str) -> Self {
        Self {
            category: category.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn cinemas() -> Self {
        Self {
            category: CINEMA_CATEGORY.to_string(),
            fields: vec![
                FieldSpec::new("butacas", Coercion::Count),
                FieldSpec::new("pantallas", Coercion::Count),
                FieldSpec::new("espacio_incaa", Coercion::flag()),
            ],
        }
    }

    /// Built-in schema for a known category, or a plain one.
    pub fn builtin(category: &str) -> Self {
        match category {
            CINEMA_CATEGORY => Self::cinemas(),
            other => Self::plain(other),
        }
    }

    /// Schema from configuration: declared fields win over the built-ins.
    pub fn resolve(category: &str, declared: Option<&[FieldSpec]>) -> Self {
        match declared {
            Some(fields) => Self {
                category: category.to_string(),
                fields: fields.to_vec(),
            },
            None => Self::builtin(category),
        }
    }

    /// Output columns: shared fields followed by the declared ones.
    pub fn allow_list(&self) -> Vec<&str> {
        SHARED_FIELDS
            .iter()
            .copied()
            .chain(self.fields.iter().map(|f| f.name.as_str()))
            .collect()
    }

    pub fn is_required(&self, column: &str) -> bool {
        REQUIRED_FIELDS.contains(&column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cinema_allow_list_extends_shared_fields() {
        let schema = CategorySchema::builtin("salas_de_cine");
        let allow = schema.allow_list();
        assert_eq!(allow.len(), SHARED_FIELDS.len() + 3);
        assert_eq!(&allow[allow.len() - 3..], &["butacas", "pantallas", "espacio_incaa"]);
    }

    #[test]
    fn test_plain_category_has_shared_fields_only() {
        let schema = CategorySchema::builtin("museos");
        assert_eq!(schema.allow_list(), SHARED_FIELDS.to_vec());
    }

    #[test]
    fn test_declared_fields_deserialize() {
        let json = r#"[
            {"name": "asientos", "type": "count"},
            {"name": "accesible", "type": "flag"},
            {"name": "wifi", "type": "flag", "affirmative": ["yes"]}
        ]"#;
        let fields: Vec<FieldSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(fields[0], FieldSpec::new("asientos", Coercion::Count));
        assert_eq!(fields[1].coercion, Coercion::flag());
        assert_eq!(
            fields[2].coercion,
            Coercion::Flag {
                affirmative: vec!["yes".to_string()]
            }
        );

        let schema = CategorySchema::resolve("teatros", Some(fields.as_slice()));
        assert!(schema.allow_list().contains(&"asientos"));
    }
}
