//! Column name normalization.
//!
//! Raw headers arrive as `codLocalidad`, `IdProvincia`, `Teléfono`,
//! `Código Postal`, `espacio_INCAA`... and leave as lower snake case:
//! diacritics folded, camel-case words split, everything else collapsed
//! to single underscores. Known abbreviations are then renamed.

use crate::frame::Frame;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Word boundary before a capitalized word: `HTTPServer` -> `HTTP_Server`.
static CAPITALIZED_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
/// Collapse the double separator the previous rule creates after `_`.
static DOUBLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([A-Z])").expect("valid regex"));
/// Word boundary between lower/digit and upper: `codLoc` -> `cod_Loc`.
static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Known column abbreviations, applied after generic normalization.
pub const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("cod_loc", "cod_localidad"),
    ("direccion", "domicilio"),
    ("cp", "codigo_postal"),
];

/// Fold a Latin character to its closest unaccented ASCII equivalent.
/// Characters outside the table are returned unchanged.
pub fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ą' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ą' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' | 'Ů' => 'U',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        'š' | 'ś' => 's',
        'Š' | 'Ś' => 'S',
        'ž' | 'ź' | 'ż' => 'z',
        'Ž' | 'Ź' | 'Ż' => 'Z',
        'ł' => 'l',
        'Ł' => 'L',
        other => other,
    }
}

/// Combining diacritical marks (U+0300..U+036F), as found in decomposed text.
fn is_combining_mark(c: char) -> bool {
    ('\u{300}'..='\u{36f}').contains(&c)
}

/// Fold precomposed letters and drop combining marks, so `Categoría` and
/// `Categori\u{301}a` both become `Categoria`.
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_diacritic)
        .collect()
}

/// Normalize one header to lower snake case. Idempotent.
pub fn to_snake_case(name: &str) -> String {
    let folded = strip_diacritics(name.trim());
    let split = CAPITALIZED_WORD.replace_all(&folded, "${1}_${2}");
    let split = DOUBLE_SEPARATOR.replace_all(&split, "_${1}");
    let split = LOWER_UPPER.replace_all(&split, "${1}_${2}");
    let lowered = split.to_lowercase();
    NON_WORD
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Name given to headers with nothing left after normalization.
pub const UNNAMED_COLUMN: &str = "unnamed";

/// Full header normalization: snake case plus alias resolution.
pub fn normalize_column_name(name: &str) -> String {
    let snake = to_snake_case(name);
    if snake.is_empty() {
        return UNNAMED_COLUMN.to_string();
    }
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == snake)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(snake)
}

/// Normalize a header list positionally. Collisions get a numeric suffix
/// so no column is lost. Normalizing the result again returns it unchanged.
pub fn normalize_columns(columns: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for raw in columns {
        let base = normalize_column_name(raw);
        let mut name = base.clone();
        let mut n = 2;
        while out.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        if name != base {
            warn!(raw = %raw, renamed = %name, "duplicate column after normalization");
        }
        if *raw != name {
            debug!(raw = %raw, normalized = %name, "renamed column");
        }
        out.push(name);
    }
    out
}

/// Rename every column of the frame in place.
pub fn normalize_frame_columns(frame: &mut Frame) {
    let names = normalize_columns(frame.columns());
    frame.rename_columns(names);
}
