//! Snapshot layout and latest-snapshot resolution.
//!
//! Raw extracts are stored as
//! `<root>/<category>/<YYYY-MonthName>/<category>-<dd-mm-YYYY>.csv`.
//! The month name is written in the configured [`MonthLocale`]; the same
//! locale must be passed when resolving, nothing here reads process-wide
//! locale state.

use crate::error::{EtlError, Result};
use crate::frame::{Frame, Value};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

static FILE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{2})-([0-9]{2})-([0-9]{4})").expect("valid regex"));

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Language used for month names in snapshot folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthLocale {
    #[default]
    Es,
    En,
}

impl FromStr for MonthLocale {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" | "es_es" | "es_ar" | "es_es.utf-8" => Ok(MonthLocale::Es),
            "en" | "en_us" | "en_us.utf-8" | "c" => Ok(MonthLocale::En),
            other => Err(EtlError::Config(format!("unsupported month locale '{}'", other))),
        }
    }
}

impl MonthLocale {
    fn names(self) -> &'static [&'static str; 12] {
        match self {
            MonthLocale::Es => &SPANISH_MONTHS,
            MonthLocale::En => &ENGLISH_MONTHS,
        }
    }

    /// Month name for 1-based `month`.
    pub fn month_name(self, month: u32) -> &'static str {
        self.names()[(month.clamp(1, 12) - 1) as usize]
    }

    /// 1-based month number for a name, case-insensitive.
    pub fn month_number(self, name: &str) -> Option<u32> {
        let needle = name.trim().to_lowercase();
        self.names()
            .iter()
            .position(|m| m.to_lowercase() == needle)
            .map(|i| i as u32 + 1)
    }
}

/// Folder name for the month containing `date`, e.g. `2022-junio`.
pub fn month_folder(date: NaiveDate, locale: MonthLocale) -> String {
    format!("{}-{}", date.year(), locale.month_name(date.month()))
}

/// File name for a snapshot taken on `date`, e.g. `museos-09-06-2022.csv`.
pub fn snapshot_file_name(category: &str, date: NaiveDate) -> String {
    format!("{}-{}.csv", category, date.format("%d-%m-%Y"))
}

/// Full path a snapshot taken on `date` is stored at.
pub fn snapshot_path(root: &Path, category: &str, date: NaiveDate, locale: MonthLocale) -> PathBuf {
    root.join(category)
        .join(month_folder(date, locale))
        .join(snapshot_file_name(category, date))
}

/// Parse a `YYYY-MonthName` folder into (year, month).
pub fn parse_month_folder(name: &str, locale: MonthLocale) -> Option<(i32, u32)> {
    let (year, month) = name.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month = locale.month_number(month)?;
    Some((year, month))
}

/// Extract the `dd-mm-YYYY` date embedded in a snapshot file name.
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let caps = FILE_DATE.captures(name)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn list_names(dir: &Path) -> std::io::Result<Vec<(String, bool)>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        names.push((entry.file_name().to_string_lossy().to_string(), is_dir));
    }
    Ok(names)
}

/// Path of the most recent snapshot for `category` under `root`.
pub fn latest_snapshot(root: &Path, category: &str, locale: MonthLocale) -> Result<PathBuf> {
    let category_dir = root.join(category);
    let unavailable = |path: &Path, reason: String| EtlError::SourceUnavailable {
        category: category.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let entries = list_names(&category_dir).map_err(|e| unavailable(&category_dir, e.to_string()))?;
    let month = entries
        .iter()
        .filter(|(_, is_dir)| *is_dir)
        .filter_map(|(name, _)| parse_month_folder(name, locale).map(|key| (key, name)))
        .max_by_key(|(key, _)| *key)
        .map(|(_, name)| name.clone())
        .ok_or_else(|| unavailable(&category_dir, "no dated month folder".to_string()))?;

    let month_dir = category_dir.join(&month);
    let files = list_names(&month_dir).map_err(|e| unavailable(&month_dir, e.to_string()))?;
    let file = files
        .iter()
        .filter(|(_, is_dir)| !*is_dir)
        .filter_map(|(name, _)| date_from_file_name(name).map(|d| (d, name)))
        .max_by_key(|(date, _)| *date)
        .map(|(_, name)| name.clone())
        .ok_or_else(|| unavailable(&month_dir, "no dated snapshot file".to_string()))?;

    let path = month_dir.join(file);
    debug!(category, path = %path.display(), "resolved latest snapshot");
    Ok(path)
}

/// Decode raw bytes: UTF-8 (BOM stripped), falling back to Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            warn!("snapshot is not valid UTF-8, decoded as Windows-1252");
            text.into_owned()
        }
    }
}

/// Parse CSV content into an all-text frame. Rows must match the header width.
pub fn parse_csv(content: &str, category: &str) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(EtlError::MalformedSource {
            category: category.to_string(),
            reason: "missing header row".to_string(),
        });
    }

    let mut frame = Frame::new(headers);
    for (line_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| EtlError::MalformedSource {
            category: category.to_string(),
            reason: format!("line {}: {}", line_idx + 2, e),
        })?;
        frame.push_row(record.iter().map(Value::text).collect());
    }
    Ok(frame)
}

/// Read the latest snapshot of a category as a raw frame.
pub fn read_latest(root: &Path, category: &str, locale: MonthLocale) -> Result<Frame> {
    let path = latest_snapshot(root, category, locale)?;
    let bytes = fs::read(&path).map_err(|source| EtlError::Io {
        path: path.clone(),
        source,
    })?;
    let frame = parse_csv(&decode_bytes(&bytes), category)?;
    info!(
        category,
        path = %path.display(),
        rows = frame.height(),
        columns = frame.width(),
        "loaded snapshot"
    );
    Ok(frame)
}
