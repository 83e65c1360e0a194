//! Clinical-form pre-fill from a dropped CSV file.
//!
//! Only the header row and the first data row are read. Header names are
//! normalized (trimmed, whitespace runs collapsed to `_`, lower-cased) and
//! looked up in [`FIELD_MAP`]; anything not in the table, including the
//! [`TARGET_LABEL`] column, is ignored.

use indexmap::IndexMap;

use crate::error::{CorpusError, CorpusResult};

/// Outcome column of the training data; never a form input.
pub const TARGET_LABEL: &str = "fetal_health";

/// Normalized header name → form field key.
pub const FIELD_MAP: [(&str, &str); 21] = [
    ("baseline_value", "baseline_value"),
    ("accelerations", "accelerations"),
    ("fetal_movement", "fetal_movement"),
    ("uterine_contractions", "uterine_contractions"),
    ("light_decelerations", "light_decelerations"),
    ("severe_decelerations", "severe_decelerations"),
    ("prolongued_decelerations", "prolongued_decelerations"),
    (
        "abnormal_short_term_variability",
        "abnormal_short_term_variability",
    ),
    (
        "mean_value_of_short_term_variability",
        "mean_value_of_short_term_variability",
    ),
    (
        "percentage_of_time_with_abnormal_long_term_variability",
        "percentage_of_time_with_abnormal_long_term_variability",
    ),
    (
        "mean_value_of_long_term_variability",
        "mean_value_of_long_term_variability",
    ),
    ("histogram_width", "histogram_width"),
    ("histogram_min", "histogram_min"),
    ("histogram_max", "histogram_max"),
    ("histogram_number_of_peaks", "histogram_number_of_peaks"),
    ("histogram_number_of_zeroes", "histogram_number_of_zeroes"),
    ("histogram_mode", "histogram_mode"),
    ("histogram_mean", "histogram_mean"),
    ("histogram_median", "histogram_median"),
    ("histogram_variance", "histogram_variance"),
    ("histogram_tendency", "histogram_tendency"),
];

pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn field_key(normalized: &str) -> Option<&'static str> {
    FIELD_MAP
        .iter()
        .find(|(header, _)| *header == normalized)
        .map(|(_, key)| *key)
}

/// Split one CSV record. Double-quoted fields may contain commas and `""`
/// escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Form values keyed by field, in [`FIELD_MAP`] order.
pub fn prefill_from_csv(text: &str) -> CorpusResult<IndexMap<&'static str, f64>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| CorpusError::InvalidCsv("file is empty".to_string()))?;
    let row = lines
        .next()
        .ok_or_else(|| CorpusError::InvalidCsv("no data row after the header".to_string()))?;

    let headers = split_record(header);
    let values = split_record(row);

    let mut found: IndexMap<&'static str, String> = IndexMap::new();
    for (i, raw) in headers.iter().enumerate() {
        let name = normalize_header(raw);
        if name == TARGET_LABEL {
            continue;
        }
        let Some(key) = field_key(&name) else {
            tracing::debug!(column = %raw, "ignoring unknown CSV column");
            continue;
        };
        let value = values.get(i).map(|v| v.trim().to_string()).unwrap_or_default();
        found.entry(key).or_insert(value);
    }

    let missing: Vec<String> = FIELD_MAP
        .iter()
        .filter(|(_, key)| !found.contains_key(key))
        .map(|(_, key)| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CorpusError::MissingField(missing));
    }

    let mut form = IndexMap::new();
    for (_, key) in FIELD_MAP {
        let raw = &found[key];
        let value: f64 = raw.parse().map_err(|_| CorpusError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
        })?;
        if !value.is_finite() {
            return Err(CorpusError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
            });
        }
        form.insert(key, value);
    }
    Ok(form)
}
