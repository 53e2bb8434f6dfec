//! Turning raw Config and Slides table rows into typed records.
//!
//! Header and setting names are matched case-insensitively with runs of
//! whitespace folded to underscores, so `Speaker Notes` and `speaker_notes`
//! address the same column.

use crate::types::{Config, ConfigValue, Slide};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex matching whitespace runs inside header and setting names.
static WHITESPACE_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Columns without which a row cannot become a slide.
const REQUIRED_COLUMNS: &[&str] = &["order", "title"];

/// Primary bullet separator. Always wins over [`PIPE_SEPARATOR`].
pub const BULLET_SEPARATOR: &str = " • ";

/// Fallback bullet separator.
pub const PIPE_SEPARATOR: &str = "|";

/// Prefix put in front of every formatted bullet.
pub const BULLET_PREFIX: &str = "• ";

/// Normalize a header or setting name: lowercase, whitespace runs to `_`.
pub fn normalize_key(raw: &str) -> String {
    WHITESPACE_RUN_REGEX
        .replace_all(&raw.trim().to_lowercase(), "_")
        .into_owned()
}

/// Build a [`Config`] from the rows of the Config table.
///
/// The first row is a header and is skipped. Rows with an empty setting or
/// value are ignored. Defaults fill in any key the table does not set.
pub fn load_config(rows: &[Vec<String>]) -> Config {
    let mut config = Config::new();

    for row in rows.iter().skip(1) {
        let key = cell(row, Some(0));
        let value = cell(row, Some(1));
        if key.trim().is_empty() || value.trim().is_empty() {
            continue;
        }
        config.insert(normalize_key(key), ConfigValue::coerce(value));
    }

    config.apply_defaults();
    log::debug!("Loaded {} config settings", config.len());
    config
}

/// Build the ordered slide list from the rows of the Slides table.
///
/// Rows need a non-empty `order` and `title`; others are skipped. The result
/// is stably sorted by numeric `order`, so rows sharing an order keep their
/// table order.
pub fn load_slides(rows: &[Vec<String>]) -> Result<Vec<Slide>> {
    let Some(header) = rows.first() else {
        return Err(Error::EmptySlideTable);
    };

    let headers: Vec<String> = header.iter().map(|h| normalize_key(h)).collect();
    let mut columns: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        columns.insert(name.as_str(), idx);
    }

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(Error::MissingRequiredColumn {
                column: (*required).to_string(),
                found: headers.clone(),
            });
        }
    }

    if rows.len() < 2 {
        return Err(Error::EmptySlideTable);
    }

    let col = |name: &str| columns.get(name).copied();
    let mut slides = Vec::new();

    for (idx, row) in rows.iter().enumerate().skip(1) {
        let order_cell = cell(row, col("order"));
        let title = cell(row, col("title"));
        if order_cell.trim().is_empty() || title.trim().is_empty() {
            continue;
        }

        let order = order_cell
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| Error::InvalidSlideOrder {
                row: idx + 1,
                value: order_cell.to_string(),
            })?;

        let layout = cell(row, col("layout"));
        slides.push(Slide {
            order,
            section_id: cell(row, col("section_id")).to_string(),
            layout: if layout.is_empty() {
                "Content".to_string()
            } else {
                layout.to_string()
            },
            title: title.to_string(),
            subtitle: cell(row, col("subtitle")).to_string(),
            bullets: cell(row, col("bullets")).to_string(),
            speaker_notes: cell(row, col("speaker_notes")).to_string(),
            media_ref: cell(row, col("media_ref")).to_string(),
            chart_ref: cell(row, col("chart_ref")).to_string(),
        });
    }

    if slides.is_empty() {
        return Err(Error::EmptySlideTable);
    }

    slides.sort_by(|a, b| a.order.total_cmp(&b.order));
    log::debug!("Loaded {} slides", slides.len());
    Ok(slides)
}

/// Format raw bullet text as one `• `-prefixed line per bullet.
///
/// Splits on `" • "` if present, else on `"|"`, else keeps the text as a
/// single bullet. Blank entries are dropped and the rest trimmed.
pub fn format_bullets(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let parts: Vec<&str> = if raw.contains(BULLET_SEPARATOR) {
        raw.split(BULLET_SEPARATOR).collect()
    } else if raw.contains(PIPE_SEPARATOR) {
        raw.split(PIPE_SEPARATOR).collect()
    } else {
        vec![raw]
    };

    parts
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .map(|b| format!("{}{}", BULLET_PREFIX, b))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}
