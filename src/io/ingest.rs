//! JSON ingest and normalization.
//!
//! This module is responsible for turning a heterogeneous storefront snapshot
//! (`games.json`: an object keyed by app id, each value a nested record) into:
//!
//! - one `ProductRow` per product with guaranteed-present numeric fields
//! - a long-format `TagAssociationRow` table unnested from `tags` / `genres`
//!
//! Design goals:
//! - **Strict schema** for the top-level shape (fail fast, no partial table)
//! - **Record-level validation** (skip bad records, but report what happened)
//! - **Deterministic behavior** (no hidden randomness, stable ordering)
//! - **Separation of concerns**: no fitting logic here

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{ImputeStrategy, LoaderConfig, ProductRow, TagAssociationRow, TagKind, ZeroReviewPolicy};
use crate::error::AppError;
use crate::math::descriptive::median;

const EXPECTED_TOP_LEVEL: &str = "a JSON object keyed by product id";

/// Keys probed for the product id when the snapshot is an array of records.
const ID_KEYS: [&str; 3] = ["app_id", "appid", "id"];

/// A record that was skipped during ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordWarning {
    /// Object key, or `#<index>` for array-shaped snapshots.
    pub key: String,
    pub message: String,
}

/// What happened during a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub records_read: usize,
    pub records_used: usize,
    pub skipped: Vec<RecordWarning>,
    /// Rows whose price was absent/invalid and filled by the impute strategy.
    pub price_imputed: usize,
    pub playtime_imputed: usize,
    /// Rows with `positive + negative == 0`.
    pub zero_review_rows: usize,
    /// Rows without a parseable release date.
    pub undated_rows: usize,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Loader output. Treated as immutable for the rest of the process.
#[derive(Debug, Clone)]
pub struct LoadOutput {
    pub products: Vec<ProductRow>,
    pub associations: Vec<TagAssociationRow>,
    pub report: LoadReport,
}

/// Stateless loader; all behavior comes from its `LoaderConfig`.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

/// A record that passed validation but has not been imputed yet.
#[derive(Debug)]
struct ParsedRecord {
    id: String,
    name: Option<String>,
    release_date: Option<NaiveDate>,
    price: Option<f64>,
    playtime: Option<f64>,
    positive: u64,
    negative: u64,
    tags: BTreeSet<String>,
    genres: BTreeSet<String>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a snapshot file that an external fetcher already placed on disk.
    pub fn load_path(&self, path: &Path) -> Result<LoadOutput, AppError> {
        info!(path = %path.display(), "Loading catalog snapshot");
        let file = File::open(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_reader(BufReader::new(file))
    }

    /// Load from any reader. The whole input is materialized before transforming.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<LoadOutput, AppError> {
        let value: Value = serde_json::from_reader(reader)
            .map_err(|e| AppError::schema("well-formed JSON", format!("parse error: {e}")))?;
        self.load_value(value)
    }

    pub fn load_str(&self, json: &str) -> Result<LoadOutput, AppError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AppError::schema("well-formed JSON", format!("parse error: {e}")))?;
        self.load_value(value)
    }

    /// Transform an already-parsed snapshot.
    pub fn load_value(&self, value: Value) -> Result<LoadOutput, AppError> {
        validate_strategy("price", self.config.price_impute)?;
        validate_strategy("playtime", self.config.playtime_impute)?;

        // (label for warnings, resolved id, record)
        let entries: Vec<(String, Option<String>, Value)> = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, record)| {
                    let id = Some(key.trim().to_string()).filter(|k| !k.is_empty());
                    (key, id, record)
                })
                .collect(),
            Value::Array(items) => {
                warn!("Snapshot is an array, not an object; resolving product ids from record fields");
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, record)| (format!("#{idx}"), array_record_id(&record), record))
                    .collect()
            }
            other => return Err(AppError::schema(EXPECTED_TOP_LEVEL, json_type_name(&other))),
        };

        let mut report = LoadReport {
            records_read: entries.len(),
            ..LoadReport::default()
        };
        let mut seen = HashSet::new();
        let mut parsed = Vec::with_capacity(entries.len());

        for (key, id, record) in entries {
            let outcome = match id {
                None => Err("missing or unresolvable product id".to_string()),
                Some(id) if !seen.insert(id.clone()) => Err(format!("duplicate product id `{id}`")),
                Some(id) => self.parse_record(id, &record),
            };
            match outcome {
                Ok(rec) => parsed.push(rec),
                Err(message) => {
                    warn!(record = %key, "Skipping record: {message}");
                    report.skipped.push(RecordWarning { key, message });
                }
            }
        }

        let price_fill = fill_value(self.config.price_impute, parsed.iter().filter_map(|r| r.price));
        let playtime_fill = fill_value(self.config.playtime_impute, parsed.iter().filter_map(|r| r.playtime));
        debug!(price_fill, playtime_fill, "Resolved imputation values");

        let mut products = Vec::with_capacity(parsed.len());
        let mut associations = Vec::new();

        for rec in parsed {
            let row = self.finish_record(rec, price_fill, playtime_fill, &mut report);
            associations.extend(unnest(&row));
            products.push(row);
        }

        report.records_used = products.len();
        info!(
            records_read = report.records_read,
            records_used = report.records_used,
            skipped = report.skipped_count(),
            price_imputed = report.price_imputed,
            playtime_imputed = report.playtime_imputed,
            zero_review_rows = report.zero_review_rows,
            undated_rows = report.undated_rows,
            associations = associations.len(),
            "Catalog ETL complete"
        );

        Ok(LoadOutput {
            products,
            associations,
            report,
        })
    }

    fn parse_record(&self, id: String, record: &Value) -> Result<ParsedRecord, String> {
        let Value::Object(fields) = record else {
            return Err(format!("record is {}, expected an object", json_type_name(record)));
        };

        let positive = parse_count(fields.get("positive")).map_err(|e| format!("invalid `positive`: {e}"))?;
        let negative = parse_count(fields.get("negative")).map_err(|e| format!("invalid `negative`: {e}"))?;
        if positive.checked_add(negative).is_none() {
            return Err(format!("review counts {positive} + {negative} overflow"));
        }

        let playtime = self
            .config
            .playtime_keys
            .iter()
            .find_map(|key| fields.get(key).filter(|v| !v.is_null()))
            .and_then(parse_non_negative);

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let release_date = fields
            .get("release_date")
            .and_then(Value::as_str)
            .and_then(parse_release_date);

        Ok(ParsedRecord {
            id,
            name,
            release_date,
            price: fields.get("price").and_then(parse_non_negative),
            playtime,
            positive,
            negative,
            tags: parse_labels(fields.get("tags")),
            genres: parse_labels(fields.get("genres")),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish_record(&self, rec: ParsedRecord, price_fill: f64, playtime_fill: f64, report: &mut LoadReport) -> ProductRow {
        let price_imputed = rec.price.is_none();
        let playtime_imputed = rec.playtime.is_none();
        report.price_imputed += usize::from(price_imputed);
        report.playtime_imputed += usize::from(playtime_imputed);

        // Overflowing totals were rejected in `parse_record`.
        let total = rec.positive.saturating_add(rec.negative);
        let score_ratio = if total > 0 {
            Some(rec.positive as f64 / total as f64)
        } else {
            report.zero_review_rows += 1;
            match self.config.zero_reviews {
                ZeroReviewPolicy::Exclude => None,
                ZeroReviewPolicy::Zero => Some(0.0),
            }
        };

        if rec.release_date.is_none() {
            report.undated_rows += 1;
        }

        ProductRow {
            product_id: rec.id,
            name: rec.name,
            release_date: rec.release_date,
            price: rec.price.unwrap_or(price_fill),
            playtime: rec.playtime.unwrap_or(playtime_fill),
            price_imputed,
            playtime_imputed,
            positive_reviews: rec.positive,
            negative_reviews: rec.negative,
            score_ratio,
            tags: rec.tags,
            genres: rec.genres,
        }
    }
}

/// Load a snapshot with the default `LoaderConfig`.
pub fn load_and_clean(path: &Path) -> Result<LoadOutput, AppError> {
    Loader::default().load_path(path)
}

/// Explode a row's `tags` and `genres` into association rows.
///
/// Both sets are already deduplicated, so each `(product, kind, tag)` appears once.
pub fn unnest(row: &ProductRow) -> impl Iterator<Item = TagAssociationRow> + '_ {
    [TagKind::Tag, TagKind::Genre].into_iter().flat_map(move |kind| {
        row.labels(kind).iter().map(move |tag| TagAssociationRow {
            product_id: row.product_id.clone(),
            kind,
            tag: tag.clone(),
        })
    })
}

fn validate_strategy(field: &str, strategy: ImputeStrategy) -> Result<(), AppError> {
    match strategy {
        ImputeStrategy::Constant(c) if !(c.is_finite() && c >= 0.0) => Err(AppError::InvalidSpec(format!(
            "{field} imputation constant must be finite and >= 0, got {c}"
        ))),
        _ => Ok(()),
    }
}

fn fill_value(strategy: ImputeStrategy, observed: impl Iterator<Item = f64>) -> f64 {
    match strategy {
        ImputeStrategy::Zero => 0.0,
        ImputeStrategy::Constant(c) => c,
        ImputeStrategy::Median => median(&observed.collect::<Vec<_>>()).unwrap_or(0.0),
    }
}

fn array_record_id(record: &Value) -> Option<String> {
    let fields = record.as_object()?;
    ID_KEYS.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => n.as_u64().map(|v| v.to_string()),
        _ => None,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a price/playtime-like value. Anything absent, non-numeric, negative or
/// non-finite is `None` and gets imputed.
fn parse_non_negative(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if v.is_finite() && v >= 0.0 { Some(v) } else { None }
}

/// Parse a review count. Absent/null counts are `0`; present but invalid ones
/// make the whole record malformed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn parse_count(value: Option<&Value>) -> Result<u64, String> {
    let as_integral = |f: f64| -> Result<u64, String> {
        if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
            Ok(f as u64)
        } else {
            Err(format!("expected a non-negative integer, got {f}"))
        }
    };

    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Ok(v),
            None => as_integral(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            match s.parse::<u64>() {
                Ok(v) => Ok(v),
                Err(_) => as_integral(s.parse::<f64>().map_err(|_| format!("expected a number, got '{s}'"))?),
            }
        }
        Some(other) => Err(format!("expected a number, got {}", json_type_name(other))),
    }
}

/// Normalize a tag/genre field into a set of names.
///
/// Accepted shapes: `{"Indie": 120, ...}` (vote map), `["Indie", ...]`, a
/// JSON-encoded string of either, or a comma-separated string. Anything else
/// is an empty set.
fn parse_labels(value: Option<&Value>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut push = |s: &str| {
        let s = s.trim();
        if !s.is_empty() {
            out.insert(s.to_string());
        }
    };

    match value {
        Some(Value::Object(map)) => map.keys().for_each(|k| push(k.as_str())),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).for_each(&mut push),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') || trimmed.starts_with('{') {
                if let Ok(inner @ (Value::Array(_) | Value::Object(_))) = serde_json::from_str::<Value>(trimmed) {
                    return parse_labels(Some(&inner));
                }
                return out;
            }
            trimmed.split(',').for_each(&mut push);
        }
        _ => {}
    }
    out
}

/// Tolerant release-date parser.
///
/// Storefront exports mix ISO dates with `Oct 21, 2008`, `21 Oct, 2008`,
/// month-only (`Oct 2008`) and year-only values. Anything else (e.g. "Coming
/// soon") is `None`.
pub fn parse_release_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 7] = [
        "%Y-%m-%d",
        "%b %d, %Y",
        "%d %b, %Y",
        "%d %b %Y",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%d.%m.%Y",
    ];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // Month + year: pin to the first of the month.
    let month_year = s.replace(',', "");
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {month_year}"), "%d %b %Y") {
        return Some(d);
    }

    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }

    None
}
