//! Synthetic catalog generation.
//!
//! Produces raw storefront records (the same nested shape the loader ingests)
//! from a known linear model, so the whole pipeline can be exercised end to
//! end without a real snapshot:
//!
//! `score = intercept + price_slope * price + playtime_slope * playtime + ε`
//!
//! Review counts are derived from `score` and `reviews_per_product`, so the
//! loader's score ratio recovers `score` up to rounding.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde_json::{Map, Value, json};

use crate::error::AppError;

const TAG_POOL: [&str; 8] = [
    "Indie",
    "Action",
    "Roguelike",
    "RPG",
    "Strategy",
    "Casual",
    "Pixel Graphics",
    "Souls-like",
];
const GENRE_POOL: [&str; 4] = ["Action", "Indie", "Strategy", "Simulation"];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: u64,
    pub intercept: f64,
    pub price_slope: f64,
    pub playtime_slope: f64,
    pub noise_sd: f64,
    pub price_max: f64,
    pub playtime_max: f64,
    pub reviews_per_product: u64,
    /// Share of records emitted with `"price": null`.
    pub null_price_share: f64,
    pub first_year: i32,
    pub last_year: i32,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 500,
            seed: 42,
            intercept: 0.5,
            price_slope: -0.01,
            playtime_slope: 0.0,
            noise_sd: 0.02,
            price_max: 40.0,
            playtime_max: 600.0,
            reviews_per_product: 200,
            null_price_share: 0.0,
            first_year: 2010,
            last_year: 2023,
        }
    }
}

/// Generate a raw snapshot keyed by synthetic app id.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn generate_catalog(config: &SampleConfig) -> Result<Value, AppError> {
    if config.count == 0 {
        return Err(AppError::InvalidSpec("Sample count must be > 0.".to_string()));
    }
    if config.reviews_per_product == 0 {
        return Err(AppError::InvalidSpec("Reviews per product must be > 0.".to_string()));
    }
    if !(0.0..1.0).contains(&config.null_price_share) {
        return Err(AppError::InvalidSpec("Null price share must be in [0, 1).".to_string()));
    }
    if !(config.price_max > 0.0 && config.playtime_max > 0.0) {
        return Err(AppError::InvalidSpec("Price and playtime ranges must be positive.".to_string()));
    }
    if config.last_year < config.first_year {
        return Err(AppError::InvalidSpec("Invalid release year range.".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::InvalidSpec(format!("Noise distribution error: {e}")))?;

    let mut records = Map::new();
    for i in 0..config.count {
        let price = (rng.gen_range(0.0..config.price_max) * 100.0).round() / 100.0;
        let playtime = rng.gen_range(0.0..config.playtime_max).round();
        let score = (config.intercept
            + config.price_slope * price
            + config.playtime_slope * playtime
            + noise.sample(&mut rng))
        .clamp(0.0, 1.0);

        let total = config.reviews_per_product;
        let positive = (score * total as f64).round() as u64;
        let negative = total - positive;

        let tag_count = rng.gen_range(1..=3);
        let mut tags = Map::new();
        for tag in TAG_POOL.choose_multiple(&mut rng, tag_count) {
            tags.insert((*tag).to_string(), json!(rng.gen_range(1..500)));
        }
        let genre = GENRE_POOL[rng.gen_range(0..GENRE_POOL.len())];

        let year = rng.gen_range(config.first_year..=config.last_year);
        let month = rng.gen_range(1..=12);
        let day = rng.gen_range(1..=28);
        let release_date = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .map(|d| d.format("%b %d, %Y").to_string());

        let price_value = if rng.gen_bool(config.null_price_share) {
            Value::Null
        } else {
            json!(price)
        };

        records.insert(
            (10_000 + i).to_string(),
            json!({
                "name": format!("Synthetic Game {i}"),
                "release_date": release_date,
                "price": price_value,
                "positive": positive,
                "negative": negative,
                "average_playtime_forever": playtime,
                "tags": tags,
                "genres": [genre],
            }),
        );
    }

    Ok(Value::Object(records))
}
