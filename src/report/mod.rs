//! Reporting utilities: tag trends, rankings, segment metrics and formatted
//! terminal output.

pub mod format;

pub use format::*;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::domain::{ProductRow, SegmentSummary, TagAssociationRow, TagKind, TagTrendRow, TrendOptions};
use crate::math::descriptive::{mean, median};

/// Count products and average playtime per `(kind, tag, time bucket)`.
///
/// Products without a release date have no bucket and are left out; they
/// remain in `products` for every other analysis.
#[allow(clippy::cast_precision_loss)]
pub fn tag_trends(products: &[ProductRow], associations: &[TagAssociationRow], options: &TrendOptions) -> Vec<TagTrendRow> {
    let dated: HashMap<&str, (i32, f64)> = products
        .iter()
        .filter_map(|p| p.release_year().map(|y| (p.product_id.as_str(), (options.bucket.bucket(y), p.playtime))))
        .collect();
    debug!(dated = dated.len(), undated = products.len() - dated.len(), "Bucketing tag associations");

    let mut cells: BTreeMap<(TagKind, &str, i32), (usize, f64)> = BTreeMap::new();
    for a in associations {
        if options.kind.is_some_and(|k| k != a.kind) {
            continue;
        }
        if options.tags.as_ref().is_some_and(|keep| !keep.contains(&a.tag)) {
            continue;
        }
        let Some(&(bucket, playtime)) = dated.get(a.product_id.as_str()) else {
            continue;
        };
        let cell = cells.entry((a.kind, a.tag.as_str(), bucket)).or_insert((0, 0.0));
        cell.0 += 1;
        cell.1 += playtime;
    }

    cells
        .into_iter()
        .map(|((kind, tag, bucket), (count, playtime_sum))| TagTrendRow {
            kind,
            tag: tag.to_string(),
            bucket,
            count,
            mean_playtime: playtime_sum / count as f64,
        })
        .collect()
}

/// The `n` most frequent labels of one kind. Ties are broken by name.
pub fn top_tags(associations: &[TagAssociationRow], kind: TagKind, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for a in associations.iter().filter(|a| a.kind == kind) {
        *counts.entry(a.tag.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(tag, c)| (tag.to_string(), c)).collect()
}

/// Headline metrics for a (possibly filtered) set of rows.
pub fn segment_summary<'a, I>(rows: I) -> SegmentSummary
where
    I: IntoIterator<Item = &'a ProductRow>,
{
    let mut products = 0;
    let mut prices = Vec::new();
    let mut played = Vec::new();
    let mut ratios = Vec::new();

    for row in rows {
        products += 1;
        prices.push(row.price);
        if row.playtime > 0.0 {
            played.push(row.playtime);
        }
        if let Some(r) = row.score_ratio {
            ratios.push(r);
        }
    }

    SegmentSummary {
        products,
        mean_price: mean(&prices),
        median_playtime_played: median(&played),
        mean_score_ratio: mean(&ratios),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::Loader;

    const SNAPSHOT: &str = r#"{
        "1": {"release_date": "Jan 15, 2015", "average_playtime_forever": 100, "positive": 9, "negative": 1,
              "tags": {"Indie": 50, "Roguelike": 20}, "genres": ["Action"]},
        "2": {"release_date": "2015-06-01", "average_playtime_forever": 300, "positive": 1, "negative": 1,
              "tags": ["Indie"], "genres": ["Action", "Indie"]},
        "3": {"release_date": "2018", "average_playtime_forever": 0, "price": 5.0,
              "tags": ["Indie", "Casual"], "genres": ["Casual"]},
        "4": {"release_date": "coming soon", "average_playtime_forever": 50, "price": 15.0,
              "tags": ["Indie"], "genres": ["Action"]}
    }"#;

    fn load() -> crate::io::ingest::LoadOutput {
        Loader::default().load_str(SNAPSHOT).unwrap()
    }

    #[test]
    fn trends_group_by_tag_and_year() {
        let out = load();
        let rows = tag_trends(&out.products, &out.associations, &TrendOptions {
            kind: Some(TagKind::Tag),
            ..TrendOptions::default()
        });

        let indie_2015 = rows.iter().find(|r| r.tag == "Indie" && r.bucket == 2015).unwrap();
        assert_eq!(indie_2015.count, 2);
        assert_eq!(indie_2015.mean_playtime, 200.0);

        let indie_2018 = rows.iter().find(|r| r.tag == "Indie" && r.bucket == 2018).unwrap();
        assert_eq!(indie_2018.count, 1);
        assert!(rows.iter().all(|r| r.kind == TagKind::Tag));
    }

    #[test]
    fn undated_products_stay_loaded_but_leave_trends() {
        let out = load();
        assert!(out.products.iter().any(|p| p.product_id == "4" && p.release_date.is_none()));

        let rows = tag_trends(&out.products, &out.associations, &TrendOptions::default());
        let total: usize = rows.iter().filter(|r| r.kind == TagKind::Tag && r.tag == "Indie").map(|r| r.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn trends_respect_whitelist_and_decades() {
        let out = load();
        let rows = tag_trends(&out.products, &out.associations, &TrendOptions {
            kind: Some(TagKind::Genre),
            tags: Some(["Action".to_string()].into_iter().collect()),
            bucket: crate::domain::TimeBucket::Decade,
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bucket, 2010);
        assert_eq!(rows[0].count, 2);
    }

    #[test]
    fn top_tags_breaks_ties_by_name() {
        let out = load();
        let top = top_tags(&out.associations, TagKind::Tag, 3);
        assert_eq!(
            top,
            vec![
                ("Indie".to_string(), 4),
                ("Casual".to_string(), 1),
                ("Roguelike".to_string(), 1),
            ]
        );
    }

    #[test]
    fn segment_summary_uses_played_titles_for_median() {
        let out = load();
        let s = segment_summary(&out.products);
        assert_eq!(s.products, 4);
        assert_eq!(s.mean_price, Some(5.0));
        assert_eq!(s.median_playtime_played, Some(100.0));
        // Products 3 and 4 have no reviews and are excluded by default.
        assert_eq!(s.mean_score_ratio, Some((0.9 + 0.5) / 2.0));

        let empty = segment_summary(std::iter::empty());
        assert_eq!(empty.products, 0);
        assert_eq!(empty.mean_price, None);
    }
}
