//! Read-only row filters for "filter then refit".

use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;

use crate::domain::{ProductRow, TagAssociationRow, TagKind};
use crate::error::AppError;

/// A conjunction of optional filters. The default subset keeps every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subset {
    /// Inclusive release-year range. Undated rows never match.
    pub years: Option<RangeInclusive<i32>>,
    /// Inclusive price range.
    pub price: Option<(f64, f64)>,
    /// Membership in a tag or genre (ASCII case-insensitive).
    pub tag: Option<(TagKind, String)>,
}

impl Subset {
    pub fn is_empty(&self) -> bool {
        self.years.is_none() && self.price.is_none() && self.tag.is_none()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(years) = &self.years
            && years.start() > years.end()
        {
            return Err(AppError::InvalidSpec(format!(
                "Year range {}..={} is empty.",
                years.start(),
                years.end()
            )));
        }
        if let Some((lo, hi)) = self.price
            && !(lo <= hi)
        {
            return Err(AppError::InvalidSpec(format!("Price range [{lo}, {hi}] is empty.")));
        }
        if let Some((_, tag)) = &self.tag
            && tag.trim().is_empty()
        {
            return Err(AppError::InvalidSpec("Tag filter must not be blank.".to_string()));
        }
        Ok(())
    }

    /// Borrow the rows that pass every filter, in input order.
    pub fn apply<'a>(&self, products: &'a [ProductRow], associations: &[TagAssociationRow]) -> Vec<&'a ProductRow> {
        let members: Option<HashSet<&str>> = self.tag.as_ref().map(|(kind, tag)| {
            let tag = tag.trim();
            associations
                .iter()
                .filter(|a| a.kind == *kind && a.tag.eq_ignore_ascii_case(tag))
                .map(|a| a.product_id.as_str())
                .collect()
        });

        products
            .iter()
            .filter(|p| match &self.years {
                Some(range) => p.release_year().is_some_and(|y| range.contains(&y)),
                None => true,
            })
            .filter(|p| match self.price {
                Some((lo, hi)) => p.price >= lo && p.price <= hi,
                None => true,
            })
            .filter(|p| match &members {
                Some(ids) => ids.contains(p.product_id.as_str()),
                None => true,
            })
            .collect()
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("all products");
        }
        let mut parts = Vec::new();
        if let Some(years) = &self.years {
            parts.push(format!("years {}..={}", years.start(), years.end()));
        }
        if let Some((lo, hi)) = self.price {
            parts.push(format!("price [{lo}, {hi}]"));
        }
        if let Some((kind, tag)) = &self.tag {
            parts.push(format!("{} = {tag}", kind.as_str()));
        }
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::Loader;

    const SNAPSHOT: &str = r#"{
        "10": {"release_date": "2014-03-01", "price": 4.99, "tags": ["Indie"], "genres": ["Action"]},
        "20": {"release_date": "2016-07-15", "price": 19.99, "tags": ["indie", "RPG"], "genres": ["RPG"]},
        "30": {"release_date": "TBA", "price": 9.99, "tags": ["Indie"], "genres": ["Action"]},
        "40": {"release_date": "2021-01-01", "price": 59.99, "tags": ["Action"], "genres": ["Action"]}
    }"#;

    fn ids(rows: &[&ProductRow]) -> Vec<String> {
        rows.iter().map(|r| r.product_id.clone()).collect()
    }

    #[test]
    fn default_subset_keeps_everything() {
        let out = Loader::default().load_str(SNAPSHOT).unwrap();
        let s = Subset::default();
        assert!(s.is_empty());
        assert_eq!(s.apply(&out.products, &out.associations).len(), 4);
        assert_eq!(s.to_string(), "all products");
    }

    #[test]
    fn year_filter_drops_undated_rows() {
        let out = Loader::default().load_str(SNAPSHOT).unwrap();
        let s = Subset {
            years: Some(2010..=2020),
            ..Subset::default()
        };
        assert_eq!(ids(&s.apply(&out.products, &out.associations)), vec!["10", "20"]);
    }

    #[test]
    fn filters_combine() {
        let out = Loader::default().load_str(SNAPSHOT).unwrap();
        let s = Subset {
            price: Some((5.0, 60.0)),
            tag: Some((TagKind::Tag, "INDIE".to_string())),
            ..Subset::default()
        };
        assert_eq!(ids(&s.apply(&out.products, &out.associations)), vec!["20", "30"]);
        assert_eq!(s.to_string(), "price [5, 60], tag = INDIE");
    }

    #[test]
    fn genre_filter_uses_genre_associations_only() {
        let out = Loader::default().load_str(SNAPSHOT).unwrap();
        let s = Subset {
            tag: Some((TagKind::Genre, "Action".to_string())),
            ..Subset::default()
        };
        assert_eq!(ids(&s.apply(&out.products, &out.associations)), vec!["10", "30", "40"]);
    }

    #[test]
    fn empty_ranges_are_rejected() {
        #[allow(clippy::reversed_empty_ranges)]
        let s = Subset {
            years: Some(2020..=2010),
            ..Subset::default()
        };
        assert!(matches!(s.validate(), Err(AppError::InvalidSpec(_))));

        let s = Subset {
            price: Some((10.0, 1.0)),
            ..Subset::default()
        };
        assert!(matches!(s.validate(), Err(AppError::InvalidSpec(_))));
        assert!(Subset::default().validate().is_ok());
    }
}
