use std::collections::BTreeSet;

use super::model::{Column, Dataset};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Top-N bound
// ---------------------------------------------------------------------------

/// Row limit for ranked aggregations, always within `TopN::MIN..=TopN::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopN(u32);

impl TopN {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 50;

    /// Reject values outside the allowed range.
    pub fn new(n: i64) -> Result<Self> {
        if n < Self::MIN as i64 || n > Self::MAX as i64 {
            return Err(Error::InvalidRange {
                value: n,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(TopN(n as u32))
    }

    /// Pull out-of-range values to the nearest bound.
    pub fn clamped(n: i64) -> Self {
        let clamped = n.clamp(Self::MIN as i64, Self::MAX as i64);
        if clamped != n {
            log::warn!("top_n {n} clamped to {clamped}");
        }
        TopN(clamped as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TopN {
    fn default() -> Self {
        TopN(10)
    }
}

// ---------------------------------------------------------------------------
// Filter domain: the only way to obtain a FilterContext
// ---------------------------------------------------------------------------

/// Observed category and gender values of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDomain {
    categories: BTreeSet<String>,
    genders: BTreeSet<String>,
}

impl FilterDomain {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        Ok(Self {
            categories: dataset
                .distinct_values(Column::Category.name())?
                .into_iter()
                .collect(),
            genders: dataset
                .distinct_values(Column::Gender.name())?
                .into_iter()
                .collect(),
        })
    }

    /// Sorted categories, ready to populate a selector.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    pub fn genders(&self) -> impl Iterator<Item = &str> {
        self.genders.iter().map(String::as_str)
    }

    /// First category/gender pair, the default selection of a fresh session.
    pub fn default_selection(&self, top_n: TopN) -> Option<FilterContext> {
        Some(FilterContext {
            category: self.categories.first()?.clone(),
            gender: self.genders.first()?.clone(),
            top_n: Some(top_n),
        })
    }

    /// Build a filter context, accepting only observed values.
    pub fn select(&self, category: &str, gender: &str, top_n: Option<i64>) -> Result<FilterContext> {
        if !self.categories.contains(category) {
            return Err(Error::InvalidFilterValue {
                column: Column::Category.name().to_string(),
                value: category.to_string(),
            });
        }
        if !self.genders.contains(gender) {
            return Err(Error::InvalidFilterValue {
                column: Column::Gender.name().to_string(),
                value: gender.to_string(),
            });
        }
        Ok(FilterContext {
            category: category.to_string(),
            gender: gender.to_string(),
            top_n: top_n.map(TopN::new).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Filter context
// ---------------------------------------------------------------------------

/// An immutable, validated slice selection.  Structural equality and hashing
/// make it usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterContext {
    category: String,
    gender: String,
    top_n: Option<TopN>,
}

impl FilterContext {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn top_n(&self) -> Option<TopN> {
        self.top_n
    }

    /// Same slice with a different row limit.
    pub fn with_top_n(&self, top_n: TopN) -> Self {
        Self {
            top_n: Some(top_n),
            ..self.clone()
        }
    }

    /// Bypasses domain validation; only for exercising the engine with
    /// values no dataset enumeration produced.
    #[cfg(test)]
    pub(crate) fn unchecked(category: &str, gender: &str) -> Self {
        Self {
            category: category.to_string(),
            gender: gender.to_string(),
            top_n: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::data::model::SaleRecord;

    fn domain() -> FilterDomain {
        let ds = Dataset::from_records(
            &Column::REQUIRED,
            vec![
                SaleRecord::new(1, "Electronics", "M", 30, 100.0),
                SaleRecord::new(3, "Clothing", "F", 25, 50.0),
            ],
        )
        .unwrap();
        FilterDomain::from_dataset(&ds).unwrap()
    }

    #[test]
    fn top_n_bounds() {
        assert_eq!(TopN::new(5).unwrap().get(), 5);
        assert_eq!(TopN::new(50).unwrap().get(), 50);
        assert!(matches!(
            TopN::new(4),
            Err(Error::InvalidRange { value: 4, min: 5, max: 50 })
        ));
        assert!(TopN::new(51).is_err());
        assert_eq!(TopN::clamped(0).get(), 5);
        assert_eq!(TopN::clamped(500).get(), 50);
        assert_eq!(TopN::clamped(12).get(), 12);
    }

    #[test]
    fn select_accepts_observed_values() {
        let ctx = domain().select("Clothing", "F", Some(7)).unwrap();
        assert_eq!(ctx.category(), "Clothing");
        assert_eq!(ctx.gender(), "F");
        assert_eq!(ctx.top_n(), Some(TopN::new(7).unwrap()));
    }

    #[test]
    fn select_rejects_unobserved_values() {
        let d = domain();
        assert!(matches!(
            d.select("Clothing' OR '1'='1", "F", None),
            Err(Error::InvalidFilterValue { .. })
        ));
        // Case-sensitive as stored.
        assert!(d.select("clothing", "F", None).is_err());
        assert!(matches!(
            d.select("Clothing", "X", None),
            Err(Error::InvalidFilterValue { column, .. }) if column == "gender"
        ));
        assert!(matches!(
            d.select("Clothing", "F", Some(100)),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn contexts_hash_structurally() {
        let d = domain();
        let a = d.select("Clothing", "F", Some(10)).unwrap();
        let b = d.select("Clothing", "F", Some(10)).unwrap();
        let c = a.with_top_n(TopN::new(20).unwrap());
        let set: HashSet<FilterContext> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn default_selection_takes_first_values() {
        let ctx = domain().default_selection(TopN::default()).unwrap();
        assert_eq!((ctx.category(), ctx.gender()), ("Clothing", "F"));
    }
}
