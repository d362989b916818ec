use std::collections::BTreeMap;

use super::model::{Column, ColumnKind, Dataset, Value};

// ---------------------------------------------------------------------------
// Describe-style column summaries for the overview display
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStats {
    Numeric {
        mean: f64,
        /// Sample standard deviation; `None` below two observations.
        std: Option<f64>,
        min: f64,
        q25: f64,
        median: f64,
        q75: f64,
        max: f64,
    },
    Categorical {
        unique: usize,
        top: Value,
        freq: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: Column,
    /// Non-null observations.
    pub count: usize,
    /// `None` when the column has no non-null values.
    pub stats: Option<ColumnStats>,
}

impl ColumnSummary {
    /// Statistic name → rendered value, in pandas `describe()` order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("count", self.count.to_string())];
        match &self.stats {
            Some(ColumnStats::Numeric {
                mean,
                std,
                min,
                q25,
                median,
                q75,
                max,
            }) => {
                out.push(("mean", format!("{mean:.2}")));
                out.push((
                    "std",
                    std.map(|s| format!("{s:.2}")).unwrap_or_else(|| "-".into()),
                ));
                out.push(("min", format!("{min:.2}")));
                out.push(("25%", format!("{q25:.2}")));
                out.push(("50%", format!("{median:.2}")));
                out.push(("75%", format!("{q75:.2}")));
                out.push(("max", format!("{max:.2}")));
            }
            Some(ColumnStats::Categorical { unique, top, freq }) => {
                out.push(("unique", unique.to_string()));
                out.push(("top", top.to_string()));
                out.push(("freq", freq.to_string()));
            }
            None => {}
        }
        out
    }
}

/// Summarise every column of the dataset, in schema order.
pub fn summarize(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .columns()
        .iter()
        .map(|&column| {
            let values: Vec<Value> = dataset
                .records()
                .iter()
                .map(|r| r.value(column))
                .filter(|v| !v.is_null())
                .collect();
            let stats = match column.kind() {
                ColumnKind::Numeric => numeric_stats(&values),
                ColumnKind::Categorical | ColumnKind::Identifier => categorical_stats(&values),
            };
            ColumnSummary {
                column,
                count: values.len(),
                stats,
            }
        })
        .collect()
}

fn numeric_stats(values: &[Value]) -> Option<ColumnStats> {
    let mut xs: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);

    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let std = (xs.len() > 1).then(|| {
        let ss: f64 = xs.iter().map(|x| (x - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    Some(ColumnStats::Numeric {
        mean,
        std,
        min: xs[0],
        q25: quantile(&xs, 0.25),
        median: quantile(&xs, 0.5),
        q75: quantile(&xs, 0.75),
        max: xs[xs.len() - 1],
    })
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn categorical_stats(values: &[Value]) -> Option<ColumnStats> {
    let mut counts: BTreeMap<&Value, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    // Highest count wins; BTreeMap order makes the smallest value win ties.
    let (top, freq) = counts
        .iter()
        .fold(None, |best: Option<(&Value, usize)>, (v, c)| match best {
            Some((_, bc)) if bc >= *c => best,
            _ => Some((*v, *c)),
        })?;
    Some(ColumnStats::Categorical {
        unique: counts.len(),
        top: top.clone(),
        freq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SaleRecord;

    fn dataset() -> Dataset {
        Dataset::from_records(
            &Column::REQUIRED,
            vec![
                SaleRecord::new(1, "Electronics", "M", 30, 100.0),
                SaleRecord::new(2, "Electronics", "M", 40, 200.0),
                SaleRecord::new(3, "Clothing", "F", 25, 50.0),
                SaleRecord::new(3, "Clothing", "F", 35, 50.0),
            ],
        )
        .unwrap()
    }

    fn find(summaries: &[ColumnSummary], column: Column) -> &ColumnSummary {
        summaries.iter().find(|s| s.column == column).unwrap()
    }

    #[test]
    fn numeric_columns_get_describe_stats() {
        let summaries = summarize(&dataset());
        let sale = find(&summaries, Column::TotalSale);
        assert_eq!(sale.count, 4);
        match sale.stats.as_ref().unwrap() {
            ColumnStats::Numeric {
                mean,
                std,
                min,
                q25,
                median,
                q75,
                max,
            } => {
                assert_eq!(*mean, 100.0);
                assert!((std.unwrap() - 70.7107).abs() < 1e-3);
                assert_eq!((*min, *max), (50.0, 200.0));
                assert_eq!(*q25, 50.0);
                assert_eq!(*median, 75.0);
                assert_eq!(*q75, 125.0);
            }
            other => panic!("unexpected stats {other:?}"),
        }
    }

    #[test]
    fn categorical_top_breaks_ties_by_smallest_value() {
        let summaries = summarize(&dataset());
        let category = find(&summaries, Column::Category);
        assert_eq!(
            category.stats,
            Some(ColumnStats::Categorical {
                unique: 2,
                top: Value::String("Clothing".into()),
                freq: 2,
            })
        );
        let customers = find(&summaries, Column::CustomerId);
        assert_eq!(customers.entries()[1], ("unique", "3".to_string()));
    }

    #[test]
    fn empty_dataset_has_counts_but_no_stats() {
        let empty = Dataset::from_records(&Column::REQUIRED, Vec::new()).unwrap();
        let summaries = summarize(&empty);
        assert_eq!(summaries.len(), Column::REQUIRED.len());
        assert!(summaries.iter().all(|s| s.count == 0 && s.stats.is_none()));
    }

    #[test]
    fn single_observation_has_no_std() {
        let ds = Dataset::from_records(
            &Column::REQUIRED,
            vec![SaleRecord::new(1, "Toys", "F", 9, 10.0)],
        )
        .unwrap();
        let summaries = summarize(&ds);
        assert!(matches!(
            find(&summaries, Column::Age).stats,
            Some(ColumnStats::Numeric { std: None, .. })
        ));
    }
}
