use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::data::model::{Column, Dataset, SaleRecord, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Bound parameters
// ---------------------------------------------------------------------------

/// Named values bound to a query's placeholders at execution time.
///
/// Values are only ever compared against cells; they never become part of
/// the query's structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    fn get(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| Error::UnboundParameter(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Query structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = :param`
    Eq { column: Column, param: String },
    NotNull(Column),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Rows in the group.
    Count,
    /// Sum of non-null numeric cells; 0 for an empty group.
    Sum(Column),
    /// Mean of non-null numeric cells; null when there are none.
    Mean(Column),
    /// Number of distinct non-null cells.
    CountDistinct(Column),
}

impl Aggregate {
    fn column(self) -> Option<Column> {
        match self {
            Aggregate::Count => None,
            Aggregate::Sum(c) | Aggregate::Mean(c) | Aggregate::CountDistinct(c) => Some(c),
        }
    }
}

/// Ordering on an output column (a group-by column name or an aggregate alias).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Asc(String),
    Desc(String),
}

/// A read-only group-by/aggregate query over a [`Dataset`].
///
/// Built structurally; every filter operand and the row limit are named
/// placeholders resolved from [`Params`] at execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Predicate>,
    group_by: Vec<Column>,
    aggregates: Vec<(Aggregate, String)>,
    order_by: Vec<SortKey>,
    limit: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose `column` equals the value bound to `param`.
    pub fn filter_eq(mut self, column: Column, param: &str) -> Self {
        self.filters.push(Predicate::Eq {
            column,
            param: param.to_string(),
        });
        self
    }

    pub fn filter_not_null(mut self, column: Column) -> Self {
        self.filters.push(Predicate::NotNull(column));
        self
    }

    pub fn group_by(mut self, column: Column) -> Self {
        self.group_by.push(column);
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate, alias: &str) -> Self {
        self.aggregates.push((aggregate, alias.to_string()));
        self
    }

    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order_by.push(key);
        self
    }

    /// Truncate to the integer bound to `param`.
    pub fn limit_param(mut self, param: &str) -> Self {
        self.limit = Some(param.to_string());
        self
    }

    /// Output column names: group-by columns, then aggregate aliases.
    pub fn output_columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(|c| c.name().to_string())
            .chain(self.aggregates.iter().map(|(_, alias)| alias.clone()))
            .collect()
    }

    /// Every dataset column this query reads.
    pub fn referenced_columns(&self) -> BTreeSet<Column> {
        let filtered = self.filters.iter().map(|p| match p {
            Predicate::Eq { column, .. } | Predicate::NotNull(column) => *column,
        });
        filtered
            .chain(self.group_by.iter().copied())
            .chain(self.aggregates.iter().filter_map(|(a, _)| a.column()))
            .collect()
    }

    /// Run the query.  An empty match set is an empty (or, without grouping,
    /// single-row) result, never an error.
    pub fn execute(&self, dataset: &Dataset, params: &Params) -> Result<ResultSet> {
        log::debug!("Executing query: {self}");

        for column in self.referenced_columns() {
            if !dataset.has_column(column) {
                return Err(Error::aggregation(format!(
                    "column '{column}' is not present in the dataset"
                )));
            }
        }

        let columns = self.output_columns();
        let sort_plan = self.sort_plan(&columns)?;
        let bound = self.bind_filters(params)?;
        let limit = self.bind_limit(params)?;

        let mut groups: BTreeMap<Vec<Value>, Vec<Accumulator>> = BTreeMap::new();
        if self.group_by.is_empty() {
            groups.insert(Vec::new(), self.fresh_accumulators());
        }

        for record in dataset.records() {
            if !matches_all(record, &bound) {
                continue;
            }
            let key: Vec<Value> = self.group_by.iter().map(|c| record.value(*c)).collect();
            let accs = groups
                .entry(key)
                .or_insert_with(|| self.fresh_accumulators());
            for acc in accs.iter_mut() {
                acc.add(record);
            }
        }

        let mut rows: Vec<Vec<Value>> = groups
            .into_iter()
            .map(|(mut key, accs)| {
                key.extend(accs.into_iter().map(Accumulator::finish));
                key
            })
            .collect();

        // Stable sort: groups arrive in ascending key order, which settles
        // any ties the sort plan leaves.
        rows.sort_by(|a, b| {
            sort_plan
                .iter()
                .map(|(idx, desc)| {
                    let ord = a[*idx].cmp(&b[*idx]);
                    if *desc { ord.reverse() } else { ord }
                })
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        Ok(ResultSet { columns, rows })
    }

    fn fresh_accumulators(&self) -> Vec<Accumulator> {
        self.aggregates
            .iter()
            .map(|(agg, _)| Accumulator::new(*agg))
            .collect()
    }

    fn sort_plan(&self, columns: &[String]) -> Result<Vec<(usize, bool)>> {
        self.order_by
            .iter()
            .map(|key| {
                let (name, desc) = match key {
                    SortKey::Asc(name) => (name, false),
                    SortKey::Desc(name) => (name, true),
                };
                columns
                    .iter()
                    .position(|c| c == name)
                    .map(|idx| (idx, desc))
                    .ok_or_else(|| {
                        Error::aggregation(format!("cannot order by unknown output column '{name}'"))
                    })
            })
            .collect()
    }

    fn bind_filters<'p>(&self, params: &'p Params) -> Result<Vec<BoundPredicate<'p>>> {
        self.filters
            .iter()
            .map(|p| match p {
                Predicate::Eq { column, param } => Ok(BoundPredicate::Eq(*column, params.get(param)?)),
                Predicate::NotNull(column) => Ok(BoundPredicate::NotNull(*column)),
            })
            .collect()
    }

    fn bind_limit(&self, params: &Params) -> Result<Option<usize>> {
        let Some(name) = &self.limit else {
            return Ok(None);
        };
        match params.get(name)? {
            Value::Integer(n) if *n >= 0 => Ok(Some(*n as usize)),
            other => Err(Error::aggregation(format!(
                "limit parameter '{name}' must be a non-negative integer, got {other}"
            ))),
        }
    }
}

/// Renders the query shape with placeholders; bound values never appear.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aggs: Vec<String> = self
            .aggregates
            .iter()
            .map(|(agg, alias)| match agg {
                Aggregate::Count => format!("count(*) as {alias}"),
                Aggregate::Sum(c) => format!("sum({c}) as {alias}"),
                Aggregate::Mean(c) => format!("mean({c}) as {alias}"),
                Aggregate::CountDistinct(c) => format!("count(distinct {c}) as {alias}"),
            })
            .collect();
        let group: Vec<&str> = self.group_by.iter().map(|c| c.name()).collect();
        write!(f, "select [{}] group by [{}]", aggs.join(", "), group.join(", "))?;
        for p in &self.filters {
            match p {
                Predicate::Eq { column, param } => write!(f, " where {column} = :{param}")?,
                Predicate::NotNull(column) => write!(f, " where {column} is not null")?,
            }
        }
        for key in &self.order_by {
            match key {
                SortKey::Asc(c) => write!(f, " order by {c} asc")?,
                SortKey::Desc(c) => write!(f, " order by {c} desc")?,
            }
        }
        if let Some(limit) = &self.limit {
            write!(f, " limit :{limit}")?;
        }
        Ok(())
    }
}

enum BoundPredicate<'p> {
    Eq(Column, &'p Value),
    NotNull(Column),
}

fn matches_all(record: &SaleRecord, predicates: &[BoundPredicate<'_>]) -> bool {
    predicates.iter().all(|p| match p {
        BoundPredicate::Eq(column, value) => record.value(*column) == **value,
        BoundPredicate::NotNull(column) => !record.value(*column).is_null(),
    })
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

enum Accumulator {
    Count(i64),
    Sum(Column, f64),
    Mean(Column, f64, usize),
    Distinct(Column, BTreeSet<Value>),
}

impl Accumulator {
    fn new(aggregate: Aggregate) -> Self {
        match aggregate {
            Aggregate::Count => Accumulator::Count(0),
            Aggregate::Sum(c) => Accumulator::Sum(c, 0.0),
            Aggregate::Mean(c) => Accumulator::Mean(c, 0.0, 0),
            Aggregate::CountDistinct(c) => Accumulator::Distinct(c, BTreeSet::new()),
        }
    }

    fn add(&mut self, record: &SaleRecord) {
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum(c, sum) => {
                if let Some(v) = record.value(*c).as_f64() {
                    *sum += v;
                }
            }
            Accumulator::Mean(c, sum, n) => {
                if let Some(v) = record.value(*c).as_f64() {
                    *sum += v;
                    *n += 1;
                }
            }
            Accumulator::Distinct(c, seen) => {
                let v = record.value(*c);
                if !v.is_null() {
                    seen.insert(v);
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Integer(n),
            Accumulator::Sum(_, sum) => Value::Float(sum),
            Accumulator::Mean(_, _, 0) => Value::Null,
            Accumulator::Mean(_, sum, n) => Value::Float(sum / n as f64),
            Accumulator::Distinct(_, seen) => Value::Integer(seen.len() as i64),
        }
    }
}

// ---------------------------------------------------------------------------
// Result set – generic tabular output
// ---------------------------------------------------------------------------

/// Ordered rows of named fields, consumable by any table or chart widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the column called `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }

    /// Rows as name → value maps.
    pub fn to_maps(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_records(
            &Column::REQUIRED,
            vec![
                SaleRecord::new(1, "Electronics", "M", 30, 100.0),
                SaleRecord::new(2, "Electronics", "M", 40, 200.0),
                SaleRecord::new(3, "Clothing", "F", 25, 50.0),
                SaleRecord::new(3, "Clothing", "M", 25, 70.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn bound_filter_is_literal_equality() {
        let q = Query::new()
            .filter_eq(Column::Category, "category")
            .aggregate(Aggregate::Count, "n");
        let hostile = Params::new().bind("category", "Clothing' OR '1'='1");
        let rs = q.execute(&dataset(), &hostile).unwrap();
        assert_eq!(rs.get(0, "n"), Some(&Value::Integer(0)));

        let plain = Params::new().bind("category", "Clothing");
        let rs = q.execute(&dataset(), &plain).unwrap();
        assert_eq!(rs.get(0, "n"), Some(&Value::Integer(2)));
    }

    #[test]
    fn unbound_parameter_is_reported() {
        let q = Query::new()
            .filter_eq(Column::Gender, "gender")
            .aggregate(Aggregate::Count, "n");
        assert!(matches!(
            q.execute(&dataset(), &Params::new()),
            Err(Error::UnboundParameter(name)) if name == "gender"
        ));
    }

    #[test]
    fn grouped_query_with_no_matches_is_empty() {
        let q = Query::new()
            .filter_eq(Column::Category, "category")
            .group_by(Column::Category)
            .aggregate(Aggregate::Sum(Column::TotalSale), "total_sale");
        let rs = q
            .execute(&dataset(), &Params::new().bind("category", "Garden"))
            .unwrap();
        assert!(rs.is_empty());
        assert_eq!(rs.columns(), ["category", "total_sale"]);
    }

    #[test]
    fn ungrouped_query_yields_one_row_even_when_empty() {
        let q = Query::new()
            .filter_eq(Column::Category, "category")
            .aggregate(Aggregate::Sum(Column::TotalSale), "sum")
            .aggregate(Aggregate::Mean(Column::TotalSale), "mean")
            .aggregate(Aggregate::CountDistinct(Column::CustomerId), "customers");
        let rs = q
            .execute(&dataset(), &Params::new().bind("category", "Garden"))
            .unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "sum"), Some(&Value::Float(0.0)));
        assert_eq!(rs.get(0, "mean"), Some(&Value::Null));
        assert_eq!(rs.get(0, "customers"), Some(&Value::Integer(0)));
    }

    #[test]
    fn order_by_then_limit() {
        let q = Query::new()
            .group_by(Column::Age)
            .aggregate(Aggregate::Sum(Column::TotalSale), "total_sale")
            .order_by(SortKey::Desc("total_sale".into()))
            .limit_param("n");
        let rs = q.execute(&dataset(), &Params::new().bind("n", 2i64)).unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.get(0, "age"), Some(&Value::Integer(40)));
        assert_eq!(rs.get(1, "age"), Some(&Value::Integer(25)));
        assert_eq!(rs.get(1, "total_sale"), Some(&Value::Float(120.0)));
    }

    #[test]
    fn missing_column_is_an_aggregation_error() {
        let q = Query::new()
            .group_by(Column::ProductName)
            .aggregate(Aggregate::Count, "n");
        let err = q.execute(&dataset(), &Params::new()).unwrap_err();
        assert!(err.is_aggregation_fault());
        assert!(err.to_string().contains("product_name"));
    }

    #[test]
    fn unknown_sort_column_is_an_aggregation_error() {
        let q = Query::new()
            .aggregate(Aggregate::Count, "n")
            .order_by(SortKey::Asc("nope".into()));
        assert!(q.execute(&dataset(), &Params::new()).unwrap_err().is_aggregation_fault());
    }

    #[test]
    fn non_integer_limit_is_rejected() {
        let q = Query::new()
            .aggregate(Aggregate::Count, "n")
            .limit_param("n");
        let err = q
            .execute(&dataset(), &Params::new().bind("n", "10"))
            .unwrap_err();
        assert!(err.is_aggregation_fault());
    }

    #[test]
    fn display_shows_placeholders_only() {
        let q = Query::new()
            .filter_eq(Column::Category, "category")
            .aggregate(Aggregate::Count, "n")
            .limit_param("top_n");
        let text = q.to_string();
        assert!(text.contains("category = :category"));
        assert!(text.contains("limit :top_n"));
    }

    #[test]
    fn rows_convert_to_named_maps() {
        let q = Query::new()
            .group_by(Column::Gender)
            .aggregate(Aggregate::Count, "transactions");
        let maps = q.execute(&dataset(), &Params::new()).unwrap().to_maps();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0]["gender"], Value::String("F".into()));
        assert_eq!(maps[1]["transactions"], Value::Integer(3));
    }
}
