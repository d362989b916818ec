use std::fmt;

use crate::data::filter::{FilterContext, TopN};
use crate::data::model::{Column, Dataset, Value};
use crate::error::{Error, Result};
use crate::query::{Aggregate, Params, Query, ResultSet, SortKey};

// Output column names shared by the catalogue.
pub const TOTAL_SALE: &str = "total_sale";
pub const TRANSACTIONS: &str = "transactions";
pub const UNIQUE_CUSTOMERS: &str = "unique_customers";
pub const AVERAGE_SALE: &str = "average_sale";

const P_CATEGORY: &str = "category";
const P_GENDER: &str = "gender";
const P_TOP_N: &str = "top_n";

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// The fixed set of aggregations every rendering surface draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    TotalsOverview,
    FilteredSummary,
    SalesByAgeTrend,
    SalesByCategoryBreakdown,
    TopProducts,
}

impl Aggregation {
    pub const ALL: [Aggregation; 5] = [
        Aggregation::TotalsOverview,
        Aggregation::FilteredSummary,
        Aggregation::SalesByAgeTrend,
        Aggregation::SalesByCategoryBreakdown,
        Aggregation::TopProducts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggregation::TotalsOverview => "totalsOverview",
            Aggregation::FilteredSummary => "filteredSummary",
            Aggregation::SalesByAgeTrend => "salesByAgeTrend",
            Aggregation::SalesByCategoryBreakdown => "salesByCategoryBreakdown",
            Aggregation::TopProducts => "topProducts",
        }
    }

    /// The canned query behind this entry.
    pub fn query(self) -> Query {
        match self {
            Aggregation::TotalsOverview => Query::new()
                .aggregate(Aggregate::Sum(Column::TotalSale), TOTAL_SALE)
                .aggregate(Aggregate::CountDistinct(Column::CustomerId), UNIQUE_CUSTOMERS)
                .aggregate(Aggregate::Mean(Column::TotalSale), AVERAGE_SALE),
            Aggregation::FilteredSummary => Query::new()
                .filter_eq(Column::Category, P_CATEGORY)
                .filter_eq(Column::Gender, P_GENDER)
                .group_by(Column::Category)
                .group_by(Column::Gender)
                .aggregate(Aggregate::Count, TRANSACTIONS)
                .aggregate(Aggregate::Sum(Column::TotalSale), TOTAL_SALE),
            Aggregation::SalesByAgeTrend => Query::new()
                .filter_eq(Column::Category, P_CATEGORY)
                .filter_eq(Column::Gender, P_GENDER)
                .filter_not_null(Column::Age)
                .group_by(Column::Age)
                .aggregate(Aggregate::Sum(Column::TotalSale), TOTAL_SALE)
                .order_by(SortKey::Asc(Column::Age.name().into())),
            Aggregation::SalesByCategoryBreakdown => Query::new()
                .group_by(Column::Category)
                .aggregate(Aggregate::Sum(Column::TotalSale), TOTAL_SALE)
                .order_by(SortKey::Desc(TOTAL_SALE.into()))
                .order_by(SortKey::Asc(Column::Category.name().into())),
            Aggregation::TopProducts => Query::new()
                .group_by(Column::ProductId)
                .group_by(Column::ProductName)
                .aggregate(Aggregate::Sum(Column::TotalSale), TOTAL_SALE)
                .order_by(SortKey::Desc(TOTAL_SALE.into()))
                .order_by(SortKey::Asc(Column::ProductName.name().into()))
                .order_by(SortKey::Asc(Column::ProductId.name().into()))
                .limit_param(P_TOP_N),
        }
    }

    /// Whether the entry reads the category/gender selection.
    pub fn needs_selection(self) -> bool {
        matches!(
            self,
            Aggregation::FilteredSummary | Aggregation::SalesByAgeTrend
        )
    }

    /// Bind the parameters this entry's query expects.  Without a filter the
    /// selection placeholders stay unbound.
    fn params(self, filter: Option<&FilterContext>) -> Params {
        match (self, filter) {
            (Aggregation::FilteredSummary | Aggregation::SalesByAgeTrend, Some(filter)) => {
                Params::new()
                    .bind(P_CATEGORY, filter.category())
                    .bind(P_GENDER, filter.gender())
            }
            (Aggregation::TopProducts, filter) => {
                top_n_params(filter.and_then(FilterContext::top_n).unwrap_or_default())
            }
            _ => Params::new(),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn top_n_params(top_n: TopN) -> Params {
    Params::new().bind(P_TOP_N, top_n.get() as i64)
}

// ---------------------------------------------------------------------------
// Typed results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TotalsOverview {
    pub total_sales: f64,
    pub unique_customers: usize,
    /// `None` when the dataset is empty ("no data").
    pub average_sale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub gender: String,
    pub transactions: usize,
    pub total_sale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeSales {
    pub age: u32,
    pub total_sale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySales {
    pub category: String,
    pub total_sale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub product_id: Value,
    pub product_name: Option<String>,
    pub total_sale: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs catalogue entries against one dataset.  Every call is a pure
/// function of the dataset and its arguments.
#[derive(Debug, Clone, Copy)]
pub struct AggregationEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    /// Generic entry point for table and chart widgets.
    pub fn run(&self, aggregation: Aggregation, filter: &FilterContext) -> Result<ResultSet> {
        self.execute(aggregation, &aggregation.params(Some(filter)))
    }

    /// Like [`run`](Self::run) for entries that do not read the selection.
    /// Selection-bound entries fail with `UnboundParameter`.
    pub fn run_overall(&self, aggregation: Aggregation) -> Result<ResultSet> {
        self.execute(aggregation, &aggregation.params(None))
    }

    pub fn totals_overview(&self) -> Result<TotalsOverview> {
        let rs = self.execute(Aggregation::TotalsOverview, &Params::new())?;
        Ok(TotalsOverview {
            total_sales: float(&rs, 0, TOTAL_SALE)?,
            unique_customers: count(&rs, 0, UNIQUE_CUSTOMERS)?,
            average_sale: cell(&rs, 0, AVERAGE_SALE)?.as_f64(),
        })
    }

    /// Transactions and sales for the selected category/gender pair; empty
    /// when nothing matches.
    pub fn filtered_summary(&self, filter: &FilterContext) -> Result<Vec<CategorySummary>> {
        let rs = self.run(Aggregation::FilteredSummary, filter)?;
        (0..rs.len())
            .map(|row| {
                Ok(CategorySummary {
                    category: text(&rs, row, Column::Category.name())?,
                    gender: text(&rs, row, Column::Gender.name())?,
                    transactions: count(&rs, row, TRANSACTIONS)?,
                    total_sale: float(&rs, row, TOTAL_SALE)?,
                })
            })
            .collect()
    }

    /// Sales per age for the selected pair, ascending by age.
    pub fn sales_by_age_trend(&self, filter: &FilterContext) -> Result<Vec<AgeSales>> {
        let rs = self.run(Aggregation::SalesByAgeTrend, filter)?;
        (0..rs.len())
            .map(|row| {
                let age = count(&rs, row, Column::Age.name())?;
                Ok(AgeSales {
                    age: u32::try_from(age)
                        .map_err(|_| Error::aggregation(format!("age {age} out of range")))?,
                    total_sale: float(&rs, row, TOTAL_SALE)?,
                })
            })
            .collect()
    }

    /// Sales per category, largest first, ties by category name.
    pub fn sales_by_category_breakdown(&self) -> Result<Vec<CategorySales>> {
        let rs = self.execute(Aggregation::SalesByCategoryBreakdown, &Params::new())?;
        (0..rs.len())
            .map(|row| {
                Ok(CategorySales {
                    category: text(&rs, row, Column::Category.name())?,
                    total_sale: float(&rs, row, TOTAL_SALE)?,
                })
            })
            .collect()
    }

    /// Best-selling products, at most `top_n` rows.
    pub fn top_products(&self, top_n: TopN) -> Result<Vec<ProductSales>> {
        let rs = self.execute(Aggregation::TopProducts, &top_n_params(top_n))?;
        (0..rs.len())
            .map(|row| {
                Ok(ProductSales {
                    product_id: cell(&rs, row, Column::ProductId.name())?.clone(),
                    product_name: cell(&rs, row, Column::ProductName.name())?
                        .as_str()
                        .map(str::to_string),
                    total_sale: float(&rs, row, TOTAL_SALE)?,
                })
            })
            .collect()
    }

    fn execute(&self, aggregation: Aggregation, params: &Params) -> Result<ResultSet> {
        aggregation
            .query()
            .execute(self.dataset, params)
            .inspect_err(|e| log::error!("{aggregation} failed: {e}"))
    }
}

// -- Result decoding helpers --

fn cell<'r>(rs: &'r ResultSet, row: usize, name: &str) -> Result<&'r Value> {
    rs.get(row, name)
        .ok_or_else(|| Error::aggregation(format!("result has no '{name}' at row {row}")))
}

fn float(rs: &ResultSet, row: usize, name: &str) -> Result<f64> {
    let v = cell(rs, row, name)?;
    v.as_f64()
        .ok_or_else(|| Error::aggregation(format!("'{name}' is not numeric: {v}")))
}

fn count(rs: &ResultSet, row: usize, name: &str) -> Result<usize> {
    let v = cell(rs, row, name)?;
    v.as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::aggregation(format!("'{name}' is not a count: {v}")))
}

fn text(rs: &ResultSet, row: usize, name: &str) -> Result<String> {
    let v = cell(rs, row, name)?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::aggregation(format!("'{name}' is not text: {v}")))
}
