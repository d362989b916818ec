use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single dynamically-typed cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a sales file carries.
/// Used as a `BTreeMap` / `BTreeSet` key downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can group and sort by Value --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Interpret the value as an `f64` for numeric aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Guess the type of a raw text cell: empty → null, then integer, float,
    /// boolean, and finally plain string.
    pub fn guess(s: &str) -> Value {
        let s = s.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Column – the fixed sales schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    TransactionId,
    CustomerId,
    Category,
    Gender,
    Age,
    ProductId,
    ProductName,
    TotalSale,
}

/// How a column is summarised and whether it can feed a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identifier,
    Categorical,
    Numeric,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::TransactionId,
        Column::CustomerId,
        Column::Category,
        Column::Gender,
        Column::Age,
        Column::ProductId,
        Column::ProductName,
        Column::TotalSale,
    ];

    /// Columns every dataset must carry.
    pub const REQUIRED: [Column; 5] = [
        Column::Category,
        Column::Gender,
        Column::Age,
        Column::CustomerId,
        Column::TotalSale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::TransactionId => "transaction_id",
            Column::CustomerId => "customer_id",
            Column::Category => "category",
            Column::Gender => "gender",
            Column::Age => "age",
            Column::ProductId => "product_id",
            Column::ProductName => "product_name",
            Column::TotalSale => "total_sale",
        }
    }

    /// Resolve a column from any spelling that normalizes to its name.
    pub fn from_name(name: &str) -> Option<Column> {
        let normalized = normalize_header(name);
        // Retail exports commonly pluralize the transaction id header.
        if normalized == "transactions_id" {
            return Some(Column::TransactionId);
        }
        Column::ALL.into_iter().find(|c| c.name() == normalized)
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::TransactionId | Column::CustomerId | Column::ProductId => {
                ColumnKind::Identifier
            }
            Column::Category | Column::Gender | Column::ProductName => ColumnKind::Categorical,
            Column::Age | Column::TotalSale => ColumnKind::Numeric,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a header: trim, lower-case, and fold whitespace runs and dashes
/// into single underscores (`"Total Sale"` → `"total_sale"`).
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// RawTable – what a source hands over before validation
// ---------------------------------------------------------------------------

/// Untyped table as read from a source: headers plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

// ---------------------------------------------------------------------------
// SaleRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// A single sales transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    /// `Null` when the source has no transaction column.
    pub transaction_id: Value,
    pub customer_id: Value,
    pub category: String,
    pub gender: String,
    pub age: Option<u32>,
    /// `Null` outside the product-breakdown schema.
    pub product_id: Value,
    pub product_name: Option<String>,
    /// Always finite and ≥ 0.
    pub total_sale: f64,
}

impl SaleRecord {
    /// Convenience constructor for the columns every schema carries.
    pub fn new(
        customer_id: impl Into<Value>,
        category: &str,
        gender: &str,
        age: u32,
        total_sale: f64,
    ) -> Self {
        SaleRecord {
            transaction_id: Value::Null,
            customer_id: customer_id.into(),
            category: category.to_string(),
            gender: gender.to_string(),
            age: Some(age),
            product_id: Value::Null,
            product_name: None,
            total_sale,
        }
    }

    pub fn with_product(mut self, product_id: impl Into<Value>, product_name: &str) -> Self {
        self.product_id = product_id.into();
        self.product_name = Some(product_name.to_string());
        self
    }

    /// Typed-to-dynamic column access used by the query executor.
    pub fn value(&self, column: Column) -> Value {
        match column {
            Column::TransactionId => self.transaction_id.clone(),
            Column::CustomerId => self.customer_id.clone(),
            Column::Category => Value::String(self.category.clone()),
            Column::Gender => Value::String(self.gender.clone()),
            Column::Age => self
                .age
                .map(|a| Value::Integer(a as i64))
                .unwrap_or(Value::Null),
            Column::ProductId => self.product_id.clone(),
            Column::ProductName => self
                .product_name
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Column::TotalSale => Value::Float(self.total_sale),
        }
    }

    fn from_row(row_no: usize, cells: &[(Column, Value)]) -> Result<Self> {
        let cell = |col: Column| cell_of(cells, col);
        let invalid = |reason: String| Error::InvalidRecord {
            row: row_no,
            reason,
        };

        let category = required_text(cell(Column::Category))
            .ok_or_else(|| invalid("category is null".into()))?;
        let gender = required_text(cell(Column::Gender))
            .ok_or_else(|| invalid("gender is null".into()))?;

        let total_sale = match numeric(cell(Column::TotalSale)) {
            Value::Null => return Err(invalid("total_sale is null".into())),
            Value::Integer(i) => i as f64,
            Value::Float(f) => f,
            other => return Err(invalid(format!("total_sale '{other}' is not a number"))),
        };
        if !total_sale.is_finite() || total_sale < 0.0 {
            return Err(invalid(format!(
                "total_sale must be a non-negative amount, got {total_sale}"
            )));
        }

        let age = match numeric(cell(Column::Age)) {
            Value::Null => None,
            Value::Integer(i) if i >= 0 && i <= u32::MAX as i64 => Some(i as u32),
            Value::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
                Some(f as u32)
            }
            other => return Err(invalid(format!("age '{other}' is not a non-negative integer"))),
        };

        Ok(SaleRecord {
            transaction_id: cell(Column::TransactionId).clone(),
            customer_id: cell(Column::CustomerId).clone(),
            category,
            gender,
            age,
            product_id: cell(Column::ProductId).clone(),
            product_name: required_text(cell(Column::ProductName)),
            total_sale,
        })
    }
}

static NULL_VALUE: Value = Value::Null;

fn cell_of(cells: &[(Column, Value)], col: Column) -> &Value {
    cells
        .iter()
        .find(|(c, _)| *c == col)
        .map(|(_, v)| v)
        .unwrap_or(&NULL_VALUE)
}

/// Text cells of a numeric column are parsed; typed cells pass through.
fn numeric(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::guess(s),
        other => other.clone(),
    }
}

/// Labels keep their stored text; typed cells from JSON or Parquet are
/// rendered without rounding.
fn required_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(label(other)),
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded record set
// ---------------------------------------------------------------------------

/// The full validated dataset with pre-computed distinct-value indices.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<SaleRecord>,
    /// Columns present in the source, in schema order.
    columns: Vec<Column>,
    /// For each present column the sorted set of non-null values.
    unique_values: BTreeMap<Column, BTreeSet<Value>>,
}

impl Dataset {
    /// Build a dataset from already-typed records.  `columns` declares which
    /// schema columns the records carry and must include every required one.
    pub fn from_records(columns: &[Column], records: Vec<SaleRecord>) -> Result<Self> {
        let mut present: Vec<Column> = columns.to_vec();
        present.sort();
        present.dedup();

        let missing: Vec<String> = Column::REQUIRED
            .iter()
            .filter(|c| !present.contains(c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch { missing });
        }

        let mut unique_values: BTreeMap<Column, BTreeSet<Value>> =
            present.iter().map(|c| (*c, BTreeSet::new())).collect();
        for record in &records {
            for (col, values) in unique_values.iter_mut() {
                let value = record.value(*col);
                if !value.is_null() {
                    values.insert(value);
                }
            }
        }

        Ok(Dataset {
            records,
            columns: present,
            unique_values,
        })
    }

    /// Validate and type a raw table: normalize headers, check the schema,
    /// and convert every row into a [`SaleRecord`].
    pub fn from_table(table: RawTable) -> Result<Self> {
        let mut mapping: Vec<(usize, Column)> = Vec::new();
        for (idx, header) in table.headers.iter().enumerate() {
            match Column::from_name(header) {
                Some(col) if mapping.iter().any(|(_, c)| *c == col) => {
                    log::warn!("Duplicate column '{header}' ignored; first occurrence wins");
                }
                Some(col) => mapping.push((idx, col)),
                None => log::warn!("Ignoring unknown column '{header}'"),
            }
        }
        let columns: Vec<Column> = mapping.iter().map(|(_, c)| *c).collect();

        let missing: Vec<String> = Column::REQUIRED
            .iter()
            .filter(|c| !columns.contains(c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch { missing });
        }

        let mut records = Vec::with_capacity(table.rows.len());
        for (row_no, row) in table.rows.iter().enumerate() {
            let cells: Vec<(Column, Value)> = mapping
                .iter()
                .map(|(idx, col)| (*col, row.get(*idx).cloned().unwrap_or(Value::Null)))
                .collect();
            records.push(SaleRecord::from_row(row_no, &cells)?);
        }

        Dataset::from_records(&columns, records)
    }

    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Whether the product-breakdown columns are available.
    pub fn has_products(&self) -> bool {
        self.has_column(Column::ProductId) && self.has_column(Column::ProductName)
    }

    /// Resolve a column name against this dataset's schema.
    pub fn resolve(&self, name: &str) -> Result<Column> {
        Column::from_name(name)
            .filter(|c| self.has_column(*c))
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Sorted unique non-null values of a column, rendered as text.  Floats
    /// keep full precision so distinct values stay distinct.
    pub fn distinct_values(&self, name: &str) -> Result<Vec<String>> {
        let column = self.resolve(name)?;
        Ok(self
            .unique_values
            .get(&column)
            .map(|vals| vals.iter().map(label).collect())
            .unwrap_or_default())
    }

    /// Raw distinct values of a column (typed, sorted by [`Value`] order).
    pub fn unique_values(&self, column: Column) -> Option<&BTreeSet<Value>> {
        self.unique_values.get(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
