use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{RawTable, Value};

// ---------------------------------------------------------------------------
// Source abstraction
// ---------------------------------------------------------------------------

/// Something a dataset can be read from.
///
/// `identity` is the cache key used by the store: two sources with the same
/// identity are assumed to yield the same table.
pub trait DataSource {
    fn identity(&self) -> String;
    fn read(&self) -> Result<RawTable>;
}

/// A tabular file on disk.  The format is picked from the extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn identity(&self) -> String {
        std::fs::canonicalize(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .display()
            .to_string()
    }

    fn read(&self) -> Result<RawTable> {
        load_file(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a sales table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`            – comma-delimited with a header row
/// * `.tsv`            – tab-delimited with a header row
/// * `.json`           – `[{ "category": ..., "total_sale": ..., ... }, ...]`
/// * `.parquet` / `.pq` – flat scalar columns
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_delimited(file, delimiter)
}

/// Parse delimited text with a header row.  Cells are kept exactly as
/// stored; only empty cells become null.  Typing happens per column when
/// rows are validated.
pub fn read_delimited<R: std::io::Read>(input: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        rows.push(record.iter().map(raw_cell).collect());
    }

    Ok(RawTable { headers, rows })
}

fn raw_cell(text: &str) -> Value {
    if text.is_empty() {
        Value::Null
    } else {
        Value::String(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "category": "Beauty", "gender": "Male", "age": 34, "customer_id": 7, "total_sale": 150 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).  Nested columns are rendered as text.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        _ => Value::guess(&array_value_to_string(col, row).context("formatting cell")?),
    };
    Ok(value)
}

/// Non-null cell count per header, for load diagnostics.
pub fn describe_table(table: &RawTable) -> BTreeMap<String, usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let non_null = table
                .rows
                .iter()
                .filter(|r| r.get(idx).is_some_and(|v| !v.is_null()))
                .count();
            (h.clone(), non_null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_cells_keep_their_stored_text() {
        let text = "Category,Gender,Age,Customer_ID,Total_Sale\nBeauty ,Male,34,07,150\nToys,Female,,8,99.50\n";
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows[0][0], Value::from("Beauty "));
        assert_eq!(table.rows[0][2], Value::from("34"));
        assert_eq!(table.rows[0][3], Value::from("07"));
        assert_eq!(table.rows[1][2], Value::Null);
        assert_eq!(table.rows[1][4], Value::from("99.50"));
    }

    #[test]
    fn quoted_cells_keep_metacharacters() {
        let text = "category,gender\n\"Clothing' OR '1'='1\",F\n";
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert_eq!(
            table.rows[0][0],
            Value::String("Clothing' OR '1'='1".to_string())
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("sales.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn describe_counts_non_null_cells() {
        let table = RawTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![
                vec![Value::Integer(1), Value::Null],
                vec![Value::Integer(2), Value::Integer(3)],
            ],
        };
        let counts = describe_table(&table);
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 1);
    }
}
