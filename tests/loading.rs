use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use retail_lens::Error;
use retail_lens::data::filter::FilterDomain;
use retail_lens::data::loader::FileSource;
use retail_lens::data::model::Column;
use retail_lens::data::store::DatasetStore;
use retail_lens::engine::AggregationEngine;

const CSV: &str = "\
transactions_id,Sale Date,Customer_ID,Gender,Age,Category,Product_ID,Product_Name,Total_Sale
1,2022-11-05,101,Male,34,Beauty,11,Lipstick,150
2,2022-11-06,102,Female,26,Clothing,21,Jeans,1000
3,2022-11-07,101,Male,50,Electronics,31,Tablet,30
4,2022-11-08,103,Female,37,Clothing,22,Jacket,500
";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_parquet(dir: &Path) -> PathBuf {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Category", DataType::Utf8, false),
        Field::new("Gender", DataType::Utf8, false),
        Field::new("Age", DataType::Int64, true),
        Field::new("Customer_ID", DataType::Int64, false),
        Field::new("Total_Sale", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["Beauty", "Clothing", "Clothing"])),
        Arc::new(StringArray::from(vec!["Male", "Female", "Female"])),
        Arc::new(Int64Array::from(vec![Some(34), None, Some(37)])),
        Arc::new(Int64Array::from(vec![101, 102, 103])),
        Arc::new(Float64Array::from(vec![150.0, 1000.0, 500.0])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let path = dir.join("sales.parquet");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    path
}

#[test]
fn csv_with_original_headers_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "Data_Set.csv", CSV);

    let store = DatasetStore::new();
    let ds = store.load(&FileSource::new(&path)).unwrap();

    assert_eq!(ds.len(), 4);
    assert!(ds.has_products());
    assert!(ds.has_column(Column::TransactionId));
    assert_eq!(
        ds.distinct_values("category").unwrap(),
        vec!["Beauty", "Clothing", "Electronics"]
    );

    let totals = AggregationEngine::new(&ds).totals_overview().unwrap();
    assert_eq!(totals.total_sales, 1680.0);
    assert_eq!(totals.unique_customers, 3);
}

#[test]
fn same_path_is_read_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "Data_Set.csv", CSV);
    let store = DatasetStore::new();

    let first = store.load(&FileSource::new(&path)).unwrap();
    // Changing the file behind the cache is invisible until reload.
    write(dir.path(), "Data_Set.csv", "category,gender,age,customer_id,total_sale\n");
    let second = store.load(&FileSource::new(&path)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let reloaded = store.reload(&FileSource::new(&path)).unwrap();
    assert!(reloaded.is_empty());
}

#[test]
fn all_formats_yield_the_same_records() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write(dir.path(), "sales.csv", CSV);
    let tsv = write(dir.path(), "sales.tsv", &CSV.replace(',', "\t"));
    let json = write(
        dir.path(),
        "sales.json",
        r#"[
            {"transactions_id": "1", "Sale Date": "2022-11-05", "Customer_ID": "101", "Gender": "Male", "Age": 34, "Category": "Beauty", "Product_ID": "11", "Product_Name": "Lipstick", "Total_Sale": 150},
            {"transactions_id": "2", "Sale Date": "2022-11-06", "Customer_ID": "102", "Gender": "Female", "Age": 26, "Category": "Clothing", "Product_ID": "21", "Product_Name": "Jeans", "Total_Sale": 1000},
            {"transactions_id": "3", "Sale Date": "2022-11-07", "Customer_ID": "101", "Gender": "Male", "Age": 50, "Category": "Electronics", "Product_ID": "31", "Product_Name": "Tablet", "Total_Sale": 30},
            {"transactions_id": "4", "Sale Date": "2022-11-08", "Customer_ID": "103", "Gender": "Female", "Age": 37, "Category": "Clothing", "Product_ID": "22", "Product_Name": "Jacket", "Total_Sale": 500}
        ]"#,
    );

    let store = DatasetStore::new();
    let from_csv = store.load(&FileSource::new(&csv)).unwrap();
    let from_tsv = store.load(&FileSource::new(&tsv)).unwrap();
    let from_json = store.load(&FileSource::new(&json)).unwrap();

    assert_eq!(from_csv.records(), from_tsv.records());
    assert_eq!(from_csv.records(), from_json.records());
}

#[test]
fn stored_labels_stay_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "labels.csv",
        "category,gender,age,customer_id,total_sale\n\
         Beauty ,M,30,1,10\n\
         Beauty,M,31,2,20\n\
         01,F,32,3,40\n\
         1,F,33,4,80\n\
         1.50,F,34,5,160\n",
    );

    let store = DatasetStore::new();
    let ds = store.load(&FileSource::new(&path)).unwrap();
    assert_eq!(
        ds.distinct_values("category").unwrap(),
        vec!["01", "1", "1.50", "Beauty", "Beauty "]
    );

    let domain = FilterDomain::from_dataset(&ds).unwrap();
    let engine = AggregationEngine::new(&ds);
    for (category, gender, total) in [("Beauty", "M", 20.0), ("Beauty ", "M", 10.0), ("01", "F", 40.0), ("1", "F", 80.0)] {
        let filter = domain.select(category, gender, None).unwrap();
        let rows = engine.filtered_summary(&filter).unwrap();
        assert_eq!(rows.len(), 1, "{category:?}");
        assert_eq!(rows[0].category, category);
        assert_eq!(rows[0].transactions, 1);
        assert_eq!(rows[0].total_sale, total);
    }
}

#[test]
fn parquet_loads_with_null_ages() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_parquet(dir.path());

    let store = DatasetStore::new();
    let ds = store.load(&FileSource::new(&path)).unwrap();
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.records()[1].age, None);
    assert!(!ds.has_products());

    let stats = store.summary_statistics(&FileSource::new(&path)).unwrap();
    let age = stats.iter().find(|s| s.column == Column::Age).unwrap();
    assert_eq!(age.count, 2);
}

#[test]
fn missing_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new();
    let err = store
        .load(&FileSource::new(dir.path().join("Data_Set.csv")))
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[test]
fn missing_columns_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "bad.csv", "category,gender,age\nBeauty,Male,3\n");
    let err = DatasetStore::new().load(&FileSource::new(&path)).unwrap_err();
    match err {
        Error::SchemaMismatch { missing } => assert_eq!(missing, vec!["customer_id", "total_sale"]),
        other => panic!("expected schema mismatch, got {other}"),
    }
}

#[test]
fn invalid_amount_names_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "bad.csv",
        "category,gender,age,customer_id,total_sale\nBeauty,Male,3,1,10\nBeauty,Male,3,1,lots\n",
    );
    let err = DatasetStore::new().load(&FileSource::new(&path)).unwrap_err();
    assert!(matches!(err, Error::InvalidRecord { row: 1, .. }));
}
