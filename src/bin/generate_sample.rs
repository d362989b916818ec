use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64() % (hi - lo + 1)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.range(0, items.len() as u64 - 1) as usize]
    }
}

#[derive(Debug, Serialize)]
struct SaleRow {
    transactions_id: i64,
    customer_id: i64,
    category: &'static str,
    gender: &'static str,
    age: i64,
    product_id: i64,
    product_name: &'static str,
    total_sale: f64,
}

/// (category, [(product_id, product_name, unit_price)])
const CATALOGUE: [(&str, [(i64, &str, f64); 3]); 3] = [
    (
        "Beauty",
        [(101, "Face Serum", 50.0), (102, "Lipstick", 25.0), (103, "Perfume", 300.0)],
    ),
    (
        "Clothing",
        [(201, "T-Shirt", 30.0), (202, "Jeans", 60.0), (203, "Jacket", 150.0)],
    ),
    (
        "Electronics",
        [(301, "Earbuds", 100.0), (302, "Smartwatch", 250.0), (303, "Tablet", 500.0)],
    ),
];

const GENDERS: [&str; 2] = ["Female", "Male"];

fn generate(n_rows: usize, rng: &mut SimpleRng) -> Vec<SaleRow> {
    (0..n_rows)
        .map(|i| {
            let (category, products) = *rng.pick(&CATALOGUE);
            let (product_id, product_name, price) = *rng.pick(&products);
            let quantity = rng.range(1, 4) as f64;
            SaleRow {
                transactions_id: i as i64 + 1,
                customer_id: rng.range(1, (n_rows as u64 / 3).max(1)) as i64,
                category,
                gender: *rng.pick(&GENDERS),
                age: rng.range(18, 64) as i64,
                product_id,
                product_name,
                total_sale: price * quantity,
            }
        })
        .collect()
}

fn write_csv(rows: &[SaleRow], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[SaleRow], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("transactions_id", DataType::Int64, false),
        Field::new("customer_id", DataType::Int64, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("product_id", DataType::Int64, false),
        Field::new("product_name", DataType::Utf8, false),
        Field::new("total_sale", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.transactions_id))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.customer_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.category))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.gender))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.age))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.product_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.product_name))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.total_sale))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let n_rows: usize = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("row count '{arg}' is not a number"))?,
        None => 1000,
    };

    let mut rng = SimpleRng::new(42);
    let rows = generate(n_rows, &mut rng);

    write_csv(&rows, "Data_Set.csv")?;
    write_parquet(&rows, "Data_Set.parquet")?;

    log::debug!("Generated {n_rows} rows from seed 42");
    println!("Wrote {} sales rows to Data_Set.csv and Data_Set.parquet", rows.len());
    Ok(())
}
