#![allow(dead_code)]

use crosstab::Table;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// region/product/sales table used throughout the pipeline tests.
pub fn sales_table() -> Table {
    Table::from_dataframe(
        df!(
            "region" => &["North", "South", "North"],
            "product" => &["A", "B", "A"],
            "sales" => &[10_i64, 20, 30],
        )
        .unwrap(),
    )
}

/// A larger table with repeating keys, for the property tests.
pub fn inventory_table() -> Table {
    let n = 60;
    Table::from_dataframe(
        df!(
            "site" => (0..n).map(|i| format!("site_{}", i % 4)).collect::<Vec<String>>(),
            "kind" => (0..n).map(|i| format!("kind_{}", i % 3)).collect::<Vec<String>>(),
            "quantity" => (0..n).map(|i| (i % 7) as i64).collect::<Vec<i64>>(),
            "status" => (0..n).map(|i| if i % 5 == 0 { "broken" } else { "ok" }).collect::<Vec<&str>>(),
        )
        .unwrap(),
    )
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
