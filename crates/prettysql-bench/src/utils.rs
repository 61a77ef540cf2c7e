//! Benchmark utilities and helpers.

use prettysql_common::Value;

/// Builds a `SELECT` with `count` bare named parameters.
pub fn named_query(count: usize) -> String {
    let predicates: Vec<String> = (0..count).map(|i| format!("c{i} = :p{i}")).collect();
    format!("SELECT * FROM t WHERE {}", predicates.join(" AND "))
}

/// Builds a `SELECT` with `count` braced named parameters.
pub fn braced_query(count: usize) -> String {
    let predicates: Vec<String> = (0..count).map(|i| format!("c{i} = :{{p{i}}}")).collect();
    format!("SELECT * FROM t WHERE {}", predicates.join(" AND "))
}

/// Column labels of the generated film rows.
pub fn film_columns() -> Vec<String> {
    ["id", "original_name", "year"].map(String::from).to_vec()
}

/// Generates `count` film rows with sequential IDs.
pub fn generate_film_rows(count: usize) -> Vec<Vec<Value>> {
    (0..count as i32)
        .map(|i| {
            vec![
                Value::Int(i + 1),
                Value::String(format!("film_{:06}", i)),
                Value::SmallInt(1990 + (i % 40) as i16),
            ]
        })
        .collect()
}
