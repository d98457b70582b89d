//! Terminal rendering for command results.
//!
//! Arrays of flat objects render as aligned columns (session listings and
//! the like); everything else falls back to pretty JSON.

use serde_json::Value;

pub fn print_value(value: &Value) {
    match table_rows(value) {
        Some((headers, rows)) => print_table(&headers, &rows),
        None => match value {
            Value::Null => {}
            Value::String(s) => println!("{s}"),
            other => println!("{}", serde_json::to_string_pretty(other).unwrap_or_default()),
        },
    }
}

/// Extract column headers and rows from an array of flat objects.
fn table_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let array = value.as_array()?;
    if array.is_empty() {
        return None;
    }
    let first = array.first()?.as_object()?;
    let headers: Vec<String> = first.keys().cloned().collect();

    let mut rows = Vec::with_capacity(array.len());
    for item in array {
        let object = item.as_object()?;
        let row = headers
            .iter()
            .map(|key| match object.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        rows.push(row);
    }
    Some((headers, rows))
}

fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h.to_uppercase(), width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
