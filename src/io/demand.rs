//! CSV loading of long-format origin-destination demand tables.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{AssignmentError, Result};

/// Reads a long-format demand table (`origin, destination, <class-name>, ...`) and
/// splits it into one `(origin, destination, trips)` row list per requested class
/// column. Rows with a zero or missing value for a class are skipped for that class.
pub fn read_demand<R: Read>(
    reader: R,
    class_columns: &[String],
) -> Result<HashMap<String, Vec<(u64, u64, f64)>>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let origin_idx = column_index(&headers, "origin")?;
    let destination_idx = column_index(&headers, "destination")?;
    let class_indices: Vec<(String, usize)> = class_columns
        .iter()
        .map(|name| column_index(&headers, name).map(|idx| (name.clone(), idx)))
        .collect::<Result<_>>()?;

    let mut out: HashMap<String, Vec<(u64, u64, f64)>> =
        class_columns.iter().map(|c| (c.clone(), Vec::new())).collect();

    for result in rdr.records() {
        let row = result?;
        let origin: u64 = row
            .get(origin_idx)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| malformed("origin"))?;
        let destination: u64 = row
            .get(destination_idx)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| malformed("destination"))?;

        for (name, idx) in &class_indices {
            if let Some(value) = row.get(*idx).and_then(|s| s.parse::<f64>().ok()) {
                if value > 0.0 {
                    out.get_mut(name).unwrap().push((origin, destination, value));
                }
            }
        }
    }

    Ok(out)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| malformed(name))
}

fn malformed(column: &str) -> AssignmentError {
    AssignmentError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("demand table is missing or cannot parse column '{}'", column),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rows_by_class_column() {
        let csv_data = "origin,destination,car,truck\n1,2,100.0,0.0\n1,3,0.0,25.0\n";
        let classes = vec!["car".to_owned(), "truck".to_owned()];
        let parsed = read_demand(csv_data.as_bytes(), &classes).unwrap();
        assert_eq!(parsed["car"], vec![(1, 2, 100.0)]);
        assert_eq!(parsed["truck"], vec![(1, 3, 25.0)]);
    }
}
