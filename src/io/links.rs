//! CSV loading of the link table that seeds a [`crate::graph::GraphBuilder`].

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::Result;
use crate::graph::LinkRecord;

/// Fixed columns every link row must have. Any other header becomes a numeric entry in
/// `LinkRecord::attrs` (VDF parameters like `alpha`/`beta` arrive this way). We don't
/// use `#[serde(flatten)]` into a `HashMap` here — the `csv` crate's flatten support is
/// unreliable for map fields, since CSV headers aren't inherently self-describing the
/// way flatten needs. Instead the fixed columns are typed and the rest are picked up
/// by re-scanning the header row against each `StringRecord`.
#[derive(Debug, Deserialize)]
struct LinkRow {
    link_id: u64,
    a_node: u64,
    b_node: u64,
    direction: i8,
    capacity: f64,
    free_flow_time: f64,
    length: f64,
    #[serde(default)]
    modes: String,
}

const FIXED_COLUMNS: &[&str] = &[
    "link_id",
    "a_node",
    "b_node",
    "direction",
    "capacity",
    "free_flow_time",
    "length",
    "modes",
];

/// Reads a link table from any `Read` source (file, in-memory string, …).
pub fn read_links<R: Read>(reader: R) -> Result<Vec<LinkRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let extra_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !FIXED_COLUMNS.contains(name))
        .map(|(idx, name)| (idx, name.to_owned()))
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let raw = result?;
        let row: LinkRow = raw.deserialize(Some(&headers))?;

        let mut attrs: HashMap<String, f64> = HashMap::new();
        for (idx, name) in &extra_columns {
            if let Some(value) = raw.get(*idx).and_then(|s| s.parse::<f64>().ok()) {
                attrs.insert(name.clone(), value);
            }
        }

        let mut record = LinkRecord::new(
            row.link_id,
            row.a_node,
            row.b_node,
            row.direction,
            row.capacity,
            row.free_flow_time,
            row.length,
        )
        .with_modes(row.modes);
        for (name, value) in attrs {
            record = record.with_attr(name, value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Reads an ordered centroid id list, one `node_id` per row.
pub fn read_centroids<R: Read>(reader: R) -> Result<Vec<u64>> {
    #[derive(Deserialize)]
    struct CentroidRow {
        node_id: u64,
    }
    let mut rdr = csv::Reader::from_reader(reader);
    let mut ids = Vec::new();
    for result in rdr.deserialize() {
        let row: CentroidRow = result?;
        ids.push(row.node_id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_columns_and_extra_attributes() {
        let csv_data = "link_id,a_node,b_node,direction,capacity,free_flow_time,length,modes,alpha,beta\n\
                         1,1,2,1,100.0,10.0,1.0,c,0.15,4.0\n";
        let records = read_links(csv_data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attrs.get("alpha"), Some(&0.15));
        assert_eq!(records[0].attrs.get("beta"), Some(&4.0));
    }

    #[test]
    fn reads_ordered_centroid_list() {
        let csv_data = "node_id\n1\n2\n3\n";
        let ids = read_centroids(csv_data.as_bytes()).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
