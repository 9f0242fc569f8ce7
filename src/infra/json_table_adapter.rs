use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::io::ErrorKind;
use tracing::debug;

use crate::app::ports::TableSourcePort;
use crate::domain::{RawTable, Row};
use crate::error::Result;

/// On-disk table layouts: a header with positional rows, or an array of row objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableFile {
    Grid { columns: Vec<String>, rows: Vec<Vec<Value>> },
    Records(Vec<Row>),
}

pub fn decode_table(bytes: &[u8]) -> Result<RawTable> {
    let table = match serde_json::from_slice::<TableFile>(bytes)? {
        TableFile::Grid { columns, rows } => RawTable::from_grid(columns, rows),
        TableFile::Records(rows) => RawTable::from_records(rows),
    };
    Ok(table)
}

/// Reads JSON table files from the local filesystem
pub struct JsonTableSource;

#[async_trait]
impl TableSourcePort for JsonTableSource {
    async fn load(&self, location: &str) -> Result<Option<RawTable>> {
        let bytes = match tokio::fs::read(location).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let table = decode_table(&bytes)?;
        debug!("Decoded '{}': {} columns, {} rows", location, table.columns.len(), table.len());
        Ok(Some(table))
    }
}
