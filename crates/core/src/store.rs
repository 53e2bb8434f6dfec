//! Named table storage and durable key/value state.

use crate::tabular::{load_config, load_slides};
use crate::types::{Config, Slide};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Name of the settings table.
pub const CONFIG_TABLE: &str = "Config";

/// Name of the slide records table.
pub const SLIDES_TABLE: &str = "Slides";

/// Rows of cells, header row first.
pub type Table = Vec<Vec<String>>;

/// Read/write access to named tables.
pub trait TableStore {
    /// Read a table, or `None` if it does not exist.
    fn read_table(&self, name: &str) -> Result<Option<Table>>;

    /// Replace a table's contents wholesale, creating it if needed.
    fn write_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Copy an existing table under a new name.
    fn copy_table(&mut self, from: &str, to: &str) -> Result<()>;

    fn has_table(&self, name: &str) -> Result<bool> {
        Ok(self.read_table(name)?.is_some())
    }
}

/// Durable string settings, scoped to the invoking user.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Load the Config table.
pub fn read_config<T: TableStore + ?Sized>(tables: &T) -> Result<Config> {
    let rows = tables
        .read_table(CONFIG_TABLE)?
        .ok_or_else(|| Error::ConfigSheetMissing(CONFIG_TABLE.to_string()))?;
    Ok(load_config(&rows))
}

/// Load and sort the Slides table.
pub fn read_slides<T: TableStore + ?Sized>(tables: &T) -> Result<Vec<Slide>> {
    let rows = tables
        .read_table(SLIDES_TABLE)?
        .ok_or_else(|| Error::SlidesSheetMissing(SLIDES_TABLE.to_string()))?;
    load_slides(&rows)
}

/// Tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table insertion.
    pub fn with_table(mut self, name: &str, rows: &[&[&str]]) -> Self {
        self.tables.insert(
            name.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

impl TableStore for MemoryTableStore {
    fn read_table(&self, name: &str) -> Result<Option<Table>> {
        Ok(self.tables.get(name).cloned())
    }

    fn write_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        self.tables.insert(name.to_string(), rows.to_vec());
        Ok(())
    }

    fn copy_table(&mut self, from: &str, to: &str) -> Result<()> {
        let rows = self
            .tables
            .get(from)
            .cloned()
            .ok_or_else(|| Error::TableError(format!("table '{}' does not exist", from)))?;
        self.tables.insert(to.to_string(), rows);
        Ok(())
    }
}

/// Key/value state held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
