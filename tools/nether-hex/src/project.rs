//! tables.toml project parsing
//!
//! A project names addresses in a ROM, declares the tables stored there and
//! supplies the option lists their enum and bit-flag fields refer to.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use nether_table::{MemoryModel, Table};
use serde::Deserialize;

/// tables.toml structure
#[derive(Debug, Default, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub anchors: Vec<AnchorEntry>,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    /// Enum option lists by name
    #[serde(default)]
    pub lists: BTreeMap<String, Vec<String>>,
    /// Bit-flag name lists by name
    #[serde(default)]
    pub bits: BTreeMap<String, Vec<String>>,
}

/// Named address
#[derive(Debug, Deserialize)]
pub struct AnchorEntry {
    pub name: String,
    pub address: usize,
}

/// Table declaration. The table is also anchored under its name.
#[derive(Debug, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub address: usize,
    pub format: String,
    pub count: usize,
}

impl Project {
    /// Load a project from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load project: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse project file")
    }

    /// Wrap `data` in a model carrying this project's anchors, tables and lists.
    pub fn build_model(&self, data: Vec<u8>) -> Result<MemoryModel> {
        let mut model = MemoryModel::new(data);
        for (name, options) in &self.lists {
            model.add_list(name.clone(), options.clone());
        }
        for (name, options) in &self.bits {
            model.add_bit_list(name.clone(), options.clone());
        }
        for anchor in &self.anchors {
            model.add_anchor(anchor.name.clone(), anchor.address);
        }
        for entry in &self.tables {
            let table = model
                .add_table(&entry.name, entry.address, &entry.format, entry.count)
                .with_context(|| format!("Invalid format for table '{}'", entry.name))?;
            anyhow::ensure!(
                table.start + table.length() <= model.data().len(),
                "Table '{}' ({:06X}, {} bytes) does not fit in {} bytes of data",
                entry.name,
                table.start,
                table.length(),
                model.data().len()
            );
            tracing::debug!("Loaded table '{}' at {:06X}", entry.name, entry.address);
        }
        Ok(model)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|entry| entry.name.as_str())
    }
}

/// Look up a declared table by name
pub fn find_table(model: &MemoryModel, name: &str) -> Result<Table> {
    model
        .table(name)
        .with_context(|| format!("No table named '{name}' in the project"))
}
