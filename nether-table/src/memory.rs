//! In-memory data model
//!
//! A plain byte vector plus the anchor, run and option bookkeeping the
//! engine expects from its host. The CLI loads ROM files into one of these,
//! and the engine tests build scenarios on top of it.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::error::Result;
use crate::model::{AnchorResolver, ByteStore, ModelDelta, OptionProvider, Run, RunRegistry};
use crate::schema;
use crate::segment::SegmentKind;
use crate::table::Table;

/// Byte buffer with anchors, runs and name lists
#[derive(Debug, Clone, Default)]
pub struct MemoryModel {
    data: Vec<u8>,
    anchors: HashMap<String, usize>,
    names: HashMap<usize, String>,
    runs: BTreeMap<usize, Run>,
    lists: HashMap<String, Vec<String>>,
    bit_lists: HashMap<String, Vec<String>>,
}

impl MemoryModel {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Name an address. A name maps to one address and vice versa.
    pub fn add_anchor(&mut self, name: impl Into<String>, address: usize) {
        let name = name.into();
        if let Some(previous) = self.anchors.insert(name.clone(), address) {
            self.names.remove(&previous);
        }
        if let Some(previous) = self.names.insert(address, name) {
            if self.anchors.get(&previous) == Some(&address) {
                self.anchors.remove(&previous);
            }
        }
    }

    /// Register an explicit enum option list
    pub fn add_list(&mut self, name: impl Into<String>, options: Vec<String>) {
        self.lists.insert(name.into(), options);
    }

    /// Register a bit-flag name list
    pub fn add_bit_list(&mut self, name: impl Into<String>, options: Vec<String>) {
        self.bit_lists.insert(name.into(), options);
    }

    /// Parse `format`, attach a table run at `address` and anchor it as `name`.
    pub fn add_table(&mut self, name: &str, address: usize, format: &str, element_count: usize) -> Result<Table> {
        let segments = schema::parse(format)?;
        let table = Table::new(address, segments, element_count);
        let mut delta = ModelDelta::new();
        self.observe_run_written(&mut delta, table.to_run());
        self.add_anchor(name, address);
        Ok(table)
    }

    /// The table anchored at `name`, if any
    pub fn table(&self, name: &str) -> Option<Table> {
        let address = self.address_for_name(name)?;
        self.runs.get(&address)?.as_table()
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.runs.values()
    }

    /// Text of the first text field of every element of the table `name`.
    fn options_from_table(&self, name: &str) -> Vec<String> {
        let Some(table) = self.table(name) else {
            return Vec::new();
        };
        let Some(index) = table
            .segments
            .iter()
            .position(|segment| segment.kind == SegmentKind::Text)
        else {
            return Vec::new();
        };
        (0..table.element_count)
            .map(|element| {
                let text = table.segments[index].to_text(self, table.field_address(element, index), false);
                text.trim_matches('"').to_string()
            })
            .collect()
    }
}

impl ByteStore for MemoryModel {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn byte(&self, address: usize) -> u8 {
        self.data.get(address).copied().unwrap_or(0)
    }

    fn set_byte(&mut self, address: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(address) {
            *slot = value;
        }
    }
}

impl AnchorResolver for MemoryModel {
    fn address_for_name(&self, name: &str) -> Option<usize> {
        self.anchors.get(name).copied()
    }

    fn name_for_address(&self, address: usize) -> Option<String> {
        self.names.get(&address).cloned()
    }
}

impl RunRegistry for MemoryModel {
    fn run_at_or_after(&self, address: usize) -> Option<Run> {
        if let Some((_, run)) = self.runs.range(..=address).next_back() {
            if run.contains(address) {
                return Some(run.clone());
            }
        }
        self.runs.range(address..).next().map(|(_, run)| run.clone())
    }

    fn observe_run_written(&mut self, delta: &mut ModelDelta, run: Run) {
        let end = run.end().max(run.start + 1);
        let overlapping: Vec<usize> = self
            .runs
            .range(..end)
            .filter(|(_, existing)| existing.end().max(existing.start + 1) > run.start)
            .map(|(start, _)| *start)
            .collect();

        let mut removed = Vec::with_capacity(overlapping.len());
        let mut sources = run.pointer_sources.clone();
        for start in overlapping {
            if let Some(existing) = self.runs.remove(&start) {
                if existing.start == run.start {
                    sources.extend(existing.pointer_sources.iter().copied());
                }
                removed.push(existing);
            }
        }

        tracing::debug!(
            "Run written at {:06X} ({} bytes, replaced {})",
            run.start,
            run.length,
            removed.len()
        );
        delta.record_run(run.start, removed);
        let start = run.start;
        self.runs.insert(
            start,
            Run {
                pointer_sources: sources,
                ..run
            },
        );
    }

    fn clear_run(&mut self, start: usize) -> Option<Run> {
        self.runs.remove(&start)
    }

    fn add_pointer_source(&mut self, start: usize, source: usize) -> bool {
        match self.runs.get_mut(&start) {
            Some(run) => {
                run.pointer_sources.insert(source);
                true
            }
            None => false,
        }
    }
}

impl OptionProvider for MemoryModel {
    fn options_for(&self, table: &str) -> Vec<String> {
        match self.lists.get(table) {
            Some(options) => options.clone(),
            None => self.options_from_table(table),
        }
    }

    fn bit_options_for(&self, table: &str) -> Vec<String> {
        self.bit_lists.get(table).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcs;

    #[test]
    fn test_anchor_names_are_unique() {
        let mut model = MemoryModel::new(vec![0; 16]);
        model.add_anchor("items", 4);
        model.add_anchor("moves", 4);
        assert_eq!(model.address_for_name("items"), None);
        assert_eq!(model.address_for_name("moves"), Some(4));
        assert_eq!(model.name_for_address(4).as_deref(), Some("moves"));
    }

    #[test]
    fn test_run_at_or_after_prefers_containing_run() {
        let mut model = MemoryModel::new(vec![0; 64]);
        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::text(8, 8));
        model.observe_run_written(&mut delta, Run::text(32, 4));

        assert_eq!(model.run_at_or_after(10).map(|run| run.start), Some(8));
        assert_eq!(model.run_at_or_after(16).map(|run| run.start), Some(32));
        assert_eq!(model.run_at_or_after(40), None);
    }

    #[test]
    fn test_overlapping_run_replaces_and_reverts() {
        let mut model = MemoryModel::new(vec![0; 64]);
        let mut setup = ModelDelta::new();
        model.observe_run_written(&mut setup, Run::text(8, 8));

        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::text(12, 8));
        assert_eq!(model.runs().count(), 1);
        assert_eq!(delta.run_changes()[0].removed.len(), 1);

        delta.revert(&mut model);
        assert_eq!(model.run_at_or_after(8).map(|run| run.length), Some(8));
    }

    #[test]
    fn test_options_from_table_text_field() {
        let mut data = vec![0u8; 16];
        let fire = pcs::encode("Fire");
        data[..fire.len()].copy_from_slice(&fire);
        let water = pcs::encode("Water");
        data[6..6 + water.len()].copy_from_slice(&water);

        let mut model = MemoryModel::new(data);
        model.add_table("types", 0, "name\"\"6", 2).unwrap();
        assert_eq!(model.options_for("types"), vec!["Fire", "Water"]);
    }
}
