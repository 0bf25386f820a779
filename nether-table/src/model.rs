//! Collaborator interfaces the table engine consumes
//!
//! The engine never owns the ROM bytes. It reads and writes through these
//! traits, and every byte it changes goes through a [`ModelDelta`] so the
//! caller can undo the edit and observe what changed.

use std::collections::BTreeSet;

use crate::segment::SegmentList;
use crate::table::Table;

/// GBA ROM pointers are stored with the cartridge base added.
pub const POINTER_BASE: u32 = 0x0800_0000;

/// Byte-addressable storage.
pub trait ByteStore {
    /// Total number of bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one byte. Addresses past the end read as zero.
    fn byte(&self, address: usize) -> u8;

    /// Raw byte write. Engine code goes through [`ModelDelta::change_data`].
    fn set_byte(&mut self, address: usize, value: u8);

    /// Little-endian unsigned read of `length` bytes (1-4)
    fn read_multi_byte(&self, address: usize, length: usize) -> u32 {
        (0..length.min(4)).fold(0u32, |value, i| {
            value | (self.byte(address + i) as u32) << (8 * i)
        })
    }

    /// Little-endian write of the low `length` bytes of `value`.
    /// Only bytes whose value changes reach the delta.
    fn write_multi_byte(&mut self, delta: &mut ModelDelta, address: usize, length: usize, value: u32) {
        for i in 0..length.min(4) {
            let byte = (value >> (8 * i)) as u8;
            delta.change_data(self, address + i, byte);
        }
    }

    /// Read a 4-byte pointer. `None` is the null pointer (stored as zero).
    fn read_pointer(&self, address: usize) -> Option<usize> {
        match self.read_multi_byte(address, 4) {
            0 => None,
            stored => Some(stored.wrapping_sub(POINTER_BASE) as usize),
        }
    }

    fn write_pointer(&mut self, delta: &mut ModelDelta, address: usize, destination: Option<usize>) {
        let stored = match destination {
            Some(destination) => (destination as u32).wrapping_add(POINTER_BASE),
            None => 0,
        };
        self.write_multi_byte(delta, address, 4, stored);
    }
}

/// Named addresses
pub trait AnchorResolver {
    fn address_for_name(&self, name: &str) -> Option<usize>;
    fn name_for_address(&self, address: usize) -> Option<String>;
}

/// Interpretation metadata attached to address ranges.
pub trait RunRegistry {
    /// The run containing `address`, or failing that the first run starting
    /// after it.
    fn run_at_or_after(&self, address: usize) -> Option<Run>;

    /// Attach a run, replacing any runs it overlaps. Replaced runs are
    /// recorded in the delta.
    fn observe_run_written(&mut self, delta: &mut ModelDelta, run: Run);

    /// Detach the run starting exactly at `start`.
    fn clear_run(&mut self, start: usize) -> Option<Run>;

    /// Add a pointer source to the back-reference set of the run starting at
    /// `start`. Returns false if no run starts there.
    fn add_pointer_source(&mut self, start: usize, source: usize) -> bool;
}

/// Name lists for enum and bit-flag fields
pub trait OptionProvider {
    fn options_for(&self, table: &str) -> Vec<String>;
    fn bit_options_for(&self, table: &str) -> Vec<String>;
}

/// Everything the engine needs from its environment.
pub trait DataModel: ByteStore + AnchorResolver + RunRegistry + OptionProvider {}

impl<T: ByteStore + AnchorResolver + RunRegistry + OptionProvider + ?Sized> DataModel for T {}

// =============================================================================
// Runs
// =============================================================================

/// What a run's bytes mean
#[derive(Debug, Clone, PartialEq)]
pub enum RunFormat {
    /// Known to be referenced, nothing else
    NoInfo,
    /// A bare pointer destination with no format
    Pointer,
    /// 0xFF-terminated text
    Text,
    /// Fixed-stride records
    Table {
        segments: SegmentList,
        element_count: usize,
    },
}

/// A formatted address range
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub start: usize,
    pub length: usize,
    pub format: RunFormat,
    /// Addresses of pointers known to point at `start`
    pub pointer_sources: BTreeSet<usize>,
}

impl Run {
    pub fn new(start: usize, length: usize, format: RunFormat) -> Self {
        Self {
            start,
            length,
            format,
            pointer_sources: BTreeSet::new(),
        }
    }

    pub fn text(start: usize, length: usize) -> Self {
        Self::new(start, length, RunFormat::Text)
    }

    /// Referenced address with no other format
    pub fn no_info(start: usize) -> Self {
        Self::new(start, 0, RunFormat::NoInfo)
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, address: usize) -> bool {
        self.start <= address && address < self.end()
    }

    /// Whether the run can be re-serialized as text for deep formatting
    pub fn is_appendable(&self) -> bool {
        matches!(self.format, RunFormat::Text | RunFormat::Table { .. })
    }

    /// Placeholder runs carry no format worth preserving
    pub fn is_placeholder(&self) -> bool {
        matches!(self.format, RunFormat::NoInfo | RunFormat::Pointer)
    }

    /// View a table run as a [`Table`]
    pub fn as_table(&self) -> Option<Table> {
        match &self.format {
            RunFormat::Table {
                segments,
                element_count,
            } => Some(Table::new(self.start, segments.clone(), *element_count)),
            _ => None,
        }
    }

    /// Add a pointer source to the back-reference set
    pub fn merge_source(mut self, source: usize) -> Self {
        self.pointer_sources.insert(source);
        self
    }
}

// =============================================================================
// Mutation log
// =============================================================================

/// One logged byte write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteChange {
    pub address: usize,
    pub old: u8,
    pub new: u8,
}

/// One logged run attachment
#[derive(Debug, Clone, PartialEq)]
pub struct RunChange {
    /// Start of the attached run
    pub added: usize,
    /// Runs removed to make room for it
    pub removed: Vec<Run>,
}

/// Append-only record of every change made during one edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDelta {
    changes: Vec<ByteChange>,
    runs: Vec<RunChange>,
}

impl ModelDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one byte, logging it if the value actually changes.
    ///
    /// Returns whether a change was made. Writes past the end of the data
    /// are dropped.
    pub fn change_data<M: ByteStore + ?Sized>(&mut self, model: &mut M, address: usize, value: u8) -> bool {
        if address >= model.len() {
            tracing::warn!("Dropped write past end of data at {:06X}", address);
            return false;
        }
        let old = model.byte(address);
        if old == value {
            return false;
        }
        model.set_byte(address, value);
        self.changes.push(ByteChange {
            address,
            old,
            new: value,
        });
        true
    }

    pub fn record_run(&mut self, added: usize, removed: Vec<Run>) {
        self.runs.push(RunChange { added, removed });
    }

    pub fn changes(&self) -> &[ByteChange] {
        &self.changes
    }

    pub fn run_changes(&self) -> &[RunChange] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.runs.is_empty()
    }

    /// Undo every logged change, newest first.
    pub fn revert<M: ByteStore + RunRegistry + ?Sized>(self, model: &mut M) {
        for change in self.changes.iter().rev() {
            model.set_byte(change.address, change.old);
        }
        let mut scratch = ModelDelta::new();
        for change in self.runs.into_iter().rev() {
            model.clear_run(change.added);
            for run in change.removed {
                model.observe_run_written(&mut scratch, run);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;

    #[test]
    fn test_read_multi_byte_little_endian() {
        let model = MemoryModel::new(vec![0xA0, 0x0F, 0x01, 0x00]);
        assert_eq!(model.read_multi_byte(0, 1), 0xA0);
        assert_eq!(model.read_multi_byte(0, 2), 4000);
        assert_eq!(model.read_multi_byte(0, 3), 0x010FA0);
    }

    #[test]
    fn test_write_logs_only_changed_bytes() {
        let mut model = MemoryModel::new(vec![0x34, 0x12, 0x00, 0x00]);
        let mut delta = ModelDelta::new();
        model.write_multi_byte(&mut delta, 0, 4, 0x0001_1234);
        assert_eq!(
            delta.changes(),
            &[ByteChange {
                address: 2,
                old: 0,
                new: 1
            }]
        );

        let mut again = ModelDelta::new();
        model.write_multi_byte(&mut again, 0, 4, 0x0001_1234);
        assert!(again.is_empty());
    }

    #[test]
    fn test_pointer_round_trip() {
        let mut model = MemoryModel::new(vec![0; 8]);
        let mut delta = ModelDelta::new();
        model.write_pointer(&mut delta, 0, Some(0x123456));
        assert_eq!(model.read_multi_byte(0, 4), 0x0812_3456);
        assert_eq!(model.read_pointer(0), Some(0x123456));
        assert_eq!(model.read_pointer(4), None);
    }

    #[test]
    fn test_revert_restores_bytes() {
        let mut model = MemoryModel::new(vec![1, 2, 3]);
        let mut delta = ModelDelta::new();
        delta.change_data(&mut model, 0, 9);
        delta.change_data(&mut model, 0, 8);
        delta.change_data(&mut model, 2, 7);
        delta.revert(&mut model);
        assert_eq!(model.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_write_past_end_is_dropped() {
        let mut model = MemoryModel::new(vec![0; 2]);
        let mut delta = ModelDelta::new();
        assert!(!delta.change_data(&mut model, 2, 1));
        assert!(delta.is_empty());
    }
}
