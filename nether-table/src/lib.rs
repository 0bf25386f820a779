//! Nether-Table: typed table/record engine for ROM data editing
//!
//! Game ROMs store most of their data as tables: runs of fixed-size records
//! whose fields are small integers, names from some list, pointers, packed
//! colours, encoded strings or bit flags. This crate describes such tables
//! with a compact schema string and converts every field between its bytes
//! and an editable text form.
//!
//! # Key Features
//!
//! - **Schema strings**: one token per field, round-trippable (`serialize_format`)
//! - **Tolerant codecs**: rendering never fails, writes only log real changes
//! - **Fuzzy enums**: exact-then-partial matching with `~k` duplicate selection
//! - **Discriminated fields**: a field's enum table can depend on a sibling value
//! - **Deep pointers**: pointers render the data they point to, cycle safe
//!
//! # Schema Overview
//!
//! ```text
//! name""11 hp. exp:. id:|h tint:|c type.types+1 arg:|s=kind(0=moves|1=items) moves<[id. pp.]4> flags#2 flagnames
//! ```
//!
//! # Usage
//!
//! ```
//! use nether_table::{MemoryModel, ModelDelta};
//!
//! let mut model = MemoryModel::new(vec![3, 0xA0, 0x0F]);
//! model.add_list("types", vec!["Normal".into(), "Fire".into(), "Water".into()]);
//! let table = model.add_table("mons", 0, "type.types+1 id:|h", 1).unwrap();
//!
//! assert_eq!(table.element_texts(&model, 0, false).unwrap(), vec!["Water", "0FA0"]);
//!
//! let mut delta = ModelDelta::new();
//! table.write_named(&mut model, &mut delta, 0, "type", "fire").unwrap();
//! assert_eq!(model.data()[0], 2);
//! ```

pub mod bits;
mod codec;
pub mod color;
pub mod enums;
mod error;
mod memory;
mod model;
pub mod pcs;
pub mod pointer;
pub mod record;
pub mod schema;
mod segment;
mod table;

pub use error::{Result, TableError};
pub use memory::MemoryModel;
pub use model::{
    AnchorResolver, ByteChange, ByteStore, DataModel, ModelDelta, OptionProvider, POINTER_BASE, Run, RunChange,
    RunFormat, RunRegistry,
};
pub use pointer::{Depth, InProgress};
pub use schema::{InnerFormat, TableLength, parse_inner_format};
pub use segment::{ContentType, Segment, SegmentKind, SegmentList};
pub use table::{ArrayOffset, Table};

// =============================================================================
// Schema markers
// =============================================================================

/// Text field marker, followed by the byte length
pub const TEXT_MARKER: &str = "\"\"";

/// Bit array marker, followed by the byte length and the flag list name
pub const BIT_ARRAY_MARKER: char = '#';

/// Integer suffix for hex rendering
pub const HEX_FORMAT: &str = "|h";

/// Integer suffix for BGR555 colours
pub const COLOR_FORMAT: &str = "|c";

/// Integer suffix opening a discriminated field clause
pub const RECORD_FORMAT: &str = "|s=";

// =============================================================================
// Pointer text
// =============================================================================

pub const POINTER_START: char = '<';
pub const POINTER_END: char = '>';

/// Opens a deeply rendered destination
pub const DEEP_START: &str = "@{";

/// Closes a deeply rendered destination
pub const DEEP_END: &str = "@}";

/// Anchor text of the null pointer
pub const NULL_ANCHOR: &str = "null";
