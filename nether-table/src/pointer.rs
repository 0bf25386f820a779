//! Pointer rendering and destination formats
//!
//! Shallow rendering names the destination (`<anchor>` or `<0001A0>`). Deep
//! rendering also renders whatever formatted run lives at the destination,
//! wrapped in `@{ ... @}`, recursing through nested pointers. Destinations
//! currently being rendered are tracked in an [`InProgress`] set so that
//! self-referencing data falls back to shallow rendering instead of looping.
//!
//! Pointers with an inner format (`name<"">`, `name<[a. b:]4>`) also
//! describe their destination. [`reconcile`] checks or imposes that format
//! on existing data, and [`write_new_format`] creates fresh data for it.

use std::cell::RefCell;

use hashbrown::HashSet;

use crate::error::{Result, TableError};
use crate::model::{ByteStore, DataModel, ModelDelta, Run, RunFormat};
use crate::pcs;
use crate::schema::{InnerFormat, TableLength, parse_inner_format};
use crate::segment::{Segment, SegmentKind};
use crate::table::Table;
use crate::{DEEP_END, DEEP_START, NULL_ANCHOR, POINTER_END, POINTER_START};

/// Most elements scanned when looking for a table terminator
pub const MAX_STREAM_ELEMENTS: usize = 500;

/// Destinations currently being rendered deeply
#[derive(Debug, Default)]
pub struct InProgress {
    active: RefCell<HashSet<usize>>,
}

impl InProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `address`. Returns `None` if it is already claimed. The claim
    /// is released when the guard drops, on every exit path.
    pub fn enter(&self, address: usize) -> Option<InProgressGuard<'_>> {
        if !self.active.borrow_mut().insert(address) {
            return None;
        }
        Some(InProgressGuard {
            owner: self,
            address,
        })
    }

    pub fn contains(&self, address: usize) -> bool {
        self.active.borrow().contains(&address)
    }

    pub fn is_empty(&self) -> bool {
        self.active.borrow().is_empty()
    }
}

/// Releases an [`InProgress`] claim on drop
#[derive(Debug)]
pub struct InProgressGuard<'a> {
    owner: &'a InProgress,
    address: usize,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.owner.active.borrow_mut().remove(&self.address);
    }
}

/// How far pointer rendering recurses
#[derive(Debug, Clone, Copy)]
pub enum Depth<'a> {
    Shallow,
    Deep(&'a InProgress),
}

/// Render a pointer to `destination`.
pub fn render<M: DataModel + ?Sized>(model: &M, destination: Option<usize>, depth: Depth<'_>) -> String {
    let shallow = shallow_text(model, destination);
    let (Depth::Deep(in_progress), Some(destination)) = (depth, destination) else {
        return shallow;
    };
    let Some(run) = model
        .run_at_or_after(destination)
        .filter(|run| run.start == destination && run.is_appendable())
    else {
        return shallow;
    };
    let Some(_guard) = in_progress.enter(destination) else {
        tracing::debug!("Pointer cycle at {:06X}, rendering shallow", destination);
        return shallow;
    };

    let mut builder = format!("{DEEP_START} ");
    append_run(model, &run, &mut builder, depth);
    builder.push(' ');
    builder.push_str(DEEP_END);
    builder
}

fn shallow_text<M: DataModel + ?Sized>(model: &M, destination: Option<usize>) -> String {
    let anchor = match destination {
        None => NULL_ANCHOR.to_string(),
        Some(address) => model
            .name_for_address(address)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("{address:06X}")),
    };
    format!("{POINTER_START}{anchor}{POINTER_END}")
}

/// Append the text form of an appendable run.
pub fn append_run<M: DataModel + ?Sized>(model: &M, run: &Run, out: &mut String, depth: Depth<'_>) {
    match &run.format {
        RunFormat::Text => out.push_str(&pcs::read(model, run.start, run.length)),
        RunFormat::Table { .. } => {
            if let Some(table) = run.as_table() {
                table.append_to(model, out, depth);
            }
        }
        RunFormat::NoInfo | RunFormat::Pointer => {}
    }
}

/// Resolve pointer text (`<name>`, `<0001A0>`, `<null>`) to a destination.
///
/// Anchor names are tried before hex so that names which happen to be
/// valid hex still resolve to their anchor.
pub fn parse_destination<M: DataModel + ?Sized>(model: &M, text: &str) -> Result<Option<usize>> {
    let text = text.trim();
    let text = text.strip_prefix(POINTER_START).unwrap_or(text);
    let text = text.strip_suffix(POINTER_END).unwrap_or(text).trim();

    if text.is_empty() || text.eq_ignore_ascii_case(NULL_ANCHOR) {
        return Ok(None);
    }
    if let Some(address) = model.address_for_name(text) {
        return Ok(Some(address));
    }
    usize::from_str_radix(text, 16)
        .map(Some)
        .map_err(|_| TableError::UnresolvedAnchor(text.to_string()))
}

/// Write pointer text into the 4 bytes at `offset`.
pub fn write_text<M: DataModel + ?Sized>(model: &mut M, delta: &mut ModelDelta, offset: usize, text: &str) -> Result<()> {
    let destination = parse_destination(&*model, text)?;
    if model.read_pointer(offset) != destination {
        model.write_pointer(delta, offset, destination);
    }
    Ok(())
}

fn inner_format(segment: &Segment) -> Result<Option<InnerFormat>> {
    match &segment.kind {
        SegmentKind::Pointer { inner } => parse_inner_format(inner),
        _ => Ok(None),
    }
}

/// Check that the data at `destination` matches the pointer's inner format,
/// imposing the format if the destination has none yet. A destination that
/// already holds some other format is left alone and reported as a mismatch.
///
/// `source` is the address of the pointer itself, `siblings` the field list
/// of the record holding it and `parent_index` that record's element index.
/// Imposing a format only attaches metadata; no bytes are written.
pub fn reconcile<M: DataModel + ?Sized>(
    model: &mut M,
    delta: &mut ModelDelta,
    segment: &Segment,
    source: usize,
    destination: Option<usize>,
    siblings: &[Segment],
    parent_index: usize,
) -> bool {
    let Some(destination) = destination else {
        return true;
    };
    let format = inner_format(segment).ok().flatten();

    match model.run_at_or_after(destination) {
        Some(run) if run.start < destination => {
            tracing::debug!(
                "{}[{}]: destination {:06X} is inside the run at {:06X}",
                segment.name,
                parent_index,
                destination,
                run.start
            );
            false
        }
        Some(run) if run.start == destination && !run.is_placeholder() => {
            let matches = format.is_some_and(|format| format.matches(&run));
            if matches {
                model.add_pointer_source(destination, source);
            } else {
                tracing::debug!(
                    "{}[{}]: {:06X} already holds a different format",
                    segment.name,
                    parent_index,
                    destination
                );
            }
            matches
        }
        _ => {
            if destination >= model.len() {
                let error = TableError::OutOfRangeDestination {
                    address: destination,
                    len: model.len(),
                };
                tracing::debug!("{}[{}]: {}", segment.name, parent_index, error);
                return false;
            }
            format.is_some_and(|format| {
                format.try_add_format_at_destination(model, delta, source, destination, &segment.name, siblings)
            })
        }
    }
}

/// Point `source` at `destination` and create new data there in the
/// pointer's inner format. The new run's back-references include `source`.
pub fn write_new_format<M: DataModel + ?Sized>(
    model: &mut M,
    delta: &mut ModelDelta,
    segment: &Segment,
    source: usize,
    destination: usize,
    siblings: &[Segment],
) -> Result<Run> {
    let format = inner_format(segment)?.ok_or_else(|| TableError::UnknownInnerFormat(String::new()))?;
    let length = format.new_run_length(&*model, source, &segment.name, siblings);
    if destination.saturating_add(length) > model.len() {
        return Err(TableError::OutOfRangeDestination {
            address: destination,
            len: model.len(),
        });
    }

    model.write_pointer(delta, source, Some(destination));
    let run = format.write_new_run(model, delta, source, destination, &segment.name, siblings);
    model.observe_run_written(delta, run.clone().merge_source(source));
    Ok(run.merge_source(source))
}

impl InnerFormat {
    /// Whether an existing run already has this format
    pub fn matches(&self, run: &Run) -> bool {
        match (self, &run.format) {
            (InnerFormat::Text, RunFormat::Text) => true,
            (
                InnerFormat::Table { segments, length },
                RunFormat::Table {
                    segments: existing,
                    element_count,
                },
            ) => {
                segments == existing
                    && match length {
                        TableLength::Fixed(count) => count == element_count,
                        TableLength::Sibling(_) | TableLength::Terminated => true,
                    }
            }
            _ => false,
        }
    }

    /// Attach this format to the existing bytes at `destination`, if they
    /// fit it. Returns whether the format was attached.
    pub fn try_add_format_at_destination<M: DataModel + ?Sized>(
        &self,
        model: &mut M,
        delta: &mut ModelDelta,
        source: usize,
        destination: usize,
        name: &str,
        siblings: &[Segment],
    ) -> bool {
        let run = match self {
            InnerFormat::Text => {
                let Some(length) = pcs::string_length(&*model, destination, pcs::MAX_STRING_SEARCH) else {
                    return false;
                };
                Run::text(destination, length)
            }
            InnerFormat::Table { segments, length } => {
                let table = Table::new(destination, segments.clone(), 0);
                let count = match length {
                    TableLength::Fixed(count) => Some(*count),
                    TableLength::Sibling(field) => sibling_value(&*model, source, name, siblings, field),
                    TableLength::Terminated => terminated_count(&*model, &table),
                };
                let Some(count) = count else {
                    return false;
                };
                Table::new(destination, segments.clone(), count).to_run()
            }
        };

        if run.end() > model.len() || !range_is_free(&*model, destination, run.end()) {
            return false;
        }
        tracing::debug!(
            "{}: imposing format at {:06X} ({} bytes)",
            name,
            destination,
            run.length
        );
        model.observe_run_written(delta, run.merge_source(source));
        true
    }

    /// Bytes a freshly written run of this format occupies
    fn new_run_length<M: DataModel + ?Sized>(&self, model: &M, source: usize, name: &str, siblings: &[Segment]) -> usize {
        match self {
            InnerFormat::Text => 1,
            InnerFormat::Table { segments, length } => {
                let stride: usize = segments.iter().map(|segment| segment.length).sum();
                let count = match length {
                    TableLength::Fixed(count) => *count,
                    TableLength::Sibling(field) => sibling_value(model, source, name, siblings, field).unwrap_or(0),
                    TableLength::Terminated => 1,
                };
                stride * count
            }
        }
    }

    /// Write empty data for this format at `destination`.
    ///
    /// Text becomes an empty string; fixed tables are zero filled; streams
    /// get a single terminator element.
    pub fn write_new_run<M: DataModel + ?Sized>(
        &self,
        model: &mut M,
        delta: &mut ModelDelta,
        source: usize,
        destination: usize,
        name: &str,
        siblings: &[Segment],
    ) -> Run {
        let length = self.new_run_length(&*model, source, name, siblings);
        match self {
            InnerFormat::Text => {
                delta.change_data(model, destination, pcs::TERMINATOR);
                Run::text(destination, length)
            }
            InnerFormat::Table {
                segments,
                length: table_length,
            } => {
                let fill = match table_length {
                    TableLength::Terminated => 0xFF,
                    TableLength::Fixed(_) | TableLength::Sibling(_) => 0x00,
                };
                for address in destination..destination + length {
                    delta.change_data(model, address, fill);
                }
                let stride: usize = segments.iter().map(|segment| segment.length).sum();
                let count = if stride == 0 { 0 } else { length / stride };
                Table::new(destination, segments.clone(), count).to_run()
            }
        }
    }
}

/// Value of the sibling field `field` in the record holding the pointer
/// named `name` at `source`.
fn sibling_value<M: ByteStore + ?Sized>(model: &M, source: usize, name: &str, siblings: &[Segment], field: &str) -> Option<usize> {
    let offset_of = |wanted: &str| {
        let index = siblings.iter().position(|segment| segment.name == wanted)?;
        Some((index, siblings[..index].iter().map(|segment| segment.length).sum::<usize>()))
    };
    let (_, pointer_offset) = offset_of(name)?;
    let (field_index, field_offset) = offset_of(field)?;
    let record_start = source.checked_sub(pointer_offset)?;
    Some(model.read_multi_byte(record_start + field_offset, siblings[field_index].length) as usize)
}

/// Elements up to and including the first all-0xFF element
fn terminated_count<M: ByteStore + ?Sized>(model: &M, table: &Table) -> Option<usize> {
    let stride = table.element_length();
    if stride == 0 {
        return None;
    }
    (0..MAX_STREAM_ELEMENTS)
        .map(|index| table.start + index * stride)
        .take_while(|start| start + stride <= model.len())
        .position(|start| (start..start + stride).all(|address| model.byte(address) == 0xFF))
        .map(|index| index + 1)
}

/// No formatted run other than one starting at `start` overlaps `start..end`.
fn range_is_free<M: DataModel + ?Sized>(model: &M, start: usize, end: usize) -> bool {
    let mut cursor = start;
    while cursor < end {
        let Some(run) = model.run_at_or_after(cursor) else {
            return true;
        };
        if run.start >= end {
            return true;
        }
        if run.start != start && !run.is_placeholder() {
            return false;
        }
        cursor = run.end().max(run.start + 1).max(cursor + 1);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;
    use crate::model::{AnchorResolver, RunRegistry};

    #[test]
    fn test_guard_releases_on_drop() {
        let in_progress = InProgress::new();
        {
            let _guard = in_progress.enter(4).unwrap();
            assert!(in_progress.contains(4));
            assert!(in_progress.enter(4).is_none());
        }
        assert!(in_progress.is_empty());
        assert!(in_progress.enter(4).is_some());
    }

    #[test]
    fn test_shallow_render() {
        let mut model = MemoryModel::new(vec![0; 0x200]);
        model.add_anchor("items", 0x100);
        assert_eq!(render(&model, Some(0x100), Depth::Shallow), "<items>");
        assert_eq!(render(&model, Some(0x1A0), Depth::Shallow), "<0001A0>");
        assert_eq!(render(&model, None, Depth::Shallow), "<null>");
    }

    #[test]
    fn test_deep_render_text() {
        let mut data = vec![0u8; 0x40];
        data[0x20..0x23].copy_from_slice(&[0xBB, 0xBC, 0xFF]);
        let mut model = MemoryModel::new(data);
        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::text(0x20, 3));

        let in_progress = InProgress::new();
        assert_eq!(
            render(&model, Some(0x20), Depth::Deep(&in_progress)),
            "@{ \"AB\" @}"
        );
        assert!(in_progress.is_empty());
    }

    #[test]
    fn test_parse_destination() {
        let mut model = MemoryModel::new(vec![0; 0x200]);
        model.add_anchor("bead", 0x40);
        assert_eq!(parse_destination(&model, "<bead>"), Ok(Some(0x40)));
        assert_eq!(parse_destination(&model, " <0001A0> "), Ok(Some(0x1A0)));
        assert_eq!(parse_destination(&model, "<null>"), Ok(None));
        assert_eq!(parse_destination(&model, "<>"), Ok(None));
        assert_eq!(
            parse_destination(&model, "<missing>"),
            Err(TableError::UnresolvedAnchor("missing".into()))
        );
    }

    #[test]
    fn test_parse_destination_prefers_hex_looking_anchor() {
        let mut model = MemoryModel::new(vec![0; 0x200]);
        model.add_anchor("0040", 0x10);
        assert_eq!(parse_destination(&model, "<0040>"), Ok(Some(0x10)));
        assert_eq!(parse_destination(&model, "<000040>"), Ok(Some(0x40)));
    }

    #[test]
    fn test_reconcile_null_is_valid() {
        let mut model = MemoryModel::new(vec![0; 16]);
        let mut delta = ModelDelta::new();
        let segment = Segment::pointer("text", "\"\"");
        assert!(reconcile(&mut model, &mut delta, &segment, 0, None, &[segment.clone()], 0));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_reconcile_imposes_text_without_writing() {
        let mut data = vec![0u8; 0x40];
        data[0x10..0x13].copy_from_slice(&[0xBB, 0xBC, 0xFF]);
        let mut model = MemoryModel::new(data.clone());
        let mut delta = ModelDelta::new();
        let segment = Segment::pointer("text", "\"\"");

        assert!(reconcile(&mut model, &mut delta, &segment, 0, Some(0x10), &[segment.clone()], 0));
        assert!(delta.changes().is_empty());
        assert_eq!(model.data(), &data[..]);
        let run = model.run_at_or_after(0x10).unwrap();
        assert_eq!((run.start, run.length, run.format), (0x10, 3, RunFormat::Text));
        assert!(run.pointer_sources.contains(&0));
    }

    #[test]
    fn test_reconcile_replaces_placeholder() {
        let mut data = vec![0u8; 0x40];
        data[0x10] = 0xFF;
        let mut model = MemoryModel::new(data);
        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::no_info(0x10));
        let segment = Segment::pointer("text", "\"\"");

        assert!(reconcile(&mut model, &mut delta, &segment, 0, Some(0x10), &[segment.clone()], 0));
        assert_eq!(model.run_at_or_after(0x10).map(|run| run.format), Some(RunFormat::Text));
    }

    #[test]
    fn test_reconcile_accepts_matching_run() {
        let mut model = MemoryModel::new(vec![0xFF; 0x40]);
        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::text(0x10, 1));
        let segment = Segment::pointer("text", "\"\"");

        assert!(reconcile(&mut model, &mut delta, &segment, 4, Some(0x10), &[segment.clone()], 0));
        assert!(model.run_at_or_after(0x10).unwrap().pointer_sources.contains(&4));
    }

    #[test]
    fn test_reconcile_rejects_interior_and_out_of_range() {
        let mut model = MemoryModel::new(vec![0xFF; 0x40]);
        let mut delta = ModelDelta::new();
        model.observe_run_written(&mut delta, Run::text(0x10, 8));
        let segment = Segment::pointer("text", "\"\"");

        assert!(!reconcile(&mut model, &mut delta, &segment, 0, Some(0x12), &[segment.clone()], 0));
        assert!(!reconcile(&mut model, &mut delta, &segment, 0, Some(0x400), &[segment.clone()], 0));
    }

    #[test]
    fn test_reconcile_table_from_sibling_count() {
        let mut data = vec![0u8; 0x40];
        data[0] = 3; // count
        let mut model = MemoryModel::new(data);
        let mut delta = ModelDelta::new();
        let siblings = crate::schema::parse("count. moves<[id. pp.]count>").unwrap();

        assert!(reconcile(&mut model, &mut delta, &siblings[1], 1, Some(0x20), &siblings, 0));
        let table = model.run_at_or_after(0x20).and_then(|run| run.as_table()).unwrap();
        assert_eq!(table.element_count, 3);
        assert_eq!(table.length(), 6);
    }

    #[test]
    fn test_write_new_format_stream() {
        let mut model = MemoryModel::new(vec![0u8; 0x40]);
        let mut delta = ModelDelta::new();
        let segment = Segment::pointer("moves", "[id. pp.]");

        let run = write_new_format(&mut model, &mut delta, &segment, 0, 0x20, &[segment.clone()]).unwrap();
        assert_eq!(model.read_pointer(0), Some(0x20));
        assert_eq!(&model.data()[0x20..0x22], &[0xFF, 0xFF]);
        assert_eq!(run.length, 2);
        let stored = model.run_at_or_after(0x20).unwrap();
        assert!(stored.pointer_sources.contains(&0));
        assert_eq!(model.name_for_address(0x20), None);
    }

    #[test]
    fn test_write_new_format_out_of_range() {
        let mut model = MemoryModel::new(vec![0u8; 0x10]);
        let mut delta = ModelDelta::new();
        let segment = Segment::pointer("moves", "[id. pp.]4");
        assert!(matches!(
            write_new_format(&mut model, &mut delta, &segment, 0, 0x0C, &[segment.clone()]),
            Err(TableError::OutOfRangeDestination { .. })
        ));
        assert!(delta.is_empty());
    }
}
