//! Fixed-stride tables
//!
//! A [`Table`] is a run of `element_count` records laid out back to back,
//! every record sharing one segment list.

use std::borrow::Cow;

use crate::error::{Result, TableError};
use crate::model::{ByteStore, DataModel, ModelDelta, Run, RunFormat};
use crate::pointer::{self, Depth, InProgress};
use crate::record;
use crate::segment::{Segment, SegmentKind, SegmentList};

/// Position of an address inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayOffset {
    pub element_index: usize,
    pub segment_index: usize,
    /// Byte offset inside the segment
    pub segment_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub start: usize,
    pub element_count: usize,
    pub segments: SegmentList,
}

impl Table {
    pub fn new(start: usize, segments: impl Into<SegmentList>, element_count: usize) -> Self {
        Self {
            start,
            element_count,
            segments: segments.into(),
        }
    }

    /// Bytes per element
    pub fn element_length(&self) -> usize {
        self.segments.iter().map(|segment| segment.length).sum()
    }

    /// Bytes covered by the whole table
    pub fn length(&self) -> usize {
        self.element_length() * self.element_count
    }

    pub fn to_run(&self) -> Run {
        Run::new(
            self.start,
            self.length(),
            RunFormat::Table {
                segments: self.segments.clone(),
                element_count: self.element_count,
            },
        )
    }

    pub fn segment_index(&self, name: &str) -> Result<usize> {
        self.segments
            .iter()
            .position(|segment| segment.name == name)
            .ok_or_else(|| TableError::UnknownField(name.to_string()))
    }

    /// Offset of a segment from the start of its element
    pub fn segment_offset(&self, segment_index: usize) -> usize {
        self.segments[..segment_index.min(self.segments.len())]
            .iter()
            .map(|segment| segment.length)
            .sum()
    }

    pub fn element_start(&self, element: usize) -> usize {
        self.start + element * self.element_length()
    }

    /// Address of one field of one element
    pub fn field_address(&self, element: usize, segment_index: usize) -> usize {
        self.element_start(element) + self.segment_offset(segment_index)
    }

    /// Which element and field `address` falls in, if it is inside the table.
    pub fn convert_byte_offset(&self, address: usize) -> Option<ArrayOffset> {
        let stride = self.element_length();
        if stride == 0 || address < self.start || address >= self.start + self.length() {
            return None;
        }
        let offset = address - self.start;
        let element_index = offset / stride;
        let mut segment_offset = offset % stride;
        for (segment_index, segment) in self.segments.iter().enumerate() {
            if segment_offset < segment.length {
                return Some(ArrayOffset {
                    element_index,
                    segment_index,
                    segment_offset,
                });
            }
            segment_offset -= segment.length;
        }
        None
    }

    fn check_element(&self, element: usize) -> Result<()> {
        if element >= self.element_count {
            return Err(TableError::ElementOutOfRange {
                index: element,
                count: self.element_count,
            });
        }
        Ok(())
    }

    /// The segment as it behaves in `element`, with record fields resolved.
    pub fn concrete_segment<M: ByteStore + ?Sized>(&self, model: &M, element: usize, segment_index: usize) -> Cow<'_, Segment> {
        record::resolve_concrete(
            &self.segments[segment_index],
            &self.segments,
            self.element_start(element),
            model,
        )
    }

    /// Render one field of one element.
    pub fn field_text<M: DataModel + ?Sized>(&self, model: &M, element: usize, segment_index: usize, deep: bool) -> Result<String> {
        self.check_element(element)?;
        if segment_index >= self.segments.len() {
            return Err(TableError::UnknownField(segment_index.to_string()));
        }
        let address = self.field_address(element, segment_index);
        Ok(self
            .concrete_segment(model, element, segment_index)
            .to_text(model, address, deep))
    }

    /// Render every field of one element, in schema order.
    pub fn element_texts<M: DataModel + ?Sized>(&self, model: &M, element: usize, deep: bool) -> Result<Vec<String>> {
        self.check_element(element)?;
        if deep {
            let in_progress = InProgress::new();
            Ok(self.render_element(model, element, Depth::Deep(&in_progress)))
        } else {
            Ok(self.render_element(model, element, Depth::Shallow))
        }
    }

    fn render_element<M: DataModel + ?Sized>(&self, model: &M, element: usize, depth: Depth<'_>) -> Vec<String> {
        (0..self.segments.len())
            .map(|index| {
                self.concrete_segment(model, element, index)
                    .render(model, self.field_address(element, index), depth)
            })
            .collect()
    }

    /// Append every element as `[field field ...]`, separated by spaces.
    pub fn append_to<M: DataModel + ?Sized>(&self, model: &M, out: &mut String, depth: Depth<'_>) {
        for element in 0..self.element_count {
            if element > 0 {
                out.push(' ');
            }
            out.push('[');
            out.push_str(&self.render_element(model, element, depth).join(" "));
            out.push(']');
        }
    }

    /// Parse `text` into one field of one element.
    ///
    /// After a pointer with an inner format is written, its destination is
    /// checked against that format and the format is imposed if the
    /// destination has none. A destination that cannot take the format is
    /// logged; the pointer itself is still written.
    pub fn write_field<M: DataModel + ?Sized>(
        &self,
        model: &mut M,
        delta: &mut ModelDelta,
        element: usize,
        segment_index: usize,
        text: &str,
    ) -> Result<()> {
        self.check_element(element)?;
        if segment_index >= self.segments.len() {
            return Err(TableError::UnknownField(segment_index.to_string()));
        }
        let address = self.field_address(element, segment_index);
        let segment = self.concrete_segment(&*model, element, segment_index).into_owned();
        segment.write(model, delta, address, text)?;

        if let SegmentKind::Pointer { inner } = &segment.kind {
            if inner.is_empty() {
                return Ok(());
            }
            let destination = model.read_pointer(address);
            if !pointer::reconcile(model, delta, &segment, address, destination, &self.segments, element) {
                tracing::warn!(
                    "{}[{}]: destination does not match format <{}>",
                    segment.name,
                    element,
                    inner
                );
            }
        }
        Ok(())
    }

    /// Write a field by name.
    pub fn write_named<M: DataModel + ?Sized>(
        &self,
        model: &mut M,
        delta: &mut ModelDelta,
        element: usize,
        field: &str,
        text: &str,
    ) -> Result<()> {
        let index = self.segment_index(field)?;
        self.write_field(model, delta, element, index, text)
    }
}
