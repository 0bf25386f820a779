//! Field text conversion
//!
//! Rendering never fails: unreadable values fall back to a raw numeric or
//! quoted form. Writing reports errors only for enum text that matches no
//! option and for pointer text naming an unknown anchor. Other unparseable
//! text is written as zero.
//!
//! Enum values outside their option list render as the option index they
//! would have (stored value minus the offset), the same form numeric input
//! takes, so they survive a write back.

use crate::bits;
use crate::color;
use crate::enums;
use crate::error::{Result, TableError};
use crate::model::{DataModel, ModelDelta};
use crate::pcs;
use crate::pointer::{self, Depth, InProgress};
use crate::segment::{Segment, SegmentKind};

impl Segment {
    /// Render the field stored at `offset`.
    ///
    /// With `deep` set, pointers also render the formatted data they point
    /// to. Record fields render as plain integers here; use
    /// [`Table::field_text`](crate::Table::field_text) to resolve them.
    pub fn to_text<M: DataModel + ?Sized>(&self, model: &M, offset: usize, deep: bool) -> String {
        if deep {
            let in_progress = InProgress::new();
            self.render(model, offset, Depth::Deep(&in_progress))
        } else {
            self.render(model, offset, Depth::Shallow)
        }
    }

    pub(crate) fn render<M: DataModel + ?Sized>(&self, model: &M, offset: usize, depth: Depth<'_>) -> String {
        match &self.kind {
            SegmentKind::Text => pcs::read(model, offset, self.length),
            SegmentKind::Integer | SegmentKind::Record { .. } => model.read_multi_byte(offset, self.length).to_string(),
            SegmentKind::Hex => {
                let value = model.read_multi_byte(offset, self.length);
                format!("{value:0width$X}", width = self.length * 2)
            }
            SegmentKind::Color => color::decode(model.read_multi_byte(offset, 2) as u16),
            SegmentKind::Enum { table, value_offset } => {
                let index = model.read_multi_byte(offset, self.length) as i64 - value_offset;
                let options = enums::options_for_enum(model, table);
                enums::decode(&options, index).unwrap_or_else(|| index.to_string())
            }
            SegmentKind::Pointer { .. } => pointer::render(model, model.read_pointer(offset), depth),
            SegmentKind::BitArray { source } => {
                let bytes: Vec<u8> = (offset..offset + self.length).map(|address| model.byte(address)).collect();
                bits::render(&bytes, &model.bit_options_for(source))
            }
        }
    }

    /// Parse `text` and store it at `offset`, logging changed bytes in `delta`.
    pub fn write<M: DataModel + ?Sized>(&self, model: &mut M, delta: &mut ModelDelta, offset: usize, text: &str) -> Result<()> {
        match &self.kind {
            SegmentKind::Text => {
                let mut bytes = pcs::encode(text);
                bytes.truncate(self.length);
                if !bytes.contains(&pcs::TERMINATOR) {
                    if let Some(last) = bytes.last_mut() {
                        *last = pcs::TERMINATOR;
                    }
                }
                bytes.resize(self.length, 0);
                for (i, byte) in bytes.into_iter().enumerate() {
                    delta.change_data(model, offset + i, byte);
                }
            }
            SegmentKind::Integer | SegmentKind::Record { .. } => {
                model.write_multi_byte(delta, offset, self.length, parse_decimal(text));
            }
            SegmentKind::Hex => {
                model.write_multi_byte(delta, offset, self.length, parse_hex(text));
            }
            SegmentKind::Color => {
                let unused = model.read_multi_byte(offset, 2) & color::UNUSED_BIT;
                let value = color::encode(text).unwrap_or_default() as u32;
                model.write_multi_byte(delta, offset, 2, value | unused);
            }
            SegmentKind::Enum { table, value_offset } => {
                let options = enums::options_for_enum(&*model, table);
                let Some(index) = enums::try_match(text, &options) else {
                    tracing::warn!("{}: `{}` matches nothing in `{}`", self.name, text.trim(), table);
                    return Err(TableError::EnumResolution {
                        text: text.trim().to_string(),
                        table: table.clone(),
                    });
                };
                model.write_multi_byte(delta, offset, self.length, index.wrapping_add(*value_offset) as u32);
            }
            SegmentKind::Pointer { .. } => pointer::write_text(model, delta, offset, text)?,
            SegmentKind::BitArray { .. } => {
                for (i, byte) in bits::parse_hex_pairs(text, self.length).into_iter().enumerate() {
                    delta.change_data(model, offset + i, byte);
                }
            }
        }
        Ok(())
    }
}

/// Decimal, truncated to 32 bits. Unparseable text is zero.
fn parse_decimal(text: &str) -> u32 {
    text.trim().parse::<i64>().map(|value| value as u32).unwrap_or(0)
}

/// Hexadecimal, truncated to 32 bits. Unparseable text is zero.
fn parse_hex(text: &str) -> u32 {
    u64::from_str_radix(text.trim(), 16)
        .map(|value| value as u32)
        .unwrap_or(0)
}
