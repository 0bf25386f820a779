//! Field descriptors
//!
//! A [`Segment`] describes one column of a table: its name, byte length and
//! how the bytes become text. Segment lists are parsed once per table
//! definition and shared, read-only, by every record of the table.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, TableError};
use crate::{BIT_ARRAY_MARKER, COLOR_FORMAT, HEX_FORMAT, RECORD_FORMAT, TEXT_MARKER};

/// Shared, immutable field list of a table
pub type SegmentList = Arc<[Segment]>;

/// Storage class of a field, before any rendering refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Integer,
    Pointer,
    BitArray,
}

/// How a field's bytes are rendered and parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// 0xFF-terminated character string, zero padded
    Text,
    /// Unsigned little-endian decimal
    Integer,
    /// Unsigned little-endian, rendered as zero-padded uppercase hex
    Hex,
    /// Packed BGR555 colour
    Color,
    /// Integer rendered as a name from an option list
    Enum {
        /// Option list name, or a decimal literal meaning `0..N`
        table: String,
        /// Subtracted from the stored value before indexing
        value_offset: i64,
    },
    /// Integer whose enum table depends on a sibling field's value.
    ///
    /// On its own this renders and parses as a plain integer; the table is
    /// only chosen per element by [`Table`](crate::Table) field access.
    Record {
        match_field: String,
        variants: BTreeMap<i64, String>,
    },
    /// 4-byte pointer, optionally describing what it points to
    Pointer { inner: String },
    /// Named bit flags
    BitArray { source: String },
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub length: usize,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn text(name: impl Into<String>, length: usize) -> Self {
        debug_assert!(length > 0, "text fields need room for a terminator");
        Self::with_kind(name, length, SegmentKind::Text)
    }

    pub fn integer(name: impl Into<String>, length: usize) -> Self {
        debug_assert!((1..=4).contains(&length), "integer length must be 1-4");
        Self::with_kind(name, length, SegmentKind::Integer)
    }

    pub fn hex(name: impl Into<String>, length: usize) -> Self {
        debug_assert!((1..=4).contains(&length), "hex length must be 1-4");
        Self::with_kind(name, length, SegmentKind::Hex)
    }

    pub fn color(name: impl Into<String>) -> Self {
        Self::with_kind(name, 2, SegmentKind::Color)
    }

    /// Enum field. A `+N` suffix on `table` becomes the value offset.
    pub fn enumeration(name: impl Into<String>, length: usize, table: &str) -> Self {
        debug_assert!((1..=4).contains(&length), "enum length must be 1-4");
        let (table, value_offset) = match table.split_once('+') {
            Some((base, offset)) if !offset.contains('+') => match offset.parse::<i64>() {
                Ok(offset) => (base.to_string(), offset),
                Err(_) => (table.to_string(), 0),
            },
            _ => (table.to_string(), 0),
        };
        Self::with_kind(name, length, SegmentKind::Enum { table, value_offset })
    }

    /// Record field from a `|s=field(value=enum|...)` clause.
    pub fn record(name: impl Into<String>, length: usize, clause: &str) -> Result<Self> {
        let body = clause
            .strip_prefix(RECORD_FORMAT)
            .ok_or_else(|| TableError::syntax(clause, format!("record clause must start with {RECORD_FORMAT}")))?;
        let (match_field, rest) = body
            .split_once('(')
            .ok_or_else(|| TableError::syntax(clause, "record format is s={name}({number}={enum}|...)"))?;
        if match_field.is_empty() {
            return Err(TableError::syntax(
                clause,
                "record format is s={name}({number}={enum}|...)",
            ));
        }
        let list = rest
            .strip_suffix(')')
            .ok_or_else(|| TableError::syntax(clause, "record value list is missing its closing parenthesis"))?;

        let mut variants = BTreeMap::new();
        for pair in list.split('|') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if value.contains('=') {
                continue;
            }
            let Ok(key) = key.trim().parse::<i64>() else {
                continue;
            };
            variants.insert(key, value.to_string());
        }

        Ok(Self::with_kind(
            name,
            length,
            SegmentKind::Record {
                match_field: match_field.to_string(),
                variants,
            },
        ))
    }

    pub fn pointer(name: impl Into<String>, inner: impl Into<String>) -> Self {
        Self::with_kind(name, 4, SegmentKind::Pointer { inner: inner.into() })
    }

    pub fn bit_array(name: impl Into<String>, length: usize, source: impl Into<String>) -> Self {
        Self::with_kind(name, length, SegmentKind::BitArray { source: source.into() })
    }

    fn with_kind(name: impl Into<String>, length: usize, kind: SegmentKind) -> Self {
        Self {
            name: name.into(),
            length,
            kind,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self.kind {
            SegmentKind::Text => ContentType::Text,
            SegmentKind::Pointer { .. } => ContentType::Pointer,
            SegmentKind::BitArray { .. } => ContentType::BitArray,
            SegmentKind::Integer
            | SegmentKind::Hex
            | SegmentKind::Color
            | SegmentKind::Enum { .. }
            | SegmentKind::Record { .. } => ContentType::Integer,
        }
    }

    /// The schema token that parses back into this segment
    pub fn serialize_format(&self) -> String {
        let name = &self.name;
        match &self.kind {
            SegmentKind::Text => format!("{name}{TEXT_MARKER}{}", self.length),
            SegmentKind::Pointer { inner } => format!("{name}<{inner}>"),
            SegmentKind::BitArray { source } => {
                format!("{name}{BIT_ARRAY_MARKER}{} {source}", self.length)
            }
            SegmentKind::Integer => self.integer_format(),
            SegmentKind::Hex => format!("{}{HEX_FORMAT}", self.integer_format()),
            SegmentKind::Color => format!("{}{COLOR_FORMAT}", self.integer_format()),
            SegmentKind::Enum { table, value_offset } => {
                if *value_offset == 0 {
                    format!("{}{table}", self.integer_format())
                } else {
                    format!("{}{table}+{value_offset}", self.integer_format())
                }
            }
            SegmentKind::Record {
                match_field,
                variants,
            } => {
                let records = variants
                    .iter()
                    .map(|(value, table)| format!("{value}={table}"))
                    .collect::<Vec<_>>()
                    .join("|");
                format!("{}{RECORD_FORMAT}{match_field}({records})", self.integer_format())
            }
        }
    }

    fn integer_format(&self) -> String {
        let marker = match self.length {
            1 => ".",
            2 => ":",
            3 => ":.",
            _ => "::",
        };
        format!("{}{marker}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_value_offset() {
        let segment = Segment::enumeration("type", 1, "types+1");
        assert_eq!(
            segment.kind,
            SegmentKind::Enum {
                table: "types".into(),
                value_offset: 1
            }
        );
        assert_eq!(segment.serialize_format(), "type.types+1");
    }

    #[test]
    fn test_enum_without_numeric_offset_keeps_name() {
        let segment = Segment::enumeration("type", 1, "a+b");
        assert_eq!(
            segment.kind,
            SegmentKind::Enum {
                table: "a+b".into(),
                value_offset: 0
            }
        );
    }

    #[test]
    fn test_record_clause() {
        let segment = Segment::record("arg", 2, "|s=kind(1=items|0=moves|bad|x=y)").unwrap();
        let SegmentKind::Record {
            match_field,
            variants,
        } = &segment.kind
        else {
            panic!("expected a record segment");
        };
        assert_eq!(match_field, "kind");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[&0], "moves");
        assert_eq!(segment.serialize_format(), "arg:|s=kind(0=moves|1=items)");
    }

    #[test]
    fn test_record_clause_errors() {
        assert!(matches!(
            Segment::record("arg", 2, "|s=(0=moves)"),
            Err(TableError::SchemaSyntax { .. })
        ));
        assert!(matches!(
            Segment::record("arg", 2, "|s=kind"),
            Err(TableError::SchemaSyntax { .. })
        ));
        assert!(matches!(
            Segment::record("arg", 2, "|s=kind(0=moves"),
            Err(TableError::SchemaSyntax { .. })
        ));
    }

    #[test]
    fn test_serialize_formats() {
        assert_eq!(Segment::text("name", 11).serialize_format(), "name\"\"11");
        assert_eq!(Segment::integer("hp", 1).serialize_format(), "hp.");
        assert_eq!(Segment::integer("hp", 3).serialize_format(), "hp:.");
        assert_eq!(Segment::hex("id", 2).serialize_format(), "id:|h");
        assert_eq!(Segment::color("tint").serialize_format(), "tint:|c");
        assert_eq!(Segment::pointer("moves", "").serialize_format(), "moves<>");
        assert_eq!(Segment::bit_array("flags", 2, "flagnames").serialize_format(), "flags#2 flagnames");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(Segment::hex("id", 2).content_type(), ContentType::Integer);
        assert_eq!(Segment::pointer("p", "\"\"").content_type(), ContentType::Pointer);
        assert_eq!(Segment::bit_array("f", 1, "x").content_type(), ContentType::BitArray);
    }
}
