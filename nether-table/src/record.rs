//! Discriminated fields
//!
//! A record field (`arg:|s=kind(0=moves|1=items)`) is an enum whose option
//! table is chosen by the value of another field in the same element.

use std::borrow::Cow;

use crate::model::ByteStore;
use crate::segment::{Segment, SegmentKind};

/// The field `segment` behaves as in the element starting at `record_start`.
///
/// Non-record segments are returned unchanged. A record resolves to an enum
/// over the table selected by its match field's current value, or to a
/// plain integer when no earlier field of the element is the match field,
/// or when the match field's value has no table.
pub fn resolve_concrete<'a, M: ByteStore + ?Sized>(
    segment: &'a Segment,
    segments: &[Segment],
    record_start: usize,
    model: &M,
) -> Cow<'a, Segment> {
    let SegmentKind::Record {
        match_field,
        variants,
    } = &segment.kind
    else {
        return Cow::Borrowed(segment);
    };
    let plain = || Cow::Owned(Segment::integer(&segment.name, segment.length));

    let own_index = segments
        .iter()
        .position(|candidate| candidate.name == segment.name)
        .unwrap_or(segments.len());
    let Some(index) = segments[..own_index]
        .iter()
        .position(|candidate| candidate.name == *match_field)
    else {
        tracing::debug!("{}: match field `{}` not found", segment.name, match_field);
        return plain();
    };
    let offset: usize = segments[..index].iter().map(|candidate| candidate.length).sum();
    let value = model.read_multi_byte(record_start + offset, segments[index].length) as i64;

    match variants.get(&value) {
        Some(table) => Cow::Owned(Segment::enumeration(&segment.name, segment.length, table)),
        None => plain(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;
    use crate::schema;

    #[test]
    fn test_resolves_by_match_value() {
        let segments = schema::parse("kind. arg:|s=kind(0=moves|1=items)").unwrap();
        let model = MemoryModel::new(vec![1, 0, 0, 2, 0, 0]);

        let concrete = resolve_concrete(&segments[1], &segments, 0, &model);
        assert_eq!(
            concrete.kind,
            SegmentKind::Enum {
                table: "items".into(),
                value_offset: 0
            }
        );
        let concrete = resolve_concrete(&segments[1], &segments, 3, &model);
        assert_eq!(concrete.kind, SegmentKind::Integer);
        assert_eq!(concrete.length, 2);
    }

    #[test]
    fn test_match_field_must_precede_record() {
        let segments = schema::parse("arg:|s=kind(0=moves) kind.").unwrap();
        let model = MemoryModel::new(vec![0, 0, 0]);
        let concrete = resolve_concrete(&segments[0], &segments, 0, &model);
        assert_eq!(concrete.kind, SegmentKind::Integer);
    }

    #[test]
    fn test_missing_match_field() {
        let segments = schema::parse("arg:|s=missing(0=moves)").unwrap();
        let model = MemoryModel::new(vec![0, 0]);
        assert_eq!(
            resolve_concrete(&segments[0], &segments, 0, &model).kind,
            SegmentKind::Integer
        );
    }

    #[test]
    fn test_plain_segments_are_borrowed() {
        let segments = schema::parse("hp.").unwrap();
        let model = MemoryModel::new(vec![0]);
        assert!(matches!(
            resolve_concrete(&segments[0], &segments, 0, &model),
            Cow::Borrowed(_)
        ));
    }
}
