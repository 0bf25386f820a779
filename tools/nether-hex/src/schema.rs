//! Schema command - parse a table format and list its fields

use anyhow::{Context, Result};
use clap::Args;
use nether_table::{Segment, SegmentKind, schema};

/// Arguments for the schema command
#[derive(Args)]
pub struct SchemaArgs {
    /// Table format, e.g. 'name""11 hp. type.types+1'
    pub format: String,
}

/// Execute the schema command
pub fn execute(args: SchemaArgs) -> Result<()> {
    let segments = schema::parse(&args.format).context("Invalid table format")?;

    let stride: usize = segments.iter().map(|segment| segment.length).sum();
    println!("{} fields, {} bytes per element", segments.len(), stride);
    for segment in &segments {
        println!(
            "  {:<16} {:>3}  {:<20} {}",
            segment.name,
            segment.length,
            describe(segment),
            segment.serialize_format()
        );
    }
    Ok(())
}

/// Short label for a field's kind
fn describe(segment: &Segment) -> String {
    match &segment.kind {
        SegmentKind::Text => "text".to_string(),
        SegmentKind::Integer => "integer".to_string(),
        SegmentKind::Hex => "hex".to_string(),
        SegmentKind::Color => "color".to_string(),
        SegmentKind::Enum { table, value_offset: 0 } => format!("enum({table})"),
        SegmentKind::Enum { table, value_offset } => format!("enum({table}+{value_offset})"),
        SegmentKind::Record { match_field, .. } => format!("record({match_field})"),
        SegmentKind::Pointer { inner } if inner.is_empty() => "pointer".to_string(),
        SegmentKind::Pointer { inner } => format!("pointer({inner})"),
        SegmentKind::BitArray { source } => format!("bits({source})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let segments = schema::parse("type.types+1 hp. arg:|s=kind(0=moves) next<> flags#1 names").unwrap();
        let labels: Vec<String> = segments.iter().map(describe).collect();
        assert_eq!(labels, vec!["enum(types+1)", "integer", "record(kind)", "pointer", "bits(names)"]);
    }

    #[test]
    fn test_execute_rejects_bad_format() {
        let args = SchemaArgs {
            format: "hp".to_string(),
        };
        assert!(execute(args).is_err());
    }
}
