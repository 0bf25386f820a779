//! Set command - write one field of one record

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nether_table::{MemoryModel, ModelDelta};

use crate::project::{Project, find_table};

/// Arguments for the set command
#[derive(Args)]
pub struct SetArgs {
    /// ROM file to edit
    pub rom: PathBuf,

    /// Project file declaring the tables
    #[arg(long, default_value = "tables.toml")]
    pub project: PathBuf,

    /// Table to edit
    #[arg(long)]
    pub table: String,

    /// Element index
    #[arg(long)]
    pub index: usize,

    /// Field name
    #[arg(long)]
    pub field: String,

    /// New value, in the same form `dump` prints
    #[arg(long)]
    pub value: String,

    /// Write the edited ROM here instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the set command
pub fn execute(args: SetArgs) -> Result<()> {
    let project = Project::load(&args.project)?;
    let data = std::fs::read(&args.rom).with_context(|| format!("Failed to read ROM: {}", args.rom.display()))?;
    let mut model = project.build_model(data)?;

    let (delta, text) = apply(&mut model, &args.table, args.index, &args.field, &args.value)?;
    println!("{}[{}].{} = {}", args.table, args.index, args.field, text);

    if delta.changes().is_empty() && args.output.is_none() {
        println!("  No bytes changed");
        return Ok(());
    }
    for change in delta.changes() {
        println!("  {:06X}: {:02X} -> {:02X}", change.address, change.old, change.new);
    }
    for change in delta.run_changes() {
        println!("  format attached at {:06X}", change.added);
    }

    let output = args.output.as_ref().unwrap_or(&args.rom);
    std::fs::write(output, model.data()).with_context(|| format!("Failed to write ROM: {}", output.display()))?;
    println!("  Wrote {}", output.display());
    Ok(())
}

/// Write `value` into one field and return the mutation log together with
/// the field's text after the write.
pub fn apply(model: &mut MemoryModel, table_name: &str, index: usize, field: &str, value: &str) -> Result<(ModelDelta, String)> {
    let table = find_table(model, table_name)?;
    let segment_index = table.segment_index(field)?;

    let mut delta = ModelDelta::new();
    if let Err(error) = table.write_field(model, &mut delta, index, segment_index, value) {
        delta.revert(model);
        return Err(error).with_context(|| format!("Failed to set {table_name}[{index}].{field}"));
    }
    let text = table.field_text(&*model, index, segment_index, false)?;
    Ok((delta, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
[[tables]]
name = "species"
address = 0
format = "name\"\"4 type.types hp:"
count = 2

[lists]
types = ["Normal", "Fire", "Water"]
"#;

    fn model() -> MemoryModel {
        Project::parse(PROJECT).unwrap().build_model(vec![0; 14]).unwrap()
    }

    #[test]
    fn test_apply_enum() {
        let mut model = model();
        let (delta, text) = apply(&mut model, "species", 1, "type", "wat").unwrap();
        assert_eq!(text, "Water");
        assert_eq!(delta.changes().len(), 1);
        assert_eq!(model.data()[7 + 4], 2);
    }

    #[test]
    fn test_apply_text() {
        let mut model = model();
        let (_, text) = apply(&mut model, "species", 0, "name", "\"AB\"").unwrap();
        assert_eq!(text, "\"AB\"");
        assert_eq!(&model.data()[..4], &[0xBB, 0xBC, 0xFF, 0x00]);
    }

    #[test]
    fn test_apply_failure_leaves_data() {
        let mut model = model();
        let error = apply(&mut model, "species", 0, "type", "Grass").unwrap_err();
        assert!(format!("{error:#}").contains("does not match any option"));
        assert!(model.data().iter().all(|&byte| byte == 0));

        assert!(apply(&mut model, "species", 0, "speed", "1").is_err());
        assert!(apply(&mut model, "species", 5, "hp", "1").is_err());
    }

    #[test]
    fn test_execute_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.gba");
        let project = dir.path().join("tables.toml");
        let output = dir.path().join("edited.gba");
        std::fs::write(&rom, [0u8; 14]).unwrap();
        std::fs::write(&project, PROJECT).unwrap();

        execute(SetArgs {
            rom: rom.clone(),
            project,
            table: "species".into(),
            index: 0,
            field: "hp".into(),
            value: "300".into(),
            output: Some(output.clone()),
        })
        .unwrap();

        let edited = std::fs::read(&output).unwrap();
        assert_eq!(&edited[5..7], &[0x2C, 0x01]);
        assert_eq!(std::fs::read(&rom).unwrap(), vec![0u8; 14]);
    }
}
