//! Dump command - print the records of the tables in a project

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nether_table::MemoryModel;
use serde::Serialize;

use crate::project::{Project, find_table};

/// Arguments for the dump command
#[derive(Args)]
pub struct DumpArgs {
    /// ROM file to read
    pub rom: PathBuf,

    /// Project file declaring the tables
    #[arg(long, default_value = "tables.toml")]
    pub project: PathBuf,

    /// Only dump this table (default: every table in the project)
    #[arg(long)]
    pub table: Option<String>,

    /// Render the data pointers point to, not just their destination
    #[arg(long)]
    pub deep: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct TableDump {
    pub name: String,
    pub address: String,
    pub elements: Vec<ElementDump>,
}

#[derive(Debug, Serialize)]
pub struct ElementDump {
    pub index: usize,
    pub fields: Vec<FieldDump>,
}

#[derive(Debug, Serialize)]
pub struct FieldDump {
    pub field: String,
    pub value: String,
}

/// Execute the dump command
pub fn execute(args: DumpArgs) -> Result<()> {
    let project = Project::load(&args.project)?;
    let data = std::fs::read(&args.rom).with_context(|| format!("Failed to read ROM: {}", args.rom.display()))?;
    let model = project.build_model(data)?;

    let names: Vec<String> = match &args.table {
        Some(name) => vec![name.clone()],
        None => project.table_names().map(str::to_string).collect(),
    };
    let dumps = names
        .iter()
        .map(|name| dump_table(&model, name, args.deep))
        .collect::<Result<Vec<_>>>()?;

    if args.json {
        let json = serde_json::to_string_pretty(&dumps).context("Failed to serialize dump")?;
        println!("{json}");
        return Ok(());
    }

    for dump in &dumps {
        println!("{} @ {} ({} elements)", dump.name, dump.address, dump.elements.len());
        for element in &dump.elements {
            let fields = element
                .fields
                .iter()
                .map(|field| format!("{}={}", field.field, field.value))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {:>4}: {}", element.index, fields);
        }
    }
    Ok(())
}

/// Render every element of the table `name`
pub fn dump_table(model: &MemoryModel, name: &str, deep: bool) -> Result<TableDump> {
    let table = find_table(model, name)?;
    let elements = (0..table.element_count)
        .map(|index| {
            let texts = table
                .element_texts(model, index, deep)
                .with_context(|| format!("Failed to render {name}[{index}]"))?;
            let fields = table
                .segments
                .iter()
                .zip(texts)
                .map(|(segment, value)| FieldDump {
                    field: segment.name.clone(),
                    value,
                })
                .collect();
            Ok(ElementDump { index, fields })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TableDump {
        name: name.to_string(),
        address: format!("{:06X}", table.start),
        elements,
    })
}
