use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use reqbind::{FieldDescriptor, SchemaField, Source, ValidationRule};
use serde::Serialize;

use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::source_color;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Schema Validation",
    commands: &[
        "reqbind check signup.toml                 # Print the field tree",
        "reqbind check signup.json --output json   # Field tree as JSON",
    ],
}];

#[derive(Args)]
pub struct CheckArgs {
    /// Schema file to validate
    schema: PathBuf,
}

#[derive(Debug, Serialize, PartialEq)]
struct FieldRow {
    path: String,
    shape: &'static str,
    target: String,
    #[serde(serialize_with = "serialize_source")]
    source: Source,
    required: bool,
    rules: Vec<String>,
}

fn serialize_source<S: serde::Serializer>(source: &Source, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(source.as_str())
}

#[derive(Serialize)]
struct SchemaReport {
    fields: Vec<FieldRow>,
}

impl TableDisplay for SchemaReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Field", "Shape", "Type", "Source", "Required", "Rules"]);
        for row in &self.fields {
            table.add_row(vec![
                Cell::new(&row.path),
                Cell::new(row.shape),
                Cell::new(&row.target),
                output.tinted(Cell::new(row.source.as_str()), source_color(row.source)),
                Cell::new(if row.required { "yes" } else { "no" }),
                Cell::new(row.rules.join(", ")),
            ]);
        }
        table
    }
}

pub fn handle_check(args: CheckArgs, output: &OutputManager) -> Result<()> {
    let schema = SchemaField::load(&args.schema)
        .with_context(|| format!("Failed to load schema {}", args.schema.display()))?;
    let descriptor = schema
        .to_descriptor()
        .with_context(|| format!("Invalid schema {}", args.schema.display()))?;

    let mut fields = Vec::new();
    collect_rows("", &descriptor, &mut fields);
    log::debug!("schema {} has {} field(s)", args.schema.display(), fields.len());

    output.heading("Field tree");
    output.key_value("Root", &descriptor.target.name());
    let report = SchemaReport { fields };
    output.display(&report)?;
    output.success(&format!("{} is valid", args.schema.display()));
    Ok(())
}

fn collect_rows(prefix: &str, field: &FieldDescriptor, rows: &mut Vec<FieldRow>) {
    let path = match (prefix.is_empty(), field.lookup_name()) {
        (_, None) => prefix.to_string(),
        (true, Some(name)) => name.to_string(),
        (false, Some(name)) => format!("{prefix}.{name}"),
    };
    if !path.is_empty() {
        rows.push(FieldRow {
            path: path.clone(),
            shape: field.shape.kind(),
            target: field.target.name(),
            source: field.source,
            required: field.required,
            rules: field.validations.iter().map(describe_rule).collect(),
        });
    }
    if let Some(element) = field.element() {
        let element_path = format!("{path}[]");
        for child in element.children() {
            collect_rows(&element_path, child, rows);
        }
    }
    for child in field.children() {
        collect_rows(&path, child, rows);
    }
}

fn describe_rule(rule: &ValidationRule) -> String {
    let bound = |min: Option<String>, max: Option<String>| match (min, max) {
        (Some(min), Some(max)) => format!("{min}..={max}"),
        (Some(min), None) => format!("{min}.."),
        (None, Some(max)) => format!("..={max}"),
        (None, None) => "..".to_string(),
    };
    match rule {
        ValidationRule::Length { min, max } => format!(
            "length({})",
            bound(min.map(|v| v.to_string()), max.map(|v| v.to_string()))
        ),
        ValidationRule::Range { min, max } => format!(
            "range({})",
            bound(min.map(|v| v.to_string()), max.map(|v| v.to_string()))
        ),
        ValidationRule::Regex { pattern } => format!("regex({pattern})"),
        ValidationRule::OneOf { allowed, .. } => format!("one_of({})", allowed.join("|")),
        other => other.code().to_string(),
    }
}
