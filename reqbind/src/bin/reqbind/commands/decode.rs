use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use reqbind::{DecodeOptions, RequestFixture, SchemaField, ValidationIssue, Value, decode_with};
use serde::Serialize;

use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::{BOUND, issue_mark};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Bind a Request",
        commands: &[
            "reqbind decode --schema signup.toml --request signup.json",
            "reqbind decode --schema signup.json --request fixture.toml --output json",
        ],
    },
    ExampleGroup {
        title: "Decode Options",
        commands: &[
            "reqbind decode --schema s.toml --request r.json --config reqbind.toml",
            "REQBIND_LIST_SEPARATOR=, reqbind decode --schema s.toml --request r.json",
        ],
    },
];

#[derive(Args)]
pub struct DecodeArgs {
    /// Schema file describing the field tree (TOML, or JSON with a .json extension)
    #[arg(long)]
    schema: PathBuf,

    /// Request fixture to bind (JSON, or TOML without a .json extension)
    #[arg(long)]
    request: PathBuf,

    /// Config file with a [decode] table
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Outcome of binding one request, in the shape printed by `--output json`.
#[derive(Serialize)]
struct DecodeReport {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<ValidationIssue>,
}

impl TableDisplay for DecodeReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        if self.ok {
            output.add_table_header(&mut table, &["", "Field", "Value"]);
            let mut rows = Vec::new();
            if let Some(value) = &self.value {
                flatten_value("", value, &mut rows);
            }
            for (path, rendered) in rows {
                table.add_row(vec![output.mark_cell(BOUND), Cell::new(path), Cell::new(rendered)]);
            }
        } else {
            output.add_table_header(&mut table, &["", "Field", "Code", "Message"]);
            for issue in &self.issues {
                table.add_row(vec![
                    output.mark_cell(issue_mark(&issue.code)),
                    Cell::new(&issue.field),
                    Cell::new(&issue.code),
                    Cell::new(&issue.message),
                ]);
            }
        }
        table
    }
}

pub fn handle_decode(args: DecodeArgs, output: &OutputManager) -> Result<()> {
    let schema = SchemaField::load(&args.schema)
        .with_context(|| format!("Failed to load schema {}", args.schema.display()))?;
    let descriptor = schema
        .to_descriptor()
        .with_context(|| format!("Invalid schema {}", args.schema.display()))?;
    let request = RequestFixture::load(&args.request)
        .with_context(|| format!("Failed to load request {}", args.request.display()))?
        .into_request();

    let options = match &args.config {
        Some(path) => DecodeOptions::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DecodeOptions::default(),
    }
    .apply_env()
    .context("Invalid REQBIND_* environment override")?;
    log::debug!("decoding with {:?}", options);

    let bound = decode_with(&descriptor, &request, &options);
    let report = match bound.error() {
        None => DecodeReport {
            ok: true,
            value: bound.value().cloned(),
            error: None,
            issues: Vec::new(),
        },
        Some(error) => DecodeReport {
            ok: false,
            value: None,
            error: Some(error.to_json_value()),
            issues: error.issues(),
        },
    };

    if report.ok {
        output.heading("Bound value");
        output.display(&report)?;
        output.success("Request bound without errors");
        Ok(())
    } else {
        output.heading("Binding errors");
        output.display(&report)?;
        anyhow::bail!("Request failed to bind ({} issue(s))", report.issues.len())
    }
}

/// One row per leaf, keyed by dotted path; list elements use their index.
fn flatten_value(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    let path = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    };
    match value {
        Value::Object(entries) if !entries.is_empty() => {
            for (name, child) in entries {
                flatten_value(&path(name), child, rows);
            }
        }
        Value::List(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&path(&index.to_string()), item, rows);
            }
        }
        leaf => {
            let rendered = serde_json::to_string(leaf).unwrap_or_default();
            rows.push((prefix.to_string(), rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_values_to_dotted_paths() {
        let value = Value::Object(vec![
            ("name".into(), Value::Text("ada".into())),
            (
                "addr".into(),
                Value::Object(vec![("zip".into(), Value::Text("12345".into()))]),
            ),
            ("ids".into(), Value::List(vec![Value::Int(1), Value::Int(2)])),
        ]);
        let mut rows = Vec::new();
        flatten_value("", &value, &mut rows);
        assert_eq!(
            rows,
            vec![
                ("name".to_string(), "\"ada\"".to_string()),
                ("addr.zip".to_string(), "\"12345\"".to_string()),
                ("ids.0".to_string(), "1".to_string()),
                ("ids.1".to_string(), "2".to_string()),
            ]
        );
    }
}
