use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use crate::theme::{BOUND, FAILED, HEADING, KEY, Mark};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        if options.no_color {
            colored::control::set_override(false);
        }
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(self);
                println!("{table}");
            }
        }
        Ok(())
    }

    fn is_json(&self) -> bool {
        matches!(self.options.output_format, OutputFormat::Json)
    }

    fn marked(&self, mark: Mark, message: &str) -> String {
        if self.options.no_color {
            format!("{} {message}", mark.symbol)
        } else {
            format!("{} {}", mark.symbol.color(mark.color), message.color(mark.color))
        }
    }

    pub fn success(&self, message: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        println!("{}", self.marked(BOUND, message));
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.marked(FAILED, message));
    }

    pub fn heading(&self, text: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("\n{text}\n{}", "=".repeat(text.chars().count()))
        } else {
            format!("\n{}", text.color(HEADING).bold())
        };
        println!("{output}");
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("{key}: {value}")
        } else {
            format!("{}: {}", key.color(KEY).bold(), value)
        };
        println!("{output}");
    }

    /// Table cell holding a mark's symbol.
    pub fn mark_cell(&self, mark: Mark) -> Cell {
        self.tinted(Cell::new(mark.symbol), mark.cell)
    }

    pub fn tinted(&self, cell: Cell, color: TableColor) -> Cell {
        if self.options.no_color { cell } else { cell.fg(color) }
    }

    pub fn create_table(&self) -> Table {
        let mut table = Table::new();

        if !self.options.no_color {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        }

        table
    }

    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if self.options.no_color {
                    cell
                } else {
                    cell.fg(TableColor::Cyan)
                }
            })
            .collect();
        table.set_header(header_cells);
    }
}
