use clap::builder::styling::{AnsiColor, Style, Styles};
use colored::Color;
use comfy_table::Color as CellColor;
use reqbind::Source;

/// Marker and colours for one kind of binding outcome: `color` for terminal
/// lines, `cell` for table cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    pub symbol: &'static str,
    pub color: Color,
    pub cell: CellColor,
}

pub const BOUND: Mark = Mark {
    symbol: "✓",
    color: Color::Green,
    cell: CellColor::Green,
};

pub const FAILED: Mark = Mark {
    symbol: "✗",
    color: Color::Red,
    cell: CellColor::Red,
};

/// Marker for an issue, chosen by its `bind.*` code.
pub fn issue_mark(code: &str) -> Mark {
    match code {
        "bind.required" => Mark {
            symbol: "∅",
            color: Color::Yellow,
            cell: CellColor::Yellow,
        },
        "bind.invalid_type" => Mark {
            symbol: "≠",
            color: Color::Magenta,
            cell: CellColor::Magenta,
        },
        _ => FAILED,
    }
}

/// Colour of a request source in the field tree.
pub fn source_color(source: Source) -> CellColor {
    match source {
        Source::Body => CellColor::White,
        Source::Query => CellColor::Cyan,
        Source::Path | Source::Subdomain => CellColor::Blue,
        Source::Headers => CellColor::Magenta,
        Source::Files => CellColor::Green,
        Source::Auth => CellColor::Yellow,
    }
}

pub const HEADING: Color = Color::BrightBlue;
pub const KEY: Color = Color::BrightCyan;

pub fn help_styles() -> Styles {
    Styles::styled()
        .usage(Style::new().fg_color(Some(AnsiColor::BrightBlue.into())).bold())
        .header(Style::new().fg_color(Some(AnsiColor::Cyan.into())).bold())
        .literal(Style::new().fg_color(Some(AnsiColor::Magenta.into())))
        .placeholder(Style::new().fg_color(Some(AnsiColor::BrightBlack.into())))
        .error(Style::new().fg_color(Some(AnsiColor::Red.into())).bold())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_codes_pick_their_marks() {
        assert_eq!(issue_mark("bind.required").symbol, "∅");
        assert_eq!(issue_mark("bind.invalid_type").symbol, "≠");
        assert_eq!(issue_mark("bind.email"), FAILED);
    }
}
