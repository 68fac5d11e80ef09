/// Results Grid Module for pgsh
///
/// This module renders query results as console text: a fixed-width grid,
/// an expanded one-record-per-block report, and the fixed three-column
/// table description used by `\d NAME`.
use crate::core::db::{ResultSet, Value};
use std::fmt::Write;
use std::time::Duration;

/// Narrowest grid column.
pub const MIN_COLUMN_WIDTH: usize = 4;
/// Widest grid column; longer values are cut to fit.
pub const MAX_COLUMN_WIDTH: usize = 50;
const ELLIPSIS: &str = "...";
/// Total width of an expanded-mode `-[ RECORD n ]` header.
pub const RECORD_HEADER_WIDTH: usize = 50;

const DESCRIBE_HEADERS: [&str; 3] = ["Column", "Type", "Modifiers"];
const DESCRIBE_WIDTHS: [usize; 3] = [10, 20, 15];

/// How a result set is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub expanded: bool,
    /// Rows beyond this many are not shown
    pub max_rows: usize,
    /// Printed as a timing line when set
    pub elapsed: Option<Duration>,
}

/// A fixed-width text grid whose column widths follow its content.
#[derive(Debug, Clone, Default)]
pub struct ResultsGrid {
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
}

impl ResultsGrid {
    /// Creates a new, empty ResultsGrid.
    pub fn new() -> Self {
        ResultsGrid::default()
    }

    /// Sets the headers; each column starts as wide as its label.
    pub fn set_headers(&mut self, headers: Vec<String>) {
        self.widths = headers
            .iter()
            .map(|h| char_len(h).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH))
            .collect();
        self.headers = headers;
    }

    /// Adds a row, widening columns as needed and cutting values that do
    /// not fit in [`MAX_COLUMN_WIDTH`].
    pub fn add_row(&mut self, row: Vec<String>) {
        let mut cells = Vec::with_capacity(row.len());
        for (i, cell) in row.into_iter().enumerate() {
            if i >= self.widths.len() {
                self.widths.push(MIN_COLUMN_WIDTH);
            }
            let len = char_len(&cell);
            let cell = if len > MAX_COLUMN_WIDTH {
                self.widths[i] = MAX_COLUMN_WIDTH;
                truncate_cell(&cell)
            } else {
                self.widths[i] = self.widths[i].max(len);
                cell
            };
            cells.push(cell);
        }
        self.rows.push(cells);
    }

    /// Renders the header line, the separator and one line per row.
    pub fn render(&self) -> String {
        let mut out = self.render_line(&self.headers);
        let separator: Vec<String> = self.widths.iter().map(|w| "-".repeat(w + 1)).collect();
        out.push_str(&separator.join("+-"));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_line(row));
        }
        out
    }

    fn render_line(&self, cells: &[String]) -> String {
        let mut line = String::from(" ");
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("| ");
            }
            let width = self.widths.get(i).copied().unwrap_or(0);
            let _ = write!(line, "{} ", pad(cell, width));
        }
        line.push('\n');
        line
    }
}

/// Renders `result` in the layout selected by `options`.
pub fn render(result: &ResultSet, options: &RenderOptions) -> String {
    if options.expanded {
        render_expanded(result, options)
    } else {
        render_table(result, options)
    }
}

/// Grid layout followed by the row-count footer.
pub fn render_table(result: &ResultSet, options: &RenderOptions) -> String {
    let mut grid = ResultsGrid::new();
    grid.set_headers(result.columns.clone());
    for row in result.rows.iter().take(options.max_rows) {
        grid.add_row(row.iter().map(Value::to_string).collect());
    }

    let mut out = grid.render();
    out.push_str(&row_count_footer(grid.rows.len()));
    push_footer(&mut out, result, options);
    out
}

/// One block per record, labels aligned to the longest column name.
pub fn render_expanded(result: &ResultSet, options: &RenderOptions) -> String {
    let label_width = result.columns.iter().map(|c| char_len(c)).max().unwrap_or(0);
    let mut out = String::new();
    let mut shown = 0;

    for (n, row) in result.rows.iter().take(options.max_rows).enumerate() {
        let header = format!("-[ RECORD {} ]", n + 1);
        let fill = RECORD_HEADER_WIDTH.saturating_sub(char_len(&header));
        let _ = writeln!(out, "{}{}", header, "-".repeat(fill));
        for (label, value) in result.columns.iter().zip(row) {
            let _ = writeln!(out, "{} | {}", pad(label, label_width), value);
        }
        shown += 1;
    }

    if shown == 0 {
        out.push_str(&row_count_footer(0));
    }
    push_footer(&mut out, result, options);
    out
}

/// The `\d NAME` report: a fixed-width frame around name, type and
/// modifiers of each column.
pub fn render_describe(table: &str, result: &ResultSet) -> String {
    let separator = {
        let mut line = String::from("+");
        for w in DESCRIBE_WIDTHS {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let mut out = format!("Table \"{}\"\n", table);
    out.push_str(&separator);
    out.push_str(&describe_line(DESCRIBE_HEADERS.iter().map(|h| h.to_string())));
    out.push_str(&separator);
    for row in &result.rows {
        out.push_str(&describe_line(row.iter().map(Value::to_string)));
    }
    out.push_str(&separator);
    out.push('\n');
    out
}

fn describe_line(cells: impl Iterator<Item = String>) -> String {
    let mut line = String::from("| ");
    for (cell, width) in cells.zip(DESCRIBE_WIDTHS) {
        let _ = write!(line, "{} | ", pad(&cell, width));
    }
    line.push('\n');
    line
}

/// `(0 rows)`, `(1 row)`, `(N rows)`.
pub fn row_count_footer(count: usize) -> String {
    if count == 1 {
        "(1 row)\n".to_string()
    } else {
        format!("({} rows)\n", count)
    }
}

/// `Time: 12.345 ms`
pub fn format_timing(elapsed: Duration) -> String {
    format!("Time: {:.3} ms\n", elapsed.as_secs_f64() * 1000.0)
}

fn push_footer(out: &mut String, result: &ResultSet, options: &RenderOptions) {
    if result.truncated || result.row_count() > options.max_rows {
        let shown = result.row_count().min(options.max_rows);
        let _ = writeln!(out, "(more rows available; showing first {})", shown);
    }
    if let Some(elapsed) = options.elapsed {
        out.push_str(&format_timing(elapsed));
    }
    out.push('\n');
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Left-aligns `s` in `width` characters.
fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

fn truncate_cell(s: &str) -> String {
    let mut cut: String = s.chars().take(MAX_COLUMN_WIDTH - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}
