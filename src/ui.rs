//! Terminal output helpers.
//!
//! `Table` sizes itself to the terminal and shrinks its widest columns
//! first when the content does not fit.

use colored::*;
use console::{measure_text_width, truncate_str};

/// Narrowest a column is shrunk to before giving up on fitting the screen.
const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row.iter().map(|c| flatten(c)).collect());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        let (_, width) = console::Term::stdout().size();
        print!("{}", self.render(width as usize));
    }

    /// Lays the table out for a terminal `max_width` columns wide.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, &w) in cells.iter().zip(&widths) {
                let text = truncate_str(cell, w, "...");
                let pad = " ".repeat(w.saturating_sub(measure_text_width(&text)));
                let text = if bold {
                    text.bold().to_string()
                } else {
                    text.into_owned()
                };
                out.push_str(&format!(" {}{} │", text, pad));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(measure_text_width(cell));
            }
        }

        // Indent, borders and one space of padding either side of each cell.
        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > budget {
            let Some(widest) = widths.iter_mut().filter(|w| **w > MIN_COLUMN).max() else {
                break;
            };
            *widest -= 1;
        }
        widths
    }
}

fn flatten(cell: &str) -> String {
    cell.replace(['\n', '\r', '\t'], " ")
}

pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", "!".yellow(), message);
}
