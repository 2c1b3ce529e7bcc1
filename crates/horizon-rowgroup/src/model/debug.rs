//! Human-readable dumps of the flat row layout.

use std::fmt::{self, Write};
use std::hash::Hash;

use super::buffered_model::BufferedGroupedRowModel;
use super::traits::FlatTableModel;

/// Style of the branch markers in front of sub-rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutStyle {
    /// ASCII characters.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for layout debug output.
#[derive(Debug, Clone)]
pub struct LayoutFormatOptions {
    /// The style of sub-row markers.
    pub style: LayoutStyle,
    /// Whether to print the cell values of every row.
    pub show_values: bool,
    /// Maximum number of rows to print (None for all).
    pub max_rows: Option<usize>,
}

impl Default for LayoutFormatOptions {
    fn default() -> Self {
        Self {
            style: LayoutStyle::default(),
            show_values: true,
            max_rows: None,
        }
    }
}

impl LayoutFormatOptions {
    /// Options that print only the row structure.
    pub fn structure_only() -> Self {
        Self {
            show_values: false,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing the flat layout of a grouped model.
///
/// Each line shows the flat row, the group it belongs to and, with
/// [`format_buffered`](Self::format_buffered), the pending status:
/// `+` pending add, `-` pending delete, `*` changed.
///
/// ```text
/// Layout (2 groups, 4 rows):
///    0 [g0]    Order 1 |
///    1 [g0]  ├── bolt | 4
///    2 [g0] *└── nut | 9
///    3 [g1]    Order 2 |
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayoutDebug {
    options: LayoutFormatOptions,
}

impl LayoutDebug {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: LayoutFormatOptions) -> Self {
        Self { options }
    }

    /// Format the layout of any flat model.
    pub fn format<M: FlatTableModel>(&self, model: &M) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_layout(model, &mut output, |_| ' ');
        output
    }

    /// Format the layout of a buffered model, with status markers.
    pub fn format_buffered<G, R, K>(&self, model: &BufferedGroupedRowModel<G, R, K>) -> String
    where
        K: Eq + Hash + Clone + fmt::Debug,
    {
        let mut output = String::new();
        let _ = self.write_layout(model, &mut output, |row| {
            if model.is_pending_add(row) {
                '+'
            } else if model.is_pending_delete(row) {
                '-'
            } else if model.is_row_changed(row) {
                '*'
            } else {
                ' '
            }
        });
        output
    }

    fn write_layout<M, W, S>(&self, model: &M, out: &mut W, status: S) -> fmt::Result
    where
        M: FlatTableModel,
        W: Write,
        S: Fn(usize) -> char,
    {
        let rows = model.row_count();
        let groups = rows
            .checked_sub(1)
            .and_then(|last| model.group_number(last))
            .map_or(0, |g| g + 1);
        writeln!(out, "Layout ({groups} groups, {rows} rows):")?;
        if rows == 0 {
            return writeln!(out, "  (empty)");
        }

        let shown = self.options.max_rows.map_or(rows, |max| max.min(rows));
        for row in 0..shown {
            let group = model.group_number(row).unwrap_or_default();
            write!(out, "{row:>4} [g{group}] {}", status(row))?;

            if !model.is_section_or_header_row(row) {
                let is_last = model.lead_row_of_group(group + 1).unwrap_or(rows) == row + 1;
                out.write_str(self.branch(is_last))?;
            } else {
                out.write_str("   ")?;
            }

            if self.options.show_values {
                let values: Vec<String> = (0..model.column_count())
                    .map(|column| model.value_at(row, column).to_string())
                    .collect();
                write!(out, " {}", values.join(" | "))?;
            }
            writeln!(out)?;
        }
        if shown < rows {
            writeln!(out, "  ... {} more rows", rows - shown)?;
        }
        Ok(())
    }

    fn branch(&self, is_last: bool) -> &'static str {
        match (self.options.style, is_last) {
            (LayoutStyle::Ascii, false) => "|--",
            (LayoutStyle::Ascii, true) => "`--",
            (LayoutStyle::Unicode, false) => "\u{251c}\u{2500}\u{2500}",
            (LayoutStyle::Unicode, true) => "\u{2514}\u{2500}\u{2500}",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, FnColumn, GroupedModelBuilder, VecDetails};

    struct Section {
        title: &'static str,
        items: Vec<&'static str>,
    }

    fn model() -> BufferedGroupedRowModel<Section, &'static str, &'static str> {
        let mut model = GroupedModelBuilder::new(
            |s: &Section| Some(s.title),
            VecDetails::new(|s: &Section| &s.items, |s: &mut Section| &mut s.items),
        )
        .header_column(FnColumn::new("Title", |s: &Section| CellValue::from(s.title)))
        .detail_columns(vec![
            FnColumn::new("Item", |i: &&'static str| CellValue::from(*i)).into_adapter(),
        ])
        .build_buffered()
        .unwrap();
        model
            .set_groups(vec![Section {
                title: "fruit",
                items: vec!["apple", "pear"],
            }])
            .unwrap();
        model
    }

    #[test]
    fn test_format_structure() {
        let model = model();
        let debug = LayoutDebug::with_options(LayoutFormatOptions {
            style: LayoutStyle::Ascii,
            ..Default::default()
        });
        let output = debug.format(model.model());

        assert_eq!(
            output,
            "Layout (1 groups, 3 rows):\n   0 [g0]      fruit\n   1 [g0]  |-- apple\n   2 [g0]  `-- pear\n"
        );
    }

    #[test]
    fn test_status_markers() {
        let mut model = model();
        model
            .queue_add(Section {
                title: "veg",
                items: vec![],
            })
            .unwrap();
        model.queue_delete_at(0).unwrap();

        let output = LayoutDebug::with_options(LayoutFormatOptions::structure_only()).format_buffered(&model);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "   0 [g0] -   ");
        assert_eq!(lines[3], "   2 [g0] -\u{2514}\u{2500}\u{2500}");
        assert_eq!(lines[4], "   3 [g1] +   ");
    }

    #[test]
    fn test_truncation_and_empty() {
        let model = model();
        let output = LayoutDebug::with_options(LayoutFormatOptions {
            max_rows: Some(1),
            ..LayoutFormatOptions::structure_only()
        })
        .format(&model);
        assert!(output.ends_with("  ... 2 more rows\n"));

        let mut model = model;
        model.clear();
        assert_eq!(LayoutDebug::new().format(&model), "Layout (0 groups, 0 rows):\n  (empty)\n");
    }
}
