//! Colour-graded tables: one per parameter pair, or a single table for a
//! one-parameter sweep.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::color::{ColorScale, Rgb, finite_range};
use crate::error::{Result, SensitivityError};
use crate::format::{NumberFormat, format_default, format_value};
use crate::pivot::PivotTable;
use crate::table::SensitivityTable;

/// Identifies a styled table within [`StyledTables`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKey {
    /// Table of the only swept parameter
    Single(String),
    /// Pivot of the first parameter (rows) against the second (columns)
    Pair(String, String),
}

impl TableKey {
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Self {
        TableKey::Pair(a.into(), b.into())
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Single(name) => f.write_str(name),
            TableKey::Pair(a, b) => write!(f, "{a} vs. {b}"),
        }
    }
}

/// Everything that controls how a table is coloured and labelled
#[derive(Debug, Clone, Default)]
pub struct TableStyle {
    pub color_scale: ColorScale,
    pub num_fmt: Option<NumberFormat>,
    /// Display names for parameters (and the result); unlisted names show as-is
    pub labels: BTreeMap<String, String>,
    pub aggregation: Aggregation,
}

impl TableStyle {
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// One rendered cell
#[derive(Debug, Clone, PartialEq)]
pub struct StyledCell {
    /// `None` when no row of the table had this combination
    pub value: Option<f64>,
    pub text: String,
    /// Gradient colour; `None` for missing and NaN cells
    pub background: Option<Rgb>,
    pub foreground: Rgb,
}

impl StyledCell {
    fn new(value: Option<f64>, scale: &ColorScale, range: Option<(f64, f64)>, num_fmt: Option<&NumberFormat>) -> Self {
        let background = match (value, range) {
            (Some(v), Some((lo, hi))) if !v.is_nan() => Some(scale.color_for(v, lo, hi)),
            _ => None,
        };
        Self {
            value,
            text: value.map(|v| format_value(v, num_fmt)).unwrap_or_default(),
            background,
            foreground: background.map(Rgb::text_color).unwrap_or(Rgb::BLACK),
        }
    }
}

/// A table of formatted, coloured cells with labelled axes
#[derive(Debug, Clone, PartialEq)]
pub struct StyledTable {
    pub caption: String,
    /// Label of the row axis
    pub row_title: String,
    /// Label spanning the columns (the column parameter of a pair)
    pub column_title: Option<String>,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// Row-major cells, one row per row label
    pub cells: Vec<Vec<StyledCell>>,
}

impl StyledTable {
    /// Style a pivot; the gradient spans all cells
    pub fn from_pivot(pivot: &PivotTable, style: &TableStyle) -> Self {
        let range = pivot.min_max();
        let num_fmt = style.num_fmt.as_ref();
        let cells = pivot
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&value| StyledCell::new(value, &style.color_scale, range, num_fmt))
                    .collect()
            })
            .collect();

        let row_label = style.label(&pivot.row_name);
        let col_label = style.label(&pivot.col_name);
        Self {
            caption: format!("{} - {} vs. {}", style.label(&pivot.value_name), row_label, col_label),
            row_title: row_label.to_string(),
            column_title: Some(col_label.to_string()),
            row_labels: pivot.row_values.iter().copied().map(format_default).collect(),
            column_labels: pivot.col_values.iter().copied().map(format_default).collect(),
            cells,
        }
    }

    /// Style the results of a one-parameter sweep, one row per distinct value.
    /// Repeated values are reduced with the style's aggregation.
    pub fn from_single(table: &SensitivityTable, param: &str, style: &TableStyle) -> Result<Self> {
        let reduced = table.aggregate(&[param], &style.aggregation)?;
        let values = reduced
            .column(param)
            .ok_or_else(|| SensitivityError::UnknownColumn(param.to_string()))?;
        let results = reduced.results();

        let range = finite_range(results.iter().copied());
        let num_fmt = style.num_fmt.as_ref();
        let cells = results
            .iter()
            .map(|&v| vec![StyledCell::new(Some(v), &style.color_scale, range, num_fmt)])
            .collect();

        let param_label = style.label(param);
        let result_label = style.label(table.result_name());
        Ok(Self {
            caption: format!("{result_label} - {param_label}"),
            row_title: param_label.to_string(),
            column_title: None,
            row_labels: values.iter().copied().map(format_default).collect(),
            column_labels: vec![result_label.to_string()],
            cells,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn n_cols(&self) -> usize {
        self.column_labels.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&StyledCell> {
        self.cells.get(row)?.get(col)
    }

    /// Self-contained HTML `<table>` with inline cell styles
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<table class=\"sensitivity-table\" style=\"border-collapse: collapse\">\n");
        html.push_str(&format!("  <caption>{}</caption>\n", escape_html(&self.caption)));
        html.push_str("  <thead>\n");
        if let Some(title) = &self.column_title {
            html.push_str(&format!(
                "    <tr><th></th><th colspan=\"{}\">{}</th></tr>\n",
                self.n_cols(),
                escape_html(title)
            ));
        }
        html.push_str(&format!("    <tr><th>{}</th>", escape_html(&self.row_title)));
        for label in &self.column_labels {
            html.push_str(&format!("<th>{}</th>", escape_html(label)));
        }
        html.push_str("</tr>\n  </thead>\n  <tbody>\n");

        for (label, row) in self.row_labels.iter().zip(&self.cells) {
            html.push_str(&format!("    <tr><th>{}</th>", escape_html(label)));
            for cell in row {
                let text = escape_html(&cell.text);
                match cell.background {
                    Some(background) => html.push_str(&format!(
                        "<td style=\"background-color: {background}; color: {}\">{text}</td>",
                        cell.foreground
                    )),
                    None => html.push_str(&format!("<td>{text}</td>")),
                }
            }
            html.push_str("</tr>\n");
        }
        html.push_str("  </tbody>\n</table>\n");
        html
    }

    /// Aligned plain-text rendering without colours
    pub fn to_plain(&self) -> String {
        let header_row: Vec<&str> = std::iter::once(self.row_title.as_str())
            .chain(self.column_labels.iter().map(String::as_str))
            .collect();
        let body_rows: Vec<Vec<&str>> = self
            .row_labels
            .iter()
            .zip(&self.cells)
            .map(|(label, row)| {
                std::iter::once(label.as_str())
                    .chain(row.iter().map(|cell| cell.text.as_str()))
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = header_row.iter().map(|s| s.chars().count()).collect();
        for row in &body_rows {
            for (width, text) in widths.iter_mut().zip(row) {
                *width = (*width).max(text.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&self.caption);
        out.push('\n');
        if let Some(title) = &self.column_title {
            out.push_str(&format!("{:>width$}  {title}\n", "", width = widths[0]));
        }
        let render_row = |out: &mut String, row: &[&str]| {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(text, &width)| format!("{text:>width$}"))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        };
        render_row(&mut out, &header_row);
        let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(rule));
        out.push('\n');
        for row in &body_rows {
            render_row(&mut out, row);
        }
        out
    }
}

/// Ordered collection of styled tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledTables {
    tables: Vec<(TableKey, StyledTable)>,
}

impl StyledTables {
    /// Build the styled tables for a result table.
    ///
    /// One swept parameter gives a single table; two or more give one
    /// pivot per unordered pair, in declaration order.
    pub fn build(table: &SensitivityTable, style: &TableStyle) -> Result<Self> {
        let names = table.param_names();
        let tables = match names {
            [] => return Err(SensitivityError::NoParameters),
            [only] => vec![(
                TableKey::Single(only.clone()),
                StyledTable::from_single(table, only, style)?,
            )],
            _ => pairs(names)
                .map(|(a, b)| {
                    let pivot = table.pivot(a, b, &style.aggregation)?;
                    Ok((TableKey::pair(a, b), StyledTable::from_pivot(&pivot, style)))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        tracing::debug!(tables = tables.len(), "built styled tables");
        Ok(Self { tables })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, key: &TableKey) -> Option<&StyledTable> {
        self.tables.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TableKey> {
        self.tables.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &StyledTable)> {
        self.tables.iter().map(|(k, t)| (k, t))
    }

    /// All tables as consecutive HTML fragments
    pub fn to_html(&self) -> String {
        self.tables
            .iter()
            .map(|(_, table)| table.to_html())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tables as plain text separated by blank lines
    pub fn to_plain(&self) -> String {
        self.tables
            .iter()
            .map(|(_, table)| table.to_plain())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl IntoIterator for StyledTables {
    type Item = (TableKey, StyledTable);
    type IntoIter = std::vec::IntoIter<(TableKey, StyledTable)>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

/// Unordered pairs `(a, b)` with `a` declared before `b`
pub fn pairs(names: &[String]) -> impl Iterator<Item = (&str, &str)> {
    names.iter().enumerate().flat_map(move |(i, a)| {
        names[i + 1..].iter().map(move |b| (a.as_str(), b.as_str()))
    })
}

/// Escape text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
