//! Writes the results of a sweep to an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use sensitivity_core::{SensitivityAnalyzer, SensitivityError};

use crate::util::io::atomic_write;

pub const CSV_FILE: &str = "results.csv";
pub const JSON_FILE: &str = "results.json";
pub const TABLES_FILE: &str = "tables.html";
pub const PLOT_FILE: &str = "hexbin.svg";

const STYLESHEET: &str = "body { font-family: sans-serif; margin: 2em; }
table.sensitivity-table { margin-bottom: 2em; }
table.sensitivity-table caption { font-weight: bold; padding: 0.5em; }
table.sensitivity-table th, table.sensitivity-table td { padding: 0.3em 0.8em; text-align: right; }";

/// Wrap the styled tables in a standalone HTML document
pub fn tables_document(title: &str, tables_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{STYLESHEET}\n</style>\n</head>\n<body>\n{tables_html}</body>\n</html>\n",
        title = sensitivity_core::style::escape_html(title),
    )
}

/// Write the CSV and JSON tables, the styled tables and, with at least two
/// swept parameters, the hex-bin figure. Returns the written paths.
pub fn write_report(
    analyzer: &SensitivityAnalyzer,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, SensitivityError> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    let mut write = |name: &str, content: String| -> Result<(), SensitivityError> {
        let path = out_dir.join(name);
        atomic_write(&path, content)?;
        tracing::debug!(path = %path.display(), "wrote report file");
        written.push(path);
        Ok(())
    };

    let table = analyzer.table();
    write(CSV_FILE, table.to_csv())?;
    write(JSON_FILE, table.to_json()?)?;

    let tables = analyzer.styled_tables()?;
    let title = format!("Sensitivity analysis - {}", analyzer.label(analyzer.result_name()));
    write(TABLES_FILE, tables_document(&title, &tables.to_html()))?;

    if analyzer.values().len() >= 2 {
        write(PLOT_FILE, analyzer.plot()?.to_svg()?)?;
    } else {
        tracing::info!("skipping hex-bin plot for a single parameter");
    }

    tracing::info!(files = written.len(), out_dir = %out_dir.display(), "report written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensitivity_core::{ModelError, Params, SensitivityValues};
    use tempfile::tempdir;

    fn analyzer(values: SensitivityValues) -> SensitivityAnalyzer {
        SensitivityAnalyzer::builder(values, |p: &Params| -> Result<f64, ModelError> {
            Ok(p.value("value1")? + p.get("value2").unwrap_or(0.0) + 5.0)
        })
        .result_name("my_res")
        .build()
        .unwrap()
    }

    #[test]
    fn test_two_parameter_report() {
        let dir = tempdir().unwrap();
        let values = SensitivityValues::new()
            .with("value1", [1.0, 2.0])
            .with("value2", [4.0, 5.0]);

        let written = write_report(&analyzer(values), dir.path()).unwrap();
        assert_eq!(written.len(), 4);

        let csv = fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
        assert_eq!(csv.lines().next(), Some("value1,value2,my_res"));
        assert_eq!(csv.lines().count(), 5);

        let html = fs::read_to_string(dir.path().join(TABLES_FILE)).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("my_res - value1 vs. value2"));

        let svg = fs::read_to_string(dir.path().join(PLOT_FILE)).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_single_parameter_report_skips_plot() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let values = SensitivityValues::new().with("value1", [1.0, 2.0, 3.0]);

        let written = write_report(&analyzer(values), &out).unwrap();
        assert_eq!(written.len(), 3);
        assert!(!out.join(PLOT_FILE).exists());

        let json = fs::read_to_string(out.join(JSON_FILE)).unwrap();
        assert!(json.contains("\"result_name\": \"my_res\""));
    }

    #[test]
    fn test_document_escapes_title() {
        let doc = tables_document("a < b", "<table></table>\n");
        assert!(doc.contains("<title>a &lt; b</title>"));
        assert!(doc.contains("<table></table>"));
    }
}
