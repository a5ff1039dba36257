//! Tests for the analyzer entry point
//!
//! These tests verify:
//! - The analyzer stores the sweep table with the configured result name
//! - Styled tables cover every parameter pair with a gradient over all cells
//! - Number formats and labels flow into the rendered tables
//! - Hex-bin plots are produced for every pair and render to SVG

use crate::analyzer::{HexPlotOptions, SensitivityAnalyzer, sensitivity_hex_plots};
use crate::color::{ColorMap, ColorScale, Rgb};
use crate::error::{ModelError, SensitivityError};
use crate::format::NumberFormat;
use crate::model::{FixedArgs, Params};
use crate::style::TableKey;
use crate::values::SensitivityValues;

fn add_5_to_values(p: &Params) -> Result<f64, ModelError> {
    Ok(p.value("value1")? + p.value("value2")? + 5.0)
}

fn add_10_to_values(p: &Params) -> Result<f64, ModelError> {
    let value3 = p.get("value3").unwrap_or(5.0);
    Ok(p.value("value1")? + p.value("value2")? + value3 + 10.0)
}

fn two_values() -> SensitivityValues {
    SensitivityValues::new()
        .with("value1", [1.0, 2.0])
        .with("value2", [4.0, 5.0])
}

fn three_values() -> SensitivityValues {
    two_values().with("value3", [6.0, 7.0])
}

fn analyzer() -> SensitivityAnalyzer {
    SensitivityAnalyzer::builder(two_values(), add_5_to_values)
        .result_name("my_res")
        .build()
        .unwrap()
}

#[test]
fn test_create() {
    let sa = analyzer();
    assert_eq!(sa.result_name(), "my_res");
    assert_eq!(sa.grid_size(), 8, "default grid size");
    assert!(!sa.reverse_colors());
    assert_eq!(sa.color_map(), ColorMap::RdYlGn);
    assert!(sa.num_fmt().is_none());
}

#[test]
fn test_table() {
    let sa = analyzer();
    let table = sa.table();
    assert_eq!(table.columns(), vec!["value1", "value2", "my_res"]);
    assert_eq!(table.results(), &[10.0, 11.0, 11.0, 12.0]);
}

#[test]
fn test_styled_tables_two_values() {
    let styled = analyzer().styled_tables().unwrap();
    assert_eq!(styled.len(), 1);

    let table = styled.get(&TableKey::pair("value1", "value2")).unwrap();
    assert_eq!(table.caption, "my_res - value1 vs. value2");
    assert_eq!(table.row_labels, vec!["1", "2"]);
    assert_eq!(table.column_labels, vec!["4", "5"]);
    assert_eq!(table.cell(0, 0).unwrap().text, "10");
    assert_eq!(table.cell(1, 1).unwrap().text, "12");

    let low = table.cell(0, 0).unwrap().background.unwrap();
    let high = table.cell(1, 1).unwrap().background.unwrap();
    let scale = ColorScale::default();
    assert_eq!(low, scale.color_at(0.0), "minimum takes the low end");
    assert_eq!(high, scale.color_at(1.0), "maximum takes the high end");
    assert_eq!(
        table.cell(0, 1).unwrap().background,
        table.cell(1, 0).unwrap().background,
        "equal values share a colour"
    );
}

#[test]
fn test_styled_tables_three_values() {
    let sa = SensitivityAnalyzer::builder(three_values(), add_10_to_values)
        .result_name("my_res")
        .build()
        .unwrap();
    let styled = sa.styled_tables().unwrap();

    let keys: Vec<String> = styled.keys().map(ToString::to_string).collect();
    assert_eq!(
        keys,
        vec!["value1 vs. value2", "value1 vs. value3", "value2 vs. value3"]
    );

    // value1=1, value2=4 averages value3=6 and value3=7: (21 + 22) / 2
    let table = styled.get(&TableKey::pair("value1", "value2")).unwrap();
    assert_eq!(table.cell(0, 0).unwrap().value, Some(21.5));
    assert_eq!(table.cell(1, 1).unwrap().value, Some(23.5));

    let html = styled.to_html();
    assert_eq!(html.matches("<table").count(), 3);
    assert!(html.contains("my_res - value2 vs. value3"));
}

#[test]
fn test_num_fmt_and_labels() {
    let sa = SensitivityAnalyzer::builder(two_values(), |p: &Params| {
        add_5_to_values(p).map(|v| v * 1000.0)
    })
    .result_name("my_res")
    .num_fmt(NumberFormat::parse("${:,.0f}").unwrap())
    .label("value1", "First")
    .label("my_res", "Money")
    .build()
    .unwrap();

    let styled = sa.styled_tables().unwrap();
    let table = styled.get(&TableKey::pair("value1", "value2")).unwrap();
    assert_eq!(table.caption, "Money - First vs. value2");
    assert_eq!(table.row_title, "First");
    assert_eq!(table.cell(1, 1).unwrap().text, "$12,000");

    let plain = sa
        .styled_tables_with(Some(&NumberFormat::parse("{:.1f}").unwrap()))
        .unwrap()
        .to_plain();
    assert!(plain.contains("12000.0"), "override format applies: {plain}");
}

#[test]
fn test_reverse_colors() {
    let forward = analyzer().styled_tables().unwrap();
    let reversed = SensitivityAnalyzer::builder(two_values(), add_5_to_values)
        .result_name("my_res")
        .reverse_colors(true)
        .build()
        .unwrap()
        .styled_tables()
        .unwrap();

    let key = TableKey::pair("value1", "value2");
    let forward_low = forward.get(&key).unwrap().cell(0, 0).unwrap().background;
    let reversed_high = reversed.get(&key).unwrap().cell(1, 1).unwrap().background;
    assert_eq!(forward_low, reversed_high);
}

#[test]
fn test_single_parameter_table() {
    let values = SensitivityValues::new().with("x", [3.0, 1.0, 2.0]);
    let sa = SensitivityAnalyzer::builder(values, |p: &Params| p.get("x").unwrap_or(0.0) * 2.0)
        .build()
        .unwrap();
    let styled = sa.styled_tables().unwrap();
    let table = styled.get(&TableKey::Single("x".to_string())).unwrap();

    assert_eq!(table.caption, "Result - x");
    assert_eq!(table.row_labels, vec!["3", "1", "2"], "declaration order");
    assert_eq!(table.column_labels, vec!["Result"]);
    assert_eq!(table.cell(1, 0).unwrap().text, "2");

    assert!(matches!(sa.plot(), Err(SensitivityError::NotEnoughParameters(1))));
}

#[test]
fn test_plot() {
    let sa = SensitivityAnalyzer::builder(three_values(), add_10_to_values)
        .result_name("my_res")
        .grid_size(4)
        .build()
        .unwrap();
    let figure = sa.plot().unwrap();

    assert_eq!(figure.panels.len(), 3);
    assert_eq!(figure.rows(), 1);
    assert_eq!(figure.result_label, "my_res");
    for panel in &figure.panels {
        assert_eq!(panel.bins.total_count(), 8, "every row lands in a bin");
    }
    let svg = figure.to_svg().unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn test_hex_plots_function() {
    let options = HexPlotOptions {
        result_name: "my_res".to_string(),
        grid_size: 5,
        ..HexPlotOptions::default()
    };
    let figure =
        sensitivity_hex_plots(&two_values(), &add_5_to_values, &FixedArgs::new(), &options)
            .unwrap();
    assert_eq!(figure.panels.len(), 1);
    let panel = figure.panel("value1", "value2").unwrap();
    let (lo, hi) = panel.bins.value_range().unwrap();
    assert!(lo >= 10.0 && hi <= 12.0);

    let single = SensitivityValues::new().with("value1", [1.0]);
    assert!(matches!(
        sensitivity_hex_plots(&single, &add_5_to_values, &FixedArgs::new(), &options),
        Err(SensitivityError::NotEnoughParameters(1))
    ));
}

#[test]
fn test_build_rejects_invalid_settings() {
    assert!(matches!(
        SensitivityAnalyzer::builder(two_values(), add_5_to_values)
            .grid_size(0)
            .build(),
        Err(SensitivityError::InvalidGridSize(0))
    ));
    assert!(matches!(
        SensitivityAnalyzer::builder(two_values(), add_5_to_values)
            .result_name("value1")
            .build(),
        Err(SensitivityError::ResultNameCollision(name)) if name == "value1"
    ));
    assert!(matches!(
        SensitivityAnalyzer::builder(two_values(), add_10_to_values)
            .fixed_arg("value2", 1.0)
            .build(),
        Err(SensitivityError::FixedArgumentCollision(name)) if name == "value2"
    ));
}

#[test]
fn test_text_color_contrasts_with_background() {
    let styled = analyzer().styled_tables().unwrap();
    let table = styled.get(&TableKey::pair("value1", "value2")).unwrap();
    for cell in table.cells.iter().flatten() {
        let background = cell.background.unwrap();
        assert_eq!(cell.foreground, background.text_color());
        assert!(cell.foreground == Rgb::BLACK || cell.foreground == Rgb::LIGHT);
    }
}
