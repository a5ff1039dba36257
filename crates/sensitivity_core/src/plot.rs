//! Grid of hex-bin plots, one per pair of swept parameters, rendered to SVG.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::{ColorScale, Rgb};
use crate::error::{Result, SensitivityError};
use crate::hexbin::{HexBins, check_grid_size};
use crate::style::{TableStyle, pairs};
use crate::table::SensitivityTable;

/// Subplots per figure row
pub const COLUMNS: usize = 3;
/// Figure width in pixels
pub const FIGURE_WIDTH: u32 = 1500;
/// Height of one row of subplots in pixels
pub const ROW_HEIGHT: u32 = 400;

const COLORBAR_WIDTH: u32 = 90;
const COLORBAR_STEPS: usize = 64;

/// One subplot: `x_name` against `y_name`
#[derive(Debug, Clone, PartialEq)]
pub struct HexPanel {
    pub x_name: String,
    pub y_name: String,
    pub x_label: String,
    pub y_label: String,
    pub bins: HexBins,
}

/// Hex-bin plots for every pair of swept parameters
#[derive(Debug, Clone, PartialEq)]
pub struct HexFigure {
    pub panels: Vec<HexPanel>,
    /// Colour bar label
    pub result_label: String,
    pub color_scale: ColorScale,
}

impl HexFigure {
    /// Bin every parameter pair of `table`. Needs at least two swept parameters.
    pub fn from_table(table: &SensitivityTable, style: &TableStyle, grid_size: usize) -> Result<Self> {
        let names = table.param_names();
        if names.len() < 2 {
            return Err(SensitivityError::NotEnoughParameters(names.len()));
        }
        check_grid_size(grid_size)?;

        let panels = pairs(names)
            .map(|(x, y)| {
                Ok(HexPanel {
                    x_name: x.to_string(),
                    y_name: y.to_string(),
                    x_label: style.label(x).to_string(),
                    y_label: style.label(y).to_string(),
                    bins: HexBins::from_table(table, x, y, grid_size, &style.aggregation)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(panels = panels.len(), grid_size, "built hex-bin figure");
        Ok(Self {
            panels,
            result_label: style.label(table.result_name()).to_string(),
            color_scale: style.color_scale,
        })
    }

    pub fn rows(&self) -> usize {
        self.panels.len().div_ceil(COLUMNS)
    }

    /// Figure size in pixels
    pub fn size(&self) -> (u32, u32) {
        (FIGURE_WIDTH, ROW_HEIGHT * self.rows() as u32)
    }

    pub fn panel(&self, x_name: &str, y_name: &str) -> Option<&HexPanel> {
        self.panels
            .iter()
            .find(|p| p.x_name == x_name && p.y_name == y_name)
    }

    pub fn to_svg(&self) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size()).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;
            let areas = root.split_evenly((self.rows(), COLUMNS));
            for (panel, area) in self.panels.iter().zip(&areas) {
                self.draw_panel(panel, area)?;
            }
            root.present().map_err(render_error)?;
        }
        Ok(svg)
    }

    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_svg()?)?;
        Ok(())
    }

    fn draw_panel<DB: DrawingBackend>(
        &self,
        panel: &HexPanel,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        let bins = &panel.bins;
        let (lo, hi) = colorbar_range(bins.value_range());
        let (width, _) = area.dim_in_pixel();
        let (plot_area, bar_area) = area.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));

        let x_pad = bins.sx / 2.0;
        let y_pad = bins.sy / 3.0;
        let mut chart = ChartBuilder::on(&plot_area)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (bins.x_range.0 - x_pad)..(bins.x_range.1 + x_pad),
                (bins.y_range.0 - y_pad)..(bins.y_range.1 + y_pad),
            )
            .map_err(render_error)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(panel.x_label.as_str())
            .y_desc(panel.y_label.as_str())
            .draw()
            .map_err(render_error)?;
        chart
            .draw_series(bins.cells.iter().map(|cell| {
                let color = rgb_color(self.color_scale.color_for(cell.value, lo, hi));
                Polygon::new(bins.hexagon(cell.center).to_vec(), color.filled())
            }))
            .map_err(render_error)?;

        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(10)
            .margin_bottom(50)
            .margin_right(10)
            .right_y_label_area_size(60)
            .build_cartesian_2d(0.0..1.0, lo..hi)
            .map_err(render_error)?;
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc(self.result_label.as_str())
            .draw()
            .map_err(render_error)?;
        let step = (hi - lo) / COLORBAR_STEPS as f64;
        bar.draw_series((0..COLORBAR_STEPS).map(|k| {
            let v0 = lo + step * k as f64;
            let t = (k as f64 + 0.5) / COLORBAR_STEPS as f64;
            let color = rgb_color(self.color_scale.color_at(t));
            Rectangle::new([(0.0, v0), (1.0, v0 + step)], color.filled())
        }))
        .map_err(render_error)?;

        Ok(())
    }
}

/// Colour bar limits; a single value is shown with a unit-wide bar around it
fn colorbar_range(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    }
}

fn rgb_color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.r, rgb.g, rgb.b)
}

fn render_error(err: impl std::fmt::Display) -> SensitivityError {
    SensitivityError::Render(err.to_string())
}
