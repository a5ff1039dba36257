//! Hexagonal binning of (x, y, value) points.
//!
//! `nx = grid_size` hexagons across and `ny = nx / sqrt(3)` up, laid out
//! as two interleaved rectangular lattices. A point belongs to whichever
//! lattice centre is nearer in the hexagon metric; the values of each cell
//! are reduced with an [`Aggregation`]. Cells without points, or reducing
//! to NaN, are omitted.

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::color::finite_range;
use crate::error::{Result, SensitivityError};
use crate::table::SensitivityTable;

/// Relative widening applied to an axis whose values are all equal
const NONSINGULAR_EXPANDER: f64 = 0.1;

/// Largest accepted number of hexagons along x
pub const MAX_GRID_SIZE: usize = 1000;

/// Reject grid sizes outside `1..=MAX_GRID_SIZE`
pub fn check_grid_size(grid_size: usize) -> Result<()> {
    if grid_size == 0 || grid_size > MAX_GRID_SIZE {
        return Err(SensitivityError::InvalidGridSize(grid_size));
    }
    Ok(())
}

/// One non-empty hexagon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexCell {
    pub center: (f64, f64),
    /// Aggregated value of the points in this cell
    pub value: f64,
    /// Number of points in this cell
    pub count: usize,
}

/// Result of binning a set of points into hexagons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexBins {
    /// Hexagons along x
    pub nx: usize,
    /// Hexagons along y
    pub ny: usize,
    /// Binned x range (after widening and padding)
    pub x_range: (f64, f64),
    /// Binned y range (after widening)
    pub y_range: (f64, f64),
    /// Horizontal lattice spacing
    pub sx: f64,
    /// Vertical lattice spacing
    pub sy: f64,
    /// Non-empty cells, first lattice then second, each in lattice order
    pub cells: Vec<HexCell>,
}

impl HexBins {
    /// Bin the points `(x[i], y[i])` carrying `values[i]`.
    ///
    /// The three slices are read in lockstep; points with a non-finite
    /// coordinate are skipped.
    pub fn compute(
        x: &[f64],
        y: &[f64],
        values: &[f64],
        grid_size: usize,
        aggregation: &Aggregation,
    ) -> Result<Self> {
        check_grid_size(grid_size)?;

        let points: Vec<(f64, f64, f64)> = x
            .iter()
            .zip(y)
            .zip(values)
            .filter(|((x, y), _)| x.is_finite() && y.is_finite())
            .map(|((&x, &y), &c)| (x, y, c))
            .collect();

        let nx = grid_size;
        let ny = ((nx as f64 / 3f64.sqrt()) as usize).max(1);

        let (xmin, xmax) = nonsingular(extent(points.iter().map(|p| p.0)));
        let (ymin, ymax) = nonsingular(extent(points.iter().map(|p| p.1)));
        let padding = 1e-9 * (xmax - xmin);
        let (xmin, xmax) = (xmin - padding, xmax + padding);

        let sx = (xmax - xmin) / nx as f64;
        let sy = (ymax - ymin) / ny as f64;

        let (nx1, ny1) = (nx + 1, ny + 1);
        let (nx2, ny2) = (nx, ny);
        let mut lattice1: Vec<Vec<f64>> = vec![Vec::new(); nx1 * ny1];
        let mut lattice2: Vec<Vec<f64>> = vec![Vec::new(); nx2 * ny2];

        for &(px, py, c) in &points {
            let ix = (px - xmin) / sx;
            let iy = (py - ymin) / sy;
            let (ix1, iy1) = (ix.round_ties_even(), iy.round_ties_even());
            let (ix2, iy2) = (ix.floor(), iy.floor());

            let d1 = (ix - ix1).powi(2) + 3.0 * (iy - iy1).powi(2);
            let d2 = (ix - ix2 - 0.5).powi(2) + 3.0 * (iy - iy2 - 0.5).powi(2);

            if d1 < d2 {
                if let Some(slot) = lattice_slot(ix1, iy1, nx1, ny1) {
                    lattice1[slot].push(c);
                }
            } else if let Some(slot) = lattice_slot(ix2, iy2, nx2, ny2) {
                lattice2[slot].push(c);
            }
        }

        let mut cells = Vec::new();
        let lattices = [(&lattice1, ny1, 0.0), (&lattice2, ny2, 0.5)];
        for (lattice, rows, offset) in lattices {
            for (slot, bucket) in lattice.iter().enumerate() {
                if bucket.is_empty() {
                    continue;
                }
                let value = aggregation.apply(bucket);
                if value.is_nan() {
                    continue;
                }
                let (i, j) = (slot / rows, slot % rows);
                cells.push(HexCell {
                    center: (
                        (i as f64 + offset) * sx + xmin,
                        (j as f64 + offset) * sy + ymin,
                    ),
                    value,
                    count: bucket.len(),
                });
            }
        }

        tracing::trace!(points = points.len(), cells = cells.len(), nx, ny, "hex binning");

        Ok(Self {
            nx,
            ny,
            x_range: (xmin, xmax),
            y_range: (ymin, ymax),
            sx,
            sy,
            cells,
        })
    }

    /// Bin two columns of a result table, with the result column as values
    pub fn from_table(
        table: &SensitivityTable,
        x_name: &str,
        y_name: &str,
        grid_size: usize,
        aggregation: &Aggregation,
    ) -> Result<Self> {
        let x = table
            .column(x_name)
            .ok_or_else(|| SensitivityError::UnknownColumn(x_name.to_string()))?;
        let y = table
            .column(y_name)
            .ok_or_else(|| SensitivityError::UnknownColumn(y_name.to_string()))?;
        Self::compute(x, y, table.results(), grid_size, aggregation)
    }

    /// Corners of the hexagon centred at `center`
    pub fn hexagon(&self, center: (f64, f64)) -> [(f64, f64); 6] {
        const UNIT: [(f64, f64); 6] = [
            (0.5, -0.5),
            (0.5, 0.5),
            (0.0, 1.0),
            (-0.5, 0.5),
            (-0.5, -0.5),
            (0.0, -1.0),
        ];
        let (cx, cy) = center;
        UNIT.map(|(dx, dy)| (cx + dx * self.sx, cy + dy * self.sy / 3.0))
    }

    /// Smallest and largest finite cell value
    pub fn value_range(&self) -> Option<(f64, f64)> {
        finite_range(self.cells.iter().map(|cell| cell.value))
    }

    /// Number of points that landed in a drawn cell
    pub fn total_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.count).sum()
    }
}

fn lattice_slot(i: f64, j: f64, ni: usize, nj: usize) -> Option<usize> {
    if i < 0.0 || j < 0.0 {
        return None;
    }
    let (i, j) = (i as usize, j as usize);
    (i < ni && j < nj).then_some(i * nj + j)
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
        .unwrap_or((0.0, 1.0))
}

/// Widen a degenerate range: `v ± 0.1·|v|`, or `±0.1` around zero
fn nonsingular((vmin, vmax): (f64, f64)) -> (f64, f64) {
    const TINY: f64 = 1e-15;
    if !vmin.is_finite() || !vmax.is_finite() {
        return (-NONSINGULAR_EXPANDER, NONSINGULAR_EXPANDER);
    }
    let (vmin, vmax) = if vmax < vmin { (vmax, vmin) } else { (vmin, vmax) };
    let max_abs = vmin.abs().max(vmax.abs());
    if max_abs < 1e6 * f64::MIN_POSITIVE {
        (-NONSINGULAR_EXPANDER, NONSINGULAR_EXPANDER)
    } else if vmax - vmin <= max_abs * TINY {
        if vmax == 0.0 && vmin == 0.0 {
            (-NONSINGULAR_EXPANDER, NONSINGULAR_EXPANDER)
        } else {
            (
                vmin - NONSINGULAR_EXPANDER * vmin.abs(),
                vmax + NONSINGULAR_EXPANDER * vmax.abs(),
            )
        }
    } else {
        (vmin, vmax)
    }
}
