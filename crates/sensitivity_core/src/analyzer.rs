//! Entry points: [`SensitivityAnalyzer`] and the one-shot functions
//! [`sensitivity_table`], [`sensitivity_styled_tables`] and
//! [`sensitivity_hex_plots`].

use std::collections::BTreeMap;

use crate::aggregate::Aggregation;
use crate::color::{ColorMap, ColorScale};
use crate::error::{Result, SensitivityError};
use crate::evaluate::{EvaluateOptions, SweepProgress, evaluate_table};
use crate::format::NumberFormat;
use crate::hexbin::check_grid_size;
use crate::model::{FixedArgs, Model};
use crate::plot::HexFigure;
use crate::style::{StyledTables, TableStyle};
use crate::table::SensitivityTable;
use crate::values::SensitivityValues;

pub const DEFAULT_RESULT_NAME: &str = "Result";
pub const DEFAULT_GRID_SIZE: usize = 8;

/// Runs a model over every combination of the sensitivity values and
/// exposes the results as a table, styled tables and hex-bin plots.
///
/// The sweep runs once, in [`SensitivityAnalyzerBuilder::build`]; the
/// renderings are derived from the stored table on demand.
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    values: SensitivityValues,
    fixed: FixedArgs,
    grid_size: usize,
    reverse_colors: bool,
    color_map: ColorMap,
    style: TableStyle,
    table: SensitivityTable,
}

impl SensitivityAnalyzer {
    pub fn builder<M: Model>(values: SensitivityValues, model: M) -> SensitivityAnalyzerBuilder<'static, M> {
        SensitivityAnalyzerBuilder::new(values, model)
    }

    pub fn values(&self) -> &SensitivityValues {
        &self.values
    }

    /// One row per evaluated combination (or per sample)
    pub fn table(&self) -> &SensitivityTable {
        &self.table
    }

    pub fn into_table(self) -> SensitivityTable {
        self.table
    }

    pub fn result_name(&self) -> &str {
        self.table.result_name()
    }

    pub fn fixed(&self) -> &FixedArgs {
        &self.fixed
    }

    pub fn aggregation(&self) -> &Aggregation {
        &self.style.aggregation
    }

    pub fn reverse_colors(&self) -> bool {
        self.reverse_colors
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn color_map(&self) -> ColorMap {
        self.color_map
    }

    pub fn color_scale(&self) -> ColorScale {
        self.style.color_scale
    }

    pub fn num_fmt(&self) -> Option<&NumberFormat> {
        self.style.num_fmt.as_ref()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.style.labels
    }

    /// Display name of a parameter or the result
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.style.label(name)
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    /// Colour-graded tables using the configured number format
    pub fn styled_tables(&self) -> Result<StyledTables> {
        StyledTables::build(&self.table, &self.style)
    }

    /// Colour-graded tables with a different number format
    pub fn styled_tables_with(&self, num_fmt: Option<&NumberFormat>) -> Result<StyledTables> {
        let style = TableStyle {
            num_fmt: num_fmt.cloned(),
            ..self.style.clone()
        };
        StyledTables::build(&self.table, &style)
    }

    /// Hex-bin plots for every pair of swept parameters
    pub fn plot(&self) -> Result<HexFigure> {
        HexFigure::from_table(&self.table, &self.style, self.grid_size)
    }
}

/// Configures and runs a [`SensitivityAnalyzer`]
pub struct SensitivityAnalyzerBuilder<'a, M> {
    values: SensitivityValues,
    model: M,
    result_name: String,
    aggregation: Aggregation,
    reverse_colors: bool,
    grid_size: usize,
    color_map: ColorMap,
    num_fmt: Option<NumberFormat>,
    labels: BTreeMap<String, String>,
    fixed: FixedArgs,
    options: EvaluateOptions,
    progress: Option<&'a SweepProgress>,
}

impl<'a, M: Model> SensitivityAnalyzerBuilder<'a, M> {
    pub fn new(values: SensitivityValues, model: M) -> Self {
        Self {
            values,
            model,
            result_name: DEFAULT_RESULT_NAME.to_string(),
            aggregation: Aggregation::default(),
            reverse_colors: false,
            grid_size: DEFAULT_GRID_SIZE,
            color_map: ColorMap::default(),
            num_fmt: None,
            labels: BTreeMap::new(),
            fixed: FixedArgs::new(),
            options: EvaluateOptions::default(),
            progress: None,
        }
    }

    /// Name of the result column and colour bar label
    #[must_use]
    pub fn result_name(mut self, name: impl Into<String>) -> Self {
        self.result_name = name.into();
        self
    }

    /// Reduction for results sharing a table cell or hexagon
    #[must_use]
    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Show low results in green and high results in red (with the default map)
    #[must_use]
    pub fn reverse_colors(mut self, reverse: bool) -> Self {
        self.reverse_colors = reverse;
        self
    }

    /// Hexagons across each plot
    #[must_use]
    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    #[must_use]
    pub fn color_map(mut self, color_map: ColorMap) -> Self {
        self.color_map = color_map;
        self
    }

    /// Set the map and its orientation together, replacing both
    /// `color_map` and `reverse_colors`
    #[must_use]
    pub fn color_scale(mut self, scale: ColorScale) -> Self {
        self.color_map = scale.map;
        self.reverse_colors = scale.reversed;
        self
    }

    #[must_use]
    pub fn num_fmt(mut self, num_fmt: NumberFormat) -> Self {
        self.num_fmt = Some(num_fmt);
        self
    }

    #[must_use]
    pub fn labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn label(mut self, name: impl Into<String>, display: impl Into<String>) -> Self {
        self.labels.insert(name.into(), display.into());
        self
    }

    /// Keyword arguments passed to every model call
    #[must_use]
    pub fn fixed(mut self, fixed: FixedArgs) -> Self {
        self.fixed = fixed;
        self
    }

    #[must_use]
    pub fn fixed_arg(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fixed.insert(name, value);
        self
    }

    #[must_use]
    pub fn options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }

    /// Report progress to (and poll cancellation from) `progress`
    #[must_use]
    pub fn progress<'b>(self, progress: &'b SweepProgress) -> SensitivityAnalyzerBuilder<'b, M> {
        SensitivityAnalyzerBuilder {
            values: self.values,
            model: self.model,
            result_name: self.result_name,
            aggregation: self.aggregation,
            reverse_colors: self.reverse_colors,
            grid_size: self.grid_size,
            color_map: self.color_map,
            num_fmt: self.num_fmt,
            labels: self.labels,
            fixed: self.fixed,
            options: self.options,
            progress: Some(progress),
        }
    }

    /// Run the sweep
    pub fn build(self) -> Result<SensitivityAnalyzer> {
        check_grid_size(self.grid_size)?;
        let table = evaluate_table(
            &self.values,
            &self.model,
            &self.fixed,
            &self.result_name,
            &self.options,
            self.progress,
        )?;
        tracing::info!(
            parameters = self.values.len(),
            rows = table.len(),
            result = %self.result_name,
            "sensitivity analysis complete"
        );

        Ok(SensitivityAnalyzer {
            values: self.values,
            fixed: self.fixed,
            grid_size: self.grid_size,
            reverse_colors: self.reverse_colors,
            color_map: self.color_map,
            style: TableStyle {
                color_scale: ColorScale::new(self.color_map, self.reverse_colors),
                num_fmt: self.num_fmt,
                labels: self.labels,
                aggregation: self.aggregation,
            },
            table,
        })
    }
}

/// Evaluate `model` over every combination of `values`
pub fn sensitivity_table<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    result_name: &str,
) -> Result<SensitivityTable> {
    evaluate_table(
        values,
        model,
        fixed,
        result_name,
        &EvaluateOptions::default(),
        None,
    )
}

/// Settings of [`sensitivity_styled_tables`]
#[derive(Debug, Clone)]
pub struct StyledTableOptions {
    pub result_name: String,
    pub aggregation: Aggregation,
    pub reverse_colors: bool,
    pub color_map: ColorMap,
    pub num_fmt: Option<NumberFormat>,
    pub labels: BTreeMap<String, String>,
}

impl Default for StyledTableOptions {
    fn default() -> Self {
        Self {
            result_name: DEFAULT_RESULT_NAME.to_string(),
            aggregation: Aggregation::default(),
            reverse_colors: false,
            color_map: ColorMap::default(),
            num_fmt: None,
            labels: BTreeMap::new(),
        }
    }
}

impl StyledTableOptions {
    fn style(&self) -> TableStyle {
        TableStyle {
            color_scale: ColorScale::new(self.color_map, self.reverse_colors),
            num_fmt: self.num_fmt.clone(),
            labels: self.labels.clone(),
            aggregation: self.aggregation.clone(),
        }
    }
}

/// Evaluate `model` over every combination of `values` and render the
/// colour-graded tables
pub fn sensitivity_styled_tables<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    options: &StyledTableOptions,
) -> Result<StyledTables> {
    let table = sensitivity_table(values, model, fixed, &options.result_name)?;
    StyledTables::build(&table, &options.style())
}

/// Settings of [`sensitivity_hex_plots`]
#[derive(Debug, Clone)]
pub struct HexPlotOptions {
    pub result_name: String,
    pub aggregation: Aggregation,
    pub reverse_colors: bool,
    pub grid_size: usize,
    pub color_map: ColorMap,
    pub labels: BTreeMap<String, String>,
}

impl Default for HexPlotOptions {
    fn default() -> Self {
        Self {
            result_name: DEFAULT_RESULT_NAME.to_string(),
            aggregation: Aggregation::default(),
            reverse_colors: false,
            grid_size: DEFAULT_GRID_SIZE,
            color_map: ColorMap::default(),
            labels: BTreeMap::new(),
        }
    }
}

/// Evaluate `model` over every combination of `values` and plot every
/// pair of parameters as a hex-bin grid
pub fn sensitivity_hex_plots<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    options: &HexPlotOptions,
) -> Result<HexFigure> {
    if values.len() < 2 {
        return Err(SensitivityError::NotEnoughParameters(values.len()));
    }
    let table = sensitivity_table(values, model, fixed, &options.result_name)?;
    let style = TableStyle {
        color_scale: ColorScale::new(options.color_map, options.reverse_colors),
        num_fmt: None,
        labels: options.labels.clone(),
        aggregation: options.aggregation.clone(),
    };
    HexFigure::from_table(&table, &style, options.grid_size)
}
