use clap::Args;
use tracing::debug;

use crate::error::PlotError;
use crate::plot::style::{LineStyle, PlotStyle};

/// Subplot layout flags.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SubplotArgs {
    /// Subplot grid override: rows cols
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"])]
    pub subplot: Option<Vec<usize>>,
    /// Width and height per axis, in inches
    #[arg(long, num_args = 2, value_names = ["W", "H"], default_values_t = [4.0, 3.0])]
    pub ax_size: Vec<f64>,
}

impl Default for SubplotArgs {
    fn default() -> Self {
        Self::with_ax_size(4.0, 3.0)
    }
}

impl SubplotArgs {
    pub fn with_ax_size(width: f64, height: f64) -> Self {
        Self {
            subplot: None,
            ax_size: vec![width, height],
        }
    }

    pub fn grid_override(&self) -> Option<Grid> {
        match self.subplot.as_deref() {
            Some(&[rows, cols]) => Some(Grid { rows, cols }),
            _ => None,
        }
    }

    /// `(width, height)` per axis, falling back to 4×3.
    pub fn ax_size(&self) -> (f64, f64) {
        match self.ax_size.as_slice() {
            &[w, h] => (w, h),
            _ => (4.0, 3.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

/// Canonical grid for `count` axes.
pub fn get_subplot_config(count: usize) -> Result<Grid, PlotError> {
    let (rows, cols) = match count {
        1 => (1, 1),
        2 => (1, 2),
        3 => (1, 3),
        4 => (2, 2),
        5 | 6 => (2, 3),
        7..=9 => (3, 3),
        _ => return Err(PlotError::UnsupportedSubplotCount(count)),
    };
    Ok(Grid { rows, cols })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLines {
    pub alpha: f32,
    pub linestyle: LineStyle,
    pub linewidth: f32,
}

impl Default for GridLines {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            linestyle: LineStyle::DashDot,
            linewidth: 0.3,
        }
    }
}

/// One allocated axes and its formatting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axes {
    /// 1-based position in row-major order.
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    /// Legend placed at the best location when set.
    pub legend: bool,
    pub grid: Option<GridLines>,
    pub tick_label_size: Option<f32>,
}

/// Label, legend and grid an axes.
pub fn fmt_ax(
    ax: &mut Axes,
    style: &PlotStyle,
    xlabel: Option<&str>,
    ylabel: Option<&str>,
    legend: bool,
    grid: bool,
) {
    if legend {
        ax.legend = true;
    }
    if let Some(x) = xlabel.filter(|s| !s.is_empty()) {
        ax.xlabel = Some(x.to_string());
    }
    if let Some(y) = ylabel.filter(|s| !s.is_empty()) {
        ax.ylabel = Some(y.to_string());
    }
    if grid {
        ax.grid = Some(GridLines::default());
    }
    ax.tick_label_size = style.tick_label_size;
}

/// A figure owning its style, size and axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub style: PlotStyle,
    pub size_inches: (f64, f64),
    /// Grid chosen by the last [`get_subplot_axes`] call.
    pub grid: Option<Grid>,
    pub axes: Vec<Axes>,
}

impl Figure {
    pub fn new(style: PlotStyle) -> Self {
        Self {
            style,
            size_inches: (6.4, 4.8),
            grid: None,
            axes: Vec::new(),
        }
    }
}

/// Size `figure` for the grid and allocate `count` axes on it.
///
/// The grid comes from `args.subplot` when given, otherwise from
/// [`get_subplot_config`]. Returns the newly allocated axes.
pub fn get_subplot_axes<'f>(
    args: &SubplotArgs,
    count: usize,
    figure: &'f mut Figure,
) -> Result<&'f mut [Axes], PlotError> {
    let grid = match args.grid_override() {
        Some(grid) => grid,
        None => get_subplot_config(count)?,
    };
    if count > grid.cells() {
        return Err(PlotError::GridTooSmall {
            count,
            rows: grid.rows,
            cols: grid.cols,
        });
    }

    let (ax_w, ax_h) = args.ax_size();
    figure.size_inches = (ax_w * grid.cols as f64, ax_h * grid.rows as f64);
    figure.grid = Some(grid);

    let start = figure.axes.len();
    figure.axes.extend((0..count).map(|i| Axes {
        index: i + 1,
        row: i / grid.cols,
        col: i % grid.cols,
        ..Default::default()
    }));
    debug!(count, rows = grid.rows, cols = grid.cols, "allocated subplot axes");
    Ok(&mut figure.axes[start..])
}
