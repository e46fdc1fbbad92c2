//! Plot styling, subplot layout and save/show policy.
//!
//! Style is an explicit [`PlotStyle`] owned by each [`Figure`] rather than
//! process-wide state. Drawing goes through the [`Canvas`] trait.

pub mod layout;
pub mod output;
pub mod style;

pub use layout::{Axes, Figure, Grid, SubplotArgs, fmt_ax, get_subplot_axes, get_subplot_config};
pub use output::{Canvas, FigSaveArgs, ImageExt, save_show_fig};
pub use style::{LineStyle, PlotStyle, PropCycle, SeriesStyle};
