use std::fmt;

/// Line dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStyle::Solid => "-",
            LineStyle::Dashed => "--",
            LineStyle::Dotted => ":",
            LineStyle::DashDot => "-.",
        }
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color and dash pattern for one plotted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    pub color: &'static str,
    pub linestyle: LineStyle,
}

const COLORS: [&str; 7] = ["r", "b", "g", "y", "k", "m", "c"];

/// Stock "tab10" palette, the cycle in effect when no custom cycle is installed.
const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
const LINESTYLES: [LineStyle; 4] = [
    LineStyle::Solid,
    LineStyle::Dashed,
    LineStyle::Dotted,
    LineStyle::DashDot,
];

/// Property cycle walked by successive series on an axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropCycle {
    entries: Vec<SeriesStyle>,
}

impl PropCycle {
    /// Seven colors against four dash patterns, 28 distinct pairs before repeating.
    pub fn color_linestyle() -> Self {
        let colors = COLORS.iter().cycle().take(COLORS.len() * LINESTYLES.len());
        let styles = LINESTYLES.iter().cycle();
        let entries = colors
            .zip(styles)
            .map(|(&color, &linestyle)| SeriesStyle { color, linestyle })
            .collect();
        Self { entries }
    }

    /// The charting default: tab10 colors, all solid.
    pub fn tab10() -> Self {
        let entries = TAB10
            .iter()
            .map(|&color| SeriesStyle {
                color,
                linestyle: LineStyle::Solid,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Style of the `index`-th series, wrapping around.
    pub fn get(&self, index: usize) -> SeriesStyle {
        self.entries[index % self.entries.len()]
    }
}

/// Explicit plot-session style, passed to each plotting call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub prop_cycle: PropCycle,
    pub mathtext_fontset: String,
    pub font_family: String,
    pub font_size: Option<f32>,
    pub legend_font_size: Option<f32>,
    pub tick_label_size: Option<f32>,
}

impl PlotStyle {
    /// Build the session style. `modify_cycler` installs the color × dash cycle;
    /// otherwise the stock tab10 cycle stays in place.
    pub fn init(
        font_size: Option<f32>,
        legend_font_size: Option<f32>,
        modify_cycler: bool,
        tick_size: Option<f32>,
    ) -> Self {
        Self {
            prop_cycle: if modify_cycler {
                PropCycle::color_linestyle()
            } else {
                PropCycle::tab10()
            },
            mathtext_fontset: "stix".to_string(),
            font_family: "STIXGeneral".to_string(),
            font_size,
            legend_font_size,
            tick_label_size: tick_size,
        }
    }

    pub fn series(&self, index: usize) -> SeriesStyle {
        self.prop_cycle.get(index)
    }
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self::init(None, None, true, None)
    }
}
