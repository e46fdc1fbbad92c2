use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::info;

use crate::error::PlotError;
use crate::plot::layout::Figure;

/// File formats a figure may be saved as.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExt {
    Png,
    Pdf,
}

impl ImageExt {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExt::Png => "png",
            ImageExt::Pdf => "pdf",
        }
    }
}

/// Save/show flags shared by every plotting subcommand.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct FigSaveArgs {
    /// Do not show plots
    #[arg(long)]
    pub silent: bool,
    /// Save plots
    #[arg(long)]
    pub save: bool,
    /// Plot save extension
    #[arg(long, value_enum, num_args = 0.., default_values_t = [ImageExt::Png, ImageExt::Pdf])]
    pub ext: Vec<ImageExt>,
}

impl Default for FigSaveArgs {
    fn default() -> Self {
        Self {
            silent: false,
            save: false,
            ext: vec![ImageExt::Png, ImageExt::Pdf],
        }
    }
}

/// Rendering backend a figure is drawn through.
pub trait Canvas {
    /// Shrink padding so labels fit.
    fn tight_layout(&mut self, figure: &Figure);
    /// Write the figure to `path`, cropped to its content.
    fn save(&mut self, figure: &Figure, path: &Path) -> io::Result<()>;
    /// Display the figure interactively.
    fn show(&mut self, figure: &Figure);
}

fn with_ext(file_path: &Path, ext: ImageExt) -> PathBuf {
    let mut name = OsString::from(file_path.as_os_str());
    name.push(".");
    name.push(ext.as_str());
    PathBuf::from(name)
}

/// Lay out, optionally save in every requested format, then show unless silent.
///
/// `file_path` has no extension; one file per entry in `args.ext` is written
/// next to it. Returns the saved paths.
pub fn save_show_fig(
    args: &FigSaveArgs,
    canvas: &mut dyn Canvas,
    figure: &Figure,
    file_path: &Path,
) -> Result<Vec<PathBuf>, PlotError> {
    canvas.tight_layout(figure);

    let mut saved = Vec::new();
    if args.save {
        for &ext in &args.ext {
            let path = with_ext(file_path, ext);
            canvas
                .save(figure, &path)
                .map_err(|source| PlotError::Save {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), "saved figure");
            saved.push(path);
        }
    }
    if !args.silent {
        canvas.show(figure);
    }
    Ok(saved)
}
