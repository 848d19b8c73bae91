// Library exports for plotwrap

pub mod builder;
pub mod dataset;
pub mod error;
pub mod ir;
pub mod palette;
pub mod render;
pub mod scale;
pub mod shell;

pub use builder::{build_plot, PlotArgs};
pub use dataset::{Column, Dataset};
pub use error::PlotError;
pub use ir::ChartSpec;
pub use shell::{launch, launch_with, ShellOutcome};
