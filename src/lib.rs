pub mod archive;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod field;
pub mod filter;
pub mod gnuplot;
pub mod label;
pub mod mandelbrot;
pub mod page;
pub mod parser;
pub mod pivot;
pub mod report;
pub mod sort_order;

pub use config::{ChartSpec, OutputFormat, Registry, RenderOptions, Renderer};
pub use dataset::Dataset;
pub use error::{ReportError, Result};
pub use field::Field;
pub use label::LabelTranslator;
pub use parser::{Pairing, ResultFileParser};
pub use report::{run, Report, RunRequest};
pub use sort_order::SortOrder;
