#![doc = include_str!("../README.md")]
pub mod chart;
pub mod dataset;
pub mod month;
pub mod shell;
pub mod summary;
pub mod viewer;

pub use chart::{Charts, CompareError, MonthlyComparison, TrendChart};
pub use dataset::{Dataset, Record};
pub use month::{Month, ParseMonthError};
pub use shell::Shell;
pub use summary::{Stats, Summary};
pub use viewer::{CommandViewer, NoViewer, Viewer};
