//! Post-hoc statistics for soil survey tables.
//!
//! Each configured variable is compared across the levels of each grouping
//! factor: ANOVA + Tukey HSD for parametric variables, Kruskal-Wallis + Dunn
//! for the others. Results come out as annotated boxplots, CSV/XLSX tables
//! and one combined PDF report.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod stats;

pub use analysis::{analyze, Analysis, PairAnalysis};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use pipeline::{run, RunSummary};
