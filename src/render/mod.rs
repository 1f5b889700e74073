//! Raster rendering of figures and report pages.
//!
//! ```text
//! fonts ──> canvas ──┬──> boxplot  (one PNG per variable × factor)
//!                    ├──> cover    (report title page)
//!                    └──> table    (paginated summary tables)
//! color ─────────────┘
//! ```

pub mod boxplot;
pub mod canvas;
pub mod color;
pub mod cover;
pub mod fonts;
pub mod table;

pub use boxplot::render_boxplot;
pub use canvas::Canvas;
pub use cover::render_cover;
pub use fonts::Fonts;
pub use table::{render_table_pages, TableData};
