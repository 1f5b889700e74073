use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use serde::Serialize;

use crate::analysis::{Analysis, PairAnalysis};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::render::TableData;
use crate::stats::descriptive::{round2, round_to};

// ---------------------------------------------------------------------------
// Cells: one value in an exported table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

/// A row type exported to CSV, XLSX and the PDF table pages.
pub trait TableRow: Serialize {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Mean, spread and letters of one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub variable: String,
    pub factor: String,
    pub level: String,
    pub mean: f64,
    pub std: Option<f64>,
    pub count: usize,
    pub letters: String,
    pub test: String,
}

impl TableRow for SummaryRow {
    const HEADERS: &'static [&'static str] = &[
        "Variável", "Fator", "Nível", "mean", "std", "count", "Letra", "Teste",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.variable.clone()),
            Cell::Text(self.factor.clone()),
            Cell::Text(self.level.clone()),
            Cell::Number(self.mean),
            self.std.into(),
            Cell::Number(self.count as f64),
            Cell::Text(self.letters.clone()),
            Cell::Text(self.test.clone()),
        ]
    }
}

/// Full descriptive statistics of one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveRow {
    pub variable: String,
    pub factor: String,
    pub level: String,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std: Option<f64>,
    pub count: usize,
}

impl TableRow for DescriptiveRow {
    const HEADERS: &'static [&'static str] = &[
        "Variável", "Fator", "Nível", "mean", "median", "min", "max", "std", "count",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.variable.clone()),
            Cell::Text(self.factor.clone()),
            Cell::Text(self.level.clone()),
            Cell::Number(self.mean),
            Cell::Number(self.median),
            Cell::Number(self.min),
            Cell::Number(self.max),
            self.std.into(),
            Cell::Number(self.count as f64),
        ]
    }
}

/// ANOVA or Kruskal-Wallis result of one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnibusRow {
    pub variable: String,
    pub factor: String,
    pub test: String,
    pub statistic: Option<f64>,
    /// `"k-1"` or `"k-1, n-k"`.
    pub df: String,
    pub p_value: Option<f64>,
}

impl TableRow for OmnibusRow {
    const HEADERS: &'static [&'static str] =
        &["Variável", "Fator", "Teste", "Estatística", "gl", "p"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.variable.clone()),
            Cell::Text(self.factor.clone()),
            Cell::Text(self.test.clone()),
            self.statistic.into(),
            Cell::Text(self.df.clone()),
            self.p_value.into(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Building rows from an analysis (variables outer, factors inner)
// ---------------------------------------------------------------------------

pub fn summary_rows(analysis: &Analysis, config: &AnalysisConfig) -> Vec<SummaryRow> {
    analysis
        .by_variable(config)
        .into_iter()
        .flat_map(|pair| {
            pair.groups.iter().map(move |g| SummaryRow {
                variable: pair.variable.clone(),
                factor: pair.factor.clone(),
                level: g.group.label(),
                mean: round2(g.stats.mean),
                std: g.stats.std.map(round2),
                count: g.stats.count,
                letters: g.letters.clone(),
                test: pair.test.label().to_string(),
            })
        })
        .collect()
}

pub fn descriptive_rows(analysis: &Analysis, config: &AnalysisConfig) -> Vec<DescriptiveRow> {
    analysis
        .by_variable(config)
        .into_iter()
        .flat_map(|pair| {
            pair.groups.iter().map(move |g| DescriptiveRow {
                variable: pair.variable.clone(),
                factor: pair.factor.clone(),
                level: g.group.label(),
                mean: round2(g.stats.mean),
                median: round2(g.stats.median),
                min: round2(g.stats.min),
                max: round2(g.stats.max),
                std: g.stats.std.map(round2),
                count: g.stats.count,
            })
        })
        .collect()
}

pub fn omnibus_rows(analysis: &Analysis, config: &AnalysisConfig) -> Vec<OmnibusRow> {
    analysis
        .by_variable(config)
        .into_iter()
        .map(omnibus_row)
        .collect()
}

fn omnibus_row(pair: &PairAnalysis) -> OmnibusRow {
    let (statistic, df, p_value) = match pair.omnibus {
        Some(o) => (
            o.statistic.is_finite().then(|| round2(o.statistic)),
            match o.df2 {
                Some(df2) => format!("{:.0}, {:.0}", o.df1, df2),
                None => format!("{:.0}", o.df1),
            },
            Some(round_to(o.p_value, 4)),
        ),
        None => (None, String::new(), None),
    };
    OmnibusRow {
        variable: pair.variable.clone(),
        factor: pair.factor.clone(),
        test: pair.test.omnibus_label().to_string(),
        statistic,
        df,
        p_value,
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Semicolon-separated CSV with a header row, even when `rows` is empty.
pub fn write_csv<R: TableRow>(path: &Path, rows: &[R]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(R::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Single-sheet workbook: bold shaded header, frozen first row, autofit.
pub fn write_xlsx<R: TableRow>(path: &Path, sheet: &str, rows: &[R]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9D9D9))
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;
    for (col, name) in R::HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let xr = r as u32 + 1;
        for (col, cell) in row.cells().into_iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(xr, col as u16, s)?;
                }
                Cell::Number(v) => {
                    worksheet.write_number(xr, col as u16, v)?;
                }
                Cell::Empty => {}
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    workbook.save(path)?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Text version of `rows` for the PDF table pages.
pub fn table_data<R: TableRow>(title: &str, rows: &[R]) -> TableData {
    TableData {
        title: title.to_string(),
        headers: R::HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.cells().iter().map(Cell::to_string).collect())
            .collect(),
    }
}
