//! End-to-end run: load → analyse → tables → figures → PDF.

use std::path::{Path, PathBuf};

use crate::analysis::{analyze, Analysis};
use crate::config::AnalysisConfig;
use crate::data::loader::{load_file, LoadOptions};
use crate::data::model::Dataset;
use crate::error::{AnalysisError, Result};
use crate::render::{render_boxplot, render_cover, render_table_pages, Fonts, TableData};
use crate::report::tables::{table_data, TableRow};
use crate::report::{descriptive_rows, omnibus_rows, summary_rows, write_csv, write_xlsx, PdfReport};

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub samples: usize,
    pub pairs: usize,
    pub significant_pairs: usize,
    pub plots: Vec<PathBuf>,
    pub tables: Vec<PathBuf>,
    pub report: PathBuf,
    pub report_pages: usize,
}

impl RunSummary {
    /// Every file written, figures first.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.plots
            .iter()
            .chain(self.tables.iter())
            .chain(std::iter::once(&self.report))
            .map(PathBuf::as_path)
    }
}

pub fn run(config: &AnalysisConfig) -> Result<RunSummary> {
    config.validate()?;

    let plots_dir = config.plots_dir();
    create_dir(&config.output.dir)?;
    create_dir(&plots_dir)?;

    let options = LoadOptions {
        delimiter: config.delimiter as u8,
        decimal: config.decimal,
    };
    let dataset = load_file(&config.input, &options)?;
    check_columns(&dataset, config)?;

    let analysis = analyze(&dataset, config)?;
    let fonts = Fonts::load()?;

    let mut summary = RunSummary {
        samples: dataset.len(),
        pairs: analysis.pairs.len(),
        significant_pairs: analysis.pairs.iter().map(|p| p.significant_pairs()).sum(),
        report: config.report_path(),
        ..Default::default()
    };

    summary.tables = write_tables(&analysis, config)?;

    let mut report = PdfReport::new(config.report.title.clone());
    let cover = render_cover(
        &config.report,
        &format!(
            "Gerado por soil-posthoc {} · {} amostras · α = {}",
            env!("CARGO_PKG_VERSION"),
            dataset.len(),
            config.alpha
        ),
        &fonts,
    );
    report.push("Capa", cover, config.report.page_dpi);

    for pair in &analysis.pairs {
        let title = config.plot_title(&pair.variable, &pair.factor);
        let image = render_boxplot(pair, &title, &config.plot, &fonts)?;
        let path = config.boxplot_path(&pair.variable, &pair.factor);
        image.save(&path)?;
        log::info!("Saved {}", path.display());
        summary.plots.push(path);
        report.push(title, image, config.plot.dpi);
    }

    let tables = [
        table_data(&config.report.summary_title, &summary_rows(&analysis, config)),
        table_data(&config.report.descriptive_title, &descriptive_rows(&analysis, config)),
        table_data(&config.report.omnibus_title, &omnibus_rows(&analysis, config)),
    ];
    for table in &tables {
        push_table(&mut report, table, config, &fonts);
    }

    summary.report_pages = report.len();
    report.save(&summary.report)?;

    log::info!(
        "Done: {} pairs, {} significant comparisons, {} report pages",
        summary.pairs,
        summary.significant_pairs,
        summary.report_pages
    );
    Ok(summary)
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Every configured column must exist and every variable must be numeric.
fn check_columns(dataset: &Dataset, config: &AnalysisConfig) -> Result<()> {
    dataset.require_columns(&config.required_columns())?;
    for var in config.variables() {
        let values = dataset.numeric_values(var)?;
        log::debug!("{var}: {} of {} values present", values.len(), dataset.len());
    }
    for factor in &config.factors {
        let levels = dataset.levels(factor);
        if levels.len() < 2 {
            log::warn!("Factor {factor} has {} level(s); nothing to compare", levels.len());
        } else {
            log::info!("Factor {factor}: {} levels", levels.len());
        }
    }
    Ok(())
}

fn write_tables(analysis: &Analysis, config: &AnalysisConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    written.extend(write_table(
        config,
        &config.output.summary,
        "Resumo",
        &summary_rows(analysis, config),
    )?);
    written.extend(write_table(
        config,
        &config.output.descriptive,
        "Descritiva",
        &descriptive_rows(analysis, config),
    )?);
    written.extend(write_table(
        config,
        &config.output.omnibus,
        "Testes globais",
        &omnibus_rows(analysis, config),
    )?);
    Ok(written)
}

/// `{stem}.csv` and `{stem}.xlsx` in the output directory.
fn write_table<R: TableRow>(
    config: &AnalysisConfig,
    stem: &str,
    sheet: &str,
    rows: &[R],
) -> Result<[PathBuf; 2]> {
    let csv_path = config.output_path(format!("{stem}.csv"));
    let xlsx_path = config.output_path(format!("{stem}.xlsx"));
    write_csv(&csv_path, rows)?;
    write_xlsx(&xlsx_path, sheet, rows)?;
    Ok([csv_path, xlsx_path])
}

fn push_table(report: &mut PdfReport, table: &TableData, config: &AnalysisConfig, fonts: &Fonts) {
    let pages = render_table_pages(table, &config.report, fonts);
    let total = pages.len();
    for (i, page) in pages.into_iter().enumerate() {
        let title = if total > 1 {
            format!("{} ({}/{total})", table.title, i + 1)
        } else {
            table.title.clone()
        };
        report.push(title, page, config.report.page_dpi);
    }
}
