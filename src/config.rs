//! Analysis configuration.
//!
//! Defaults reproduce the soil survey this tool was written for; a JSON file
//! can override any subset of fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::stats::dunn::PAdjust;
use crate::stats::letters::LetterScheme;
use crate::stats::PostHocTest;

/// Top-level configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input table.
    pub input: PathBuf,

    /// Field delimiter of the input table.
    pub delimiter: char,

    /// Decimal separator used by numeric cells (`.` or `,`).
    pub decimal: char,

    /// Variables analysed with ANOVA + Tukey HSD.
    pub parametric: Vec<String>,

    /// Variables analysed with Kruskal-Wallis + Dunn.
    pub nonparametric: Vec<String>,

    /// Grouping factors, in report order.
    pub factors: Vec<String>,

    /// Significance level for every test.
    pub alpha: f64,

    /// Multiplicity correction of Dunn's p-values.
    pub p_adjust: PAdjust,

    /// How significance letters are derived from the pairwise results.
    pub letters: LetterScheme,

    pub output: OutputConfig,

    pub plot: PlotConfig,

    pub report: ReportConfig,
}

/// Output locations. Relative paths are resolved against `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub plots_dir: PathBuf,
    /// Stem of the summary table; `.csv` and `.xlsx` are appended.
    pub summary: String,
    pub descriptive: String,
    pub omnibus: String,
    pub report: PathBuf,
}

/// Boxplot figure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width_in: f32,
    pub height_in: f32,
    pub dpi: f32,
    /// `{var}` and `{factor}` are substituted.
    pub title_template: String,
}

/// Text and layout of the combined PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub subtitle: String,
    pub summary_title: String,
    pub descriptive_title: String,
    pub omnibus_title: String,
    /// Raster resolution of cover and table pages.
    pub page_dpi: f32,
    pub rows_per_page: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("dados_tcc_limpo_sem_extras.csv"),
            delimiter: ';',
            decimal: '.',
            parametric: ["PH_AGUA", "PH_CACL", "PH_KCL", "ACIDEZ", "ALUMINIO"]
                .map(String::from)
                .to_vec(),
            nonparametric: ["SODIO", "POTASSIO"].map(String::from).to_vec(),
            factors: ["PONTOS", "PROFUNDIDADE"].map(String::from).to_vec(),
            alpha: 0.05,
            p_adjust: PAdjust::default(),
            letters: LetterScheme::default(),
            output: OutputConfig::default(),
            plot: PlotConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            plots_dir: PathBuf::from("graficos_tcc"),
            summary: "resumo_estatistico_tcc".to_string(),
            descriptive: "tabela_descritiva_tcc".to_string(),
            omnibus: "testes_globais_tcc".to_string(),
            report: PathBuf::from("tcc_relatorio_completo.pdf"),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width_in: 8.0,
            height_in: 5.0,
            dpi: 300.0,
            title_template: "{var} por {factor} — ANOVA/Kruskal + pós-hoc".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Análise estatística e gráfica — TCC".to_string(),
            subtitle: "Relatório gráfico e estatístico — TCC".to_string(),
            summary_title: "Resumo estatístico por grupo e profundidade".to_string(),
            descriptive_title: "Tabela descritiva completa".to_string(),
            omnibus_title: "Testes globais (ANOVA / Kruskal-Wallis)".to_string(),
            page_dpi: 150.0,
            rows_per_page: 28,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check the configuration before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.parametric.is_empty() && self.nonparametric.is_empty() {
            return Err(AnalysisError::config(
                "parametric",
                "no variables to analyse",
            ));
        }
        if self.factors.is_empty() {
            return Err(AnalysisError::config("factors", "no grouping factor given"));
        }
        if let Some(both) = self
            .parametric
            .iter()
            .find(|v| self.nonparametric.contains(v))
        {
            return Err(AnalysisError::config(
                "nonparametric",
                format!("'{both}' is also listed as parametric"),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AnalysisError::config(
                "alpha",
                format!("{} is outside (0, 1)", self.alpha),
            ));
        }
        if !self.delimiter.is_ascii() {
            return Err(AnalysisError::config(
                "delimiter",
                "must be a single ASCII character",
            ));
        }
        if self.decimal != '.' && self.decimal != ',' {
            return Err(AnalysisError::config("decimal", "must be '.' or ','"));
        }
        if self.decimal == ',' && self.delimiter == ',' {
            return Err(AnalysisError::config(
                "decimal",
                "cannot equal the delimiter",
            ));
        }
        if self.plot.width_in <= 0.0 || self.plot.height_in <= 0.0 || self.plot.dpi <= 0.0 {
            return Err(AnalysisError::config("plot", "size and dpi must be positive"));
        }
        if self.report.page_dpi <= 0.0 {
            return Err(AnalysisError::config("report.page_dpi", "must be positive"));
        }
        if self.report.rows_per_page == 0 {
            return Err(AnalysisError::config(
                "report.rows_per_page",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parametric variables first, then non-parametric ones.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parametric
            .iter()
            .chain(self.nonparametric.iter())
            .map(String::as_str)
    }

    /// Which post-hoc test applies to `var`, if it is analysed at all.
    pub fn test_for(&self, var: &str) -> Option<PostHocTest> {
        if self.parametric.iter().any(|v| v == var) {
            Some(PostHocTest::TukeyHsd)
        } else if self.nonparametric.iter().any(|v| v == var) {
            Some(PostHocTest::Dunn(self.p_adjust))
        } else {
            None
        }
    }

    /// Every column the input must provide.
    pub fn required_columns(&self) -> Vec<&str> {
        self.variables()
            .chain(self.factors.iter().map(String::as_str))
            .collect()
    }

    pub fn output_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output.dir.join(relative)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_path(&self.output.plots_dir)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_path(&self.output.report)
    }

    pub fn boxplot_path(&self, var: &str, factor: &str) -> PathBuf {
        self.plots_dir().join(format!("{var}_{factor}_boxplot.png"))
    }

    pub fn plot_title(&self, var: &str, factor: &str) -> String {
        self.plot
            .title_template
            .replace("{var}", var)
            .replace("{factor}", factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.variables().count(), 7);
        assert_eq!(
            config.test_for("SODIO"),
            Some(PostHocTest::Dunn(PAdjust::Bonferroni))
        );
        assert_eq!(config.test_for("PH_KCL"), Some(PostHocTest::TukeyHsd));
        assert_eq!(config.test_for("PONTOS"), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "alpha": 0.01, "p_adjust": "holm", "plot": { "dpi": 100 } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.plot.dpi, 100.0);
        assert_eq!(config.plot.width_in, 8.0);
        assert_eq!(config.factors, vec!["PONTOS", "PROFUNDIDADE"]);
        assert_eq!(config.letters, LetterScheme::Compact);
        assert_eq!(config.test_for("SODIO"), Some(PostHocTest::Dunn(PAdjust::Holm)));
    }

    #[test]
    fn rejects_variable_in_both_lists() {
        let mut config = AnalysisConfig::default();
        config.nonparametric.push("ACIDEZ".into());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::Config { ref field, .. } if field == "nonparametric"));
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        let config = AnalysisConfig {
            alpha: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn paths_and_titles() {
        let config = AnalysisConfig {
            output: OutputConfig {
                dir: PathBuf::from("/tmp/out"),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.boxplot_path("SODIO", "PONTOS"),
            PathBuf::from("/tmp/out/graficos_tcc/SODIO_PONTOS_boxplot.png")
        );
        assert_eq!(
            config.plot_title("SODIO", "PONTOS"),
            "SODIO por PONTOS — ANOVA/Kruskal + pós-hoc"
        );
    }
}
