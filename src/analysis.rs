//! Per variable × factor analysis: descriptives, omnibus test, post-hoc
//! comparisons and letters.

use crate::config::AnalysisConfig;
use crate::data::groups::{group_values, Group};
use crate::data::model::Dataset;
use crate::error::{AnalysisError, Result};
use crate::stats::descriptive::{BoxStats, Descriptive};
use crate::stats::dunn::dunn;
use crate::stats::letters::assign_letters;
use crate::stats::omnibus::{kruskal_wallis, one_way_anova, OmnibusResult};
use crate::stats::tukey::tukey_hsd;
use crate::stats::{differs, Comparison, PostHocTest};

/// One factor level of an analysed pair.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub group: Group,
    pub stats: Descriptive,
    pub boxplot: BoxStats,
    pub letters: String,
}

/// Everything computed for one (variable, factor) pair.
#[derive(Debug, Clone)]
pub struct PairAnalysis {
    pub variable: String,
    pub factor: String,
    pub test: PostHocTest,
    /// Level-ordered.
    pub groups: Vec<GroupSummary>,
    pub comparisons: Vec<Comparison>,
    pub omnibus: Option<OmnibusResult>,
}

impl PairAnalysis {
    pub fn significant_pairs(&self) -> usize {
        self.comparisons.iter().filter(|c| c.reject).count()
    }
}

/// All pairs of a run, factors outer and variables inner.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub pairs: Vec<PairAnalysis>,
}

impl Analysis {
    pub fn get(&self, variable: &str, factor: &str) -> Option<&PairAnalysis> {
        self.pairs
            .iter()
            .find(|p| p.variable == variable && p.factor == factor)
    }

    /// Pairs reordered variables outer, factors inner (table order).
    pub fn by_variable<'a>(&'a self, config: &'a AnalysisConfig) -> Vec<&'a PairAnalysis> {
        config
            .variables()
            .flat_map(|var| {
                config
                    .factors
                    .iter()
                    .filter_map(move |factor| self.get(var, factor))
            })
            .collect()
    }
}

/// Analyse every configured variable against every configured factor.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<Analysis> {
    let mut pairs = Vec::new();
    for factor in &config.factors {
        for var in config.variables() {
            let test = config
                .test_for(var)
                .ok_or_else(|| AnalysisError::config("variables", format!("'{var}' has no test")))?;
            let pair = analyze_pair(dataset, var, factor, test, config)?;
            log::info!(
                "{var} by {factor}: {} groups, {} ({}), {} significant pairs",
                pair.groups.len(),
                test.label(),
                pair.omnibus
                    .map(|o| format!("{} p = {:.4}", test.omnibus_label(), o.p_value))
                    .unwrap_or_else(|| "no omnibus test".to_string()),
                pair.significant_pairs()
            );
            pairs.push(pair);
        }
    }
    Ok(Analysis { pairs })
}

pub fn analyze_pair(
    dataset: &Dataset,
    var: &str,
    factor: &str,
    test: PostHocTest,
    config: &AnalysisConfig,
) -> Result<PairAnalysis> {
    let groups = group_values(dataset, var, factor)?;
    if groups.is_empty() {
        return Err(AnalysisError::insufficient(var, factor, "no observations"));
    }
    if groups.len() < 2 {
        log::warn!("{var} by {factor}: only one group, no comparisons made");
    }

    let slices: Vec<&[f64]> = groups.iter().map(|g| g.values.as_slice()).collect();

    let (comparisons, omnibus) = match test {
        PostHocTest::TukeyHsd => {
            let hsd = tukey_hsd(&slices, config.alpha);
            if hsd.is_none() && groups.len() >= 2 {
                log::warn!("{var} by {factor}: no residual degrees of freedom for Tukey HSD");
            }
            (
                hsd.map(|h| h.comparisons).unwrap_or_default(),
                one_way_anova(&slices),
            )
        }
        PostHocTest::Dunn(adjust) => (
            dunn(&slices, adjust, config.alpha)
                .map(|d| d.comparisons)
                .unwrap_or_default(),
            kruskal_wallis(&slices),
        ),
    };

    let stats: Vec<Descriptive> = groups
        .iter()
        .map(|g| {
            Descriptive::of(&g.values)
                .ok_or_else(|| AnalysisError::insufficient(var, factor, "empty group"))
        })
        .collect::<Result<_>>()?;
    let means: Vec<f64> = stats.iter().map(|s| s.mean).collect();
    let letters = assign_letters(config.letters, test, &means, |i, j| {
        differs(&comparisons, i, j)
    });

    let summaries = groups
        .into_iter()
        .zip(stats)
        .zip(letters)
        .map(|((group, stats), letters)| {
            let boxplot = BoxStats::of(&group.values)
                .ok_or_else(|| AnalysisError::insufficient(var, factor, "empty group"))?;
            Ok(GroupSummary {
                group,
                stats,
                boxplot,
                letters,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PairAnalysis {
        variable: var.to_string(),
        factor: factor.to_string(),
        test,
        groups: summaries,
        comparisons,
        omnibus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Sample};
    use crate::stats::dunn::PAdjust;
    use crate::stats::letters::LetterScheme;

    const DUNN: PostHocTest = PostHocTest::Dunn(PAdjust::Bonferroni);

    fn dataset(rows: &[(&str, f64)]) -> Dataset {
        let samples = rows
            .iter()
            .map(|(p, v)| Sample {
                cells: [
                    ("PONTOS".to_string(), CellValue::String(p.to_string())),
                    ("PH_AGUA".to_string(), CellValue::Float(*v)),
                    ("SODIO".to_string(), CellValue::Float(*v)),
                ]
                .into_iter()
                .collect(),
            })
            .collect();
        Dataset::from_samples(
            vec!["PONTOS".into(), "PH_AGUA".into(), "SODIO".into()],
            samples,
        )
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            parametric: vec!["PH_AGUA".into()],
            nonparametric: vec!["SODIO".into()],
            factors: vec!["PONTOS".into()],
            ..Default::default()
        }
    }

    #[test]
    fn tukey_pair_gets_letters() {
        let ds = dataset(&[
            ("P1", 1.0),
            ("P1", 1.2),
            ("P1", 0.9),
            ("P2", 5.0),
            ("P2", 5.2),
            ("P2", 4.9),
        ]);
        let pair = analyze_pair(&ds, "PH_AGUA", "PONTOS", PostHocTest::TukeyHsd, &config()).unwrap();
        assert_eq!(pair.groups.len(), 2);
        assert_eq!(pair.comparisons.len(), 1);
        assert!(pair.comparisons[0].reject);
        assert_eq!(pair.groups[0].letters, "b");
        assert_eq!(pair.groups[1].letters, "a");
        assert!(pair.omnibus.unwrap().p_value < 0.001);
    }

    #[test]
    fn single_group_is_all_a() {
        let ds = dataset(&[("P1", 1.0), ("P1", 2.0)]);
        let pair = analyze_pair(&ds, "SODIO", "PONTOS", DUNN, &config()).unwrap();
        assert!(pair.comparisons.is_empty());
        assert!(pair.omnibus.is_none());
        assert_eq!(pair.groups[0].letters, "a");
    }

    #[test]
    fn analyze_orders_factor_outer() {
        let ds = dataset(&[("P1", 1.0), ("P1", 2.0), ("P2", 3.0), ("P2", 4.0)]);
        let mut cfg = config();
        cfg.letters = LetterScheme::Sequential;
        let analysis = analyze(&ds, &cfg).unwrap();
        let names: Vec<&str> = analysis.pairs.iter().map(|p| p.variable.as_str()).collect();
        assert_eq!(names, vec!["PH_AGUA", "SODIO"]);
        assert_eq!(analysis.by_variable(&cfg).len(), 2);
        assert!(analysis.get("SODIO", "PONTOS").is_some());
    }

    #[test]
    fn variable_without_data_is_an_error() {
        let ds = Dataset::from_samples(vec!["PONTOS".into(), "SODIO".into()], vec![]);
        let err = analyze_pair(&ds, "SODIO", "PONTOS", DUNN, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { .. }));
    }
}
