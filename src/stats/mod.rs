//! Statistics: descriptive summaries, omnibus tests, post-hoc pairwise
//! comparisons and significance letters.

pub mod descriptive;
pub mod dunn;
pub mod letters;
pub mod omnibus;
pub mod ranks;
pub mod tukey;

use serde::{Deserialize, Serialize};

use dunn::PAdjust;

/// Post-hoc procedure applied to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostHocTest {
    /// Tukey–Kramer honest significant difference, after one-way ANOVA.
    TukeyHsd,
    /// Dunn's rank test, after Kruskal–Wallis.
    Dunn(PAdjust),
}

impl PostHocTest {
    pub fn label(&self) -> &'static str {
        match self {
            PostHocTest::TukeyHsd => "Tukey HSD",
            PostHocTest::Dunn(PAdjust::Bonferroni) => "Dunn (Bonferroni)",
            PostHocTest::Dunn(PAdjust::Holm) => "Dunn (Holm)",
            PostHocTest::Dunn(PAdjust::None) => "Dunn",
        }
    }

    pub fn omnibus_label(&self) -> &'static str {
        match self {
            PostHocTest::TukeyHsd => "ANOVA",
            PostHocTest::Dunn(_) => "Kruskal-Wallis",
        }
    }
}

/// One pairwise comparison between groups `a < b` (indices into the
/// level-ordered group list).
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub a: usize,
    pub b: usize,
    /// Mean difference `b − a` (Tukey) or mean-rank difference (Dunn).
    pub estimate: f64,
    /// Studentized range `q` (Tukey) or `|z|` (Dunn).
    pub statistic: f64,
    /// Multiplicity-adjusted p-value.
    pub p_value: f64,
    /// Simultaneous confidence interval of `estimate`, when the test has one.
    pub ci: Option<(f64, f64)>,
    pub reject: bool,
}

impl Comparison {
    pub fn involves(&self, group: usize) -> bool {
        self.a == group || self.b == group
    }
}

/// Whether groups `i` and `j` differ according to `comparisons`.
pub fn differs(comparisons: &[Comparison], i: usize, j: usize) -> bool {
    comparisons
        .iter()
        .any(|c| c.reject && i != j && c.involves(i) && c.involves(j))
}
