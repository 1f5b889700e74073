use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use super::descriptive::mean;
use super::ranks::average_ranks;

/// Result of a k-sample test across all groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OmnibusResult {
    pub statistic: f64,
    pub df1: f64,
    /// Denominator degrees of freedom (ANOVA only).
    pub df2: Option<f64>,
    pub p_value: f64,
}

/// One-way ANOVA F test.
pub fn one_way_anova(groups: &[&[f64]]) -> Option<OmnibusResult> {
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k || groups.iter().any(|g| g.is_empty()) {
        return None;
    }

    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
    let mut ssb = 0.0;
    let mut ssw = 0.0;
    for g in groups {
        let m = mean(g);
        ssb += g.len() as f64 * (m - grand).powi(2);
        ssw += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df1 = (k - 1) as f64;
    let df2 = (n - k) as f64;
    let msb = ssb / df1;
    let msw = ssw / df2;

    let (statistic, p_value) = if msw > 0.0 {
        let f = msb / msw;
        let dist = FisherSnedecor::new(df1, df2).ok()?;
        (f, dist.sf(f).clamp(0.0, 1.0))
    } else if msb > 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        (f64::NAN, 1.0)
    };

    Some(OmnibusResult {
        statistic,
        df1,
        df2: Some(df2),
        p_value,
    })
}

/// Kruskal–Wallis H test with tie correction.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Option<OmnibusResult> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.is_empty()) {
        return None;
    }
    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let ranking = average_ranks(&pooled);

    let mut h = 0.0;
    let mut offset = 0;
    for g in groups {
        let rank_sum: f64 = ranking.ranks[offset..offset + g.len()].iter().sum();
        h += rank_sum * rank_sum / g.len() as f64;
        offset += g.len();
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    let correction = 1.0 - ranking.tie_sum / (n * n * n - n);
    let df1 = (k - 1) as f64;
    if correction <= 0.0 {
        // every observation tied
        return Some(OmnibusResult {
            statistic: f64::NAN,
            df1,
            df2: None,
            p_value: 1.0,
        });
    }
    h /= correction;

    let dist = ChiSquared::new(df1).ok()?;
    Some(OmnibusResult {
        statistic: h,
        df1,
        df2: None,
        p_value: dist.sf(h).clamp(0.0, 1.0),
    })
}
