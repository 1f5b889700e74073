use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use super::ranks::average_ranks;
use super::Comparison;

/// Family-wise correction applied to Dunn's raw p-values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PAdjust {
    #[default]
    Bonferroni,
    Holm,
    None,
}

/// Dunn's test: pairwise p-values as a symmetric matrix (unit diagonal)
/// and as a comparison list in `(a, b)`, `a < b` order.
#[derive(Debug, Clone)]
pub struct DunnResult {
    pub mean_ranks: Vec<f64>,
    pub p_matrix: Vec<Vec<f64>>,
    pub comparisons: Vec<Comparison>,
}

/// Dunn's rank-sum post-hoc test over `groups`, ranks taken jointly and
/// ties corrected. Returns `None` for fewer than two non-empty groups.
pub fn dunn(groups: &[&[f64]], adjust: PAdjust, alpha: f64) -> Option<DunnResult> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.is_empty()) {
        return None;
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let ranking = average_ranks(&pooled);

    let mut mean_ranks = Vec::with_capacity(k);
    let mut offset = 0;
    for g in groups {
        let sum: f64 = ranking.ranks[offset..offset + g.len()].iter().sum();
        mean_ranks.push(sum / g.len() as f64);
        offset += g.len();
    }

    let variance_base = n * (n + 1.0) / 12.0 - ranking.tie_sum / (12.0 * (n - 1.0));

    let mut raw = Vec::with_capacity(k * (k - 1) / 2);
    for a in 0..k {
        for b in (a + 1)..k {
            let diff = mean_ranks[b] - mean_ranks[a];
            let se = (variance_base
                * (1.0 / groups[a].len() as f64 + 1.0 / groups[b].len() as f64))
                .sqrt();
            let (z, p) = if se > 0.0 && se.is_finite() {
                let z = diff.abs() / se;
                (z, erfc(z / std::f64::consts::SQRT_2))
            } else {
                (0.0, 1.0)
            };
            raw.push((a, b, diff, z, p));
        }
    }

    let adjusted = adjust_p(&raw.iter().map(|r| r.4).collect::<Vec<_>>(), adjust);

    let mut p_matrix = vec![vec![1.0; k]; k];
    let comparisons = raw
        .into_iter()
        .zip(adjusted)
        .map(|((a, b, diff, z, _), p)| {
            p_matrix[a][b] = p;
            p_matrix[b][a] = p;
            Comparison {
                a,
                b,
                estimate: diff,
                statistic: z,
                p_value: p,
                ci: None,
                reject: p < alpha,
            }
        })
        .collect();

    Some(DunnResult {
        mean_ranks,
        p_matrix,
        comparisons,
    })
}

/// Adjust a family of p-values, results clipped to 1.
pub fn adjust_p(p: &[f64], method: PAdjust) -> Vec<f64> {
    let m = p.len() as f64;
    match method {
        PAdjust::None => p.to_vec(),
        PAdjust::Bonferroni => p.iter().map(|v| (v * m).min(1.0)).collect(),
        PAdjust::Holm => {
            let mut order: Vec<usize> = (0..p.len()).collect();
            order.sort_by(|&a, &b| p[a].total_cmp(&p[b]));
            let mut out = vec![0.0; p.len()];
            let mut running = 0.0f64;
            for (rank, &idx) in order.iter().enumerate() {
                let scaled = ((m - rank as f64) * p[idx]).min(1.0);
                running = running.max(scaled);
                out[idx] = running;
            }
            out
        }
    }
}
