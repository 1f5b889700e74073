/// Joint ranks of a sample, ties sharing their average rank (1-based).
#[derive(Debug, Clone)]
pub struct Ranking {
    pub ranks: Vec<f64>,
    /// `Σ (t³ − t)` over tie blocks of size `t`.
    pub tie_sum: f64,
}

pub fn average_ranks(values: &[f64]) -> Ranking {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut tie_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks start+1 ..= end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_sum += t * t * t - t;
        start = end;
    }

    Ranking { ranks, tie_sum }
}
