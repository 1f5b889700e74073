//! Tukey–Kramer HSD and the studentized range distribution.
//!
//! `ptukey` integrates the range of `cc` standard normals over the
//! chi distribution of the pooled standard error with Gauss–Legendre
//! quadrature (Copenhaver & Holland, 1988). `qtukey` inverts it with a
//! secant search started from Odeh–Evans style percentile approximations.

use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;

use super::descriptive::mean;
use super::Comparison;

const SQRT_2PI: f64 = 2.506_628_274_631_000_7;

// Gauss–Legendre nodes and weights, 12 points (half), used by `wprob`.
const XLEG: [f64; 6] = [
    0.981_560_634_246_719_250_690_549_090_149,
    0.904_117_256_370_474_856_678_465_866_119,
    0.769_902_674_194_304_687_036_893_833_213,
    0.587_317_954_286_617_447_296_702_418_941,
    0.367_831_498_998_180_193_752_691_536_644,
    0.125_233_408_511_468_915_472_441_369_464,
];
const ALEG: [f64; 6] = [
    0.047_175_336_386_511_827_194_615_961_485,
    0.106_939_325_995_318_430_960_254_718_194,
    0.160_078_328_543_346_226_334_652_529_543,
    0.203_167_426_723_065_921_749_064_455_810,
    0.233_492_536_538_354_808_760_849_898_925,
    0.249_147_045_813_402_785_000_562_436_043,
];

// 16 points (half), used for the outer integral over the df.
const XLEGQ: [f64; 8] = [
    0.989_400_934_991_649_932_596_154_173_450,
    0.944_575_023_073_232_576_077_988_415_535,
    0.865_631_202_387_831_743_880_467_897_712,
    0.755_404_408_355_003_033_895_101_194_847,
    0.617_876_244_402_643_748_446_671_764_049,
    0.458_016_777_657_227_386_342_419_442_984,
    0.281_603_550_779_258_913_230_460_501_460,
    0.950_125_098_376_374_401_853_193_354_250e-1,
];
const ALEGQ: [f64; 8] = [
    0.271_524_594_117_540_948_517_805_724_560e-1,
    0.622_535_239_386_478_928_628_438_369_944e-1,
    0.951_585_116_824_927_848_099_251_076_022e-1,
    0.124_628_971_255_533_872_052_476_282_192,
    0.149_595_988_816_576_732_081_501_730_547,
    0.169_156_519_395_002_538_189_312_079_030,
    0.182_603_415_044_923_588_866_763_667_969,
    0.189_450_610_455_068_496_285_396_723_208,
];

fn pnorm(x: f64) -> f64 {
    // mean 0, sd 1 is always a valid parameterisation
    Normal::standard().cdf(x)
}

/// Probability that the range of `cc` standard normals, replicated `rr`
/// times, is below `w` (infinite degrees of freedom).
fn wprob(w: f64, rr: f64, cc: f64) -> f64 {
    const NLEG: usize = 12;
    const IHALF: usize = 6;
    const C1: f64 = -30.0;
    const C2: f64 = -50.0;
    const C3: f64 = 60.0;
    const BB: f64 = 8.0;
    const WLAR: f64 = 3.0;
    const WINCR1: f64 = 2.0;
    const WINCR2: f64 = 3.0;

    let qsqz = w * 0.5;
    if qsqz >= BB {
        return 1.0;
    }

    // P(|Z| < qsqz)^cc
    let mut pr_w = 2.0 * pnorm(qsqz) - 1.0;
    if pr_w >= (C2 / cc).exp() {
        pr_w = pr_w.powf(cc);
    } else {
        pr_w = 0.0;
    }

    let wincr = if w > WLAR { WINCR1 } else { WINCR2 };

    let mut blb = qsqz;
    let binc = (BB - qsqz) / wincr;
    let mut bub = blb + binc;
    let mut einsum = 0.0;
    let cc1 = cc - 1.0;

    let mut wi = 1.0;
    while wi <= wincr {
        let mut elsum = 0.0;
        let a = 0.5 * (bub + blb);
        let b = 0.5 * (bub - blb);

        for jj in 1..=NLEG {
            let (j, xx) = if IHALF < jj {
                let j = NLEG - jj + 1;
                (j, XLEG[j - 1])
            } else {
                (jj, -XLEG[jj - 1])
            };
            let c = b * xx;
            let ac = a + c;

            let qexpo = ac * ac;
            if qexpo > C3 {
                break;
            }

            let pplus = 2.0 * pnorm(ac);
            let pminus = 2.0 * pnorm(ac - w);

            let mut rinsum = pplus * 0.5 - pminus * 0.5;
            if rinsum >= (C1 / cc1).exp() {
                rinsum = ALEG[j - 1] * (-(0.5 * qexpo)).exp() * rinsum.powf(cc1);
                elsum += rinsum;
            }
        }
        elsum *= (2.0 * b) * cc / SQRT_2PI;
        einsum += elsum;
        blb = bub;
        bub += binc;
        wi += 1.0;
    }

    pr_w += einsum;
    if pr_w <= (C1 / rr).exp() {
        return 0.0;
    }
    pr_w = pr_w.powf(rr);
    pr_w.min(1.0)
}

/// CDF of the studentized range for `nmeans` means and `df` degrees of
/// freedom.
pub fn ptukey(q: f64, nmeans: f64, df: f64) -> f64 {
    const NLEGQ: usize = 16;
    const IHALFQ: usize = 8;
    const EPS1: f64 = -30.0;
    const EPS2: f64 = 1.0e-14;
    const DHAF: f64 = 100.0;
    const DQUAR: f64 = 800.0;
    const DEIGH: f64 = 5000.0;
    const DLARG: f64 = 25000.0;
    const ULEN1: f64 = 1.0;
    const ULEN2: f64 = 0.5;
    const ULEN3: f64 = 0.25;
    const ULEN4: f64 = 0.125;

    let rr = 1.0;
    let cc = nmeans;

    if q.is_nan() || df < 1.0 || cc < 2.0 {
        return f64::NAN;
    }
    if q <= 0.0 {
        return 0.0;
    }
    if q.is_infinite() {
        return 1.0;
    }
    if df < 2.0 {
        return ptukey_low_df(q, cc, df);
    }
    if df > DLARG {
        return wprob(q, rr, cc);
    }

    let f2 = df * 0.5;
    let mut f2lf = f2 * df.ln() - df * std::f64::consts::LN_2 - ln_gamma(f2);
    let f21 = f2 - 1.0;
    let ff4 = df * 0.25;

    let ulen = if df <= DHAF {
        ULEN1
    } else if df <= DQUAR {
        ULEN2
    } else if df <= DEIGH {
        ULEN3
    } else {
        ULEN4
    };
    f2lf += ulen.ln();

    let mut ans = 0.0;
    let mut otsum = 0.0;
    for i in 1..=50 {
        otsum = 0.0;
        let twa1 = (2 * i - 1) as f64 * ulen;

        for jj in 1..=NLEGQ {
            let (j, upper) = if IHALFQ < jj {
                (jj - IHALFQ - 1, true)
            } else {
                (jj - 1, false)
            };
            let offset = XLEGQ[j] * ulen;
            let t1 = if upper {
                f2lf + f21 * (twa1 + offset).ln() - (offset + twa1) * ff4
            } else {
                f2lf + f21 * (twa1 - offset).ln() + (offset - twa1) * ff4
            };

            if t1 >= EPS1 {
                let qsqz = if upper {
                    q * ((offset + twa1) * 0.5).sqrt()
                } else {
                    q * ((twa1 - offset) * 0.5).sqrt()
                };
                let wprb = wprob(qsqz, rr, cc);
                otsum += wprb * ALEGQ[j] * t1.exp();
            }
        }

        if i as f64 * ulen >= 1.0 && otsum <= EPS2 {
            break;
        }
        ans += otsum;
    }

    if otsum > EPS2 {
        log::debug!("ptukey({q}, {nmeans}, {df}) did not reach full precision");
    }
    ans.min(1.0)
}

/// `ptukey` for `1 <= df < 2`. The integral runs over `s = sqrt(chi²/df)`
/// instead of `chi²`, whose density is unbounded at zero for these df.
fn ptukey_low_df(q: f64, cc: f64, df: f64) -> f64 {
    const STEP: f64 = 0.125;
    const UPPER: f64 = 12.0;

    let half_df = df * 0.5;
    let log_norm = std::f64::consts::LN_2 + half_df * half_df.ln() - ln_gamma(half_df);
    let density = |s: f64| (log_norm + (df - 1.0) * s.ln() - half_df * s * s).exp();

    let half = STEP * 0.5;
    let mut ans = 0.0;
    let mut lo = 0.0;
    while lo < UPPER {
        let mid = lo + half;
        for (x, a) in XLEGQ.iter().zip(&ALEGQ) {
            for s in [mid - half * x, mid + half * x] {
                ans += half * a * density(s) * wprob(q * s, 1.0, cc);
            }
        }
        lo += STEP;
    }
    ans.min(1.0)
}

/// Starting point for the secant search in [`qtukey`].
fn qinv(p: f64, c: f64, v: f64) -> f64 {
    const P0: f64 = 0.322_232_421_088;
    const Q0: f64 = 0.993_484_626_060e-01;
    const P1: f64 = -1.0;
    const Q1: f64 = 0.588_581_570_495;
    const P2: f64 = -0.342_242_088_547;
    const Q2: f64 = 0.531_103_462_366;
    const P3: f64 = -0.204_231_210_125;
    const Q3: f64 = 0.103_537_752_850;
    const P4: f64 = -0.453_642_210_148e-04;
    const Q4: f64 = 0.385_607_006_340e-02;
    const C1: f64 = 0.8832;
    const C2: f64 = 0.2368;
    const C3: f64 = 1.214;
    const C4: f64 = 1.208;
    const C5: f64 = 1.4142;
    const VMAX: f64 = 120.0;

    let ps = 0.5 - 0.5 * p;
    let yi = (1.0 / (ps * ps)).ln().sqrt();
    let mut t = yi
        + ((((yi * P4 + P3) * yi + P2) * yi + P1) * yi + P0)
            / ((((yi * Q4 + Q3) * yi + Q2) * yi + Q1) * yi + Q0);
    if v < VMAX {
        t += (t * t * t + t) / v / 4.0;
    }
    let mut q = C1 - C2 * t;
    if v < VMAX {
        q += -C3 / v + C4 * t / v;
    }
    t * (q * (c - 1.0).ln() + C5)
}

/// Quantile of the studentized range: smallest `q` with
/// `ptukey(q, nmeans, df) >= p`.
pub fn qtukey(p: f64, nmeans: f64, df: f64) -> f64 {
    const EPS: f64 = 0.0001;
    const MAXITER: usize = 50;

    if !(0.0..=1.0).contains(&p) || df < 1.0 || nmeans < 2.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return 0.0;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let mut x0 = qinv(p, nmeans, df);
    let mut valx0 = ptukey(x0, nmeans, df) - p;

    let mut x1 = if valx0 > 0.0 {
        (x0 - 1.0).max(0.0)
    } else {
        x0 + 1.0
    };
    let mut valx1 = ptukey(x1, nmeans, df) - p;

    let mut ans = x1;
    for _ in 1..MAXITER {
        ans = x1 - (valx1 * (x1 - x0)) / (valx1 - valx0);
        valx0 = valx1;
        x0 = x1;
        if ans < 0.0 {
            ans = 0.0;
            valx1 = -p;
        }
        valx1 = ptukey(ans, nmeans, df) - p;
        x1 = ans;

        if (x1 - x0).abs() < EPS {
            return ans;
        }
    }
    log::debug!("qtukey({p}, {nmeans}, {df}) did not converge");
    ans
}

/// Result of a Tukey HSD over all pairs of groups.
#[derive(Debug, Clone)]
pub struct TukeyHsd {
    pub mse: f64,
    pub df: f64,
    /// Critical studentized range at `1 − alpha`.
    pub q_crit: f64,
    pub comparisons: Vec<Comparison>,
}

/// Tukey–Kramer HSD over `groups` (one slice of observations per level).
///
/// Returns `None` when there are fewer than two groups or no residual
/// degrees of freedom.
pub fn tukey_hsd(groups: &[&[f64]], alpha: f64) -> Option<TukeyHsd> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.is_empty()) {
        return None;
    }
    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    if n_total <= k {
        return None;
    }
    let df = (n_total - k) as f64;

    let means: Vec<f64> = groups.iter().map(|g| mean(g)).collect();
    let ssw: f64 = groups
        .iter()
        .zip(&means)
        .map(|(g, m)| g.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();
    let mse = ssw / df;

    let q_crit = qtukey(1.0 - alpha, k as f64, df);

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for a in 0..k {
        for b in (a + 1)..k {
            let meandiff = means[b] - means[a];
            let se = (mse / 2.0 * (1.0 / groups[a].len() as f64 + 1.0 / groups[b].len() as f64))
                .sqrt();
            let (q, p_value) = if se > 0.0 {
                let q = meandiff.abs() / se;
                (q, (1.0 - ptukey(q, k as f64, df)).clamp(0.0, 1.0))
            } else if meandiff == 0.0 {
                (0.0, 1.0)
            } else {
                (f64::INFINITY, 0.0)
            };
            comparisons.push(Comparison {
                a,
                b,
                estimate: meandiff,
                statistic: q,
                p_value,
                ci: Some((meandiff - q_crit * se, meandiff + q_crit * se)),
                reject: p_value < alpha,
            });
        }
    }

    Some(TukeyHsd {
        mse,
        df,
        q_crit,
        comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::StudentsT;

    fn hsd(groups: &[Vec<f64>]) -> Option<TukeyHsd> {
        let slices: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
        tukey_hsd(&slices, 0.05)
    }

    #[test]
    fn two_means_reduce_to_t_distribution() {
        for &(q, df) in &[(1.0, 5.0), (2.5, 10.0), (3.7, 20.0), (4.2, 60.0)] {
            let t = StudentsT::new(0.0, 1.0, df).unwrap();
            let expected = 2.0 * t.cdf(q / std::f64::consts::SQRT_2) - 1.0;
            let got = ptukey(q, 2.0, df);
            assert!(
                (got - expected).abs() < 1e-5,
                "q={q} df={df}: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn critical_values_match_tables() {
        // Studentized range tables, alpha = 0.05.
        for &(k, df, expected) in &[
            (3.0, 10.0, 3.877),
            (4.0, 20.0, 3.958),
            (5.0, 30.0, 4.102),
            (2.0, 120.0, 2.800),
        ] {
            let q = qtukey(0.95, k, df);
            assert!((q - expected).abs() < 2e-3, "k={k} df={df}: {q}");
            assert!((ptukey(q, k, df) - 0.95).abs() < 1e-4);
        }
    }

    #[test]
    fn single_residual_df() {
        // k = 2 reduces to the Cauchy distribution: P = (2/π)·atan(q/√2)
        for &q in &[1.0, 4.0, 17.97] {
            let expected = 2.0 / std::f64::consts::PI * (q / std::f64::consts::SQRT_2).atan();
            let got = ptukey(q, 2.0, 1.0);
            assert!((got - expected).abs() < 1e-5, "q={q}: {got} vs {expected}");
        }
        for &(k, expected) in &[(2.0, 17.97), (3.0, 26.98), (4.0, 32.82)] {
            let q = qtukey(0.95, k, 1.0);
            assert!((q - expected).abs() < 0.05, "k={k}: {q}");
        }
    }

    #[test]
    fn hsd_with_one_residual_df_uses_it() {
        let hsd = hsd(&[vec![0.0, 1.0], vec![3.0], vec![6.0]]).unwrap();
        assert_eq!(hsd.df, 1.0);
        assert!((hsd.q_crit - 26.98).abs() < 0.05, "{}", hsd.q_crit);

        let ac = &hsd.comparisons[1];
        assert_eq!((ac.a, ac.b), (0, 2));
        assert!(ac.statistic < hsd.q_crit);
        assert!(ac.p_value > 0.05);
        assert!(!ac.reject);
    }

    #[test]
    fn ptukey_edges() {
        assert_eq!(ptukey(0.0, 3.0, 10.0), 0.0);
        assert_eq!(ptukey(f64::INFINITY, 3.0, 10.0), 1.0);
        assert!(ptukey(1.0, 1.0, 10.0).is_nan());
        let p_small = ptukey(1.0, 4.0, 12.0);
        let p_large = ptukey(5.0, 4.0, 12.0);
        assert!(p_small < p_large);
        assert!(p_large < 1.0);
    }

    #[test]
    fn hsd_separates_distinct_groups() {
        let hsd = hsd(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .unwrap();
        assert_eq!(hsd.df, 6.0);
        assert!((hsd.mse - 1.0).abs() < 1e-12);
        assert_eq!(hsd.comparisons.len(), 3);

        let ac = &hsd.comparisons[1];
        assert_eq!((ac.a, ac.b), (0, 2));
        assert_eq!(ac.estimate, 6.0);
        assert!(ac.reject);
        assert!(ac.p_value < 0.001);
        let (lo, hi) = ac.ci.unwrap();
        assert!(lo < 6.0 && 6.0 < hi);
        assert!(((lo + hi) / 2.0 - 6.0).abs() < 1e-9);
    }

    #[test]
    fn two_group_hsd_matches_pooled_t_test() {
        let hsd = hsd(&[vec![5.1, 4.9, 5.6, 5.0, 5.3], vec![5.9, 6.1, 5.4, 6.3]]).unwrap();
        let cmp = &hsd.comparisons[0];

        let se = (hsd.mse * (1.0 / 5.0 + 1.0 / 4.0)).sqrt();
        let t_stat = cmp.estimate.abs() / se;
        let t = StudentsT::new(0.0, 1.0, hsd.df).unwrap();
        let expected = 2.0 * (1.0 - t.cdf(t_stat));
        assert!((cmp.p_value - expected).abs() < 1e-5);
    }

    #[test]
    fn constant_groups_do_not_divide_by_zero() {
        let hsd = hsd(&[vec![2.0, 2.0], vec![2.0, 2.0], vec![3.0, 3.0]]).unwrap();
        assert_eq!(hsd.comparisons[0].p_value, 1.0);
        assert!(!hsd.comparisons[0].reject);
        assert_eq!(hsd.comparisons[1].p_value, 0.0);
        assert!(hsd.comparisons[1].reject);
    }

    #[test]
    fn needs_two_groups_and_residual_df() {
        assert!(hsd(&[vec![1.0, 2.0]]).is_none());
        assert!(hsd(&[vec![1.0], vec![2.0]]).is_none());
    }
}
