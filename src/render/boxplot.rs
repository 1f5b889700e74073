//! Boxplot figure for one (variable, factor) pair, annotated with the
//! significance letters.

use image::{Rgb, RgbImage};

use super::canvas::{Canvas, HAlign, TextStyle, VAlign, WHITE};
use super::color::{edge_color, generate_palette};
use super::fonts::Fonts;
use crate::analysis::PairAnalysis;
use crate::config::PlotConfig;
use crate::error::{AnalysisError, Result};
use crate::stats::PostHocTest;

const AXES_BG: Rgb<u8> = Rgb([0xea, 0xea, 0xf2]);
const TICK_TEXT: Rgb<u8> = Rgb([0x26, 0x26, 0x26]);
const SUBTITLE: Rgb<u8> = Rgb([0x55, 0x55, 0x55]);

/// Fraction of each slot taken by the box.
const BOX_WIDTH: f32 = 0.6;
/// Gap between a group's maximum and its letter, as a fraction of the y span.
const LETTER_OFFSET: f64 = 0.03;

/// Linear map from data values to pixel rows.
#[derive(Debug, Clone, Copy)]
struct YAxis {
    lo: f64,
    hi: f64,
    top: f32,
    bottom: f32,
}

impl YAxis {
    fn to_px(self, v: f64) -> f32 {
        let t = ((v - self.lo) / (self.hi - self.lo)) as f32;
        self.bottom - t * (self.bottom - self.top)
    }

    fn span(self) -> f64 {
        self.hi - self.lo
    }
}

/// Render the figure described by `plot` for `pair`.
pub fn render_boxplot(
    pair: &PairAnalysis,
    title: &str,
    plot: &PlotConfig,
    fonts: &Fonts,
) -> Result<RgbImage> {
    if pair.groups.is_empty() {
        return Err(AnalysisError::render(format!(
            "{} by {}: nothing to plot",
            pair.variable, pair.factor
        )));
    }

    let mut canvas = Canvas::new(plot.width_in, plot.height_in, plot.dpi, fonts);
    let (w, h) = (canvas.width(), canvas.height());

    let title_style = TextStyle::new(12.0).bold();
    let subtitle_style = TextStyle::new(8.5).color(SUBTITLE);
    let label_style = TextStyle::new(10.5);
    let tick_style = TextStyle::new(9.0).color(TICK_TEXT);
    let letter_style = TextStyle::new(11.0).bold();

    // -- frame ----------------------------------------------------------------
    let left = canvas.px(62.0);
    let right = w - canvas.px(14.0);
    let top = canvas.px(46.0);
    let bottom = h - canvas.px(44.0);

    canvas.text(title, w / 2.0, canvas.px(8.0), title_style, HAlign::Center, VAlign::Top);
    canvas.text(
        &subtitle(pair),
        w / 2.0,
        canvas.px(26.0),
        subtitle_style,
        HAlign::Center,
        VAlign::Top,
    );

    let (data_lo, data_hi) = data_range(pair);
    let ticks = nice_ticks(data_lo, data_hi, 6);
    let step = tick_step(&ticks);
    let pad = (data_hi - data_lo).max(step) * 0.05;
    // headroom for the letters
    let lo = ticks.first().copied().unwrap_or(data_lo).min(data_lo - pad);
    let hi = ticks
        .last()
        .copied()
        .unwrap_or(data_hi)
        .max(data_hi + (data_hi - data_lo).max(step) * 0.15);
    let axis = YAxis {
        lo,
        hi,
        top,
        bottom,
    };

    canvas.fill_rect(left, top, right, bottom, AXES_BG);

    let decimals = tick_decimals(step);
    for &t in ticks.iter().filter(|t| (lo..=hi).contains(*t)) {
        let y = axis.to_px(t);
        canvas.hline(y, left, right, WHITE, 1.0);
        canvas.text(
            &format!("{t:.decimals$}"),
            left - canvas.px(5.0),
            y,
            tick_style,
            HAlign::Right,
            VAlign::Middle,
        );
    }

    // -- boxes --------------------------------------------------------------
    let k = pair.groups.len();
    let slot = (right - left) / k as f32;
    let palette = generate_palette(k);

    for i in 0..k {
        let cx = left + slot * (i as f32 + 0.5);
        canvas.vline(cx, top, bottom, WHITE, 1.0);
    }

    for (i, group) in pair.groups.iter().enumerate() {
        let cx = left + slot * (i as f32 + 0.5);
        let half = slot * BOX_WIDTH / 2.0;
        let fill = palette[i];
        let edge = edge_color(fill);
        let b = &group.boxplot;

        // whiskers and caps
        canvas.vline(cx, axis.to_px(b.whisker_high), axis.to_px(b.q3), edge, 1.2);
        canvas.vline(cx, axis.to_px(b.q1), axis.to_px(b.whisker_low), edge, 1.2);
        canvas.hline(axis.to_px(b.whisker_high), cx - half / 2.0, cx + half / 2.0, edge, 1.2);
        canvas.hline(axis.to_px(b.whisker_low), cx - half / 2.0, cx + half / 2.0, edge, 1.2);

        let (y_q3, y_q1) = (axis.to_px(b.q3), axis.to_px(b.q1));
        canvas.fill_rect(cx - half, y_q3, cx + half, y_q1, fill);
        canvas.stroke_rect(cx - half, y_q3, cx + half, y_q1, edge, 1.2);
        canvas.hline(axis.to_px(b.median), cx - half, cx + half, edge, 1.8);

        for &v in &b.fliers {
            canvas.circle(cx, axis.to_px(v), 2.5, edge, false);
        }

        canvas.text(
            &group.group.label(),
            cx,
            bottom + canvas.px(5.0),
            tick_style,
            HAlign::Center,
            VAlign::Top,
        );

        // letter above the group maximum
        let letter_y = axis.to_px(b.max + LETTER_OFFSET * axis.span());
        let (lw, lh) = canvas.text_extent(&group.letters, letter_style);
        let margin = canvas.px(2.0);
        canvas.blend_rect(
            cx - lw / 2.0 - margin,
            letter_y - lh - margin,
            cx + lw / 2.0 + margin,
            letter_y + margin,
            WHITE,
            0.7,
        );
        canvas.text(
            &group.letters,
            cx,
            letter_y,
            letter_style,
            HAlign::Center,
            VAlign::Bottom,
        );
    }

    // -- axis labels --------------------------------------------------------
    canvas.text(
        &pair.factor,
        (left + right) / 2.0,
        h - canvas.px(6.0),
        label_style,
        HAlign::Center,
        VAlign::Bottom,
    );
    canvas.text_vertical(&pair.variable, canvas.px(12.0), (top + bottom) / 2.0, label_style);

    Ok(canvas.into_image())
}

/// Test and omnibus line under the title.
pub fn subtitle(pair: &PairAnalysis) -> String {
    let test = pair.test.label();
    match pair.omnibus {
        Some(o) if o.statistic.is_finite() => match (pair.test, o.df2) {
            (PostHocTest::TukeyHsd, Some(df2)) => format!(
                "{test} · {} F({:.0}, {:.0}) = {:.2}, p = {:.4}",
                pair.test.omnibus_label(),
                o.df1,
                df2,
                o.statistic,
                o.p_value
            ),
            _ => format!(
                "{test} · {} H = {:.2}, p = {:.4}",
                pair.test.omnibus_label(),
                o.statistic,
                o.p_value
            ),
        },
        Some(o) => format!("{test} · {} p = {:.4}", pair.test.omnibus_label(), o.p_value),
        None => format!("{test} · sem comparações"),
    }
}

/// Smallest and largest observation over all groups.
fn data_range(pair: &PairAnalysis) -> (f64, f64) {
    let (lo, hi) = pair
        .groups
        .iter()
        .flat_map(|g| g.group.values.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if hi > lo {
        (lo, hi)
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        (lo - pad, lo + pad)
    }
}

/// "Nice" tick positions (1, 2, 5 × 10^n steps) covering `[lo, hi]`.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
        return vec![lo];
    }
    let range = nice_number(hi - lo, false);
    let step = nice_number(range / (target.max(2) - 1) as f64, true);
    let start = (lo / step).floor() * step;
    let end = (hi / step).ceil() * step;
    let n = ((end - start) / step).round() as usize;
    (0..=n)
        .map(|i| {
            let t = start + i as f64 * step;
            // snap float noise like 0.30000000000000004
            (t / step).round() * step
        })
        .collect()
}

fn nice_number(x: f64, round: bool) -> f64 {
    let exp = x.log10().floor();
    let f = x / 10f64.powf(exp);
    let nf = if round {
        match f {
            f if f < 1.5 => 1.0,
            f if f < 3.0 => 2.0,
            f if f < 7.0 => 5.0,
            _ => 10.0,
        }
    } else {
        match f {
            f if f <= 1.0 => 1.0,
            f if f <= 2.0 => 2.0,
            f if f <= 5.0 => 5.0,
            _ => 10.0,
        }
    };
    nf * 10f64.powf(exp)
}

fn tick_step(ticks: &[f64]) -> f64 {
    match ticks {
        [a, b, ..] => b - a,
        _ => 1.0,
    }
}

fn tick_decimals(step: f64) -> usize {
    if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()).max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GroupSummary;
    use crate::data::groups::Group;
    use crate::data::model::CellValue;
    use crate::stats::descriptive::{BoxStats, Descriptive};
    use crate::stats::omnibus::OmnibusResult;

    fn pair(values: &[&[f64]]) -> PairAnalysis {
        let groups = values
            .iter()
            .enumerate()
            .map(|(i, v)| GroupSummary {
                group: Group {
                    level: CellValue::String(format!("P{}", i + 1)),
                    values: v.to_vec(),
                },
                stats: Descriptive::of(v).unwrap(),
                boxplot: BoxStats::of(v).unwrap(),
                letters: if i == 0 { "a".into() } else { "ab".into() },
            })
            .collect();
        PairAnalysis {
            variable: "PH_AGUA".into(),
            factor: "PONTOS".into(),
            test: PostHocTest::TukeyHsd,
            groups,
            comparisons: Vec::new(),
            omnibus: Some(OmnibusResult {
                statistic: 27.0,
                df1: 2.0,
                df2: Some(6.0),
                p_value: 0.001,
            }),
        }
    }

    fn small_plot() -> PlotConfig {
        PlotConfig {
            width_in: 4.0,
            height_in: 3.0,
            dpi: 72.0,
            ..Default::default()
        }
    }

    #[test]
    fn figure_has_configured_size_and_axes() {
        let fonts = Fonts::load().unwrap();
        let p = pair(&[&[5.1, 5.3, 5.0, 5.6], &[6.2, 6.0, 6.4, 9.0]]);
        let img = render_boxplot(&p, "PH_AGUA por PONTOS", &small_plot(), &fonts).unwrap();
        assert_eq!(img.dimensions(), (288, 216));
        // the plot area keeps the darkgrid background somewhere
        assert!(img.pixels().any(|px| *px == AXES_BG));
        // Set2 fill of the first box
        assert!(img.pixels().any(|px| *px == Rgb([0x66, 0xc2, 0xa5])));
    }

    #[test]
    fn empty_pair_is_an_error() {
        let fonts = Fonts::load().unwrap();
        let mut p = pair(&[&[1.0]]);
        p.groups.clear();
        assert!(render_boxplot(&p, "x", &small_plot(), &fonts).is_err());
    }

    #[test]
    fn subtitle_names_test_and_omnibus() {
        let p = pair(&[&[1.0, 2.0]]);
        assert_eq!(subtitle(&p), "Tukey HSD · ANOVA F(2, 6) = 27.00, p = 0.0010");
    }

    #[test]
    fn ticks_are_round_numbers() {
        assert_eq!(nice_ticks(0.0, 10.0, 6), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let t = nice_ticks(4.83, 6.41, 6);
        assert_eq!(t, vec![4.5, 5.0, 5.5, 6.0, 6.5]);
        assert_eq!(tick_decimals(0.5), 1);
        assert_eq!(tick_decimals(0.02), 2);
        assert_eq!(tick_decimals(5.0), 0);
        assert_eq!(nice_ticks(3.0, 3.0, 6), vec![3.0]);
    }
}
