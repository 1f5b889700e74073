use image::{Rgb, RgbImage};

use super::canvas::{Canvas, HAlign, TextStyle, VAlign};
use super::fonts::Fonts;
use crate::config::ReportConfig;

const WIDTH_IN: f32 = 10.0;
const HEIGHT_IN: f32 = 6.0;
const MUTED: Rgb<u8> = Rgb([0x60, 0x60, 0x60]);

/// Title page of the report. `footer` goes in small italic type below a rule.
pub fn render_cover(report: &ReportConfig, footer: &str, fonts: &Fonts) -> RgbImage {
    let mut canvas = Canvas::new(WIDTH_IN, HEIGHT_IN, report.page_dpi, fonts);
    let (w, h) = (canvas.width(), canvas.height());

    // heights measured from the bottom edge
    let at = |frac: f32| h * (1.0 - frac);

    canvas.text(
        &report.title,
        w / 2.0,
        at(0.6),
        TextStyle::new(20.0).bold(),
        HAlign::Center,
        VAlign::Middle,
    );
    canvas.text(
        &report.subtitle,
        w / 2.0,
        at(0.45),
        TextStyle::new(14.0),
        HAlign::Center,
        VAlign::Middle,
    );
    canvas.dashed_hline(at(0.37), w * 0.2, w * 0.8, MUTED, 0.8, (6.0, 4.0));
    canvas.text(
        footer,
        w / 2.0,
        at(0.3),
        TextStyle::new(9.0).oblique().color(MUTED),
        HAlign::Center,
        VAlign::Middle,
    );

    canvas.into_image()
}
