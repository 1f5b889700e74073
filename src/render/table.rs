use image::{Rgb, RgbImage};

use super::canvas::{Canvas, HAlign, TextStyle, VAlign};
use super::fonts::Fonts;
use crate::config::ReportConfig;

const WIDTH_IN: f32 = 11.0;
const HEIGHT_IN: f32 = 8.5;
const MARGIN_PT: f32 = 36.0;
const BASE_FONT_PT: f32 = 9.0;
const MIN_FONT_PT: f32 = 5.0;
const CELL_PAD_PT: f32 = 6.0;
const ROW_HEIGHT: f32 = 1.9;

const HEADER_BG: Rgb<u8> = Rgb([0xd9, 0xd9, 0xd9]);
const STRIPE_BG: Rgb<u8> = Rgb([0xf5, 0xf5, 0xf5]);
const RULE: Rgb<u8> = Rgb([0xbf, 0xbf, 0xbf]);

/// Text content of a table ready for rendering.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Render `table` as landscape letter pages of at most
/// `report.rows_per_page` rows each. An empty table still gets one page.
pub fn render_table_pages(table: &TableData, report: &ReportConfig, fonts: &Fonts) -> Vec<RgbImage> {
    // measure once on a throwaway canvas at the page resolution
    let probe = Canvas::new(1.0, 1.0, report.page_dpi, fonts);
    let natural = column_widths(&probe, table, BASE_FONT_PT);
    let available = probe.px(WIDTH_IN * 72.0 - 2.0 * MARGIN_PT);
    let font_pt = fit_font(natural.iter().sum(), available);
    let widths: Vec<f32> = natural
        .iter()
        .map(|w| w * font_pt / BASE_FONT_PT)
        .collect();

    let title_pt = 14.0;
    let row_pt = font_pt * ROW_HEIGHT;
    let body_pt = HEIGHT_IN * 72.0 - 2.0 * MARGIN_PT - title_pt * 2.0;
    let fits = ((body_pt / row_pt).floor() as usize).saturating_sub(1).max(1);
    let per_page = report.rows_per_page.min(fits).max(1);

    let chunks: Vec<&[Vec<String>]> = if table.rows.is_empty() {
        vec![table.rows.as_slice()]
    } else {
        table.rows.chunks(per_page).collect()
    };
    let total = chunks.len();
    log::debug!(
        "Table '{}': {} rows on {total} page(s), font {font_pt:.1} pt",
        table.title,
        table.rows.len()
    );

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, rows)| {
            let title = if total > 1 {
                format!("{} ({}/{total})", table.title, i + 1)
            } else {
                table.title.clone()
            };
            render_page(&title, &table.headers, rows, &widths, font_pt, report, fonts)
        })
        .collect()
}

fn render_page(
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
    widths: &[f32],
    font_pt: f32,
    report: &ReportConfig,
    fonts: &Fonts,
) -> RgbImage {
    let mut canvas = Canvas::new(WIDTH_IN, HEIGHT_IN, report.page_dpi, fonts);
    let w = canvas.width();
    let margin = canvas.px(MARGIN_PT);

    canvas.text(
        title,
        w / 2.0,
        margin,
        TextStyle::new(14.0).bold(),
        HAlign::Center,
        VAlign::Top,
    );

    let table_w: f32 = widths.iter().sum();
    let left = (w - table_w) / 2.0;
    let row_h = canvas.px(font_pt * ROW_HEIGHT);
    let pad = canvas.px(CELL_PAD_PT * font_pt / BASE_FONT_PT);
    let mut y = margin + canvas.px(14.0 * 2.0);

    let header_style = TextStyle::new(font_pt).bold();
    let cell_style = TextStyle::new(font_pt);

    canvas.fill_rect(left, y, left + table_w, y + row_h, HEADER_BG);
    draw_row(&mut canvas, headers, widths, left, y, row_h, pad, header_style);
    y += row_h;

    for (r, row) in rows.iter().enumerate() {
        if r % 2 == 1 {
            canvas.fill_rect(left, y, left + table_w, y + row_h, STRIPE_BG);
        }
        draw_row(&mut canvas, row, widths, left, y, row_h, pad, cell_style);
        y += row_h;
    }

    // grid
    let top = margin + canvas.px(14.0 * 2.0);
    let mut ry = top;
    for _ in 0..=rows.len() + 1 {
        canvas.hline(ry, left, left + table_w, RULE, 0.6);
        ry += row_h;
    }
    let mut x = left;
    canvas.vline(x, top, y, RULE, 0.6);
    for cw in widths {
        x += cw;
        canvas.vline(x, top, y, RULE, 0.6);
    }

    canvas.into_image()
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    canvas: &mut Canvas<'_>,
    cells: &[String],
    widths: &[f32],
    left: f32,
    top: f32,
    row_h: f32,
    pad: f32,
    style: TextStyle,
) {
    let mut x = left;
    for (cell, cw) in cells.iter().zip(widths) {
        canvas.text(cell, x + pad, top + row_h / 2.0, style, HAlign::Left, VAlign::Middle);
        x += cw;
    }
}

/// Natural column widths in pixels at `font_pt`, padding included.
fn column_widths(canvas: &Canvas<'_>, table: &TableData, font_pt: f32) -> Vec<f32> {
    let pad = canvas.px(CELL_PAD_PT) * 2.0;
    table
        .headers
        .iter()
        .enumerate()
        .map(|(c, header)| {
            let head = canvas.text_extent(header, TextStyle::new(font_pt).bold()).0;
            let body = table
                .rows
                .iter()
                .filter_map(|row| row.get(c))
                .map(|cell| canvas.text_extent(cell, TextStyle::new(font_pt)).0)
                .fold(0.0f32, f32::max);
            head.max(body) + pad
        })
        .collect()
}

/// Font size that fits a table of `natural` width (at the base size)
/// into `available`, never below the minimum.
fn fit_font(natural: f32, available: f32) -> f32 {
    if natural <= available || natural <= 0.0 {
        BASE_FONT_PT
    } else {
        (BASE_FONT_PT * available / natural).max(MIN_FONT_PT)
    }
}
