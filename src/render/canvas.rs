use ab_glyph::{Font, PxScale, ScaleFont};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_text_mut,
    text_size,
};
use imageproc::rect::Rect;

use super::fonts::{FontStyle, Fonts};
use crate::error::{AnalysisError, Result};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Text appearance: size in points, face and colour.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size_pt: f32,
    pub style: FontStyle,
    pub color: Rgb<u8>,
}

impl TextStyle {
    pub fn new(size_pt: f32) -> Self {
        Self {
            size_pt,
            style: FontStyle::Regular,
            color: BLACK,
        }
    }

    pub fn bold(mut self) -> Self {
        self.style = FontStyle::Bold;
        self
    }

    pub fn oblique(mut self) -> Self {
        self.style = FontStyle::Oblique;
        self
    }

    pub fn color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }
}

// ---------------------------------------------------------------------------
// Canvas: an RGB raster addressed in pixels, sized in inches and points
// ---------------------------------------------------------------------------

pub struct Canvas<'f> {
    image: RgbImage,
    dpi: f32,
    fonts: &'f Fonts,
}

impl<'f> Canvas<'f> {
    /// White canvas of `width_in × height_in` inches at `dpi`.
    pub fn new(width_in: f32, height_in: f32, dpi: f32, fonts: &'f Fonts) -> Self {
        let w = (width_in * dpi).round().max(1.0) as u32;
        let h = (height_in * dpi).round().max(1.0) as u32;
        Self {
            image: RgbImage::from_pixel(w, h, WHITE),
            dpi,
            fonts,
        }
    }

    pub fn width(&self) -> f32 {
        self.image.width() as f32
    }

    pub fn height(&self) -> f32 {
        self.image.height() as f32
    }

    /// Points to pixels.
    pub fn px(&self, pt: f32) -> f32 {
        pt * self.dpi / 72.0
    }

    fn scale(&self, size_pt: f32) -> PxScale {
        PxScale::from(self.px(size_pt).max(1.0))
    }

    // -- shapes -------------------------------------------------------------

    /// Filled rectangle between two corners.
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>) {
        if let Some(rect) = rect_between(x0, y0, x1, y1) {
            draw_filled_rect_mut(&mut self.image, rect, color);
        }
    }

    /// Rectangle filled with `color` at opacity `alpha` over what is already drawn.
    pub fn blend_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>, alpha: f32) {
        let (w, h) = self.image.dimensions();
        let xa = x0.min(x1).round().clamp(0.0, w as f32) as u32;
        let xb = x0.max(x1).round().clamp(0.0, w as f32) as u32;
        let ya = y0.min(y1).round().clamp(0.0, h as f32) as u32;
        let yb = y0.max(y1).round().clamp(0.0, h as f32) as u32;
        for y in ya..yb {
            for x in xa..xb {
                let px = self.image.get_pixel_mut(x, y);
                *px = blend(*px, color, alpha);
            }
        }
    }

    /// Rectangle outline with a stroke `width_pt` thick, drawn inside the bounds.
    pub fn stroke_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>, width_pt: f32) {
        let t = self.px(width_pt).max(1.0);
        let (l, r) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        self.fill_rect(l, top, r, top + t, color);
        self.fill_rect(l, bottom - t, r, bottom, color);
        self.fill_rect(l, top, l + t, bottom, color);
        self.fill_rect(r - t, top, r, bottom, color);
    }

    pub fn hline(&mut self, y: f32, x0: f32, x1: f32, color: Rgb<u8>, width_pt: f32) {
        let half = self.px(width_pt).max(1.0) / 2.0;
        self.fill_rect(x0, y - half, x1, y + half, color);
    }

    pub fn vline(&mut self, x: f32, y0: f32, y1: f32, color: Rgb<u8>, width_pt: f32) {
        let half = self.px(width_pt).max(1.0) / 2.0;
        self.fill_rect(x - half, y0, x + half, y1, color);
    }

    /// Horizontal dashed line; dash and gap lengths in points.
    pub fn dashed_hline(
        &mut self,
        y: f32,
        x0: f32,
        x1: f32,
        color: Rgb<u8>,
        width_pt: f32,
        (dash_pt, gap_pt): (f32, f32),
    ) {
        let dash = self.px(dash_pt).max(1.0);
        let step = dash + self.px(gap_pt).max(1.0);
        let mut x = x0.min(x1);
        let end = x0.max(x1);
        while x < end {
            self.hline(y, x, (x + dash).min(end), color, width_pt);
            x += step;
        }
    }

    /// Circle marker; `filled` selects a disc over a ring.
    pub fn circle(&mut self, cx: f32, cy: f32, radius_pt: f32, color: Rgb<u8>, filled: bool) {
        let r = self.px(radius_pt).round().max(1.0) as i32;
        let center = (cx.round() as i32, cy.round() as i32);
        if filled {
            draw_filled_circle_mut(&mut self.image, center, r, color);
        } else {
            draw_hollow_circle_mut(&mut self.image, center, r, color);
            if r > 2 {
                draw_hollow_circle_mut(&mut self.image, center, r - 1, color);
            }
        }
    }

    // -- text ---------------------------------------------------------------

    /// Width and line height of `text` in pixels.
    pub fn text_extent(&self, text: &str, style: TextStyle) -> (f32, f32) {
        let font = self.fonts.get(style.style);
        let scale = self.scale(style.size_pt);
        let (w, _) = text_size(scale, font, text);
        let scaled = font.as_scaled(scale);
        (w as f32, scaled.ascent() - scaled.descent())
    }

    /// Draw `text` anchored at `(x, y)`; returns the drawn box `(x, y, w, h)`.
    pub fn text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        style: TextStyle,
        halign: HAlign,
        valign: VAlign,
    ) -> (f32, f32, f32, f32) {
        let (w, h) = self.text_extent(text, style);
        let left = match halign {
            HAlign::Left => x,
            HAlign::Center => x - w / 2.0,
            HAlign::Right => x - w,
        };
        let top = match valign {
            VAlign::Top => y,
            VAlign::Middle => y - h / 2.0,
            VAlign::Bottom => y - h,
        };
        let fonts = self.fonts;
        let font = fonts.get(style.style);
        let scale = self.scale(style.size_pt);
        draw_text_mut(
            &mut self.image,
            style.color,
            left.round() as i32,
            top.round() as i32,
            scale,
            font,
            text,
        );
        (left, top, w, h)
    }

    /// Draw `text` reading bottom to top, centred on `(cx, cy)`.
    pub fn text_vertical(&mut self, text: &str, cx: f32, cy: f32, style: TextStyle) {
        let (w, h) = self.text_extent(text, style);
        let fonts = self.fonts;
        let font = fonts.get(style.style);
        let scale = self.scale(style.size_pt);

        let mut mask = GrayImage::new(w.ceil().max(1.0) as u32, h.ceil().max(1.0) as u32);
        draw_text_mut(&mut mask, Luma([255u8]), 0, 0, scale, font, text);
        let mask = imageops::rotate270(&mask);

        let left = (cx - mask.width() as f32 / 2.0).round() as i64;
        let top = (cy - mask.height() as f32 / 2.0).round() as i64;
        let (cw, ch) = self.image.dimensions();
        for (mx, my, coverage) in mask.enumerate_pixels() {
            let x = left + mx as i64;
            let y = top + my as i64;
            if coverage[0] == 0 || x < 0 || y < 0 || x >= cw as i64 || y >= ch as i64 {
                continue;
            }
            let px = self.image.get_pixel_mut(x as u32, y as u32);
            *px = blend(*px, style.color, coverage[0] as f32 / 255.0);
        }
    }

    // -- output -------------------------------------------------------------

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

fn rect_between(x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Rect> {
    let left = x0.min(x1).round();
    let top = y0.min(y1).round();
    let w = (x0.max(x1).round() - left) as u32;
    let h = (y0.max(y1).round() - top) as u32;
    (w > 0 && h > 0).then(|| Rect::at(left as i32, top as i32).of_size(w, h))
}

/// Mix `src` over `dst` at opacity `alpha`.
pub fn blend(dst: Rgb<u8>, src: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |d: u8, s: u8| (d as f32 * (1.0 - a) + s as f32 * a).round() as u8;
    Rgb([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2])])
}

/// Parse `#rrggbb`.
pub fn hex(code: &str) -> Result<Rgb<u8>> {
    let digits = code.trim_start_matches('#');
    let bad = || AnalysisError::render(format!("invalid colour '{code}'"));
    if digits.len() != 6 {
        return Err(bad());
    }
    let value = u32::from_str_radix(digits, 16).map_err(|_| bad())?;
    Ok(Rgb([(value >> 16) as u8, (value >> 8) as u8, value as u8]))
}
