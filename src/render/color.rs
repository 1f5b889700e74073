use image::Rgb;
use palette::{Darken, Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// ColorBrewer Set2.
const SET2: [Rgb<u8>; 8] = [
    Rgb([0x66, 0xc2, 0xa5]),
    Rgb([0xfc, 0x8d, 0x62]),
    Rgb([0x8d, 0xa0, 0xcb]),
    Rgb([0xe7, 0x8a, 0xc3]),
    Rgb([0xa6, 0xd8, 0x54]),
    Rgb([0xff, 0xd9, 0x2f]),
    Rgb([0xe5, 0xc4, 0x94]),
    Rgb([0xb3, 0xb3, 0xb3]),
];

/// `n` box fill colours: Set2 while it lasts, evenly spaced pastel hues
/// for larger groups.
pub fn generate_palette(n: usize) -> Vec<Rgb<u8>> {
    if n <= SET2.len() {
        return SET2[..n].to_vec();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.55, 0.65);
            let rgb: Srgb = hsl.into_color();
            to_pixel(rgb)
        })
        .collect()
}

/// Darker shade of `fill` for box edges, whiskers and medians.
pub fn edge_color(fill: Rgb<u8>) -> Rgb<u8> {
    let hsl: Hsl = from_pixel(fill).into_color();
    let rgb: Srgb = hsl.darken(0.55).into_color();
    to_pixel(rgb)
}

fn from_pixel(px: Rgb<u8>) -> Srgb {
    Srgb::new(px[0], px[1], px[2]).into_format()
}

fn to_pixel(rgb: Srgb) -> Rgb<u8> {
    let rgb: Srgb<u8> = rgb.into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_groups_use_set2() {
        let colors = generate_palette(3);
        assert_eq!(colors, SET2[..3].to_vec());
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn large_groups_are_distinct() {
        let colors = generate_palette(12);
        assert_eq!(colors.len(), 12);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn edges_are_darker() {
        for fill in SET2 {
            let edge = edge_color(fill);
            let luma = |c: Rgb<u8>| c.0.iter().map(|&v| v as u32).sum::<u32>();
            assert!(luma(edge) < luma(fill));
        }
    }
}
