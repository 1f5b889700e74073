use ab_glyph::FontRef;

use crate::error::{AnalysisError, Result};

static REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
static OBLIQUE: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Oblique.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Oblique,
}

/// The embedded DejaVu Sans family.
#[derive(Clone)]
pub struct Fonts {
    regular: FontRef<'static>,
    bold: FontRef<'static>,
    oblique: FontRef<'static>,
}

impl Fonts {
    pub fn load() -> Result<Self> {
        Ok(Self {
            regular: parse(REGULAR, "DejaVuSans")?,
            bold: parse(BOLD, "DejaVuSans-Bold")?,
            oblique: parse(OBLIQUE, "DejaVuSans-Oblique")?,
        })
    }

    pub fn get(&self, style: FontStyle) -> &FontRef<'static> {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Oblique => &self.oblique,
        }
    }
}

fn parse(data: &'static [u8], name: &'static str) -> Result<FontRef<'static>> {
    FontRef::try_from_slice(data).map_err(|_| AnalysisError::Font { name })
}
