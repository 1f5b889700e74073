use std::path::Path;

use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Bookmark, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::{AnalysisError, Result};

/// One raster page and its outline entry.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub title: String,
    pub image: RgbImage,
    /// Resolution the image was rendered at; fixes the page size in points.
    pub dpi: f32,
}

impl PdfPage {
    pub fn size_pt(&self) -> (f32, f32) {
        let (w, h) = self.image.dimensions();
        (w as f32 * 72.0 / self.dpi, h as f32 * 72.0 / self.dpi)
    }
}

/// Multi-page PDF made of full-page images.
#[derive(Debug, Clone, Default)]
pub struct PdfReport {
    title: String,
    pages: Vec<PdfPage>,
}

impl PdfReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn push(&mut self, title: impl Into<String>, image: RgbImage, dpi: f32) {
        self.pages.push(PdfPage {
            title: title.into(),
            image,
            dpi,
        });
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    /// Assemble the document: page tree, one image XObject per page,
    /// outline and Info dictionary.
    pub fn build(&self) -> Result<Document> {
        if self.pages.is_empty() {
            return Err(AnalysisError::render("report has no pages"));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let page_id = add_image_page(&mut doc, pages_id, page)?;
            kids.push(page_id.into());
            doc.add_bookmark(
                Bookmark::new(page.title.clone(), [0.0, 0.0, 0.0], 0, page_id),
                None,
            );
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let outline = doc.build_outline();
        encode_outline_titles(&mut doc);
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let Some(outline_id) = outline {
            catalog.set("Outlines", outline_id);
            catalog.set("PageMode", "UseOutlines");
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(&self.title),
            "Producer" => Object::string_literal(concat!("soil-posthoc ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut doc = self.build()?;
        doc.save(path).map_err(|source| AnalysisError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote {} page(s) to {}", self.pages.len(), path.display());
        Ok(())
    }
}

fn add_image_page(doc: &mut Document, pages_id: ObjectId, page: &PdfPage) -> Result<ObjectId> {
    let (w, h) = page.image.dimensions();
    let (width_pt, height_pt) = page.size_pt();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        page.image.as_raw().clone(),
    ));

    // scale the unit image square to the full page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}

/// PDF text string: plain literal for ASCII, UTF-16BE with a byte order
/// mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// `build_outline` writes bookmark titles as raw UTF-8.
fn encode_outline_titles(doc: &mut Document) {
    for object in doc.objects.values_mut() {
        let Ok(dict) = object.as_dict_mut() else {
            continue;
        };
        let title = match dict.get(b"Title") {
            Ok(Object::String(bytes, _)) => std::str::from_utf8(bytes).ok().map(text_string),
            _ => None,
        };
        if let Some(title) = title {
            dict.set("Title", title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn pages_are_sized_from_dpi() {
        let page = PdfPage {
            title: "capa".into(),
            image: RgbImage::new(300, 150),
            dpi: 150.0,
        };
        assert_eq!(page.size_pt(), (144.0, 72.0));
    }

    #[test]
    fn writes_loadable_document_with_outline() {
        let mut report = PdfReport::new("Relatório");
        report.push("Capa", RgbImage::from_pixel(100, 60, Rgb([255, 255, 255])), 50.0);
        report.push("PH_AGUA por PONTOS", RgbImage::from_pixel(80, 50, Rgb([200, 10, 10])), 50.0);
        report.push("Resumo", RgbImage::from_pixel(110, 85, Rgb([0, 0, 0])), 50.0);
        assert_eq!(report.len(), 3);
        assert_eq!(report.pages()[1].title, "PH_AGUA por PONTOS");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relatorio.pdf");
        report.save(&path).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        let catalog = doc.catalog().unwrap();
        assert!(catalog.get(b"Outlines").is_ok());
    }

    #[test]
    fn accented_titles_are_utf16() {
        assert_eq!(
            text_string("TCC"),
            Object::String(b"TCC".to_vec(), StringFormat::Literal)
        );
        match text_string("Análise") {
            Object::String(bytes, _) => {
                assert_eq!(&bytes[..4], &[0xFE, 0xFF, 0x00, b'A']);
                assert_eq!(&bytes[6..8], &[0x00, 0xE1]);
                assert_eq!(bytes.len(), 2 + 2 * 7);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut report = PdfReport::new("Análise estatística");
        report.push("Resumo estatístico", RgbImage::new(20, 20), 72.0);
        let doc = report.build().unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(info.get(b"Title").unwrap(), &text_string("Análise estatística"));
        let bookmark = doc
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .find(|d| d.has(b"Parent") && d.has(b"Title"))
            .unwrap();
        assert_eq!(bookmark.get(b"Title").unwrap(), &text_string("Resumo estatístico"));
    }

    #[test]
    fn empty_report_is_an_error() {
        assert!(PdfReport::new("x").build().is_err());
    }
}
