//! Lay captured screenshots out as a PDF, one image per page.

use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

use crate::capture::Capture;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("no screenshots to put in the PDF")]
    Empty,
    #[error("failed to decode screenshot for page {page}: {source}")]
    Decode {
        page: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a PDF whose pages are exactly the size of each image, in points,
/// with the image drawn from the origin.
pub fn assemble(captures: &[Capture]) -> Result<Vec<u8>, PdfError> {
    if captures.is_empty() {
        return Err(PdfError::Empty);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(captures.len());

    for (i, capture) in captures.iter().enumerate() {
        let page_id = add_image_page(&mut doc, pages_id, capture, i + 1)?;
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => captures.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    capture: &Capture,
    page: usize,
) -> Result<ObjectId, PdfError> {
    let rgb = image::load_from_memory_with_format(&capture.png, ImageFormat::Png)
        .map_err(|source| PdfError::Decode { page, source })?
        .to_rgb8();
    let (width, height) = (i64::from(rgb.width()), i64::from(rgb.height()));

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    image.compress()?;
    let image_id = doc.add_object(image);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub async fn save(path: &Path, bytes: &[u8]) -> Result<(), PdfError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_capture(width: u32, height: u32) -> Capture {
        let pixels = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        let image = DynamicImage::ImageRgb8(pixels);
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        Capture { png, width, height }
    }

    fn media_box(doc: &Document, page_id: ObjectId) -> Vec<i64> {
        doc.get_object(page_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_assemble_one_page_per_capture() {
        let bytes = assemble(&[png_capture(750, 1334), png_capture(750, 332)]).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[&1]), vec![0, 0, 750, 1334]);
        assert_eq!(media_box(&doc, pages[&2]), vec![0, 0, 750, 332]);
    }

    #[test]
    fn test_assemble_rejects_empty() {
        assert!(matches!(assemble(&[]), Err(PdfError::Empty)));
    }

    #[test]
    fn test_assemble_reports_bad_page() {
        let bad = Capture {
            png: b"garbage".to_vec(),
            width: 1,
            height: 1,
        };
        match assemble(&[png_capture(4, 4), bad]) {
            Err(PdfError::Decode { page, .. }) => assert_eq!(page, 2),
            other => panic!("expected decode error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.pdf");
        save(&path, b"%PDF-1.5").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
    }
}
