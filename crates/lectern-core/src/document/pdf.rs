use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sampler::Slide;

use super::{format_timestamp, wrap_text, DocumentAssembler};

// A4 in millimeters. printpdf's Mm and scale factors are f32.
const PAGE_WIDTH_LANDSCAPE: f32 = 297.0;
const PAGE_HEIGHT_LANDSCAPE: f32 = 210.0;
const PAGE_WIDTH_PORTRAIT: f32 = 210.0;
const PAGE_HEIGHT_PORTRAIT: f32 = 297.0;

const MARGIN: f32 = 10.0;
const HEADER_FONT_SIZE: f32 = 14.0;
const BODY_FONT_SIZE: f32 = 10.0;
/// Vertical advance per body line.
const LINE_HEIGHT: f32 = 5.0;
const HEADER_Y: f32 = PAGE_HEIGHT_PORTRAIT - 15.0;
const BODY_TOP_Y: f32 = PAGE_HEIGHT_PORTRAIT - 25.0;
const BODY_BOTTOM_Y: f32 = 15.0;
/// Helvetica at the body size fits roughly this many characters across the
/// printable width.
const WRAP_CHARS: usize = 95;

/// printpdf places images at this DPI before scaling is applied.
const BASE_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Renders the slide and transcript documents with the builtin Helvetica
/// face. Slide pages are landscape with the image stretched to the full
/// page; transcript pages are portrait.
pub struct PdfAssembler;

impl PdfAssembler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAssembler for PdfAssembler {
    fn slide_document(&self, slides: &[Slide], out_path: &Path) -> Result<()> {
        assert!(!slides.is_empty(), "slide document requires at least one slide");
        info!(slide_count = slides.len(), ?out_path, "assembling slide document");

        let (doc, first_page, first_layer) = PdfDocument::new(
            "Slides",
            Mm(PAGE_WIDTH_LANDSCAPE),
            Mm(PAGE_HEIGHT_LANDSCAPE),
            "slide",
        );

        for (index, slide) in slides.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) =
                    doc.add_page(Mm(PAGE_WIDTH_LANDSCAPE), Mm(PAGE_HEIGHT_LANDSCAPE), "slide");
                doc.get_page(page).get_layer(layer)
            };
            place_full_page_image(&slide.image_path, layer, out_path)?;
            debug!(frame_number = slide.frame_number, "slide page added");
        }

        save_document(doc, out_path)
    }

    fn transcript_document(
        &self,
        slides: &[Slide],
        transcripts: &[String],
        out_path: &Path,
    ) -> Result<()> {
        assert_eq!(slides.len(), transcripts.len(), "one transcript bucket per slide");
        assert!(!slides.is_empty(), "transcript document requires at least one slide");
        info!(slide_count = slides.len(), ?out_path, "assembling transcript document");

        let (doc, first_page, first_layer) = PdfDocument::new(
            "Transcript",
            Mm(PAGE_WIDTH_PORTRAIT),
            Mm(PAGE_HEIGHT_PORTRAIT),
            "transcript",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::document(out_path, e))?;

        for (index, (slide, transcript)) in slides.iter().zip(transcripts).enumerate() {
            let mut layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                add_portrait_page(&doc)
            };

            let header = format_timestamp(slide.timestamp_seconds);
            layer.use_text(header, HEADER_FONT_SIZE, Mm(MARGIN), Mm(HEADER_Y), &font);

            // The header is written once per slide; continuation pages carry
            // body text only.
            let mut y = BODY_TOP_Y;
            for line in wrap_text(transcript, WRAP_CHARS) {
                if y < BODY_BOTTOM_Y {
                    layer = add_portrait_page(&doc);
                    y = BODY_TOP_Y;
                }
                if !line.is_empty() {
                    layer.use_text(line, BODY_FONT_SIZE, Mm(MARGIN), Mm(y), &font);
                }
                y -= LINE_HEIGHT;
            }
        }

        save_document(doc, out_path)
    }
}

fn add_portrait_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_PORTRAIT), Mm(PAGE_HEIGHT_PORTRAIT), "transcript");
    doc.get_page(page).get_layer(layer)
}

fn place_full_page_image(
    image_path: &Path,
    layer: PdfLayerReference,
    out_path: &Path,
) -> Result<()> {
    let file = File::open(image_path).map_err(|e| {
        Error::document(out_path, format!("cannot open {}: {e}", image_path.display()))
    })?;
    let decoder = PngDecoder::new(BufReader::new(file)).map_err(|e| {
        Error::document(out_path, format!("cannot decode {}: {e}", image_path.display()))
    })?;
    let image = Image::try_from(decoder).map_err(|e| {
        Error::document(out_path, format!("cannot embed {}: {e}", image_path.display()))
    })?;

    let native_width_mm = image.image.width.0 as f32 * MM_PER_INCH / BASE_DPI;
    let native_height_mm = image.image.height.0 as f32 * MM_PER_INCH / BASE_DPI;

    // Stretch to the full page, as the page exists only to frame this image.
    let transform = ImageTransform {
        translate_x: Some(Mm(0.0)),
        translate_y: Some(Mm(0.0)),
        scale_x: Some(PAGE_WIDTH_LANDSCAPE / native_width_mm),
        scale_y: Some(PAGE_HEIGHT_LANDSCAPE / native_height_mm),
        dpi: Some(BASE_DPI),
        ..Default::default()
    };
    image.add_to_layer(layer, transform);
    Ok(())
}

fn save_document(doc: PdfDocumentReference, out_path: &Path) -> Result<()> {
    let file = File::create(out_path).map_err(|e| Error::document(out_path, e))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| Error::document(out_path, e))?;
    info!(?out_path, "document written");
    Ok(())
}
