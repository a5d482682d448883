use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use nalgebra_glm as glm;
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash as _, Hasher as _},
    io::BufWriter,
    mem,
    path::Path,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::document::{DocumentStyle, ReportDocument, Section};
use crate::error::ContextError;

/// The resource name of the body font.
const BODY_FONT: &str = "F0";
/// The resource name of the heading font.
const HEADING_FONT: &str = "F1";
/// Line height of a heading relative to its font size.
const HEADING_LEADING: f32 = 1.2;

/// Converts inches to points, the unit of the PDF coordinate space.
pub fn inches_to_points(inches: f32) -> f32 {
    inches * 72.0
}

pub fn points_to_inches(points: f32) -> f32 {
    points / 72.0
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Interleaved 8 bit RGB samples.
    pub image_data: Vec<u8>,
}

impl From<ImageXObject> for lopdf::Stream {
    fn from(value: ImageXObject) -> Self {
        use lopdf::Object::*;
        let dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(value.width as i64)),
            ("Height", Integer(value.height as i64)),
            ("ColorSpace", Name("DeviceRGB".into())),
            ("BitsPerComponent", Integer(8)),
        ]);

        lopdf::Stream::new(dictionary, value.image_data)
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("Im{index}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The representation of a PDF page: its size in points, its content operations and the
/// images they draw.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    pub(crate) operations: Vec<Operation>,
    pub(crate) xobjects: Vec<(XObjectReference, ImageXObject)>,
}

impl PdfPage {
    /// Inserts the images of the page into the document and returns the `XObject` dictionary
    /// referencing them.
    fn insert_xobjects(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        self.xobjects
            .iter()
            .map(|(reference, image)| {
                let stream: lopdf::Stream = image.clone().into();
                let object_id = inner_document.add_object(stream);
                (reference.0.clone(), Object::Reference(object_id))
            })
            .collect()
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// underlying `lopdf::Document` with the addition of the pages and the document identifier.
pub struct PdfDocument {
    /// The underlying PDF document.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The title written in the document information dictionary.
    pub title: String,
    /// The text style whose family selects the standard fonts of the document.
    pub style: DocumentStyle,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5.
    pub fn new(identifier: String, title: String, style: DocumentStyle) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier,
            title,
            style,
            pages: Vec::new(),
        }
    }

    /// Adds a page of given width and height in points and returns its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: page_width,
            height: page_height,
            operations: Vec::new(),
            xobjects: Vec::new(),
        });

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes one line of text in the heading font, with its baseline starting at the given
    /// position in points.
    pub fn write_heading_to_page(
        &mut self,
        page_index: usize,
        text: &str,
        font_size: f32,
        baseline_position: [f32; 2],
    ) -> Result<(), ContextError> {
        let [x, y] = baseline_position;
        let page = self.get_mut_page(page_index)?;
        page.operations.extend(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(HEADING_FONT.into()), font_size.into()],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "rg",
                vec![0.0, 0.0, 0.0].into_iter().map(Object::Real).collect(),
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    /// Draws an RGB image so that its lower-left corner lies at `position` and it spans `size`,
    /// both in points.
    pub fn draw_image_to_page(
        &mut self,
        page_index: usize,
        image: &image::RgbImage,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<XObjectReference, ContextError> {
        let page = self.get_mut_page(page_index)?;
        let reference = XObjectReference::new(page.xobjects.len());
        page.xobjects.push((
            reference.clone(),
            ImageXObject {
                width: image.width(),
                height: image.height(),
                image_data: image.as_raw().clone(),
            },
        ));

        // The unit square of the image space is mapped onto the placement rectangle
        let placement = glm::translation2d(&glm::vec2(position[0], position[1]))
            * glm::scaling2d(&glm::vec2(size[0], size[1]));
        page.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement[(0, 0)].into(),
                    placement[(1, 0)].into(),
                    placement[(0, 1)].into(),
                    placement[(1, 1)].into(),
                    placement[(0, 2)].into(),
                    placement[(1, 2)].into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(reference.0.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(reference)
    }

    /// Write the pages so far specified to the underlying PDF document and finalize it.
    pub fn write_all(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        // Construct the document information dictionary, dated with the current time
        let creation_date = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", String(encode_win_ansi(&self.title), Literal)),
            ("Creator", String(b"surveydoc".to_vec(), Literal)),
            ("Producer", String(b"surveydoc".to_vec(), Literal)),
            (
                "CreationDate",
                String(creation_date.clone().into_bytes(), Literal),
            ),
            ("ModDate", String(creation_date.into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Reserve the identifier of the page tree, which the catalog and every page refer to
        let pages_id = self.inner_document.new_object_id();
        // Construct the catalog, required by the PDF specification
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("PageMode", Name("UseNone".into())),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        // Link the catalog, the information dictionary and the identifier from the trailer
        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(self.identifier.clone().into_bytes(), Literal),
            ]),
        );

        // The fonts are shared by all the pages through a single dictionary
        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<Object>::new();
        let pages = mem::take(&mut self.pages);
        for page in pages.iter() {
            // Each page gets its own resources, made of the shared fonts and of its images
            let mut resource_dictionary = lopdf::Dictionary::new();
            resource_dictionary.set("Font", Reference(fonts_dictionary_id));
            let xobjects_dictionary = page.insert_xobjects(&mut self.inner_document);
            if !xobjects_dictionary.is_empty() {
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }
            let resources_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));

            // Encode the operations of the page into its content stream
            let content = lopdf::content::Content {
                operations: page.operations.clone(),
            };
            let content_bytes = content.encode().map_err(|error| {
                ContextError::with_error("Failed to encode the page content", &error)
            })?;
            let content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content_bytes));

            // The page is attached to the page tree which is only constructed afterwards
            let media_box: Vec<Object> =
                vec![0.into(), 0.into(), page.width.into(), page.height.into()];
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Rotate", Integer(0)),
                ("MediaBox", Array(media_box.clone())),
                ("CropBox", Array(media_box)),
                ("Parent", Reference(pages_id)),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }
        self.pages = pages;

        // Construct the page tree under the identifier reserved at the beginning
        let pages_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages_dictionary));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Inserts the standard Type1 fonts of the document family and returns the font dictionary.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let body_font = self.style.font_family.clone();
        let heading_font = bold_variant(&body_font);

        let mut font_dictionary = lopdf::Dictionary::new();
        for (resource_name, base_font) in [(BODY_FONT, body_font), (HEADING_FONT, heading_font)] {
            let font = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(base_font.into_bytes())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]);
            let font_id = self.inner_document.add_object(font);
            font_dictionary.set(resource_name, Reference(font_id));
        }

        font_dictionary
    }

    // Retrieve the page at the given index.
    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }
}

/// A report already on disk, reopened so that new sections can be appended to it.
///
/// The pages it already holds are kept as they are, together with their size and fonts.
#[derive(Debug, Clone)]
pub struct ExistingReport {
    inner_document: lopdf::Document,
}

impl ExistingReport {
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let inner_document = lopdf::Document::load(path).map_err(|error| {
            ContextError::with_error(format!("Unable to reopen the document {:?}", path), &error)
        })?;

        Ok(ExistingReport { inner_document })
    }

    pub fn page_count(&self) -> usize {
        self.inner_document.get_pages().len()
    }

    /// The width and height in points of the first page, if the document has any.
    pub fn page_size(&self) -> Option<(f32, f32)> {
        let (_, first_page_id) = self.inner_document.get_pages().into_iter().next()?;
        let page = self.inner_document.get_dictionary(first_page_id).ok()?;
        // The media box may be inherited from the page tree node above the page
        let media_box = match page.get(b"MediaBox") {
            Ok(media_box) => media_box,
            Err(_) => {
                let parent_id = page.get(b"Parent").and_then(Object::as_reference).ok()?;
                self.inner_document
                    .get_dictionary(parent_id)
                    .and_then(|parent| parent.get(b"MediaBox"))
                    .ok()?
            }
        };
        let corners = media_box
            .as_array()
            .ok()?
            .iter()
            .map(|value| value.as_float().ok())
            .collect::<Option<Vec<f32>>>()?;
        match corners.as_slice() {
            [left, bottom, right, top] => Some(((right - left).abs(), (top - bottom).abs())),
            _ => None,
        }
    }

    /// Moves the pages of a rendered document to the end of this one and returns how many
    /// pages were appended.
    pub fn append(&mut self, mut pdf_document: PdfDocument) -> Result<usize, ContextError> {
        let appended = &mut pdf_document.inner_document;
        // Give the new objects identifiers past the ones already in use
        appended.renumber_objects_with(self.inner_document.max_id + 1);
        let page_ids: Vec<lopdf::ObjectId> = appended.get_pages().into_values().collect();
        let pages_id = self
            .inner_document
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|error| {
                ContextError::with_error("Unable to find the page tree of the document", &error)
            })?;

        self.inner_document.max_id = self.inner_document.max_id.max(appended.max_id);
        self.inner_document
            .objects
            .extend(mem::take(&mut appended.objects));

        // Attach the new pages to the page tree of the existing document
        for page_id in page_ids.iter() {
            let page = self
                .inner_document
                .get_dictionary_mut(*page_id)
                .map_err(|error| {
                    ContextError::with_error("Unable to find an appended page", &error)
                })?;
            page.set("Parent", Object::Reference(pages_id));
        }
        let pages = self
            .inner_document
            .get_dictionary_mut(pages_id)
            .map_err(|error| {
                ContextError::with_error("Unable to find the page tree of the document", &error)
            })?;
        let page_count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        let page_references: Vec<Object> =
            page_ids.iter().map(|page_id| Object::Reference(*page_id)).collect();
        match pages.get_mut(b"Kids").and_then(Object::as_array_mut) {
            Ok(kids) => kids.extend(page_references),
            Err(_) => pages.set("Kids", Object::Array(page_references)),
        }
        pages.set("Count", Object::Integer(page_count + page_ids.len() as i64));

        // The catalog and the page tree of the appended document are no longer referenced
        self.inner_document.prune_objects();
        log::debug!(
            "Appended {} pages, the document now has {}",
            page_ids.len(),
            self.page_count()
        );

        Ok(page_ids.len())
    }

    /// Optimizes the document and saves it to bytes.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        self.inner_document.renumber_objects();
        self.inner_document.compress();
        let mut pdf_document_bytes = Vec::new();
        self.inner_document
            .save_to(&mut pdf_document_bytes)
            .map_err(|error| {
                ContextError::with_error("Error while saving the PDF document to bytes", &error)
            })?;

        Ok(pdf_document_bytes)
    }
}

/// Lays the sections of a report out on PDF pages.
///
/// Every section starts on a new page with its heading; pictures are stacked top to bottom and
/// continue on a new page when the current one is full. A picture that does not fit below the
/// heading moves to the next page, and a picture taller than the page is placed alone at the top
/// of a page.
pub fn render_report(report: &ReportDocument) -> Result<PdfDocument, ContextError> {
    let style = report.style().cloned().unwrap_or_default();
    let mut pdf_document = PdfDocument::new(
        document_identifier(report.title()),
        report.title().to_string(),
        style.clone(),
    );

    for section in report.sections() {
        render_section(&mut pdf_document, section, &style)?;
    }
    if pdf_document.page_count() == 0 {
        let (page_width, page_height) = report.page_size();
        pdf_document.add_page(inches_to_points(page_width), inches_to_points(page_height));
    }
    pdf_document.write_all()?;

    Ok(pdf_document)
}

fn render_section(
    pdf_document: &mut PdfDocument,
    section: &Section,
    style: &DocumentStyle,
) -> Result<(), ContextError> {
    let page_width = inches_to_points(section.page_width);
    let page_height = inches_to_points(section.page_height);
    let margin = inches_to_points(section.margin);
    let top = page_height - margin;

    // Every section opens a new page, starting with its heading at the top left corner
    let mut page_index = pdf_document.add_page(page_width, page_height);
    let heading_size = style.heading_font_size;
    pdf_document.write_heading_to_page(
        page_index,
        &section.title,
        heading_size,
        [margin, top - heading_size],
    )?;
    // The caret is the vertical position, in points, of the top edge of the next picture
    let mut caret =
        top - heading_size * HEADING_LEADING - inches_to_points(section.heading_spacing);

    for picture in section.pictures.iter() {
        let width = inches_to_points(picture.width);
        let height = inches_to_points(picture.height);
        // Unless the page is still empty, a picture crossing the bottom margin moves to a new page
        if caret - height < margin && caret < top {
            page_index = pdf_document.add_page(page_width, page_height);
            caret = top;
        }
        if caret - height < margin {
            log::warn!(
                "The picture {:?} is taller than the page and is cut at the bottom",
                picture.source
            );
        }
        // The image is anchored at its lower left corner
        pdf_document.draw_image_to_page(
            page_index,
            &picture.image,
            [margin, caret - height],
            [width, height],
        )?;
        caret -= height;
    }

    Ok(())
}

/// The bold member of a standard font family.
fn bold_variant(font_family: &str) -> String {
    match font_family {
        "Helvetica" => "Helvetica-Bold".into(),
        "Times-Roman" => "Times-Bold".into(),
        "Courier" => "Courier-Bold".into(),
        other => other.into(),
    }
}

/// Encodes text for a `WinAnsiEncoding` font; characters outside of Latin-1 become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| match character as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        })
        .collect()
}

/// A 32 characters-long identifier derived from the title and the current time.
fn document_identifier(title: &str) -> String {
    let mut hasher = DefaultHasher::new();
    title.hash(&mut hasher);
    OffsetDateTime::now_utc().unix_timestamp_nanos().hash(&mut hasher);
    let first_half = hasher.finish();
    title.len().hash(&mut hasher);
    let second_half = hasher.finish();

    format!("{:016x}{:016x}", first_half, second_half)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageSetup;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn report_with_pictures(picture_heights: &[u32]) -> ReportDocument {
        let mut report =
            ReportDocument::new("Survey_TIM", PageSetup::default(), DocumentStyle::default());
        report.add_section("Block1");
        for (index, height) in picture_heights.iter().enumerate() {
            report
                .add_picture(
                    RgbImage::from_pixel(100, *height, Rgb([40, 40, 40])),
                    Path::new(&format!("{index}.png")),
                )
                .unwrap();
        }
        report
    }

    fn reload(pdf_document: &mut PdfDocument) -> lopdf::Document {
        let pdf_document_bytes = pdf_document.save_to_bytes().unwrap();
        lopdf::Document::load_mem(&pdf_document_bytes).unwrap()
    }

    fn page_operations(document: &lopdf::Document, page_number: u32) -> Vec<Operation> {
        let page_id = document.get_pages()[&page_number];
        let content = document.get_page_content(page_id).unwrap();
        lopdf::content::Content::decode(&content).unwrap().operations
    }

    #[test]
    fn pages_are_landscape() {
        let mut pdf_document = render_report(&report_with_pictures(&[20])).unwrap();
        let document = reload(&mut pdf_document);
        let page_id = document.get_pages()[&1];
        let page = document.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box: Vec<f32> = page
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 792.0, 612.0]);
    }

    #[test]
    fn heading_is_written_in_the_bold_font() {
        let mut pdf_document = render_report(&report_with_pictures(&[20])).unwrap();
        let document = reload(&mut pdf_document);
        let operations = page_operations(&document, 1);

        let heading = operations
            .iter()
            .find(|operation| operation.operator == "Tj")
            .and_then(|operation| operation.operands.first())
            .and_then(|operand| operand.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap();
        similar_asserts::assert_eq!(heading.as_str(), "Block1");
        assert_eq!(
            bold_variant(&DocumentStyle::default().font_family),
            "Helvetica-Bold"
        );
    }

    #[test]
    fn pictures_span_the_usable_width() {
        let mut pdf_document = render_report(&report_with_pictures(&[50])).unwrap();
        let document = reload(&mut pdf_document);
        let operations = page_operations(&document, 1);

        let placement = operations
            .iter()
            .find(|operation| operation.operator == "cm")
            .unwrap();
        let matrix: Vec<f32> = placement
            .operands
            .iter()
            .map(|operand| operand.as_float().unwrap())
            .collect();
        let usable_width = (11.0 - 0.4) * 72.0;
        assert!((matrix[0] - usable_width).abs() < 0.01);
        assert!((matrix[3] - usable_width * 0.5).abs() < 0.01);
        assert!((matrix[4] - 0.2 * 72.0).abs() < 0.01);
        assert_eq!(
            operations
                .iter()
                .filter(|operation| operation.operator == "Do")
                .count(),
            1
        );
    }

    #[test]
    fn overflowing_pictures_continue_on_a_new_page() {
        // Each picture is 5.3 in tall, two of them do not fit on one landscape page
        let mut pdf_document = render_report(&report_with_pictures(&[50, 50, 50])).unwrap();
        assert_eq!(pdf_document.page_count(), 3);
        let document = reload(&mut pdf_document);
        assert_eq!(document.get_pages().len(), 3);
    }

    #[test]
    fn pictures_not_fitting_below_the_heading_start_a_new_page() {
        // A 4:3 screenshot is 572.4 pt tall at full width, which fits only on an empty page
        let mut report =
            ReportDocument::new("Survey_TIM", PageSetup::default(), DocumentStyle::default());
        report.add_section("Block1");
        report
            .add_picture(
                RgbImage::from_pixel(1200, 900, Rgb([40, 40, 40])),
                Path::new("A_TIM_LTE800_RSRP.png"),
            )
            .unwrap();
        let mut pdf_document = render_report(&report).unwrap();
        assert_eq!(pdf_document.page_count(), 2);
        let document = reload(&mut pdf_document);

        let margin = 0.2 * 72.0;
        let placement = page_operations(&document, 2)
            .into_iter()
            .find(|operation| operation.operator == "cm")
            .unwrap();
        let y = placement.operands[5].as_float().unwrap();
        let height = placement.operands[3].as_float().unwrap();
        assert!(y >= margin, "the picture starts {} pt below the margin", margin - y);
        assert!((y + height - (612.0 - margin)).abs() < 0.01);
    }

    #[test]
    fn pictures_taller_than_a_page_start_at_its_top() {
        let mut pdf_document = render_report(&report_with_pictures(&[20, 200])).unwrap();
        assert_eq!(pdf_document.page_count(), 2);
        let document = reload(&mut pdf_document);

        let placement = page_operations(&document, 2)
            .into_iter()
            .find(|operation| operation.operator == "cm")
            .unwrap();
        let y = placement.operands[5].as_float().unwrap();
        let height = placement.operands[3].as_float().unwrap();
        assert!((y + height - (612.0 - 0.2 * 72.0)).abs() < 0.01);
    }

    #[test]
    fn every_section_starts_a_page() {
        let mut report = report_with_pictures(&[5]);
        report.add_section("Block2");
        let pdf_document = render_report(&report).unwrap();
        assert_eq!(pdf_document.page_count(), 2);
    }

    #[test]
    fn text_outside_latin_1_is_replaced() {
        assert_eq!(encode_win_ansi("Città"), b"Citt\xe0".to_vec());
        assert_eq!(encode_win_ansi("Came\u{0301}ra"), b"Cam\xe9ra".to_vec());
        assert_eq!(encode_win_ansi("5G \u{2192} LTE"), b"5G ? LTE".to_vec());
    }

    #[test]
    fn timestamp_follows_the_pdf_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }
}
