use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::pdf::{points_to_inches, ExistingReport};

/// Page geometry of a new document, in inches. The template is portrait; documents turn it to
/// landscape when they are initialised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSetup {
    pub page_width: f32,
    pub page_height: f32,
    /// Margin applied on every side of every section.
    pub margin: f32,
    /// Space left below a section heading.
    pub heading_spacing: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            page_width: 8.5,
            page_height: 11.0,
            margin: 0.2,
            heading_spacing: 0.2,
        }
    }
}

/// The document-wide text style, fixed once when the document is initialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentStyle {
    /// One of the standard PDF font families (`Helvetica`, `Times-Roman`, `Courier`).
    pub font_family: String,
    /// Body text size in points.
    pub font_size: f32,
    /// Section heading size in points.
    pub heading_font_size: f32,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        DocumentStyle {
            font_family: "Helvetica".into(),
            font_size: 12.0,
            heading_font_size: 14.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A picture placed in a section, with its display size in inches.
#[derive(Debug, Clone)]
pub struct Picture {
    pub image: RgbImage,
    pub width: f32,
    pub height: f32,
    /// The file the picture was produced from.
    pub source: PathBuf,
}

/// A page-layout subdivision of a document: it starts on a new page, carries its own margins
/// and begins with a heading.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub heading_spacing: f32,
    pub pictures: Vec<Picture>,
}

impl Section {
    /// The width available to the pictures, in inches.
    pub fn usable_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }
}

/// An output document, owned by a single writer.
///
/// The first section ever added initialises the document: the page template is swapped to
/// landscape and the default text style is fixed. Later sections reuse those settings. A document
/// reopened from disk was initialised when it was first written, so its page size is kept and
/// its sections are appended after the pages it already has.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    title: String,
    page_setup: PageSetup,
    page_width: f32,
    page_height: f32,
    orientation: Orientation,
    default_style: DocumentStyle,
    style: Option<DocumentStyle>,
    sections: Vec<Section>,
    existing: Option<ExistingReport>,
}

impl ReportDocument {
    pub fn new<S: Into<String>>(
        title: S,
        page_setup: PageSetup,
        default_style: DocumentStyle,
    ) -> Self {
        ReportDocument {
            title: title.into(),
            page_setup,
            page_width: page_setup.page_width,
            page_height: page_setup.page_height,
            orientation: Orientation::Portrait,
            default_style,
            style: None,
            sections: Vec::new(),
            existing: None,
        }
    }

    /// Reopens the report saved at `path`, ready for new sections to be appended to it.
    pub fn open<S: Into<String>>(
        path: &Path,
        title: S,
        page_setup: PageSetup,
        default_style: DocumentStyle,
    ) -> Result<Self, ContextError> {
        let existing = ExistingReport::load(path)?;
        // Without pages to measure, fall back to the landscape template
        let (page_width, page_height) = existing
            .page_size()
            .map(|(width, height)| (points_to_inches(width), points_to_inches(height)))
            .unwrap_or((page_setup.page_height, page_setup.page_width));
        let orientation = if page_width >= page_height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        log::debug!(
            "Reopened {:?} with {} pages of {}x{} in",
            path,
            existing.page_count(),
            page_width,
            page_height
        );

        Ok(ReportDocument {
            title: title.into(),
            page_setup,
            page_width,
            page_height,
            orientation,
            style: Some(default_style.clone()),
            default_style,
            sections: Vec::new(),
            existing: Some(existing),
        })
    }

    /// Whether the document was reopened from a file written by an earlier run.
    pub fn is_reopened(&self) -> bool {
        self.existing.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_initialized(&self) -> bool {
        self.style.is_some()
    }

    /// The text style of the document, available once it has been initialised.
    pub fn style(&self) -> Option<&DocumentStyle> {
        self.style.as_ref()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Current page width and height in inches.
    pub fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn picture_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.pictures.len())
            .sum()
    }

    fn initialize(&mut self) {
        if self.style.is_some() {
            return;
        }
        std::mem::swap(&mut self.page_width, &mut self.page_height);
        self.orientation = Orientation::Landscape;
        self.style = Some(self.default_style.clone());
        log::debug!(
            "Initialized {:?}: {}x{} in, {} {}pt",
            self.title,
            self.page_width,
            self.page_height,
            self.default_style.font_family,
            self.default_style.font_size
        );
    }

    /// Appends a new section with the given heading, initialising the document on first use.
    pub fn add_section<S: Into<String>>(&mut self, title: S) -> &mut Section {
        self.initialize();
        let section = Section {
            title: title.into(),
            page_width: self.page_width,
            page_height: self.page_height,
            margin: self.page_setup.margin,
            heading_spacing: self.page_setup.heading_spacing,
            pictures: Vec::new(),
        };
        self.sections.push(section);
        let last_index = self.sections.len() - 1;
        &mut self.sections[last_index]
    }

    /// Adds a picture to the last section, scaled to the usable width of the section with its
    /// aspect ratio preserved.
    pub fn add_picture(
        &mut self,
        image: RgbImage,
        source: &Path,
    ) -> Result<&Picture, ContextError> {
        let section = self.sections.last_mut().ok_or(ContextError::with_context(
            "Unable to add a picture to a document without sections",
        ))?;
        let (native_width, native_height) = image.dimensions();
        if native_width == 0 || native_height == 0 {
            return Err(ContextError::with_context(format!(
                "The image {:?} is empty",
                source
            )));
        }

        let width = section.usable_width();
        let height = width * (native_height as f32 / native_width as f32);
        if height > section.usable_height() {
            log::warn!(
                "The picture {:?} is {:.2} in tall and overflows the page",
                source,
                height
            );
        }
        section.pictures.push(Picture {
            image,
            width,
            height,
            source: source.to_path_buf(),
        });

        let last_index = section.pictures.len() - 1;
        Ok(&section.pictures[last_index])
    }

    /// Serializes the document into a PDF file. A reopened document is written with its earlier
    /// pages first.
    pub fn save(&self, path: &Path) -> Result<(), ContextError> {
        let mut pdf_document = crate::pdf::render_report(self)?;
        let pdf_document_bytes = match &self.existing {
            Some(existing) => {
                let mut existing = existing.clone();
                existing.append(pdf_document)?;
                existing.save_to_bytes()?
            }
            None => {
                pdf_document.optimize();
                pdf_document.save_to_bytes()?
            }
        };
        std::fs::write(path, pdf_document_bytes).map_err(|error| {
            ContextError::with_error(format!("Unable to write the document {:?}", path), &error)
        })?;
        log::info!("Saved the document {:?}", path);

        Ok(())
    }
}
