use std::path::{Path, PathBuf};

use crate::classifier::Classifier;
use crate::document::ReportDocument;
use crate::error::ContextError;
use crate::processing::ImagePreparer;

/// What happened to the images of one appended section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionReport {
    pub title: String,
    /// Images inserted, in document order.
    pub inserted: Vec<PathBuf>,
    /// Images left out, with the reason.
    pub skipped: Vec<(PathBuf, ContextError)>,
}

/// Appends one section to the document: a heading with the block title followed by the images
/// of the block, ordered by their technology-band priority.
///
/// An image that cannot be prepared or inserted is logged and skipped; the others are still
/// inserted and nothing already inserted is rolled back.
pub fn append_block_section(
    document: &mut ReportDocument,
    title: &str,
    images: &[PathBuf],
    classifier: &Classifier,
    preparer: &dyn ImagePreparer,
) -> SectionReport {
    let mut report = SectionReport {
        title: title.to_string(),
        ..SectionReport::default()
    };
    document.add_section(title);

    for path in classifier.sort_by_order(images) {
        match insert_image(document, &path, preparer) {
            Ok(()) => report.inserted.push(path),
            Err(error) => {
                log::error!("Skipping the image {:?}: {}", path, error);
                report.skipped.push((path, error));
            }
        }
    }
    log::debug!(
        "Section {:?} of {:?}: {} inserted, {} skipped",
        title,
        document.title(),
        report.inserted.len(),
        report.skipped.len()
    );

    report
}

fn insert_image(
    document: &mut ReportDocument,
    path: &Path,
    preparer: &dyn ImagePreparer,
) -> Result<(), ContextError> {
    let image = preparer.prepare(path)?;
    document.add_picture(image, path)?;

    Ok(())
}
