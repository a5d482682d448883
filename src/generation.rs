use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::assembler::append_block_section;
use crate::classifier::{Classifier, OperatorTag};
use crate::configuration::{ReportConfiguration, RunConfiguration};
use crate::document::ReportDocument;
use crate::error::ContextError;
use crate::label::LabelCompositor;
use crate::processing::{ImagePreparer, ImageProcessor};

/// One document written by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub operator: OperatorTag,
    pub path: PathBuf,
    /// Block titles, in section order.
    pub sections: Vec<String>,
    pub pictures: usize,
    pub skipped: usize,
    /// Whether the sections were appended to a report written by an earlier run.
    pub appended: bool,
}

/// The outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub output_directory: PathBuf,
    pub documents: Vec<GeneratedDocument>,
}

/// A generation run: one document per operator, one section per block holding images of that
/// operator.
pub struct GenerationRun {
    run: RunConfiguration,
    configuration: ReportConfiguration,
    classifier: Classifier,
}

impl GenerationRun {
    pub fn new(run: RunConfiguration, configuration: ReportConfiguration) -> Self {
        let classifier = configuration.classifier();
        GenerationRun {
            run,
            configuration,
            classifier,
        }
    }

    pub fn run(&self) -> &RunConfiguration {
        &self.run
    }

    /// Runs the generation with the image processing configured for the run.
    pub fn execute(&self, cancel: &AtomicBool) -> Result<RunSummary, ContextError> {
        self.run.validate()?;
        let labels = self
            .run
            .add_label
            .then(|| LabelCompositor::from_style(self.configuration.label_style.clone()));
        let processor = ImageProcessor::new(&self.classifier, self.run.crop_mode, labels.as_ref());

        self.execute_with(&processor, cancel)
    }

    /// Runs the generation with the given image preparer.
    ///
    /// The run is validated before anything is written. Operators without images get no
    /// document. Cancellation is honoured between blocks and between operators; documents
    /// already saved stay on disk. When the run appends, an existing report of an operator is
    /// reopened and the new sections follow its pages.
    pub fn execute_with(
        &self,
        preparer: &dyn ImagePreparer,
        cancel: &AtomicBool,
    ) -> Result<RunSummary, ContextError> {
        // Nothing is written before the run is known to be valid
        self.run.validate()?;
        let output_directory = self.run.output_directory.clone();
        std::fs::create_dir_all(&output_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to create the output directory {:?}", output_directory),
                &error,
            )
        })?;

        let title = self.run.file_title();
        let suffix = self.run.output_suffix();
        let mut documents = Vec::new();

        // Operators are processed in table order, each one producing at most one document
        for operator in self.classifier.operators() {
            check_cancelled(cancel)?;
            // Gather the images of the operator across all the blocks
            let operator_images: Vec<&PathBuf> = self
                .run
                .blocks
                .images()
                .filter(|path| {
                    self.classifier.classify_operator(path).operator() == Some(&operator)
                })
                .collect();
            if operator_images.is_empty() {
                log::debug!("No image for the operator {}, skipping it", operator);
                continue;
            }

            let document_title = format!("{}_{}", title, operator.code);
            let path = output_directory.join(format!("{}{}.pdf", document_title, suffix));
            // Reopen the report of an earlier run when appending, otherwise start a new one
            let appended = self.run.append && path.is_file();
            let mut document = if appended {
                ReportDocument::open(
                    &path,
                    document_title,
                    self.configuration.page_setup,
                    self.configuration.document_style.clone(),
                )?
            } else {
                ReportDocument::new(
                    document_title,
                    self.configuration.page_setup,
                    self.configuration.document_style.clone(),
                )
            };
            let mut generated = GeneratedDocument {
                operator: operator.clone(),
                path,
                sections: Vec::new(),
                pictures: 0,
                skipped: 0,
                appended,
            };

            for block in self.run.blocks.iter() {
                check_cancelled(cancel)?;
                // Only the images of this operator, kept in the order of the block
                let block_images: Vec<PathBuf> = block
                    .images
                    .iter()
                    .filter(|path| operator_images.contains(path))
                    .cloned()
                    .collect();
                if block_images.is_empty() {
                    continue;
                }
                let report = append_block_section(
                    &mut document,
                    &block.name,
                    &block_images,
                    &self.classifier,
                    preparer,
                );
                generated.sections.push(report.title);
                generated.pictures += report.inserted.len();
                generated.skipped += report.skipped.len();
            }

            // The document is written once, after all of its sections have been added
            document.save(&generated.path)?;
            documents.push(generated);
        }

        // Images matching no operator are part of no document
        let unmatched = self
            .run
            .blocks
            .images()
            .filter(|path| self.classifier.classify_operator(path).operator().is_none())
            .count();
        if unmatched > 0 {
            log::debug!("{} images match no operator and were left out", unmatched);
        }

        Ok(RunSummary {
            output_directory,
            documents,
        })
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), ContextError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(ContextError::with_context("The generation was cancelled"));
    }
    Ok(())
}
