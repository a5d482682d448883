//! surveydoc assembles the screenshots exported by a network-survey tool into landscape PDF reports,
//! one per telecom operator. Screenshots are grouped into named blocks, each block becoming a section
//! of every report that has at least one of its images.
//!
//! Filenames are the only source of information: the operator code and the technology-band label
//! found in the stem decide which report an image goes to and where it appears in its section.
//! Before insertion a screenshot can be cropped of its white margins and stamped with a caption.
//!
//! The entry point is `GenerationRun`, or `worker::spawn_generation` for running it on a
//! background thread. The pieces it is made of are public so that they can be reused on their own.

/// The module where screenshots are classified by filename.
///
/// # Introduction
///
/// A `Classifier` holds two ordered tables: the operator codes and the technology-band labels.
/// `classify_operator` returns the first operator whose code appears in the stem of a path, ignoring
/// case, while `order_key` returns the position of the first technology-band label found in it,
/// which is the sort key of the pictures inside a section. The tables default to the ones of the
/// survey tool but can be replaced through the configuration file.
pub mod classifier;

/// White-margin cropping of decoded screenshots, on the columns, the rows or both.
pub mod crop;

/// The caption strip stamped above a screenshot.
///
/// The label is written with the first TrueType font of the style that can be loaded; when none
/// is available a small bitmap face compiled into the crate is used instead.
pub mod label;

/// Decoding and processing of a single screenshot into the picture inserted in a document.
pub mod processing;

/// Named groups of screenshots.
pub mod block;

/// The `ReportDocument` model: sections, headings and pictures, with the page setup that is fixed
/// when the document is first used.
pub mod document;

/// Appending the section of a block to a document.
pub mod assembler;

/// The module where `ReportDocument`s are serialized into PDF files.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`, a thin layer over `lopdf` with
/// pages, headings written in the standard fonts and RGB images. `render_report` lays the
/// sections of a report out on its pages.
pub mod pdf;

/// JSON configuration of the lookup tables and layout, and JSON description of a run.
pub mod configuration;

/// The generation of all the documents of a run.
pub mod generation;

/// Running a generation on a background thread.
pub mod worker;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type is always returned from a `Result` type, which means that the end user can
/// expect to obtain an explanation whenever a function returns an error, together with the message of
/// the error that caused it, if any.
pub mod error;

pub use block::{Block, BlockSet};
pub use classifier::{Classification, Classifier, OperatorTag};
pub use configuration::{ReportConfiguration, RunConfiguration};
pub use crop::{crop_white_margins, CropMode};
pub use document::ReportDocument;
pub use error::ContextError;
pub use generation::{GeneratedDocument, GenerationRun, RunSummary};
pub use label::{LabelCompositor, LabelStyle};
