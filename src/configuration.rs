use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::block::BlockSet;
use crate::classifier::{Classifier, DEFAULT_BOILERPLATE, DEFAULT_OPERATORS, DEFAULT_PRIORITIES};
use crate::crop::CropMode;
use crate::document::{DocumentStyle, PageSetup};
use crate::error::ContextError;
use crate::label::LabelStyle;

/// The static data of the tool: lookup tables, label look and page layout.
///
/// Every field is optional in the JSON file and defaults to the built-in values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfiguration {
    /// Operator codes, in matching order.
    pub operators: Vec<String>,
    /// Technology-band labels, in section order.
    pub priorities: Vec<String>,
    /// Fragment removed from the filename when deriving a label.
    pub boilerplate: String,
    pub label_style: LabelStyle,
    pub page_setup: PageSetup,
    pub document_style: DocumentStyle,
}

impl Default for ReportConfiguration {
    fn default() -> Self {
        ReportConfiguration {
            operators: DEFAULT_OPERATORS.iter().map(|code| code.to_string()).collect(),
            priorities: DEFAULT_PRIORITIES.iter().map(|label| label.to_string()).collect(),
            boilerplate: DEFAULT_BOILERPLATE.into(),
            label_style: LabelStyle::default(),
            page_setup: PageSetup::default(),
            document_style: DocumentStyle::default(),
        }
    }
}

impl ReportConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents =
            std::fs::read_to_string(configuration_file_path).map_err(|error| {
                ContextError::with_error(
                    format!("Failed to read the configuration file {:?}", configuration_file_path),
                    &error,
                )
            })?;
        let configuration: ReportConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    format!("Failed to parse the configuration file {:?}", configuration_file_path),
                    &error,
                )
            })?;

        Ok(configuration)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.operators.clone(),
            self.priorities.clone(),
            self.boilerplate.clone(),
        )
    }
}

/// What to generate in one run: the blocks of screenshots and how to process them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    /// Document title, the prefix of every output file name.
    pub title: String,
    #[serde(default)]
    pub crop_mode: CropMode,
    #[serde(default)]
    pub add_label: bool,
    #[serde(default = "current_directory")]
    pub output_directory: PathBuf,
    /// Appends the processing mode (`_cut`, `_labeled`) to the output file names.
    #[serde(default)]
    pub mode_suffix: bool,
    /// Appends the sections to the reports already in the output directory instead of
    /// replacing them.
    #[serde(default)]
    pub append: bool,
    pub blocks: BlockSet,
}

fn current_directory() -> PathBuf {
    PathBuf::from(".")
}

impl RunConfiguration {
    pub fn new<S: Into<String>>(title: S, output_directory: PathBuf) -> Self {
        RunConfiguration {
            title: title.into(),
            crop_mode: CropMode::None,
            add_label: false,
            output_directory,
            mode_suffix: false,
            append: false,
            blocks: BlockSet::new(),
        }
    }

    pub fn from_path(run_file_path: &Path) -> Result<Self, ContextError> {
        let run_file_contents = std::fs::read_to_string(run_file_path).map_err(|error| {
            ContextError::with_error(
                format!("Failed to read the run file {:?}", run_file_path),
                &error,
            )
        })?;
        let run_configuration: RunConfiguration = serde_json::from_str(&run_file_contents)
            .map_err(|error| {
                ContextError::with_error(
                    format!("Failed to parse the run file {:?}", run_file_path),
                    &error,
                )
            })?;

        Ok(run_configuration)
    }

    /// The title used in file names: trimmed, with whitespace and the characters that cannot
    /// appear in a file name (path separators included) replaced by underscores.
    pub fn file_title(&self) -> String {
        self.title
            .trim()
            .chars()
            .map(|character| match character {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                character if character.is_whitespace() || character.is_control() => '_',
                character => character,
            })
            .collect()
    }

    /// Checks the required fields before anything is written.
    pub fn validate(&self) -> Result<(), ContextError> {
        let file_title = self.file_title();
        if file_title.is_empty() {
            return Err(ContextError::with_context("A document title is required"));
        }
        // A title made only of dots would name the directory itself or its parent
        if file_title.chars().all(|character| character == '.') {
            return Err(ContextError::with_context(format!(
                "The document title {:?} cannot be used as a file name",
                self.title
            )));
        }
        if self.blocks.is_empty() {
            return Err(ContextError::with_context("Add at least one block of images"));
        }

        Ok(())
    }

    /// The suffix appended to the output file names when `mode_suffix` is set.
    pub fn output_suffix(&self) -> String {
        if !self.mode_suffix {
            return String::new();
        }
        let mut suffix = String::new();
        if self.crop_mode != CropMode::None {
            suffix.push_str("_cut");
        }
        if self.add_label {
            suffix.push_str("_labeled");
        }
        suffix
    }
}
