use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The operator codes recognised when no other table is configured, in matching order.
pub const DEFAULT_OPERATORS: [&str; 4] = ["Iliad", "TIM", "VF", "W3"];

/// The technology-band labels in the order in which pictures appear inside a section.
pub const DEFAULT_PRIORITIES: [&str; 19] = [
    "GSM900 RXLEV",
    "LTE800 RSRP",
    "LTE800 QUAL",
    "UMTS900 RSCP",
    "UMTS900 QUAL",
    "LTE1800 RSRP",
    "LTE1800 QUAL",
    "LTE2100 RSRP",
    "LTE2100 QUAL",
    "LTE2100 RSRP B100",
    "LTE RSRQ B100",
    "UMTS2100 RSCP",
    "UMTS2100 QUAL",
    "LTE2600 RSRP",
    "LTE2600 QUAL",
    "RSRQ 700",
    "RSRP 700",
    "RSRP 3500",
    "RSRQ 3500",
];

/// The fragment the survey tool inserts in every exported screenshot name.
pub const DEFAULT_BOILERPLATE: &str = "_Workbook_";

/// One of the operators of the table the classifier was built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorTag {
    /// Position of the operator in the table, which is also its processing order.
    pub index: usize,
    /// The operator code as written in the table.
    pub code: String,
}

impl std::fmt::Display for OperatorTag {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.code)
    }
}

/// The outcome of matching a filename against the operator table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched(OperatorTag),
    Unmatched,
}

impl Classification {
    pub fn operator(&self) -> Option<&OperatorTag> {
        match self {
            Classification::Matched(operator) => Some(operator),
            Classification::Unmatched => None,
        }
    }
}

/// Classifies screenshots by the substrings of their filename stems.
///
/// Both tables are scanned linearly and the first entry found wins, so their order defines
/// priority and tie-breaking at the same time.
#[derive(Debug, Clone)]
pub struct Classifier {
    operators: Vec<String>,
    lowercase_operators: Vec<String>,
    normalized_priorities: Vec<String>,
    boilerplate: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(
            DEFAULT_OPERATORS.iter().map(|operator| operator.to_string()),
            DEFAULT_PRIORITIES.iter().map(|priority| priority.to_string()),
            DEFAULT_BOILERPLATE,
        )
    }
}

impl Classifier {
    /// Builds a classifier from an operator table, a priority table and the boilerplate
    /// fragment stripped from the labels.
    pub fn new<O, P, S>(operators: O, priorities: P, boilerplate: S) -> Self
    where
        O: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
        S: Into<String>,
    {
        let operators: Vec<String> = operators.into_iter().collect();
        let lowercase_operators = operators
            .iter()
            .map(|operator| operator.to_lowercase())
            .collect();
        let normalized_priorities = priorities
            .into_iter()
            .map(|priority| normalize(&priority))
            .collect();

        Classifier {
            operators,
            lowercase_operators,
            normalized_priorities,
            boilerplate: boilerplate.into(),
        }
    }

    /// All the operators of the table, in matching order.
    pub fn operators(&self) -> impl Iterator<Item = OperatorTag> + '_ {
        self.operators
            .iter()
            .enumerate()
            .map(|(index, code)| OperatorTag {
                index,
                code: code.clone(),
            })
    }

    /// The number of entries of the priority table, which is the key of unmatched filenames.
    pub fn priority_count(&self) -> usize {
        self.normalized_priorities.len()
    }

    /// Returns the first operator whose code is contained in the filename stem, ignoring case.
    pub fn classify_operator(&self, path: &Path) -> Classification {
        let stem = file_stem(path).to_lowercase();
        self.lowercase_operators
            .iter()
            .position(|operator| stem.contains(operator.as_str()))
            .map(|index| {
                Classification::Matched(OperatorTag {
                    index,
                    code: self.operators[index].clone(),
                })
            })
            .unwrap_or(Classification::Unmatched)
    }

    /// Returns the index of the first technology-band label contained in the filename stem,
    /// or the length of the table when none is.
    pub fn order_key(&self, path: &Path) -> usize {
        let stem = normalize(&file_stem(path));
        self.normalized_priorities
            .iter()
            .position(|priority| stem.contains(priority.as_str()))
            .unwrap_or(self.normalized_priorities.len())
    }

    /// Sorts the paths by order key, keeping the given order between equal keys.
    pub fn sort_by_order(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut keyed_paths: Vec<(usize, &PathBuf)> = paths
            .iter()
            .map(|path| (self.order_key(path), path))
            .collect();
        keyed_paths.sort_by_key(|(order_key, _)| *order_key);
        keyed_paths
            .into_iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Derives the caption of a screenshot: the operator code followed by what remains of the
    /// stem once the boilerplate and the operator code are removed. Stems without an operator
    /// are returned unchanged.
    pub fn extract_label(&self, path: &Path) -> String {
        let stem = file_stem(path);
        let Classification::Matched(operator) = self.classify_operator(path) else {
            return stem;
        };
        let remainder = remove_ignoring_case(&stem, &self.boilerplate);
        let remainder = remove_ignoring_case(&remainder, &operator.code);

        format!("{} {}", operator.code, remainder.trim())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lowercases the text and reads underscores and dashes as spaces, so that `LTE800_RSRP`
/// and `LTE800 RSRP` compare equal.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|character| match character {
            '_' | '-' => ' ',
            character => character,
        })
        .collect()
}

/// Removes every occurrence of `needle` from `haystack`, comparing characters without case.
fn remove_ignoring_case(haystack: &str, needle: &str) -> String {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return haystack.to_string();
    }
    let characters: Vec<char> = haystack.chars().collect();
    let mut remainder = String::with_capacity(haystack.len());
    let mut index = 0;
    while index < characters.len() {
        let matches = characters.len() - index >= needle.len()
            && characters[index..index + needle.len()]
                .iter()
                .zip(needle.iter())
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
        if matches {
            index += needle.len();
        } else {
            remainder.push(characters[index]);
            index += 1;
        }
    }

    remainder
}
