use super::crop::{CropState, DocumentSide};
use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Kind of input document, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A paginated document (PDF); cropped by header/footer depth.
    Paginated,
    /// A spreadsheet; compared by a selected text column.
    Spreadsheet,
}

impl FileKind {
    pub fn detect(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Paginated),
            "xlsx" | "xls" | "csv" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// An attached file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::detect(&self.name)
    }
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Spreadsheet column selectors for one side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub text_column: Option<String>,
    pub id_column: Option<String>,
}

impl ColumnSelection {
    pub fn text(column: impl Into<String>) -> Self {
        Self {
            text_column: Some(column.into()),
            id_column: None,
        }
    }

    pub fn with_id(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    fn has_text_column(&self) -> bool {
        self.text_column
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

/// Named threshold/weight presets.
///
/// Two presets are in circulation and neither is authoritative, so the choice
/// is always explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    #[default]
    Standard,
    Tight,
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Tight => write!(f, "tight"),
        }
    }
}

impl FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "default" => Ok(Self::Standard),
            "tight" | "strict" => Ok(Self::Tight),
            other => Err(format!("unknown preset '{other}'")),
        }
    }
}

/// Similarity configuration sent with every submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPreset {
    /// Minimum similarity for two paragraphs to be matched, in `[0, 1]`.
    pub ratio_threshold: f64,
    /// Line-spacing weight used for paragraph splitting.
    pub size_weight: f64,
    /// Minimum paragraph length, in characters, considered for splitting.
    pub length_threshold: u32,
}

impl ComparisonPreset {
    pub fn named(name: PresetName) -> Self {
        match name {
            PresetName::Standard => Self {
                ratio_threshold: 0.5,
                size_weight: 0.8,
                length_threshold: 30,
            },
            PresetName::Tight => Self {
                ratio_threshold: 0.7,
                size_weight: 0.72,
                length_threshold: 30,
            },
        }
    }
}

impl Default for ComparisonPreset {
    fn default() -> Self {
        Self::named(PresetName::Standard)
    }
}

/// Whether the service answers with rows directly or with a job to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Sync,
    #[default]
    Async,
}

impl FromStr for SubmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Self::Sync),
            "async" | "asynchronous" => Ok(Self::Async),
            other => Err(format!("unknown submission mode '{other}'")),
        }
    }
}

/// Everything submitted for one side of the comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SideParams {
    pub file: Option<DocumentFile>,
    pub crop: CropState,
    pub size_weight: f64,
    pub columns: ColumnSelection,
}

impl SideParams {
    pub fn new(file: DocumentFile, preset: &ComparisonPreset) -> Self {
        Self {
            file: Some(file),
            crop: CropState::default(),
            size_weight: preset.size_weight,
            columns: ColumnSelection::default(),
        }
    }

    pub fn with_crop(mut self, crop: CropState) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    fn validate(&self, side: DocumentSide) -> Result<FileKind, ValidationError> {
        let file = self
            .file
            .as_ref()
            .ok_or(ValidationError::MissingFile(side))?;
        let kind = file
            .kind()
            .ok_or_else(|| ValidationError::UnsupportedFileType {
                side,
                name: file.name.clone(),
            })?;
        if kind == FileKind::Spreadsheet && !self.columns.has_text_column() {
            return Err(ValidationError::MissingTextColumn(side));
        }
        Ok(kind)
    }
}

/// A full comparison request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareParams {
    pub left: SideParams,
    pub right: SideParams,
    pub ratio_threshold: f64,
    pub length_threshold: u32,
    pub mode: SubmissionMode,
}

impl CompareParams {
    pub fn new(left: SideParams, right: SideParams, preset: &ComparisonPreset) -> Self {
        Self {
            left,
            right,
            ratio_threshold: preset.ratio_threshold,
            length_threshold: preset.length_threshold,
            mode: SubmissionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: SubmissionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn side(&self, side: DocumentSide) -> &SideParams {
        match side {
            DocumentSide::Left => &self.left,
            DocumentSide::Right => &self.right,
        }
    }

    /// Local checks run before anything is sent to the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.left.validate(DocumentSide::Left)?;
        self.right.validate(DocumentSide::Right)?;
        if !(0.0..=1.0).contains(&self.ratio_threshold) {
            return Err(ValidationError::ThresholdOutOfRange(self.ratio_threshold));
        }
        Ok(())
    }
}
