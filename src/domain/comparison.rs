use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a single comparison row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    /// Both sides carry the same content.
    #[default]
    #[serde(alias = "same")]
    Equal,
    Insert,
    Delete,
    /// Matched content that differs between the sides.
    #[serde(alias = "changed")]
    Replace,
    /// Content present only in the right document.
    New,
    /// Content present only in the left document.
    Removed,
}

impl RowType {
    pub const ALL: [RowType; 6] = [
        RowType::Equal,
        RowType::Insert,
        RowType::Delete,
        RowType::Replace,
        RowType::New,
        RowType::Removed,
    ];

    /// Whether the similarity ratio carries meaning for this row.
    pub fn has_ratio(self) -> bool {
        !matches!(self, RowType::Equal | RowType::New | RowType::Removed)
    }

    /// Display order when rows are grouped by type; changes first.
    pub fn rank(self) -> u8 {
        match self {
            RowType::Replace => 0,
            RowType::Insert => 1,
            RowType::Delete => 2,
            RowType::New => 3,
            RowType::Removed => 4,
            RowType::Equal => 5,
        }
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
            Self::Replace => write!(f, "replace"),
            Self::New => write!(f, "new"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

impl FromStr for RowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" | "same" => Ok(Self::Equal),
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            "replace" | "changed" => Ok(Self::Replace),
            "new" => Ok(Self::New),
            "removed" => Ok(Self::Removed),
            other => Err(format!("unknown row type '{other}'")),
        }
    }
}

/// Presentation tag of a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkTag {
    #[default]
    Equal,
    Insert,
    Delete,
    Replace,
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for ChunkTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown chunk tag '{other}'")),
        }
    }
}

/// A tagged run of text inside one side of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub tag: ChunkTag,
    pub subtext: String,
}

impl TextChunk {
    pub fn new(tag: ChunkTag, subtext: impl Into<String>) -> Self {
        Self {
            tag,
            subtext: subtext.into(),
        }
    }
}

/// Text of one side of a row: either wholly unchanged or a chunk sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SegmentText {
    PlainRun(String),
    ChunkSequence(Vec<TextChunk>),
}

impl Default for SegmentText {
    fn default() -> Self {
        SegmentText::PlainRun(String::new())
    }
}

impl SegmentText {
    /// Full text of the side: chunk subtexts concatenated in order, tags ignored.
    pub fn concatenated(&self) -> String {
        match self {
            SegmentText::PlainRun(text) => text.clone(),
            SegmentText::ChunkSequence(chunks) => {
                chunks.iter().map(|c| c.subtext.as_str()).collect()
            }
        }
    }

    /// Subtexts joined by `separator`.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            SegmentText::PlainRun(text) => text.clone(),
            SegmentText::ChunkSequence(chunks) => chunks
                .iter()
                .map(|c| c.subtext.as_str())
                .collect::<Vec<_>>()
                .join(separator),
        }
    }

    /// Tagged runs for presentation. A plain run becomes a single `equal` chunk.
    pub fn runs(&self) -> Vec<TextChunk> {
        match self {
            SegmentText::PlainRun(text) if text.is_empty() => Vec::new(),
            SegmentText::PlainRun(text) => vec![TextChunk::new(ChunkTag::Equal, text.clone())],
            SegmentText::ChunkSequence(chunks) => chunks.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SegmentText::PlainRun(text) => text.is_empty(),
            SegmentText::ChunkSequence(chunks) => chunks.iter().all(|c| c.subtext.is_empty()),
        }
    }
}

/// Heading detected for a row, e.g. `3.1` + `Scope of work`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Heading {
    pub number: String,
    pub text: String,
}

impl Heading {
    pub fn label(&self) -> String {
        match (self.number.is_empty(), self.text.is_empty()) {
            (true, _) => self.text.clone(),
            (false, true) => self.number.clone(),
            (false, false) => format!("{} {}", self.number, self.text),
        }
    }
}

/// One logical result unit produced by a completed comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComparisonRow {
    pub row_type: RowType,
    /// Similarity in `[0, 1]`; meaningful for changed rows only.
    pub similarity_ratio: f64,
    pub left_text: SegmentText,
    pub right_text: SegmentText,
    #[serde(default)]
    pub left_identifier: Option<String>,
    #[serde(default)]
    pub right_identifier: Option<String>,
    #[serde(default)]
    pub left_heading: Option<Heading>,
    #[serde(default)]
    pub right_heading: Option<Heading>,
    #[serde(default)]
    pub left_page: Option<u32>,
    #[serde(default)]
    pub right_page: Option<u32>,
}

impl ComparisonRow {
    pub fn left_plain(&self) -> String {
        self.left_text.concatenated()
    }

    pub fn right_plain(&self) -> String {
        self.right_text.concatenated()
    }

    pub fn has_identifiers(&self) -> bool {
        self.left_identifier.is_some() || self.right_identifier.is_some()
    }

    pub fn has_headings(&self) -> bool {
        self.left_heading.is_some() || self.right_heading.is_some()
    }

    pub fn has_pages(&self) -> bool {
        self.left_page.is_some() || self.right_page.is_some()
    }

    /// Case-insensitive match against both sides' text and headings.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let heading_hit = |h: &Option<Heading>| {
            h.as_ref()
                .is_some_and(|h| h.label().to_lowercase().contains(&needle))
        };
        self.left_plain().to_lowercase().contains(&needle)
            || self.right_plain().to_lowercase().contains(&needle)
            || heading_hit(&self.left_heading)
            || heading_hit(&self.right_heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[(ChunkTag, &str)]) -> SegmentText {
        SegmentText::ChunkSequence(
            parts
                .iter()
                .map(|(tag, text)| TextChunk::new(*tag, *text))
                .collect(),
        )
    }

    #[test]
    fn test_row_type_display_parse() {
        assert_eq!(RowType::Replace.to_string(), "replace");
        assert_eq!(RowType::from_str("changed").unwrap(), RowType::Replace);
        assert_eq!(RowType::from_str("SAME").unwrap(), RowType::Equal);
        assert!(RowType::from_str("moved").is_err());
    }

    #[test]
    fn test_row_type_serde_aliases() {
        let parsed: RowType = serde_json::from_str("\"same\"").unwrap();
        assert_eq!(parsed, RowType::Equal);
        let parsed: RowType = serde_json::from_str("\"changed\"").unwrap();
        assert_eq!(parsed, RowType::Replace);
        assert_eq!(serde_json::to_string(&RowType::Removed).unwrap(), "\"removed\"");
    }

    #[test]
    fn test_concatenation_ignores_tags() {
        let text = chunks(&[
            (ChunkTag::Equal, "The quick "),
            (ChunkTag::Delete, "brown"),
            (ChunkTag::Equal, " fox"),
        ]);
        assert_eq!(text.concatenated(), "The quick brown fox");
        assert_eq!(text.joined("|"), "The quick |brown| fox");
    }

    #[test]
    fn test_plain_run_becomes_single_equal_chunk() {
        let text = SegmentText::PlainRun("unchanged".into());
        assert_eq!(text.runs(), vec![TextChunk::new(ChunkTag::Equal, "unchanged")]);
        assert!(SegmentText::PlainRun(String::new()).runs().is_empty());
    }

    #[test]
    fn test_heading_label() {
        let heading = Heading {
            number: "2.1".into(),
            text: "Scope".into(),
        };
        assert_eq!(heading.label(), "2.1 Scope");
        assert_eq!(Heading::default().label(), "");
    }

    #[test]
    fn test_matches_query_checks_both_sides() {
        let row = ComparisonRow {
            row_type: RowType::Replace,
            left_text: SegmentText::PlainRun("Payment terms".into()),
            right_text: chunks(&[(ChunkTag::Insert, "Delivery schedule")]),
            ..Default::default()
        };
        assert!(row.matches_query("payment"));
        assert!(row.matches_query("SCHEDULE"));
        assert!(!row.matches_query("warranty"));
        assert!(row.matches_query(""));
    }
}
