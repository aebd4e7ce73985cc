//! Per-query configuration handed down the pipeline.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sheetq_types::CellValue;

/// Where the rows of a query come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceTable {
    /// A whole worksheet.
    Worksheet(String),
    /// A cell range (`A1:D4`) on a worksheet.
    Range {
        worksheet: String,
        start: String,
        end: String,
    },
    /// A named range, optionally scoped to a worksheet.
    NamedRange {
        worksheet: Option<String>,
        name: String,
    },
    /// A delimited text file, addressed by its bare file name.
    Csv { file_name: String },
}

impl SourceTable {
    /// Table token placed between the brackets of the `FROM` clause.
    pub fn table_token(&self) -> String {
        match self {
            SourceTable::Worksheet(name) => format!("{name}$"),
            SourceTable::Range {
                worksheet,
                start,
                end,
            } => format!("{worksheet}${start}:{end}"),
            SourceTable::NamedRange {
                worksheet: Some(worksheet),
                name,
            } => format!("{worksheet}${name}"),
            SourceTable::NamedRange {
                worksheet: None,
                name,
            } => name.clone(),
            SourceTable::Csv { file_name } => file_name.clone(),
        }
    }
}

/// Logical field name to physical column name. Keys are unique.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: FxHashMap<String, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping, replacing any earlier one for the same field.
    pub fn insert(&mut self, logical: impl Into<String>, physical: impl Into<String>) {
        self.entries.insert(logical.into(), physical.into());
    }

    pub fn physical(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(logical, physical)` pairs sorted by logical name.
    pub fn iter_sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(l, p)| (l.as_str(), p.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

/// Converts the textual cell value into the logical field value.
pub type Transformation = Arc<dyn Fn(&str) -> CellValue + Send + Sync>;

/// Which worksheet/record mismatches are fatal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrictMapping {
    #[default]
    None,
    /// Every record field must have a worksheet column.
    ClassStrict,
    /// Every worksheet column must map to a record field.
    WorksheetStrict,
    Both,
}

impl StrictMapping {
    pub fn class_strict(self) -> bool {
        matches!(self, StrictMapping::ClassStrict | StrictMapping::Both)
    }

    pub fn worksheet_strict(self) -> bool {
        matches!(self, StrictMapping::WorksheetStrict | StrictMapping::Both)
    }
}

/// Whitespace trimming applied to text cells during materialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrimSpaces {
    #[default]
    None,
    Start,
    End,
    Both,
}

impl TrimSpaces {
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        match self {
            TrimSpaces::None => text,
            TrimSpaces::Start => text.trim_start(),
            TrimSpaces::End => text.trim_end(),
            TrimSpaces::Both => text.trim(),
        }
    }
}

/// Immutable configuration of one query invocation.
#[derive(Clone)]
pub struct QueryArgs {
    pub source: SourceTable,
    pub mapping: ColumnMapping,
    pub transformations: FxHashMap<String, Transformation>,
    pub has_header: bool,
    pub strict_mapping: StrictMapping,
    /// Drop source rows whose cells are all blank. Only generic row results
    /// honor it; while set, paging and counting run client side.
    pub skip_empty_rows: bool,
    pub trim_spaces: TrimSpaces,
    pub read_only: bool,
}

impl QueryArgs {
    pub fn new(source: SourceTable) -> Self {
        Self {
            source,
            mapping: ColumnMapping::default(),
            transformations: FxHashMap::default(),
            has_header: true,
            strict_mapping: StrictMapping::None,
            skip_empty_rows: false,
            trim_spaces: TrimSpaces::None,
            read_only: true,
        }
    }

    pub fn with_mapping(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.mapping.insert(logical, physical);
        self
    }

    pub fn with_transformation(
        mut self,
        logical: impl Into<String>,
        transformation: Transformation,
    ) -> Self {
        self.transformations.insert(logical.into(), transformation);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn transformation(&self, logical: &str) -> Option<&Transformation> {
        self.transformations.get(logical)
    }
}

impl fmt::Debug for QueryArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut transformed: Vec<&str> = self.transformations.keys().map(String::as_str).collect();
        transformed.sort_unstable();
        f.debug_struct("QueryArgs")
            .field("source", &self.source)
            .field("mapping", &self.mapping)
            .field("transformations", &transformed)
            .field("has_header", &self.has_header)
            .field("strict_mapping", &self.strict_mapping)
            .field("skip_empty_rows", &self.skip_empty_rows)
            .field("trim_spaces", &self.trim_spaces)
            .field("read_only", &self.read_only)
            .finish()
    }
}
