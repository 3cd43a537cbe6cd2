use regex::Regex;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// Logical meaning of one physical CSV column.
///
/// Descriptors name columns with free strings in their snapshot form; those
/// are resolved to this closed set once at registry load, so per-row code
/// never re-validates strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Payee,
    Category,
    Memo,
    Amount,
    Inflow,
    Outflow,
    /// Column present in the export but irrelevant to the import.
    Skip,
}

impl FromStr for ColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "date" => Ok(ColumnKind::Date),
            "payee" => Ok(ColumnKind::Payee),
            "category" => Ok(ColumnKind::Category),
            "memo" => Ok(ColumnKind::Memo),
            "amount" => Ok(ColumnKind::Amount),
            "inflow" => Ok(ColumnKind::Inflow),
            "outflow" => Ok(ColumnKind::Outflow),
            "skip" => Ok(ColumnKind::Skip),
            other => Err(format!("unknown column name: '{other}'")),
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to parse dialect snapshot: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("dialect '{dialect}': {message}")]
    InvalidDescriptor { dialect: String, message: String },
}

/// Snapshot form of a descriptor, as it appears in the TOML data source.
#[derive(Debug, Clone, Deserialize)]
pub struct DialectSpec {
    pub name: String,
    pub filename_pattern: String,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub header_rows: usize,
    #[serde(default)]
    pub footer_rows: usize,
    pub columns: Vec<String>,
    #[serde(default)]
    pub date_format: Option<String>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// A validated bank dialect descriptor. Immutable after load.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub name: String,
    pub filename_pattern: String,
    pub use_regex: bool,
    pub delimiter: u8,
    pub header_rows: usize,
    pub footer_rows: usize,
    pub columns: Vec<ColumnKind>,
    pub date_format: Option<String>,
    /// Compiled filename regex. `None` either means substring matching or a
    /// malformed pattern that was tolerated at load time.
    pattern: Option<Regex>,
}

impl Dialect {
    fn from_spec(spec: DialectSpec) -> Result<Self, RegistryError> {
        let invalid = |message: String| RegistryError::InvalidDescriptor {
            dialect: spec.name.clone(),
            message,
        };

        if spec.delimiter.as_bytes().len() != 1 {
            return Err(invalid(format!(
                "delimiter must be a single character, got '{}'",
                spec.delimiter
            )));
        }
        let delimiter = spec.delimiter.as_bytes()[0];

        let columns = spec
            .columns
            .iter()
            .map(|c| ColumnKind::from_str(c))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        // A malformed filename regex is tolerated: the dialect simply never
        // matches, and matching continues with the rest of the registry.
        let pattern = if spec.use_regex {
            match Regex::new(&spec.filename_pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(
                        dialect = %spec.name,
                        "invalid filename pattern, dialect will never match: {e}"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Dialect {
            name: spec.name,
            filename_pattern: spec.filename_pattern,
            use_regex: spec.use_regex,
            delimiter,
            header_rows: spec.header_rows,
            footer_rows: spec.footer_rows,
            columns,
            date_format: spec.date_format,
            pattern,
        })
    }

    pub fn matches(&self, filename: &str) -> bool {
        if self.use_regex {
            self.pattern.as_ref().is_some_and(|re| re.is_match(filename))
        } else {
            filename.contains(&self.filename_pattern)
        }
    }
}

#[derive(Debug, Deserialize)]
struct DialectFile {
    #[serde(rename = "dialect")]
    dialects: Vec<DialectSpec>,
}

/// The set of known bank dialects, in priority order.
///
/// Load order is match order: more specific patterns must come before more
/// general ones in the snapshot. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Registry {
    dialects: Vec<Dialect>,
}

impl Registry {
    pub fn from_specs(specs: Vec<DialectSpec>) -> Result<Self, RegistryError> {
        let dialects = specs
            .into_iter()
            .map(Dialect::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Registry { dialects })
    }

    /// Load a frozen snapshot: a TOML document with `[[dialect]]` entries.
    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let file: DialectFile = toml::from_str(content)?;
        Self::from_specs(file.dialects)
    }

    /// The descriptor snapshot shipped with the crate.
    pub fn bundled() -> &'static Registry {
        static BUNDLED: OnceLock<Registry> = OnceLock::new();
        BUNDLED.get_or_init(|| {
            Registry::from_toml(include_str!("../data/dialects.toml"))
                .expect("bundled dialect snapshot is valid")
        })
    }

    /// First-match-wins scan in load order.
    pub fn match_filename(&self, filename: &str) -> Option<&Dialect> {
        self.dialects.iter().find(|d| d.matches(filename))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dialect> {
        self.dialects.iter()
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }
}
