//! Tag catalog: category-coded tags with text patterns and corroboration
//! keywords.
//!
//! # Schema Version
//!
//! Catalog files are versioned. Version 1 is the initial format; files with a
//! newer version are rejected rather than half-understood.
//!
//! # File Formats
//!
//! Catalogs load from TOML (recommended for human editing) or JSON.
//!
//! # Example TOML
//!
//! ```toml
//! schema_version = 1
//!
//! [[tags]]
//! code = "debuff_pp_drain"
//! category = "debuff"
//! patterns = ['(?i)\b(reduc|drain)\w* (\S+ ){0,4}(pp|energy)\b']
//! keywords = ["pp", "energy"]
//! signals = ["resource_drain"]
//! notes = "Unconditional drains only"
//! ```
//!
//! A compiled [`CatalogSnapshot`] is immutable. Hot reload builds a new
//! snapshot and swaps it in (see [`reload`]).

pub mod builtin;
pub mod reload;

use chrono::{DateTime, Utc};
use mr_common::{Entity, TagCategory};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::signals::{is_conditional, split_clauses, Signal};

pub use reload::{CatalogHandle, CatalogSource};

/// Current catalog schema version.
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// Errors from catalog loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(String),

    #[error("Unsupported schema version {found}, expected <= {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Invalid tag definition: {0}")]
    Invalid(String),

    #[error("Invalid regex pattern '{pattern}' in {code}: {error}")]
    InvalidRegex {
        code: String,
        pattern: String,
        error: String,
    },

    #[error("Duplicate tag code: {0}")]
    DuplicateCode(String),

    #[error("No catalog loaded: {0}")]
    Unavailable(String),
}

impl From<CatalogError> for mr_common::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Io { .. } | CatalogError::Unavailable(_) => {
                mr_common::Error::CatalogUnavailable(err.to_string())
            }
            other => mr_common::Error::CatalogInvalid(other.to_string()),
        }
    }
}

/// One tag as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TagDefinition {
    /// Full tag string, `<category>_<code>`.
    pub code: String,

    pub category: TagCategory,

    /// Clause-level regexes that suggest this tag.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Clause-level regexes that must all match as well.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<String>,

    /// Clause-level regexes that veto a pattern match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Plain words used to corroborate externally suggested tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Signals implied by this tag.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<Signal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TagDefinition {
    /// Validate a single definition.
    pub fn validate(&self) -> Result<(), CatalogError> {
        match TagCategory::of_tag(&self.code) {
            None => {
                return Err(CatalogError::Invalid(format!(
                    "'{}' is not a <buff|debuff|utility>_<code> tag",
                    self.code
                )))
            }
            Some(category) if category != self.category => {
                return Err(CatalogError::Invalid(format!(
                    "'{}' has prefix '{}' but category '{}'",
                    self.code, category, self.category
                )))
            }
            Some(_) => {}
        }

        if self.patterns.is_empty() && self.keywords.is_empty() {
            return Err(CatalogError::Invalid(format!(
                "'{}' needs at least one pattern or keyword",
                self.code
            )));
        }

        for pattern in self.patterns.iter().chain(&self.require).chain(&self.exclude) {
            compile(&self.code, pattern)?;
        }

        Ok(())
    }

    /// Whether matches of this tag must come from unconditional clauses.
    pub fn is_guarded(&self) -> bool {
        self.signals.iter().any(Signal::is_unconditional_only)
    }
}

fn compile(code: &str, pattern: &str) -> Result<Regex, CatalogError> {
    Regex::new(pattern).map_err(|e| CatalogError::InvalidRegex {
        code: code.to_string(),
        pattern: pattern.to_string(),
        error: e.to_string(),
    })
}

/// Versioned catalog file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSchema {
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<TagDefinition>,
}

impl CatalogSchema {
    pub fn new() -> Self {
        Self {
            schema_version: CATALOG_SCHEMA_VERSION,
            description: None,
            tags: vec![],
        }
    }

    /// Validate the schema and every definition.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.schema_version > CATALOG_SCHEMA_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: self.schema_version,
                expected: CATALOG_SCHEMA_VERSION,
            });
        }

        let mut seen = BTreeSet::new();
        for tag in &self.tags {
            tag.validate()?;
            if !seen.insert(tag.code.as_str()) {
                return Err(CatalogError::DuplicateCode(tag.code.clone()));
            }
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let schema: CatalogSchema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let schema: CatalogSchema =
            toml::from_str(toml_str).map_err(|e| CatalogError::Toml(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parse content, choosing the format by file extension.
    pub fn parse_for_path(path: &Path, content: &str) -> Result<Self, CatalogError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "toml" => Self::from_toml(content),
            "json" => Self::from_json(content),
            // Try JSON first, then TOML
            _ => Self::from_json(content).or_else(|_| Self::from_toml(content)),
        }
    }

    pub fn to_toml(&self) -> Result<String, CatalogError> {
        toml::to_string_pretty(self).map_err(|e| CatalogError::Toml(e.to_string()))
    }
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOrigin {
    Builtin,
    File(PathBuf),
}

impl std::fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogOrigin::Builtin => write!(f, "builtin"),
            CatalogOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A tag definition with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledTag {
    definition: TagDefinition,
    patterns: Vec<Regex>,
    require: Vec<Regex>,
    exclude: Vec<Regex>,
    keywords: Vec<String>,
    guarded: bool,
}

impl CompiledTag {
    fn compile(definition: TagDefinition) -> Result<Self, CatalogError> {
        let patterns = definition
            .patterns
            .iter()
            .map(|p| compile(&definition.code, p))
            .collect::<Result<Vec<_>, _>>()?;
        let require = definition
            .require
            .iter()
            .map(|p| compile(&definition.code, p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = definition
            .exclude
            .iter()
            .map(|p| compile(&definition.code, p))
            .collect::<Result<Vec<_>, _>>()?;
        let keywords = definition
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let guarded = definition.is_guarded();
        Ok(Self {
            definition,
            patterns,
            require,
            exclude,
            keywords,
            guarded,
        })
    }

    pub fn definition(&self) -> &TagDefinition {
        &self.definition
    }

    pub fn code(&self) -> &str {
        &self.definition.code
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    /// Pattern match on one clause, with requirements, exclusions, and the
    /// conditional guard.
    pub fn matches_clause(&self, clause: &str) -> bool {
        if !self.patterns.iter().any(|re| re.is_match(clause)) {
            return false;
        }
        if !self.require.iter().all(|re| re.is_match(clause)) {
            return false;
        }
        if self.exclude.iter().any(|re| re.is_match(clause)) {
            return false;
        }
        !(self.guarded && is_conditional(clause))
    }

    /// True when one of this tag's keywords occurs in `text` as whole words.
    pub fn keyword_in(&self, text: &str) -> bool {
        let haystack = format!(" {} ", normalize_words(text));
        self.keywords
            .iter()
            .any(|k| haystack.contains(&format!(" {} ", normalize_words(k))))
    }
}

/// Lowercase and collapse everything that isn't alphanumeric to single spaces.
fn normalize_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Immutable, compiled view of one catalog version.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    tags: Vec<CompiledTag>,
    by_code: HashMap<String, usize>,
    version: String,
    origin: CatalogOrigin,
    modified: Option<SystemTime>,
    loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Compile a validated schema. `content` is the source text the version
    /// hash is taken over.
    pub fn compile(
        schema: CatalogSchema,
        content: &str,
        origin: CatalogOrigin,
        modified: Option<SystemTime>,
    ) -> Result<Self, CatalogError> {
        schema.validate()?;

        let mut tags = Vec::with_capacity(schema.tags.len());
        let mut by_code = HashMap::new();
        for definition in schema.tags {
            by_code.insert(definition.code.clone(), tags.len());
            tags.push(CompiledTag::compile(definition)?);
        }

        Ok(Self {
            tags,
            by_code,
            version: content_version(content),
            origin,
            modified,
            loaded_at: Utc::now(),
        })
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        let schema = CatalogSchema::from_toml(builtin::BUILTIN_CATALOG_TOML)?;
        Self::compile(
            schema,
            builtin::BUILTIN_CATALOG_TOML,
            CatalogOrigin::Builtin,
            None,
        )
    }

    /// Read, parse, and compile a catalog file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let modified = fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;
        let content = fs::read_to_string(path).map_err(io_err)?;
        let schema = CatalogSchema::parse_for_path(path, &content)?;
        Self::compile(
            schema,
            &content,
            CatalogOrigin::File(path.to_path_buf()),
            Some(modified),
        )
    }

    /// Content hash identifying this catalog version.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &CatalogOrigin {
        &self.origin
    }

    /// Modification time of the source file (None for the built-in catalog).
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn entries(&self) -> &[CompiledTag] {
        &self.tags
    }

    pub fn get(&self, code: &str) -> Option<&CompiledTag> {
        self.by_code.get(code).map(|idx| &self.tags[*idx])
    }

    /// Categories with at least one tag in this catalog.
    pub fn categories(&self) -> BTreeSet<TagCategory> {
        self.tags.iter().map(|t| t.definition.category).collect()
    }

    /// Tags whose patterns match one clause.
    pub fn tags_matching_clause<'a>(
        &'a self,
        clause: &'a str,
    ) -> impl Iterator<Item = &'a CompiledTag> + 'a {
        self.tags.iter().filter(move |t| t.matches_clause(clause))
    }

    /// Codes matching any clause of `text`.
    pub fn codes_matching(&self, text: &str) -> BTreeSet<String> {
        let mut codes = BTreeSet::new();
        for clause in split_clauses(text) {
            for tag in self.tags_matching_clause(clause) {
                codes.insert(tag.code().to_string());
            }
        }
        codes
    }

    /// Codes matching any of the entity's abilities.
    pub fn matched_codes(&self, entity: &Entity) -> BTreeSet<String> {
        entity
            .ability_texts()
            .iter()
            .flat_map(|text| self.codes_matching(text))
            .collect()
    }

    /// Whether `text` corroborates an externally suggested `code`.
    ///
    /// Requires a known code and one of its keywords in the text. Guarded tags
    /// are never corroborated by keywords alone: they need a pattern match.
    pub fn corroborates(&self, code: &str, text: &str) -> bool {
        match self.get(code) {
            Some(tag) if !tag.guarded => tag.keyword_in(text),
            _ => false,
        }
    }
}

fn content_version(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
