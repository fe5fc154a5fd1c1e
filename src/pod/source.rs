//! Custom pod sources, loaded from a JSON file shaped like:
//!
//! ```json
//! {
//!   "pods": [
//!     { "sdk": "FirebaseDatabase", "git": "https://github.com/firebase/firebase-ios-sdk", "branch": "main" },
//!     { "sdk": "FirebaseAuth", "path": "~/Documents/firebase-ios-sdk" }
//!   ]
//! }
//! ```
//!
//! Loading validates every entry, so a bad file is rejected before anything
//! gets built.

use crate::util::{self, cli::Report, cli::Reportable};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GitRef {
    Branch(String),
    Tag(String),
    Commit(String),
}

impl GitRef {
    pub const KEYS: &'static [&'static str] = &["branch", "tag", "commit"];

    fn from_key(key: &str, value: String) -> Option<Self> {
        match key {
            "branch" => Some(Self::Branch(value)),
            "tag" => Some(Self::Tag(value)),
            "commit" => Some(Self::Commit(value)),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Branch(_) => "branch",
            Self::Tag(_) => "tag",
            Self::Commit(_) => "commit",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Branch(value) | Self::Tag(value) | Self::Commit(value) => value,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PodSource {
    Path(PathBuf),
    Git {
        url: String,
        reference: Option<GitRef>,
    },
}

impl PodSource {
    /// Podfile options in the order CocoaPods expects: `git` always precedes
    /// its reference.
    pub fn podfile_options(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Path(path) => vec![("path", path.display().to_string())],
            Self::Git { url, reference } => {
                let mut options = vec![("git", url.clone())];
                if let Some(reference) = reference {
                    options.push((reference.key(), reference.value().to_owned()));
                }
                options
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EntryError {
    #[error("The config should have a `pods` array containing pod configs.")]
    PodsMissing,
    #[error("Pod config #{index} isn't a JSON object.")]
    EntryNotObject { index: usize },
    #[error("Pod config #{index} doesn't specify an `sdk`.")]
    SdkMissing { index: usize },
    #[error("Pod config #{index} has an empty or blank `sdk`.")]
    SdkBlank { index: usize },
    #[error("`{key}` of SDK {sdk} should be a string.")]
    ValueNotString { sdk: String, key: String },
    #[error("Pod source of SDK {sdk} should be `git` or `path`.")]
    SourceMissing { sdk: String },
    #[error("Pod source of SDK {sdk} can't specify both `git` and `path`.")]
    SourceAmbiguous { sdk: String },
    #[error("A reference (`{key}`) for SDK {sdk} is only valid together with `git`.")]
    ReferenceWithoutGit { sdk: String, key: String },
    #[error("SDK {sdk} can only specify one of `branch`, `tag`, or `commit`.")]
    MultipleReferences { sdk: String },
    #[error(
        "Pod source of SDK {sdk} has unknown key `{key}`; it can only specify `sdk` with `path`, `git`, or `git` and a reference (like a `branch`, `tag`, or `commit`)."
    )]
    UnknownKey { sdk: String, key: String },
    #[error("SDK {sdk} is configured more than once.")]
    Duplicate { sdk: String },
    #[error("Failed to expand `~` in the path of SDK {sdk}: {source}")]
    HomeExpansionFailed {
        sdk: String,
        #[source]
        source: util::NoHomeDir,
    },
}

#[derive(Debug, Error)]
pub enum SourceConfigError {
    #[error("Failed to read pod source config {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Could not decode JSON value {path:?}: {source}")]
    JsonInvalid {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Pod source config {path:?} is invalid: {source}")]
    Invalid { path: PathBuf, source: EntryError },
}

impl Reportable for SourceConfigError {
    fn report(&self) -> Report {
        Report::error("Failed to load pod source config", self)
    }
}

/// Pod sources keyed by SDK name, in file order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceConfig {
    sources: IndexMap<String, PodSource>,
}

impl SourceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceConfigError> {
        let path = path.as_ref();
        log::info!("loading pod source config from {:?}", path);
        let contents =
            std::fs::read_to_string(path).map_err(|source| SourceConfigError::ReadFailed {
                path: path.to_owned(),
                source,
            })?;
        let value = serde_json::from_str::<Value>(&contents).map_err(|source| {
            SourceConfigError::JsonInvalid {
                path: path.to_owned(),
                source,
            }
        })?;
        Self::from_value(value).map_err(|source| SourceConfigError::Invalid {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_value(value: Value) -> Result<Self, EntryError> {
        let entries = value
            .get("pods")
            .and_then(Value::as_array)
            .ok_or(EntryError::PodsMissing)?;
        let mut sources = IndexMap::new();
        for (index, entry) in entries.iter().enumerate() {
            let entry = entry
                .as_object()
                .ok_or(EntryError::EntryNotObject { index })?;
            let (sdk, source) = parse_entry(index, entry)?;
            if sources.contains_key(&sdk) {
                return Err(EntryError::Duplicate { sdk });
            }
            log::debug!("pod {:?} will be sourced from {:?}", sdk, source);
            sources.insert(sdk, source);
        }
        Ok(Self { sources })
    }

    pub fn get(&self, sdk: &str) -> Option<&PodSource> {
        self.sources.get(sdk)
    }

    pub fn sdks(&self) -> impl Iterator<Item = &str> + '_ {
        self.sources.keys().map(String::as_str)
    }
}

fn parse_entry(index: usize, entry: &Map<String, Value>) -> Result<(String, PodSource), EntryError> {
    let sdk = match entry.get("sdk") {
        None => return Err(EntryError::SdkMissing { index }),
        Some(Value::String(sdk)) if sdk.trim().is_empty() => {
            return Err(EntryError::SdkBlank { index })
        }
        Some(Value::String(sdk)) => sdk.trim().to_owned(),
        Some(_) => {
            return Err(EntryError::ValueNotString {
                sdk: format!("#{}", index),
                key: "sdk".to_owned(),
            })
        }
    };
    let mut path = None;
    let mut git = None;
    let mut reference = None;
    for (key, value) in entry.iter().filter(|(key, _)| key.as_str() != "sdk") {
        let value = value
            .as_str()
            .ok_or_else(|| EntryError::ValueNotString {
                sdk: sdk.clone(),
                key: key.clone(),
            })?
            .to_owned();
        match key.as_str() {
            "path" => path = Some(value),
            "git" => git = Some(value),
            key if GitRef::KEYS.contains(&key) => {
                if reference.is_some() {
                    return Err(EntryError::MultipleReferences { sdk });
                }
                reference = GitRef::from_key(key, value);
            }
            _ => {
                return Err(EntryError::UnknownKey {
                    sdk,
                    key: key.clone(),
                })
            }
        }
    }
    let source = match (path, git) {
        (Some(_), Some(_)) => return Err(EntryError::SourceAmbiguous { sdk }),
        (None, None) => {
            return Err(match reference {
                Some(reference) => EntryError::ReferenceWithoutGit {
                    sdk,
                    key: reference.key().to_owned(),
                },
                None => EntryError::SourceMissing { sdk },
            })
        }
        (Some(path), None) => {
            if let Some(reference) = reference {
                return Err(EntryError::ReferenceWithoutGit {
                    sdk,
                    key: reference.key().to_owned(),
                });
            }
            let path = util::expand_home(&path).map_err(|source| {
                EntryError::HomeExpansionFailed {
                    sdk: sdk.clone(),
                    source,
                }
            })?;
            PodSource::Path(path)
        }
        (None, Some(url)) => PodSource::Git { url, reference },
    };
    Ok((sdk, source))
}
