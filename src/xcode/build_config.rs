use crate::util::cli::{Report, Reportable};
use indexmap::IndexMap;
use serde::Deserialize;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub static FILE_NAME: &str = "size_build_configuration.json";
static BUNDLED: &str = include_str!("../../templates/size_build_configuration.json");

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read build configuration {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Failed to parse build configuration {path:?}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to parse bundled build configuration: {0}")]
    BundledInvalid(#[source] serde_json::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        Report::error("Failed to load build configuration", self)
    }
}

/// Build settings passed to every `xcodebuild archive` as `KEY=VALUE`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct BuildConfig {
    #[serde(rename = "compilerFlags", default)]
    compiler_flags: IndexMap<String, String>,
}

impl BuildConfig {
    pub fn bundled() -> Result<Self, Error> {
        serde_json::from_str(BUNDLED).map_err(Error::BundledInvalid)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        log::info!("loading build configuration from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadFailed {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| Error::ParseFailed {
            path: path.to_owned(),
            source,
        })
    }

    /// An explicit path must exist; otherwise `size_build_configuration.json`
    /// in `search_dir` is used if present, and the bundled defaults if not.
    pub fn load_or_bundled(explicit: Option<&Path>, search_dir: &Path) -> Result<Self, Error> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = search_dir.join(FILE_NAME);
                if path.is_file() {
                    Self::load(path)
                } else {
                    log::info!("no {:?} found; using bundled build configuration", path);
                    Self::bundled()
                }
            }
        }
    }

    pub fn compiler_flags(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.compiler_flags
            .iter()
            .map(|(flag, value)| (flag.as_str(), value.as_str()))
    }

    pub fn build_settings(&self) -> Vec<String> {
        self.compiler_flags()
            .map(|(flag, value)| format!("{}={}", flag, value))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bundled_disables_code_signing() {
        let config = BuildConfig::bundled().unwrap();
        assert!(config
            .build_settings()
            .contains(&"CODE_SIGNING_ALLOWED=NO".to_owned()));
    }

    #[test]
    fn test_build_settings_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(
            &path,
            r#"{"compilerFlags": {"OTHER_LDFLAGS": "-ObjC", "DEAD_CODE_STRIPPING": "YES", "ARCHS": "arm64"}}"#,
        )
        .unwrap();
        let config = BuildConfig::load_or_bundled(None, dir.path()).unwrap();
        assert_eq!(
            config.build_settings(),
            vec![
                "OTHER_LDFLAGS=-ObjC".to_owned(),
                "DEAD_CODE_STRIPPING=YES".to_owned(),
                "ARCHS=arm64".to_owned()
            ]
        );
    }

    #[test]
    fn test_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            BuildConfig::load_or_bundled(None, dir.path()).unwrap(),
            BuildConfig::bundled().unwrap()
        );
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BuildConfig::load_or_bundled(Some(dir.path().join("nope.json").as_path()), dir.path())
                .unwrap_err(),
            Error::ReadFailed { .. }
        ));
    }

    #[test]
    fn test_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, r#"{"compilerFlags": ["ARCHS=arm64"]}"#).unwrap();
        assert!(matches!(
            BuildConfig::load(&path).unwrap_err(),
            Error::ParseFailed { .. }
        ));
    }
}
