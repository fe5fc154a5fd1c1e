use super::build_config::BuildConfig;
use crate::{
    env::{Env, ExplicitEnv as _},
    util::{
        self,
        cli::{Report, Reportable},
        RunError,
    },
};
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub static ARCHIVE_NAME: &str = "out.xcarchive";
static CONFIGURATION: &str = "Release";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Project path {path:?} has no file name")]
    ProjectPathInvalid { path: PathBuf },
    #[error("Project {path:?} doesn't exist")]
    ProjectMissing { path: PathBuf },
    #[error("Failed to remove stale archive {path:?}: {source}")]
    StaleArchiveRemovalFailed { path: PathBuf, source: io::Error },
    #[error(transparent)]
    ArchiveFailed(RunError),
}

impl Reportable for ArchiveError {
    fn report(&self) -> Report {
        match self {
            Self::ArchiveFailed(RunError::Failed { command, output, .. }) => Report::error(
                format!("Failed to archive via `xcodebuild` (`{}`)", command),
                output,
            ),
            Self::ArchiveFailed(err) => Report::error("Failed to archive via `xcodebuild`", err),
            _ => Report::error("Failed to archive via `xcodebuild`", self),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProjectKind {
    Workspace,
    Project,
}

impl ProjectKind {
    pub fn flag(self) -> &'static str {
        match self {
            Self::Workspace => "-workspace",
            Self::Project => "-project",
        }
    }
}

/// An Xcode project or workspace plus the scheme to archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Buildable {
    dir: PathBuf,
    file_name: OsString,
    kind: ProjectKind,
    scheme: String,
}

impl Buildable {
    pub fn new(path: impl AsRef<Path>, scheme: impl Into<String>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let trimmed = path
            .to_str()
            .map(util::trim_trailing_separators)
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_owned());
        let file_name = trimmed
            .file_name()
            .ok_or_else(|| ArchiveError::ProjectPathInvalid {
                path: path.to_owned(),
            })?
            .to_owned();
        let kind = if trimmed
            .extension()
            .map_or(false, |ext| ext == "xcworkspace")
        {
            ProjectKind::Workspace
        } else {
            ProjectKind::Project
        };
        let dir = match trimmed.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            dir,
            file_name,
            kind,
            scheme: scheme.into(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_NAME)
    }

    /// Arguments to `xcodebuild`, relative to `dir`.
    pub fn archive_args(
        &self,
        build_config: &BuildConfig,
        swift_version: Option<&str>,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.kind.flag().into(),
            self.file_name.clone(),
            "-scheme".into(),
            self.scheme.clone().into(),
            "-configuration".into(),
            CONFIGURATION.into(),
            "archive".into(),
            "-archivePath".into(),
            ARCHIVE_NAME.into(),
        ];
        if let Some(swift_version) = swift_version {
            args.push(format!("SWIFT_VERSION={}", swift_version).into());
        }
        args.extend(build_config.build_settings().into_iter().map(OsString::from));
        args
    }

    /// Runs `xcodebuild archive` from the project's directory and returns the
    /// path of the resulting archive.
    pub fn archive(
        &self,
        build_config: &BuildConfig,
        swift_version: Option<&str>,
        env: &Env,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, ArchiveError> {
        let project = self.path();
        if !project.exists() {
            return Err(ArchiveError::ProjectMissing { path: project });
        }
        let archive_path = self.archive_path();
        if archive_path.exists() {
            log::info!("removing stale archive {:?}", archive_path);
            std::fs::remove_dir_all(&archive_path).map_err(|source| {
                ArchiveError::StaleArchiveRemovalFailed {
                    path: archive_path.clone(),
                    source,
                }
            })?;
        }
        log::info!("archiving scheme {:?} of {:?}", self.scheme, project);
        util::run_captured(
            duct::cmd("xcodebuild", self.archive_args(build_config, swift_version))
                .dir(&self.dir)
                .full_env(env.explicit_env()),
            timeout,
        )
        .map_err(ArchiveError::ArchiveFailed)?;
        Ok(archive_path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(
        path,
        dir,
        kind,
        case("/tmp/base/sizetestproject/SizeTest.xcodeproj", "/tmp/base/sizetestproject", ProjectKind::Project),
        case("/tmp/target/SwiftApp/SwiftApp.xcworkspace/", "/tmp/target/SwiftApp", ProjectKind::Workspace),
        case("SizeTest.xcodeproj", ".", ProjectKind::Project)
    )]
    fn test_buildable_new(path: &str, dir: &str, kind: ProjectKind) {
        let buildable = Buildable::new(path, "SizeTest").unwrap();
        assert_eq!(buildable.dir, Path::new(dir));
        assert_eq!(buildable.kind, kind);
        assert_eq!(buildable.archive_path(), Path::new(dir).join(ARCHIVE_NAME));
    }

    #[test]
    fn test_archive_args() {
        let buildable = Buildable::new("/tmp/x/SizeTest.xcworkspace", "SizeTest").unwrap();
        let args = buildable.archive_args(&BuildConfig::bundled().unwrap(), Some("5.0"));
        let args = args
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            &args[..10],
            &[
                "-workspace",
                "SizeTest.xcworkspace",
                "-scheme",
                "SizeTest",
                "-configuration",
                "Release",
                "archive",
                "-archivePath",
                "out.xcarchive",
                "SWIFT_VERSION=5.0",
            ]
        );
        assert!(args.contains(&"CODE_SIGNING_ALLOWED=NO"));
    }

    #[test]
    fn test_archive_args_without_swift() {
        let buildable = Buildable::new("SizeTest.xcodeproj", "SizeTest").unwrap();
        let args = buildable.archive_args(&BuildConfig::bundled().unwrap(), None);
        assert!(!args
            .iter()
            .any(|arg| arg.to_string_lossy().starts_with("SWIFT_VERSION=")));
        assert_eq!(args[0], OsString::from("-project"));
    }

    #[test]
    fn test_archive_missing_project() {
        let dir = tempfile::tempdir().unwrap();
        let buildable = Buildable::new(dir.path().join("Missing.xcodeproj"), "Missing").unwrap();
        let env = Env::new().unwrap();
        assert!(matches!(
            buildable
                .archive(&BuildConfig::bundled().unwrap(), None, &env, None)
                .unwrap_err(),
            ArchiveError::ProjectMissing { .. }
        ));
    }
}
