use super::{podfile::Podfile, PodRef, PodVersion};
use crate::{
    env::{Env, ExplicitEnv as _},
    util::{
        self,
        cli::{Report, Reportable},
        RunError,
    },
    DuctExpressionExt as _,
};
use indexmap::IndexMap;
use once_cell_regex::regex;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to run `pod init`: {0}")]
    InitFailed(#[source] RunError),
    #[error(transparent)]
    PodfileFailed(#[from] super::podfile::Error),
    #[error("Failed to run `pod install`: {0}")]
    InstallFailed(#[source] RunError),
    #[error("Failed to read {path:?}: {source}")]
    LockfileReadFailed { path: PathBuf, source: io::Error },
    #[error("`pod install` didn't record a version for {pod:?} in {path:?}")]
    VersionNotResolved { pod: String, path: PathBuf },
    #[error("`pod install` didn't produce a workspace at {path:?}")]
    WorkspaceMissing { path: PathBuf },
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::InitFailed(err) | Self::InstallFailed(err) => Report::error(
                "CocoaPods failed",
                err.output().map(str::to_owned).unwrap_or_else(|| err.to_string()),
            ),
            Self::PodfileFailed(err) => Report::error("Failed to generate Podfile", err),
            Self::LockfileReadFailed { .. } | Self::VersionNotResolved { .. } => {
                Report::error("Failed to resolve pod versions", self)
            }
            Self::WorkspaceMissing { .. } => Report::error("Failed to install pods", self),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPod {
    pub name: String,
    pub version: String,
}

/// The result of integrating pods into a copy of the sample app.
#[derive(Debug)]
pub struct Installation {
    pub workspace: PathBuf,
    pub pods: Vec<ResolvedPod>,
}

/// Top-level entries of the `PODS:` section of a `Podfile.lock`, e.g.
/// `  - AFNetworking (4.0.1):`. Subspecs are keyed by their full name.
pub fn parse_lockfile(contents: &str) -> IndexMap<String, String> {
    let entry_re = regex!(r"^  - (?P<name>[^\s(]+) \((?P<version>[^)]+)\)");
    contents
        .lines()
        .skip_while(|line| line.trim_end() != "PODS:")
        .skip(1)
        .take_while(|line| line.starts_with(' '))
        .filter_map(|line| {
            entry_re
                .captures(line)
                .map(|caps| (caps["name"].to_owned(), caps["version"].to_owned()))
        })
        .collect()
}

/// Pinned pods report exactly what was asked for; everything else reports what
/// CocoaPods picked.
pub fn resolve_versions(
    pods: &[PodRef],
    locked: &IndexMap<String, String>,
) -> Result<Vec<ResolvedPod>, String> {
    pods.iter()
        .map(|pod| -> Result<ResolvedPod, String> {
            let version = match pod.version() {
                PodVersion::Pinned(version) => version.clone(),
                PodVersion::Latest => locked
                    .get(pod.name())
                    .or_else(|| {
                        // A root pod installed only through its subspecs.
                        let prefix = format!("{}/", pod.name());
                        locked
                            .iter()
                            .find(|(name, _)| name.starts_with(&prefix))
                            .map(|(_, version)| version)
                    })
                    .cloned()
                    .ok_or_else(|| pod.name().to_owned())?,
            };
            Ok(ResolvedPod {
                name: pod.name().to_owned(),
                version,
            })
        })
        .collect()
}

fn pod_command(project_dir: &Path, env: &Env, args: &[&str]) -> duct::Expression {
    duct::cmd("pod", args).dir(project_dir).vars(env.explicit_env())
}

pub fn install(
    project_dir: &Path,
    target: &str,
    podfile: &Podfile<'_>,
    pods: &[PodRef],
    env: &Env,
) -> Result<Installation, Error> {
    log::info!(
        "installing {} into {:?}",
        util::list_display(pods),
        project_dir
    );
    util::run_captured(pod_command(project_dir, env, &["init"]), None)
        .map_err(Error::InitFailed)?;
    podfile.write(project_dir)?;
    util::run_captured(pod_command(project_dir, env, &["install"]), None)
        .map_err(Error::InstallFailed)?;

    let workspace = project_dir.join(format!("{}.xcworkspace", target));
    if !workspace.is_dir() {
        return Err(Error::WorkspaceMissing { path: workspace });
    }
    let lockfile = project_dir.join("Podfile.lock");
    let contents = std::fs::read_to_string(&lockfile).map_err(|source| {
        Error::LockfileReadFailed {
            path: lockfile.clone(),
            source,
        }
    })?;
    let pods = resolve_versions(pods, &parse_lockfile(&contents))
        .map_err(|pod| Error::VersionNotResolved {
            pod,
            path: lockfile,
        })?;
    for pod in &pods {
        log::info!("{} resolved to version {}", pod.name, pod.version);
    }
    Ok(Installation { workspace, pods })
}

#[derive(Debug, Error)]
pub enum PodfileJsonError {
    #[error("Failed to run `pod ipc podfile-json`: {0}")]
    CommandFailed(#[source] RunError),
    #[error("`pod ipc podfile-json` produced invalid JSON: {0}")]
    JsonInvalid(#[source] serde_json::Error),
}

/// The Podfile in `project_dir` as CocoaPods itself understands it.
pub fn podfile_json(
    project_dir: &Path,
    env: &Env,
) -> Result<serde_json::Map<String, serde_json::Value>, PodfileJsonError> {
    let expression = pod_command(project_dir, env, &["ipc", "podfile-json", "Podfile"]);
    let command = format!("{:?}", expression);
    log::info!("running command: {}", command);
    let output = expression
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|source| {
            PodfileJsonError::CommandFailed(RunError::StartFailed {
                command: command.clone(),
                source,
            })
        })?;
    if !output.status.success() {
        return Err(PodfileJsonError::CommandFailed(RunError::Failed {
            command,
            status: output.status,
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        }));
    }
    serde_json::from_slice(&output.stdout).map_err(PodfileJsonError::JsonInvalid)
}

#[cfg(test)]
mod test {
    use super::*;

    static LOCKFILE: &str = "\
PODS:
  - AFNetworking (4.0.1):
    - AFNetworking/NSURLSession (= 4.0.1)
    - AFNetworking/Reachability (= 4.0.1)
  - AFNetworking/NSURLSession (4.0.1):
    - AFNetworking/Reachability
  - AFNetworking/Reachability (4.0.1)
  - GoogleUtilities/Logger (7.12.0)
  - SDWebImage (5.18.2):
    - SDWebImage/Core (= 5.18.2)

DEPENDENCIES:
  - AFNetworking
  - SDWebImage (= 5.18.2)

SPEC REPOS:
  trunk:
    - AFNetworking (9.9.9)

COCOAPODS: 1.14.3
";

    #[test]
    fn test_parse_lockfile() {
        let locked = parse_lockfile(LOCKFILE);
        assert_eq!(locked.get("AFNetworking").map(String::as_str), Some("4.0.1"));
        assert_eq!(locked.get("SDWebImage").map(String::as_str), Some("5.18.2"));
        assert_eq!(
            locked.get("AFNetworking/Reachability").map(String::as_str),
            Some("4.0.1")
        );
        assert_eq!(locked.len(), 5);
    }

    #[test]
    fn test_parse_lockfile_without_pods() {
        assert!(parse_lockfile("COCOAPODS: 1.14.3\n").is_empty());
    }

    #[test]
    fn test_resolve_latest_reports_locked_version() {
        let pods = vec![PodRef::new("AFNetworking", PodVersion::Latest)];
        assert_eq!(
            resolve_versions(&pods, &parse_lockfile(LOCKFILE)).unwrap(),
            vec![ResolvedPod {
                name: "AFNetworking".to_owned(),
                version: "4.0.1".to_owned()
            }]
        );
    }

    #[test]
    fn test_resolve_pinned_reports_requested_version() {
        let pods = vec![PodRef::new(
            "SDWebImage",
            PodVersion::Pinned("~> 5.0".to_owned()),
        )];
        assert_eq!(
            resolve_versions(&pods, &IndexMap::new()).unwrap(),
            vec![ResolvedPod {
                name: "SDWebImage".to_owned(),
                version: "~> 5.0".to_owned()
            }]
        );
    }

    #[test]
    fn test_resolve_root_pod_through_subspec() {
        let pods = vec![PodRef::new("GoogleUtilities", PodVersion::Latest)];
        assert_eq!(
            resolve_versions(&pods, &parse_lockfile(LOCKFILE)).unwrap()[0].version,
            "7.12.0"
        );
    }

    #[test]
    fn test_resolve_missing_pod() {
        let pods = vec![PodRef::new("Kingfisher", PodVersion::Latest)];
        assert_eq!(
            resolve_versions(&pods, &parse_lockfile(LOCKFILE)).unwrap_err(),
            "Kingfisher"
        );
    }
}
