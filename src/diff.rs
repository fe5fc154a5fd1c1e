use crate::{
    report::ProjectComparison,
    util::{
        self,
        cli::{Report, Reportable},
    },
    xcode::{ArchiveError, Archiver, Buildable, SizeError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid {role} project {path:?}: {source}")]
    ProjectInvalid {
        role: &'static str,
        path: String,
        source: ArchiveError,
    },
    #[error("Failed to measure {role} project {path:?}: {source}")]
    SizeFailed {
        role: &'static str,
        path: String,
        source: SizeError,
    },
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::ProjectInvalid { .. } => Report::action_request(
                "Pass the path of an `.xcodeproj` or `.xcworkspace`",
                self,
            ),
            Self::SizeFailed { source, .. } => source.report(),
        }
    }
}

/// One side of a comparison: a project or workspace path and the scheme to
/// archive.
#[derive(Clone, Copy, Debug)]
pub struct Side<'a> {
    pub project: &'a str,
    pub scheme: &'a str,
}

impl<'a> Side<'a> {
    pub fn new(project: &'a str, scheme: &'a str) -> Self {
        Self {
            project: util::trim_trailing_separators(project),
            scheme,
        }
    }

    fn buildable(&self, role: &'static str) -> Result<Buildable, Error> {
        Buildable::new(self.project, self.scheme).map_err(|source| Error::ProjectInvalid {
            role,
            path: self.project.to_owned(),
            source,
        })
    }

    fn size(&self, role: &'static str, archiver: &Archiver<'_>) -> Result<u64, Error> {
        let buildable = self.buildable(role)?;
        let size = archiver
            .size(&buildable)
            .map_err(|source| Error::SizeFailed {
                role,
                path: self.project.to_owned(),
                source,
            })?;
        log::info!("{} project {:?} is {} bytes", role, self.project, size);
        Ok(size)
    }
}

/// Archives `source` then `target` and compares the two. Both paths are
/// validated before anything is built.
pub fn generate_size_difference(
    source: Side<'_>,
    target: Side<'_>,
    archiver: &Archiver<'_>,
) -> Result<ProjectComparison, Error> {
    source.buildable("source")?;
    target.buildable("target")?;
    let source_size = source.size("source", archiver)?;
    let target_size = target.size("target", archiver)?;
    Ok(ProjectComparison {
        source: source.project.to_owned(),
        source_size,
        target: target.project.to_owned(),
        target_size,
    })
}
