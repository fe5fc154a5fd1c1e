pub mod archive;
pub mod artifact;
pub mod build_config;
pub mod swift;

pub use self::{
    archive::{ArchiveError, Buildable},
    artifact::{binary_size, ArtifactError},
    build_config::BuildConfig,
};

use crate::{
    env::Env,
    util::cli::{Report, Reportable},
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SizeError {
    #[error(transparent)]
    ArchiveFailed(#[from] ArchiveError),
    #[error(transparent)]
    ArtifactMissing(#[from] ArtifactError),
}

impl Reportable for SizeError {
    fn report(&self) -> Report {
        match self {
            Self::ArchiveFailed(err) => err.report(),
            Self::ArtifactMissing(err) => err.report(),
        }
    }
}

/// Everything needed to turn a project into a byte count.
#[derive(Debug)]
pub struct Archiver<'a> {
    env: &'a Env,
    build_config: &'a BuildConfig,
    swift_version: Option<String>,
    timeout: Option<Duration>,
}

impl<'a> Archiver<'a> {
    pub fn new(
        env: &'a Env,
        build_config: &'a BuildConfig,
        swift_version: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            env,
            build_config,
            swift_version,
            timeout,
        }
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    pub fn size(&self, buildable: &Buildable) -> Result<u64, SizeError> {
        let archive = buildable.archive(
            self.build_config,
            self.swift_version.as_deref(),
            self.env,
            self.timeout,
        )?;
        Ok(binary_size(archive)?)
    }
}
