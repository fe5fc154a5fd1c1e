use crate::util::cli::{Report, Reportable};
use std::{ffi::OsStr, fmt::Debug};
use thiserror::Error;

// CocoaPods refuses to run under a non-UTF-8 locale.
static FALLBACK_LANG: &str = "en_US.UTF-8";

pub trait ExplicitEnv: Debug {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("The `HOME` environment variable isn't set, which is pretty weird: {0}")]
    HomeNotSet(#[source] std::env::VarError),
    #[error("The `PATH` environment variable isn't set, which is super weird: {0}")]
    PathNotSet(#[source] std::env::VarError),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        Report::error("Failed to initialize base environment", self)
    }
}

#[derive(Debug)]
pub struct Env {
    home: String,
    path: String,
    lang: String,
    term: Option<String>,
    ssh_auth_sock: Option<String>,
    developer_dir: Option<String>,
}

impl Env {
    pub fn new() -> Result<Self, Error> {
        let home = std::env::var("HOME").map_err(Error::HomeNotSet)?;
        let path = std::env::var("PATH").map_err(Error::PathNotSet)?;
        let lang = std::env::var("LANG")
            .ok()
            .filter(|lang| lang.to_ascii_uppercase().contains("UTF-8"))
            .unwrap_or_else(|| FALLBACK_LANG.to_owned());
        let term = std::env::var("TERM").ok();
        let ssh_auth_sock = std::env::var("SSH_AUTH_SOCK").ok();
        let developer_dir = std::env::var("DEVELOPER_DIR").ok();
        Ok(Self {
            home,
            path,
            lang,
            term,
            ssh_auth_sock,
            developer_dir,
        })
    }

    /// The `PATH` children are started with, and tools are looked up on.
    pub fn path(&self) -> &str {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl ExplicitEnv for Env {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)> {
        let mut env = vec![
            ("HOME", self.home.as_ref()),
            ("PATH", self.path.as_ref()),
            ("LANG", self.lang.as_ref()),
        ];
        if let Some(term) = self.term.as_ref() {
            env.push(("TERM", term.as_ref()));
        }
        if let Some(ssh_auth_sock) = self.ssh_auth_sock.as_ref() {
            env.push(("SSH_AUTH_SOCK", ssh_auth_sock.as_ref()));
        }
        if let Some(developer_dir) = self.developer_dir.as_ref() {
            env.push(("DEVELOPER_DIR", developer_dir.as_ref()));
        }
        env
    }
}
