use crate::{
    env::{Env, ExplicitEnv as _},
    opts::Mode,
    util::{
        self,
        cli::{Report, Reportable},
        CopyDirError, RunError,
    },
    DuctExpressionExt as _,
};
use handlebars::Handlebars;
use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use thiserror::Error;

static OBJC_APP_DIR: &str = "sizetestproject";
static OBJC_APP_NAME: &str = "SizeTest";
static SWIFT_APP_DIR: &str = "SwiftApp";
static SWIFT_APP_NAME: &str = "SwiftApp";

static DEPLOYMENT_TARGET: &str = "13.0";
static PROJECT_SPEC: &str = include_str!("../templates/sample-app/project.yml.hbs");
static OBJC_SOURCES: &[(&str, &str)] = &[
    (
        "AppDelegate.h",
        include_str!("../templates/sample-app/objc/AppDelegate.h"),
    ),
    (
        "AppDelegate.m",
        include_str!("../templates/sample-app/objc/AppDelegate.m"),
    ),
    ("main.m", include_str!("../templates/sample-app/objc/main.m")),
];
static SWIFT_SOURCES: &[(&str, &str)] = &[(
    "AppDelegate.swift",
    include_str!("../templates/sample-app/swift/AppDelegate.swift"),
)];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Sample app {dir:?} doesn't exist and `xcodegen` isn't installed to generate one")]
    XcodegenMissing { dir: PathBuf },
    #[error("Failed to create temporary directory: {0}")]
    TempDirFailed(#[source] io::Error),
    #[error("Failed to render project spec: {0}")]
    RenderFailed(#[source] handlebars::TemplateRenderError),
    #[error("Failed to write {path:?}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
    #[error("Failed to run `xcodegen`: {0}")]
    XcodegenFailed(#[source] RunError),
    #[error(transparent)]
    CopyFailed(#[from] CopyDirError),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::XcodegenMissing { .. } => Report::action_request(
                "Pass `--sample_app_dir` or run `brew install xcodegen` and try again",
                self,
            ),
            Self::XcodegenFailed(RunError::Failed { output, .. }) => {
                Report::error("Failed to generate sample app via `xcodegen`", output)
            }
            _ => Report::error("Failed to prepare sample app", self),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProjectSpecData<'a> {
    app_name: &'a str,
    deployment_target: &'a str,
}

pub fn render_project_spec(app_name: &str) -> Result<String, handlebars::TemplateRenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.render_template(
        PROJECT_SPEC,
        &ProjectSpecData {
            app_name,
            deployment_target: DEPLOYMENT_TARGET,
        },
    )
}

/// The host app pods are integrated into.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleApp {
    mode: Mode,
    dir: PathBuf,
    name: &'static str,
}

impl SampleApp {
    pub fn for_mode(mode: Mode, root: Option<&Path>) -> Self {
        let (dir, name) = match mode {
            Mode::ObjC => (OBJC_APP_DIR, OBJC_APP_NAME),
            Mode::Swift => (SWIFT_APP_DIR, SWIFT_APP_NAME),
        };
        let dir = match root {
            Some(root) => root.to_owned(),
            None => PathBuf::from(dir),
        };
        Self { mode, dir, name }
    }

    fn sources(&self) -> &'static [(&'static str, &'static str)] {
        match self.mode {
            Mode::ObjC => OBJC_SOURCES,
            Mode::Swift => SWIFT_SOURCES,
        }
    }

    /// Uses the app on disk if there is one, and generates a minimal one
    /// otherwise.
    pub fn prepare(&self, env: &Env) -> Result<Prepared, Error> {
        if self.dir.is_dir() {
            log::info!("using sample app at {:?}", self.dir);
            return Ok(Prepared {
                dir: self.dir.clone(),
                name: self.name,
                _generated: None,
            });
        }
        if !util::command_present("xcodegen", env) {
            return Err(Error::XcodegenMissing {
                dir: self.dir.clone(),
            });
        }
        let generated = tempfile::Builder::new()
            .prefix("sample-app")
            .tempdir()
            .map_err(Error::TempDirFailed)?;
        let dir = generated.path().join(self.name);
        log::info!("generating {} sample app at {:?}", self.mode, dir);
        self.generate(&dir, env)?;
        Ok(Prepared {
            dir,
            name: self.name,
            _generated: Some(generated),
        })
    }

    fn generate(&self, dir: &Path, env: &Env) -> Result<(), Error> {
        let write = |path: PathBuf, contents: &str| {
            std::fs::write(&path, contents).map_err(|source| Error::WriteFailed { path, source })
        };
        let sources_dir = dir.join("Sources");
        std::fs::create_dir_all(&sources_dir).map_err(|source| Error::WriteFailed {
            path: sources_dir.clone(),
            source,
        })?;
        let spec = render_project_spec(self.name).map_err(Error::RenderFailed)?;
        write(dir.join("project.yml"), &spec)?;
        for (file_name, contents) in self.sources() {
            write(sources_dir.join(file_name), contents)?;
        }
        util::run_captured(
            duct::cmd("xcodegen", ["generate", "--spec", "project.yml"])
                .dir(dir)
                .vars(env.explicit_env()),
            None,
        )
        .map_err(Error::XcodegenFailed)?;
        Ok(())
    }
}

/// A sample app ready to be copied into per-build scratch directories.
#[derive(Debug)]
pub struct Prepared {
    dir: PathBuf,
    name: &'static str,
    _generated: Option<TempDir>,
}

impl Prepared {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Copies the app into `dest_root`, returning the copy's directory.
    pub fn copy_to(&self, dest_root: &Path) -> Result<PathBuf, Error> {
        util::copy_dir(&self.dir, dest_root)?;
        let dir_name = self.dir.file_name().unwrap_or_else(|| self.dir.as_os_str());
        Ok(dest_root.join(dir_name))
    }

    pub fn project_path(&self, copy: &Path) -> PathBuf {
        copy.join(format!("{}.xcodeproj", self.name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_for_mode_defaults() {
        let objc = SampleApp::for_mode(Mode::ObjC, None);
        assert_eq!(objc.dir, Path::new("sizetestproject"));
        assert_eq!(objc.name, "SizeTest");
        let swift = SampleApp::for_mode(Mode::Swift, None);
        assert_eq!(swift.dir, Path::new("SwiftApp"));
        assert_eq!(swift.name, "SwiftApp");
    }

    #[test]
    fn test_for_mode_with_override() {
        let app = SampleApp::for_mode(Mode::Swift, Some(Path::new("/work/apps/MySwiftApp")));
        assert_eq!(app.dir, Path::new("/work/apps/MySwiftApp"));
        assert_eq!(app.name, "SwiftApp");
    }

    #[test]
    fn test_render_project_spec() {
        let spec = render_project_spec("SizeTest").unwrap();
        assert!(spec.starts_with("name: SizeTest\n"));
        assert!(spec.contains("  SizeTest:\n    type: application\n"));
        assert!(spec.contains("iOS: \"13.0\""));
        assert!(spec.contains("PRODUCT_BUNDLE_IDENTIFIER: com.example.sizetest.SizeTest\n"));
    }

    #[test]
    fn test_prepare_uses_existing_dir() {
        let root = tempfile::tempdir().unwrap();
        let app_dir = root.path().join("sizetestproject");
        std::fs::create_dir_all(app_dir.join("SizeTest.xcodeproj")).unwrap();
        let env = Env::new().unwrap();
        let prepared = SampleApp::for_mode(Mode::ObjC, Some(&app_dir))
            .prepare(&env)
            .unwrap();
        assert_eq!(prepared.name(), "SizeTest");

        let dest = tempfile::tempdir().unwrap();
        let copy = prepared.copy_to(dest.path()).unwrap();
        assert_eq!(copy, dest.path().join("sizetestproject"));
        assert!(prepared.project_path(&copy).is_dir());
    }
}
