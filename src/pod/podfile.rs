use super::{ruby_str, PodRef};
use handlebars::Handlebars;
use serde::Serialize;
use std::{io, path::Path};
use thiserror::Error;

static TEMPLATE_NAME: &str = "Podfile";
static TEMPLATE: &str = include_str!("../../templates/Podfile.hbs");

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to parse Podfile template: {0}")]
    TemplateInvalid(#[from] handlebars::TemplateError),
    #[error("Failed to render Podfile: {0}")]
    RenderFailed(#[from] handlebars::RenderError),
    #[error("Failed to write Podfile to {path:?}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Serialize)]
struct Data<'a> {
    sources: Vec<String>,
    use_frameworks: bool,
    target: &'a str,
    pods: Vec<String>,
}

#[derive(Debug)]
pub struct Podfile<'a> {
    spec_repos: &'a [String],
    use_frameworks: bool,
    target: &'a str,
    pods: &'a [PodRef],
}

impl<'a> Podfile<'a> {
    pub fn new(
        spec_repos: &'a [String],
        use_frameworks: bool,
        target: &'a str,
        pods: &'a [PodRef],
    ) -> Self {
        Self {
            spec_repos,
            use_frameworks,
            target,
            pods,
        }
    }

    pub fn render(&self) -> Result<String, Error> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string(TEMPLATE_NAME, TEMPLATE)?;
        let data = Data {
            sources: self.spec_repos.iter().map(|repo| ruby_str(repo)).collect(),
            use_frameworks: self.use_frameworks,
            target: self.target,
            pods: self.pods.iter().map(PodRef::podfile_args).collect(),
        };
        Ok(handlebars.render(TEMPLATE_NAME, &data)?)
    }

    pub fn write(&self, project_dir: &Path) -> Result<(), Error> {
        let path = project_dir.join("Podfile");
        let contents = self.render()?;
        log::info!("writing Podfile to {:?}:\n{}", path, contents);
        std::fs::write(&path, contents).map_err(|source| Error::WriteFailed { path, source })
    }
}
