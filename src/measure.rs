//! Archiving the sample app with and without pods.
//!
//! Every variant gets its own scratch copy of the sample app, so nothing a
//! build leaves behind can leak into another measurement.

use crate::{
    env::Env,
    opts::Mode,
    pod::{
        self,
        install::{self, Installation, PodfileJsonError},
        podfile::Podfile,
        source::{SourceConfig, SourceConfigError},
        PodRef,
    },
    report::{ReportError, SizeReport},
    sample_app::{self, Prepared, SampleApp},
    util::{
        self,
        cli::{Report, Reportable},
    },
    xcode::{build_config, swift, Archiver, BuildConfig, Buildable, SizeError},
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No pods were requested; pass at least one with `--cocoapods`")]
    NoPods,
    #[error(transparent)]
    SourceConfigFailed(#[from] SourceConfigError),
    #[error("`{tool}` wasn't found on your `PATH`.")]
    ToolMissing { tool: &'static str },
    #[error(transparent)]
    BuildConfigFailed(#[from] build_config::Error),
    #[error("Failed to create temporary directory: {0}")]
    TempDirFailed(#[source] io::Error),
    #[error(transparent)]
    SampleAppFailed(#[from] sample_app::Error),
    #[error("Failed to describe {project:?} as a buildable: {source}")]
    BuildableInvalid {
        project: PathBuf,
        source: crate::xcode::ArchiveError,
    },
    #[error(transparent)]
    InstallFailed(#[from] install::Error),
    #[error(transparent)]
    SizeFailed(#[from] SizeError),
    #[error(transparent)]
    ReportFailed(#[from] ReportError),
    #[error(transparent)]
    PodfileJsonFailed(#[from] PodfileJsonError),
    #[error("Failed to serialize JSON report: {0}")]
    JsonSerializeFailed(#[source] serde_json::Error),
    #[error("Failed to write JSON report to {path:?}: {source}")]
    JsonWriteFailed { path: PathBuf, source: io::Error },
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::NoPods => Report::action_request("Nothing to measure", self),
            Self::SourceConfigFailed(err) => err.report(),
            Self::ToolMissing { tool } => Report::action_request(
                format!("Please install `{}` and try again!", tool),
                self,
            ),
            Self::BuildConfigFailed(err) => err.report(),
            Self::SampleAppFailed(err) => err.report(),
            Self::InstallFailed(err) => err.report(),
            Self::SizeFailed(err) => err.report(),
            Self::PodfileJsonFailed(err) => Report::error("Failed to convert Podfile to JSON", err),
            Self::JsonSerializeFailed(_) | Self::JsonWriteFailed { .. } => {
                Report::error("Failed to write JSON report", self)
            }
            _ => Report::error("Failed to measure pods", self),
        }
    }
}

/// The pods to measure and how to integrate them. Immutable once built.
#[derive(Clone, Debug)]
pub struct MeasurementRequest {
    pods: Vec<PodRef>,
    mode: Mode,
    spec_repos: Vec<String>,
}

impl MeasurementRequest {
    /// Repeated pods collapse to the last one given, keeping the position of
    /// the first. Pods without a pinned version pick up their entry in
    /// `sources`, if any.
    pub fn new(
        pods: impl IntoIterator<Item = PodRef>,
        mode: Mode,
        spec_repos: &[String],
        sources: Option<&SourceConfig>,
    ) -> Result<Self, Error> {
        let mut unique = IndexMap::<String, PodRef>::new();
        for pod in pods {
            if let Some(previous) = unique.insert(pod.name().to_owned(), pod.clone()) {
                log::warn!(
                    "pod {:?} was requested more than once; using {} instead of {}",
                    pod.name(),
                    pod,
                    previous
                );
            }
        }
        if unique.is_empty() {
            return Err(Error::NoPods);
        }
        let pods = unique
            .into_iter()
            .map(|(name, pod)| {
                let source = sources.and_then(|sources| sources.get(&name));
                match (source, pod.version().pinned()) {
                    (Some(source), None) => {
                        log::info!("pod {:?} will be installed from {:?}", name, source);
                        pod.with_source(Some(source.clone()))
                    }
                    (Some(_), Some(version)) => {
                        log::info!(
                            "pod {:?} is pinned to {:?}, so its source config entry is ignored",
                            name,
                            version
                        );
                        pod
                    }
                    (None, _) => pod,
                }
            })
            .collect::<Vec<_>>();
        if let Some(sources) = sources {
            for sdk in sources.sdks() {
                if !pods.iter().any(|pod| pod.name() == sdk) {
                    log::debug!("source config entry {:?} matches no requested pod", sdk);
                }
            }
        }
        Ok(Self {
            pods,
            mode,
            spec_repos: pod::resolve_spec_repos(spec_repos),
        })
    }

    pub fn pods(&self) -> &[PodRef] {
        &self.pods
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn spec_repos(&self) -> &[String] {
        &self.spec_repos
    }
}

/// A scratch copy of the sample app. Dropping it removes the copy.
#[derive(Debug)]
struct Variant {
    _root: TempDir,
    dir: PathBuf,
}

impl Variant {
    fn new(label: &str, app: &Prepared) -> Result<Self, Error> {
        let root = tempfile::Builder::new()
            .prefix(&format!("cocoapods-size-{}-", label.replace('/', "-")))
            .tempdir()
            .map_err(Error::TempDirFailed)?;
        let dir = app.copy_to(root.path())?;
        log::info!("{} variant lives at {:?}", label, dir);
        Ok(Self { _root: root, dir })
    }
}

fn buildable(project: PathBuf, scheme: &str) -> Result<Buildable, Error> {
    Buildable::new(&project, scheme).map_err(|source| Error::BuildableInvalid { project, source })
}

fn install_pods(
    variant: &Variant,
    request: &MeasurementRequest,
    pods: &[PodRef],
    app: &Prepared,
    archiver: &Archiver<'_>,
) -> Result<Installation, Error> {
    let podfile = Podfile::new(
        request.spec_repos(),
        request.mode().swift(),
        app.name(),
        pods,
    );
    Ok(install::install(
        &variant.dir,
        app.name(),
        &podfile,
        pods,
        archiver.env(),
    )?)
}

/// The JSON report: the combined Podfile as CocoaPods reads it, plus the
/// measured sizes.
pub fn json_report(mut podfile: Map<String, Value>, report: &SizeReport) -> Value {
    podfile.insert(
        "combined_pods_extra_size".to_owned(),
        report.combined_delta().into(),
    );
    if let Some(deltas) = report.individual_deltas() {
        let individual = deltas
            .into_iter()
            .map(|pod| (pod.name, Value::from(pod.delta)))
            .collect::<Map<_, _>>();
        podfile.insert(
            "individual_pods_extra_size".to_owned(),
            Value::Object(individual),
        );
    }
    if let Some(savings) = report.shared_dependency_savings() {
        podfile.insert("shared_dependency_savings".to_owned(), savings.into());
    }
    Value::Object(podfile)
}

fn write_json(path: &Path, value: &Value) -> Result<(), Error> {
    let contents = serde_json::to_string_pretty(value).map_err(Error::JsonSerializeFailed)?;
    log::info!("writing JSON report to {:?}", path);
    std::fs::write(path, contents).map_err(|source| Error::JsonWriteFailed {
        path: path.to_owned(),
        source,
    })
}

/// Archives the baseline, the baseline with every pod, and, when there's more
/// than one pod, the baseline with each pod on its own.
pub fn measure(
    request: &MeasurementRequest,
    app: &Prepared,
    archiver: &Archiver<'_>,
    json: Option<&Path>,
) -> Result<SizeReport, Error> {
    log::info!(
        "measuring {} in {} mode",
        util::list_display(request.pods()),
        request.mode()
    );

    let baseline = {
        let variant = Variant::new("baseline", app)?;
        archiver.size(&buildable(app.project_path(&variant.dir), app.name())?)?
    };
    log::info!("baseline size: {} bytes", baseline);

    let combined = Variant::new("combined", app)?;
    let installation = install_pods(&combined, request, request.pods(), app, archiver)?;
    let combined_size = archiver.size(&buildable(installation.workspace.clone(), app.name())?)?;
    log::info!("combined size: {} bytes", combined_size);
    let podfile_json = json
        .map(|_| install::podfile_json(&combined.dir, archiver.env()))
        .transpose()?;
    drop(combined);

    let mut report = SizeReport::new(baseline, combined_size, installation.pods)?;
    if request.pods().len() > 1 {
        let mut sizes = Vec::with_capacity(request.pods().len());
        for pod in request.pods() {
            let variant = Variant::new(pod.name(), app)?;
            let installation =
                install_pods(&variant, request, std::slice::from_ref(pod), app, archiver)?;
            let size = archiver.size(&buildable(installation.workspace, app.name())?)?;
            log::info!("size with only {}: {} bytes", pod.name(), size);
            sizes.push(size);
        }
        report = report.with_individual(sizes)?;
    }

    for anomaly in report.anomalies() {
        log::warn!("anomalous measurement: {}", anomaly);
    }
    if let (Some(path), Some(podfile)) = (json, podfile_json) {
        write_json(path, &json_report(podfile, &report))?;
    }
    Ok(report)
}

/// Everything `measure-cocoapod-size` was asked to do.
#[derive(Clone, Debug)]
pub struct Options {
    pub pods: Vec<PodRef>,
    pub mode: Mode,
    pub spec_repos: Vec<String>,
    pub source_config: Option<PathBuf>,
    pub sample_app_dir: Option<PathBuf>,
    pub build_config: Option<PathBuf>,
    pub build_timeout: Option<Duration>,
    pub json: Option<PathBuf>,
}

/// Loads and checks every input, then measures. Nothing is archived unless
/// the source config, the pods, the tools and the build configuration are
/// all usable.
pub fn run(options: &Options, env: &Env) -> Result<SizeReport, Error> {
    let sources = options
        .source_config
        .as_deref()
        .map(SourceConfig::load)
        .transpose()?;
    let request = MeasurementRequest::new(
        options.pods.iter().cloned(),
        options.mode,
        &options.spec_repos,
        sources.as_ref(),
    )?;
    for &tool in &["pod", "xcodebuild"] {
        if !util::command_present(tool, env) {
            return Err(Error::ToolMissing { tool });
        }
    }
    let build_config =
        BuildConfig::load_or_bundled(options.build_config.as_deref(), Path::new("."))?;
    let app = SampleApp::for_mode(options.mode, options.sample_app_dir.as_deref()).prepare(env)?;
    let archiver = Archiver::new(env, &build_config, swift::detect(env), options.build_timeout);
    measure(&request, &app, &archiver, options.json.as_deref())
}
