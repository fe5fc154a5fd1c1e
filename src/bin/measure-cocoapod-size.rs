#![forbid(unsafe_code)]

use cocoapods_size::{
    env::{Env, Error as EnvError},
    measure::{self, Options},
    opts::Mode,
    pod::PodRef,
    util::cli::{self, BuildTimeout, Exec, GlobalFlags, Report, Reportable, TextWrapper},
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "measure-cocoapod-size",
    about = "Measures how much CocoaPods add to the size of an iOS app",
    settings = cli::SETTINGS,
)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(
        long = "cocoapods",
        value_name = "NAME[:VERSION]",
        help = "Pods to measure; the latest version is used unless one is given",
        required = true,
        min_values = 1
    )]
    cocoapods: Vec<PodRef>,
    #[structopt(
        long = "mode",
        help = "Kind of sample app to integrate the pods into",
        default_value = "objc",
        possible_values = Mode::POSSIBLE_VALUES
    )]
    mode: Mode,
    #[structopt(
        long = "spec_repos",
        alias = "spec-repos",
        value_name = "REPO",
        help = "Spec repos to resolve pods from; `master` means the CocoaPods CDN",
        min_values = 1
    )]
    spec_repos: Vec<String>,
    #[structopt(
        long = "cocoapods_source_config",
        alias = "cocoapods-source-config",
        value_name = "PATH",
        help = "JSON file pointing pods at a local path or a git branch",
        parse(from_os_str)
    )]
    cocoapods_source_config: Option<PathBuf>,
    #[structopt(flatten)]
    build_timeout: BuildTimeout,
    #[structopt(
        long = "json",
        value_name = "PATH",
        help = "Also write the Podfile and measured sizes as JSON to this file",
        parse(from_os_str)
    )]
    json: Option<PathBuf>,
    #[structopt(
        long = "sample_app_dir",
        alias = "sample-app-dir",
        value_name = "PATH",
        help = "Sample app to measure against instead of the one for `--mode`",
        parse(from_os_str)
    )]
    sample_app_dir: Option<PathBuf>,
    #[structopt(
        long = "build_config",
        alias = "build-config",
        value_name = "PATH",
        help = "Build configuration file with extra `xcodebuild` settings",
        parse(from_os_str)
    )]
    build_config: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Error {
    EnvInitFailed(EnvError),
    MeasureFailed(measure::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::EnvInitFailed(err) => err.report(),
            Self::MeasureFailed(err) => err.report(),
        }
    }
}

impl Exec for Input {
    type Report = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, _wrapper: &TextWrapper) -> Result<(), Self::Report> {
        let Self {
            flags: _,
            cocoapods,
            mode,
            spec_repos,
            cocoapods_source_config,
            build_timeout,
            json,
            sample_app_dir,
            build_config,
        } = self;
        let options = Options {
            pods: cocoapods,
            mode,
            spec_repos,
            source_config: cocoapods_source_config,
            sample_app_dir,
            build_config,
            build_timeout: build_timeout.duration(),
            json,
        };
        let env = Env::new().map_err(Error::EnvInitFailed)?;
        let report = measure::run(&options, &env).map_err(Error::MeasureFailed)?;
        for line in report.lines() {
            println!("{}", line);
        }
        Ok(())
    }
}

fn main() {
    cli::exec::<Input>()
}
