#![forbid(unsafe_code)]

use cocoapods_size::{
    diff::{self, Side},
    env::{Env, Error as EnvError},
    util::{
        self,
        cli::{self, BuildTimeout, Exec, GlobalFlags, Report, Reportable, TextWrapper},
    },
    xcode::{build_config, swift, Archiver, BuildConfig},
};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "xcode-project-diff",
    about = "Compares the archived size of two Xcode projects",
    settings = cli::SETTINGS,
)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(
        long = "source_project",
        alias = "source-project",
        value_name = "PATH",
        help = "`.xcodeproj` or `.xcworkspace` to measure"
    )]
    source_project: String,
    #[structopt(
        long = "source_scheme",
        alias = "source-scheme",
        value_name = "SCHEME",
        help = "Scheme to archive in the source project"
    )]
    source_scheme: String,
    #[structopt(
        long = "target_project",
        alias = "target-project",
        value_name = "PATH",
        help = "`.xcodeproj` or `.xcworkspace` to compare against"
    )]
    target_project: String,
    #[structopt(
        long = "target_scheme",
        alias = "target-scheme",
        value_name = "SCHEME",
        help = "Scheme to archive in the target project"
    )]
    target_scheme: String,
    #[structopt(flatten)]
    build_timeout: BuildTimeout,
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
    XcodebuildMissing,
    BuildConfigFailed(build_config::Error),
    DiffFailed(diff::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::EnvInitFailed(err) => err.report(),
            Self::XcodebuildMissing => Report::action_request(
                "Please install Xcode and try again!",
                "`xcodebuild` wasn't found on your `PATH`.",
            ),
            Self::BuildConfigFailed(err) => err.report(),
            Self::DiffFailed(err) => err.report(),
        }
    }
}

impl Exec for Input {
    type Report = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, _wrapper: &TextWrapper) -> Result<(), Self::Report> {
        let env = Env::new().map_err(Error::EnvInitFailed)?;
        if !util::command_present("xcodebuild", &env) {
            return Err(Error::XcodebuildMissing);
        }
        let build_config = BuildConfig::load_or_bundled(self.build_config.as_deref(), Path::new("."))
            .map_err(Error::BuildConfigFailed)?;
        let archiver = Archiver::new(
            &env,
            &build_config,
            swift::detect(&env),
            self.build_timeout.duration(),
        );
        let comparison = diff::generate_size_difference(
            Side::new(&self.source_project, &self.source_scheme),
            Side::new(&self.target_project, &self.target_scheme),
            &archiver,
        )
        .map_err(Error::DiffFailed)?;
        println!("{}", comparison);
        Ok(())
    }
}

fn main() {
    cli::exec::<Input>()
}
