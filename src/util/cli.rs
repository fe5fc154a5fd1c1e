use colored::{Color, Colorize as _};
use std::fmt::{Debug, Display};

pub type TextWrapper = textwrap::Wrapper<'static, textwrap::NoHyphenation>;

pub fn text_wrapper() -> TextWrapper {
    TextWrapper::with_splitter(textwrap::termwidth(), textwrap::NoHyphenation)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Label {
    Error,
    ActionRequest,
}

impl Label {
    pub fn color(self) -> Color {
        match self {
            Self::Error => Color::BrightRed,
            Self::ActionRequest => Color::BrightYellow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::ActionRequest => "action request",
        }
    }

    pub fn exit_code(self) -> i8 {
        match self {
            Self::Error | Self::ActionRequest => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    label: Label,
    msg: String,
    details: String,
}

impl Report {
    pub fn new(label: Label, msg: impl Display, details: impl Display) -> Self {
        Self {
            label,
            msg: msg.to_string(),
            details: details.to_string(),
        }
    }

    pub fn error(msg: impl Display, details: impl Display) -> Self {
        Self::new(Label::Error, msg, details)
    }

    pub fn action_request(msg: impl Display, details: impl Display) -> Self {
        Self::new(Label::ActionRequest, msg, details)
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    fn format(&self, wrapper: &TextWrapper) -> String {
        let head = wrapper.fill(&format!("{}: {}", self.label.as_str(), self.msg));
        // Tool output is passed through untouched, since wrapping mangles
        // compiler diagnostics.
        format!(
            "{}\n{}",
            head.color(self.label.color()).bold(),
            self.details
        )
    }

    /// Goes to stderr, since stdout is reserved for measurements.
    pub fn print(&self, wrapper: &TextWrapper) {
        eprintln!("{}", self.format(wrapper))
    }
}

pub trait Reportable: Debug {
    fn report(&self) -> Report;
}

#[cfg(feature = "cli")]
mod driver {
    use super::{text_wrapper, Report, Reportable, TextWrapper};
    use crate::opts;
    use structopt::{
        clap::{self, AppSettings},
        StructOpt,
    };

    pub static SETTINGS: &[AppSettings] = &[
        AppSettings::ColoredHelp,
        AppSettings::DeriveDisplayOrder,
        AppSettings::UnifiedHelpMessage,
    ];

    #[derive(Clone, Copy, Debug, StructOpt)]
    pub struct GlobalFlags {
        #[structopt(
            short = "v",
            long = "verbose",
            help = "Make life louder",
            global = true,
            multiple = true,
            parse(from_occurrences = opts::NoiseLevel::from_occurrences),
        )]
        pub noise_level: opts::NoiseLevel,
    }

    #[derive(Clone, Debug, StructOpt)]
    pub struct BuildTimeout {
        #[structopt(
            long = "build_timeout",
            alias = "build-timeout",
            value_name = "SECONDS",
            help = "Timeout for each `xcodebuild` invocation",
            parse(try_from_str = parse_timeout)
        )]
        pub build_timeout: Option<u64>,
    }

    fn parse_timeout(s: &str) -> Result<u64, String> {
        match s.parse::<u64>() {
            Ok(0) => Err("timeout must be at least 1 second".to_owned()),
            Ok(secs) => Ok(secs),
            Err(err) => Err(err.to_string()),
        }
    }

    impl BuildTimeout {
        pub fn duration(&self) -> Option<std::time::Duration> {
            self.build_timeout.map(std::time::Duration::from_secs)
        }
    }

    pub trait Exec: std::fmt::Debug + StructOpt {
        type Report: Reportable;

        fn global_flags(&self) -> GlobalFlags;

        fn exec(self, wrapper: &TextWrapper) -> Result<(), Self::Report>;
    }

    fn init_logging(noise_level: opts::NoiseLevel) {
        use env_logger::{Builder, Env};
        let default_level = match noise_level {
            opts::NoiseLevel::Polite => "warn",
            opts::NoiseLevel::LoudAndProud => "cocoapods_size=info",
            opts::NoiseLevel::FranklyQuitePedantic => "info,cocoapods_size=debug",
        };
        let env = Env::default().default_filter_or(default_level);
        Builder::from_env(env).init();
    }

    #[derive(Debug)]
    enum Exit {
        Report(Report),
        Clap(clap::Error),
    }

    impl Exit {
        fn report(reportable: impl Reportable) -> Self {
            log::info!("exiting with {:#?}", reportable);
            Self::Report(reportable.report())
        }

        fn do_the_thing(self, wrapper: TextWrapper) -> ! {
            match self {
                Self::Report(report) => {
                    report.print(&wrapper);
                    // We only expose access to the 8 lsb of the exit code, since:
                    // https://doc.rust-lang.org/std/process/fn.exit.html#platform-specific-behavior
                    std::process::exit(report.label().exit_code() as i32)
                }
                Self::Clap(err) => err.exit(),
            }
        }

        fn main(inner: impl FnOnce(&TextWrapper) -> Result<(), Self>) {
            let wrapper = text_wrapper();
            if let Err(exit) = inner(&wrapper) {
                exit.do_the_thing(wrapper)
            }
        }
    }

    pub fn exec<E: Exec>() {
        Exit::main(|wrapper| {
            let input = E::from_iter_safe(std::env::args()).map_err(Exit::Clap)?;
            init_logging(input.global_flags().noise_level);
            input.exec(wrapper).map_err(Exit::report)
        })
    }
}

#[cfg(feature = "cli")]
pub use self::driver::*;
