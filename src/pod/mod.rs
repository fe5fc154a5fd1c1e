pub mod install;
pub mod podfile;
pub mod source;

use self::source::PodSource;
use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

pub static DEFAULT_SPEC_REPO: &str = "https://cdn.cocoapods.org/";

static SPEC_REPO_ALIASES: &[(&str, &str)] = &[
    ("master", DEFAULT_SPEC_REPO),
    ("trunk", DEFAULT_SPEC_REPO),
    ("cdn", DEFAULT_SPEC_REPO),
];

/// Expands spec repo aliases, falling back to the CocoaPods CDN when nothing
/// was given.
pub fn resolve_spec_repos(repos: &[String]) -> Vec<String> {
    if repos.is_empty() {
        return vec![DEFAULT_SPEC_REPO.to_owned()];
    }
    repos
        .iter()
        .map(|repo| {
            SPEC_REPO_ALIASES
                .iter()
                .find(|(alias, _)| alias == repo)
                .map(|(alias, url)| {
                    log::debug!("expanded spec repo alias {:?} to {:?}", alias, url);
                    (*url).to_owned()
                })
                .unwrap_or_else(|| repo.clone())
        })
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PodVersion {
    Latest,
    Pinned(String),
}

impl PodVersion {
    pub fn pinned(&self) -> Option<&str> {
        match self {
            Self::Latest => None,
            Self::Pinned(version) => Some(version),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PodRefError {
    #[error("Pod name is empty in {input:?}; expected `NAME[:VERSION]`")]
    NameEmpty { input: String },
    #[error("Pod name {name:?} contains whitespace or quotes")]
    NameInvalid { name: String },
}

/// A pod as requested on the command line. Two refs with the same name are the
/// same pod, whatever their version or source.
#[derive(Clone, Debug)]
pub struct PodRef {
    name: String,
    version: PodVersion,
    source: Option<PodSource>,
}

impl PartialEq for PodRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PodRef {}

impl Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            PodVersion::Latest => write!(f, "{}", self.name),
            PodVersion::Pinned(version) => write!(f, "{}:{}", self.name, version),
        }
    }
}

impl FromStr for PodRef {
    type Err = PodRefError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut split = input.splitn(2, ':');
        let name = split.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(PodRefError::NameEmpty {
                input: input.to_owned(),
            });
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '"')
        {
            return Err(PodRefError::NameInvalid {
                name: name.to_owned(),
            });
        }
        let version = match split.next().map(str::trim) {
            Some(version) if !version.is_empty() => PodVersion::Pinned(version.to_owned()),
            _ => PodVersion::Latest,
        };
        Ok(Self {
            name: name.to_owned(),
            version,
            source: None,
        })
    }
}

impl PodRef {
    pub fn new(name: impl Into<String>, version: PodVersion) -> Self {
        Self {
            name: name.into(),
            version,
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &PodVersion {
        &self.version
    }

    pub fn source(&self) -> Option<&PodSource> {
        self.source.as_ref()
    }

    pub fn with_source(mut self, source: Option<PodSource>) -> Self {
        self.source = source;
        self
    }

    /// The arguments following `pod` in a Podfile, e.g.
    /// `'Alamofire', :git => 'https://...', :branch => 'dev'`.
    pub fn podfile_args(&self) -> String {
        let mut args = vec![ruby_str(&self.name)];
        match (&self.version, &self.source) {
            (PodVersion::Pinned(version), _) => args.push(ruby_str(version)),
            (PodVersion::Latest, Some(source)) => {
                args.extend(
                    source
                        .podfile_options()
                        .into_iter()
                        .map(|(key, value)| format!(":{} => {}", key, ruby_str(&value))),
                );
            }
            (PodVersion::Latest, None) => (),
        }
        args.join(", ")
    }
}

pub(crate) fn ruby_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod test {
    use super::{source::GitRef, *};
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest(
        input,
        name,
        version,
        case("AFNetworking", "AFNetworking", PodVersion::Latest),
        case("AFNetworking:", "AFNetworking", PodVersion::Latest),
        case(" AFNetworking : 4.0.1 ", "AFNetworking", PodVersion::Pinned("4.0.1".to_owned())),
        case("Firebase/Core:~> 10.0", "Firebase/Core", PodVersion::Pinned("~> 10.0".to_owned()))
    )]
    fn test_pod_ref_from_str(input: &str, name: &str, version: PodVersion) {
        let pod = input.parse::<PodRef>().unwrap();
        assert_eq!(pod.name(), name);
        assert_eq!(pod.version(), &version);
        assert_eq!(pod.source(), None);
    }

    #[rstest(input, error,
        case("", PodRefError::NameEmpty { input: "".to_owned() }),
        case(":4.0.1", PodRefError::NameEmpty { input: ":4.0.1".to_owned() }),
        case("AF Networking", PodRefError::NameInvalid { name: "AF Networking".to_owned() })
    )]
    fn test_pod_ref_from_str_error(input: &str, error: PodRefError) {
        assert_eq!(input.parse::<PodRef>().unwrap_err(), error);
    }

    #[test]
    fn test_pod_ref_identity_is_name() {
        let latest = PodRef::new("AFNetworking", PodVersion::Latest);
        let pinned = PodRef::new("AFNetworking", PodVersion::Pinned("4.0.1".to_owned()));
        assert_eq!(latest, pinned);
        assert_ne!(latest, PodRef::new("SDWebImage", PodVersion::Latest));
    }

    #[test]
    fn test_podfile_args_latest() {
        assert_eq!(
            PodRef::new("AFNetworking", PodVersion::Latest).podfile_args(),
            "'AFNetworking'"
        );
    }

    #[test]
    fn test_podfile_args_pinned_ignores_source() {
        let pod = PodRef::new("AFNetworking", PodVersion::Pinned("4.0.1".to_owned()))
            .with_source(Some(PodSource::Path(PathBuf::from("/tmp/AFNetworking"))));
        assert_eq!(pod.podfile_args(), "'AFNetworking', '4.0.1'");
    }

    #[test]
    fn test_podfile_args_git_source() {
        let pod = PodRef::new("Alamofire", PodVersion::Latest).with_source(Some(PodSource::Git {
            url: "https://github.com/Alamofire/Alamofire.git".to_owned(),
            reference: Some(GitRef::Branch("dev".to_owned())),
        }));
        assert_eq!(
            pod.podfile_args(),
            "'Alamofire', :git => 'https://github.com/Alamofire/Alamofire.git', :branch => 'dev'"
        );
    }

    #[test]
    fn test_resolve_spec_repos() {
        assert_eq!(resolve_spec_repos(&[]), vec![DEFAULT_SPEC_REPO.to_owned()]);
        assert_eq!(
            resolve_spec_repos(&[
                "master".to_owned(),
                "https://github.com/example/Specs.git".to_owned()
            ]),
            vec![
                DEFAULT_SPEC_REPO.to_owned(),
                "https://github.com/example/Specs.git".to_owned()
            ]
        );
    }
}
