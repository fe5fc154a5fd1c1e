use crate::{
    env::{Env, ExplicitEnv as _},
    util::{self, RunAndSearchError},
    DuctExpressionExt as _,
};
use once_cell_regex::{exports::regex::Regex, regex};

fn version_re() -> &'static Regex {
    regex!(r"Swift version (?P<major>\d+)\.(?P<minor>\d+)")
}

/// Maps toolchain output such as `Apple Swift version 5.9.2 (swiftlang-...)`
/// to the language mode Xcode accepts for `SWIFT_VERSION`. Xcode only knows
/// `4.0`, `4.2`, and `<major>.0` from 5 onward.
pub fn language_version(output: &str) -> Option<String> {
    version_re().captures(output).map(|caps| {
        let major = &caps["major"];
        let minor = &caps["minor"];
        if major == "4" && minor != "0" {
            "4.2".to_owned()
        } else {
            format!("{}.0", major)
        }
    })
}

/// The installed toolchain's language version, or `None` if `xcrun` couldn't
/// tell us; archiving then uses whatever the project specifies.
pub fn detect(env: &Env) -> Option<String> {
    let result = util::run_and_search(
        &mut duct::cmd("xcrun", ["swift", "-version"])
            .vars(env.explicit_env())
            .stderr_to_stdout()
            .stdout_capture(),
        version_re(),
        |output, _caps| language_version(output),
    );
    match result {
        Ok(version) => {
            log::info!("detected Swift language version {:?}", version);
            version
        }
        Err(RunAndSearchError::CommandFailed(err)) => {
            log::warn!("failed to run `xcrun swift -version`: {}", err);
            None
        }
        Err(err) => {
            log::warn!("{}", err);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(
        output,
        expected,
        case("Apple Swift version 3.0 (swiftlang-800.0.46.2 clang-800.0.38)", Some("3.0")),
        case("Apple Swift version 4.1.2 (swiftlang-902.0.54 clang-902.0.39.2)", Some("4.2")),
        case(
            "swift-driver version: 1.87.3 Apple Swift version 5.9.2 (swiftlang-5.9.2.2.56 clang-1500.1.0.2.5)\nTarget: arm64-apple-macosx14.0",
            Some("5.0")
        ),
        case("xcrun: error: unable to find utility \"swift\"", None)
    )]
    fn test_language_version(output: &str, expected: Option<&str>) {
        assert_eq!(language_version(output).as_deref(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_runs_on_env_path() {
        let tools = crate::util::stub::StubTools::new();
        assert_eq!(detect(&tools.env()).as_deref(), Some("5.0"));
        let empty = tempfile::tempdir().unwrap();
        let env = Env::new()
            .unwrap()
            .with_path(empty.path().to_str().unwrap());
        assert_eq!(detect(&env), None);
    }
}
