//! Stand-ins for `pod`, `xcodebuild` and `xcrun`, so whole measurements can
//! run without Xcode.
//!
//! The fake `xcodebuild` archives an app of 1000 bytes, or of however many
//! bytes the project directory's `size` file says. Pod `A` adds 100, pod `B`
//! adds 200, and the two share 50 when installed together. Every archive
//! appends the pods it saw to `xcodebuild.log` and leaves its arguments in
//! `xcodebuild.args`.

use crate::env::Env;
use std::{
    fs,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

static POD: &str = r#"#!/bin/sh
case "$1" in
init)
    touch Podfile
    ;;
install)
    for project in *.xcodeproj; do
        mkdir -p "${project%.xcodeproj}.xcworkspace"
    done
    {
        echo "PODS:"
        sed -n "s/^ pod '\([^']*\)'.*/  - \1 (1.0.0)/p" Podfile
        echo
        echo "COCOAPODS: 1.14.3"
    } > Podfile.lock
    ;;
ipc)
    echo '{"target_definitions":[{"name":"Pods"}]}'
    ;;
*)
    exit 1
    ;;
esac
"#;

static XCODEBUILD: &str = r#"#!/bin/sh
pods=$(sed -n "s/^ pod '\([^']*\)'.*/\1/p" Podfile 2>/dev/null | tr '\n' ' ')
echo "${pods% }" >> "{{log_dir}}/xcodebuild.log"
echo "$@" > "{{log_dir}}/xcodebuild.args"
size=1000
if [ -f size ]; then
    size=$(cat size)
fi
case " $pods" in *" A "*) size=$((size + 100)) ;; esac
case " $pods" in *" B "*) size=$((size + 200)) ;; esac
case " $pods" in *" A "*" B "*) size=$((size - 50)) ;; esac
app=out.xcarchive/Products/Applications/SizeTest.app
mkdir -p "$app"
head -c "$size" /dev/zero > "$app/SizeTest"
"#;

static XCRUN: &str = r#"#!/bin/sh
echo "Apple Swift version 5.9.2 (swiftlang-5.9.2.2.56 clang-1500.1.0.2.5)"
"#;

#[derive(Debug)]
pub struct StubTools {
    dir: TempDir,
}

impl StubTools {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let xcodebuild = XCODEBUILD.replace("{{log_dir}}", dir.path().to_str().unwrap());
        let scripts = [("pod", POD), ("xcodebuild", xcodebuild.as_str()), ("xcrun", XCRUN)];
        for &(name, script) in scripts.iter() {
            let path = dir.path().join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { dir }
    }

    /// The real environment with the stubs first on `PATH`.
    pub fn env(&self) -> Env {
        let env = Env::new().unwrap();
        let path = std::env::join_paths(
            std::iter::once(self.dir.path().to_owned())
                .chain(std::env::split_paths(env.path())),
        )
        .unwrap();
        env.with_path(path.into_string().unwrap())
    }

    fn log_path(&self) -> PathBuf {
        self.dir.path().join("xcodebuild.log")
    }

    pub fn xcodebuild_ran(&self) -> bool {
        self.log_path().exists()
    }

    /// The pods seen by each `xcodebuild` run, in order.
    pub fn archived(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub fn last_archive_args(&self) -> String {
        fs::read_to_string(self.dir.path().join("xcodebuild.args")).unwrap()
    }
}

/// An empty `.xcodeproj` named `name` under `dir`, optionally with a `size`
/// file for the fake `xcodebuild`.
pub fn project(dir: &Path, name: &str, size: Option<u64>) -> PathBuf {
    let project = dir.join(name);
    fs::create_dir_all(&project).unwrap();
    if let Some(size) = size {
        fs::write(dir.join("size"), size.to_string()).unwrap();
    }
    project
}
