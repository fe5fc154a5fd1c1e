use crate::util::cli::{Report, Reportable};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;

static PRODUCTS_DIR: &str = "Products/Applications";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Archive {archive:?} has no `Products/Applications` directory")]
    MissingProducts { archive: PathBuf },
    #[error("Archive {archive:?} contains no files under `Products/Applications`")]
    NoBinary { archive: PathBuf },
    #[error("Failed to walk {dir:?}: {source}")]
    WalkFailed { dir: PathBuf, source: ignore::Error },
}

impl Reportable for ArtifactError {
    fn report(&self) -> Report {
        match self {
            Self::MissingProducts { .. } | Self::NoBinary { .. } => Report::action_request(
                "`xcodebuild` reported success but produced no app; check that the scheme builds an application",
                self,
            ),
            Self::WalkFailed { .. } => Report::error("Failed to measure archive", self),
        }
    }
}

/// Total size in bytes of the app bundle(s) inside an `.xcarchive`.
pub fn binary_size(archive: impl AsRef<Path>) -> Result<u64, ArtifactError> {
    let archive = archive.as_ref();
    let products = archive.join(PRODUCTS_DIR);
    if !products.is_dir() {
        return Err(ArtifactError::MissingProducts {
            archive: archive.to_owned(),
        });
    }
    let mut files = 0usize;
    let mut size = 0u64;
    for entry in WalkBuilder::new(&products)
        .standard_filters(false)
        .follow_links(false)
        .build()
    {
        let entry = entry.map_err(|source| ArtifactError::WalkFailed {
            dir: products.clone(),
            source,
        })?;
        if !entry.file_type().map_or(false, |ty| ty.is_file()) {
            continue;
        }
        let len = entry
            .metadata()
            .map_err(|source| ArtifactError::WalkFailed {
                dir: products.clone(),
                source,
            })?
            .len();
        log::debug!("{:?}: {} bytes", entry.path(), len);
        files += 1;
        size += len;
    }
    if files == 0 {
        return Err(ArtifactError::NoBinary {
            archive: archive.to_owned(),
        });
    }
    log::info!("{:?} holds {} bytes across {} files", archive, size, files);
    Ok(size)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write_file(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[test]
    fn test_binary_size_sums_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("out.xcarchive");
        let app = archive.join("Products/Applications/SizeTest.app");
        write_file(&app.join("SizeTest"), 1000);
        write_file(&app.join("Info.plist"), 24);
        write_file(&app.join(".hidden"), 6);
        write_file(&app.join("Frameworks/AFNetworking.framework/AFNetworking"), 300);
        // dSYMs live outside `Products` and don't count.
        write_file(&archive.join("dSYMs/SizeTest.app.dSYM/Contents/Info.plist"), 5000);
        assert_eq!(binary_size(&archive).unwrap(), 1330);
    }

    #[test]
    fn test_binary_size_ignores_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("out.xcarchive");
        let app = archive.join("Products/Applications/SizeTest.app");
        write_file(&app.join("SizeTest"), 10);
        fs::write(archive.join(".gitignore"), "*\n").unwrap();
        assert_eq!(binary_size(&archive).unwrap(), 10);
    }

    #[test]
    fn test_binary_size_missing_products() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            binary_size(dir.path()).unwrap_err(),
            ArtifactError::MissingProducts { .. }
        ));
    }

    #[test]
    fn test_binary_size_empty_products() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Products/Applications/SizeTest.app")).unwrap();
        assert!(matches!(
            binary_size(dir.path()).unwrap_err(),
            ArtifactError::NoBinary { .. }
        ));
    }
}
