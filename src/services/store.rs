//! File system writes below the upload root.
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::StoragePath;
use crate::services::{ServiceError, ServiceResult};

/// Entries listed as files by resource scanners although they are bundle directories.
pub const IGNORED_DIRECTORY_SUFFIXES: [&str; 8] = [
    ".xcassets",
    ".colorset",
    ".appiconset",
    ".xcworkspace",
    ".xcodeproj",
    ".swiftpm",
    ".tests",
    ".mvn",
];

/// Copied files with exactly this name are marked executable.
pub const EXECUTABLE_FILE_NAMES: [&str; 1] = ["gradlew"];

/// Stateless writer for stored files.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    /// Create `path` and its parents. Succeeds if they already exist.
    pub fn create_directories(&self, path: &Path) -> ServiceResult<()> {
        fs::create_dir_all(path).map_err(|err| {
            log::error!("Failed to create directory {}: {err}", path.display());
            ServiceError::CreateDirectories(err)
        })
    }

    /// Write `source` to `path`, replacing an existing file.
    ///
    /// Bytes go to a temporary file in the target directory first, which is then
    /// renamed onto `path`, so readers never observe a partial file.
    pub fn save(&self, source: &mut impl Read, path: &StoragePath) -> ServiceResult<StoragePath> {
        self.save_within(source, path, u64::MAX)
    }

    /// Like [`FileStore::save`], but fails with `PayloadTooLarge` once more than
    /// `limit` bytes arrive. Nothing is written to `path` in that case.
    pub fn save_within(
        &self,
        source: &mut impl Read,
        path: &StoragePath,
        limit: u64,
    ) -> ServiceResult<StoragePath> {
        let target = path.as_path();
        let parent = target.parent().unwrap_or(Path::new("."));
        self.create_directories(parent)?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|err| save_failed(target, err))?;
        let mut bounded = source.take(limit.saturating_add(1));
        let received = io::copy(&mut bounded, temp.as_file_mut())
            .map_err(|err| save_failed(target, err))?;
        if received > limit {
            log::warn!(
                "Rejected upload for {}: more than {limit} bytes received",
                target.display()
            );
            return Err(ServiceError::PayloadTooLarge {
                size: received,
                limit,
            });
        }
        temp.persist(target).map_err(|err| save_failed(target, err.error))?;

        log::debug!("Saved file {}", target.display());
        Ok(path.clone())
    }

    /// Copy an existing file to `target`, creating parent directories.
    pub fn copy_file(&self, source: &Path, target: &StoragePath) -> ServiceResult<StoragePath> {
        let mut reader = fs::File::open(source).map_err(|err| copy_failed(source, err))?;
        self.write_copy(&mut reader, source, target.as_path())?;
        log::debug!("Copied file {} to {}", source.display(), target.as_path().display());
        Ok(target.clone())
    }

    /// Copy template resources into `target_directory`.
    ///
    /// With `keep_parent_dirs` everything after `prefix` in a source path is
    /// recreated below the target; otherwise only the file name is kept.
    /// Stops at the first failing resource.
    pub fn copy_template_tree(
        &self,
        resources: &[PathBuf],
        prefix: &Path,
        target_directory: &Path,
        keep_parent_dirs: bool,
    ) -> ServiceResult<()> {
        for resource in resources {
            let target = template_target_path(resource, prefix, target_directory, keep_parent_dirs);
            if is_ignored_directory(&target) {
                log::debug!("Skipping bundle directory {}", resource.display());
                continue;
            }

            let mut reader = fs::File::open(resource).map_err(|err| copy_failed(resource, err))?;
            self.write_copy(&mut reader, resource, &target)?;

            if is_executable_name(&target) {
                mark_executable(&target).map_err(|err| copy_failed(resource, err))?;
            }
        }
        Ok(())
    }

    /// Remove every path, logging failures instead of returning them.
    pub fn delete_files(&self, paths: &[StoragePath]) {
        for path in paths {
            if let Err(err) = fs::remove_file(path.as_path()) {
                log::warn!("Could not delete file {}: {err}", path.as_path().display());
            }
        }
    }

    fn write_copy(
        &self,
        reader: &mut impl Read,
        source: &Path,
        target: &Path,
    ) -> ServiceResult<()> {
        if let Some(parent) = target.parent() {
            self.create_directories(parent)?;
        }
        let mut writer = fs::File::create(target).map_err(|err| copy_failed(source, err))?;
        io::copy(reader, &mut writer).map_err(|err| copy_failed(source, err))?;
        Ok(())
    }
}

/// Target path of a template resource.
///
/// When `prefix` does not occur in `source`, the source's own normal components
/// are recreated below the target directory.
pub fn template_target_path(
    source: &Path,
    prefix: &Path,
    target_directory: &Path,
    keep_parent_dirs: bool,
) -> PathBuf {
    if !keep_parent_dirs {
        return match source.file_name() {
            Some(name) => target_directory.join(name),
            None => target_directory.to_path_buf(),
        };
    }

    let source_elements = normal_components(source);
    let prefix_elements = normal_components(prefix);

    let relative = match find_sublist(&source_elements, &prefix_elements) {
        Some(start) => &source_elements[start + prefix_elements.len()..],
        None => &source_elements[..],
    };

    relative
        .iter()
        .fold(target_directory.to_path_buf(), |path, element| path.join(element))
}

fn normal_components(path: &Path) -> Vec<&std::ffi::OsStr> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(element) => Some(element),
            _ => None,
        })
        .collect()
}

fn find_sublist<T: PartialEq>(haystack: &[T], needle: &[T]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_ignored_directory(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    IGNORED_DIRECTORY_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

fn is_executable_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| EXECUTABLE_FILE_NAMES.contains(&name))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn save_failed(path: &Path, err: io::Error) -> ServiceError {
    log::error!("Could not save file {}: {err}", path.display());
    ServiceError::SaveFile(err)
}

fn copy_failed(path: &Path, err: io::Error) -> ServiceError {
    log::error!("Could not copy {}: {err}", path.display());
    ServiceError::CopyFile(err)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn save_creates_parents_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = StoragePath::new(dir.path().join("attachments/lecture/4/a.pdf"));
        let store = FileStore::new();

        store.save(&mut Cursor::new(b"first".to_vec()), &path).unwrap();
        store.save(&mut Cursor::new(b"second".to_vec()), &path).unwrap();

        assert_eq!(fs::read_to_string(path.as_path()).unwrap(), "second");
        let leftovers = fs::read_dir(dir.path().join("attachments/lecture/4"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn save_within_rejects_oversized_stream() {
        let dir = tempdir().unwrap();
        let path = StoragePath::new(dir.path().join("temp/a.pdf"));
        let mut body = Cursor::new(vec![b'x'; 10_000]);

        let err = FileStore::new()
            .save_within(&mut body, &path, 64)
            .unwrap_err();

        assert!(matches!(err, ServiceError::PayloadTooLarge { size: 65, .. }));
        assert!(!path.as_path().exists());
        assert_eq!(fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
    }

    #[test]
    fn save_within_accepts_stream_at_limit() {
        let dir = tempdir().unwrap();
        let path = StoragePath::new(dir.path().join("temp/a.pdf"));
        FileStore::new()
            .save_within(&mut Cursor::new(vec![b'x'; 64]), &path, 64)
            .unwrap();
        assert_eq!(fs::metadata(path.as_path()).unwrap().len(), 64);
    }

    #[test]
    fn concurrent_saves_into_one_directory_all_land() {
        let dir = tempdir().unwrap();
        let store = FileStore::new();
        let target_dir = dir.path().join("attachments/lecture/4");

        std::thread::scope(|scope| {
            for n in 0..16 {
                let target_dir = &target_dir;
                scope.spawn(move || {
                    let path = StoragePath::new(target_dir.join(format!("file-{n}.pdf")));
                    let mut body = Cursor::new(format!("body {n}").into_bytes());
                    store.save(&mut body, &path).unwrap();
                });
            }
        });

        for n in 0..16 {
            let content = fs::read_to_string(target_dir.join(format!("file-{n}.pdf"))).unwrap();
            assert_eq!(content, format!("body {n}"));
        }
        assert_eq!(fs::read_dir(&target_dir).unwrap().count(), 16);
    }

    #[test]
    fn concurrent_create_directories_on_same_tree_succeed() {
        let dir = tempdir().unwrap();
        let store = FileStore::new();
        let nested = dir.path().join("file-upload-exercises/5/submissions/9");
        let target = nested.as_path();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(move || store.create_directories(target)))
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }
        });

        assert!(nested.is_dir());
    }

    #[test]
    fn create_directories_is_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let store = FileStore::new();
        store.create_directories(&nested).unwrap();
        store.create_directories(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn create_directories_reports_blocking_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("blocker"), b"x").unwrap();
        let err = FileStore::new()
            .create_directories(&dir.path().join("blocker/child"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::CreateDirectories(_)));
    }

    #[test]
    fn target_path_strips_prefix() {
        let target = template_target_path(
            Path::new("/opt/app/templates/java/gradle/wrapper.jar"),
            Path::new("templates/java"),
            Path::new("/work/repo"),
            true,
        );
        assert_eq!(target, PathBuf::from("/work/repo/gradle/wrapper.jar"));
    }

    #[test]
    fn target_path_without_parents_keeps_file_name() {
        let target = template_target_path(
            Path::new("/opt/app/templates/java/gradle/wrapper.jar"),
            Path::new("templates/java"),
            Path::new("/work/repo"),
            false,
        );
        assert_eq!(target, PathBuf::from("/work/repo/wrapper.jar"));
    }

    #[test]
    fn target_path_without_prefix_match_stays_below_target() {
        let target = template_target_path(
            Path::new("/opt/other/file.txt"),
            Path::new("templates/java"),
            Path::new("/work/repo"),
            true,
        );
        assert_eq!(target, PathBuf::from("/work/repo/opt/other/file.txt"));
    }

    #[test]
    fn copy_template_tree_skips_bundles_and_marks_launcher() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        let base = source.path().join("templates/java");
        fs::create_dir_all(base.join("gradle")).unwrap();
        fs::write(base.join("gradlew"), b"#!/bin/sh\n").unwrap();
        fs::write(base.join("gradle/wrapper.properties"), b"dist=1").unwrap();
        fs::create_dir_all(base.join("App.xcassets")).unwrap();

        let resources = vec![
            base.join("gradlew"),
            base.join("gradle/wrapper.properties"),
            base.join("App.xcassets"),
        ];
        FileStore::new()
            .copy_template_tree(&resources, Path::new("templates/java"), target.path(), true)
            .unwrap();

        assert!(target.path().join("gradle/wrapper.properties").is_file());
        assert!(!target.path().join("App.xcassets").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(target.path().join("gradlew"))
                .unwrap()
                .permissions()
                .mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[test]
    fn copy_template_tree_fails_fast() {
        let target = tempdir().unwrap();
        let resources = vec![PathBuf::from("/definitely/missing/file.txt")];
        let err = FileStore::new()
            .copy_template_tree(&resources, Path::new("missing"), target.path(), true)
            .unwrap_err();
        assert!(matches!(err, ServiceError::CopyFile(_)));
    }

    #[test]
    fn delete_files_ignores_missing() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("a.txt");
        fs::write(&present, b"x").unwrap();
        FileStore::new().delete_files(&[
            StoragePath::new(present.clone()),
            StoragePath::new(dir.path().join("missing.txt")),
        ]);
        assert!(!present.exists());
    }
}
