//! BI-key staging: copying `.bikey` files from mod folders into the
//! server's shared `keys` directory.

use std::fs;
use std::path::{Path, PathBuf};

pub const KEY_EXTENSION: &str = ".bikey";

/// Outcome of one staging pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Destination paths written successfully.
    pub copied: Vec<PathBuf>,
    /// Source paths that could not be copied.
    pub failed: Vec<PathBuf>,
    /// Mods that have no `keys` directory.
    pub without_keys: Vec<String>,
}

impl StagingReport {
    pub fn merge(&mut self, other: StagingReport) {
        self.copied.extend(other.copied);
        self.failed.extend(other.failed);
        self.without_keys.extend(other.without_keys);
    }
}

pub fn is_key_file(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(KEY_EXTENSION)
}

/// `<server>/keys`
pub fn server_keys_dir(server_path: &Path) -> PathBuf {
    server_path.join("keys")
}

/// Remove every file from the server key directory except `preserved`
/// (matched case-insensitively by file name). Creates the directory when it
/// does not exist yet. Returns how many files were removed.
pub fn clean_key_dir(keys_dir: &Path, preserved: &[String]) -> usize {
    tracing::info!("Cleaning keys directory {}", keys_dir.display());
    if let Err(e) = fs::create_dir_all(keys_dir) {
        tracing::error!("Failed to create {}: {}", keys_dir.display(), e);
        return 0;
    }

    let entries = match fs::read_dir(keys_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", keys_dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", keys_dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if preserved.iter().any(|keep| keep.eq_ignore_ascii_case(&name)) {
            tracing::debug!("Keeping {}", name);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::error!("Failed to delete {}: {}", path.display(), e),
        }
    }

    tracing::info!("Deleted {} files from keys directory", removed);
    removed
}

/// Copy one mod's key files into `keys_dir`. A failing copy is logged and
/// the remaining files are still attempted.
pub fn stage_mod_keys(mods_root: &Path, mod_name: &str, keys_dir: &Path) -> StagingReport {
    let mut report = StagingReport::default();
    let source_dir = mods_root.join(mod_name).join("keys");
    if !source_dir.is_dir() {
        tracing::debug!("Mod '{}' has no keys directory", mod_name);
        report.without_keys.push(mod_name.to_string());
        return report;
    }

    let entries = match fs::read_dir(&source_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", source_dir.display(), e);
            report.failed.push(source_dir);
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", source_dir.display(), e);
                continue;
            }
        };
        let file_name = entry.file_name();
        if !is_key_file(&file_name.to_string_lossy()) {
            continue;
        }
        if file_name.to_str().is_none() {
            tracing::warn!(
                "Key file name in {} is not valid UTF-8: {}",
                source_dir.display(),
                file_name.to_string_lossy()
            );
        }

        let source = entry.path();
        // 원래 OS 파일 이름 그대로 복사
        let target = keys_dir.join(&file_name);
        match fs::copy(&source, &target) {
            Ok(_) => {
                tracing::debug!("Copied {} -> {}", source.display(), target.display());
                report.copied.push(target);
            }
            Err(e) => {
                tracing::error!("Failed to copy {}: {}", source.display(), e);
                report.failed.push(source);
            }
        }
    }

    report
}

/// Stage the keys of every mod in `mods`, in order.
pub fn stage_keys(mods_root: &Path, mods: &[String], keys_dir: &Path) -> StagingReport {
    tracing::info!("Copying BI-Keys from mods to keys directory");
    let mut report = StagingReport::default();
    for mod_name in mods {
        report.merge(stage_mod_keys(mods_root, mod_name, keys_dir));
    }

    if report.failed.is_empty() {
        tracing::info!("Successfully copied {} key files to keys directory", report.copied.len());
    } else {
        tracing::warn!(
            "Copied {} key files, {} failed",
            report.copied.len(),
            report.failed.len()
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_key(mods_root: &Path, mod_name: &str, file: &str, body: &str) {
        let dir = mods_root.join(mod_name).join("keys");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn test_is_key_file() {
        assert!(is_key_file("cba_3.18.bikey"));
        assert!(is_key_file("ACE.BIKEY"));
        assert!(!is_key_file("readme.txt"));
        assert!(!is_key_file("mod.bikey.bak"));
    }

    #[test]
    fn test_stage_copies_only_key_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mods_root = tmp.path().join("mods");
        let keys_dir = tmp.path().join("server").join("keys");
        fs::create_dir_all(&keys_dir).unwrap();

        add_key(&mods_root, "@cba", "cba.bikey", "cba");
        add_key(&mods_root, "@cba", "notes.txt", "ignore");
        add_key(&mods_root, "@ace", "ace.bikey", "ace");
        fs::create_dir_all(mods_root.join("@nokeys")).unwrap();

        let mods = vec!["@cba".to_string(), "@ace".to_string(), "@nokeys".to_string()];
        let report = stage_keys(&mods_root, &mods, &keys_dir);

        assert_eq!(report.copied.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.without_keys, vec!["@nokeys"]);
        assert_eq!(fs::read_to_string(keys_dir.join("cba.bikey")).unwrap(), "cba");
        assert!(!keys_dir.join("notes.txt").exists());
    }

    #[test]
    fn test_stage_overwrites_existing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mods_root = tmp.path().join("mods");
        let keys_dir = tmp.path().join("keys");
        fs::create_dir_all(&keys_dir).unwrap();
        fs::write(keys_dir.join("cba.bikey"), "old").unwrap();
        add_key(&mods_root, "@cba", "cba.bikey", "new");

        stage_keys(&mods_root, &["@cba".to_string()], &keys_dir);
        assert_eq!(fs::read_to_string(keys_dir.join("cba.bikey")).unwrap(), "new");
    }

    #[test]
    fn test_one_failed_copy_does_not_stop_others() {
        let tmp = tempfile::tempdir().unwrap();
        let mods_root = tmp.path().join("mods");
        let keys_dir = tmp.path().join("keys");
        fs::create_dir_all(&keys_dir).unwrap();

        add_key(&mods_root, "@broken", "broken.bikey", "x");
        add_key(&mods_root, "@good", "good.bikey", "y");
        add_key(&mods_root, "@also_good", "also.bikey", "z");
        // 대상 위치에 같은 이름의 디렉토리가 있으면 복사가 실패한다
        fs::create_dir_all(keys_dir.join("broken.bikey")).unwrap();

        let mods = vec![
            "@broken".to_string(),
            "@good".to_string(),
            "@also_good".to_string(),
        ];
        let report = stage_keys(&mods_root, &mods, &keys_dir);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.copied.len(), 2);
        assert!(keys_dir.join("good.bikey").is_file());
        assert!(keys_dir.join("also.bikey").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_key_name_is_still_copied() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let mods_root = tmp.path().join("mods");
        let keys_dir = tmp.path().join("keys");
        fs::create_dir_all(&keys_dir).unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.bikey");
        let source_dir = mods_root.join("@cafe").join("keys");
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(source_dir.join(name), "k").unwrap();

        let report = stage_keys(&mods_root, &["@cafe".to_string()], &keys_dir);

        assert_eq!(report.copied, vec![keys_dir.join(name)]);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_to_string(keys_dir.join(name)).unwrap(), "k");
    }

    #[test]
    fn test_clean_preserves_base_key() {
        let tmp = tempfile::tempdir().unwrap();
        let keys_dir = tmp.path().join("keys");
        fs::create_dir_all(keys_dir.join("subdir")).unwrap();
        fs::write(keys_dir.join("a3.bikey"), "base").unwrap();
        fs::write(keys_dir.join("stale.bikey"), "old").unwrap();
        fs::write(keys_dir.join("other.txt"), "old").unwrap();

        let removed = clean_key_dir(&keys_dir, &["A3.bikey".to_string()]);

        assert_eq!(removed, 2);
        assert_eq!(fs::read_to_string(keys_dir.join("a3.bikey")).unwrap(), "base");
        assert!(!keys_dir.join("stale.bikey").exists());
        assert!(keys_dir.join("subdir").is_dir());
    }

    #[test]
    fn test_clean_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let keys_dir = server_keys_dir(&tmp.path().join("server"));
        assert_eq!(clean_key_dir(&keys_dir, &[]), 0);
        assert!(keys_dir.is_dir());
    }
}
