pub mod keys;

use std::fs;
use std::path::Path;

pub use keys::{StagingReport, KEY_EXTENSION};

use crate::utils::strip_bom;

/// Which manifest is being read; only affects log wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestRole {
    /// Mods put on the `-mod=` argument.
    Load,
    /// Mods whose keys are staged but which are not loaded by the server.
    Allowed,
}

impl ManifestRole {
    fn label(&self) -> &'static str {
        match self {
            ManifestRole::Load => "Mod List",
            ManifestRole::Allowed => "Allowed Mod List",
        }
    }
}

/// Ordered mod folder names from a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModManifest {
    pub mods: Vec<String>,
}

impl ModManifest {
    /// One mod folder name per line. Blank lines are dropped, file order is kept.
    pub fn parse(content: &str) -> Self {
        let mods = strip_bom(content)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self { mods }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> std::io::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(Self::parse(&content)))
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }
}

/// Result of reading the load manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedMods {
    /// Whether the manifest file existed.
    pub present: bool,
    pub mods: Vec<String>,
    pub staging: StagingReport,
}

impl LoadedMods {
    pub fn use_mods(&self) -> bool {
        self.present && !self.mods.is_empty()
    }
}

fn read_manifest(manifest_path: &Path, role: ManifestRole) -> Option<ModManifest> {
    tracing::info!("Reading {}...", role.label());
    match ModManifest::read(manifest_path) {
        Ok(Some(manifest)) => {
            tracing::info!("{} read successfully. Loaded mods: {}", role.label(), manifest.len());
            Some(manifest)
        }
        Ok(None) => {
            tracing::warn!(
                "{} could not be found... Missing file: {}",
                role.label(),
                manifest_path.display()
            );
            match role {
                ManifestRole::Load => tracing::warn!("Proceeding without mods..."),
                ManifestRole::Allowed => tracing::warn!("Proceeding without additional allowed mods..."),
            }
            None
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {}", manifest_path.display(), e);
            None
        }
    }
}

/// Read the load manifest and stage the keys of every listed mod.
///
/// A missing (or unreadable) manifest is not an error: the result reports
/// `present = false` and the server starts without mods.
pub fn load_mods(server_path: &Path, mods_root: &Path, manifest_path: &Path) -> LoadedMods {
    let Some(manifest) = read_manifest(manifest_path, ManifestRole::Load) else {
        return LoadedMods::default();
    };

    let keys_dir = keys::server_keys_dir(server_path);
    let staging = keys::stage_keys(mods_root, &manifest.mods, &keys_dir);
    LoadedMods {
        present: true,
        mods: manifest.mods,
        staging,
    }
}

/// Stage keys for the allowed-mods manifest. Returns `None` when the manifest
/// is absent. These mods never reach the launch command.
pub fn load_allowed_mods(
    server_path: &Path,
    mods_root: &Path,
    manifest_path: &Path,
) -> Option<StagingReport> {
    let manifest = read_manifest(manifest_path, ManifestRole::Allowed)?;
    let keys_dir = keys::server_keys_dir(server_path);
    Some(keys::stage_keys(mods_root, &manifest.mods, &keys_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_drops_blanks() {
        let manifest = ModManifest::parse("@mod1\r\n\r\n  @mod2  \n@mod3\n\n");
        assert_eq!(manifest.mods, vec!["@mod1", "@mod2", "@mod3"]);
    }

    #[test]
    fn test_parse_ignores_byte_order_mark() {
        let manifest = ModManifest::parse("\u{feff}@cba\r\n@ace\r\n");
        assert_eq!(manifest.mods, vec!["@cba", "@ace"]);
    }

    #[test]
    fn test_bom_manifest_stages_first_mod() {
        let tmp = tempfile::tempdir().unwrap();
        let server = tmp.path().join("server");
        let mods_root = tmp.path().join("mods");
        fs::create_dir_all(server.join("keys")).unwrap();
        fs::create_dir_all(mods_root.join("@cba").join("keys")).unwrap();
        fs::write(mods_root.join("@cba").join("keys").join("cba.bikey"), "k").unwrap();
        let manifest = tmp.path().join("modlist.txt");
        fs::write(&manifest, "\u{feff}@cba\r\n").unwrap();

        let loaded = load_mods(&server, &mods_root, &manifest);
        assert_eq!(loaded.mods, vec!["@cba"]);
        assert!(loaded.staging.without_keys.is_empty());
        assert!(server.join("keys").join("cba.bikey").is_file());
    }

    #[test]
    fn test_missing_manifest_means_no_mods() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = load_mods(tmp.path(), tmp.path(), &tmp.path().join("modlist.txt"));
        assert!(!loaded.present);
        assert!(loaded.mods.is_empty());
        assert!(!loaded.use_mods());
    }

    #[test]
    fn test_empty_manifest_is_present_but_unused() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("modlist.txt");
        fs::write(&manifest, "\n\n").unwrap();

        let loaded = load_mods(tmp.path(), tmp.path(), &manifest);
        assert!(loaded.present);
        assert!(!loaded.use_mods());
    }

    #[test]
    fn test_load_stages_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let server = tmp.path().join("server");
        let mods_root = tmp.path().join("mods");
        fs::create_dir_all(server.join("keys")).unwrap();
        fs::create_dir_all(mods_root.join("@cba").join("keys")).unwrap();
        fs::write(mods_root.join("@cba").join("keys").join("cba.bikey"), "k").unwrap();
        let manifest = tmp.path().join("modlist.txt");
        fs::write(&manifest, "@cba\n@missing\n").unwrap();

        let loaded = load_mods(&server, &mods_root, &manifest);
        assert!(loaded.use_mods());
        assert_eq!(loaded.mods, vec!["@cba", "@missing"]);
        assert_eq!(loaded.staging.copied.len(), 1);
        assert_eq!(loaded.staging.without_keys, vec!["@missing"]);
        assert!(server.join("keys").join("cba.bikey").is_file());
    }

    #[test]
    fn test_allowed_mods() {
        let tmp = tempfile::tempdir().unwrap();
        let server = tmp.path().join("server");
        let mods_root = tmp.path().join("mods");
        fs::create_dir_all(server.join("keys")).unwrap();
        fs::create_dir_all(mods_root.join("@jsrs").join("keys")).unwrap();
        fs::write(mods_root.join("@jsrs").join("keys").join("jsrs.bikey"), "k").unwrap();

        let manifest = tmp.path().join("allowedmodlist.txt");
        assert!(load_allowed_mods(&server, &mods_root, &manifest).is_none());

        fs::write(&manifest, "@jsrs\n").unwrap();
        let report = load_allowed_mods(&server, &mods_root, &manifest).unwrap();
        assert_eq!(report.copied.len(), 1);
        assert!(server.join("keys").join("jsrs.bikey").is_file());
    }
}
