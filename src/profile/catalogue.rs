//! Deterministic enumeration of bundled `resources/<manufacturer>/<id>.yaml`
//! profiles (spec §4.1/§6). No asset-embedding crate is used — the teacher
//! never embeds resources at compile time, it reads them off disk with
//! `std::fs::read_to_string` (`config.rs::Config::new`), and this catalogue
//! follows the same idiom, scanning a root directory at runtime.

use std::path::{Path, PathBuf};

use crate::prelude::*;
use crate::profile::loader;
use crate::profile::model::InverterDefinition;

/// One bundled profile's location, as `resources/<manufacturer>/<id>.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProfileHandle {
    pub manufacturer: String,
    pub id: String,
    path: PathBuf,
}

/// Scans `root` for `<manufacturer>/<id>.yaml` files and exposes them in a
/// deterministic (sorted) order.
pub struct ProfileCatalogue {
    root: PathBuf,
}

impl ProfileCatalogue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic enumeration of bundled profile identifiers (spec
    /// §4.1's closing sentence).
    pub fn list(&self) -> Result<Vec<ProfileHandle>> {
        let mut handles = Vec::new();

        let manufacturer_dirs = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(handles),
            Err(err) => {
                return Err(file_error_with_source!(err, "reading resource catalogue {:?}", self.root))
            }
        };

        for entry in manufacturer_dirs {
            let entry = entry.map_err(|err| file_error_with_source!(err, "reading catalogue entry"))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let manufacturer = entry.file_name().to_string_lossy().to_string();

            for file in std::fs::read_dir(entry.path())
                .map_err(|err| file_error_with_source!(err, "reading manufacturer directory"))?
            {
                let file = file.map_err(|err| file_error_with_source!(err, "reading profile entry"))?;
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                let id = match path.file_stem().and_then(|s| s.to_str()) {
                    Some(id) => id.to_string(),
                    None => continue,
                };
                handles.push(ProfileHandle { manufacturer: manufacturer.clone(), id, path });
            }
        }

        handles.sort();
        Ok(handles)
    }

    /// Load a bundled profile by manufacturer and id.
    pub fn load(&self, manufacturer: &str, id: &str) -> Result<InverterDefinition> {
        let path = self.root.join(manufacturer).join(format!("{id}.yaml"));
        self.load_path(&path, id)
    }

    fn load_path(&self, path: &Path, id: &str) -> Result<InverterDefinition> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| file_error_with_source!(err, "reading profile {:?}", path))?;
        loader::load(id, &content).map_err(|err| anyhow!(err))
    }
}

impl ProfileHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_profile(dir: &Path, manufacturer: &str, id: &str) {
        let mfr_dir = dir.join(manufacturer);
        fs::create_dir_all(&mfr_dir).unwrap();
        fs::write(
            mfr_dir.join(format!("{id}.yaml")),
            "info:\n  manufacturer: X\n  model: Y\nparameters: []\n",
        )
        .unwrap();
    }

    #[test]
    fn enumerates_bundled_profiles_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), "deye", "deye_hybrid_generic");
        write_profile(dir.path(), "deye", "deye_p3");
        write_profile(dir.path(), "growatt", "growatt_sph");

        let catalogue = ProfileCatalogue::new(dir.path());
        let handles = catalogue.list().unwrap();
        let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["deye_hybrid_generic", "deye_p3", "growatt_sph"]);
    }

    #[test]
    fn missing_root_yields_empty_catalogue() {
        let catalogue = ProfileCatalogue::new("/nonexistent/does/not/exist");
        assert_eq!(catalogue.list().unwrap(), vec![]);
    }

    #[test]
    fn loads_a_bundled_profile_by_manufacturer_and_id() {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), "deye", "deye_p3");
        let catalogue = ProfileCatalogue::new(dir.path());
        let def = catalogue.load("deye", "deye_p3").unwrap();
        assert_eq!(def.info.manufacturer, "X");
    }
}
