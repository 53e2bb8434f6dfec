//! Filesystem-backed stores.
//!
//! Tables live as one comma-delimited file per table in a directory, assets
//! as plain files (with an `images/` subfolder searched first), and durable
//! state as a small JSON map in the per-user config directory.

use deckgen_core::delimited::{self, Delimiter};
use deckgen_core::store::Table;
use deckgen_core::{AssetId, AssetStore, Error, KeyValueStore, Result, TableStore};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

const APP_NAME: &str = "deckgen";

/// Default location of the state file.
pub fn default_state_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_NAME).join("state.json"),
        None => PathBuf::from(".deckgen-state.json"),
    }
}

/// True if `name` is a single plain path component.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Tables stored as `<dir>/<name>.csv`.
#[derive(Debug, Clone)]
pub struct DirTableStore {
    dir: PathBuf,
}

impl DirTableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `name`.
    pub fn table_path(&self, name: &str) -> Result<PathBuf> {
        if !is_plain_name(name) {
            return Err(Error::TableError(format!("invalid table name '{}'", name)));
        }
        Ok(self.dir.join(format!("{}.csv", name)))
    }
}

impl TableStore for DirTableStore {
    fn read_table(&self, name: &str) -> Result<Option<Table>> {
        let path = self.table_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        log::debug!("Read table {} from {}", name, path.display());
        delimited::parse(&text, Delimiter::COMMA).map(Some)
    }

    fn write_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let path = self.table_path(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, delimited::write(rows, Delimiter::COMMA))?;
        log::debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn copy_table(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.table_path(from)?;
        if !source.is_file() {
            return Err(Error::TableError(format!("table '{}' does not exist", from)));
        }
        fs::copy(&source, self.table_path(to)?)?;
        Ok(())
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        Ok(self.table_path(name)?.is_file())
    }
}

/// Assets stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirAssetStore {
    fn find(&self, folder: Option<&str>, name: &str) -> Result<Option<AssetId>> {
        if !is_plain_name(name) {
            log::warn!("Ignoring asset reference with path components: {}", name);
            return Ok(None);
        }
        let dir = match folder {
            Some(folder) => self.root.join(folder),
            None => self.root.clone(),
        };
        let path = dir.join(name);
        Ok(path
            .is_file()
            .then(|| AssetId(path.to_string_lossy().into_owned())))
    }

    fn fetch(&self, id: &AssetId) -> Result<Vec<u8>> {
        fs::read(&id.0).map_err(|e| Error::AssetError(format!("{}: {}", id.0, e)))
    }
}

/// String settings persisted as a JSON object.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::StorageError(format!("{}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for JsonStateStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| Error::StorageError(e.to_string()))?;
        fs::write(&self.path, json)?;
        log::debug!("Saved {} to {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckgen_core::media::resolve_asset;
    use deckgen_core::store::{read_slides, CONFIG_TABLE, SLIDES_TABLE};

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_table_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirTableStore::new(dir.path());
        assert_eq!(store.read_table(SLIDES_TABLE).unwrap(), None);

        let table = rows(&[&["order", "title", "bullets"], &["1", "Hello, world", "a|b"]]);
        store.write_table(SLIDES_TABLE, &table).unwrap();

        assert!(dir.path().join("Slides.csv").is_file());
        assert_eq!(store.read_table(SLIDES_TABLE).unwrap(), Some(table));
        assert_eq!(read_slides(&store).unwrap()[0].title, "Hello, world");
    }

    #[test]
    fn test_copy_table_and_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirTableStore::new(dir.path());
        store
            .write_table(CONFIG_TABLE, &rows(&[&["Setting", "Value"]]))
            .unwrap();

        store.copy_table(CONFIG_TABLE, "Config_Backup_x").unwrap();
        assert!(store.has_table("Config_Backup_x").unwrap());
        assert!(store.copy_table(SLIDES_TABLE, "Slides_Backup_x").is_err());
        assert!(store.table_path("../escape").is_err());
    }

    #[test]
    fn test_assets_prefer_images_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images").join("logo.png"), b"nested").unwrap();
        fs::write(dir.path().join("logo.png"), b"root").unwrap();
        fs::write(dir.path().join("chart.png"), b"chart").unwrap();

        let store = DirAssetStore::new(dir.path());
        let logo = resolve_asset(&store, "logo.png").unwrap().unwrap();
        assert_eq!(store.fetch(&logo).unwrap(), b"nested");
        let chart = resolve_asset(&store, "chart.png").unwrap().unwrap();
        assert_eq!(store.fetch(&chart).unwrap(), b"chart");
        assert_eq!(resolve_asset(&store, "missing.png").unwrap(), None);
        assert_eq!(resolve_asset(&store, "../logo.png").unwrap(), None);
    }

    #[test]
    fn test_state_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = JsonStateStore::new(&path);
        assert_eq!(store.get("deck_data_version").unwrap(), None);
        store.set("deck_data_version", "1.3.0").unwrap();

        let reopened = JsonStateStore::new(&path);
        assert_eq!(
            reopened.get("deck_data_version").unwrap().as_deref(),
            Some("1.3.0")
        );
    }
}
