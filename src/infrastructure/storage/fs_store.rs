use crate::domain::JuristicId;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where records and debug dumps land on disk.
#[derive(Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
    debug_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(data_dir: impl Into<PathBuf>, debug_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            debug_dir: debug_dir.into(),
        }
    }

    /// Default output location: `<data_dir>/<ID>.json`.
    pub fn record_path(&self, id: &JuristicId) -> PathBuf {
        self.data_dir.join(format!("{}.json", id))
    }

    pub fn debug_path(&self, name: &str, extension: &str) -> PathBuf {
        self.debug_dir.join(format!("{}.{}", name, extension))
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Pretty JSON, Thai text left unescaped.
    pub fn write_json_file<T: serde::Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<()> {
        self.ensure_parent(path)?;
        let content = serde_json::to_string_pretty(data)?;
        fs::write(path, content)?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    pub fn write_debug_html(&self, name: &str, html: &str) -> Result<PathBuf> {
        let path = self.debug_path(name, "html");
        self.ensure_parent(&path)?;
        fs::write(&path, html)?;
        debug!("Saved debug HTML to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_path_uses_id_as_file_name() {
        let store = FileSystemStore::new("data", ".");
        let id = JuristicId::parse("0105542065502").unwrap();
        assert_eq!(
            store.record_path(&id),
            PathBuf::from("data").join("0105542065502.json")
        );
    }

    #[test]
    fn creates_missing_directories_and_keeps_thai_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path().join("data"), dir.path());
        let path = dir.path().join("nested").join("out.json");

        store
            .write_json_file(&path, &json!({ "unit": "บาท" }))
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("บาท"));
    }

    #[test]
    fn debug_html_goes_to_debug_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new("data", dir.path());
        let path = store
            .write_debug_html("debug_search_page", "<html></html>")
            .unwrap();
        assert_eq!(path, dir.path().join("debug_search_page.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
