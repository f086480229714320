use crate::domain::ports::SettingsStore;
use crate::domain::settings::SettingsSnapshot;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Keeps the merchant settings snapshot as one JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<Option<SettingsSnapshot>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Writes to a sibling temp file and renames it over the old snapshot so a
    /// reader never sees half a record.
    async fn save(&self, snapshot: &SettingsSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, data).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!("Saved {} settings to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileSettingsStore::new(temp_dir.path().join("settings.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileSettingsStore::new(temp_dir.path().join("nested/settings.json"));

        let mut snapshot = SettingsSnapshot::new();
        snapshot.insert("mds_user".into(), "shop@example.com".into());
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(snapshot));
        assert!(!temp_dir.path().join("nested/settings.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = JsonFileSettingsStore::new(path);
        assert!(store.load().await.is_err());
    }
}
