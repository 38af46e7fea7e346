//! Preferences repository implementation

use std::sync::Arc;

use serde_json::Value;

use super::keys::{APP_LANGUAGE, APP_THEME};
use super::record_store::RecordStore;
use crate::models::{Preferences, ThemeMode};
use crate::util::normalize_text_option;
use crate::Result;

/// Device preferences stored under `AppTheme` and `appLanguage`
#[derive(Clone)]
pub struct PreferencesRepository {
    store: Arc<dyn RecordStore>,
}

impl PreferencesRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Load preferences, falling back to defaults for missing or unreadable values
    pub async fn load(&self) -> Result<Preferences> {
        let mut preferences = Preferences::default();

        if let Some(theme) = self.get_string(APP_THEME).await? {
            match ThemeMode::parse(&theme) {
                Some(mode) => preferences.theme = mode,
                None => tracing::warn!("Ignoring unknown theme value {:?}", theme),
            }
        }

        if let Some(language) = normalize_text_option(self.get_string(APP_LANGUAGE).await?) {
            preferences.language = language;
        }

        Ok(preferences)
    }

    pub async fn save(&self, preferences: &Preferences) -> Result<()> {
        self.set_theme(preferences.theme).await?;
        self.set_language(&preferences.language).await
    }

    pub async fn set_theme(&self, theme: ThemeMode) -> Result<()> {
        self.store
            .set(APP_THEME, &Value::String(theme.as_str().to_string()))
            .await
    }

    pub async fn set_language(&self, language: &str) -> Result<()> {
        self.store
            .set(APP_LANGUAGE, &Value::String(language.trim().to_string()))
            .await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.store.get(key).await? {
            Some(Value::String(value)) => Some(value),
            Some(other) => {
                tracing::warn!("Ignoring non-string value stored under {}: {}", key, other);
                None
            }
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use serde_json::json;

    fn setup() -> (PreferencesRepository, MemoryRecordStore) {
        let store = MemoryRecordStore::new();
        (PreferencesRepository::new(Arc::new(store.clone())), store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_default_preferences() {
        let (repo, _) = setup();
        assert_eq!(repo.load().await.unwrap(), Preferences::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_load_preferences() {
        let (repo, store) = setup();

        repo.save(&Preferences {
            theme: ThemeMode::Dark,
            language: "fr".into(),
        })
        .await
        .unwrap();

        assert_eq!(store.get(APP_THEME).await.unwrap(), Some(json!("dark")));
        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.theme, ThemeMode::Dark);
        assert_eq!(loaded.language, "fr");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreadable_values_fall_back() {
        let (repo, store) = setup();
        store.set(APP_THEME, &json!("sepia")).await.unwrap();
        store.set(APP_LANGUAGE, &json!(42)).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), Preferences::default());
    }
}
