//! Directory-backed store.
//!
//! Layout under the root directory:
//! - `items/{tenant}/{item_id}.json`, one pretty-printed `CachedRecord` per item
//! - `ingredients.json`, a map of `"{lang}:{name}"` to `IngredientRecord`
//! - `usage.jsonl`, one `UsageLogEntry` per line, append-only

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{vocabulary_of, IngredientStore, ItemStore, StoreError, UsageStore};
use crate::types::{ingredient_key, CachedRecord, IngredientRecord, Language, UsageLogEntry};

const ITEMS_DIR: &str = "items";
const INGREDIENTS_FILE: &str = "ingredients.json";
const USAGE_FILE: &str = "usage.jsonl";

#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    /// Serializes read-modify-write of `ingredients.json` and appends to `usage.jsonl`.
    write_lock: Mutex<()>,
}

/// Encode an id as a single path component.
///
/// Letters, digits, `-` and `_` pass through; every other byte becomes
/// `%XX`, so distinct ids never share a file and `.`/`..` can't escape the
/// directory. The empty id is encoded as a lone `%`.
fn path_safe(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(id.len());
    for c in id.chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

fn ingredient_map_key(name: &str, language: Language) -> String {
    format!("{}:{}", language.code(), ingredient_key(name))
}

/// Read a file, treating "not found" as `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store under `~/.menugen`, or `./.menugen` when there is no home directory.
    pub fn default_location() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".menugen");
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tenant_dir(&self, tenant_id: &str) -> PathBuf {
        self.root.join(ITEMS_DIR).join(path_safe(tenant_id))
    }

    fn item_path(&self, tenant_id: &str, item_id: &str) -> PathBuf {
        self.tenant_dir(tenant_id)
            .join(format!("{}.json", path_safe(item_id)))
    }

    async fn load_ingredients(&self) -> Result<BTreeMap<String, IngredientRecord>, StoreError> {
        match read_optional(&self.root.join(INGREDIENTS_FILE)).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl ItemStore for DiskStore {
    async fn get_item(
        &self,
        tenant_id: &str,
        item_id: &str,
    ) -> Result<Option<CachedRecord>, StoreError> {
        match read_optional(&self.item_path(tenant_id, item_id)).await? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    async fn put_item(&self, record: CachedRecord) -> Result<(), StoreError> {
        let path = self.item_path(&record.tenant_id, &record.result.item_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling file first so readers never see a partial record.
        let json = serde_json::to_string_pretty(&record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn tenant_vocabulary(&self, tenant_id: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.tenant_dir(tenant_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).await?;
                records.push(serde_json::from_str::<CachedRecord>(&content)?);
            }
        }

        Ok(vocabulary_of(&records))
    }
}

#[async_trait]
impl IngredientStore for DiskStore {
    async fn get_ingredient(
        &self,
        name: &str,
        language: Language,
    ) -> Result<Option<IngredientRecord>, StoreError> {
        let mut map = self.load_ingredients().await?;
        Ok(map.remove(&ingredient_map_key(name, language)))
    }

    async fn upsert_ingredient(&self, record: IngredientRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.load_ingredients().await?;
        map.insert(ingredient_map_key(&record.name, record.language), record);

        fs::create_dir_all(&self.root).await?;
        fs::write(
            self.root.join(INGREDIENTS_FILE),
            serde_json::to_string_pretty(&map)?,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UsageStore for DiskStore {
    async fn append_usage(&self, entry: UsageLogEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.root).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(USAGE_FILE))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn usage_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLogEntry>, StoreError> {
        let Some(content) = read_optional(&self.root.join(USAGE_FILE)).await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let entry: UsageLogEntry = serde_json::from_str(line)?;
            if entry.tenant_id == tenant_id && entry.created_at >= since {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationResult, GuardFields, RecipeLine, RequestType};
    use tempfile::TempDir;

    fn record(item_id: &str, ingredients: &[&str]) -> CachedRecord {
        let mut result = GenerationResult::empty(item_id, Language::Romanian);
        result.description = "Ciorbă acrișoară".to_string();
        result.recipe = ingredients
            .iter()
            .map(|i| RecipeLine::new(*i, "50 g"))
            .collect();
        CachedRecord {
            tenant_id: "bistro/1".to_string(),
            result,
            guard: GuardFields {
                name: "Ciorbă de burtă".to_string(),
                language_override: Some(Language::Romanian),
            },
            excluded: false,
        }
    }

    #[test]
    fn path_components_are_distinct_and_contained() {
        assert_ne!(path_safe("a/b"), path_safe("a-b"));
        assert_ne!(path_safe("a:b"), path_safe("a-b"));
        assert_eq!(path_safe("a/b"), "a%2Fb");
        assert_eq!(path_safe(".."), "%2E%2E");
        assert_eq!(path_safe("Ciorbă_1"), "Ciorbă_1");
        assert_ne!(path_safe(""), path_safe("%"));
    }

    #[tokio::test]
    async fn dot_tenants_stay_inside_the_items_directory() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        store
            .upsert_ingredient(IngredientRecord {
                name: "Smântână".to_string(),
                language: Language::Romanian,
                calories_per_100g: 200.0,
                protein_per_100g: 3.0,
                carbs_per_100g: 4.0,
                fat_per_100g: 20.0,
            })
            .await
            .unwrap();

        assert!(store.tenant_vocabulary("..").await.unwrap().is_empty());
        assert!(store.tenant_vocabulary(".").await.unwrap().is_empty());

        let mut slashed = record("x", &["Ceapă"]);
        slashed.tenant_id = "a/b".to_string();
        store.put_item(slashed).await.unwrap();
        assert!(store.get_item("a-b", "x").await.unwrap().is_none());
        assert!(store.get_item("a/b", "x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn item_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        let original = record("item/42", &["Burtă de vită", "Smântână"]);

        store.put_item(original.clone()).await.unwrap();
        let loaded = store.get_item("bistro/1", "item/42").await.unwrap();

        assert_eq!(loaded, Some(original));
        assert!(store.get_item("bistro/1", "missing").await.unwrap().is_none());
        assert_eq!(
            store.tenant_vocabulary("bistro/1").await.unwrap(),
            vec!["Burtă de vită", "Smântână"]
        );
        assert!(store.tenant_vocabulary("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_item_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        let path = store.item_path("t", "x");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            store.get_item("t", "x").await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn usage_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        let entry = UsageLogEntry {
            tenant_id: "t1".to_string(),
            item_id: Some("a".to_string()),
            request_type: RequestType::IngredientMatch,
            tokens_used: 700,
            cost_estimate: 0.25,
            processing_time_ms: 12,
            error: None,
            created_at: Utc::now(),
        };
        store.append_usage(entry.clone()).await.unwrap();
        store.append_usage(entry).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(USAGE_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let since = Utc::now() - chrono::Duration::minutes(1);
        assert_eq!(store.sum_cost_since("t1", since).await.unwrap(), 0.5);
        assert_eq!(store.sum_cost_since("t2", since).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn ingredients_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        DiskStore::new(dir.path())
            .upsert_ingredient(IngredientRecord {
                name: "Smântână".to_string(),
                language: Language::Romanian,
                calories_per_100g: 193.0,
                protein_per_100g: 2.7,
                carbs_per_100g: 3.6,
                fat_per_100g: 19.0,
            })
            .await
            .unwrap();

        let reopened = DiskStore::new(dir.path());
        let found = reopened
            .get_ingredient("SMÂNTÂNĂ", Language::Romanian)
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.fat_per_100g), Some(19.0));
    }
}
