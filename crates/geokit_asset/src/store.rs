//! Remote asset store collaborator and an in-memory implementation.
//!
//! [`AssetStore`] is the narrow surface the tree operations need from the
//! remote service: one lookup, one listing level, folder creation, leaf
//! copy and single-node deletion. Every call is a blocking round-trip and
//! nothing is cached on this side.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::path::AssetPath;
use crate::spec::{EnumAssetType, SpecAssetRecord};

////////////////////////////////////////////////////////////////////////////////
// #region Collaborator

/// Error returned by a store call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store has no record for the identifier.
    #[error("asset not found: {0}")]
    NotFound(String),
    /// The store refused the request (existing target, non-empty folder, ...).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Transport, authorization or quota failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Store operations, used for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumStoreOperation {
    Get,
    List,
    Create,
    Copy,
    Delete,
}

/// Remote asset store as seen by [`crate::tree::AssetTree`].
pub trait AssetStore {
    /// Fetch the record of one asset.
    fn get_asset(&self, id: &AssetPath) -> Result<SpecAssetRecord, StoreError>;

    /// Direct children of a folder or project root, in store order.
    fn list_assets(&self, parent: &AssetPath) -> Result<Vec<SpecAssetRecord>, StoreError>;

    /// Create an empty folder. Fails if `id` already exists.
    fn create_folder(&self, id: &AssetPath) -> Result<(), StoreError>;

    /// Server-side copy of one non-folder asset.
    fn copy_asset(
        &self,
        src: &AssetPath,
        dst: &AssetPath,
        if_allow_overwrite: bool,
    ) -> Result<(), StoreError>;

    /// Delete one asset. Folders must be empty.
    fn delete_asset(&self, id: &AssetPath) -> Result<(), StoreError>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MemoryAssetStore

/// In-memory store enforcing the same rules as the remote service.
///
/// Cloning is cheap and every clone shares the same records, so a test can
/// hand one clone to an [`crate::tree::AssetTree`] and inspect another.
/// Children are listed in identifier order.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    inner: Arc<RwLock<MemoryAssetStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryAssetStoreInner {
    dict_records: BTreeMap<AssetPath, SpecAssetRecord>,
    dict_calls: BTreeMap<EnumStoreOperation, u64>,
    set_failures: HashSet<(EnumStoreOperation, AssetPath)>,
}

impl MemoryAssetStoreInner {
    fn enter(&mut self, op: EnumStoreOperation, id: &AssetPath) -> Result<(), StoreError> {
        *self.dict_calls.entry(op).or_default() += 1;
        if self.set_failures.contains(&(op, id.clone())) {
            tracing::debug!(?op, %id, "injected store failure");
            return Err(StoreError::Backend(format!("injected {op:?} failure on {id}")));
        }
        Ok(())
    }

    fn is_container(&self, id: &AssetPath) -> bool {
        id.is_project()
            || self
                .dict_records
                .get(id)
                .is_some_and(|r| r.asset_type == EnumAssetType::Folder)
    }

    fn children(&self, parent: &AssetPath) -> Vec<SpecAssetRecord> {
        self.dict_records
            .range(parent.clone()..)
            .take_while(|(id, _)| id.is_relative_to(parent))
            .filter(|(id, _)| id.len() == parent.len() + 1)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn check_parent(&self, id: &AssetPath) -> Result<(), StoreError> {
        let parent = id.parent();
        if self.is_container(&parent) {
            return Ok(());
        }
        Err(StoreError::Rejected(format!(
            "parent folder {parent} of {id} does not exist"
        )))
    }

    fn insert_with_parents(&mut self, record: SpecAssetRecord) {
        for ancestor in record.id.ancestors() {
            self.dict_records
                .entry(ancestor.clone())
                .or_insert_with(|| SpecAssetRecord::new(ancestor, EnumAssetType::Folder));
        }
        self.dict_records.insert(record.id.clone(), record);
    }
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryAssetStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryAssetStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a folder, creating missing ancestor folders.
    pub fn insert_folder(&self, id: impl Into<AssetPath>) -> &Self {
        let record = SpecAssetRecord::new(id, EnumAssetType::Folder);
        self.write().insert_with_parents(record);
        self
    }

    /// Seed a data asset, creating missing ancestor folders.
    pub fn insert_asset(
        &self,
        id: impl Into<AssetPath>,
        asset_type: EnumAssetType,
        size_bytes: u64,
    ) -> &Self {
        let record = SpecAssetRecord::new(id, asset_type).with_size(size_bytes);
        self.write().insert_with_parents(record);
        self
    }

    /// Record lookup without call accounting.
    pub fn record(&self, id: impl Into<AssetPath>) -> Option<SpecAssetRecord> {
        self.read().dict_records.get(&id.into()).cloned()
    }

    pub fn contains(&self, id: impl Into<AssetPath>) -> bool {
        self.read().dict_records.contains_key(&id.into())
    }

    /// All stored identifiers in order.
    pub fn ids(&self) -> Vec<AssetPath> {
        self.read().dict_records.keys().cloned().collect()
    }

    /// Make every `op` call on `id` fail with [`StoreError::Backend`].
    pub fn inject_failure(&self, op: EnumStoreOperation, id: impl Into<AssetPath>) -> &Self {
        self.write().set_failures.insert((op, id.into()));
        self
    }

    pub fn clear_failures(&self) {
        self.write().set_failures.clear();
    }

    /// Number of `op` calls received so far.
    pub fn call_count(&self, op: EnumStoreOperation) -> u64 {
        self.read().dict_calls.get(&op).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.write().dict_calls.clear();
    }
}

impl AssetStore for MemoryAssetStore {
    fn get_asset(&self, id: &AssetPath) -> Result<SpecAssetRecord, StoreError> {
        let mut inner = self.write();
        inner.enter(EnumStoreOperation::Get, id)?;
        inner
            .dict_records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_assets(&self, parent: &AssetPath) -> Result<Vec<SpecAssetRecord>, StoreError> {
        let mut inner = self.write();
        inner.enter(EnumStoreOperation::List, parent)?;
        if inner.is_container(parent) {
            return Ok(inner.children(parent));
        }
        if inner.dict_records.contains_key(parent) {
            return Err(StoreError::Rejected(format!("{parent} is not a folder")));
        }
        Err(StoreError::NotFound(parent.to_string()))
    }

    fn create_folder(&self, id: &AssetPath) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.enter(EnumStoreOperation::Create, id)?;
        if !id.is_absolute() || id.is_project() {
            return Err(StoreError::Rejected(format!(
                "{id} is not a valid folder identifier"
            )));
        }
        if inner.dict_records.contains_key(id) {
            return Err(StoreError::Rejected(format!("{id} already exists")));
        }
        inner.check_parent(id)?;
        inner
            .dict_records
            .insert(id.clone(), SpecAssetRecord::new(id, EnumAssetType::Folder));
        Ok(())
    }

    fn copy_asset(
        &self,
        src: &AssetPath,
        dst: &AssetPath,
        if_allow_overwrite: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.enter(EnumStoreOperation::Copy, src)?;
        let record_src = inner
            .dict_records
            .get(src)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(src.to_string()))?;
        if record_src.asset_type == EnumAssetType::Folder {
            return Err(StoreError::Rejected(format!("cannot copy folder {src}")));
        }
        inner.check_parent(dst)?;
        if let Some(record_dst) = inner.dict_records.get(dst) {
            if record_dst.asset_type == EnumAssetType::Folder || !if_allow_overwrite {
                return Err(StoreError::Rejected(format!("{dst} already exists")));
            }
        }
        inner.dict_records.insert(
            dst.clone(),
            SpecAssetRecord {
                id: dst.clone(),
                ..record_src
            },
        );
        Ok(())
    }

    fn delete_asset(&self, id: &AssetPath) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.enter(EnumStoreOperation::Delete, id)?;
        if !inner.dict_records.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !inner.children(id).is_empty() {
            return Err(StoreError::Rejected(format!("folder {id} is not empty")));
        }
        inner.dict_records.remove(id);
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{AssetStore, EnumStoreOperation, MemoryAssetStore, StoreError};
    use crate::path::AssetPath;
    use crate::spec::EnumAssetType;

    const C_HOME: &str = "projects/p/assets";

    fn path(rel: &str) -> AssetPath {
        AssetPath::new(C_HOME).join(rel)
    }

    #[test]
    fn seeding_creates_parent_folders() {
        let store = MemoryAssetStore::new();
        store.insert_asset(path("a/b/img"), EnumAssetType::Image, 10);

        assert_eq!(
            store.record(path("a")).expect("a").asset_type,
            EnumAssetType::Folder
        );
        assert!(store.contains(path("a/b")));
        assert!(!store.contains(C_HOME));
        assert_eq!(store.ids().len(), 3);
    }

    #[test]
    fn listing_returns_direct_children_only() {
        let store = MemoryAssetStore::new();
        store
            .insert_asset(path("f/img2"), EnumAssetType::Image, 1)
            .insert_asset(path("f/img1"), EnumAssetType::Image, 1)
            .insert_asset(path("f/sub/deep"), EnumAssetType::Table, 1)
            .insert_folder(path("f-other"));

        let l_ids: Vec<String> = store
            .list_assets(&path("f"))
            .expect("list")
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(
            l_ids,
            vec![
                "projects/p/assets/f/img1",
                "projects/p/assets/f/img2",
                "projects/p/assets/f/sub"
            ]
        );

        let l_root = store.list_assets(&AssetPath::new(C_HOME)).expect("list root");
        assert_eq!(l_root.len(), 2);

        assert!(matches!(
            store.list_assets(&path("f/img1")),
            Err(StoreError::Rejected(_))
        ));
        assert!(matches!(
            store.list_assets(&path("missing")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn folder_rules_match_remote_service() {
        let store = MemoryAssetStore::new();
        store.create_folder(&path("a")).expect("create under project");
        assert!(matches!(
            store.create_folder(&path("a")),
            Err(StoreError::Rejected(_))
        ));
        assert!(matches!(
            store.create_folder(&path("x/y")),
            Err(StoreError::Rejected(_))
        ));
        assert!(store.create_folder(&AssetPath::new("rel")).is_err());

        store.create_folder(&path("a/b")).expect("nested");
        assert!(matches!(
            store.delete_asset(&path("a")),
            Err(StoreError::Rejected(_))
        ));
        store.delete_asset(&path("a/b")).expect("delete leaf folder");
        store.delete_asset(&path("a")).expect("delete emptied folder");
        assert!(matches!(
            store.delete_asset(&path("a")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn copy_rules_match_remote_service() {
        let store = MemoryAssetStore::new();
        store
            .insert_asset(path("img"), EnumAssetType::Image, 42)
            .insert_folder(path("dir"));

        store
            .copy_asset(&path("img"), &path("dir/img"), false)
            .expect("copy");
        assert_eq!(store.record(path("dir/img")).expect("copied").size_bytes, Some(42));

        assert!(store.copy_asset(&path("img"), &path("dir/img"), false).is_err());
        store
            .copy_asset(&path("img"), &path("dir/img"), true)
            .expect("overwrite");
        assert!(store.copy_asset(&path("dir"), &path("dir2"), true).is_err());
        assert!(store.copy_asset(&path("img"), &path("nope/img"), true).is_err());
    }

    #[test]
    fn calls_are_counted_and_failures_injected() {
        let store = MemoryAssetStore::new();
        store.insert_folder(path("a"));

        assert!(store.get_asset(&path("a")).is_ok());
        assert!(store.get_asset(&path("a")).is_ok());
        assert_eq!(store.call_count(EnumStoreOperation::Get), 2);

        store.inject_failure(EnumStoreOperation::Get, path("a"));
        assert!(matches!(
            store.get_asset(&path("a")),
            Err(StoreError::Backend(_))
        ));
        store.clear_failures();
        assert!(store.get_asset(&path("a")).is_ok());

        store.reset_calls();
        assert_eq!(store.call_count(EnumStoreOperation::Get), 0);
    }
}
