//! Asset tree operations against a remote store.
//!
//! Every predicate re-queries the store; nothing is cached between calls,
//! so concurrent changes made elsewhere are visible (and racy). Recursive
//! operations issue one round-trip per visited node, sequentially, and stop
//! at the first failure without rolling back what already happened.

use std::iter;

use tracing::{debug, info, warn};

use crate::path::{AssetPath, AssetPattern};
use crate::spec::{
    AssetTreeError, EnumAssetType, SpecAssetRecord, SpecAssetTreeOptions, SpecRemoveDirOptions,
};
use crate::store::{AssetStore, StoreError};
use crate::util::{is_overlap, order_deepest_first};

/// Path arithmetic plus remote CRUD over one asset store.
#[derive(Debug, Clone)]
pub struct AssetTree<S> {
    store: S,
    spec_options: SpecAssetTreeOptions,
}

impl<S: AssetStore> AssetTree<S> {
    pub fn new(store: S, spec_options: SpecAssetTreeOptions) -> Self {
        Self {
            store,
            spec_options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &SpecAssetTreeOptions {
        &self.spec_options
    }

    /// Root asset folder of the configured project.
    pub fn home(&self) -> AssetPath {
        AssetPath::home(&self.spec_options.project_id)
    }

    /// Expand a leading `~` into the configured home.
    pub fn expanduser(&self, path: impl Into<AssetPath>) -> AssetPath {
        path.into().expanduser(&self.spec_options.project_id)
    }

    /// `true` if `path` lives under the configured home. Structural only.
    pub fn is_user_project(
        &self,
        path: impl Into<AssetPath>,
        if_raise: bool,
    ) -> Result<bool, AssetTreeError> {
        let path = path.into();
        if path.is_user_project(&self.spec_options.project_id) {
            return Ok(true);
        }
        if if_raise {
            return Err(AssetTreeError::structure(
                &path,
                format!(
                    "is not in the same project as the user ({})",
                    self.spec_options.project_id
                ),
            ));
        }
        Ok(false)
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region Queries

    fn fetch_record(&self, path: &AssetPath) -> Result<Option<SpecAssetRecord>, AssetTreeError> {
        match self.store.get_asset(path) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(AssetTreeError::remote(path, e)),
        }
    }

    fn require_record(&self, path: &AssetPath) -> Result<SpecAssetRecord, AssetTreeError> {
        self.fetch_record(path)?
            .ok_or_else(|| AssetTreeError::NotFound(path.clone()))
    }

    /// `true` if the store currently has a record for `path`.
    ///
    /// A missing asset is `Ok(false)`, or [`AssetTreeError::NotFound`] with
    /// `if_raise`. Other store failures are returned as
    /// [`AssetTreeError::Remote`].
    pub fn exists(&self, path: impl Into<AssetPath>, if_raise: bool) -> Result<bool, AssetTreeError> {
        let path = path.into();
        let b_exists = self.fetch_record(&path)?.is_some();
        debug!(%path, exists = b_exists, "existence check");
        if !b_exists && if_raise {
            return Err(AssetTreeError::NotFound(path));
        }
        Ok(b_exists)
    }

    fn resolve_type(&self, path: &AssetPath) -> Result<EnumAssetType, AssetTreeError> {
        if path.is_project() {
            return Ok(EnumAssetType::Project);
        }
        Ok(self.require_record(path)?.asset_type)
    }

    /// Type tag of the asset, `Project` for a project root (no store call).
    /// Fails with `NotFound` if the asset is missing.
    pub fn asset_type(&self, path: impl Into<AssetPath>) -> Result<EnumAssetType, AssetTreeError> {
        self.resolve_type(&path.into())
    }

    /// Byte size of a non-folder asset.
    pub fn size_bytes(&self, path: impl Into<AssetPath>) -> Result<u64, AssetTreeError> {
        let path = path.into();
        let record = self.require_record(&path)?;
        if record.asset_type == EnumAssetType::Folder {
            return Err(AssetTreeError::structure(&path, "is a folder"));
        }
        record.size_bytes.ok_or_else(|| {
            AssetTreeError::structure(&path, "has no size reported by the store")
        })
    }

    fn check_type<F>(
        &self,
        path: &AssetPath,
        expected: &str,
        if_raise: bool,
        predicate: F,
    ) -> Result<bool, AssetTreeError>
    where
        F: Fn(&EnumAssetType) -> bool,
    {
        let asset_type = self.resolve_type(path)?;
        if predicate(&asset_type) {
            return Ok(true);
        }
        if if_raise {
            return Err(AssetTreeError::wrong_type(path, expected));
        }
        Ok(false)
    }

    /// `true` if the asset has type `asset_type`. A missing asset is
    /// always `NotFound`; `if_raise` turns a type mismatch into `WrongType`.
    pub fn is_type(
        &self,
        path: impl Into<AssetPath>,
        asset_type: &EnumAssetType,
        if_raise: bool,
    ) -> Result<bool, AssetTreeError> {
        self.check_type(&path.into(), asset_type.as_str(), if_raise, |t| {
            t == asset_type
        })
    }

    pub fn is_folder(&self, path: impl Into<AssetPath>, if_raise: bool) -> Result<bool, AssetTreeError> {
        self.is_type(path, &EnumAssetType::Folder, if_raise)
    }

    pub fn is_image(&self, path: impl Into<AssetPath>, if_raise: bool) -> Result<bool, AssetTreeError> {
        self.is_type(path, &EnumAssetType::Image, if_raise)
    }

    pub fn is_image_collection(
        &self,
        path: impl Into<AssetPath>,
        if_raise: bool,
    ) -> Result<bool, AssetTreeError> {
        self.is_type(path, &EnumAssetType::ImageCollection, if_raise)
    }

    /// Matches both `FEATURE_COLLECTION` and `TABLE`.
    pub fn is_feature_collection(
        &self,
        path: impl Into<AssetPath>,
        if_raise: bool,
    ) -> Result<bool, AssetTreeError> {
        self.check_type(
            &path.into(),
            EnumAssetType::FeatureCollection.as_str(),
            if_raise,
            EnumAssetType::is_feature_collection,
        )
    }

    pub fn is_table(&self, path: impl Into<AssetPath>, if_raise: bool) -> Result<bool, AssetTreeError> {
        self.is_type(path, &EnumAssetType::Table, if_raise)
    }

    /// Structural check only; project roots have no remote record.
    pub fn is_project(&self, path: impl Into<AssetPath>, if_raise: bool) -> Result<bool, AssetTreeError> {
        let path = path.into();
        match path.check_project() {
            Ok(_) => Ok(true),
            Err(e) if if_raise => Err(e),
            Err(_) => Ok(false),
        }
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Listing

    fn list_level(&self, folder: &AssetPath) -> Result<Vec<SpecAssetRecord>, AssetTreeError> {
        self.store
            .list_assets(folder)
            .map_err(|e| AssetTreeError::remote(folder, e))
    }

    fn walk_folder(
        &self,
        folder: &AssetPath,
        l_out: &mut Vec<AssetPath>,
    ) -> Result<(), AssetTreeError> {
        for record in self.list_level(folder)? {
            l_out.push(record.id.clone());
            if record.asset_type == EnumAssetType::Folder {
                self.walk_folder(&record.id, l_out)?;
            }
        }
        Ok(())
    }

    /// Children of a project root or folder.
    ///
    /// With `if_recursive`, every folder is descended into and entries come
    /// back in pre-order: a folder precedes its own children, and its
    /// subtree precedes its later siblings. Siblings keep store order.
    pub fn list_children(
        &self,
        path: impl Into<AssetPath>,
        if_recursive: bool,
    ) -> Result<Vec<AssetPath>, AssetTreeError> {
        let path = path.into();
        if !path.is_project() {
            self.is_folder(&path, true)?;
        }

        if !if_recursive {
            return Ok(self
                .list_level(&path)?
                .into_iter()
                .map(|record| record.id)
                .collect());
        }

        let mut l_children = Vec::new();
        self.walk_folder(&path, &mut l_children)?;
        Ok(l_children)
    }

    fn filter_by_pattern(
        &self,
        path: AssetPath,
        pattern: &str,
        if_recursive: bool,
    ) -> Result<Vec<AssetPath>, AssetTreeError> {
        let asset_pattern = AssetPattern::new(pattern)?;
        let mut l_children = self.list_children(path, if_recursive)?;
        l_children.retain(|child| child.matches(&asset_pattern));
        Ok(l_children)
    }

    /// Direct children matching `pattern`.
    pub fn glob(
        &self,
        path: impl Into<AssetPath>,
        pattern: &str,
    ) -> Result<Vec<AssetPath>, AssetTreeError> {
        self.filter_by_pattern(path.into(), pattern, false)
    }

    /// Descendants at any depth matching `pattern`.
    pub fn rglob(
        &self,
        path: impl Into<AssetPath>,
        pattern: &str,
    ) -> Result<Vec<AssetPath>, AssetTreeError> {
        self.filter_by_pattern(path.into(), pattern, true)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Mutations

    fn create_folder(&self, path: &AssetPath) -> Result<(), AssetTreeError> {
        info!(%path, "creating folder");
        self.store
            .create_folder(path)
            .map_err(|e| AssetTreeError::remote(path, e))
    }

    fn delete_node(&self, path: &AssetPath) -> Result<(), AssetTreeError> {
        info!(%path, "deleting asset");
        self.store
            .delete_asset(path)
            .map_err(|e| AssetTreeError::remote(path, e))
    }

    /// Create a folder, and with `if_parents` its missing ancestors.
    ///
    /// Folders are created from the root down. Creation is not
    /// transactional: a failure leaves the already created ancestors in
    /// place, and a retry with `if_exist_ok` picks up from there. Project
    /// roots always count as present.
    pub fn make_dir(
        &self,
        path: impl Into<AssetPath>,
        if_parents: bool,
        if_exist_ok: bool,
    ) -> Result<AssetPath, AssetTreeError> {
        let path = path.into();
        path.check_absolute()?;
        if path.is_project() {
            debug!(%path, "project root needs no folder");
            return Ok(path);
        }

        // deepest first
        let mut l_to_create = Vec::new();
        for ancestor in path.ancestors() {
            if !self.exists(&ancestor, false)? {
                l_to_create.push(ancestor);
            }
        }

        if self.exists(&path, false)? {
            if !if_exist_ok {
                warn!(%path, "folder already exists");
                return Err(AssetTreeError::AlreadyExists(path));
            }
        } else {
            l_to_create.insert(0, path.clone());
        }

        if l_to_create.len() > 1 && !if_parents {
            let missing = &l_to_create[l_to_create.len() - 1];
            return Err(AssetTreeError::structure(
                missing,
                format!("required parent of {path} does not exist"),
            ));
        }

        for folder in l_to_create.iter().rev() {
            self.create_folder(folder)?;
        }
        Ok(path)
    }

    fn transfer_node(
        &self,
        src: &AssetPath,
        dst: &AssetPath,
        if_overwrite: bool,
        if_remove_source: bool,
    ) -> Result<(), AssetTreeError> {
        let record_src = self.require_record(src)?;
        if !if_overwrite && self.exists(dst, false)? {
            warn!(%src, %dst, "destination exists and overwrite is disabled");
            return Err(AssetTreeError::AlreadyExists(dst.clone()));
        }
        self.make_dir(dst.parent(), true, true)?;

        if record_src.asset_type == EnumAssetType::Folder {
            self.make_dir(dst, true, true)?;
            for child in self.list_level(src)? {
                let dst_child = dst / &child.id.relative_to(src)?;
                self.transfer_node(&child.id, &dst_child, if_overwrite, if_remove_source)?;
            }
        } else {
            info!(%src, %dst, "copying asset");
            self.store
                .copy_asset(src, dst, true)
                .map_err(|e| AssetTreeError::remote(src, e))?;
        }

        if if_remove_source {
            self.delete_node(src)?;
        }
        Ok(())
    }

    fn check_transfer(&self, src: &AssetPath, dst: &AssetPath) -> Result<(), AssetTreeError> {
        if is_overlap(src, dst) {
            return Err(AssetTreeError::structure(
                dst,
                format!("overlaps with source {src}"),
            ));
        }
        Ok(())
    }

    /// Copy an asset, or a whole folder tree, to `dst`.
    ///
    /// Missing parents of `dst` are created. The overwrite guard applies at
    /// every level of a folder copy. A failure stops the walk and leaves
    /// whatever was already copied in place.
    pub fn copy_to(
        &self,
        src: impl Into<AssetPath>,
        dst: impl Into<AssetPath>,
        if_overwrite: bool,
    ) -> Result<AssetPath, AssetTreeError> {
        let (src, dst) = (src.into(), dst.into());
        self.check_transfer(&src, &dst)?;
        self.transfer_node(&src, &dst, if_overwrite, false)?;
        Ok(dst)
    }

    /// Move an asset, or a whole folder tree, to `dst`.
    ///
    /// Same walk as [`Self::copy_to`]; each source node is deleted right
    /// after its content reached the destination (leaves after their copy,
    /// folders once emptied). A failure midway leaves part of the tree at
    /// both places, never in neither.
    pub fn move_to(
        &self,
        src: impl Into<AssetPath>,
        dst: impl Into<AssetPath>,
        if_overwrite: bool,
    ) -> Result<AssetPath, AssetTreeError> {
        let (src, dst) = (src.into(), dst.into());
        self.check_transfer(&src, &dst)?;
        self.transfer_node(&src, &dst, if_overwrite, true)?;
        Ok(dst)
    }

    /// Remove a folder and return the identifiers deleted, in deletion order.
    ///
    /// With `if_recursive` the subtree is deleted level by level, deepest
    /// level first, and the folder itself last. See
    /// [`SpecRemoveDirOptions::resolve_dry_run`] for the dry-run default;
    /// in dry-run mode nothing is deleted and the returned list is what a
    /// live run would delete.
    pub fn remove_dir(
        &self,
        path: impl Into<AssetPath>,
        spec_rm_options: SpecRemoveDirOptions,
    ) -> Result<Vec<AssetPath>, AssetTreeError> {
        let path = path.into();
        self.is_folder(&path, true)?;
        let if_dry_run = spec_rm_options.resolve_dry_run();

        let l_subtree = if spec_rm_options.if_recursive {
            order_deepest_first(self.list_children(&path, true)?)
        } else {
            Vec::new()
        };

        let mut l_deleted = Vec::with_capacity(l_subtree.len() + 1);
        for target in l_subtree.into_iter().chain(iter::once(path)) {
            if if_dry_run {
                debug!(path = %target, "dry run, not deleting");
            } else {
                self.delete_node(&target)?;
            }
            l_deleted.push(target);
        }
        Ok(l_deleted)
    }

    /// Delete one asset.
    pub fn unlink(&self, path: impl Into<AssetPath>) -> Result<(), AssetTreeError> {
        let path = path.into();
        self.exists(&path, true)?;
        self.delete_node(&path)
    }

    /// Alias of [`Self::unlink`].
    pub fn delete(&self, path: impl Into<AssetPath>) -> Result<(), AssetTreeError> {
        self.unlink(path)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
}
