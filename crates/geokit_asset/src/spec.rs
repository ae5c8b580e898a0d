//! Asset type tags, records, options and top-level error types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::path::AssetPath;
use crate::store::StoreError;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Type tag reported by the remote store for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumAssetType {
    /// Single raster image.
    Image,
    /// Collection of images.
    ImageCollection,
    /// Vector collection.
    FeatureCollection,
    /// Legacy tag for a vector collection.
    Table,
    /// Grouping node that may contain other assets.
    Folder,
    /// Project root. Structural only, never backed by a record.
    Project,
    /// Any tag this crate does not model.
    Other(String),
}

impl EnumAssetType {
    /// Store-side tag (`IMAGE`, `IMAGE_COLLECTION`, ...).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "IMAGE",
            Self::ImageCollection => "IMAGE_COLLECTION",
            Self::FeatureCollection => "FEATURE_COLLECTION",
            Self::Table => "TABLE",
            Self::Folder => "FOLDER",
            Self::Project => "PROJECT",
            Self::Other(tag) => tag,
        }
    }

    /// `FEATURE_COLLECTION` and `TABLE` describe the same kind of asset.
    pub fn is_feature_collection(&self) -> bool {
        matches!(self, Self::FeatureCollection | Self::Table)
    }
}

impl FromStr for EnumAssetType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_ascii_uppercase().as_str() {
            "IMAGE" => Self::Image,
            "IMAGE_COLLECTION" => Self::ImageCollection,
            "FEATURE_COLLECTION" => Self::FeatureCollection,
            "TABLE" => Self::Table,
            "FOLDER" => Self::Folder,
            "PROJECT" => Self::Project,
            _ => Self::Other(value.to_string()),
        })
    }
}

impl From<&str> for EnumAssetType {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(v) => v,
            Err(e) => match e {},
        }
    }
}

impl fmt::Display for EnumAssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndOptions

/// Metadata of one remote asset, as returned by lookups and listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAssetRecord {
    /// Normalized asset identifier.
    pub id: AssetPath,
    /// Remote type tag.
    pub asset_type: EnumAssetType,
    /// Byte size; only reported for non-folder assets.
    pub size_bytes: Option<u64>,
}

impl SpecAssetRecord {
    pub fn new(id: impl Into<AssetPath>, asset_type: EnumAssetType) -> Self {
        Self {
            id: id.into(),
            asset_type,
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }
}

/// Session configuration threaded into [`crate::tree::AssetTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAssetTreeOptions {
    /// Cloud project used to compute the home folder.
    pub project_id: String,
}

impl SpecAssetTreeOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Input options for `remove_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecRemoveDirOptions {
    /// Delete the whole subtree instead of one empty folder.
    pub if_recursive: bool,
    /// Only record what would be deleted. `None` falls back to `if_recursive`.
    pub if_dry_run: Option<bool>,
}

impl SpecRemoveDirOptions {
    /// Recursive removal previews by default, single-folder removal deletes.
    pub fn resolve_dry_run(&self) -> bool {
        self.if_dry_run.unwrap_or(self.if_recursive)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failures of path arithmetic and asset tree operations.
#[derive(Debug, Error)]
pub enum AssetTreeError {
    /// The identifier has no backing remote record.
    #[error("Asset {0} does not exist.")]
    NotFound(AssetPath),
    /// The destination already has a record and overwriting was not granted.
    #[error("Asset {0} already exists.")]
    AlreadyExists(AssetPath),
    /// The asset exists but is of another kind.
    #[error("Asset {path} is not a {expected}.")]
    WrongType {
        /// Offending asset.
        path: AssetPath,
        /// Expected kind, human readable.
        expected: String,
    },
    /// The path fails a structural precondition.
    #[error("Asset {path}: {message}")]
    InvalidStructure {
        /// Offending asset.
        path: AssetPath,
        /// Violated expectation.
        message: String,
    },
    /// Glob pattern could not be compiled.
    #[error("{0}")]
    InvalidPattern(String),
    /// Failure reported by the remote store, passed through unchanged.
    #[error("Remote store failed on {path}: {source}")]
    Remote {
        /// Identifier the failing call was issued for.
        path: AssetPath,
        #[source]
        source: StoreError,
    },
}

impl AssetTreeError {
    pub(crate) fn structure(path: &AssetPath, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn wrong_type(path: &AssetPath, expected: impl fmt::Display) -> Self {
        Self::WrongType {
            path: path.clone(),
            expected: expected.to_string(),
        }
    }

    pub(crate) fn remote(path: &AssetPath, source: StoreError) -> Self {
        Self::Remote {
            path: path.clone(),
            source,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EnumAssetType, SpecRemoveDirOptions};

    #[test]
    fn asset_type_parses_store_tags() {
        assert_eq!(EnumAssetType::from("IMAGE"), EnumAssetType::Image);
        assert_eq!(
            EnumAssetType::from("image_collection"),
            EnumAssetType::ImageCollection
        );
        assert_eq!(EnumAssetType::from("FOLDER").to_string(), "FOLDER");
        assert_eq!(
            EnumAssetType::from("CLASSIFIER"),
            EnumAssetType::Other("CLASSIFIER".to_string())
        );
        assert_eq!(EnumAssetType::from("CLASSIFIER").as_str(), "CLASSIFIER");
    }

    #[test]
    fn feature_collection_and_table_are_synonyms() {
        assert!(EnumAssetType::FeatureCollection.is_feature_collection());
        assert!(EnumAssetType::Table.is_feature_collection());
        assert!(!EnumAssetType::Image.is_feature_collection());
    }

    #[test]
    fn remove_dir_dry_run_defaults_follow_recursive_flag() {
        let opts_recursive = SpecRemoveDirOptions {
            if_recursive: true,
            if_dry_run: None,
        };
        assert!(opts_recursive.resolve_dry_run());

        assert!(!SpecRemoveDirOptions::default().resolve_dry_run());

        let opts_live = SpecRemoveDirOptions {
            if_recursive: true,
            if_dry_run: Some(false),
        };
        assert!(!opts_live.resolve_dry_run());
    }
}
