//! `geokit_asset` v1:
//! Rust-side asset path model and remote asset tree operations.
//!
//! Architecture:
//! - `conf`  : namespace constants
//! - `spec`  : enums/records/options/errors
//! - `path`  : `AssetPath` value type and glob patterns (no I/O)
//! - `store` : remote store collaborator trait + in-memory store
//! - `tree`  : existence/type queries, listing, mkdir/copy/move/rmdir
//! - `util`  : shared helper functions

pub mod conf;
pub mod path;
pub mod spec;
pub mod store;
pub mod tree;
mod util;

pub use path::{AssetPath, AssetPattern};
pub use spec::{
    AssetTreeError, EnumAssetType, SpecAssetRecord, SpecAssetTreeOptions, SpecRemoveDirOptions,
};
pub use store::{AssetStore, EnumStoreOperation, MemoryAssetStore, StoreError};
pub use tree::AssetTree;
pub use util::format_description;
