use geokit_asset::{
    AssetPath, AssetStore, AssetTree, AssetTreeError, EnumAssetType, SpecAssetRecord,
    SpecAssetTreeOptions, SpecRemoveDirOptions, StoreError, format_description,
};
use pyo3::exceptions::{PyFileExistsError, PyFileNotFoundError, PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "geokit.asset.tree.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

////////////////////////////////////////////////////////////////////////////////
// #region PyAssetStore

/// Store backed by a Python client object (typically `ee.data`).
#[derive(Debug)]
struct PyAssetStore {
    obj_client: Py<PyAny>,
}

fn map_backend_error(py: Python<'_>, err: PyErr) -> StoreError {
    StoreError::Backend(err.value(py).to_string())
}

fn parse_record(obj_record: &Bound<'_, PyAny>) -> PyResult<SpecAssetRecord> {
    let c_id: String = match obj_record.get_item("id") {
        Ok(v) => v.extract()?,
        Err(_) => obj_record.get_item("name")?.extract()?,
    };
    let c_type: String = obj_record.get_item("type")?.extract()?;
    let mut record = SpecAssetRecord::new(c_id, EnumAssetType::from(c_type.as_str()));

    if let Ok(obj_size) = obj_record.get_item("sizeBytes") {
        let n_size = match obj_size.extract::<u64>() {
            Ok(v) => v,
            Err(_) => obj_size.extract::<String>()?.parse::<u64>().map_err(|e| {
                PyValueError::new_err(format!("Invalid `sizeBytes` value: {e}"))
            })?,
        };
        record = record.with_size(n_size);
    }
    Ok(record)
}

impl AssetStore for PyAssetStore {
    fn get_asset(&self, id: &AssetPath) -> Result<SpecAssetRecord, StoreError> {
        Python::with_gil(|py| {
            let obj_record = self
                .obj_client
                .bind(py)
                .call_method1("getAsset", (id.as_posix(),))
                .map_err(|err| {
                    // the client raises the same exception for missing and inaccessible assets
                    tracing::debug!(%id, error = %err.value(py), "getAsset raised");
                    StoreError::NotFound(id.to_string())
                })?;
            parse_record(&obj_record).map_err(|err| map_backend_error(py, err))
        })
    }

    fn list_assets(&self, parent: &AssetPath) -> Result<Vec<SpecAssetRecord>, StoreError> {
        Python::with_gil(|py| {
            let run = || -> PyResult<Vec<SpecAssetRecord>> {
                let dict_params = PyDict::new(py);
                dict_params.set_item("parent", parent.as_posix())?;
                let obj_listing = self
                    .obj_client
                    .bind(py)
                    .call_method1("listAssets", (dict_params,))?;
                let mut l_records = Vec::new();
                for obj_item in obj_listing.get_item("assets")?.try_iter()? {
                    l_records.push(parse_record(&obj_item?)?);
                }
                Ok(l_records)
            };
            run().map_err(|err| map_backend_error(py, err))
        })
    }

    fn create_folder(&self, id: &AssetPath) -> Result<(), StoreError> {
        Python::with_gil(|py| {
            let run = || -> PyResult<()> {
                let dict_value = PyDict::new(py);
                dict_value.set_item("type", EnumAssetType::Folder.as_str())?;
                self.obj_client
                    .bind(py)
                    .call_method1("createAsset", (dict_value, id.as_posix()))?;
                Ok(())
            };
            run().map_err(|err| map_backend_error(py, err))
        })
    }

    fn copy_asset(
        &self,
        src: &AssetPath,
        dst: &AssetPath,
        if_allow_overwrite: bool,
    ) -> Result<(), StoreError> {
        Python::with_gil(|py| {
            let run = || -> PyResult<()> {
                let dict_kwargs = PyDict::new(py);
                dict_kwargs.set_item("allowOverwrite", if_allow_overwrite)?;
                self.obj_client.bind(py).call_method(
                    "copyAsset",
                    (src.as_posix(), dst.as_posix()),
                    Some(&dict_kwargs),
                )?;
                Ok(())
            };
            run().map_err(|err| map_backend_error(py, err))
        })
    }

    fn delete_asset(&self, id: &AssetPath) -> Result<(), StoreError> {
        Python::with_gil(|py| {
            self.obj_client
                .bind(py)
                .call_method1("deleteAsset", (id.as_posix(),))
                .map(|_| ())
                .map_err(|err| map_backend_error(py, err))
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PyAssetTree

fn map_asset_tree_error(exception: AssetTreeError) -> PyErr {
    let message = exception.to_string();
    match exception {
        AssetTreeError::NotFound(_) => PyFileNotFoundError::new_err(message),
        AssetTreeError::AlreadyExists(_) => PyFileExistsError::new_err(message),
        AssetTreeError::WrongType { .. }
        | AssetTreeError::InvalidStructure { .. }
        | AssetTreeError::InvalidPattern(_) => PyValueError::new_err(message),
        AssetTreeError::Remote { .. } => PyOSError::new_err(message),
    }
}

fn to_strings(l_paths: Vec<AssetPath>) -> Vec<String> {
    l_paths.iter().map(AssetPath::to_string).collect()
}

#[pyclass(name = "AssetTree")]
struct PyAssetTree {
    inner: AssetTree<PyAssetStore>,
}

#[pymethods]
impl PyAssetTree {
    #[new]
    #[pyo3(signature = (client, project_id))]
    fn new(client: Py<PyAny>, project_id: String) -> Self {
        Self {
            inner: AssetTree::new(
                PyAssetStore { obj_client: client },
                SpecAssetTreeOptions::new(project_id),
            ),
        }
    }

    fn home(&self) -> String {
        self.inner.home().to_string()
    }

    fn expanduser(&self, path: &str) -> String {
        self.inner.expanduser(path).to_string()
    }

    #[pyo3(signature = (path, raised = false))]
    fn exists(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner.exists(path, raised).map_err(map_asset_tree_error)
    }

    fn asset_type(&self, path: &str) -> PyResult<String> {
        self.inner
            .asset_type(path)
            .map(|t| t.to_string())
            .map_err(map_asset_tree_error)
    }

    fn size_bytes(&self, path: &str) -> PyResult<u64> {
        self.inner.size_bytes(path).map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, asset_type, raised = false))]
    fn is_type(&self, path: &str, asset_type: &str, raised: bool) -> PyResult<bool> {
        self.inner
            .is_type(path, &EnumAssetType::from(asset_type), raised)
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_folder(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner.is_folder(path, raised).map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_image(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner.is_image(path, raised).map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_image_collection(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner
            .is_image_collection(path, raised)
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_feature_collection(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner
            .is_feature_collection(path, raised)
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_table(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner.is_table(path, raised).map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, raised = false))]
    fn is_project(&self, path: &str, raised: bool) -> PyResult<bool> {
        self.inner.is_project(path, raised).map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, recursive = false))]
    fn list_children(&self, path: &str, recursive: bool) -> PyResult<Vec<String>> {
        self.inner
            .list_children(path, recursive)
            .map(to_strings)
            .map_err(map_asset_tree_error)
    }

    fn glob(&self, path: &str, pattern: &str) -> PyResult<Vec<String>> {
        self.inner
            .glob(path, pattern)
            .map(to_strings)
            .map_err(map_asset_tree_error)
    }

    fn rglob(&self, path: &str, pattern: &str) -> PyResult<Vec<String>> {
        self.inner
            .rglob(path, pattern)
            .map(to_strings)
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, parents = false, exist_ok = false))]
    fn make_dir(&self, path: &str, parents: bool, exist_ok: bool) -> PyResult<String> {
        self.inner
            .make_dir(path, parents, exist_ok)
            .map(|p| p.to_string())
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (src, dst, overwrite = false))]
    fn copy(&self, src: &str, dst: &str, overwrite: bool) -> PyResult<String> {
        self.inner
            .copy_to(src, dst, overwrite)
            .map(|p| p.to_string())
            .map_err(map_asset_tree_error)
    }

    #[pyo3(name = "move", signature = (src, dst, overwrite = false))]
    fn move_to(&self, src: &str, dst: &str, overwrite: bool) -> PyResult<String> {
        self.inner
            .move_to(src, dst, overwrite)
            .map(|p| p.to_string())
            .map_err(map_asset_tree_error)
    }

    #[pyo3(signature = (path, recursive = false, dry_run = None))]
    fn remove_dir(
        &self,
        path: &str,
        recursive: bool,
        dry_run: Option<bool>,
    ) -> PyResult<Vec<String>> {
        let spec_rm_options = SpecRemoveDirOptions {
            if_recursive: recursive,
            if_dry_run: dry_run,
        };
        self.inner
            .remove_dir(path, spec_rm_options)
            .map(to_strings)
            .map_err(map_asset_tree_error)
    }

    fn unlink(&self, path: &str) -> PyResult<()> {
        self.inner.unlink(path).map_err(map_asset_tree_error)
    }

    fn delete(&self, path: &str) -> PyResult<()> {
        self.unlink(path)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[pyfunction(name = "format_description")]
fn format_description_py(description: &str) -> String {
    format_description(description)
}

#[pymodule]
fn _geokit_asset_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyAssetTree>()?;
    module.add_function(wrap_pyfunction!(format_description_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
