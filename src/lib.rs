//! s2mosaic: Sentinel-2 Level-2A tiles as raster mosaic items
//!
//! Resolves a tile's `metadata.xml` into a resolution-specific composite item
//! (band images, footprint, spatial reference, viewing geometry and scene
//! attributes) and batch-imports tiles with their cloud masks into a host
//! mosaic catalog.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    Resolution, BandSpec, BandAngle, TileDescriptor, SceneAttributes, BandProperties,
    CloudMaskFeature, CloudMaskDocument, TileError, TileResult,
};

pub use io::{MetadataCache, CloudMaskParser, TileSidecar};
pub use crate::core::{TileDescriptorBuilder, TileIdentity, BatchImporter, ImportConfig, ImportReport};

#[cfg(feature = "python")]
mod python {
    use crate::core::registration::raster_type_definitions;
    use crate::core::{BatchImporter, ImportConfig, InMemoryCatalog, TileDescriptorBuilder};
    use crate::io::DEFAULT_CACHE_CAPACITY;
    use crate::types::{Resolution, TileError};
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::{PyDict, PyList};
    use serde_json::Value;
    use std::path::Path;

    fn to_py_err(e: TileError) -> PyErr {
        match e {
            TileError::InvalidInput(_) | TileError::NotATile(_) => {
                PyErr::new::<PyValueError, _>(format!("{}", e))
            }
            _ => PyErr::new::<PyRuntimeError, _>(format!("{}", e)),
        }
    }

    fn json_error(e: serde_json::Error) -> PyErr {
        PyErr::new::<PyRuntimeError, _>(format!("Serialization failed: {}", e))
    }

    fn to_python(py: Python, value: &Value) -> PyResult<PyObject> {
        Ok(match value {
            Value::Null => py.None(),
            Value::Bool(b) => b.to_object(py),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.to_object(py),
                None => n.as_f64().unwrap_or(f64::NAN).to_object(py),
            },
            Value::String(s) => s.to_object(py),
            Value::Array(items) => {
                let list = PyList::empty(py);
                for item in items {
                    list.append(to_python(py, item)?)?;
                }
                list.into()
            }
            Value::Object(map) => {
                let dict = PyDict::new(py);
                for (key, item) in map {
                    dict.set_item(key, to_python(py, item)?)?;
                }
                dict.into()
            }
        })
    }

    fn serialize<T: serde::Serialize>(py: Python, value: &T) -> PyResult<PyObject> {
        let value = serde_json::to_value(value).map_err(json_error)?;
        to_python(py, &value)
    }

    /// Python wrapper for TileDescriptorBuilder
    #[pyclass(name = "TileBuilder")]
    struct PyTileBuilder {
        inner: TileDescriptorBuilder,
    }

    #[pymethods]
    impl PyTileBuilder {
        #[new]
        #[pyo3(signature = (cache_capacity = DEFAULT_CACHE_CAPACITY))]
        fn new(cache_capacity: usize) -> Self {
            PyTileBuilder {
                inner: TileDescriptorBuilder::with_capacity(cache_capacity),
            }
        }

        fn can_open(&self, path: &str) -> bool {
            self.inner.identity().is_tile(Path::new(path))
        }

        fn build(&self, py: Python, path: &str, resolution: &str) -> PyResult<PyObject> {
            let resolution: Resolution = resolution.parse().map_err(to_py_err)?;
            let descriptor = self
                .inner
                .build(Path::new(path), resolution)
                .map_err(to_py_err)?;
            serialize(py, &descriptor)
        }

        fn raster_types(&self, py: Python) -> PyResult<PyObject> {
            serialize(py, &raster_type_definitions())
        }

        /// (hits, misses, evictions, parse failures)
        fn cache_stats(&self) -> (u64, u64, u64, u64) {
            let stats = self.inner.cache().stats();
            (stats.hits, stats.misses, stats.evictions, stats.parse_failures)
        }

        fn __repr__(&self) -> String {
            format!("TileBuilder(cache_capacity={})", self.inner.cache().capacity())
        }
    }

    /// Import every tile under `folder`; returns {"items": [...], "failed": [...]}
    #[pyfunction]
    #[pyo3(signature = (folder, resolution = "10m"))]
    fn import_tiles(py: Python, folder: &str, resolution: &str) -> PyResult<PyObject> {
        let resolution: Resolution = resolution.parse().map_err(to_py_err)?;
        let importer = BatchImporter::new(ImportConfig::default());
        let mut catalog = InMemoryCatalog::default();
        let report = importer
            .import_all(Path::new(folder), &mut catalog, resolution, None)
            .map_err(to_py_err)?;

        let result = PyDict::new(py);
        result.set_item("items", serialize(py, &catalog.items)?)?;
        result.set_item("failed", serialize(py, &report.failed)?)?;
        Ok(result.into())
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PyTileBuilder>()?;
        m.add_function(wrap_pyfunction!(import_tiles, m)?)?;
        Ok(())
    }
}
