//! Python bindings

use crate::core::{AttributeValue, BandAttribute, IndexExpressionTable, TileGrid};
use crate::io::{BlockData, BlockMode, SatelliteReader};
use crate::types::{BlockSize, SdrlError, Window};
use numpy::{IntoPyArray, PyArray2, PyArray3};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: SdrlError) -> PyErr {
    match e {
        SdrlError::AttributeNotFound(_)
        | SdrlError::InvalidAttributeValue { .. }
        | SdrlError::InvalidWindow(_)
        | SdrlError::UnknownIndex(_)
        | SdrlError::SensorNotFound(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn selector(value: &PyAny) -> PyResult<AttributeValue> {
    if let Ok(text) = value.extract::<String>() {
        Ok(AttributeValue::Text(text))
    } else if let Ok(integer) = value.extract::<i64>() {
        Ok(AttributeValue::Integer(integer))
    } else if let Ok(number) = value.extract::<f64>() {
        Ok(AttributeValue::Number(number))
    } else {
        Err(PyValueError::new_err(format!(
            "Unsupported band selector: {}",
            value
        )))
    }
}

fn block_to_py(py: Python<'_>, data: BlockData) -> PyObject {
    match data {
        BlockData::Gray(values) => {
            let array: &PyAny = values.into_pyarray(py);
            array.into()
        }
        BlockData::Bands(bands) => {
            let array: &PyAny = bands.into_pyarray(py);
            array.into()
        }
        BlockData::Rgb(rgb) => {
            let array: &PyAny = rgb.into_pyarray(py);
            array.into()
        }
    }
}

type WindowTuple = (usize, usize, usize, usize);

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySatelliteReader>()?;
    m.add_class::<PyBlockIterator>()?;
    m.add_function(wrap_pyfunction!(index_names, m)?)?;
    Ok(())
}

/// Names of the built-in spectral indices
#[pyfunction]
fn index_names() -> Vec<&'static str> {
    IndexExpressionTable::names().collect()
}

/// Python wrapper for SatelliteReader
#[pyclass(name = "SatelliteReader", unsendable)]
struct PySatelliteReader {
    inner: SatelliteReader,
}

#[pymethods]
impl PySatelliteReader {
    #[new]
    #[pyo3(signature = (sensing = "ElectronicMap"))]
    fn new(sensing: &str) -> PyResult<Self> {
        let inner = SatelliteReader::new(sensing).map_err(to_py_err)?;
        Ok(PySatelliteReader { inner })
    }

    fn open(&mut self, path: &str) -> PyResult<()> {
        self.inner.open(path).map_err(to_py_err)
    }

    #[pyo3(signature = (index, attribute = "description", window = None))]
    fn get_band<'py>(
        &self,
        py: Python<'py>,
        index: &PyAny,
        attribute: &str,
        window: Option<WindowTuple>,
    ) -> PyResult<&'py PyArray2<f32>> {
        let attribute: BandAttribute = attribute.parse().map_err(to_py_err)?;
        let band = self
            .inner
            .get_band(selector(index)?, attribute, window.map(Window::from))
            .map_err(to_py_err)?;
        Ok(band.into_pyarray(py))
    }

    #[pyo3(signature = (to_uint8 = true, window = None))]
    fn get_rgb(
        &self,
        py: Python<'_>,
        to_uint8: bool,
        window: Option<WindowTuple>,
    ) -> PyResult<PyObject> {
        let window = window.map(Window::from);
        if to_uint8 {
            let rgb = self.inner.get_rgb_u8(window).map_err(to_py_err)?;
            let array: &PyAny = rgb.into_pyarray(py);
            Ok(array.into())
        } else {
            let rgb = self.inner.get_rgb(window).map_err(to_py_err)?;
            let array: &PyAny = rgb.into_pyarray(py);
            Ok(array.into())
        }
    }

    #[pyo3(signature = (name = "NDVI", window = None))]
    fn compute_index<'py>(
        &self,
        py: Python<'py>,
        name: &str,
        window: Option<WindowTuple>,
    ) -> PyResult<&'py PyArray2<f32>> {
        let index = self
            .inner
            .compute_index(name, window.map(Window::from))
            .map_err(to_py_err)?;
        Ok(index.into_pyarray(py))
    }

    /// All bands through `window` as rows x cols x bands
    #[pyo3(signature = (window = None))]
    fn read_window<'py>(
        &self,
        py: Python<'py>,
        window: Option<WindowTuple>,
    ) -> PyResult<&'py PyArray3<f32>> {
        let cube = self
            .inner
            .read_window(window.map(Window::from))
            .map_err(to_py_err)?;
        Ok(cube.into_pyarray(py))
    }

    /// Lazy iterator of `((x, y, w, h), array)` pairs, arrays padded to `block_size`
    #[pyo3(signature = (block_size = (512, 512), mode = "ALL"))]
    fn iter_blocks(
        slf: PyRef<'_, Self>,
        block_size: (usize, usize),
        mode: &str,
    ) -> PyResult<PyBlockIterator> {
        let block_size = BlockSize::from(block_size);
        let tiles = slf.inner.plan_blocks(block_size).map_err(to_py_err)?;
        Ok(PyBlockIterator {
            reader: slf.into(),
            tiles,
            block_size,
            mode: BlockMode::from_name(mode),
            failed: false,
        })
    }

    fn summary(&self) -> String {
        self.inner.summary()
    }

    #[getter]
    fn width(&self) -> Option<usize> {
        self.inner.width()
    }

    #[getter]
    fn height(&self) -> Option<usize> {
        self.inner.height()
    }

    #[getter]
    fn band_count(&self) -> Option<usize> {
        self.inner.band_count()
    }

    fn __repr__(&self) -> String {
        format!(
            "SatelliteReader(sensing='{}', bands={}, opened={})",
            self.inner.sensing(),
            self.inner.registry().len(),
            self.inner.is_open()
        )
    }
}

/// Python iterator over the blocks of one reader
#[pyclass(name = "BlockIterator", unsendable)]
struct PyBlockIterator {
    reader: Py<PySatelliteReader>,
    tiles: TileGrid,
    block_size: BlockSize,
    mode: BlockMode,
    failed: bool,
}

#[pymethods]
impl PyBlockIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>, py: Python<'_>) -> PyResult<Option<(WindowTuple, PyObject)>> {
        if slf.failed {
            return Ok(None);
        }
        let Some(window) = slf.tiles.next() else {
            return Ok(None);
        };

        let block = {
            let reader = slf.reader.borrow(py);
            reader.inner.compute_block(window, slf.block_size, &slf.mode)
        };
        match block {
            Ok(block) => {
                let w = block.window;
                Ok(Some(((w.x_offset, w.y_offset, w.width, w.height), block_to_py(py, block.data))))
            }
            Err(e) => {
                slf.failed = true;
                Err(to_py_err(e))
            }
        }
    }

    fn __len__(&self) -> usize {
        if self.failed {
            0
        } else {
            self.tiles.len()
        }
    }
}
