use crate::types::{BandCube, BandImage, SdrlError, SdrlResult, Window};
use gdal::raster::GdalDataType;
use gdal::Dataset;
use ndarray::{s, stack, Array2, Array3, ArrayView2, Axis};
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Storage type of raster samples, before conversion to `f32`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    UInt8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
    /// Mixed band types or anything else
    Other,
}

impl From<GdalDataType> for SampleType {
    fn from(data_type: GdalDataType) -> Self {
        match data_type {
            GdalDataType::UInt8 => SampleType::UInt8,
            GdalDataType::UInt16 => SampleType::UInt16,
            GdalDataType::Int16 => SampleType::Int16,
            GdalDataType::UInt32 => SampleType::UInt32,
            GdalDataType::Int32 => SampleType::Int32,
            GdalDataType::Float32 => SampleType::Float32,
            GdalDataType::Float64 => SampleType::Float64,
            _ => SampleType::Other,
        }
    }
}

/// Raster decoder contract used by the reader.
///
/// Windows passed in are already clamped to the raster bounds.
pub trait RasterSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Sample type shared by all bands
    fn sample_type(&self) -> SampleType {
        SampleType::Float32
    }

    /// Read band `order` (1-based) through `window`
    fn read_band(&self, order: usize, window: Window) -> SdrlResult<BandImage>;

    /// Read every band through `window` as rows x cols x bands
    fn read_all(&self, window: Window) -> SdrlResult<BandCube> {
        let bands = (1..=self.band_count())
            .map(|order| self.read_band(order, window))
            .collect::<SdrlResult<Vec<BandImage>>>()?;
        stack_bands(&bands, window)
    }
}

fn stack_bands(bands: &[BandImage], window: Window) -> SdrlResult<BandCube> {
    if bands.is_empty() {
        return Ok(Array3::zeros((window.height, window.width, 0)));
    }
    let views: Vec<ArrayView2<f32>> = bands.iter().map(|band| band.view()).collect();
    stack(Axis(2), &views)
        .map_err(|e| SdrlError::Processing(format!("Failed to stack bands: {}", e)))
}

fn check_request(source: &impl RasterSource, order: usize, window: Window) -> SdrlResult<()> {
    if order == 0 || order > source.band_count() {
        return Err(SdrlError::BandNotFound {
            attribute: "order".to_string(),
            value: order.to_string(),
        });
    }
    if window.x_end() > source.width() || window.y_end() > source.height() {
        return Err(SdrlError::InvalidWindow(format!(
            "{} exceeds raster size {}x{}",
            window,
            source.width(),
            source.height()
        )));
    }
    Ok(())
}

/// GDAL-backed raster, closed when dropped
pub struct GdalRaster {
    path: PathBuf,
    dataset: Dataset,
    width: usize,
    height: usize,
    band_count: usize,
    sample_type: SampleType,
}

impl GdalRaster {
    pub fn open<P: AsRef<Path>>(path: P) -> SdrlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let dataset = Dataset::open(&path).map_err(|e| SdrlError::OpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count() as usize;
        let sample_type = Self::common_sample_type(&dataset, band_count)?;
        log::debug!(
            "Opened {}: {} x {}, bands: {}, samples: {:?}",
            path.display(),
            width,
            height,
            band_count,
            sample_type
        );

        Ok(Self {
            path,
            dataset,
            width,
            height,
            band_count,
            sample_type,
        })
    }

    fn common_sample_type(dataset: &Dataset, band_count: usize) -> SdrlResult<SampleType> {
        let mut common = None;
        for order in 1..=band_count {
            let band_type = SampleType::from(dataset.rasterband(order as isize)?.band_type());
            match common {
                None => common = Some(band_type),
                Some(existing) if existing != band_type => return Ok(SampleType::Other),
                Some(_) => {}
            }
        }
        Ok(common.unwrap_or(SampleType::Other))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for GdalRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.band_count
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn read_band(&self, order: usize, window: Window) -> SdrlResult<BandImage> {
        check_request(self, order, window)?;
        if window.is_empty() {
            return Ok(Array2::zeros(window.shape()));
        }

        let rasterband = self.dataset.rasterband(order as isize)?;
        let size = (window.width, window.height);
        let buffer = rasterband.read_as::<f32>(
            (window.x_offset as isize, window.y_offset as isize),
            size,
            size,
            None,
        )?;

        Array2::from_shape_vec(window.shape(), buffer.data)
            .map_err(|e| SdrlError::Processing(format!("Failed to reshape band {}: {}", order, e)))
    }
}

/// In-memory raster over a bands x rows x cols cube.
///
/// Counts every read request, which makes read patterns observable.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    data: Array3<f32>,
    sample_type: SampleType,
    reads: Cell<usize>,
}

impl MemoryRaster {
    pub fn new(data: Array3<f32>) -> Self {
        Self {
            data,
            sample_type: SampleType::Float32,
            reads: Cell::new(0),
        }
    }

    /// 8-bit raster, bands x rows x cols
    pub fn from_u8(data: Array3<u8>) -> Self {
        Self::new(data.mapv(f32::from)).with_sample_type(SampleType::UInt8)
    }

    /// Report `sample_type` as the storage type of the samples
    pub fn with_sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = sample_type;
        self
    }

    /// Build from equally shaped band images, band order = vector order
    pub fn from_bands(bands: Vec<BandImage>) -> SdrlResult<Self> {
        let views: Vec<ArrayView2<f32>> = bands.iter().map(|band| band.view()).collect();
        let data = stack(Axis(0), &views)
            .map_err(|e| SdrlError::Processing(format!("Band shapes differ: {}", e)))?;
        Ok(Self::new(data))
    }

    /// Number of read requests served so far
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn count_read(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.data.dim().2
    }

    fn height(&self) -> usize {
        self.data.dim().1
    }

    fn band_count(&self) -> usize {
        self.data.dim().0
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn read_band(&self, order: usize, window: Window) -> SdrlResult<BandImage> {
        check_request(self, order, window)?;
        self.count_read();
        Ok(self
            .data
            .slice(s![
                order - 1,
                window.y_offset..window.y_end(),
                window.x_offset..window.x_end()
            ])
            .to_owned())
    }

    fn read_all(&self, window: Window) -> SdrlResult<BandCube> {
        if window.x_end() > self.width() || window.y_end() > self.height() {
            return Err(SdrlError::InvalidWindow(format!(
                "{} exceeds raster size {}x{}",
                window,
                self.width(),
                self.height()
            )));
        }
        self.count_read();
        Ok(self
            .data
            .slice(s![
                ..,
                window.y_offset..window.y_end(),
                window.x_offset..window.x_end()
            ])
            .permuted_axes([1, 2, 0])
            .as_standard_layout()
            .into_owned())
    }
}
