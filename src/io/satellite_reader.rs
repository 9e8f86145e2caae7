use crate::core::band::{AttributeValue, BandAttribute, BandRegistry};
use crate::core::expression::ExpressionEvaluator;
use crate::core::indices::IndexExpressionTable;
use crate::core::stretch;
use crate::core::window::{TileGrid, WindowPlanner};
use crate::io::config::{SensorCatalog, SensorConfig};
use crate::io::raster::{GdalRaster, RasterSource, SampleType};
use crate::types::{
    BandCube, BandImage, BlockSize, DisplayImage, SdrlError, SdrlResult, Window,
};
use ndarray::{s, stack, Array2, Array3, Axis};
use num_traits::Zero;
use std::path::Path;

/// Content computed for every block by [`SatelliteReader::iter_blocks`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMode {
    /// All bands, raw values
    All,
    /// Red/Green/Blue stretched to 8 bit
    Rgb,
    /// A spectral index from the index table
    Index(String),
}

impl BlockMode {
    /// `"RGB"`, a registered index name, or anything else for all bands
    pub fn from_name(name: &str) -> Self {
        if name == "RGB" {
            BlockMode::Rgb
        } else if IndexExpressionTable::contains(name) {
            BlockMode::Index(name.to_string())
        } else {
            BlockMode::All
        }
    }
}

impl Default for BlockMode {
    fn default() -> Self {
        BlockMode::All
    }
}

impl From<&str> for BlockMode {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

/// Pixel data of one block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockData {
    /// Spectral index values
    Gray(BandImage),
    /// Raw bands, rows x cols x bands
    Bands(BandCube),
    /// 8-bit RGB, rows x cols x 3
    Rgb(DisplayImage),
}

impl BlockData {
    pub fn shape(&self) -> &[usize] {
        match self {
            BlockData::Gray(data) => data.shape(),
            BlockData::Bands(data) => data.shape(),
            BlockData::Rgb(data) => data.shape(),
        }
    }
}

/// One fixed-size block and the raster window holding its valid pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub window: Window,
    pub data: BlockData,
}

/// Zero-pad `data` to `rows` x `cols`, valid region at the top-left
fn pad2<T: Clone + Zero>(data: Array2<T>, rows: usize, cols: usize) -> Array2<T> {
    let (h, w) = data.dim();
    if (h, w) == (rows, cols) {
        return data;
    }
    let mut padded = Array2::zeros((rows, cols));
    padded.slice_mut(s![..h, ..w]).assign(&data);
    padded
}

fn pad3<T: Clone + Zero>(data: Array3<T>, rows: usize, cols: usize) -> Array3<T> {
    let (h, w, c) = data.dim();
    if (h, w) == (rows, cols) {
        return data;
    }
    let mut padded = Array3::zeros((rows, cols, c));
    padded.slice_mut(s![..h, ..w, ..]).assign(&data);
    padded
}

/// Named band access over one opened raster
pub struct SatelliteReader<S: RasterSource = GdalRaster> {
    sensing: String,
    registry: BandRegistry,
    source: Option<S>,
    evaluator: ExpressionEvaluator,
}

impl SatelliteReader<GdalRaster> {
    /// Reader for a sensor from the built-in catalog
    pub fn new(sensing: &str) -> SdrlResult<Self> {
        let catalog = SensorCatalog::builtin()?;
        Self::from_catalog(&catalog, sensing)
    }

    /// Open `path` with GDAL, replacing any raster opened before
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> SdrlResult<()> {
        log::info!("Opening raster: {}", path.as_ref().display());
        match GdalRaster::open(path) {
            Ok(raster) => self.attach(raster),
            Err(e) => {
                self.source = None;
                Err(e)
            }
        }
    }
}

impl<S: RasterSource> SatelliteReader<S> {
    /// Reader for a sensor from `catalog`
    pub fn from_catalog(catalog: &SensorCatalog, sensing: &str) -> SdrlResult<Self> {
        Self::from_config(catalog.get(sensing)?)
    }

    pub fn from_config(config: &SensorConfig) -> SdrlResult<Self> {
        let registry = BandRegistry::from_config(config)?;
        log::info!("Sensor {} resolved with {} bands", config.name, registry.len());
        Ok(Self::with_registry(config.name.clone(), registry))
    }

    pub fn with_registry(sensing: impl Into<String>, registry: BandRegistry) -> Self {
        Self {
            sensing: sensing.into(),
            registry,
            source: None,
            evaluator: ExpressionEvaluator::default(),
        }
    }

    /// Bind `source` after checking its band count against the registry.
    ///
    /// On failure no raster stays bound, including one attached earlier.
    pub fn attach(&mut self, source: S) -> SdrlResult<()> {
        self.source = None;
        if source.band_count() != self.registry.len() {
            return Err(SdrlError::BandCountMismatch {
                raster: source.band_count(),
                registry: self.registry.len(),
            });
        }
        log::info!(
            "Raster attached: {} x {}, bands: {}",
            source.width(),
            source.height(),
            source.band_count()
        );
        self.source = Some(source);
        Ok(())
    }

    pub fn sensing(&self) -> &str {
        &self.sensing
    }

    pub fn registry(&self) -> &BandRegistry {
        &self.registry
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn width(&self) -> Option<usize> {
        self.source.as_ref().map(|s| s.width())
    }

    pub fn height(&self) -> Option<usize> {
        self.source.as_ref().map(|s| s.height())
    }

    pub fn band_count(&self) -> Option<usize> {
        self.source.as_ref().map(|s| s.band_count())
    }

    /// Stabilizer added to band values before index evaluation
    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.evaluator = ExpressionEvaluator::new(epsilon);
    }

    pub fn epsilon(&self) -> f32 {
        self.evaluator.epsilon()
    }

    fn opened(&self) -> SdrlResult<&S> {
        self.source.as_ref().ok_or(SdrlError::NotOpened)
    }

    /// Clamp `window` to the raster, or the whole raster when `None`
    fn resolve_window(&self, source: &S, window: Option<Window>) -> SdrlResult<Window> {
        match window {
            Some(window) => WindowPlanner::new(source.width(), source.height()).clamp(window),
            None => Ok(Window::full(source.width(), source.height())),
        }
    }

    /// Read the first band whose `attribute` matches `selector`
    pub fn get_band(
        &self,
        selector: impl Into<AttributeValue>,
        attribute: BandAttribute,
        window: Option<Window>,
    ) -> SdrlResult<BandImage> {
        let source = self.opened()?;
        let order = self.registry.first(selector, attribute)?.order();
        let window = self.resolve_window(source, window)?;
        log::debug!("Reading band {} through window {}", order, window);
        source.read_band(order, window)
    }

    /// Red, Green and Blue stacked on the last axis
    pub fn get_rgb(&self, window: Option<Window>) -> SdrlResult<BandCube> {
        let bands = ["Red", "Green", "Blue"]
            .iter()
            .map(|name| self.get_band(*name, BandAttribute::Description, window))
            .collect::<SdrlResult<Vec<BandImage>>>()?;
        let views: Vec<_> = bands.iter().map(|band| band.view()).collect();
        stack(Axis(2), &views)
            .map_err(|e| SdrlError::Processing(format!("Failed to stack RGB bands: {}", e)))
    }

    /// [`get_rgb`](Self::get_rgb) converted to 8 bit.
    ///
    /// 8-bit rasters are returned unchanged, anything else is stretched.
    pub fn get_rgb_u8(&self, window: Option<Window>) -> SdrlResult<DisplayImage> {
        let rgb = self.get_rgb(window)?;
        if self.opened()?.sample_type() == SampleType::UInt8 {
            return Ok(rgb.mapv(|v| v as u8));
        }
        Ok(stretch::to_uint8(&rgb, false))
    }

    /// Evaluate the named spectral index over bands matched by description
    pub fn compute_index(&self, name: &str, window: Option<Window>) -> SdrlResult<BandImage> {
        self.opened()?;
        let expression = IndexExpressionTable::get(name)?;
        log::debug!("Computing {} = {}", name, expression);
        self.evaluator.evaluate(
            expression,
            |symbol, window| self.get_band(symbol, BandAttribute::Description, window),
            window,
        )
    }

    /// All bands through `window` as rows x cols x bands
    pub fn read_window(&self, window: Option<Window>) -> SdrlResult<BandCube> {
        let source = self.opened()?;
        let window = self.resolve_window(source, window)?;
        source.read_all(window)
    }

    /// Lazily compute every block of the raster, each padded to `block_size`
    pub fn iter_blocks(
        &self,
        block_size: impl Into<BlockSize>,
        mode: impl Into<BlockMode>,
    ) -> SdrlResult<BlockIter<'_, S>> {
        let block_size = block_size.into();
        let mode = mode.into();
        let tiles = self.plan_blocks(block_size)?;
        log::info!(
            "Iterating {} blocks of {}x{} in mode {:?}",
            tiles.len(),
            block_size.rows,
            block_size.cols,
            mode
        );
        Ok(BlockIter {
            reader: self,
            tiles,
            block_size,
            mode,
            failed: false,
        })
    }

    /// Sensor name followed by the band table
    pub fn summary(&self) -> String {
        format!("Sensor: {}\n{}", self.sensing, self.registry.summary())
    }

    /// Tile windows of the opened raster, row-major
    pub fn plan_blocks(&self, block_size: BlockSize) -> SdrlResult<TileGrid> {
        let source = self.opened()?;
        WindowPlanner::new(source.width(), source.height()).tile(block_size)
    }

    /// Compute one block for `window`, padded to `block_size`
    pub fn compute_block(&self, window: Window, block_size: BlockSize, mode: &BlockMode) -> SdrlResult<Block> {
        let (rows, cols) = (block_size.rows, block_size.cols);
        let data = match mode {
            BlockMode::Rgb => BlockData::Rgb(pad3(self.get_rgb_u8(Some(window))?, rows, cols)),
            BlockMode::Index(name) => {
                BlockData::Gray(pad2(self.compute_index(name, Some(window))?, rows, cols))
            }
            BlockMode::All => BlockData::Bands(pad3(self.read_window(Some(window))?, rows, cols)),
        };
        Ok(Block { window, data })
    }
}

/// Single-pass iterator over the blocks of one reader.
///
/// Each `next` reads only the current block; an error ends the iteration.
pub struct BlockIter<'a, S: RasterSource> {
    reader: &'a SatelliteReader<S>,
    tiles: TileGrid,
    block_size: BlockSize,
    mode: BlockMode,
    failed: bool,
}

impl<S: RasterSource> BlockIter<'_, S> {
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn mode(&self) -> &BlockMode {
        &self.mode
    }
}

impl<S: RasterSource> Iterator for BlockIter<'_, S> {
    type Item = SdrlResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let window = self.tiles.next()?;
        let block = self.reader.compute_block(window, self.block_size, &self.mode);
        if block.is_err() {
            self.failed = true;
        }
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.tiles.len()))
        }
    }
}
