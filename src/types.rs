use ndarray::{Array2, Array3};
use std::fmt;

/// Single-band pixel values (rows x cols)
pub type BandImage = Array2<f32>;

/// Multi-band pixel values (rows x cols x bands)
pub type BandCube = Array3<f32>;

/// 8-bit display image (rows x cols x channels)
pub type DisplayImage = Array3<u8>;

/// Rectangular pixel region in raster row/column space.
///
/// `x_offset` is the column of the top-left pixel and `y_offset` its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Window {
    pub x_offset: usize,
    pub y_offset: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(x_offset: usize, y_offset: usize, width: usize, height: usize) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    /// Window covering a whole `width` x `height` raster
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// True when the window contains no pixel
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels in the window
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Exclusive column bound
    pub fn x_end(&self) -> usize {
        self.x_offset + self.width
    }

    /// Exclusive row bound
    pub fn y_end(&self) -> usize {
        self.y_offset + self.height
    }

    /// Array shape (rows, cols) of data read through this window
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

impl From<(usize, usize, usize, usize)> for Window {
    fn from((x_offset, y_offset, width, height): (usize, usize, usize, usize)) -> Self {
        Self::new(x_offset, y_offset, width, height)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x_offset, self.y_offset, self.width, self.height
        )
    }
}

/// Output block shape, `rows` x `cols`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSize {
    pub rows: usize,
    pub cols: usize,
}

impl BlockSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::new(512, 512)
    }
}

impl From<(usize, usize)> for BlockSize {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::new(rows, cols)
    }
}

/// Error types for band access and raster reading
#[derive(Debug, thiserror::Error)]
pub enum SdrlError {
    #[error("Cannot find attribute '{0}' in band attributes")]
    AttributeNotFound(String),

    #[error("Invalid value for band attribute '{attribute}': {reason}")]
    InvalidAttributeValue { attribute: String, reason: String },

    #[error("No band matches {attribute} = {value}")]
    BandNotFound { attribute: String, value: String },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Failed to open raster {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Band count mismatch: raster has {raster} bands but the sensor defines {registry}")]
    BandCountMismatch { raster: usize, registry: usize },

    #[error("Cannot find index '{0}' in spectral index table")]
    UnknownIndex(String),

    #[error("No raster opened, call open() first")]
    NotOpened,

    #[error("Cannot find sensor '{0}' in sensor catalog")]
    SensorNotFound(String),

    #[error("Invalid sensor configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

/// Result type for sdrl operations
pub type SdrlResult<T> = Result<T, SdrlError>;
