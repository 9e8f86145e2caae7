//! SDRL: Satellite Data Read Library
//!
//! Named access to the spectral bands of multi-band satellite rasters,
//! clamped and tiled window reads, and spectral index formulas (NDVI, EVI,
//! ...) evaluated over bands resolved by name.
//!
//! ```no_run
//! use sdrl::{BandAttribute, SatelliteReader, Window};
//!
//! # fn main() -> sdrl::SdrlResult<()> {
//! let mut reader = SatelliteReader::new("GF1_WFV")?;
//! reader.open("GF1_WFV2_E109.5_N32.6_20200425_L1A0004761605.tiff")?;
//!
//! let nir = reader.get_band("NIR", BandAttribute::Description, None)?;
//! let ndvi = reader.compute_index("NDVI", Some(Window::new(0, 0, 1024, 1024)))?;
//! for block in reader.iter_blocks((512, 512), "RGB")? {
//!     let block = block?;
//!     println!("{} -> {:?}", block.window, block.data.shape());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    BandCube, BandImage, BlockSize, DisplayImage, SdrlError, SdrlResult, Window,
};

pub use crate::core::{
    AttributeValue, Band, BandAttribute, BandRegistry, Expression, ExpressionEvaluator,
    IndexExpressionTable, WindowPlanner, Wavelength,
};

pub use io::{
    Block, BlockData, BlockMode, GdalRaster, MemoryRaster, RasterSource, SampleType,
    SatelliteReader, SensorCatalog, SensorConfig,
};
