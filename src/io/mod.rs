//! Raster sources, sensor configuration and the satellite reader

pub mod config;
pub mod raster;
pub mod satellite_reader;

pub use config::{BandRecord, SensorCatalog, SensorConfig};
pub use raster::{GdalRaster, MemoryRaster, RasterSource, SampleType};
pub use satellite_reader::{Block, BlockData, BlockIter, BlockMode, SatelliteReader};
