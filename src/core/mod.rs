//! Band metadata, window planning and spectral index evaluation

pub mod band;
pub mod expression;
pub mod indices;
pub mod stretch;
pub mod window;

// Re-export main types
pub use band::{AttributeValue, Band, BandAttribute, BandRegistry, Wavelength};
pub use expression::{required_symbols, Expression, ExpressionEvaluator, DEFAULT_EPSILON};
pub use indices::IndexExpressionTable;
pub use stretch::{equalize_hist, to_uint8, to_uint8_gray, two_percent_linear};
pub use window::{TileGrid, WindowPlanner};
