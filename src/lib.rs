//! lstproc: A Fast, Modular Landsat Land Surface Temperature Processor
//!
//! This library turns raw multi-band Landsat observations into per-pixel land
//! surface temperature estimates, aggregated to one representative raster per
//! calendar year: radiometric calibration, cloud/shadow masking, NDVI-driven
//! emissivity estimation, inverse-Planck brightness temperature, the
//! single-channel LST equation, and robust per-year median aggregation.

pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;
pub mod viz;

// Re-export main types and functions for easier access
pub use types::{
    Acquisition, Band, BandGrid, CalibrationMetadata, Collection, LstError, LstResult, PixelValue,
    Raster, YearResult, NO_DATA,
};

pub use crate::core::{
    CalibrationMode, CloudMasker, EmissivityEstimator, LstCompositor, RadiometricCalibrator,
    TemperatureResolver, TemperatureStrategy, TemporalAggregator,
};

pub use io::{fetch_with_retry, ArchiveQuery, DateRange, ImageArchive, MtlFile, Region};

pub use pipeline::{LstPipeline, ProcessingConfig, SensorConstants, Variant};

pub use viz::{render_series, ColorRamp, DisplayRange, LogSink, MapSink};
