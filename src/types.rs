use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Real-valued pixel data. Missing observations are `f32::NAN`.
pub type PixelValue = f32;

/// 2D grid of pixel values for one band (rows x cols)
pub type BandGrid = Array2<PixelValue>;

/// Sentinel pixel value for "no data"
pub const NO_DATA: PixelValue = f32::NAN;

/// Named raster bands, raw and derived.
///
/// Derived bands carry fixed physical units: `Radiance` is spectral radiance
/// (W/(m^2 sr um)), `BrightnessTemp` and `LstKelvin` are Kelvin, `LstCelsius`
/// is degrees Celsius, `Ndvi`/`Fvc`/`Lai`/`Emissivity` are unitless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    /// Red reflectance band (raw DN or calibrated reflectance)
    Red,
    /// Near-infrared reflectance band (raw DN or calibrated reflectance)
    Nir,
    /// Thermal band (raw DN, scaled surface temperature, or scaled radiance)
    Thermal,
    /// Bit-encoded pixel quality flags
    QaPixel,
    /// Calibrated thermal radiance
    Radiance,
    /// At-sensor brightness temperature (Kelvin)
    BrightnessTemp,
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Fractional vegetation cover, clamped to [0, 1]
    Fvc,
    /// Leaf area index
    Lai,
    /// Surface emissivity, clamped to (0, 1]
    Emissivity,
    /// Land surface temperature (Kelvin)
    LstKelvin,
    /// Land surface temperature (Celsius)
    LstCelsius,
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Thermal => "thermal",
            Band::QaPixel => "qa_pixel",
            Band::Radiance => "radiance",
            Band::BrightnessTemp => "brightness_temp_k",
            Band::Ndvi => "ndvi",
            Band::Fvc => "fvc",
            Band::Lai => "lai",
            Band::Emissivity => "emissivity",
            Band::LstKelvin => "lst_k",
            Band::LstCelsius => "lst_c",
        };
        write!(f, "{}", name)
    }
}

/// A multi-band raster over a fixed spatial grid.
///
/// Rasters are immutable once produced by a pipeline stage; stages that add a
/// band return a new `Raster` with the prior bands unchanged.
#[derive(Debug, Clone)]
pub struct Raster {
    shape: (usize, usize),
    bands: HashMap<Band, BandGrid>,
}

impl Raster {
    /// Create a raster from a single band
    pub fn from_band(band: Band, grid: BandGrid) -> Self {
        let shape = grid.dim();
        let mut bands = HashMap::new();
        bands.insert(band, grid);
        Self { shape, bands }
    }

    /// Create a raster from several bands; all grids must share one shape
    pub fn from_bands<I>(bands: I) -> LstResult<Self>
    where
        I: IntoIterator<Item = (Band, BandGrid)>,
    {
        let mut iter = bands.into_iter();
        let (first_band, first_grid) = iter.next().ok_or_else(|| {
            LstError::Processing("raster must contain at least one band".to_string())
        })?;
        let mut raster = Raster::from_band(first_band, first_grid);
        for (band, grid) in iter {
            raster = raster.with_band(band, grid)?;
        }
        Ok(raster)
    }

    /// Grid dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Look up a band grid by name
    pub fn band(&self, band: Band) -> Option<&BandGrid> {
        self.bands.get(&band)
    }

    /// Look up a band grid, failing with a processing error when absent
    pub fn expect_band(&self, band: Band) -> LstResult<&BandGrid> {
        self.band(band)
            .ok_or_else(|| LstError::Processing(format!("raster is missing band '{}'", band)))
    }

    /// Return a new raster with `band` added (or replaced)
    pub fn with_band(&self, band: Band, grid: BandGrid) -> LstResult<Raster> {
        if grid.dim() != self.shape {
            return Err(LstError::Processing(format!(
                "band '{}' shape {:?} does not match raster shape {:?}",
                band,
                grid.dim(),
                self.shape
            )));
        }
        let mut bands = self.bands.clone();
        bands.insert(band, grid);
        Ok(Raster {
            shape: self.shape,
            bands,
        })
    }

    /// Iterate over (band, grid) pairs
    pub fn bands(&self) -> impl Iterator<Item = (Band, &BandGrid)> {
        self.bands.iter().map(|(b, g)| (*b, g))
    }

    /// Names of all bands present
    pub fn band_names(&self) -> Vec<Band> {
        self.bands.keys().copied().collect()
    }
}

/// Per-acquisition calibration metadata, keyed the way Landsat MTL files key
/// it (`RADIANCE_MULT_BAND_*`, `K1_CONSTANT_BAND_*`, `CLOUD_COVER`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    values: HashMap<String, f64>,
}

impl CalibrationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a numeric metadata value
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Look up a metadata value by key
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Look up a required metadata value, reporting which acquisition lacks it
    pub fn require(&self, key: &str, acquisition: &str) -> LstResult<f64> {
        self.get(key).ok_or_else(|| LstError::MissingMetadata {
            key: key.to_string(),
            acquisition: acquisition.to_string(),
        })
    }

    /// Multiplicative radiance rescaling coefficient for a thermal band
    pub fn radiance_mult(&self, band: u8) -> Option<f64> {
        self.get(&format!("RADIANCE_MULT_BAND_{}", band))
    }

    /// Additive radiance rescaling coefficient for a thermal band
    pub fn radiance_add(&self, band: u8) -> Option<f64> {
        self.get(&format!("RADIANCE_ADD_BAND_{}", band))
    }

    /// Inverse-Planck K1 constant for a thermal band
    pub fn k1_constant(&self, band: u8) -> Option<f64> {
        self.get(&format!("K1_CONSTANT_BAND_{}", band))
    }

    /// Inverse-Planck K2 constant for a thermal band
    pub fn k2_constant(&self, band: u8) -> Option<f64> {
        self.get(&format!("K2_CONSTANT_BAND_{}", band))
    }

    /// Scene cloud cover percentage
    pub fn cloud_cover(&self) -> Option<f64> {
        self.get("CLOUD_COVER")
    }
}

/// One satellite scene: a raster plus its calibration metadata.
///
/// Acquisitions are produced by the archive collaborator and are read-only to
/// the processing core.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Scene identifier (product ID)
    pub id: String,
    /// Acquisition timestamp
    pub acquired: DateTime<Utc>,
    /// Scene cloud cover percentage
    pub cloud_cover: f32,
    /// Band data clipped to the target region
    pub raster: Raster,
    /// Per-scene calibration constants
    pub metadata: CalibrationMetadata,
}

/// All qualifying acquisitions for one calendar year, ordered by date
#[derive(Debug, Clone)]
pub struct Collection {
    pub year: i32,
    pub acquisitions: Vec<Acquisition>,
}

impl Collection {
    /// Build a collection, ordering acquisitions by date
    pub fn new(year: i32, mut acquisitions: Vec<Acquisition>) -> Self {
        acquisitions.sort_by_key(|a| a.acquired);
        Self { year, acquisitions }
    }

    pub fn len(&self) -> usize {
        self.acquisitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquisitions.is_empty()
    }
}

/// Outcome of processing one calendar year.
///
/// A year with no usable observations is a first-class `NoData` value, not a
/// raster with zero bands.
#[derive(Debug, Clone)]
pub enum YearResult {
    /// Aggregated temperature raster for the year
    Composite { year: i32, raster: Raster },
    /// No acquisitions survived filtering, or every pixel was invalid
    NoData { year: i32 },
}

impl YearResult {
    pub fn year(&self) -> i32 {
        match self {
            YearResult::Composite { year, .. } => *year,
            YearResult::NoData { year } => *year,
        }
    }

    pub fn raster(&self) -> Option<&Raster> {
        match self {
            YearResult::Composite { raster, .. } => Some(raster),
            YearResult::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, YearResult::NoData { .. })
    }
}

/// Error types for LST processing
#[derive(Debug, thiserror::Error)]
pub enum LstError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("acquisition '{acquisition}' is missing calibration metadata '{key}'")]
    MissingMetadata { key: String, acquisition: String },

    #[error("no acquisitions for year {year} after filtering")]
    EmptyCollection { year: i32 },

    #[error("archive fetch failed: {0}")]
    Fetch(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for LST operations
pub type LstResult<T> = Result<T, LstError>;
