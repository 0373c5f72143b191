use crate::core::aggregate::median_stack;
use crate::core::calibrate::{
    self, CalibrationMode, RadiometricCalibrator, REFLECTANCE_OFFSET, REFLECTANCE_SCALE,
};
use crate::core::compositor::{self, kelvin_to_celsius, LstCompositor};
use crate::core::{CloudMasker, EmissivityEstimator, TemperatureResolver, TemporalAggregator};
use crate::io::{fetch_with_retry, ArchiveQuery, DateRange, ImageArchive, Region};
use crate::types::{
    Acquisition, Band, BandGrid, Collection, LstError, LstResult, Raster, YearResult,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum scene cloud cover percentage
pub const DEFAULT_CLOUD_COVER_THRESHOLD: f32 = 30.0;
/// Default bounded retry count for archive fetches
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
/// Default initial fetch retry backoff
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_millis(500);

/// The three retrieval variants share one parameterized pipeline; they differ
/// only in thermal calibration, temperature strategy, and whether emissivity
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Raw thermal DN -> radiance (per-scene ML/AL) -> inverse Planck ->
    /// emissivity-corrected LST
    DnRadiance,
    /// Pre-scaled surface temperature band used directly; no emissivity
    /// correction
    SurfaceTempBand,
    /// Pre-scaled thermal radiance band -> inverse Planck ->
    /// emissivity-corrected LST
    TradRadiance,
}

/// Sensor-specific calibration constants for one variant family
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorConstants {
    /// MTL band number carrying the thermal constants (6 for TM, 10 for TIRS)
    pub thermal_band: u8,
    /// Fallback inverse-Planck K1 when the scene metadata lacks it
    pub k1: Option<f32>,
    /// Fallback inverse-Planck K2 when the scene metadata lacks it
    pub k2: Option<f32>,
    /// Surface-temperature band scale (DN -> Kelvin)
    pub st_scale: f32,
    /// Surface-temperature band offset (Kelvin)
    pub st_offset: f32,
    /// Reflectance band scale
    pub refl_scale: f32,
    /// Reflectance band offset
    pub refl_offset: f32,
    /// Thermal radiance (ST_TRAD) band scale
    pub trad_scale: f32,
    /// Effective thermal wavelength for the single-channel equation
    pub wavelength: f32,
    /// h*c/k_B term of the single-channel equation
    pub alpha: f32,
}

impl Default for SensorConstants {
    fn default() -> Self {
        Self {
            thermal_band: 6,
            k1: None,
            k2: None,
            st_scale: calibrate::ST_SCALE,
            st_offset: calibrate::ST_OFFSET,
            refl_scale: REFLECTANCE_SCALE,
            refl_offset: REFLECTANCE_OFFSET,
            trad_scale: calibrate::TRAD_SCALE,
            wavelength: compositor::WAVELENGTH,
            alpha: compositor::ALPHA,
        }
    }
}

/// Full configuration surface for a time-series run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Archive collection identifier
    pub collection_id: String,
    /// Opaque spatial boundary, handed through to the archive
    pub region: Region,
    pub start_year: i32,
    pub end_year: i32,
    /// Maximum acceptable scene cloud cover percentage
    pub cloud_cover_threshold: f32,
    pub variant: Variant,
    pub sensor: SensorConstants,
    /// Bounded retry count for archive fetches
    pub fetch_attempts: u32,
    /// Initial retry backoff, doubled per attempt
    pub fetch_backoff: Duration,
}

impl ProcessingConfig {
    /// Configuration with standard defaults for everything but the run identity
    pub fn new(
        collection_id: impl Into<String>,
        region: Region,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            region,
            start_year,
            end_year,
            cloud_cover_threshold: DEFAULT_CLOUD_COVER_THRESHOLD,
            variant: Variant::DnRadiance,
            sensor: SensorConstants::default(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_backoff: DEFAULT_FETCH_BACKOFF,
        }
    }
}

/// One acquisition after calibration, masking, and temperature resolution
struct PreparedScene {
    id: String,
    /// Masked calibrated (NIR, RED) reflectance, for emissivity-bearing
    /// variants
    reflectance: Option<(BandGrid, BandGrid)>,
    /// Brightness temperature in Kelvin
    brightness: BandGrid,
}

/// Per-year LST retrieval pipeline.
///
/// For each configured year: fetch -> filter -> calibrate -> mask ->
/// {emissivity branch | temperature branch} -> composite -> aggregate.
/// Failures at any per-acquisition stage remove only that acquisition; a
/// failed year emits `NoData` and never aborts the run.
pub struct LstPipeline {
    config: ProcessingConfig,
    masker: CloudMasker,
    compositor: LstCompositor,
    aggregator: TemporalAggregator,
}

impl LstPipeline {
    pub fn new(config: ProcessingConfig) -> Self {
        let compositor =
            LstCompositor::with_constants(config.sensor.wavelength, config.sensor.alpha);
        Self {
            config,
            masker: CloudMasker::default(),
            compositor,
            aggregator: TemporalAggregator,
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Process every configured year, in order.
    ///
    /// Always returns one result per year; a year that fails outright is
    /// reported as `NoData` so the rest of the time series still completes.
    pub fn process_range<A: ImageArchive>(&self, archive: &A) -> Vec<YearResult> {
        (self.config.start_year..=self.config.end_year)
            .map(|year| match self.process_year(archive, year) {
                Ok(result) => {
                    if result.is_no_data() {
                        log::info!("year {}: no data", year);
                    } else {
                        log::info!("year {}: composite ready", year);
                    }
                    result
                }
                Err(err) => {
                    log::warn!("year {}: processing failed ({}), reporting no data", year, err);
                    YearResult::NoData { year }
                }
            })
            .collect()
    }

    /// Process a single calendar year into a `YearResult`
    pub fn process_year<A: ImageArchive>(&self, archive: &A, year: i32) -> LstResult<YearResult> {
        let query = ArchiveQuery {
            collection_id: self.config.collection_id.clone(),
            dates: DateRange::calendar_year(year),
            region: self.config.region.clone(),
            max_cloud_cover: self.config.cloud_cover_threshold,
        };

        let acquisitions = match fetch_with_retry(
            archive,
            &query,
            self.config.fetch_attempts,
            self.config.fetch_backoff,
        ) {
            Ok(acquisitions) => acquisitions,
            Err(LstError::Fetch(reason)) => {
                log::warn!(
                    "year {}: archive unreachable after {} attempts ({}), treating as empty",
                    year,
                    self.config.fetch_attempts,
                    reason
                );
                return Ok(YearResult::NoData { year });
            }
            Err(err) => return Err(err),
        };

        // The archive already filters; re-check so a lax implementation can
        // never leak cloudy or out-of-range scenes into the collection.
        let filtered: Vec<Acquisition> = acquisitions
            .into_iter()
            .filter(|a| {
                a.cloud_cover <= self.config.cloud_cover_threshold
                    && query.dates.contains(a.acquired.date_naive())
            })
            .collect();
        let collection = Collection::new(year, filtered);
        if collection.is_empty() {
            log::info!("year {}: collection empty after filtering", year);
            return Ok(YearResult::NoData { year });
        }
        log::info!(
            "year {}: processing {} acquisitions ({:?} variant)",
            year,
            collection.len(),
            self.config.variant
        );

        // Phase 1: per-acquisition calibration, masking, and brightness
        // temperature. Acquisitions are independent here.
        #[cfg(feature = "parallel")]
        let prepared: Vec<PreparedScene> = {
            use rayon::prelude::*;
            collection
                .acquisitions
                .par_iter()
                .filter_map(|a| self.prepare_scene_logged(a))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let prepared: Vec<PreparedScene> = collection
            .acquisitions
            .iter()
            .filter_map(|a| self.prepare_scene_logged(a))
            .collect();

        if prepared.is_empty() {
            log::warn!("year {}: every acquisition was excluded", year);
            return Ok(YearResult::NoData { year });
        }

        // Phase 2: one emissivity raster from the year's median reflectance
        // composite, shared by every acquisition. Must complete before any
        // per-acquisition composite.
        let emissivity = if self.uses_emissivity() {
            let nir_stack: Vec<&BandGrid> = prepared
                .iter()
                .filter_map(|p| p.reflectance.as_ref().map(|(nir, _)| nir))
                .collect();
            let red_stack: Vec<&BandGrid> = prepared
                .iter()
                .filter_map(|p| p.reflectance.as_ref().map(|(_, red)| red))
                .collect();
            let nir_median = median_stack(&nir_stack)?;
            let red_median = median_stack(&red_stack)?;
            let vegetation = EmissivityEstimator.estimate(&nir_median, &red_median)?;
            Some(vegetation.expect_band(Band::Emissivity)?.clone())
        } else {
            None
        };

        // Phase 3: per-acquisition LST composite
        let results: LstResult<Vec<Raster>> = prepared
            .iter()
            .map(|scene| {
                log::debug!("compositing scene '{}'", scene.id);
                let kelvin = match &emissivity {
                    Some(em) => self.compositor.surface_temperature(&scene.brightness, em)?,
                    // ST-band variant: the calibrated temperature is emitted
                    // directly under the same output bands
                    None => scene.brightness.clone(),
                };
                let celsius = kelvin_to_celsius(&kelvin);
                Raster::from_bands(vec![(Band::LstKelvin, kelvin), (Band::LstCelsius, celsius)])
            })
            .collect();

        self.aggregator.aggregate(year, &results?)
    }

    fn uses_emissivity(&self) -> bool {
        !matches!(self.config.variant, Variant::SurfaceTempBand)
    }

    /// Per-acquisition failures drop the acquisition, logged, never fatal
    fn prepare_scene_logged(&self, acquisition: &Acquisition) -> Option<PreparedScene> {
        match self.prepare_scene(acquisition) {
            Ok(prepared) => Some(prepared),
            Err(err) => {
                log::warn!("excluding acquisition '{}': {}", acquisition.id, err);
                None
            }
        }
    }

    /// Calibrate, mask, and resolve brightness temperature for one scene
    fn prepare_scene(&self, acquisition: &Acquisition) -> LstResult<PreparedScene> {
        let sensor = &self.config.sensor;
        let fallback = sensor.k1.zip(sensor.k2);

        let (thermal_cal, resolver) = match self.config.variant {
            Variant::DnRadiance => (
                RadiometricCalibrator::radiance_from_metadata(
                    &acquisition.metadata,
                    sensor.thermal_band,
                    &acquisition.id,
                )?,
                TemperatureResolver::from_metadata(
                    &acquisition.metadata,
                    sensor.thermal_band,
                    fallback,
                    &acquisition.id,
                )?,
            ),
            Variant::SurfaceTempBand => (
                RadiometricCalibrator::new(CalibrationMode::SurfaceTemperature {
                    scale: sensor.st_scale,
                    offset: sensor.st_offset,
                }),
                TemperatureResolver::pass_through(),
            ),
            Variant::TradRadiance => (
                RadiometricCalibrator::scaled_radiance(sensor.trad_scale),
                TemperatureResolver::from_metadata(
                    &acquisition.metadata,
                    sensor.thermal_band,
                    fallback,
                    &acquisition.id,
                )?,
            ),
        };

        let thermal = thermal_cal.apply(acquisition.raster.expect_band(Band::Thermal)?);
        let qa = acquisition.raster.expect_band(Band::QaPixel)?.clone();
        let mut bands = vec![(Band::Thermal, thermal), (Band::QaPixel, qa)];

        if self.uses_emissivity() {
            let reflectance_cal = RadiometricCalibrator::new(CalibrationMode::Reflectance {
                scale: sensor.refl_scale,
                offset: sensor.refl_offset,
            });
            bands.push((
                Band::Nir,
                reflectance_cal.apply(acquisition.raster.expect_band(Band::Nir)?),
            ));
            bands.push((
                Band::Red,
                reflectance_cal.apply(acquisition.raster.expect_band(Band::Red)?),
            ));
        }

        let calibrated = Raster::from_bands(bands)?;
        let masked = self.masker.apply(&calibrated)?;

        let brightness = resolver.resolve(masked.expect_band(Band::Thermal)?);
        let reflectance = if self.uses_emissivity() {
            Some((
                masked.expect_band(Band::Nir)?.clone(),
                masked.expect_band(Band::Red)?.clone(),
            ))
        } else {
            None
        };

        Ok(PreparedScene {
            id: acquisition.id.clone(),
            reflectance,
            brightness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProcessingConfig::new(
            "LANDSAT/LT05/C02/T1_L2",
            Region::new("study-area"),
            1990,
            2020,
        );
        assert_eq!(config.cloud_cover_threshold, DEFAULT_CLOUD_COVER_THRESHOLD);
        assert_eq!(config.variant, Variant::DnRadiance);
        assert_eq!(config.fetch_attempts, DEFAULT_FETCH_ATTEMPTS);
        assert_eq!(config.sensor.thermal_band, 6);
    }

    #[test]
    fn test_st_band_variant_skips_emissivity() {
        let mut config =
            ProcessingConfig::new("LANDSAT/LC08/C02/T1_L2", Region::new("r"), 2015, 2015);
        config.variant = Variant::SurfaceTempBand;
        let pipeline = LstPipeline::new(config);
        assert!(!pipeline.uses_emissivity());
    }
}
