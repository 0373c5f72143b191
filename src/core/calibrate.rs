use crate::types::{BandGrid, CalibrationMetadata, LstResult, NO_DATA};
use ndarray::Zip;

/// Collection 2 Level-2 surface temperature scale factor (DN -> Kelvin)
pub const ST_SCALE: f32 = 0.003_418_02;
/// Collection 2 Level-2 surface temperature offset (Kelvin)
pub const ST_OFFSET: f32 = 149.0;
/// Collection 2 Level-2 surface reflectance scale factor
pub const REFLECTANCE_SCALE: f32 = 0.000_027_5;
/// Collection 2 Level-2 surface reflectance offset
pub const REFLECTANCE_OFFSET: f32 = -0.2;
/// Collection 2 Level-2 thermal radiance (ST_TRAD) scale factor
pub const TRAD_SCALE: f32 = 0.001;

/// Landsat fill value; calibrates to no-data rather than a physical quantity
pub const FILL_DN: f32 = 0.0;

/// Radiometric calibration modes.
///
/// Each mode is a pure per-pixel affine map from stored digital numbers to a
/// physical quantity.
#[derive(Debug, Clone, Copy)]
pub enum CalibrationMode {
    /// `radiance = ML * DN + AL`, coefficients from acquisition metadata
    Radiance { mult: f32, add: f32 },
    /// `temperature_K = DN * scale + offset`, fixed sensor constants
    SurfaceTemperature { scale: f32, offset: f32 },
    /// `reflectance = DN * scale + offset`, fixed sensor constants
    Reflectance { scale: f32, offset: f32 },
}

/// Radiometric calibration processor
#[derive(Debug, Clone, Copy)]
pub struct RadiometricCalibrator {
    mode: CalibrationMode,
}

impl RadiometricCalibrator {
    pub fn new(mode: CalibrationMode) -> Self {
        Self { mode }
    }

    /// Radiance calibrator from an acquisition's per-scene coefficients.
    ///
    /// Fails with `MissingMetadata` when the scene lacks `RADIANCE_MULT_BAND_n`
    /// or `RADIANCE_ADD_BAND_n`; the caller drops the acquisition and
    /// continues.
    pub fn radiance_from_metadata(
        metadata: &CalibrationMetadata,
        thermal_band: u8,
        acquisition: &str,
    ) -> LstResult<Self> {
        let mult = metadata.require(&format!("RADIANCE_MULT_BAND_{}", thermal_band), acquisition)?;
        let add = metadata.require(&format!("RADIANCE_ADD_BAND_{}", thermal_band), acquisition)?;
        Ok(Self::new(CalibrationMode::Radiance {
            mult: mult as f32,
            add: add as f32,
        }))
    }

    /// Fixed-scale radiance calibrator (for pre-scaled thermal radiance bands)
    pub fn scaled_radiance(scale: f32) -> Self {
        Self::new(CalibrationMode::Radiance {
            mult: scale,
            add: 0.0,
        })
    }

    /// Surface-temperature calibrator with the standard Level-2 constants
    pub fn surface_temperature() -> Self {
        Self::new(CalibrationMode::SurfaceTemperature {
            scale: ST_SCALE,
            offset: ST_OFFSET,
        })
    }

    /// Reflectance calibrator with the standard Level-2 constants
    pub fn reflectance() -> Self {
        Self::new(CalibrationMode::Reflectance {
            scale: REFLECTANCE_SCALE,
            offset: REFLECTANCE_OFFSET,
        })
    }

    /// Apply the affine calibration to every pixel of a band.
    ///
    /// No-data and fill pixels stay no-data; no arithmetic is performed on
    /// missing values.
    pub fn apply(&self, dn: &BandGrid) -> BandGrid {
        let (scale, offset) = match self.mode {
            CalibrationMode::Radiance { mult, add } => (mult, add),
            CalibrationMode::SurfaceTemperature { scale, offset } => (scale, offset),
            CalibrationMode::Reflectance { scale, offset } => (scale, offset),
        };
        log::debug!(
            "calibrating {}x{} band: {:?}",
            dn.nrows(),
            dn.ncols(),
            self.mode
        );

        Zip::from(dn).map_collect(|&v| {
            if !v.is_finite() || v == FILL_DN {
                NO_DATA
            } else {
                v * scale + offset
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CalibrationMetadata;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_radiance_calibration_is_affine() {
        let cal = RadiometricCalibrator::new(CalibrationMode::Radiance {
            mult: 0.055375,
            add: 1.18243,
        });
        let dn = array![[120.0_f32]];
        let radiance = cal.apply(&dn);
        assert_relative_eq!(radiance[[0, 0]], 0.055375 * 120.0 + 1.18243, epsilon = 1e-5);
    }

    #[test]
    fn test_surface_temperature_constants() {
        let cal = RadiometricCalibrator::surface_temperature();
        let dn = array![[44000.0_f32]];
        let kelvin = cal.apply(&dn);
        assert_relative_eq!(kelvin[[0, 0]], 44000.0 * ST_SCALE + ST_OFFSET, epsilon = 1e-3);
    }

    #[test]
    fn test_no_data_and_fill_preserved() {
        let cal = RadiometricCalibrator::reflectance();
        let dn = array![[f32::NAN, 0.0, 10000.0]];
        let refl = cal.apply(&dn);
        assert!(refl[[0, 0]].is_nan());
        assert!(refl[[0, 1]].is_nan());
        assert!(refl[[0, 2]].is_finite());
    }

    #[test]
    fn test_missing_coefficient_is_reported() {
        let mut metadata = CalibrationMetadata::new();
        metadata.insert("RADIANCE_MULT_BAND_6", 0.055375);
        // RADIANCE_ADD_BAND_6 deliberately absent
        let result = RadiometricCalibrator::radiance_from_metadata(&metadata, 6, "LT05_SCENE");
        assert!(result.is_err());
    }
}
