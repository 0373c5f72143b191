use crate::types::{BandGrid, LstError, LstResult, NO_DATA};
use ndarray::Zip;

/// Effective emitted wavelength of the thermal band (meters * 1e-2 scale used
/// by the single-channel equation)
pub const WAVELENGTH: f32 = 0.00104;
/// `h * c / k_B` term of the single-channel equation
pub const ALPHA: f32 = 0.483_595_47;

/// Offset between the Kelvin and Celsius scales
pub const KELVIN_OFFSET: f32 = 273.15;

/// Convert a Kelvin band to Celsius, preserving no-data
pub fn kelvin_to_celsius(kelvin: &BandGrid) -> BandGrid {
    kelvin.mapv(|v| if v.is_finite() { v - KELVIN_OFFSET } else { NO_DATA })
}

/// Convert a Celsius band to Kelvin, preserving no-data
pub fn celsius_to_kelvin(celsius: &BandGrid) -> BandGrid {
    celsius.mapv(|v| if v.is_finite() { v + KELVIN_OFFSET } else { NO_DATA })
}

/// Emissivity-corrected land surface temperature compositor.
///
/// `TST_K = Tb / (1 + (lambda / alpha) * Tb * ln(em))`. An emissivity of
/// exactly 1 makes the correction term vanish and degenerates to `TST_K = Tb`,
/// which is the expected physical behavior, not an error.
#[derive(Debug, Clone, Copy)]
pub struct LstCompositor {
    wavelength: f32,
    alpha: f32,
}

impl Default for LstCompositor {
    fn default() -> Self {
        Self {
            wavelength: WAVELENGTH,
            alpha: ALPHA,
        }
    }
}

impl LstCompositor {
    pub fn with_constants(wavelength: f32, alpha: f32) -> Self {
        Self { wavelength, alpha }
    }

    /// Combine brightness temperature (Kelvin) and emissivity into land
    /// surface temperature (Kelvin)
    pub fn surface_temperature(
        &self,
        brightness: &BandGrid,
        emissivity: &BandGrid,
    ) -> LstResult<BandGrid> {
        if brightness.dim() != emissivity.dim() {
            return Err(LstError::Processing(format!(
                "brightness shape {:?} does not match emissivity shape {:?}",
                brightness.dim(),
                emissivity.dim()
            )));
        }
        let ratio = self.wavelength / self.alpha;
        Ok(Zip::from(brightness).and(emissivity).map_collect(|&tb, &em| {
            if !tb.is_finite() || !em.is_finite() || em <= 0.0 {
                NO_DATA
            } else {
                tb / (1.0 + ratio * tb * em.ln())
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_surface_temperature_equation() {
        let compositor = LstCompositor::default();
        let tb = array![[288.8_f32]];
        let em = array![[0.98_f32]];
        let tst = compositor.surface_temperature(&tb, &em).unwrap();

        let expected = 288.8_f64 / (1.0 + (0.00104 / 0.48359547432) * 288.8 * 0.98_f64.ln());
        assert_relative_eq!(tst[[0, 0]], expected as f32, epsilon = 1e-3);
        // ln(em) < 0, so the corrected temperature sits above Tb
        assert!(tst[[0, 0]] > tb[[0, 0]]);
    }

    #[test]
    fn test_unit_emissivity_degenerates_to_brightness() {
        let compositor = LstCompositor::default();
        let tb = array![[288.8_f32]];
        let em = array![[1.0_f32]];
        let tst = compositor.surface_temperature(&tb, &em).unwrap();
        assert_relative_eq!(tst[[0, 0]], 288.8, epsilon = 1e-5);
    }

    #[test]
    fn test_no_data_propagates() {
        let compositor = LstCompositor::default();
        let tb = array![[f32::NAN, 288.8]];
        let em = array![[0.98_f32, f32::NAN]];
        let tst = compositor.surface_temperature(&tb, &em).unwrap();
        assert!(tst.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_kelvin_celsius_round_trip() {
        let kelvin = array![[0.0_f32, 273.15, 307.8, 1000.0]];
        let back = celsius_to_kelvin(&kelvin_to_celsius(&kelvin));
        for (&a, &b) in kelvin.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-4);
        }
    }
}
