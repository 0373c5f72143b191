use crate::types::{Band, BandGrid, LstResult, Raster, NO_DATA};
use ndarray::{Array2, Zip};

/// QA_PIXEL bit flagging cloud
pub const CLOUD_BIT: u16 = 1 << 3;
/// QA_PIXEL bit flagging cloud shadow
pub const CLOUD_SHADOW_BIT: u16 = 1 << 4;

/// Cloud/shadow masking processor.
///
/// A pixel is valid iff none of the configured quality bits are set in the
/// bit-encoded QA band.
#[derive(Debug, Clone, Copy)]
pub struct CloudMasker {
    bits: u16,
}

impl Default for CloudMasker {
    fn default() -> Self {
        Self {
            bits: CLOUD_BIT | CLOUD_SHADOW_BIT,
        }
    }
}

impl CloudMasker {
    /// Masker rejecting a custom set of QA bits
    pub fn with_bits(bits: u16) -> Self {
        Self { bits }
    }

    /// Derive the per-pixel validity mask from a QA band.
    ///
    /// QA values ride in the shared float grid; a non-finite QA value means
    /// the pixel has no quality information and is treated as invalid.
    pub fn validity_mask(&self, qa: &BandGrid) -> Array2<bool> {
        Zip::from(qa).map_collect(|&v| v.is_finite() && (v as u16) & self.bits == 0)
    }

    /// Mask every band of a raster uniformly.
    ///
    /// Invalid pixels become no-data in all bands at once; partial per-band
    /// masking is not permitted, so masked and unmasked bands never mix
    /// downstream.
    pub fn apply(&self, raster: &Raster) -> LstResult<Raster> {
        let qa = raster.expect_band(Band::QaPixel)?;
        let valid = self.validity_mask(qa);

        let masked_total = valid.iter().filter(|&&v| !v).count();
        log::debug!(
            "masking {} of {} pixels (cloud/shadow bits {:#06b})",
            masked_total,
            valid.len(),
            self.bits
        );

        let bands = raster.bands().map(|(band, grid)| {
            let masked = Zip::from(grid)
                .and(&valid)
                .map_collect(|&v, &ok| if ok { v } else { NO_DATA });
            (band, masked)
        });
        Raster::from_bands(bands.collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validity_requires_both_bits_clear() {
        let masker = CloudMasker::default();
        let qa = array![[
            0.0_f32,
            CLOUD_BIT as f32,
            CLOUD_SHADOW_BIT as f32,
            (CLOUD_BIT | CLOUD_SHADOW_BIT) as f32,
        ]];
        let valid = masker.validity_mask(&qa);
        assert_eq!(valid[[0, 0]], true);
        assert_eq!(valid[[0, 1]], false);
        assert_eq!(valid[[0, 2]], false);
        assert_eq!(valid[[0, 3]], false);
    }

    #[test]
    fn test_unrelated_bits_do_not_mask() {
        let masker = CloudMasker::default();
        // dilated-cloud bit (bit 1) alone must not invalidate the pixel
        let qa = array![[2.0_f32]];
        let valid = masker.validity_mask(&qa);
        assert!(valid[[0, 0]]);
    }

    #[test]
    fn test_mask_applies_to_every_band() {
        let masker = CloudMasker::default();
        let raster = Raster::from_bands(vec![
            (Band::Thermal, array![[100.0_f32, 200.0]]),
            (Band::Red, array![[0.1_f32, 0.2]]),
            (Band::QaPixel, array![[0.0_f32, CLOUD_BIT as f32]]),
        ])
        .unwrap();

        let masked = masker.apply(&raster).unwrap();
        for band in [Band::Thermal, Band::Red] {
            let grid = masked.band(band).unwrap();
            assert!(grid[[0, 0]].is_finite());
            assert!(grid[[0, 1]].is_nan());
        }
    }

    #[test]
    fn test_missing_qa_band_is_an_error() {
        let masker = CloudMasker::default();
        let raster = Raster::from_band(Band::Thermal, array![[100.0_f32]]);
        assert!(masker.apply(&raster).is_err());
    }
}
