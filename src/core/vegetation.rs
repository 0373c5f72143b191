use crate::types::{Band, BandGrid, LstError, LstResult, Raster, NO_DATA};
use ndarray::Zip;

/// FVC regression gain on NDVI
pub const FVC_GAIN: f32 = 1.1101;
/// FVC regression offset
pub const FVC_OFFSET: f32 = 0.0857;
/// Emissivity of bare soil
pub const EMISSIVITY_BASE: f32 = 0.97;
/// Emissivity gain per unit LAI
pub const EMISSIVITY_LAI_GAIN: f32 = 0.0033;

/// Normalized Difference Vegetation Index: `(NIR - RED) / (NIR + RED)`.
///
/// A zero denominator yields no-data for that pixel rather than an error.
pub fn ndvi(nir: &BandGrid, red: &BandGrid) -> LstResult<BandGrid> {
    if nir.dim() != red.dim() {
        return Err(LstError::Processing(format!(
            "NIR shape {:?} does not match RED shape {:?}",
            nir.dim(),
            red.dim()
        )));
    }
    Ok(Zip::from(nir).and(red).map_collect(|&n, &r| {
        let denom = n + r;
        if !denom.is_finite() || denom == 0.0 {
            NO_DATA
        } else {
            (n - r) / denom
        }
    }))
}

/// Fractional vegetation cover from NDVI, clamped to [0, 1].
///
/// The clamp is the sole mechanism keeping emissivity physically bounded
/// downstream.
pub fn fractional_vegetation_cover(ndvi: &BandGrid) -> BandGrid {
    ndvi.mapv(|v| {
        if v.is_finite() {
            (FVC_GAIN * v - FVC_OFFSET).clamp(0.0, 1.0)
        } else {
            NO_DATA
        }
    })
}

/// Leaf area index from FVC: `-2 * ln(1 - FVC)`.
///
/// FVC of exactly 1 is outside the log domain and becomes no-data instead of
/// a silently propagated infinity.
pub fn leaf_area_index(fvc: &BandGrid) -> BandGrid {
    fvc.mapv(|v| {
        if !v.is_finite() || v >= 1.0 {
            NO_DATA
        } else {
            -2.0 * (1.0 - v).ln()
        }
    })
}

/// Surface emissivity from LAI: `0.97 + 0.0033 * LAI`, clamped to (0, 1]
pub fn emissivity(lai: &BandGrid) -> BandGrid {
    lai.mapv(|v| {
        if v.is_finite() {
            (EMISSIVITY_BASE + EMISSIVITY_LAI_GAIN * v).min(1.0)
        } else {
            NO_DATA
        }
    })
}

/// Vegetation-driven emissivity estimator.
///
/// Runs NDVI -> FVC -> LAI -> emissivity, each stage depending only on the
/// previous. In the yearly pipeline this runs once on the collection's median
/// reflectance composite; the single emissivity raster is shared by every
/// acquisition of that year.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissivityEstimator;

impl EmissivityEstimator {
    /// Derive the full NDVI/FVC/LAI/emissivity band stack from calibrated
    /// reflectance
    pub fn estimate(&self, nir: &BandGrid, red: &BandGrid) -> LstResult<Raster> {
        log::info!("estimating emissivity from {}x{} reflectance composite", nir.nrows(), nir.ncols());

        let ndvi_grid = ndvi(nir, red)?;
        let fvc_grid = fractional_vegetation_cover(&ndvi_grid);
        let lai_grid = leaf_area_index(&fvc_grid);
        let emissivity_grid = emissivity(&lai_grid);

        Raster::from_bands(vec![
            (Band::Ndvi, ndvi_grid),
            (Band::Fvc, fvc_grid),
            (Band::Lai, lai_grid),
            (Band::Emissivity, emissivity_grid),
        ])
    }
}
