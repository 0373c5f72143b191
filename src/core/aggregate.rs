use crate::types::{Band, BandGrid, LstResult, Raster, YearResult, NO_DATA};
use ndarray::Array2;
use num_traits::Float;

/// Median of a slice of finite values.
///
/// For an even count the conventional average of the two middle values is
/// used, so the reduction has no tie-breaking ambiguity. Returns `None` for
/// an empty slice.
pub fn median<T: Float>(values: &mut [T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    // Finite values admit a total order
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        let two = T::one() + T::one();
        Some((values[mid - 1] + values[mid]) / two)
    }
}

/// Per-pixel median across a stack of band grids.
///
/// Invalid (no-data) observations never contribute; a pixel with no valid
/// observation in the whole stack is no-data in the composite.
pub fn median_stack(stack: &[&BandGrid]) -> LstResult<BandGrid> {
    let first = stack.first().ok_or_else(|| {
        crate::types::LstError::Processing("median over an empty stack".to_string())
    })?;
    let shape = first.dim();
    for grid in stack {
        if grid.dim() != shape {
            return Err(crate::types::LstError::Processing(format!(
                "stack grid shape {:?} does not match {:?}",
                grid.dim(),
                shape
            )));
        }
    }

    Ok(Array2::from_shape_fn(shape, |(row, col)| {
        let mut values: Vec<f32> = stack
            .iter()
            .map(|grid| grid[[row, col]])
            .filter(|v| v.is_finite())
            .collect();
        median(&mut values).unwrap_or(NO_DATA)
    }))
}

/// Reduces one year's per-acquisition result rasters to a single composite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalAggregator;

impl TemporalAggregator {
    /// Aggregate every band shared by the input rasters, per pixel, to its
    /// median across valid observations.
    ///
    /// An empty collection, or one where every pixel of every band is
    /// invalid, yields the explicit `NoData` year result.
    pub fn aggregate(&self, year: i32, rasters: &[Raster]) -> LstResult<YearResult> {
        let Some(first) = rasters.first() else {
            log::info!("year {}: no rasters to aggregate", year);
            return Ok(YearResult::NoData { year });
        };

        let mut composite_bands: Vec<(Band, BandGrid)> = Vec::new();
        let mut any_valid = false;
        for band in first.band_names() {
            let stack: Vec<&BandGrid> = rasters.iter().filter_map(|r| r.band(band)).collect();
            let composite = median_stack(&stack)?;
            any_valid |= composite.iter().any(|v| v.is_finite());
            composite_bands.push((band, composite));
        }

        if !any_valid {
            log::info!("year {}: every pixel invalid across all acquisitions", year);
            return Ok(YearResult::NoData { year });
        }

        log::info!(
            "year {}: aggregated {} acquisitions into {} bands",
            year,
            rasters.len(),
            composite_bands.len()
        );
        Ok(YearResult::Composite {
            year,
            raster: Raster::from_bands(composite_bands)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_median_odd_count_is_middle_value() {
        let mut values = [3.0_f32, 1.0, 2.0];
        assert_relative_eq!(median(&mut values).unwrap(), 2.0);
    }

    #[test]
    fn test_median_even_count_averages_middle_pair() {
        let mut values = [4.0_f32, 1.0, 3.0, 2.0];
        assert_relative_eq!(median(&mut values).unwrap(), 2.5);
    }

    #[test]
    fn test_median_empty_is_none() {
        let mut values: [f32; 0] = [];
        assert!(median(&mut values).is_none());
    }

    #[test]
    fn test_stack_skips_invalid_observations() {
        let a = array![[10.0_f32, f32::NAN]];
        let b = array![[30.0_f32, f32::NAN]];
        let c = array![[20.0_f32, f32::NAN]];
        let composite = median_stack(&[&a, &b, &c]).unwrap();
        assert_relative_eq!(composite[[0, 0]], 20.0);
        assert!(composite[[0, 1]].is_nan());
    }

    #[test]
    fn test_partially_valid_pixel_uses_valid_subset() {
        let a = array![[10.0_f32]];
        let b = array![[f32::NAN]];
        let c = array![[14.0_f32]];
        let composite = median_stack(&[&a, &b, &c]).unwrap();
        // even count after dropping the invalid observation
        assert_relative_eq!(composite[[0, 0]], 12.0);
    }

    #[test]
    fn test_aggregate_empty_collection_is_no_data() {
        let result = TemporalAggregator.aggregate(1990, &[]).unwrap();
        assert!(result.is_no_data());
        assert_eq!(result.year(), 1990);
    }

    #[test]
    fn test_aggregate_all_invalid_is_no_data() {
        let raster = Raster::from_band(Band::LstCelsius, array![[f32::NAN, f32::NAN]]);
        let result = TemporalAggregator
            .aggregate(1991, &[raster.clone(), raster])
            .unwrap();
        assert!(result.is_no_data());
    }

    #[test]
    fn test_aggregate_reduces_each_band() {
        let mk = |t: f32| {
            Raster::from_bands(vec![
                (Band::LstKelvin, array![[t + 273.15]]),
                (Band::LstCelsius, array![[t]]),
            ])
            .unwrap()
        };
        let result = TemporalAggregator
            .aggregate(1992, &[mk(30.0), mk(34.0), mk(32.0)])
            .unwrap();
        let raster = result.raster().unwrap();
        assert_relative_eq!(raster.band(Band::LstCelsius).unwrap()[[0, 0]], 32.0);
        assert_relative_eq!(
            raster.band(Band::LstKelvin).unwrap()[[0, 0]],
            32.0 + 273.15
        );
    }
}
