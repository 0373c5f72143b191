use crate::types::{Band, Raster, YearResult};

/// Display stretch for rendered temperature layers, in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DisplayRange {
    fn default() -> Self {
        Self { min: 10.0, max: 40.0 }
    }
}

/// Ordered color ramp for temperature rendering
#[derive(Debug, Clone)]
pub struct ColorRamp(pub Vec<String>);

impl Default for ColorRamp {
    fn default() -> Self {
        Self(
            ["blue", "cyan", "green", "yellow", "red"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

/// Visualization/export collaborator.
///
/// Receives one named temperature layer per year, or a diagnostic notice for
/// years without data. Computation is finished before any of this runs.
pub trait MapSink {
    fn add_layer(&mut self, label: &str, raster: &Raster, range: DisplayRange, ramp: &ColorRamp);
    fn report_no_data(&mut self, year: i32);
}

/// Sink that reports layers through the log, for headless runs
#[derive(Debug, Default)]
pub struct LogSink;

impl MapSink for LogSink {
    fn add_layer(&mut self, label: &str, raster: &Raster, range: DisplayRange, _ramp: &ColorRamp) {
        log::info!(
            "layer '{}': {:?} raster, display range [{}, {}] C",
            label,
            raster.shape(),
            range.min,
            range.max
        );
    }

    fn report_no_data(&mut self, year: i32) {
        log::info!("no data for year {}", year);
    }
}

/// Hand a computed time series to the visualization collaborator, one layer
/// per year with data and a diagnostic for the rest
pub fn render_series<S: MapSink>(sink: &mut S, results: &[YearResult]) {
    let ramp = ColorRamp::default();
    for result in results {
        match result.raster() {
            Some(raster) if raster.band(Band::LstCelsius).is_some() => {
                let label = format!("LST {}", result.year());
                sink.add_layer(&label, raster, DisplayRange::default(), &ramp);
            }
            _ => sink.report_no_data(result.year()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use crate::types::Raster;

    #[derive(Default)]
    struct RecordingSink {
        layers: Vec<String>,
        no_data_years: Vec<i32>,
    }

    impl MapSink for RecordingSink {
        fn add_layer(&mut self, label: &str, _r: &Raster, _range: DisplayRange, _ramp: &ColorRamp) {
            self.layers.push(label.to_string());
        }

        fn report_no_data(&mut self, year: i32) {
            self.no_data_years.push(year);
        }
    }

    #[test]
    fn test_render_series_splits_layers_and_diagnostics() {
        let raster = Raster::from_band(Band::LstCelsius, array![[25.0_f32]]);
        let results = vec![
            YearResult::Composite { year: 1990, raster },
            YearResult::NoData { year: 1991 },
        ];

        let mut sink = RecordingSink::default();
        render_series(&mut sink, &results);

        assert_eq!(sink.layers, vec!["LST 1990".to_string()]);
        assert_eq!(sink.no_data_years, vec![1991]);
    }
}
