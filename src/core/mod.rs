//! Core LST processing stages

pub mod aggregate;
pub mod brightness;
pub mod calibrate;
pub mod compositor;
pub mod mask;
pub mod vegetation;

// Re-export main types
pub use aggregate::{median, median_stack, TemporalAggregator};
pub use brightness::{TemperatureResolver, TemperatureStrategy};
pub use calibrate::{CalibrationMode, RadiometricCalibrator};
pub use compositor::{celsius_to_kelvin, kelvin_to_celsius, LstCompositor};
pub use mask::{CloudMasker, CLOUD_BIT, CLOUD_SHADOW_BIT};
pub use vegetation::EmissivityEstimator;
