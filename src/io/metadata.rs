use crate::types::{CalibrationMetadata, LstError, LstResult};
use chrono::NaiveDate;
use regex::Regex;

/// Parsed Landsat MTL metadata file
#[derive(Debug, Clone)]
pub struct MtlFile {
    /// Numeric calibration constants (`RADIANCE_MULT_BAND_*`, `K1_*`, ...)
    pub calibration: CalibrationMetadata,
    /// `DATE_ACQUIRED`, when present
    pub acquired: Option<NaiveDate>,
}

impl MtlFile {
    /// Parse MTL `KEY = VALUE` text into calibration metadata.
    ///
    /// Numeric values land in the calibration map; non-numeric values are
    /// skipped except for `DATE_ACQUIRED`. A file with no recognizable
    /// entries is rejected rather than returned empty.
    pub fn parse(text: &str) -> LstResult<MtlFile> {
        let line_re = Regex::new(r#"^\s*([A-Z0-9_]+)\s*=\s*"?([^"\r\n]*?)"?\s*$"#)
            .map_err(|e| LstError::InvalidMetadata(format!("regex error: {}", e)))?;

        let mut calibration = CalibrationMetadata::new();
        let mut acquired = None;
        let mut entries = 0usize;

        for line in text.lines() {
            let Some(caps) = line_re.captures(line) else {
                continue;
            };
            let key = &caps[1];
            let value = caps[2].trim();
            entries += 1;

            if key == "DATE_ACQUIRED" {
                acquired = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
                continue;
            }
            if let Ok(number) = value.parse::<f64>() {
                calibration.insert(key, number);
            }
        }

        if entries == 0 {
            return Err(LstError::InvalidMetadata(
                "no KEY = VALUE entries found in MTL text".to_string(),
            ));
        }

        log::debug!("parsed {} MTL entries", entries);
        Ok(MtlFile {
            calibration,
            acquired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE_MTL: &str = r#"
  GROUP = LANDSAT_METADATA_FILE
    DATE_ACQUIRED = 1990-06-12
    CLOUD_COVER = 12.0
    RADIANCE_MULT_BAND_6 = 5.5375E-02
    RADIANCE_ADD_BAND_6 = 1.18243
    K1_CONSTANT_BAND_6 = 607.76
    K2_CONSTANT_BAND_6 = 1260.56
    SPACECRAFT_ID = "LANDSAT_5"
  END_GROUP = LANDSAT_METADATA_FILE
"#;

    #[test]
    fn test_parses_calibration_constants() {
        let mtl = MtlFile::parse(SAMPLE_MTL).unwrap();
        assert_relative_eq!(mtl.calibration.radiance_mult(6).unwrap(), 0.055375);
        assert_relative_eq!(mtl.calibration.radiance_add(6).unwrap(), 1.18243);
        assert_relative_eq!(mtl.calibration.k1_constant(6).unwrap(), 607.76);
        assert_relative_eq!(mtl.calibration.k2_constant(6).unwrap(), 1260.56);
        assert_relative_eq!(mtl.calibration.cloud_cover().unwrap(), 12.0);
    }

    #[test]
    fn test_parses_acquisition_date() {
        let mtl = MtlFile::parse(SAMPLE_MTL).unwrap();
        assert_eq!(
            mtl.acquired,
            Some(NaiveDate::from_ymd_opt(1990, 6, 12).unwrap())
        );
    }

    #[test]
    fn test_non_numeric_values_are_skipped() {
        let mtl = MtlFile::parse(SAMPLE_MTL).unwrap();
        assert!(mtl.calibration.get("SPACECRAFT_ID").is_none());
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(MtlFile::parse("not metadata at all\n\n").is_err());
    }
}
