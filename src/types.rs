use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Averaging algorithm used by the `mean` shaper.
///
/// The lowercase name is also the label written into the summary rows, so a
/// geometric mean row reads `geomean` in the replacing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeanAlgorithm {
    Arithmean,
    Geomean,
    Hmean,
}

impl MeanAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeanAlgorithm::Arithmean => "arithmean",
            MeanAlgorithm::Geomean => "geomean",
            MeanAlgorithm::Hmean => "hmean",
        }
    }

    /// Combine the values of one group. Returns `None` if the algorithm is
    /// undefined for the inputs (empty group, non-positive values for the
    /// geometric mean, a zero for the harmonic mean).
    pub fn combine(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        match self {
            MeanAlgorithm::Arithmean => Some(values.iter().sum::<f64>() / n),
            MeanAlgorithm::Geomean => {
                if values.iter().any(|v| *v <= 0.0) {
                    return None;
                }
                Some((values.iter().map(|v| v.ln()).sum::<f64>() / n).exp())
            }
            MeanAlgorithm::Hmean => {
                if values.iter().any(|v| *v == 0.0) {
                    return None;
                }
                Some(n / values.iter().map(|v| 1.0 / v).sum::<f64>())
            }
        }
    }
}

impl fmt::Display for MeanAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeanAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arithmean" => Ok(MeanAlgorithm::Arithmean),
            "geomean" => Ok(MeanAlgorithm::Geomean),
            "hmean" => Ok(MeanAlgorithm::Hmean),
            other => Err(format!(
                "invalid meanAlgorithm: {other} (expected \"arithmean\", \"geomean\" or \"hmean\")"
            )),
        }
    }
}
