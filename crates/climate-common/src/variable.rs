//! Variable specifications: which data variable to read, how to convert its
//! units, and how to collapse it to monthly values.

use serde::{Deserialize, Serialize};

/// Number of monthly aggregates produced per variable.
pub const MONTHS_PER_YEAR: usize = 12;

/// Temporal reduction applied to every instant falling in a calendar month.
///
/// Accumulated quantities (precipitation) are summed over the month; state
/// quantities (temperature) are averaged. Picking the wrong one produces
/// physically meaningless numbers without any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Sum,
    Mean,
}

impl Reduction {
    /// Reduce a set of values, skipping NaN (no-data).
    ///
    /// Returns NaN when every input is missing, never 0. Sums use Neumaier
    /// compensation; means accumulate deviations from the first value, so a
    /// constant input reduces to exactly that constant.
    pub fn reduce<I>(&self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let mut present = values.into_iter().filter(|v| !v.is_nan());
        let Some(first) = present.next() else {
            return f64::NAN;
        };

        match self {
            Reduction::Sum => {
                let mut sum = CompensatedSum::default();
                sum.add(first);
                present.for_each(|v| sum.add(v));
                sum.total()
            }
            Reduction::Mean => {
                let mut deviations = CompensatedSum::default();
                let mut count = 1usize;
                for v in present {
                    deviations.add(v - first);
                    count += 1;
                }
                first + deviations.total() / count as f64
            }
        }
    }
}

/// Neumaier summation.
#[derive(Debug, Default, Clone, Copy)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Linear unit conversion `value * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl UnitConversion {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Meters of water equivalent to millimeters.
    pub fn meters_to_millimeters() -> Self {
        Self {
            scale: 1000.0,
            offset: 0.0,
        }
    }

    /// Kelvin to degrees Celsius.
    pub fn kelvin_to_celsius() -> Self {
        Self {
            scale: 1.0,
            offset: -273.15,
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Inverse of [`UnitConversion::apply`].
    pub fn invert(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Everything the pipeline needs to know about one physical variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Category embedded in input file names (e.g. "precipitation")
    pub category: String,
    /// Recognized data variable names, tried in order
    pub candidates: Vec<String>,
    /// Prefix of the monthly output fields (e.g. "precip" -> "precip_03")
    pub field_prefix: String,
    /// Reporting unit after conversion
    pub units: String,
    /// Conversion from the stored unit to the reporting unit
    pub conversion: UnitConversion,
    /// Monthly reduction rule
    pub reduction: Reduction,
}

impl VariableSpec {
    /// ERA5 total precipitation, meters -> monthly accumulated millimeters.
    pub fn precipitation() -> Self {
        Self {
            category: "precipitation".to_string(),
            candidates: ["tp", "total_precipitation", "precip", "precipitation"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            field_prefix: "precip".to_string(),
            units: "mm".to_string(),
            conversion: UnitConversion::meters_to_millimeters(),
            reduction: Reduction::Sum,
        }
    }

    /// ERA5 2m temperature, Kelvin -> monthly mean degrees Celsius.
    pub fn temperature() -> Self {
        Self {
            category: "temperature".to_string(),
            candidates: ["t2m", "2m_temperature", "t", "temp", "temperature"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            field_prefix: "temp".to_string(),
            units: "degC".to_string(),
            conversion: UnitConversion::kelvin_to_celsius(),
            reduction: Reduction::Mean,
        }
    }

    /// Output field name for a month (1-based).
    pub fn field_name(&self, month: u32) -> String {
        month_field(&self.field_prefix, month)
    }
}

/// Monthly field name: prefix plus zero-padded two-digit month.
pub fn month_field(prefix: &str, month: u32) -> String {
    format!("{}_{:02}", prefix, month)
}
