use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    #[default]
    Hours,
}

impl DurationUnit {
    pub fn to_hours(&self, value: f64) -> f64 {
        match self {
            DurationUnit::Seconds => value / 3600.0,
            DurationUnit::Minutes => value / 60.0,
            DurationUnit::Hours => value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub ram_usage: f64,
    pub duration_value: Option<f64>,
    #[serde(default)]
    pub duration_unit: DurationUnit,
}

/// Values are pre-rendered with two decimals.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub duration_hours: String,
    #[serde(rename = "averageCPU")]
    pub average_cpu: String,
    #[serde(rename = "averageRAM")]
    pub average_ram: String,
}
