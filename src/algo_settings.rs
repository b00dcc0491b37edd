use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MINIMUM_SAMPLE_SIZE: u32 = 5;
pub const DEFAULT_MINIMUM_QUALIFYING_PERCENT: u8 = 60;
pub const DEFAULT_FORM_WINDOW: u32 = 5;
pub const MAX_FORM_WINDOW: u32 = 50;

/// Settings as stored or submitted: any field may be missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlgoSettings {
    #[serde(default)]
    pub minimum_sample_size: Option<i64>,
    #[serde(default)]
    pub minimum_qualifying_percent: Option<i64>,
    #[serde(default)]
    pub form_window: Option<i64>,
}

impl RawAlgoSettings {
    /// Lenient read of a user-submitted settings object. Fields that are not
    /// numbers (or numeric strings) are treated as missing.
    pub fn from_value(v: &Value) -> Self {
        let field = |camel: &str, snake: &str| {
            v.get(camel)
                .or_else(|| v.get(snake))
                .and_then(lenient_i64)
        };
        Self {
            minimum_sample_size: field("minimumSampleSize", "minimum_sample_size"),
            minimum_qualifying_percent: field(
                "minimumQualifyingPercent",
                "minimum_qualifying_percent",
            ),
            form_window: field("formWindow", "form_window"),
        }
    }

    /// A complete record: fields left out here take the value in `defaults`,
    /// never whatever was stored before.
    pub fn filled_from(&self, defaults: &AlgoSettings) -> Self {
        Self {
            minimum_sample_size: self
                .minimum_sample_size
                .or(Some(i64::from(defaults.minimum_sample_size))),
            minimum_qualifying_percent: self
                .minimum_qualifying_percent
                .or(Some(i64::from(defaults.minimum_qualifying_percent))),
            form_window: self.form_window.or(Some(i64::from(defaults.form_window))),
        }
    }
}

/// Per (user, team) thresholds that gate which market lines become picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoSettings {
    pub minimum_sample_size: u32,
    pub minimum_qualifying_percent: u8,
    pub form_window: u32,
}

impl Default for AlgoSettings {
    fn default() -> Self {
        Self {
            minimum_sample_size: DEFAULT_MINIMUM_SAMPLE_SIZE,
            minimum_qualifying_percent: DEFAULT_MINIMUM_QUALIFYING_PERCENT,
            form_window: DEFAULT_FORM_WINDOW,
        }
    }
}

impl AlgoSettings {
    pub fn normalize(raw: Option<&RawAlgoSettings>) -> Self {
        Self::normalize_with(raw, &AlgoSettings::default())
    }

    /// Fill gaps from `defaults` and clamp everything into range. Never fails.
    pub fn normalize_with(raw: Option<&RawAlgoSettings>, defaults: &AlgoSettings) -> Self {
        let empty = RawAlgoSettings::default();
        let raw = raw.unwrap_or(&empty);
        Self {
            minimum_sample_size: clamp_to_u32(
                raw.minimum_sample_size,
                defaults.minimum_sample_size,
                1,
                u32::MAX,
            ),
            minimum_qualifying_percent: clamp_to_u32(
                raw.minimum_qualifying_percent,
                u32::from(defaults.minimum_qualifying_percent),
                0,
                100,
            ) as u8,
            form_window: clamp_to_u32(raw.form_window, defaults.form_window, 1, MAX_FORM_WINDOW),
        }
    }
}

impl From<AlgoSettings> for RawAlgoSettings {
    fn from(s: AlgoSettings) -> Self {
        Self {
            minimum_sample_size: Some(i64::from(s.minimum_sample_size)),
            minimum_qualifying_percent: Some(i64::from(s.minimum_qualifying_percent)),
            form_window: Some(i64::from(s.form_window)),
        }
    }
}

fn clamp_to_u32(value: Option<i64>, default: u32, min: u32, max: u32) -> u32 {
    let v = value.unwrap_or(i64::from(default));
    v.clamp(i64::from(min), i64::from(max)) as u32
}

fn lenient_i64(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64() {
        return f.is_finite().then(|| f.round() as i64);
    }
    let s = v.as_str()?.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}
