use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Настройки алгоритма рассадки. Хранятся в KV и накладываются на значения по умолчанию.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "validate_row_band"))]
pub struct Settings {
    #[validate(range(min = 1))]
    pub ideal_row_start: u32,
    #[validate(range(min = 1))]
    pub ideal_row_end: u32,
    /// Процент заполнения партера, после которого открывается балкон
    #[validate(range(min = 0.0, max = 100.0))]
    pub use_balcony_threshold: f64,
    #[serde(rename = "maxVIPRowDeviation")]
    pub max_vip_row_deviation: u32,
    pub prefer_center_seats: bool,
    #[validate(range(min = 0.0))]
    pub balcony_penalty: f64,
    pub max_moves_for_preference: u32,
    #[serde(rename = "allowRegularToVIPPreference")]
    pub allow_regular_to_vip_preference: bool,
    pub require_mutual_preference: bool,
    pub prioritize_preferences: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ideal_row_start: 3,
            ideal_row_end: 6,
            use_balcony_threshold: 70.0,
            max_vip_row_deviation: 2,
            prefer_center_seats: true,
            balcony_penalty: 20.0,
            max_moves_for_preference: 3,
            allow_regular_to_vip_preference: false,
            require_mutual_preference: false,
            prioritize_preferences: true,
        }
    }
}

impl Settings {
    pub fn in_ideal_band(&self, row_number: u32) -> bool {
        (self.ideal_row_start..=self.ideal_row_end).contains(&row_number)
    }

    /// Центр идеальной полосы рядов (с 1)
    pub fn ideal_center(&self) -> u32 {
        (self.ideal_row_end - self.ideal_row_start) / 2 + self.ideal_row_start
    }
}

fn validate_row_band(settings: &Settings) -> Result<(), ValidationError> {
    if settings.ideal_row_start > settings.ideal_row_end {
        let mut err = ValidationError::new("row_band");
        err.message = Some("idealRowStart must not exceed idealRowEnd".into());
        return Err(err);
    }
    Ok(())
}
