//! Ambient quantities shared by every stage of the sizing pipeline.
//!
//! All of these are derived once from the weather design data and the
//! building description at pipeline entry; the context is immutable from
//! then on, so no stage can observe another stage's intermediate state.

use crate::core::psychrometrics::{
    grains, humidity_ratio_from_relative_humidity, wetbulb_from_humidity_ratio,
};
use crate::core::units::altitude_correction_factor;
use crate::input::{Building, WeatherDesignData};

/// Manual J daily-range class (Table 1 column "DR").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DailyRangeClass {
    Low,
    Medium,
    High,
}

impl DailyRangeClass {
    pub(crate) fn from_range(daily_temp_range: f64) -> Self {
        if daily_temp_range < 16. {
            DailyRangeClass::Low
        } else if daily_temp_range > 25. {
            DailyRangeClass::High
        } else {
            DailyRangeClass::Medium
        }
    }

    /// Adjustment to cooling temperature differences by daily-range class
    /// (Manual J Table 4A footnotes): a low daily range keeps surfaces hot
    /// through the day, a high range gives them time to cool.
    pub(crate) fn temp_adjustment(&self) -> f64 {
        match self {
            DailyRangeClass::Low => 4.0,
            DailyRangeClass::Medium => 0.0,
            DailyRangeClass::High => -5.0,
        }
    }
}

/// Indoor design relative humidity assumed by Manual J at the cooling
/// design condition.
const INDOOR_COOLING_RH: f64 = 0.50;

#[derive(Clone, Debug)]
pub struct SizingContext {
    pub heat_setpoint: f64,
    pub cool_setpoint: f64,
    /// Cooling temperature difference, cooling design drybulb minus setpoint
    pub ctd: f64,
    /// Heating temperature difference, setpoint minus heating design drybulb
    pub htd: f64,
    pub daily_range_class: DailyRangeClass,
    /// Altitude correction factor on the air-side constants
    pub acf: f64,
    /// Outdoor moisture content at the cooling design condition, grains
    pub cool_design_grains: f64,
    /// Indoor moisture content at the cooling setpoint, grains
    pub cool_indoor_grains: f64,
    /// Indoor wetbulb at the cooling setpoint, deg F (coil entering wetbulb)
    pub wetbulb_indoor_cooling: f64,
    pub pressure_psia: f64,
    pub latitude: f64,
}

impl SizingContext {
    pub fn new(weather: &WeatherDesignData, building: &Building) -> anyhow::Result<Self> {
        let heat_setpoint = building.heating_setpoint;
        let cool_setpoint = building.cooling_setpoint;
        let indoor_w = humidity_ratio_from_relative_humidity(
            cool_setpoint,
            INDOOR_COOLING_RH,
            weather.pressure_psia,
        );
        let wetbulb_indoor_cooling =
            wetbulb_from_humidity_ratio(cool_setpoint, indoor_w, weather.pressure_psia)?;
        Ok(Self {
            heat_setpoint,
            cool_setpoint,
            ctd: weather.cooling_drybulb - cool_setpoint,
            htd: heat_setpoint - weather.heating_drybulb,
            daily_range_class: DailyRangeClass::from_range(weather.daily_temp_range),
            acf: altitude_correction_factor(weather.altitude),
            cool_design_grains: grains(weather.cooling_humidity_ratio),
            cool_indoor_grains: grains(indoor_w),
            wetbulb_indoor_cooling,
            pressure_psia: weather.pressure_psia,
            latitude: weather.latitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(12.0, DailyRangeClass::Low)]
    #[case(16.0, DailyRangeClass::Medium)]
    #[case(25.0, DailyRangeClass::Medium)]
    #[case(26.0, DailyRangeClass::High)]
    fn should_classify_daily_range(#[case] range: f64, #[case] expected: DailyRangeClass) {
        assert_eq!(DailyRangeClass::from_range(range), expected);
    }

    #[rstest]
    fn should_order_daily_range_adjustments() {
        assert!(
            DailyRangeClass::Low.temp_adjustment() > DailyRangeClass::High.temp_adjustment(),
            "low daily range must get the larger adjustment"
        );
    }
}
