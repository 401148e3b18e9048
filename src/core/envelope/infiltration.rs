//! Infiltration and mechanical ventilation design loads.
//!
//! The blower-door ACH50 result is converted to a specific leakage area,
//! then to an infiltration flow at design conditions via the ASHRAE
//! enhanced (stack + wind) model with Manual J Table 5D coefficients.
//! Mechanical ventilation flows are combined with infiltration by adding
//! balanced flow directly and unbalanced flow in quadrature.

use crate::core::context::SizingContext;
use crate::core::units::{
    LATENT_AIR_CONSTANT, MINUTES_PER_HOUR, SENSIBLE_AIR_CONSTANT, SQUARE_INCHES_PER_SQUARE_FOOT,
};
use crate::input::{Building, MechanicalVentilation, WeatherDesignData};

/// Reference-pressure constant of the SLA conversion (sqrt of the 4 Pa
/// reference over standard air density terms, dimensionless).
const SLA_CONVERSION: f64 = 0.283316478;

/// Stack coefficients by stories above grade (Manual J Table 5D).
const STACK_COEFFS: [f64; 3] = [0.015, 0.0299, 0.0449];

/// Wind coefficients by stories above grade and shelter class 1-5
/// (Manual J Table 5D).
const WIND_COEFFS: [[f64; 5]; 3] = [
    [0.0119, 0.0092, 0.0065, 0.0039, 0.0012],
    [0.0157, 0.0121, 0.0086, 0.0051, 0.0016],
    [0.0184, 0.0143, 0.0101, 0.0060, 0.0018],
];

/// Specific leakage area (leakage area per unit floor area) from a
/// blower-door ACH50 measurement.
pub fn sla_from_ach50(
    ach50: f64,
    pressure_exponent: f64,
    floor_area: f64,
    volume: f64,
) -> f64 {
    ach50 * SLA_CONVERSION * 4.0_f64.powf(pressure_exponent) * volume
        / (floor_area
            * SQUARE_INCHES_PER_SQUARE_FOOT
            * 50.0_f64.powf(pressure_exponent)
            * MINUTES_PER_HOUR)
}

/// Exact inverse of [`sla_from_ach50`].
pub fn ach50_from_sla(
    sla: f64,
    pressure_exponent: f64,
    floor_area: f64,
    volume: f64,
) -> f64 {
    sla * floor_area * SQUARE_INCHES_PER_SQUARE_FOOT * 50.0_f64.powf(pressure_exponent)
        * MINUTES_PER_HOUR
        / (SLA_CONVERSION * 4.0_f64.powf(pressure_exponent) * volume)
}

/// Infiltration flow in CFM at a design condition from the enhanced
/// stack-and-wind model: ELA * sqrt(Cs * dT + Cw * v^2).
fn infiltration_cfm(building: &Building, delta_t: f64, wind_speed_mph: f64) -> f64 {
    let sla = sla_from_ach50(
        building.infiltration.ach50,
        building.infiltration.pressure_exponent,
        building.conditioned_floor_area,
        building.conditioned_volume,
    );
    let ela_sq_in = sla * building.conditioned_floor_area * SQUARE_INCHES_PER_SQUARE_FOOT;

    let story_idx = (building.stories_above_grade.clamp(1, 3) - 1) as usize;
    let shelter_idx = (building.infiltration.shelter_class.clamp(1, 5) - 1) as usize;
    let c_s = STACK_COEFFS[story_idx];
    let c_w = WIND_COEFFS[story_idx][shelter_idx];

    ela_sq_in * (c_s * delta_t.abs() + c_w * wind_speed_mph.powi(2)).sqrt()
}

/// Effective outdoor-air flows after combining infiltration with
/// mechanical ventilation. Balanced flow adds linearly (it does not
/// interact with envelope pressure), unbalanced flow combines with
/// infiltration in quadrature. Heat-recovery effectiveness credits the
/// balanced stream only.
fn combined_cfm(icfm: f64, vent: Option<&MechanicalVentilation>) -> (f64, f64) {
    let (q_bal, q_unbal, sens_eff, tot_eff) = match vent {
        Some(v) => (
            v.balanced_cfm,
            v.unbalanced_cfm,
            v.sensible_recovery_effectiveness,
            v.total_recovery_effectiveness,
        ),
        None => (0., 0., 0., 0.),
    };
    let q_envelope = (icfm.powi(2) + q_unbal.powi(2)).sqrt();
    let sensible = q_bal * (1.0 - sens_eff) + q_envelope;
    let latent = q_bal * (1.0 - tot_eff) + q_envelope;
    (sensible, latent)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct InfilVentLoads {
    pub heat: f64,
    pub cool_sens: f64,
    pub cool_lat: f64,
}

pub(crate) fn process_infiltration_ventilation(
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    building: &Building,
) -> InfilVentLoads {
    let icfm_heat = infiltration_cfm(building, ctx.htd, weather.heating_wind_speed);
    let icfm_cool = infiltration_cfm(building, ctx.ctd, weather.cooling_wind_speed);
    let vent = building.ventilation.as_ref();
    let (cfm_heat_sens, _) = combined_cfm(icfm_heat, vent);
    let (cfm_cool_sens, cfm_cool_lat) = combined_cfm(icfm_cool, vent);

    InfilVentLoads {
        heat: SENSIBLE_AIR_CONSTANT * ctx.acf * cfm_heat_sens * ctx.htd,
        cool_sens: SENSIBLE_AIR_CONSTANT * ctx.acf * cfm_cool_sens * ctx.ctd,
        cool_lat: LATENT_AIR_CONSTANT
            * ctx.acf
            * cfm_cool_lat
            * (ctx.cool_design_grains - ctx.cool_indoor_grains),
    }
}
