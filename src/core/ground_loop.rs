//! Vertical ground heat exchanger sizing for ground-source heat pumps.
//!
//! Required bore length comes from the steady heat balance between the
//! loop water and the far-field ground across the bore and ground
//! resistances, taken at the worse of the heating and cooling design
//! conditions. The length is then split into bores, the depth settled by
//! a short count-adjustment loop, and a borefield arrangement selected
//! from the validity table for the final hole count.

use crate::core::units::{btu_hr_to_tons, INCHES_PER_FOOT};
use crate::errors::SizingError;
use crate::input::{BoreConfig, GroundLoopSpec, WeatherDesignData};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::warn;

/// Grout resistance shape coefficients by pipe arrangement in the bore:
/// 'b' pipes touching the bore wall, 'c' pipes evenly spaced.
const GROUT_BETA_B: (f64, f64) = (17.4427, -0.6052);
const GROUT_BETA_C: (f64, f64) = (21.9059, -0.3796);

const MAX_BORE_DEPTH_FT: f64 = 345.0;
const BORE_DEPTH_MARGIN_FT: f64 = 5.0;
const DEPTH_ADJUST_PASSES: usize = 5;
/// Site-to-site EER to COP conversion, Btu/Wh per W/W.
const EER_TO_COP: f64 = 3.412;
/// Nominal loop water flow per ton of block capacity.
const LOOP_FLOW_GPM_PER_TON: f64 = 3.0;

/// Long-time borefield interaction ratios fitted from tabulated
/// g-functions, indexed by spacing-to-depth bucket (tight, medium, wide).
/// Packed arrangements reject into their neighbours and need more length.
const INTERACTION: [(BoreConfig, [f64; 3]); 7] = [
    (BoreConfig::Single, [1.00, 1.00, 1.00]),
    (BoreConfig::Line, [1.10, 1.06, 1.03]),
    (BoreConfig::LConfig, [1.13, 1.08, 1.04]),
    (BoreConfig::UConfig, [1.15, 1.10, 1.05]),
    (BoreConfig::OpenRectangle, [1.16, 1.10, 1.05]),
    (BoreConfig::Rectangle, [1.18, 1.12, 1.06]),
    (BoreConfig::L2Config, [1.20, 1.13, 1.07]),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroundLoopSizing {
    pub config: BoreConfig,
    pub bore_count: u32,
    pub bore_depth_ft: f64,
    pub total_length_ft: f64,
    /// Loop water flow at the design condition, gpm.
    pub flow_rate_gpm: f64,
    /// Lookup key into the tabulated g-function set for the final
    /// arrangement, hole count and spacing-to-depth bucket.
    pub g_function_key: String,
}

fn valid_counts(config: BoreConfig) -> &'static [u32] {
    match config {
        BoreConfig::Single => &[1],
        BoreConfig::Line => &[2, 3, 4, 5, 6, 7, 8, 9, 10],
        BoreConfig::LConfig => &[3, 4, 5, 6],
        BoreConfig::Rectangle => &[4, 6, 8, 9, 10],
        BoreConfig::UConfig => &[5, 7, 9, 10],
        BoreConfig::OpenRectangle => &[8, 10],
        BoreConfig::L2Config => &[8],
    }
}

/// Arrangement for a hole count: the requested configuration when its
/// validity table covers the count, otherwise the line (or single-bore)
/// fallback. A count no arrangement covers is fatal.
fn select_config(
    requested: Option<BoreConfig>,
    bore_count: u32,
) -> Result<BoreConfig, SizingError> {
    if let Some(config) = requested {
        if valid_counts(config).contains(&bore_count) {
            return Ok(config);
        }
        warn!(
            "requested {config} borefield does not support {bore_count} bores; \
             falling back to a line arrangement"
        );
    }
    let fallback = if bore_count == 1 {
        BoreConfig::Single
    } else {
        BoreConfig::Line
    };
    if valid_counts(fallback).contains(&bore_count) {
        Ok(fallback)
    } else {
        Err(SizingError::configuration(format!(
            "no borefield arrangement supports {bore_count} bores"
        )))
    }
}

/// Spacing-to-depth bucket index and its name in the g-function tables.
fn spacing_bucket(spacing_to_depth: f64) -> (usize, &'static str) {
    if spacing_to_depth < 0.06 {
        (0, "tight")
    } else if spacing_to_depth < 0.12 {
        (1, "medium")
    } else {
        (2, "wide")
    }
}

fn interaction_factor(config: BoreConfig, spacing_to_depth: f64) -> f64 {
    let (bucket, _) = spacing_bucket(spacing_to_depth);
    INTERACTION
        .iter()
        .find(|(c, _)| *c == config)
        .map(|(_, factors)| factors[bucket])
        .unwrap_or(1.0)
}

/// Bore thermal resistance, hr-ft-F/Btu: grout shape factor plus half the
/// pipe wall (two legs in parallel).
fn bore_resistance(spec: &GroundLoopSpec) -> Result<f64, SizingError> {
    let (beta_0, beta_1) = match spec.spacing_type {
        'b' => GROUT_BETA_B,
        'c' => GROUT_BETA_C,
        other => {
            return Err(SizingError::invalid_input(format!(
                "unhandled bore spacing type: '{other}'"
            )))
        }
    };
    let r_grout =
        1.0 / (spec.grout_conductivity * beta_0 * (spec.bore_diameter / spec.pipe_od).powf(beta_1));
    Ok(r_grout + spec.pipe_r_value / 2.0)
}

/// Far-field ground resistance per foot of bore, from the line-source
/// log form between the bore wall and the bore spacing.
fn ground_resistance(spec: &GroundLoopSpec, ground_conductivity: f64) -> f64 {
    (spec.bore_spacing * INCHES_PER_FOOT / spec.bore_diameter).ln() / (2.0 * PI * ground_conductivity)
}

pub(crate) fn size_ground_loop(
    spec: &GroundLoopSpec,
    weather: &WeatherDesignData,
    ground_conductivity: f64,
    heating_capacity: f64,
    cooling_capacity: f64,
) -> Result<GroundLoopSizing, SizingError> {
    if ground_conductivity <= 0. || spec.bore_spacing <= 0. || spec.bore_diameter <= 0. {
        return Err(SizingError::invalid_input(
            "ground loop geometry and soil conductivity must be positive".to_string(),
        ));
    }
    let ground_temp = weather.ground_monthly_temps.iter().sum::<f64>() / 12.0;
    let resistance = bore_resistance(spec)? + ground_resistance(spec, ground_conductivity);

    // Ground-side heat rates: extraction loses the compressor work,
    // rejection carries it.
    let q_ground_heat = heating_capacity * (1.0 - 1.0 / spec.heat_cop);
    let q_ground_cool = cooling_capacity * (1.0 + EER_TO_COP / spec.cool_eer);

    // Mean loop water temperatures at the design entering temperatures.
    let mean_water_heat = spec.design_hw - spec.design_delta_t / 2.0;
    let mean_water_cool = spec.design_chw + spec.design_delta_t / 2.0;
    let dt_heat = ground_temp - mean_water_heat;
    let dt_cool = mean_water_cool - ground_temp;
    if dt_heat <= 0. || dt_cool <= 0. {
        return Err(SizingError::configuration(format!(
            "ground temperature {ground_temp:.1} F leaves no approach to the design loop \
             temperatures"
        )));
    }

    let length_heat = q_ground_heat * resistance / dt_heat;
    let length_cool = q_ground_cool * resistance / dt_cool;
    let mut length = length_heat.max(length_cool);

    let tons = btu_hr_to_tons(heating_capacity.max(cooling_capacity));
    let mut bore_count = ((tons + 0.5).floor() as u32).max(1);

    let config = select_config(spec.bore_config, bore_count)?;
    let trial_depth = length / bore_count as f64;
    length *= interaction_factor(config, spec.bore_spacing / trial_depth.max(1.0));

    let min_depth = 0.15 * spec.bore_spacing;
    for _ in 0..DEPTH_ADJUST_PASSES {
        let depth = length / bore_count as f64;
        if depth > MAX_BORE_DEPTH_FT {
            bore_count += 1;
        } else if depth < min_depth && bore_count > 1 {
            bore_count -= 1;
        } else {
            break;
        }
    }
    // Count adjustment can leave the requested arrangement behind.
    let config = select_config(spec.bore_config, bore_count)?;
    let bore_depth = length / bore_count as f64 + BORE_DEPTH_MARGIN_FT;
    let (_, bucket) = spacing_bucket(spec.bore_spacing / bore_depth);

    Ok(GroundLoopSizing {
        config,
        bore_count,
        bore_depth_ft: bore_depth,
        total_length_ft: bore_depth * bore_count as f64,
        flow_rate_gpm: (LOOP_FLOW_GPM_PER_TON * tons).max(LOOP_FLOW_GPM_PER_TON),
        g_function_key: format!("{config}_{bore_count}_{bucket}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn weather() -> WeatherDesignData {
        serde_json::from_str(
            r#"{"heating_drybulb": 12.0, "cooling_drybulb": 91.0, "cooling_wetbulb": 74.0,
                "cooling_humidity_ratio": 0.0135, "daily_temp_range": 20.0, "latitude": 40.0,
                "altitude": 0.0, "pressure_psia": 14.696,
                "ground_monthly_temps": [44, 43, 45, 50, 57, 63, 68, 70, 67, 60, 53, 47],
                "hdd65": 5800.0, "cdd50": 2800.0}"#,
        )
        .unwrap()
    }

    fn spec(extra: &str) -> GroundLoopSpec {
        serde_json::from_str(&format!("{{{extra}}}")).unwrap()
    }

    #[rstest]
    fn should_size_a_three_ton_loop_to_a_plausible_borefield() {
        let sizing =
            size_ground_loop(&spec(""), &weather(), 1.0, 36_000., 36_000.).unwrap();
        // Three nominal bores run past the 345 ft depth cap, so the
        // adjustment loop settles on four.
        assert_eq!(sizing.bore_count, 4);
        assert_eq!(sizing.config, BoreConfig::Line);
        assert!(
            sizing.bore_depth_ft > 0.15 * 20.0 && sizing.bore_depth_ft <= 350.0,
            "depth {} out of range",
            sizing.bore_depth_ft
        );
        assert!(sizing.total_length_ft > 100.0);
        approx::assert_relative_eq!(sizing.flow_rate_gpm, 9.0);
        assert!(
            sizing.g_function_key.starts_with("line_4_"),
            "unexpected key {}",
            sizing.g_function_key
        );
    }

    #[rstest]
    fn should_use_single_bore_arrangement_for_a_small_load() {
        let sizing = size_ground_loop(&spec(""), &weather(), 1.0, 9_000., 9_000.).unwrap();
        assert_eq!(sizing.bore_count, 1);
        assert_eq!(sizing.config, BoreConfig::Single);
        // Sub-ton loads still circulate the single-bore minimum flow.
        approx::assert_relative_eq!(sizing.flow_rate_gpm, 3.0);
        assert!(sizing.g_function_key.starts_with("single_1_"));
    }

    #[rstest]
    fn should_fall_back_to_line_when_requested_config_rejects_count() {
        let sizing = size_ground_loop(
            &spec(r#""bore_config": "rectangle""#),
            &weather(),
            1.0,
            24_000.,
            24_000.,
        )
        .unwrap();
        // Rectangle supports 4/6/8/9/10 bores; a 3-bore field lines up.
        assert_eq!(sizing.bore_count, 3);
        assert_eq!(sizing.config, BoreConfig::Line);
    }

    #[rstest]
    fn should_grow_length_with_cooling_load() {
        let small = size_ground_loop(&spec(""), &weather(), 1.0, 24_000., 24_000.).unwrap();
        let large = size_ground_loop(&spec(""), &weather(), 1.0, 24_000., 48_000.).unwrap();
        assert!(large.total_length_ft > small.total_length_ft);
    }

    #[rstest]
    fn should_shrink_length_in_conductive_soil() {
        let dry = size_ground_loop(&spec(""), &weather(), 0.5, 36_000., 36_000.).unwrap();
        let wet = size_ground_loop(&spec(""), &weather(), 1.4, 36_000., 36_000.).unwrap();
        assert!(wet.total_length_ft < dry.total_length_ft);
    }

    #[rstest]
    fn should_reject_unknown_spacing_type() {
        let err = size_ground_loop(
            &spec(r#""spacing_type": "z""#),
            &weather(),
            1.0,
            36_000.,
            36_000.,
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidInput(_)));
    }

    #[rstest]
    fn should_error_when_no_arrangement_supports_the_count() {
        // A very large load drives the count past every validity table.
        let err = size_ground_loop(&spec(""), &weather(), 1.0, 200_000., 200_000.).unwrap_err();
        assert!(matches!(err, SizingError::Configuration(_)));
    }
}
