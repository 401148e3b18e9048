//! Equipment capacity and airflow selection.
//!
//! Cooling equipment is sized so the capacity delivered at the design
//! entering conditions meets the duct-inflated load shares, subject to the
//! Manual S oversize limit for the compressor speed count. Heat pumps
//! reconcile the heating requirement against the cooling selection, and
//! installation-quality defects inflate the rated selection so the
//! as-installed unit still meets load.

use crate::core::context::SizingContext;
use crate::core::ducts::DuctModel;
use crate::core::ground_loop::GroundLoopSizing;
use crate::core::units::{btu_hr_to_tons, SENSIBLE_AIR_CONSTANT};
use crate::errors::SizingError;
use crate::input::{
    CoolType, CoolingSpec, GroundLoopSpec, HeatType, HeatingSpec, HvacSystem, WeatherDesignData,
};
use serde::Serialize;

/// Tolerated undersizing: a selection delivering at least this fraction
/// of a load component is accepted as-is. Below it, cooling selections
/// are rescaled to the full component and heat pumps flag supplemental
/// heat.
const UNDERSIZE_LIMIT: f64 = 0.9;
/// Extra heating capacity allowed beyond the cooling load in cold-dry
/// climates ("add a ton", Manual S exception).
const COLD_CLIMATE_CAPACITY_DELTA: f64 = 15_000.0;
const COLD_CLIMATE_DEGREE_DAY_RATIO: f64 = 2.0;
const COLD_CLIMATE_LOAD_SHR: f64 = 0.95;

const MIN_CFM_PER_TON: f64 = 200.0;
const MAX_CFM_PER_TON: f64 = 500.0;

const FURNACE_SUPPLY_TEMP: f64 = 105.0;
const HEAT_PUMP_SUPPLY_TEMP: f64 = 92.5;
const BOILER_WATER_TEMP: f64 = 180.0;

/// Rated entering conditions of the cooling test point, deg F.
const RATED_EWB: f64 = 67.0;

/// GSHP coil bypass factor and its biquadratic correction
/// f(entering wetbulb, entering drybulb).
const GSHP_COIL_BF: f64 = 0.0806;
const GSHP_COIL_BF_FT_SPEC: [f64; 6] = [1.21005458, -0.006642, 0.0, 0.0034824614, 0.0, 0.0];

/// Gross capacity fault coefficients for refrigerant charge defects,
/// undercharge and overcharge branches, evaluated at the rating-point
/// condenser/evaporator saturation temperatures (deg C).
const CHARGE_FAULT_UNDER: [f64; 4] = [-9.46e-1, 4.93e-2, -1.18e-3, -1.15];
const CHARGE_FAULT_OVER: [f64; 4] = [-1.63e-1, 1.14e-2, -2.10e-4, -1.40e-1];
const CHARGE_FAULT_TEMPS: [f64; 2] = [26.67, 35.0];

/// Quadratic capacity-vs-flow-fraction curve used for heat pump heating
/// when inflating for installation defects.
const HEAT_CAP_FFLOW_SPEC: [f64; 3] = [0.694045465, 0.474207981, -0.168253446];

pub(crate) fn biquadratic(c: &[f64; 6], x: f64, y: f64) -> f64 {
    c[0] + c[1] * x + c[2] * x * x + c[3] * y + c[4] * y * y + c[5] * x * y
}

fn quadratic(c: &[f64; 3], x: f64) -> f64 {
    c[0] + c[1] * x + c[2] * x * x
}

/// Manual S oversize limit by compressor speed count.
pub(crate) fn oversize_limit(speeds: usize) -> f64 {
    match speeds {
        0 | 1 => 1.15,
        2 => 1.2,
        _ => 1.3,
    }
}

/// Design leaving air temperature from the sensible heat ratio of the
/// load: drier loads run colder coils.
pub(crate) fn leaving_air_temp(load_shr: f64) -> f64 {
    if load_shr < 0.80 {
        54.0
    } else if load_shr < 0.85 {
        56.0
    } else {
        58.0
    }
}

pub(crate) fn heating_supply_temp(heat_type: HeatType) -> f64 {
    match heat_type {
        HeatType::Furnace | HeatType::Boiler | HeatType::ElectricResistance => FURNACE_SUPPLY_TEMP,
        HeatType::AirSourceHeatPump
        | HeatType::MiniSplitHeatPump
        | HeatType::GroundSourceHeatPump => HEAT_PUMP_SUPPLY_TEMP,
    }
}

/// Flow-fraction multiplier of a refrigerant charge defect.
fn charge_fault_flow_factor(charge_defect_ratio: f64) -> f64 {
    if charge_defect_ratio == 0. {
        return 1.0;
    }
    let q = if charge_defect_ratio <= 0. {
        CHARGE_FAULT_UNDER
    } else {
        CHARGE_FAULT_OVER
    };
    let fault = (q[0] + q[1] * CHARGE_FAULT_TEMPS[0] + q[2] * CHARGE_FAULT_TEMPS[1]
        + q[3] * charge_defect_ratio)
        * charge_defect_ratio;
    1.0 / (1.0 + fault)
}

/// Capacity retained by the as-installed unit relative to its rating,
/// given airflow and charge defects. The rated selection is divided by
/// this factor so the faulted unit still meets load. The flow fraction is
/// scale-invariant, so the inverse derating solves in closed form.
fn install_quality_factor(
    airflow_defect_ratio: f64,
    charge_defect_ratio: f64,
    cap_fflow_spec: &[f64; 3],
) -> f64 {
    if airflow_defect_ratio == 0. && charge_defect_ratio == 0. {
        return 1.0;
    }
    let ff = (1.0 + airflow_defect_ratio) * charge_fault_flow_factor(charge_defect_ratio);
    quadratic(cap_fflow_spec, ff.clamp(0.5, 1.5)).clamp(0.25, 1.0)
}

fn clamp_airflow(cfm: f64, capacity_btu_hr: f64) -> f64 {
    let tons = btu_hr_to_tons(capacity_btu_hr);
    if tons <= 0. {
        return 0.;
    }
    cfm.clamp(MIN_CFM_PER_TON * tons, MAX_CFM_PER_TON * tons)
}

/// Per-system inputs after validation: load fractions checked, duct runs
/// collapsed, a default ground loop filled in for GSHPs.
#[derive(Clone, Debug)]
pub(crate) struct HvacSystemInfo {
    pub id: String,
    pub heating: Option<HeatingSpec>,
    pub cooling: Option<CoolingSpec>,
    pub ducts: Option<DuctModel>,
    pub ground_loop: Option<GroundLoopSpec>,
}

impl HvacSystemInfo {
    pub(crate) fn extract(system: &HvacSystem) -> Result<Self, SizingError> {
        if let Some(heating) = &system.heating {
            validate_fraction(&system.id, "heating", heating.fraction_load_served)?;
            validate_speeds(
                &system.id,
                heating.capacity_ratios.len(),
                &[heating.cap_ft_spec.len(), heating.rated_cfm_per_ton.len()],
            )?;
        }
        if let Some(cooling) = &system.cooling {
            validate_fraction(&system.id, "cooling", cooling.fraction_load_served)?;
            validate_speeds(
                &system.id,
                cooling.capacity_ratios.len(),
                &[
                    cooling.cap_ft_spec.len(),
                    cooling.cap_fflow_spec.len(),
                    cooling.rated_shr.len(),
                    cooling.rated_cfm_per_ton.len(),
                ],
            )?;
        }
        let is_gshp = matches!(
            system.cooling.as_ref().map(|c| c.cool_type),
            Some(CoolType::GroundSourceHeatPump)
        ) || matches!(
            system.heating.as_ref().map(|h| h.heat_type),
            Some(HeatType::GroundSourceHeatPump)
        );
        let ground_loop = if is_gshp {
            Some(system.ground_loop.clone().unwrap_or_default())
        } else {
            system.ground_loop.clone()
        };
        Ok(Self {
            id: system.id.clone(),
            heating: system.heating.clone(),
            cooling: system.cooling.clone(),
            ducts: crate::core::ducts::extract_duct_model(&system.ducts)?,
            ground_loop,
        })
    }
}

fn validate_fraction(id: &str, role: &str, fraction: f64) -> Result<(), SizingError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(SizingError::invalid_input(format!(
            "system '{id}' {role} fraction_load_served {fraction} outside [0, 1]"
        )));
    }
    Ok(())
}

fn validate_speeds(id: &str, speeds: usize, curve_lens: &[usize]) -> Result<(), SizingError> {
    if speeds == 0 || curve_lens.iter().any(|len| *len != speeds) {
        return Err(SizingError::invalid_input(format!(
            "system '{id}' performance data must cover each of its {speeds} compressor speeds"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HeatingSizing {
    /// Rated capacity, Btu/hr
    pub capacity: f64,
    pub airflow_cfm: f64,
    pub supply_temp: f64,
    /// Supplemental (backup) heating capacity, Btu/hr; zero when the
    /// primary selection covers the design load.
    pub capacity_supplemental: f64,
    pub airflow_supplemental_cfm: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoolingSizing {
    /// Rated total capacity, Btu/hr
    pub capacity_total: f64,
    /// Rated sensible capacity, Btu/hr
    pub capacity_sensible: f64,
    pub airflow_cfm: f64,
    pub leaving_air_temp: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HvacSizingResult {
    pub id: String,
    pub heating: Option<HeatingSizing>,
    pub cooling: Option<CoolingSizing>,
    pub ground_loop: Option<GroundLoopSizing>,
}

/// Duct-inflated load shares assigned to one system.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct SystemLoads {
    pub heat: f64,
    pub cool_sens: f64,
    pub cool_lat: f64,
}

impl SystemLoads {
    pub(crate) fn cool_total(&self) -> f64 {
        self.cool_sens + self.cool_lat
    }

    pub(crate) fn cool_shr(&self) -> f64 {
        let total = self.cool_total();
        if total > 0. {
            self.cool_sens / total
        } else {
            1.0
        }
    }
}

pub(crate) fn size_system(
    info: &HvacSystemInfo,
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    loads: &SystemLoads,
    warnings: &mut Vec<String>,
) -> Result<HvacSizingResult, SizingError> {
    let mut cooling = match &info.cooling {
        Some(spec) if spec.fraction_load_served > 0. && loads.cool_total() > 0. => Some(
            size_cooling(spec, info.ground_loop.as_ref(), ctx, weather, loads, warnings)?,
        ),
        _ => None,
    };
    let heating = match &info.heating {
        Some(spec) if spec.fraction_load_served > 0. && loads.heat > 0. => Some(size_heating(
            spec,
            info,
            cooling.as_mut(),
            ctx,
            weather,
            loads,
            warnings,
        )?),
        _ => None,
    };

    let mut result = HvacSizingResult {
        id: info.id.clone(),
        heating,
        cooling,
        ground_loop: None,
    };
    apply_fixed_capacities(info, &mut result);
    Ok(result)
}

fn size_cooling(
    spec: &CoolingSpec,
    ground_loop: Option<&GroundLoopSpec>,
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    loads: &SystemLoads,
    warnings: &mut Vec<String>,
) -> Result<CoolingSizing, SizingError> {
    let load_tot = loads.cool_total();
    let lat_temp = leaving_air_temp(loads.cool_shr());
    let speeds = spec.capacity_ratios.len();
    let top = speeds - 1;

    if spec.cool_type == CoolType::EvaporativeCooler {
        // Direct evaporative equipment has no compressor to select; the
        // airflow to carry the sensible load at the wetbulb approach is
        // the sizing output.
        let approach = (ctx.cool_setpoint - weather.cooling_wetbulb).max(5.0);
        let airflow = loads.cool_sens / (SENSIBLE_AIR_CONSTANT * ctx.acf * approach);
        return Ok(CoolingSizing {
            capacity_total: loads.cool_sens,
            capacity_sensible: loads.cool_sens,
            airflow_cfm: airflow,
            leaving_air_temp: lat_temp,
        });
    }

    // GSHPs see the design entering water temperature at the coil; air
    // units see the outdoor design drybulb.
    let entering_temp = match spec.cool_type {
        CoolType::GroundSourceHeatPump => {
            ground_loop.map_or_else(|| GroundLoopSpec::default().design_chw, |g| g.design_chw)
        }
        _ => weather.cooling_drybulb,
    };
    let cap_curve = biquadratic(
        &spec.cap_ft_spec[top],
        ctx.wetbulb_indoor_cooling,
        entering_temp,
    );
    if cap_curve <= 0. {
        return Err(SizingError::configuration(format!(
            "cooling capacity curve for {} is non-positive at design conditions",
            spec.cool_type
        )));
    }

    let mut cap_rated = load_tot / cap_curve;
    let rated_shr = spec.rated_shr[top];

    // Sensible and latent adequacy: the coil's split at design must cover
    // both load components to within the undersizing tolerance, otherwise
    // the total selection grows back to the full component. Both shares
    // scale linearly with the rated selection.
    let sens_design = sensible_capacity_at_design(spec, ctx, cap_rated * rated_shr, cap_curve);
    let lat_design = (cap_rated * cap_curve - sens_design).max(1.0);
    let mut scale: f64 = 1.0;
    if sens_design < UNDERSIZE_LIMIT * loads.cool_sens {
        scale = scale.max(loads.cool_sens / sens_design);
    }
    if lat_design < UNDERSIZE_LIMIT * loads.cool_lat {
        scale = scale.max(loads.cool_lat / lat_design);
    }
    cap_rated *= scale;

    // Manual S oversize limit on the delivered total.
    let limit = oversize_limit(speeds) * load_tot;
    if cap_rated * cap_curve > limit {
        cap_rated = limit / cap_curve;
        warnings.push(format!(
            "cooling selection for {} clipped at the {:.0}% oversize limit; \
             latent performance may fall short",
            spec.cool_type,
            (oversize_limit(speeds) - 1.0) * 100.0
        ));
    }

    let iq = install_quality_factor(
        spec.airflow_defect_ratio,
        spec.charge_defect_ratio,
        &spec.cap_fflow_spec[top],
    );
    cap_rated /= iq;

    let airflow = clamp_airflow(
        btu_hr_to_tons(cap_rated) * spec.rated_cfm_per_ton[top],
        cap_rated,
    );
    Ok(CoolingSizing {
        capacity_total: cap_rated,
        capacity_sensible: cap_rated * rated_shr,
        airflow_cfm: airflow,
        leaving_air_temp: lat_temp,
    })
}

/// Sensible capacity delivered at design entering conditions. Air units
/// scale the rated sensible share with the total-capacity curve; GSHP
/// coils apply the bypass-factor model, whose sensible share grows as the
/// entering wetbulb drops below the 67 F rating point.
fn sensible_capacity_at_design(
    spec: &CoolingSpec,
    ctx: &SizingContext,
    sens_rated: f64,
    cap_curve: f64,
) -> f64 {
    match spec.cool_type {
        CoolType::GroundSourceHeatPump => {
            let bf_curve = biquadratic(
                &GSHP_COIL_BF_FT_SPEC,
                ctx.wetbulb_indoor_cooling,
                ctx.cool_setpoint,
            );
            sens_rated
                * (1.0 - GSHP_COIL_BF * bf_curve)
                * (80.0 - ctx.wetbulb_indoor_cooling)
                / (80.0 - RATED_EWB)
        }
        _ => sens_rated * cap_curve,
    }
}

fn size_heating(
    spec: &HeatingSpec,
    info: &HvacSystemInfo,
    cooling: Option<&mut CoolingSizing>,
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    loads: &SystemLoads,
    warnings: &mut Vec<String>,
) -> Result<HeatingSizing, SizingError> {
    let supply_temp = heating_supply_temp(spec.heat_type);
    match spec.heat_type {
        HeatType::Furnace | HeatType::ElectricResistance => Ok(HeatingSizing {
            capacity: loads.heat,
            airflow_cfm: loads.heat
                / (SENSIBLE_AIR_CONSTANT * ctx.acf * (supply_temp - ctx.heat_setpoint)),
            supply_temp,
            capacity_supplemental: 0.,
            airflow_supplemental_cfm: 0.,
        }),
        HeatType::Boiler => Ok(HeatingSizing {
            capacity: loads.heat,
            airflow_cfm: 0.,
            supply_temp: BOILER_WATER_TEMP,
            capacity_supplemental: 0.,
            airflow_supplemental_cfm: 0.,
        }),
        HeatType::AirSourceHeatPump | HeatType::MiniSplitHeatPump => Ok(size_air_heat_pump(
            spec,
            info.cooling.as_ref(),
            cooling,
            ctx,
            weather,
            loads,
            warnings,
        )),
        HeatType::GroundSourceHeatPump => Ok(size_gshp_heating(
            spec,
            info.ground_loop.as_ref(),
            cooling,
            ctx,
            loads,
            warnings,
        )),
    }
}

fn size_air_heat_pump(
    spec: &HeatingSpec,
    cooling_spec: Option<&CoolingSpec>,
    cooling: Option<&mut CoolingSizing>,
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    loads: &SystemLoads,
    warnings: &mut Vec<String>,
) -> HeatingSizing {
    let top = spec.capacity_ratios.len() - 1;
    let curve =
        biquadratic(&spec.cap_ft_spec[top], ctx.heat_setpoint, weather.heating_drybulb).max(0.1);
    let mut cap_rated = loads.heat / curve;

    if let Some(cooling) = cooling {
        let cool_speeds = cooling_spec.map_or(1, |c| c.capacity_ratios.len());
        let degree_day_ratio = if weather.cdd50 > 0. {
            weather.hdd65 / weather.cdd50
        } else {
            f64::INFINITY
        };
        // Cold-dry climates may carry heating capacity one nominal ton
        // beyond the cooling load; elsewhere the cooling oversize limit
        // governs the shared compressor.
        let max_heat_cap = if degree_day_ratio < COLD_CLIMATE_DEGREE_DAY_RATIO
            || loads.cool_shr() < COLD_CLIMATE_LOAD_SHR
        {
            oversize_limit(cool_speeds) * loads.cool_total()
        } else {
            loads.cool_total() + COLD_CLIMATE_CAPACITY_DELTA
        };
        if cap_rated > max_heat_cap {
            cap_rated = max_heat_cap;
            if cap_rated * curve < UNDERSIZE_LIMIT * loads.heat {
                warnings.push(format!(
                    "heat pump heating capacity limited to {max_heat_cap:.0} Btu/hr; \
                     supplemental heat must cover the balance of the {:.0} Btu/hr design load",
                    loads.heat
                ));
            }
        }
        // One compressor serves both modes.
        if cap_rated > cooling.capacity_total {
            let shr = cooling.capacity_sensible / cooling.capacity_total;
            cooling.capacity_total = cap_rated;
            cooling.capacity_sensible = cap_rated * shr;
            cooling.airflow_cfm = clamp_airflow(cooling.airflow_cfm, cap_rated);
        } else {
            cap_rated = cooling.capacity_total;
        }
    }

    let (capacity_supplemental, airflow_supplemental_cfm) =
        supplemental_heat(ctx, loads.heat - cap_rated * curve);

    let iq = install_quality_factor(
        spec.airflow_defect_ratio,
        spec.charge_defect_ratio,
        &HEAT_CAP_FFLOW_SPEC,
    );
    cap_rated /= iq;

    HeatingSizing {
        capacity: cap_rated,
        airflow_cfm: clamp_airflow(
            btu_hr_to_tons(cap_rated) * spec.rated_cfm_per_ton[top],
            cap_rated,
        ),
        supply_temp: HEAT_PUMP_SUPPLY_TEMP,
        capacity_supplemental,
        airflow_supplemental_cfm,
    }
}

/// Electric-strip supplemental heat covering the shortfall between the
/// design load and what the compressor delivers at the design condition.
fn supplemental_heat(ctx: &SizingContext, shortfall: f64) -> (f64, f64) {
    if shortfall <= 0. {
        return (0., 0.);
    }
    let airflow =
        shortfall / (SENSIBLE_AIR_CONSTANT * ctx.acf * (FURNACE_SUPPLY_TEMP - ctx.heat_setpoint));
    (shortfall, airflow)
}

fn size_gshp_heating(
    spec: &HeatingSpec,
    ground_loop: Option<&GroundLoopSpec>,
    cooling: Option<&mut CoolingSizing>,
    ctx: &SizingContext,
    loads: &SystemLoads,
    warnings: &mut Vec<String>,
) -> HeatingSizing {
    let top = spec.capacity_ratios.len() - 1;
    let design_hw =
        ground_loop.map_or_else(|| GroundLoopSpec::default().design_hw, |g| g.design_hw);
    // Entering water at the heating design condition; the curve input
    // mirrors the cooling side's entering-water form.
    let curve = biquadratic(&spec.cap_ft_spec[top], ctx.heat_setpoint, design_hw).max(0.1);
    let mut cap_rated = loads.heat / curve;

    if let Some(cooling) = cooling {
        // A ground loop sized for a heating capacity far beyond the
        // cooling capacity would be badly unbalanced; derate and let
        // supplemental heat carry the difference.
        if cap_rated >= 1.5 * cooling.capacity_total {
            cap_rated = 0.75 * loads.heat;
            warnings.push(format!(
                "ground-source heat pump heating derated to {cap_rated:.0} Btu/hr to keep \
                 the loop balanced; supplemental heat required"
            ));
        } else if cap_rated < cooling.capacity_total {
            cap_rated = cooling.capacity_total;
        }
        let shr = cooling.capacity_sensible / cooling.capacity_total;
        cooling.capacity_total = cap_rated;
        cooling.capacity_sensible = cap_rated * shr;
        cooling.airflow_cfm = clamp_airflow(cooling.airflow_cfm, cap_rated);
    }

    let (capacity_supplemental, airflow_supplemental_cfm) =
        supplemental_heat(ctx, loads.heat - cap_rated * curve);

    HeatingSizing {
        capacity: cap_rated,
        airflow_cfm: clamp_airflow(
            btu_hr_to_tons(cap_rated) * spec.rated_cfm_per_ton[top],
            cap_rated,
        ),
        supply_temp: HEAT_PUMP_SUPPLY_TEMP,
        capacity_supplemental,
        airflow_supplemental_cfm,
    }
}

/// User-specified capacities override the autosized values; airflows
/// scale with the override so cfm/ton is preserved.
fn apply_fixed_capacities(info: &HvacSystemInfo, result: &mut HvacSizingResult) {
    if let (Some(spec), Some(heating)) = (&info.heating, result.heating.as_mut()) {
        if let Some(fixed) = spec.fixed_capacity {
            if heating.capacity > 0. {
                heating.airflow_cfm *= fixed / heating.capacity;
            }
            heating.capacity = fixed;
        }
    }
    if let (Some(spec), Some(cooling)) = (&info.cooling, result.cooling.as_mut()) {
        if let Some(fixed) = spec.fixed_capacity {
            if cooling.capacity_total > 0. {
                let scale = fixed / cooling.capacity_total;
                cooling.airflow_cfm *= scale;
                cooling.capacity_sensible *= scale;
            }
            cooling.capacity_total = fixed;
        }
    }
}
