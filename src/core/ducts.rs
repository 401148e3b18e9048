//! Distribution-system losses per the ASHRAE 152 delivery-effectiveness
//! method.
//!
//! Duct runs are collapsed to one effective supply side and one effective
//! return side, a delivery effectiveness is computed from leakage and
//! conduction at design conditions, corrected for thermal regain of the
//! duct location, and the envelope load share is inflated until the load
//! and the airflow that moves it agree. Each system contributes a pure
//! load increment; the caller folds the increments into the building
//! aggregate exactly once.

use crate::core::context::SizingContext;
use crate::core::design_temps::DesignTemps;
use crate::core::psychrometrics::{dry_air_density, enthalpy};
use crate::core::solvers::fixed_point_iterate;
use crate::core::units::{
    GRAINS_PER_LB, LATENT_AIR_CONSTANT, MINUTES_PER_HOUR, SENSIBLE_AIR_CONSTANT,
};
use crate::errors::SizingError;
use crate::input::{
    format_unhandled, Building, DuctInput, DuctSide, Location, WeatherDesignData,
};
use indexmap::IndexMap;

const AIR_CP: f64 = 0.24;
/// Exponent for scaling a 50 Pa duct leakage test down to 25 Pa.
const LEAKAGE_PRESSURE_EXPONENT: f64 = 0.6;
const DE_CORR_MIN: f64 = 0.25;
const DE_CORR_MAX: f64 = 1.0;
const HEATING_ITERATIONS: usize = 20;
const COOLING_ITERATIONS: usize = 50;
const ITERATION_REL_TOL: f64 = 1e-3;
/// Assembly R above which a surface counts as insulated for the regain
/// classification of basements and crawlspaces.
const INSULATED_R_THRESHOLD: f64 = 4.0;

/// One effective duct side after collapsing the declared runs: summed
/// area, UA-weighted R-value, summed leakage and the location holding the
/// largest share of the area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EffectiveDuctSide {
    pub area: f64,
    pub r_value: f64,
    pub leakage_fraction: f64,
    pub leakage_cfm25: f64,
    pub location: Location,
}

impl EffectiveDuctSide {
    fn leakage_cfm(&self, system_cfm: f64) -> f64 {
        self.leakage_fraction * system_cfm + self.leakage_cfm25
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DuctModel {
    pub supply: EffectiveDuctSide,
    pub ret: EffectiveDuctSide,
}

impl DuctModel {
    pub(crate) fn locations(&self) -> [Location; 2] {
        [self.supply.location, self.ret.location]
    }
}

fn leakage_cfm25_equivalent(duct: &DuctInput) -> Result<(f64, f64), SizingError> {
    let declared = [
        duct.leakage_fraction.is_some(),
        duct.leakage_cfm25.is_some(),
        duct.leakage_cfm50.is_some(),
    ]
    .iter()
    .filter(|d| **d)
    .count();
    if declared != 1 {
        return Err(SizingError::invalid_input(format!(
            "duct on the {} side must declare exactly one leakage value, found {declared}",
            duct.side
        )));
    }
    if let Some(frac) = duct.leakage_fraction {
        return Ok((frac, 0.));
    }
    if let Some(cfm25) = duct.leakage_cfm25 {
        return Ok((0., cfm25));
    }
    let cfm50 = duct.leakage_cfm50.unwrap_or(0.);
    Ok((0., cfm50 * (25.0_f64 / 50.0).powf(LEAKAGE_PRESSURE_EXPONENT)))
}

fn collapse_side(ducts: &[&DuctInput]) -> Result<Option<EffectiveDuctSide>, SizingError> {
    if ducts.is_empty() {
        return Ok(None);
    }
    let mut area = 0.;
    let mut ua = 0.;
    let mut leakage_fraction = 0.;
    let mut leakage_cfm25 = 0.;
    let mut location = None;
    let mut location_area = 0.;
    for duct in ducts {
        if duct.location == Location::Ground {
            return Err(SizingError::configuration(format_unhandled(
                "duct location",
                duct.location,
            )));
        }
        let (frac, cfm25) = leakage_cfm25_equivalent(duct)?;
        leakage_fraction += frac;
        leakage_cfm25 += cfm25;
        if duct.location.is_conditioned() {
            // Tested leakage on an in-envelope run still escapes the
            // system; it is re-attributed to a zero-area segment outside
            // while the run itself contributes no conduction surface.
            continue;
        }
        area += duct.area;
        ua += duct.area / duct.r_value.max(0.01);
        if duct.area > location_area || location.is_none() {
            location_area = duct.area;
            location = Some(duct.location);
        }
    }
    Ok(Some(EffectiveDuctSide {
        area,
        r_value: if ua > 0. { area / ua } else { f64::INFINITY },
        leakage_fraction,
        leakage_cfm25,
        location: location.unwrap_or(Location::Outside),
    }))
}

/// Collapse a system's declared duct runs into the two-sided model. A
/// system with no ducts (hydronic, ductless) yields `None` and is exempt
/// from distribution losses. A one-sided declaration gets a tight,
/// zero-area counterpart in conditioned space.
pub(crate) fn extract_duct_model(ducts: &[DuctInput]) -> Result<Option<DuctModel>, SizingError> {
    if ducts.is_empty() {
        return Ok(None);
    }
    let supplies: Vec<&DuctInput> = ducts.iter().filter(|d| d.side == DuctSide::Supply).collect();
    let returns: Vec<&DuctInput> = ducts.iter().filter(|d| d.side == DuctSide::Return).collect();
    let absent = EffectiveDuctSide {
        area: 0.,
        r_value: f64::INFINITY,
        leakage_fraction: 0.,
        leakage_cfm25: 0.,
        location: Location::ConditionedSpace,
    };
    Ok(Some(DuctModel {
        supply: collapse_side(&supplies)?.unwrap_or(absent),
        ret: collapse_side(&returns)?.unwrap_or(absent),
    }))
}

fn insulated(surface_rs: impl Iterator<Item = f64>) -> bool {
    let rs: Vec<f64> = surface_rs.collect();
    if rs.is_empty() {
        return false;
    }
    rs.iter().sum::<f64>() / rs.len() as f64 > INSULATED_R_THRESHOLD
}

/// Thermal regain fraction of duct losses for a duct location (ASHRAE 152
/// Table 6.2). Losses into a conditioned space come straight back;
/// losses to outside are gone; buffer spaces return a share that depends
/// on where the space's insulation sits.
pub(crate) fn regain_factor(
    location: Location,
    building: &Building,
) -> Result<f64, SizingError> {
    let floors_insulated = |loc: Location| {
        insulated(
            building
                .floors
                .iter()
                .filter(|f| f.exterior_adjacent_to == loc)
                .map(|f| f.assembly_r),
        )
    };
    let foundation_walls_insulated = |loc: Location| {
        insulated(
            building
                .foundation_walls
                .iter()
                .filter(|w| w.interior_adjacent_to == loc)
                .map(|w| w.assembly_r),
        )
    };
    let buffer_regain = |loc: Location, both: f64, ceiling: f64, walls: f64, none: f64| {
        match (floors_insulated(loc), foundation_walls_insulated(loc)) {
            (true, true) => both,
            (true, false) => ceiling,
            (false, true) => walls,
            (false, false) => none,
        }
    };

    Ok(match location {
        Location::ConditionedSpace
        | Location::BasementConditioned
        | Location::OtherHousingUnit => 1.0,
        Location::Outside | Location::RoofDeck => 0.0,
        Location::AtticVented | Location::AtticUnvented => 0.10,
        Location::Garage => 0.05,
        Location::BasementUnconditioned => {
            if floors_insulated(Location::BasementUnconditioned) {
                0.30
            } else if foundation_walls_insulated(Location::BasementUnconditioned) {
                0.75
            } else {
                0.50
            }
        }
        Location::CrawlspaceVented => {
            buffer_regain(Location::CrawlspaceVented, 0.17, 0.12, 0.66, 0.50)
        }
        Location::CrawlspaceUnvented => {
            buffer_regain(Location::CrawlspaceUnvented, 0.30, 0.16, 0.76, 0.60)
        }
        Location::OtherHeatedSpace => 0.75,
        Location::OtherMultifamilyBufferSpace => 0.25,
        Location::OtherNonFreezingSpace => 0.0,
        Location::Ground => {
            return Err(SizingError::configuration(format_unhandled(
                "duct location",
                location,
            )))
        }
    })
}

fn ambient_temps(
    design_temps: &IndexMap<Location, DesignTemps>,
    location: Location,
) -> Result<DesignTemps, SizingError> {
    design_temps.get(&location).copied().ok_or_else(|| {
        SizingError::configuration(format_unhandled("duct ambient location", location))
    })
}

/// Conduction fraction through one duct side: the share of the entering
/// temperature difference still present at the duct exit.
fn conduction_fraction(side: &EffectiveDuctSide, cfm: f64, air_density: f64) -> f64 {
    if side.area == 0. || !side.r_value.is_finite() {
        return 1.0;
    }
    (-side.area / (MINUTES_PER_HOUR * cfm * air_density * AIR_CP * side.r_value)).exp()
}

/// Inflate a system's heating load share for duct losses. `supply_temp`
/// is the design supply air temperature of the attached equipment, which
/// fixes the airflow that carries a given load.
pub(crate) fn solve_heating_ducts(
    model: &DuctModel,
    ctx: &SizingContext,
    building: &Building,
    design_temps: &IndexMap<Location, DesignTemps>,
    envelope_heat_load: f64,
    supply_temp: f64,
) -> Result<(f64, bool), SizingError> {
    if envelope_heat_load <= 0. {
        return Ok((0., true));
    }
    let t_amb_s = ambient_temps(design_temps, model.supply.location)?.heat;
    let t_amb_r = ambient_temps(design_temps, model.ret.location)?.heat;
    let f_regain_s = regain_factor(model.supply.location, building)?;
    let f_regain_r = regain_factor(model.ret.location, building)?;
    let air_density = dry_air_density(ctx.pressure_psia, ctx.heat_setpoint);

    let dt_s = ctx.heat_setpoint - t_amb_s;
    let dt_r = ctx.heat_setpoint - t_amb_r;

    let result = fixed_point_iterate(
        |load| {
            let cfm =
                load / (SENSIBLE_AIR_CONSTANT * ctx.acf * (supply_temp - ctx.heat_setpoint));
            let a_s = (1.0 - model.supply.leakage_cfm(cfm) / cfm).clamp(0., 1.);
            let a_r = (1.0 - model.ret.leakage_cfm(cfm) / cfm).clamp(0., 1.);
            let b_s = conduction_fraction(&model.supply, cfm, air_density);
            let b_r = conduction_fraction(&model.ret, cfm, air_density);
            let dt_e = load / (MINUTES_PER_HOUR * cfm * air_density * AIR_CP);

            let de = a_s * b_s
                - a_s * b_s * (1.0 - a_r * b_r) * (dt_r / dt_e)
                - a_s * (1.0 - b_s) * (dt_s / dt_e);
            let de_corr = (de + f_regain_s * (1.0 - de)
                - (f_regain_s - f_regain_r - b_r * (a_r * f_regain_s - f_regain_r))
                    * (dt_r / dt_e))
                .clamp(DE_CORR_MIN, DE_CORR_MAX);
            envelope_heat_load / de_corr
        },
        envelope_heat_load,
        ITERATION_REL_TOL,
        HEATING_ITERATIONS,
        "heating duct load",
    );
    Ok((result.value - envelope_heat_load, result.converged))
}

/// Inflate a system's cooling load shares for duct losses. The sensible
/// delivery effectiveness is evaluated in enthalpy terms so return-side
/// leakage carries its latent penalty; `leaving_air_temp` fixes the
/// airflow for a given sensible load.
pub(crate) fn solve_cooling_ducts(
    model: &DuctModel,
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    building: &Building,
    design_temps: &IndexMap<Location, DesignTemps>,
    envelope_cool_sens: f64,
    envelope_cool_lat: f64,
    leaving_air_temp: f64,
) -> Result<(f64, f64, bool), SizingError> {
    if envelope_cool_sens <= 0. {
        return Ok((0., 0., true));
    }
    let t_amb_s = ambient_temps(design_temps, model.supply.location)?.cool;
    let t_amb_r = ambient_temps(design_temps, model.ret.location)?.cool;
    let f_regain_s = regain_factor(model.supply.location, building)?;
    let f_regain_r = regain_factor(model.ret.location, building)?;
    let air_density = dry_air_density(ctx.pressure_psia, ctx.cool_setpoint);

    let w_indoor = ctx.cool_indoor_grains / GRAINS_PER_LB;
    let h_in = enthalpy(ctx.cool_setpoint, w_indoor);
    // Return-side ambient enthalpy: outdoor moisture for unconditioned
    // locations, indoor moisture where the duct sits inside the envelope.
    let w_amb_r = if model.ret.location.is_conditioned() {
        w_indoor
    } else {
        weather.cooling_humidity_ratio
    };
    let h_amb_r = enthalpy(t_amb_r, w_amb_r);

    let dt_s = t_amb_s - ctx.cool_setpoint;
    let dt_r = t_amb_r - ctx.cool_setpoint;

    let mut cool_lat = envelope_cool_lat;
    let result = fixed_point_iterate(
        |load_tot| {
            let load_sens = (load_tot - cool_lat).max(envelope_cool_sens);
            let cfm = load_sens
                / (SENSIBLE_AIR_CONSTANT * ctx.acf * (ctx.cool_setpoint - leaving_air_temp));
            let q_s = model.supply.leakage_cfm(cfm);
            let q_r = model.ret.leakage_cfm(cfm);
            let a_s = (1.0 - q_s / cfm).clamp(0., 1.);
            let a_r = (1.0 - q_r / cfm).clamp(0., 1.);
            let b_s = conduction_fraction(&model.supply, cfm, air_density);
            let b_r = conduction_fraction(&model.ret, cfm, air_density);

            // Delivered enthalpy drop per pound of supply air, net of
            // return leakage, return conduction and supply conduction.
            let dh_equipment = load_tot / (MINUTES_PER_HOUR * cfm * air_density);
            let dh_return_leak = (1.0 - a_r) * (h_amb_r - h_in);
            let dh_return_cond = a_r * AIR_CP * (1.0 - b_r) * dt_r;
            let dh_supply_cond = AIR_CP * (1.0 - b_s) * (t_amb_s - leaving_air_temp);
            let de = (a_s * MINUTES_PER_HOUR * cfm * air_density / load_tot)
                * (dh_equipment - dh_return_leak - dh_return_cond - dh_supply_cond);

            let dt_e = -load_tot / (MINUTES_PER_HOUR * cfm * air_density * AIR_CP);
            let de_corr = (de + f_regain_s * (1.0 - de)
                - (f_regain_s - f_regain_r - b_r * (a_r * f_regain_s - f_regain_r))
                    * (dt_r / dt_e))
                .clamp(DE_CORR_MIN, DE_CORR_MAX);

            // Moisture pulled in through return leaks adds latent load.
            cool_lat = envelope_cool_lat
                + (LATENT_AIR_CONSTANT
                    * ctx.acf
                    * q_r
                    * (ctx.cool_design_grains - ctx.cool_indoor_grains))
                    .max(0.);
            (envelope_cool_sens + envelope_cool_lat) / de_corr
        },
        envelope_cool_sens + envelope_cool_lat,
        ITERATION_REL_TOL,
        COOLING_ITERATIONS,
        "cooling duct load",
    );
    let cool_sens = (result.value - cool_lat).max(envelope_cool_sens);
    Ok((
        cool_sens - envelope_cool_sens,
        cool_lat - envelope_cool_lat,
        result.converged,
    ))
}
