//! Residential design-load and HVAC equipment sizing engine.
//!
//! Implements the ACCA Manual J design-load procedure (envelope, solar
//! fenestration, infiltration, internal gains), ASHRAE 152 duct losses,
//! Manual S equipment selection and vertical ground-loop sizing for
//! ground-source heat pumps. The pipeline is single-threaded and
//! deterministic: identical inputs give bit-identical outputs.

pub mod core;
pub mod errors;
pub mod input;

pub use crate::core::design_temps::DesignTemps;
pub use crate::core::envelope::BuildingDesignLoads;
pub use crate::core::equipment::{CoolingSizing, HeatingSizing, HvacSizingResult};
pub use crate::core::ground_loop::GroundLoopSizing;
pub use crate::errors::SizingError;

use crate::core::context::SizingContext;
use crate::core::design_temps::resolve_design_temps;
use crate::core::ducts;
use crate::core::envelope::calculate_design_loads;
use crate::core::equipment::{self, HvacSystemInfo, SystemLoads};
use crate::core::ground_loop::size_ground_loop;
use crate::input::{CoolType, HeatType, Location, SizingInput};
use indexmap::IndexMap;
use serde::Serialize;

/// Full result of a sizing run: the resolved buffer-space temperatures,
/// the design loads with duct losses folded in, one sizing result per
/// HVAC system and the non-fatal warnings raised along the way.
#[derive(Clone, Debug, Serialize)]
pub struct SizingOutput {
    pub design_temps: IndexMap<Location, DesignTemps>,
    pub loads: BuildingDesignLoads,
    pub systems: Vec<HvacSizingResult>,
    pub warnings: Vec<String>,
}

/// Run the sizing pipeline: design temperatures, envelope loads, duct
/// increments (summed across systems, applied once), equipment selection
/// and ground loops for any ground-source systems.
pub fn run_sizing(input: &SizingInput) -> Result<SizingOutput, SizingError> {
    let weather = &input.weather;
    let building = &input.building;
    let mut warnings = Vec::new();

    let ctx = SizingContext::new(weather, building).map_err(SizingError::from)?;

    let infos = input
        .hvac_systems
        .iter()
        .map(HvacSystemInfo::extract)
        .collect::<Result<Vec<_>, _>>()?;

    let duct_locations: Vec<Location> = infos
        .iter()
        .filter_map(|info| info.ducts.as_ref())
        .flat_map(|model| model.locations())
        .collect();
    let design_temps = resolve_design_temps(&ctx, weather, building, &duct_locations)?;

    let mut loads = calculate_design_loads(&ctx, weather, building, &design_temps)?;
    if ctx.cool_design_grains < ctx.cool_indoor_grains && loads.cool_lat == 0. {
        warnings.push(
            "dry design condition: negative latent infiltration load clamped to zero".to_string(),
        );
    }

    // Per-system duct increments against the envelope load shares, summed
    // and folded into the building aggregate exactly once.
    let mut system_loads = Vec::with_capacity(infos.len());
    let mut duct_heat = 0.;
    let mut duct_cool_sens = 0.;
    let mut duct_cool_lat = 0.;
    for info in &infos {
        let heat_share = info
            .heating
            .as_ref()
            .map_or(0., |h| h.fraction_load_served * loads.heat_tot);
        let (cool_sens_share, cool_lat_share) = info.cooling.as_ref().map_or((0., 0.), |c| {
            (
                c.fraction_load_served * loads.cool_sens,
                c.fraction_load_served * loads.cool_lat,
            )
        });

        let mut sized = SystemLoads {
            heat: heat_share,
            cool_sens: cool_sens_share,
            cool_lat: cool_lat_share,
        };
        if let Some(model) = &info.ducts {
            if let Some(heating) = &info.heating {
                let supply_temp = equipment::heating_supply_temp(heating.heat_type);
                let (increment, converged) = ducts::solve_heating_ducts(
                    model,
                    &ctx,
                    building,
                    &design_temps,
                    heat_share,
                    supply_temp,
                )?;
                if !converged {
                    warnings.push(format!(
                        "heating duct iteration for system '{}' did not converge",
                        info.id
                    ));
                }
                sized.heat += increment;
                duct_heat += increment;
            }
            if info.cooling.is_some() {
                let shr = if cool_sens_share + cool_lat_share > 0. {
                    cool_sens_share / (cool_sens_share + cool_lat_share)
                } else {
                    1.0
                };
                let lat_temp = equipment::leaving_air_temp(shr);
                let (sens_inc, lat_inc, converged) = ducts::solve_cooling_ducts(
                    model,
                    &ctx,
                    weather,
                    building,
                    &design_temps,
                    cool_sens_share,
                    cool_lat_share,
                    lat_temp,
                )?;
                if !converged {
                    warnings.push(format!(
                        "cooling duct iteration for system '{}' did not converge",
                        info.id
                    ));
                }
                sized.cool_sens += sens_inc;
                sized.cool_lat += lat_inc;
                duct_cool_sens += sens_inc;
                duct_cool_lat += lat_inc;
            }
        }
        system_loads.push(sized);
    }
    loads.apply_duct_loads(duct_heat, duct_cool_sens, duct_cool_lat);

    let mut systems = Vec::with_capacity(infos.len());
    for (info, sized) in infos.iter().zip(&system_loads) {
        let mut result = equipment::size_system(info, &ctx, weather, sized, &mut warnings)?;

        let is_gshp = matches!(
            info.heating.as_ref().map(|h| h.heat_type),
            Some(HeatType::GroundSourceHeatPump)
        ) || matches!(
            info.cooling.as_ref().map(|c| c.cool_type),
            Some(CoolType::GroundSourceHeatPump)
        );
        if is_gshp {
            if let Some(spec) = &info.ground_loop {
                let heat_cap = result.heating.as_ref().map_or(0., |h| h.capacity);
                let cool_cap = result.cooling.as_ref().map_or(0., |c| c.capacity_total);
                if heat_cap > 0. || cool_cap > 0. {
                    result.ground_loop = Some(size_ground_loop(
                        spec,
                        weather,
                        building.ground_conductivity,
                        heat_cap,
                        cool_cap,
                    )?);
                }
            }
        }
        systems.push(result);
    }

    Ok(SizingOutput {
        design_temps,
        loads,
        systems,
        warnings,
    })
}
