//! Envelope design-load calculator.
//!
//! Each surface family computes its heating and cooling increments in
//! isolation; this module runs them all and folds the increments into a
//! single [`BuildingDesignLoads`] aggregate. Duct loads are not part of
//! the envelope and are applied later by the duct solver.

mod fenestration;
mod infiltration;
mod internal_gains;
mod loads;
mod opaque;
mod slab;

pub use infiltration::{ach50_from_sla, sla_from_ach50};
pub use loads::BuildingDesignLoads;

use crate::core::context::SizingContext;
use crate::core::design_temps::DesignTemps;
use crate::errors::SizingError;
use crate::input::{Building, Location, WeatherDesignData};
use indexmap::IndexMap;

pub fn calculate_design_loads(
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    building: &Building,
    design_temps: &IndexMap<Location, DesignTemps>,
) -> Result<BuildingDesignLoads, SizingError> {
    let fenestration = fenestration::process_fenestration(ctx, building);
    let opaque = opaque::process_opaque_surfaces(ctx, weather.cooling_drybulb, building, design_temps)?;
    let slabs = slab::process_slabs(ctx, weather, building);
    let infil_vent = infiltration::process_infiltration_ventilation(ctx, weather, building);
    let gains = internal_gains::process_internal_gains(building);

    let mut loads = BuildingDesignLoads {
        heat_windows: fenestration.heat_windows,
        heat_skylights: fenestration.heat_skylights,
        heat_doors: opaque.heat_doors,
        heat_walls: opaque.heat_walls,
        heat_roofs: opaque.heat_roofs,
        heat_ceilings: opaque.heat_ceilings,
        heat_floors: opaque.heat_floors,
        heat_slabs: slabs.heat,
        heat_infil_vent: infil_vent.heat,
        cool_windows: fenestration.cool_windows,
        cool_skylights: fenestration.cool_skylights,
        cool_doors: opaque.cool_doors,
        cool_walls: opaque.cool_walls,
        cool_roofs: opaque.cool_roofs,
        cool_ceilings: opaque.cool_ceilings,
        cool_floors: opaque.cool_floors,
        cool_infil_vent_sens: infil_vent.cool_sens,
        cool_infil_vent_lat: infil_vent.cool_lat,
        cool_internal_gains_sens: gains.cool_sens,
        cool_internal_gains_lat: gains.cool_lat,
        ..Default::default()
    };
    loads.aggregate();
    Ok(loads)
}
