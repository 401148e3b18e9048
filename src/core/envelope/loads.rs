//! Building-level design load aggregate.
//!
//! Every envelope pathway contributes a pure increment; the totals are
//! recomputed from the named components in exactly one place so the
//! additive invariant is testable on its own. Duct loads start at zero,
//! are summed across HVAC systems by the duct solver, and are folded into
//! the totals exactly once.

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BuildingDesignLoads {
    // Heating components, Btu/hr
    pub heat_windows: f64,
    pub heat_skylights: f64,
    pub heat_doors: f64,
    pub heat_walls: f64,
    pub heat_roofs: f64,
    pub heat_ceilings: f64,
    pub heat_floors: f64,
    pub heat_slabs: f64,
    pub heat_infil_vent: f64,
    // Cooling sensible components, Btu/hr
    pub cool_windows: f64,
    pub cool_skylights: f64,
    pub cool_doors: f64,
    pub cool_walls: f64,
    pub cool_roofs: f64,
    pub cool_ceilings: f64,
    pub cool_floors: f64,
    pub cool_infil_vent_sens: f64,
    pub cool_internal_gains_sens: f64,
    // Cooling latent components, Btu/hr
    pub cool_infil_vent_lat: f64,
    pub cool_internal_gains_lat: f64,
    // Duct additions, summed across systems then folded in once
    pub heat_ducts: f64,
    pub cool_ducts_sens: f64,
    pub cool_ducts_lat: f64,
    // Aggregated totals
    pub heat_tot: f64,
    pub cool_sens: f64,
    pub cool_lat: f64,
    pub cool_tot: f64,
}

impl BuildingDesignLoads {
    /// Recompute totals from the named components. Cooling latent is
    /// floored at zero; a negative latent sum has no physical meaning at
    /// design conditions, so its sub-components are zeroed with it.
    pub(crate) fn aggregate(&mut self) {
        self.heat_tot = self.heat_windows
            + self.heat_skylights
            + self.heat_doors
            + self.heat_walls
            + self.heat_roofs
            + self.heat_ceilings
            + self.heat_floors
            + self.heat_slabs
            + self.heat_infil_vent
            + self.heat_ducts;
        self.cool_sens = self.cool_windows
            + self.cool_skylights
            + self.cool_doors
            + self.cool_walls
            + self.cool_roofs
            + self.cool_ceilings
            + self.cool_floors
            + self.cool_infil_vent_sens
            + self.cool_internal_gains_sens
            + self.cool_ducts_sens;
        let latent = self.cool_infil_vent_lat + self.cool_internal_gains_lat + self.cool_ducts_lat;
        if latent < 0. {
            self.cool_infil_vent_lat = 0.;
            self.cool_internal_gains_lat = 0.;
            self.cool_ducts_lat = 0.;
            self.cool_lat = 0.;
        } else {
            self.cool_lat = latent;
        }
        self.cool_tot = self.cool_sens + self.cool_lat;
    }

    /// Fold the summed per-system duct increments into the aggregate.
    /// Called exactly once, after all systems' duct solves.
    pub(crate) fn apply_duct_loads(&mut self, heat: f64, cool_sens: f64, cool_lat: f64) {
        self.heat_ducts += heat;
        self.cool_ducts_sens += cool_sens;
        self.cool_ducts_lat += cool_lat;
        self.aggregate();
    }
}
