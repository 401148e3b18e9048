//! Opaque surface design loads: doors, walls, roofs, ceilings and floors.
//!
//! Heating is UA * HTD throughout. Cooling uses Manual J cooling load
//! temperature differences (CLTD): walls via an 11-level construction
//! group (A-K), roofs via assembly-R tiers with color/material derating,
//! and partition surfaces via the resolved buffer-space design temps.

use crate::core::context::SizingContext;
use crate::core::design_temps::{get_space_ua_values, DesignTemps};
use crate::errors::SizingError;
use crate::input::{
    format_unhandled, Building, FoundationLeakiness, Location, RoofMaterial, SurfaceColor, Wall,
    WallConstruction,
};
use indexmap::IndexMap;
use std::fmt::{self, Display};

/// Manual J wall construction group, A (massive, lowest CLTD) through
/// K (lightest, highest CLTD).
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct WallGroup(u8);

impl WallGroup {
    fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl Display for WallGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (b'A' + self.0 - 1) as char)
    }
}

// Base CLTD by wall group A-K, sunlit and shaded exposures
// (Manual J Table 4A construction groups).
const CLTD_BASE_SUN: [f64; 11] = [
    18.8, 19.65, 20.5, 21.25, 22.0, 24.5, 27.0, 29.45, 31.9, 34.95, 38.0,
];
const CLTD_BASE_SHADE: [f64; 11] = [
    12.6, 12.85, 13.1, 13.55, 14.0, 15.45, 16.9, 18.45, 20.0, 22.5, 25.0,
];

/// Wall group determination. The thresholds were estimated from the
/// Manual J Table 4A construction listings: lower assembly U-factors and
/// brick veneer both push a wall toward the heavier (lower-lettered)
/// groups.
pub(crate) fn determine_wall_group(wall: &Wall) -> WallGroup {
    use WallConstruction::*;
    let group = match wall.construction {
        WoodStud | SteelStud | DoubleWoodStud => {
            let brick = matches!(wall.siding, crate::input::Siding::Brick);
            if brick {
                match wall.ufactor {
                    u if u <= 0.070 => 1,
                    u if u <= 0.083 => 2,
                    u if u <= 0.095 => 3,
                    u if u <= 0.100 => 4,
                    _ => 5,
                }
            } else {
                match wall.ufactor {
                    u if u <= 0.048 => 2,
                    u if u <= 0.059 => 3,
                    u if u <= 0.083 => 4,
                    u if u <= 0.095 => 5,
                    u if u <= 0.102 => 6,
                    u if u <= 0.127 => 7,
                    _ => 8,
                }
            }
        }
        StructuralInsulatedPanel | InsulatedConcreteForm => 2,
        ConcreteMasonryUnit => {
            if wall.ufactor <= 0.100 {
                2
            } else {
                3
            }
        }
        StructuralBrick | StrawBale | Stone | Adobe => 1,
        LogWall => 3,
    };
    WallGroup(group)
}

/// CLTD correction for the local design condition: published values
/// assume a 95 F design drybulb and a medium daily range. Below a 10 F
/// cooling temperature difference the table domain is exceeded and the
/// CLTD is scaled down toward zero.
fn adjust_cltd(ctx: &SizingContext, cooling_drybulb: f64, cltd_base: f64) -> f64 {
    let adjusted =
        cltd_base + (cooling_drybulb - 95.) + ctx.daily_range_class.temp_adjustment();
    if ctx.ctd >= 10. {
        adjusted.max(0.)
    } else if ctx.ctd > 0. {
        (adjusted * ctx.ctd / 10.).max(0.)
    } else {
        0.
    }
}

/// A wall within 45 degrees of true north sees no direct sun at the
/// design condition.
fn is_north_facing(azimuth: f64) -> bool {
    let az = azimuth.rem_euclid(360.);
    !(45.0..=315.0).contains(&az)
}

/// Roof CLTD by assembly R tier (Manual J Figure A12-16 roof-joist-ceiling
/// sandwiches), before the color/material multiplier.
fn roof_cltd_base(assembly_r: f64) -> f64 {
    match assembly_r {
        r if r <= 6. => 50.,
        r if r <= 13. => 45.,
        r if r <= 15. => 38.,
        r if r <= 21. => 31.,
        r if r <= 30. => 30.,
        _ => 27.,
    }
}

fn roof_cltd_multiplier(material: RoofMaterial, color: SurfaceColor) -> f64 {
    use SurfaceColor::*;
    match color {
        Dark | MediumDark => 1.0,
        Medium | Light => match material {
            RoofMaterial::Metal | RoofMaterial::TileOrSlate => 0.83,
            _ => 0.92,
        },
        Reflective => 0.65,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct OpaqueLoads {
    pub heat_doors: f64,
    pub heat_walls: f64,
    pub heat_roofs: f64,
    pub heat_ceilings: f64,
    pub heat_floors: f64,
    pub cool_doors: f64,
    pub cool_walls: f64,
    pub cool_roofs: f64,
    pub cool_ceilings: f64,
    pub cool_floors: f64,
}

fn partition_temps(
    design_temps: &IndexMap<Location, DesignTemps>,
    location: Location,
    surface: &str,
) -> Result<DesignTemps, SizingError> {
    design_temps.get(&location).copied().ok_or_else(|| {
        SizingError::configuration(format_unhandled(
            &format!("{surface} adjacent location"),
            location,
        ))
    })
}

pub(crate) fn process_opaque_surfaces(
    ctx: &SizingContext,
    cooling_drybulb: f64,
    building: &Building,
    design_temps: &IndexMap<Location, DesignTemps>,
) -> Result<OpaqueLoads, SizingError> {
    let mut loads = OpaqueLoads::default();

    for door in &building.doors {
        match door.exterior_adjacent_to {
            Location::Outside => {
                loads.heat_doors += door.ufactor * door.area * ctx.htd;
                loads.cool_doors += door.ufactor * door.area * ctx.ctd.max(0.);
            }
            location => {
                let temps = partition_temps(design_temps, location, "door")?;
                loads.heat_doors += door.ufactor * door.area * (ctx.heat_setpoint - temps.heat);
                loads.cool_doors +=
                    door.ufactor * door.area * (temps.cool - ctx.cool_setpoint).max(0.);
            }
        }
    }

    for wall in building
        .walls
        .iter()
        .filter(|w| w.interior_adjacent_to.is_conditioned())
    {
        match wall.exterior_adjacent_to {
            Location::Outside => {
                loads.heat_walls += wall.ufactor * wall.area * ctx.htd;
                let group = determine_wall_group(wall);
                let cltd_base = if is_north_facing(wall.azimuth) {
                    CLTD_BASE_SHADE[group.index()]
                } else {
                    CLTD_BASE_SUN[group.index()]
                };
                let cltd = adjust_cltd(ctx, cooling_drybulb, cltd_base);
                loads.cool_walls += wall.ufactor * wall.area * cltd;
            }
            location => {
                let temps = partition_temps(design_temps, location, "wall")?;
                loads.heat_walls += wall.ufactor * wall.area * (ctx.heat_setpoint - temps.heat);
                loads.cool_walls +=
                    wall.ufactor * wall.area * (temps.cool - ctx.cool_setpoint).max(0.);
            }
        }
    }

    // Cathedral/conditioned roof decks; attic roofs are accounted through
    // the ceiling below the attic instead
    for roof in building
        .roofs
        .iter()
        .filter(|r| r.interior_adjacent_to.is_conditioned())
    {
        let ua = roof.area / roof.assembly_r;
        loads.heat_roofs += ua * ctx.htd;
        let cltd_base =
            roof_cltd_base(roof.assembly_r) * roof_cltd_multiplier(roof.material, roof.color);
        loads.cool_roofs += ua * adjust_cltd(ctx, cooling_drybulb, cltd_base);
    }

    for ceiling in &building.ceilings {
        let ua = ceiling.area / ceiling.assembly_r;
        let temps = partition_temps(design_temps, ceiling.exterior_adjacent_to, "ceiling")?;
        loads.heat_ceilings += ua * (ctx.heat_setpoint - temps.heat);
        loads.cool_ceilings += ua * (temps.cool - ctx.cool_setpoint).max(0.);
    }

    for floor in &building.floors {
        let ua = floor.area / floor.assembly_r;
        match floor.exterior_adjacent_to {
            Location::Outside => {
                loads.heat_floors += ua * ctx.htd;
                loads.cool_floors += ua * ctx.ctd.max(0.);
            }
            location @ (Location::CrawlspaceVented
            | Location::CrawlspaceUnvented
            | Location::BasementUnconditioned) => {
                let space_ua = get_space_ua_values(location, building);
                let ua_ambient = space_ua.outside + space_ua.ground;
                let leakiness = floor.foundation_leakiness.unwrap_or(match location {
                    Location::CrawlspaceVented => FoundationLeakiness::VentedOrLeaky,
                    _ => FoundationLeakiness::SealedTight,
                });
                // Partition temperature difference from the UA ratio between
                // the floor and the surrounding foundation enclosure; air
                // exchange in a vented/leaky space quadruples the effective
                // ambient coupling
                let coupling = match leakiness {
                    FoundationLeakiness::VentedOrLeaky => 4. * ua_ambient,
                    FoundationLeakiness::SealedTight => ua_ambient,
                };
                let fraction = if coupling + ua > 0. {
                    coupling / (coupling + ua)
                } else {
                    0.
                };
                loads.heat_floors += ua * fraction * ctx.htd;
                loads.cool_floors += ua * fraction * ctx.ctd.max(0.);
            }
            location => {
                let temps = partition_temps(design_temps, location, "floor")?;
                loads.heat_floors += ua * (ctx.heat_setpoint - temps.heat);
                loads.cool_floors += ua * (temps.cool - ctx.cool_setpoint).max(0.);
            }
        }
    }

    Ok(loads)
}
