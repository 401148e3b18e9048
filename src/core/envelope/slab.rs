//! Slab heating loads: on-grade slabs through an F-factor (heat loss per
//! foot of exposed perimeter) and below-grade slabs through a 2D
//! boundary-layer effective U-factor. Slabs carry no cooling load at
//! design conditions.

use crate::core::context::SizingContext;
use crate::input::{Building, Slab, WeatherDesignData};
use std::f64::consts::PI;

// Per-inch R-values of the slab construction layers
const CONCRETE_R_PER_INCH: f64 = 0.08;
const GRAVEL_R_PER_INCH: f64 = 0.65;
const GRAVEL_BED_THICKNESS_IN: f64 = 4.0;
const INTERIOR_AIR_FILM_R: f64 = 0.92;

/// F-factor for an on-grade slab edge, Btu/hr-ft-F per foot of exposed
/// perimeter.
///
/// The effective soil path radius is uncertain, so F-values are computed
/// for six path radii (8 through 13 ft) and averaged. Each one-foot
/// concentric ring of slab conducts through the slab layers and then
/// along a semicircular soil path of length pi * radius out to the
/// exposed edge; perimeter insulation adds to the rings it covers.
pub(crate) fn calc_slab_f_value(slab: &Slab, ground_conductivity: f64) -> f64 {
    let soil_r_per_foot = 1.0 / ground_conductivity;
    let r_slab_layers = INTERIOR_AIR_FILM_R
        + slab.thickness * CONCRETE_R_PER_INCH
        + GRAVEL_BED_THICKNESS_IN * GRAVEL_R_PER_INCH;

    let mut f_values = Vec::with_capacity(6);
    for path_radius in 8..=13_u32 {
        let mut f_value = 0.0;
        for radius in 0..=path_radius {
            let soil_path_length = PI * radius as f64;
            let r_insulation = if (radius as f64) < slab.perimeter_insulation_width {
                slab.perimeter_insulation_r
            } else {
                0.0
            };
            let r_total = r_slab_layers + soil_r_per_foot * soil_path_length + r_insulation;
            f_value += 1.0 / r_total;
        }
        f_values.push(f_value);
    }
    f_values.iter().sum::<f64>() / f_values.len() as f64
}

/// Effective U-factor for a below-grade slab from the log-form
/// boundary-layer approximation of two-dimensional ground heat flow,
/// in Btu/hr-ft^2-F. `z_f` is the depth of the slab below grade.
pub(crate) fn calc_below_grade_slab_ufactor(
    slab: &Slab,
    ground_conductivity: f64,
) -> f64 {
    let w_b = slab.width;
    let z_f = slab.depth_below_grade;
    let r_other = INTERIOR_AIR_FILM_R
        + slab.thickness * CONCRETE_R_PER_INCH
        + slab.perimeter_insulation_r;
    let k_soil = ground_conductivity;
    (2.0 * k_soil / (PI * w_b))
        * (((w_b / 2.0 + z_f / 2.0 + (k_soil * r_other) / PI).ln())
            - ((z_f / 2.0 + (k_soil * r_other) / PI).ln()))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SlabLoads {
    pub heat: f64,
}

pub(crate) fn process_slabs(
    ctx: &SizingContext,
    weather: &WeatherDesignData,
    building: &Building,
) -> SlabLoads {
    let mut heat = 0.0;
    for slab in building
        .slabs
        .iter()
        .filter(|s| s.interior_adjacent_to.is_conditioned())
    {
        if slab.depth_below_grade > 0.0 {
            let ufactor = calc_below_grade_slab_ufactor(slab, building.ground_conductivity);
            heat += ufactor
                * slab.area
                * (ctx.heat_setpoint - weather.ground_heating_design_temp());
        } else {
            let f_value = calc_slab_f_value(slab, building.ground_conductivity);
            heat += f_value * slab.exposed_perimeter * ctx.htd;
        }
    }
    SlabLoads { heat }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Location;
    use rstest::*;

    fn slab(perimeter_r: f64, perimeter_width: f64) -> Slab {
        Slab {
            area: 1500.,
            exposed_perimeter: 120.,
            thickness: 4.,
            perimeter_insulation_r: perimeter_r,
            perimeter_insulation_width: perimeter_width,
            depth_below_grade: 0.,
            width: 30.,
            interior_adjacent_to: Location::ConditionedSpace,
        }
    }

    #[rstest]
    fn should_compute_f_value_in_expected_band_for_uninsulated_slab() {
        let f = calc_slab_f_value(&slab(0., 0.), 1.0);
        assert!(
            (0.3..=1.0).contains(&f),
            "uninsulated 4-in slab F-factor out of band: {f}"
        );
    }

    #[rstest]
    fn should_reduce_f_value_with_perimeter_insulation() {
        let bare = calc_slab_f_value(&slab(0., 0.), 1.0);
        let insulated = calc_slab_f_value(&slab(10., 4.), 1.0);
        assert!(insulated < bare);
    }

    #[rstest]
    fn should_reduce_f_value_in_less_conductive_soil() {
        let wet = calc_slab_f_value(&slab(0., 0.), 1.4);
        let dry = calc_slab_f_value(&slab(0., 0.), 0.5);
        assert!(dry < wet);
    }

    #[rstest]
    fn should_reduce_below_grade_ufactor_with_depth() {
        let mut shallow = slab(0., 0.);
        shallow.depth_below_grade = 2.;
        let mut deep = slab(0., 0.);
        deep.depth_below_grade = 7.;
        let u_shallow = calc_below_grade_slab_ufactor(&shallow, 1.0);
        let u_deep = calc_below_grade_slab_ufactor(&deep, 1.0);
        assert!(u_deep < u_shallow);
        assert!(u_shallow < 0.3, "below-grade U should be small: {u_shallow}");
    }
}
