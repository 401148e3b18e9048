//! Window and skylight design loads, Manual J "Average Load Procedure"
//! plus the adequate-exposure-diversity (AED) excursion check.
//!
//! Cooling loads combine a latitude-interpolated peak solar factor (PSF)
//! table with direction-dependent cooling load factors (CLF); both tables
//! are interpolated across the 22.5 degree azimuth rows. All fenestration
//! feeds one 13-hour (8 a.m. to 8 p.m.) aggregate load curve; if the peak
//! hour exceeds 1.3x the daily mean, the excess is added to the averaged
//! load so a single large west exposure cannot be masked by
//! load-averaging.

use crate::core::context::SizingContext;
use crate::input::{Building, Window};
use interp::{interp, InterpMode};

/// Hours of the fenestration load curve, 8 a.m. through 8 p.m.
pub(crate) const AED_HOURS: usize = 13;
const FIRST_AED_HOUR: usize = 8;

/// Solar declination used for all fenestration shading geometry, degrees
/// (mid-August design condition).
const DESIGN_DECLINATION_DEG: f64 = 12.1;

/// SHGC of the single-pane reference glazing the PSF table is published for.
const REFERENCE_GLAZING_SHGC: f64 = 0.87;

const LATITUDES: [f64; 12] = [
    20., 24., 28., 32., 36., 40., 44., 48., 52., 56., 60., 64.,
];

// Peak solar factor, Btu/hr-ft^2 through single glazing, by surface azimuth
// (rows, 22.5 degree bins from north) and latitude (columns, 20-64 N).
// Derived from clear-sky solar geometry at the mid-August design declination.
const PSF: [[f64; 12]; 17] = [
    [68.6, 66.7, 65.1, 63.6, 62.4, 61.5, 61.0, 61.2, 61.9, 63.4, 65.8, 69.3],
    [156.7, 155.1, 153.7, 152.4, 151.4, 150.5, 149.4, 148.6, 148.2, 148.2, 147.9, 148.8],
    [225.5, 224.4, 223.5, 222.6, 221.9, 221.3, 220.3, 219.5, 219.3, 219.7, 219.5, 219.2],
    [264.6, 264.2, 263.8, 263.5, 263.2, 263.0, 262.2, 261.6, 261.7, 262.3, 262.2, 262.0],
    [267.9, 268.2, 268.6, 268.8, 269.0, 269.2, 269.2, 269.4, 269.5, 269.6, 269.6, 269.6],
    [235.1, 236.5, 238.1, 239.9, 241.9, 244.0, 246.2, 248.4, 250.7, 253.0, 255.3, 257.5],
    [174.9, 179.7, 185.1, 190.9, 197.1, 203.5, 210.1, 216.7, 223.3, 229.7, 235.9, 241.8],
    [104.3, 115.1, 126.7, 138.6, 150.8, 162.9, 174.9, 186.5, 197.8, 208.6, 218.7, 228.2],
    [63.7, 80.5, 97.1, 113.4, 129.3, 144.6, 159.5, 173.7, 187.2, 199.9, 211.8, 222.8],
    [104.3, 115.1, 126.7, 138.6, 150.8, 162.9, 174.9, 186.5, 197.8, 208.6, 218.7, 228.2],
    [174.9, 179.7, 185.1, 190.9, 197.1, 203.5, 210.1, 216.7, 223.3, 229.7, 235.9, 241.8],
    [235.1, 236.5, 238.1, 239.9, 241.9, 244.0, 246.2, 248.4, 250.7, 253.0, 255.3, 257.5],
    [267.9, 268.2, 268.6, 268.8, 269.0, 269.2, 269.2, 269.4, 269.5, 269.6, 269.6, 269.6],
    [264.6, 264.2, 263.8, 263.5, 263.2, 263.0, 262.2, 261.6, 261.7, 262.3, 262.2, 262.0],
    [225.5, 224.4, 223.5, 222.6, 221.9, 221.3, 220.3, 219.5, 219.3, 219.7, 219.5, 219.2],
    [156.7, 155.1, 153.7, 152.4, 151.4, 150.5, 149.4, 148.6, 148.2, 148.2, 147.9, 148.8],
    [68.6, 66.7, 65.1, 63.6, 62.4, 61.5, 61.0, 61.2, 61.9, 63.4, 65.8, 69.3],
];

// Peak solar factor for horizontal glazing (skylight limit case) by latitude.
const PSF_HORIZONTAL: [f64; 12] = [
    272.7, 269.7, 265.6, 260.4, 254.0, 246.5, 238.0, 228.5, 218.0, 206.5, 194.3, 181.2,
];

// Hourly cooling load factors by surface azimuth bin, hours 8-20.
const CLF_HOURLY: [[f64; AED_HOURS]; 17] = [
    [0.600, 0.497, 0.481, 0.481, 0.481, 0.481, 0.481, 0.481, 0.489, 0.561, 0.646, 0.398, 0.191],
    [0.652, 0.456, 0.290, 0.213, 0.198, 0.198, 0.198, 0.198, 0.198, 0.198, 0.178, 0.099, 0.040],
    [0.752, 0.611, 0.406, 0.244, 0.160, 0.135, 0.135, 0.135, 0.135, 0.135, 0.122, 0.068, 0.027],
    [0.813, 0.718, 0.534, 0.339, 0.199, 0.130, 0.114, 0.114, 0.114, 0.114, 0.103, 0.057, 0.023],
    [0.867, 0.811, 0.656, 0.463, 0.270, 0.158, 0.112, 0.112, 0.112, 0.112, 0.100, 0.056, 0.022],
    [0.916, 0.905, 0.786, 0.617, 0.420, 0.248, 0.155, 0.124, 0.124, 0.124, 0.112, 0.062, 0.025],
    [0.917, 0.967, 0.910, 0.791, 0.618, 0.418, 0.258, 0.175, 0.152, 0.152, 0.137, 0.076, 0.030],
    [0.776, 0.915, 0.968, 0.950, 0.865, 0.716, 0.523, 0.340, 0.237, 0.199, 0.179, 0.099, 0.040],
    [0.366, 0.541, 0.733, 0.878, 0.956, 0.963, 0.899, 0.767, 0.580, 0.389, 0.254, 0.116, 0.046],
    [0.199, 0.218, 0.317, 0.485, 0.680, 0.840, 0.939, 0.970, 0.931, 0.815, 0.587, 0.286, 0.090],
    [0.152, 0.152, 0.164, 0.234, 0.386, 0.579, 0.761, 0.891, 0.961, 0.945, 0.752, 0.390, 0.131],
    [0.124, 0.124, 0.124, 0.140, 0.225, 0.384, 0.579, 0.756, 0.885, 0.934, 0.783, 0.418, 0.145],
    [0.112, 0.112, 0.112, 0.112, 0.135, 0.248, 0.422, 0.620, 0.784, 0.876, 0.765, 0.417, 0.149],
    [0.114, 0.114, 0.114, 0.114, 0.122, 0.176, 0.310, 0.494, 0.684, 0.814, 0.741, 0.413, 0.151],
    [0.135, 0.135, 0.135, 0.135, 0.135, 0.148, 0.221, 0.372, 0.570, 0.742, 0.716, 0.409, 0.154],
    [0.198, 0.198, 0.198, 0.198, 0.198, 0.198, 0.206, 0.263, 0.421, 0.625, 0.677, 0.405, 0.162],
    [0.600, 0.497, 0.481, 0.481, 0.481, 0.481, 0.481, 0.481, 0.489, 0.561, 0.646, 0.398, 0.191],
];

// Average cooling load factors by surface azimuth bin (Average Load
// Procedure), same binning as the hourly table.
const CLF_AVERAGE: [f64; 17] = [
    0.566, 0.325, 0.323, 0.348, 0.386, 0.446, 0.516, 0.587, 0.603, 0.587, 0.516, 0.446, 0.386,
    0.348, 0.323, 0.325, 0.566,
];

/// Bracketing rows of the 22.5 degree azimuth tables and the blend weight
/// of the upper row. Row 16 duplicates row 0, so the wrap needs no modulus.
fn azimuth_rows(azimuth: f64) -> (usize, usize, f64) {
    let pos = azimuth.rem_euclid(360.) / 22.5;
    let lower = (pos.floor() as usize).min(15);
    (lower, lower + 1, pos - lower as f64)
}

fn lerp(a: f64, b: f64, weight: f64) -> f64 {
    a + (b - a) * weight
}

fn psf_row_at_latitude(row: usize, latitude: f64) -> f64 {
    interp(&LATITUDES, &PSF[row], latitude, &InterpMode::FirstLast)
}

fn psf_at(azimuth: f64, latitude: f64) -> f64 {
    let (lo, hi, w) = azimuth_rows(azimuth);
    lerp(
        psf_row_at_latitude(lo, latitude),
        psf_row_at_latitude(hi, latitude),
        w,
    )
}

fn psf_horizontal_at_latitude(latitude: f64) -> f64 {
    interp(&LATITUDES, &PSF_HORIZONTAL, latitude, &InterpMode::FirstLast)
}

fn clf_average_at(azimuth: f64) -> f64 {
    let (lo, hi, w) = azimuth_rows(azimuth);
    lerp(CLF_AVERAGE[lo], CLF_AVERAGE[hi], w)
}

fn clf_hourly_at(azimuth: f64, hour_idx: usize) -> f64 {
    let (lo, hi, w) = azimuth_rows(azimuth);
    lerp(CLF_HOURLY[lo][hour_idx], CLF_HOURLY[hi][hour_idx], w)
}

/// Solar altitude and surface-relative azimuth for a vertical surface, all
/// angles in radians. Returns `None` when the sun is below the horizon.
fn solar_position(latitude_deg: f64, hour: f64) -> Option<(f64, f64)> {
    let latitude = latitude_deg.to_radians();
    let declination = DESIGN_DECLINATION_DEG.to_radians();
    let hour_angle = (15. * (hour - 12.)).to_radians();
    let sin_altitude = latitude.cos() * declination.cos() * hour_angle.cos()
        + latitude.sin() * declination.sin();
    if sin_altitude <= 0. {
        return None;
    }
    let altitude = sin_altitude.asin();
    let cos_azimuth = ((altitude.sin() * latitude.sin() - declination.sin())
        / (altitude.cos() * latitude.cos()))
    .clamp(-1., 1.);
    // Solar azimuth measured from south, negative before solar noon
    let azimuth = if hour < 12. {
        -cos_azimuth.acos()
    } else {
        cos_azimuth.acos()
    };
    Some((altitude, azimuth))
}

/// Fraction of the window in shade behind an overhang for a given solar
/// position. Surfaces facing away from the sun are fully shaded (diffuse
/// only).
fn overhang_shaded_fraction(window: &Window, latitude: f64, hour: f64) -> f64 {
    let Some(overhang) = &window.overhang else {
        return 0.;
    };
    let Some((altitude, solar_azimuth)) = solar_position(latitude, hour) else {
        return 1.;
    };
    // Window azimuth from south, matching the solar azimuth convention
    let surface_azimuth = (window.azimuth - 180.).to_radians();
    let relative_azimuth = solar_azimuth - surface_azimuth;
    if relative_azimuth.cos() <= 0. {
        return 1.;
    }
    // Shade-line ratio: vertical drop of the shadow per foot of projection
    let shade_line_ratio = altitude.tan() / relative_azimuth.cos();
    let shade_depth = shade_line_ratio * overhang.depth;
    let window_extent = overhang.distance_to_bottom_of_window - overhang.distance_to_top_of_window;
    if window_extent <= 0. {
        return 0.;
    }
    ((shade_depth - overhang.distance_to_top_of_window) / window_extent).clamp(0., 1.)
}

fn window_solar_htm(window: &Window, psf: f64, clf: f64) -> f64 {
    psf * clf * window.shgc * window.interior_shading_factor / REFERENCE_GLAZING_SHGC
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FenestrationLoads {
    pub heat_windows: f64,
    pub heat_skylights: f64,
    pub cool_windows: f64,
    pub cool_skylights: f64,
}

impl FenestrationLoads {
    #[cfg(test)]
    fn cool_total(&self) -> f64 {
        self.cool_windows + self.cool_skylights
    }
}

/// All fenestration loads. Heating is pure UA * HTD with no solar credit;
/// cooling is the averaged (ALP) load per component plus a single AED
/// excursion over the shared hourly curve, split back onto windows and
/// skylights in proportion to their averaged loads.
pub(crate) fn process_fenestration(ctx: &SizingContext, building: &Building) -> FenestrationLoads {
    let mut heat_windows = 0.;
    let mut heat_skylights = 0.;
    let mut alp_windows = 0.;
    let mut alp_skylights = 0.;
    let mut hourly = [0.; AED_HOURS];

    let psf_north = psf_row_at_latitude(0, ctx.latitude);

    for window in &building.windows {
        heat_windows += window.ufactor * window.area * ctx.htd;

        let psf = psf_at(window.azimuth, ctx.latitude);
        let conduction_htm = window.ufactor * ctx.ctd;

        // Average Load Procedure at solar noon shading
        let shaded_noon = overhang_shaded_fraction(window, ctx.latitude, 12.);
        let htm_sunlit = window_solar_htm(window, psf, clf_average_at(window.azimuth));
        let htm_shaded = window_solar_htm(window, psf_north, CLF_AVERAGE[0]);
        alp_windows += window.area
            * (conduction_htm + shaded_noon * htm_shaded + (1. - shaded_noon) * htm_sunlit);

        for (hour_idx, load) in hourly.iter_mut().enumerate() {
            let hour = (FIRST_AED_HOUR + hour_idx) as f64;
            let shaded = overhang_shaded_fraction(window, ctx.latitude, hour);
            let solar_sunlit =
                window_solar_htm(window, psf, clf_hourly_at(window.azimuth, hour_idx));
            let solar_shaded = window_solar_htm(window, psf_north, CLF_HOURLY[0][hour_idx]);
            *load += window.area
                * (conduction_htm + shaded * solar_shaded + (1. - shaded) * solar_sunlit);
        }
    }

    for skylight in &building.skylights {
        heat_skylights += skylight.ufactor * skylight.area * ctx.htd;

        // Tilt-weighted blend of the horizontal and vertical PSF rows, and
        // the Manual J +15 F conduction adder for roof-mounted glazing
        let tilt_fraction = (skylight.tilt / 90.).clamp(0., 1.);
        let psf = psf_horizontal_at_latitude(ctx.latitude) * (1. - tilt_fraction)
            + psf_at(skylight.azimuth, ctx.latitude) * tilt_fraction;
        let conduction_htm = skylight.ufactor * (ctx.ctd + 15.);
        let solar_factor = skylight.shgc / REFERENCE_GLAZING_SHGC;

        alp_skylights +=
            skylight.area * (conduction_htm + psf * clf_average_at(skylight.azimuth) * solar_factor);
        for (hour_idx, load) in hourly.iter_mut().enumerate() {
            *load += skylight.area
                * (conduction_htm
                    + psf * clf_hourly_at(skylight.azimuth, hour_idx) * solar_factor);
        }
    }

    let excursion = aed_excursion(&hourly);
    let alp_total = alp_windows + alp_skylights;
    let (cool_windows, cool_skylights) = if alp_total > 0. {
        (
            alp_windows + excursion * alp_windows / alp_total,
            alp_skylights + excursion * alp_skylights / alp_total,
        )
    } else {
        (alp_windows, alp_skylights)
    };

    FenestrationLoads {
        heat_windows,
        heat_skylights,
        cool_windows,
        cool_skylights,
    }
}

/// Excursion adjustment: any peak-hour load above 1.3x the daily mean is
/// added on top of the averaged load.
fn aed_excursion(hourly: &[f64; AED_HOURS]) -> f64 {
    let peak = hourly.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !peak.is_finite() {
        return 0.;
    }
    let mean = hourly.iter().sum::<f64>() / AED_HOURS as f64;
    (peak - 1.3 * mean).max(0.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::SizingContext;
    use crate::input::{Overhang, WeatherDesignData};
    use approx::assert_relative_eq;
    use rstest::*;

    fn weather() -> WeatherDesignData {
        serde_json::from_str(
            r#"{"heating_drybulb": 10.0, "cooling_drybulb": 92.0, "cooling_wetbulb": 74.0,
                "cooling_humidity_ratio": 0.0122, "daily_temp_range": 20.0, "latitude": 40.0,
                "altitude": 0.0, "pressure_psia": 14.696,
                "ground_monthly_temps": [45, 44, 46, 50, 56, 62, 67, 70, 68, 62, 55, 48],
                "hdd65": 6000.0, "cdd50": 2500.0}"#,
        )
        .unwrap()
    }

    fn building_with_windows(windows: Vec<Window>) -> Building {
        let mut building: Building = serde_json::from_str(
            r#"{"conditioned_floor_area": 2000.0, "conditioned_volume": 16000.0,
                "stories_above_grade": 1, "bedrooms": 3, "infiltration": {"ach50": 7.0}}"#,
        )
        .unwrap();
        building.windows = windows;
        building
    }

    fn window(azimuth: f64, area: f64) -> Window {
        Window {
            area,
            ufactor: 0.32,
            shgc: 0.45,
            azimuth,
            interior_shading_factor: 1.0,
            overhang: None,
        }
    }

    fn skylight() -> crate::input::Skylight {
        crate::input::Skylight {
            area: 20.,
            ufactor: 0.5,
            shgc: 0.4,
            azimuth: 180.,
            tilt: 30.,
        }
    }

    #[fixture]
    fn ctx() -> SizingContext {
        SizingContext::new(&weather(), &building_with_windows(vec![])).unwrap()
    }

    #[rstest]
    #[case(0., 0, 1, 0.)]
    #[case(90., 4, 5, 0.)]
    #[case(101.25, 4, 5, 0.5)]
    #[case(270., 12, 13, 0.)]
    #[case(348.75, 15, 16, 0.5)]
    fn should_bracket_azimuths_for_interpolation(
        #[case] azimuth: f64,
        #[case] lower: usize,
        #[case] upper: usize,
        #[case] weight: f64,
    ) {
        let (lo, hi, w) = azimuth_rows(azimuth);
        assert_eq!((lo, hi), (lower, upper));
        assert_relative_eq!(w, weight, epsilon = 1e-12);
    }

    #[rstest]
    fn should_interpolate_psf_between_latitude_bins() {
        let at_40 = psf_row_at_latitude(8, 40.);
        let at_44 = psf_row_at_latitude(8, 44.);
        let mid = psf_row_at_latitude(8, 42.);
        assert!(at_40 < mid && mid < at_44);
        assert_relative_eq!(mid, (at_40 + at_44) / 2., max_relative = 1e-12);
    }

    #[rstest]
    fn should_blend_psf_between_azimuth_rows(ctx: SizingContext) {
        let east = psf_at(90., 40.);
        let next = psf_at(112.5, 40.);
        let between = psf_at(101.25, 40.);
        assert_relative_eq!(between, (east + next) / 2., max_relative = 1e-12);
        // An off-bin window loads between its neighbouring exact exposures
        let cool_at = |azimuth: f64| {
            process_fenestration(&ctx, &building_with_windows(vec![window(azimuth, 100.)]))
                .cool_total()
        };
        let lo = cool_at(90.).min(cool_at(112.5));
        let hi = cool_at(90.).max(cool_at(112.5));
        let mid = cool_at(101.);
        assert!(lo < mid && mid < hi, "expected {mid} inside ({lo}, {hi})");
    }

    #[rstest]
    fn should_compute_heating_as_pure_ua_dt(ctx: SizingContext) {
        let building = building_with_windows(vec![window(180., 100.)]);
        let loads = process_fenestration(&ctx, &building);
        assert_relative_eq!(loads.heat_windows, 0.32 * 100. * 60.);
    }

    #[rstest]
    fn should_load_west_window_more_than_north(ctx: SizingContext) {
        let west = process_fenestration(&ctx, &building_with_windows(vec![window(270., 100.)]));
        let north = process_fenestration(&ctx, &building_with_windows(vec![window(0., 100.)]));
        assert!(
            west.cool_windows > 1.5 * north.cool_windows,
            "west {} vs north {}",
            west.cool_windows,
            north.cool_windows
        );
    }

    #[rstest]
    fn should_add_excursion_for_single_large_west_window(ctx: SizingContext) {
        // A dominant west window has a strongly peaked hourly curve, so the
        // design load must exceed the pure averaged (ALP) load
        let building = building_with_windows(vec![window(270., 300.), window(0., 20.)]);
        let loads = process_fenestration(&ctx, &building);
        let psf = psf_at(270., 40.);
        let alp_west = 300. * (0.32 * 17. + psf * clf_average_at(270.) * 0.45 / 0.87);
        assert!(loads.cool_windows > alp_west, "excursion must add load");
    }

    #[rstest]
    fn should_offset_opposing_exposures_in_one_shared_curve(ctx: SizingContext) {
        // East and west peaks fall at opposite ends of the day; aggregated
        // into one curve they cancel, so the combined excursion is smaller
        // than the two separate ones
        let east = process_fenestration(&ctx, &building_with_windows(vec![window(90., 300.)]));
        let west = process_fenestration(&ctx, &building_with_windows(vec![window(270., 300.)]));
        let both = process_fenestration(
            &ctx,
            &building_with_windows(vec![window(90., 300.), window(270., 300.)]),
        );
        assert!(
            both.cool_total() < east.cool_total() + west.cool_total(),
            "aggregation must diversify opposing peaks"
        );
    }

    #[rstest]
    fn should_include_skylights_in_the_shared_curve(ctx: SizingContext) {
        let mut combined_building = building_with_windows(vec![window(270., 300.)]);
        combined_building.skylights.push(skylight());
        let mut skylight_building = building_with_windows(vec![]);
        skylight_building.skylights.push(skylight());

        let combined = process_fenestration(&ctx, &combined_building);
        let windows_only =
            process_fenestration(&ctx, &building_with_windows(vec![window(270., 300.)]));
        let skylights_only = process_fenestration(&ctx, &skylight_building);
        // One excursion over the shared curve can never exceed the sum of
        // the excursions computed separately
        assert!(
            combined.cool_total()
                <= windows_only.cool_total() + skylights_only.cool_total() + 1e-9
        );
        assert!(combined.cool_skylights > 0.);
    }

    #[rstest]
    fn should_have_zero_excursion_for_balanced_exposures() {
        let hourly = [100.; AED_HOURS];
        assert_eq!(aed_excursion(&hourly), 0.);
    }

    #[rstest]
    fn should_shade_fully_when_sun_behind_surface(ctx: SizingContext) {
        let mut w = window(0., 100.);
        w.overhang = Some(Overhang {
            depth: 2.,
            distance_to_top_of_window: 1.,
            distance_to_bottom_of_window: 5.,
        });
        // North-facing window never sees direct noon sun
        assert_eq!(overhang_shaded_fraction(&w, ctx.latitude, 12.), 1.0);
    }

    #[rstest]
    fn should_shade_south_window_more_with_deeper_overhang(ctx: SizingContext) {
        let fraction_for = |depth: f64| {
            let mut w = window(180., 100.);
            w.overhang = Some(Overhang {
                depth,
                distance_to_top_of_window: 1.,
                distance_to_bottom_of_window: 5.,
            });
            overhang_shaded_fraction(&w, ctx.latitude, 12.)
        };
        assert!(fraction_for(4.) >= fraction_for(1.));
        assert_eq!(fraction_for(0.), 0.);
    }

    #[rstest]
    fn should_reduce_cooling_load_with_overhang(ctx: SizingContext) {
        let mut shaded_window = window(180., 100.);
        shaded_window.overhang = Some(Overhang {
            depth: 3.,
            distance_to_top_of_window: 0.5,
            distance_to_bottom_of_window: 4.5,
        });
        let open = process_fenestration(&ctx, &building_with_windows(vec![window(180., 100.)]));
        let shaded = process_fenestration(&ctx, &building_with_windows(vec![shaded_window]));
        assert!(shaded.cool_windows < open.cool_windows);
        assert_eq!(
            shaded.heat_windows, open.heat_windows,
            "heating takes no shading credit"
        );
    }

    #[rstest]
    fn should_add_15f_conduction_adder_for_skylights(ctx: SizingContext) {
        let mut building = building_with_windows(vec![]);
        building.skylights.push(skylight());
        let loads = process_fenestration(&ctx, &building);
        // Conduction component alone: u * (ctd + 15) * area
        assert!(loads.cool_skylights > 0.5 * (17. + 15.) * 20.);
        assert_relative_eq!(loads.heat_skylights, 0.5 * 20. * 60.);
    }
}
