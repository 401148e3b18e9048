//! Moist-air property functions (ASHRAE Fundamentals ch. 1 correlations),
//! IP units: deg F, psia, lb water / lb dry air.

use crate::core::units::{fahrenheit_to_rankine, lb_per_lb_to_grains};
use anyhow::anyhow;
use roots::{find_root_brent, SimpleConvergency};

// Hyland-Wexler saturation pressure constants (ASHRAE Fundamentals eq. 5/6,
// temperature in deg R, pressure in psia).
const C1: f64 = -1.0214165e4;
const C2: f64 = -4.8932428;
const C3: f64 = -5.3765794e-3;
const C4: f64 = 1.9202377e-7;
const C5: f64 = 3.5575832e-10;
const C6: f64 = -9.0344688e-14;
const C7: f64 = 4.1635019;
const C8: f64 = -1.0440397e4;
const C9: f64 = -1.1294650e1;
const C10: f64 = -2.7022355e-2;
const C11: f64 = 1.2890360e-5;
const C12: f64 = -2.4780681e-9;
const C13: f64 = 6.5459673;

// Gas constant for dry air over the lb-ft-R system, ft-lbf/lbm-R
const R_DA: f64 = 53.35;

/// Saturation pressure of water vapor, in psia, over ice below 32 F and
/// over liquid water above.
pub fn saturation_pressure(tdb_f: f64) -> f64 {
    let t_r = fahrenheit_to_rankine(tdb_f);
    let ln_psat = if tdb_f < 32. {
        C1 / t_r + C2 + t_r * (C3 + t_r * (C4 + t_r * (C5 + t_r * C6))) + C7 * t_r.ln()
    } else {
        C8 / t_r + C9 + t_r * (C10 + t_r * (C11 + t_r * C12)) + C13 * t_r.ln()
    };
    ln_psat.exp()
}

/// Humidity ratio at saturation, lb/lb.
pub fn humidity_ratio_at_saturation(tdb_f: f64, pressure_psia: f64) -> f64 {
    let psat = saturation_pressure(tdb_f);
    0.62198 * psat / (pressure_psia - psat)
}

/// Humidity ratio from drybulb, wetbulb and pressure (ASHRAE Fundamentals
/// eq. 35, IP form).
pub fn humidity_ratio_from_wetbulb(tdb_f: f64, twb_f: f64, pressure_psia: f64) -> f64 {
    let w_star = humidity_ratio_at_saturation(twb_f, pressure_psia);
    ((1093. - 0.556 * twb_f) * w_star - 0.240 * (tdb_f - twb_f))
        / (1093. + 0.444 * tdb_f - twb_f)
}

/// Humidity ratio from drybulb, relative humidity (0-1) and pressure.
pub fn humidity_ratio_from_relative_humidity(tdb_f: f64, rh: f64, pressure_psia: f64) -> f64 {
    let partial_pressure = rh * saturation_pressure(tdb_f);
    0.62198 * partial_pressure / (pressure_psia - partial_pressure)
}

/// Wetbulb temperature from drybulb, humidity ratio and pressure, inverting
/// the wetbulb correlation with a Brent solve over a physical bracket.
pub fn wetbulb_from_humidity_ratio(
    tdb_f: f64,
    w: f64,
    pressure_psia: f64,
) -> anyhow::Result<f64> {
    let mut convergency = SimpleConvergency {
        eps: 1e-9,
        max_iter: 80,
    };
    find_root_brent(
        tdb_f - 80.,
        tdb_f,
        |twb| humidity_ratio_from_wetbulb(tdb_f, twb, pressure_psia) - w,
        &mut convergency,
    )
    .map_err(|e| anyhow!("wetbulb solve failed for tdb={tdb_f}, w={w}: {e}"))
}

/// Moist air specific enthalpy, Btu/lb dry air.
pub fn enthalpy(tdb_f: f64, w: f64) -> f64 {
    0.240 * tdb_f + w * (1061. + 0.444 * tdb_f)
}

/// Dry air density, lb/ft^3.
pub fn dry_air_density(pressure_psia: f64, tdb_f: f64) -> f64 {
    144. * pressure_psia / (R_DA * fahrenheit_to_rankine(tdb_f))
}

/// Moisture content in grains of water per lb of dry air.
pub fn grains(w: f64) -> f64 {
    lb_per_lb_to_grains(w)
}
