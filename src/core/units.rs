//! Unit constants and conversions for the Manual J/S calculations, which are
//! carried out in IP units throughout (deg F, Btu/hr, CFM, ft).

pub const BTU_PER_HOUR_PER_TON: f64 = 12_000.;
pub const MINUTES_PER_HOUR: f64 = 60.;
pub const GRAINS_PER_LB: f64 = 7_000.;
pub const INCHES_PER_FOOT: f64 = 12.;
pub const SQUARE_INCHES_PER_SQUARE_FOOT: f64 = 144.;
pub const RANKINE_OFFSET: f64 = 459.67;

// Sensible/latent air-side constants at sea level (Manual J sections 25/26):
// 1.1 = 60 min/hr * 0.075 lb/ft^3 * 0.24 Btu/lb-F
// 0.68 = 60 min/hr * 0.075 lb/ft^3 * 1060 Btu/lb / 7000 gr/lb
pub const SENSIBLE_AIR_CONSTANT: f64 = 1.1;
pub const LATENT_AIR_CONSTANT: f64 = 0.68;

pub(crate) fn fahrenheit_to_rankine(temp_f: f64) -> f64 {
    temp_f + RANKINE_OFFSET
}

pub(crate) fn btu_hr_to_tons(capacity_btu_hr: f64) -> f64 {
    capacity_btu_hr / BTU_PER_HOUR_PER_TON
}

pub(crate) fn lb_per_lb_to_grains(w: f64) -> f64 {
    w * GRAINS_PER_LB
}

/// Altitude correction factor applied to the air-side sensible and latent
/// constants, i.e. the ratio of local air density to sea-level density
/// following the US standard atmosphere pressure profile.
pub(crate) fn altitude_correction_factor(altitude_ft: f64) -> f64 {
    (1. - 6.8754e-6 * altitude_ft).powf(5.2559)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_convert_fahrenheit_to_rankine() {
        assert_relative_eq!(fahrenheit_to_rankine(70.), 529.67);
    }

    #[rstest]
    fn should_have_unity_acf_at_sea_level() {
        assert_relative_eq!(altitude_correction_factor(0.), 1.0);
    }

    #[rstest]
    fn should_reduce_acf_with_altitude() {
        let acf = altitude_correction_factor(5_280.);
        assert!(
            acf > 0.8 && acf < 0.85,
            "unexpected ACF at Denver altitude: {acf}"
        );
    }

    #[rstest]
    fn should_convert_capacity_to_tons() {
        assert_relative_eq!(btu_hr_to_tons(36_000.), 3.0);
    }
}
