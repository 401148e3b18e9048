//! Internal gains at the cooling design hour.
//!
//! Manual J procedure D: a fixed appliance allowance plus a per-occupant
//! sensible and latent gain, with occupancy taken as bedrooms + 1.
//! Internal gains do not contribute to the heating load.

use crate::input::Building;

const APPLIANCE_SENSIBLE_BTUH: f64 = 1600.0;
const OCCUPANT_SENSIBLE_BTUH: f64 = 230.0;
const OCCUPANT_LATENT_BTUH: f64 = 200.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct InternalGains {
    pub cool_sens: f64,
    pub cool_lat: f64,
}

pub(crate) fn process_internal_gains(building: &Building) -> InternalGains {
    let occupants = (building.bedrooms + 1) as f64;
    InternalGains {
        cool_sens: APPLIANCE_SENSIBLE_BTUH + OCCUPANT_SENSIBLE_BTUH * occupants,
        cool_lat: OCCUPANT_LATENT_BTUH * occupants,
    }
}
