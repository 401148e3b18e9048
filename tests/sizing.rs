//! End-to-end pipeline tests: determinism, load accounting and the
//! per-system sizing surface.

use pretty_assertions::assert_eq;
use resload::input::{ingest, SizingInput};
use resload::run_sizing;
use rstest::*;

fn fixture(systems_json: &str) -> SizingInput {
    let json = format!(
        r#"{{
          "weather": {{
            "heating_drybulb": 12.0, "cooling_drybulb": 91.0, "cooling_wetbulb": 74.0,
            "cooling_humidity_ratio": 0.0135, "daily_temp_range": 20.0, "latitude": 40.0,
            "altitude": 0.0, "pressure_psia": 14.696,
            "ground_monthly_temps": [44, 43, 45, 50, 57, 63, 68, 70, 67, 60, 53, 47],
            "hdd65": 5800.0, "cdd50": 2800.0
          }},
          "building": {{
            "conditioned_floor_area": 2000.0, "conditioned_volume": 16000.0,
            "stories_above_grade": 1, "bedrooms": 3,
            "infiltration": {{"ach50": 5.0}},
            "windows": [
              {{"area": 60.0, "ufactor": 0.33, "shgc": 0.45, "azimuth": 180.0, "overhang": null}},
              {{"area": 60.0, "ufactor": 0.33, "shgc": 0.45, "azimuth": 270.0, "overhang": null}},
              {{"area": 40.0, "ufactor": 0.33, "shgc": 0.45, "azimuth": 0.0, "overhang": null}}
            ],
            "doors": [{{"area": 40.0, "ufactor": 0.5, "exterior_adjacent_to": "outside"}}],
            "walls": [{{"area": 1400.0, "ufactor": 0.07, "azimuth": 180.0,
                       "construction": "wood_stud", "siding": "wood_or_vinyl",
                       "exterior_adjacent_to": "outside",
                       "interior_adjacent_to": "conditioned_space"}}],
            "ceilings": [{{"area": 2000.0, "assembly_r": 38.0,
                          "exterior_adjacent_to": "attic_vented"}}],
            "roofs": [{{"area": 2200.0, "assembly_r": 2.3, "material": "asphalt_shingles",
                       "color": "dark", "interior_adjacent_to": "attic_vented"}}],
            "slabs": [{{"area": 2000.0, "exposed_perimeter": 180.0, "thickness": 4.0,
                       "width": 30.0, "interior_adjacent_to": "conditioned_space"}}],
            "spaces": [{{"location": "attic_vented", "volume": 6000.0}}]
          }},
          "hvac_systems": {systems_json}
        }}"#
    );
    ingest(json.as_bytes()).unwrap()
}

fn ducted_furnace_ac() -> &'static str {
    r#"[{
        "id": "system-1",
        "heating": {"heat_type": "furnace", "fraction_load_served": 1.0},
        "cooling": {"cool_type": "central_air_conditioner", "fraction_load_served": 1.0},
        "ducts": [
          {"side": "supply", "location": "attic_vented", "area": 150.0, "r_value": 6.0,
           "leakage_cfm25": 40.0},
          {"side": "return", "location": "attic_vented", "area": 50.0, "r_value": 6.0,
           "leakage_cfm25": 20.0}
        ]
    }]"#
}

#[rstest]
fn should_produce_bit_identical_output_for_identical_inputs() {
    let input = fixture(ducted_furnace_ac());
    let first = run_sizing(&input).unwrap();
    let second = run_sizing(&input).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[rstest]
fn should_fold_duct_losses_into_totals_exactly_once() {
    let output = run_sizing(&fixture(ducted_furnace_ac())).unwrap();
    let loads = &output.loads;
    assert!(loads.heat_ducts > 0., "attic ducts must add heating load");
    assert!(loads.cool_ducts_sens > 0.);
    let heat_sum = loads.heat_windows
        + loads.heat_skylights
        + loads.heat_doors
        + loads.heat_walls
        + loads.heat_roofs
        + loads.heat_ceilings
        + loads.heat_floors
        + loads.heat_slabs
        + loads.heat_infil_vent
        + loads.heat_ducts;
    approx::assert_relative_eq!(loads.heat_tot, heat_sum, max_relative = 1e-12);
    approx::assert_relative_eq!(
        loads.cool_tot,
        loads.cool_sens + loads.cool_lat,
        max_relative = 1e-12
    );
}

#[rstest]
fn should_size_the_ducted_system_with_capacity_and_airflow() {
    let output = run_sizing(&fixture(ducted_furnace_ac())).unwrap();
    assert_eq!(output.systems.len(), 1);
    let system = &output.systems[0];
    let heating = system.heating.as_ref().unwrap();
    let cooling = system.cooling.as_ref().unwrap();
    approx::assert_relative_eq!(heating.capacity, output.loads.heat_tot, max_relative = 1e-9);
    assert!(heating.airflow_cfm > 0.);
    assert!(cooling.capacity_total >= output.loads.cool_tot * 0.99);
    assert!(cooling.airflow_cfm > 0.);
    assert!(system.ground_loop.is_none());
}

#[rstest]
fn should_contribute_nothing_for_a_zero_fraction_system() {
    let output = run_sizing(&fixture(
        r#"[{
            "id": "idle",
            "heating": {"heat_type": "furnace", "fraction_load_served": 0.0},
            "cooling": {"cool_type": "central_air_conditioner", "fraction_load_served": 0.0},
            "ducts": [
              {"side": "supply", "location": "attic_vented", "area": 150.0, "r_value": 6.0,
               "leakage_cfm25": 40.0}
            ]
        }]"#,
    ))
    .unwrap();
    assert_eq!(output.loads.heat_ducts, 0.);
    assert_eq!(output.loads.cool_ducts_sens, 0.);
    assert_eq!(output.loads.cool_ducts_lat, 0.);
    let system = &output.systems[0];
    assert!(system.heating.is_none());
    assert!(system.cooling.is_none());
}

#[rstest]
fn should_match_a_ductless_run_against_the_envelope_loads() {
    let output = run_sizing(&fixture(
        r#"[{
            "id": "boiler",
            "heating": {"heat_type": "boiler", "fraction_load_served": 1.0}
        }]"#,
    ))
    .unwrap();
    assert_eq!(output.loads.heat_ducts, 0.);
    let heating = output.systems[0].heating.as_ref().unwrap();
    approx::assert_relative_eq!(heating.capacity, output.loads.heat_tot, max_relative = 1e-9);
    assert_eq!(heating.airflow_cfm, 0.);
}

#[rstest]
fn should_size_a_ground_loop_for_a_ground_source_system() {
    let output = run_sizing(&fixture(
        r#"[{
            "id": "gshp-1",
            "heating": {"heat_type": "ground_source_heat_pump", "fraction_load_served": 1.0},
            "cooling": {"cool_type": "ground_source_heat_pump", "fraction_load_served": 1.0},
            "ducts": [
              {"side": "supply", "location": "conditioned_space", "area": 100.0, "r_value": 6.0,
               "leakage_fraction": 0.02},
              {"side": "return", "location": "conditioned_space", "area": 40.0, "r_value": 6.0,
               "leakage_fraction": 0.02}
            ]
        }]"#,
    ))
    .unwrap();
    let system = &output.systems[0];
    let loop_sizing = system.ground_loop.as_ref().expect("GSHP gets a ground loop");
    assert!(loop_sizing.bore_count >= 1);
    assert!(loop_sizing.bore_depth_ft > 0.);
    assert!(loop_sizing.total_length_ft >= loop_sizing.bore_depth_ft);
    assert!(loop_sizing.flow_rate_gpm >= 3.0);
    assert!(!loop_sizing.g_function_key.is_empty());
    let heating = system.heating.as_ref().unwrap();
    let cooling = system.cooling.as_ref().unwrap();
    // One compressor serves both modes.
    assert_eq!(heating.capacity, cooling.capacity_total);
}

#[rstest]
fn should_split_loads_between_two_systems_by_fraction() {
    let output = run_sizing(&fixture(
        r#"[
          {"id": "north",
           "heating": {"heat_type": "furnace", "fraction_load_served": 0.5}},
          {"id": "south",
           "heating": {"heat_type": "furnace", "fraction_load_served": 0.5}}
        ]"#,
    ))
    .unwrap();
    let north = output.systems[0].heating.as_ref().unwrap();
    let south = output.systems[1].heating.as_ref().unwrap();
    approx::assert_relative_eq!(
        north.capacity + south.capacity,
        output.loads.heat_tot,
        max_relative = 1e-9
    );
}
