//! Input data model for a sizing run: weather design-day data, the building
//! envelope description and the HVAC system descriptions. These structures
//! are produced by the (external) building-model layer; deserialization via
//! serde is provided so fixtures and callers can supply JSON directly.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum_macros::Display as StrumDisplay;

pub fn ingest(json: impl std::io::Read) -> Result<SizingInput, anyhow::Error> {
    Ok(serde_json::from_reader(json)?)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SizingInput {
    pub weather: WeatherDesignData,
    pub building: Building,
    #[serde(default)]
    pub hvac_systems: Vec<HvacSystem>,
}

/// Weather design-day values (ACCA Manual J Table 1 style data).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherDesignData {
    /// 99% heating design drybulb, deg F
    pub heating_drybulb: f64,
    /// 1% cooling design drybulb, deg F
    pub cooling_drybulb: f64,
    /// Coincident cooling design wetbulb, deg F
    pub cooling_wetbulb: f64,
    /// Cooling design humidity ratio, lb/lb
    pub cooling_humidity_ratio: f64,
    /// Average daily temperature range at the cooling design condition, deg F
    pub daily_temp_range: f64,
    /// Site latitude, degrees north
    pub latitude: f64,
    /// Site altitude, ft
    pub altitude: f64,
    /// Local barometric pressure, psia
    pub pressure_psia: f64,
    /// Monthly average ground temperatures, deg F
    pub ground_monthly_temps: [f64; 12],
    /// Annual heating degree-days base 65 F
    pub hdd65: f64,
    /// Annual cooling degree-days base 50 F
    pub cdd50: f64,
    /// Heating design wind speed, mph
    #[serde(default = "default_heating_wind_speed")]
    pub heating_wind_speed: f64,
    /// Cooling design wind speed, mph
    #[serde(default = "default_cooling_wind_speed")]
    pub cooling_wind_speed: f64,
}

fn default_heating_wind_speed() -> f64 {
    15.0
}

fn default_cooling_wind_speed() -> f64 {
    7.5
}

impl WeatherDesignData {
    /// Coldest and warmest monthly ground temperatures, used as the ground
    /// boundary condition for heating and cooling respectively.
    pub fn ground_heating_design_temp(&self) -> f64 {
        self.ground_monthly_temps
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    pub fn ground_cooling_design_temp(&self) -> f64 {
        self.ground_monthly_temps
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Thermal-zone locations a surface can face or a duct can sit in.
///
/// This is a closed set: every algorithm in the engine matches exhaustively
/// over it, and an input naming a location an algorithm cannot handle is a
/// fatal configuration error rather than a fallback.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Location {
    ConditionedSpace,
    Outside,
    Ground,
    RoofDeck,
    AtticVented,
    AtticUnvented,
    CrawlspaceVented,
    CrawlspaceUnvented,
    BasementConditioned,
    BasementUnconditioned,
    Garage,
    OtherHousingUnit,
    OtherHeatedSpace,
    OtherMultifamilyBufferSpace,
    OtherNonFreezingSpace,
}

impl Location {
    pub(crate) fn is_conditioned(&self) -> bool {
        matches!(
            self,
            Location::ConditionedSpace | Location::BasementConditioned | Location::OtherHousingUnit
        )
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofMaterial {
    AsphaltShingles,
    WoodShingles,
    Metal,
    TileOrSlate,
    TarGravel,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceColor {
    Dark,
    MediumDark,
    Medium,
    Light,
    Reflective,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WallConstruction {
    WoodStud,
    SteelStud,
    DoubleWoodStud,
    StructuralInsulatedPanel,
    InsulatedConcreteForm,
    ConcreteMasonryUnit,
    StructuralBrick,
    LogWall,
    StrawBale,
    Stone,
    Adobe,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Siding {
    WoodOrVinyl,
    Stucco,
    Brick,
    FiberCement,
    Aluminum,
}

/// How leaky the enclosure of a crawlspace or unconditioned basement is,
/// which selects between the two Manual J partition-floor formulas.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundationLeakiness {
    VentedOrLeaky,
    SealedTight,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Overhang {
    /// Horizontal projection depth, ft
    pub depth: f64,
    /// Vertical distance from the overhang to the top of the window, ft
    pub distance_to_top_of_window: f64,
    /// Vertical distance from the overhang to the bottom of the window, ft
    pub distance_to_bottom_of_window: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    pub area: f64,
    pub ufactor: f64,
    pub shgc: f64,
    /// Compass azimuth the glazing faces, degrees clockwise from north
    pub azimuth: f64,
    /// Interior shading coefficient at the cooling design condition (1 = none)
    #[serde(default = "default_interior_shading")]
    pub interior_shading_factor: f64,
    pub overhang: Option<Overhang>,
}

fn default_interior_shading() -> f64 {
    1.0
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Skylight {
    pub area: f64,
    pub ufactor: f64,
    pub shgc: f64,
    pub azimuth: f64,
    /// Slope from horizontal, degrees
    pub tilt: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Door {
    pub area: f64,
    pub ufactor: f64,
    pub exterior_adjacent_to: Location,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Wall {
    pub area: f64,
    /// Assembly U-factor including films
    pub ufactor: f64,
    pub azimuth: f64,
    pub construction: WallConstruction,
    pub siding: Siding,
    pub exterior_adjacent_to: Location,
    pub interior_adjacent_to: Location,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Roof {
    /// Net area (gross minus skylights), ft^2
    pub area: f64,
    /// Assembly R-value including films
    pub assembly_r: f64,
    pub material: RoofMaterial,
    pub color: SurfaceColor,
    #[serde(default)]
    pub radiant_barrier: bool,
    /// Space directly under the roof deck (conditioned for cathedral
    /// ceilings, an attic location otherwise)
    pub interior_adjacent_to: Location,
}

/// Horizontal surface between a conditioned space and the space above it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Ceiling {
    pub area: f64,
    pub assembly_r: f64,
    pub exterior_adjacent_to: Location,
}

/// Horizontal surface between a conditioned space and the space below it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Floor {
    pub area: f64,
    pub assembly_r: f64,
    pub exterior_adjacent_to: Location,
    #[serde(default)]
    pub foundation_leakiness: Option<FoundationLeakiness>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Slab {
    pub area: f64,
    /// Perimeter exposed to outdoor air, ft
    pub exposed_perimeter: f64,
    /// Slab thickness, inches
    pub thickness: f64,
    /// Perimeter (edge) insulation R-value
    #[serde(default)]
    pub perimeter_insulation_r: f64,
    /// Width of perimeter insulation measured inward from the edge, ft
    #[serde(default)]
    pub perimeter_insulation_width: f64,
    /// Depth of the slab surface below grade, ft (0 for on-grade slabs)
    #[serde(default)]
    pub depth_below_grade: f64,
    /// Shortest horizontal dimension of the slab, ft (below-grade formula)
    pub width: f64,
    pub interior_adjacent_to: Location,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FoundationWall {
    pub area: f64,
    pub height: f64,
    pub depth_below_grade: f64,
    pub assembly_r: f64,
    pub interior_adjacent_to: Location,
    pub exterior_adjacent_to: Location,
}

/// An unconditioned space with enough geometry for the UA energy balance.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Space {
    pub location: Location,
    pub volume: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Infiltration {
    /// Blower-door result, air changes per hour at 50 Pa
    pub ach50: f64,
    /// Pressure exponent from the blower-door fit
    #[serde(default = "default_infiltration_exponent")]
    pub pressure_exponent: f64,
    /// Shielding class 1 (exposed) to 5 (well shielded), Manual J Table 5D
    #[serde(default = "default_shelter_class")]
    pub shelter_class: u8,
}

fn default_infiltration_exponent() -> f64 {
    0.65
}

fn default_shelter_class() -> u8 {
    4
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MechanicalVentilation {
    /// Balanced (supply = exhaust) flow, CFM
    #[serde(default)]
    pub balanced_cfm: f64,
    /// Unbalanced (supply-only or exhaust-only) flow, CFM
    #[serde(default)]
    pub unbalanced_cfm: f64,
    /// Sensible recovery effectiveness of an ERV/HRV on the balanced flow
    #[serde(default)]
    pub sensible_recovery_effectiveness: f64,
    /// Total (sensible + latent) recovery effectiveness of an ERV
    #[serde(default)]
    pub total_recovery_effectiveness: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Building {
    pub conditioned_floor_area: f64,
    pub conditioned_volume: f64,
    /// Number of conditioned floors above grade
    pub stories_above_grade: u8,
    pub bedrooms: u32,
    pub infiltration: Infiltration,
    #[serde(default)]
    pub ventilation: Option<MechanicalVentilation>,
    /// Heating thermostat setpoint, deg F (Manual J default 70)
    #[serde(default = "default_heat_setpoint")]
    pub heating_setpoint: f64,
    /// Cooling thermostat setpoint, deg F (Manual J default 75)
    #[serde(default = "default_cool_setpoint")]
    pub cooling_setpoint: f64,
    #[serde(default)]
    pub windows: Vec<Window>,
    #[serde(default)]
    pub skylights: Vec<Skylight>,
    #[serde(default)]
    pub doors: Vec<Door>,
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub roofs: Vec<Roof>,
    #[serde(default)]
    pub ceilings: Vec<Ceiling>,
    #[serde(default)]
    pub floors: Vec<Floor>,
    #[serde(default)]
    pub slabs: Vec<Slab>,
    #[serde(default)]
    pub foundation_walls: Vec<FoundationWall>,
    #[serde(default)]
    pub spaces: Vec<Space>,
    /// Fraction of the garage ceiling that sits under conditioned space
    #[serde(default)]
    pub garage_fraction_under_conditioned: f64,
    /// Soil conductivity, Btu/hr-ft-F
    #[serde(default = "default_ground_conductivity")]
    pub ground_conductivity: f64,
}

fn default_heat_setpoint() -> f64 {
    70.0
}

fn default_cool_setpoint() -> f64 {
    75.0
}

fn default_ground_conductivity() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatType {
    Furnace,
    Boiler,
    ElectricResistance,
    AirSourceHeatPump,
    MiniSplitHeatPump,
    GroundSourceHeatPump,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoolType {
    CentralAirConditioner,
    RoomAirConditioner,
    PackagedTerminalAirConditioner,
    MiniSplit,
    EvaporativeCooler,
    AirSourceHeatPump,
    MiniSplitHeatPump,
    GroundSourceHeatPump,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DuctSide {
    Supply,
    Return,
}

/// One duct run. Leakage may be declared as exactly one of a fraction of
/// system airflow, a CFM25 test value or a CFM50 test value; supplying more
/// than one is rejected during extraction.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DuctInput {
    pub side: DuctSide,
    pub location: Location,
    /// Outside surface area, ft^2
    pub area: f64,
    /// Effective R-value including air films
    pub r_value: f64,
    #[serde(default)]
    pub leakage_fraction: Option<f64>,
    #[serde(default)]
    pub leakage_cfm25: Option<f64>,
    #[serde(default)]
    pub leakage_cfm50: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeatingSpec {
    pub heat_type: HeatType,
    pub fraction_load_served: f64,
    /// User-specified capacity, Btu/hr; None means autosize
    #[serde(default)]
    pub fixed_capacity: Option<f64>,
    /// Biquadratic capacity f(indoor drybulb, outdoor drybulb) per speed
    #[serde(default = "default_heat_cap_ft_spec")]
    pub cap_ft_spec: Vec<[f64; 6]>,
    #[serde(default = "default_single_speed_ratios")]
    pub capacity_ratios: Vec<f64>,
    #[serde(default = "default_heating_cfm_per_ton")]
    pub rated_cfm_per_ton: Vec<f64>,
    #[serde(default)]
    pub airflow_defect_ratio: f64,
    #[serde(default)]
    pub charge_defect_ratio: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoolingSpec {
    pub cool_type: CoolType,
    pub fraction_load_served: f64,
    #[serde(default)]
    pub fixed_capacity: Option<f64>,
    /// Biquadratic total capacity f(entering wetbulb, entering drybulb) per speed
    #[serde(default = "default_cool_cap_ft_spec")]
    pub cap_ft_spec: Vec<[f64; 6]>,
    /// Quadratic total capacity f(flow fraction) per speed
    #[serde(default = "default_cool_cap_fflow_spec")]
    pub cap_fflow_spec: Vec<[f64; 3]>,
    /// Rated gross sensible heat ratio per speed
    #[serde(default = "default_rated_shr")]
    pub rated_shr: Vec<f64>,
    #[serde(default = "default_cooling_cfm_per_ton")]
    pub rated_cfm_per_ton: Vec<f64>,
    #[serde(default = "default_single_speed_ratios")]
    pub capacity_ratios: Vec<f64>,
    #[serde(default)]
    pub airflow_defect_ratio: f64,
    #[serde(default)]
    pub charge_defect_ratio: f64,
}

// Single-speed air conditioner / heat pump performance curve defaults
// (RESNET/ANSI 301 rated unit, curves normalized at 80 F edb / 67 F ewb /
// 95 F odb).
fn default_cool_cap_ft_spec() -> Vec<[f64; 6]> {
    vec![[
        3.68637657,
        -0.098352478,
        0.000956357,
        0.005838141,
        -0.0000127,
        -0.000131702,
    ]]
}

fn default_heat_cap_ft_spec() -> Vec<[f64; 6]> {
    vec![[
        0.566333415,
        -0.000744164,
        -0.0000103,
        0.009414634,
        0.0000506,
        -0.00000675,
    ]]
}

fn default_cool_cap_fflow_spec() -> Vec<[f64; 3]> {
    vec![[0.718605468, 0.410099989, -0.128705457]]
}

fn default_rated_shr() -> Vec<f64> {
    vec![0.73]
}

fn default_cooling_cfm_per_ton() -> Vec<f64> {
    vec![394.2]
}

fn default_heating_cfm_per_ton() -> Vec<f64> {
    vec![384.1]
}

fn default_single_speed_ratios() -> Vec<f64> {
    vec![1.0]
}

/// Vertical borefield arrangements with tabulated g-function data.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BoreConfig {
    Single,
    Line,
    LConfig,
    Rectangle,
    UConfig,
    OpenRectangle,
    L2Config,
}

/// Vertical-bore ground heat exchanger description for GSHP systems.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroundLoopSpec {
    /// Grout/pipe arrangement in the bore: 'b' (close) or 'c' (spaced)
    #[serde(default = "default_spacing_type")]
    pub spacing_type: char,
    /// Requested borefield arrangement; derived from the bore count when
    /// absent or invalid for the count
    #[serde(default)]
    pub bore_config: Option<BoreConfig>,
    #[serde(default = "default_bore_spacing")]
    pub bore_spacing: f64,
    /// Bore diameter, inches
    #[serde(default = "default_bore_diameter")]
    pub bore_diameter: f64,
    /// U-tube pipe outside diameter, inches
    #[serde(default = "default_pipe_od")]
    pub pipe_od: f64,
    /// Pipe wall R-value, hr-ft^2-F/Btu per ft of bore
    #[serde(default = "default_pipe_r_value")]
    pub pipe_r_value: f64,
    #[serde(default = "default_grout_conductivity")]
    pub grout_conductivity: f64,
    /// Design chilled (entering) water temperature, cooling, deg F
    #[serde(default = "default_design_chw")]
    pub design_chw: f64,
    /// Design hot (entering) water temperature, heating, deg F
    #[serde(default = "default_design_hw")]
    pub design_hw: f64,
    /// Design loop temperature differential, deg F
    #[serde(default = "default_design_delta_t")]
    pub design_delta_t: f64,
    /// Rated heating COP and cooling EER for loop length derivation
    #[serde(default = "default_heat_cop")]
    pub heat_cop: f64,
    #[serde(default = "default_cool_eer")]
    pub cool_eer: f64,
}

fn default_spacing_type() -> char {
    'b'
}
fn default_bore_spacing() -> f64 {
    20.0
}
fn default_bore_diameter() -> f64 {
    5.0
}
fn default_pipe_od() -> f64 {
    1.315
}
fn default_pipe_r_value() -> f64 {
    0.060
}
fn default_grout_conductivity() -> f64 {
    0.4
}
fn default_design_chw() -> f64 {
    85.0
}
fn default_design_hw() -> f64 {
    40.0
}
fn default_design_delta_t() -> f64 {
    10.0
}
fn default_heat_cop() -> f64 {
    3.6
}
fn default_cool_eer() -> f64 {
    16.6
}

impl Default for GroundLoopSpec {
    fn default() -> Self {
        serde_json::from_str("{}").expect("all GroundLoopSpec fields have defaults")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HvacSystem {
    pub id: String,
    #[serde(default)]
    pub heating: Option<HeatingSpec>,
    #[serde(default)]
    pub cooling: Option<CoolingSpec>,
    #[serde(default)]
    pub ducts: Vec<DuctInput>,
    #[serde(default)]
    pub ground_loop: Option<GroundLoopSpec>,
}

pub(crate) fn format_unhandled<T: Display>(category: &str, value: T) -> String {
    format!("unhandled {category}: '{value}'")
}
