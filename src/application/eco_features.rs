//! Feature encoding and carbon estimate for the external eco-score classifier
//!
//! The classifier itself lives outside this crate; it receives the
//! `FeatureVector` built here. Distances are measured to the UK, where the
//! storefronts this scraper targets deliver.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::product::{MaterialType, Recyclability, ScrapingResult};

/// Distance assumed when the origin is unknown or not in the table
pub const DEFAULT_DISTANCE_KM: f64 = 5_000.0;

const TRUCK_MAX_KM: f64 = 1_500.0;
const SHIP_MAX_KM: f64 = 6_000.0;
/// Long-haul parcels lighter than this are assumed to fly
const AIR_FREIGHT_MAX_KG: f64 = 0.5;

/// Approximate shipping distance from each origin to the UK, in km
const ORIGIN_DISTANCES_KM: &[(&str, f64)] = &[
    ("UK", 0.0),
    ("Ireland", 500.0),
    ("Belgium", 500.0),
    ("Netherlands", 550.0),
    ("France", 1_000.0),
    ("Denmark", 950.0),
    ("Germany", 1_100.0),
    ("Switzerland", 1_000.0),
    ("Austria", 1_450.0),
    ("Poland", 1_600.0),
    ("Hungary", 1_750.0),
    ("Spain", 1_700.0),
    ("Portugal", 1_900.0),
    ("Italy", 1_800.0),
    ("Sweden", 1_900.0),
    ("Turkey", 2_800.0),
    ("Canada", 5_400.0),
    ("USA", 6_800.0),
    ("India", 7_200.0),
    ("Bangladesh", 8_000.0),
    ("South Africa", 9_600.0),
    ("Mexico", 8_900.0),
    ("South Korea", 8_900.0),
    ("China", 9_200.0),
    ("Brazil", 9_300.0),
    ("Thailand", 9_500.0),
    ("Japan", 9_600.0),
    ("Taiwan", 9_800.0),
    ("Vietnam", 10_000.0),
    ("Malaysia", 10_500.0),
    ("Indonesia", 11_700.0),
    ("Australia", 17_000.0),
    ("New Zealand", 18_800.0),
];

/// Material order used by the classifier's encoder
const MATERIAL_ORDER: [MaterialType; 9] = [
    MaterialType::Plastic,
    MaterialType::Metal,
    MaterialType::Glass,
    MaterialType::Paper,
    MaterialType::Cardboard,
    MaterialType::Fabric,
    MaterialType::Wood,
    MaterialType::Mixed,
    MaterialType::Unknown,
];

/// Weight bucket upper bounds in kg; heavier products share the last bucket
const WEIGHT_BUCKETS_KG: [f64; 5] = [0.5, 1.0, 2.0, 5.0, 10.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Air,
    Ship,
    Truck,
}

impl TransportMode {
    /// kg CO2 per tonne-km
    pub fn emission_factor(self) -> f64 {
        match self {
            Self::Air => 0.5,
            Self::Ship => 0.03,
            Self::Truck => 0.15,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Air => 0,
            Self::Ship => 1,
            Self::Truck => 2,
        }
    }

    /// Default mode for a distance and parcel weight
    pub fn for_route(distance_km: f64, weight_kg: f64) -> Self {
        if distance_km <= TRUCK_MAX_KM {
            Self::Truck
        } else if distance_km <= SHIP_MAX_KM || weight_kg >= AIR_FREIGHT_MAX_KG {
            Self::Ship
        } else {
            Self::Air
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Air => "air",
            Self::Ship => "ship",
            Self::Truck => "truck",
        })
    }
}

/// kg CO2 per kg of product for each material
fn material_intensity(material: MaterialType) -> f64 {
    match material {
        MaterialType::Wood => 0.5,
        MaterialType::Cardboard => 0.9,
        MaterialType::Paper => 1.1,
        MaterialType::Glass => 1.2,
        MaterialType::Metal => 4.0,
        MaterialType::Fabric => 5.0,
        MaterialType::Plastic | MaterialType::Mixed | MaterialType::Unknown => 2.5,
    }
}

pub fn origin_distance_km(origin: &str) -> f64 {
    ORIGIN_DISTANCES_KM
        .iter()
        .find(|(country, _)| country.eq_ignore_ascii_case(origin))
        .map_or(DEFAULT_DISTANCE_KM, |(_, km)| *km)
}

fn origin_index(origin: &str) -> u8 {
    ORIGIN_DISTANCES_KM
        .iter()
        .position(|(country, _)| country.eq_ignore_ascii_case(origin))
        .unwrap_or(ORIGIN_DISTANCES_KM.len()) as u8
}

fn recyclability_index(recyclability: Recyclability) -> u8 {
    match recyclability {
        Recyclability::High => 0,
        Recyclability::Medium => 1,
        Recyclability::Low => 2,
        Recyclability::Unknown => 3,
    }
}

/// Numeric input for the eco-score classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub material_index: u8,
    pub transport_index: u8,
    pub recyclability_index: u8,
    /// Position in the origin table; one past the end for unknown origins
    pub origin_index: u8,
    /// `ln(1 + weight_kg)`
    pub weight_log: f64,
    pub weight_bucket: u8,
}

impl FeatureVector {
    pub fn encode(result: &ScrapingResult, mode: TransportMode) -> Self {
        let weight = result.weight_kg.max(0.0);
        Self {
            material_index: MATERIAL_ORDER
                .iter()
                .position(|m| *m == result.material_type)
                .unwrap_or(MATERIAL_ORDER.len() - 1) as u8,
            transport_index: mode.index(),
            recyclability_index: recyclability_index(result.recyclability),
            origin_index: origin_index(&result.origin),
            weight_log: weight.ln_1p(),
            weight_bucket: WEIGHT_BUCKETS_KG.iter().take_while(|bound| weight >= **bound).count() as u8,
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            f64::from(self.material_index),
            f64::from(self.transport_index),
            f64::from(self.recyclability_index),
            f64::from(self.origin_index),
            self.weight_log,
            f64::from(self.weight_bucket),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoEstimate {
    pub transport_mode: TransportMode,
    pub distance_km: f64,
    pub transport_kg: f64,
    pub material_kg: f64,
    pub carbon_kg: f64,
    pub features: FeatureVector,
}

/// Carbon estimate and classifier features; `mode` overrides the route default
pub fn estimate(result: &ScrapingResult, mode: Option<TransportMode>) -> EcoEstimate {
    let distance_km = origin_distance_km(&result.origin);
    let transport_mode = mode.unwrap_or_else(|| TransportMode::for_route(distance_km, result.weight_kg));
    let transport_kg = result.weight_kg / 1_000.0 * distance_km * transport_mode.emission_factor();
    let material_kg = result.weight_kg * material_intensity(result.material_type);

    EcoEstimate {
        transport_mode,
        distance_km,
        transport_kg,
        material_kg,
        carbon_kg: transport_kg + material_kg,
        features: FeatureVector::encode(result, transport_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::StrategyKind;
    use rstest::rstest;

    fn product(origin: &str, weight_kg: f64, material: MaterialType) -> ScrapingResult {
        let mut result = ScrapingResult::unknown("B000QSNYGI", StrategyKind::DirectFetch);
        result.origin = origin.to_string();
        result.weight_kg = weight_kg;
        result.material_type = material;
        result.recyclability = Recyclability::from_material(material);
        result
    }

    #[rstest]
    #[case(0.0, 2.0, TransportMode::Truck)]
    #[case(1_500.0, 2.0, TransportMode::Truck)]
    #[case(5_400.0, 0.1, TransportMode::Ship)]
    #[case(9_200.0, 2.0, TransportMode::Ship)]
    #[case(9_200.0, 0.3, TransportMode::Air)]
    fn route_defaults(#[case] distance: f64, #[case] weight: f64, #[case] expected: TransportMode) {
        assert_eq!(TransportMode::for_route(distance, weight), expected);
    }

    #[test]
    fn carbon_combines_transport_and_material() {
        let estimate = estimate(&product("China", 2.0, MaterialType::Plastic), None);
        assert_eq!(estimate.transport_mode, TransportMode::Ship);
        assert!((estimate.transport_kg - 2.0 / 1_000.0 * 9_200.0 * 0.03).abs() < 1e-9);
        assert!((estimate.material_kg - 5.0).abs() < 1e-9);
        assert!((estimate.carbon_kg - (estimate.transport_kg + estimate.material_kg)).abs() < 1e-9);
    }

    #[test]
    fn unknown_origin_uses_default_distance_and_last_index() {
        let estimate = estimate(&product("Unknown", 1.0, MaterialType::Glass), Some(TransportMode::Truck));
        assert_eq!(estimate.distance_km, DEFAULT_DISTANCE_KM);
        assert_eq!(estimate.features.origin_index as usize, ORIGIN_DISTANCES_KM.len());
        assert_eq!(estimate.features.transport_index, TransportMode::Truck.index());
    }

    #[test]
    fn features_encode_weight_buckets() {
        let light = FeatureVector::encode(&product("UK", 0.2, MaterialType::Paper), TransportMode::Truck);
        let heavy = FeatureVector::encode(&product("UK", 12.0, MaterialType::Metal), TransportMode::Truck);
        assert_eq!(light.weight_bucket, 0);
        assert_eq!(heavy.weight_bucket, 5);
        assert_eq!(light.origin_index, 0);
        assert_eq!(light.material_index, 3);
        assert_eq!(light.as_array().len(), 6);
    }
}
