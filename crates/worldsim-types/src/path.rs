//! Addressable numeric fields of the country snapshot.
//!
//! Event and project catalogs describe their effects as dotted paths such
//! as `economy.gdp_billions_usd`. Only the fields listed here can be
//! addressed. Because [`StatePath`] deserializes from those strings, an
//! unknown path is rejected when a catalog is parsed, never while a tick is
//! mutating state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::country::CountryState;

/// A known numeric field of [`CountryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StatePath {
    /// `economy.gdp_billions_usd`
    #[serde(rename = "economy.gdp_billions_usd")]
    GdpBillionsUsd,
    /// `economy.gdp_growth_rate`
    #[serde(rename = "economy.gdp_growth_rate")]
    GdpGrowthRate,
    /// `economy.inflation_rate`
    #[serde(rename = "economy.inflation_rate")]
    InflationRate,
    /// `economy.unemployment_rate`
    #[serde(rename = "economy.unemployment_rate")]
    UnemploymentRate,
    /// `economy.debt_to_gdp_percent`
    #[serde(rename = "economy.debt_to_gdp_percent")]
    DebtToGdpPercent,
    /// `economy.trade_potential`
    #[serde(rename = "economy.trade_potential")]
    TradePotential,
    /// `demographics.growth_rate_percent`
    #[serde(rename = "demographics.growth_rate_percent")]
    PopulationGrowthRate,
    /// `indices.happiness`
    #[serde(rename = "indices.happiness")]
    Happiness,
    /// `indices.stability`
    #[serde(rename = "indices.stability")]
    Stability,
    /// `indices.public_trust`
    #[serde(rename = "indices.public_trust")]
    PublicTrust,
    /// `indices.international_standing`
    #[serde(rename = "indices.international_standing")]
    InternationalStanding,
    /// `indices.innovation`
    #[serde(rename = "indices.innovation")]
    Innovation,
    /// `military.readiness_overall`
    #[serde(rename = "military.readiness_overall")]
    MilitaryReadiness,
    /// `sectors.technology.level`
    #[serde(rename = "sectors.technology.level")]
    TechnologyLevel,
    /// `sectors.industry.level`
    #[serde(rename = "sectors.industry.level")]
    IndustryLevel,
    /// `infrastructure.damage`
    #[serde(rename = "infrastructure.damage")]
    InfrastructureDamage,
    /// `infrastructure.energy_capacity_gw`
    #[serde(rename = "infrastructure.energy_capacity_gw")]
    EnergyCapacityGw,
    /// `infrastructure.renewable_percent`
    #[serde(rename = "infrastructure.renewable_percent")]
    RenewablePercent,
    /// `infrastructure.highway_km`
    #[serde(rename = "infrastructure.highway_km")]
    HighwayKm,
    /// `infrastructure.hospitals`
    #[serde(rename = "infrastructure.hospitals")]
    Hospitals,
    /// `infrastructure.beds_per_1000`
    #[serde(rename = "infrastructure.beds_per_1000")]
    BedsPer1000,
}

impl StatePath {
    /// Every addressable path.
    pub const ALL: [Self; 21] = [
        Self::GdpBillionsUsd,
        Self::GdpGrowthRate,
        Self::InflationRate,
        Self::UnemploymentRate,
        Self::DebtToGdpPercent,
        Self::TradePotential,
        Self::PopulationGrowthRate,
        Self::Happiness,
        Self::Stability,
        Self::PublicTrust,
        Self::InternationalStanding,
        Self::Innovation,
        Self::MilitaryReadiness,
        Self::TechnologyLevel,
        Self::IndustryLevel,
        Self::InfrastructureDamage,
        Self::EnergyCapacityGw,
        Self::RenewablePercent,
        Self::HighwayKm,
        Self::Hospitals,
        Self::BedsPer1000,
    ];

    /// Dotted path string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GdpBillionsUsd => "economy.gdp_billions_usd",
            Self::GdpGrowthRate => "economy.gdp_growth_rate",
            Self::InflationRate => "economy.inflation_rate",
            Self::UnemploymentRate => "economy.unemployment_rate",
            Self::DebtToGdpPercent => "economy.debt_to_gdp_percent",
            Self::TradePotential => "economy.trade_potential",
            Self::PopulationGrowthRate => "demographics.growth_rate_percent",
            Self::Happiness => "indices.happiness",
            Self::Stability => "indices.stability",
            Self::PublicTrust => "indices.public_trust",
            Self::InternationalStanding => "indices.international_standing",
            Self::Innovation => "indices.innovation",
            Self::MilitaryReadiness => "military.readiness_overall",
            Self::TechnologyLevel => "sectors.technology.level",
            Self::IndustryLevel => "sectors.industry.level",
            Self::InfrastructureDamage => "infrastructure.damage",
            Self::EnergyCapacityGw => "infrastructure.energy_capacity_gw",
            Self::RenewablePercent => "infrastructure.renewable_percent",
            Self::HighwayKm => "infrastructure.highway_km",
            Self::Hospitals => "infrastructure.hospitals",
            Self::BedsPer1000 => "infrastructure.beds_per_1000",
        }
    }

    /// Parse a dotted path, returning `None` for unknown paths.
    pub fn parse(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == path)
    }

    /// Read the current value.
    pub const fn get(self, state: &CountryState) -> f64 {
        match self {
            Self::GdpBillionsUsd => state.economy.gdp_billions_usd,
            Self::GdpGrowthRate => state.economy.gdp_growth_rate,
            Self::InflationRate => state.economy.inflation_rate,
            Self::UnemploymentRate => state.economy.unemployment_rate,
            Self::DebtToGdpPercent => state.economy.debt_to_gdp_percent,
            Self::TradePotential => state.economy.trade_potential,
            Self::PopulationGrowthRate => state.demographics.growth_rate_percent,
            Self::Happiness => state.indices.happiness,
            Self::Stability => state.indices.stability,
            Self::PublicTrust => state.indices.public_trust,
            Self::InternationalStanding => state.indices.international_standing,
            Self::Innovation => state.indices.innovation,
            Self::MilitaryReadiness => state.military.readiness_overall,
            Self::TechnologyLevel => state.sectors.technology_level,
            Self::IndustryLevel => state.sectors.industry_level,
            Self::InfrastructureDamage => state.infrastructure.damage,
            Self::EnergyCapacityGw => state.infrastructure.energy_capacity_gw,
            Self::RenewablePercent => state.infrastructure.renewable_percent,
            Self::HighwayKm => state.infrastructure.highway_km,
            Self::Hospitals => state.infrastructure.hospitals,
            Self::BedsPer1000 => state.infrastructure.beds_per_1000,
        }
    }

    const fn slot(self, state: &mut CountryState) -> &mut f64 {
        match self {
            Self::GdpBillionsUsd => &mut state.economy.gdp_billions_usd,
            Self::GdpGrowthRate => &mut state.economy.gdp_growth_rate,
            Self::InflationRate => &mut state.economy.inflation_rate,
            Self::UnemploymentRate => &mut state.economy.unemployment_rate,
            Self::DebtToGdpPercent => &mut state.economy.debt_to_gdp_percent,
            Self::TradePotential => &mut state.economy.trade_potential,
            Self::PopulationGrowthRate => &mut state.demographics.growth_rate_percent,
            Self::Happiness => &mut state.indices.happiness,
            Self::Stability => &mut state.indices.stability,
            Self::PublicTrust => &mut state.indices.public_trust,
            Self::InternationalStanding => &mut state.indices.international_standing,
            Self::Innovation => &mut state.indices.innovation,
            Self::MilitaryReadiness => &mut state.military.readiness_overall,
            Self::TechnologyLevel => &mut state.sectors.technology_level,
            Self::IndustryLevel => &mut state.sectors.industry_level,
            Self::InfrastructureDamage => &mut state.infrastructure.damage,
            Self::EnergyCapacityGw => &mut state.infrastructure.energy_capacity_gw,
            Self::RenewablePercent => &mut state.infrastructure.renewable_percent,
            Self::HighwayKm => &mut state.infrastructure.highway_km,
            Self::Hospitals => &mut state.infrastructure.hospitals,
            Self::BedsPer1000 => &mut state.infrastructure.beds_per_1000,
        }
    }

    /// Overwrite the value.
    pub fn set(self, state: &mut CountryState, value: f64) {
        *self.slot(state) = value;
    }

    /// Add `delta` to the value and return the new value.
    pub fn add(self, state: &mut CountryState, delta: f64) -> f64 {
        let slot = self.slot(state);
        *slot += delta;
        *slot
    }
}

impl core::fmt::Display for StatePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ids::CountryCode;

    #[test]
    fn names_round_trip_through_serde() {
        for path in StatePath::ALL {
            let json = serde_json::to_string(&path).unwrap();
            assert_eq!(json, format!("\"{}\"", path.as_str()));
            let back: StatePath = serde_json::from_str(&json).unwrap();
            assert_eq!(back, path);
            assert_eq!(StatePath::parse(path.as_str()), Some(path));
        }
    }

    #[test]
    fn unknown_path_rejected_at_parse() {
        let parsed: Result<StatePath, _> = serde_json::from_str("\"economy.moon_cheese\"");
        assert!(parsed.is_err());
        assert_eq!(StatePath::parse("relations.random_country"), None);
    }

    #[test]
    fn get_set_add() {
        let mut state = CountryState::new(CountryCode::from("USA"), "United States");
        StatePath::Happiness.set(&mut state, 60.0);
        let after = StatePath::Happiness.add(&mut state, -5.0);
        assert!((after - 55.0).abs() < 1e-9);
        assert!((StatePath::Happiness.get(&state) - 55.0).abs() < 1e-9);
        assert!((state.indices.happiness - 55.0).abs() < 1e-9);
    }
}
