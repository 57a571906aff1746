pub mod catalog;
pub mod smoke;

use crate::logic::SimulationPlan;

/// Named simulation plan the logic tester runs per seed.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Every scenario key, in the order `all` expands to.
pub const SCENARIO_KEYS: [&str; 7] = [
    "smoke",
    "progression-curve",
    "puzzle-solvability",
    "memory-sequences",
    "ghost-capacity",
    "teardown-safety",
    "snapshot-roundtrip",
];

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke::smoke_scenario()),
        "progression-curve" | "progression" => Some(catalog::progression_curve_scenario()),
        "puzzle-solvability" | "puzzle" => Some(catalog::puzzle_solvability_scenario()),
        "memory-sequences" | "memory" => Some(catalog::memory_sequences_scenario()),
        "ghost-capacity" | "ghost" => Some(catalog::ghost_capacity_scenario()),
        "teardown-safety" | "teardown" => Some(catalog::teardown_safety_scenario()),
        "snapshot-roundtrip" | "snapshot" => Some(catalog::snapshot_roundtrip_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("progression-curve", "Progression Curve and Unlocks"),
        ("puzzle-solvability", "Sliding Puzzle Solvability"),
        ("memory-sequences", "Memory Candle Sequences"),
        ("ghost-capacity", "Tap the Ghost Capacity and Expiry"),
        ("teardown-safety", "Round Teardown Safety"),
        ("snapshot-roundtrip", "Snapshot Round-Trip"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        let listed = list_scenarios();
        assert_eq!(listed.len(), SCENARIO_KEYS.len());
        for ((key, description), expected) in listed.into_iter().zip(SCENARIO_KEYS) {
            assert_eq!(key, expected);
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("{key} missing"));
            assert_eq!(scenario.name, description);
            assert!(!scenario.plan.expectations.is_empty());
        }
    }

    #[test]
    fn aliases_and_case_are_accepted() {
        assert_eq!(get_scenario("GHOST").unwrap().name, "Tap the Ghost Capacity and Expiry");
        assert!(get_scenario("vehicle-system").is_none());
    }
}
