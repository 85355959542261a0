//! Seed roll-up: folds every definition sharing a `cohort_global` into one
//! parent "seed" definition keyed on their segment codes.

use std::collections::BTreeMap;

use cohort_core::CohortDefinition;

use crate::merge::{merge_item, merge_list};

#[derive(Default)]
struct SeedAccumulator {
    market: String,
    segments: Vec<String>,
    accurate_segments: Vec<String>,
    volume_segments: Vec<String>,
    obsidian_segments: Vec<String>,
}

impl SeedAccumulator {
    fn add_ids(&mut self, member: &CohortDefinition) {
        if let Some(id) = member.accurate_id.clone() {
            self.accurate_segments = merge_item(&self.accurate_segments, id);
        }
        if let Some(id) = member.volume_id.clone() {
            self.volume_segments = merge_item(&self.volume_segments, id);
        }
        if let Some(id) = member.obsidian_id.clone() {
            self.obsidian_segments = merge_item(&self.obsidian_segments, id);
        }
    }

    fn into_definition(self, cohort_global: String) -> CohortDefinition {
        let mut seed =
            CohortDefinition::new(format!("{} | {} | Seed", self.market, cohort_global));
        seed.market = Some(self.market);
        seed.cohort_global = Some(cohort_global);
        seed.segments = non_empty(self.segments);
        seed.accurate_segments = non_empty(self.accurate_segments);
        seed.volume_segments = non_empty(self.volume_segments);
        seed.obsidian_segments = non_empty(self.obsidian_segments);
        seed
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

/// Build one seed definition per `cohort_global`, ordered by group name.
///
/// A member contributes its own code and the codes it lists in `segments`.
/// Members referenced that way also contribute their accurate, volume and
/// obsidian ids, as does every member for itself.
pub fn roll_up_seeds(
    definitions: &[CohortDefinition],
    default_market: &str,
) -> Vec<CohortDefinition> {
    let mut groups: BTreeMap<String, SeedAccumulator> = BTreeMap::new();

    for member in definitions {
        let Some(global) = member.cohort_global.clone() else {
            continue;
        };
        let seed = groups.entry(global).or_insert_with(|| SeedAccumulator {
            market: member
                .market
                .clone()
                .unwrap_or_else(|| default_market.to_string()),
            ..Default::default()
        });

        if let Some(code) = member.platform_code() {
            seed.segments = merge_item(&seed.segments, code.to_string());
            if let Some(children) = member.segments.as_deref() {
                seed.segments = merge_list(&seed.segments, children);
                for child in definitions
                    .iter()
                    .filter(|d| {
                        d.platform_code()
                            .is_some_and(|code| children.iter().any(|c| c == code))
                    })
                {
                    seed.add_ids(child);
                }
            }
        }
        seed.add_ids(member);
    }

    let seeds: Vec<CohortDefinition> = groups
        .into_iter()
        .map(|(global, seed)| seed.into_definition(global))
        .collect();
    tracing::info!(
        definitions = definitions.len(),
        seeds = seeds.len(),
        "Rolled up seed cohorts"
    );
    seeds
}

/// Keep only the definitions bound to `workspace_id`.
pub fn filter_by_workspace(
    definitions: Vec<CohortDefinition>,
    workspace_id: &str,
) -> Vec<CohortDefinition> {
    definitions
        .into_iter()
        .filter(|d| d.workspace_id.as_deref() == Some(workspace_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, global: &str, code: &str) -> CohortDefinition {
        let mut def = CohortDefinition::new(name);
        def.cohort_global = Some(global.to_string());
        def.code = Some(code.to_string());
        def
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_roll_up_groups_by_global() {
        let mut tennis = member("Tennis", "Sports", "10");
        tennis.accurate_id = Some("acc-10".to_string());
        let mut golf = member("Golf", "Sports", "11");
        golf.segments = Some(strings(&["10", "x"]));
        golf.volume_id = Some("vol-11".to_string());
        let cars = member("Cars", "Auto", "20");
        let loose = CohortDefinition::new("No global");

        let seeds = roll_up_seeds(&[tennis, golf, cars, loose], "CN");
        assert_eq!(seeds.len(), 2);

        let auto = &seeds[0];
        assert_eq!(auto.name, "CN | Auto | Seed");
        assert_eq!(auto.segments, Some(strings(&["20"])));
        assert!(auto.accurate_segments.is_none());

        let sports = &seeds[1];
        assert_eq!(sports.name, "CN | Sports | Seed");
        assert_eq!(sports.segments, Some(strings(&["10", "11", "x"])));
        assert_eq!(sports.accurate_segments, Some(strings(&["acc-10"])));
        assert_eq!(sports.volume_segments, Some(strings(&["vol-11"])));
        assert!(sports.obsidian_segments.is_none());
    }

    #[test]
    fn test_member_market_names_seed() {
        let mut def = member("Mode", "Fashion", "1");
        def.market = Some("FR".to_string());
        let seeds = roll_up_seeds(&[def], "CN");
        assert_eq!(seeds[0].name, "FR | Fashion | Seed");
        assert_eq!(seeds[0].market.as_deref(), Some("FR"));
    }

    #[test]
    fn test_member_without_code_contributes_ids_only() {
        let mut def = CohortDefinition::new("Draft");
        def.cohort_global = Some("Draft".to_string());
        def.obsidian_id = Some("obs-1".to_string());
        def.segments = Some(strings(&["5"]));
        let seeds = roll_up_seeds(&[def], "CN");
        assert!(seeds[0].segments.is_none());
        assert_eq!(seeds[0].obsidian_segments, Some(strings(&["obs-1"])));
    }

    #[test]
    fn test_legacy_number_feeds_seed() {
        let mut parent = CohortDefinition::new("Parent");
        parent.cohort_global = Some("Legacy".to_string());
        parent.number = Some("30".to_string());
        parent.segments = Some(strings(&["31"]));
        let mut child = CohortDefinition::new("Child");
        child.number = Some("31".to_string());
        child.accurate_id = Some("acc-31".to_string());

        let seeds = roll_up_seeds(&[parent, child], "CN");
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].segments, Some(strings(&["30", "31"])));
        assert_eq!(seeds[0].accurate_segments, Some(strings(&["acc-31"])));
    }

    #[test]
    fn test_filter_by_workspace() {
        let mut a = CohortDefinition::new("A");
        a.workspace_id = Some("ws-1".to_string());
        let mut b = CohortDefinition::new("B");
        b.workspace_id = Some("ws-2".to_string());
        let c = CohortDefinition::new("C");

        let kept = filter_by_workspace(vec![a, b, c], "ws-1");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "A");
    }
}
