//! Decides which condition builders apply to a cohort
//! definition and composes their output into the final query tree.

use cohort_core::config::CompilerConfig;
use cohort_core::{CohortDefinition, CohortPayload, CohortResult};

use crate::builder::{self, BuildContext};
use crate::merge::merge_list;
use crate::predicates::{Condition, Query};
use crate::slug::slugify_keywords;

type Trigger = fn(&CohortDefinition) -> bool;
type Build = fn(&BuildContext<'_>) -> CohortResult<Vec<Condition>>;

struct BuilderEntry {
    name: &'static str,
    trigger: Trigger,
    build: Build,
}

/// Builders in the order their branches appear in the top-level `or`.
const BUILDERS: [BuilderEntry; 9] = [
    BuilderEntry {
        name: "page_view",
        trigger: page_view_applies,
        build: builder::page_view,
    },
    BuilderEntry {
        name: "video_view",
        trigger: video_view_applies,
        build: builder::video_view,
    },
    BuilderEntry {
        name: "link_click",
        trigger: link_click_applies,
        build: builder::link_click,
    },
    BuilderEntry {
        name: "engaged_time",
        trigger: engaged_time_applies,
        build: builder::engaged_time,
    },
    BuilderEntry {
        name: "engaged_completion",
        trigger: engaged_completion_applies,
        build: builder::engaged_completion,
    },
    BuilderEntry {
        name: "slot_click",
        trigger: slot_click_applies,
        build: builder::slot_click,
    },
    BuilderEntry {
        name: "cohort_transition",
        trigger: CohortDefinition::has_segments,
        build: builder::cohort_transitions,
    },
    BuilderEntry {
        name: "second_party_segment",
        trigger: second_party_applies,
        build: builder::second_party_segments,
    },
    BuilderEntry {
        name: "third_party_segment",
        trigger: third_party_applies,
        build: builder::third_party_segments,
    },
];

fn page_view_applies(definition: &CohortDefinition) -> bool {
    definition.page_view && definition.has_content()
}

// The video `where` is title-only, so without keywords it could never match.
fn video_view_applies(definition: &CohortDefinition) -> bool {
    page_view_applies(definition) && definition.has_keywords()
}

fn link_click_applies(definition: &CohortDefinition) -> bool {
    definition.link_click
}

fn engaged_time_applies(definition: &CohortDefinition) -> bool {
    definition.engaged_time
}

fn engaged_completion_applies(definition: &CohortDefinition) -> bool {
    definition.engaged_completion
}

fn slot_click_applies(definition: &CohortDefinition) -> bool {
    definition.slot_click
}

fn second_party_applies(definition: &CohortDefinition) -> bool {
    definition
        .second_party_segments
        .as_ref()
        .is_some_and(|pairs| !pairs.is_empty())
}

fn third_party_applies(definition: &CohortDefinition) -> bool {
    definition
        .third_party_segments
        .as_ref()
        .is_some_and(|pairs| !pairs.is_empty())
}

/// Stateless compiler from [`CohortDefinition`] to [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Names of the builders that will contribute branches, in order.
    pub fn applicable_builders(&self, definition: &CohortDefinition) -> Vec<&'static str> {
        BUILDERS
            .iter()
            .filter(|entry| (entry.trigger)(definition))
            .map(|entry| entry.name)
            .collect()
    }

    /// Compile a definition into `{"or": [...]}`, wrapped as
    /// `{"and": [{"or": [...]}, domain_filter]}` when domains are set.
    pub fn to_query(&self, definition: &CohortDefinition) -> CohortResult<Query> {
        let ctx = self.context(definition);

        let mut branches = Vec::new();
        for entry in BUILDERS.iter().filter(|entry| (entry.trigger)(definition)) {
            let conditions = (entry.build)(&ctx)?;
            tracing::debug!(
                cohort = %definition.name,
                builder = entry.name,
                conditions = conditions.len(),
                "Builder applied"
            );
            branches.extend(conditions);
        }

        let branch_count = branches.len();
        let mut query = Query::Or(branches);
        if definition.has_domains() {
            query = Query::And(Box::new(query), builder::domain_filter(definition));
        }

        tracing::info!(
            cohort = %definition.name,
            branches = branch_count,
            domain_filtered = definition.has_domains(),
            "Compiled cohort query"
        );
        Ok(query)
    }

    pub fn to_query_json(&self, definition: &CohortDefinition) -> CohortResult<serde_json::Value> {
        Ok(serde_json::to_value(self.to_query(definition)?)?)
    }

    /// Query for the companion cohort of users who clicked the cohort's
    /// ad slots.
    pub fn to_clickers_query(&self, definition: &CohortDefinition) -> CohortResult<Query> {
        let ctx = self.context(definition);
        Ok(Query::Or(builder::slot_click(&ctx)?))
    }

    /// Create/update body for the definition's cohort. `tags` are merged
    /// with the configured default tags.
    pub fn to_payload(
        &self,
        definition: &CohortDefinition,
        tags: &[String],
    ) -> CohortResult<CohortPayload> {
        Ok(CohortPayload {
            id: definition.id.clone(),
            name: definition.name.clone(),
            query: self.to_query_json(definition)?,
            description: definition.description_from_keywords(),
            tags: merge_list(tags, &self.config.default_tags),
        })
    }

    pub fn to_clickers_payload(
        &self,
        definition: &CohortDefinition,
        tags: &[String],
    ) -> CohortResult<CohortPayload> {
        Ok(CohortPayload {
            id: None,
            name: definition.clickers_name(),
            query: serde_json::to_value(self.to_clickers_query(definition)?)?,
            description: None,
            tags: merge_list(tags, &self.config.default_tags),
        })
    }

    fn context<'a>(&'a self, definition: &'a CohortDefinition) -> BuildContext<'a> {
        let slugs = match definition.keywords.as_deref() {
            Some(keywords) if definition.has_keywords() => slugify_keywords(keywords),
            _ => Vec::new(),
        };
        BuildContext {
            definition,
            config: &self.config,
            slugs,
        }
    }
}
