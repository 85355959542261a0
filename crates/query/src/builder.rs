//! Condition builders: one pure function per signal type, each producing
//! the condition subtree(s) for that signal.

use std::collections::BTreeSet;

use cohort_core::config::CompilerConfig;
use cohort_core::{CohortDefinition, CohortError, CohortResult};

use crate::merge::{merge_item, merge_list};
use crate::predicates::{
    AnyCondition, Comparison, Condition, During, EngagedCompletion, EngagedTime, EventCondition,
    Leaf, LeafCondition, ListFunction, SegmentMembership, Transition, Where,
};

pub const PAGEVIEW_EVENT: &str = "Pageview";
pub const VIDEO_VIEW_EVENT: &str = "videoViews";
pub const LINK_CLICK_EVENT: &str = "LinkClick";
pub const SLOT_CLICK_EVENT: &str = "GamLogSlotClicked";

const ARTICLE_TITLE: &str = "properties.article.title";
const ARTICLE_DESCRIPTION: &str = "properties.article.description";
const ARTICLE_CATEGORY: &str = "properties.article.category";
const ARTICLE_SUBCATEGORY: &str = "properties.article.subcategory";
const ARTICLE_TAGS: &str = "properties.article.tags";
const TAXONOMY_LABELS: &str = "properties.classifications_watson.taxonomy_labels";
const CONTEXT_SEGMENTS: &str = "properties.context.sg";
const CLIENT_URL: &str = "properties.client.url";
const CLIENT_DOMAIN: &str = "properties.client.domain";
const DEST_URL: &str = "properties.dest_url";
const VIDEO_TITLE: &str = "properties.videoTitle";
const SLOT_TARGETING_KEYS: &str = "properties.slot.targeting_keys";

/// Keywords at most this long with no space or hyphen are matched as whole
/// words.
const WORD_BOUNDARY_MAX_CHARS: usize = 7;

/// Inputs shared by every builder during one compilation.
pub struct BuildContext<'a> {
    pub definition: &'a CohortDefinition,
    pub config: &'a CompilerConfig,
    /// Slug tokens of the definition's keywords, computed once.
    pub slugs: Vec<String>,
}

impl BuildContext<'_> {
    fn keywords(&self) -> Vec<String> {
        sorted(&self.definition.keywords)
    }

    /// Raw urls plus keyword slugs, merged and sorted.
    fn client_urls(&self) -> Vec<String> {
        merge_list(self.definition.urls.as_deref().unwrap_or_default(), &self.slugs)
    }
}

fn sorted(list: &Option<Vec<String>>) -> Vec<String> {
    merge_list(list.as_deref().unwrap_or_default(), &[])
}

/// Title/description match terms. Short single-word keywords are padded
/// with spaces so "cat" cannot match inside "category".
pub fn contains_terms(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|keyword| {
            let multi_word = keyword.contains(' ') || keyword.contains('-');
            if multi_word || keyword.chars().count() > WORD_BOUNDARY_MAX_CHARS {
                keyword.clone()
            } else {
                format!(" {keyword} ")
            }
        })
        .collect()
}

/// Content-matching leaves shared by Pageview and the engagement builders,
/// in fixed order.
fn content_leaves(ctx: &BuildContext<'_>) -> Vec<Leaf> {
    let definition = ctx.definition;
    let mut leaves = Vec::new();

    let keywords = ctx.keywords();
    if !keywords.is_empty() {
        let terms = contains_terms(&keywords);
        leaves.push(Leaf::new(ARTICLE_TITLE, Comparison::contains(&terms)));
        leaves.push(Leaf::new(ARTICLE_DESCRIPTION, Comparison::contains(&terms)));
        leaves.push(Leaf::new(ARTICLE_CATEGORY, Comparison::equal_to(keywords.clone())));
        leaves.push(Leaf::new(ARTICLE_SUBCATEGORY, Comparison::equal_to(keywords.clone())));
        leaves.push(Leaf::new(ARTICLE_TAGS, Comparison::list_contains(&keywords)));
    }

    if definition.has_taxonomy() {
        let taxonomy = sorted(&definition.taxonomy);
        leaves.push(Leaf::new(TAXONOMY_LABELS, Comparison::list_contains(&taxonomy)));
    }

    let obsidian_id = definition.obsidian_id.as_deref().map(str::trim);
    if let Some(obsidian_id) = obsidian_id.filter(|id| !id.is_empty()) {
        leaves.push(Leaf::new(
            CONTEXT_SEGMENTS,
            Comparison::list_contains(&[obsidian_id.to_uppercase()]),
        ));
    }

    let client_urls = ctx.client_urls();
    if !client_urls.is_empty() {
        leaves.push(Leaf::new(CLIENT_URL, Comparison::contains(&client_urls)));
    }

    leaves
}

fn require_content(ctx: &BuildContext<'_>, builder: &'static str) -> CohortResult<()> {
    if ctx.definition.has_content() {
        Ok(())
    } else {
        Err(CohortError::MissingContent {
            builder,
            requires: "keywords, taxonomy, urls or obsidian_id",
        })
    }
}

pub fn page_view(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    Ok(vec![Condition::Event(EventCondition {
        during: During::last_days(ctx.definition.during_value),
        event: PAGEVIEW_EVENT.to_string(),
        frequency: Comparison::at_least(ctx.definition.frequency_value),
        where_: Where::Or(content_leaves(ctx)),
    })])
}

pub fn video_view(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let terms = contains_terms(&ctx.keywords());
    Ok(vec![Condition::Event(EventCondition {
        during: During::last_days(ctx.definition.during_value),
        event: VIDEO_VIEW_EVENT.to_string(),
        frequency: Comparison::at_least(ctx.definition.frequency_value),
        where_: Where::Or(vec![Leaf::new(VIDEO_TITLE, Comparison::contains(&terms))]),
    })])
}

/// Outbound clicks to the configured destinations from pages matching the
/// cohort's urls or keyword slugs.
pub fn link_click(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let client_urls = ctx.client_urls();
    if client_urls.is_empty() {
        return Err(CohortError::MissingContent {
            builder: "LinkClick",
            requires: "urls or keywords",
        });
    }
    let destinations = ctx.config.link_click_destinations.clone();
    Ok(vec![Condition::Event(EventCondition {
        during: None,
        event: LINK_CLICK_EVENT.to_string(),
        frequency: Comparison::at_least(1),
        where_: Where::And(vec![
            Leaf::new(DEST_URL, Comparison::contains(&destinations)),
            Leaf::new(CLIENT_URL, Comparison::contains(&client_urls)),
        ]),
    })])
}

pub fn engaged_time(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    require_content(ctx, "EngagedTime")?;
    Ok(vec![Condition::EngagedTime(EngagedTime {
        seconds: Comparison::greater_than(ctx.config.engaged_time_seconds),
        where_: Where::Or(content_leaves(ctx)),
    })])
}

pub fn engaged_completion(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    require_content(ctx, "EngagedCompletion")?;
    Ok(vec![Condition::EngagedCompletion(EngagedCompletion {
        completion: Comparison::greater_than(ctx.config.engaged_completion_ratio),
        where_: Where::Or(content_leaves(ctx)),
    })])
}

/// Clicks on ad slots targeted at any of the cohort's segment codes,
/// including the cohort's own code.
pub fn slot_click(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let definition = ctx.definition;
    let mut codes = sorted(&definition.segments);
    if let Some(code) = definition.platform_code() {
        codes = merge_item(&codes, code.to_string());
    }
    if codes.is_empty() {
        return Err(CohortError::MissingContent {
            builder: "SlotClick",
            requires: "segments or a platform code",
        });
    }

    let targeting = AnyCondition {
        condition: Comparison::equal_to(ctx.config.slot_targeting_key.clone()),
        function: ListFunction::Any,
        property: "key".to_string(),
        where_: Leaf::new("value", Comparison::list_contains(&codes)),
    };
    Ok(vec![Condition::Event(EventCondition {
        during: None,
        event: SLOT_CLICK_EVENT.to_string(),
        frequency: Comparison::at_least(1),
        where_: Where::Single(Leaf {
            condition: LeafCondition::Any(Box::new(targeting)),
            property: SLOT_TARGETING_KEYS.to_string(),
        }),
    })])
}

/// One `has_entered` per numeric segment code, ascending. Codes that are not
/// integers are skipped.
pub fn cohort_transitions(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let mut segments = BTreeSet::new();
    for code in ctx.definition.segments.iter().flatten() {
        match code.trim().parse::<i64>() {
            Ok(segment) => {
                segments.insert(segment);
            }
            Err(_) => {
                tracing::warn!(cohort = %ctx.definition.name, code = %code, "Skipping non-numeric segment code");
            }
        }
    }

    Ok(segments
        .into_iter()
        .map(|segment| {
            Condition::HasEntered(Transition {
                during: During::last_days(ctx.definition.during_value),
                segment,
            })
        })
        .collect())
}

pub fn second_party_segments(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let pairs = merge_list(
        ctx.definition.second_party_segments.as_deref().unwrap_or_default(),
        &[],
    );
    Ok(pairs
        .into_iter()
        .map(|pair| {
            Condition::InSecondPartySegment(SegmentMembership {
                provider: pair.provider,
                segment: pair.segment,
            })
        })
        .collect())
}

pub fn third_party_segments(ctx: &BuildContext<'_>) -> CohortResult<Vec<Condition>> {
    let pairs = merge_list(
        ctx.definition.third_party_segments.as_deref().unwrap_or_default(),
        &[],
    );
    Ok(pairs
        .into_iter()
        .map(|pair| {
            Condition::InThirdPartySegment(SegmentMembership {
                provider: pair.provider,
                segment: pair.segment,
            })
        })
        .collect())
}

/// Pageview on any of the given domains; intersected with the whole query.
pub fn domain_filter(definition: &CohortDefinition) -> Condition {
    let domains = sorted(&definition.domains);
    Condition::Event(EventCondition {
        during: None,
        event: PAGEVIEW_EVENT.to_string(),
        frequency: Comparison::at_least(1),
        where_: Where::Single(Leaf::new(CLIENT_DOMAIN, Comparison::contains(&domains))),
    })
}
