use serde::{Deserialize, Deserializer, Serialize};

/// A declarative audience definition, compiled into a targeting query.
///
/// List fields are optional and independently nullable: `None` means the
/// signal is not used at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Platform-assigned numeric code, read-only once set.
    #[serde(
        default,
        deserialize_with = "codes::deserialize_one",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Content signals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsidian_id: Option<String>,

    // Segment membership signals
    #[serde(
        default,
        deserialize_with = "codes::deserialize_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub segments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_party_segments: Option<Vec<SegmentPair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_segments: Option<Vec<SegmentPair>>,

    // Filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    #[serde(default = "default_frequency_value")]
    pub frequency_value: u32,
    /// Trailing window in days; 0 disables the window.
    #[serde(default)]
    pub during_value: u32,
    #[serde(default = "default_page_view")]
    pub page_view: bool,
    #[serde(default)]
    pub link_click: bool,
    #[serde(default)]
    pub slot_click: bool,
    #[serde(default)]
    pub engaged_time: bool,
    #[serde(default)]
    pub engaged_completion: bool,

    // Seed roll-up bookkeeping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort_global: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accurate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "codes::deserialize_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub accurate_segments: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "codes::deserialize_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume_segments: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "codes::deserialize_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub obsidian_segments: Option<Vec<String>>,

    #[serde(
        default,
        deserialize_with = "codes::deserialize_one",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn default_frequency_value() -> u32 {
    1
}
fn default_page_view() -> bool {
    true
}

impl CohortDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            code: None,
            market: None,
            description: None,
            keywords: None,
            taxonomy: None,
            urls: None,
            obsidian_id: None,
            segments: None,
            second_party_segments: None,
            third_party_segments: None,
            domains: None,
            frequency_value: default_frequency_value(),
            during_value: 0,
            page_view: default_page_view(),
            link_click: false,
            slot_click: false,
            engaged_time: false,
            engaged_completion: false,
            cohort_global: None,
            accurate_id: None,
            volume_id: None,
            accurate_segments: None,
            volume_segments: None,
            obsidian_segments: None,
            number: None,
            workspace_id: None,
            tags: None,
        }
    }

    pub fn has_keywords(&self) -> bool {
        has_values(&self.keywords)
    }

    pub fn has_taxonomy(&self) -> bool {
        has_values(&self.taxonomy)
    }

    pub fn has_urls(&self) -> bool {
        has_values(&self.urls)
    }

    pub fn has_obsidian_id(&self) -> bool {
        self.obsidian_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// True when any signal that can match page content is populated.
    pub fn has_content(&self) -> bool {
        self.has_keywords() || self.has_taxonomy() || self.has_urls() || self.has_obsidian_id()
    }

    pub fn has_segments(&self) -> bool {
        has_values(&self.segments)
    }

    pub fn has_domains(&self) -> bool {
        has_values(&self.domains)
    }

    /// The cohort's own platform code. Older definition files carry it in
    /// `number` rather than `code`.
    pub fn platform_code(&self) -> Option<&str> {
        [self.code.as_deref(), self.number.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|code| !code.is_empty())
    }

    /// Name of the companion cohort tracking ad-slot clicks.
    pub fn clickers_name(&self) -> String {
        format!("{} | Clickers", self.name)
    }

    /// Comma-joined keywords, stored as the remote cohort's description.
    pub fn description_from_keywords(&self) -> Option<String> {
        self.keywords.as_ref().map(|keywords| keywords.join(","))
    }
}

/// Recover a keyword list from a remote cohort description.
pub fn keywords_from_description(description: &str) -> Option<Vec<String>> {
    let keywords: Vec<String> = description
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if keywords.is_empty() {
        None
    } else {
        Some(keywords)
    }
}

fn has_values(list: &Option<Vec<String>>) -> bool {
    list.as_ref()
        .is_some_and(|values| values.iter().any(|v| !v.trim().is_empty()))
}

/// An external data provider's segment, stored as `[provider, segment]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct SegmentPair {
    pub provider: String,
    pub segment: String,
}

impl SegmentPair {
    pub fn new(provider: impl Into<String>, segment: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            segment: segment.into(),
        }
    }
}

impl From<(String, String)> for SegmentPair {
    fn from((provider, segment): (String, String)) -> Self {
        Self { provider, segment }
    }
}

impl From<SegmentPair> for (String, String) {
    fn from(pair: SegmentPair) -> Self {
        (pair.provider, pair.segment)
    }
}

/// Body of a cohort create/update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub query: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Segment codes arrive as JSON integers or strings; both become strings.
mod codes {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Int(i64),
        Text(String),
    }

    impl From<RawCode> for String {
        fn from(raw: RawCode) -> Self {
            match raw {
                RawCode::Int(n) => n.to_string(),
                RawCode::Text(s) => s,
            }
        }
    }

    pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<RawCode>> = Option::deserialize(deserializer)?;
        Ok(raw.map(|codes| codes.into_iter().map(String::from).collect()))
    }

    pub fn deserialize_one<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<RawCode> = Option::deserialize(deserializer)?;
        Ok(raw.map(String::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_defaults() {
        let def: CohortDefinition = serde_json::from_str(r#"{"name": "Sports"}"#).unwrap();
        assert_eq!(def, CohortDefinition::new("Sports"));
        assert_eq!(def.frequency_value, 1);
        assert_eq!(def.during_value, 0);
        assert!(def.page_view);
        assert!(!def.has_content());
    }

    #[test]
    fn test_mixed_segment_codes_normalised_to_strings() {
        let def: CohortDefinition = serde_json::from_str(
            r#"{"name": "Mixed", "segments": [123, "456", "abc"], "code": 77}"#,
        )
        .unwrap();
        assert_eq!(
            def.segments,
            Some(vec!["123".to_string(), "456".to_string(), "abc".to_string()])
        );
        assert_eq!(def.code.as_deref(), Some("77"));
    }

    #[test]
    fn test_segment_pairs_read_as_arrays() {
        let def: CohortDefinition = serde_json::from_str(
            r#"{"name": "Pairs", "second_party_segments": [["acme", "s-1"]]}"#,
        )
        .unwrap();
        let pairs = def.second_party_segments.clone().unwrap();
        assert_eq!(pairs, vec![SegmentPair::new("acme", "s-1")]);

        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["second_party_segments"][0][0], "acme");
        assert_eq!(json["second_party_segments"][0][1], "s-1");
    }

    #[test]
    fn test_platform_code_falls_back_to_number() {
        let legacy: CohortDefinition =
            serde_json::from_str(r#"{"name": "Legacy", "number": 42}"#).unwrap();
        assert_eq!(legacy.platform_code(), Some("42"));

        let mut def = CohortDefinition::new("Both");
        def.code = Some("7".to_string());
        def.number = Some("42".to_string());
        assert_eq!(def.platform_code(), Some("7"));

        def.code = Some(" ".to_string());
        assert_eq!(def.platform_code(), Some("42"));

        assert_eq!(CohortDefinition::new("None").platform_code(), None);
    }

    #[test]
    fn test_blank_lists_are_not_content() {
        let mut def = CohortDefinition::new("Blank");
        def.keywords = Some(vec!["  ".to_string()]);
        def.urls = Some(vec![]);
        def.obsidian_id = Some(String::new());
        assert!(!def.has_content());

        def.taxonomy = Some(vec!["/sports".to_string()]);
        assert!(def.has_content());
    }

    #[test]
    fn test_description_round_trip() {
        let mut def = CohortDefinition::new("Travel");
        def.keywords = Some(vec!["paris".to_string(), "road trip".to_string()]);
        let description = def.description_from_keywords().unwrap();
        assert_eq!(description, "paris,road trip");
        assert_eq!(keywords_from_description(&description), def.keywords);
        assert_eq!(keywords_from_description(" , ,"), None);
    }

    #[test]
    fn test_clickers_name() {
        assert_eq!(CohortDefinition::new("Auto").clickers_name(), "Auto | Clickers");
    }
}
