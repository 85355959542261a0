//! Integration test for the definition -> query -> payload flow.

#[cfg(test)]
mod tests {
    use cohort_core::{CohortDefinition, SegmentPair};
    use cohort_query::{roll_up_seeds, CohortMerger, QueryCompiler};
    use serde_json::json;

    /// A definition as it arrives from a definition file.
    fn sample_definition() -> CohortDefinition {
        serde_json::from_value(json!({
            "name": "Travel | France",
            "id": "c0ffee",
            "code": 4321,
            "keywords": ["Café Paris", "ski"],
            "taxonomy": ["/travel/europe"],
            "urls": ["/voyage/"],
            "segments": [101, "abc"],
            "second_party_segments": [["lemonde", "voyageurs"]],
            "during_value": 30,
            "frequency_value": 2,
            "workspace_id": "ws-fr"
        }))
        .unwrap()
    }

    #[test]
    fn test_full_definition_compiles() {
        let query = QueryCompiler::default()
            .to_query_json(&sample_definition())
            .unwrap();

        let window = json!({"the_last": {"unit": "days", "value": 30}});
        let terms = json!(["Café Paris", " ski "]);
        let keywords = json!(["Café Paris", "ski"]);
        assert_eq!(
            query,
            json!({"or": [
                {
                    "during": window,
                    "event": "Pageview",
                    "frequency": {"greater_than_or_equal_to": 2},
                    "where": {"or": [
                        {"condition": {"contains": terms}, "property": "properties.article.title"},
                        {"condition": {"contains": terms}, "property": "properties.article.description"},
                        {"condition": {"equal_to": keywords}, "property": "properties.article.category"},
                        {"condition": {"equal_to": keywords}, "property": "properties.article.subcategory"},
                        {"condition": {"list_contains": keywords}, "property": "properties.article.tags"},
                        {"condition": {"list_contains": ["/travel/europe"]},
                         "property": "properties.classifications_watson.taxonomy_labels"},
                        {"condition": {"contains": ["-caf%C3%A9%20paris-", "-cafe-paris-", "-ski-", "/voyage/"]},
                         "property": "properties.client.url"}
                    ]}
                },
                {
                    "during": window,
                    "event": "videoViews",
                    "frequency": {"greater_than_or_equal_to": 2},
                    "where": {"or": [
                        {"condition": {"contains": terms}, "property": "properties.videoTitle"}
                    ]}
                },
                {"has_entered": {"during": window, "segment": 101}},
                {"in_second_party_segment": {"provider": "lemonde", "segment": "voyageurs"}}
            ]})
        );
    }

    #[test]
    fn test_serialised_output_is_byte_stable() {
        let compiler = QueryCompiler::default();
        let definition = sample_definition();
        let first = serde_json::to_string(&compiler.to_query(&definition).unwrap()).unwrap();
        let second = serde_json::to_string(&compiler.to_query(&definition).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\"or\":["));
    }

    #[test]
    fn test_merged_children_compile_into_seed() {
        let mut tennis = CohortDefinition::new("Tennis");
        tennis.cohort_global = Some("Sports".to_string());
        tennis.code = Some("7".to_string());
        let mut golf = CohortDefinition::new("Golf");
        golf.cohort_global = Some("Sports".to_string());
        golf.code = Some("8".to_string());
        golf.third_party_segments = Some(vec![SegmentPair::new("acme", "golfers")]);

        let mut seeds = roll_up_seeds(&[tennis, golf.clone()], "CN");
        let seed = &mut seeds[0];
        seed.merge(&golf);

        let query = QueryCompiler::default().to_query_json(seed).unwrap();
        assert_eq!(
            query,
            json!({"or": [
                {"has_entered": {"segment": 7}},
                {"has_entered": {"segment": 8}},
                {"in_third_party_segment": {"provider": "acme", "segment": "golfers"}}
            ]})
        );
    }

    #[test]
    fn test_payload_round_trips_through_json() {
        let payload = QueryCompiler::default()
            .to_payload(&sample_definition(), &[])
            .unwrap();
        let text = serde_json::to_string(&payload).unwrap();
        let back: cohort_core::CohortPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.description.as_deref(), Some("Café Paris,ski"));
    }
}
