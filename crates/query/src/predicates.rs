//! Wire types for the targeting platform's query grammar.
//!
//! Field names here are the remote API's literal contract; every type
//! serialises to exactly one shape of the grammar:
//!
//! ```text
//! Query     := {"or": [Condition...]} | {"and": [Query, Condition]}
//! Condition := EventCond | TransitionCond | MembershipCond | Engagement
//! Leaf      := {"condition": {OP: value}, "property": str}
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Contains,
    EqualTo,
    ListContains,
    GreaterThanOrEqualTo,
    GreaterThan,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::EqualTo => "equal_to",
            Operator::ListContains => "list_contains",
            Operator::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            Operator::GreaterThan => "greater_than",
        }
    }
}

/// `{OP: operand}`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub operator: Operator,
    pub operand: Value,
}

impl Comparison {
    pub fn new(operator: Operator, operand: impl Into<Value>) -> Self {
        Self {
            operator,
            operand: operand.into(),
        }
    }

    pub fn contains(values: &[String]) -> Self {
        Self::new(Operator::Contains, values.to_vec())
    }

    pub fn equal_to(operand: impl Into<Value>) -> Self {
        Self::new(Operator::EqualTo, operand)
    }

    pub fn list_contains(values: &[String]) -> Self {
        Self::new(Operator::ListContains, values.to_vec())
    }

    pub fn at_least(count: u32) -> Self {
        Self::new(Operator::GreaterThanOrEqualTo, count)
    }

    pub fn greater_than(threshold: impl Into<Value>) -> Self {
        Self::new(Operator::GreaterThan, threshold)
    }
}

impl Serialize for Comparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.as_str(), &self.operand)?;
        map.end()
    }
}

/// A predicate over a single event property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    pub condition: LeafCondition,
    pub property: String,
}

impl Leaf {
    pub fn new(property: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            condition: LeafCondition::Compare(comparison),
            property: property.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LeafCondition {
    Compare(Comparison),
    /// Matches when any element of a list-of-objects property satisfies
    /// both the key comparison and the nested `where` leaf.
    Any(Box<AnyCondition>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnyCondition {
    pub condition: Comparison,
    pub function: ListFunction,
    pub property: String,
    #[serde(rename = "where")]
    pub where_: Leaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListFunction {
    Any,
}

/// Combinator over leaves inside an event's `where`.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Or(Vec<Leaf>),
    And(Vec<Leaf>),
    Single(Leaf),
}

impl Where {
    pub fn leaves(&self) -> &[Leaf] {
        match self {
            Where::Or(leaves) | Where::And(leaves) => leaves,
            Where::Single(leaf) => std::slice::from_ref(leaf),
        }
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Where::Or(leaves) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("or", leaves)?;
                map.end()
            }
            Where::And(leaves) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("and", leaves)?;
                map.end()
            }
            Where::Single(leaf) => leaf.serialize(serializer),
        }
    }
}

/// `{"the_last": {"unit": "days", "value": n}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct During {
    pub the_last: TimeWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeWindow {
    pub unit: TimeUnit,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Days,
}

impl During {
    /// A trailing window of `days`; a zero-day window means "no window".
    pub fn last_days(days: u32) -> Option<Self> {
        (days > 0).then_some(Self {
            the_last: TimeWindow {
                unit: TimeUnit::Days,
                value: days,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub during: Option<During>,
    pub event: String,
    pub frequency: Comparison,
    #[serde(rename = "where")]
    pub where_: Where,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagedTime {
    pub seconds: Comparison,
    #[serde(rename = "where")]
    pub where_: Where,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagedCompletion {
    pub completion: Comparison,
    #[serde(rename = "where")]
    pub where_: Where,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub during: Option<During>,
    pub segment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMembership {
    pub provider: String,
    pub segment: String,
}

/// One branch of the top-level query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Event(EventCondition),
    EngagedTime(EngagedTime),
    EngagedCompletion(EngagedCompletion),
    HasEntered(Transition),
    InSecondPartySegment(SegmentMembership),
    InThirdPartySegment(SegmentMembership),
}

impl Condition {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Condition::Event(event) => Some(&event.event),
            _ => None,
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn wrapped<S: Serializer, T: Serialize>(
            serializer: S,
            key: &str,
            inner: &T,
        ) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(key, inner)?;
            map.end()
        }

        match self {
            Condition::Event(event) => event.serialize(serializer),
            Condition::EngagedTime(inner) => wrapped(serializer, "engaged_time", inner),
            Condition::EngagedCompletion(inner) => {
                wrapped(serializer, "engaged_completion", inner)
            }
            Condition::HasEntered(inner) => wrapped(serializer, "has_entered", inner),
            Condition::InSecondPartySegment(inner) => {
                wrapped(serializer, "in_second_party_segment", inner)
            }
            Condition::InThirdPartySegment(inner) => {
                wrapped(serializer, "in_third_party_segment", inner)
            }
        }
    }
}

/// A compiled cohort query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Any branch qualifies a user.
    Or(Vec<Condition>),
    /// The inner query intersected with a filter condition.
    And(Box<Query>, Condition),
}

impl Query {
    /// Top-level union branches, looking through an `and` filter wrap.
    pub fn branches(&self) -> &[Condition] {
        match self {
            Query::Or(conditions) => conditions,
            Query::And(inner, _) => inner.branches(),
        }
    }

    pub fn filter(&self) -> Option<&Condition> {
        match self {
            Query::Or(_) => None,
            Query::And(_, filter) => Some(filter),
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Query::Or(conditions) => map.serialize_entry("or", conditions)?,
            Query::And(inner, filter) => map.serialize_entry("and", &(inner.as_ref(), filter))?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparison_is_single_key_object() {
        let value = serde_json::to_value(Comparison::at_least(3)).unwrap();
        assert_eq!(value, json!({"greater_than_or_equal_to": 3}));

        let value = serde_json::to_value(Comparison::greater_than(0.6)).unwrap();
        assert_eq!(value, json!({"greater_than": 0.6}));
    }

    #[test]
    fn test_during_omitted_for_zero_days() {
        assert!(During::last_days(0).is_none());
        let event = EventCondition {
            during: During::last_days(0),
            event: "Pageview".to_string(),
            frequency: Comparison::at_least(1),
            where_: Where::Or(vec![]),
        };
        let value = serde_json::to_value(Condition::Event(event)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "Pageview",
                "frequency": {"greater_than_or_equal_to": 1},
                "where": {"or": []}
            })
        );
    }

    #[test]
    fn test_during_window_shape() {
        let value = serde_json::to_value(During::last_days(14)).unwrap();
        assert_eq!(value, json!({"the_last": {"unit": "days", "value": 14}}));
    }

    #[test]
    fn test_membership_conditions_are_wrapped() {
        let condition = Condition::InThirdPartySegment(SegmentMembership {
            provider: "oracle".to_string(),
            segment: "auto-intenders".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&condition).unwrap(),
            json!({"in_third_party_segment": {"provider": "oracle", "segment": "auto-intenders"}})
        );
        assert!(condition.event_name().is_none());
    }

    #[test]
    fn test_and_query_is_two_element_list() {
        let filter = Condition::HasEntered(Transition {
            during: None,
            segment: 9,
        });
        let query = Query::And(Box::new(Query::Or(vec![])), filter.clone());
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"and": [{"or": []}, {"has_entered": {"segment": 9}}]})
        );
        assert_eq!(query.filter(), Some(&filter));
        assert!(query.branches().is_empty());
    }

    #[test]
    fn test_single_where_is_bare_leaf() {
        let where_ = Where::Single(Leaf::new(
            "properties.client.domain",
            Comparison::contains(&["example.com".to_string()]),
        ));
        assert_eq!(where_.leaves().len(), 1);
        assert_eq!(
            serde_json::to_value(&where_).unwrap(),
            json!({
                "condition": {"contains": ["example.com"]},
                "property": "properties.client.domain"
            })
        );
    }
}
