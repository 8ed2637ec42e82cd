use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does not contain")]
    DoesNotContain,
    #[serde(rename = "starts with")]
    StartsWith,
    #[serde(rename = "ends with")]
    EndsWith,
    #[serde(rename = "is blank")]
    IsBlank,
    #[serde(rename = "is not blank")]
    IsNotBlank,
    #[serde(rename = "higher than")]
    HigherThan,
    #[serde(rename = "lower than")]
    LowerThan,
}

impl Operator {
    /// Blank checks carry no comparison value.
    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsBlank | Operator::IsNotBlank)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Record filter in the platform's `{match, rules}` shape.
///
/// ```rust
/// use vespa_knack::records::{Filter, Operator};
///
/// let filter = Filter::and()
///     .rule("field_90", Operator::Is, "Jane Doe")
///     .blank("field_133", false);
/// assert_eq!(
///     filter.to_query_value().unwrap(),
///     r#"{"match":"and","rules":[{"field":"field_90","operator":"is","value":"Jane Doe"},{"field":"field_133","operator":"is not blank"}]}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "match")]
    pub match_mode: MatchMode,
    pub rules: Vec<FilterRule>,
}

impl Filter {
    pub fn new(match_mode: MatchMode) -> Self {
        Self {
            match_mode,
            rules: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(MatchMode::And)
    }

    pub fn or() -> Self {
        Self::new(MatchMode::Or)
    }

    pub fn rule(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        let value = operator.takes_value().then(|| value.into());
        self.rules.push(FilterRule {
            field: field.into(),
            operator,
            value,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.rule(field, Operator::Is, value)
    }

    pub fn blank(mut self, field: impl Into<String>, blank: bool) -> Self {
        self.rules.push(FilterRule {
            field: field.into(),
            operator: if blank {
                Operator::IsBlank
            } else {
                Operator::IsNotBlank
            },
            value: None,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// JSON text for the `filters` query parameter; URL encoding happens in the transport.
    pub fn to_query_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
