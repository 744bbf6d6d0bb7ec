//! Agent definitions and outputs
//!
//! An [`AgentSpec`] names an agent, carries its instructions, the subset of
//! registered tools it may call, an optional output schema, and the agents
//! it may hand off to. Specs are immutable once built and shared behind an
//! `Arc` by every run that uses them.
//!
//! The halted content of a run is resolved once into an [`AgentOutput`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{BizScoutError, Result};
use crate::parsing::{JsonParser, OutputParser};

/// Immutable agent definition.
///
/// # Example
///
/// ```rust,ignore
/// let editor = AgentSpec::builder("Editor Agent")
///     .instructions("Write a cohesive report for the research query.")
///     .handoff_description("A senior researcher who writes comprehensive research reports")
///     .output_schema(ResearchReport::schema())
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    name: String,
    instructions: String,
    tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hand_off_targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    handoff_description: Option<String>,
}

impl AgentSpec {
    /// Create a new agent builder
    pub fn builder(name: impl Into<String>) -> AgentSpecBuilder {
        AgentSpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Tool names this agent may call, in declaration order
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    pub fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }

    /// Agents this agent may hand off to, in declaration order
    pub fn hand_off_targets(&self) -> &[String] {
        &self.hand_off_targets
    }

    /// Short description shown to agents that can route here
    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    /// True when the agent declares at least one hand-off target
    pub fn is_router(&self) -> bool {
        !self.hand_off_targets.is_empty()
    }

    pub fn can_hand_off_to(&self, target: &str) -> bool {
        self.hand_off_targets.iter().any(|t| t == target)
    }

    /// Copy of this spec with a section appended to its instructions
    pub fn with_appended_instructions(&self, section: &str) -> AgentSpec {
        let mut spec = self.clone();
        if section.trim().is_empty() {
            return spec;
        }
        if spec.instructions.trim().is_empty() {
            spec.instructions = section.to_string();
        } else {
            spec.instructions = format!("{}\n\n{}", spec.instructions.trim_end(), section);
        }
        spec
    }
}

/// Builder for [`AgentSpec`]
#[derive(Debug, Clone)]
pub struct AgentSpecBuilder {
    name: String,
    instructions: String,
    tools: Vec<String>,
    output_schema: Option<Value>,
    hand_off_targets: Vec<String>,
    handoff_description: Option<String>,
}

impl AgentSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            tools: Vec::new(),
            output_schema: None,
            hand_off_targets: Vec::new(),
            handoff_description: None,
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Allow the agent to call a registered tool
    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    pub fn tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(names.into_iter().map(Into::into));
        self
    }

    /// Require the final answer to validate against a JSON Schema
    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn hand_off_to(mut self, target: impl Into<String>) -> Self {
        self.hand_off_targets.push(target.into());
        self
    }

    pub fn hand_off_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hand_off_targets
            .extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    /// Build the spec.
    ///
    /// Duplicate tool and target names collapse to their first occurrence.
    /// Fails when the name is empty, the agent lists itself as a target, or
    /// the output schema does not compile.
    pub fn build(self) -> Result<AgentSpec> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(BizScoutError::Configuration(
                "Agent name is required".to_string(),
            ));
        }

        if self.hand_off_targets.iter().any(|t| *t == name) {
            return Err(BizScoutError::Configuration(format!(
                "Agent '{}' cannot hand off to itself",
                name
            )));
        }

        if let Some(schema) = &self.output_schema {
            jsonschema::validator_for(schema).map_err(|e| {
                BizScoutError::Configuration(format!(
                    "Agent '{}' has an invalid output schema: {}",
                    name, e
                ))
            })?;
        }

        Ok(AgentSpec {
            name,
            instructions: self.instructions,
            tools: dedup(self.tools),
            output_schema: self.output_schema,
            hand_off_targets: dedup(self.hand_off_targets),
            handoff_description: self.handoff_description,
        })
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Final output of a halted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentOutput {
    /// Content that validated against the agent's output schema
    StructuredPlan(Value),
    /// Plain assistant text
    FreeText(String),
}

impl AgentOutput {
    pub fn is_structured(&self) -> bool {
        matches!(self, AgentOutput::StructuredPlan(_))
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            AgentOutput::StructuredPlan(value) => Some(value),
            AgentOutput::FreeText(_) => None,
        }
    }

    /// Render as text; structured output is pretty-printed JSON
    pub fn as_text(&self) -> String {
        match self {
            AgentOutput::FreeText(text) => text.clone(),
            AgentOutput::StructuredPlan(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Deserialize structured output into a typed view
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            AgentOutput::StructuredPlan(value) => Ok(serde_json::from_value(value.clone())?),
            AgentOutput::FreeText(text) => {
                let value = JsonParser::new().parse(text).map_err(|e| {
                    BizScoutError::Other(format!("Output is not structured: {}", e))
                })?;
                Ok(serde_json::from_value(value)?)
            }
        }
    }

    /// Routing decision carried by this output, if any.
    ///
    /// Free text is checked for an embedded JSON object, so routing agents
    /// without an output schema can still hand off.
    pub fn routing_decision(&self) -> Option<RoutingDecision> {
        match self {
            AgentOutput::StructuredPlan(value) => RoutingDecision::from_value(value),
            AgentOutput::FreeText(text) => JsonParser::new()
                .parse(text)
                .ok()
                .and_then(|value| RoutingDecision::from_value(&value)),
        }
    }
}

/// A routing agent's choice of the next agent.
///
/// Recognised as any JSON object with a non-empty string `handoff_to`; the
/// plan fields are carried along when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub handoff_to: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_queries: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus_areas: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RoutingDecision {
    pub fn new(handoff_to: impl Into<String>) -> Self {
        Self {
            handoff_to: handoff_to.into(),
            topic: None,
            search_queries: Vec::new(),
            focus_areas: Vec::new(),
            reason: None,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let target = value.get("handoff_to")?.as_str()?;
        if target.trim().is_empty() {
            return None;
        }
        serde_json::from_value(value.clone())
            .ok()
            .or_else(|| Some(Self::new(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_dedups_and_keeps_order() {
        let spec = AgentSpec::builder("Research Agent")
            .tools(["search", "save_important_fact", "search"])
            .build()
            .unwrap();

        assert_eq!(spec.tools(), &["search", "save_important_fact"]);
        assert!(!spec.is_router());
    }

    #[test]
    fn test_builder_rejects_invalid_schema() {
        let result = AgentSpec::builder("Editor Agent")
            .output_schema(json!({"type": "not-a-type"}))
            .build();
        assert!(matches!(result, Err(BizScoutError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_self_handoff_and_empty_name() {
        assert!(AgentSpec::builder("Triage")
            .hand_off_to("Triage")
            .build()
            .is_err());
        assert!(AgentSpec::builder("  ").build().is_err());
    }

    #[test]
    fn test_appended_instructions() {
        let spec = AgentSpec::builder("Triage")
            .instructions("Route the task.")
            .build()
            .unwrap();
        let extended = spec.with_appended_instructions("Targets: Editor Agent");

        assert_eq!(extended.instructions(), "Route the task.\n\nTargets: Editor Agent");
        assert_eq!(spec.instructions(), "Route the task.");
    }

    #[test]
    fn test_routing_decision_from_structured_output() {
        let output = AgentOutput::StructuredPlan(json!({
            "handoff_to": "Editor Agent",
            "topic": "EV charging in Pune",
            "search_queries": ["ev charging pune"],
            "focus_areas": ["pricing"]
        }));

        let decision = output.routing_decision().unwrap();
        assert_eq!(decision.handoff_to, "Editor Agent");
        assert_eq!(decision.topic.as_deref(), Some("EV charging in Pune"));
    }

    #[test]
    fn test_routing_decision_from_fenced_text() {
        let output = AgentOutput::FreeText(
            "Routing now.\n```json\n{\"handoff_to\": \"Research Agent\"}\n```".to_string(),
        );
        assert_eq!(
            output.routing_decision(),
            Some(RoutingDecision::new("Research Agent"))
        );
    }

    #[test]
    fn test_non_routing_outputs() {
        assert!(AgentOutput::FreeText("All done.".to_string())
            .routing_decision()
            .is_none());
        assert!(AgentOutput::StructuredPlan(json!({"handoff_to": ""}))
            .routing_decision()
            .is_none());
        assert!(AgentOutput::StructuredPlan(json!({"title": "Report"}))
            .routing_decision()
            .is_none());
    }

    #[test]
    fn test_output_serialization_tag() {
        let value = serde_json::to_value(AgentOutput::FreeText("hi".to_string())).unwrap();
        assert_eq!(value, json!({"kind": "free_text", "value": "hi"}));
    }
}
