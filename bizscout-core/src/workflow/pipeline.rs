//! Default research pipeline
//!
//! A triage agent plans the research and hands off to one of three
//! specialists: a researcher with web search and fact saving, a competitive
//! analyst, or an editor. The analyst and editor must answer with a
//! [`ResearchReport`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::router::HandoffRouter;
use super::runtime::AgentRuntime;
use crate::agent::AgentSpec;
use crate::error::Result;
use crate::tools::{SAVE_FACT_TOOL_NAME, SEARCH_TOOL_NAME};

pub const TRIAGE_AGENT: &str = "Triage Agent";
pub const RESEARCH_AGENT: &str = "Research Agent";
pub const COMPETITIVE_ANALYSIS_AGENT: &str = "Competitive Analysis Agent";
pub const EDITOR_AGENT: &str = "Editor Agent";

/// Plan produced by the triage agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub topic: String,
    pub search_queries: Vec<String>,
    pub focus_areas: Vec<String>,
}

impl ResearchPlan {
    /// Schema of the triage agent's answer: a plan plus the hand-off target
    pub fn routing_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "handoff_to": { "type": "string" },
                "topic": { "type": "string" },
                "search_queries": { "type": "array", "items": { "type": "string" } },
                "focus_areas": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["handoff_to", "topic", "search_queries", "focus_areas"]
        })
    }
}

/// Final report from the editor or competitive analysis agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub title: String,
    pub outline: Vec<String>,
    /// Markdown body
    pub report: String,
    pub sources: Vec<String>,
    pub word_count: u64,
}

impl ResearchReport {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "outline": { "type": "array", "items": { "type": "string" } },
                "report": { "type": "string" },
                "sources": { "type": "array", "items": { "type": "string" } },
                "word_count": { "type": "integer", "minimum": 0 }
            },
            "required": ["title", "outline", "report", "sources", "word_count"]
        })
    }

    /// Render as a standalone markdown document
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.title);

        if !self.outline.is_empty() {
            out.push_str("\n## Outline\n\n");
            for (i, item) in self.outline.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, item));
            }
        }

        out.push('\n');
        out.push_str(self.report.trim());
        out.push('\n');

        if !self.sources.is_empty() {
            out.push_str("\n## Sources\n\n");
            for (i, source) in self.sources.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, source));
            }
        }

        out
    }
}

/// The four agents of the default pipeline
pub fn research_agents() -> Result<Vec<AgentSpec>> {
    let research = AgentSpec::builder(RESEARCH_AGENT)
        .instructions(
            "You are a research assistant. Given a search term, search the web for it and \
             produce a concise summary of the results: 2-3 paragraphs, under 300 words. Capture \
             the main points and skip the fluff; the summary is read by someone writing a \
             report. Save important facts with their sources as you find them.",
        )
        .handoff_description("Searches the web and summarises findings for a single topic")
        .tools([SEARCH_TOOL_NAME, SAVE_FACT_TOOL_NAME])
        .build()?;

    let editor = AgentSpec::builder(EDITOR_AGENT)
        .instructions(
            "You are a senior researcher writing a cohesive report for a research query. You \
             are given the original query and a research plan. First outline the structure of \
             the report, then write it in markdown: lengthy and detailed, at least 1000 words.",
        )
        .handoff_description("A senior researcher who writes comprehensive research reports")
        .output_schema(ResearchReport::schema())
        .build()?;

    let competitive = AgentSpec::builder(COMPETITIVE_ANALYSIS_AGENT)
        .instructions(
            "You are an expert in competitive analysis. Report on the competitive landscape \
             for the target company, product or market: overview, 3-5 key competitors, market \
             positioning, SWOT, differentiators, opportunities and threats, and \
             recommendations. Use markdown and aim for at least 1500 words.",
        )
        .handoff_description("An expert in business intelligence and market competition analysis")
        .output_schema(ResearchReport::schema())
        .build()?;

    let triage = AgentSpec::builder(TRIAGE_AGENT)
        .instructions(
            "You coordinate this research operation. Understand the user's topic and prepare \
             a research plan with a clear topic statement, 3-5 targeted search queries and 3-5 \
             focus areas. Hand off to the Competitive Analysis Agent for market or competitor \
             questions, to the Editor Agent for general research reports, or to the Research \
             Agent when the user only wants a quick web summary.",
        )
        .output_schema(ResearchPlan::routing_schema())
        .hand_off_targets([RESEARCH_AGENT, COMPETITIVE_ANALYSIS_AGENT, EDITOR_AGENT])
        .build()?;

    Ok(vec![triage, research, competitive, editor])
}

/// Router over the default research agents; enter at [`TRIAGE_AGENT`]
pub fn research_pipeline(runtime: AgentRuntime) -> Result<HandoffRouter> {
    HandoffRouter::builder(runtime)
        .agents(research_agents()?)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ScriptedProvider;
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    #[test]
    fn test_research_pipeline_builds() {
        let runtime = AgentRuntime::from_provider(
            Arc::new(ScriptedProvider::new()),
            Arc::new(ToolRegistry::new()),
        );
        let router = research_pipeline(runtime).unwrap();

        assert_eq!(router.agent_names().len(), 4);
        let triage = router.agent(TRIAGE_AGENT).unwrap();
        assert!(triage.is_router());
        assert!(triage
            .instructions()
            .contains("- Editor Agent: A senior researcher who writes comprehensive research reports"));
        assert!(router.agent(EDITOR_AGENT).unwrap().output_schema().is_some());
    }

    #[test]
    fn test_report_markdown() {
        let report = ResearchReport {
            title: "Cloud Kitchens in Agra".to_string(),
            outline: vec!["Market".to_string(), "Competitors".to_string()],
            report: "## Market\nGrowing fast.\n".to_string(),
            sources: vec!["https://example.com/a".to_string()],
            word_count: 3,
        };

        assert_eq!(
            report.to_markdown(),
            "# Cloud Kitchens in Agra\n\n## Outline\n\n1. Market\n2. Competitors\n\n\
             ## Market\nGrowing fast.\n\n## Sources\n\n1. https://example.com/a\n"
        );
    }

    #[test]
    fn test_report_schema_matches_struct() {
        let report = ResearchReport {
            title: "t".to_string(),
            outline: vec![],
            report: "r".to_string(),
            sources: vec![],
            word_count: 1,
        };
        let value = serde_json::to_value(&report).unwrap();
        let validator = jsonschema::validator_for(&ResearchReport::schema()).unwrap();
        assert!(validator.is_valid(&value));
    }
}
