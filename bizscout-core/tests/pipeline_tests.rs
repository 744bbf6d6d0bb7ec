//! Hand-off tests over the default research pipeline

use std::sync::Arc;

use bizscout_core::agent::AgentOutput;
use bizscout_core::eval::{ScriptedProvider, StubTool};
use bizscout_core::events::{event_channel, RunEvent};
use bizscout_core::llm::{Message, MessageRole, ToolCall};
use bizscout_core::tools::{SaveFactTool, ToolRegistry};
use bizscout_core::workflow::{
    research_pipeline, AgentRuntime, ResearchReport, EDITOR_AGENT, RESEARCH_AGENT, TRIAGE_AGENT,
};
use bizscout_core::BizScoutError;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

fn plan(target: &str) -> Value {
    json!({
        "handoff_to": target,
        "topic": "Cloud kitchens in Agra",
        "search_queries": ["cloud kitchen Agra", "food delivery Agra market size"],
        "focus_areas": ["demand", "competition"]
    })
}

fn report() -> Value {
    json!({
        "title": "Cloud Kitchens in Agra",
        "outline": ["Market", "Competitors"],
        "report": "## Market\nDelivery demand is growing.",
        "sources": ["https://example.com/agra"],
        "word_count": 5
    })
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(StubTool::text("search", "Agra has 40 cloud kitchens")))
        .unwrap();
    registry.register(Arc::new(SaveFactTool::new())).unwrap();
    Arc::new(registry)
}

#[tokio::test]
async fn test_triage_hands_off_to_editor_with_full_log() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_json(plan(EDITOR_AGENT))
            .reply_json(report()),
    );
    let (tx, mut rx) = event_channel(64);
    let runtime = AgentRuntime::from_provider(provider.clone(), registry()).with_events(tx);
    let pipeline = research_pipeline(runtime).unwrap();

    let outcome = assert_ok!(
        pipeline
            .run_pipeline(TRIAGE_AGENT, vec![Message::user("Cloud kitchens in Agra")])
            .await
    );
    drop(pipeline);

    assert_eq!(outcome.final_agent, EDITOR_AGENT);
    assert_eq!(outcome.hops.len(), 1);
    assert_eq!(outcome.hops[0].from, TRIAGE_AGENT);
    assert_eq!(outcome.hops[0].decision.focus_areas, vec!["demand", "competition"]);

    let parsed: ResearchReport = outcome.artifact.parse().unwrap();
    assert_eq!(parsed.title, "Cloud Kitchens in Agra");
    assert!(parsed.to_markdown().starts_with("# Cloud Kitchens in Agra\n"));

    // Editor received the user message and the triage plan, behind its own instructions
    let editor_request = &provider.requests()[1];
    assert_eq!(editor_request.messages.len(), 3);
    assert_eq!(editor_request.messages[0].role, MessageRole::System);
    assert!(editor_request.messages[0].text().contains("senior researcher"));
    assert_eq!(editor_request.messages[1].text(), "Cloud kitchens in Agra");
    assert_eq!(editor_request.messages[2].role, MessageRole::Assistant);
    assert!(editor_request.response_schema.is_some());

    assert_eq!(outcome.log.len(), 3);

    let mut handoffs = Vec::new();
    while let Some(event) = rx.recv().await {
        if let RunEvent::Handoff { from, to, .. } = event {
            handoffs.push((from, to));
        }
    }
    assert_eq!(
        handoffs,
        vec![(TRIAGE_AGENT.to_string(), EDITOR_AGENT.to_string())]
    );
}

#[tokio::test]
async fn test_specialist_schema_violation_is_fatal() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_json(plan(EDITOR_AGENT))
            .reply_text("Here is a report, but not as JSON."),
    );
    let runtime = AgentRuntime::from_provider(provider.clone(), registry());
    let pipeline = research_pipeline(runtime).unwrap();

    let err = assert_err!(
        pipeline
            .run_pipeline(TRIAGE_AGENT, vec![Message::user("Cloud kitchens in Agra")])
            .await
    );

    match err {
        BizScoutError::SchemaViolation { agent, .. } => assert_eq!(agent, EDITOR_AGENT),
        other => panic!("expected schema violation, got {:?}", other),
    }
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_unknown_handoff_target() {
    let provider = Arc::new(ScriptedProvider::new().reply_json(plan("Marketing Agent")));
    let runtime = AgentRuntime::from_provider(provider, registry());
    let pipeline = research_pipeline(runtime).unwrap();

    let err = assert_err!(
        pipeline
            .run_pipeline(TRIAGE_AGENT, vec![Message::user("Cloud kitchens in Agra")])
            .await
    );
    assert!(matches!(
        err,
        BizScoutError::UnknownHandoffTarget { ref agent, ref target }
            if agent == TRIAGE_AGENT && target == "Marketing Agent"
    ));
}

#[tokio::test]
async fn test_research_agent_searches_and_saves_facts() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_json(plan(RESEARCH_AGENT))
            .reply_tool_calls(vec![
                ToolCall::new("s1", "search", json!({"query": "cloud kitchen Agra"})),
                ToolCall::new(
                    "f1",
                    "save_important_fact",
                    json!({"fact": "Agra has 40 cloud kitchens", "source": "Zomato"}),
                ),
            ])
            .reply_text("Agra's cloud kitchen market is small but growing."),
    );
    let (tx, mut rx) = event_channel(64);
    let runtime = AgentRuntime::from_provider(provider, registry()).with_events(tx);
    let pipeline = research_pipeline(runtime).unwrap();

    let outcome = assert_ok!(
        pipeline
            .run_pipeline(TRIAGE_AGENT, vec![Message::user("Quick summary please")])
            .await
    );
    drop(pipeline);

    assert_eq!(outcome.final_agent, RESEARCH_AGENT);
    assert_eq!(
        outcome.artifact,
        AgentOutput::FreeText("Agra's cloud kitchen market is small but growing.".to_string())
    );
    // user, plan, tool request, two results, summary
    assert_eq!(outcome.log.len(), 6);
    assert_eq!(outcome.log[3].text(), "Agra has 40 cloud kitchens");
    assert_eq!(outcome.log[4].text(), "Fact saved: Agra has 40 cloud kitchens");

    let mut facts = Vec::new();
    while let Some(event) = rx.recv().await {
        if let RunEvent::FactCollected { fact, .. } = event {
            facts.push(fact);
        }
    }
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].source, "Zomato");
}

#[tokio::test]
async fn test_routing_is_deterministic() {
    let mut finals = Vec::new();
    for _ in 0..2 {
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply_json(plan(EDITOR_AGENT))
                .reply_json(report()),
        );
        let pipeline =
            research_pipeline(AgentRuntime::from_provider(provider, registry())).unwrap();
        let outcome = pipeline
            .run_pipeline(TRIAGE_AGENT, vec![Message::user("Cloud kitchens in Agra")])
            .await
            .unwrap();
        finals.push((outcome.final_agent, outcome.hops));
    }

    assert_eq!(finals[0], finals[1]);
}

#[tokio::test]
async fn test_unknown_entry_agent() {
    let runtime = AgentRuntime::from_provider(Arc::new(ScriptedProvider::new()), registry());
    let pipeline = research_pipeline(runtime).unwrap();

    let err = assert_err!(
        pipeline
            .run_pipeline("Sales Agent", vec![Message::user("hi")])
            .await
    );
    assert!(matches!(err, BizScoutError::Configuration(_)));
}
