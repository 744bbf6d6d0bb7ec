//! End-to-end tests for a single agent run: turn loop, tool dispatch,
//! limits and the event stream

use std::sync::Arc;
use std::time::Duration;

use bizscout_core::eval::{ScriptedProvider, StubTool};
use bizscout_core::events::{event_channel, RunEvent};
use bizscout_core::llm::{Message, MessageRole, ToolCall};
use bizscout_core::tools::{ToolRegistry, TOOL_NOT_FOUND_MESSAGE};
use bizscout_core::agent::AgentOutput;
use bizscout_core::workflow::{AgentRuntime, MachineConfig, MachineState, SchemaPolicy};
use bizscout_core::{agent::AgentSpec, BizScoutError};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn runtime_with(provider: Arc<ScriptedProvider>, tools: Vec<Arc<StubTool>>) -> AgentRuntime {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).unwrap();
    }
    AgentRuntime::from_provider(provider, Arc::new(registry))
}

fn researcher() -> Arc<AgentSpec> {
    Arc::new(
        AgentSpec::builder("Research Agent")
            .instructions("Search the web and summarise what you find.")
            .tool("search")
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_single_tool_round_trip() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_tool_calls(vec![ToolCall::new(
                "call-1",
                "search",
                json!({"query": "cloud kitchens Agra"}),
            )])
            .reply_text("There are about 40 cloud kitchens in Agra."),
    );
    let search = Arc::new(StubTool::text("search", "40 cloud kitchens listed on Zomato"));
    let runtime = runtime_with(provider.clone(), vec![search.clone()]);

    let outcome = assert_ok!(
        runtime
            .run(researcher(), vec![Message::user("How many cloud kitchens are in Agra?")])
            .await
    );

    assert_eq!(outcome.turns_taken, 2);
    assert_eq!(
        outcome.output.as_text(),
        "There are about 40 cloud kitchens in Agra."
    );

    let roles: Vec<MessageRole> = outcome.log.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant
        ]
    );
    assert_eq!(outcome.log[2].correlation_id.as_deref(), Some("call-1"));
    assert_eq!(outcome.log[2].text(), "40 cloud kitchens listed on Zomato");

    assert_eq!(search.call_count(), 1);
    assert_eq!(
        search.call_history().await,
        vec![json!({"query": "cloud kitchens Agra"})]
    );

    // The second turn saw the tool result
    let second = &provider.requests()[1];
    assert_eq!(second.messages.last().unwrap().role, MessageRole::Tool);
    assert_eq!(second.tools.len(), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_recoverable() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_tool_calls(vec![ToolCall::new("c1", "weather", json!({}))])
            .reply_text("Sorry, I can only search."),
    );
    let runtime = runtime_with(provider, vec![]);

    let outcome = assert_ok!(runtime.run(researcher(), vec![Message::user("Weather?")]).await);

    assert_eq!(outcome.log[2].text(), TOOL_NOT_FOUND_MESSAGE);
    assert_eq!(outcome.log[2].tool_name.as_deref(), Some("weather"));
    assert_eq!(outcome.output.as_text(), "Sorry, I can only search.");
}

#[tokio::test]
async fn test_zero_tool_reply_halts_after_one_turn() {
    let provider = Arc::new(ScriptedProvider::new().reply_text("Hello! What is your business idea?"));
    let runtime = runtime_with(provider.clone(), vec![]);

    let mut machine = runtime.machine(researcher());
    let outcome = assert_ok!(machine.run(vec![Message::user("hi")]).await);

    assert_eq!(machine.state(), MachineState::Halted);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(outcome.turns_taken, 1);
    assert_eq!(outcome.log.len(), 2);
}

#[tokio::test]
async fn test_iteration_ceiling() {
    let provider = Arc::new(ScriptedProvider::new().with_fallback(
        Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("loop", "search", json!({"query": "again"}))],
        ),
    ));
    let runtime = runtime_with(provider.clone(), vec![Arc::new(StubTool::text("search", "more"))])
        .with_config(MachineConfig::default().with_max_iterations(3));

    let mut machine = runtime.machine(researcher());
    let err = assert_err!(machine.run(vec![Message::user("go")]).await);

    assert!(matches!(err, BizScoutError::IterationLimitExceeded { limit: 3 }));
    assert_eq!(machine.state(), MachineState::Failed);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_provider_outage_appends_nothing() {
    let provider = Arc::new(
        ScriptedProvider::new().reply_error(BizScoutError::provider_status(503, "overloaded")),
    );
    let runtime = runtime_with(provider, vec![]);
    let (tx, mut rx) = event_channel(32);
    let runtime = runtime.with_events(tx);

    let err = assert_err!(runtime.run(researcher(), vec![Message::user("hi")]).await);
    assert!(err.is_retryable());
    drop(runtime);

    let mut appended = 0;
    let mut failed = false;
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::MessageAppended { .. } => appended += 1,
            RunEvent::Failed { .. } => failed = true,
            _ => {}
        }
    }
    assert_eq!(appended, 0);
    assert!(failed);
}

#[tokio::test]
async fn test_log_grows_append_only() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply_tool_calls(vec![
                ToolCall::new("a", "search", json!({"query": "one"})),
                ToolCall::new("b", "search", json!({"query": "two"})),
            ])
            .reply_text("done"),
    );
    let runtime = runtime_with(provider, vec![Arc::new(StubTool::text("search", "hit"))]);
    let (tx, mut rx) = event_channel(64);
    let runtime = runtime.with_events(tx);

    let seed = vec![Message::user("first"), Message::user("second")];
    let outcome = assert_ok!(runtime.run(researcher(), seed.clone()).await);
    drop(runtime);

    assert_eq!(&outcome.log[..seed.len()], seed.as_slice());

    let mut indices = Vec::new();
    while let Some(event) = rx.recv().await {
        if let RunEvent::MessageAppended { index, message, .. } = event {
            assert_eq!(outcome.log[index], message);
            indices.push(index);
        }
    }
    assert_eq!(indices, vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn test_cancelled_run_stops_before_next_turn() {
    let provider = Arc::new(ScriptedProvider::new().reply_text("never sent"));
    let token = CancellationToken::new();
    token.cancel();
    let runtime = runtime_with(provider.clone(), vec![]).with_cancellation(token);

    let err = assert_err!(runtime.run(researcher(), vec![Message::user("hi")]).await);
    assert!(matches!(err, BizScoutError::Cancelled));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_in_flight_turn() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_delay(Duration::from_secs(30))
            .reply_text("too late"),
    );
    let token = CancellationToken::new();
    let (tx, mut rx) = event_channel(32);
    let runtime = runtime_with(provider.clone(), vec![])
        .with_cancellation(token.clone())
        .with_events(tx);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let mut machine = runtime.machine(researcher());
    let err = assert_err!(machine.run(vec![Message::user("hi")]).await);
    assert!(matches!(err, BizScoutError::Cancelled));
    assert_eq!(machine.state(), MachineState::Failed);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.remaining(), 1);

    canceller.await.unwrap();
    drop(machine);
    drop(runtime);

    let mut appended = 0;
    while let Some(event) = rx.recv().await {
        if let RunEvent::MessageAppended { .. } = event {
            appended += 1;
        }
    }
    assert_eq!(appended, 0);
}

#[tokio::test]
async fn test_fallback_policy_keeps_invalid_output_as_text() {
    let provider = Arc::new(
        ScriptedProvider::new().reply_text("Agra has roughly 40 cloud kitchens."),
    );
    let runtime = runtime_with(provider, vec![])
        .with_config(MachineConfig::default().with_schema_policy(SchemaPolicy::FallbackToText));
    let analyst = Arc::new(
        AgentSpec::builder("Competitive Analysis Agent")
            .instructions("Report competitors as JSON.")
            .output_schema(json!({
                "type": "object",
                "properties": { "competitors": { "type": "array" } },
                "required": ["competitors"]
            }))
            .build()
            .unwrap(),
    );

    let mut machine = runtime.machine(analyst);
    let outcome = assert_ok!(machine.run(vec![Message::user("Who competes in Agra?")]).await);

    assert_eq!(
        outcome.output,
        AgentOutput::FreeText("Agra has roughly 40 cloud kitchens.".to_string())
    );
    assert_eq!(machine.state(), MachineState::Halted);
    assert_eq!(outcome.log.len(), 2);
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let runtime = runtime_with(Arc::new(ScriptedProvider::new()), vec![]);
    let err = assert_err!(runtime.run(researcher(), Vec::new()).await);
    assert!(matches!(err, BizScoutError::Configuration(_)));
}
