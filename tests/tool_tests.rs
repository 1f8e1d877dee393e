//! Tools as seen by an agent: providers, state writes, cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use braid::agent::{AgentNode, AgentTree, LlmAgent, RunConfig};
use braid::agent_loop::RequestTransform;
use braid::error::BraidError;
use braid::session::{InMemorySessionService, SessionService, StateMap};
use braid::tools::*;
use braid::types::Content;
use braid::Runner;
use common::*;

struct Weather;

#[async_trait]
impl DynamicToolProvider for Weather {
    async fn list_tools(&self) -> Result<Vec<DynamicTool>, BraidError> {
        Ok(vec![DynamicTool {
            name: "forecast".into(),
            description: "Forecast for a city".into(),
            parameters: ToolParameters::object().string("city", "City", true).build(),
        }])
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, BraidError> {
        let city = args.get_str("city")?;
        Ok(ToolOutput::new(json!({ "tool": name, "city": city, "sky": "clear" })))
    }
}

#[tokio::test]
async fn provider_tools_are_listed_and_executed() {
    let model = ScriptedModel::new("m");
    model
        .queue_call("c1", "forecast", json!({ "city": "Oslo" }))
        .queue_text("Clear skies in Oslo.");
    let agent = LlmAgent::new("weather", model.clone()).with_tool_provider(Arc::new(Weather));
    let tree = AgentTree::build(AgentNode::new(agent)).unwrap();

    let events = run_root(&tree, context(&session(), "weather?", RunConfig::default())).await;

    assert_eq!(model.requests()[0].tool_names(), vec!["forecast"]);
    assert_eq!(
        events[1].function_responses()[0].response,
        json!({ "tool": "forecast", "city": "Oslo", "sky": "clear" })
    );
    assert_eq!(events[2].text(), "Clear skies in Oslo.");
}

#[tokio::test]
async fn configured_tool_shadows_provider_tool_of_same_name() {
    let model = ScriptedModel::new("m");
    model.queue_call("c1", "forecast", json!({ "city": "Oslo" }));
    let local = FunctionTool::new(
        "forecast",
        "Local forecast",
        ToolParameters::object().string("city", "City", true).build(),
        |_args, _ctx| async move { Ok(json!("rain")) },
    );
    let agent = LlmAgent::new("weather", model.clone())
        .with_tool(local)
        .with_tool_provider(Arc::new(Weather));
    let tree = AgentTree::build(AgentNode::new(agent)).unwrap();

    let events = run_root(&tree, context(&session(), "weather?", RunConfig::default())).await;

    assert_eq!(model.requests()[0].tools.len(), 1);
    assert_eq!(model.requests()[0].tools[0].description, "Local forecast");
    assert_eq!(
        events[1].function_responses()[0].response,
        json!({ "result": "rain" })
    );
}

#[tokio::test]
async fn tool_state_writes_land_in_the_session() {
    let model = ScriptedModel::new("m");
    model.queue_call("c1", "remember", json!({ "fact": "likes tea" }));
    let remember = FunctionTool::new(
        "remember",
        "Store a fact about the user",
        ToolParameters::object().string("fact", "Fact", true).build(),
        |args, _ctx| async move {
            let fact = args.get_str("fact")?.to_string();
            Ok(ToolOutput::new(json!({ "stored": true })).with_state("user:fact", json!(fact)))
        },
    );
    let tree = AgentTree::build(AgentNode::new(
        LlmAgent::new("memo", model.clone()).with_tool(remember),
    ))
    .unwrap();
    let session = session();

    run_root(&tree, context(&session, "I like tea", RunConfig::default())).await;

    assert_eq!(session.state().get_str("user:fact").as_deref(), Some("likes tea"));
}

#[tokio::test]
async fn request_transforms_rewrite_every_request() {
    let model = ScriptedModel::new("m");
    let agent = LlmAgent::new("assistant", model.clone())
        .with_instruction("Be brief.")
        .with_request_transform(RequestTransform::new("house-style", 0, |mut request| {
            request.append_instruction("Use British spelling.");
            request
        }));
    let tree = AgentTree::build(AgentNode::new(agent)).unwrap();

    run_root(&tree, context(&session(), "hi", RunConfig::default())).await;

    assert_eq!(
        model.requests()[0].system_instruction.as_deref(),
        Some("Be brief.\n\nUse British spelling.")
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_running_tool() {
    let model = ScriptedModel::new("m");
    model.queue_call("c1", "slow", json!({}));
    let slow = FunctionTool::new("slow", "Takes a while", ToolParameters::empty(), |_args, _ctx| async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(json!({ "finished": true }))
    });
    let tree = AgentTree::build(AgentNode::new(LlmAgent::new("worker", model.clone()).with_tool(slow))).unwrap();
    let sessions = Arc::new(InMemorySessionService::new());
    sessions
        .create_session("app", "u", Some("s".into()), StateMap::new())
        .await
        .unwrap();
    let runner = Runner::new("app", tree, sessions);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let items = collect(runner.run_with_cancel(
        "u",
        "s",
        Content::user("go"),
        RunConfig::default(),
        cancel,
    ))
    .await;

    assert_eq!(items.len(), 3);
    let response = items[1].as_ref().unwrap();
    assert_eq!(
        response.function_responses()[0].response,
        json!({ "interrupted": true })
    );
    assert!(matches!(items[2], Err(BraidError::Canceled)));
    assert_eq!(model.call_count(), 1);
}
