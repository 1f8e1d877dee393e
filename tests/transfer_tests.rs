//! Router behavior: transfers, chains and unresolved targets.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use braid::agent::{AgentNode, AgentTree, LlmAgent, RunConfig};
use braid::tools::TRANSFER_TOOL_NAME;
use common::*;

#[tokio::test]
async fn unknown_target_yields_one_error_event_and_ends() {
    let model = ScriptedModel::new("root");
    model
        .queue_call("c1", TRANSFER_TOOL_NAME, json!({ "agent_name": "Ghost" }))
        .queue_text("never requested");
    let tree = AgentTree::build(
        AgentNode::new(LlmAgent::new("Root", model.clone()))
            .with_agent(LlmAgent::new("Helper", ScriptedModel::new("helper"))),
    )
    .unwrap();
    let session = session();

    let events = run_root(&tree, context(&session, "hi", RunConfig::default())).await;

    let errors: Vec<_> = events.iter().filter(|e| e.error_message.is_some()).collect();
    assert_eq!(errors.len(), 1);
    assert!(events.last().unwrap().error_message.is_some());
    assert!(errors[0].error_message.as_deref().unwrap().contains("Ghost"));
    assert_eq!(model.call_count(), 1);
    assert!(session.last_event().unwrap().error_message.is_some());
}

#[tokio::test]
async fn transfers_chain_without_resuming_earlier_agents() {
    let a = ScriptedModel::new("a");
    a.queue_call("t1", TRANSFER_TOOL_NAME, json!({ "agent_name": "B" }));
    let b = ScriptedModel::new("b");
    b.queue_call("t2", TRANSFER_TOOL_NAME, json!({ "agent_name": "C" }));
    let c = ScriptedModel::new("c");
    c.queue_text("C here");

    let tree = AgentTree::build(
        AgentNode::new(LlmAgent::new("A", a.clone())).with_child(
            AgentNode::new(LlmAgent::new("B", b.clone()))
                .with_agent(LlmAgent::new("C", c.clone())),
        ),
    )
    .unwrap();
    let session = session();

    let events = run_root(&tree, context(&session, "route me", RunConfig::default())).await;

    assert_eq!(authors(&events), vec!["A", "A", "B", "B", "C"]);
    assert_eq!(events.last().unwrap().text(), "C here");
    assert_eq!((a.call_count(), b.call_count(), c.call_count()), (1, 1, 1));
}

#[tokio::test]
async fn transfer_tool_is_offered_only_to_agents_with_children() {
    let parent = ScriptedModel::new("parent");
    parent.queue_call("t1", TRANSFER_TOOL_NAME, json!({ "agent_name": "Leaf" }));
    let leaf = ScriptedModel::new("leaf");
    let tree = AgentTree::build(
        AgentNode::new(LlmAgent::new("Parent", parent.clone()))
            .with_agent(LlmAgent::new("Leaf", leaf.clone()).with_description("Handles leaves")),
    )
    .unwrap();

    run_root(&tree, context(&session(), "hi", RunConfig::default())).await;

    let offered = &parent.requests()[0];
    assert_eq!(offered.tool_names(), vec![TRANSFER_TOOL_NAME]);
    let instruction = offered.system_instruction.clone().unwrap();
    assert!(instruction.contains("Leaf"));
    assert!(instruction.contains("Handles leaves"));
    assert!(leaf.requests()[0].tools.is_empty());
}

#[tokio::test]
async fn target_sees_the_earlier_agent_as_context() {
    let a = ScriptedModel::new("a");
    a.queue_call("t1", TRANSFER_TOOL_NAME, json!({ "agent_name": "B" }));
    let b = ScriptedModel::new("b");
    let tree = AgentTree::build(
        AgentNode::new(LlmAgent::new("A", a)).with_agent(LlmAgent::new("B", b.clone())),
    )
    .unwrap();

    run_root(&tree, context(&session(), "hi", RunConfig::default())).await;

    let request = &b.requests()[0];
    assert!(request
        .contents
        .iter()
        .all(|content| content.role == braid::types::Role::User));
    assert!(request.contents[1].text().starts_with("For context:"));
}
