//! Rebuilds model contents from a session's event log.
//!
//! Partial events, rewound invocations, events from unrelated branches and
//! non-conversational roles never reach the model. A compaction summary stands
//! in for the events its range covers, at the position where that range
//! begins. Model and tool output authored by other agents is restated as
//! user-role context so the current agent never sees foreign calls as its own.

use std::collections::BTreeMap;

use crate::types::{Content, Event, EventCompaction, Part, Role, USER_AUTHOR};

/// The log with rewind markers applied: each marker removes its target
/// invocation and everything after it, up to the marker. Partial events are
/// dropped as well.
pub fn apply_rewinds(events: &[Event]) -> Vec<&Event> {
    let mut kept: Vec<&Event> = Vec::with_capacity(events.len());
    for event in events.iter().filter(|event| !event.partial) {
        match event.actions.rewind_before_invocation_id.as_deref() {
            Some(target) => {
                if let Some(start) = kept.iter().position(|e| e.invocation_id == target) {
                    kept.truncate(start);
                }
            }
            None => kept.push(event),
        }
    }
    kept
}

/// Whether an event recorded on `event_branch` is visible from `current`.
///
/// Events are visible on their own branch and on every branch below it.
pub fn is_visible(event_branch: Option<&str>, current: Option<&str>) -> bool {
    match (event_branch, current) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(event_branch), Some(current)) => {
            current == event_branch
                || current
                    .strip_prefix(event_branch)
                    .is_some_and(|rest| rest.starts_with('.'))
        }
    }
}

enum Item<'a> {
    Event(&'a Event),
    Summary(&'a Content),
}

fn covers(compaction: &EventCompaction, event: &Event) -> bool {
    compaction.start_timestamp <= event.timestamp && event.timestamp <= compaction.end_timestamp
}

/// Replace compacted ranges with their summaries.
fn substitute_compactions<'a>(events: &[&'a Event]) -> Vec<Item<'a>> {
    let markers: Vec<(usize, &'a EventCompaction)> = events
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(index, event)| event.actions.compaction.as_ref().map(|c| (index, c)))
        .collect();

    // A summary wholly inside a later one is superseded.
    let kept: Vec<(usize, &'a EventCompaction)> = markers
        .iter()
        .enumerate()
        .filter(|&(position, &(_, compaction))| {
            !markers[position + 1..].iter().any(|&(_, later)| {
                later.start_timestamp <= compaction.start_timestamp
                    && compaction.end_timestamp <= later.end_timestamp
            })
        })
        .map(|(_, &marker)| marker)
        .collect();

    let mut anchored: BTreeMap<usize, Vec<&'a EventCompaction>> = BTreeMap::new();
    for &(marker_index, compaction) in &kept {
        let anchor = events
            .iter()
            .position(|event| !event.is_compaction() && covers(compaction, event))
            .unwrap_or(marker_index);
        anchored.entry(anchor).or_default().push(compaction);
    }

    let mut items = Vec::with_capacity(events.len());
    for (index, &event) in events.iter().enumerate() {
        if let Some(summaries) = anchored.get(&index) {
            items.extend(
                summaries
                    .iter()
                    .map(|&compaction| Item::Summary(&compaction.compacted_content)),
            );
        }
        if event.is_compaction() || kept.iter().any(|&(_, c)| covers(c, event)) {
            continue;
        }
        items.push(Item::Event(event));
    }
    items
}

/// Restate another agent's output as user-role context.
fn foreign_context(event: &Event, content: &Content) -> Option<Content> {
    let author = &event.author;
    let mut parts = vec![Part::text("For context:")];
    for part in &content.parts {
        match part {
            Part::Text { text } if !text.is_empty() => {
                parts.push(Part::text(format!("[{author}] said: {text}")));
            }
            Part::FunctionCall(call) => parts.push(Part::text(format!(
                "[{author}] called tool `{}` with parameters: {}",
                call.name, call.args
            ))),
            Part::FunctionResponse(response) => parts.push(Part::text(format!(
                "[{author}] `{}` tool returned result: {}",
                response.name, response.response
            ))),
            Part::InlineData(blob) => parts.push(Part::InlineData(blob.clone())),
            Part::Text { .. } | Part::Reasoning { .. } => {}
        }
    }
    (parts.len() > 1).then(|| Content::new(Role::User, parts))
}

fn event_content(event: &Event, agent_name: &str) -> Option<Content> {
    let content = event.content.as_ref()?;
    if !content.role.is_conversational() || content.parts.is_empty() {
        return None;
    }
    let foreign = event.author != agent_name && event.author != USER_AUTHOR;
    if foreign && content.role != Role::User {
        return foreign_context(event, content);
    }
    Some(content.clone())
}

/// Inputs to [`build_contents`] describing who is asking.
#[derive(Debug, Clone, Copy)]
pub struct HistoryScope<'a> {
    pub agent_name: &'a str,
    pub branch: Option<&'a str>,
    pub invocation_id: &'a str,
    pub user_content: Option<&'a Content>,
}

/// Contents for the next model request.
pub fn build_contents(events: &[Event], scope: HistoryScope<'_>) -> Vec<Content> {
    let visible: Vec<&Event> = apply_rewinds(events)
        .into_iter()
        .filter(|event| is_visible(event.branch.as_deref(), scope.branch))
        .collect();

    let mut contents: Vec<(Option<&str>, Content)> = Vec::new();
    for item in substitute_compactions(&visible) {
        match item {
            Item::Summary(summary) => contents.push((None, summary.clone())),
            Item::Event(event) => {
                if let Some(content) = event_content(event, scope.agent_name) {
                    contents.push((Some(event.invocation_id.as_str()), content));
                }
            }
        }
    }

    if let Some(user_content) = scope.user_content {
        let recorded = events
            .iter()
            .any(|e| e.invocation_id == scope.invocation_id && e.author == USER_AUTHOR);
        if !recorded {
            let at = contents
                .iter()
                .position(|(invocation, _)| *invocation == Some(scope.invocation_id))
                .unwrap_or(contents.len());
            contents.insert(at, (Some(scope.invocation_id), user_content.clone()));
        }
    }

    contents.into_iter().map(|(_, content)| content).collect()
}
