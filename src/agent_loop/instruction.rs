//! Instruction templates filled from session state.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::session::StateMap;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*(?::[A-Za-z_][A-Za-z0-9_]*)?)(\?)?\}")
        .expect("placeholder regex must compile")
});

/// Substitute `{key}` and `{key?}` placeholders.
///
/// A missing required key is left as written; a missing optional key renders
/// empty. Strings render verbatim, other values as JSON.
pub fn render(template: &str, state: &StateMap) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            let optional = caps.get(2).is_some();
            match state.get(key) {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None if optional => String::new(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Instruction listing the agents the model may hand off to.
pub fn transfer_instruction(targets: &[(String, String)]) -> String {
    let mut text = String::from("You can transfer the conversation to these agents:\n");
    for (name, description) in targets {
        text.push_str(&format!("\nAgent name: {name}\nAgent description: {description}\n"));
    }
    text.push_str(
        "\nIf you are the best agent to answer according to your description, answer yourself.\n\
         If another agent is better suited according to its description, call the \
         `transfer_to_agent` function with that agent's name. When transferring, do not \
         generate any text other than the function call.",
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> StateMap {
        let mut state = StateMap::new();
        state.insert("product".into(), json!("Braid"));
        state.insert("user:name".into(), json!("Sam"));
        state.insert("limits".into(), json!({ "max": 3 }));
        state
    }

    #[test]
    fn required_missing_stays_literal() {
        assert_eq!(render("Hi {customer}!", &state()), "Hi {customer}!");
    }

    #[test]
    fn optional_missing_renders_empty() {
        assert_eq!(render("Hi {customer?}!", &state()), "Hi !");
    }

    #[test]
    fn present_values_render() {
        assert_eq!(
            render("{user:name} uses {product?} with {limits}", &state()),
            "Sam uses Braid with {\"max\":3}"
        );
    }

    #[test]
    fn non_identifier_braces_are_untouched() {
        let json_example = r#"Reply as {"answer": 1} or { spaced }"#;
        assert_eq!(render(json_example, &state()), json_example);
    }

    #[test]
    fn transfer_instruction_lists_targets() {
        let text = transfer_instruction(&[("billing".into(), "Handles invoices".into())]);
        assert!(text.contains("Agent name: billing"));
        assert!(text.contains("Agent description: Handles invoices"));
        assert!(text.contains("transfer_to_agent"));
    }
}
