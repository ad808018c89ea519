//! Instruction template rendering.
//!
//! Templates use `{name}` placeholders. Only the names in [`PLACEHOLDERS`]
//! are substituted; any other braces are left untouched so free-form
//! instructions from an agents document survive unchanged.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Placeholder names a template may reference
pub const PLACEHOLDERS: &[&str] = &[
    "topic",
    "appointment_topic",
    "user_name",
    "current_time",
    "timezone",
    "agent_name",
];

/// Placeholders rendered empty when the call has no value for them
pub const OPTIONAL_PLACEHOLDERS: &[&str] = &["user_name"];

/// Placeholders with no value when a call starts; the entry persona may not use them
pub const CALL_START_UNAVAILABLE: &[&str] = &["topic", "appointment_topic", "user_name"];

/// Known placeholder names referenced by `template`, in order of appearance
pub fn referenced(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = &after[..close];
        if PLACEHOLDERS.contains(&name) && !names.contains(&name) {
            names.push(name);
        }
        rest = &after[close + 1..];
    }
    names
}

/// Render `template`, failing when a required placeholder has no value
pub fn render(persona_id: &str, template: &str, values: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let name = &after[..close];
        if PLACEHOLDERS.contains(&name) {
            match values.get(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => out.push_str(value),
                None if OPTIONAL_PLACEHOLDERS.contains(&name) => {}
                None => {
                    return Err(Error::persona_construction(
                        persona_id,
                        format!("instructions reference {{{}}} but no value was provided", name),
                    ))
                }
            }
        } else {
            out.push('{');
            out.push_str(name);
            out.push('}');
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Line appended to the entry persona when the caller's name is known
pub fn user_name_line(user_name: &str) -> String {
    format!("\nThe user's name is {}. Use it when appropriate.", user_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_known_placeholders() {
        let out = render(
            "support",
            "Your name is {agent_name}. The issue is: {topic}.",
            &values(&[("agent_name", "Sarah"), ("topic", "printer jam")]),
        )
        .unwrap();
        assert_eq!(out, "Your name is Sarah. The issue is: printer jam.");
    }

    #[test]
    fn test_render_keeps_unknown_braces() {
        let out = render("starter", "Reply as JSON {\"ok\": true} or {other}", &values(&[])).unwrap();
        assert_eq!(out, "Reply as JSON {\"ok\": true} or {other}");
    }

    #[test]
    fn test_render_unclosed_brace() {
        let out = render("starter", "Hello {agent_name", &values(&[])).unwrap();
        assert_eq!(out, "Hello {agent_name");
    }

    #[test]
    fn test_render_missing_value_fails() {
        let err = render("booking", "Booking for {appointment_topic}", &values(&[])).unwrap_err();
        assert_eq!(err.kind(), "PersonaConstruction");
        assert!(err.to_string().contains("appointment_topic"));
    }

    #[test]
    fn test_render_blank_value_fails() {
        assert!(render("support", "Issue: {topic}", &values(&[("topic", "  ")])).is_err());
    }

    #[test]
    fn test_render_missing_user_name_is_empty() {
        let out = render("billing", "Hello {user_name}, I am {agent_name}.", &values(&[("agent_name", "Ben")])).unwrap();
        assert_eq!(out, "Hello , I am Ben.");
    }

    #[test]
    fn test_referenced_placeholders() {
        let names = referenced("{agent_name} helps {user_name} with {topic} and {agent_name} {json}");
        assert_eq!(names, vec!["agent_name", "user_name", "topic"]);
        assert!(referenced("Hello {agent_name").is_empty());
    }

    #[test]
    fn test_user_name_line() {
        assert_eq!(
            user_name_line("Ada"),
            "\nThe user's name is Ada. Use it when appropriate."
        );
    }
}
