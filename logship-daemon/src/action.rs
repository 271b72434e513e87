//! Conditional event actions.
//!
//! Each `[[pipeline.actions]]` entry becomes an [`Action`]. The optional
//! `do_if` tree is compiled once at startup; evaluation borrows a scratch
//! owned by the calling worker.

use logship_core::config::ActionConfig;
use logship_core::error::{ConfigError, LogshipError};
use logship_doif::{Checker, FieldPath, FieldScratch};
use serde_json::Value;

/// What an action does once its condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Drop the whole event.
    Discard,
    /// Delete the listed fields, ignoring absent ones.
    RemoveFields(Vec<FieldPath>),
}

/// Outcome of applying an action to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Continue with the next action.
    Keep,
    /// Stop processing and drop the event.
    Drop,
}

/// A compiled action.
#[derive(Debug)]
pub struct Action {
    kind: ActionKind,
    do_if: Option<Checker>,
}

impl Action {
    /// Builds an action from its configuration section.
    pub fn from_config(config: &ActionConfig) -> Result<Self, LogshipError> {
        let kind = match config.kind.as_str() {
            "discard" => ActionKind::Discard,
            "remove_fields" => {
                ActionKind::RemoveFields(config.fields.iter().map(|f| FieldPath::parse(f)).collect())
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "pipeline.actions.type".to_owned(),
                    reason: format!("unknown action '{other}'"),
                }
                .into());
            }
        };

        let do_if = config.do_if.as_ref().map(Checker::from_value).transpose()?;

        Ok(Self { kind, do_if })
    }

    /// Action kind
    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    /// Scratch sized for this action's condition, if it has one.
    pub fn new_scratch(&self) -> Option<FieldScratch> {
        self.do_if.as_ref().map(Checker::new_scratch)
    }

    /// Applies the action when its condition holds.
    ///
    /// `scratch` must come from [`Action::new_scratch`] on the same action.
    pub fn apply(&self, event: &mut Value, scratch: Option<&mut FieldScratch>) -> Verdict {
        let triggered = match (&self.do_if, scratch) {
            (None, _) => true,
            (Some(checker), Some(scratch)) => checker.check_with(event, scratch),
            (Some(checker), None) => checker.check(Some(event)),
        };
        if !triggered {
            return Verdict::Keep;
        }

        match &self.kind {
            ActionKind::Discard => Verdict::Drop,
            ActionKind::RemoveFields(fields) => {
                for field in fields {
                    field.remove(event);
                }
                Verdict::Keep
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(kind: &str, fields: &[&str], do_if: Option<Value>) -> Action {
        Action::from_config(&ActionConfig {
            kind: kind.to_owned(),
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
            do_if,
        })
        .expect("valid action")
    }

    #[test]
    fn discard_without_condition_always_drops() {
        let a = action("discard", &[], None);
        assert!(a.new_scratch().is_none());
        let mut event = json!({"a": 1});
        assert_eq!(a.apply(&mut event, None), Verdict::Drop);
    }

    #[test]
    fn discard_with_condition() {
        let a = action(
            "discard",
            &[],
            Some(json!({"op": "equal", "field": "level", "values": ["debug"]})),
        );
        let mut scratch = a.new_scratch();

        let mut debug = json!({"level": "debug"});
        assert_eq!(a.apply(&mut debug, scratch.as_mut()), Verdict::Drop);

        let mut info = json!({"level": "info"});
        assert_eq!(a.apply(&mut info, scratch.as_mut()), Verdict::Keep);
    }

    #[test]
    fn remove_fields_deletes_nested_and_ignores_missing() {
        let a = action("remove_fields", &["secret", "http.headers.cookie", "nope"], None);
        let mut event = json!({
            "secret": "x",
            "http": {"headers": {"cookie": "c", "host": "h"}},
            "msg": "ok"
        });
        assert_eq!(a.apply(&mut event, None), Verdict::Keep);
        assert_eq!(event, json!({"http": {"headers": {"host": "h"}}, "msg": "ok"}));
    }

    #[test]
    fn invalid_condition_is_rejected() {
        let err = Action::from_config(&ActionConfig {
            kind: "discard".to_owned(),
            fields: vec![],
            do_if: Some(json!({"op": "regex", "field": "a", "values": ["("]})),
        })
        .unwrap_err();
        assert!(matches!(err, LogshipError::Filter(_)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Action::from_config(&ActionConfig {
            kind: "rename".to_owned(),
            ..ActionConfig::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("rename"));
    }
}
