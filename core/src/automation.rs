// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Automation rules, mapping recognised text to input actions
//!
//! Documents are JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "rules": [
//!     { "text": "Approve", "conditions": [["seen", false]],
//!       "actions": [["button", 2, true], ["button", 2, false], ["setbool", "seen", true]] },
//!     { "regexp": "^Review", "actions": [["finger", 100, 200, true], ["finger", 100, 200, false]] }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use strum::Display;

use crate::{Error, TextEvent};

/// Supported document version
pub const AUTOMATION_VERSION: u32 = 1;

/// Prefix for documents loaded from disk
pub const FILE_PREFIX: &str = "file:";

/// Where an automation document was received from
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum Origin {
    /// Command line or local API
    Local,
    /// Network API, `file:` references are rejected
    Network,
}

/// Automation actions
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub enum Action {
    Button { button: u8, pressed: bool },
    Finger { x: u16, y: u16, pressed: bool },
    SetBool { key: String, value: bool },
    Exit,
}

fn arg_u64(args: &[Value], i: usize) -> Result<u64, String> {
    args.get(i)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("argument {i} must be an unsigned integer"))
}

fn arg_bool(args: &[Value], i: usize) -> Result<bool, String> {
    args.get(i)
        .and_then(Value::as_bool)
        .ok_or_else(|| format!("argument {i} must be a boolean"))
}

fn arg_u16(args: &[Value], i: usize) -> Result<u16, String> {
    u16::try_from(arg_u64(args, i)?).map_err(|_| format!("argument {i} out of range"))
}

impl TryFrom<Vec<Value>> for Action {
    type Error = String;

    fn try_from(v: Vec<Value>) -> Result<Self, Self::Error> {
        let (verb, args) = match v.split_first() {
            Some((Value::String(verb), args)) => (verb.as_str(), args),
            _ => return Err("action must start with a verb".to_string()),
        };

        let (action, argc) = match verb {
            "button" => {
                let button = u8::try_from(arg_u64(args, 0)?)
                    .map_err(|_| "button out of range".to_string())?;
                let pressed = arg_bool(args, 1)?;
                (Action::Button { button, pressed }, 2)
            }
            "finger" => (
                Action::Finger {
                    x: arg_u16(args, 0)?,
                    y: arg_u16(args, 1)?,
                    pressed: arg_bool(args, 2)?,
                },
                3,
            ),
            "setbool" => {
                let key = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| "setbool key must be a string".to_string())?;
                let value = arg_bool(args, 1)?;
                (
                    Action::SetBool {
                        key: key.to_string(),
                        value,
                    },
                    2,
                )
            }
            "exit" => (Action::Exit, 0),
            _ => return Err(format!("unknown action '{verb}'")),
        };

        if args.len() != argc {
            return Err(format!("'{verb}' expects {argc} arguments"));
        }

        Ok(action)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDoc {
    text: Option<String>,
    regexp: Option<String>,
    x: Option<u16>,
    y: Option<u16>,
    #[serde(default)]
    conditions: Vec<(String, bool)>,
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    version: u32,
    rules: Vec<RuleDoc>,
}

/// A compiled automation rule
#[derive(Debug)]
pub struct Rule {
    text: Option<String>,
    regexp: Option<Regex>,
    x: Option<u16>,
    y: Option<u16>,
    conditions: Vec<(String, bool)>,
    actions: Vec<Action>,
}

impl Rule {
    fn matches(&self, ev: &TextEvent, vars: &HashMap<String, bool>) -> bool {
        if let Some(t) = &self.text {
            if t != &ev.text {
                return false;
            }
        }

        if let Some(r) = &self.regexp {
            if !r.is_match(&ev.text) {
                return false;
            }
        }

        if self.x.map(|x| x != ev.x).unwrap_or(false) || self.y.map(|y| y != ev.y).unwrap_or(false) {
            return false;
        }

        self.conditions
            .iter()
            .all(|(k, v)| vars.get(k).copied().unwrap_or(false) == *v)
    }
}

/// Loaded automation rules and their named-boolean store
#[derive(Debug, Default)]
pub struct Automation {
    rules: Vec<Rule>,
    vars: HashMap<String, bool>,
}

impl Automation {
    /// Load a document, either inline JSON or a `file:` reference
    pub fn load(doc: &str, origin: Origin) -> Result<Self, Error> {
        match doc.strip_prefix(FILE_PREFIX) {
            Some(_) if origin == Origin::Network => Err(Error::FileNotAllowed),
            Some(path) => {
                let s = std::fs::read_to_string(path)
                    .map_err(|e| Error::Automation(format!("failed to read {path}: {e}")))?;
                Self::from_json(&s)
            }
            None => Self::from_json(doc),
        }
    }

    /// Parse and validate an inline JSON document
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let doc: Document =
            serde_json::from_str(s).map_err(|e| Error::Automation(e.to_string()))?;

        if doc.version != AUTOMATION_VERSION {
            return Err(Error::Automation(format!(
                "unsupported version {}",
                doc.version
            )));
        }

        let rules = doc
            .rules
            .into_iter()
            .map(|r| {
                let regexp = r
                    .regexp
                    .map(|p| Regex::new(&format!("^(?:{p})")))
                    .transpose()
                    .map_err(|e| Error::Automation(e.to_string()))?;

                Ok(Rule {
                    text: r.text,
                    regexp,
                    x: r.x,
                    y: r.y,
                    conditions: r.conditions,
                    actions: r.actions,
                })
            })
            .collect::<Result<_, Error>>()?;

        Ok(Self {
            rules,
            vars: HashMap::new(),
        })
    }

    /// Number of loaded rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are loaded
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fetch the actions of the first rule matching the event
    pub fn get_actions(&self, ev: &TextEvent) -> Option<&[Action]> {
        self.rules
            .iter()
            .find(|r| r.matches(ev, &self.vars))
            .map(|r| r.actions.as_slice())
    }

    /// Update the named-boolean store
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.vars.insert(key.to_string(), value);
    }

    /// Read a named boolean, missing keys read as `false`
    pub fn get_bool(&self, key: &str) -> bool {
        self.vars.get(key).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ev(text: &str, x: u16, y: u16) -> TextEvent {
        TextEvent {
            text: text.to_string(),
            x,
            y,
            w: 10,
            h: 8,
            clear: false,
        }
    }

    #[test]
    fn first_match_wins() {
        let a = Automation::from_json(
            r#"{"version": 1, "rules": [
                {"text": "Application", "actions": [["button", 2, true], ["button", 2, false]]},
                {"regexp": "App", "actions": [["exit"]]},
                {"actions": [["finger", 1, 2, true]]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(a.len(), 3);
        assert_eq!(
            a.get_actions(&ev("Application", 35, 3)).unwrap(),
            &[
                Action::Button {
                    button: 2,
                    pressed: true
                },
                Action::Button {
                    button: 2,
                    pressed: false
                }
            ]
        );
        assert_eq!(a.get_actions(&ev("Apple", 0, 0)).unwrap(), &[Action::Exit]);

        // Regex is anchored at the start of the text
        assert_eq!(
            a.get_actions(&ev("My App", 0, 0)).unwrap(),
            &[Action::Finger {
                x: 1,
                y: 2,
                pressed: true
            }]
        );
    }

    #[test]
    fn positions_and_conditions() {
        let mut a = Automation::from_json(
            r#"{"version": 1, "rules": [
                {"x": 10, "y": 20, "conditions": [["armed", true]], "actions": [["setbool", "armed", false]]}
            ]}"#,
        )
        .unwrap();

        assert!(a.get_actions(&ev("x", 10, 20)).is_none());

        a.set_bool("armed", true);
        assert!(a.get_bool("armed"));
        assert!(a.get_actions(&ev("x", 10, 20)).is_some());
        assert!(a.get_actions(&ev("x", 11, 20)).is_none());
    }

    #[test]
    fn invalid_documents() {
        let bad = [
            r#"{"version": 2, "rules": []}"#,
            r#"{"version": 1, "rules": [], "extra": 1}"#,
            r#"{"version": 1, "rules": [{"actions": [["jump"]]}]}"#,
            r#"{"version": 1, "rules": [{"actions": [["button", 2]]}]}"#,
            r#"{"version": 1, "rules": [{"regexp": "(", "actions": []}]}"#,
            r#"{"version": 1, "rules": [{"txt": "a", "actions": []}]}"#,
        ];

        for b in bad {
            assert!(
                matches!(Automation::from_json(b), Err(Error::Automation(_))),
                "accepted: {b}"
            );
        }
    }

    #[test]
    fn file_references() {
        assert_eq!(
            Automation::load("file:/etc/passwd", Origin::Network).unwrap_err(),
            Error::FileNotAllowed
        );

        let path = std::env::temp_dir().join(format!("automation-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"version": 1, "rules": []}"#).unwrap();

        let a = Automation::load(&format!("file:{}", path.display()), Origin::Local).unwrap();
        assert!(a.is_empty());

        let _ = std::fs::remove_file(path);
    }
}
