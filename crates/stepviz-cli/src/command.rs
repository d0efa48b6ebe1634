//! Line command language.
//!
//! One command per line. Structure commands name a structure, an action and
//! its arguments; a trailing `!` runs the composite at once instead of
//! staging it:
//!
//! ```text
//! array init 1 2 3 4
//! array insert 2 99
//! step
//! tree init 10 5 15 null 7 !
//! undo
//! ```
//!
//! A line starting with `{` is read as a JSON intent. Blank lines and lines
//! starting with `#` are ignored.

use std::path::PathBuf;

use stepviz_runtime::ops::tree::parse_level_order;
use stepviz_runtime::{Action, Intent, Mode, StructureKind};

use crate::error::{CliError, Result};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Submit(Intent),
    Start,
    /// Advance one step, starting playback first if needed.
    Step,
    /// Run the staged composite to the end.
    RunAll,
    Cancel,
    Undo,
    Redo,
    Show,
    /// Commit log of the named structure, or the active one.
    History(Option<StructureKind>),
    Use(StructureKind),
    Save(PathBuf),
    Load(PathBuf),
    Help,
    Quit,
}

pub const HELP: &str = "\
structure commands (append '!' to run at once):
  array init <v>...        array insert <i> <v>     array delete <i>     array sort
  stack init <v>...        stack push <v>           stack pop            stack clear    stack reverse
  tree init <v|null>...
playback:
  start | step | run | cancel
history:
  undo | redo | history [structure] | use <structure>
other:
  show | save <file> | load <file> | help | quit";

/// Parse one input line. `Ok(None)` for blank lines and comments.
pub fn parse_line(input: &str) -> Result<Option<Line>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    if trimmed.starts_with('{') {
        return Intent::from_json_str(trimmed)
            .map(|intent| Some(Line::Submit(intent)))
            .map_err(|e| CliError::parse(trimmed, e.to_string()));
    }

    let cleaned: String = trimmed
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ',') { ' ' } else { c })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    let immediate = words.last() == Some(&"!");
    if immediate {
        words.pop();
    }
    let Some((&head, rest)) = words.split_first() else {
        return Err(CliError::parse(trimmed, "missing command"));
    };
    let head = head.to_ascii_lowercase();

    if let Some(structure) = StructureKind::parse(&head) {
        let action = parse_action(trimmed, structure, rest)?;
        let mut intent = Intent::new(structure, action);
        if immediate {
            intent = intent.with_mode(Mode::Immediate);
        }
        return Ok(Some(Line::Submit(intent)));
    }
    if immediate {
        return Err(CliError::parse(trimmed, "'!' only applies to structure commands"));
    }

    let line = match (head.as_str(), rest) {
        ("start", []) => Line::Start,
        ("step" | "next" | "s", []) => Line::Step,
        ("run" | "all" | "finish", []) => Line::RunAll,
        ("cancel", []) => Line::Cancel,
        ("undo" | "u", []) => Line::Undo,
        ("redo" | "r", []) => Line::Redo,
        ("show" | "state", []) => Line::Show,
        ("history" | "log", []) => Line::History(None),
        ("history" | "log", [name]) => Line::History(Some(structure(trimmed, name)?)),
        ("use", [name]) => Line::Use(structure(trimmed, name)?),
        ("save", [path]) => Line::Save(PathBuf::from(*path)),
        ("load", [path]) => Line::Load(PathBuf::from(*path)),
        ("help" | "?", []) => Line::Help,
        ("quit" | "exit" | "q", []) => Line::Quit,
        (
            "start" | "step" | "next" | "s" | "run" | "all" | "finish" | "cancel" | "undo" | "u"
            | "redo" | "r" | "show" | "state" | "history" | "log" | "use" | "save" | "load"
            | "help" | "?" | "quit" | "exit" | "q",
            _,
        ) => return Err(CliError::parse(trimmed, format!("wrong arguments for '{head}'"))),
        _ => return Err(CliError::parse(trimmed, format!("unknown command '{head}'"))),
    };
    Ok(Some(line))
}

fn structure(input: &str, name: &str) -> Result<StructureKind> {
    StructureKind::parse(name)
        .ok_or_else(|| CliError::parse(input, format!("unknown structure '{name}'")))
}

fn parse_action(input: &str, structure: StructureKind, args: &[&str]) -> Result<Action> {
    let Some((&verb, args)) = args.split_first() else {
        return Err(CliError::parse(input, format!("missing action for {structure}")));
    };
    let verb = verb.to_ascii_lowercase();
    let action = match (verb.as_str(), args) {
        ("init", []) => return Err(CliError::parse(input, "init needs at least one value")),
        ("init", values) if structure == StructureKind::BinaryTree => Action::InitTree {
            slots: parse_level_order(values.iter().copied())
                .map_err(|e| CliError::parse(input, e.to_string()))?,
        },
        ("init", values) => Action::Init {
            values: values
                .iter()
                .map(|v| number(input, v))
                .collect::<Result<_>>()?,
        },
        ("insert", [index, value]) => Action::Insert {
            index: number(input, index)?,
            value: number(input, value)?,
        },
        ("delete" | "remove", [index]) => Action::Delete {
            index: number(input, index)?,
        },
        ("sort", []) => Action::Sort,
        ("push", [value]) => Action::Push {
            value: number(input, value)?,
        },
        ("pop", []) => Action::Pop,
        ("clear", []) => Action::Clear,
        ("reverse", []) => Action::Reverse,
        ("insert" | "delete" | "remove" | "sort" | "push" | "pop" | "clear" | "reverse", _) => {
            return Err(CliError::parse(input, format!("wrong arguments for '{verb}'")));
        }
        _ => return Err(CliError::parse(input, format!("unknown action '{verb}'"))),
    };
    Ok(action)
}

fn number<T: std::str::FromStr>(input: &str, token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| CliError::parse(input, format!("'{token}' is not a valid number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(input: &str) -> Intent {
        match parse_line(input).unwrap() {
            Some(Line::Submit(intent)) => intent,
            other => panic!("expected a submission, got {other:?}"),
        }
    }

    #[test]
    fn parses_array_insert() {
        let intent = submit("array insert 2 99");
        assert_eq!(intent.structure, StructureKind::Array);
        assert_eq!(
            intent.action,
            Action::Insert {
                index: 2,
                value: 99
            }
        );
        assert_eq!(intent.mode, None);
    }

    #[test]
    fn trailing_bang_runs_immediately() {
        let intent = submit("stack push -4 !");
        assert_eq!(intent.action, Action::Push { value: -4 });
        assert_eq!(intent.mode, Some(Mode::Immediate));
    }

    #[test]
    fn tree_init_accepts_null_slots() {
        let intent = submit("tree init 1 null 3");
        assert_eq!(
            intent.action,
            Action::InitTree {
                slots: vec![Some(1), None, Some(3)]
            }
        );
    }

    #[test]
    fn init_accepts_bracketed_lists() {
        let intent = submit("array init [1, 2, 3]");
        assert_eq!(
            intent.action,
            Action::Init {
                values: vec![1, 2, 3]
            }
        );
    }

    #[test]
    fn json_intents_are_accepted() {
        let intent = submit(r#"{"structure":"stack","action":{"op":"pop"}}"#);
        assert_eq!(intent.action, Action::Pop);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # setup").unwrap(), None);
    }

    #[test]
    fn control_commands() {
        assert_eq!(parse_line("step").unwrap(), Some(Line::Step));
        assert_eq!(parse_line("RUN").unwrap(), Some(Line::RunAll));
        assert_eq!(
            parse_line("use tree").unwrap(),
            Some(Line::Use(StructureKind::BinaryTree))
        );
        assert_eq!(
            parse_line("history stack").unwrap(),
            Some(Line::History(Some(StructureKind::Stack)))
        );
        assert_eq!(
            parse_line("save out.json").unwrap(),
            Some(Line::Save(PathBuf::from("out.json")))
        );
    }

    #[test]
    fn rejects_bad_input() {
        for input in [
            "array frob",
            "array insert 1",
            "array insert x 2",
            "stack",
            "tree init",
            "tree init 1 q",
            "step 3",
            "undo !",
            "dance",
            "use forest",
        ] {
            let err = parse_line(input).unwrap_err();
            assert!(matches!(err, CliError::Parse { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn negative_index_is_rejected() {
        assert!(parse_line("array delete -1").is_err());
    }
}
