//! Executes parsed lines against a [`Workspace`] and renders the results.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use stepviz_runtime::{
    CommandSource, EngineConfig, Phase, StepReport, StructureKind, Submitted,
    Workspace, WorkspaceSnapshot,
};

use crate::command::{HELP, Line, parse_line};
use crate::error::{CliError, Result};

/// Observable result of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Response {
    Staged {
        structure: StructureKind,
        name: String,
        total: usize,
        next: Option<String>,
    },
    Committed {
        structure: StructureKind,
        name: String,
        contents: Vec<i64>,
    },
    Started {
        structure: StructureKind,
        total: usize,
    },
    Stepped {
        structure: StructureKind,
        cursor: usize,
        total: usize,
        step: String,
        contents: Vec<i64>,
    },
    Cancelled {
        structure: StructureKind,
    },
    Undone {
        structure: StructureKind,
        description: String,
        contents: Vec<i64>,
    },
    Redone {
        structure: StructureKind,
        description: String,
        contents: Vec<i64>,
    },
    /// Nothing happened; `reason` says why.
    Noop {
        reason: String,
    },
    State {
        active: StructureKind,
        structures: Vec<StructureState>,
        staging: Option<String>,
    },
    History {
        structure: StructureKind,
        records: Vec<HistoryLine>,
        undo_depth: usize,
        redo_depth: usize,
    },
    Active {
        structure: StructureKind,
    },
    Saved {
        path: PathBuf,
    },
    Loaded {
        path: PathBuf,
        active: StructureKind,
    },
    Help {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureState {
    pub structure: StructureKind,
    pub summary: String,
    pub contents: Vec<i64>,
    /// Parenthesised tree shape; trees only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub name: String,
    pub description: String,
    pub steps: usize,
    pub source: String,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staged {
                structure,
                name,
                total,
                next,
            } => {
                write!(f, "staged {structure} {name} ({total} steps)")?;
                if let Some(next) = next {
                    write!(f, ", next: {next}")?;
                }
                Ok(())
            }
            Self::Committed {
                structure,
                name,
                contents,
            } => write!(f, "committed {structure} {name}: {contents:?}"),
            Self::Started { structure, total } => {
                write!(f, "playing {structure} composite ({total} steps)")
            }
            Self::Stepped {
                cursor,
                total,
                step,
                contents,
                ..
            } => write!(f, "step {cursor}/{total}: {step} -> {contents:?}"),
            Self::Cancelled { structure } => write!(f, "cancelled staged {structure} composite"),
            Self::Undone {
                structure,
                description,
                contents,
            } => write!(f, "undid {structure} '{description}': {contents:?}"),
            Self::Redone {
                structure,
                description,
                contents,
            } => write!(f, "redid {structure} '{description}': {contents:?}"),
            Self::Noop { reason } => f.write_str(reason),
            Self::State {
                active,
                structures,
                staging,
            } => {
                for s in structures {
                    let marker = if s.structure == *active { '*' } else { ' ' };
                    writeln!(f, "{marker} {}", s.summary)?;
                }
                match staging {
                    Some(view) => write!(f, "staging: {view}"),
                    None => write!(f, "staging: idle"),
                }
            }
            Self::History {
                structure,
                records,
                undo_depth,
                redo_depth,
            } => {
                writeln!(
                    f,
                    "{structure} history (undo {undo_depth}, redo {redo_depth}):"
                )?;
                if records.is_empty() {
                    return write!(f, "  (empty)");
                }
                for (i, r) in records.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "  {:>3}. {} [{} steps, {}]",
                        i + 1,
                        r.description,
                        r.steps,
                        r.source
                    )?;
                }
                Ok(())
            }
            Self::Active { structure } => write!(f, "active structure: {structure}"),
            Self::Saved { path } => write!(f, "saved to {}", path.display()),
            Self::Loaded { path, active } => {
                write!(f, "loaded {} (active: {active})", path.display())
            }
            Self::Help { text } => f.write_str(text),
        }
    }
}

/// Whether to keep reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns the workspace for a REPL or script run.
#[derive(Debug)]
pub struct Driver {
    workspace: Workspace,
    config: EngineConfig,
    source: CommandSource,
}

impl Driver {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            workspace: Workspace::new(config.clone()),
            config,
            source: CommandSource::User,
        }
    }

    /// Tag submitted composites with `source`.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Parse and execute one input line.
    pub fn execute_str(&mut self, input: &str) -> Result<Option<(Response, Flow)>> {
        match parse_line(input)? {
            Some(Line::Quit) => Ok(Some((
                Response::Noop {
                    reason: "bye".into(),
                },
                Flow::Quit,
            ))),
            Some(line) => {
                let source = if input.trim_start().starts_with('{') {
                    CommandSource::Intent
                } else {
                    self.source
                };
                Ok(Some((self.execute_as(line, source)?, Flow::Continue)))
            }
            None => Ok(None),
        }
    }

    /// Execute one parsed line.
    pub fn execute(&mut self, line: Line) -> Result<Response> {
        self.execute_as(line, self.source)
    }

    fn execute_as(&mut self, line: Line, source: CommandSource) -> Result<Response> {
        tracing::debug!(target: "stepviz.cli", ?line, source = source.as_str(), "execute");
        let ws = &mut self.workspace;
        let response = match line {
            Line::Submit(intent) => match ws.submit_as(intent, source)? {
                Submitted::Staged {
                    structure,
                    name,
                    total,
                } => Response::Staged {
                    structure,
                    name,
                    total,
                    next: ws
                        .view()
                        .and_then(|(_, v)| v.next)
                        .map(|s| s.description),
                },
                Submitted::Committed { structure, name } => Response::Committed {
                    structure,
                    name,
                    contents: ws.contents(structure),
                },
            },
            Line::Start => {
                ws.start()?;
                let (structure, view) = ws
                    .view()
                    .ok_or_else(|| CliError::exit(1, "nothing staged"))?;
                Response::Started {
                    structure,
                    total: view.total,
                }
            }
            Line::Step => self.step()?,
            Line::RunAll => self.finish()?,
            Line::Cancel => {
                let structure = ws.staged_structure();
                ws.cancel()?;
                Response::Cancelled {
                    structure: structure.unwrap_or(ws.active()),
                }
            }
            Line::Undo => {
                let structure = ws.active();
                match ws.undo() {
                    Some(result) => Response::Undone {
                        structure,
                        description: result?,
                        contents: ws.contents(structure),
                    },
                    None => Response::Noop {
                        reason: format!("nothing to undo on {structure}"),
                    },
                }
            }
            Line::Redo => {
                let structure = ws.active();
                match ws.redo() {
                    Some(result) => Response::Redone {
                        structure,
                        description: result?,
                        contents: ws.contents(structure),
                    },
                    None => Response::Noop {
                        reason: format!("nothing to redo on {structure}"),
                    },
                }
            }
            Line::Show => self.state(),
            Line::History(kind) => self.history(kind.unwrap_or(self.workspace.active())),
            Line::Use(structure) => {
                ws.set_active(structure);
                Response::Active { structure }
            }
            Line::Save(path) => self.save(&path)?,
            Line::Load(path) => self.load(&path)?,
            Line::Help => Response::Help {
                text: HELP.to_string(),
            },
            Line::Quit => Response::Noop {
                reason: "bye".into(),
            },
        };
        Ok(response)
    }

    fn step(&mut self) -> Result<Response> {
        let ws = &mut self.workspace;
        let Some((_, view)) = ws.view() else {
            return Ok(Response::Noop {
                reason: "nothing staged".into(),
            });
        };
        if view.phase == Phase::Staged {
            ws.start()?;
        }
        let step = view.next.map(|s| s.description).unwrap_or_default();
        let (structure, report) = ws.step()?;
        let contents = ws.contents(structure);
        Ok(match report {
            StepReport::Advanced { cursor, total } => Response::Stepped {
                structure,
                cursor,
                total,
                step,
                contents,
            },
            StepReport::Committed { name, .. } => Response::Committed {
                structure,
                name,
                contents,
            },
        })
    }

    /// Run the staged composite to the end. Mid-playback, the remaining
    /// steps are played one by one.
    fn finish(&mut self) -> Result<Response> {
        let ws = &mut self.workspace;
        let playing = ws
            .view()
            .is_some_and(|(_, view)| view.phase == Phase::Visualizing);
        if !playing {
            let (structure, name) = ws.execute_all()?;
            return Ok(Response::Committed {
                structure,
                name,
                contents: ws.contents(structure),
            });
        }
        loop {
            if let (structure, StepReport::Committed { name, .. }) = ws.step()? {
                return Ok(Response::Committed {
                    structure,
                    name,
                    contents: ws.contents(structure),
                });
            }
        }
    }

    fn state(&self) -> Response {
        let ws = &self.workspace;
        let structures = StructureKind::ALL
            .into_iter()
            .map(|structure| StructureState {
                structure,
                summary: ws.summary(structure),
                contents: ws.contents(structure),
                shape: (structure == StructureKind::BinaryTree)
                    .then(|| ws.tree().container().shape()),
            })
            .collect();
        Response::State {
            active: ws.active(),
            structures,
            staging: ws.view().map(|(_, v)| v.to_string()),
        }
    }

    fn history(&self, structure: StructureKind) -> Response {
        let ws = &self.workspace;
        let (undo_depth, redo_depth) = match structure {
            StructureKind::Array => depths(ws.array().history()),
            StructureKind::Stack => depths(ws.stack().history()),
            StructureKind::BinaryTree => depths(ws.tree().history()),
        };
        Response::History {
            structure,
            records: ws
                .records(structure)
                .iter()
                .map(|r| HistoryLine {
                    name: r.name.clone(),
                    description: r.description.clone(),
                    steps: r.steps,
                    source: r.source.as_str().to_string(),
                })
                .collect(),
            undo_depth,
            redo_depth,
        }
    }

    fn save(&self, path: &Path) -> Result<Response> {
        WorkspaceSnapshot::capture(&self.workspace)?.save(path)?;
        Ok(Response::Saved {
            path: path.to_path_buf(),
        })
    }

    fn load(&mut self, path: &Path) -> Result<Response> {
        if !path.exists() {
            return Err(CliError::MissingPath {
                path: path.to_path_buf(),
            });
        }
        self.workspace = WorkspaceSnapshot::load(path)?.restore(self.config.clone())?;
        tracing::info!(target: "stepviz.cli", path = %path.display(), "snapshot loaded");
        Ok(Response::Loaded {
            path: path.to_path_buf(),
            active: self.workspace.active(),
        })
    }

    /// Feed every line of `reader` through the driver, writing responses to
    /// `out`. Errors are written and reading continues.
    pub fn repl<R: BufRead, W: Write>(&mut self, reader: R, out: &mut W, json: bool) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            match self.execute_str(&line) {
                Ok(Some((response, flow))) => {
                    emit(out, &response, json)?;
                    if flow == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) => emit_error(out, &error, json)?,
            }
            out.flush()?;
        }
        Ok(())
    }

    /// Run a script. Stops at the first failing line unless `keep_going`.
    pub fn run_script<R: BufRead, W: Write>(
        &mut self,
        path: &Path,
        reader: R,
        out: &mut W,
        json: bool,
        keep_going: bool,
    ) -> Result<usize> {
        let mut failures = 0usize;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            match self.execute_str(&line) {
                Ok(Some((response, flow))) => {
                    emit(out, &response, json)?;
                    if flow == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) if keep_going => {
                    failures += 1;
                    tracing::warn!(target: "stepviz.cli", line = index + 1, %error, "script line failed");
                    emit_error(out, &error, json)?;
                }
                Err(error) => {
                    return Err(CliError::Script {
                        path: path.to_path_buf(),
                        line: index + 1,
                        message: error.to_string(),
                    });
                }
            }
        }
        Ok(failures)
    }
}

fn depths<O: stepviz_runtime::AtomicOp>(
    history: &stepviz_runtime::HistoryManager<O>,
) -> (usize, usize) {
    (history.undo_depth(), history.redo_depth())
}

fn emit<W: Write>(out: &mut W, response: &Response, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(response)?)?;
    } else {
        writeln!(out, "{response}")?;
    }
    Ok(())
}

fn emit_error<W: Write>(out: &mut W, error: &CliError, json: bool) -> Result<()> {
    if json {
        writeln!(
            out,
            "{}",
            serde_json::json!({
                "event": "error",
                "error": error.to_string(),
                "exit_code": error.exit_code(),
            })
        )?;
    } else {
        writeln!(out, "error: {error}")?;
    }
    Ok(())
}
