//! The `snapshot` command: compile every method of a set of classes.
//!
//! The input is a JSON array of `class`/`module` trees as dumped from a
//! running program. Each method a class body defines directly is compiled
//! into its own unit `temp_<n>`, reopening the class around that one method.
//! Only public and protected methods are snapshotted, each keeping its
//! visibility. Units are compiled with every optimization on and with direct
//! calls to public methods allowed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rbc_codegen::{CompileOptions, Session, Visibility};
use rbc_ir::{Node, NodeKind};
use rustc_hash::FxHashSet;

use super::{read_json, write_file};
use crate::CliError;

/// Outcome of a snapshot run.
#[derive(Debug, Default)]
pub struct SnapshotReport {
    /// Written units, in unit-number order.
    pub units: Vec<PathBuf>,
    /// Classes appearing again after their first entry.
    pub skipped: Vec<String>,
}

/// State shared by the parallel unit compilations.
struct SnapshotContext<'a> {
    counter: AtomicUsize,
    out_dir: &'a Path,
    options: CompileOptions,
}

impl<'a> SnapshotContext<'a> {
    fn new(out_dir: &'a Path) -> Self {
        let mut options = CompileOptions::all_optimizations();
        options.enable("direct_self_call", vec!["allow_public".to_string()]);
        SnapshotContext {
            counter: AtomicUsize::new(0),
            out_dir,
            options,
        }
    }

    fn next_unit(&self) -> usize {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Compile each own method of `class` into a unit of its own.
    fn class_units(&self, class: &Node) -> Result<Vec<(usize, PathBuf)>, CliError> {
        let mut units = Vec::new();
        for (method, visibility) in Session::own_methods(class) {
            let marker = match visibility {
                Visibility::Public => None,
                Visibility::Protected => Some("protected"),
                Visibility::Private | Visibility::ModuleFunction => {
                    tracing::debug!(line = method.line, "skipping private method");
                    continue;
                }
            };
            let number = self.next_unit();
            let name = format!("temp_{number}");
            let region = reopen(class, method, marker).ok_or_else(|| {
                CliError::usage(format!("line {}: not a class or module", class.line))
            })?;

            let mut session = Session::new(&name, &self.options)?;
            session.compile_region(&region)?;
            let path = self.out_dir.join(format!("{name}.c"));
            write_file(&path, &session.to_c_code())?;
            tracing::debug!(unit = %name, line = method.line, "compiled method snapshot");
            units.push((number, path));
        }
        Ok(units)
    }
}

/// Display name of a class or module definition, `Outer::Name` when the
/// outer scope is a plain constant.
fn class_name(node: &Node) -> Option<String> {
    let cpath = match &node.kind {
        NodeKind::Class { cpath, .. } | NodeKind::Module { cpath, .. } => cpath,
        _ => return None,
    };
    Some(match cpath.scope.as_deref().map(|scope| &scope.kind) {
        Some(NodeKind::Const { name }) => format!("{name}::{}", cpath.name),
        _ => cpath.name.clone(),
    })
}

/// `class`/`module` definition reopening `class` with `method` as its body,
/// preceded by the visibility `marker` call if any.
fn reopen(class: &Node, method: &Node, marker: Option<&str>) -> Option<Node> {
    let body = match marker {
        Some(marker) => {
            let marker = Node::at(
                NodeKind::Vcall {
                    method: marker.to_string(),
                },
                method.line,
            );
            Node::at(
                NodeKind::Block {
                    stmts: vec![marker, method.clone()],
                },
                method.line,
            )
        }
        None => method.clone(),
    };
    let body = Some(Box::new(body));
    let kind = match &class.kind {
        NodeKind::Class { cpath, .. } => NodeKind::Class {
            cpath: cpath.clone(),
            superclass: None,
            body,
        },
        NodeKind::Module { cpath, .. } => NodeKind::Module {
            cpath: cpath.clone(),
            body,
        },
        _ => return None,
    };
    Some(Node::at(kind, class.line))
}

/// Run a snapshot of the class dump at `input`, writing units to `out_dir`.
pub fn snapshot(input: &Path, out_dir: &Path) -> Result<SnapshotReport, CliError> {
    let classes: Vec<Node> = read_json(input)?;
    snapshot_classes(&classes, out_dir)
}

#[tracing::instrument(level = "info", skip(classes), fields(classes = classes.len()))]
pub fn snapshot_classes(classes: &[Node], out_dir: &Path) -> Result<SnapshotReport, CliError> {
    let mut seen = FxHashSet::default();
    let mut pending = Vec::new();
    let mut skipped = Vec::new();
    for class in classes {
        let Some(name) = class_name(class) else {
            return Err(CliError::usage(format!(
                "line {}: snapshot entries must be class or module definitions",
                class.line
            )));
        };
        if seen.insert(name.clone()) {
            pending.push(class);
        } else {
            tracing::info!(class = %name, "already processed, skipping");
            skipped.push(name);
        }
    }

    let context = SnapshotContext::new(out_dir);
    let per_class: Vec<Vec<(usize, PathBuf)>> = pending
        .par_iter()
        .map(|class| context.class_units(class))
        .collect::<Result<_, _>>()?;

    let mut units: Vec<(usize, PathBuf)> = per_class.into_iter().flatten().collect();
    units.sort_by_key(|(number, _)| *number);
    Ok(SnapshotReport {
        units: units.into_iter().map(|(_, path)| path).collect(),
        skipped,
    })
}
