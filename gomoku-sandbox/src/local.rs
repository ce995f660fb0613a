//! Weak-isolation executor: an in-process Python interpreter with a
//! restricted namespace.
//!
//! The submission runs inside an embedded RustPython VM whose globals carry
//! an explicit allow-list of builtin names ([`NamespacePolicy`]) instead of
//! the real `__builtins__` module, so import machinery, file access, and
//! everything else simply does not resolve. `print` is shadowed by a shim
//! that captures output into a list read back after the run.
//!
//! The code is expected to assign a well-known `next_move` variable; the
//! executor reads it directly (no text parsing). An absent or malformed
//! value is a non-fatal "no move produced" outcome.
//!
//! Known, documented gaps versus the Docker path: no wall-clock enforcement
//! (wrap with a caller-level deadline), no memory/CPU ceiling, and the
//! host's network reachability is inherited. That is what makes this level
//! "weak".

use crate::types::{CodeSubmission, ExecutionOutcome, FailureKind, MoveContext};
use num_traits::ToPrimitive;
use rustpython_vm::builtins::{PyBaseExceptionRef, PyDictRef, PyInt, PyList, PyStr, PyTuple};
use rustpython_vm::compiler::Mode;
use rustpython_vm::scope::Scope;
use rustpython_vm::{Interpreter, PyObjectRef, PyResult, VirtualMachine};
use std::time::Instant;

/// Builtin names visible to weakly-isolated code by default: iteration and
/// arithmetic helpers only, mirroring what the strong path's language
/// runtime would offer a move-picker that needs no I/O.
const DEFAULT_ALLOWED: &[&str] = &[
    "len",
    "range",
    "enumerate",
    "min",
    "max",
    "abs",
    "sum",
    "str",
];

/// Captures `print` output into `__lines__`; executed in the submission's
/// scope before the submission itself.
const PRINT_SHIM: &str = "__lines__ = []\n\
def print(*args):\n\
\x20   __lines__.append(\" \".join(str(a) for a in args))\n";

/// Explicit capability allow-list for the restricted namespace. Enforcement
/// is part of this type: only the names listed here are copied into the
/// scope's `__builtins__`, nothing else is reachable.
#[derive(Debug, Clone)]
pub struct NamespacePolicy {
    allowed: Vec<&'static str>,
}

impl Default for NamespacePolicy {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED.to_vec(),
        }
    }
}

impl NamespacePolicy {
    pub fn new(allowed: &[&'static str]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    pub fn allowed(&self) -> &[&'static str] {
        &self.allowed
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allowed.contains(&name)
    }
}

/// Result of a weak-isolation run: the structured outcome plus the
/// directly-read move value (no text parsing on this path).
#[derive(Debug, Clone)]
pub struct LocalOutcome {
    pub outcome: ExecutionOutcome,
    pub next_move: Option<(i64, i64)>,
}

/// In-process executor. Cheap to clone; each run gets a fresh interpreter,
/// so no state leaks between submissions.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    namespace: NamespacePolicy,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: NamespacePolicy) -> Self {
        Self { namespace }
    }

    /// Execute the submission. Blocking and unbounded in time; async
    /// callers should wrap this in `spawn_blocking` plus their own
    /// deadline.
    pub fn run(&self, submission: &CodeSubmission) -> LocalOutcome {
        let start = Instant::now();
        let interpreter = Interpreter::without_stdlib(Default::default());

        let (fault, output, next_move) = interpreter.enter(|vm| {
            let globals = vm.ctx.new_dict();
            if let Err(exc) = populate_scope(vm, &globals, submission.context(), &self.namespace)
            {
                return (Some(render_exception(vm, &exc)), String::new(), None);
            }
            let scope = Scope::with_builtins(None, globals.clone(), vm);

            let fault = compile_and_run(vm, PRINT_SHIM, "<namespace setup>", scope.clone())
                .and_then(|()| compile_and_run(vm, submission.code(), "<submission>", scope))
                .err()
                .map(|exc| render_exception(vm, &exc));

            let output = captured_output(vm, &globals);
            let next_move = if fault.is_none() {
                read_next_move(vm, &globals)
            } else {
                None
            };
            (fault, output, next_move)
        });

        let duration = start.elapsed();
        match fault {
            Some(description) => {
                tracing::debug!(fault = %description.lines().last().unwrap_or(""), "Weak-isolation run faulted");
                let mut combined = output;
                if !combined.is_empty() && !combined.ends_with('\n') {
                    combined.push('\n');
                }
                combined.push_str(&description);
                LocalOutcome {
                    outcome: ExecutionOutcome::failed(FailureKind::RuntimeFault, combined, duration),
                    next_move: None,
                }
            }
            None => LocalOutcome {
                outcome: ExecutionOutcome::completed(output, duration),
                next_move,
            },
        }
    }
}

/// Inject the runtime context and the allow-listed `__builtins__` dict.
fn populate_scope(
    vm: &VirtualMachine,
    globals: &PyDictRef,
    context: &MoveContext,
    namespace: &NamespacePolicy,
) -> PyResult<()> {
    let rows: Vec<PyObjectRef> = context
        .cells
        .iter()
        .map(|row| {
            let cells: Vec<PyObjectRef> =
                row.iter().map(|&c| vm.ctx.new_int(c).into()).collect();
            vm.ctx.new_list(cells).into()
        })
        .collect();
    globals.set_item("board", vm.ctx.new_list(rows).into(), vm)?;
    globals.set_item("current_player", vm.ctx.new_int(context.player).into(), vm)?;

    let builtins = vm.ctx.new_dict();
    for name in namespace.allowed() {
        let value = vm.builtins.get_attr(*name, vm)?;
        builtins.set_item(*name, value, vm)?;
    }
    globals.set_item("__builtins__", builtins.into(), vm)?;
    Ok(())
}

fn compile_and_run(
    vm: &VirtualMachine,
    source: &str,
    source_name: &str,
    scope: Scope,
) -> PyResult<()> {
    let code = vm
        .compile(source, Mode::Exec, source_name.to_owned())
        .map_err(|err| vm.new_syntax_error(&err, Some(source)))?;
    vm.run_code_obj(code, scope)?;
    Ok(())
}

fn render_exception(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    let mut rendered = String::new();
    if vm.write_exception(&mut rendered, exc).is_err() {
        rendered = "<unrenderable exception>".to_owned();
    }
    rendered
}

/// Join the lines the print shim captured.
fn captured_output(vm: &VirtualMachine, globals: &PyDictRef) -> String {
    let Ok(lines) = globals.get_item("__lines__", vm) else {
        return String::new();
    };
    let Some(list) = lines.payload::<PyList>() else {
        return String::new();
    };
    let mut output = String::new();
    for item in list.borrow_vec().iter() {
        if let Some(s) = item.payload::<PyStr>() {
            output.push_str(s.as_str());
            output.push('\n');
        }
    }
    output
}

/// Read `next_move` directly from the globals; `None` for absent or
/// malformed values.
fn read_next_move(vm: &VirtualMachine, globals: &PyDictRef) -> Option<(i64, i64)> {
    let value = globals.get_item("next_move", vm).ok()?;
    pair_from(&value)
}

fn pair_from(value: &PyObjectRef) -> Option<(i64, i64)> {
    let items: Vec<PyObjectRef> = if let Some(tuple) = value.payload::<PyTuple>() {
        tuple.as_slice().to_vec()
    } else if let Some(list) = value.payload::<PyList>() {
        list.borrow_vec().to_vec()
    } else {
        return None;
    };
    if items.len() != 2 {
        return None;
    }
    let row = items[0].payload::<PyInt>()?.as_bigint().to_i64()?;
    let col = items[1].payload::<PyInt>()?.as_bigint().to_i64()?;
    Some((row, col))
}
