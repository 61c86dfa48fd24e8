//! Runs a JSON conformance-style test manifest (the format `wast2json`
//! emits: a `{"commands": [...]}` array of `module` and `assert_return`
//! entries) against the interpreter.
//!
//! Only the `module` and `assert_return` command types are understood —
//! this core subset has no floating point, traps, or linking errors to
//! exercise the rest of the conformance vocabulary against. Every other
//! command type is counted as skipped rather than failing the run.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use wasmi_mvp::{invoke, load, lookup_func_by_name, Store, Value};

/// Runs a wasmi-mvp conformance-style JSON test manifest.
#[derive(Parser)]
#[command(name = "wasmi-mvp", version, about)]
struct Cli {
    /// Path to the JSON manifest.
    manifest: PathBuf,
}

#[derive(Deserialize)]
struct Manifest {
    commands: Vec<Command>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Command {
    Module { line: Option<f64>, filename: String },
    AssertReturn { line: Option<f64>, action: Action, expected: Vec<ArgValue> },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct Action {
    #[serde(rename = "type")]
    kind: String,
    field: String,
    #[serde(default)]
    args: Vec<ArgValue>,
}

#[derive(Deserialize)]
struct ArgValue {
    #[serde(rename = "type")]
    ty: String,
    value: String,
}

impl ArgValue {
    fn to_value(&self) -> Result<Value> {
        match self.ty.as_str() {
            "i32" => {
                let n: i64 = self
                    .value
                    .parse()
                    .with_context(|| format!("argument value {:?} is not an integer", self.value))?;
                Ok(Value::I32(n as i32))
            }
            other => anyhow::bail!("unsupported value type {other:?}"),
        }
    }
}

struct Summary {
    passed: u32,
    failed: u32,
    skipped: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.manifest) {
        Ok(summary) => {
            println!(
                "{} passed, {} failed, {} skipped",
                summary.passed, summary.failed, summary.skipped
            );
            if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(manifest_path: &Path) -> Result<Summary> {
    let text = std::fs::read_to_string(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest {}", manifest_path.display()))?;
    // `*.wasm` files referenced by a `module` command are resolved relative
    // to the manifest's own directory, matching `wast2json`'s output layout.
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut summary = Summary { passed: 0, failed: 0, skipped: 0 };
    let mut store: Option<Store> = None;

    for command in manifest.commands {
        match command {
            Command::Module { line, filename } => {
                let wasm_path = base_dir.join(&filename);
                let bytes = std::fs::read(&wasm_path)
                    .with_context(|| format!("reading module {}", wasm_path.display()))?;
                match load(&bytes) {
                    Ok(s) => store = Some(s),
                    Err(e) => {
                        report_fail(line, "module", &format!("{e}"));
                        summary.failed += 1;
                        store = None;
                    }
                }
            }
            Command::AssertReturn { line, action, expected } => {
                if action.kind != "invoke" {
                    summary.skipped += 1;
                    continue;
                }
                let result = run_assert_return(store.as_mut(), &action, &expected);
                match result {
                    Ok(()) => {
                        report_pass(line, "assert_return");
                        summary.passed += 1;
                    }
                    Err(e) => {
                        report_fail(line, "assert_return", &format!("{e}"));
                        summary.failed += 1;
                    }
                }
            }
            Command::Unsupported => summary.skipped += 1,
        }
    }

    Ok(summary)
}

fn run_assert_return(store: Option<&mut Store>, action: &Action, expected: &[ArgValue]) -> Result<()> {
    let store = store.context("assert_return with no preceding module command")?;
    let funcaddr = lookup_func_by_name(&store.module_instance, &action.field)
        .with_context(|| format!("no export named {:?}", action.field))?;

    let mut args = action
        .args
        .iter()
        .map(ArgValue::to_value)
        .collect::<Result<Vec<_>>>()?;
    invoke(store, funcaddr, &mut args).with_context(|| format!("invoking {:?}", action.field))?;

    let expected = expected.iter().map(ArgValue::to_value).collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(
        args == expected,
        "expected {:?}, got {:?}",
        expected,
        args
    );
    Ok(())
}

fn report_pass(line: Option<f64>, kind: &str) {
    println!("PASS {kind} (line {})", format_line(line));
}

fn report_fail(line: Option<f64>, kind: &str, message: &str) {
    eprintln!("FAIL {kind} (line {}): {message}", format_line(line));
}

fn format_line(line: Option<f64>) -> String {
    line.map(|l| format!("{l:.0}")).unwrap_or_else(|| "?".into())
}
