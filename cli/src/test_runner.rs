//! Runs `.test.toml` fixtures: a TOML frontmatter between `---` lines with the
//! models to render and the expected results, followed by a blueprint document.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use serde::Deserialize;
use toml::Table;

use blueprint::{Blueprint, BlueprintError, Issue};

const FIXTURE_SUFFIX: &str = ".test.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedWarning {
    /// Substring of the warning message.
    pub contains: String,

    /// 1-based line of the warning in the document part of the fixture.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixture {
    pub description: Option<String>,

    /// Rendered in order against one view, so later models replay the cache.
    /// When empty the document is rendered once with an empty model.
    pub models: Vec<Table>,

    /// Expected output per model, compared after trimming.
    pub expect: Vec<String>,

    /// Substring of the expected parse, validation or render error.
    pub expect_error: Option<String>,

    /// If present, lint warnings must match in number and order.
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    pub thread_safe: bool,
}

/// Splits a fixture file into its frontmatter and the blueprint document.
fn split_fixture(content: &str) -> Result<(Fixture, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening `---` line")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);
    let (front, document) = rest
        .split_once("\n---")
        .ok_or("missing closing `---` line")?;
    let document = document
        .strip_prefix("\r\n")
        .or_else(|| document.strip_prefix('\n'))
        .unwrap_or(document);

    let fixture = toml::from_str(front.trim_end_matches('\r'))
        .map_err(|err| format!("frontmatter: {err}"))?;
    Ok((fixture, document))
}

pub enum Outcome {
    Pass,
    Fail(String),
}

pub struct FixtureResult {
    pub path: PathBuf,
    pub label: String,
    pub outcome: Outcome,
}

fn run_fixture(path: &Path) -> FixtureResult {
    let mut label = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.trim_end_matches(FIXTURE_SUFFIX).to_string())
        .unwrap_or_else(|| "?".to_string());

    let outcome = match std::fs::read_to_string(path) {
        Err(err) => Outcome::Fail(format!("cannot read file: {err}")),
        Ok(content) => match split_fixture(&content) {
            Err(reason) => Outcome::Fail(reason),
            Ok((fixture, document)) => {
                if let Some(description) = &fixture.description {
                    label = description.clone();
                }
                match check_fixture(&fixture, document) {
                    Ok(()) => Outcome::Pass,
                    Err(reason) => Outcome::Fail(reason),
                }
            }
        },
    };

    FixtureResult {
        path: path.to_path_buf(),
        label,
        outcome,
    }
}

struct Execution {
    outputs: Vec<String>,
    warnings: Vec<Issue>,
}

fn execute(fixture: &Fixture, document: &str) -> Result<Execution, String> {
    let blueprint = Blueprint::parse(document, 0).map_err(|err| describe(&err))?;
    let mut view = blueprint.view().map_err(|err| describe(&err))?;
    if fixture.thread_safe {
        view = view.thread_safe().map_err(|err| err.to_string())?;
    }

    let empty = [Table::new()];
    let models = if fixture.models.is_empty() {
        &empty[..]
    } else {
        &fixture.models[..]
    };
    let outputs = models
        .iter()
        .map(|model| view.render_with(model).map_err(|err| err.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Execution {
        outputs,
        warnings: blueprint.lint().to_vec(),
    })
}

fn describe(err: &BlueprintError) -> String {
    match err {
        BlueprintError::Invalid(issues) => {
            let messages: Vec<&str> = issues.iter().map(|issue| issue.message.as_str()).collect();
            format!("{err}: {}", messages.join("; "))
        }
        other => other.to_string(),
    }
}

fn check_fixture(fixture: &Fixture, document: &str) -> Result<(), String> {
    let execution = match (&fixture.expect_error, execute(fixture, document)) {
        (Some(expected), Err(actual)) if actual.contains(expected.as_str()) => return Ok(()),
        (Some(expected), Err(actual)) => {
            return Err(format!(
                "expected error containing \"{expected}\", got: {actual}"
            ));
        }
        (Some(expected), Ok(_)) => {
            return Err(format!(
                "expected error containing \"{expected}\", but rendering succeeded"
            ));
        }
        (None, Err(actual)) => return Err(format!("unexpected error: {actual}")),
        (None, Ok(execution)) => execution,
    };

    compare_outputs(&fixture.expect, &execution.outputs)?;
    if let Some(expected) = &fixture.expect_warnings {
        check_warnings(document, &execution.warnings, expected)?;
    }
    Ok(())
}

fn compare_outputs(expected: &[String], actual: &[String]) -> Result<(), String> {
    if expected.is_empty() {
        return Ok(());
    }
    if expected.len() != actual.len() {
        return Err(format!(
            "expected {} output(s), rendered {}",
            expected.len(),
            actual.len()
        ));
    }
    for (index, (expected, actual)) in expected.iter().zip(actual).enumerate() {
        let (expected, actual) = (expected.trim(), actual.trim());
        if expected != actual {
            return Err(format!(
                "output[{index}] mismatch\n  expected:\n{}\n  actual:\n{}",
                indent(expected),
                indent(actual)
            ));
        }
    }
    Ok(())
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

fn check_warnings(
    document: &str,
    actual: &[Issue],
    expected: &[ExpectedWarning],
) -> Result<(), String> {
    if actual.len() != expected.len() {
        let listed = if actual.is_empty() {
            "    (none)".to_string()
        } else {
            actual
                .iter()
                .map(|warning| format!("    - {warning}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        return Err(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{listed}",
            expected.len(),
            actual.len()
        ));
    }

    for (index, (warning, expected)) in actual.iter().zip(expected).enumerate() {
        if !warning.message.contains(&expected.contains) {
            return Err(format!(
                "warning[{index}]: expected message containing \"{}\", got: {warning}",
                expected.contains
            ));
        }
        if let Some(line) = expected.line {
            let found = line_of(document, warning.span.start);
            if found != line {
                return Err(format!(
                    "warning[{index}]: expected on line {line}, found on line {found}"
                ));
            }
        }
    }
    Ok(())
}

/// Fixtures under `root` grouped by subfolder; files directly in `root` (or
/// `root` itself when it is a file) fall under the empty category.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if root.is_file() {
        categories.insert(String::new(), vec![root.to_path_buf()]);
        return categories;
    }
    collect(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::warn!(target: "htmlflow.cli", dir = %dir.display(), "cannot list directory");
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .map(|parent| parent.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    let categories = discover(path);
    if categories.is_empty() {
        eprintln!("no {FIXTURE_SUFFIX} files found in {}", path.display());
        return;
    }
    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} fixtures)", category_label(category), files.len());
    }
}

fn in_category(category: &str, wanted: &str) -> bool {
    category == wanted || category.starts_with(&format!("{wanted}/"))
}

/// Keeps the requested categories (and their subcategories); all of them when
/// none are requested.
fn select(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }
    let wanted: Vec<&str> = requested.iter().map(|r| r.trim_matches('/')).collect();
    for want in &wanted {
        if !all.keys().any(|category| in_category(category, want)) {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{want}' not found (available: {})",
                available.join(", ")
            );
        }
    }
    all.into_iter()
        .filter(|(category, _)| wanted.iter().any(|want| in_category(category, want)))
        .collect()
}

/// Runs every selected fixture under `path`. Returns the process exit code.
pub fn run_tests(path: &Path, color: ColorChoice, categories: &[String]) -> i32 {
    let all = discover(path);
    if all.is_empty() {
        eprintln!("no {FIXTURE_SUFFIX} files found in {}", path.display());
        return 1;
    }
    let selected = select(all, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut out = StandardStream::stderr(color);
    match report(&mut out, &selected) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("error: cannot write test report: {err}");
            1
        }
    }
}

fn styled(out: &mut StandardStream, text: &str, spec: &ColorSpec) -> io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{text}")?;
    out.reset()
}

fn report(out: &mut StandardStream, selected: &BTreeMap<String, Vec<PathBuf>>) -> io::Result<bool> {
    let mut pass = ColorSpec::new();
    pass.set_fg(Some(Color::Green));
    let mut fail = ColorSpec::new();
    fail.set_fg(Some(Color::Red));
    let mut bold = ColorSpec::new();
    bold.set_bold(true);

    let mut passed = 0usize;
    let mut failures = Vec::new();

    for (category, files) in selected {
        writeln!(out)?;
        styled(out, category_label(category), &bold)?;
        writeln!(out)?;

        for file in files {
            let result = run_fixture(file);
            write!(out, "  ")?;
            match result.outcome {
                Outcome::Pass => {
                    passed += 1;
                    styled(out, "PASS", &pass)?;
                }
                Outcome::Fail(_) => styled(out, "FAIL", &fail)?,
            }
            writeln!(out, "  {}", result.label)?;
            if matches!(result.outcome, Outcome::Fail(_)) {
                failures.push(result);
            }
        }
    }

    if !failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "failures:")?;
        for failure in &failures {
            writeln!(out)?;
            writeln!(out, "  --- {} ---", failure.path.display())?;
            if let Outcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    writeln!(out, "  {line}")?;
                }
            }
        }
    }

    writeln!(out)?;
    write!(out, "test result: ")?;
    if failures.is_empty() {
        styled(out, "ok", &pass)?;
        writeln!(out, ". {passed} passed, 0 failed")?;
    } else {
        styled(out, "FAILED", &fail)?;
        writeln!(
            out,
            ". {passed} passed, {} failed (of {})",
            failures.len(),
            passed + failures.len()
        )?;
    }
    Ok(failures.is_empty())
}
