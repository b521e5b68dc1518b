mod settings;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use toml::Table;
use tracing_subscriber::EnvFilter;

use blueprint::{Blueprint, BlueprintError, Issue};
use htmlflow::{Output, RenderError, StreamTarget};

use settings::{Settings, SettingsError};

#[derive(Parser)]
#[command(name = "htmlflow", version, about = "Render cached HTML views from blueprint documents")]
struct Cli {
    /// Disable colored diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG applies when not given
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a blueprint once per model, in order, through one cached view
    Render(RenderArgs),

    /// Parse, validate and lint a blueprint
    Check(CheckArgs),

    /// Run .test.toml fixtures
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Blueprint document (TOML)
    document: PathBuf,

    /// Model file (TOML table). Repeatable; without one the document is
    /// rendered once with an empty model.
    #[arg(short, long = "model")]
    models: Vec<PathBuf>,

    /// Write through stdout as the document is produced
    #[arg(long)]
    stream: bool,

    /// Give each rendering thread its own engine
    #[arg(long)]
    thread_safe: bool,

    /// Header written before the root `html` element
    #[arg(long)]
    header: Option<String>,

    /// Settings file (defaults to ./htmlflow.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Blueprint document (TOML)
    document: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or a directory containing them
    path: PathBuf,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Blueprint(#[from] BlueprintError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("cannot read model {}: {source}", path.display())]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model {}: {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let code = match cli.command {
        Command::Render(args) => do_render(args, color),
        Command::Check(args) => do_check(&args.document, color),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                0
            } else {
                test_runner::run_tests(&args.path, color, &args.category)
            }
        }
    };
    process::exit(code);
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Source files and terminal settings for diagnostics.
struct Reporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(color: ColorChoice) -> Self {
        Reporter {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(color),
            config: term::Config::default(),
        }
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, &self.files, diagnostic);
    }

    fn emit_issues(&self, issues: &[Issue]) {
        for issue in issues {
            self.emit(&issue.to_diagnostic());
        }
    }

    fn emit_error(&self, error: &CliError) {
        match error {
            CliError::Blueprint(error) => {
                for diagnostic in error.to_diagnostics() {
                    self.emit(&diagnostic);
                }
            }
            other => self.emit(&Diagnostic::error().with_message(other.to_string())),
        }
    }

    /// Loads a blueprint and registers its source so spans can be shown.
    /// One document per reporter: the blueprint is always file 0.
    fn load(&mut self, path: &Path) -> Result<Blueprint, CliError> {
        let name = path.display().to_string();
        match Blueprint::load(path, 0) {
            Ok(blueprint) => {
                self.files.add(name, blueprint.source().to_string());
                Ok(blueprint)
            }
            Err(err) => {
                // Syntax errors still point into the source.
                if let Ok(source) = std::fs::read_to_string(path) {
                    self.files.add(name, source);
                }
                Err(err.into())
            }
        }
    }
}

fn do_render(args: RenderArgs, color: ColorChoice) -> i32 {
    let mut reporter = Reporter::new(color);
    match render(&args, &mut reporter) {
        Ok(()) => 0,
        Err(err) => {
            reporter.emit_error(&err);
            1
        }
    }
}

fn render(args: &RenderArgs, reporter: &mut Reporter) -> Result<(), CliError> {
    let settings = Settings::load(args.config.as_deref())?.with_flags(
        args.header.clone(),
        args.thread_safe,
        args.stream,
    );

    let blueprint = reporter.load(&args.document)?;
    reporter.emit_issues(blueprint.lint());

    let mut view = blueprint.view()?;
    if let Some(header) = &settings.header {
        view = view.with_header(header.as_str());
    }
    if settings.stream {
        view = view.with_output(Output::Stream(StreamTarget::stdout()))?;
    }
    if settings.thread_safe {
        view = view.thread_safe()?;
    }

    let models = if args.models.is_empty() {
        vec![(PathBuf::from("<empty>"), Table::new())]
    } else {
        args.models
            .iter()
            .map(|path| load_model(path).map(|model| (path.clone(), model)))
            .collect::<Result<Vec<_>, CliError>>()?
    };

    for (path, model) in &models {
        if settings.stream {
            view.write_with(model)?;
            println!();
        } else {
            let html = view.render_with(model)?;
            println!("{html}");
        }
        tracing::info!(target: "htmlflow.cli", model = %path.display(), "rendered");
    }
    Ok(())
}

fn load_model(path: &Path) -> Result<Table, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ModelIo {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| CliError::Model {
        path: path.to_path_buf(),
        source,
    })
}

fn do_check(path: &Path, color: ColorChoice) -> i32 {
    let mut reporter = Reporter::new(color);
    let blueprint = match reporter.load(path) {
        Ok(blueprint) => blueprint,
        Err(err) => {
            reporter.emit_error(&err);
            return 1;
        }
    };

    let errors = blueprint.validate();
    let warnings = blueprint.lint();
    reporter.emit_issues(errors);
    reporter.emit_issues(warnings);

    if errors.is_empty() {
        eprintln!(
            "ok: {} is valid ({} warning(s))",
            path.display(),
            warnings.len()
        );
        0
    } else {
        1
    }
}
