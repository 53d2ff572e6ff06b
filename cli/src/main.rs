use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use interpreter::Interpreter;
use literate::{Config, Error, ExecutionError, Hooks, Target, emit};

#[derive(Parser)]
#[command(
    name = "literate",
    version,
    about = "Generate scripts, markdown pages and notebooks from literate sources"
)]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log more (-v for progress, -vv for details). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the code into a plain script
    Script(GenerateArgs),

    /// Render a markdown page with fenced code
    Markdown(GenerateArgs),

    /// Build a notebook with one cell per chunk
    Notebook(GenerateArgs),
}

impl Command {
    fn split(self) -> (Target, GenerateArgs) {
        match self {
            Command::Script(args) => (Target::Script, args),
            Command::Markdown(args) => (Target::Markdown, args),
            Command::Notebook(args) => (Target::Notebook, args),
        }
    }
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Literate source file
    file: PathBuf,

    /// Directory the artifact (and any images) are written to
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,

    /// TOML file with generation settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base name (defaults to the input file stem)
    #[arg(long)]
    name: Option<String>,

    /// Run code blocks and record their results
    #[arg(long, conflicts_with = "no_execute")]
    execute: bool,

    /// Never run code blocks
    #[arg(long)]
    no_execute: bool,

    /// Emit for the documentation tool
    #[arg(long)]
    documenter: bool,

    /// Leave out the "generated using" footer
    #[arg(long)]
    no_credit: bool,

    /// Keep prose as comments in the script
    #[arg(long)]
    keep_comments: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let (target, args) = cli.command.split();
    match generate(target, &args) {
        Ok(path) => info!("wrote {}", path.display()),
        Err(error) => {
            report(&error, &args.file, color_choice);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Resolve settings from the config file and the flags.
fn resolve_config(args: &GenerateArgs) -> Result<Config, Error> {
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|e| {
                Error::configuration(format!("cannot read '{}': {}", path.display(), e))
            })?;
            Config::from_toml(&source)?
        }
        None => Config::default(),
    };

    if let Some(name) = &args.name {
        config.name = Some(name.clone());
    }
    if config.name.is_none() {
        config.name = args
            .file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    if args.execute {
        config.execute = Some(true);
    } else if args.no_execute {
        config.execute = Some(false);
    }
    config.documenter |= args.documenter;
    config.keep_comments |= args.keep_comments;
    if args.no_credit {
        config.credit = false;
    }
    Ok(config)
}

/// `<outdir>/<name>.<ext>`, refusing to overwrite the input.
fn output_path(
    input: &Path,
    outdir: &Path,
    config: &Config,
    target: Target,
) -> Result<PathBuf, Error> {
    fs::create_dir_all(outdir)?;
    let file_name = format!("{}.{}", config.name(), target.extension());
    let output = outdir.canonicalize()?.join(file_name);
    let input = input.canonicalize()?;
    if input == output {
        return Err(Error::configuration(format!(
            "output '{}' would overwrite the input",
            output.display()
        )));
    }
    Ok(output)
}

fn generate(target: Target, args: &GenerateArgs) -> Result<PathBuf, Error> {
    let source = fs::read_to_string(&args.file)
        .map_err(|e| Error::Input(format!("cannot read '{}': {}", args.file.display(), e)))?;
    let config = resolve_config(args)?;
    let output = output_path(&args.file, &args.outdir, &config, target)?;
    debug!(?config, "resolved settings");
    info!("generating {} from {}", target, args.file.display());

    let hooks = Hooks::default();
    let contents = match target {
        Target::Script => emit::script(&source, &config, &hooks),
        Target::Markdown => {
            emit::markdown(&source, &config, &hooks, Interpreter::new(), &args.outdir)?
        }
        Target::Notebook => {
            emit::notebook(&source, &config, &hooks, Interpreter::new())?.to_json()?
        }
    };
    fs::write(&output, contents)?;
    Ok(output)
}

fn report(error: &Error, file: &Path, color_choice: ColorChoice) {
    if let Error::Execution(fault) = error {
        if let Some(cause) = fault.source.downcast_ref::<interpreter::Error>() {
            emit_fault(fault, cause, file, color_choice);
            return;
        }
    }
    eprintln!("error: {}", error);
}

/// Point at the failing code block the way a script error would be shown.
fn emit_fault(
    fault: &ExecutionError,
    cause: &interpreter::Error,
    file: &Path,
    color_choice: ColorChoice,
) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(format!("{} (code block)", file.display()), fault.code.clone());
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let diagnostic = cause.to_diagnostic(file_id);
    if term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic).is_err() {
        eprintln!("error: {}", fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Target, GenerateArgs) {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        cli.command.split()
    }

    #[test]
    fn flags_override_defaults() {
        let (target, args) = parse(&[
            "literate",
            "notebook",
            "intro.lit",
            "--no-execute",
            "--no-credit",
            "--documenter",
        ]);
        assert_eq!(target, Target::Notebook);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.name(), "intro");
        assert_eq!(config.execute, Some(false));
        assert!(!config.credit);
        assert!(config.documenter);
        assert!(!config.keep_comments);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literate.toml");
        fs::write(
            &path,
            "name = \"from-file\"\nexecute = false\nkeep_comments = true\n",
        )
        .unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let (_, args) = parse(&["literate", "markdown", "intro.lit", "--config", &config_arg]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.name(), "from-file");
        assert_eq!(config.execute, Some(false));
        assert!(config.keep_comments);

        let (_, args) = parse(&[
            "literate",
            "markdown",
            "intro.lit",
            "--config",
            &config_arg,
            "--name",
            "flag",
            "--execute",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.name(), "flag");
        assert_eq!(config.execute, Some(true));
    }

    #[test]
    fn execute_flags_conflict() {
        let result =
            Cli::try_parse_from(["literate", "script", "a.lit", "--execute", "--no-execute"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_is_a_configuration_error() {
        let (_, args) = parse(&[
            "literate",
            "script",
            "a.lit",
            "--config",
            "/nonexistent/literate.toml",
        ]);
        assert!(matches!(resolve_config(&args), Err(Error::Configuration(_))));
    }

    #[test]
    fn refuses_to_overwrite_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tour.lit");
        fs::write(&input, "x = 1\n").unwrap();

        let config = Config {
            name: Some("tour".to_string()),
            ..Config::default()
        };
        let err = output_path(&input, dir.path(), &config, Target::Script).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let output = output_path(&input, dir.path(), &config, Target::Markdown).unwrap();
        assert_eq!(output.file_name().unwrap(), "tour.md");
    }

    #[test]
    fn generates_each_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tour.lit");
        fs::write(&input, "# # Tour\nx = 6 * 7\n").unwrap();
        let outdir = dir.path().join("out");
        let input_arg = input.to_string_lossy().into_owned();
        let outdir_arg = outdir.to_string_lossy().into_owned();

        for command in ["script", "markdown", "notebook"] {
            let (target, args) = parse(&["literate", command, &input_arg, "-o", &outdir_arg]);
            let path = generate(target, &args).unwrap();
            let expected = format!("tour.{}", target.extension());
            assert_eq!(path, outdir.canonicalize().unwrap().join(expected));
        }

        let script = fs::read_to_string(outdir.join("tour.lit")).unwrap();
        assert_eq!(script, "x = 6 * 7\n");
        let notebook = fs::read_to_string(outdir.join("tour.ipynb")).unwrap();
        assert!(notebook.contains("\"execution_count\": 1"));
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let (target, args) = parse(&["literate", "script", "/nonexistent/tour.lit"]);
        assert!(matches!(generate(target, &args), Err(Error::Input(_))));
    }
}
