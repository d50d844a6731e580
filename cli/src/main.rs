use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rosacli_core::{CapturedOutput, CommandArgs, OutputFormat};
use rosacli_exec::{Runner, RunnerConfig};
use rosacli_parser::{ParsedOutput, ParsedText, Segment, Tree};
use serde::Serialize;
use serde_json::{Value, json};

/// CLI-side output format with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Text,
    Json,
    Yaml,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => Self::Text,
            CliFormat::Json => Self::Json,
            CliFormat::Yaml => Self::Yaml,
        }
    }
}

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Emit {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum View {
    Tip,
    Output,
    Table,
    Description,
    Tree,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum DigAs {
    #[default]
    String,
    Bool,
    Float,
    Object,
}

#[derive(Debug, Parser)]
#[command(name = "rosacli-probe", version)]
#[command(about = "Parse, dig into and replay rosa CLI output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split captured output and reflect it into structured data.
    Parse(ParseArgs),
    /// Read one value out of JSON or YAML output.
    Dig(DigArgs),
    /// Edit a command line and print the result.
    Args(ArgsArgs),
    /// Run the rosa binary and print the split output.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Format the output was captured in.
    #[arg(long, value_enum, default_value = "text")]
    format: CliFormat,
    /// Which view of the output to print.
    #[arg(long, value_enum, default_value = "output")]
    view: View,
    /// Read from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "json")]
    emit: Emit,
}

#[derive(Debug, Args)]
struct DigArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: CliFormat,
    /// Dot-separated path; numeric segments index arrays (e.g. `items.0.id`).
    #[arg(long)]
    path: String,
    #[arg(long = "as", value_enum, default_value = "string")]
    kind: DigAs,
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ArgsArgs {
    /// Full command line, quoted as one argument.
    line: String,
    /// Print `flag=value` for each flag.
    #[arg(long, allow_hyphen_values = true)]
    get: Vec<String>,
    /// Replace (or append) a flag value, as `FLAG=VALUE`.
    #[arg(long, allow_hyphen_values = true)]
    replace: Vec<String>,
    #[arg(long, allow_hyphen_values = true)]
    delete: Vec<String>,
    /// Append tokens (tokenized like the command line).
    #[arg(long, allow_hyphen_values = true)]
    add: Vec<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Runner configuration file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<CliFormat>,
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Arguments passed to the binary.
    #[arg(last = true, required = true)]
    args: Vec<String>,
}

fn main() {
    init_log();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Dig(args) => run_dig(args),
        Command::Args(args) => run_args(args),
        Command::Run(args) => run_run(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_log() {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("ROSACLI_LOG")
                .from_env_lossy(),
        )
        .init();
}

fn read_input(input: Option<&PathBuf>) -> Result<Vec<u8>, String> {
    match input {
        Some(path) => {
            fs::read(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            Ok(buf)
        }
    }
}

fn emit<T: Serialize>(value: &T, emit: Emit) -> Result<(), String> {
    match emit {
        Emit::Json => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| format!("Failed to serialize output: {e}"))?;
            println!("{json}");
        }
        Emit::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| format!("Failed to serialize output: {e}"))?;
            print!("{yaml}");
        }
    }
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let bytes = read_input(args.input.as_ref())?;
    let output = CapturedOutput::new(bytes, args.format.into());
    let parser = rosacli_parser::Parser::default();

    let value = match (args.view, parser.parse(&output)) {
        (View::Tree, ParsedOutput::Tree(tree)) => tree.into_value(),
        (View::Tree, ParsedOutput::Text(_)) => {
            return Err("the tree view needs --format json or yaml".to_string());
        }
        (view, parsed) => {
            let text = match parsed {
                ParsedOutput::Text(text) => text,
                ParsedOutput::Tree(_) => parser.text(&output),
            };
            text_view(&text, view)?
        }
    };
    emit(&value, args.emit)
}

fn text_view(text: &ParsedText, view: View) -> Result<Value, String> {
    Ok(match view {
        View::Tip => Value::String(text.tip()),
        View::Output => Value::String(text.output()),
        View::Table => serde_json::to_value(text.table())
            .map_err(|e| format!("Failed to serialize table: {e}"))?,
        View::Description => text.description().into_value(),
        View::Tree => Value::Null,
    })
}

fn run_dig(args: DigArgs) -> Result<(), String> {
    let bytes = read_input(args.input.as_ref())?;
    let tree = Tree::try_parse(&bytes, args.format.into()).map_err(|err| err.to_string())?;
    let path = Segment::split_path(&args.path);

    match args.kind {
        DigAs::String => println!("{}", tree.dig_string(path)),
        DigAs::Bool => println!("{}", tree.dig_bool(path)),
        DigAs::Float => println!("{}", tree.dig_float(path)),
        DigAs::Object => {
            let value = tree.dig_object(path).cloned().unwrap_or(Value::Null);
            emit(&value, Emit::Json)?;
        }
    }
    Ok(())
}

fn run_args(args: ArgsArgs) -> Result<(), String> {
    let mut command = CommandArgs::parse(&args.line);

    for flag in &args.delete {
        command.delete_flag(flag).map_err(|err| err.to_string())?;
    }
    let replacements = args
        .replace
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .ok_or_else(|| format!("Invalid --replace '{pair}', expected FLAG=VALUE"))
        })
        .collect::<Result<Vec<_>, String>>()?;
    command.replace_flag_value(replacements);
    for tokens in &args.add {
        command.add_flags(rosacli_core::tokenize(tokens));
    }

    println!("{}", command.full_command());
    for flag in &args.get {
        match command.flag_value(flag) {
            Some(value) => println!("{flag}={value}"),
            None => return Err(format!("Flag '{flag}' not found")),
        }
    }
    Ok(())
}

fn run_run(args: RunArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)
            .map_err(|err| format!("Failed to load '{}': {err}", path.display()))?,
        None => RunnerConfig::default(),
    };
    if let Some(format) = args.format {
        config.format = format.into();
    }
    if let Some(dir) = args.dir {
        config.dir = Some(dir);
    }

    let runner = Runner::new(config);
    match runner.run(&args.args) {
        Ok(output) => print_split(&output),
        Err(err) => {
            if let Some(output) = err.output() {
                print_split(output)?;
            }
            Err(err.to_string())
        }
    }
}

fn print_split(output: &CapturedOutput) -> Result<(), String> {
    let value = match output.format() {
        OutputFormat::Text => {
            let text = ParsedText::parse(&output.to_text());
            json!({ "format": "text", "tip": text.tip(), "output": text.output() })
        }
        format => json!({ "format": format.to_string(), "tip": "", "output": output.to_text() }),
    };
    emit(&value, Emit::Json)
}
