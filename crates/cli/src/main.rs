mod golem_cli;
mod settings;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use golem_desk_types::{
    ComponentExportFunction, TypeDescriptor, parse_component_exports, parse_signature, parse_type,
    parse_type_str,
};
use golem_desk_wave::{
    FormError, InvocationForm, encode, encode_typed, skeleton, skeleton_args, validate,
};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::golem_cli::GolemCli;
use crate::settings::{load_settings, write_default_settings};

#[derive(Parser)]
#[command(name = "golem-desk")]
#[command(version, about = "Validate, encode and invoke Golem component functions", long_about = None)]
struct Cli {
    /// Path to golem-desk.json settings
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default golem-desk.json
    Init(InitArgs),

    /// Parse an export signature and show each parameter's type and skeleton
    Signature(SignatureArgs),

    /// List the exported functions of a component
    Exports(ExportsArgs),

    /// Print the skeleton value for a type or every parameter of a function
    Skeleton(SkeletonArgs),

    /// Check a JSON value against a type
    Validate(ValidateArgs),

    /// Encode a JSON value as a wire-format invocation argument
    Encode(EncodeArgs),

    /// Validate, encode and invoke a function on a worker
    Invoke(InvokeArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Directory to write settings into (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Replace an existing settings file
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct SignatureArgs {
    /// Signature, e.g. 'api.{add}(item: record { qty: u32 }) -> u64'
    #[arg(value_name = "SIGNATURE")]
    signature: String,
}

/// Where exported functions come from.
#[derive(Args)]
struct FunctionSource {
    /// Export signature of the function
    #[arg(long, value_name = "SIGNATURE", conflicts_with_all = ["metadata", "component"])]
    signature: Option<String>,

    /// JSON file with component export metadata
    #[arg(long, value_name = "FILE", conflicts_with = "component")]
    metadata: Option<PathBuf>,

    /// Deployed component to read exports from via `golem component get`
    #[arg(long, value_name = "NAME")]
    component: Option<String>,
}

#[derive(Parser)]
struct ExportsArgs {
    #[command(flatten)]
    source: FunctionSource,

    /// Print the functions as JSON skeleton arguments instead of signatures
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SkeletonArgs {
    /// Type in WIT syntax or as a JSON descriptor
    #[arg(long = "type", value_name = "TYPE", conflicts_with_all = ["signature", "metadata", "component"])]
    typ: Option<String>,

    #[command(flatten)]
    source: FunctionSource,

    /// Function to pick from --metadata/--component exports
    #[arg(long, value_name = "NAME")]
    function: Option<String>,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Type in WIT syntax or as a JSON descriptor
    #[arg(long = "type", value_name = "TYPE")]
    typ: String,

    /// Value as JSON
    #[arg(long, value_name = "JSON")]
    value: String,

    /// Field name used in error messages
    #[arg(long, default_value = "value")]
    field: String,
}

#[derive(Parser)]
struct EncodeArgs {
    /// Value as JSON
    #[arg(long, value_name = "JSON")]
    value: String,

    /// Type in WIT syntax or as a JSON descriptor (untyped encoding if omitted)
    #[arg(long = "type", value_name = "TYPE")]
    typ: Option<String>,

    /// Validate against --type before encoding
    #[arg(long, requires = "typ")]
    check: bool,
}

#[derive(Parser)]
struct InvokeArgs {
    #[command(flatten)]
    source: FunctionSource,

    /// Function to pick from --metadata/--component exports
    #[arg(long, value_name = "NAME")]
    function: Option<String>,

    /// Worker to invoke the function on
    #[arg(short, long, value_name = "WORKER")]
    worker: String,

    /// All arguments as one JSON object keyed by parameter name
    #[arg(long, value_name = "JSON")]
    args: Option<String>,

    /// One argument as NAME=JSON (repeatable, applied after --args)
    #[arg(short = 'a', long = "arg", value_name = "NAME=JSON")]
    arg: Vec<String>,

    /// Print the golem command instead of running it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    init_tracing();
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("loaded environment from {}", path.display());
    }
    let cli = Cli::parse();
    let settings_path = cli.settings;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            match cli.command {
                Commands::Init(args) => init(args),
                Commands::Signature(args) => signature(args),
                Commands::Exports(args) => exports(args, settings_path.as_deref()).await,
                Commands::Skeleton(args) => skeleton_command(args, settings_path.as_deref()).await,
                Commands::Validate(args) => validate_command(args),
                Commands::Encode(args) => encode_command(args),
                Commands::Invoke(args) => invoke(args, settings_path.as_deref()).await,
            }
        })
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let dest = write_default_settings(&dir, args.force)?;

    eprintln!("Created: {}", dest.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Point golemCli at your golem binary (or set GOLEM_DESK_CLI)");
    eprintln!("  2. Run: golem-desk exports --component <NAME>");
    eprintln!("  3. Run: golem-desk invoke --component <NAME> --function <F> -w <WORKER>");

    Ok(())
}

fn signature(args: SignatureArgs) -> Result<()> {
    tracing::debug!("executing signature command");

    let function = parse_signature(&args.signature)
        .with_context(|| format!("invalid signature: {}", args.signature))?;

    println!("{}", function.name);
    for p in &function.parameters {
        println!("  {}: {} = {}", p.name, p.typ, skeleton(&p.typ));
    }
    for r in &function.results {
        println!("  -> {r}");
    }
    Ok(())
}

async fn exports(args: ExportsArgs, settings_path: Option<&Path>) -> Result<()> {
    tracing::debug!("executing exports command");

    let functions = load_functions(&args.source, settings_path).await?;
    if args.json {
        let doc: serde_json::Map<String, Value> = functions
            .iter()
            .map(|f| {
                let args = skeleton_args(f).into_iter().collect();
                (f.name.clone(), Value::Object(args))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for f in &functions {
            println!("{f}");
        }
    }
    Ok(())
}

async fn skeleton_command(args: SkeletonArgs, settings_path: Option<&Path>) -> Result<()> {
    tracing::debug!("executing skeleton command");

    let value = match &args.typ {
        Some(typ) => skeleton(&parse_type_arg(typ)?),
        None => {
            let functions = load_functions(&args.source, settings_path).await?;
            let function = select_function(functions, args.function.as_deref())?;
            Value::Object(skeleton_args(&function).into_iter().collect())
        }
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn validate_command(args: ValidateArgs) -> Result<()> {
    tracing::debug!("executing validate command");

    let typ = parse_type_arg(&args.typ)?;
    let value = parse_json_arg(&args.value)?;
    validate(&value, &typ, &args.field)?;
    eprintln!("OK: value matches {typ}");
    Ok(())
}

fn encode_command(args: EncodeArgs) -> Result<()> {
    tracing::debug!("executing encode command");

    let value = parse_json_arg(&args.value)?;
    let encoded = match &args.typ {
        Some(typ) => {
            let typ = parse_type_arg(typ)?;
            if args.check {
                validate(&value, &typ, "value")?;
            }
            encode_typed(&value, &typ)
        }
        None => encode(&value),
    };
    println!("{encoded}");
    Ok(())
}

async fn invoke(args: InvokeArgs, settings_path: Option<&Path>) -> Result<()> {
    tracing::debug!("executing invoke command");

    let loaded = load_settings(settings_path)?;
    let golem = GolemCli::from_settings(&loaded);

    let functions = load_functions_with(&args.source, &golem).await?;
    let function = select_function(functions, args.function.as_deref())?;
    let mut form = InvocationForm::new(function).for_target(&args.worker);

    if let Some(raw) = &args.args {
        let Value::Object(values) = parse_json_arg(raw)? else {
            bail!("--args must be a JSON object keyed by parameter name");
        };
        for (name, value) in values {
            form.set_value(&name, value)?;
        }
    }
    for pair in &args.arg {
        let (name, text) = pair
            .split_once('=')
            .context("argument format should be NAME=JSON")?;
        form.set_text(name.trim(), text)?;
    }

    let invocation = form.submit().map_err(FormError::Invalid)?;

    if args.dry_run {
        println!("{}", golem.render_command(&golem.invoke_args(&invocation)?));
        return Ok(());
    }

    let stdout = golem.invoke(&invocation).await?;
    print!("{stdout}");
    Ok(())
}

async fn load_functions(
    source: &FunctionSource,
    settings_path: Option<&Path>,
) -> Result<Vec<ComponentExportFunction>> {
    if source.component.is_some() {
        let loaded = load_settings(settings_path)?;
        return load_functions_with(source, &GolemCli::from_settings(&loaded)).await;
    }
    load_local_functions(source)
}

async fn load_functions_with(
    source: &FunctionSource,
    golem: &GolemCli,
) -> Result<Vec<ComponentExportFunction>> {
    match &source.component {
        Some(component) => golem.component_exports(component).await,
        None => load_local_functions(source),
    }
}

fn load_local_functions(source: &FunctionSource) -> Result<Vec<ComponentExportFunction>> {
    if let Some(sig) = &source.signature {
        let function =
            parse_signature(sig).with_context(|| format!("invalid signature: {sig}"))?;
        return Ok(vec![function]);
    }
    if let Some(path) = &source.metadata {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read metadata: {}", path.display()))?;
        let doc: Value = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse metadata JSON: {}", path.display()))?;
        return parse_component_exports(&doc)
            .with_context(|| format!("invalid export metadata in {}", path.display()));
    }
    bail!("one of --signature, --metadata or --component is required");
}

/// Pick a function by exact name, or by the short name inside `{...}`.
fn select_function(
    functions: Vec<ComponentExportFunction>,
    name: Option<&str>,
) -> Result<ComponentExportFunction> {
    let Some(name) = name else {
        return match <[_; 1]>::try_from(functions) {
            Ok([only]) => Ok(only),
            Err(functions) => bail!(
                "--function is required when there are {} exported functions",
                functions.len()
            ),
        };
    };

    let short = format!(".{{{name}}}");
    let mut matches: Vec<_> = functions
        .into_iter()
        .filter(|f| f.name == name || f.name.ends_with(&short))
        .collect();
    match matches.len() {
        0 => bail!("no exported function named '{name}'"),
        1 => Ok(matches.remove(0)),
        n => bail!("'{name}' matches {n} exported functions; use the qualified name"),
    }
}

/// Types are given in WIT syntax, or as a JSON descriptor when they start
/// with `{` or `"`.
fn parse_type_arg(raw: &str) -> Result<TypeDescriptor> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('"') {
        let json: Value = serde_json::from_str(trimmed).context("type is not valid JSON")?;
        return parse_type(&json).context("invalid type descriptor");
    }
    parse_type_str(raw).with_context(|| format!("invalid type: {raw}"))
}

fn parse_json_arg(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("value is not valid JSON: {raw}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
