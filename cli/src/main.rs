use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use entity_maker_registry::{Entry, Registry, load_document, save_document};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for printed records.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "entity-maker")]
#[command(about = "Validate entity schema bundles and edit data documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a schema bundle and report what it registers.
    Validate(ValidateArgs),
    /// Print the default record of an entity type.
    Defaults(DefaultsArgs),
    /// Load a data document against a bundle and write it back normalized.
    Check(CheckArgs),
    /// Rename a record and update every reference to it.
    Rename(RenameArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema bundle (YAML, or JSON with a `.json` extension).
    bundle: PathBuf,
}

#[derive(Debug, Args)]
struct DefaultsArgs {
    /// Schema bundle.
    bundle: PathBuf,
    /// Entity type to instantiate.
    schema: String,
    /// Name of the default record.
    #[arg(long, default_value = "")]
    name: String,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Schema bundle.
    bundle: PathBuf,
    /// JSON data document.
    document: PathBuf,
    /// Where to write the normalized document (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// Schema bundle.
    bundle: PathBuf,
    /// JSON data document.
    document: PathBuf,
    /// Current record name.
    from: String,
    /// New record name.
    to: String,
    /// Where to write the updated document (default: overwrite the input).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Defaults(args) => run_defaults(args),
        Command::Check(args) => run_check(args),
        Command::Rename(args) => run_rename(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let registry = load_registry(&args.bundle)?;

    let (mut collections, mut editors) = (0usize, 0usize);
    for entry in registry.entries() {
        match entry {
            Entry::Collection(_) => collections += 1,
            Entry::Editor(_) => editors += 1,
        }
    }
    println!(
        "Validated '{}': {collections} collection(s), {editors} editor(s), {} entity type(s).",
        args.bundle.display(),
        registry.schemas().count()
    );

    let unresolved = registry.unresolved_references();
    for (edge, target) in &unresolved {
        eprintln!(
            "warning: {}.{} references unknown target '{target}'",
            edge.schema, edge.property
        );
    }
    Ok(())
}

fn run_defaults(args: DefaultsArgs) -> Result<(), String> {
    let registry = load_registry(&args.bundle)?;
    let record = registry
        .get_defaults(&args.schema)
        .ok_or_else(|| format!("Unknown entity type '{}'", args.schema))?;
    let record = record_with_name(record, &args.name);

    let value = serde_json::Value::from(record);
    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&value)
            .map_err(|err| format!("Failed to serialize record: {err}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&value)
            .map_err(|err| format!("Failed to serialize record: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let mut registry = load_registry(&args.bundle)?;
    let document = read_document(&args.document)?;
    registry.set_document(&document);

    let normalized = serde_json::Value::Object(registry.get_document());
    match args.output {
        Some(path) => {
            write_document(&normalized, &path)?;
            println!("Wrote normalized document to '{}'.", path.display());
        }
        None => {
            let raw = serde_json::to_string_pretty(&normalized)
                .map_err(|err| format!("Failed to serialize document: {err}"))?;
            println!("{raw}");
        }
    }
    Ok(())
}

fn run_rename(args: RenameArgs) -> Result<(), String> {
    let mut registry = load_registry(&args.bundle)?;
    let document = read_document(&args.document)?;
    registry.set_document(&document);

    let collection = registry
        .find_record(&args.from)
        .map(|(collection, _)| collection.to_string())
        .ok_or_else(|| format!("No record named '{}'", args.from))?;
    let renamed = registry
        .rename(&collection, &args.to, Some(&args.from))
        .map_err(|err| format!("Cannot rename '{}' to '{}': {err}", args.from, args.to))?;
    debug!(collection = %collection, renamed, "Applied rename");

    let output = args.output.unwrap_or(args.document);
    write_document(&serde_json::Value::Object(registry.get_document()), &output)?;
    if renamed {
        println!(
            "Renamed '{}' to '{}' in {collection}; wrote '{}'.",
            args.from,
            args.to.trim(),
            output.display()
        );
    } else {
        println!("Name unchanged; wrote '{}'.", output.display());
    }
    Ok(())
}

fn load_registry(path: &Path) -> Result<Registry, String> {
    Registry::load(path).map_err(|err| format!("Failed to load bundle '{}': {err}", path.display()))
}

fn read_document(path: &Path) -> Result<serde_json::Value, String> {
    load_document(path).map_err(|err| format!("Failed to read document '{}': {err}", path.display()))
}

fn write_document(document: &serde_json::Value, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    save_document(document, path).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}

fn record_with_name(mut record: entity_maker_core::Record, name: &str) -> entity_maker_core::Record {
    record.name = name.trim().to_string();
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_with_name_trims() {
        let record = entity_maker_core::Record::new("", "Cat");
        assert_eq!(record_with_name(record, "  Tom ").name, "Tom");
    }

    #[test]
    fn test_cli_parses_rename() {
        let cli = Cli::try_parse_from(["entity-maker", "rename", "b.yml", "d.json", "Tom", "Thomas"]).unwrap();
        match cli.command {
            Command::Rename(args) => {
                assert_eq!(args.from, "Tom");
                assert_eq!(args.to, "Thomas");
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
