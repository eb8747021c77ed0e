use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::debug;
use serde_json::Value;

use sx_core::config::{self, CONFIG_FILE_NAME, SxConfig};
use sx_core::load::{self, LoadedSpec};
use sx_core::materialize::{self, ParameterBag};
use sx_core::OperationKey;

#[derive(Parser)]
#[command(name = "sx", about = "Swagger 2.0 request materializer", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a Swagger spec
    Validate {
        /// Path to the spec file (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List the operations of a Swagger spec
    Inspect {
        /// Path to the spec file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Print the URL and options an operation call would send
    Request {
        /// Operation id or path
        operation: String,

        /// Path to the spec file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Parameter value as `name=value`; values that parse as JSON are used as JSON
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,

        /// JSON payload for a `body` parameter
        #[arg(long)]
        body: Option<String>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Initialize a new sx configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = try_load_config()?.unwrap_or_default();

    match cli.command {
        Commands::Validate { input } => cmd_validate(&spec_path(input, &cfg)),

        Commands::Inspect { input, format } => cmd_inspect(&spec_path(input, &cfg), format),

        Commands::Request {
            operation,
            input,
            params,
            body,
            format,
        } => {
            let path = spec_path(input, &cfg);
            let bag = build_bag(params, body.as_deref())?;
            cmd_request(&path, &cfg, &operation, &bag, format)
        }

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "sx", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<SxConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn spec_path(input: Option<PathBuf>, cfg: &SxConfig) -> PathBuf {
    input.unwrap_or_else(|| PathBuf::from(&cfg.input))
}

fn load_spec(path: &Path) -> Result<LoadedSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    debug!("loading {} as {}", path.display(), ext);

    let loaded = match ext {
        "json" => load::load_json(&content)?,
        _ => load::load_yaml(&content)?,
    };
    Ok(loaded)
}

/// Parse a `name=value` pair. The value is read as JSON when it parses,
/// otherwise it is kept as a string.
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    if name.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn build_bag(params: Vec<(String, Value)>, body: Option<&str>) -> Result<ParameterBag> {
    let mut bag: ParameterBag = params.into_iter().collect();
    if let Some(body) = body {
        let payload: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
        bag.insert(materialize::BODY_KEY.to_string(), payload);
    }
    Ok(bag)
}

fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(value)?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<()> {
    let loaded = load_spec(input)?;

    eprintln!("Valid Swagger spec: {}", input.display());
    eprintln!("  Base URL: {}", loaded.document.base_url);
    eprintln!("  Schemes: {}", loaded.document.schemes.join(", "));
    eprintln!(
        "  Operation ids: {}",
        loaded.registry.iter(OperationKey::ById).count()
    );
    eprintln!(
        "  Paths: {}",
        loaded.registry.iter(OperationKey::ByPath).count()
    );
    if loaded.registry.is_empty() {
        eprintln!("  warning: no operations declared");
    }
    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: &Path, format: OutputFormat) -> Result<()> {
    let loaded = load_spec(input)?;
    print_value(&build_inspect_summary(&loaded), format)
}

fn build_inspect_summary(loaded: &LoadedSpec) -> Value {
    let entries = |key: OperationKey| -> Vec<Value> {
        loaded
            .registry
            .iter(key)
            .map(|(name, op)| {
                let params: Vec<Value> = op
                    .parameters
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "in": p.location,
                            "required": p.required,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "key": format!("{}:{}", key.prefix(), name),
                    "method": op.method.to_string(),
                    "path": op.path,
                    "parameters": params,
                })
            })
            .collect()
    };

    serde_json::json!({
        "base_url": loaded.document.base_url,
        "schemes": loaded.document.schemes,
        "operations": entries(OperationKey::ById),
        "paths": entries(OperationKey::ByPath),
    })
}

fn cmd_request(
    input: &Path,
    cfg: &SxConfig,
    operation: &str,
    params: &ParameterBag,
    format: OutputFormat,
) -> Result<()> {
    let loaded = load_spec(input)?;
    let op = loaded.registry.resolve(operation)?;
    let request = materialize::materialize(&loaded.document, op, params, &cfg.materialize)?;
    print_value(&serde_json::to_value(&request)?, format)
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
swagger: "2.0"
info: {title: Items, version: "1"}
host: api.example.com
schemes: [https]
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - {name: id, in: path, required: true}
        - {name: verbose, in: query}
"#;

    fn write_spec(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, SPEC).unwrap();
        path
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("id=42").unwrap(),
            ("id".to_string(), serde_json::json!(42))
        );
        assert_eq!(
            parse_param("name=rex").unwrap(),
            ("name".to_string(), serde_json::json!("rex"))
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), serde_json::json!("a=b"))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_build_bag_with_body() {
        let bag = build_bag(
            vec![("id".to_string(), serde_json::json!("1"))],
            Some(r#"{"a": 1}"#),
        )
        .unwrap();
        assert_eq!(bag["body"], serde_json::json!({"a": 1}));
        assert!(build_bag(vec![], Some("{not json")).is_err());
    }

    #[test]
    fn test_load_and_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), "spec.yaml");

        let loaded = load_spec(&path).unwrap();
        let summary = build_inspect_summary(&loaded);
        assert_eq!(summary["operations"][0]["key"], "id:getItem");
        assert_eq!(summary["operations"][0]["method"], "GET");
        assert_eq!(summary["paths"][0]["key"], "path:/items/{id}");
        assert_eq!(summary["operations"][0]["parameters"][0]["in"], "path");
    }

    #[test]
    fn test_request_materializes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), "spec.yml");
        let bag = build_bag(vec![("id".to_string(), serde_json::json!("5"))], None).unwrap();

        let cfg = SxConfig::default();

        assert!(cmd_request(&path, &cfg, "getItem", &bag, OutputFormat::Json).is_ok());
        assert!(cmd_request(&path, &cfg, "missing", &bag, OutputFormat::Json).is_err());
    }

    #[test]
    fn test_missing_spec_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_spec(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
