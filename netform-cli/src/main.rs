use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;
use serde_json::Value;

use netform_core::crud::{CrudOptions, Timeouts};
use netform_core::provider::Provider;
use netform_core::schema::{AttributeSchema, ResourceSchema};
use netform_provider_oci::client::models::Vcn;
use netform_provider_oci::schemas::{self, identity, network};
use netform_provider_oci::{MemoryClient, OciClients, OciProvider, ProviderConfig, build_request};

/// Compartment used for simulated resources
const SIMULATED_COMPARTMENT: &str = "ocid1.compartment.oc1..simulated";

/// Poll interval against the in-memory API
const SIMULATED_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "netform")]
#[command(about = "Inspect and validate OCI networking resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resource types, or describe the attributes of one
    Schema {
        /// Resource or data source type (e.g., oci_core_route_table)
        resource: Option<String>,
    },
    /// Validate a JSON configuration and print the API request it produces
    Validate {
        /// Resource type of the configuration
        resource_type: String,
        /// Path to the JSON configuration
        file: PathBuf,
    },
    /// Check the provider configuration in the OCI_* environment variables
    Config,
    /// Create, read and remove a resource against an in-memory API
    Simulate {
        /// Resource type of the configuration
        resource_type: String,
        /// Path to the JSON configuration
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema { resource } => run_schema(resource.as_deref()),
        Commands::Validate {
            resource_type,
            file,
        } => run_validate(&resource_type, &file),
        Commands::Config => run_config(),
        Commands::Simulate {
            resource_type,
            file,
        } => run_simulate(&resource_type, &file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_json(file: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", file.display(), e))
}

fn run_schema(resource: Option<&str>) -> Result<(), String> {
    let Some(name) = resource else {
        println!("{}", "Resources:".cyan().bold());
        for schema in schemas::all_schemas() {
            print_summary(&schema);
        }
        println!("{}", "Data sources:".cyan().bold());
        for schema in schemas::data_source_schemas() {
            print_summary(&schema);
        }
        return Ok(());
    };

    let schema =
        schemas::find_schema(name).ok_or_else(|| format!("Unknown resource type: {}", name))?;

    println!("{}", schema.resource_type.bold());
    if let Some(description) = &schema.description {
        println!("  {}", description);
    }
    println!();
    for attr in schema.attributes.values() {
        println!(
            "  {} {} {}",
            attr.name.green(),
            attr.attr_type.to_string().dimmed(),
            format!("[{}]", attribute_flags(attr).join(", ")).yellow()
        );
        if let Some(description) = &attr.description {
            println!("      {}", description);
        }
    }
    Ok(())
}

fn print_summary(schema: &ResourceSchema) {
    println!(
        "  {}  {}",
        schema.resource_type.green(),
        schema.description.as_deref().unwrap_or("")
    );
}

fn attribute_flags(attr: &AttributeSchema) -> Vec<String> {
    let mut flags = Vec::new();
    if attr.required {
        flags.push("required".to_string());
    } else if attr.computed && !attr.optional {
        flags.push("computed".to_string());
    } else {
        flags.push("optional".to_string());
    }
    if attr.force_new {
        flags.push("forces replacement".to_string());
    }
    if !attr.conflicts_with.is_empty() {
        flags.push(format!("conflicts with {}", attr.conflicts_with.join(", ")));
    }
    if let Some(default) = &attr.default {
        flags.push(format!("default {}", default));
    }
    flags
}

fn run_validate(resource_type: &str, file: &Path) -> Result<(), String> {
    let config = load_json(file)?;

    println!("{}", "Validating...".cyan());
    let request = build_request(resource_type, &config).map_err(|e| e.to_string())?;

    println!("{}", "Configuration is valid.".green().bold());
    println!("{}", "Request:".bold());
    println!(
        "{}",
        serde_json::to_string_pretty(&request).map_err(|e| e.to_string())?
    );
    Ok(())
}

fn run_config() -> Result<(), String> {
    let config = ProviderConfig::from_env().map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    let timeouts = config.resolve_timeouts(Timeouts::default());

    println!("{} {}", "Region:".bold(), config.region);
    println!("{} {}", "Tenancy:".bold(), config.tenancy_ocid);
    println!("{} {}", "User:".bold(), config.user_ocid);
    println!(
        "{} create {}m, update {}m, delete {}m",
        "Timeouts:".bold(),
        timeouts.create.as_secs() / 60,
        timeouts.update.as_secs() / 60,
        timeouts.delete.as_secs() / 60
    );
    println!("{}", "Provider configuration is valid.".green().bold());
    Ok(())
}

/// Point a configuration at the simulated VCN
///
/// `"default_id": "default"` selects the VCN's default resource of the type;
/// otherwise missing compartment and VCN ids are filled in.
fn bind_to_vcn(resource_type: &str, config: &mut Value, vcn: &Vcn) {
    let Some(map) = config.as_object_mut() else {
        return;
    };

    if map.get("default_id").and_then(Value::as_str) == Some("default") {
        let default_id = match resource_type {
            network::DHCP_OPTIONS => &vcn.default_dhcp_options_id,
            network::ROUTE_TABLE => &vcn.default_route_table_id,
            network::SECURITY_LIST => &vcn.default_security_list_id,
            _ => return,
        };
        map.insert("default_id".to_string(), Value::String(default_id.clone()));
        return;
    }

    map.entry("compartment_id")
        .or_insert_with(|| Value::String(vcn.compartment_id.clone()));
    if resource_type != identity::POLICY {
        map.entry("vcn_id")
            .or_insert_with(|| Value::String(vcn.id.clone()));
    }
}

async fn run_simulate(resource_type: &str, file: &Path) -> Result<(), String> {
    let mut config = load_json(file)?;

    let client = Arc::new(MemoryClient::new());
    let vcn = client.create_vcn(SIMULATED_COMPARTMENT, "10.0.0.0/16").await;
    bind_to_vcn(resource_type, &mut config, &vcn);

    let clients = OciClients::memory(client.clone());
    let provider = match ProviderConfig::from_env() {
        Ok(provider_config) => OciProvider::with_config(clients, &provider_config),
        Err(e) => {
            debug!("Using default timeouts: {}", e);
            OciProvider::new(clients)
        }
    }
    .with_options(simulated_options());

    println!("{}", "Creating...".cyan());
    let state = provider
        .create(resource_type, &config)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", pretty(&state)?);

    println!("{}", "Reading...".cyan());
    let state = provider
        .read(resource_type, &state)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "Resource disappeared after create".to_string())?;

    println!("{}", "Removing...".red().bold());
    provider
        .delete(resource_type, &state)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", "API calls:".cyan().bold());
    for call in client.calls().await {
        println!("  {} {}", call.operation, call.id.as_deref().unwrap_or(""));
    }
    Ok(())
}

/// Options for the in-memory API, whose resources settle within a poll or two
fn simulated_options() -> CrudOptions {
    CrudOptions::default()
        .with_poll_interval(SIMULATED_POLL_INTERVAL)
        .with_extra_wait(false)
}

fn pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}
