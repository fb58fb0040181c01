mod config_file;

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::{debug, warn};
use similar::{ChangeTag, TextDiff};

use spotform_core::differ::create_plan;
use spotform_core::effect::Effect;
use spotform_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use spotform_core::plan::Plan;
use spotform_core::provider::Provider;
use spotform_core::resource::{Resource, ResourceId, State, Value};
use spotform_core::schema::{AttributeType, ResourceSchema};
use spotform_provider_spotinst::{ConfigSource, SpotinstProvider, resources};
use spotform_state::{LocalBackend, StateBackend, StateFile};

use config_file::{ConfigFile, DEFAULT_CONFIG_FILE, state_path};

#[derive(Parser)]
#[command(name = "spotform")]
#[command(about = "Manage Spotinst resources declared in a JSON file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

/// Provider settings that override the configuration file and environment
#[derive(Args, Debug, Default)]
struct ProviderArgs {
    /// Spotinst API token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Spotinst account ID
    #[arg(long, global = true)]
    account: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

impl ProviderArgs {
    fn source(&self) -> ConfigSource {
        ConfigSource {
            token: self.token.clone(),
            account: self.account.clone(),
            base_url: self.base_url.clone(),
            create_timeout_secs: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Show the changes apply would make
    Plan {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Create and update resources to match the configuration
    Apply {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Delete every managed resource declared in the configuration
    Destroy {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing remote object under management
    Import {
        /// Resource type (e.g., spotinst_elastigroup_aws)
        resource_type: String,
        /// Local name to record the object under
        name: String,
        /// Remote identifier (e.g., sig-1234abcd)
        id: String,
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Print resource schemas
    Schema {
        /// Only this resource type
        resource_type: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file, &cli.provider).await,
        Commands::Apply { file } => run_apply(&file, &cli.provider).await,
        Commands::Destroy { file, auto_approve } => {
            run_destroy(&file, auto_approve, &cli.provider).await
        }
        Commands::Import {
            resource_type,
            name,
            id,
            file,
        } => {
            let resource_id = ResourceId::new(resource_type, name);
            run_import(&file, resource_id, &id, &cli.provider).await
        }
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Build the provider; flags win over the file, the file over the environment
fn connect(args: &ProviderArgs, config: &ConfigFile) -> Result<SpotinstProvider> {
    let settings = args
        .source()
        .or(config.provider.clone())
        .or(ConfigSource::from_env());
    let provider = SpotinstProvider::new(&settings.build()?)?;
    Ok(provider)
}

fn validate_resources(
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<()> {
    let mut errors = Vec::new();

    for resource in resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(type_errors) = schema.validate(&resource.attributes) {
                    for error in type_errors {
                        errors.push(format!("{}: {}", resource.id, error));
                    }
                }
            }
            None => errors.push(format!(
                "{}: unknown resource type '{}'",
                resource.id, resource.id.resource_type
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("validation failed:\n  {}", errors.join("\n  "))
    }
}

/// Hold the state lock while `run` executes
async fn locked<T>(
    backend: &LocalBackend,
    operation: &str,
    run: impl Future<Output = Result<T>>,
) -> Result<T> {
    let lock = backend.acquire_lock(operation).await?;
    let result = run.await;
    backend.release_lock(&lock).await?;
    result
}

async fn load_state(backend: &LocalBackend) -> Result<StateFile> {
    Ok(backend.read_state().await?.unwrap_or_default())
}

async fn save_state(backend: &LocalBackend, state: &mut StateFile) -> Result<()> {
    state.increment_serial();
    backend.write_state(state).await?;
    debug!("saved state to {}", backend.state_path().display());
    Ok(())
}

/// Read every recorded resource from the API
async fn refresh(
    provider: &impl Provider,
    state: &StateFile,
) -> Result<HashMap<ResourceId, State>> {
    let mut current = HashMap::new();
    for recorded in &state.resources {
        let id = recorded.id();
        let mut refreshed = provider
            .read(&id, Some(recorded.identifier.as_str()))
            .await?;
        refreshed.declared = Some(recorded.declared.clone());
        if !refreshed.exists {
            warn!("{} ({}) no longer exists", id, recorded.identifier);
        }
        current.insert(id, refreshed);
    }
    Ok(current)
}

fn run_validate(file: &Path) -> Result<()> {
    let config = ConfigFile::load(file)?;
    let resources = config.resources();
    validate_resources(&resources, &resources::schemas()?)?;

    println!(
        "{}",
        format!("Configuration is valid ({} resources).", resources.len()).green()
    );
    Ok(())
}

async fn run_plan(file: &Path, args: &ProviderArgs) -> Result<()> {
    let config = ConfigFile::load(file)?;
    let resources = config.resources();
    let provider = connect(args, &config)?;
    let schemas = provider.schemas();
    validate_resources(&resources, &schemas)?;

    let backend = LocalBackend::with_path(state_path(file));
    let state = load_state(&backend).await?;
    let current = refresh(&provider, &state).await?;

    print_plan(&create_plan(&resources, &current, &schemas));
    Ok(())
}

async fn run_apply(file: &Path, args: &ProviderArgs) -> Result<()> {
    let config = ConfigFile::load(file)?;
    let resources = config.resources();
    let provider = connect(args, &config)?;
    validate_resources(&resources, &provider.schemas())?;

    let backend = LocalBackend::with_path(state_path(file));
    locked(&backend, "apply", apply(&backend, provider, &resources)).await
}

async fn apply(
    backend: &LocalBackend,
    provider: SpotinstProvider,
    resources: &[Resource],
) -> Result<()> {
    let mut state = load_state(backend).await?;
    let current = refresh(&provider, &state).await?;
    for refreshed in current.values() {
        state.record(refreshed);
    }

    let plan = create_plan(resources, &current, &provider.schemas());
    print_plan(&plan);
    if plan.is_empty() {
        return save_state(backend, &mut state).await;
    }

    println!();
    println!("{}", "Applying changes...".cyan().bold());
    let result = Interpreter::new(provider).apply(&plan).await;
    record_outcomes(&mut state, &plan, &result);
    save_state(backend, &mut state).await?;

    finish("Apply", &plan, &result)
}

async fn run_destroy(file: &Path, auto_approve: bool, args: &ProviderArgs) -> Result<()> {
    let config = ConfigFile::load(file)?;
    let resources = config.resources();
    if resources.is_empty() {
        println!("{}", "No resources defined in configuration.".yellow());
        return Ok(());
    }
    let provider = connect(args, &config)?;

    let backend = LocalBackend::with_path(state_path(file));
    locked(
        &backend,
        "destroy",
        destroy(&backend, provider, &resources, auto_approve),
    )
    .await
}

async fn destroy(
    backend: &LocalBackend,
    provider: SpotinstProvider,
    resources: &[Resource],
    auto_approve: bool,
) -> Result<()> {
    let mut state = load_state(backend).await?;
    let current = refresh(&provider, &state).await?;
    for refreshed in current.values() {
        state.record(refreshed);
    }

    let plan = destroy_plan(resources, &current);
    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return save_state(backend, &mut state).await;
    }

    print_plan(&plan);
    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    let result = Interpreter::new(provider).apply(&plan).await;
    record_outcomes(&mut state, &plan, &result);
    save_state(backend, &mut state).await?;

    finish("Destroy", &plan, &result)
}

/// Delete effects for declared resources that exist, last declared first
fn destroy_plan(resources: &[Resource], current: &HashMap<ResourceId, State>) -> Plan {
    let mut plan = Plan::new();
    for resource in resources.iter().rev() {
        if let Some(state) = current.get(&resource.id)
            && state.exists
            && let Some(identifier) = &state.identifier
        {
            plan.add(Effect::Delete {
                id: resource.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }
    plan
}

fn confirm(question: &str) -> Result<bool> {
    println!();
    println!("{}", question.bold());
    print!("  Only 'yes' will be accepted: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    println!();
    Ok(input.trim() == "yes")
}

async fn run_import(
    file: &Path,
    id: ResourceId,
    identifier: &str,
    args: &ProviderArgs,
) -> Result<()> {
    let config = ConfigFile::load(file)?;
    let provider = connect(args, &config)?;
    if !provider.schemas().contains_key(&id.resource_type) {
        bail!("unknown resource type '{}'", id.resource_type);
    }

    let backend = LocalBackend::with_path(state_path(file));
    locked(&backend, "import", import(&backend, provider, id, identifier)).await
}

async fn import(
    backend: &LocalBackend,
    provider: SpotinstProvider,
    id: ResourceId,
    identifier: &str,
) -> Result<()> {
    let mut state = load_state(backend).await?;
    if let Some(existing) = state.find_resource(&id) {
        bail!("{} is already managed as {}", id, existing.identifier);
    }

    let mut plan = Plan::new();
    plan.add(Effect::Read {
        id: id.clone(),
        identifier: identifier.to_string(),
    });
    let mut result = Interpreter::new(provider).apply(&plan).await;

    match result.outcomes.pop() {
        Some(Ok(EffectOutcome::Read { state: imported })) if imported.exists => {
            state.record(&imported);
            save_state(backend, &mut state).await?;
            println!(
                "{}",
                format!("Imported {} ({}).", id, identifier).green().bold()
            );
            Ok(())
        }
        Some(Ok(_)) => bail!("{} '{}' does not exist", id.resource_type, identifier),
        Some(Err(e)) => Err(e.into()),
        None => bail!("import of {} did not run", id),
    }
}

fn run_schema(resource_type: Option<&str>) -> Result<()> {
    let schemas = resources::schemas()?;
    let names: Vec<&str> = match resource_type {
        Some(name) if schemas.contains_key(name) => vec![name],
        Some(name) => bail!("unknown resource type '{}'", name),
        None => resources::type_names(),
    };

    for name in names {
        let schema = &schemas[name];
        println!("{}", name.cyan().bold());
        if let Some(description) = &schema.description {
            println!("  {}", description.dimmed());
        }
        for attr_name in schema.attribute_names() {
            let attr = &schema.attributes[attr_name];
            let mut flags = Vec::new();
            if attr.required {
                flags.push("required");
            }
            if attr.force_new {
                flags.push("forces new");
            }
            if attr.write_only {
                flags.push("write-only");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            println!(
                "  {}: {}{}",
                attr_name,
                type_label(&attr.attr_type),
                flags.yellow()
            );
        }
        println!();
    }
    Ok(())
}

fn type_label(attr_type: &AttributeType) -> String {
    match attr_type {
        AttributeType::String => "string".to_string(),
        AttributeType::Int => "int".to_string(),
        AttributeType::Bool => "bool".to_string(),
        AttributeType::Enum(variants) => variants.join(" | "),
        AttributeType::Custom { name, .. } => name.clone(),
        AttributeType::List(inner) => format!("list({})", type_label(inner)),
        AttributeType::Map(inner) => format!("map({})", type_label(inner)),
        AttributeType::Block(block) => {
            let fields: Vec<&str> = block.attributes.iter().map(|a| a.name.as_str()).collect();
            format!("block {{{}}}", fields.join(", "))
        }
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!(
            "{}",
            "No changes. Remote objects match the configuration.".green()
        );
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let symbol = match effect {
            Effect::Create(_) => "+".green().bold(),
            Effect::Update { .. } => "~".yellow().bold(),
            Effect::Delete { .. } => "-".red().bold(),
            Effect::Read { .. } => "<=".normal(),
        };
        println!("  {} {}", symbol, effect.resource_id().to_string().bold());

        match effect {
            Effect::Create(resource) => {
                for line in attributes_json(&resource.attributes).lines() {
                    println!("      {}", line.green());
                }
            }
            Effect::Update { from, to, .. } => {
                print_attribute_diff(&from.attributes, &to.attributes);
            }
            Effect::Delete { identifier, .. } | Effect::Read { identifier, .. } => {
                println!("      id: {}", identifier);
            }
        }
        println!();
    }

    println!("{}", plan.summary().to_string().bold());
}

fn attributes_json(attributes: &HashMap<String, Value>) -> String {
    let json = Value::Map(attributes.clone()).to_json();
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}

fn print_attribute_diff(from: &HashMap<String, Value>, to: &HashMap<String, Value>) {
    let old = attributes_json(from);
    let new = attributes_json(to);
    for change in TextDiff::from_lines(&old, &new).iter_all_changes() {
        let line = change.to_string_lossy();
        let line = line.trim_end();
        match change.tag() {
            ChangeTag::Delete => println!("    {} {}", "-".red(), line.red()),
            ChangeTag::Insert => println!("    {} {}", "+".green(), line.green()),
            ChangeTag::Equal => println!("      {}", line.dimmed()),
        }
    }
}

/// Fold every outcome into the state file and print one line per effect
fn record_outcomes(state: &mut StateFile, plan: &Plan, result: &ApplyResult) {
    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(EffectOutcome::Created { state: new })
            | Ok(EffectOutcome::Updated { state: new })
            | Ok(EffectOutcome::Read { state: new }) => {
                let declared = match effect {
                    Effect::Create(to) | Effect::Update { to, .. } => {
                        Some(to.attributes.keys().cloned().collect())
                    }
                    _ => new.declared.clone(),
                };
                state.record(&State {
                    declared,
                    ..new.clone()
                });
                println!("  {} {}", "✓".green(), effect.label());
            }
            Ok(EffectOutcome::Deleted { id }) => {
                state.remove_resource(id);
                println!("  {} {}", "✓".green(), effect.label());
            }
            Ok(EffectOutcome::Skipped { reason }) => {
                println!("  {} {} ({})", "-".dimmed(), effect.label(), reason);
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), effect.label(), e),
        }
    }
}

fn finish(command: &str, plan: &Plan, result: &ApplyResult) -> Result<()> {
    println!();
    if !result.is_success() {
        bail!(
            "{} failed: {} succeeded, {} failed, {} not attempted",
            command,
            result.success_count,
            result.failure_count,
            plan.effects().len() - result.outcomes.len()
        );
    }
    println!(
        "{}",
        format!(
            "{} complete! {} changes applied.",
            command, result.success_count
        )
        .green()
        .bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::provider::ProviderError;

    fn group(name: &str) -> Resource {
        Resource::new("spotinst_elastigroup_gcp", name)
            .with_attribute("name", name)
            .with_attribute("max_size", 2i64)
    }

    fn existing(resource: &Resource, identifier: &str) -> State {
        State::existing(resource.id.clone(), resource.attributes.clone())
            .with_identifier(identifier)
    }

    #[test]
    fn validation_reports_every_resource() {
        let schemas = resources::schemas().unwrap();
        let resources = vec![
            group("web"),
            Resource::new("spotinst_elastigroup_gcp", "bad").with_attribute("max_size", -1i64),
            Resource::new("spotinst_unknown", "x"),
        ];

        let err = validate_resources(&resources, &schemas).unwrap_err().to_string();
        assert!(err.contains("spotinst_elastigroup_gcp.bad"));
        assert!(err.contains("unknown resource type 'spotinst_unknown'"));
        assert!(!err.contains("spotinst_elastigroup_gcp.web"));
    }

    #[test]
    fn valid_resources_pass() {
        let schemas = resources::schemas().unwrap();
        assert!(validate_resources(&[group("web")], &schemas).is_ok());
    }

    #[test]
    fn destroy_deletes_existing_in_reverse_order() {
        let web = group("web");
        let api = group("api");
        let gone = group("gone");

        let mut current = HashMap::new();
        current.insert(web.id.clone(), existing(&web, "sig-1"));
        current.insert(api.id.clone(), existing(&api, "sig-2"));
        current.insert(gone.id.clone(), State::not_found(gone.id.clone()));

        let plan = destroy_plan(&[web.clone(), gone, api.clone()], &current);
        assert_eq!(
            plan.effects(),
            &[
                Effect::Delete {
                    id: api.id,
                    identifier: "sig-2".to_string()
                },
                Effect::Delete {
                    id: web.id,
                    identifier: "sig-1".to_string()
                },
            ]
        );
    }

    #[test]
    fn outcomes_are_recorded_in_state() {
        let web = group("web");
        let api = group("api");
        let mut state = StateFile::new();
        state.record(&existing(&api, "sig-2"));

        let mut plan = Plan::new();
        plan.add(Effect::Create(web.clone()));
        plan.add(Effect::Delete {
            id: api.id.clone(),
            identifier: "sig-2".to_string(),
        });
        let result = ApplyResult {
            outcomes: vec![
                Ok(EffectOutcome::Created {
                    state: existing(&web, "sig-1"),
                }),
                Ok(EffectOutcome::Deleted { id: api.id.clone() }),
            ],
            success_count: 2,
            failure_count: 0,
        };

        record_outcomes(&mut state, &plan, &result);
        let recorded = state.find_resource(&web.id).unwrap();
        assert_eq!(recorded.identifier, "sig-1");
        assert_eq!(
            recorded.declared.iter().collect::<Vec<_>>(),
            vec!["max_size", "name"]
        );
        assert!(state.find_resource(&api.id).is_none());
        assert!(finish("Apply", &plan, &result).is_ok());
    }

    #[test]
    fn removed_attributes_are_planned_after_refresh() {
        let declared = group("web").with_attribute("description", "web tier");
        let mut state = StateFile::new();
        let mut plan = Plan::new();
        plan.add(Effect::Create(declared.clone()));
        let result = ApplyResult {
            outcomes: vec![Ok(EffectOutcome::Created {
                state: existing(&declared, "sig-1"),
            })],
            success_count: 1,
            failure_count: 0,
        };
        record_outcomes(&mut state, &plan, &result);

        let current = state.current_states();
        let next = create_plan(&[group("web")], &current, &resources::schemas().unwrap());
        assert!(matches!(next.effects(), [Effect::Update { .. }]));
    }

    #[test]
    fn failed_effects_leave_state_untouched() {
        let web = group("web");
        let mut state = StateFile::new();

        let mut plan = Plan::new();
        plan.add(Effect::Create(web.clone()));
        plan.add(Effect::Create(group("api")));
        let result = ApplyResult {
            outcomes: vec![Err(ProviderError::new("boom"))],
            success_count: 0,
            failure_count: 1,
        };

        record_outcomes(&mut state, &plan, &result);
        assert!(state.resources.is_empty());

        let err = finish("Apply", &plan, &result).unwrap_err().to_string();
        assert!(err.contains("1 failed, 1 not attempted"));
    }

    #[test]
    fn flags_override_file_settings() {
        let args = ProviderArgs {
            token: Some("flag-token".to_string()),
            ..Default::default()
        };
        let file = ConfigSource {
            token: Some("file-token".to_string()),
            account: Some("act-1".to_string()),
            ..Default::default()
        };

        let merged = args.source().or(file);
        assert_eq!(merged.token.as_deref(), Some("flag-token"));
        assert_eq!(merged.account.as_deref(), Some("act-1"));
    }

    #[test]
    fn type_labels_describe_nesting() {
        assert_eq!(
            type_label(&AttributeType::List(Box::new(AttributeType::String))),
            "list(string)"
        );
        assert_eq!(
            type_label(&AttributeType::Enum(vec!["a".to_string(), "b".to_string()])),
            "a | b"
        );
    }
}
