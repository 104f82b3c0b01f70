use std::process;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use aml_rbac::api::{self, ArmClient, ManagementApi};
use aml_rbac::config::{self, FailurePolicy, WorkspaceTarget};
use aml_rbac::credential::{DefaultCredential, TokenCredential, MANAGEMENT_SCOPE};
use aml_rbac::error::RbacError;
use aml_rbac::models::default_mappings;
use aml_rbac::rbac::{self, ConfigureReport, MappingOutcome};

#[derive(Parser)]
#[command(
    name = "aml-rbac",
    author,
    version,
    about = "Configure role-based access for an Azure Machine Learning workspace",
    long_about = r#"aml-rbac grants the standard security groups their roles on an Azure Machine Learning workspace.

  ML Security Admins  -> Contributor
  ML Data Scientists  -> AzureML Data Scientist
  ML Auditors         -> Reader

Credentials are taken from AZURE_ACCESS_TOKEN, a service principal
(AZURE_TENANT_ID / AZURE_CLIENT_ID / AZURE_CLIENT_SECRET) or the Azure CLI login, in that order.

Examples:
  aml-rbac configure --subscription-id <sub> --resource-group aml-sec-rg --workspace-name secure-ml-prod
  aml-rbac roles --workspace-name secure-ml-prod
"#,
    after_help = "Use `aml-rbac <subcommand> --help` to get subcommand specific options."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable request/response logging
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(clap::Args, Clone)]
struct TargetArgs {
    /// Subscription id (falls back to AZURE_SUBSCRIPTION_ID)
    #[arg(long)]
    subscription_id: Option<String>,
    /// Resource group containing the workspace (falls back to AZURE_RESOURCE_GROUP)
    #[arg(long)]
    resource_group: Option<String>,
    /// Workspace name (falls back to AML_WORKSPACE_NAME)
    #[arg(long)]
    workspace_name: Option<String>,
    /// Path to .env file
    #[arg(long)]
    env_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign the security-group roles on the workspace
    #[command(
        about = "Assign the security-group roles on the workspace",
        long_about = "Resolve the workspace, look up each role by name at workspace scope and create one role assignment per group. Existing assignments are reported as conflicts; nothing is rolled back."
    )]
    Configure {
        #[command(flatten)]
        target: TargetArgs,
        /// What to do after a mapping fails: continue or abort (falls back to AML_RBAC_ON_ERROR)
        #[arg(long)]
        on_error: Option<String>,
    },
    /// List role definitions visible at the workspace scope
    Roles {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Validate configuration and credential acquisition
    #[command(
        about = "Validate configuration and credential acquisition.",
        long_about = "Print the resolved settings and try to acquire a management token from the credential chain."
    )]
    CheckConfig {
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{}", yansi::Paint::new(msg.to_string()).red());
    process::exit(1);
}

async fn build_client() -> Result<ArmClient, RbacError> {
    let credential = DefaultCredential::from_env()?;
    let token = credential.get_token(MANAGEMENT_SCOPE).await?;
    ArmClient::new(&config::get_resource_manager_url(), &token.token, config::get_http_timeout())
}

fn resolve_target(args: TargetArgs) -> WorkspaceTarget {
    config::load_env_file(args.env_file.as_deref());
    WorkspaceTarget::resolve(args.subscription_id, args.resource_group, args.workspace_name)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

fn print_report(report: &ConfigureReport) {
    let mut table = new_table();
    table.set_header(vec!["Group", "Role", "Result", "Detail"]);
    for r in &report.results {
        let (result, detail) = match &r.outcome {
            MappingOutcome::Assigned(a) => ("assigned".to_string(), a.name.clone()),
            MappingOutcome::Failed(e) => (e.kind().to_string(), e.to_string()),
            MappingOutcome::Skipped => ("skipped".to_string(), String::new()),
        };
        table.add_row(vec![r.mapping.group_name.clone(), r.mapping.role_name.clone(), result, detail]);
    }
    println!("\n{table}");
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        api::set_silent(true);
    }

    match cli.command {
        Commands::Configure { target, on_error } => {
            let target = resolve_target(target);
            let policy = match on_error {
                Some(raw) => raw.parse::<FailurePolicy>(),
                None => config::get_failure_policy(),
            }
            .unwrap_or_else(|e| fail(e));

            let client = build_client().await.unwrap_or_else(|e| fail(e));
            let report = rbac::configure_workspace(&client, &target, &default_mappings(), policy)
                .await
                .unwrap_or_else(|e| fail(e));

            print_report(&report);
            let summary = report.summary_line(&target.workspace_name);
            if !report.is_success() {
                fail(summary);
            }
            println!("{}", yansi::Paint::new(summary).green());
        }
        Commands::Roles { target } => {
            let target = resolve_target(target);
            let client = build_client().await.unwrap_or_else(|e| fail(e));
            let workspace = client.get_workspace(&target).await.unwrap_or_else(|e| fail(e));
            let definitions = client
                .list_role_definitions(&workspace.id)
                .await
                .unwrap_or_else(|e| fail(e));

            let mut table = new_table();
            table.set_header(vec!["Role", "Type", "ID"]);
            for d in &definitions {
                table.add_row(vec![
                    d.role_name.clone(),
                    d.role_type.clone().unwrap_or_default(),
                    d.id.clone(),
                ]);
            }
            println!("\n{table}");
        }
        Commands::CheckConfig { env_file } => {
            config::load_env_file(env_file.as_deref());
            let target = WorkspaceTarget::resolve(None, None, None);
            println!("{}", yansi::Paint::new("setting\tvalue").bold().underline());
            println!("subscription_id\t{}", target.subscription_id);
            println!("resource_group\t{}", target.resource_group);
            println!("workspace_name\t{}", target.workspace_name);
            println!("resource_manager\t{}", config::get_resource_manager_url());

            let mut ok = true;
            if let Err(e) = target.validate() {
                eprintln!("{}", yansi::Paint::new(e.to_string()).red());
                ok = false;
            }
            if let Err(e) = config::get_failure_policy() {
                eprintln!("{}", yansi::Paint::new(e.to_string()).red());
                ok = false;
            }
            match DefaultCredential::from_env() {
                Ok(credential) => {
                    println!("credential_sources\t{}", credential.source_names().join(", "));
                    if let Err(e) = credential.get_token(MANAGEMENT_SCOPE).await {
                        eprintln!("{}", yansi::Paint::new(e.to_string()).red());
                        ok = false;
                    }
                }
                Err(e) => {
                    eprintln!("{}", yansi::Paint::new(e.to_string()).red());
                    ok = false;
                }
            }
            if !ok {
                process::exit(1);
            }
            println!("{}", yansi::Paint::new("Configuration looks valid (token acquired)").green());
        }
    }
}
