//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sdesk_core::{Config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "sdesk")]
#[command(version)]
#[command(about = "Service desk terminal client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with e-mail and password
    Login {
        /// Account e-mail (prompted when omitted)
        #[arg(long)]
        email: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "SDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the current session
    Logout {
        /// Also notify the backend (best effort)
        #[arg(long)]
        remote: bool,
    },

    /// Show the logged-in user
    Whoami,

    /// Request a password reset e-mail
    ForgotPassword {
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Print the navigation menu for the current role
    Menu,

    /// Print the dashboard for the current role
    Dashboard,

    /// Manage companies
    Companies {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Company fields for create and update.
#[derive(clap::Args, Debug, Clone)]
pub struct CompanyArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    /// CPF or CNPJ, punctuation optional
    #[arg(long)]
    pub cnpj: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    /// Mark the company inactive
    #[arg(long)]
    pub inactive: bool,
}

/// Project fields for create and update.
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Owning company (defaults to your own company)
    #[arg(long, value_name = "ID")]
    pub company: Option<u64>,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: String,
    /// Hourly rate, e.g. `150`, `150,50` or `R$ 1.200,00`
    #[arg(long, value_name = "VALUE")]
    pub hourly_rate: String,
    /// Mark the project inactive
    #[arg(long)]
    pub inactive: bool,
}

#[derive(clap::Subcommand)]
enum CompanyCommands {
    /// List companies
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a company
    Show {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// Create a company
    Create(CompanyArgs),
    /// Update a company
    Update {
        #[arg(value_name = "ID")]
        id: u64,
        #[command(flatten)]
        fields: CompanyArgs,
    },
    /// Delete a company
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// List a company's projects
    Projects {
        #[arg(value_name = "ID")]
        id: u64,
    },
}

#[derive(clap::Subcommand)]
enum ProjectCommands {
    /// List projects
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
        /// Only projects of this company
        #[arg(long, value_name = "ID")]
        company: Option<u64>,
        /// Include inactive projects
        #[arg(long)]
        inactive: bool,
    },
    /// Show a project
    Show {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// Create a project
    Create(ProjectArgs),
    /// Update a project
    Update {
        #[arg(value_name = "ID")]
        id: u64,
        #[command(flatten)]
        fields: ProjectArgs,
    },
    /// Delete a project
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// Activate or deactivate a project
    Toggle {
        #[arg(value_name = "ID")]
        id: u64,
    },
    /// List a project's tickets
    Tickets {
        #[arg(value_name = "ID")]
        id: u64,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// open, in_progress, resolved or closed
        #[arg(long)]
        status: Option<String>,
    },
    /// Show hours and cost per month
    CostReport {
        #[arg(value_name = "ID")]
        id: u64,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Set the backend API base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands must work even when the config file is broken.
    if let Some(Commands::Config { command }) = cli.command {
        return config_command(command);
    }

    let config = Config::load().context("load config")?;

    let Some(command) = cli.command else {
        return commands::interactive::run(&config).await;
    };

    logging::init_stderr(&config.log);
    let auth = commands::open_auth(&config)?;
    tracing::debug!(
        base_url = %auth.client().base_url(),
        authenticated = auth.session().is_authenticated(),
        "dispatching command"
    );

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(&auth, email, password).await
        }
        Commands::Logout { remote } => commands::auth::logout(&auth, remote).await,
        Commands::Whoami => commands::auth::whoami(&auth),
        Commands::ForgotPassword { email } => commands::auth::forgot_password(&auth, &email).await,
        Commands::Menu => commands::navigation::menu(&auth),
        Commands::Dashboard => commands::navigation::dashboard(&auth),

        Commands::Companies { command } => match command {
            CompanyCommands::List { page, search } => {
                commands::companies::list(&auth, &config, page, search).await
            }
            CompanyCommands::Show { id } => commands::companies::show(&auth, id).await,
            CompanyCommands::Create(fields) => commands::companies::create(&auth, &fields).await,
            CompanyCommands::Update { id, fields } => {
                commands::companies::update(&auth, id, &fields).await
            }
            CompanyCommands::Delete { id } => commands::companies::delete(&auth, id).await,
            CompanyCommands::Projects { id } => commands::companies::projects(&auth, id).await,
        },

        Commands::Projects { command } => match command {
            ProjectCommands::List {
                page,
                search,
                company,
                inactive,
            } => {
                let filter = commands::projects::ListFilter {
                    page,
                    search,
                    company,
                    inactive,
                };
                commands::projects::list(&auth, &config, filter).await
            }
            ProjectCommands::Show { id } => commands::projects::show(&auth, id).await,
            ProjectCommands::Create(fields) => commands::projects::create(&auth, &fields).await,
            ProjectCommands::Update { id, fields } => {
                commands::projects::update(&auth, id, &fields).await
            }
            ProjectCommands::Delete { id } => commands::projects::delete(&auth, id).await,
            ProjectCommands::Toggle { id } => commands::projects::toggle(&auth, id).await,
            ProjectCommands::Tickets { id, page, status } => {
                commands::projects::tickets(&auth, &config, id, page, status).await
            }
            ProjectCommands::CostReport { id, from, to } => {
                commands::projects::cost_report(&auth, id, from, to).await
            }
        },

        Commands::Config { command } => config_command(command),
    }
}

fn config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
        ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
    }
}
