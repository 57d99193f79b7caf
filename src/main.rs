use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gsaml::app::{self, LoginRequest};
use gsaml::config::{default_config_path, Config};
use gsaml::models::Arn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gsaml")]
#[command(about = "Sign in through Google Workspace SAML and store temporary AWS credentials")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Default)]
struct SignInArgs {
    /// Google identity provider id (idpid)
    #[arg(long)]
    idp_id: Option<String>,

    /// Google service provider id (spid)
    #[arg(long)]
    sp_id: Option<String>,

    /// Account email
    #[arg(short, long)]
    username: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in, assume a role and write its credentials (default)
    Login {
        #[command(flatten)]
        sign_in: SignInArgs,

        /// Profile to write in the shared credentials file
        #[arg(short, long)]
        profile: Option<String>,

        /// Role ARN to assume without asking
        #[arg(short, long)]
        role: Option<Arn>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in and list the roles offered
    Roles {
        #[command(flatten)]
        sign_in: SignInArgs,

        /// Print roles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,gsaml=debug"
    } else {
        "warn,gsaml=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();
}

fn request(sign_in: SignInArgs, profile: Option<String>, role_arn: Option<Arn>) -> LoginRequest {
    LoginRequest {
        idp_id: sign_in.idp_id,
        sp_id: sign_in.sp_id,
        username: sign_in.username,
        profile,
        role_arn,
        origin: None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load gsaml config: {}", cli.config.display()))?;
    let config_dir = cli
        .config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let command = cli.command.unwrap_or(Command::Login {
        sign_in: SignInArgs::default(),
        profile: None,
        role: None,
        json: false,
    });

    match command {
        Command::Login {
            sign_in,
            profile,
            role,
            json,
        } => {
            let output = app::login(&config, config_dir, &request(sign_in, profile, role)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "Wrote profile [{}] to {} for {}",
                    output.profile, output.credentials_file, output.role_arn
                );
                if let Some(expiration) = &output.expiration {
                    println!("Credentials expire at {expiration}");
                }
            }
        }
        Command::Roles { sign_in, json } => {
            let roles = app::list_roles(&config, &request(sign_in, None, None)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&roles)?);
            } else {
                for role in &roles {
                    println!("{}\t{}", role.label(), role.arn);
                }
            }
        }
        Command::Config => {
            let output = app::config_output(&config, &cli.config)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
