use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use storefront_session::{
    spawn_logout_watcher, ApiClient, ClientConfig, Realm, SessionContext, SessionEvent,
};

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront session client")]
struct AppCli {
    /// Authenticate against the admin realm
    #[arg(long, global = true)]
    admin: bool,

    /// API origin (overrides STOREFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// State directory (overrides STOREFRONT_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login { email: String, password: String },
    /// Validate the stored session and print the identity
    Me,
    /// End the session
    Logout {
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Show or install the raw session token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// GET an API path with the session attached
    Get { path: String },
    /// Restore the session, then print lifecycle events until logout
    Watch,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print the current token
    Show,
    /// Install a token into all mirrors (login happened elsewhere)
    Set { value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    storefront_session::utils::logging::init();

    let args = AppCli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url.as_deref() {
        config.base_url = url.parse().context("parsing --api-url")?;
    }
    if let Some(dir) = args.state_dir {
        config = config.with_state_dir(dir);
    }
    if args.admin {
        config = config.with_realm(Realm::Admin);
    }

    let session = SessionContext::builder(config).build()?;
    let client = ApiClient::new(&session);

    match args.command {
        Commands::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            println!("logged in as {} <{}>", user.name, user.email);
        }
        Commands::Me => match client.restore_session().await? {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("no active session"),
        },
        Commands::Logout { force } => {
            if force {
                session.force_logout().await;
            } else if !session.logout().await {
                println!("logout cancelled");
                return Ok(());
            }
            println!("logged out");
        }
        Commands::Token { action } => match action {
            TokenAction::Show => match session.token().await {
                Some(token) => println!("{token}"),
                None => println!("no token stored"),
            },
            TokenAction::Set { value } => {
                session.set_token(&value).await?;
                println!("token installed");
            }
        },
        Commands::Get { path } => {
            let response = client.get(&path).await?;
            println!("{}", response.text());
        }
        Commands::Watch => watch(&session, &client).await?,
    }

    Ok(())
}

/// Small interactive shell: keeps the session context alive, converges
/// on peer logouts, and prints lifecycle events as they happen.
async fn watch(session: &SessionContext, client: &ApiClient) -> Result<()> {
    spawn_logout_watcher(session);
    let mut events = session.subscribe();

    if client.restore_session().await?.is_none() {
        println!("no active session");
        return Ok(());
    }

    info!("watching session events (Ctrl+C to log out)");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.logout().await;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Restored { user }) => {
                    println!("session restored for {} <{}>", user.name, user.email);
                }
                Ok(SessionEvent::LoggedOut { reason, redirect }) => {
                    println!("logged out ({reason:?}); redirect to site root: {redirect}");
                    break;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
