mod file_store;

use std::path::PathBuf;
use std::rc::Rc;

use authgate::api::http::HttpAuthApi;
use authgate::config::{ApiConfig, ConfigError};
use authgate::flows::{self, SigninForm, SignupForm};
use authgate::{
    ApiError, AuthApi, CredentialStore, GuardState, Navigator, RefreshPolicy, RouteGuard, SessionError,
    SessionSnapshot, SessionState, TokenRefresher,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::file_store::{DEFAULT_STORE_FILE, FileBackend};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session invalid: {0}")]
    SessionInvalid(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Session manager CLI for the LP API")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Overrides AUTHGATE_API_BASE_URL from the environment config.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "AUTHGATE_STORE", default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    /// `independent` or `single_flight`.
    #[arg(long)]
    refresh_policy: Option<RefreshPolicy>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signin(CredentialsArgs),
    Signup(SignupArgs),
    Signout,
    /// Print the stored session without contacting the server.
    Status,
    /// Run one route-guard evaluation against the protected endpoint.
    Verify,
    Refresh,
    Profile(ProfileCommand),
}

#[derive(Args, Debug)]
struct CredentialsArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[command(flatten)]
    credentials: CredentialsArgs,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        name: String,
        #[arg(long)]
        bio: Option<String>,
    },
}

struct CliContext {
    session: SessionState,
    refresher: TokenRefresher,
}

impl CliContext {
    fn build(global: GlobalArgs) -> Result<Self, CliError> {
        let mut config = ApiConfig::from_env()?;
        if let Some(base_url) = global.base_url {
            config.base_url = base_url;
        }
        if let Some(policy) = global.refresh_policy {
            config.refresh_policy = policy;
        }
        tracing::debug!(base_url = %config.base_url, policy = config.refresh_policy.as_str(), "cli config");

        let api: Rc<dyn AuthApi> = Rc::new(HttpAuthApi::new(&config)?);
        let store = CredentialStore::new(FileBackend::new(global.store));
        let refresher = TokenRefresher::new(api.clone(), store.clone()).with_policy(config.refresh_policy);
        let session = SessionState::new(store, api);
        Ok(Self { session, refresher })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();
    let ctx = CliContext::build(cli.global)?;

    match cli.command {
        Command::Signin(args) => run_signin(&ctx, args).await,
        Command::Signup(args) => run_signup(&ctx, args).await,
        Command::Signout => {
            ctx.session.logout().await;
            print_snapshot(&ctx.session.snapshot())
        }
        Command::Status => print_snapshot(&ctx.session.snapshot()),
        Command::Verify => run_verify(&ctx).await,
        Command::Refresh => {
            ctx.refresher.refresh().await?;
            eprintln!("token pair refreshed");
            Ok(())
        }
        Command::Profile(profile) => run_profile(&ctx, profile).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Navigation target printed to stderr; the CLI has no views to switch.
fn print_navigation(path: &str) {
    eprintln!("-> {path}");
}

async fn run_signin(ctx: &CliContext, args: CredentialsArgs) -> Result<(), CliError> {
    let form = SigninForm { email: args.email, password: args.password };
    flows::signin(&ctx.session, &form, &print_navigation).await?;
    print_snapshot(&ctx.session.snapshot())
}

async fn run_signup(ctx: &CliContext, args: SignupArgs) -> Result<(), CliError> {
    // A single --password argument stands in for the confirmation field.
    let form = SignupForm {
        email: args.credentials.email,
        password_confirmation: args.credentials.password.clone(),
        password: args.credentials.password,
        name: args.name,
    };
    flows::signup_then_signin(&ctx.session, &form, &print_navigation).await?;
    print_snapshot(&ctx.session.snapshot())
}

async fn run_verify(ctx: &CliContext) -> Result<(), CliError> {
    let navigator: Rc<dyn Navigator> = Rc::new(print_navigation);
    let guard = RouteGuard::for_session(&ctx.session, ctx.refresher.clone(), navigator);
    let state = guard.evaluate().await;
    if let Some(notice) = state.notice() {
        eprintln!("{notice}");
    }
    match state {
        GuardState::Valid { .. } => {
            println!("valid");
            Ok(())
        }
        GuardState::Invalid(reason) => Err(CliError::SessionInvalid(reason.notice())),
        GuardState::Verifying => Err(CliError::SessionInvalid("verification did not complete")),
    }
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Show => {
            let profile = flows::load_profile(&ctx.session).await?;
            print_json(&serde_json::to_value(profile)?)
        }
        ProfileSubcommand::Update { name, bio } => {
            flows::save_profile(&ctx.session, &name, bio.as_deref()).await?;
            print_snapshot(&ctx.session.snapshot())
        }
    }
}

fn snapshot_json(snapshot: &SessionSnapshot) -> Value {
    serde_json::json!({
        "isLoggedIn": snapshot.is_logged_in,
        "userName": snapshot.user_name,
        "userId": snapshot.user_id,
    })
}

fn print_snapshot(snapshot: &SessionSnapshot) -> Result<(), CliError> {
    print_json(&snapshot_json(snapshot))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;
