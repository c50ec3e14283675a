//! Hospital Administration CLI
//!
//! Maintenance tasks that run against the database directly: creating the
//! first administrator, approving staff accounts and purging expired OTPs.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;

use hospital_service::{
    app::{build_container, keys, Infrastructure},
    config::AppConfig,
    models::{Designation, RegisterRequest},
};

/// Hospital service administration CLI
#[derive(Parser)]
#[command(
    name = "hospital-admin",
    about = "Hospital service administration CLI",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a verified, approved administrator account
    CreateAdmin(CreateAdminArgs),
    /// Approve a pending staff account
    Approve(ApproveArgs),
    /// Delete expired OTP records
    CleanupOtps,
}

#[derive(Clone, Copy, ValueEnum)]
enum DesignationArg {
    Doctor,
    Nurse,
    Staff,
}

impl From<DesignationArg> for Designation {
    fn from(arg: DesignationArg) -> Self {
        match arg {
            DesignationArg::Doctor => Designation::Doctor,
            DesignationArg::Nurse => Designation::Nurse,
            DesignationArg::Staff => Designation::Staff,
        }
    }
}

#[derive(Args)]
struct CreateAdminArgs {
    /// Full name
    #[arg(short, long)]
    name: String,

    /// 10-digit mobile number
    #[arg(short, long)]
    mobile: String,

    /// Email address
    #[arg(short, long)]
    email: String,

    /// Password (8 to 72 characters)
    #[arg(short, long)]
    password: String,

    #[arg(short, long, value_enum, default_value = "doctor")]
    designation: DesignationArg,
}

#[derive(Args)]
struct ApproveArgs {
    /// Id of the account to approve
    user_id: i64,

    /// Id of the approving administrator
    #[arg(long)]
    admin_id: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    let database_pool = config
        .database
        .create_pool()
        .await
        .context("connecting to the database")?;

    // Run migrations to ensure database is up to date
    sqlx::migrate!("./migrations")
        .run(&database_pool)
        .await
        .context("running migrations")?;

    let infrastructure = Infrastructure::postgres(database_pool, config.email.as_ref())
        .context("configuring the mailer")?;
    let container = build_container(config, infrastructure);

    match cli.command {
        Commands::CreateAdmin(args) => {
            let auth = container.resolve(keys::AUTH_SERVICE)?;
            let admin = auth
                .create_verified_admin(RegisterRequest {
                    name: args.name,
                    mobile: args.mobile,
                    email: args.email,
                    designation: args.designation.into(),
                    password: args.password,
                })
                .await
                .context("creating administrator")?;

            println!("Administrator created");
            println!("   ID: {}", admin.id);
            println!("   Name: {}", admin.name);
            println!("   Email: {}", admin.email);
            println!("   Mobile: {}", admin.mobile);
        }
        Commands::Approve(args) => {
            let auth = container.resolve(keys::AUTH_SERVICE)?;
            let user = auth
                .approve_user(args.admin_id, args.user_id)
                .await
                .with_context(|| format!("approving user {}", args.user_id))?;

            println!("Approved {} ({}), approved by {}", user.name, user.email, args.admin_id);
        }
        Commands::CleanupOtps => {
            let otp = container.resolve(keys::OTP_SERVICE)?;
            let removed = otp.cleanup_expired().await?;

            println!("Removed {} expired OTP records", removed);
        }
    }

    Ok(())
}
