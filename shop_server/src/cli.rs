use std::{env, env::VarError};

use clap::{Parser, Subcommand};
use log::*;
use shop_engine::{AccountApi, SqliteDatabase};

use crate::{
    config::{ServerConfig, DISPLAY_ENVS},
    errors::ServerError,
};

#[derive(Parser, Debug)]
#[command(version, about = "The storefront server")]
pub struct Arguments {
    /// What to do. Runs the server when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "serve", about = "Run the HTTP server")]
    Serve,
    #[clap(name = "create-admin", about = "Create an admin account in the configured database")]
    CreateAdmin {
        #[arg(short = 'e', long = "email")]
        email: String,
        /// Read from SHOP_ADMIN_PASSWORD when not given, so that it stays out of the shell history
        #[arg(short = 'p', long = "password", env = "SHOP_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    #[clap(name = "env", about = "Print the current configuration (secrets excluded)")]
    Env,
}

impl Arguments {
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

pub async fn create_admin(config: &ServerConfig, email: &str, password: &str) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 1).await?;
    db.migrate().await?;
    let api = AccountApi::new(db.clone());
    let user = api.create_admin(email, password).await.map_err(|e| {
        error!("🪛️ Could not create the admin account. {e}");
        ServerError::from(e)
    })?;
    println!("Admin account {} created with id {}", user.email, user.user_id);
    db.close().await;
    Ok(())
}

pub fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let redis = if env::var("SHOP_REDIS_URL").is_ok() { "Set (hidden)" } else { "Not set" };
    println!("  {:<35} {redis:<15}", "SHOP_REDIS_URL");
}
