use clap::Parser;
use dotenvy::dotenv;
use log::info;
use shop_server::{
    cli::{create_admin, display_envs, Arguments, Command},
    config::ServerConfig,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let config = ServerConfig::from_env_or_default();
    let result = match args.command() {
        Command::Serve => {
            info!("🚀️ Starting server on {}:{}", config.host, config.port);
            run_server(config).await
        },
        Command::CreateAdmin { email, password } => create_admin(&config, &email, &password).await,
        Command::Env => {
            display_envs();
            Ok(())
        },
    };
    match result {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
