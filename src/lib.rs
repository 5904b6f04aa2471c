pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;

use cli::Args;
use config::prompt::load_system_prompt;
use llm::LlmConfig;
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("(default)"));
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("(default)"));
    info!("System Prompt Path: {}", args.system_prompt_path.as_deref().unwrap_or("(built-in)"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let system_prompt = load_system_prompt(args.system_prompt_path.as_deref())?;

    let llm_config = LlmConfig {
        api_key: if args.chat_api_key.is_empty() {
            None
        } else {
            Some(args.chat_api_key.clone())
        },
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };
    let client = llm::chat::new_client(&llm_config)?;
    info!("Chat model: {}", client.get_model());

    let addr = args.server_addr.clone();
    let server = Server::new(addr, client, system_prompt, args);
    server.run().await?;

    Ok(())
}
