// quiz-api-rs/src/main.rs
// Quiz API - question generation and answer scoring over OpenAI chat completions
// HTTP entry point for the quiz frontend

use std::sync::Arc;

use quiz_api::openai_client::{OpenAIClient, OpenAIConfig};
use quiz_api::QuizApi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Use standardized configuration for the bind address
    let addr = config_rs::get_bind_address("QUIZ_API", 8080);

    // Credentials are resolved once here and passed into the client; a
    // missing key fails startup instead of the first request.
    let config = OpenAIConfig::from_env()?;
    let client = OpenAIClient::new(config);
    log::info!(
        "Using OpenAI endpoint: {} (model: {})",
        client.api_url(),
        client.model()
    );

    let api = Arc::new(QuizApi::new(client));
    let app = api.create_router();

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Quiz API starting on {}", addr);
    println!("Quiz API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
