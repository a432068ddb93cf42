//! `nearbot ask` — Run one question through the pipeline.
//!
//! Uses the same component wiring as the gateway; the client address is the
//! loopback, so location resolves to the configured default without a
//! network call.

use nearbot_config::AppConfig;
use nearbot_core::chat::ChatMessage;
use nearbot_orchestrator::AskRequest;

pub async fn run(question: String, sources: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state = nearbot_gateway::build_state(&config);

    let response = state
        .orchestrator
        .handle(AskRequest {
            messages: vec![ChatMessage::user(question)],
            include_sources: sources,
            max_sources: None,
            client_addr: "127.0.0.1".parse().expect("loopback address parses"),
        })
        .await;

    println!("{}", response.choices[0].message.content);

    if let Some(sources) = &response.sources {
        println!();
        println!("Sources:");
        for source in sources {
            println!("  - {} ({})", source.title, source.url);
        }
    }

    if let Some(error) = &response.error {
        eprintln!("warning: {error}");
    }

    Ok(())
}
