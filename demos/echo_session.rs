//! Echo Session Example
//!
//! Runs the full tutoring chain against the offline echo backend, printing each
//! section as it completes. No API key or network access is needed.
//!
//! Run with: cargo run -p demos --bin echo_session [-- demos/tutor.toml]

use config_loader::ConfigLoader;
use contracts::TutorConfig;
use futures::StreamExt;
use llm_client::EchoGenerator;
use orchestrator::{Pipeline, PipelineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading tutor config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        TutorConfig::default()
    };

    let generator = EchoGenerator::new();
    let pipeline = Pipeline::new(generator.clone(), PipelineConfig::from(&config))?;

    let mut sections = Box::pin(pipeline.run(config.session.clone()));
    while let Some(section) = sections.next().await {
        let section = section?;
        println!("Section {}: {}", section.index, section.title);
        println!("{}\n", section.text);
    }

    for request in generator.calls() {
        println!("--- {} prompt ({} chars) ---", request.stage, request.prompt.len());
        println!("{}", request.prompt);
    }

    Ok(())
}
