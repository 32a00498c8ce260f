//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{StageDefinition, TutorConfig};
use orchestrator::{tutor_stages, PipelineConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    backend: BackendInfo,
    session: Vec<ParamInfo>,
    stages: Vec<StageInfo>,
}

#[derive(Serialize)]
struct BackendInfo {
    base_url: String,
    api_key_env: String,
    model: String,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stage_timeout_secs: u64,
}

#[derive(Serialize)]
struct ParamInfo {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct StageInfo {
    index: usize,
    name: String,
    title: String,
    required_inputs: Vec<String>,
    output_key: String,
    model: String,
    temperature: f64,
    has_system_prompt: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if let Some(ref path) = args.config {
        info!(config = %path.display(), "Loading configuration info");
    }
    let config = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let info = build_config_info(&config, &tutor_stages());

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &TutorConfig, stages: &[StageDefinition]) -> ConfigInfo {
    let pipeline_config = PipelineConfig::from(config);

    ConfigInfo {
        version: format!("{:?}", config.version),
        backend: BackendInfo {
            base_url: config.backend.base_url.clone(),
            api_key_env: config.backend.api_key_env.clone(),
            model: config.backend.model.clone(),
            temperature: config.backend.temperature,
            max_tokens: config.backend.max_tokens,
            stage_timeout_secs: config.backend.stage_timeout_secs,
        },
        session: config
            .session
            .iter()
            .map(|(name, value)| ParamInfo {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
        stages: stages
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                let (model, temperature, _) = pipeline_config.settings_for(&stage.name);
                StageInfo {
                    index: i + 1,
                    name: stage.name.clone(),
                    title: stage.title.clone(),
                    required_inputs: stage.required_inputs.clone(),
                    output_key: stage.output_key.clone(),
                    model,
                    temperature,
                    has_system_prompt: stage.system_template.is_some(),
                }
            })
            .collect(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Tutor Chain Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔌 Backend");
    println!("   ├─ Endpoint: {}", info.backend.base_url);
    println!("   ├─ Credential: ${}", info.backend.api_key_env);
    println!("   ├─ Model: {}", info.backend.model);
    println!("   ├─ Temperature: {}", info.backend.temperature);
    if let Some(max_tokens) = info.backend.max_tokens {
        println!("   ├─ Max tokens: {}", max_tokens);
    }
    println!("   └─ Stage timeout: {}s", info.backend.stage_timeout_secs);

    println!("\n🎓 Session");
    let last = info.session.len().saturating_sub(1);
    for (i, param) in info.session.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        println!("   {} {}: {}", branch, param.name, param.value);
    }

    println!("\n🔗 Stages ({})", info.stages.len());
    for stage in &info.stages {
        println!(
            "   {}. {} ({}) -> {}",
            stage.index, stage.name, stage.title, stage.output_key
        );
        println!("      ├─ Inputs: {}", stage.required_inputs.join(", "));
        let system = if stage.has_system_prompt {
            ", system prompt"
        } else {
            ""
        };
        println!(
            "      └─ Model: {} @ {}{}",
            stage.model, stage.temperature, system
        );
    }

    println!();
}
