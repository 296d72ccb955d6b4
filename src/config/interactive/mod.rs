
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, LlamaConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 localrag Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Generation Configuration").bold().yellow());
    eprintln!("Configure the llama.cpp server used for answer generation.");
    eprintln!();

    configure_llama(&mut config.llama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_connection(&config.ollama.protocol, &config.ollama.host, config.ollama.port)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    if test_connection(&config.llama.protocol, &config.llama.host, config.llama.port)? {
        eprintln!("{}", style("✓ llama.cpp server connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to the llama.cpp server").yellow()
        );
        eprintln!("You can continue, but make sure it is running before asking questions.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = config
            .config_file_path()
            .context("Failed to get config file path")?;
        eprintln!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding (Ollama):").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Generation (llama.cpp):").bold().yellow());
    eprintln!("  Host: {}", style(&config.llama.host).cyan());
    eprintln!("  Port: {}", style(config.llama.port).cyan());
    eprintln!(
        "  Context Window: {}",
        style(config.llama.context_window).cyan()
    );
    eprintln!(
        "  Reserved Output Tokens: {}",
        style(config.llama.reserved_output_tokens).cyan()
    );
    eprintln!(
        "  Safety Margin Tokens: {}",
        style(config.llama.safety_margin_tokens).cyan()
    );
    eprintln!("  Temperature: {}", style(config.llama.temperature).cyan());
    eprintln!("  Top-p: {}", style(config.llama.top_p).cyan());
    eprintln!("  Stop: {:?}", config.llama.stop);

    let config_path = config
        .config_file_path()
        .context("Failed to get config file path")?;
    eprintln!();
    eprintln!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: base_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    ollama.protocol = protocols[protocol_index].to_string();

    ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.batch_size = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.embedding_dimension = Input::new()
        .with_prompt("Embedding dimension (must match the model)")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.validate()?;
    Ok(())
}

fn configure_llama(llama: &mut LlamaConfig) -> Result<()> {
    llama.host = Input::new()
        .with_prompt("llama.cpp server host")
        .default(llama.host.clone())
        .interact_text()?;

    llama.port = Input::new()
        .with_prompt("llama.cpp server port")
        .default(llama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    llama.context_window = Input::new()
        .with_prompt("Model context window (tokens)")
        .default(llama.context_window)
        .interact_text()?;

    llama.reserved_output_tokens = Input::new()
        .with_prompt("Tokens reserved for the generated answer")
        .default(llama.reserved_output_tokens)
        .interact_text()?;

    llama.temperature = Input::new()
        .with_prompt("Sampling temperature")
        .default(llama.temperature)
        .interact_text()?;

    llama.top_p = Input::new()
        .with_prompt("Nucleus sampling threshold (top_p)")
        .default(llama.top_p)
        .interact_text()?;

    llama.validate()?;
    Ok(())
}

fn test_connection(protocol: &str, host: &str, port: u16) -> Result<bool> {
    let url = format!("{protocol}://{host}:{port}/");

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
