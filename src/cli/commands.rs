use anyhow::{Context, Result};
use colored::Colorize;
use futures::future::join;

use crate::{
    app::{get_config_dir, init_config, Config},
    backend::GatewayFactory,
    constants::{CRISIS_LINE_DISPLAY, HIGH_CONFIDENCE_THRESHOLD},
    models::{Category, MentalHealthResource, SentimentReport, Severity},
};

use super::Commands;

/// Handle CLI subcommands
///
/// Returns `false` when the caller should go on to the chat interface.
pub async fn handle_command(command: &Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing Solace configuration...");
            let written = init_config()?;
            for path in &written {
                println!("  {} {}", "wrote".green(), path.display());
            }
            if written.is_empty() {
                println!("Configuration already present, nothing written.");
            } else {
                println!("Configuration initialized successfully!");
            }
            Ok(true)
        }
        Commands::Resources => {
            list_resources(config).await?;
            Ok(true)
        }
        Commands::Conversations => {
            list_conversations(config).await?;
            Ok(true)
        }
        Commands::Analyze { text } => {
            analyze(config, text).await?;
            Ok(true)
        }
        Commands::Health => {
            show_health(config).await?;
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Chat => Ok(false),
    }
}

/// Print the resource catalogue, crisis resources first
pub async fn list_resources(config: &Config) -> Result<()> {
    let gateway = GatewayFactory::create(config)?;
    let mut resources = gateway
        .get_resources()
        .await
        .context("Failed to load resources")?;
    resources.sort_by_key(|r| !r.is_crisis_resource);

    println!("Support resources:");
    for resource in &resources {
        println!("{}", format_resource(resource));
    }
    println!();
    println!("In crisis? {}", CRISIS_LINE_DISPLAY.red().bold());
    Ok(())
}

fn format_resource(resource: &MentalHealthResource) -> String {
    let title = if resource.is_crisis_resource {
        resource.title.red().bold().to_string()
    } else {
        resource.title.bold().to_string()
    };
    let mut line = format!("  • {} [{}]", title, resource.resource_type.label());
    if let Some(phone) = &resource.phone_number {
        line.push_str(&format!(" {}", phone.yellow()));
    }
    if let Some(url) = &resource.url {
        line.push_str(&format!(" {}", url.cyan()));
    }
    line.push_str(&format!("\n      {}", resource.description));
    line
}

/// Print stored conversations, newest first
pub async fn list_conversations(config: &Config) -> Result<()> {
    let gateway = GatewayFactory::create(config)?;
    let conversations = gateway
        .get_conversations()
        .await
        .context("Failed to load conversations")?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    for conversation in &conversations {
        let marker = if conversation.is_active {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!("  {} {}", marker, conversation.summary());
    }
    Ok(())
}

/// Run standalone sentiment analysis and print the report
pub async fn analyze(config: &Config, text: &str) -> Result<()> {
    let gateway = GatewayFactory::create(config)?;
    let report = gateway
        .analyze_sentiment(text)
        .await
        .context("Sentiment analysis failed")?;
    print!("{}", format_report(&report));
    Ok(())
}

fn format_report(report: &SentimentReport) -> String {
    let severity = match report.severity {
        Severity::High => "high".red().bold(),
        Severity::Medium => "medium".yellow(),
        Severity::Low => "low".green(),
        Severity::Other => "unknown".dimmed(),
    };
    let confidence = format!("{:.0}%", report.confidence * 100.0);
    let confidence = if report.confidence > HIGH_CONFIDENCE_THRESHOLD {
        confidence.bold()
    } else {
        confidence.normal()
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Sentiment:  {:?} ({:+.2})\n",
        report.sentiment.label, report.sentiment.compound
    ));
    out.push_str(&format!("Category:   {:?}\n", report.category));
    out.push_str(&format!("Severity:   {}\n", severity));
    out.push_str(&format!("Confidence: {}\n", confidence));
    if !report.keywords.is_empty() {
        let keywords: Vec<&str> = report.keywords.iter().map(|k| k.keyword.as_str()).collect();
        out.push_str(&format!("Keywords:   {}\n", keywords.join(", ")));
    }
    if report.crisis_detected || report.category == Category::Crisis {
        out.push_str(&format!(
            "\n{} {}\n",
            "Possible crisis detected.".red().bold(),
            CRISIS_LINE_DISPLAY
        ));
    }
    out
}

/// Show version information
pub fn show_version() {
    println!("Solace v{}", env!("CARGO_PKG_VERSION"));
    println!("   Terminal client for the Solace support chat");
}

/// Report backend health, resource availability and local configuration
async fn show_health(config: &Config) -> Result<()> {
    println!("Solace Status:");
    println!();

    let gateway = GatewayFactory::create(config)?;
    let (health, resources) = join(gateway.health_check(), gateway.get_resources()).await;

    match health {
        Ok(status) if status.is_healthy() => {
            println!("  [OK] Backend: {} ({})", config.api.base_url, status.status.green());
            if let Some(ai) = &status.ai_service {
                println!("  [OK] AI service: {}", ai);
            }
            if !status.features.is_empty() {
                println!("      Features: {}", status.features.join(", "));
            }
        }
        Ok(status) => {
            println!(
                "  [WARNING] Backend: {} reported '{}'",
                config.api.base_url,
                status.status.yellow()
            );
        }
        Err(err) => {
            println!("  [ERROR] Backend: {} unreachable", config.api.base_url);
            println!("      {}", err.to_string().red());
        }
    }

    match resources {
        Ok(list) => println!("  [OK] Resources: {} available", list.len()),
        Err(err) => println!("  [WARNING] Resources: {}", err),
    }

    let config_path = get_config_dir()?.join("config.toml");
    if config_path.exists() {
        println!("  [OK] Configuration: {}", config_path.display());
    } else {
        println!("  [WARNING] Configuration: Not found (using defaults)");
    }

    println!();
    Ok(())
}
