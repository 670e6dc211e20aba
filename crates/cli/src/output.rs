//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format probability as percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Human-readable outcome for a class label
pub fn label_text(label: u8) -> &'static str {
    if label == 1 {
        "will renew"
    } else {
        "will not renew"
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color probability of renewal
pub fn color_probability(probability: f64) -> String {
    let formatted = format_probability(probability);
    if probability >= 0.5 {
        formatted.green().to_string()
    } else if probability >= 0.2 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
