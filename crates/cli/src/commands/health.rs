//! Service health CLI command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_warning, OutputFormat};

/// Row for the component table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failures")]
    consecutive_failures: u32,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show service banner and component health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let banner = client.banner().await?;
    let (_, health) = client.health().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&health)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", banner.message.bold());
            println!("{}", "=".repeat(60));
            println!("Status: {}", color_status(health.status.as_str()));
            println!();

            if health.components.is_empty() {
                print_warning("No components registered");
                return Ok(());
            }

            let mut components: Vec<_> = health.components.into_iter().collect();
            components.sort_by(|a, b| a.0.cmp(&b.0));

            let mut rows = Vec::with_capacity(components.len());
            for (name, component) in components {
                rows.push(ComponentRow {
                    name,
                    status: color_status(component.status.as_str()),
                    consecutive_failures: component.consecutive_failures,
                    checksum: component
                        .checksum
                        .map(|c| c.chars().take(12).collect())
                        .unwrap_or_else(|| "-".to_string()),
                    message: component.message.unwrap_or_else(|| "-".to_string()),
                });
            }

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
