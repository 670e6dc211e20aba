//! Prediction CLI commands

use anyhow::Result;
use colored::Colorize;
use renewal_lib::{ModelChoice, PolicyAttributes, PredictionResult};
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_probability, label_text, print_info, print_success, print_table, print_warning,
    OutputFormat,
};
use crate::PolicyArgs;

/// Row for the comparison table
#[derive(Tabled, Serialize)]
struct ComparisonRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Prediction")]
    prediction: u8,
    #[tabled(rename = "Outcome")]
    #[serde(skip)]
    outcome: String,
    #[tabled(rename = "Probability")]
    #[serde(skip)]
    probability_text: String,
    #[tabled(skip)]
    probability: f64,
}

impl From<&PredictionResult> for ComparisonRow {
    fn from(result: &PredictionResult) -> Self {
        Self {
            model: result.model.to_string(),
            prediction: result.label,
            outcome: label_text(result.label).to_string(),
            probability_text: color_probability(result.probability),
            probability: result.probability,
        }
    }
}

/// Request a single prediction
pub async fn predict(
    client: &ApiClient,
    attrs: &PolicyAttributes,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(attrs).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Renewal Prediction".bold());
            println!("{}", "=".repeat(40));
            println!("Model:       {}", result.model.to_string().cyan());
            println!("Prediction:  {}", result.label);
            println!("Probability: {}", color_probability(result.probability));
            println!();

            let outcome = format!("Policy holder {}", label_text(result.label));
            if result.label == 1 {
                print_success(&outcome);
            } else {
                print_info(&outcome);
            }
        }
    }

    Ok(())
}

/// Run every classifier on the same policy
pub async fn compare(client: &ApiClient, policy: PolicyArgs, format: OutputFormat) -> Result<()> {
    let mut results = Vec::with_capacity(ModelChoice::ALL.len());
    for &model in ModelChoice::ALL {
        let attrs = policy.clone().into_attributes(model)?;
        results.push(client.predict(&attrs).await?);
    }

    let rows: Vec<ComparisonRow> = results.iter().map(ComparisonRow::from).collect();

    if let OutputFormat::Table = format {
        println!("{}", "Model Comparison".bold());
        println!("{}", "=".repeat(40));
    }
    print_table(&rows, format);

    if let OutputFormat::Table = format {
        let disagree = results.windows(2).any(|w| w[0].label != w[1].label);
        println!();
        if disagree {
            print_warning("Classifiers disagree on this policy");
        } else {
            print_success("Classifiers agree");
        }
    }

    Ok(())
}
