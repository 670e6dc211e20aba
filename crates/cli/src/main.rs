//! Policy Renewal Predictor CLI
//!
//! A command-line tool for requesting renewal predictions and checking
//! the health of the prediction service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{health, predict};
use renewal_lib::{Gender, ModelChoice, PolicyAttributes, VehicleAge, VehicleDamage};

/// Policy Renewal Predictor CLI
#[derive(Parser)]
#[command(name = "renewal")]
#[command(author, version, about = "CLI for the Policy Renewal Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RENEWAL_API_URL env var)
    #[arg(long, env = "RENEWAL_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict whether a policy holder will renew
    Predict {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Classifier to use (bagging, boosting)
        #[arg(long, short, default_value = "bagging")]
        model: ModelChoice,
    },

    /// Run both classifiers on the same policy and compare results
    Compare {
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Show service health
    Health,
}

/// Policy holder attributes
#[derive(Args, Clone)]
pub struct PolicyArgs {
    /// Age in years
    #[arg(long)]
    pub age: u32,

    /// Holds a driving license (0 or 1)
    #[arg(long, default_value_t = 1)]
    pub driving_license: u8,

    /// Region code
    #[arg(long)]
    pub region_code: i32,

    /// Already insured elsewhere (0 or 1)
    #[arg(long, default_value_t = 0)]
    pub previously_insured: u8,

    /// Annual premium
    #[arg(long)]
    pub annual_premium: f64,

    /// Sales channel code
    #[arg(long)]
    pub policy_sales_channel: i32,

    /// Days associated with the company
    #[arg(long)]
    pub vintage: u32,

    /// Gender (Male, Female)
    #[arg(long)]
    pub gender: Gender,

    /// Vehicle age ("< 1 Year", "1-2 Year", "> 2 Years")
    #[arg(long)]
    pub vehicle_age: VehicleAge,

    /// Vehicle previously damaged (Yes, No)
    #[arg(long)]
    pub vehicle_damage: VehicleDamage,
}

impl PolicyArgs {
    /// Build a validated request for the given classifier
    pub fn into_attributes(self, model_choice: ModelChoice) -> Result<PolicyAttributes> {
        let attrs = PolicyAttributes {
            age: self.age,
            driving_license: self.driving_license,
            region_code: self.region_code,
            previously_insured: self.previously_insured,
            annual_premium: self.annual_premium,
            policy_sales_channel: self.policy_sales_channel,
            vintage: self.vintage,
            gender: self.gender,
            vehicle_age: self.vehicle_age,
            vehicle_damage: self.vehicle_damage,
            model_choice,
        };
        attrs.validate()?;
        Ok(attrs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict { policy, model } => {
            let attrs = policy.into_attributes(model)?;
            predict::predict(&client, &attrs, cli.format).await?;
        }
        Commands::Compare { policy } => {
            predict::compare(&client, policy, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["renewal"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    const POLICY: &[&str] = &[
        "--age",
        "44",
        "--region-code",
        "28",
        "--annual-premium",
        "40454",
        "--policy-sales-channel",
        "26",
        "--vintage",
        "217",
        "--gender",
        "Male",
        "--vehicle-age",
        "> 2 Years",
        "--vehicle-damage",
        "Yes",
    ];

    #[test]
    fn test_predict_defaults_to_bagging() {
        let mut args = vec!["predict"];
        args.extend_from_slice(POLICY);
        let cli = parse(&args).unwrap();

        match cli.command {
            Commands::Predict { policy, model } => {
                assert_eq!(model, ModelChoice::Bagging);
                let attrs = policy.into_attributes(model).unwrap();
                assert_eq!(attrs.vehicle_age, VehicleAge::MoreThanTwoYears);
                assert_eq!(attrs.driving_license, 1);
                assert_eq!(attrs.previously_insured, 0);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_unknown_literal_rejected_by_parser() {
        let args = [
            "predict", "--age", "30", "--region-code", "1", "--annual-premium", "1",
            "--policy-sales-channel", "1", "--vintage", "1", "--gender", "male",
            "--vehicle-age", "1-2 Year", "--vehicle-damage", "No",
        ];
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_non_binary_flag_fails_local_validation() {
        let mut args = vec!["predict", "--driving-license", "2", "--model", "boosting"];
        args.extend_from_slice(POLICY);
        let cli = parse(&args).unwrap();

        match cli.command {
            Commands::Predict { policy, model } => {
                assert_eq!(model, ModelChoice::Boosting);
                assert!(policy.into_attributes(model).is_err());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_api_url_default() {
        let cli = parse(&["health"]).unwrap();
        assert_eq!(cli.api_url, "http://localhost:8000");
    }
}
