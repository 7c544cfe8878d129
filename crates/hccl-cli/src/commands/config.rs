use clap::Args;
use serde_json::Value;

use hccl_core::template::TemplateLayout;
use hccl_core::RuleConfig;

/// Arguments for printing defaults
#[derive(Args)]
pub struct DefaultConfigArgs {
    /// Print the default template layout instead of the rule configuration
    #[arg(long)]
    pub layout: bool,
}

pub fn run_default_config(args: DefaultConfigArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let value = if args.layout {
        serde_json::to_value(TemplateLayout::default())?
    } else {
        serde_json::to_value(RuleConfig::default())?
    };
    Ok(serde_json::json!({ "result": value }))
}
