use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use hccl_core::lendable::table::{parse_borrows, parse_instruments, parse_positions};
use hccl_core::lendable::{calculate_lendable_limits, LendableLimitInput};

use crate::input;

/// Arguments for lendable limit calculation
#[derive(Args)]
pub struct LendableArgs {
    /// Path to JSON input file (overrides the report flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Stock position detail report (CSV)
    #[arg(long)]
    pub positions: Option<String>,

    /// Instrument usage report (CSV)
    #[arg(long)]
    pub instruments: Option<String>,

    /// Outstanding borrow positions (CSV)
    #[arg(long)]
    pub borrows: Option<String>,

    /// Codes never published, comma separated (replaces the default list)
    #[arg(long, value_delimiter = ',')]
    pub blacklist: Option<Vec<String>>,

    /// Share of on-hand quantity that may be lent
    #[arg(long)]
    pub on_hand_factor: Option<Decimal>,

    /// Share of reverse repo quantity added to the limit
    #[arg(long)]
    pub repo_factor: Option<Decimal>,
}

pub fn run_lendable_limit(args: LendableArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut lendable_input: LendableLimitInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let (Some(positions), Some(instruments)) = (&args.positions, &args.instruments) {
        let (headers, records) = input::csv_in::read_csv_table(positions)?;
        let positions = parse_positions(&headers, &records)?;

        let (headers, records) = input::csv_in::read_csv_table(instruments)?;
        let instruments = parse_instruments(&headers, &records)?;

        let borrows = match args.borrows {
            Some(ref path) => {
                let (headers, records) = input::csv_in::read_csv_table(path)?;
                parse_borrows(&headers, &records)?
            }
            None => Vec::new(),
        };

        LendableLimitInput::new(positions, instruments, borrows)
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--positions and --instruments are required (or provide --input)".into());
    };

    if let Some(blacklist) = args.blacklist {
        lendable_input.blacklist = blacklist
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if let Some(factor) = args.on_hand_factor {
        lendable_input.on_hand_factor = factor;
    }
    if let Some(factor) = args.repo_factor {
        lendable_input.repo_factor = factor;
    }

    let result = calculate_lendable_limits(&lendable_input)?;
    Ok(serde_json::to_value(result)?)
}
