use clap::Args;
use serde_json::Value;

use hccl_core::repo::table::{parse_fair_prices, parse_repo_positions, result_table};
use hccl_core::repo::{calculate_repo_daily_position, RepoDailyInput};

use crate::input;

/// Arguments for the repo daily position merge
#[derive(Args)]
pub struct RepoPositionArgs {
    /// Path to JSON input file (overrides the report flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Reverse repo position report (CSV)
    #[arg(long)]
    pub positions: Option<String>,

    /// Daily fair price file with ISIN CODE and TODAY FAIR PRICE (CSV)
    #[arg(long)]
    pub prices: Option<String>,

    /// Row of the position report holding the column headers (1-based)
    #[arg(long, default_value_t = 11)]
    pub header_row: usize,

    /// Write the position report with the fair price column to this path
    #[arg(long)]
    pub write: Option<String>,
}

pub fn run_repo_position(args: RepoPositionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut report_headers = None;
    let repo_input: RepoDailyInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let (Some(positions), Some(prices)) = (&args.positions, &args.prices) {
        let (headers, records) = input::csv_in::read_csv_table_from(positions, args.header_row)?;
        let positions = parse_repo_positions(&headers, &records)?;
        report_headers = Some(headers);

        let (headers, records) = input::csv_in::read_csv_table(prices)?;
        let prices = parse_fair_prices(&headers, &records)?;

        RepoDailyInput { positions, prices }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--positions and --prices are required (or provide --input)".into());
    };

    let output = calculate_repo_daily_position(&repo_input)?;

    if let Some(ref path) = args.write {
        let headers = report_headers
            .as_ref()
            .ok_or("--write needs a CSV position report as --positions")?;
        let (out_headers, rows) = result_table(headers, &output.result);
        input::csv_in::write_csv_table(path, &out_headers, &rows)?;
        tracing::info!(path = %path, rows = rows.len(), "repo daily position written");
    }

    Ok(serde_json::to_value(output)?)
}
