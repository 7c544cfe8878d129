use clap::{Args, ValueEnum};
use serde_json::Value;
use std::path::Path;

use hccl_core::concentration::{calculate_concentration_limits, ConcentrationInput};
use hccl_core::schema::{self, augment_table, parse_security_table};
use hccl_core::template::{template_cells, TemplateLayout};
use hccl_core::{HaircutScale, RuleConfig};

use crate::input;
use crate::input::csv_in::TextTable;

/// Scale of the haircut columns in the upload
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScaleArg {
    /// 0.3 means 30%
    Fraction,
    /// 30 means 30%
    Percent,
    /// Percent if any haircut is above 1
    Auto,
}

impl From<ScaleArg> for HaircutScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Fraction => HaircutScale::Fraction,
            ScaleArg::Percent => HaircutScale::Percent,
            ScaleArg::Auto => HaircutScale::Auto,
        }
    }
}

/// Where the securities come from and how to read them
#[derive(Args)]
pub struct UploadArgs {
    /// HCCL upload (.csv) or JSON input file; JSON may also be piped on stdin
    #[arg(long)]
    pub input: Option<String>,

    /// Rule configuration file (YAML or JSON), overrides any config in JSON input
    #[arg(long)]
    pub config: Option<String>,

    /// Scale of the haircut columns
    #[arg(long, value_enum, default_value = "auto")]
    pub haircut_scale: ScaleArg,
}

/// Arguments for concentration limit resolution
#[derive(Args)]
pub struct ConcentrationArgs {
    #[command(flatten)]
    pub upload: UploadArgs,

    /// Write the CSV upload with the result columns appended to this path
    #[arg(long)]
    pub write: Option<String>,
}

/// Arguments for template cell projection
#[derive(Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub upload: UploadArgs,

    /// Template layout file (YAML or JSON); defaults to the HC / CONC layout
    #[arg(long)]
    pub layout: Option<String>,
}

struct LoadedUpload {
    input: ConcentrationInput,
    /// Present when the input was a CSV upload.
    table: Option<TextTable>,
    warnings: Vec<String>,
}

fn load_upload(args: &UploadArgs) -> Result<LoadedUpload, Box<dyn std::error::Error>> {
    let scale = HaircutScale::from(args.haircut_scale);

    let mut loaded = match args.input.as_deref() {
        Some(path) if input::file::has_extension(Path::new(path), &["csv"]) => {
            let (headers, records) = input::csv_in::read_csv_table(path)?;
            let table = parse_security_table(&headers, &records, scale)?;
            LoadedUpload {
                input: ConcentrationInput {
                    rows: table.rows,
                    config: RuleConfig::default(),
                },
                table: Some((headers, records)),
                warnings: table.warnings,
            }
        }
        Some(path) => json_upload(input::file::read_json(path)?, scale),
        None => match input::stdin::read_stdin()? {
            Some(data) => json_upload(data, scale),
            None => return Err("--input is required (or pipe JSON on stdin)".into()),
        },
    };

    if let Some(ref path) = args.config {
        loaded.input.config = input::file::read_settings(path)?;
    }
    Ok(loaded)
}

fn json_upload(mut input: ConcentrationInput, scale: HaircutScale) -> LoadedUpload {
    let mut warnings = Vec::new();
    schema::normalize_haircuts(&mut input.rows, scale, &mut warnings);
    LoadedUpload {
        input,
        table: None,
        warnings,
    }
}

/// Upload warnings come first so they read in processing order.
fn prepend_warnings(warnings: &mut Vec<String>, mut upload: Vec<String>) {
    upload.append(warnings);
    *warnings = upload;
}

pub fn run_concentration_limit(args: ConcentrationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loaded = load_upload(&args.upload)?;
    let mut output = calculate_concentration_limits(&loaded.input)?;
    prepend_warnings(&mut output.warnings, loaded.warnings);

    if let Some(ref path) = args.write {
        let (headers, records) = loaded
            .table
            .as_ref()
            .ok_or("--write needs a CSV upload as --input")?;
        let (out_headers, rows) = augment_table(headers, records, &output.result.rows)?;
        input::csv_in::write_csv_table(path, &out_headers, &rows)?;
        tracing::info!(path = %path, rows = rows.len(), "augmented upload written");
    }

    Ok(serde_json::to_value(output)?)
}

pub fn run_template_cells(args: TemplateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let layout: TemplateLayout = match args.layout {
        Some(ref path) => input::file::read_settings(path)?,
        None => TemplateLayout::default(),
    };

    let loaded = load_upload(&args.upload)?;
    let mut output = calculate_concentration_limits(&loaded.input)?;
    prepend_warnings(&mut output.warnings, loaded.warnings);

    let cells = template_cells(&output.result.rows, &layout)?;

    Ok(serde_json::json!({
        "result": cells,
        "methodology": format!(
            "Template projection onto sheets {} and {} from row {}",
            layout.haircut_sheet, layout.limit_sheet, layout.start_row
        ),
        "layout": layout,
        "warnings": output.warnings,
        "metadata": output.metadata,
    }))
}
