//! statjoin CLI - join PxWeb and SDMX statistics to geography
//!
//! # Join Commands
//!
//! ```bash
//! statjoin pxweb --url <table> --query query.json --join-dimension region -g kommuner.geojson --geo-field KOD
//! statjoin sdmx --url <data-url> --join-field REF_AREA_CODE -g nuts.geojson --geo-field NUTS_ID
//! statjoin csv stats.csv --join-field KOD -g kommuner.geojson --geo-field KOD
//! statjoin batch ./exports --join-field KOD -g kommuner.geojson --geo-field KOD
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! statjoin inspect-pxweb --url <table> --query query.json   # list dimensions
//! statjoin inspect-sdmx --url <data-url>                    # list output fields
//! statjoin rules                                            # transform rule grammar
//! ```

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};

use statjoin::{
    inspect_pxweb, inspect_sdmx, load_json_file, rules_description, run_batch, run_csv, run_pxweb,
    run_sdmx, FileOutcome, GeoJsonProvider, JobLog, JobOptions, JobReport, JoinContext, Output,
    PxWebJob, RuleSet, SdmxJob, SourceClient,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "statjoin")]
#[command(about = "Join PxWeb and SDMX statistics to geography features", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a PxWeb table and join it to geography
    Pxweb {
        #[command(flatten)]
        source: PxWebSource,

        /// Label of the dimension holding the join values
        #[arg(long)]
        join_dimension: String,

        /// Join on the category code instead of the category label
        #[arg(long)]
        join_on_code: bool,

        #[command(flatten)]
        join: JoinArgs,
    },

    /// Query an SDMX endpoint and join it to geography
    Sdmx {
        #[command(flatten)]
        source: SdmxSource,

        /// Decoded field holding the join values (e.g. REF_AREA_CODE)
        #[arg(long)]
        join_field: String,

        /// Name the output after this field's value on the first row
        #[arg(long)]
        name_field: Option<String>,

        #[command(flatten)]
        join: JoinArgs,
    },

    /// Join a single CSV file to geography
    Csv {
        /// Input CSV file
        input: PathBuf,

        /// Column holding the join values
        #[arg(long)]
        join_field: String,

        #[command(flatten)]
        join: JoinArgs,
    },

    /// Join every CSV file of a folder to geography
    Batch {
        /// Folder of CSV files
        folder: PathBuf,

        /// Column holding the join values
        #[arg(long)]
        join_field: String,

        #[command(flatten)]
        join: JoinArgs,
    },

    /// List the dimensions of a PxWeb table
    InspectPxweb {
        #[command(flatten)]
        source: PxWebSource,
    },

    /// List the fields an SDMX response decodes to
    InspectSdmx {
        #[command(flatten)]
        source: SdmxSource,

        /// Preferred language for names
        #[arg(long)]
        lang: Option<String>,
    },

    /// Show the join-key transform rule grammar
    Rules,
}

#[derive(Args)]
struct PxWebSource {
    /// PxWeb table URL
    #[arg(long, requires = "query", conflicts_with = "payload")]
    url: Option<String>,

    /// JSON query body posted to the table
    #[arg(long)]
    query: Option<PathBuf>,

    /// Saved JSON-stat response (instead of querying)
    #[arg(long)]
    payload: Option<PathBuf>,
}

#[derive(Args)]
struct SdmxSource {
    /// SDMX data URL
    #[arg(long, conflicts_with = "payload")]
    url: Option<String>,

    /// Saved SDMX-JSON response (instead of querying)
    #[arg(long)]
    payload: Option<PathBuf>,
}

#[derive(Args)]
struct JoinArgs {
    /// GeoJSON FeatureCollection holding the geometries
    #[arg(short, long)]
    geography: PathBuf,

    /// Geography property matched against join values
    #[arg(long)]
    geo_field: String,

    /// Transform rule FIND=REPLACE (repeatable, applied in order)
    #[arg(long = "rule")]
    rules: Vec<String>,

    /// CSV file of transform rules (find,replace), applied after --rule
    #[arg(long = "rules")]
    rules_file: Option<PathBuf>,

    /// Output folder
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output name
    #[arg(short, long)]
    name: Option<String>,

    /// Create the output in Web Mercator (WKID 102100)
    #[arg(long)]
    web_mercator: bool,

    /// Keep the job working directory
    #[arg(long)]
    keep_temp: bool,

    /// Keep field names as aliases
    #[arg(long)]
    no_aliases: bool,

    /// Preferred language for SDMX names
    #[arg(long)]
    lang: Option<String>,

    /// Root of the job working directory
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

impl JoinArgs {
    fn options(&self) -> JobOptions {
        let mut options = JobOptions::from_env();
        if let Some(lang) = &self.lang {
            options.language = lang.clone();
        }
        if let Some(dir) = &self.work_dir {
            options.work_dir = dir.clone();
        }
        options.keep_temp |= self.keep_temp;
        options.web_mercator |= self.web_mercator;
        if self.no_aliases {
            options.update_aliases = false;
        }
        options
    }

    fn rule_set(&self) -> Result<RuleSet, Box<dyn std::error::Error>> {
        let mut rules = RuleSet::from_args(&self.rules)?;
        if let Some(path) = &self.rules_file {
            rules.extend(RuleSet::from_csv_file(path)?);
        }
        Ok(rules)
    }

    fn output(&self) -> Output {
        Output {
            dir: self.output_dir.clone(),
            name: self.name.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pxweb {
            source,
            join_dimension,
            join_on_code,
            join,
        } => cmd_pxweb(&source, join_dimension, join_on_code, &join).await,

        Commands::Sdmx {
            source,
            join_field,
            name_field,
            join,
        } => cmd_sdmx(&source, join_field, name_field, &join).await,

        Commands::Csv {
            input,
            join_field,
            join,
        } => cmd_csv(&input, &join_field, &join),

        Commands::Batch {
            folder,
            join_field,
            join,
        } => cmd_batch(&folder, &join_field, &join),

        Commands::InspectPxweb { source } => cmd_inspect_pxweb(&source).await,

        Commands::InspectSdmx { source, lang } => cmd_inspect_sdmx(&source, lang).await,

        Commands::Rules => {
            println!("{}", rules_description());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn client(options: &JobOptions) -> Result<SourceClient, Box<dyn std::error::Error>> {
    Ok(SourceClient::new(options.http_timeout(), JobLog::new())?.with_retries(options.http_retries))
}

async fn fetch_pxweb(source: &PxWebSource, options: &JobOptions) -> Result<Value, Box<dyn std::error::Error>> {
    match (&source.url, &source.query, &source.payload) {
        (_, _, Some(payload)) => Ok(load_json_file(payload)?),
        (Some(url), Some(query), None) => {
            let query = load_json_file(query)?;
            Ok(client(options)?.fetch_pxweb(url, &query).await?)
        }
        _ => Err("either --url with --query, or --payload is required".into()),
    }
}

async fn fetch_sdmx(source: &SdmxSource, options: &JobOptions) -> Result<Value, Box<dyn std::error::Error>> {
    match (&source.url, &source.payload) {
        (_, Some(payload)) => Ok(load_json_file(payload)?),
        (Some(url), None) => Ok(client(options)?.fetch_sdmx(url).await?),
        _ => Err("either --url or --payload is required".into()),
    }
}

fn context<'p>(provider: &'p GeoJsonProvider, join: &JoinArgs) -> Result<JoinContext<'p>, Box<dyn std::error::Error>> {
    Ok(JoinContext::new(
        provider,
        join.geo_field.clone(),
        join.rule_set()?,
        join.options(),
    ))
}

fn open_geography(path: &Path) -> Result<GeoJsonProvider, Box<dyn std::error::Error>> {
    eprintln!("🗺️  Loading geography: {}", path.display());
    let provider = GeoJsonProvider::open(path)?;
    eprintln!("   {} features", provider.len());
    Ok(provider)
}

fn print_report(report: &JobReport) {
    eprintln!("\n📊 {}", report.name);
    eprintln!("   Rows: {}", report.summary.rows);
    eprintln!("   With geometry: {}", report.summary.with_geometry);
    eprintln!("   Without geometry: {}", report.summary.without_geometry);
    eprintln!("💾 Output written to: {}", report.output.display());
}

async fn cmd_pxweb(source: &PxWebSource, join_dimension: String, join_on_code: bool, join: &JoinArgs) -> CliResult {
    let provider = open_geography(&join.geography)?;
    let ctx = context(&provider, join)?;
    let payload = fetch_pxweb(source, &ctx.options).await?;

    let job = PxWebJob {
        join_dimension,
        join_on_code,
    };
    let report = run_pxweb(&payload, &job, &join.output(), &ctx)?;
    print_report(&report);
    Ok(())
}

async fn cmd_sdmx(source: &SdmxSource, join_field: String, name_field: Option<String>, join: &JoinArgs) -> CliResult {
    let provider = open_geography(&join.geography)?;
    let ctx = context(&provider, join)?;
    let payload = fetch_sdmx(source, &ctx.options).await?;

    let job = SdmxJob {
        join_field,
        name_field,
    };
    let report = run_sdmx(&payload, &job, &join.output(), &ctx)?;
    print_report(&report);
    Ok(())
}

fn cmd_csv(input: &Path, join_field: &str, join: &JoinArgs) -> CliResult {
    let provider = open_geography(&join.geography)?;
    let ctx = context(&provider, join)?;
    let report = run_csv(input, join_field, &join.output(), &ctx)?;
    print_report(&report);
    Ok(())
}

fn cmd_batch(folder: &Path, join_field: &str, join: &JoinArgs) -> CliResult {
    let provider = open_geography(&join.geography)?;
    let ctx = context(&provider, join)?;
    let report = run_batch(folder, join_field, &join.output(), &ctx)?;

    for (path, outcome) in &report.files {
        match outcome {
            FileOutcome::Completed(r) => print_report(r),
            FileOutcome::Skipped { reason } => {
                eprintln!("\n⚠️  Skipped {}: {}", path.display(), reason)
            }
        }
    }
    eprintln!(
        "\n✨ {} files joined, {} skipped. Log: {}",
        report.completed(),
        report.skipped(),
        report.log_file.display()
    );
    Ok(())
}

async fn cmd_inspect_pxweb(source: &PxWebSource) -> CliResult {
    let payload = fetch_pxweb(source, &JobOptions::from_env()).await?;
    println!("Dimensions (id - label):");
    for (id, label) in inspect_pxweb(&payload)? {
        println!("  {} - {}", id, label);
    }
    Ok(())
}

async fn cmd_inspect_sdmx(source: &SdmxSource, lang: Option<String>) -> CliResult {
    let options = JobOptions::from_env();
    let lang = lang.unwrap_or_else(|| options.language.clone());
    let payload = fetch_sdmx(source, &options).await?;
    println!("Fields (name - alias):");
    for field in inspect_sdmx(&payload, &lang)? {
        println!("  {} - {} [{}]", field.name, field.alias, field.field_type.as_str());
    }
    Ok(())
}
