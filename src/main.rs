use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::process;
use std::time::Instant;

use flate2::read::GzDecoder;
use mrf_index_filter::{
    fetch, filter_index_streaming, DigestAlgorithm, IndexError, LocationRule, PlanGating, PlanRule,
    DEFAULT_INDEX_URL,
};

/// Output path the original job wrote to.
const DEFAULT_OUTPUT_FILE: &str = "Anthem_NY_Filter.txt";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run() -> Result<(), IndexError> {
    let args: Vec<String> = env::args().collect();

    let mut region_code = "NY".to_string();
    let mut region_name = "New York".to_string();
    let mut plan_type = "PPO".to_string();
    let mut location_marker = "anthem/NY".to_string();
    let mut gating = PlanGating::Advisory;
    let mut digest_algorithm: Option<DigestAlgorithm> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--region-code" => region_code = take_value(&args, &mut i),
            "--region-name" => region_name = take_value(&args, &mut i),
            "--plan-type" => plan_type = take_value(&args, &mut i),
            "--location-marker" => location_marker = take_value(&args, &mut i),
            "--enforce-plan-filter" => {
                gating = PlanGating::Enforced;
                i += 1;
            }
            "--digest" => {
                let algo = take_value(&args, &mut i);
                digest_algorithm = match algo.to_lowercase().as_str() {
                    "sha256" | "sha-256" => Some(DigestAlgorithm::Sha256),
                    "sha512" | "sha-512" => Some(DigestAlgorithm::Sha512),
                    _ => {
                        eprintln!(
                            "Error: Unknown digest algorithm '{}'. Supported: sha256, sha512",
                            algo
                        );
                        process::exit(1);
                    }
                };
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            flag if flag.starts_with("--") => {
                eprintln!("Error: Unknown option '{}'", flag);
                eprintln!();
                print_usage();
                process::exit(1);
            }
            _ => {
                positional.push(args[i].clone());
                i += 1;
            }
        }
    }

    if positional.len() > 2 {
        eprintln!("Error: Too many arguments");
        eprintln!();
        print_usage();
        process::exit(1);
    }

    let source = positional
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string());
    let output_path = positional
        .get(1)
        .cloned()
        .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());

    let plan_rule = PlanRule::new(&region_code, &region_name, &plan_type);
    let location_rule = LocationRule::new(&location_marker);

    let started = Instant::now();

    // All sources feed the same blocking pipeline; only the byte origin
    // differs. The network path streams through the bounded pump.
    let input: Box<dyn Read + Send> = if source.starts_with("http://") || source.starts_with("https://")
    {
        eprintln!("Fetching index from {}", source);
        Box::new(fetch::fetch_index(&source).await?)
    } else if source == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(&source)?)
    };

    let pipeline_output_path = output_path.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let decoder = GzDecoder::new(input);
        let mut output = File::create(&pipeline_output_path)?;
        filter_index_streaming(
            decoder,
            &mut output,
            &plan_rule,
            &location_rule,
            gating,
            digest_algorithm,
        )
    })
    .await
    .expect("filter pipeline task panicked")?;

    eprintln!(
        "{} records scanned, {} with a relevant plan, {} unique locations written to {}",
        summary.records, summary.relevant_records, summary.locations_written, output_path
    );
    if let (Some(algorithm), Some(checksum)) = (digest_algorithm, &summary.digest) {
        eprintln!("{}: {}", algorithm.name(), checksum);
    }

    println!(
        "Output file created successfully. Execution time: {:.2?}",
        started.elapsed()
    );

    Ok(())
}

/// Consume the value following a flag, advancing the cursor past both.
fn take_value(args: &[String], i: &mut usize) -> String {
    if *i + 1 < args.len() {
        let value = args[*i + 1].clone();
        *i += 2;
        value
    } else {
        eprintln!("Error: {} requires a value", args[*i]);
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: mrf-index-filter [OPTIONS] [index-source] [output-file]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [index-source]   URL of the gzip index, a local .json.gz path, or - for stdin");
    eprintln!("                   (defaults to the Anthem index URL)");
    eprintln!("  [output-file]    Output file, one location per line (default: {})", DEFAULT_OUTPUT_FILE);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --region-code <token>       Plan-name region code, matched case-insensitively (default: NY)");
    eprintln!("  --region-name <token>       Plan-name full region name (default: \"New York\")");
    eprintln!("  --plan-type <token>         Plan-name plan type (default: PPO)");
    eprintln!("  --location-marker <token>   Case-sensitive path marker for locations (default: anthem/NY)");
    eprintln!("  --enforce-plan-filter       Only emit locations from records with a relevant plan");
    eprintln!("  --digest <algorithm>        Compute checksum of the output (sha256, sha512)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  mrf-index-filter                                        # Full Anthem NY PPO run");
    eprintln!("  mrf-index-filter index.json.gz locations.txt            # Filter a local index");
    eprintln!("  mrf-index-filter --region-code CA --region-name California \\");
    eprintln!("                   --location-marker anthem/CA index.json.gz ca.txt");
    eprintln!("  mrf-index-filter --digest sha256 index.json.gz out.txt  # With output checksum");
    eprintln!("  curl -s $INDEX_URL | mrf-index-filter - locations.txt   # From a pipe");
}
