// Module declarations
mod canonicalize;
mod cli;
mod config;
mod download;
mod enhance;
mod error;
mod index;
mod logging;
mod mac;
mod pipeline;
mod registry;
mod resolve;
mod target;
mod types;
mod util;

// Re-export all module items at crate root so cross-module references work
// without long import paths.
#[allow(unused_imports)]
pub(crate) use canonicalize::*;
#[allow(unused_imports)]
pub(crate) use cli::*;
#[allow(unused_imports)]
pub(crate) use config::*;
#[allow(unused_imports)]
pub(crate) use download::*;
#[allow(unused_imports)]
pub(crate) use enhance::*;
#[allow(unused_imports)]
pub(crate) use error::*;
#[allow(unused_imports)]
pub(crate) use index::*;
#[allow(unused_imports)]
pub(crate) use logging::*;
#[allow(unused_imports)]
pub(crate) use mac::*;
#[allow(unused_imports)]
pub(crate) use pipeline::*;
#[allow(unused_imports)]
pub(crate) use registry::*;
#[allow(unused_imports)]
pub(crate) use resolve::*;
#[allow(unused_imports)]
pub(crate) use target::*;
#[allow(unused_imports)]
pub(crate) use types::*;
#[allow(unused_imports)]
pub(crate) use util::*;

use clap::Parser;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let file_config = load_file_config(&cli.config);

    match cli.command {
        Command::Update {
            data_dir,
            output,
            offline,
            json,
        } => {
            let settings = Settings::resolve(file_config, data_dir, output)?;
            if offline {
                tracing::info!(data_dir = %settings.data_dir.display(), "offline, using local sources");
            } else {
                let failed = download_sources(&settings)?;
                if failed > 0 {
                    eprintln!("{failed} source(s) could not be downloaded; using local copies");
                }
            }
            let (target, registries) = source_paths(&settings)?;
            let report = exit_on_user_error(run_enhancement(
                &settings,
                &target,
                &registries,
                &settings.output,
            ))?;
            print_update_report(&report, json)
        }

        Command::Enhance {
            db,
            registries,
            output,
            json,
        } => {
            let settings = Settings::resolve(file_config, None, output)?;
            let report = exit_on_user_error(run_enhancement(
                &settings,
                &db,
                &registries,
                &settings.output,
            ))?;
            print_update_report(&report, json)
        }

        Command::Query {
            macs,
            db,
            registries,
            json,
        } => {
            let settings = Settings::resolve(file_config, None, None)?;
            let index = if registries.is_empty() {
                let path = db.unwrap_or_else(|| settings.output.clone());
                let database = exit_on_user_error(TargetDatabase::load(&path))?;
                PrefixIndex::from_target(&database)
            } else {
                let canonicalizer = build_canonicalizer(&settings)?;
                build_registry_index(&registries, &canonicalizer)?.0
            };
            if index.is_empty() {
                tracing::warn!("lookup index is empty, nothing can match");
            }

            let mut normalized = Vec::with_capacity(macs.len());
            for input in &macs {
                let mac = exit_on_user_error(parse_mac(input))?;
                if !is_full_mac(&mac) {
                    tracing::warn!(input = %input, "partial address, matching on the digits given");
                }
                normalized.push(mac);
            }

            let results = resolve_all(&index, &normalized);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for resolution in &results {
                    print_resolution(resolution);
                }
            }
            if !results.iter().any(Resolution::is_match) {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::Canonicalize { names, json } => {
            let settings = Settings::resolve(file_config, None, None)?;
            let canonicalizer = build_canonicalizer(&settings)?;
            let results: Vec<CanonicalName> = names
                .into_iter()
                .map(|raw| CanonicalName {
                    canonical: canonicalizer.canonicalize(&raw),
                    raw,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for name in &results {
                    println!("{} -> {}", name.raw, name.canonical);
                }
            }
            Ok(())
        }

        Command::Sources { json } => {
            let settings = Settings::resolve(file_config, None, None)?;
            let entries = source_entries(&settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let state = if entry.present { "present" } else { "missing" };
                    println!("{:<8}\t{:<7}\t{}\t{}", entry.kind, state, entry.url, entry.path);
                }
            }
            Ok(())
        }
    }
}

/// Bad input from the user ends the process with status 2; everything else
/// bubbles up as an error.
fn exit_on_user_error<T>(result: Result<T>) -> CliResult<T> {
    match result {
        Err(err @ (OuiError::MissingSource { .. } | OuiError::InvalidMac { .. })) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
        other => Ok(other?),
    }
}

fn print_resolution(resolution: &Resolution) {
    match resolution {
        Resolution::Match {
            mac,
            prefix,
            prefix_bits,
            organization,
            address,
        } => println!(
            "{}\t{}/{}\t{}\t{}",
            format_colon(mac),
            format_colon(prefix),
            prefix_bits,
            organization,
            address
        ),
        Resolution::NoMatch { mac } => println!("{}\tno match", format_colon(mac)),
    }
}

fn print_update_report(report: &UpdateReport, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let enhance = &report.enhance;
    println!(
        "Wrote {} ({} records, {} names filled, {} addresses derived, {} unresolved)",
        report.output, enhance.total, enhance.enhanced, enhance.addresses_derived, enhance.unresolved
    );
    println!(
        "Index: {} prefixes, {} collisions",
        report.index_size, report.collisions
    );
    for (bits, count) in &report.prefix_bits {
        println!("  /{bits}: {count}");
    }
    for stats in &report.registries {
        if stats.missing {
            println!("  {}: missing", stats.source);
            continue;
        }
        let layout = match stats.layout {
            Some(layout) => format!("{layout:?}"),
            None => "empty".to_string(),
        };
        println!(
            "  {}: {} records, layout {}{}, {} malformed, {} empty",
            stats.source,
            stats.records,
            layout,
            if stats.unrecognized_layout { " (unrecognized)" } else { "" },
            stats.malformed_rows,
            stats.empty_rows
        );
    }
    let missing = report.missing_sources();
    if missing > 0 {
        eprintln!("{missing} registry file(s) missing");
    }
    let skipped = report.skipped_rows();
    if skipped > 0 {
        println!("Skipped {skipped} registry row(s)");
    }
    println!("blake3: {}", report.output_blake3);
    println!("generated: {}", report.generated_at);
    Ok(())
}
