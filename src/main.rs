// vanityhunt - parallel vanity Bitcoin address search
// Generates random keys across N worker threads until the requested
// number of addresses match the pattern, then persists them atomically.

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use parking_lot::Mutex;

use vanityhunt::cli::{format_number, Args};
use vanityhunt::engine::{
    write_atomic, EngineConfig, ResultRecord, ResultSink, SearchCoordinator, SearchEvent,
    SearchRequest, SearchSummary,
};
use vanityhunt::error::Result;
use vanityhunt::keygen::VanityGenerator;
use vanityhunt::pattern::{self, AddressKind, Pattern};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[✗] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let kind: AddressKind = args.address_type.into();
    let pattern = Pattern::new(&args.pattern, args.position.into(), kind)?;

    let exclusions = match &args.exclude {
        Some(path) => {
            let set = pattern::load_exclusions(path)?;
            println!("[✓] Loaded {} exclusion(s)", format_number(set.len() as u64));
            set
        }
        None => Default::default(),
    };

    let threads = args.threads.unwrap_or_else(|| {
        thread::available_parallelism().map(usize::from).unwrap_or(1)
    });
    let request = SearchRequest::new(
        pattern.clone(),
        args.count,
        threads,
        exclusions,
        args.secret_format.into(),
    )?;

    banner(&args, &request);

    let config = EngineConfig::default();
    let mut sink = ResultSink::new(&config);
    sink.set_save_callback(json_save_callback(args.output.clone()));

    let generator = Arc::new(VanityGenerator::new(pattern));
    let handle = SearchCoordinator::start(request, config, generator, sink);

    let interrupter = handle.interrupter();
    ctrlc::set_handler(move || {
        println!("\n[!] Stopping...");
        interrupter.interrupt();
    })
    .expect("Error setting Ctrl+C handler");

    let mut last_line = Instant::now();
    for event in handle.events().iter() {
        match event {
            SearchEvent::Progress { total, .. } => {
                if last_line.elapsed() >= Duration::from_secs(1) {
                    let stats = handle.stats();
                    println!(
                        "⚡ {} keys | {:.1}K/sec | Hits: {}",
                        format_number(total),
                        stats.keys_per_second() / 1_000.0,
                        stats.matches_found
                    );
                    last_line = Instant::now();
                }
            }
            SearchEvent::Match { record } => {
                println!("[✓] {}", record.address);
            }
        }
    }

    let summary = handle.join()?;
    print_summary(&summary);

    if summary.completed {
        Ok(ExitCode::SUCCESS)
    } else {
        println!("[!] Interrupted before reaching the target; buffered matches were flushed.");
        Ok(ExitCode::FAILURE)
    }
}

/// Accumulating JSON writer: every flush rewrites the full output file
/// atomically, so the file on disk is always complete and parseable.
fn json_save_callback(
    output: std::path::PathBuf,
) -> vanityhunt::engine::SaveCallback {
    let store: Mutex<Vec<ResultRecord>> = Mutex::new(Vec::new());
    Arc::new(move |batch| {
        let mut all = store.lock();
        all.extend_from_slice(batch);
        let json = serde_json::to_vec_pretty(&*all).map_err(|e| e.to_string())?;
        write_atomic(&output, &json).map_err(|e| e.to_string())?;
        println!(
            "[✓] Flushed {} match(es) -> {}",
            batch.len(),
            output.display()
        );
        Ok(())
    })
}

fn banner(args: &Args, request: &SearchRequest) {
    println!("\n\x1b[1;36m╔═══════════════════════════════════════════════════════╗");
    println!("║        VANITYHUNT  •  Vanity Address Search            ║");
    println!("╚═══════════════════════════════════════════════════════╝\x1b[0m\n");

    if request.pattern().accepts_all() {
        println!(
            "[▶] Generating {} {} key(s) (every candidate matches, 1 thread)...",
            request.target(),
            request.pattern().kind().as_str()
        );
    } else {
        println!(
            "[▶] Searching for {} {} match(es) of \"{}\" with {} thread(s)... (Ctrl+C to stop)",
            request.target(),
            request.pattern().kind().as_str(),
            args.pattern,
            request.threads()
        );
    }
    println!();
}

fn print_summary(summary: &SearchSummary) {
    println!();
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║                  Final Statistics                      ║");
    println!("╚═══════════════════════════════════════════════════════╝");
    println!("  Keys generated: {}", format_number(summary.total_generated));
    println!("  Matches found:  {}", format_number(summary.matches_found));
    println!("  Elapsed:        {:.1}s", summary.elapsed_secs);
    println!(
        "  Rate:           {:.1}K keys/sec",
        summary.keys_per_second() / 1_000.0
    );
    println!(
        "  Outcome:        {}",
        if summary.completed {
            "completed"
        } else {
            "interrupted"
        }
    );
}
