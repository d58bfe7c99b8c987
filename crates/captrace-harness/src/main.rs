//! Demonstration harness for capability-heap allocation tracking.
//!
//! Walks the canonical scenario: build a two-pool heap, allocate a zeroed
//! buffer from internal RAM and a larger one from SPIRAM, list the tracked
//! records, release both (zero, untrack, free, null), and show the
//! registry returning to empty. Small `--max-entries` values demonstrate
//! the registry's fail-open path under growth failure.

use clap::Parser;

use captrace::{TracedHeap, TracerConfig, traced_alloc_zeroed};
use captrace_heap::{CapHeap, Caps, PoolHeap, PoolSpec, print_free_summary};

#[derive(Debug, Parser)]
#[command(name = "captrace-harness")]
#[command(about = "Demonstration of capability-heap allocation tracking")]
struct Cli {
    /// Disable tracking; allocations still flow through the facade.
    #[arg(long)]
    no_tracking: bool,
    /// Emit tracked records as JSONL instead of text.
    #[arg(long)]
    json: bool,
    /// Registry entry cap (small values show the fail-open path).
    #[arg(long)]
    max_entries: Option<usize>,
    /// Internal pool capacity in bytes.
    #[arg(long, default_value_t = 64 * 1024)]
    internal_bytes: usize,
    /// SPIRAM pool capacity in bytes.
    #[arg(long, default_value_t = 256 * 1024)]
    spiram_bytes: usize,
}

fn list_allocations(th: &TracedHeap<PoolHeap>, json: bool) {
    let live = th.live_allocations();
    println!("-- {} tracked allocation(s)", live.len());
    for record in live {
        if json {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("captrace-harness: record serialization failed: {err}"),
            }
        } else {
            println!("{record}");
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let mut config = TracerConfig::from_env().with_enabled(!cli.no_tracking);
    if let Some(max_entries) = cli.max_entries {
        config = config.with_max_entries(max_entries);
    }

    let heap = PoolHeap::new(&[
        PoolSpec::new(
            Caps::INTERNAL | Caps::CAP_8BIT | Caps::DMA | Caps::DEFAULT,
            cli.internal_bytes,
        ),
        PoolSpec::new(Caps::SPIRAM | Caps::CAP_8BIT, cli.spiram_bytes),
    ]);
    let th = TracedHeap::with_config(heap, &config);

    let Some(mut buffer) = traced_alloc_zeroed!(th, 256, 1, Caps::CAP_8BIT, "buffer") else {
        eprintln!("captrace-harness: failed to allocate buffer");
        std::process::exit(1);
    };
    let Some(mut debug_string) = traced_alloc_zeroed!(th, 512, 1, Caps::SPIRAM, "debug_string")
    else {
        eprintln!("captrace-harness: failed to allocate debug_string");
        std::process::exit(1);
    };

    list_allocations(&th, cli.json);

    // SAFETY: `buffer` holds a live block allocated from `th`.
    unsafe { th.release(&mut buffer) };
    list_allocations(&th, cli.json);

    // SAFETY: `debug_string` holds a live block allocated from `th`.
    unsafe { th.release(&mut debug_string) };
    list_allocations(&th, cli.json);

    print_free_summary(th.heap(), "captrace-harness");
    println!(
        "-- free internal: {} bytes, free spiram: {} bytes",
        th.heap().free_bytes(Caps::INTERNAL),
        th.heap().free_bytes(Caps::SPIRAM)
    );

    let metrics = th.metrics().snapshot();
    println!(
        "-- metrics: allocs={} alloc_failures={} reallocs={} realloc_failures={} releases={} registry_stalls={}",
        metrics.allocs,
        metrics.alloc_failures,
        metrics.reallocs,
        metrics.realloc_failures,
        metrics.releases,
        th.registry().stalls()
    );
}
