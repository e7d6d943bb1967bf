//! Basic demonstration of the world automaton.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=debug to see every tick.

use tracing_subscriber::EnvFilter;
use worldcore::Automaton;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== worldcore - Automaton Demo ===\n");

    let mut sim = match Automaton::new(7, 6) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("failed to build automaton: {err}");
            std::process::exit(1);
        }
    };
    sim.set_mountain_test_pattern();
    sim.set_faucet(true);

    println!("Initial state:");
    print_state(&sim);

    println!("\nRunning 200 ticks...\n");
    for _ in 0..200 {
        sim.tick();
        if sim.generation() % 40 == 0 {
            println!("--- Generation {} ---", sim.generation());
            print_state(&sim);
        }
    }

    sim.profiler().print_summary();

    println!("\n=== Final State (JSON, truncated) ===\n");
    let json = sim.snapshot_json();
    println!("{}...", &json[..json.len().min(400)]);
}

fn print_state(sim: &Automaton) {
    let flows = sim.flows();
    println!("  earth: {}", sim.earth_stats());
    println!("  water: {}  coverage={}", sim.water_stats(), sim.water_coverage());
    println!(
        "  flows: quake={} slide={} water={} erosion={} rain={} evap={}",
        flows.quake, flows.slide, flows.water, flows.erosion, flows.precipitation, flows.evaporation
    );
    println!("  earth pid: {}", sim.earth_pid());
    println!("  water pid: {}", sim.water_pid());
    let sizes: Vec<String> = sim.plate_sizes().iter().map(|s| s.to_string()).collect();
    println!("  plates: [{}]", sizes.join(", "));
}
