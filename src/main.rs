use clap::Parser;
use std::path::Path;
use tapmetro::{
    cli::{Args, Command},
    input::spawn_stdin_reader,
    logging,
    platform::host::{SyntheticAccelerometer, SystemClock, ThreadTimer},
    platform::Platform,
    replay::{parse_trace, Jitter, Simulation},
    ui::{create_status_spinner, ConsoleHaptics, SpinnerStatus},
    BeatScheduler, EventLoop, MetronomeError, Settings,
};

fn main() {
    initialize_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn initialize_logging() {
    logging::init_with_fallback();
    log::info!("Application starting");
}

fn run(args: &Args) -> Result<(), MetronomeError> {
    let settings = Settings::load(args.config.as_deref())?.with_initial_bpm(args.bpm)?;

    match args.resolved_command() {
        Command::Run => run_interactive(&settings),
        Command::Replay {
            trace,
            until,
            latency_ms,
            seed,
        } => run_replay(&settings, &trace, until, Jitter::new(seed, latency_ms)),
    }
}

fn run_interactive(settings: &Settings) -> Result<(), MetronomeError> {
    let (tx, rx) = crossbeam::channel::unbounded();

    let accelerometer = SyntheticAccelerometer::new();
    let trigger = accelerometer.trigger();
    let spinner = create_status_spinner();
    let display = SpinnerStatus::new(spinner.clone());

    let platform = Platform {
        clock: Box::new(SystemClock::new()),
        timer: Box::new(ThreadTimer::spawn(tx.clone())),
        haptics: Box::new(ConsoleHaptics::new(spinner.clone())),
        accelerometer: Box::new(accelerometer),
        display: Box::new(display),
    };
    let mut event_loop = EventLoop::new(BeatScheduler::new(settings), platform);

    spinner.println("Enter: tap | a: next state | +/-: nudge BPM | q: quit");
    spawn_stdin_reader(tx, trigger);

    event_loop.run(&rx)?;
    spinner.finish_with_message("Stopped");
    log::info!("Interactive session ended");
    Ok(())
}

fn run_replay(
    settings: &Settings,
    trace: &Path,
    until: Option<u64>,
    jitter: Jitter,
) -> Result<(), MetronomeError> {
    let text = std::fs::read_to_string(trace)?;
    let events = parse_trace(&text)?;

    let mut simulation = Simulation::new(settings, jitter);
    simulation.replay(&events, until)?;
    let report = simulation.report();

    println!("Taps accepted: {}", report.taps.len());
    for (at, bpm) in &report.tempo_changes {
        println!("  {:>8} ms  BPM: {}", at, bpm);
    }
    println!("Pulses: {}", report.pulses.len());
    for at in &report.pulses {
        println!("  {:>8} ms  ●", at);
    }
    if let Some(state) = report.final_state {
        println!("Final state: {} | BPM: {}", state, report.final_bpm);
    }
    Ok(())
}
