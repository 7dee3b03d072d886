//! Thin demo binary: reads an optional starting position, a time budget
//! in milliseconds, and a depth limit from the command line, runs the
//! engine to exhaustion, and prints the suggested move, evaluation, and
//! principal variation. Not a UCI loop or a GUI/INI config reader.

use barca::board::Board;
use barca::engine::{Engine, EngineConfig};
use barca::search::eval::MAX_LINE_LEN;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::time::Duration;

fn main() {
    #[cfg(feature = "cli")]
    barca::logger::init_logging("logs/barca.log", "barca=info");

    let args: Vec<String> = env::args().collect();
    let position = args.get(1).filter(|s| !s.is_empty());
    let time_ms: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5_000);
    let depth: u8 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_LINE_LEN as u8);

    let board = match position {
        Some(s) => Board::from_string(s),
        None => Board::new(),
    };
    println!("{board}");

    let config = EngineConfig {
        time_limit: Duration::from_millis(time_ms),
        depth_limit: depth,
        ..EngineConfig::default()
    };

    let mut engine = Engine::new(board, config);
    if let Err(e) = engine.init() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} searching... {elapsed}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    engine.search(time_ms, depth);
    spinner.finish_and_clear();

    match engine.suggested_move() {
        Some(mv) => println!("bestmove {mv}"),
        None => println!("bestmove none"),
    }
    println!("eval {}", engine.search_eval());
    println!("pv {}", engine.search_pv());
    println!("depth {}", engine.search_depth());
    println!("time {:.3}s", engine.search_duration().as_secs_f64());

    engine.close();
}
