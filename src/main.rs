use clap::Parser;
use interpreter::ChipState;
use log::info;
use std::path::PathBuf;

mod interpreter;

/// Runs a CHIP-8 program in a window. Set RUST_LOG for diagnostics.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(help = "Path to the ROM file to run")]
    rom: PathBuf,

    #[arg(short, long, default_value_t = 700, help = "Instructions per second")]
    clock_speed: u32,

    #[arg(short, long, help = "Fixed seed for the random number generator")]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut chip8_vm = match args.seed {
        Some(seed) => ChipState::with_seed(args.clock_speed, seed),
        None => ChipState::new(args.clock_speed),
    };
    chip8_vm.load(&args.rom)?;

    info!(
        "starting at {} instructions/s, {}",
        args.clock_speed,
        args.seed
            .map_or("random seed".to_string(), |seed| format!("seed {}", seed))
    );
    chip8_base::run(chip8_vm);
}
