use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chip8_core::CLOCK_HZ;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod keymap;
mod run;

/// Run a Chip-8 rom in an SDL2 window
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the rom image
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = CLOCK_HZ, value_parser = clap::value_parser!(u64).range(1..))]
    clock_speed: u64,

    /// Size of each Chip-8 pixel on screen
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    scale: u32,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.trace {
        EnvFilter::new("chip8=info,chip8_core=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run::run(run::Config {
        rom: &args.rom,
        cycle_time: Duration::from_nanos(1_000_000_000 / args.clock_speed),
        scale: args.scale,
        seed: args.seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["chip8", "pong.ch8"]).unwrap();
        assert_eq!(args.rom, PathBuf::from("pong.ch8"));
        assert_eq!(args.clock_speed, 540);
        assert_eq!(args.scale, 10);
        assert_eq!(args.seed, None);
        assert!(!args.trace);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "chip8", "--clock-speed", "1000", "--scale", "4", "--seed", "9", "--trace", "rom",
        ])
        .unwrap();
        assert_eq!(args.clock_speed, 1000);
        assert_eq!(args.scale, 4);
        assert_eq!(args.seed, Some(9));
        assert!(args.trace);
    }

    #[test]
    fn test_rejects_zero_clock_speed() {
        assert!(Args::try_parse_from(["chip8", "--clock-speed", "0", "rom"]).is_err());
    }

    #[test]
    fn test_requires_rom() {
        assert!(Args::try_parse_from(["chip8"]).is_err());
    }
}
