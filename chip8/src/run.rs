use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use tracing::{info, warn};

use chip8_core::Chip8;
use chip8_display::Display;

use crate::keymap::keymap;

/// Settings for a single emulator session
pub struct Config<'a> {
    pub rom: &'a Path,
    pub cycle_time: Duration,
    pub scale: u32,
    pub seed: Option<u64>,
}

pub fn run(config: Config) -> Result<()> {
    let mut chip8 = match config.seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };

    // Load ROM
    let rom = std::fs::read(config.rom)
        .with_context(|| format!("unable to read rom {}", config.rom.display()))?;
    chip8
        .load_rom(&rom)
        .with_context(|| format!("unable to load rom {}", config.rom.display()))?;
    info!(rom = %config.rom.display(), size = rom.len(), "loaded rom");

    // Get SDL2 context
    let sdl = sdl2::init().map_err(|e| anyhow!(e)).context("unable to start sdl2")?;
    let mut display = Display::new(&sdl, config.scale)
        .map_err(|e| anyhow!(e))
        .context("unable to open display")?;
    let mut events = sdl
        .event_pump()
        .map_err(|e| anyhow!(e))
        .context("unable to get sdl2 event pump")?;

    let mut last_cycle = Instant::now();

    // Whether or not the configured clock speed should be respected
    let mut fast_forward = false;

    'event: loop {
        // If the draw flag is set, unset it and render the current frame
        if let Some(frame) = chip8.get_frame() {
            display
                .render(&frame)
                .map_err(|e| anyhow!(e))
                .context("unable to render frame")?;
            chip8.clear_draw_flag();
        }

        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(hex)) => chip8.key_press(hex),
                    (Keycode::Space, _) => fast_forward = true,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(hex)) => chip8.key_release(hex),
                    (Keycode::Space, _) => fast_forward = false,
                    _ => continue,
                },
                _ => continue,
            };
        }

        // Update state
        if let Err(err) = chip8.tick() {
            let state = chip8.state();
            warn!(
                %err,
                pc = format_args!("{:04X}", state.pc),
                cycle = state.cycle_count,
                "machine halted"
            );
            return Err(err).context("machine halted");
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_cycle_time = current_time - last_cycle;
        if !fast_forward && config.cycle_time > elapsed_cycle_time {
            std::thread::sleep(config.cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    info!(cycles = chip8.state().cycle_count, "quit");
    Ok(())
}
