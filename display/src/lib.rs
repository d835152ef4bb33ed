use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::WindowCanvas;

use chip8_core::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8_core::FrameBuffer;

/// Bytes per pixel of an RGB24 texture
const RGB: usize = 3;

/// # Display
/// The Chip-8 display is composed of 64x32 black/white pixels.
/// The on/off state of these pixels is encoded as 1/0 respectively in a 2d array.
/// The display only gets a call to `render` when the Chip-8 FrameBuffer is updated.
pub struct Display {
    canvas: WindowCanvas,
}

impl Display {
    /// Creates a new display object bound to an sdl2 context.
    ///
    /// # Arguments
    /// * `sdl` an sdl2 context with which to draw
    /// * `scale` the size multiplier for each pixel
    pub fn new(sdl: &sdl2::Sdl, scale: u32) -> Result<Self, String> {
        let video_subsystem = sdl.video()?;
        let window = video_subsystem
            .window(
                "Chip-8",
                DISPLAY_WIDTH as u32 * scale,
                DISPLAY_HEIGHT as u32 * scale,
            )
            .position_centered()
            .opengl()
            .build()
            .map_err(|e| e.to_string())?;
        let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;

        canvas.set_draw_color(Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();

        Ok(Display { canvas })
    }

    /// Formats a Chip-8 FrameBuffer for rendering as an SDL2 texture.
    ///
    /// An SDL2 RGB24 texture is a 1D array of bytes that represent concatenated rows of RGB pixels.
    ///
    /// This creates a black and white rendering by:
    /// - Flattening the 2D frame buffer into a 1D array by concatenating its rows
    /// - Triplicating each element of that 1D array to represent the RGB values of each pixel
    /// - Mapping lit pixels to full intensity and everything else to 0
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    pub fn frame_to_texture(frame: &FrameBuffer) -> Vec<u8> {
        frame
            .iter()
            .flat_map(|row| row.iter())
            .flat_map(|&pixel| std::iter::repeat(if pixel == 0 { 0x00 } else { 0xFF }).take(RGB))
            .collect()
    }

    /// Formats the Chip-8 FrameBuffer as an SDL2 RGB24 texture and renders it.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    pub fn render(&mut self, frame: &FrameBuffer) -> Result<(), String> {
        let texture_creator = self.canvas.texture_creator();

        let mut texture = texture_creator
            .create_texture_streaming(
                PixelFormatEnum::RGB24,
                DISPLAY_WIDTH as u32,
                DISPLAY_HEIGHT as u32,
            )
            .map_err(|e| e.to_string())?;

        let pixels = Display::frame_to_texture(frame);
        texture.with_lock(None, |buffer: &mut [u8], pitch: usize| {
            // rows may be padded past width * RGB
            for (y, row) in pixels.chunks(DISPLAY_WIDTH * RGB).enumerate() {
                buffer[y * pitch..y * pitch + row.len()].copy_from_slice(row);
            }
        })?;

        self.canvas.clear();
        self.canvas.copy(&texture, None, None)?;
        self.canvas.present();
        Ok(())
    }
}
