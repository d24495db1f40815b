//! Live preview window with the per-frame overlay.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use minifb::{Key, KeyRepeat, WindowOptions};
use rollcall_core::{DisplayError, DisplaySignal, Frame, FrameSink, Overlay};
use std::path::Path;

pub const WINDOW_TITLE: &str = "Attendance System";
pub const QUIT_KEY: Key = Key::Q;

const TEXT_ORIGIN: (i32, i32) = (30, 30);
const TEXT_SCALE: f32 = 26.0;
const TONE_BAR_HEIGHT: u32 = 6;

/// minifb window showing annotated frames; `q` or closing the window quits.
pub struct Window {
    window: minifb::Window,
    buffer: Vec<u32>,
    font: Option<FontVec>,
    title: String,
}

impl Window {
    pub fn open(width: u32, height: u32, font_path: Option<&Path>) -> Result<Self, DisplayError> {
        let window = minifb::Window::new(
            WINDOW_TITLE,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .map_err(|e| DisplayError(format!("cannot open window: {e}")))?;

        let font = font_path.and_then(|path| match load_font(path) {
            Ok(font) => Some(font),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "overlay font unavailable, using title bar");
                None
            }
        });

        Ok(Self {
            window,
            buffer: Vec::new(),
            font,
            title: WINDOW_TITLE.to_string(),
        })
    }

    fn set_title(&mut self, overlay: Option<&Overlay>) {
        let title = match overlay {
            Some(o) => format!("{WINDOW_TITLE} - {}", o.text),
            None => WINDOW_TITLE.to_string(),
        };
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

impl FrameSink for Window {
    fn present(
        &mut self,
        frame: &Frame,
        overlay: Option<&Overlay>,
    ) -> Result<DisplaySignal, DisplayError> {
        if !self.window.is_open() {
            return Ok(DisplaySignal::Quit);
        }

        let mut canvas = frame.image.clone();
        if let Some(overlay) = overlay {
            annotate(&mut canvas, overlay, self.font.as_ref());
        }
        self.set_title(overlay);

        fill_buffer(&canvas, &mut self.buffer);
        self.window
            .update_with_buffer(&self.buffer, canvas.width() as usize, canvas.height() as usize)
            .map_err(|e| DisplayError(format!("window update failed: {e}")))?;

        if !self.window.is_open() || self.window.is_key_pressed(QUIT_KEY, KeyRepeat::No) {
            Ok(DisplaySignal::Quit)
        } else {
            Ok(DisplaySignal::Continue)
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    FontVec::try_from_vec(bytes).map_err(|e| e.to_string())
}

/// Draw the overlay: a tone-coloured bar along the top edge, plus the text
/// when a font is available.
pub fn annotate(image: &mut RgbImage, overlay: &Overlay, font: Option<&FontVec>) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let colour = Rgb(overlay.tone.rgb());
    let bar = Rect::at(0, 0).of_size(image.width(), TONE_BAR_HEIGHT.min(image.height()));
    draw_filled_rect_mut(image, bar, colour);

    if let Some(font) = font {
        let (x, y) = TEXT_ORIGIN;
        draw_text_mut(image, colour, x, y, PxScale::from(TEXT_SCALE), font, &overlay.text);
    }
}

/// Pack RGB pixels into minifb's 0RGB u32 layout.
fn fill_buffer(image: &RgbImage, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(
        image
            .pixels()
            .map(|Rgb([r, g, b])| (u32::from(*r) << 16) | (u32::from(*g) << 8) | u32::from(*b)),
    );
}
