use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color.
///
/// Parsed from the same strings the player options use (`"rgb(100, 100, 255)"`
/// or `"#6464ff"`) and serialized back in the `rgb(...)` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Color string that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color '{input}': expected 'rgb(r, g, b)' or '#rrggbb'")]
pub struct ColorParseError {
    pub input: String,
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ColorParseError { input: s.to_string() };

        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16).map_err(|_| err())
            };
            return Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }

        let inner = trimmed
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;

        let channels: Vec<u8> = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| err())?;

        match channels.as_slice() {
            [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Axis-aligned rectangle in surface coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole `width` x `height` surface
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A decoded video frame handed over by a preview pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major pixels, `width * height` entries
    pub pixels: Vec<Rgb>,
    /// Presentation time of the frame in seconds
    pub timestamp: f64,
}

impl Frame {
    /// A frame filled with a single color
    pub fn solid(width: u32, height: u32, color: Rgb, timestamp: f64) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
            timestamp,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// A 2D bitmap drawing target.
///
/// The core only ever uses these three primitives; anything that can clear,
/// fill a rectangle and blit an image can host a waveform or a preview.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Reset a region to transparent
    fn clear_rect(&mut self, rect: Rect);

    fn fill_rect(&mut self, rect: Rect, color: Rgb);

    /// Draw `frame` scaled into `dest`
    fn draw_image(&mut self, frame: &Frame, dest: Rect);
}

/// In-memory surface used by the CLI and by tests.
///
/// Pixels are `None` when cleared. Rectangle edges are rounded to the nearest
/// pixel boundary, so rectangles that share an edge never overlap or leave a
/// gap between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Option<Rgb>>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// True when no pixel has been painted
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(Option::is_none)
    }

    /// Pixel span `[start, end)` covered by `[from, to)` along an axis of `limit` pixels
    fn span(from: f64, to: f64, limit: u32) -> (u32, u32) {
        let to_px = |v: f64| -> u32 {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, limit as f64) as u32
            }
        };
        let (start, end) = (to_px(from), to_px(to));
        (start, end.max(start))
    }

    fn cols(&self, rect: &Rect) -> (u32, u32) {
        Self::span(rect.x, rect.right(), self.width)
    }

    fn rows(&self, rect: &Rect) -> (u32, u32) {
        Self::span(rect.y, rect.bottom(), self.height)
    }

    fn paint(&mut self, rect: Rect, value: Option<Rgb>) {
        let (x0, x1) = self.cols(&rect);
        let (y0, y1) = self.rows(&rect);
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            for x in x0..x1 {
                self.pixels[row + x as usize] = value;
            }
        }
    }

    /// Render the bitmap as text, one character per `cell` pixels square.
    ///
    /// A cell prints `glyph(color)` for its first painted pixel or a space when
    /// the whole cell is clear.
    pub fn to_text(&self, cell: u32, glyph: impl Fn(Rgb) -> char) -> String {
        let cell = cell.max(1);
        let mut out = String::new();
        let mut y = 0;
        while y < self.height {
            let mut x = 0;
            while x < self.width {
                let painted = (y..(y + cell).min(self.height))
                    .flat_map(|cy| (x..(x + cell).min(self.width)).map(move |cx| (cx, cy)))
                    .find_map(|(cx, cy)| self.pixel(cx, cy));
                out.push(painted.map(&glyph).unwrap_or(' '));
                x += cell;
            }
            out.push('\n');
            y += cell;
        }
        out
    }
}

impl Surface for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.paint(rect, None);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.paint(rect, Some(color));
    }

    fn draw_image(&mut self, frame: &Frame, dest: Rect) {
        if frame.width == 0 || frame.height == 0 {
            return;
        }
        let (x0, x1) = self.cols(&dest);
        let (y0, y1) = self.rows(&dest);
        let (dw, dh) = ((x1 - x0).max(1) as u64, (y1 - y0).max(1) as u64);

        // Nearest-neighbour scaling
        for y in y0..y1 {
            let sy = ((y - y0) as u64 * frame.height as u64 / dh) as u32;
            for x in x0..x1 {
                let sx = ((x - x0) as u64 * frame.width as u64 / dw) as u32;
                if let Some(color) = frame.pixel(sx, sy) {
                    self.pixels[(y * self.width + x) as usize] = Some(color);
                }
            }
        }
    }
}
