//! Drawing a waveform and mapping pointer positions back to playback time.

use crate::config::WaveformOptions;
use crate::surface::{Rect, Rgb, Surface};

/// Colors and grouping used when drawing bars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformStyle {
    pub bar_color: Rgb,
    pub listened_bar_color: Rgb,
    pub merge_amount: u32,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self::from(&WaveformOptions::default())
    }
}

impl From<&WaveformOptions> for WaveformStyle {
    fn from(options: &WaveformOptions) -> Self {
        Self {
            bar_color: options.bar_color,
            listened_bar_color: options.listened_bar_color,
            merge_amount: options.merge_amount,
        }
    }
}

/// Number of leading bars drawn in the listened color
pub fn listened_bars(progress_percent: f64, bars: usize) -> usize {
    if !progress_percent.is_finite() {
        return 0;
    }
    let fraction = progress_percent.clamp(0.0, 100.0) / 100.0;
    ((fraction * bars as f64).floor() as usize).min(bars)
}

/// Rectangle of bar `index` out of `bars` on a `width` x `height` surface.
///
/// Slots tile the width exactly; the last slot takes whatever the division
/// leaves. With `merge_amount > 1` the final bar of each run is one pixel
/// narrower so runs read as separate groups.
pub fn bar_rect(
    index: usize,
    bars: usize,
    amplitude: f32,
    width: f64,
    height: f64,
    merge_amount: u32,
) -> Rect {
    let slot = width / bars as f64;
    let x = index as f64 * slot;
    let mut bar_width = if index + 1 == bars { width - x } else { slot };

    let merge = merge_amount as usize;
    let ends_run = (index + 1) % merge.max(1) == 0 || index + 1 == bars;
    if merge > 1 && ends_run && bar_width > 1.0 {
        bar_width -= 1.0;
    }

    let amplitude = if amplitude.is_finite() {
        amplitude.clamp(0.0, 1.0) as f64
    } else {
        0.0
    };
    let bar_height = amplitude * height;

    Rect::new(x, height - bar_height, bar_width, bar_height)
}

/// Draw `amplitudes` across the whole surface with `progress_percent` of the
/// bars in the listened color
pub fn render(
    surface: &mut dyn Surface,
    amplitudes: &[f32],
    progress_percent: f64,
    style: &WaveformStyle,
) {
    let (width, height) = (surface.width(), surface.height());
    surface.clear_rect(Rect::full(width, height));

    let bars = amplitudes.len();
    if bars == 0 {
        return;
    }

    let listened = listened_bars(progress_percent, bars);
    for (index, amplitude) in amplitudes.iter().enumerate() {
        let rect = bar_rect(
            index,
            bars,
            *amplitude,
            width as f64,
            height as f64,
            style.merge_amount,
        );
        let color = if index < listened {
            style.listened_bar_color
        } else {
            style.bar_color
        };
        surface.fill_rect(rect, color);
    }
}

/// Playback time for a click `click_x` pixels from the left edge.
///
/// `None` while the duration is unknown so a click never seeks to NaN.
pub fn map_click_to_time(click_x: f64, surface_width: u32, duration: Option<f64>) -> Option<f64> {
    let duration = duration.filter(|d| d.is_finite() && *d >= 0.0)?;
    if surface_width == 0 || !click_x.is_finite() {
        return None;
    }
    let fraction = (click_x / surface_width as f64).clamp(0.0, 1.0);
    Some(fraction * duration)
}

/// Index of the bar drawn at `x`, the inverse of [`bar_rect`]'s slot layout
pub fn bar_at(x: f64, surface_width: u32, bars: usize) -> Option<usize> {
    if bars == 0 || surface_width == 0 || !x.is_finite() || x < 0.0 || x >= surface_width as f64 {
        return None;
    }
    let slot = surface_width as f64 / bars as f64;
    Some(((x / slot).floor() as usize).min(bars - 1))
}
