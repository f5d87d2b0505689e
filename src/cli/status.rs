use crate::error::{ErrorSeverity, PlayerError, QualityError};
use crate::logging::EventStatistics;
use crate::models::{format_seconds, PlayerSnapshot};
use crate::surface::{Bitmap, Surface};
use crate::waveform::{render::WaveformStyle, WaveformSample};

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display the full status of a video player
    pub fn display_full_status(snapshot: &PlayerSnapshot, preview: &Bitmap) {
        for line in Self::status_lines(snapshot, preview) {
            println!("{}", line);
        }
    }

    /// Status box lines for a video player snapshot
    pub fn status_lines(snapshot: &PlayerSnapshot, preview: &Bitmap) -> Vec<String> {
        let mut lines = vec!["┌─ Player Status ─────────────────────────────────────────┐".to_string()];

        match &snapshot.source {
            Some(source) => {
                lines.push(format!("│ Source: {}", Self::truncate(&source.url, 48)));
                lines.push(format!("│ Session: {}", snapshot.epoch));
            }
            None => lines.push("│ No source loaded".to_string()),
        }

        let playback = &snapshot.playback;
        lines.push("│".to_string());
        lines.push(format!(
            "│ Status: {}{}",
            if playback.is_playing { "Playing" } else { "Paused" },
            if snapshot.loading { " (buffering)" } else { "" }
        ));
        lines.push(format!(
            "│ Position: {} / {}",
            playback.position_formatted(),
            playback.duration_formatted()
        ));
        lines.push(format!(
            "│ Progress: [{}] {:.1}%",
            Self::progress_bar(playback.progress_percent() / 100.0, 40),
            playback.progress_percent()
        ));

        if let Some(scrub) = &snapshot.scrub {
            lines.push(format!(
                "│ Scrubbing: [{}] {}",
                Self::progress_bar(snapshot.scrub_fraction, 40),
                format_seconds(scrub.preview_time)
            ));
            lines.push(format!("│ Preview: {}", Self::preview_description(preview)));
        }

        lines.push("│".to_string());
        lines.push(format!("│ Volume: {}%", (playback.volume * 100.0).round() as u8));
        lines.push(format!(
            "│ Rate: {}",
            snapshot
                .playback_rates
                .iter()
                .map(|rate| Self::marked(&format!("{}x", rate.value), rate.enabled))
                .collect::<Vec<_>>()
                .join(" ")
        ));

        if snapshot.available_levels.is_empty() {
            lines.push("│ Quality: auto".to_string());
        } else {
            lines.push(format!(
                "│ Quality: {}",
                snapshot
                    .available_levels
                    .iter()
                    .map(|level| Self::marked(
                        &format!("{}:{}", level.value.index, level.value.label),
                        level.enabled
                    ))
                    .collect::<Vec<_>>()
                    .join(" ")
            ));
            if let Some(requested) = snapshot.requested_level {
                if snapshot.active_level != Some(requested) {
                    lines.push(format!("│ Switching to level {}...", requested));
                }
            }
        }

        lines.push("└─────────────────────────────────────────────────────────┘".to_string());
        lines
    }

    /// Display compact status information
    pub fn display_compact_status(snapshot: &PlayerSnapshot) {
        println!("{}", Self::compact_status(snapshot));
    }

    pub fn compact_status(snapshot: &PlayerSnapshot) -> String {
        let playback = &snapshot.playback;
        let state = if snapshot.is_dragging() {
            "Scrubbing"
        } else if playback.is_playing {
            "Playing"
        } else {
            "Paused"
        };
        format!(
            "{} | {}/{} ({:.0}%) | {}x | vol {}%",
            state,
            playback.position_formatted(),
            playback.duration_formatted(),
            playback.progress_percent(),
            playback.playback_rate,
            (playback.volume * 100.0).round() as u8
        )
    }

    /// Display a rendered waveform with a short summary
    pub fn display_waveform(name: &str, bitmap: &Bitmap, style: &WaveformStyle, waveform: Option<&WaveformSample>) {
        println!("┌─ Waveform: {} ", Self::truncate(name, 44));
        if let Some(waveform) = waveform {
            println!(
                "│ {} bars, {} samples per bar",
                waveform.len(),
                waveform.block_size()
            );
        }
        // One character per cell, at most 100 columns
        let cell = bitmap.width().div_ceil(100).max(1);
        for line in Self::waveform_text(bitmap, style, cell).lines() {
            println!("│ {}", line);
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Text rendering of a waveform surface: `█` for listened bars, `▒` for the rest
    pub fn waveform_text(bitmap: &Bitmap, style: &WaveformStyle, cell: u32) -> String {
        let listened = style.listened_bar_color;
        bitmap.to_text(cell, |color| if color == listened { '█' } else { '▒' })
    }

    /// Describe what the preview surface currently shows
    pub fn preview_description(preview: &Bitmap) -> String {
        match preview.pixel(0, 0) {
            Some(color) => format!("frame {}", color),
            None if preview.is_blank() => "waiting for frame".to_string(),
            None => "partial frame".to_string(),
        }
    }

    /// Display event history counters
    pub fn display_event_statistics(stats: &EventStatistics) {
        println!("┌─ Events ────────────────────────────────────────────────┐");
        println!("│ Total: {}", stats.total_events);
        println!("│ Seeks: {}", stats.seeks);
        println!(
            "│ Preview frames: {} drawn, {} dropped",
            stats.previews_drawn, stats.previews_dropped
        );
        println!("│ Stale results: {}", stats.stale_results);
        println!("│ Decode errors: {}", stats.decode_errors);
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
        };

        eprintln!("┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon, severity.as_str());

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        Self::display_error_context(error);

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display additional context for specific error types
    fn display_error_context(error: &PlayerError) {
        match error {
            PlayerError::Quality(QualityError::LevelSwitchUnavailable) => {
                eprintln!("│");
                eprintln!("│ Quality levels appear once an .m3u8 manifest is parsed");
            }
            PlayerError::Quality(QualityError::UnsupportedRate { .. }) => {
                eprintln!("│");
                eprintln!("│ Use 'status' to see the selectable rates");
            }
            PlayerError::Config(_) => {
                eprintln!("│");
                eprintln!("│ Configuration will use default values");
            }
            _ => {}
        }
    }

    /// Display error with a note on whether the session can continue
    pub fn display_error_with_recovery(error: &PlayerError) {
        Self::display_error(error);

        if !error.is_recoverable() {
            eprintln!();
            eprintln!("⚠  Reload the source or change the input to continue.");
        }
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        let severity = error.severity();
        eprintln!("[{}] {}", severity.as_str(), error.user_message());

        let suggestions = error.recovery_suggestions();
        if let Some(first) = suggestions.first() {
            eprintln!("Suggestion: {}", first);
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + word.len() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        lines
    }

    /// `width` cells, filled up to `fraction`
    pub fn progress_bar(fraction: f64, width: usize) -> String {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let filled = (fraction * width as f64) as usize;
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    /// Brackets mark the value that is active, i.e. not selectable
    fn marked(label: &str, enabled: bool) -> String {
        if enabled {
            label.to_string()
        } else {
            format!("[{}]", label)
        }
    }

    /// Truncate string to fit display width
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }
}
