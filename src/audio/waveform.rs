// src/audio/waveform.rs

use std::fmt::Write;

use crate::audio::types::{AudioAsset, WaveformPeaks};

/// How the waveform image is drawn
#[derive(Debug, Clone)]
pub struct WaveformStyle {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub wave_color: String,
    pub text_color: String,
    pub title: String,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 400,
            background: "#0e1117".to_string(),
            wave_color: "cyan".to_string(),
            text_color: "white".to_string(),
            title: "Waveform".to_string(),
        }
    }
}

// Plot margins in pixels: left, right, top, bottom
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 52.0;

/// Compute min/max peaks for `num_peaks` equal-width segments of the asset
///
/// Each peak spans all channels of the frames in its segment. Segments
/// that receive no frames (more peaks than frames) stay at zero. The
/// asset itself is only read.
pub fn compute_peaks(audio: &AudioAsset, num_peaks: usize) -> WaveformPeaks {
    let mut min_peaks = vec![f32::MAX; num_peaks];
    let mut max_peaks = vec![f32::MIN; num_peaks];

    let total_frames = audio.frame_count();
    let channels = audio.channels() as usize;

    if num_peaks > 0 && total_frames > 0 {
        let frames_per_peak = total_frames as f64 / num_peaks as f64;

        for (frame_idx, frame) in audio.samples().chunks_exact(channels).enumerate() {
            let peak_idx = ((frame_idx as f64 / frames_per_peak) as usize).min(num_peaks - 1);

            for &sample in frame {
                min_peaks[peak_idx] = min_peaks[peak_idx].min(sample);
                max_peaks[peak_idx] = max_peaks[peak_idx].max(sample);
            }
        }
    }

    // Segments that never saw a frame draw as silence
    for (min, max) in min_peaks.iter_mut().zip(max_peaks.iter_mut()) {
        if *min == f32::MAX {
            *min = 0.0;
        }
        if *max == f32::MIN {
            *max = 0.0;
        }
    }

    WaveformPeaks {
        min_peaks,
        max_peaks,
        num_peaks,
        duration_seconds: audio.duration_seconds(),
        channels: audio.channels(),
        sample_rate: audio.sample_rate(),
    }
}

/// Render the asset's waveform as a standalone SVG document
///
/// Amplitude runs on the Y axis (fixed at [-1, 1]) and time in seconds on
/// the X axis. The signal is decimated to one min/max pair per pixel
/// column of the plot area.
pub fn render_svg(audio: &AudioAsset, style: &WaveformStyle) -> String {
    let width = style.width.max(MARGIN_LEFT as u32 + MARGIN_RIGHT as u32 + 1) as f64;
    let height = style.height.max(MARGIN_TOP as u32 + MARGIN_BOTTOM as u32 + 1) as f64;
    let plot_width = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = height - MARGIN_TOP - MARGIN_BOTTOM;
    let mid_y = MARGIN_TOP + plot_height / 2.0;

    let peaks = compute_peaks(audio, plot_width as usize);
    let duration = peaks.duration_seconds;

    let mut svg = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = width,
        h = height,
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        escape(&style.background)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{x}" y="24" fill="{c}" font-size="16" text-anchor="middle">{t}</text>"#,
        x = MARGIN_LEFT + plot_width / 2.0,
        c = escape(&style.text_color),
        t = escape(&style.title),
    );

    // One vertical line per column from min to max; nothing for an empty asset
    if audio.frame_count() > 0 && !peaks.min_peaks.is_empty() {
        let mut path = String::new();
        for (column, (min, max)) in peaks.min_peaks.iter().zip(&peaks.max_peaks).enumerate() {
            let x = MARGIN_LEFT + column as f64 + 0.5;
            let top = mid_y - *max as f64 * plot_height / 2.0;
            let bottom = mid_y - *min as f64 * plot_height / 2.0;
            // Keep silent stretches visible as a hairline
            let bottom = if (bottom - top).abs() < 0.5 { top + 0.5 } else { bottom };
            let _ = write!(path, "M{:.1} {:.1}V{:.1}", x, top, bottom);
        }
        let _ = writeln!(
            svg,
            r#"<path d="{}" stroke="{}" stroke-width="1" fill="none"/>"#,
            path,
            escape(&style.wave_color)
        );
    }

    // Axes
    let axis_color = escape(&style.text_color);
    let _ = writeln!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}"/>"#,
        MARGIN_LEFT, MARGIN_TOP, plot_width, plot_height, axis_color
    );

    for amplitude in [-1.0, -0.5, 0.0, 0.5, 1.0] {
        let y = mid_y - amplitude * plot_height / 2.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{x0}" y1="{y:.1}" x2="{x1}" y2="{y:.1}" stroke="{c}"/><text x="{tx}" y="{ty:.1}" fill="{c}" text-anchor="end">{a}</text>"#,
            x0 = MARGIN_LEFT - 4.0,
            x1 = MARGIN_LEFT,
            y = y,
            c = axis_color,
            tx = MARGIN_LEFT - 8.0,
            ty = y + 4.0,
            a = amplitude,
        );
    }

    if duration > 0.0 {
        let step = tick_step(duration);
        let mut tick = 0.0;
        while tick <= duration + step * 1e-9 {
            let x = MARGIN_LEFT + tick / duration * plot_width;
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.1}" y1="{y0}" x2="{x:.1}" y2="{y1}" stroke="{c}"/><text x="{x:.1}" y="{ty}" fill="{c}" text-anchor="middle">{label}</text>"#,
                x = x,
                y0 = MARGIN_TOP + plot_height,
                y1 = MARGIN_TOP + plot_height + 4.0,
                c = axis_color,
                ty = MARGIN_TOP + plot_height + 18.0,
                label = format_seconds(tick, step),
            );
            tick += step;
        }
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" fill="{}" text-anchor="middle">Time (s)</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        height - 10.0,
        axis_color
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{y}" fill="{c}" text-anchor="middle" transform="rotate(-90 16 {y})">Amplitude</text>"#,
        y = mid_y,
        c = axis_color
    );
    svg.push_str("</svg>\n");
    svg
}

/// Pick a 1/2/5 x 10^n spacing that gives roughly ten ticks
fn tick_step(duration: f64) -> f64 {
    let raw = duration / 10.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_seconds(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    };
    format!("{:.*}", decimals, value)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
