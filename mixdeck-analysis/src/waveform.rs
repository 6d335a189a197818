//! Waveform geometry renderer
//!
//! Turns a track's amplitude sequence plus the deck's playhead, zoom and
//! markers into drawable primitives. Everything here is a pure function of
//! its inputs; no state is kept between frames.

use crate::beatgrid::BeatGrid;

/// Zoom is clamped to this upper bound
pub const MAX_ZOOM: f64 = 64.0;
/// Width of a cue flag in view units
pub const CUE_FLAG_WIDTH: f32 = 8.0;
/// Height of a cue flag in view units
pub const CUE_FLAG_HEIGHT: f32 = 10.0;
/// Opacity of the loop band
pub const LOOP_BAND_OPACITY: f32 = 0.25;

/// Size of the drawing area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 80.0,
        }
    }
}

/// Track data the renderer needs
#[derive(Debug, Clone, Copy)]
pub struct WaveformSource<'a> {
    pub bpm: f64,
    pub duration: f64,
    /// Peak amplitudes (0.0-1.0), evenly spread over the duration
    pub amplitudes: &'a [f32],
}

/// Everything that determines one frame of waveform geometry
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub source: WaveformSource<'a>,
    /// Playhead in seconds
    pub playhead: f64,
    /// Resolution multiplier (1.0 = one bar per amplitude)
    pub zoom: f64,
    /// Active loop region `[start, end)` in seconds
    pub loop_region: Option<(f64, f64)>,
    /// Cue marker positions in seconds
    pub cue_markers: &'a [f64],
    pub view: ViewSize,
}

/// A 2D point in view coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One vertical amplitude bar, centered on the view's midline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeBar {
    pub x: f32,
    pub width: f32,
    pub y: f32,
    pub height: f32,
    pub amplitude: f32,
}

/// Beat or bar line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatLine {
    pub x: f32,
    pub time: f64,
    pub is_bar: bool,
}

/// Triangular cue flag hanging from the top edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueFlag {
    pub time: f64,
    pub x: f32,
    pub points: [Point; 3],
}

/// Translucent band covering the loop region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopBand {
    pub x_start: f32,
    pub x_end: f32,
    pub opacity: f32,
}

/// Drawable geometry for a deck's waveform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformGeometry {
    pub bars: Vec<AmplitudeBar>,
    pub beat_lines: Vec<BeatLine>,
    pub cue_flags: Vec<CueFlag>,
    pub loop_band: Option<LoopBand>,
    pub playhead_x: f32,
}

impl WaveformGeometry {
    /// Check if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
            && self.beat_lines.is_empty()
            && self.cue_flags.is_empty()
            && self.loop_band.is_none()
    }
}

/// Zoom with invalid values recovered: non-finite or non-positive becomes 1.0
pub fn effective_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() || zoom <= 0.0 {
        tracing::debug!(zoom, "invalid waveform zoom, using 1.0");
        return 1.0;
    }
    zoom.min(MAX_ZOOM)
}

/// Resample amplitudes to `floor(len * zoom)` values by nearest neighbour
///
/// Zoom above 1 repeats samples, zoom below 1 skips them.
pub fn resample(amplitudes: &[f32], zoom: f64) -> Vec<f32> {
    if amplitudes.is_empty() {
        return Vec::new();
    }
    let zoom = effective_zoom(zoom);
    let count = (amplitudes.len() as f64 * zoom).floor() as usize;
    let last = amplitudes.len() - 1;

    (0..count)
        .map(|i| {
            let src = ((i as f64 / zoom).floor() as usize).min(last);
            sanitize_amplitude(amplitudes[src])
        })
        .collect()
}

#[inline]
fn sanitize_amplitude(a: f32) -> f32 {
    if a.is_finite() {
        a.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Render one frame of waveform geometry
///
/// Never fails: an empty amplitude sequence, or a source without a usable
/// BPM/duration, yields an empty geometry.
pub fn render(request: &RenderRequest<'_>) -> WaveformGeometry {
    let source = request.source;
    if source.amplitudes.is_empty() {
        return WaveformGeometry::default();
    }
    let Some(grid) = BeatGrid::new(source.bpm, source.duration) else {
        return WaveformGeometry::default();
    };

    let width = finite_or_zero(request.view.width);
    let height = finite_or_zero(request.view.height);
    let duration = grid.duration;
    let x_of = |time: f64| -> f32 { ((time / duration).clamp(0.0, 1.0) as f32) * width };

    // Amplitude bars
    let samples = resample(source.amplitudes, request.zoom);
    let bar_width = if samples.is_empty() {
        0.0
    } else {
        width / samples.len() as f32
    };
    let mid = height / 2.0;
    let bars = samples
        .iter()
        .enumerate()
        .map(|(i, &amplitude)| {
            let bar_height = amplitude * height;
            AmplitudeBar {
                x: i as f32 * bar_width,
                width: bar_width,
                y: mid - bar_height / 2.0,
                height: bar_height,
                amplitude,
            }
        })
        .collect();

    let beat_lines = grid
        .beats()
        .map(|beat| BeatLine {
            x: x_of(beat.time),
            time: beat.time,
            is_bar: beat.is_bar,
        })
        .collect();

    let cue_flags = request
        .cue_markers
        .iter()
        .filter(|t| t.is_finite())
        .map(|&time| {
            let x = x_of(time);
            let half = CUE_FLAG_WIDTH / 2.0;
            CueFlag {
                time,
                x,
                points: [
                    Point { x: x - half, y: 0.0 },
                    Point { x: x + half, y: 0.0 },
                    Point {
                        x,
                        y: CUE_FLAG_HEIGHT,
                    },
                ],
            }
        })
        .collect();

    let loop_band = request
        .loop_region
        .filter(|(start, end)| start.is_finite() && end.is_finite() && start < end)
        .map(|(start, end)| LoopBand {
            x_start: x_of(start),
            x_end: x_of(end),
            opacity: LOOP_BAND_OPACITY,
        });

    WaveformGeometry {
        bars,
        beat_lines,
        cue_flags,
        loop_band,
        playhead_x: if request.playhead.is_finite() {
            x_of(request.playhead)
        } else {
            0.0
        },
    }
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatgrid::MAX_GRID_BEATS;

    fn request<'a>(amps: &'a [f32], cues: &'a [f64]) -> RenderRequest<'a> {
        RenderRequest {
            source: WaveformSource {
                bpm: 120.0,
                duration: 8.0,
                amplitudes: amps,
            },
            playhead: 2.0,
            zoom: 1.0,
            loop_region: None,
            cue_markers: cues,
            view: ViewSize {
                width: 800.0,
                height: 100.0,
            },
        }
    }

    #[test]
    fn test_empty_amplitudes_render_empty() {
        let geometry = render(&request(&[], &[1.0]));
        assert!(geometry.is_empty());
        assert_eq!(geometry, WaveformGeometry::default());
    }

    #[test]
    fn test_invalid_source_renders_empty() {
        let amps = [0.5; 4];
        let mut req = request(&amps, &[]);
        req.source.bpm = 0.0;
        assert!(render(&req).is_empty());
    }

    #[test]
    fn test_bar_count_follows_zoom() {
        let amps = [0.1, 0.2, 0.3, 0.4, 0.5];
        let mut req = request(&amps, &[]);

        req.zoom = 2.0;
        assert_eq!(render(&req).bars.len(), 10);

        req.zoom = 0.5;
        assert_eq!(render(&req).bars.len(), 2);

        req.zoom = 1.5;
        assert_eq!(render(&req).bars.len(), 7);
    }

    #[test]
    fn test_nearest_neighbour_resampling() {
        assert_eq!(resample(&[0.1, 0.9], 2.0), vec![0.1, 0.1, 0.9, 0.9]);
        assert_eq!(resample(&[0.1, 0.2, 0.3, 0.4], 0.5), vec![0.1, 0.3]);
    }

    #[test]
    fn test_invalid_zoom_recovered() {
        let amps = [0.5; 3];
        let mut req = request(&amps, &[]);
        req.zoom = -3.0;
        assert_eq!(render(&req).bars.len(), 3);
        req.zoom = f64::NAN;
        assert_eq!(render(&req).bars.len(), 3);
    }

    #[test]
    fn test_beat_lines_and_bars() {
        let amps = [0.5; 16];
        let geometry = render(&request(&amps, &[]));
        // 120 BPM over 8 seconds: beats at 0.0, 0.5, ..., 8.0
        assert_eq!(geometry.beat_lines.len(), 17);
        let bar_lines = geometry.beat_lines.iter().filter(|l| l.is_bar).count();
        assert_eq!(bar_lines, 5);
        assert!((geometry.beat_lines[1].x - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_markers_are_time_proportional() {
        let amps = [0.5; 16];
        let cues = [4.0];
        let mut req = request(&amps, &cues);
        req.loop_region = Some((2.0, 6.0));
        let geometry = render(&req);

        assert!((geometry.playhead_x - 200.0).abs() < 1e-3);

        let flag = geometry.cue_flags[0];
        assert!((flag.x - 400.0).abs() < 1e-3);
        assert_eq!(flag.points[2].y, CUE_FLAG_HEIGHT);
        assert!((flag.points[1].x - flag.points[0].x - CUE_FLAG_WIDTH).abs() < 1e-3);

        let band = geometry.loop_band.unwrap();
        assert!((band.x_start - 200.0).abs() < 1e-3);
        assert!((band.x_end - 600.0).abs() < 1e-3);
        assert!(band.opacity < 1.0);
    }

    #[test]
    fn test_extreme_grid_renders_bounded() {
        let amps = [0.5; 8];
        let mut req = request(&amps, &[]);
        req.source.bpm = 1e300;
        req.source.duration = 1e300;
        let geometry = render(&req);
        assert_eq!(geometry.beat_lines.len(), MAX_GRID_BEATS);
        assert_eq!(geometry.bars.len(), 8);

        req.source.bpm = 1e9;
        req.source.duration = 1e9;
        assert_eq!(render(&req).beat_lines.len(), MAX_GRID_BEATS);
    }

    #[test]
    fn test_bars_are_centered() {
        let amps = [1.0, 0.5];
        let geometry = render(&request(&amps, &[]));
        let bar = geometry.bars[1];
        assert!((bar.height - 50.0).abs() < 1e-3);
        assert!((bar.y - 25.0).abs() < 1e-3);
        assert!((bar.x - 400.0).abs() < 1e-3);
    }
}
