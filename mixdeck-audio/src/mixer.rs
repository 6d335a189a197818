//! Mixer implementation - channel strips, crossfader and level metering

use crate::deck::DeckId;
use crate::error::recover_range;
use std::fmt;
use std::str::FromStr;

/// Upper bound of every channel and crossfader control
pub const CONTROL_MAX: f32 = 100.0;
/// Default VU decay per tick
pub const DEFAULT_VU_DECAY: f32 = 0.85;

/// A single channel strip control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelParam {
    Gain,
    EqHigh,
    EqMid,
    EqLow,
    Volume,
}

impl ChannelParam {
    pub const ALL: [ChannelParam; 5] = [
        ChannelParam::Gain,
        ChannelParam::EqHigh,
        ChannelParam::EqMid,
        ChannelParam::EqLow,
        ChannelParam::Volume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::EqHigh => "eq high",
            Self::EqMid => "eq mid",
            Self::EqLow => "eq low",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for ChannelParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel strip for one deck; every value is in 0.0 - 100.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub gain: f32,
    pub eq_high: f32,
    pub eq_mid: f32,
    pub eq_low: f32,
    pub volume: f32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            gain: 100.0,
            eq_high: 100.0,
            eq_mid: 100.0,
            eq_low: 100.0,
            volume: 75.0,
        }
    }
}

impl Channel {
    pub fn get(&self, param: ChannelParam) -> f32 {
        match param {
            ChannelParam::Gain => self.gain,
            ChannelParam::EqHigh => self.eq_high,
            ChannelParam::EqMid => self.eq_mid,
            ChannelParam::EqLow => self.eq_low,
            ChannelParam::Volume => self.volume,
        }
    }

    /// Set one control, clamped to 0.0 - 100.0 (non-finite values ignored)
    pub fn set(&mut self, param: ChannelParam, value: f32) {
        let Some(value) = recover_range(param.name(), value as f64, 0.0, CONTROL_MAX as f64) else {
            return;
        };
        let value = value as f32;
        match param {
            ChannelParam::Gain => self.gain = value,
            ChannelParam::EqHigh => self.eq_high = value,
            ChannelParam::EqMid => self.eq_mid = value,
            ChannelParam::EqLow => self.eq_low = value,
            ChannelParam::Volume => self.volume = value,
        }
    }

    /// Replace every control, each clamped as in [`Channel::set`]
    pub fn apply(&mut self, values: Channel) {
        for param in ChannelParam::ALL {
            self.set(param, values.get(param));
        }
    }

    /// Product of the three EQ bands, each normalized to 0.0 - 1.0
    pub fn eq_factor(&self) -> f32 {
        (self.eq_high / CONTROL_MAX) * (self.eq_mid / CONTROL_MAX) * (self.eq_low / CONTROL_MAX)
    }
}

/// Crossfader curve type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossfaderCurve {
    /// Constant power (equal loudness)
    #[default]
    Smooth,
    /// Linear crossfade
    Sharp,
    /// Hard switch at the center (battle style)
    Cut,
}

impl CrossfaderCurve {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Smooth => "smooth",
            Self::Sharp => "sharp",
            Self::Cut => "cut",
        }
    }

    /// Attenuation pair (deck A, deck B) for a position in 0.0 - 100.0
    pub fn attenuation(&self, position: f32) -> (f32, f32) {
        let p = position.clamp(0.0, CONTROL_MAX) / CONTROL_MAX;
        match self {
            Self::Smooth => {
                let angle = p * std::f32::consts::FRAC_PI_2;
                // cos(pi/2) rounds slightly below zero in f32
                (angle.cos().max(0.0), angle.sin().max(0.0))
            }
            Self::Sharp => (1.0 - p, p),
            Self::Cut => {
                if p < 0.5 {
                    (1.0, 0.0)
                } else {
                    (0.0, 1.0)
                }
            }
        }
    }
}

impl fmt::Display for CrossfaderCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrossfaderCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smooth" => Ok(Self::Smooth),
            "sharp" => Ok(Self::Sharp),
            "cut" => Ok(Self::Cut),
            other => Err(format!("unknown crossfader curve: {}", other)),
        }
    }
}

/// Crossfader position and curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossfader {
    /// 0.0 = full A, 50.0 = center, 100.0 = full B
    pub position: f32,
    pub curve: CrossfaderCurve,
}

impl Default for Crossfader {
    fn default() -> Self {
        Self {
            position: 50.0,
            curve: CrossfaderCurve::Smooth,
        }
    }
}

impl Crossfader {
    /// Set position, clamped to 0.0 - 100.0 (non-finite values ignored)
    pub fn set_position(&mut self, position: f32) {
        if let Some(p) = recover_range("crossfader", position as f64, 0.0, CONTROL_MAX as f64) {
            self.position = p as f32;
        }
    }

    pub fn attenuation(&self) -> (f32, f32) {
        self.curve.attenuation(self.position)
    }
}

/// Decaying peak levels for both decks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VuReading {
    pub a: f32,
    pub b: f32,
}

impl VuReading {
    pub fn get(&self, deck: DeckId) -> f32 {
        match deck {
            DeckId::A => self.a,
            DeckId::B => self.b,
        }
    }
}

/// Result of one mixer evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixFrame {
    pub output_a: f32,
    pub output_b: f32,
    pub vu: VuReading,
}

/// Output level of one channel: `volume * gain * attenuation * eq`
pub fn output_level(channel: &Channel, attenuation: f32) -> f32 {
    (channel.volume / CONTROL_MAX) * (channel.gain / CONTROL_MAX) * attenuation * channel.eq_factor()
}

/// Peak meter with decay: `max(level, previous * decay)`
#[inline]
pub fn meter(level: f32, previous: f32, decay: f32) -> f32 {
    level.max(previous * decay)
}

/// Combine both channel strips through the crossfader
///
/// Pure: the caller keeps the previous VU reading and passes it back in.
pub fn mix_channels(
    a: &Channel,
    b: &Channel,
    crossfader: &Crossfader,
    previous_vu: VuReading,
    vu_decay: f32,
) -> MixFrame {
    let (atten_a, atten_b) = crossfader.attenuation();
    let output_a = output_level(a, atten_a);
    let output_b = output_level(b, atten_b);
    MixFrame {
        output_a,
        output_b,
        vu: VuReading {
            a: meter(output_a, previous_vu.a, vu_decay),
            b: meter(output_b, previous_vu.b, vu_decay),
        },
    }
}

/// Mixer state for the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixerSnapshot {
    pub channels: [Channel; 2],
    pub crossfader: Crossfader,
    pub output_a: f32,
    pub output_b: f32,
    pub vu: VuReading,
}

/// Channel mixer holding both strips, the crossfader and the VU memory
#[derive(Debug, Clone)]
pub struct Mixer {
    channels: [Channel; 2],
    crossfader: Crossfader,
    vu_decay: f32,
    last: MixFrame,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(DEFAULT_VU_DECAY, CrossfaderCurve::default())
    }
}

impl Mixer {
    /// Create a new mixer; decay is clamped to 0.0 - <1.0
    pub fn new(vu_decay: f32, curve: CrossfaderCurve) -> Self {
        let vu_decay = if vu_decay.is_finite() {
            vu_decay.clamp(0.0, 0.999)
        } else {
            DEFAULT_VU_DECAY
        };
        Self {
            channels: [Channel::default(); 2],
            crossfader: Crossfader {
                curve,
                ..Default::default()
            },
            vu_decay,
            last: MixFrame::default(),
        }
    }

    pub fn channel(&self, deck: DeckId) -> &Channel {
        &self.channels[deck.index()]
    }

    pub fn set_channel_param(&mut self, deck: DeckId, param: ChannelParam, value: f32) {
        self.channels[deck.index()].set(param, value);
    }

    pub fn set_channel(&mut self, deck: DeckId, values: Channel) {
        self.channels[deck.index()].apply(values);
    }

    pub fn crossfader(&self) -> &Crossfader {
        &self.crossfader
    }

    pub fn set_crossfader(&mut self, position: f32) {
        self.crossfader.set_position(position);
    }

    pub fn set_curve(&mut self, curve: CrossfaderCurve) {
        self.crossfader.curve = curve;
    }

    pub fn vu_decay(&self) -> f32 {
        self.vu_decay
    }

    /// Latest mixer evaluation
    pub fn last_frame(&self) -> MixFrame {
        self.last
    }

    /// Re-evaluate the mix for one tick
    ///
    /// `live[i]` tells whether deck `i` is playing; a silent deck is metered
    /// at zero so its VU decays while the output level stays reported.
    pub fn tick(&mut self, live: [bool; 2]) -> MixFrame {
        let [a, b] = &self.channels;
        let mut frame = mix_channels(a, b, &self.crossfader, self.last.vu, self.vu_decay);
        if !live[0] {
            frame.vu.a = meter(0.0, self.last.vu.a, self.vu_decay);
        }
        if !live[1] {
            frame.vu.b = meter(0.0, self.last.vu.b, self.vu_decay);
        }
        self.last = frame;
        frame
    }

    pub fn snapshot(&self) -> MixerSnapshot {
        MixerSnapshot {
            channels: self.channels,
            crossfader: self.crossfader,
            output_a: self.last.output_a,
            output_b: self.last.output_b,
            vu: self.last.vu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_constant_power() {
        for p in 0..=100 {
            let (a, b) = CrossfaderCurve::Smooth.attenuation(p as f32);
            assert!((a * a + b * b - 1.0).abs() < 1e-5, "p={}", p);
        }
    }

    #[test]
    fn test_smooth_endpoints_never_negative() {
        assert_eq!(CrossfaderCurve::Smooth.attenuation(100.0).0, 0.0);
        assert_eq!(CrossfaderCurve::Smooth.attenuation(0.0), (1.0, 0.0));

        let channel = Channel::default();
        let crossfader = Crossfader {
            position: 100.0,
            curve: CrossfaderCurve::Smooth,
        };
        let frame = mix_channels(&channel, &channel, &crossfader, VuReading::default(), 0.85);
        assert!(frame.output_a >= 0.0);
        assert!(frame.vu.a >= 0.0);
    }

    #[test]
    fn test_cut_switches_at_center() {
        assert_eq!(CrossfaderCurve::Cut.attenuation(49.0), (1.0, 0.0));
        assert_eq!(CrossfaderCurve::Cut.attenuation(50.0), (0.0, 1.0));
        assert_eq!(CrossfaderCurve::Cut.attenuation(0.0), (1.0, 0.0));
        assert_eq!(CrossfaderCurve::Cut.attenuation(100.0), (0.0, 1.0));
    }

    #[test]
    fn test_sharp_is_linear() {
        let (a, b) = CrossfaderCurve::Sharp.attenuation(25.0);
        assert!((a - 0.75).abs() < 1e-6);
        assert!((b - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_curve_parse() {
        assert_eq!("Smooth".parse::<CrossfaderCurve>(), Ok(CrossfaderCurve::Smooth));
        assert_eq!("cut".parse::<CrossfaderCurve>(), Ok(CrossfaderCurve::Cut));
        assert!("linear".parse::<CrossfaderCurve>().is_err());
        assert_eq!(CrossfaderCurve::Sharp.to_string(), "sharp");
    }

    #[test]
    fn test_channel_clamps() {
        let mut channel = Channel::default();
        channel.set(ChannelParam::Gain, 150.0);
        assert_eq!(channel.gain, 100.0);
        channel.set(ChannelParam::EqLow, -3.0);
        assert_eq!(channel.eq_low, 0.0);
        channel.set(ChannelParam::Volume, f32::NAN);
        assert_eq!(channel.volume, 75.0);
    }

    #[test]
    fn test_output_formula() {
        let channel = Channel {
            gain: 80.0,
            eq_high: 50.0,
            eq_mid: 100.0,
            eq_low: 100.0,
            volume: 50.0,
        };
        let crossfader = Crossfader {
            position: 0.0,
            curve: CrossfaderCurve::Sharp,
        };
        let frame = mix_channels(&channel, &channel, &crossfader, VuReading::default(), 0.85);
        assert!((frame.output_a - 0.5 * 0.8 * 1.0 * 0.5).abs() < 1e-6);
        assert_eq!(frame.output_b, 0.0);
        assert_eq!(frame.vu.a, frame.output_a);
    }

    #[test]
    fn test_vu_decays_when_paused() {
        let mut mixer = Mixer::new(0.5, CrossfaderCurve::Sharp);
        mixer.set_crossfader(0.0);
        mixer.set_channel_param(DeckId::A, ChannelParam::Volume, 100.0);

        let frame = mixer.tick([true, false]);
        assert!((frame.vu.a - 1.0).abs() < 1e-6);

        let frame = mixer.tick([false, false]);
        assert!((frame.vu.a - 0.5).abs() < 1e-6);
        let frame = mixer.tick([false, false]);
        assert!((frame.vu.a - 0.25).abs() < 1e-6);
        assert_eq!(frame.vu.b, 0.0);
    }

    #[test]
    fn test_set_channel_applies_all() {
        let mut mixer = Mixer::default();
        mixer.set_channel(
            DeckId::B,
            Channel {
                gain: 60.0,
                eq_high: 120.0,
                eq_mid: 40.0,
                eq_low: 30.0,
                volume: 90.0,
            },
        );
        let channel = mixer.channel(DeckId::B);
        assert_eq!(channel.eq_high, 100.0);
        assert_eq!(channel.volume, 90.0);
        assert_eq!(*mixer.channel(DeckId::A), Channel::default());
    }
}
