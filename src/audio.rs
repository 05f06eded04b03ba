//! Audio output using the Web Audio API
//!
//! Every cue is a procedurally generated oscillator note - no sound files.
//! The context is created lazily from a user gesture and closed on teardown.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::feedback::{Tone, Waveform};

/// Envelope floor for exponential ramps (must stay above zero)
const SILENCE: f32 = 0.0001;

/// Owned Web Audio context for one overlay
pub struct WebAudio {
    ctx: AudioContext,
}

impl WebAudio {
    /// Create the context. Must be called from a user gesture handler.
    pub fn new() -> Option<Self> {
        // May fail outside a secure context or without audio hardware
        let ctx = match AudioContext::new() {
            Ok(ctx) => ctx,
            Err(e) => {
                log::warn!("Failed to create AudioContext ({e:?}) - audio disabled");
                return None;
            }
        };
        let _ = ctx.resume();
        Some(Self { ctx })
    }

    /// Play one note
    pub fn play(&self, tone: &Tone) {
        // Resume context if suspended (browsers require user gesture)
        if self.ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = self.ctx.resume();
        }

        let Some((osc, gain)) = self.create_osc(tone.start_hz, waveform_type(tone.waveform)) else {
            return;
        };
        let t = self.ctx.current_time() + f64::from(tone.delay_s);
        let end = t + f64::from(tone.duration_s);

        gain.gain().set_value_at_time(tone.gain.max(SILENCE), t).ok();
        gain.gain().exponential_ramp_to_value_at_time(SILENCE, end).ok();

        if tone.end_hz != tone.start_hz {
            osc.frequency().set_value_at_time(tone.start_hz, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(tone.end_hz.max(1.0), end)
                .ok();
        }

        osc.start_with_when(t).ok();
        osc.stop_with_when(end + 0.05).ok();
    }

    /// Close the context, releasing the audio device
    pub fn close(self) {
        if let Err(e) = self.ctx.close() {
            log::warn!("AudioContext close failed: {e:?}");
        }
    }

    /// Create an oscillator routed through a gain node
    fn create_osc(&self, freq: f32, osc_type: OscillatorType) -> Option<(OscillatorNode, GainNode)> {
        let osc = self.ctx.create_oscillator().ok()?;
        let gain = self.ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&self.ctx.destination()).ok()?;

        Some((osc, gain))
    }
}

fn waveform_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Triangle => OscillatorType::Triangle,
        Waveform::Sawtooth => OscillatorType::Sawtooth,
    }
}
