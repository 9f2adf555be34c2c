//! Autoplay support probe using a detached, muted video element

use crate::media::{js_message, play_error};
use async_trait::async_trait;
use autoplay_core::{AutoplayProbe, Error, ProbeAttempt, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlVideoElement;

/// Probe clip length in samples at 8 kHz (~1/8 s)
const PROBE_SAMPLES: u32 = 1000;
const PROBE_SAMPLE_RATE: u32 = 8000;

/// Tries to start a tiny silent clip without a user gesture
#[derive(Debug, Default)]
pub struct VideoElementProbe;

impl VideoElementProbe {
    pub fn new() -> Self {
        Self
    }

    fn create_element() -> Result<HtmlVideoElement> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| Error::playback("no document"))?;

        let video = document
            .create_element("video")
            .map_err(|e| Error::playback(js_message(&e)))?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| Error::playback("video is not an HtmlVideoElement"))?;

        video.set_muted(true);
        let _ = video.set_attribute("muted", "");
        let _ = video.set_attribute("playsinline", "");
        video.set_src(&silent_wav_uri());
        Ok(video)
    }
}

#[async_trait(?Send)]
impl AutoplayProbe for VideoElementProbe {
    async fn attempt(&self) -> Result<ProbeAttempt> {
        let video = Self::create_element()?;

        // play() is called reflectively: legacy engines return undefined
        let play = Reflect::get(&video, &JsValue::from_str("play"))
            .map_err(play_error)?
            .dyn_into::<Function>()
            .map_err(|_| Error::playback("play is not a function"))?;
        let result = play.call0(&video).map_err(play_error)?;

        let attempt = match result.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map(|_| ProbeAttempt::Resolved)
                .map_err(play_error),
            Err(_) => Ok(ProbeAttempt::NoPendingResult),
        };

        let _ = video.pause();
        video.remove_attribute("src").ok();
        attempt
    }
}

/// `data:` URI of a short silent 8-bit mono PCM WAV clip
pub fn silent_wav_uri() -> String {
    format!(
        "data:audio/wav;base64,{}",
        STANDARD.encode(silent_wav(PROBE_SAMPLE_RATE, PROBE_SAMPLES))
    )
}

fn silent_wav(sample_rate: u32, samples: u32) -> Vec<u8> {
    let data_len = samples;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes()); // byte rate
    wav.extend_from_slice(&1u16.to_le_bytes()); // block align
    wav.extend_from_slice(&8u16.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    // 8-bit PCM is unsigned, 128 is silence
    wav.resize(44 + data_len as usize, 128);

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header() {
        let wav = silent_wav(8000, 10);
        assert_eq!(wav.len(), 54);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 46);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(&wav[36..40], b"data");
        assert!(wav[44..].iter().all(|&b| b == 128));
    }

    #[test]
    fn test_uri_prefix() {
        let uri = silent_wav_uri();
        assert!(uri.starts_with("data:audio/wav;base64,UklGR"));
    }
}
