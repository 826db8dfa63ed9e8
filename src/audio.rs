//! Audio playback for button clicks and interval-end sounds.

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to initialize audio output: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("Failed to play audio: {0}")]
    Play(#[from] rodio::PlayError),
    #[error("Failed to open sound file: {0}")]
    Open(#[from] std::io::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

pub struct AudioPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioPlayer {
    /// Creates a new audio player.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Plays the selected timer sound, falling back to a generated chime
    /// when the file cannot be played.
    pub fn play_timer_sound(&self, path: &Path) {
        if let Err(e) = self.play_file(path) {
            log::warn!("Failed to play {}: {}", path.display(), e);
            if let Err(e) = self.play_chime() {
                log::error!("Failed to play chime: {}", e);
            }
        }
    }

    /// Plays the short button-press click.
    pub fn play_click(&self) {
        let result = Sink::try_new(&self.handle).map(|sink| {
            let click = SineWave::new(1318.5)
                .take_duration(Duration::from_millis(40))
                .amplify(0.2);
            sink.append(click);
            sink.detach();
        });
        if let Err(e) = result {
            log::error!("Failed to play click: {}", e);
        }
    }

    fn play_file(&self, path: &Path) -> Result<(), AudioError> {
        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file))?;
        let sink = Sink::try_new(&self.handle)?;
        sink.append(source);
        sink.detach();
        Ok(())
    }

    /// Plays a pleasant two-tone chime.
    fn play_chime(&self) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.handle)?;

        // A5 then C6 with a short pause in between
        let tone1 = SineWave::new(880.0)
            .take_duration(Duration::from_millis(150))
            .amplify(0.3);
        let silence = rodio::source::Zero::<f32>::new(1, 44100)
            .take_duration(Duration::from_millis(50));
        let tone2 = SineWave::new(1046.5)
            .take_duration(Duration::from_millis(200))
            .amplify(0.3);

        sink.append(tone1);
        sink.append(silence);
        sink.append(tone2);
        sink.detach();

        Ok(())
    }
}
