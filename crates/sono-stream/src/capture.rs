use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};
use sono_core::config::ExtractorConfig;
use sono_core::traits::SpectralSource;

use crate::error::StreamError;
use crate::fft::FftPipeline;

/// Source microphone via cpal.
///
/// Le callback cpal downmixe en mono et pousse dans un ring buffer
/// lock-free ; côté pipeline, une fenêtre glissante des `fft_size`
/// derniers échantillons alimente la FFT. Tant qu'une fenêtre complète
/// n'est pas arrivée, la frame fréquentielle est remplie du sentinel
/// `-inf` (pas encore de signal).
///
/// Le stream cpal vit avec la source : la dropper libère le matériel.
///
/// # Example
/// ```no_run
/// use sono_core::config::ExtractorConfig;
/// use sono_stream::capture::MicSource;
/// let source = MicSource::open(&ExtractorConfig::default()).unwrap();
/// ```
pub struct MicSource {
    _stream: cpal::Stream,
    consumer: Consumer<f32>,
    fft: FftPipeline,
    /// Fenêtre glissante des `fft_size` derniers échantillons.
    window: Vec<f32>,
    /// Échantillons fraîchement tirés du ring à chaque tick.
    scratch: Vec<f32>,
    /// Total d'échantillons reçus depuis l'ouverture.
    received: usize,
    sample_rate: u32,
}

impl MicSource {
    /// Ouvre le périphérique d'entrée par défaut et démarre la capture.
    ///
    /// # Errors
    /// `StreamError::NoInputDevice` sans périphérique d'entrée,
    /// `StreamError::Device` si le stream ne peut pas être construit.
    pub fn open(config: &ExtractorConfig) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(StreamError::NoInputDevice)?;

        let device_config = device
            .default_input_config()
            .map_err(|e| StreamError::Device(e.to_string()))?;
        let sample_rate = device_config.sample_rate().0;
        let channels = device_config.channels() as usize;

        if sample_rate != config.sample_rate_hz {
            log::warn!(
                "Taux du périphérique ({sample_rate} Hz) différent de la config ({} Hz)",
                config.sample_rate_hz
            );
        }

        // Ring buffer: 2 seconds of audio @ sample_rate
        let buf_size = sample_rate as usize * 2;
        let (mut producer, consumer) = RingBuffer::new(buf_size);

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Downmix to mono and push into ring buffer
                    for chunk in data.chunks(channels) {
                        let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                        let _ = producer.push(mono);
                    }
                },
                |err| {
                    log::error!("Audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| StreamError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| StreamError::Device(e.to_string()))?;

        log::info!("Capture micro démarrée @ {sample_rate}Hz");

        Ok(Self {
            _stream: stream,
            consumer,
            fft: FftPipeline::new(config.fft_size),
            window: vec![0.0; config.fft_size],
            scratch: Vec::with_capacity(buf_size),
            received: 0,
            sample_rate,
        })
    }

    /// Taux d'échantillonnage effectif du périphérique.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Tire tout ce que le ring contient et fait glisser la fenêtre.
    fn drain_ring(&mut self) {
        self.scratch.clear();
        while let Ok(sample) = self.consumer.pop() {
            self.scratch.push(sample);
        }
        self.received += self.scratch.len();

        let w = self.window.len();
        let fresh = self.scratch.len();
        if fresh >= w {
            self.window.copy_from_slice(&self.scratch[fresh - w..]);
        } else if fresh > 0 {
            self.window.copy_within(fresh.., 0);
            self.window[w - fresh..].copy_from_slice(&self.scratch);
        }
    }

    fn has_full_window(&self) -> bool {
        self.received >= self.window.len()
    }
}

impl SpectralSource for MicSource {
    fn frequency_frame(&mut self, out: &mut [f32]) {
        self.drain_ring();
        if self.has_full_window() {
            self.fft.process_db(&self.window, out);
        } else {
            out.fill(f32::NEG_INFINITY);
        }
    }

    fn waveform_frame(&mut self, out: &mut [f32]) {
        let w = self.window.len();
        let n = out.len().min(w);
        out[..n].copy_from_slice(&self.window[w - n..]);
        if n < out.len() {
            out[n..].fill(0.0);
        }
    }
}
