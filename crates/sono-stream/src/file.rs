use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use sono_core::traits::SpectralSource;

use crate::fft::FftPipeline;

/// Source fichier : décodage symphonia puis lecture par pas de `fft_size`.
///
/// Chaque `frequency_frame` consomme exactement une frame d'échantillons,
/// si bien qu'un tick du pipeline avance d'une durée de frame dans le
/// fichier. À l'épuisement, la source lève son drapeau `finished` et
/// émet le sentinel `-inf`.
///
/// # Example
/// ```no_run
/// use sono_stream::file::FileSource;
/// let source = FileSource::open("session.wav", 1024).unwrap();
/// let finished = source.finished_flag();
/// ```
pub struct FileSource {
    samples: Vec<f32>,
    sample_rate: u32,
    /// Position de lecture (début de la prochaine frame).
    cursor: usize,
    fft_size: usize,
    fft: FftPipeline,
    finished: Arc<AtomicBool>,
}

impl FileSource {
    /// Décode un fichier audio (WAV, MP3, FLAC, OGG, AAC) en mono f32.
    ///
    /// # Errors
    /// Fichier illisible, format inconnu, ou décodage impossible.
    pub fn open(path: impl AsRef<Path>, fft_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let (samples, sample_rate) = decode_file(path)?;
        if samples.is_empty() {
            anyhow::bail!("Fichier audio vide : {}", path.display());
        }
        Ok(Self {
            samples,
            sample_rate,
            cursor: 0,
            fft_size,
            fft: FftPipeline::new(fft_size),
            finished: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Taux d'échantillonnage du fichier décodé.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Durée du fichier en secondes.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Drapeau partagé levé quand la lecture atteint la fin du fichier.
    #[must_use]
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }
}

impl SpectralSource for FileSource {
    fn frequency_frame(&mut self, out: &mut [f32]) {
        let end = self.cursor + self.fft_size;
        if end > self.samples.len() {
            self.finished.store(true, Ordering::Release);
            out.fill(f32::NEG_INFINITY);
            return;
        }
        self.fft.process_db(&self.samples[self.cursor..end], out);
        self.cursor = end;
    }

    fn waveform_frame(&mut self, out: &mut [f32]) {
        // La fenêtre que frequency_frame vient de consommer.
        let end = self.cursor.min(self.samples.len());
        let n = out.len().min(end);
        let pad = out.len() - n;
        out[..pad].fill(0.0);
        out[pad..].copy_from_slice(&self.samples[end - n..end]);
    }
}

/// Decode an audio file into mono f32 samples.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
fn decode_file(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track found")?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let track_id = track.id;
    let mut all_samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono
        for chunk in buf.samples().chunks(channels) {
            let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
            all_samples.push(mono);
        }
    }

    log::info!(
        "Decoded {} samples @ {sample_rate}Hz from {}",
        all_samples.len(),
        path.display()
    );

    Ok((all_samples, sample_rate))
}
