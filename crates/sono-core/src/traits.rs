use crate::frame::{FeatureTensor, WaveformTensor};

/// Fournit des instantanés audio au pipeline d'extraction.
///
/// Implémenté par : `MicSource`, `FileSource` (sono-stream).
///
/// # Example
/// ```
/// use sono_core::traits::SpectralSource;
///
/// struct DummySource;
/// impl SpectralSource for DummySource {
///     fn frequency_frame(&mut self, out: &mut [f32]) { out.fill(f32::NEG_INFINITY); }
///     fn waveform_frame(&mut self, out: &mut [f32]) { out.fill(0.0); }
/// }
/// ```
pub trait SpectralSource: Send + 'static {
    /// Écrit l'instantané fréquentiel courant (magnitudes en dB) dans `out`.
    ///
    /// `out` est dimensionné à `fft_size` par l'appelant. Une source sans
    /// signal écrit le sentinel `-inf` en tête de frame (sémantique
    /// analyser WebAudio). Ne bloque JAMAIS.
    fn frequency_frame(&mut self, out: &mut [f32]);

    /// Écrit l'instantané temporel (PCM mono, [-1, 1]) correspondant au
    /// dernier `frequency_frame` dans `out`, dimensionné à `fft_size`.
    fn waveform_frame(&mut self, out: &mut [f32]);
}

/// Décision structurée retournée par la fonction de scoring.
#[derive(Clone, Debug)]
pub struct ScoreDecision {
    /// Probabilités par classe.
    pub scores: Vec<f32>,
    /// Demander une fenêtre de suppression après ce tir.
    pub suppress: bool,
}

/// Fonction de scoring opaque (le modèle pré-entraîné).
///
/// Invoquée sur le thread d'échantillonnage : les appels sont strictement
/// sérialisés, un scorer lent retarde les ticks suivants.
///
/// # Example
/// ```
/// use sono_core::frame::{FeatureTensor, WaveformTensor};
/// use sono_core::traits::{ScoreDecision, Scorer};
///
/// struct DummyScorer;
/// impl Scorer for DummyScorer {
///     fn score(
///         &mut self,
///         _spectrogram: &FeatureTensor,
///         _waveform: Option<&WaveformTensor>,
///     ) -> anyhow::Result<ScoreDecision> {
///         Ok(ScoreDecision { scores: vec![1.0], suppress: false })
///     }
/// }
/// ```
pub trait Scorer: Send + 'static {
    /// Évalue une fenêtre spectrale normalisée et, si activé, le tensor
    /// audio brut correspondant.
    ///
    /// # Errors
    /// Toute erreur termine la session ; elle est restituée par
    /// `FeatureExtractor::stop()`.
    fn score(
        &mut self,
        spectrogram: &FeatureTensor,
        waveform: Option<&WaveformTensor>,
    ) -> anyhow::Result<ScoreDecision>;
}
