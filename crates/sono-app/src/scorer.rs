use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use sono_core::frame::{FeatureTensor, WaveformTensor};
use sono_core::scores::ScoreAggregator;
use sono_core::traits::{ScoreDecision, Scorer};

/// Scorer de démonstration : énergie par bande → pseudo-probabilités.
///
/// Tient lieu de modèle pré-entraîné. La frame la plus récente de la
/// fenêtre est partitionnée en `num_classes` bandes contiguës ; l'énergie
/// moyenne de chaque bande passe par un softmax. Une suppression est
/// demandée quand la classe gagnante dépasse le seuil de confiance.
pub struct BandScorer {
    num_classes: usize,
    /// Seuil de probabilité au-delà duquel une suppression est demandée.
    confidence_threshold: f32,
}

impl BandScorer {
    /// Crée un scorer pour `num_classes` bandes.
    #[must_use]
    pub fn new(num_classes: usize, confidence_threshold: f32) -> Self {
        Self {
            num_classes: num_classes.max(1),
            confidence_threshold,
        }
    }
}

impl Scorer for BandScorer {
    fn score(
        &mut self,
        spectrogram: &FeatureTensor,
        _waveform: Option<&WaveformTensor>,
    ) -> anyhow::Result<ScoreDecision> {
        let width = spectrogram.width();
        let data = spectrogram.as_slice();
        if data.len() < width || width < self.num_classes {
            return Err(anyhow!(
                "fenêtre trop étroite pour {} classes : {width} bins",
                self.num_classes
            ));
        }

        // Dernière frame de la fenêtre, la plus récente.
        let last = &data[data.len() - width..];
        let band = width / self.num_classes;

        // Énergie moyenne par bande ; la dernière bande absorbe le reste.
        let mut energies = Vec::with_capacity(self.num_classes);
        for i in 0..self.num_classes {
            let lo = i * band;
            let hi = if i == self.num_classes - 1 {
                width
            } else {
                lo + band
            };
            let sum: f32 = last[lo..hi].iter().sum();
            energies.push(sum / (hi - lo) as f32);
        }

        // Softmax numériquement stable.
        let max = energies.iter().copied().fold(f32::MIN, f32::max);
        let exps: Vec<f32> = energies.iter().map(|e| (e - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        let scores: Vec<f32> = exps.iter().map(|e| e / total).collect();

        let top = scores.iter().copied().fold(0.0f32, f32::max);
        Ok(ScoreDecision {
            suppress: top > self.confidence_threshold,
            scores,
        })
    }
}

/// Enchaîne un scorer et enregistre chaque décision dans l'agrégateur
/// partagé de la session.
pub struct RecordingScorer<S> {
    inner: S,
    aggregator: Arc<Mutex<ScoreAggregator>>,
}

impl<S> RecordingScorer<S> {
    /// Enveloppe `inner` pour alimenter `aggregator` à chaque tir.
    pub fn new(inner: S, aggregator: Arc<Mutex<ScoreAggregator>>) -> Self {
        Self { inner, aggregator }
    }
}

impl<S: Scorer> Scorer for RecordingScorer<S> {
    fn score(
        &mut self,
        spectrogram: &FeatureTensor,
        waveform: Option<&WaveformTensor>,
    ) -> anyhow::Result<ScoreDecision> {
        let decision = self.inner.score(spectrogram, waveform)?;
        self.aggregator
            .lock()
            .map_err(|_| anyhow!("agrégateur empoisonné"))?
            .record(&decision.scores)?;
        log::debug!("Tir enregistré : {:?}", decision.scores);
        Ok(decision)
    }
}
