use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration du pipeline d'extraction, sérialisable en TOML.
///
/// Chaque champ a une valeur par défaut calée sur un classifieur de
/// commandes vocales (fenêtre d'environ une seconde à 44,1 kHz).
///
/// # Example
/// ```
/// use sono_core::config::ExtractorConfig;
/// let config = ExtractorConfig::default();
/// assert_eq!(config.num_frames_per_spectrogram, 43);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Nombre de frames par fenêtre de classification.
    pub num_frames_per_spectrogram: usize,
    /// Fraction de fenêtre réutilisée entre deux tirs consécutifs [0, 1).
    pub overlap_factor: f64,
    /// Taux d'échantillonnage de la source (Hz).
    pub sample_rate_hz: u32,
    /// Taille de fenêtre FFT, en échantillons. Définit aussi la durée
    /// d'une frame : `fft_size / sample_rate_hz` secondes.
    pub fft_size: usize,
    /// Largeur de frame après troncature. 0 = garder `fft_size` valeurs.
    pub column_truncate_length: usize,
    /// Durée de suppression après un tir confiant (millisecondes).
    pub suppression_time_millis: f64,
    /// Maintenir une file parallèle d'audio brut.
    pub include_raw_audio: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            num_frames_per_spectrogram: 43,
            overlap_factor: 0.5,
            sample_rate_hz: 44_100,
            fft_size: 1024,
            column_truncate_length: 232,
            suppression_time_millis: 1000.0,
            include_raw_audio: false,
        }
    }
}

impl ExtractorConfig {
    /// Charge une configuration TOML depuis un fichier et la valide.
    ///
    /// # Errors
    /// Fichier illisible, TOML invalide, ou invariants violés.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Valide les invariants de construction du pipeline.
    ///
    /// # Errors
    /// `CoreError::Config` décrivant le premier champ invalide.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.num_frames_per_spectrogram == 0 {
            return Err(CoreError::Config(
                "num_frames_per_spectrogram doit être ≥ 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.overlap_factor) {
            return Err(CoreError::Config(format!(
                "overlap_factor hors de [0, 1) : {}",
                self.overlap_factor
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(CoreError::Config("sample_rate_hz doit être ≥ 1".into()));
        }
        if self.fft_size == 0 {
            return Err(CoreError::Config("fft_size doit être ≥ 1".into()));
        }
        if self.column_truncate_length > self.fft_size {
            return Err(CoreError::Config(format!(
                "column_truncate_length ({}) dépasse fft_size ({})",
                self.column_truncate_length, self.fft_size
            )));
        }
        if !self.suppression_time_millis.is_finite() || self.suppression_time_millis < 0.0 {
            return Err(CoreError::Config(format!(
                "suppression_time_millis doit être finie et ≥ 0 : {}",
                self.suppression_time_millis
            )));
        }
        Ok(())
    }

    /// Largeur effective des frames fréquentielles stockées.
    #[must_use]
    pub fn frame_width(&self) -> usize {
        if self.column_truncate_length == 0 {
            self.fft_size
        } else {
            self.column_truncate_length
        }
    }

    /// Durée d'une frame en secondes : `fft_size / sample_rate_hz`.
    #[must_use]
    pub fn frame_duration_secs(&self) -> f64 {
        self.fft_size as f64 / f64::from(self.sample_rate_hz)
    }

    /// Période d'échantillonnage du pipeline.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(self.frame_duration_secs())
    }

    /// Période de tir en ticks : `round(num_frames × (1 − overlap))`,
    /// plancher à 1.
    #[must_use]
    pub fn period_ticks(&self) -> u32 {
        let raw = self.num_frames_per_spectrogram as f64 * (1.0 - self.overlap_factor);
        raw.round().max(1.0) as u32
    }

    /// Durée de suppression convertie en ticks via la durée de frame.
    #[must_use]
    pub fn suppression_ticks(&self) -> u32 {
        let frame_millis = self.frame_duration_secs() * 1000.0;
        (self.suppression_time_millis / frame_millis).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn period_math() {
        let config = ExtractorConfig {
            num_frames_per_spectrogram: 40,
            overlap_factor: 0.5,
            ..ExtractorConfig::default()
        };
        assert_eq!(config.period_ticks(), 20);

        // Overlap quasi-total : plancher à 1 tick.
        let dense = ExtractorConfig {
            num_frames_per_spectrogram: 4,
            overlap_factor: 0.95,
            ..ExtractorConfig::default()
        };
        assert_eq!(dense.period_ticks(), 1);
    }

    #[test]
    fn suppression_conversion() {
        let config = ExtractorConfig {
            sample_rate_hz: 16_000,
            fft_size: 32, // frame de 2 ms
            column_truncate_length: 16,
            suppression_time_millis: 60.0,
            ..ExtractorConfig::default()
        };
        assert_eq!(config.suppression_ticks(), 30);
        assert!((config.frame_duration_secs() - 0.002).abs() < 1e-9);
    }

    #[test]
    fn invalid_fields_rejected() {
        let mut config = ExtractorConfig {
            overlap_factor: 1.0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());

        config.overlap_factor = 0.5;
        config.column_truncate_length = config.fft_size + 1;
        assert!(config.validate().is_err());

        config.column_truncate_length = 0;
        config.suppression_time_millis = -1.0;
        assert!(config.validate().is_err());

        config.suppression_time_millis = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn truncate_zero_means_full_width() {
        let config = ExtractorConfig {
            column_truncate_length: 0,
            ..ExtractorConfig::default()
        };
        assert_eq!(config.frame_width(), config.fft_size);
    }

    #[test]
    fn toml_round_trip_through_a_file() {
        let config = ExtractorConfig {
            num_frames_per_spectrogram: 40,
            include_raw_audio: true,
            ..ExtractorConfig::default()
        };
        let text = toml::to_string(&config).expect("serializable");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write config");

        let loaded = ExtractorConfig::from_path(file.path()).expect("readable config");
        assert_eq!(loaded.num_frames_per_spectrogram, 40);
        assert!(loaded.include_raw_audio);
    }

    #[test]
    fn invalid_file_contents_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"overlap_factor = 2.0\n").expect("write config");
        assert!(ExtractorConfig::from_path(file.path()).is_err());
    }
}
