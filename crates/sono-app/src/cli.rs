use std::path::PathBuf;

use clap::Parser;

/// sonoscope — streaming spectrogram classifier demo.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source audio : microphone par défaut du système.
    #[arg(long, default_value_t = false)]
    pub mic: bool,

    /// Source audio : chemin vers un fichier (WAV, MP3, FLAC, OGG, AAC).
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Fichier de configuration TOML du pipeline. Défaut : valeurs intégrées.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Labels des classes, séparés par des virgules.
    #[arg(long, default_value = "calme,parole,commande")]
    pub classes: String,

    /// Durée maximale de la session en secondes. 0 = jusqu'à ctrl-c ou
    /// fin de fichier.
    #[arg(long, default_value_t = 0)]
    pub duration: u64,

    /// Maintenir la file d'audio brut en parallèle du spectrogramme.
    #[arg(long, default_value_t = false)]
    pub raw_audio: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one audio source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one source is specified.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        let count = usize::from(self.mic) + usize::from(self.audio.is_some());
        if count == 0 {
            anyhow::bail!("Aucune source audio spécifiée. Utilisez --mic ou --audio <fichier>.");
        }
        if count > 1 {
            anyhow::bail!("Une seule source audio à la fois : --mic OU --audio.");
        }
        Ok(())
    }

    /// Labels de classes, nettoyés de leurs espaces ; entrées vides ignorées.
    #[must_use]
    pub fn class_labels(&self) -> Vec<String> {
        self.classes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}
