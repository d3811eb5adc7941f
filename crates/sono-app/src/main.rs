use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use sono_core::config::ExtractorConfig;
use sono_core::scores::{ScoreAggregator, SessionVerdict};
use sono_core::traits::SpectralSource;
use sono_stream::capture::MicSource;
use sono_stream::extractor::FeatureExtractor;
use sono_stream::file::FileSource;

pub mod cli;
pub mod scorer;

/// Seuil de confiance au-delà duquel le scorer demande une suppression.
const CONFIDENCE_THRESHOLD: f32 = 0.7;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // 4. Charger la config
    let mut config = match &cli.config {
        Some(path) => ExtractorConfig::from_path(path)?,
        None => ExtractorConfig::default(),
    };
    if cli.raw_audio {
        config.include_raw_audio = true;
    }

    let labels = cli.class_labels();
    anyhow::ensure!(!labels.is_empty(), "Aucun label de classe fourni.");

    // 5. Construire la source audio
    let (source, file_finished): (Box<dyn SpectralSource>, Option<Arc<AtomicBool>>) =
        if let Some(path) = &cli.audio {
            let file = FileSource::open(path, config.fft_size)?;
            if file.sample_rate() != config.sample_rate_hz {
                log::info!(
                    "Taux du fichier : {} Hz (config : {} Hz), la config s'aligne",
                    file.sample_rate(),
                    config.sample_rate_hz
                );
                config.sample_rate_hz = file.sample_rate();
            }
            log::info!("Fichier chargé : {:.1}s", file.duration_secs());
            let finished = file.finished_flag();
            (Box::new(file), Some(finished))
        } else {
            let mic = MicSource::open(&config)?;
            config.sample_rate_hz = mic.sample_rate();
            (Box::new(mic), None)
        };

    // 6. Construire l'agrégateur de session et le scorer
    let aggregator = Arc::new(Mutex::new(ScoreAggregator::new(labels.len())?));
    let scoring = scorer::RecordingScorer::new(
        scorer::BandScorer::new(labels.len(), CONFIDENCE_THRESHOLD),
        Arc::clone(&aggregator),
    );

    // 7. Démarrer le pipeline
    let mut extractor = FeatureExtractor::new(config, Box::new(scoring))?;
    extractor.start(source)?;
    log::info!("Session démarrée ({} classes : {})", labels.len(), labels.join(", "));

    // 8. Attendre la fin de session : ctrl-c, durée, ou fin de fichier
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
    }
    let deadline = (cli.duration > 0).then(|| Instant::now() + Duration::from_secs(cli.duration));

    loop {
        if interrupted.load(Ordering::SeqCst) {
            log::info!("Interruption reçue, fin de session");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            log::info!("Durée écoulée, fin de session");
            break;
        }
        if file_finished
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Acquire))
        {
            log::info!("Fin du fichier, fin de session");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // 9. Arrêter le pipeline puis conclure la session
    let stop_outcome = extractor.stop();

    let verdict = aggregator
        .lock()
        .map_err(|_| anyhow::anyhow!("agrégateur empoisonné"))?
        .finalize();
    match verdict {
        SessionVerdict::NoData => {
            println!("Aucune classification : pas assez de signal pendant la session.");
        }
        SessionVerdict::Classified { means, top_class } => {
            for (label, mean) in labels.iter().zip(&means) {
                println!("{label:>12} : {mean:.3}");
            }
            println!("Verdict : {}", labels[top_class]);
        }
    }

    // Une erreur de scoring refait surface après le nettoyage.
    stop_outcome.map_err(Into::into)
}
