use std::thread;
use std::time::Instant;

use sono_core::config::ExtractorConfig;
use sono_core::error::CoreError;
use sono_core::frame::{FeatureTensor, FrameQueue, WaveformTensor};
use sono_core::normalize::normalize;
use sono_core::tracker::FireTracker;
use sono_core::traits::{Scorer, SpectralSource};

use crate::error::StreamError;

/// Commande envoyée au thread d'échantillonnage.
enum Command {
    Stop,
}

/// Issue de la boucle : le scorer restitué et le résultat de la session.
type LoopOutcome = (Box<dyn Scorer>, Result<(), StreamError>);

enum State {
    Idle(Box<dyn Scorer>),
    Streaming {
        cmd_tx: flume::Sender<Command>,
        handle: thread::JoinHandle<LoopOutcome>,
    },
    /// Transitoire pendant start()/stop() ; persiste seulement si le
    /// thread a paniqué ou n'a pas pu être lancé.
    Poisoned,
}

/// Cœur du pipeline : échantillonnage périodique, fenêtre glissante,
/// porte de tir, et invocation sérialisée du scorer.
///
/// Machine à états idle → streaming → idle. `start()` lance un thread
/// d'échantillonnage nommé, cadencé à la durée de frame
/// (`fft_size / sample_rate_hz`). À chaque tick :
///
/// 1. lecture de l'instantané fréquentiel ; un sentinel `-inf` en tête
///    signifie "pas de signal", le tick est entièrement sauté ;
/// 2. troncature à `column_truncate_length` et insertion dans la fenêtre
///    glissante (plus la file d'audio brut si activée) ;
/// 3. avance de la porte de tir ; quand elle tire ET que la fenêtre est
///    pleine : aplatissement, standardisation, mise en forme des
///    tensors, scoring, puis `suppress()` si la décision le demande.
///
/// Le premier tir n'a jamais lieu avant une fenêtre complète : un tir de
/// porte sur file partielle est avalé. Le scorer s'exécute sur le thread
/// d'échantillonnage, donc les invocations sont strictement sérialisées ;
/// un scorer plus lent que la période retarde les ticks suivants.
///
/// `stop()` est sûr vis-à-vis d'un scoring en vol : la commande est
/// observée en tête de boucle, l'appel en cours se termine et son
/// résultat est conservé, aucun appel ultérieur n'est planifié. Dropper
/// l'extracteur en streaming déconnecte le canal de commande, ce qui
/// termine aussi la boucle et libère la source audio.
pub struct FeatureExtractor {
    config: ExtractorConfig,
    state: State,
}

impl FeatureExtractor {
    /// Crée un extracteur avec une configuration validée et un scorer.
    ///
    /// # Errors
    /// `CoreError::Config` si la configuration viole un invariant.
    pub fn new(config: ExtractorConfig, scorer: Box<dyn Scorer>) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Idle(scorer),
        })
    }

    /// Configuration du pipeline.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// `true` si une session de streaming est active.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, State::Streaming { .. })
    }

    /// Démarre une session de streaming sur `source`.
    ///
    /// # Errors
    /// `StreamError::AlreadyStreaming` si une session est déjà active ;
    /// `StreamError::Thread` si le thread ne peut pas être lancé.
    pub fn start(&mut self, source: Box<dyn SpectralSource>) -> Result<(), StreamError> {
        if !matches!(self.state, State::Idle(_)) {
            return Err(StreamError::AlreadyStreaming);
        }

        let width = self.config.frame_width();
        let num_frames = self.config.num_frames_per_spectrogram;
        let freq_queue = FrameQueue::new(num_frames, width)?;
        let time_queue = if self.config.include_raw_audio {
            Some(FrameQueue::new(num_frames, self.config.fft_size)?)
        } else {
            None
        };
        let tracker = FireTracker::new(
            self.config.period_ticks(),
            self.config.suppression_ticks(),
        )?;

        let sampling = SamplingLoop {
            config: self.config.clone(),
            source,
            freq_queue,
            time_queue,
            tracker,
            freq_buf: vec![0.0; self.config.fft_size],
            time_buf: vec![0.0; self.config.fft_size],
        };

        let State::Idle(scorer) = std::mem::replace(&mut self.state, State::Poisoned) else {
            return Err(StreamError::AlreadyStreaming);
        };

        let (cmd_tx, cmd_rx) = flume::bounded(1);
        match thread::Builder::new()
            .name("sono-extract".to_string())
            .spawn(move || sampling.run(scorer, &cmd_rx))
        {
            Ok(handle) => {
                self.state = State::Streaming { cmd_tx, handle };
                log::debug!(
                    "Streaming démarré : période {} ticks, suppression {} ticks",
                    self.config.period_ticks(),
                    self.config.suppression_ticks()
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Thread(e.to_string())),
        }
    }

    /// Arrête la session : annule l'échantillonnage, rejoint le thread et
    /// libère la source audio.
    ///
    /// Restitue l'erreur du scorer si c'est elle qui a terminé la boucle.
    ///
    /// # Errors
    /// `StreamError::NotStreaming` sans session active.
    pub fn stop(&mut self) -> Result<(), StreamError> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Streaming { cmd_tx, handle } => {
                // Le thread a pu se terminer seul (erreur scorer) ;
                // l'échec d'envoi est alors attendu.
                let _ = cmd_tx.send(Command::Stop);
                let (scorer, outcome) = handle
                    .join()
                    .map_err(|_| StreamError::Thread("le thread d'échantillonnage a paniqué".into()))?;
                self.state = State::Idle(scorer);
                outcome
            }
            other => {
                self.state = other;
                Err(StreamError::NotStreaming)
            }
        }
    }
}

/// État embarqué par le thread d'échantillonnage.
struct SamplingLoop {
    config: ExtractorConfig,
    source: Box<dyn SpectralSource>,
    freq_queue: FrameQueue,
    time_queue: Option<FrameQueue>,
    tracker: FireTracker,
    freq_buf: Vec<f32>,
    time_buf: Vec<f32>,
}

impl SamplingLoop {
    fn run(mut self, mut scorer: Box<dyn Scorer>, cmd_rx: &flume::Receiver<Command>) -> LoopOutcome {
        let period = self.config.frame_period();
        let mut next_tick = Instant::now() + period;
        loop {
            match cmd_rx.try_recv() {
                Ok(Command::Stop) | Err(flume::TryRecvError::Disconnected) => {
                    return (scorer, Ok(()));
                }
                Err(flume::TryRecvError::Empty) => {}
            }

            if let Err(e) = self.tick(scorer.as_mut()) {
                log::error!("Session terminée sur erreur : {e}");
                return (scorer, Err(e));
            }

            // Cadence au plus près de l'horloge murale, sans dérive.
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            }
            next_tick += period;
        }
    }

    fn tick(&mut self, scorer: &mut dyn Scorer) -> Result<(), StreamError> {
        self.source.frequency_frame(&mut self.freq_buf);
        if self.freq_buf.first().is_some_and(|v| v.is_infinite() && v.is_sign_negative()) {
            // Pas de signal : tick sauté, la porte n'avance pas.
            return Ok(());
        }

        let width = self.freq_queue.width();
        self.freq_queue.push(self.freq_buf[..width].to_vec())?;
        if let Some(queue) = self.time_queue.as_mut() {
            self.source.waveform_frame(&mut self.time_buf);
            queue.push(self.time_buf.clone())?;
        }

        if self.tracker.tick() && self.freq_queue.is_full() {
            let num_frames = self.config.num_frames_per_spectrogram;
            let normalized = normalize(&self.freq_queue.flatten());
            let spectrogram = FeatureTensor::right_aligned(normalized, num_frames, width);
            let waveform = self.time_queue.as_ref().map(|q| {
                WaveformTensor::right_aligned(q.flatten(), num_frames * self.config.fft_size)
            });

            let decision = scorer
                .score(&spectrogram, waveform.as_ref())
                .map_err(StreamError::Scorer)?;
            log::trace!("Tir au tick {} : {:?}", self.tracker.ticks(), decision.scores);
            if decision.suppress {
                self.tracker.suppress();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sono_core::traits::ScoreDecision;

    use super::*;

    /// Source scriptée : silencieuse pendant `silent_ticks` appels, puis
    /// des frames finies non constantes.
    struct ScriptedSource {
        silent_ticks: usize,
        calls: Arc<AtomicUsize>,
    }

    impl SpectralSource for ScriptedSource {
        fn frequency_frame(&mut self, out: &mut [f32]) {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.silent_ticks {
                out.fill(f32::NEG_INFINITY);
            } else {
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = ((call + i) % 17) as f32 - 8.0;
                }
            }
        }

        fn waveform_frame(&mut self, out: &mut [f32]) {
            out.fill(0.25);
        }
    }

    struct CountingScorer {
        fires: Arc<AtomicUsize>,
        suppress: bool,
        saw_waveform: Arc<AtomicUsize>,
    }

    impl Scorer for CountingScorer {
        fn score(
            &mut self,
            spectrogram: &FeatureTensor,
            waveform: Option<&WaveformTensor>,
        ) -> anyhow::Result<ScoreDecision> {
            assert_eq!(spectrogram.shape()[1], spectrogram.frames());
            if waveform.is_some() {
                self.saw_waveform.fetch_add(1, Ordering::SeqCst);
            }
            self.fires.fetch_add(1, Ordering::SeqCst);
            Ok(ScoreDecision {
                scores: vec![1.0, 0.0],
                suppress: self.suppress,
            })
        }
    }

    struct FailingScorer {
        attempted: Arc<AtomicUsize>,
    }

    impl Scorer for FailingScorer {
        fn score(
            &mut self,
            _spectrogram: &FeatureTensor,
            _waveform: Option<&WaveformTensor>,
        ) -> anyhow::Result<ScoreDecision> {
            self.attempted.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("modèle indisponible")
        }
    }

    /// Frames de 2 ms : les tests tiennent en quelques dizaines de ms.
    fn test_config() -> ExtractorConfig {
        ExtractorConfig {
            num_frames_per_spectrogram: 40,
            overlap_factor: 0.5,
            sample_rate_hz: 16_000,
            fft_size: 32,
            column_truncate_length: 16,
            suppression_time_millis: 0.0,
            include_raw_audio: false,
        }
    }

    fn wait_for(calls: &AtomicUsize, at_least: usize) {
        while calls.load(Ordering::SeqCst) < at_least {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn fires_once_when_the_window_first_fills() {
        // Période 20, capacité 40 : le tir du tick 20 est avalé (fenêtre
        // partielle), le premier tir réel a lieu au tick 40.
        let calls = Arc::new(AtomicUsize::new(0));
        let fires = Arc::new(AtomicUsize::new(0));
        let scorer = CountingScorer {
            fires: Arc::clone(&fires),
            suppress: false,
            saw_waveform: Arc::new(AtomicUsize::new(0)),
        };
        let mut extractor =
            FeatureExtractor::new(test_config(), Box::new(scorer)).expect("valid config");
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls),
            }))
            .expect("start");

        wait_for(&calls, 41);
        extractor.stop().expect("stop");
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn silent_ticks_push_nothing() {
        // 30 ticks de sentinel : la fenêtre ne se remplit qu'au tick 70.
        // Si le silence comptait, le premier tir aurait lieu dès le tick 40.
        let calls = Arc::new(AtomicUsize::new(0));
        let fires = Arc::new(AtomicUsize::new(0));
        let scorer = CountingScorer {
            fires: Arc::clone(&fires),
            suppress: false,
            saw_waveform: Arc::new(AtomicUsize::new(0)),
        };
        let mut extractor =
            FeatureExtractor::new(test_config(), Box::new(scorer)).expect("valid config");
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 30,
                calls: Arc::clone(&calls),
            }))
            .expect("start");

        wait_for(&calls, 45);
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        wait_for(&calls, 72);
        extractor.stop().expect("stop");
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suppression_swallows_the_next_fire() {
        // Suppression de 60 ms = 30 ticks : tirs aux ticks 40 et 80,
        // le tick 60 (60 − 40 = 20 ≤ 30) est avalé.
        let calls = Arc::new(AtomicUsize::new(0));
        let fires = Arc::new(AtomicUsize::new(0));
        let scorer = CountingScorer {
            fires: Arc::clone(&fires),
            suppress: true,
            saw_waveform: Arc::new(AtomicUsize::new(0)),
        };
        let config = ExtractorConfig {
            suppression_time_millis: 60.0,
            ..test_config()
        };
        let mut extractor = FeatureExtractor::new(config, Box::new(scorer)).expect("valid config");
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls),
            }))
            .expect("start");

        wait_for(&calls, 85);
        extractor.stop().expect("stop");
        assert_eq!(fires.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn raw_audio_queue_feeds_the_scorer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fires = Arc::new(AtomicUsize::new(0));
        let saw_waveform = Arc::new(AtomicUsize::new(0));
        let scorer = CountingScorer {
            fires: Arc::clone(&fires),
            suppress: false,
            saw_waveform: Arc::clone(&saw_waveform),
        };
        let config = ExtractorConfig {
            include_raw_audio: true,
            ..test_config()
        };
        let mut extractor = FeatureExtractor::new(config, Box::new(scorer)).expect("valid config");
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls),
            }))
            .expect("start");

        wait_for(&calls, 41);
        extractor.stop().expect("stop");
        assert!(saw_waveform.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn illegal_state_transitions_rejected() {
        let scorer = CountingScorer {
            fires: Arc::new(AtomicUsize::new(0)),
            suppress: false,
            saw_waveform: Arc::new(AtomicUsize::new(0)),
        };
        let mut extractor =
            FeatureExtractor::new(test_config(), Box::new(scorer)).expect("valid config");

        assert!(matches!(extractor.stop(), Err(StreamError::NotStreaming)));

        let calls = Arc::new(AtomicUsize::new(0));
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls),
            }))
            .expect("start");
        assert!(extractor.is_streaming());

        let second = extractor.start(Box::new(ScriptedSource {
            silent_ticks: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        assert!(matches!(second, Err(StreamError::AlreadyStreaming)));

        extractor.stop().expect("first stop");
        assert!(!extractor.is_streaming());
        assert!(matches!(extractor.stop(), Err(StreamError::NotStreaming)));
    }

    #[test]
    fn scorer_failure_surfaces_on_stop_and_extractor_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let attempted = Arc::new(AtomicUsize::new(0));
        let scorer = FailingScorer {
            attempted: Arc::clone(&attempted),
        };
        let mut extractor =
            FeatureExtractor::new(test_config(), Box::new(scorer)).expect("valid config");
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls),
            }))
            .expect("start");

        wait_for(&attempted, 1);
        assert!(matches!(extractor.stop(), Err(StreamError::Scorer(_))));

        // L'extracteur est revenu idle et reste utilisable.
        assert!(!extractor.is_streaming());
        let calls2 = Arc::new(AtomicUsize::new(0));
        extractor
            .start(Box::new(ScriptedSource {
                silent_ticks: 0,
                calls: Arc::clone(&calls2),
            }))
            .expect("restart");
        extractor.stop().expect("stop after restart");
    }
}
