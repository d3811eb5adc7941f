use thiserror::Error;

use sono_core::error::CoreError;

/// Errors originating from the streaming layer.
#[derive(Error, Debug)]
pub enum StreamError {
    /// start() called while a session is already active.
    #[error("Le pipeline est déjà en streaming")]
    AlreadyStreaming,

    /// stop() called without an active session.
    #[error("Le pipeline n'est pas en streaming")]
    NotStreaming,

    /// No audio input device found.
    #[error("Aucun périphérique audio d'entrée trouvé")]
    NoInputDevice,

    /// Audio device or stream error.
    #[error("Erreur de périphérique audio : {0}")]
    Device(String),

    /// The sampling thread could not be spawned or joined.
    #[error("Erreur du thread d'échantillonnage : {0}")]
    Thread(String),

    /// The scoring callback failed; the session was terminated.
    #[error("Échec du scoring : {0}")]
    Scorer(#[source] anyhow::Error),

    /// A core invariant was violated while streaming.
    #[error(transparent)]
    Core(#[from] CoreError),
}
