use thiserror::Error;

/// Errors originating from the core pipeline primitives.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Tracker period below one tick.
    #[error("Période de tir invalide : {period} (doit être ≥ 1)")]
    InvalidPeriod {
        /// The rejected period value.
        period: u32,
    },

    /// Window capacity or frame width of zero.
    #[error("Fenêtre invalide : {capacity}×{width}")]
    InvalidWindow {
        /// Frames per window.
        capacity: usize,
        /// Values per frame.
        width: usize,
    },

    /// Pushed frame does not match the queue's frame width.
    #[error("Largeur de frame inattendue : {got} (attendu {expected})")]
    FrameWidthMismatch {
        /// Width the queue was built with.
        expected: usize,
        /// Width of the rejected frame.
        got: usize,
    },

    /// Aggregator built with zero classes.
    #[error("Nombre de classes invalide : 0")]
    NoClasses,

    /// Recorded score vector does not match the class count.
    #[error("Nombre de classes inattendu : {got} (attendu {expected})")]
    ClassCountMismatch {
        /// Class count the aggregator was built with.
        expected: usize,
        /// Length of the rejected score vector.
        got: usize,
    },
}
