use std::collections::VecDeque;

use crate::error::CoreError;

/// Fenêtre glissante de frames spectrales de largeur fixe.
///
/// File FIFO bornée : au-delà de la capacité, la frame la plus ancienne
/// est évincée. Toutes les frames ont la même largeur.
///
/// # Example
/// ```
/// use sono_core::frame::FrameQueue;
/// let mut queue = FrameQueue::new(2, 3).unwrap();
/// queue.push(vec![1.0, 2.0, 3.0]).unwrap();
/// assert!(!queue.is_full());
/// queue.push(vec![4.0, 5.0, 6.0]).unwrap();
/// assert!(queue.is_full());
/// ```
pub struct FrameQueue {
    frames: VecDeque<Vec<f32>>,
    capacity: usize,
    width: usize,
}

impl FrameQueue {
    /// Crée une file vide de `capacity` frames de `width` valeurs.
    ///
    /// # Errors
    /// `CoreError::InvalidWindow` si la capacité ou la largeur est nulle.
    pub fn new(capacity: usize, width: usize) -> Result<Self, CoreError> {
        if capacity == 0 || width == 0 {
            return Err(CoreError::InvalidWindow { capacity, width });
        }
        Ok(Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
            width,
        })
    }

    /// Ajoute une frame ; évince la plus ancienne si la file déborde.
    ///
    /// # Errors
    /// `CoreError::FrameWidthMismatch` si la frame n'a pas la largeur
    /// de la file.
    pub fn push(&mut self, frame: Vec<f32>) -> Result<(), CoreError> {
        if frame.len() != self.width {
            return Err(CoreError::FrameWidthMismatch {
                expected: self.width,
                got: frame.len(),
            });
        }
        self.frames.push_back(frame);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        Ok(())
    }

    /// Concatène les frames courantes dans l'ordre d'insertion.
    ///
    /// Les appelants qui exigent une fenêtre complète doivent vérifier
    /// `is_full()` au préalable : sur une file partielle le résultat est
    /// plus court que `capacity × width`.
    #[must_use]
    pub fn flatten(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.frames.len() * self.width);
        for frame in &self.frames {
            flat.extend_from_slice(frame);
        }
        flat
    }

    /// Vide la file sans changer sa capacité.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Nombre de frames actuellement retenues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` si la file ne contient aucune frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `true` une fois `capacity` frames accumulées.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Capacité de la fenêtre en frames.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largeur d'une frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }
}

/// Tensor spectral éphémère de forme logique `[1, frames, width, 1]`.
///
/// Construit une fois par tir, consommé par le scorer, puis relâché.
/// Si le buffer source est plus court que `frames × width`, il est aligné
/// à droite (zéros à gauche) ; s'il est plus long, seules les valeurs les
/// plus récentes sont retenues.
///
/// # Example
/// ```
/// use sono_core::frame::FeatureTensor;
/// let t = FeatureTensor::right_aligned(vec![1.0, 2.0], 2, 2);
/// assert_eq!(t.shape(), [1, 2, 2, 1]);
/// assert_eq!(t.as_slice(), &[0.0, 0.0, 1.0, 2.0]);
/// ```
pub struct FeatureTensor {
    data: Vec<f32>,
    frames: usize,
    width: usize,
}

impl FeatureTensor {
    /// Construit le tensor aligné à droite sur `frames × width` valeurs.
    #[must_use]
    pub fn right_aligned(flat: Vec<f32>, frames: usize, width: usize) -> Self {
        let target = frames * width;
        let data = match flat.len() {
            n if n == target => flat,
            n if n > target => flat[n - target..].to_vec(),
            n => {
                let mut padded = vec![0.0; target - n];
                padded.extend_from_slice(&flat);
                padded
            }
        };
        Self {
            data,
            frames,
            width,
        }
    }

    /// Forme logique `[1, frames, width, 1]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        [1, self.frames, self.width, 1]
    }

    /// Données aplaties, ordre frame-major.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Nombre de frames de la fenêtre.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Largeur d'une frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }
}

/// Tensor audio brut éphémère de forme logique `[1, len]`.
///
/// Même règle d'alignement à droite que [`FeatureTensor`].
pub struct WaveformTensor {
    data: Vec<f32>,
}

impl WaveformTensor {
    /// Construit le tensor aligné à droite sur `len` échantillons.
    #[must_use]
    pub fn right_aligned(flat: Vec<f32>, len: usize) -> Self {
        let data = match flat.len() {
            n if n == len => flat,
            n if n > len => flat[n - len..].to_vec(),
            n => {
                let mut padded = vec![0.0; len - n];
                padded.extend_from_slice(&flat);
                padded
            }
        };
        Self { data }
    }

    /// Forme logique `[1, len]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [1, self.data.len()]
    }

    /// Échantillons aplatis.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
