use crate::error::CoreError;

/// Accumulateur de scores sur la durée d'une session.
///
/// Somme les probabilités par classe à chaque tir, puis produit un verdict
/// final (moyennes + argmax) en se remettant à zéro.
///
/// # Example
/// ```
/// use sono_core::scores::{ScoreAggregator, SessionVerdict};
/// let mut agg = ScoreAggregator::new(2).unwrap();
/// agg.record(&[0.9, 0.1]).unwrap();
/// agg.record(&[0.7, 0.3]).unwrap();
/// match agg.finalize() {
///     SessionVerdict::Classified { top_class, .. } => assert_eq!(top_class, 0),
///     SessionVerdict::NoData => unreachable!(),
/// }
/// ```
pub struct ScoreAggregator {
    /// Somme courante des probabilités par classe.
    sums: Vec<f32>,
    /// Nombre de tirs enregistrés.
    count: u32,
}

/// Verdict de fin de session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionVerdict {
    /// Aucun tir enregistré pendant la session.
    NoData,
    /// Moyennes par classe et indice de la classe gagnante.
    Classified {
        /// Probabilité moyenne de chaque classe.
        means: Vec<f32>,
        /// Indice de la classe à probabilité moyenne maximale.
        top_class: usize,
    },
}

impl ScoreAggregator {
    /// Crée un agrégateur pour `num_classes` classes.
    ///
    /// # Errors
    /// `CoreError::NoClasses` si `num_classes == 0`.
    pub fn new(num_classes: usize) -> Result<Self, CoreError> {
        if num_classes == 0 {
            return Err(CoreError::NoClasses);
        }
        Ok(Self {
            sums: vec![0.0; num_classes],
            count: 0,
        })
    }

    /// Ajoute un vecteur de probabilités par classe et compte le tir.
    ///
    /// # Errors
    /// `CoreError::ClassCountMismatch` si la longueur ne correspond pas
    /// au nombre de classes.
    pub fn record(&mut self, scores: &[f32]) -> Result<(), CoreError> {
        if scores.len() != self.sums.len() {
            return Err(CoreError::ClassCountMismatch {
                expected: self.sums.len(),
                got: scores.len(),
            });
        }
        for (sum, score) in self.sums.iter_mut().zip(scores) {
            *sum += score;
        }
        self.count += 1;
        Ok(())
    }

    /// Nombre de tirs enregistrés depuis le dernier `finalize()`.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Nombre de classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.sums.len()
    }

    /// Calcule les moyennes par classe et l'argmax, puis remet tout à zéro.
    ///
    /// Sans tir enregistré, retourne `SessionVerdict::NoData` plutôt que
    /// de diviser par zéro.
    pub fn finalize(&mut self) -> SessionVerdict {
        if self.count == 0 {
            return SessionVerdict::NoData;
        }
        let n = self.count as f32;
        let means: Vec<f32> = self.sums.iter().map(|s| s / n).collect();
        let top_class = means
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map_or(0, |(i, _)| i);

        self.sums.iter_mut().for_each(|s| *s = 0.0);
        self.count = 0;

        SessionVerdict::Classified { means, top_class }
    }
}
