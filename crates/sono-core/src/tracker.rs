use crate::error::CoreError;

/// Porte de tir périodique avec suppression temporaire.
///
/// Le compteur avance d'un tick par frame échantillonnée. Un tick tire
/// lorsque le compteur est un multiple de la période ET qu'aucune fenêtre
/// de suppression n'est active.
///
/// # Example
/// ```
/// use sono_core::tracker::FireTracker;
/// let mut tracker = FireTracker::new(3, 0).unwrap();
/// assert!(!tracker.tick()); // tick 1
/// assert!(!tracker.tick()); // tick 2
/// assert!(tracker.tick());  // tick 3
/// ```
pub struct FireTracker {
    /// Compteur monotone de ticks.
    counter: u64,
    /// Période de tir en ticks.
    period: u32,
    /// Durée de suppression en ticks.
    suppression_ticks: u32,
    /// Tick auquel la dernière suppression a commencé.
    suppression_onset: Option<u64>,
}

impl FireTracker {
    /// Crée une porte avec une période et une durée de suppression en ticks.
    ///
    /// # Errors
    /// `CoreError::InvalidPeriod` si `period == 0`.
    pub fn new(period: u32, suppression_ticks: u32) -> Result<Self, CoreError> {
        if period == 0 {
            return Err(CoreError::InvalidPeriod { period });
        }
        Ok(Self {
            counter: 0,
            period,
            suppression_ticks,
            suppression_onset: None,
        })
    }

    /// Avance le compteur d'un tick et indique si ce tick doit tirer.
    ///
    /// Un tick tire si `counter % period == 0` et que la suppression
    /// courante, s'il y en a une, est écoulée (strictement plus de
    /// `suppression_ticks` ticks depuis son début).
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter % u64::from(self.period) != 0 {
            return false;
        }
        match self.suppression_onset {
            Some(onset) => self.counter - onset > u64::from(self.suppression_ticks),
            None => true,
        }
    }

    /// Enregistre le tick courant comme début de suppression.
    pub fn suppress(&mut self) {
        self.suppression_onset = Some(self.counter);
    }

    /// Nombre de ticks écoulés depuis la création.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_period_multiples() {
        let mut tracker = FireTracker::new(4, 0).expect("valid period");
        let fired: Vec<u64> = (1..=12)
            .filter_map(|t| tracker.tick().then_some(t))
            .collect();
        assert_eq!(fired, vec![4, 8, 12]);
    }

    #[test]
    fn suppression_blocks_then_releases() {
        // Période 3, suppression 2 : tire au tick 3, suppress(),
        // puis 6 − 3 = 3 > 2 donc le tick 6 tire à nouveau.
        let mut tracker = FireTracker::new(3, 2).expect("valid period");
        assert!(!tracker.tick());
        assert!(!tracker.tick());
        assert!(tracker.tick());
        tracker.suppress();
        assert!(!tracker.tick()); // tick 4
        assert!(!tracker.tick()); // tick 5
        assert!(tracker.tick()); // tick 6
    }

    #[test]
    fn long_suppression_swallows_a_fire() {
        // Période 2, suppression 4 : le tick 4 (4 − 2 = 2 ≤ 4) et le
        // tick 6 (4 ≤ 4) sont avalés, le tick 8 (6 > 4) tire.
        let mut tracker = FireTracker::new(2, 4).expect("valid period");
        assert!(!tracker.tick());
        assert!(tracker.tick()); // tick 2
        tracker.suppress();
        let fired: Vec<u64> = (3..=8)
            .filter_map(|t| tracker.tick().then_some(t))
            .collect();
        assert_eq!(fired, vec![8]);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(matches!(
            FireTracker::new(0, 5),
            Err(CoreError::InvalidPeriod { period: 0 })
        ));
    }
}
