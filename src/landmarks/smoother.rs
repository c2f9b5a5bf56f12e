use ndarray::Array2;

/// Exponential moving average over successive landmark sets.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f32,
    state: Option<Array2<f32>>,
}

impl LandmarkSmoother {
    /// Create a new smoother
    ///
    /// # Arguments
    /// * `alpha` - Weight of the previous smoothed state, clamped to [0, 1].
    ///   Higher values give more inertia.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Fold `current` into the smoothed state and return the new state.
    ///
    /// The first call (or any call after a landmark-count change) stores
    /// `current` unchanged.
    pub fn smooth(&mut self, current: &Array2<f32>) -> Array2<f32> {
        let next = match self.state.take() {
            Some(prev) if prev.dim() == current.dim() => {
                prev * self.alpha + current * (1.0 - self.alpha)
            }
            _ => current.to_owned(),
        };
        self.state = Some(next.clone());
        next
    }

    pub fn last(&self) -> Option<&Array2<f32>> {
        self.state.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
