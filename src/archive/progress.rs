//! Progress reporting for long loads and saves.

/// Callback receiving the completed fraction in `0.0..=1.0`.
pub type ProgressCallback<'a> = Box<dyn FnMut(f32) + 'a>;

/// Throttled progress state.
pub(crate) struct Progress<'a> {
    callback: ProgressCallback<'a>,
    update_frequency: f32,
    total: u64,
    last: f32,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(callback: ProgressCallback<'a>, update_frequency: f32) -> Self {
        Self {
            callback,
            update_frequency: update_frequency.max(0.0),
            total: 0,
            last: 0.0,
        }
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Report `done` bytes out of the total.
    ///
    /// Fires when progress has moved at least `update_frequency` since the
    /// last report, and always once on completion.
    pub(crate) fn update(&mut self, done: u64) {
        if self.total == 0 {
            return;
        }
        let fraction = (done as f64 / self.total as f64).min(1.0) as f32;
        let stepped = fraction > self.last && fraction - self.last >= self.update_frequency;
        let finished = fraction >= 1.0 && self.last < 1.0;
        if stepped || finished {
            (self.callback)(fraction);
            self.last = fraction;
        }
    }
}
