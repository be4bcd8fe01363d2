use tracing::debug;

/// Receives progress ticks from long enumerations.
pub trait ProgressObserver {
    fn on_progress(&mut self, completed: usize, total: usize);
}

/// Silent observer.
impl ProgressObserver for () {
    fn on_progress(&mut self, _completed: usize, _total: usize) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(usize, usize),
{
    fn on_progress(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Emits each tick as a `debug` event under the given label.
#[derive(Clone, Debug)]
pub struct TracingProgress {
    label: &'static str,
}

impl TracingProgress {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new("sequence probabilities")
    }
}

impl ProgressObserver for TracingProgress {
    fn on_progress(&mut self, completed: usize, total: usize) {
        debug!(label = self.label, completed, total, "enumeration progress");
    }
}

/// Throttles raw per-item progress down to `ticks` evenly spaced updates.
pub(crate) struct Ticker<'a, P: ProgressObserver + ?Sized> {
    observer: &'a mut P,
    total: usize,
    ticks: usize,
    emitted: usize,
}

impl<'a, P: ProgressObserver + ?Sized> Ticker<'a, P> {
    pub(crate) fn new(observer: &'a mut P, total: usize, ticks: usize) -> Self {
        observer.on_progress(0, total);
        Self {
            observer,
            total,
            ticks: ticks.max(1),
            emitted: 0,
        }
    }

    pub(crate) fn advance(&mut self, completed: usize) {
        // completed / total > emitted / ticks, without floating point
        if completed * self.ticks > self.emitted * self.total && self.emitted < self.ticks {
            self.emitted += 1;
            self.observer.on_progress(completed, self.total);
        }
    }

    pub(crate) fn finish(self) {
        self.observer.on_progress(self.total, self.total);
    }
}
