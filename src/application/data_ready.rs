use futures::channel::oneshot;

/// One-shot "first data arrived" signal.
///
/// Every receiver handed out before `fire` resolves on the first `fire`; receivers handed
/// out afterwards resolve immediately. `reset` re-arms it for a new symbol.
#[derive(Debug, Default)]
pub struct DataReadySignal {
    waiters: Vec<oneshot::Sender<()>>,
    fired: bool,
}

impl DataReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn subscribe(&mut self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        if self.fired {
            let _ = sender.send(());
        } else {
            self.waiters.push(sender);
        }
        receiver
    }

    /// Resolve all waiters. Returns false when already fired.
    pub fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
        true
    }

    /// Re-arm. Pending receivers are cancelled.
    pub fn reset(&mut self) {
        self.fired = false;
        self.waiters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn fires_exactly_once() {
        let mut signal = DataReadySignal::new();
        let early = signal.subscribe();
        assert!(signal.fire());
        assert!(!signal.fire());
        assert_eq!(block_on(early), Ok(()));
        assert_eq!(block_on(signal.subscribe()), Ok(()));
    }

    #[test]
    fn reset_cancels_pending_receivers() {
        let mut signal = DataReadySignal::new();
        let pending = signal.subscribe();
        signal.reset();
        assert!(block_on(pending).is_err());
        assert!(!signal.is_fired());
    }
}
