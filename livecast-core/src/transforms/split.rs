use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{BufferMetadata, Output};

/// Pushes every buffer to all of its outputs. Outputs are held weakly; a
/// dropped output is skipped and pruned on the next removal.
#[derive(Default)]
pub struct Split {
    outputs: Mutex<Vec<Weak<dyn Output>>>,
}

impl Split {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding an output that is already present does nothing.
    pub fn set_output(&self, output: &Arc<dyn Output>) {
        let weak = Arc::downgrade(output);
        let mut outputs = self.outputs.lock();
        if outputs.iter().any(|existing| Weak::ptr_eq(existing, &weak)) {
            return;
        }
        outputs.push(weak);
    }

    pub fn remove_output(&self, output: &Arc<dyn Output>) {
        let weak = Arc::downgrade(output);
        self.outputs
            .lock()
            .retain(|existing| existing.strong_count() > 0 && !Weak::ptr_eq(existing, &weak));
    }

    /// Live outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs
            .lock()
            .iter()
            .filter(|output| output.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Output for Split {
    fn push_buffer(&self, data: &[u8], metadata: &BufferMetadata) {
        // upgrade first so outputs run without the lock held
        let outputs: Vec<Arc<dyn Output>> =
            self.outputs.lock().iter().filter_map(Weak::upgrade).collect();
        for output in outputs {
            output.push_buffer(data, metadata);
        }
    }
}
