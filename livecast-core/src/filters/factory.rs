use std::{collections::HashMap, sync::Arc};

use super::{kernels, VideoFilterKernel};

pub type InstantiateFilter = Box<dyn Fn() -> Arc<dyn VideoFilterKernel> + Send + Sync>;

/// Name to filter registry. Each filter is instantiated once, on first use,
/// and shared afterwards.
pub struct FilterFactory {
    registrations: HashMap<String, InstantiateFilter>,
    instances: HashMap<String, Arc<dyn VideoFilterKernel>>,
}

impl FilterFactory {
    /// A factory with every built-in filter registered.
    #[must_use]
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register(kernels::BGRA_NAME, || Arc::new(kernels::BgraFilter));
        factory.register(kernels::GRAYSCALE_NAME, || Arc::new(kernels::GrayscaleFilter));
        factory.register(kernels::INVERT_COLORS_NAME, || {
            Arc::new(kernels::InvertColorsFilter)
        });
        factory.register(kernels::SEPIA_NAME, || Arc::new(kernels::SepiaFilter));
        factory.register(kernels::FISHEYE_NAME, || Arc::new(kernels::FisheyeFilter));
        factory.register(kernels::GLOW_NAME, || Arc::new(kernels::GlowFilter));
        factory.register(kernels::NIGHT_VISION_NAME, || {
            Arc::new(kernels::NightVisionFilter)
        });
        factory
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            registrations: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Register a constructor. The first registration of a name wins.
    pub fn register<F>(&mut self, name: &str, instantiate: F)
    where
        F: Fn() -> Arc<dyn VideoFilterKernel> + Send + Sync + 'static,
    {
        if self.registrations.contains_key(name) {
            tracing::debug!("filter {name} already registered");
            return;
        }
        self.registrations
            .insert(name.to_string(), Box::new(instantiate));
    }

    pub fn filter(&mut self, name: &str) -> Option<Arc<dyn VideoFilterKernel>> {
        if let Some(filter) = self.instances.get(name) {
            return Some(Arc::clone(filter));
        }

        let filter = (self.registrations.get(name)?)();
        self.instances.insert(name.to_string(), Arc::clone(&filter));
        Some(filter)
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filters::VideoFilter, pixel_buffer::PixelBuffer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_every_filter_is_registered() {
        let mut factory = FilterFactory::new();
        for filter in VideoFilter::ALL {
            let kernel = factory.filter(filter.filter_name()).unwrap();
            assert_eq!(kernel.name(), filter.filter_name());
        }
        assert!(factory.filter("com.videocore.filters.unknown").is_none());
    }

    #[test]
    fn test_instances_are_cached() {
        static CREATED: AtomicUsize = AtomicUsize::new(0);

        struct Counting;
        impl VideoFilterKernel for Counting {
            fn name(&self) -> &'static str {
                "test.counting"
            }
            fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
                frame.clone()
            }
        }

        let mut factory = FilterFactory::empty();
        factory.register("test.counting", || {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Arc::new(Counting)
        });

        let first = factory.filter("test.counting").unwrap();
        let second = factory.filter("test.counting").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }
}
