use {
    parking_lot::Mutex,
    std::{
        collections::VecDeque,
        f32::consts::FRAC_PI_2,
        sync::Arc,
        time::{Duration, Instant},
    },
    tokio::{sync::oneshot, task::JoinHandle},
};

const WEIGHT: f32 = 0.75;
const BW_SAMPLE_COUNT: usize = 30;
/// A buffer that drained is only trusted for an increase this long after a turndown.
const TURNDOWN_HOLDOFF: Duration = Duration::from_secs(10);
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(5);

/// Output of one sampling period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputEstimate {
    /// Recommended direction in `[-1, 1]`: positive means there is headroom.
    pub vector: f32,
    /// Weighted average of the rates seen at buffer turning points.
    pub predicted_bytes_per_sec: f32,
    pub immediate_bytes_per_sec: f32,
}

#[derive(Default)]
struct Samples {
    sent: Vec<usize>,
    buffer_size: Vec<usize>,
}

/// The history kept between periods.
struct AdaptationState {
    weights: Vec<f32>,
    bw_samples: VecDeque<f32>,
    turn_samples: VecDeque<f32>,
    previous_vector: f32,
    previous_turndown: Option<Instant>,
}

impl AdaptationState {
    fn new() -> Self {
        let normalizer = (1.0 - WEIGHT.powi(BW_SAMPLE_COUNT as i32)) / (1.0 - WEIGHT);
        let weights = (0..BW_SAMPLE_COUNT)
            .map(|i| WEIGHT.powi(i as i32) / normalizer)
            .collect();

        Self {
            weights,
            bw_samples: VecDeque::with_capacity(BW_SAMPLE_COUNT + 1),
            turn_samples: VecDeque::with_capacity(BW_SAMPLE_COUNT + 1),
            previous_vector: 0.0,
            previous_turndown: None,
        }
    }

    fn push_bounded(queue: &mut VecDeque<f32>, value: f32) {
        queue.push_front(value);
        if queue.len() > BW_SAMPLE_COUNT {
            queue.pop_back();
        }
    }

    fn weighted(&self, queue: &VecDeque<f32>) -> f32 {
        queue.iter().zip(&self.weights).map(|(v, w)| v * w).sum()
    }

    fn sample(
        &mut self,
        samples: &Samples,
        time_delta: Duration,
        now: Instant,
    ) -> ThroughputEstimate {
        let total_sent: usize = samples.sent.iter().sum();
        let seconds = time_delta.as_secs_f32().max(f32::EPSILON);
        let detected = total_sent as f32 / seconds;

        Self::push_bounded(&mut self.bw_samples, detected);
        let avg = self.weighted(&self.bw_samples);

        let mut vector = 0.0_f32;
        let mut turn_avg = 0.0_f32;

        if let (Some(&first), Some(&last)) =
            (samples.buffer_size.first(), samples.buffer_size.last())
        {
            let holdoff_passed = self
                .previous_turndown
                .is_none_or(|at| now.duration_since(at) > TURNDOWN_HOLDOFF);

            if last == 0 && holdoff_passed {
                vector = 1.0;
            } else if last > first {
                vector = -1.0;
                self.previous_turndown = Some(now);
            }

            if self.previous_vector < 0.0 && vector >= 0.0 {
                let rate = self.bw_samples.front().copied().unwrap_or(detected);
                Self::push_bounded(&mut self.turn_samples, rate);
            }
            if last < first && last > 0 {
                Self::push_bounded(&mut self.turn_samples, detected);
            }

            if !self.turn_samples.is_empty() {
                turn_avg = self.weighted(&self.turn_samples);
                if turn_avg > 0.0 {
                    let a = (detected - avg) / turn_avg;
                    let slope = 3.0 * a * a;
                    vector *= slope.atan() / FRAC_PI_2;
                }
            }
            self.previous_vector = vector;
        }

        ThroughputEstimate {
            vector,
            predicted_bytes_per_sec: turn_avg,
            immediate_bytes_per_sec: detected,
        }
    }
}

/// Estimates available TCP throughput from bytes written and the size of
/// the outgoing queue, producing a bitrate recommendation every period.
pub struct TcpThroughputAdaptation {
    samples: Mutex<Samples>,
    state: Mutex<AdaptationState>,
}

pub type ThroughputCallback = Box<dyn Fn(ThroughputEstimate) + Send + Sync>;

/// Running sampler; stops when `stop` is called or the handle is dropped.
pub struct ThroughputHandle {
    stop_sender: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl ThroughputHandle {
    pub async fn stop(mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(());
        }
        if let Err(err) = (&mut self.join).await {
            tracing::warn!("throughput sampler ended abnormally: {err}");
        }
    }
}

impl TcpThroughputAdaptation {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            samples: Mutex::new(Samples::default()),
            state: Mutex::new(AdaptationState::new()),
        })
    }

    pub fn add_sent_bytes_sample(&self, bytes_sent: usize) {
        self.samples.lock().sent.push(bytes_sent);
    }

    pub fn add_buffer_size_sample(&self, buffer_size: usize) {
        self.samples.lock().buffer_size.push(buffer_size);
    }

    /// Consume the samples gathered since the previous call.
    pub fn sample(&self, time_delta: Duration, now: Instant) -> ThroughputEstimate {
        let samples = std::mem::take(&mut *self.samples.lock());
        self.state.lock().sample(&samples, time_delta, now)
    }

    /// Spawn the periodic sampler on the current runtime.
    pub fn start(self: &Arc<Self>, period: Duration, callback: ThroughputCallback) -> ThroughputHandle {
        let (stop_sender, mut stop_receiver) = oneshot::channel();
        let adaptation = Arc::clone(self);

        let join = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            let mut previous = Instant::now();

            loop {
                tokio::select! {
                    _ = &mut stop_receiver => break,
                    _ = interval.tick() => {
                        let now = Instant::now();
                        let estimate = adaptation.sample(now.duration_since(previous), now);
                        previous = now;
                        tracing::trace!(
                            "throughput vector {:.3}, detected {:.0} B/s, predicted {:.0} B/s",
                            estimate.vector,
                            estimate.immediate_bytes_per_sec,
                            estimate.predicted_bytes_per_sec
                        );
                        callback(estimate);
                    }
                }
            }
        });

        ThroughputHandle {
            stop_sender: Some(stop_sender),
            join,
        }
    }
}

impl Drop for ThroughputHandle {
    fn drop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(5);

    #[test]
    fn test_weights_are_normalized() {
        let state = AdaptationState::new();
        let total: f32 = state.weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(state.weights[0] > state.weights[1]);
    }

    #[test]
    fn test_empty_buffer_gives_headroom() {
        let adaptation = TcpThroughputAdaptation::new();
        adaptation.add_sent_bytes_sample(50_000);
        adaptation.add_buffer_size_sample(0);
        adaptation.add_buffer_size_sample(0);

        let estimate = adaptation.sample(PERIOD, Instant::now());
        assert_eq!(estimate.vector, 1.0);
        assert_eq!(estimate.immediate_bytes_per_sec, 10_000.0);
    }

    #[test]
    fn test_growing_buffer_turns_down() {
        let adaptation = TcpThroughputAdaptation::new();
        adaptation.add_sent_bytes_sample(10_000);
        adaptation.add_buffer_size_sample(100);
        adaptation.add_buffer_size_sample(5_000);

        let now = Instant::now();
        let estimate = adaptation.sample(PERIOD, now);
        assert_eq!(estimate.vector, -1.0);

        // drained right after a turndown: no increase during the holdoff
        adaptation.add_buffer_size_sample(0);
        let estimate = adaptation.sample(PERIOD, now + Duration::from_secs(5));
        assert_eq!(estimate.vector, 0.0);

        adaptation.add_buffer_size_sample(0);
        let estimate = adaptation.sample(PERIOD, now + Duration::from_secs(16));
        assert!(estimate.vector > 0.0 && estimate.vector <= 1.0);
    }

    #[test]
    fn test_no_buffer_samples_no_vector() {
        let adaptation = TcpThroughputAdaptation::new();
        adaptation.add_sent_bytes_sample(1_000);
        let estimate = adaptation.sample(PERIOD, Instant::now());
        assert_eq!(estimate.vector, 0.0);
        assert_eq!(estimate.predicted_bytes_per_sec, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_callback() {
        let adaptation = TcpThroughputAdaptation::new();
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        adaptation.add_buffer_size_sample(0);

        let handle = adaptation.start(
            PERIOD,
            Box::new(move |estimate| {
                let _ = sender.send(estimate);
            }),
        );

        let estimate = receiver.recv().await.unwrap();
        assert_eq!(estimate.vector, 1.0);
        handle.stop().await;
    }
}
