use palmlink_core::{top_label, GestureClassifier, GestureLabel};
use palmlink_hw::{Camera, Frame};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle to the capture thread.
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    thread: std::thread::JoinHandle<()>,
}

impl CaptureHandle {
    /// Ask the capture loop to stop after the current frame and wait for it.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.thread.join().is_err() {
            tracing::error!("capture thread panicked");
        }
    }
}

/// Spawn the capture + classify loop on a dedicated OS thread.
///
/// Publishes one observation per frame: the top gesture, or `None` when
/// nothing was recognized. The sender is dropped when the camera stops
/// delivering frames, which closes the stream for the dispatcher.
pub fn spawn_capture<C>(
    camera: Camera,
    mut classifier: C,
    warmup_frames: usize,
    observations: mpsc::Sender<Option<GestureLabel>>,
) -> CaptureHandle
where
    C: GestureClassifier + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = std::thread::Builder::new()
        .name("palmlink-capture".into())
        .spawn(move || {
            tracing::info!(device = %camera.device_path, "capture thread started");
            let mut warmup_left = warmup_frames;

            let result = camera.stream(|frame| {
                if stop_flag.load(Ordering::Relaxed) {
                    return ControlFlow::Break(());
                }

                // Discard warmup frames for camera AGC/AE stabilization
                if warmup_left > 0 {
                    warmup_left -= 1;
                    if warmup_left == 0 {
                        tracing::debug!(brightness = frame.avg_brightness(), "warmup complete");
                    }
                    return ControlFlow::Continue(());
                }

                let Some(observation) = observe(&mut classifier, &frame) else {
                    return ControlFlow::Continue(());
                };
                if observations.blocking_send(observation).is_err() {
                    // Dispatcher is gone.
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            });

            match result {
                Ok(()) => tracing::info!("capture thread stopped"),
                Err(err) => tracing::error!(error = %err, "camera stopped delivering frames"),
            }
        })
        .expect("failed to spawn capture thread");

    CaptureHandle { stop, thread }
}

/// Classify one frame. `None` means the frame is skipped (classifier error);
/// `Some(None)` means nothing was recognized.
fn observe<C: GestureClassifier>(classifier: &mut C, frame: &Frame) -> Option<Option<GestureLabel>> {
    match classifier.classify(&frame.data, frame.width, frame.height) {
        Ok(gestures) => Some(top_label(&gestures)),
        Err(err) => {
            tracing::warn!(seq = frame.sequence, error = %err, "gesture classification failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmlink_core::recognizer::ClassifierError;
    use palmlink_core::Gesture;

    struct ScriptedClassifier {
        results: Vec<Result<Vec<Gesture>, ClassifierError>>,
    }

    impl GestureClassifier for ScriptedClassifier {
        fn classify(
            &mut self,
            _rgb: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<Gesture>, ClassifierError> {
            self.results.remove(0)
        }
    }

    fn frame() -> Frame {
        Frame {
            data: vec![0; 12],
            width: 2,
            height: 2,
            timestamp: std::time::Instant::now(),
            sequence: 7,
        }
    }

    #[test]
    fn test_observe_uses_top_candidate_only() {
        let mut classifier = ScriptedClassifier {
            results: vec![Ok(vec![
                Gesture { label: GestureLabel::Victory, score: 0.8 },
                Gesture { label: GestureLabel::ThumbUp, score: 0.15 },
            ])],
        };
        assert_eq!(observe(&mut classifier, &frame()), Some(Some(GestureLabel::Victory)));
    }

    #[test]
    fn test_observe_empty_is_no_gesture() {
        let mut classifier = ScriptedClassifier {
            results: vec![Ok(vec![])],
        };
        assert_eq!(observe(&mut classifier, &frame()), Some(None));
    }

    #[test]
    fn test_observe_skips_classifier_errors() {
        let mut classifier = ScriptedClassifier {
            results: vec![Err(ClassifierError::InferenceFailed("boom".into()))],
        };
        assert_eq!(observe(&mut classifier, &frame()), None);
    }
}
