use crate::config::{EngineConfig, PageSegmentation};
use crate::utils::{MrzError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use image::DynamicImage;
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};
use tesseract::Tesseract;

/// A character recognizer. One instance is never called concurrently.
pub trait TextRecognizer {
    fn recognize(&mut self, image: &DynamicImage) -> Result<String>;
}

/// Tesseract configured with a character whitelist and page segmentation
/// mode. The handle is consumed by the builder-style API, so a call that
/// fails leaves no handle behind and the next call builds a new one.
pub struct TesseractRecognizer {
    config: EngineConfig,
    tess: Option<Tesseract>,
}

impl TesseractRecognizer {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let tess = Self::init(&config)?;
        Ok(TesseractRecognizer {
            config,
            tess: Some(tess),
        })
    }

    fn init(config: &EngineConfig) -> Result<Tesseract> {
        let datapath = match &config.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| MrzError::EngineInit(format!("Non UTF-8 tessdata path {:?}", dir)))?,
            ),
            None => None,
        };

        Tesseract::new(datapath, Some(config.language.as_str()))
            .map_err(|e| MrzError::EngineInit(format!("Tesseract init error: {}", e)))
    }

    fn page_seg_mode(mode: PageSegmentation) -> tesseract::PageSegMode {
        match mode {
            PageSegmentation::AutoOsd => tesseract::PageSegMode::PsmAutoOsd,
            PageSegmentation::Auto => tesseract::PageSegMode::PsmAuto,
            PageSegmentation::SingleBlock => tesseract::PageSegMode::PsmSingleBlock,
            PageSegmentation::SingleLine => tesseract::PageSegMode::PsmSingleLine,
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &DynamicImage) -> Result<String> {
        let tess = match self.tess.take() {
            Some(tess) => tess,
            None => Self::init(&self.config)?,
        };

        let mut tess = tess
            .set_variable("tessedit_char_whitelist", &self.config.whitelist)
            .map_err(|e| MrzError::Recognition(format!("Tesseract set variable error: {}", e)))?;
        tess.set_page_seg_mode(Self::page_seg_mode(self.config.page_segmentation));

        let frame = image.to_rgb8();
        let (width, height) = frame.dimensions();
        let mut tess = tess
            .set_frame(
                frame.as_raw(),
                width as i32,
                height as i32,
                3,
                3 * width as i32,
            )
            .map_err(|e| MrzError::Recognition(format!("Tesseract set image error: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| MrzError::Recognition(format!("Tesseract error: {}", e)))?;

        self.tess = Some(tess);
        Ok(text)
    }
}

struct Job {
    image: DynamicImage,
    reply: Sender<Result<String>>,
    deadline: Option<Instant>,
}

impl Job {
    fn expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Process-wide handle to a single recognizer living on its own thread.
///
/// Calls are queued and executed one at a time; each caller waits at most
/// `timeout` for its answer. A call still queued when its caller gives up
/// is dropped without reaching the recognizer. Clones share the same worker.
#[derive(Clone)]
pub struct RecognitionEngine {
    jobs: Sender<Job>,
    timeout: Option<Duration>,
}

impl RecognitionEngine {
    /// Builds the recognizer on a new worker thread with `factory` and
    /// returns once it is ready, or with the factory's error.
    pub fn spawn<F, R>(factory: F, timeout: Option<Duration>) -> Result<Self>
    where
        F: FnOnce() -> Result<R> + Send + 'static,
        R: TextRecognizer + 'static,
    {
        let (jobs_tx, jobs_rx) = unbounded::<Job>();
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        thread::Builder::new()
            .name("mrz-recognizer".to_string())
            .spawn(move || match factory() {
                Ok(recognizer) => {
                    let _ = ready_tx.send(Ok(()));
                    Self::serve(recognizer, jobs_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        ready_rx.recv().map_err(|_| MrzError::EngineUnavailable)??;
        info!("Recognition engine ready");

        Ok(RecognitionEngine {
            jobs: jobs_tx,
            timeout,
        })
    }

    /// Starts a Tesseract-backed engine from `config`.
    pub fn tesseract(config: EngineConfig) -> Result<Self> {
        let timeout = config.timeout();
        Self::spawn(move || TesseractRecognizer::new(config), timeout)
    }

    fn serve<R: TextRecognizer>(mut recognizer: R, jobs: Receiver<Job>) {
        for job in jobs.iter() {
            if job.expired() {
                debug!("Skipping recognition request whose caller already timed out");
                continue;
            }
            let result = recognizer.recognize(&job.image);
            // The caller may have timed out and dropped its receiver.
            if job.reply.send(result).is_err() {
                debug!("Discarded recognition result for an abandoned request");
            }
        }
        debug!("Recognition engine worker exiting");
    }

    pub fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let (reply_tx, reply_rx) = bounded(1);
        self.jobs
            .send(Job {
                image: image.clone(),
                reply: reply_tx,
                deadline: self.timeout.map(|timeout| Instant::now() + timeout),
            })
            .map_err(|_| MrzError::EngineUnavailable)?;

        match self.timeout {
            Some(timeout) => match reply_rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Recognition exceeded {:?}, failing request", timeout);
                    Err(MrzError::RecognitionTimeout(timeout))
                }
                Err(RecvTimeoutError::Disconnected) => Err(MrzError::EngineUnavailable),
            },
            None => reply_rx.recv().map_err(|_| MrzError::EngineUnavailable)?,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers calls from a script; once exhausted it repeats `fallback`.
    pub struct ScriptedRecognizer {
        pub script: VecDeque<String>,
        pub fallback: String,
        pub calls: Arc<AtomicUsize>,
        pub delay: Option<Duration>,
    }

    impl ScriptedRecognizer {
        pub fn new(script: &[&str], fallback: &str) -> Self {
            ScriptedRecognizer {
                script: script.iter().map(|s| s.to_string()).collect(),
                fallback: fallback.to_string(),
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&mut self, _image: &DynamicImage) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            Ok(self.script.pop_front().unwrap_or_else(|| self.fallback.clone()))
        }
    }

    pub struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&mut self, _image: &DynamicImage) -> Result<String> {
            Err(MrzError::Recognition("engine crashed".to_string()))
        }
    }

    pub fn scripted_engine(script: &[&str], fallback: &str) -> (RecognitionEngine, Arc<AtomicUsize>) {
        let recognizer = ScriptedRecognizer::new(script, fallback);
        let calls = recognizer.calls.clone();
        let engine = RecognitionEngine::spawn(move || Ok(recognizer), None).unwrap();
        (engine, calls)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use image::GrayImage;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn blank() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::new(4, 4))
    }

    #[test]
    fn test_engine_answers_in_order() {
        let (engine, calls) = scripted_engine(&["first", "second"], "");
        assert_eq!(engine.recognize(&blank()).unwrap(), "first");
        assert_eq!(engine.recognize(&blank()).unwrap(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_error_is_returned() {
        let result = RecognitionEngine::spawn(
            || -> Result<FailingRecognizer> { Err(MrzError::EngineInit("no tessdata".to_string())) },
            None,
        );
        assert!(matches!(result, Err(MrzError::EngineInit(_))));
    }

    #[test]
    fn test_recognizer_failure_propagates() {
        let engine = RecognitionEngine::spawn(|| Ok(FailingRecognizer), None).unwrap();
        assert!(matches!(engine.recognize(&blank()), Err(MrzError::Recognition(_))));
    }

    #[test]
    fn test_slow_call_times_out() {
        let mut recognizer = ScriptedRecognizer::new(&[], "late");
        recognizer.delay = Some(Duration::from_millis(300));
        let engine =
            RecognitionEngine::spawn(move || Ok(recognizer), Some(Duration::from_millis(20))).unwrap();

        assert!(matches!(
            engine.recognize(&blank()),
            Err(MrzError::RecognitionTimeout(_))
        ));
    }

    #[test]
    fn test_abandoned_requests_never_reach_recognizer() {
        let mut recognizer = ScriptedRecognizer::new(&[], "late");
        recognizer.delay = Some(Duration::from_millis(200));
        let calls = recognizer.calls.clone();
        let engine = Arc::new(
            RecognitionEngine::spawn(move || Ok(recognizer), Some(Duration::from_millis(100))).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.recognize(&blank()))
            })
            .collect();
        for handle in handles {
            assert!(matches!(
                handle.join().unwrap(),
                Err(MrzError::RecognitionTimeout(_))
            ));
        }

        // Let the worker finish the running call and drain the queue.
        thread::sleep(Duration::from_millis(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queued_call_within_deadline_still_runs() {
        let mut recognizer = ScriptedRecognizer::new(&["first", "second"], "");
        recognizer.delay = Some(Duration::from_millis(50));
        let engine = Arc::new(
            RecognitionEngine::spawn(move || Ok(recognizer), Some(Duration::from_secs(5))).unwrap(),
        );

        let other = engine.clone();
        let handle = thread::spawn(move || other.recognize(&blank()).unwrap());
        let mine = engine.recognize(&blank()).unwrap();
        let theirs = handle.join().unwrap();

        let mut answers = vec![mine, theirs];
        answers.sort();
        assert_eq!(answers, vec!["first", "second"]);
    }

    #[test]
    fn test_concurrent_callers_are_serialized() {
        let (engine, calls) = scripted_engine(&[], "MRZ");
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.recognize(&blank()).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "MRZ");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}
