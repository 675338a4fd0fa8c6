use crate::config::{ExtractorConfig, RegionConfig};
use crate::models::{Extraction, RegionSelection};
use crate::processing::{
    DebugSink, DebugStage, ImageProcessor, Preprocessor, RecognitionEngine, RegionFinder,
    RegionValidator,
};
use crate::utils::Result;
use crate::validation::MrzValidator;
use crate::utils::MrzError;
use crossbeam_channel::{bounded, Receiver, Sender};
use image::DynamicImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Image-to-key-material pipeline.
///
/// Holds no per-request state; share it behind an `Arc` and call
/// `extract` from as many threads as needed. All recognition calls funnel
/// into the one engine worker.
pub struct MrzExtractor {
    engine: RecognitionEngine,
    preprocessor: Preprocessor,
    finder: RegionFinder,
    region_config: RegionConfig,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl MrzExtractor {
    /// Validates `config` and starts a Tesseract engine for it.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let engine = RecognitionEngine::tesseract(config.engine.clone())?;
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: ExtractorConfig, engine: RecognitionEngine) -> Result<Self> {
        config.validate()?;
        Ok(MrzExtractor {
            engine,
            preprocessor: Preprocessor::new(config.preprocess)?,
            finder: RegionFinder::new(config.region.clone()),
            region_config: config.region,
            debug_sink: None,
        })
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Runs the whole pipeline on the image at `image_path`.
    ///
    /// Unreadable images and engine failures are errors; an image without
    /// a readable MRZ is `Ok(Extraction::NotFound)`.
    pub fn extract(&self, image_path: &Path) -> Result<Extraction> {
        info!("Extracting MRZ from {:?}", image_path);
        let img = ImageProcessor::load(image_path)?;
        let extraction = self.extract_image(&img)?;
        info!(
            "MRZ extraction for {:?}: {}",
            image_path,
            if extraction.is_found() { "found" } else { "not found" }
        );
        Ok(extraction)
    }

    pub fn extract_image(&self, img: &DynamicImage) -> Result<Extraction> {
        let sink = self.debug_sink.as_deref();

        let edges = self.preprocessor.run(img, sink);
        let candidates = self.finder.find_candidates(&edges);

        let selection = RegionValidator::new(&self.engine, &self.region_config)
            .select(img, &candidates, sink)?;
        if let Some(sink) = sink {
            sink.record(DebugStage::Selected, selection.image());
        }
        if let RegionSelection::Candidate { index, .. } = &selection {
            debug!("Full recognition on candidate {}", index);
        }

        let text = self.engine.recognize(selection.image())?.replace(' ', "");
        debug!("Raw OCR output:\n{}", text);

        Ok(MrzValidator::extract_key_material(&text))
    }
}

struct PoolJob {
    image_path: PathBuf,
    reply: Sender<Result<Extraction>>,
}

/// Runs extractions off the caller's thread on a fixed set of workers.
///
/// Requests wait in a bounded queue; `submit` blocks while it is full.
/// Dropping the pool lets the workers finish what is queued and exit.
pub struct ExtractionPool {
    jobs: Sender<PoolJob>,
}

impl ExtractionPool {
    pub const DEFAULT_WORKERS: usize = 2;

    pub fn new(extractor: Arc<MrzExtractor>, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let (jobs_tx, jobs_rx) = bounded::<PoolJob>(workers * 4);

        for id in 0..workers {
            let extractor = Arc::clone(&extractor);
            let jobs: Receiver<PoolJob> = jobs_rx.clone();
            thread::Builder::new()
                .name(format!("mrz-extract-{}", id))
                .spawn(move || {
                    for job in jobs.iter() {
                        let result = extractor.extract(&job.image_path);
                        if job.reply.send(result).is_err() {
                            warn!("Result for {:?} had no receiver", job.image_path);
                        }
                    }
                })?;
        }
        debug!("Extraction pool started with {} workers", workers);

        Ok(ExtractionPool { jobs: jobs_tx })
    }

    /// Queues `extract(image_path)`; the result arrives on the returned
    /// channel.
    pub fn submit(&self, image_path: PathBuf) -> Result<Receiver<Result<Extraction>>> {
        let (reply_tx, reply_rx) = bounded(1);
        self.jobs
            .send(PoolJob {
                image_path,
                reply: reply_tx,
            })
            .map_err(|_| MrzError::EngineUnavailable)?;
        Ok(reply_rx)
    }
}
