pub mod batch;
pub mod debug;
pub mod image;
pub mod morphology;
pub mod ocr;
pub mod preprocess;
pub mod region;

pub use batch::{collect_images, process_directory, BatchReport};
pub use debug::{DebugSink, DebugStage, DirectorySink};
pub use self::image::ImageProcessor;
pub use ocr::{RecognitionEngine, TesseractRecognizer, TextRecognizer};
pub use preprocess::Preprocessor;
pub use region::{RegionFinder, RegionValidator};
