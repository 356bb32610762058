pub mod digit_reader;
pub mod geometry;
pub mod layout;
pub mod locate;
pub mod matching;
pub mod player;
pub mod preprocess;
pub mod preview;

pub use digit_reader::{combine_digits, DigitReader, DigitTemplates, DEFAULT_DIGIT_CUTOFF};
pub use geometry::{deduplicate, distance, offset, scale_point, Point, DEFAULT_MIN_DISTANCE};
pub use layout::{DigitPlace, PlayerLayout};
pub use locate::{LocatorConfig, PercentLocator};
pub use player::{Player, PlayerStats};
pub use preview::{DirectoryPreview, NoopPreview, PreviewSink};
