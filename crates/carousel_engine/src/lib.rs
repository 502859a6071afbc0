//! Carousel engine: manifest fetching, image lookups and result storage.
mod decode;
mod engine;
mod fetch;
mod harvest;
mod info;
mod persist;
mod sink;
mod types;

pub use decode::{decode_json_text, DecodeError, DecodedText};
pub use engine::EngineHandle;
pub use fetch::{ChannelProgressSink, FetchSettings, Fetcher, NoProgress, ProgressSink, ReqwestFetcher};
pub use harvest::{Clock, HarvestError, HarvestReport, Harvester};
pub use info::{resolve_image_url, DimensionLookup, InfoDimensionLookup, NoDimensionLookup};
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use sink::{load_results, JsonFileSink, MemorySink, ResultSink, SelectedImage, SinkError};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, ManifestProgress};
