pub mod ingest;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod scratch;

pub use ingest::{ingest_form, IngestError, IngestOptions, ParsedForm};
pub use self::metrics::{get_metrics, init_metrics};
pub use prompt::{assemble_prompt, PromptSegment};
pub use scratch::ScratchDir;
