//! The download → probe → thumbnail → upload pipeline.
//!
//! Each inbound file gets its own [`TransferSession`], driven through
//! [`Phase`]s by [`RenamePipeline::handle`]. Probe and thumbnail problems
//! degrade the result; download and upload problems end the session. Local
//! artifacts are removed on every exit path.

mod runner;
mod session;

pub use runner::{
    MISSING_TEMPLATE_TEXT, PipelineServices, RenamePipeline, RenamePlan, SessionOutcome,
    run_session,
};
pub use session::{Phase, TransferSession};
