//! Filename analysis for the auto-rename pipeline.
//!
//! Two halves live here:
//! - ordered regex cascades that pull an episode number and a quality tag out
//!   of an arbitrary release-style filename ([`extract_episode`],
//!   [`extract_quality`]);
//! - the placeholder renderer that turns a user template plus those values
//!   into the new file name ([`render`], [`plan_rename`]).
//!
//! Nothing in this crate performs I/O.

pub mod cascade;
pub mod episode;
pub mod quality;
pub mod template;

pub use cascade::{Cascade, CascadeMatch, Rule};
pub use episode::{EpisodeCascade, extract_episode};
pub use quality::{UNKNOWN_QUALITY, extract_quality, quality_rule};
pub use template::{Extraction, RenamedFile, plan_rename, render, split_extension};
