//! Structured page perception.
//!
//! This crate turns the raw output of an in-page extraction script plus a
//! devtools accessibility tree into an [`ElementMap`]: a densely indexed,
//! immutable view of the interactive elements on a page. The map is the
//! contract between the browser adapter (which resolves indices back to
//! nodes), the prompt builder (which renders the listing the model reads)
//! and the verification engine (which snapshots it before and after every
//! mutating action).

mod builder;
mod errors;
mod fusion;
mod listing;
mod model;
mod payload;
mod roles;
mod script;

pub use builder::{truncate_chars, ElementMapBuilder};
pub use errors::PerceiverError;
pub use fusion::fuse_accessibility;
pub use listing::{listing_line, render_listing};
pub use model::{BoundingBox, Element, ElementMap, ScrollInfo};
pub use payload::{RawElement, RawPage, RawScroll};
pub use roles::{implied_role, infer_role, is_interactive_role, INTERACTIVE_ROLES};
pub use script::{PAGE_EXTRACT_SCRIPT, SCRIPT_TEXT_LIMIT, VIEWPORT_SLACK_PX};
