//! photoharvest - photo harvesting from lazily rendered listing pages.
//!
//! Listing pages only render their images once they scroll into view. The
//! harvester reveals each region in randomized increments, detects which page
//! template is in use, expands "view more" panels, and hands every unique
//! photo to a download callback.

#![allow(clippy::should_implement_trait)]

pub mod browser;
pub mod config;
pub mod download;
pub mod error;
pub mod harvest;
pub mod layout;
pub mod reveal;
pub mod session;

pub use error::{HarvestError, HarvestResult, PageError, SessionError};
pub use harvest::{HarvestedPhoto, PhotoCategory, PhotoHarvester};
pub use layout::LayoutVariant;
