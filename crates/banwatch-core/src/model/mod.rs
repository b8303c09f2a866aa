//! Domain model for the banwatch system
//!
//! - [`RawBan`] / [`Ban`]: ban records as delivered by the API and after validation
//! - [`Watermark`]: the "last checked" boundary persisted between runs
//! - [`PlayerProfile`]: enrichment data for a banned player
//! - [`Comment`]: moderator comments attached to a player

pub mod ban;
pub mod comment;
pub mod player;
pub mod timestamp;

mod lenient;

pub use ban::{Ban, BanRejection, RawBan};
pub use comment::Comment;
pub use player::{Blacklist, PlayerAction, PlayerFlag, PlayerProfile, Playtime, VipEntry};
pub use timestamp::Watermark;
