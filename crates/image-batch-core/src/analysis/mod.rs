//! Path-in, data-out helpers that do not touch the pipeline

pub mod cryptographic;
pub mod duplicates;
pub mod info;
pub mod perceptual;

pub use cryptographic::compute_cryptographic;
pub use duplicates::{find_duplicates, DuplicateGroup, DuplicateMember, MatchKind};
pub use info::{inspect, ImageInfo};
pub use perceptual::{calculate_phash, phash_from_file, PHash};
