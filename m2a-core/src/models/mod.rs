pub mod methylation;
pub mod promoter;
pub mod promoter_set;

// re-export for cleaner imports
pub use self::methylation::{MethylationRecord, MethylationSet, MethylationTrack};
pub use self::promoter::{PROMOTER_COLUMNS, Promoter, Strand};
pub use self::promoter_set::{PromoterSet, parse_promoter_fields};
