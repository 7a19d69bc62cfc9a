pub mod formats;
pub mod keywords;
pub mod text;

pub use formats::{
    FormatFinding, FormatNormalizer, FormatOutcome, FormatStatus, SizeFormat, SizeVariants,
    INVALID_FORMAT,
};
pub use keywords::{KeywordList, KeywordNormalizer, PedestalConversion};
