pub mod lookup;
pub mod matching;
pub mod model;
pub mod patch;
pub mod sanity;
pub mod series;

pub use lookup::{Category, CheckFlag, KeywordRecord};
pub use matching::{KeywordMatcher, QuestionMatch};
pub use model::{FaqEntry, FaqRecord, Field, Lang};
pub use patch::{ChangeKind, ChangeRecord, FacitOutcome, FaqPatcher, PatchOutcome};
pub use sanity::{AutofixOutcome, SanityReport};
pub use series::{Series, SeriesCatalog};
