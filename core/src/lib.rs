pub mod config;
pub mod document;
pub mod engine;
pub mod index;
pub mod persist;
pub mod query;
pub mod results;
pub mod spelling;
pub mod store;
pub mod synonyms;
pub mod tokenizer;

pub use config::{AllTermsOf, MatchMode, ScoringWeights, SearchConfig};
pub use document::{Document, Review};
pub use engine::{Ranking, ScoreBreakdown, ScoredDocument, SearchEngine};
pub use index::{build, BuiltIndex, Field, IndexSet, ReviewStats};
pub use query::{Correction, CorrectionSource, ProcessedQuery, QueryProcessor};
pub use results::{QueryHistory, ResultEntry, SearchResponse};
pub use spelling::{DictionaryCorrector, NoCorrector, SpellCorrector};
pub use store::IndexStore;
pub use synonyms::SynonymTable;
