//! Flora Track Common Library
//!
//! Domain types and session logic shared by the CLI and any other front end.

pub mod defaults;
pub mod error;
pub mod export;
pub mod notes;
pub mod records;
pub mod reference;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod types;
pub mod vision;

pub use error::{Error, Result};
pub use export::{ExportAdapter, ExportContext, ExportOutcome};
pub use notes::NoteFamilies;
pub use records::RecordStore;
pub use reference::{
    OptionEdits, ReferenceCategory, ReferenceDataSet, ReferenceDataStore, ReferenceSource, SheetRow,
};
pub use resolver::SupplierResolver;
pub use session::{EanStatus, ExportPolicy, SaveOutcome, SessionController};
pub use storage::{MemoryStorage, PersistedSession, SessionStorage};
pub use types::{PriceRecord, ProductType, RecordDraft, RecordPatch, SupplierRule};
pub use vision::{AnalysisMode, RawVisionResponse, VisionDetection};
