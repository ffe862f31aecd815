use thiserror::Error;

#[derive(Error, Debug)]
pub enum FloraTrackError {
    /// Domain errors (validation, missing record, missing backup, ...)
    #[error(transparent)]
    Common(#[from] flora_track_common::Error),

    #[error("Errore di configurazione: {0}")]
    Config(String),

    #[error("Chiave API non impostata. Usa `flora-track config --set-api-key CHIAVE` oppure GEMINI_API_KEY")]
    MissingApiKey,

    #[error("File non trovato: {0}")]
    FileNotFound(String),

    #[error("Errore del servizio di analisi: {0}")]
    VisionService(String),

    #[error("Analisi non completata entro {0} secondi")]
    VisionTimeout(u64),

    #[error("Dati di riferimento non disponibili: {0}")]
    ReferenceData(String),

    #[error("Errore caricamento immagine: {0}")]
    ImageLoad(String),

    #[error("Errore JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Errore IO: {0}")]
    Io(#[from] std::io::Error),
}

impl FloraTrackError {
    /// Failures of an external collaborator. The session keeps working on
    /// manual entry or default data when one of these occurs.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            FloraTrackError::VisionService(_)
                | FloraTrackError::VisionTimeout(_)
                | FloraTrackError::ReferenceData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FloraTrackError>;
