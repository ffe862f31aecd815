use clap::{Args, Parser, Subcommand};
use flora_track_common::{ExportPolicy, ProductType, RecordDraft, ReferenceCategory};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flora-track")]
#[command(about = "Rilevamento prezzi concorrenza per piante e fiori recisi", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log dettagliati
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cartella dati della sessione (sovrascrive la configurazione)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Registra un nuovo prezzo
    Add {
        #[command(flatten)]
        record: RecordArgs,
    },

    /// Modifica un rilevamento esistente
    Edit {
        /// Id del rilevamento
        id: u64,

        #[command(flatten)]
        record: RecordArgs,
    },

    /// Elimina un rilevamento
    Delete {
        id: u64,

        /// Non chiedere conferma
        #[arg(short, long)]
        yes: bool,
    },

    /// Elenca i rilevamenti della sessione
    List {
        /// Filtra per articolo, EAN, fornitore, catena o negozio
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Svuota la sessione (i dati passano nel backup)
    Clear {
        #[arg(short, long)]
        yes: bool,
    },

    /// Ripristina l'ultimo backup
    Restore {
        #[arg(short, long)]
        yes: bool,
    },

    /// Esporta la sessione in Excel
    Export {
        /// Cartella di destinazione (predefinita: cartella corrente)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cosa fare dopo l'esportazione (clear/keep)
        #[arg(long)]
        policy: Option<ExportPolicy>,
    },

    /// Cerca il fornitore di un codice EAN
    Lookup {
        ean: String,
    },

    /// Elenca le regole EAN → fornitore
    Rules {
        /// Filtra per fornitore o radice
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Analizza foto di cartellini prezzo
    Scan {
        /// Immagine o cartella di immagini
        #[arg(required = true)]
        path: PathBuf,

        /// Modalità veloce (immagine ridotta, accettazione più severa)
        #[arg(long)]
        fast: bool,

        /// Non usare la cache dei risultati
        #[arg(long)]
        no_cache: bool,

        /// Svuota la cache dei risultati prima dell'analisi
        #[arg(long, conflicts_with = "no_cache")]
        clear_cache: bool,

        /// Salva ogni rilevamento valido nella sessione
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        record: RecordArgs,
    },

    /// Mostra o modifica una lista di opzioni (chains, stores, plants, flowers, suppliers, stems, vases)
    Options {
        category: Option<ReferenceCategory>,

        /// Suggerimenti articolo per tipologia (mazzo/pianta)
        #[arg(long = "type", conflicts_with_all = ["add", "remove"])]
        product_type: Option<ProductType>,

        /// Aggiunge un valore alla lista
        #[arg(long, requires = "category", conflicts_with = "remove")]
        add: Option<String>,

        /// Rimuove un valore dalla lista
        #[arg(long, requires = "category")]
        remove: Option<String>,
    },

    /// Stato della sessione e dei dati di riferimento
    Status,

    /// Mostra/modifica la configurazione
    Config {
        /// Imposta la chiave API Gemini
        #[arg(long)]
        set_api_key: Option<String>,

        /// Imposta la policy di esportazione (clear/keep)
        #[arg(long)]
        export_policy: Option<ExportPolicy>,

        /// Imposta il file o URL del database di riferimento
        #[arg(long)]
        reference_source: Option<String>,

        /// Mostra la configurazione
        #[arg(long)]
        show: bool,
    },
}

/// Record fields. All optional: `add` validates, `edit` only changes what
/// is given.
#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Catena
    #[arg(short, long)]
    pub chain: Option<String>,

    /// Negozio
    #[arg(short, long)]
    pub store: Option<String>,

    /// Tipologia (mazzo/pianta)
    #[arg(short = 't', long = "type")]
    pub product_type: Option<ProductType>,

    /// Articolo
    #[arg(short, long)]
    pub item: Option<String>,

    /// Prezzo (accetta la virgola)
    #[arg(short, long, value_parser = parse_decimal)]
    pub price: Option<f64>,

    /// Numero di steli (mazzo)
    #[arg(long)]
    pub stems: Option<u32>,

    /// Diametro vaso in cm (pianta)
    #[arg(long, value_parser = parse_decimal)]
    pub vase: Option<f64>,

    #[arg(long)]
    pub supplier: Option<String>,

    /// Codice EAN (dalla 7a cifra il fornitore viene cercato automaticamente)
    #[arg(short, long)]
    pub ean: Option<String>,

    /// Note libere (sostituiscono quelle esistenti)
    #[arg(short, long)]
    pub notes: Option<String>,

    /// Attiva/disattiva un'etichetta nelle note (ripetibile), es. "Ceramica", "Rami 2"
    #[arg(long = "flag")]
    pub flags: Vec<String>,
}

impl RecordArgs {
    /// Copy the plain fields that were given onto the draft. EAN, supplier
    /// and flags go through the session.
    pub fn apply_fields(&self, draft: &mut RecordDraft) {
        if let Some(chain) = &self.chain {
            draft.store_chain = chain.clone();
        }
        if let Some(store) = &self.store {
            draft.store_name = store.clone();
        }
        if let Some(product_type) = self.product_type {
            draft.product_type = product_type;
        }
        if let Some(item) = &self.item {
            draft.item_name = item.clone();
        }
        if self.price.is_some() {
            draft.price_value = self.price;
        }
        if self.stems.is_some() {
            draft.stems_count = self.stems;
        }
        if self.vase.is_some() {
            draft.vase_diameter = self.vase;
        }
        if let Some(notes) = &self.notes {
            draft.notes = notes.clone();
        }
    }

    /// An explicit supplier wins over any EAN lookup, typed or detected.
    /// Call it after the lookups.
    pub fn apply_supplier(&self, draft: &mut RecordDraft) {
        if let Some(supplier) = &self.supplier {
            draft.supplier_name = supplier.clone();
        }
    }
}

/// "12,50" and "€ 12.5" both parse to 12.5
pub fn parse_decimal(s: &str) -> Result<f64, String> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('€')
        .trim()
        .replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Numero non valido: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flora_track_common::{MemoryStorage, ReferenceDataStore, SessionController, VisionDetection};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("12,50"), Ok(12.5));
        assert_eq!(parse_decimal("€ 9.9"), Ok(9.9));
        assert!(parse_decimal("dodici").is_err());
        assert!(parse_decimal("NaN").is_err());
    }

    #[test]
    fn test_add_with_repeated_flags() {
        let cli = Cli::try_parse_from([
            "flora-track", "add", "-c", "Conad", "-s", "Pisa", "-t", "pianta", "-i", "Orchidea",
            "-p", "12,5", "--vase", "12", "--flag", "Ceramica", "--flag", "Rami 2",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { record } => {
                assert_eq!(record.product_type, Some(ProductType::Plant));
                assert_eq!(record.price, Some(12.5));
                assert_eq!(record.flags, vec!["Ceramica", "Rami 2"]);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_explicit_supplier_survives_detected_ean() {
        let cli = Cli::try_parse_from([
            "flora-track", "scan", "tags/", "--save", "-c", "Conad", "--supplier", "Vivaio Rossi",
        ])
        .unwrap();
        let Commands::Scan { record, .. } = cli.command else {
            panic!("expected scan");
        };

        let reference = ReferenceDataStore::initialize();
        let mut session = SessionController::open(MemoryStorage::default(), ExportPolicy::Clear).unwrap();
        record.apply_fields(session.draft_mut());
        let detection = VisionDetection {
            item_name: Some("Orchidea".into()),
            price: Some(12.9),
            ean_code: Some("4006381333931".into()),
        };
        session.apply_detection(&detection, &reference.resolver());
        assert_eq!(session.draft().supplier_name, "");

        record.apply_supplier(session.draft_mut());
        assert_eq!(session.draft().supplier_name, "Vivaio Rossi");
        assert_eq!(session.draft().store_chain, "Conad");
    }

    #[test]
    fn test_options_add_requires_category() {
        assert!(Cli::try_parse_from(["flora-track", "options", "--add", "Coop"]).is_err());

        let cli = Cli::try_parse_from(["flora-track", "options", "chains", "--add", "Coop"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Options { category: Some(ReferenceCategory::Chains), add: Some(_), remove: None, .. }
        ));
    }

    #[test]
    fn test_scan_cache_flags_conflict() {
        assert!(Cli::try_parse_from(["flora-track", "scan", "x.jpg", "--no-cache", "--clear-cache"]).is_err());
    }

    #[test]
    fn test_export_policy_flag() {
        let cli = Cli::try_parse_from(["flora-track", "export", "--policy", "keep"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export { policy: Some(ExportPolicy::Keep), .. }
        ));
    }
}
