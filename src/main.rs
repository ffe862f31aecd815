use anyhow::Context;
use chrono::Local;
use clap::Parser;
use dialoguer::Confirm;
use flora_track::cli::{Cli, Commands, RecordArgs};
use flora_track::config::Config;
use flora_track::error::FloraTrackError;
use flora_track::export::XlsxFileExporter;
use flora_track::storage::JsonFileStorage;
use flora_track::{reference_loader, scanner, vision};
use flora_track_common::notes;
use flora_track_common::{
    AnalysisMode, EanStatus, ExportOutcome, ExportPolicy, PriceRecord, ProductType,
    ReferenceCategory, RecordDraft, ReferenceDataSet, ReferenceDataStore, ReferenceSource, SaveOutcome,
    SessionController,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

type Session = SessionController<JsonFileStorage>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("lettura configurazione")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }

    // the workbook loads in the background while the session file is read
    let reference_task = if needs_reference(&cli.command) {
        let source = config.reference_source()?;
        Some(tokio::spawn(
            async move { reference_loader::load_external(&source).await },
        ))
    } else {
        None
    };

    match cli.command {
        Commands::Add { record } => {
            let mut session = open_session(&config, None)?;
            let reference = reference_store(&config, reference_task).await?;
            prefill_store_context(&mut session);
            apply_record_args(&mut session, &record, &reference);
            report_save(session.save()?);
        }

        Commands::Edit { id, record } => {
            let mut session = open_session(&config, None)?;
            let reference = reference_store(&config, reference_task).await?;
            session.begin_edit(id, &reference.resolver())?;
            apply_record_args(&mut session, &record, &reference);
            report_save(session.save()?);
        }

        Commands::Delete { id, yes } => {
            let mut session = open_session(&config, None)?;
            let record = session
                .store()
                .get(id)
                .cloned()
                .ok_or(flora_track_common::Error::NotFound(id))?;
            print_record(&record);
            if !yes && !confirm("Eliminare questo rilevamento?")? {
                println!("Operazione annullata");
                return Ok(());
            }
            session.delete(id)?;
            println!("✔ Rilevamento eliminato");
        }

        Commands::List { filter } => {
            let session = open_session(&config, None)?;
            let term = filter.unwrap_or_default();
            let mut shown = 0;
            for record in session.filter(&term) {
                print_record(record);
                shown += 1;
            }
            println!("\n{} di {} rilevamenti", shown, session.store().len());
        }

        Commands::Clear { yes } => {
            let mut session = open_session(&config, None)?;
            if session.store().is_empty() {
                println!("Nessun rilevamento da cancellare");
                return Ok(());
            }
            let prompt = format!(
                "Cancellare {} rilevamenti? Resteranno nel backup",
                session.store().len()
            );
            if !yes && !confirm(&prompt)? {
                println!("Operazione annullata");
                return Ok(());
            }
            session.clear_all()?;
            println!("✔ Sessione svuotata (backup aggiornato)");
        }

        Commands::Restore { yes } => {
            let mut session = open_session(&config, None)?;
            if !session.store().is_empty() && !yes {
                let prompt = format!(
                    "La sessione contiene {} rilevamenti che verranno sostituiti. Continuare?",
                    session.store().len()
                );
                if !confirm(&prompt)? {
                    println!("Operazione annullata");
                    return Ok(());
                }
            }
            let count = session.restore_backup()?;
            println!("✔ Ripristinati {} rilevamenti dal backup", count);
        }

        Commands::Export { output, policy } => {
            let mut session = open_session(&config, policy)?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            let mut exporter = XlsxFileExporter::new(output_dir);
            let policy = session.policy();

            match session.export(&mut exporter, Local::now().date_naive())? {
                None => println!("Nessun rilevamento da esportare"),
                Some(outcome) => {
                    match outcome {
                        ExportOutcome::Saved(path) => println!("✔ Excel salvato: {}", path.display()),
                        ExportOutcome::Shared => println!("✔ File condiviso"),
                        ExportOutcome::Cancelled => println!("Condivisione annullata"),
                    }
                    if policy == ExportPolicy::Clear {
                        println!("✔ Sessione chiusa (ripristinabile con `flora-track restore`)");
                    }
                }
            }
        }

        Commands::Lookup { ean } => {
            let reference = reference_store(&config, reference_task).await?;
            let ean = ean.trim();
            match reference.resolver().resolve(ean) {
                Some(rule) => println!("✔ {} → {} (radice {})", ean, rule.supplier, rule.root),
                None => println!("Nessun fornitore associato a {}", ean),
            }
        }

        Commands::Rules { search } => {
            let reference = reference_store(&config, reference_task).await?;
            let resolver = reference.resolver();
            let term = search.unwrap_or_default();
            let mut shown = 0;
            for rule in resolver.search(&term) {
                println!("{:<12} {}", rule.root, rule.supplier);
                shown += 1;
            }
            println!("\n{} di {} regole", shown, resolver.rules().len());
        }

        Commands::Scan { path, fast, no_cache, clear_cache, save, record } => {
            let reference = reference_store(&config, reference_task).await?;
            let flags = ScanFlags { fast, no_cache, clear_cache, save };
            run_scan(&config, &reference, &path, flags, &record).await?;
        }

        Commands::Options { category, product_type, add, remove } => {
            let mut reference = reference_store(&config, reference_task).await?;
            match (category, add, remove) {
                (Some(category), Some(value), _) => {
                    edit_option(&config, &mut reference, category, &value, true)?;
                }
                (Some(category), None, Some(value)) => {
                    edit_option(&config, &mut reference, category, &value, false)?;
                }
                (category, _, _) => print_options(reference.data(), category, product_type),
            }
        }

        Commands::Status => {
            let session = open_session(&config, None)?;
            let reference = reference_store(&config, reference_task).await?;
            print_status(&config, &session, &reference)?;
        }

        Commands::Config { set_api_key, export_policy, reference_source, show } => {
            let mut config = Config::load()?;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ Chiave API impostata");
            }
            if let Some(policy) = export_policy {
                config.export_policy = policy;
                config.save()?;
                println!("✔ Policy di esportazione: {}", policy);
            }
            if let Some(source) = reference_source {
                config.reference_source = Some(source);
                config.save()?;
                println!("✔ Database di riferimento aggiornato");
            }

            if show {
                println!("Configurazione:");
                println!("  Modello: {}", config.model);
                println!("  Dimensione massima immagine: {}px", config.max_image_size);
                println!("  Timeout analisi: {}s", config.timeout_seconds);
                println!("  Database di riferimento: {}", config.reference_source()?);
                println!("  Cartella dati: {}", config.data_dir()?.display());
                println!("  Policy di esportazione: {}", config.export_policy);
                println!("  Famiglie note: {}", config.note_families.join(", "));
                println!("  Ricerca EAN da: {} cifre", config.min_ean_lookup_len);
                println!(
                    "  Chiave API: {}",
                    if config.get_api_key().is_ok() { "impostata" } else { "non impostata" }
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "flora_track=debug,flora_track_common=debug"
    } else {
        "flora_track=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn needs_reference(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Add { .. }
            | Commands::Edit { .. }
            | Commands::Lookup { .. }
            | Commands::Rules { .. }
            | Commands::Scan { .. }
            | Commands::Options { .. }
            | Commands::Status
    )
}

/// Defaults first, then whatever the background load produced, then the
/// user's own option edits
async fn reference_store(
    config: &Config,
    task: Option<JoinHandle<Option<ReferenceDataSet>>>,
) -> anyhow::Result<ReferenceDataStore> {
    let mut reference = ReferenceDataStore::initialize();
    if let Some(task) = task {
        match task.await {
            Ok(Some(external)) => {
                reference.merge_external(external);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "reference load task failed"),
        }
    }
    let edits = JsonFileStorage::new(config.data_dir()?).load_option_edits();
    reference.apply_edits(&edits);
    Ok(reference)
}

/// Add or remove one option and persist the edit for later sessions
fn edit_option(
    config: &Config,
    reference: &mut ReferenceDataStore,
    category: ReferenceCategory,
    value: &str,
    add: bool,
) -> anyhow::Result<()> {
    let value = value.trim();
    let changed = if add {
        reference.add_option(category, value)
    } else {
        reference.remove_option(category, value)
    };
    if !changed {
        if add {
            println!("Valore vuoto o già presente in {}", category);
        } else {
            println!("{} non presente in {}", value, category);
        }
        return Ok(());
    }

    let storage = JsonFileStorage::new(config.data_dir()?);
    let mut edits = storage.load_option_edits();
    if add {
        edits.record_add(category, value);
    } else {
        edits.record_remove(category, value);
    }
    storage.save_option_edits(&edits)?;

    if add {
        println!("✔ Aggiunto a {}: {}", category, value);
    } else {
        println!("✔ Rimosso da {}: {}", category, value);
    }
    Ok(())
}

fn open_session(config: &Config, policy: Option<ExportPolicy>) -> anyhow::Result<Session> {
    let data_dir = config.data_dir()?;
    let storage = JsonFileStorage::new(&data_dir);
    let session = SessionController::open(storage, policy.unwrap_or(config.export_policy))
        .with_context(|| format!("apertura sessione in {}", data_dir.display()))?
        .with_note_families(config.note_families())
        .with_min_lookup_len(config.min_ean_lookup_len);
    Ok(session)
}

/// A fresh process has an empty form: start from the chain and store of
/// the most recent record, like the form does between entries.
fn prefill_store_context(session: &mut Session) {
    let Some(latest) = session.store().records().first().cloned() else {
        return;
    };
    let draft = session.draft_mut();
    draft.store_chain = latest.store_chain;
    draft.store_name = latest.store_name;
    draft.product_type = latest.product_type;
}

fn apply_record_args(session: &mut Session, args: &RecordArgs, reference: &ReferenceDataStore) {
    args.apply_fields(session.draft_mut());

    if let Some(ean) = &args.ean {
        report_ean_status(session.set_ean(ean, &reference.resolver()));
    }
    args.apply_supplier(session.draft_mut());
    for flag in &args.flags {
        let updated = session.toggle_flag(flag);
        if notes::has_flag(updated, flag) {
            println!("+ {}", flag.trim());
        } else {
            println!("- {}", flag.trim());
        }
    }
}

fn report_ean_status(status: &EanStatus) {
    match status {
        EanStatus::Matched(supplier) => println!("✔ Fornitore riconosciuto: {}", supplier),
        EanStatus::Unmatched => println!("⚠ EAN non associato a nessun fornitore"),
        EanStatus::NotAttempted => {}
    }
}

fn report_save(outcome: SaveOutcome) {
    match &outcome {
        SaveOutcome::Created(_) => println!("✔ Rilevamento registrato"),
        SaveOutcome::Updated(_) => println!("✔ Rilevamento aggiornato"),
    }
    print_record(outcome.record());
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn print_record(record: &PriceRecord) {
    let measure = match record.product_type {
        ProductType::Bouquet => record
            .stems_count
            .map(|s| format!("{} steli", s))
            .unwrap_or_default(),
        ProductType::Plant => record
            .vase_diameter
            .map(|v| format!("Ø {} cm", v))
            .unwrap_or_default(),
    };
    println!(
        "[{}] {} {}/{} | {} {} ({}) € {:.2}",
        record.id,
        record.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
        record.store_chain,
        record.store_name,
        record.product_type,
        record.item_name,
        measure,
        record.price_value,
    );

    let mut extra = Vec::new();
    if let Some(supplier) = &record.supplier_name {
        extra.push(format!("Fornitore: {}", supplier));
    }
    if let Some(ean) = &record.ean_code {
        extra.push(format!("EAN: {}", ean));
    }
    if let Some(notes) = &record.notes {
        extra.push(format!("Note: {}", notes));
    }
    if !extra.is_empty() {
        println!("      {}", extra.join(" | "));
    }
}

fn print_options(
    data: &ReferenceDataSet,
    category: Option<ReferenceCategory>,
    product_type: Option<ProductType>,
) {
    if let Some(product_type) = product_type {
        for value in data.item_options(product_type) {
            println!("{}", value);
        }
        return;
    }

    match category {
        Some(category) => {
            for value in data.list(category) {
                println!("{}", value);
            }
        }
        None => {
            for category in ReferenceCategory::ALL {
                println!("{:<10} {} valori", category.key(), data.list(category).len());
            }
        }
    }
}

fn print_status(config: &Config, session: &Session, reference: &ReferenceDataStore) -> anyhow::Result<()> {
    println!("Sessione:");
    println!("  Cartella dati: {}", config.data_dir()?.display());
    println!("  Rilevamenti: {}", session.store().len());
    match session.store().backup() {
        Some(backup) => println!("  Backup: {} rilevamenti", backup.len()),
        None => println!("  Backup: nessuno"),
    }
    println!("  Policy di esportazione: {}", session.policy());

    println!("Dati di riferimento:");
    match reference.source() {
        ReferenceSource::External => println!("  Origine: database esterno"),
        ReferenceSource::Defaults => println!("  Origine: dati predefiniti (offline)"),
    }
    for category in ReferenceCategory::ALL {
        println!("  {:<10} {}", category.key(), reference.data().list(category).len());
    }
    println!("  {:<10} {}", "regole", reference.data().supplier_rules.len());
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ScanFlags {
    fast: bool,
    no_cache: bool,
    clear_cache: bool,
    save: bool,
}

async fn run_scan(
    config: &Config,
    reference: &ReferenceDataStore,
    path: &Path,
    flags: ScanFlags,
    record: &RecordArgs,
) -> anyhow::Result<()> {
    let ScanFlags { fast, no_cache, clear_cache, save } = flags;
    let images = scanner::scan_images(path)?;
    if images.is_empty() {
        println!("Nessuna immagine trovata in {}", path.display());
        return Ok(());
    }

    let client = vision::GeminiClient::new(
        config.get_api_key()?,
        config.model.clone(),
        config.timeout_seconds,
    )?;
    let data_dir = config.data_dir()?;
    if clear_cache && vision::VisionCache::clear(&data_dir)? {
        println!("✔ Cache dei risultati svuotata");
    }
    let mut cache = if no_cache {
        vision::VisionCache::default()
    } else {
        vision::VisionCache::load(&data_dir)
    };
    let mode = if fast { AnalysisMode::Fast } else { AnalysisMode::Thorough };
    let mut session = if save { Some(open_session(config, None)?) } else { None };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    for (idx, image) in images.iter().enumerate() {
        spinner.set_message(format!("[{}/{}] {}", idx + 1, images.len(), image.file_name));
        let result =
            vision::analyze_file(&client, &mut cache, &image.path, mode, config.max_image_size).await;

        spinner.suspend(|| println!("\n📷 {}", image.file_name));
        let detection = match result {
            Ok(Some(detection)) => detection,
            Ok(None) => {
                spinner.suspend(|| println!("⚠ Nessun dato leggibile, inserire manualmente"));
                continue;
            }
            Err(e @ (FloraTrackError::VisionService(_) | FloraTrackError::VisionTimeout(_))) => {
                tracing::warn!(file = %image.file_name, error = %e, "analysis failed");
                spinner.suspend(|| println!("⚠ Analisi non riuscita ({}), inserire manualmente", e));
                continue;
            }
            Err(FloraTrackError::ImageLoad(e)) => {
                spinner.suspend(|| println!("⚠ Immagine non leggibile: {}", e));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        spinner.suspend(|| {
            if let Some(name) = &detection.item_name {
                println!("  Articolo: {}", name);
            }
            if let Some(price) = detection.price {
                println!("  Prezzo: € {:.2}", price);
            }
            if let Some(ean) = &detection.ean_code {
                match reference.resolver().resolve(ean) {
                    Some(rule) => println!("  EAN: {} → {}", ean, rule.supplier),
                    None => println!("  EAN: {} (fornitore non associato)", ean),
                }
            }
        });

        if let Some(session) = session.as_mut() {
            *session.draft_mut() = RecordDraft::default();
            prefill_store_context(session);
            apply_record_args(session, record, reference);
            session.apply_detection(&detection, &reference.resolver());
            record.apply_supplier(session.draft_mut());
            match session.save() {
                Ok(outcome) => spinner.suspend(|| report_save(outcome)),
                Err(e) => spinner.suspend(|| println!("⚠ Non salvato: {}", e)),
            }
        }
    }
    spinner.finish_and_clear();

    if !no_cache {
        cache.save(&data_dir)?;
    }
    println!("\n✅ Analisi completata ({} immagini)", images.len());
    Ok(())
}
