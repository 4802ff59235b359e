use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use chrono::Local;
use tracing::{debug, info};

use checkin_core::export::{self, photo};
use checkin_core::models::today_display;
use checkin_core::utils::truncate;
use checkin_core::{
    AttendanceRecord, CacheManager, CheckIn, ClearReport, Config, Outcome, RecordDirectory,
    ReloadSource, RemoteBackend, SessionGate, SyncEngine,
};

use crate::cli::Commands;

/// Services for one CLI invocation.
pub struct App {
    engine: SyncEngine<RemoteBackend>,
    session: SessionGate,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");
        let cache = CacheManager::new(cache_dir)?;

        let store = RemoteBackend::from_config(config);
        let directory = RecordDirectory::init(cache.clone());
        let engine = SyncEngine::new(store, directory, config.photo_policy());
        let session = SessionGate::init(config.admin_credentials(), cache);

        Ok(Self { engine, session })
    }

    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Submit {
                name,
                registration,
                course,
                photo,
            } => self.submit(name, registration, course, photo.as_deref()).await,
            Commands::List {
                search,
                course,
                refresh,
            } => {
                self.require_admin()?;
                if refresh {
                    self.engine.reload().await;
                }
                let records = self.engine.directory().filter(&search, &course);
                print_table(&records);
                Ok(())
            }
            Commands::Stats => {
                self.require_admin()?;
                let stats = self.engine.directory().stats(&today_display());
                println!("Total:       {}", stats.total);
                println!("With photo:  {}", stats.with_photo);
                println!("Today:       {}", stats.today);
                println!("Unsynced:    {}", stats.pending);
                Ok(())
            }
            Commands::Courses => {
                self.require_admin()?;
                for course in self.engine.directory().courses() {
                    println!("{}", course);
                }
                Ok(())
            }
            Commands::Reload => {
                match self.engine.reload().await {
                    ReloadSource::Remote { count } => {
                        println!("Loaded {} records from the remote store", count)
                    }
                    ReloadSource::Cache { count, reason } => println!(
                        "Remote store unavailable ({}); showing {} cached records",
                        reason, count
                    ),
                    ReloadSource::Empty { reason } => {
                        println!("No records available ({})", reason)
                    }
                }
                Ok(())
            }
            Commands::Sync => {
                let report = self.engine.retry_pending().await;
                println!(
                    "Synced {}, already registered {}, still on this device {}",
                    report.synced, report.duplicates, report.still_pending
                );
                Ok(())
            }
            Commands::Export { format, out } => {
                self.require_admin()?;
                let path = out.unwrap_or_else(|| format.default_file_name(Local::now()).into());
                let path = export::export_records(self.engine.directory().all(), format, &path)?;
                println!("Exported to {}", path.display());
                println!("Photos are saved one at a time with `checkin photo <ID>`.");
                Ok(())
            }
            Commands::Photo { id, dir } => {
                self.require_admin()?;
                let record = self
                    .engine
                    .directory()
                    .get(&id)
                    .ok_or_else(|| export::ExportError::RecordNotFound(id.clone()))?;
                let path = photo::save_photo(record, &dir)?;
                println!("Photo of {} saved to {}", record.full_name, path.display());
                Ok(())
            }
            Commands::Login { username, password } => {
                let password = match password {
                    Some(p) => p,
                    None => rpassword::prompt_password("Password: ")
                        .context("Failed to read password")?,
                };
                if self.session.login(&username, &password)? {
                    println!("Logged in as {}", username);
                    Ok(())
                } else {
                    bail!("Invalid username or password")
                }
            }
            Commands::Logout => {
                self.session.logout()?;
                println!("Logged out");
                Ok(())
            }
            Commands::Status => {
                let directory = self.engine.directory();
                let store = self.engine.store();
                let session = if self.session.is_authenticated() {
                    "logged in"
                } else {
                    "logged out"
                };
                println!("Session:   {}", session);
                println!("Backend:   {}", store.name());
                if let Some(endpoint) = store.endpoint() {
                    println!("Endpoint:  {}", endpoint);
                }
                println!(
                    "Records:   {} ({} unsynced)",
                    directory.len(),
                    directory.pending().count()
                );
                println!(
                    "Cached:    {}",
                    directory.cache().records_age().unwrap_or_else(|| "never".to_string())
                );
                Ok(())
            }
            Commands::Clear { yes } => {
                self.require_admin()?;
                if !yes && !confirm("Delete every record? This cannot be undone. [y/N] ")? {
                    println!("Cancelled");
                    return Ok(());
                }
                let ClearReport { remote, local } = self.engine.clear_all().await;
                local.context("Cached records could not be removed")?;
                println!("Local records cleared");
                remote.context("Remote records could not be cleared")?;
                println!("Remote records cleared");
                Ok(())
            }
            Commands::Diagnose => {
                let store = self.engine.store();
                println!("Backend:   {}", store.name());
                println!("Endpoint:  {}", store.endpoint().unwrap_or("-"));
                match self.engine.health_check().await {
                    Ok(()) => println!("Connection: ok"),
                    Err(e) => println!("Connection: failed ({})", e),
                }
                Ok(())
            }
        }
    }

    async fn submit(
        &mut self,
        name: String,
        registration: String,
        course: Option<String>,
        photo_path: Option<&Path>,
    ) -> Result<()> {
        let mut input = CheckIn::new(name, registration);
        input.course = course;
        if let Some(path) = photo_path {
            input.photo = Some(read_photo(path)?);
        }

        let outcome = self.engine.submit(input).await?;
        info!(success = outcome.success(), "Submission finished");

        match outcome {
            Outcome::Remote(record) => {
                println!("Check-in confirmed for {} ({})", record.full_name, record.id);
                Ok(())
            }
            Outcome::Local { record, reason } => {
                println!("Check-in saved on this device for {}", record.full_name);
                println!("It will be sent later with `checkin sync` ({})", reason);
                Ok(())
            }
            Outcome::Duplicate { .. } => {
                bail!("Check-in already registered for this registration today")
            }
        }
    }

    fn require_admin(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Admin login required; run `checkin login` first");
        }
        Ok(())
    }
}

fn read_photo(path: &Path) -> Result<String> {
    let mime = photo::mime_for_path(path)
        .ok_or_else(|| anyhow::anyhow!("Unsupported photo file: {}", path.display()))?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read photo: {}", path.display()))?;
    Ok(photo::encode_data_url(&bytes, mime))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_table(records: &[&AttendanceRecord]) {
    if records.is_empty() {
        println!("No records");
        return;
    }
    println!(
        "{:<28} {:<14} {:<20} {:<10} {:<8} {:<5} {}",
        "NAME", "REGISTRATION", "COURSE", "DATE", "TIME", "PHOTO", "ID"
    );
    for record in records {
        println!(
            "{:<28} {:<14} {:<20} {:<10} {:<8} {:<5} {}",
            truncate(&record.full_name, 28),
            truncate(&record.registration, 14),
            truncate(&record.course, 20),
            record.date,
            record.time,
            record.has_photo_display(),
            record.id
        );
    }
    println!("{} records", records.len());
}
