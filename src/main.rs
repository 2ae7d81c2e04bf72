use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use clinicdesk_lib::api::assets::{resolve_image, AssetKind, ResolvedImage};
use clinicdesk_lib::api::{self, ApiClient};
use clinicdesk_lib::core_state::AuthStatus;
use clinicdesk_lib::models::{
    Doctor, DoctorProfileUpdate, ImageUpload, ListFilter, PasswordChange, PatientForm,
    PrescriptionDraft,
};
use clinicdesk_lib::notify::{AutoConfirm, Confirm, Notification, Notifier, Severity};
use clinicdesk_lib::patients::PatientsView;
use clinicdesk_lib::prescriptions::PrescriptionsView;
use clinicdesk_lib::search::{highlight, PageLabel, SearchController, SearchSource};
use clinicdesk_lib::{backup, config, dashboard};

/// ClinicDesk terminal client
#[derive(Parser, Debug)]
#[command(name = "clinicdesk", version, about = "Patient and prescription records for a single clinic")]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = config::API_URL_ENV, default_value = config::DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// End the stored session
    Logout,
    /// Show the logged-in doctor
    Whoami,
    /// Change the account password
    ChangePassword,
    /// Statistics, recent records and upcoming follow-ups
    Dashboard,
    /// List or search patients
    Patients {
        /// Search by patient id, name or phone
        query: Option<String>,
        #[command(flatten)]
        paging: Paging,
    },
    /// List or search prescriptions
    Prescriptions {
        /// Search by id, patient, phone, symptoms or notes
        query: Option<String>,
        /// Only prescriptions with a follow-up date
        #[arg(long)]
        follow_ups: bool,
        #[command(flatten)]
        paging: Paging,
    },
    /// Register a new patient
    AddPatient {
        /// Photo to attach
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Edit a patient's details
    EditPatient {
        patient: String,
        /// Replace the photo
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Where a patient's photo is served from
    Photo { patient: String },
    /// Prescription history of one patient
    History { patient: String },
    /// One prescription in full
    Show { prescription: String },
    /// Write a prescription for a patient
    NewPrescription {
        patient: String,
        /// Start from a saved template (name or id)
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Edit a prescription
    EditPrescription { prescription: String },
    /// Saved prescription templates
    Templates,
    /// Show the doctor profile
    Profile {
        /// Edit the profile fields
        #[arg(long)]
        edit: bool,
    },
    /// Upload or remove the signature printed on prescriptions
    Signature {
        /// Image file to upload
        file: Option<PathBuf>,
        #[arg(long, conflicts_with = "file")]
        remove: bool,
    },
    /// Delete a patient and their prescriptions
    DeletePatient { patient: String },
    /// Delete one prescription
    DeletePrescription { prescription: String },
    /// Record counts held by the server
    Counts,
    /// Download a full backup
    Export {
        /// Target directory (defaults to the app data exports folder)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Replace all server data with a backup file
    Import { file: PathBuf },
}

#[derive(clap::Args, Debug)]
struct Paging {
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    #[arg(short, long, default_value_t = config::DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    limit: u32,
}

fn parse_page_size(raw: &str) -> Result<u32, String> {
    let size: u32 = raw.parse().map_err(|_| format!("not a number: {raw}"))?;
    if config::PAGE_SIZE_OPTIONS.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {:?}", config::PAGE_SIZE_OPTIONS))
    }
}

// ── Terminal collaborators ──────────────────────────────────

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "ok",
        };
        eprintln!("[{tag}] {}: {}", notification.title(), notification.message());
    }
}

struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, title: &str, message: &str) -> bool {
        eprintln!("{title}\n{message}");
        dialoguer::Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

// ── Commands ────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    clinicdesk_lib::init_tracing();
    let cli = Cli::parse();

    let client = clinicdesk_lib::start(&cli.api_url, Arc::new(TerminalNotifier))
        .context("failed to start")?;
    let confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(PromptConfirm)
    };

    if !matches!(cli.command, Command::Login { .. }) && !client.core().is_authenticated() {
        bail!("Not logged in. Run `clinicdesk login` first.");
    }

    let outcome = run(&client, cli.command, confirm.as_ref()).await;
    if client.core().status() == AuthStatus::Expired {
        bail!("Session expired. Run `clinicdesk login` again.");
    }
    outcome
}

async fn run(client: &Arc<ApiClient>, command: Command, confirm: &dyn Confirm) -> Result<()> {
    match command {
        Command::Login { username } => login(client, username).await,
        Command::Logout => {
            api::auth::logout(client)?;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            let doctor = api::auth::fetch_profile(client).await?;
            println!("{} ({})", doctor.name, doctor.username);
            println!("{} · {}", doctor.specialization, doctor.clinic_name);
            Ok(())
        }
        Command::ChangePassword => change_password(client).await,
        Command::Dashboard => show_dashboard(client).await,
        Command::Patients { query, paging } => {
            let view = PatientsView::new(client.clone());
            let rows = page_through(view.list(), query.as_deref(), &paging).await?;
            for p in rows {
                println!(
                    "{:<10} {:<28} {:<12} {}",
                    p.patient_id,
                    marked(&p.name, query.as_deref()),
                    marked(&p.phone, query.as_deref()),
                    p.id
                );
            }
            footer(view.list());
            Ok(())
        }
        Command::Prescriptions {
            query,
            follow_ups,
            paging,
        } => {
            let view = PrescriptionsView::new(client.clone());
            if follow_ups {
                view.set_filter(ListFilter::FollowUps).await?;
            }
            let now = Utc::now();
            let rows = page_through(view.list(), query.as_deref(), &paging).await?;
            for rx in rows {
                let overdue = if rx.is_overdue(now) { " OVERDUE" } else { "" };
                println!(
                    "{:<12} {:<24} {:<18}{} {}",
                    rx.code(),
                    marked(rx.display_patient_name(), query.as_deref()),
                    rx.display_status(),
                    overdue,
                    rx.id
                );
            }
            footer(view.list());
            Ok(())
        }
        Command::AddPatient { photo } => {
            let mut form = PatientForm::default();
            fill_patient_form(&mut form)?;
            let photo = read_image(photo).await?;
            let created = api::patients::create(client, &form, photo.as_ref()).await?;
            println!("Registered {} ({}).", created.name, created.patient_id);
            Ok(())
        }
        Command::EditPatient { patient, photo } => {
            let record = api::patients::get(client, &patient).await?;
            let mut form = PatientForm::from_patient(&record, Local::now().date_naive());
            fill_patient_form(&mut form)?;
            let photo = read_image(photo).await?;
            let updated =
                api::patients::update(client, &record.id, &form, photo.as_ref()).await?;
            println!("Saved {} ({}).", updated.name, updated.patient_id);
            Ok(())
        }
        Command::Photo { patient } => {
            let record = api::patients::get(client, &patient).await?;
            let kind = AssetKind::PatientPhoto;
            match resolve_image(client, kind, &record.name, record.photo.as_deref()).await {
                ResolvedImage::Asset { url, bytes } => println!("{url} ({} bytes)", bytes.len()),
                ResolvedImage::Placeholder { url } => println!("{url} (placeholder)"),
            }
            Ok(())
        }
        Command::History { patient } => {
            let view = PatientsView::new(client.clone());
            let history = view.history().open(patient).await?;
            if history.is_empty() {
                println!("No prescriptions for this patient.");
            }
            for rx in history {
                let written = rx
                    .created_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<12} {:<10} {:<32} {}",
                    rx.code(),
                    written,
                    rx.status_label(),
                    rx.symptoms
                );
            }
            Ok(())
        }
        Command::Show { prescription } => {
            let view = PrescriptionsView::new(client.clone());
            let rx = view.detail().open(prescription).await?;
            println!("{}  {}", rx.code(), rx.display_status());
            println!("Patient:      {}", rx.display_patient_name());
            println!("Symptoms:     {}", rx.symptoms);
            println!("Prescription: {}", rx.prescription);
            if let Some(at) = rx.next_follow_up {
                let overdue = if rx.is_overdue(Utc::now()) { " (overdue)" } else { "" };
                println!("Follow-up:    {}{overdue}", at.format("%Y-%m-%d"));
            }
            if let Some(notes) = rx.notes.as_deref().filter(|n| !n.is_empty()) {
                println!("Notes:        {notes}");
            }
            Ok(())
        }
        Command::NewPrescription { patient, template } => {
            let record = api::patients::get(client, &patient).await?;
            let mut draft = PrescriptionDraft {
                patient_id: record.id.clone(),
                ..PrescriptionDraft::default()
            };
            if let Some(wanted) = template {
                let templates = api::doctors::templates(client).await?;
                let Some(chosen) = templates
                    .iter()
                    .find(|t| t.id == wanted || t.name.eq_ignore_ascii_case(&wanted))
                else {
                    bail!("No template named \"{wanted}\". Run `clinicdesk templates`.");
                };
                chosen.apply(&mut draft, Utc::now());
            }
            println!("Prescription for {} ({})", record.name, record.patient_id);
            fill_draft(&mut draft)?;
            let created = api::prescriptions::create(client, &draft).await?;
            println!("Saved {}.", created.code());
            Ok(())
        }
        Command::EditPrescription { prescription } => {
            let record = api::prescriptions::get(client, &prescription).await?;
            let mut draft = PrescriptionDraft::from_prescription(&record);
            println!("{} for {}", record.code(), record.display_patient_name());
            fill_draft(&mut draft)?;
            let updated = api::prescriptions::update(client, &record.id, &draft).await?;
            println!("Saved {}.", updated.code());
            Ok(())
        }
        Command::Templates => {
            let templates = api::doctors::templates(client).await?;
            if templates.is_empty() {
                println!("No saved templates.");
            }
            for t in templates {
                let follow_up = match t.follow_up_days {
                    0 => String::new(),
                    days => format!("follow-up in {days} days"),
                };
                println!("{:<24} {:<26} {}", t.name, t.id, follow_up);
            }
            Ok(())
        }
        Command::Profile { edit } => {
            let mut doctor = api::auth::fetch_profile(client).await?;
            if edit {
                let mut update = DoctorProfileUpdate::from_doctor(&doctor);
                fill_profile(&mut update)?;
                doctor = api::doctors::update_profile(client, &update).await?;
                println!("Profile saved.");
            }
            show_profile(client, &doctor).await;
            Ok(())
        }
        Command::Signature { file, remove } => {
            if remove {
                api::doctors::delete_signature(client).await?;
                println!("Signature removed.");
                return Ok(());
            }
            let Some(image) = read_image(file).await? else {
                bail!("Give an image file to upload, or --remove.");
            };
            let stored = api::doctors::upload_signature(client, &image).await?;
            let url = api::assets::signature_url(client.origin(), &stored).unwrap_or(stored);
            println!("Signature saved: {url}");
            Ok(())
        }
        Command::DeletePatient { patient } => {
            let record = api::patients::get(client, &patient).await?;
            let view = PatientsView::new(client.clone());
            if !view.delete(&record, confirm).await? {
                println!("Cancelled.");
            }
            Ok(())
        }
        Command::DeletePrescription { prescription } => {
            let record = api::prescriptions::get(client, &prescription).await?;
            let view = PrescriptionsView::new(client.clone());
            if !view.delete(&record, confirm).await? {
                println!("Cancelled.");
            }
            Ok(())
        }
        Command::Counts => {
            let counts = api::admin::data_counts(client).await?;
            println!("Patients:      {}", counts.patients);
            println!("Prescriptions: {}", counts.prescriptions);
            println!("Doctors:       {}", counts.doctors);
            println!("Templates:     {}", counts.templates);
            Ok(())
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(config::exports_dir);
            let path = backup::export_backup(client, &dir).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Import { file } => {
            let password = dialoguer::Password::new()
                .with_prompt("Re-enter your password to continue")
                .interact()?;
            let grant = match api::auth::danger_zone_auth(client, &password).await {
                Ok(grant) => grant,
                Err(e) => bail!(
                    "Danger zone authentication failed: {}",
                    e.user_message("Invalid password")
                ),
            };
            match backup::import_backup(client, &file, &grant, confirm).await {
                Ok(report) => {
                    println!("{}", report.message);
                    Ok(())
                }
                Err(backup::BackupError::Cancelled) => {
                    println!("Cancelled.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

async fn login(client: &ApiClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = dialoguer::Password::new().with_prompt("Password").interact()?;
    let doctor = api::auth::login(client, &username, &password).await?;
    println!("Welcome, {}.", doctor.name);
    if doctor.require_password_change {
        println!("You must change your password: run `clinicdesk change-password`.");
    }
    Ok(())
}

async fn change_password(client: &ApiClient) -> Result<()> {
    let change = PasswordChange {
        current_password: dialoguer::Password::new()
            .with_prompt("Current password")
            .interact()?,
        new_password: dialoguer::Password::new()
            .with_prompt("New password")
            .interact()?,
        confirm_password: dialoguer::Password::new()
            .with_prompt("Confirm new password")
            .interact()?,
    };
    api::auth::force_change_password(client, &change).await?;
    println!("Password changed. Log in again with the new password.");
    Ok(())
}

// ── Forms ───────────────────────────────────────────────────

/// Free-text prompt pre-filled with `initial`. May come back empty.
fn ask(prompt: &str, initial: &str) -> Result<String> {
    let answer = dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

fn ask_optional(prompt: &str, initial: Option<&str>) -> Result<Option<String>> {
    let answer = ask(prompt, initial.unwrap_or_default())?;
    Ok(Some(answer).filter(|a| !a.is_empty()))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("{raw} is not a YYYY-MM-DD date"))
}

async fn read_image(path: Option<PathBuf>) -> Result<Option<ImageUpload>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let image = ImageUpload::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Some(image))
}

/// Prompt for every patient field. Age and date of birth are kept in step:
/// a birth date sets the age, an age alone sets 1 January of that year.
fn fill_patient_form(form: &mut PatientForm) -> Result<()> {
    let today = Local::now().date_naive();
    form.patient_id = ask("Patient ID (blank to assign automatically)", &form.patient_id)?;
    form.name = ask("Full name", &form.name)?;

    let dob = form
        .date_of_birth
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let dob = ask("Date of birth (YYYY-MM-DD, blank to give age)", &dob)?;
    if dob.is_empty() {
        let age = form.age.map(|a| a.to_string()).unwrap_or_default();
        let age: u32 = ask("Age", &age)?
            .parse()
            .context("age must be a whole number")?;
        form.set_age(age, today);
    } else {
        form.set_date_of_birth(parse_date(&dob)?, today);
    }

    let sex = form.sex.map(|s| s.as_str()).unwrap_or_default();
    form.sex = Some(ask("Sex (Male/Female/Other)", sex)?.parse()?);
    form.phone = ask("Phone", &form.phone)?;
    form.address = ask("Address", &form.address)?;

    let contact = &mut form.emergency_contact;
    contact.name = ask("Emergency contact name", &contact.name)?;
    contact.relation = ask("Emergency contact relation", &contact.relation)?;
    contact.phone = ask("Emergency contact phone", &contact.phone)?;

    let history = &mut form.medical_history;
    history.allergies = ask_optional("Allergies", history.allergies.as_deref())?;
    history.chronic_illnesses =
        ask_optional("Chronic illnesses", history.chronic_illnesses.as_deref())?;
    history.past_surgeries = ask_optional("Past surgeries", history.past_surgeries.as_deref())?;
    history.medications = ask_optional("Current medications", history.medications.as_deref())?;
    history.additional_notes =
        ask_optional("Additional notes", history.additional_notes.as_deref())?;
    Ok(())
}

fn fill_draft(draft: &mut PrescriptionDraft) -> Result<()> {
    draft.symptoms = ask("Symptoms", &draft.symptoms)?;
    draft.prescription = ask("Prescription", &draft.prescription)?;
    let follow_up = draft
        .next_follow_up
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    draft.next_follow_up = match ask("Follow-up date (YYYY-MM-DD, blank for none)", &follow_up)? {
        raw if raw.is_empty() => None,
        raw => Some(parse_date(&raw)?.and_time(NaiveTime::MIN).and_utc()),
    };
    draft.notes = ask_optional("Notes", draft.notes.as_deref())?;
    Ok(())
}

fn fill_profile(update: &mut DoctorProfileUpdate) -> Result<()> {
    update.name = ask("Name", &update.name)?;
    update.email = ask("Email", &update.email)?;
    update.specialization = ask("Specialization", &update.specialization)?;
    update.license_number = ask_optional("License number", update.license_number.as_deref())?;
    update.clinic_name = ask("Clinic name", &update.clinic_name)?;
    update.clinic_address = ask("Clinic address", &update.clinic_address)?;
    update.phone = ask("Phone", &update.phone)?;
    Ok(())
}

async fn show_profile(client: &ApiClient, doctor: &Doctor) {
    println!("{} ({})", doctor.name, doctor.username);
    println!("Email:          {}", doctor.email);
    println!("Specialization: {}", doctor.specialization);
    if let Some(license) = &doctor.license_number {
        println!("License:        {license}");
    }
    println!("Clinic:         {}", doctor.clinic_name);
    if let Some(address) = &doctor.clinic_address {
        println!("Address:        {address}");
    }
    if let Some(phone) = &doctor.phone {
        println!("Phone:          {phone}");
    }
    let signature = resolve_image(
        client,
        AssetKind::Signature,
        &doctor.name,
        doctor.digital_signature.as_deref(),
    )
    .await;
    match signature {
        ResolvedImage::Asset { url, .. } => println!("Signature:      {url}"),
        ResolvedImage::Placeholder { .. } => println!("Signature:      none"),
    }
}

async fn show_dashboard(client: &ApiClient) -> Result<()> {
    let dash = dashboard::load_dashboard(client, Utc::now()).await?;
    let s = &dash.stats;
    println!(
        "Patients {}  Prescriptions {} (today {}, week {}, month {})",
        s.total_patients,
        s.total_prescriptions,
        s.today_prescriptions,
        s.week_prescriptions,
        s.month_prescriptions
    );
    println!(
        "Follow-ups {}  today {}  overdue {}  due soon {}",
        s.total_follow_ups,
        s.follow_ups_today,
        s.overdue_follow_ups,
        dash.due_soon()
    );

    println!("\nUpcoming follow-ups");
    if dash.follow_ups.is_empty() {
        println!("  No upcoming follow-ups");
    }
    for f in &dash.follow_ups {
        println!("  {:<24} {:<10} {}", f.patient_name, f.patient_code, f.label());
    }

    println!("\nRecent prescriptions");
    for rx in &dash.recent_prescriptions {
        println!(
            "  {:<12} {:<24} {}",
            rx.code(),
            rx.display_patient_name(),
            rx.display_status()
        );
    }

    println!("\nRecent patients");
    for p in &dash.recent_patients {
        println!("  {:<10} {:<24} {}", p.patient_id, p.name, p.phone);
    }
    Ok(())
}

/// Load the requested page, searching first when a query is given.
async fn page_through<S: SearchSource>(
    list: &SearchController<S>,
    query: Option<&str>,
    paging: &Paging,
) -> Result<Vec<S::Item>> {
    list.set_items_per_page(paging.limit).await?;
    if let Some(query) = query {
        list.set_query(query);
        list.submit_query().await;
    }
    list.set_page(paging.page).await?;
    Ok(list.visible_items())
}

fn footer<S: SearchSource>(list: &SearchController<S>) {
    let info = list.pagination();
    let labels: Vec<String> = list
        .page_labels()
        .iter()
        .map(|label| match label {
            PageLabel::Page(p) if *p == info.current_page => format!("[{p}]"),
            other => other.to_string(),
        })
        .collect();
    println!(
        "\n{} records · page {} of {}  {}",
        info.total_items,
        info.current_page,
        info.total_pages.max(1),
        labels.join(" ")
    );
}

/// Wrap matched runs of `query` in `text` with terminal bold.
fn marked(text: &str, query: Option<&str>) -> String {
    let Some(query) = query else {
        return text.to_string();
    };
    highlight(text, query)
        .into_iter()
        .map(|segment| {
            if segment.matched {
                format!("\x1b[1m{}\x1b[0m", segment.text)
            } else {
                segment.text
            }
        })
        .collect()
}
