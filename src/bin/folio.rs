use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use folio_catalog::app::{App, WorkPage};
use folio_catalog::auth::{IdentityHttpClient, SessionStore, active_session, sign_in};
use folio_catalog::catalog::CatalogClient;
use folio_catalog::config::{ConfigLoader, ResolvedConfig};
use folio_catalog::contact::{ContactHttpClient, ContactMessage, ContactRelay};
use folio_catalog::domain::{CategoryFilter, ProjectId};
use folio_catalog::editor::{EditorSession, ProjectForm};
use folio_catalog::error::FolioError;
use folio_catalog::filter::FilterState;
use folio_catalog::firestore::FirestoreHttpClient;
use folio_catalog::output::{JsonOutput, OutputMode, TextOutput};
use folio_catalog::tui::{WorkBrowser, read_password};
use folio_catalog::watch::{CatalogEvent, SnapshotWatcher};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio project catalog: browse the work page and manage projects")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Browse projects with category filter and search")]
    Work(WorkArgs),
    #[command(about = "Manage projects (requires sign-in)")]
    Admin(AdminArgs),
    #[command(about = "Send a message through the contact relay")]
    Contact(ContactArgs),
}

#[derive(Args)]
struct WorkArgs {
    #[arg(long, default_value = "all")]
    category: CategoryFilter,

    #[arg(long, default_value = "")]
    query: String,

    #[arg(long)]
    watch: bool,

    #[arg(long, default_value_t = 5)]
    interval_secs: u64,
}

#[derive(Args)]
struct AdminArgs {
    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand)]
enum AdminCommand {
    #[command(about = "Sign in with email and password")]
    Login(LoginArgs),
    #[command(about = "Forget the stored session")]
    Logout,
    #[command(about = "List projects in display order")]
    List,
    #[command(about = "Show one project")]
    Show(IdArgs),
    #[command(about = "Create a project")]
    Add(FormArgs),
    #[command(about = "Edit a project; omitted fields keep their values")]
    Edit(EditArgs),
    #[command(about = "Delete a project")]
    Delete(DeleteArgs),
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args)]
struct IdArgs {
    id: ProjectId,
}

#[derive(Args, Clone, Default)]
struct FormArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    github_url: Option<String>,
    #[arg(long)]
    live_url: Option<String>,
    #[arg(long)]
    technologies: Option<String>,
    #[arg(long)]
    order: Option<String>,
    #[arg(long)]
    featured: Option<bool>,
}

#[derive(Args)]
struct EditArgs {
    id: ProjectId,
    #[command(flatten)]
    form: FormArgs,
}

#[derive(Args)]
struct DeleteArgs {
    id: ProjectId,
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct ContactArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    service: String,
    #[arg(long)]
    message: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<FolioError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FolioError) -> u8 {
    match error {
        FolioError::NotFound(_)
        | FolioError::MissingConfig
        | FolioError::ConfigRead(_)
        | FolioError::ConfigParse(_)
        | FolioError::NotSignedIn => 2,
        FolioError::StoreUnavailable(_)
        | FolioError::ContactRelay(_)
        | FolioError::ContactRejected(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Work(args) => run_work(args, &config, output_mode),
        Commands::Admin(args) => run_admin(args.command, &config, output_mode),
        Commands::Contact(args) => run_contact(args, &config, output_mode),
    }
}

fn public_app(config: &ResolvedConfig) -> Result<App<FirestoreHttpClient>, FolioError> {
    let store = FirestoreHttpClient::new(config)?;
    Ok(App::new(CatalogClient::with_collection(
        store,
        config.collection.clone(),
    )))
}

fn admin_app(config: &ResolvedConfig) -> Result<App<FirestoreHttpClient>, FolioError> {
    let auth = IdentityHttpClient::new(config)?;
    let sessions = SessionStore::new()?;
    let session = active_session(&auth, &sessions)?;
    let store = FirestoreHttpClient::new(config)?.with_id_token(session.id_token);
    Ok(App::new(CatalogClient::with_collection(
        store,
        config.collection.clone(),
    )))
}

fn run_work(args: WorkArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let filter = FilterState::new(args.category, &args.query);
    let app = public_app(config)?;
    let interval = Duration::from_secs(args.interval_secs.max(1));

    match output_mode {
        OutputMode::Interactive if !io::stdout().is_terminal() => {
            let mut page = WorkPage::new(filter);
            app.load_work(&mut page);
            TextOutput::print_work(&page.view()).into_diagnostic()
        }
        OutputMode::Interactive => {
            let app = Arc::new(app);
            let browser = WorkBrowser::new(app.clone(), filter);
            if args.watch {
                let (watcher, events) =
                    SnapshotWatcher::spawn(Arc::new(app.catalog().clone()), interval);
                let result = browser.run(Some(events));
                watcher.stop();
                result
            } else {
                browser.run(None)
            }
        }
        OutputMode::NonInteractive => {
            let mut page = WorkPage::new(filter);
            if !args.watch {
                app.load_work(&mut page);
                JsonOutput::print_work(&page.view()).into_diagnostic()?;
                return Ok(());
            }
            let (_watcher, events) = SnapshotWatcher::spawn(Arc::new(app.into_catalog()), interval);
            for event in events {
                match event {
                    CatalogEvent::Snapshot(projects) => page.apply_snapshot(projects),
                    CatalogEvent::Failed(message) => {
                        page.finish_load(Err(FolioError::StoreUnavailable(message)))
                    }
                }
                JsonOutput::print_work(&page.view()).into_diagnostic()?;
            }
            Ok(())
        }
    }
}

fn run_admin(
    command: AdminCommand,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        AdminCommand::Login(args) => {
            let password = if io::stdin().is_terminal() {
                read_password("Password: ")?
            } else {
                prompt("Password: ")?
            };
            let auth = IdentityHttpClient::new(config)?;
            let sessions = SessionStore::new()?;
            let session = sign_in(&auth, &sessions, &args.email, &password)?;
            if matches!(output_mode, OutputMode::Interactive) {
                println!("Signed in as {}", session.email);
            }
            Ok(())
        }
        AdminCommand::Logout => {
            let cleared = SessionStore::new()?.clear()?;
            if matches!(output_mode, OutputMode::Interactive) {
                println!("{}", if cleared { "Signed out" } else { "Not signed in" });
            }
            Ok(())
        }
        AdminCommand::List => {
            let result = admin_app(config)?.admin_list()?;
            emit(output_mode, &result, JsonOutput::print_admin_list, TextOutput::print_admin_list)
        }
        AdminCommand::Show(args) => {
            let project = admin_app(config)?.show(&args.id)?;
            emit(output_mode, &project, JsonOutput::print_project, TextOutput::print_project)
        }
        AdminCommand::Add(args) => {
            let app = admin_app(config)?;
            let mut session = EditorSession::new();
            let form = app.open_editor(&mut session, None)?;
            let result = app.save(&mut session, &merge_form(form, args))?;
            emit(output_mode, &result, JsonOutput::print_save, TextOutput::print_save)
        }
        AdminCommand::Edit(args) => {
            let app = admin_app(config)?;
            let mut session = EditorSession::new();
            let form = app.open_editor(&mut session, Some(&args.id))?;
            if !session.is_editing() {
                return Err(FolioError::NotFound(args.id.to_string()).into());
            }
            let result = app.save(&mut session, &merge_form(form, args.form))?;
            emit(output_mode, &result, JsonOutput::print_save, TextOutput::print_save)
        }
        AdminCommand::Delete(args) => {
            if matches!(output_mode, OutputMode::Interactive) && !args.yes {
                let answer = prompt(&format!(
                    "Delete project {}? This cannot be undone. [y/N] ",
                    args.id
                ))?;
                if !matches!(answer.trim(), "y" | "Y" | "yes") {
                    return Ok(());
                }
            }
            let result = admin_app(config)?.delete(&args.id)?;
            emit(output_mode, &result, JsonOutput::print_delete, TextOutput::print_delete)
        }
    }
}

fn run_contact(
    args: ContactArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let contact = config
        .contact
        .clone()
        .ok_or_else(|| FolioError::ConfigParse("missing `contact` section".to_string()))?;
    let relay = ContactHttpClient::new(contact, config.request_timeout)?;
    let message = ContactMessage {
        name: args.name,
        email: args.email,
        service: args.service,
        message: args.message,
    };
    let result = relay.submit(&message)?;
    emit(output_mode, &result, JsonOutput::print_contact, TextOutput::print_contact)
}

/// Overlays flags given on the command line onto the loaded form.
fn merge_form(mut form: ProjectForm, args: FormArgs) -> ProjectForm {
    let FormArgs {
        title,
        category,
        description,
        image_url,
        github_url,
        live_url,
        technologies,
        order,
        featured,
    } = args;
    if let Some(value) = title {
        form.title = value;
    }
    if let Some(value) = category {
        form.category = value;
    }
    if let Some(value) = description {
        form.description = value;
    }
    if let Some(value) = image_url {
        form.image_url = value;
    }
    if let Some(value) = github_url {
        form.github_url = value;
    }
    if let Some(value) = live_url {
        form.live_url = value;
    }
    if let Some(value) = technologies {
        form.technologies = value;
    }
    if let Some(value) = order {
        form.order = value;
    }
    if let Some(value) = featured {
        form.featured = value;
    }
    form
}

fn prompt(label: &str) -> miette::Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(label.as_bytes()).into_diagnostic()?;
    stderr.flush().into_diagnostic()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).into_diagnostic()?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn emit<T>(
    output_mode: OutputMode,
    value: &T,
    json: fn(&T) -> io::Result<()>,
    text: fn(&T) -> io::Result<()>,
) -> miette::Result<()> {
    let printed = match output_mode {
        OutputMode::NonInteractive => json(value),
        OutputMode::Interactive => text(value),
    };
    printed.into_diagnostic()
}
