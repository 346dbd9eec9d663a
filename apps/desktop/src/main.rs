use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    features::{
        app::AppFeature,
        create_report::{AttachmentStatus, CreateReportFeature, CreateReportUiEvent},
        login::{LoginFeature, LoginUiEvent},
        report_detail::{ReportDetailFeature, ReportDetailUiEvent},
        reports::{ReportListFeature, ReportListUiEvent},
    },
    load_settings, AttachmentUpload, Controller, EventsBus, Feature, GlobalEvent, HttpTransport,
    ReportsApi, ReportsPageSource, Route, SessionStore,
};
use shared::domain::ReportId;
use storage::Storage;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the reports service")]
struct Cli {
    /// Overrides `server_url` from client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        password: String,
    },
    Logout,
    Reports {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    Show {
        report_id: i64,
    },
    Comment {
        report_id: i64,
        text: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = client_core::config::normalize_database_url(&database_url);
    }

    let storage = Storage::new(&settings.database_url).await?;
    let session = SessionStore::new(Arc::new(storage));
    let transport = HttpTransport::new(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    let api = ReportsApi::new(Arc::new(transport), session.clone());
    let bus = EventsBus::new(settings.bus_capacity);
    let printer = spawn_notification_printer(&bus);

    if !matches!(cli.command, Command::Login { .. } | Command::Logout) {
        require_session(&session).await?;
    }

    let outcome = match cli.command {
        Command::Login { username, password } => login(api, bus, &username, &password).await,
        Command::Logout => logout(session, bus, settings.notification_ttl()).await,
        Command::Reports { pages } => {
            list_reports(api, bus, settings.page_size, pages.max(1)).await
        }
        Command::Show { report_id } => show_report(api, bus, ReportId(report_id)).await,
        Command::Comment { report_id, text } => {
            comment(api, bus, ReportId(report_id), text).await
        }
        Command::Create {
            title,
            description,
            attachments,
        } => create_report(api, bus, title, description, attachments).await,
    };

    // The printer ends once every bus handle is gone.
    let _ = tokio::time::timeout(Duration::from_millis(250), printer).await;
    outcome
}

async fn require_session(session: &SessionStore) -> Result<()> {
    if !session.has_session().await? {
        bail!("not signed in; run `desktop login <username> <password>` first");
    }
    Ok(())
}

fn spawn_notification_printer(bus: &EventsBus) -> JoinHandle<()> {
    let mut global = bus.subscribe_global();
    tokio::spawn(async move {
        while let Ok(event) = global.recv().await {
            if let GlobalEvent::Notification(notification) = event {
                match notification.detail {
                    Some(detail) => eprintln!("! {} ({detail})", notification.message),
                    None => eprintln!("! {}", notification.message),
                }
            }
        }
    })
}

/// Runs `trigger` and waits for a UiState produced after it that matches
/// `settled`. Every fold publishes, so a no-op fold still counts as a change.
async fn settle_after<F: Feature>(
    controller: &Controller<F>,
    trigger: impl FnOnce(),
    settled: impl Fn(&F::UiState) -> bool,
) -> Result<F::UiState> {
    let mut rx = controller.ui_state();
    rx.borrow_and_update();
    trigger();
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            rx.changed()
                .await
                .context("controller stopped before settling")?;
            let ui = rx.borrow_and_update().clone();
            if settled(&ui) {
                return Ok(ui);
            }
        }
    })
    .await
    .context("timed out waiting for the server")?
}

/// Submits a UI event and waits for its fold to be published.
async fn apply<F: Feature>(controller: &Controller<F>, event: F::UiEvent) -> Result<()> {
    settle_after(controller, || controller.submit_ui(event), |_| true).await?;
    Ok(())
}

async fn login(api: ReportsApi, bus: EventsBus, username: &str, password: &str) -> Result<()> {
    let controller = Controller::new(LoginFeature::new(api.clone()), bus);
    apply(&controller, LoginUiEvent::UsernameChanged(username.to_string())).await?;
    apply(&controller, LoginUiEvent::PasswordChanged(password.to_string())).await?;
    let ui = settle_after(
        &controller,
        || controller.submit(LoginUiEvent::LoginClicked),
        |ui| !ui.loading,
    )
    .await?;

    for error in [ui.username_error, ui.password_error].into_iter().flatten() {
        eprintln!("{error}");
    }
    match api.session().load_session().await? {
        Some(session) => {
            println!("signed in as {} (user_id={})", session.username, session.user_id.0);
            Ok(())
        }
        None => bail!("sign-in failed"),
    }
}

async fn logout(session: SessionStore, bus: EventsBus, notification_ttl: Duration) -> Result<()> {
    let controller = Controller::new(AppFeature::new(session, notification_ttl), bus.clone());
    controller.on_attach();
    let ui = tokio::time::timeout(SETTLE_TIMEOUT, controller.wait_for_ui_state(|ui| ui.route.is_some()))
        .await
        .context("timed out checking the session")?;
    if !ui.signed_in {
        println!("not signed in");
        return Ok(());
    }

    bus.post_global_event(GlobalEvent::LogoutRequested);
    tokio::time::timeout(
        SETTLE_TIMEOUT,
        controller.wait_for_ui_state(|ui| ui.route == Some(Route::Login)),
    )
    .await
    .context("timed out signing out")?;
    println!("signed out");
    Ok(())
}

async fn list_reports(api: ReportsApi, bus: EventsBus, page_size: usize, pages: usize) -> Result<()> {
    let source = Arc::new(ReportsPageSource::new(api));
    let controller = Controller::new(ReportListFeature::new(source, page_size), bus);
    let mut ui = settle_after(&controller, || controller.on_attach(), |ui| !ui.loading).await?;

    for _ in 1..pages {
        if ui.end_reached || ui.error.is_some() {
            break;
        }
        ui = settle_after(
            &controller,
            || controller.submit(ReportListUiEvent::LoadMore),
            |ui| !ui.loading,
        )
        .await?;
    }

    if let Some(error) = ui.error {
        bail!("{error}");
    }
    if ui.items.is_empty() {
        println!("no reports");
    }
    for report in &ui.items {
        println!(
            "#{:<6} {:<12} {}  ({})",
            report.report_id.0,
            format!("{:?}", report.status),
            report.title,
            report.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    if !ui.end_reached {
        println!("... more available, pass --pages to load further");
    }
    Ok(())
}

async fn load_detail(
    api: ReportsApi,
    bus: EventsBus,
    report_id: ReportId,
) -> Result<Controller<ReportDetailFeature>> {
    let controller = Controller::new(ReportDetailFeature::new(api, report_id), bus);
    let ui = settle_after(&controller, || controller.on_attach(), |ui| !ui.loading).await?;
    if ui.report.is_none() {
        bail!("report #{} could not be loaded", report_id.0);
    }
    Ok(controller)
}

async fn show_report(api: ReportsApi, bus: EventsBus, report_id: ReportId) -> Result<()> {
    let controller = load_detail(api, bus, report_id).await?;
    let ui = controller.current_ui_state();
    let Some(report) = ui.report else {
        bail!("report #{} could not be loaded", report_id.0);
    };

    println!("#{} {} [{:?}]", report.report_id.0, report.title, report.status);
    println!("opened {}", report.created_at.format("%Y-%m-%d %H:%M"));
    println!();
    println!("{}", report.description);
    for attachment in &report.attachments {
        println!("  attachment: {} ({} bytes)", attachment.filename, attachment.size_bytes);
    }
    println!();
    if ui.comments.is_empty() {
        println!("no comments");
    }
    for comment in &ui.comments {
        println!(
            "[{}] {}: {}",
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.author,
            comment.body
        );
    }
    Ok(())
}

async fn comment(api: ReportsApi, bus: EventsBus, report_id: ReportId, text: String) -> Result<()> {
    let controller = load_detail(api, bus, report_id).await?;
    let before = controller.current_ui_state().comments.len();
    apply(&controller, ReportDetailUiEvent::CommentChanged(text)).await?;
    let ui = settle_after(
        &controller,
        || controller.submit(ReportDetailUiEvent::SendCommentClicked),
        |ui| !ui.sending,
    )
    .await?;

    if let Some(error) = ui.comment_error {
        bail!("{error}");
    }
    if ui.comments.len() == before {
        bail!("comment was not added");
    }
    println!("comment added to report #{}", report_id.0);
    Ok(())
}

async fn create_report(
    api: ReportsApi,
    bus: EventsBus,
    title: String,
    description: String,
    attachments: Vec<PathBuf>,
) -> Result<()> {
    let mut global = bus.subscribe_global();
    let controller = Controller::new(CreateReportFeature::new(api), bus);
    apply(&controller, CreateReportUiEvent::TitleChanged(title)).await?;
    apply(&controller, CreateReportUiEvent::DescriptionChanged(description)).await?;

    for path in attachments {
        let upload = read_attachment(&path)?;
        let ui = settle_after(
            &controller,
            || controller.submit(CreateReportUiEvent::AttachmentPicked(upload)),
            |ui| {
                ui.attachments
                    .iter()
                    .all(|attachment| attachment.status != AttachmentStatus::Uploading)
            },
        )
        .await?;
        if ui
            .attachments
            .last()
            .is_some_and(|attachment| attachment.status == AttachmentStatus::Failed)
        {
            bail!("failed to upload {}", path.display());
        }
    }

    let ui = settle_after(
        &controller,
        || controller.submit(CreateReportUiEvent::SaveClicked),
        |ui| !ui.saving,
    )
    .await?;
    for error in [ui.title_error, ui.description_error].into_iter().flatten() {
        eprintln!("{error}");
    }

    while let Ok(event) = global.try_recv() {
        if let GlobalEvent::ReportCreated(report_id) = event {
            println!("created report #{}", report_id.0);
            return Ok(());
        }
    }
    bail!("report was not created")
}

fn read_attachment(path: &Path) -> Result<AttachmentUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "pdf" => Some("application/pdf"),
            "txt" => Some("text/plain"),
            _ => None,
        })
        .map(str::to_string);
    Ok(AttachmentUpload {
        filename,
        mime_type,
        bytes,
    })
}
