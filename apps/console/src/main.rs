use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::DEFAULT_CONFIG_FILE, load_settings, AdminClient, AutoRotate, Carousel, ClientSettings,
    ListSnapshot, PageChange, PageFetcher, PageToken, PaginatedListController,
    DEFAULT_ROTATION_INTERVAL,
};
use shared::domain::{Notification, NotificationDraft, NotificationId, NotificationKind, Priority};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Admin console for notifications and site content")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Print records as JSON instead of text.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Notifications {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Interactive pager: n, p, a page number, r to reload, q to quit.
    Browse,
    Create(DraftArgs),
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    ChangePassword {
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Testimonials {
        #[arg(long)]
        rotate_secs: Option<u64>,
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },
    SocialLinks,
}

#[derive(Args, Debug)]
struct DraftArgs {
    #[arg(long)]
    message: String,
    #[arg(long, default_value = "info")]
    kind: NotificationKind,
    #[arg(long, default_value_t = 1)]
    priority: i64,
    /// RFC 3339 timestamp or YYYY-MM-DD (end of that day, UTC).
    #[arg(long)]
    expires_at: String,
    #[arg(long)]
    inactive: bool,
}

impl DraftArgs {
    fn into_draft(self) -> Result<NotificationDraft> {
        let draft = NotificationDraft::new(self.message, parse_expiry(&self.expires_at)?)
            .with_kind(self.kind)
            .with_priority(Priority::new(self.priority)?)
            .with_active(!self.inactive);
        draft.validate()?;
        Ok(draft)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(server_url) = &cli.server_url {
        settings.server_url = server_url.clone();
    }
    if let Some(page_size) = cli.page_size {
        settings.page_size = page_size.clamp(1, 100);
    }
    let client = AdminClient::from_settings(&settings)
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;

    match cli.command {
        Command::Notifications { page } => {
            sign_in(&client, &cli.email, &cli.password).await?;
            let controller = notification_controller(client, &settings);
            open_page(&controller, page).await?;
            print_list(&controller, cli.json).await?;
        }
        Command::Browse => {
            sign_in(&client, &cli.email, &cli.password).await?;
            let controller = notification_controller(client, &settings);
            browse(&controller).await?;
        }
        Command::Create(args) => {
            let draft = args.into_draft()?;
            sign_in(&client, &cli.email, &cli.password).await?;
            let created = client.create_notification(&draft).await?;
            println!("created {}", created.id);
            print_notification(&created);
        }
        Command::Update { id, draft } => {
            let draft = draft.into_draft()?;
            sign_in(&client, &cli.email, &cli.password).await?;
            let updated = client
                .update_notification(&NotificationId(id), &draft)
                .await?;
            println!("updated {}", updated.id);
            print_notification(&updated);
        }
        Command::Delete { id } => {
            sign_in(&client, &cli.email, &cli.password).await?;
            client.delete_notification(&NotificationId(id.clone())).await?;
            println!("deleted {id}");
        }
        Command::ChangePassword {
            new_password,
            confirm_password,
        } => {
            let current = cli.password.clone().unwrap_or_default();
            client_core::validate_password_change(&current, &new_password, &confirm_password)?;
            sign_in(&client, &cli.email, &cli.password).await?;
            let message = client
                .change_password(&current, &new_password, &confirm_password)
                .await?;
            println!("{message}");
        }
        Command::Testimonials {
            rotate_secs,
            cycles,
        } => {
            let testimonials = client.list_testimonials().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&testimonials)?);
                return Ok(());
            }
            match rotate_secs {
                Some(secs) => rotate_testimonials(testimonials, secs, cycles).await,
                None => {
                    for testimonial in &testimonials {
                        print_testimonial(testimonial);
                    }
                }
            }
        }
        Command::SocialLinks => {
            let links = client.list_social_links().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else {
                for link in links {
                    println!("{:<12} {}", link.platform, link.url);
                }
            }
        }
    }

    Ok(())
}

async fn sign_in(
    client: &AdminClient,
    email: &Option<String>,
    password: &Option<String>,
) -> Result<()> {
    let (Some(email), Some(password)) = (email, password) else {
        bail!("--email and --password are required for this command");
    };
    let user = match client.login(email, password).await {
        Ok(user) => user,
        Err(err) if err.requires_reauth() => {
            bail!("sign-in rejected ({err}); check --email and --password")
        }
        Err(err) => return Err(err).context("sign-in failed"),
    };
    info!(user = %user.email, "session ready");
    Ok(())
}

/// Loads the first page, then moves to `page`. A failed load is reported as
/// such rather than as a range error against the empty default descriptor.
async fn open_page<F: PageFetcher>(
    controller: &PaginatedListController<F>,
    page: u32,
) -> Result<()> {
    if let PageChange::Failed(message) = controller.refresh().await {
        bail!("failed to load notifications: {message}");
    }
    if page == 1 {
        return Ok(());
    }
    match controller.change_page(page).await {
        PageChange::Ignored => bail!(
            "page {page} is out of range (1..={})",
            controller.pagination().await.pages
        ),
        PageChange::Failed(message) => bail!("failed to load page {page}: {message}"),
        PageChange::Loaded(_) | PageChange::Superseded => Ok(()),
    }
}

fn notification_controller(
    client: AdminClient,
    settings: &ClientSettings,
) -> PaginatedListController<AdminClient> {
    PaginatedListController::new(client).with_max_visible(settings.max_visible_pages)
}

async fn browse(controller: &PaginatedListController<AdminClient>) -> Result<()> {
    controller.refresh().await;
    print_list(controller, false).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("[n]ext [p]rev [r]eload <page> [q]uit > ");
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let outcome = match line.trim() {
            "q" | "quit" => break,
            "n" | "next" => controller.next().await,
            "p" | "prev" => controller.previous().await,
            "r" | "reload" => controller.refresh().await,
            other => match other.parse::<u32>() {
                Ok(page) => controller.change_page(page).await,
                Err(_) => {
                    eprintln!("unrecognized input '{other}'");
                    continue;
                }
            },
        };
        match outcome {
            PageChange::Ignored => eprintln!("no such page"),
            PageChange::Superseded => {}
            PageChange::Loaded(_) | PageChange::Failed(_) => print_list(controller, false).await?,
        }
    }
    Ok(())
}

async fn print_list(
    controller: &PaginatedListController<AdminClient>,
    as_json: bool,
) -> Result<()> {
    let snapshot = controller.snapshot().await;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot.items)?);
        return Ok(());
    }
    if let Some(err) = &snapshot.last_error {
        println!("failed to load notifications: {err}");
    } else if snapshot.items.is_empty() {
        println!("no notifications");
    }
    for notification in &snapshot.items {
        print_notification(notification);
    }
    println!("{}", render_pager(&snapshot, &controller.page_tokens().await));
    Ok(())
}

fn print_notification(notification: &Notification) {
    let style = notification.kind.style();
    let state = if notification.is_expired(Utc::now()) {
        "expired"
    } else if notification.is_active {
        "active"
    } else {
        "inactive"
    };
    println!(
        "[{}] {:<8} p{} {:<8} {}  (id {}, expires {})",
        style.icon,
        style.label,
        notification.priority,
        state,
        notification.message,
        notification.id,
        notification.expires_at.format("%Y-%m-%d %H:%M")
    );
}

fn render_pager<T>(snapshot: &ListSnapshot<T>, tokens: &[PageToken]) -> String {
    let pagination = snapshot.pagination;
    let mut parts = Vec::with_capacity(tokens.len() + 2);
    parts.push(if pagination.has_previous() { "<" } else { " " }.to_string());
    for token in tokens {
        parts.push(match token {
            PageToken::Page(page) if *page == pagination.page => format!("[{page}]"),
            PageToken::Page(page) => page.to_string(),
            PageToken::Ellipsis => "...".to_string(),
        });
    }
    parts.push(if pagination.has_next() { ">" } else { " " }.to_string());
    format!("{}   ({} total)", parts.join(" "), pagination.total)
}

fn print_testimonial(testimonial: &shared::domain::Testimonial) {
    match &testimonial.role {
        Some(role) => println!("\"{}\" - {}, {}", testimonial.content, testimonial.author, role),
        None => println!("\"{}\" - {}", testimonial.content, testimonial.author),
    }
}

async fn rotate_testimonials(
    testimonials: Vec<shared::domain::Testimonial>,
    secs: u64,
    cycles: u32,
) {
    if testimonials.is_empty() {
        println!("no testimonials");
        return;
    }
    let steps = testimonials.len() * cycles.max(1) as usize;
    let carousel = Arc::new(Mutex::new(Carousel::new(testimonials)));
    if let Some(first) = carousel.lock().await.current() {
        print_testimonial(first);
    }

    let period = if secs == 0 {
        DEFAULT_ROTATION_INTERVAL
    } else {
        Duration::from_secs(secs)
    };
    let rotation = AutoRotate::start(carousel.clone(), period);
    let mut index_rx = rotation.subscribe();
    for _ in 1..steps {
        if index_rx.changed().await.is_err() {
            break;
        }
        if let Some(current) = carousel.lock().await.current() {
            print_testimonial(current);
        }
    }
    rotation.stop();
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid expiry '{raw}', expected RFC 3339 or YYYY-MM-DD"))?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .context("invalid end-of-day time")?;
    Ok(end_of_day.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use shared::protocol::{Page, PaginationDescriptor};

    struct TenPages {
        failing: Vec<u32>,
    }

    #[async_trait]
    impl PageFetcher for TenPages {
        type Item = u32;

        async fn fetch_page(&self, page: u32) -> Result<Page<u32>> {
            if self.failing.contains(&page) {
                bail!("backend unavailable");
            }
            Ok(Page {
                items: vec![page],
                pagination: PaginationDescriptor {
                    page,
                    pages: 10,
                    total: 10,
                },
            })
        }
    }

    #[tokio::test]
    async fn failed_first_load_is_not_reported_as_range_error() {
        let controller = PaginatedListController::new(TenPages { failing: vec![1] });
        let err = open_page(&controller, 3).await.expect_err("load failure");
        let message = err.to_string();
        assert!(message.contains("backend unavailable"), "{message}");
        assert!(!message.contains("out of range"), "{message}");
    }

    #[tokio::test]
    async fn failed_target_page_exits_with_error() {
        let controller = PaginatedListController::new(TenPages { failing: vec![3] });
        let err = open_page(&controller, 3).await.expect_err("load failure");
        assert!(err.to_string().contains("failed to load page 3"));
    }

    #[tokio::test]
    async fn open_page_moves_to_requested_page_or_rejects_range() {
        let controller = PaginatedListController::new(TenPages { failing: Vec::new() });
        open_page(&controller, 4).await.expect("page 4");
        assert_eq!(controller.pagination().await.page, 4);

        let err = open_page(&controller, 11).await.expect_err("out of range");
        assert!(err.to_string().contains("out of range (1..=10)"));
    }

    #[test]
    fn expiry_accepts_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_expiry("2026-03-01T10:00:00+02:00").expect("rfc3339"),
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_expiry("2026-03-01").expect("date"),
            Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap()
        );
        assert!(parse_expiry("next tuesday").is_err());
    }

    #[test]
    fn pager_marks_current_page_and_disabled_ends() {
        let snapshot = ListSnapshot::<()> {
            pagination: PaginationDescriptor {
                page: 1,
                pages: 10,
                total: 95,
            },
            ..ListSnapshot::default()
        };
        let tokens = client_core::compute_page_tokens(1, 10, 5);
        assert_eq!(
            render_pager(&snapshot, &tokens),
            "  [1] 2 3 4 ... 10 >   (95 total)"
        );
    }

    #[test]
    fn draft_args_validate_priority_and_message() {
        let args = DraftArgs {
            message: "hello".into(),
            kind: NotificationKind::Success,
            priority: 9,
            expires_at: "2026-01-01".into(),
            inactive: false,
        };
        assert!(args.into_draft().is_err());

        let args = DraftArgs {
            message: "hello".into(),
            kind: NotificationKind::Success,
            priority: 2,
            expires_at: "2026-01-01".into(),
            inactive: true,
        };
        let draft = args.into_draft().expect("draft");
        assert!(!draft.is_active);
        assert_eq!(draft.kind, NotificationKind::Success);
    }
}
