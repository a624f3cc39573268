use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use clap::Parser;
use colored::*;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use livecode_session::cli::{Args, Command};
use livecode_session::clock;
use livecode_session::countdown::{format_remaining, is_urgent};
use livecode_session::editor::autocomplete::Autocomplete;
use livecode_session::editor::cursor::word_at_cursor;
use livecode_session::models::Challenge;
use livecode_session::{
    ActiveTab, ChallengeSession, ClientConfig, CookieJar, Grammar, HttpChallengeApi,
    LiveCodingSession, SaveStatus, SessionState,
};

/// Used when the config does not name a cookie file.
const DEFAULT_COOKIE_FILE: &str = ".livecode-cookies.json";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("livecode_session=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_cookie_jar(config: &ClientConfig) -> livecode_session::Result<CookieJar> {
    let path = config
        .cookie_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_FILE));
    CookieJar::open(path, config.cookie_max_age())
}

fn print_challenge(challenge: &Challenge, remaining: Option<u64>) {
    println!("{}", challenge.title.bold());
    if !challenge.description.is_empty() {
        println!("{}", challenge.description);
    }
    if !challenge.instructions.is_empty() {
        println!("\n{}\n{}", "Instructions".underline(), challenge.instructions);
    }
    let status = match challenge.status.to_string().as_str() {
        "active" => "active".green(),
        "closed" => "closed".red(),
        other => other.yellow(),
    };
    let lock = if challenge.is_editing_locked {
        " (editing locked)".red().to_string()
    } else {
        String::new()
    };
    println!("\nstatus: {status}{lock}");
    println!("time left: {}", paint_remaining(remaining));
}

fn paint_remaining(remaining: Option<u64>) -> ColoredString {
    let text = format_remaining(remaining);
    if is_urgent(remaining) {
        text.red().bold()
    } else {
        text.normal()
    }
}

async fn show(config: &ClientConfig, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let api = Arc::new(HttpChallengeApi::from_config(config));
    let jar = Arc::new(open_cookie_jar(config)?);
    let clock = clock::system();
    let session = ChallengeSession::new(api, jar, clock.clone(), code);
    session.load().await?;

    match session.state() {
        SessionState::NotJoined {
            challenge, teams, ..
        } => {
            let remaining = livecode_session::countdown::Deadline::for_challenge(&challenge)
                .remaining_at(clock.now_ms());
            print_challenge(&challenge, remaining);
            println!("\n{}", "Teams".underline());
            for team in &teams {
                println!(
                    "  [{}] {} ({} members)",
                    team.id.cyan(),
                    team.name,
                    team.member_count
                );
            }
            println!("\nnot joined; run `join {code} --team <id>`");
        }
        SessionState::Joined {
            challenge,
            participant,
            ..
        } => {
            let remaining = livecode_session::countdown::Deadline::for_challenge(&challenge)
                .remaining_at(clock.now_ms());
            print_challenge(&challenge, remaining);
            println!(
                "\njoined team {} as participant {}",
                participant.team_name.green(),
                participant.id
            );
        }
        SessionState::Loading | SessionState::Error { .. } => {}
    }
    Ok(())
}

async fn join(
    config: &ClientConfig,
    code: &str,
    team: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let api = Arc::new(HttpChallengeApi::from_config(config));
    let jar = Arc::new(open_cookie_jar(config)?);
    let session = ChallengeSession::new(api, jar, clock::system(), code);
    session.load().await?;
    if let SessionState::Joined { participant, .. } = session.state() {
        println!("already joined team {}", participant.team_name.green());
        return Ok(());
    }
    match session.join(team).await {
        Ok(p) => {
            println!("joined team {} as participant {}", p.team_name.green(), p.id);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "join failed:".red(), e.user_message());
            Err(e.into())
        }
    }
}

fn complete(config: &ClientConfig, grammar: Grammar, text: &str, cursor: Option<usize>) {
    let cursor = cursor.unwrap_or(text.len());
    let analysis = word_at_cursor(text, cursor, grammar);
    let mut popup = Autocomplete::new(config.max_suggestions);
    popup.update(&analysis, cursor);
    if !popup.is_visible() {
        println!("{}", "no suggestions".dimmed());
        return;
    }
    for (i, s) in popup.suggestions().iter().enumerate() {
        let marker = if i == popup.selected_index() { ">" } else { " " };
        println!("{marker} {:<16} {}", s.prefix.bold(), s.description.dimmed());
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Push a file's content into one editor tab. Returns whether it changed.
fn sync_file(lc: &LiveCodingSession, tab: ActiveTab, path: &Path) -> bool {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read buffer file");
            return false;
        }
    };
    lc.switch_tab(tab);
    lc.input(&text, text.len()).changed
}

async fn watch(
    config: &ClientConfig,
    code: &str,
    html: &Path,
    css: &Path,
    poll_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let api = Arc::new(HttpChallengeApi::from_config(config));
    let jar = Arc::new(open_cookie_jar(config)?);
    let mut lc = LiveCodingSession::new(api, jar, clock::system(), config.clone(), code);

    match lc.mount().await? {
        SessionState::NotJoined { .. } => {
            return Err(format!("not joined; run `join {code} --team <id>` first").into());
        }
        SessionState::Joined { challenge, .. } => {
            print_challenge(&challenge, lc.remaining());
        }
        _ => {}
    }

    // Seed missing files with the restored submission.
    {
        let editor = lc.editor();
        for (path, text) in [(html, &editor.buffers().html), (css, &editor.buffers().css)] {
            if !path.exists() {
                std::fs::write(path, text)?;
            }
        }
    }
    let mut stamps = [modified(html), modified(css)];
    sync_file(&lc, ActiveTab::Html, html);
    sync_file(&lc, ActiveTab::Css, css);

    let mut poll = tokio::time::interval(std::time::Duration::from_millis(poll_ms.max(50)));
    let mut refresh = tokio::time::interval(config.refresh_interval());
    refresh.tick().await;

    let mut remaining = lc
        .subscribe_remaining()
        .map(WatchStream::new)
        .ok_or("challenge is not active")?;
    let mut saves = lc
        .subscribe_save_status()
        .map(WatchStream::new)
        .ok_or("challenge is not active")?;

    info!(access_code = %code, "watching {} and {}", html.display(), css.display());
    loop {
        tokio::select! {
            _ = poll.tick() => {
                for (i, (tab, path)) in [(ActiveTab::Html, html), (ActiveTab::Css, css)].into_iter().enumerate() {
                    let stamp = modified(path);
                    if stamp != stamps[i] {
                        stamps[i] = stamp;
                        sync_file(&lc, tab, path);
                    }
                }
            }
            _ = refresh.tick() => {
                match lc.refresh().await {
                    Ok(c) if !c.status.is_active() => {
                        println!("{}", "challenge closed".red().bold());
                        break;
                    }
                    Ok(c) if c.is_editing_locked => println!("{}", "editing locked".yellow()),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "refresh failed"),
                }
            }
            Some(left) = remaining.next() => {
                println!("time left: {}", paint_remaining(left));
                if left == Some(0) {
                    println!("{}", "time is up, editor is read-only".red().bold());
                }
            }
            Some(status) = saves.next() => {
                if let SaveStatus::Saved(_) = status {
                    println!("{}", status.to_string().green());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                match lc.save_now().await {
                    Ok(()) => println!("{}", "final save done".green()),
                    Err(e) => eprintln!("{} {}", "final save failed:".red(), e.user_message()),
                }
                break;
            }
        }
    }

    lc.deactivate();
    println!("{} violations recorded", lc.focus().violation_count());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let config = args.client_config()?;

    match &args.command {
        Command::Show { code } => show(&config, code).await?,
        Command::Join { code, team } => join(&config, code, team).await?,
        Command::Watch {
            code,
            html,
            css,
            poll_ms,
        } => watch(&config, code, html, css, *poll_ms).await?,
        Command::Complete {
            grammar,
            text,
            cursor,
        } => complete(&config, *grammar, text, *cursor),
    }

    Ok(())
}
