use std::borrow::Cow;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use sitesafe_rs::transcript::{Role, Transcript, TurnError};
use sitesafe_rs::{Match, ResponseTable};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sitesafe-rs",
    about = "SiteSafe construction-safety assistant and marketing site",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Answer from this response table instead of the built-in one.
    #[arg(long, global = true, value_name = "FILE")]
    table: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question.
    Ask {
        /// Question text; multiple words are joined with spaces.
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Chat with the assistant on stdin.
    Chat {
        /// Pause before each reply, in milliseconds.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
    /// List keywords in match priority order.
    Topics,
    /// Validate a response table file.
    CheckTable {
        /// Table file to validate.
        path: PathBuf,
    },
    /// Serve the marketing site and chat API.
    #[cfg(feature = "web")]
    Serve {
        /// Socket address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used for canonical links and the sitemap.
        #[arg(long)]
        base_url: Option<String>,
        /// CSS framework for the page chrome.
        #[arg(long, value_enum, default_value_t = ThemeArg::Tailwind)]
        theme: ThemeArg,
        /// Pause before each chat reply, in milliseconds.
        #[arg(long, default_value_t = 500)]
        reply_delay_ms: u64,
        /// Do not expose /api/openapi.json.
        #[arg(long)]
        no_openapi: bool,
    },
}

#[cfg(feature = "web")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Tailwind,
    Bootstrap,
}

#[cfg(feature = "web")]
impl From<ThemeArg> for sitesafe_rs::web::WebTheme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Tailwind => sitesafe_rs::web::WebTheme::Tailwind,
            ThemeArg::Bootstrap => sitesafe_rs::web::WebTheme::Bootstrap,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ask { words } => {
            init_tracing("warn");
            let table = load_table(cli.table.as_deref())?;
            handle_ask(&table, &words.join(" "), cli.json)
        }
        Command::Chat { delay_ms } => {
            init_tracing("warn");
            let table = load_table(cli.table.as_deref())?;
            handle_chat(&table, Duration::from_millis(delay_ms), cli.json)
        }
        Command::Topics => {
            init_tracing("warn");
            let table = load_table(cli.table.as_deref())?;
            handle_topics(&table, cli.json)
        }
        Command::CheckTable { path } => {
            init_tracing("warn");
            handle_check_table(&path, cli.json)
        }
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            base_url,
            theme,
            reply_delay_ms,
            no_openapi,
        } => {
            init_tracing("info");
            let table = load_table(cli.table.as_deref())?.into_owned();
            let config = sitesafe_rs::web::WebConfig {
                addr,
                enable_openapi: !no_openapi,
                theme: theme.into(),
                base_url: base_url.unwrap_or_else(|| format!("http://{addr}")),
                reply_delay: Duration::from_millis(reply_delay_ms),
                table: std::sync::Arc::new(table),
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(sitesafe_rs::web::serve(config))?;
            Ok(())
        }
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_table(path: Option<&Path>) -> Result<Cow<'static, ResponseTable>, Box<dyn Error>> {
    match path {
        Some(path) => {
            let table = ResponseTable::from_path(path)
                .map_err(|err| format!("Failed to load table {}: {err}", path.display()))?;
            Ok(Cow::Owned(table))
        }
        None => Ok(Cow::Borrowed(ResponseTable::canonical())),
    }
}

fn handle_ask(table: &ResponseTable, question: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let found = table.lookup(question);
    if as_json {
        let payload = json!({
            "question": question,
            "topic": found.topic(),
            "keyword": found.keyword(),
            "matched": !found.is_fallback(),
            "reply": found.response(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_answer(&found);
    }
    Ok(())
}

fn handle_chat(table: &ResponseTable, delay: Duration, as_json: bool) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = stdin_is_tty() && !as_json;
    let mut transcript = Transcript::new();

    if interactive {
        println!("SiteSafe safety assistant. Type /history to review, /quit to leave.");
    }
    loop {
        if interactive {
            print!("you> ");
            stdout.flush()?;
        }
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                print_history(&transcript, as_json)?;
                continue;
            }
            _ => {}
        }
        match transcript.submit(line) {
            Ok(_) => {}
            Err(TurnError::EmptyInput) => continue,
            Err(TurnError::TranscriptFull) => {
                eprintln!("Transcript is full; start a new chat to keep asking.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let reply = table.respond(line).to_string();
        let message = transcript.resolve(reply)?;
        if as_json {
            println!("{}", serde_json::to_string(message)?);
        } else {
            render_reply(&message.content);
        }
    }
    Ok(())
}

fn handle_topics(table: &ResponseTable, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({
            "version": table.version(),
            "topics": table.topics().enumerate().map(|(idx, (keyword, topic))| {
                json!({ "priority": idx + 1, "keyword": keyword, "topic": topic })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_topics_table(table);
    }
    Ok(())
}

fn handle_check_table(path: &Path, as_json: bool) -> Result<(), Box<dyn Error>> {
    let table = ResponseTable::from_path(path)
        .map_err(|err| format!("{} is not a valid table: {err}", path.display()))?;
    if as_json {
        let payload = json!({
            "path": path.display().to_string(),
            "valid": true,
            "version": table.version(),
            "entries": table.len(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{}: ok ({} entries, version {})",
            path.display(),
            table.len(),
            table.version()
        );
    }
    Ok(())
}

fn print_answer(found: &Match<'_>) {
    match found.topic() {
        Some(topic) => println!("Topic: {topic}"),
        None => println!("Topic: (no match)"),
    }
    render_reply(found.response());
}

fn print_history(transcript: &Transcript, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string(transcript.messages())?);
        return Ok(());
    }
    if transcript.is_empty() {
        println!("No messages yet.");
        return Ok(());
    }
    for message in transcript.messages() {
        let label = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("{label:>9}> {}", message.content);
    }
    Ok(())
}

fn print_topics_table(table: &ResponseTable) {
    if table.is_empty() {
        println!("The table has no entries; every question gets the fallback.");
        return;
    }
    let width = table
        .topics()
        .map(|(keyword, _)| keyword.len())
        .max()
        .unwrap_or(7)
        .max("KEYWORD".len());
    println!("{:>3}  {:<width$}  {}", "#", "KEYWORD", "TOPIC", width = width);
    println!("{:->3}  {:-<width$}  {}", "", "", "-----", width = width);
    for (idx, (keyword, topic)) in table.topics().enumerate() {
        println!("{:>3}  {:<width$}  {}", idx + 1, keyword, topic, width = width);
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn stdin_is_tty() -> bool {
    atty::is(Stream::Stdin)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.clamp(40, 100) as usize
}

fn render_reply(body: &str) {
    let trimmed = body.trim();
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        print!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults_to_half_second_delay() {
        let cli = Cli::try_parse_from(["sitesafe-rs", "chat"]).unwrap();
        assert!(matches!(cli.command, Command::Chat { delay_ms: 500 }));
    }

    #[test]
    fn ask_joins_words_and_accepts_globals() {
        let cli = Cli::try_parse_from(["sitesafe-rs", "ask", "first", "aid", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Ask { words } => assert_eq!(words.join(" "), "first aid"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
