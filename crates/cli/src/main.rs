use clap::{Parser, Subcommand};
use learner_lib::config;
use learner_lib::document::Attachment;
use learner_lib::llm::{ChatBackend, OpenRouterClient};
use learner_lib::session::LearnerSession;
use learner_lib::shortcuts;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "learner")]
#[command(about = "Learner CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Print the text that would be folded into a message for a .txt, .pdf or .docx file.
    Extract {
        /// File to read
        path: PathBuf,
    },

    /// List the instructional shortcuts usable with /use in chat.
    Shortcuts,

    /// Chat with the model (interactive). Type /help inside for commands.
    Chat {
        /// Config file path (default: LEARNER_CONFIG_PATH or ~/.learner/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Attach a .txt, .pdf or .docx file from the start.
        #[arg(long, short, value_name = "PATH")]
        attach: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("learner {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Extract { path }) => {
            if let Err(e) = run_extract(&path) {
                log::error!("extract failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Shortcuts) => print_shortcuts(),
        Some(Commands::Chat { config, attach }) => {
            if let Err(e) = run_chat(config, attach).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_extract(path: &Path) -> anyhow::Result<()> {
    let attachment = Attachment::from_path(path)?;
    println!("{}", attachment.extract());
    Ok(())
}

fn print_shortcuts() {
    for group in &shortcuts::GROUPS {
        println!("{}:", group.title);
        for s in group.shortcuts {
            println!("  {:<18} {}", s.label, s.instruction);
        }
    }
}

const CHAT_HELP: &str = "available commands:

/use <label>   - prefill the message with a shortcut's instruction (see /shortcuts)
/shortcuts     - list shortcuts
/attach <path> - attach a .txt, .pdf or .docx file to every following message
/detach        - remove the attached file
/key <token>   - set the OpenRouter API key for this session
/clear         - clear the pending message
/new           - clear the conversation
/quit          - exit

Any other line is sent, appended to a prefilled shortcut instruction if there is one.
An empty line sends the prefilled instruction on its own.";

async fn run_chat(config_path: Option<PathBuf>, attach: Option<PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, BufRead, Write};

    let (config, path) = config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let client = OpenRouterClient::from_config(&config.gateway);
    let mut session = LearnerSession::from_config(&config);
    if let Some(p) = attach {
        session.attach(Attachment::from_path(&p)?);
    }
    if !session.has_credential() {
        println!("no API key configured; set OPENROUTER_API_KEY or use /key <token>");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        if session.input().is_empty() {
            write!(stdout, "> ")?;
        } else {
            write!(stdout, "> {}", session.input())?;
        }
        stdout.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let trimmed = line.trim();

        if let Some(command) = trimmed.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));
            match name.to_ascii_lowercase().as_str() {
                "quit" | "exit" => break,
                "help" => println!("{}", CHAT_HELP),
                "shortcuts" => print_shortcuts(),
                "use" => match shortcuts::find(arg) {
                    Some(s) => session.press_shortcut(s),
                    None => println!("unknown shortcut {:?}; see /shortcuts", arg),
                },
                "attach" => match Attachment::from_path(Path::new(arg)) {
                    Ok(a) => {
                        let summary = a.summary();
                        session.attach(a);
                        println!(
                            "attached {} ({} bytes, {})",
                            summary.name, summary.size, summary.media_type
                        );
                    }
                    Err(e) => println!("cannot attach {}: {}", arg, e),
                },
                "detach" => match session.detach() {
                    Some(a) => println!("detached {}", a.name()),
                    None => println!("no file attached"),
                },
                "key" => {
                    session.set_credential(arg);
                    println!("API key updated");
                }
                "clear" => session.clear_input(),
                "new" => {
                    session.clear_conversation();
                    println!("conversation cleared");
                }
                _ => println!("unknown command /{}; type /help", name),
            }
            continue;
        }

        if send_line(&mut session, &client, &line).await {
            if let Some(turn) = session.conversation().last() {
                println!("\n[{}] {}:\n{}\n", turn.timestamp(), turn.role(), turn.content());
            }
        }
    }
    Ok(())
}

/// Append `line` to the pending input and submit it. When nothing is sent (blank message)
/// the pending input is left as it was before the line.
async fn send_line(session: &mut LearnerSession, backend: &dyn ChatBackend, line: &str) -> bool {
    let previous = session.input().to_string();
    session.set_input(format!("{}{}", previous, line));
    let sent = session.submit(backend).await;
    if !sent {
        session.set_input(previous);
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_lib::llm::MISSING_CREDENTIAL_REPLY;

    fn keyless_client() -> OpenRouterClient {
        OpenRouterClient::from_config(&config::Config::default().gateway)
    }

    #[tokio::test]
    async fn blank_line_leaves_pending_input_untouched() {
        let client = keyless_client();
        let mut session = LearnerSession::default();
        assert!(!send_line(&mut session, &client, "   ").await);
        assert_eq!(session.input(), "");

        session.set_input(" ");
        assert!(!send_line(&mut session, &client, "\t").await);
        assert_eq!(session.input(), " ");
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn line_is_appended_to_prefilled_instruction() {
        let client = keyless_client();
        let mut session = LearnerSession::default();
        session.set_input("Explain ");
        assert!(send_line(&mut session, &client, "photosynthesis").await);
        assert_eq!(session.input(), "");

        let turns = session.conversation().all();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content(), "Explain photosynthesis");
        assert_eq!(turns[1].content(), MISSING_CREDENTIAL_REPLY);
    }
}
