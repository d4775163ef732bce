use ayna::app::App;
use ayna::auth::FlowError;
use ayna::models::Message;
use ayna::notify::{Notice, NoticeLevel};
use ayna::routing::Route;
use ayna::thread::{ThreadUpdate, ThreadView};
use ayna::validation::{PasswordStrength, SignInForm, SignUpForm};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "ayna")]
#[command(about = "Ayna chat client", long_about = None)]
struct Cli {
    /// Config file path (default: AYNA_CONFIG_PATH or ~/.ayna/config.json)
    #[arg(long, short, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and an empty config file.
    Init,

    /// Sign in with email and password. The password is read from stdin when not given.
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored token and identity.
    Logout,

    /// Show the signed-in user as reported by the server.
    Whoami,

    /// Change the password. Prompts for the current and new password.
    Password,

    /// List chat sessions, newest first.
    Sessions,

    /// Create a chat session and print its id.
    New,

    /// Change a session's preview text.
    Rename { id: String, preview: String },

    /// Delete a session.
    Delete { id: String },

    /// Open a session thread (interactive). Creates a new session when none is given.
    /// Type `/more` for older messages and `/exit` to leave.
    Chat {
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Run with --help for usage");
        return;
    };
    let name = command_name(&command);
    if let Err(e) = run(command, cli.config).await {
        log::error!("{} failed: {}", name, e);
        std::process::exit(1);
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Version => "version",
        Commands::Init => "init",
        Commands::Signin { .. } => "signin",
        Commands::Signup { .. } => "signup",
        Commands::Logout => "logout",
        Commands::Whoami => "whoami",
        Commands::Password => "password",
        Commands::Sessions => "sessions",
        Commands::New => "new",
        Commands::Rename { .. } => "rename",
        Commands::Delete { .. } => "delete",
        Commands::Chat { .. } => "chat",
    }
}

async fn run(command: Commands, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    match command {
        Commands::Version => {
            println!("ayna {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Init => return run_init(config_path),
        _ => {}
    }

    let (config, path) = ayna::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let (app, mut notices) = App::from_config(config).await?;

    let result = match command {
        Commands::Signin { email, password } => {
            let password = password_arg(password, "Password")?;
            let form = SignInForm { email, password };
            app.auth_flow()
                .sign_in(&form)
                .await
                .map(|u| println!("signed in as {} <{}>", u.username, u.email))
                .map_err(flow_error)
        }
        Commands::Signup {
            email,
            username,
            password,
        } => {
            let password = password_arg(password, "Password")?;
            let confirm_password = prompt("Confirm password")?;
            let strength = PasswordStrength::evaluate(&password);
            for (check, ok) in strength.checks() {
                if !ok {
                    eprintln!("  - {}", check.message());
                }
            }
            let form = SignUpForm {
                email,
                username,
                password,
                confirm_password,
            };
            app.auth_flow()
                .sign_up(&form)
                .await
                .map(|u| println!("signed up as {} <{}>", u.username, u.email))
                .map_err(flow_error)
        }
        Commands::Logout => app.auth_flow().logout().await.map_err(flow_error),
        Commands::Whoami => {
            require_login(&app).await?;
            app.auth_flow()
                .current_user()
                .await
                .map(|u| println!("{} <{}> ({})", u.username, u.email, u.document_id))
                .map_err(flow_error)
        }
        Commands::Password => {
            require_login(&app).await?;
            let current = prompt("Current password")?;
            let new_password = prompt("New password")?;
            let confirm = prompt("Confirm new password")?;
            app.auth_flow()
                .update_password(&current, &new_password, &confirm)
                .await
                .map_err(flow_error)
        }
        Commands::Sessions => {
            require_login(&app).await?;
            match app.directory().load().await {
                Ok(sessions) if sessions.is_empty() => {
                    println!("no sessions yet; run `ayna new`");
                    Ok(())
                }
                Ok(sessions) => {
                    for s in sessions {
                        let when = s
                            .created_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("{}  {:16}  {}", s.document_id, when, s.last_message);
                    }
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Commands::New => {
            require_login(&app).await?;
            app.directory()
                .create()
                .await
                .map(|s| println!("{}", s.document_id))
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Rename { id, preview } => {
            require_login(&app).await?;
            app.directory()
                .rename(&id, &preview)
                .await
                .map(|s| println!("{}  {}", s.document_id, s.last_message))
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Delete { id } => {
            require_login(&app).await?;
            app.directory()
                .delete(&id)
                .await
                .map(|_| println!("deleted {}", id))
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Chat { session } => {
            require_login(&app).await?;
            run_chat(&app, &mut notices, session).await
        }
        Commands::Version | Commands::Init => Ok(()),
    };

    drain_notices(&mut notices);
    result
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(ayna::config::default_config_path);
    let dir = ayna::config::init_config_file(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn flow_error(e: FlowError) -> anyhow::Error {
    anyhow::anyhow!(e)
}

async fn require_login(app: &App) -> anyhow::Result<()> {
    if app.guarded_route().await == Route::SignIn {
        anyhow::bail!("not signed in; run `ayna signin --email <EMAIL>`");
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    use std::io::Write;
    eprint!("{}: ", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn password_arg(given: Option<String>, label: &str) -> anyhow::Result<String> {
    match given {
        Some(p) => Ok(p),
        None => prompt(label),
    }
}

fn print_notice(n: &Notice) {
    match n.level {
        NoticeLevel::Success => println!("* {}", n.message),
        NoticeLevel::Error => eprintln!("! {}", n.message),
    }
}

fn drain_notices(notices: &mut UnboundedReceiver<Notice>) {
    while let Ok(n) = notices.try_recv() {
        print_notice(&n);
    }
}

fn print_message(m: &Message) {
    let who = if m.is_from_user() { "you" } else { "ayna" };
    println!("[{}] {}", who, m.text);
}

async fn run_chat(
    app: &App,
    notices: &mut UnboundedReceiver<Notice>,
    session: Option<String>,
) -> anyhow::Result<()> {
    let session_id = match session {
        Some(id) => {
            app.directory().select(&id);
            id
        }
        None => app
            .directory()
            .create()
            .await
            .map_err(|e| anyhow::anyhow!(e))?
            .document_id,
    };
    drain_notices(notices);

    let mut thread: ThreadView = app.thread();
    thread.open(&session_id).await;
    drain_notices(notices);
    for m in thread.messages().iter().rev() {
        print_message(m);
    }
    if !thread.is_live() {
        eprintln!("! live updates unavailable; messages cannot be sent");
    }
    println!("-- session {} (/more for older messages, /exit to leave) --", session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
                    break;
                }
                if input.eq_ignore_ascii_case("/more") {
                    let before = thread.messages().len();
                    match thread.load_older().await {
                        Ok(0) => println!("-- no older messages --"),
                        Ok(n) => {
                            println!("-- {} older --", n);
                            for m in thread.messages()[before..].iter().rev() {
                                print_message(m);
                            }
                        }
                        Err(_) => {}
                    }
                    continue;
                }
                if let Err(e) = thread.send(input).await {
                    eprintln!("! not sent: {}", e);
                }
            }
            event = thread.next_event() => {
                let Some(event) = event else { break };
                match thread.apply(event) {
                    Some(ThreadUpdate::Arrived(m)) => print_message(&m),
                    Some(ThreadUpdate::Replaced(m)) => {
                        log::debug!("message {} updated", m.document_id);
                    }
                    Some(ThreadUpdate::ChannelClosed(reason)) => {
                        eprintln!("! connection closed: {}", reason);
                    }
                    None => {}
                }
            }
            Some(notice) = notices.recv() => {
                print_notice(&notice);
            }
        }
        if app.navigator().current() == Route::SignIn {
            eprintln!("! signed out by the server");
            break;
        }
    }

    thread.close().await;
    Ok(())
}
