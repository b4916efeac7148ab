//! MindMend - terminal client
//!
//! Chat with the MindMend backend, manage saved conversations, and browse the
//! admin dashboard from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use mindmend_client::{
    admin::{AdminDashboard, Section},
    api::{ApiBackend, ConversationId, HttpBackend, UserId},
    auth::{self, AuthController, AuthOutcome, LoginForm, LogoutConfirmation, SignupForm},
    events::{EventBus, ViewEvent},
    render::{self, Renderer},
    session::{ChatCapabilities, ChatSession, ResetConfirmation, SendError},
    sidebar::{DeleteConfirmation, SidebarController},
    store::{ConversationStore, ListState, TranscriptEntry},
    Config,
};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mindmend")]
#[command(about = "Terminal client for the MindMend support chat")]
struct Cli {
    /// Backend URL (overrides config.yaml)
    #[arg(long, env = "MINDMEND_URL")]
    server: Option<String>,

    /// Path to the YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log in as this user before running the command
    #[arg(long, env = "MINDMEND_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "MINDMEND_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat
    Chat {
        /// Resume a saved conversation
        #[arg(long)]
        conversation: Option<ConversationId>,

        /// Do not show or refresh the conversation list
        #[arg(long)]
        no_sidebar: bool,

        /// Preferred video type for recommendations (e.g. meditation)
        #[arg(long)]
        mood: Option<String>,
    },

    /// Saved conversation operations
    Conversations {
        #[command(subcommand)]
        action: ConversationsAction,
    },

    /// Log in and check the credentials
    Login { username: String },

    /// Create an account
    Signup { username: String, email: String },

    /// End the backend session
    Logout {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Admin dashboard
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ConversationsAction {
    /// List saved conversations
    List,

    /// Print one conversation
    Show { id: ConversationId },

    /// Delete a conversation
    Delete {
        id: ConversationId,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Totals
    Stats,

    /// Users table
    Users {
        #[arg(long)]
        search: Option<String>,
    },

    /// Conversations table
    Conversations {
        #[arg(long)]
        search: Option<String>,
    },

    /// One user's profile and conversations
    User { id: UserId },

    /// Messages of one conversation
    Conversation { id: ConversationId },
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so they do not interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mindmend_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    let api = HttpBackend::from_config(&config).context("Failed to build HTTP client")?;
    tracing::debug!(server = %api.base_url(), "Using backend");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let renderer = Renderer::local();

    match cli.command {
        Commands::Login { username } => {
            let password = match cli.password {
                Some(password) => password,
                None => read_password(&mut input, "Password: ").await?,
            };
            login(&api, &username, &password).await
        }
        Commands::Signup { username, email } => {
            run_signup(&api, &mut input, username, email, cli.password).await
        }
        command => {
            if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
                login(&api, username, password).await?;
            }
            match command {
                Commands::Chat {
                    conversation,
                    no_sidebar,
                    mood,
                } => {
                    let capabilities = ChatCapabilities {
                        sidebar: config.sidebar && !no_sidebar,
                    };
                    run_chat(
                        &api,
                        &config,
                        renderer,
                        &mut input,
                        capabilities,
                        conversation,
                        mood,
                    )
                    .await
                }
                Commands::Conversations { action } => {
                    run_conversations(&api, &config, renderer, &mut input, action).await
                }
                Commands::Logout { yes } => {
                    if !yes && !confirm(&mut input, LogoutConfirmation::PROMPT).await? {
                        println!("Cancelled.");
                        return Ok(());
                    }
                    let route = auth::logout(&api, auth::request_logout()).await;
                    println!("Logged out. Next: {}", route.path());
                    Ok(())
                }
                Commands::Admin { action } => run_admin(&api, renderer, action).await,
                Commands::Login { .. } | Commands::Signup { .. } => Ok(()),
            }
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

fn outcome_notice(outcome: AuthOutcome) -> Result<&'static str> {
    match outcome {
        AuthOutcome::Redirect { notice, .. } => Ok(notice),
        AuthOutcome::Invalid(e) => bail!("{e}"),
        AuthOutcome::Rejected(message) => bail!("{message}"),
        AuthOutcome::Busy => bail!("A request is already in progress"),
    }
}

async fn login(api: &dyn ApiBackend, username: &str, password: &str) -> Result<()> {
    let form = LoginForm {
        username: username.to_string(),
        password: password.to_string(),
    };
    let notice = outcome_notice(AuthController::new().login(api, &form).await)?;
    println!("{notice}");
    Ok(())
}

async fn run_signup(
    api: &dyn ApiBackend,
    input: &mut Input,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let (password, confirm_password) = match password {
        Some(password) => (password.clone(), password),
        None => {
            let password = read_password(input, "Password: ").await?;
            println!("{}", auth::password_strength(&password).hint());
            let confirm = read_password(input, "Confirm password: ").await?;
            (password, confirm)
        }
    };

    let form = SignupForm {
        username,
        email,
        password,
        confirm_password,
    };
    let notice = outcome_notice(AuthController::new().signup(api, &form).await)?;
    println!("{notice}");
    Ok(())
}

// ============================================================================
// Chat
// ============================================================================

const CHAT_HELP: &str = "Commands: /new  /list  /open ID  /delete ID  /search TERM  /reset  /help  /quit";

#[derive(Debug, PartialEq)]
enum ChatCommand<'a> {
    Send(&'a str),
    New,
    List,
    Open(ConversationId),
    Delete(ConversationId),
    Search(&'a str),
    Reset,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> ChatCommand<'_> {
    let Some(command) = line.strip_prefix('/') else {
        return ChatCommand::Send(line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let id = || {
        arg.parse::<ConversationId>()
            .map_err(|_| format!("/{name} needs a conversation id"))
    };
    match name {
        "new" => ChatCommand::New,
        "list" => ChatCommand::List,
        "open" => id().map_or_else(ChatCommand::Invalid, ChatCommand::Open),
        "delete" => id().map_or_else(ChatCommand::Invalid, ChatCommand::Delete),
        "search" => ChatCommand::Search(arg),
        "reset" => ChatCommand::Reset,
        "help" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!("Unknown command /{other}. {CHAT_HELP}")),
    }
}

async fn run_chat(
    api: &dyn ApiBackend,
    config: &Config,
    renderer: Renderer,
    input: &mut Input,
    capabilities: ChatCapabilities,
    conversation: Option<ConversationId>,
    mood: Option<String>,
) -> Result<()> {
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let mut session = ChatSession::new(
        ConversationStore::new(config.greeting.clone(), events.clone()),
        capabilities,
    );
    session.set_mood_preference(mood);
    let mut sidebar = SidebarController::new(config.narrow_viewport_width, events);

    if session.capabilities().sidebar {
        session.store_mut().list_conversations(api).await;
        print_list(&session, &sidebar, &renderer);
    }
    if let Some(id) = conversation {
        if let Err(e) = session.store_mut().load_conversation(api, id).await {
            eprintln!("Could not open conversation {id}: {}", e.user_message("Conversation not found"));
        }
    }
    drain_quietly(&mut rx);
    print_transcript(&session, &renderer);
    println!("{CHAT_HELP}");

    while let Some(line) = prompt(input, "> ").await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{CHAT_HELP}"),
            ChatCommand::Invalid(message) => println!("{message}"),
            ChatCommand::New => session.new_chat(),
            ChatCommand::List => {
                session.store_mut().list_conversations(api).await;
                drain_quietly(&mut rx);
                print_list(&session, &sidebar, &renderer);
            }
            ChatCommand::Search(term) => {
                sidebar.set_search(term);
                print_list(&session, &sidebar, &renderer);
            }
            ChatCommand::Open(id) => {
                if let Err(e) = sidebar.select(&mut session, api, id).await {
                    println!("{}", e.user_message("Failed to load conversation"));
                }
            }
            ChatCommand::Delete(id) => {
                if confirm(input, DeleteConfirmation::PROMPT).await? {
                    let confirmation = sidebar.request_delete(id);
                    match sidebar.confirm_delete(&mut session, api, confirmation).await {
                        Ok(()) => println!("Conversation {id} deleted."),
                        Err(e) => println!("{}", e.user_message("Failed to delete conversation")),
                    }
                }
            }
            ChatCommand::Reset => {
                if confirm(input, ResetConfirmation::PROMPT).await? {
                    let confirmation = session.request_reset();
                    // Failure is announced as a notice event
                    let _ = session.reset(api, confirmation).await;
                }
            }
            ChatCommand::Send(text) => match session.send(api, text).await {
                Ok(_) | Err(SendError::Api(_)) => {}
                Err(e) => println!("{e}"),
            },
        }

        print_events(&mut rx, &session, &renderer);
    }
    Ok(())
}

/// Print what changed since the last command.
fn print_events(rx: &mut broadcast::Receiver<ViewEvent>, session: &ChatSession, renderer: &Renderer) {
    loop {
        match rx.try_recv() {
            Ok(ViewEvent::EntryAppended(entry)) => match &entry {
                TranscriptEntry::Typing => {}
                TranscriptEntry::Message(m) if m.sender == mindmend_client::api::Sender::User => {}
                _ => println!("{}", renderer.entry_text(&entry)),
            },
            Ok(ViewEvent::TranscriptReplaced { .. }) | Err(TryRecvError::Lagged(_)) => {
                // The whole transcript is printed; later entries are already part of it
                drain_quietly(rx);
                print_transcript(session, renderer);
                return;
            }
            Ok(ViewEvent::Notice { text }) => println!("! {text}"),
            Ok(ViewEvent::ConversationsFailed { message }) => eprintln!("! {message}"),
            Ok(_) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => return,
        }
    }
}

fn drain_quietly(rx: &mut broadcast::Receiver<ViewEvent>) {
    while !matches!(rx.try_recv(), Err(TryRecvError::Empty | TryRecvError::Closed)) {}
}

fn print_transcript(session: &ChatSession, renderer: &Renderer) {
    let state = session.store().session();
    match state.current_conversation_id() {
        Some(id) => println!("--- conversation {id} ---"),
        None => println!("--- new conversation ---"),
    }
    for entry in state.transcript() {
        if !matches!(entry, TranscriptEntry::Typing) {
            println!("{}", renderer.entry_text(entry));
        }
    }
}

fn print_list(session: &ChatSession, sidebar: &SidebarController, renderer: &Renderer) {
    let store = session.store();
    println!(
        "{}",
        renderer.sidebar_text(&sidebar.rows(store), store.list_state())
    );
}

// ============================================================================
// Conversations
// ============================================================================

async fn run_conversations(
    api: &dyn ApiBackend,
    config: &Config,
    renderer: Renderer,
    input: &mut Input,
    action: ConversationsAction,
) -> Result<()> {
    let events = EventBus::default();
    let mut store = ConversationStore::new(config.greeting.clone(), events.clone());

    match action {
        ConversationsAction::List => {
            store.list_conversations(api).await;
            if let ListState::Failed(message) = store.list_state() {
                bail!("{message}");
            }
            let sidebar = SidebarController::new(config.narrow_viewport_width, events);
            println!(
                "{}",
                renderer.sidebar_text(&sidebar.rows(&store), store.list_state())
            );
        }
        ConversationsAction::Show { id } => {
            let transcript = store
                .load_conversation(api, id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load conversation")))?;
            for entry in transcript {
                println!("{}", renderer.entry_text(entry));
            }
        }
        ConversationsAction::Delete { id, yes } => {
            if !yes && !confirm(input, DeleteConfirmation::PROMPT).await? {
                println!("Cancelled.");
                return Ok(());
            }
            store
                .delete_conversation(api, id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to delete conversation")))?;
            println!("Conversation {id} deleted.");
        }
    }
    Ok(())
}

// ============================================================================
// Admin
// ============================================================================

const USER_HEADERS: [&str; 6] = ["ID", "Username", "Email", "Role", "Registered", "Last Login"];
const CONVERSATION_HEADERS: [&str; 7] =
    ["ID", "User", "Email", "Title", "Messages", "Created", "Updated"];

fn loaded<T>(section: &Section<T>) -> Result<&T> {
    match section {
        Section::Loaded(value) => Ok(value),
        Section::Failed(message) => bail!("{message}"),
        Section::Loading => bail!("Still loading"),
    }
}

async fn run_admin(api: &dyn ApiBackend, renderer: Renderer, action: AdminAction) -> Result<()> {
    let mut dashboard = AdminDashboard::new(renderer);

    match action {
        AdminAction::Stats => {
            dashboard.load_dashboard(api).await;
            println!("{}", renderer.stats_text(loaded(dashboard.stats())?));
        }
        AdminAction::Users { search } => {
            dashboard.load_dashboard(api).await;
            loaded(dashboard.users())?;
            dashboard.set_users_filter(search.unwrap_or_default());
            let rows: Vec<Vec<String>> = dashboard
                .visible_users()
                .into_iter()
                .map(|u| renderer.user_cells(u))
                .collect();
            println!("{}", render::table_text(&USER_HEADERS, &rows, "No users found"));
        }
        AdminAction::Conversations { search } => {
            dashboard.load_dashboard(api).await;
            loaded(dashboard.conversations())?;
            dashboard.set_conversations_filter(search.unwrap_or_default());
            let rows: Vec<Vec<String>> = dashboard
                .visible_conversations()
                .into_iter()
                .map(|c| renderer.conversation_cells(c))
                .collect();
            println!(
                "{}",
                render::table_text(&CONVERSATION_HEADERS, &rows, "No conversations found")
            );
        }
        AdminAction::User { id } => {
            let detail = dashboard
                .load_user_details(api, id)
                .await
                .context("Error loading user details")?;
            println!("{}", renderer.user_detail_text(&detail));
        }
        AdminAction::Conversation { id } => {
            let detail = dashboard
                .view_conversation(api, id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load conversation")))?;
            println!("{}", renderer.conversation_text(detail));
        }
    }
    Ok(())
}

// ============================================================================
// Terminal input
// ============================================================================

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

async fn read_required(input: &mut Input, label: &str) -> Result<String> {
    match prompt(input, label).await? {
        Some(line) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        None => bail!("No input"),
    }
}

/// Read a password without echoing it. Piped input is read as a plain line.
async fn read_password(input: &mut Input, label: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return read_required(input, label).await;
    }
    print!("{label}");
    std::io::stdout().flush()?;
    let password = tokio::task::spawn_blocking(read_hidden_line).await??;
    println!();
    Ok(password)
}

fn read_hidden_line() -> Result<String> {
    enable_raw_mode()?;
    let line = read_hidden_keys();
    let _ = disable_raw_mode();
    line
}

fn read_hidden_keys() -> Result<String> {
    let mut line = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match password_key(&mut line, key) {
                PasswordKey::Pending => {}
                PasswordKey::Done => return Ok(line),
                PasswordKey::Cancelled => bail!("Cancelled"),
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum PasswordKey {
    Pending,
    Done,
    Cancelled,
}

fn password_key(line: &mut String, key: KeyEvent) -> PasswordKey {
    if key.kind != KeyEventKind::Press {
        return PasswordKey::Pending;
    }
    match key.code {
        KeyCode::Enter => return PasswordKey::Done,
        KeyCode::Esc => return PasswordKey::Cancelled,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return PasswordKey::Cancelled
        }
        KeyCode::Backspace => {
            line.pop();
        }
        KeyCode::Char(c) => line.push(c),
        _ => {}
    }
    PasswordKey::Pending
}

async fn confirm(input: &mut Input, question: &str) -> Result<bool> {
    let answer = prompt(input, &format!("{question} [y/N] ")).await?;
    Ok(matches!(
        answer.as_deref().map(str::trim),
        Some("y" | "Y" | "yes")
    ))
}
