use crate::shared::{Gate, MutateError};
use futures_util::{SinkExt, StreamExt};
use taskhub_proto::{Command, MAX_LINE_BYTES, ParseError, WELCOME, parse};
use taskhub_store::{DomainError, MarkDone};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

const LOGIN_FIRST: &str = "LOGIN first.";
const UNKNOWN_COMMAND: &str = "Unknown command. Type HELP to see available commands.";
const NO_LIST_SELECTED: &str = "No list selected. Use USELIST <code> to select a list.";
const STORAGE_ERROR: &str = "Server storage error, your change was not saved.";
const CONFIRM_PROMPT: &str = "Are you sure you want to delete your account? (Y/N)";

/// Connection-scoped protocol state. Never persisted.
enum SessionState {
    Unauthenticated,
    Authenticated {
        user: String,
        selected: Option<String>,
    },
    /// Intercepts every input line until the client answers Y or N.
    AwaitingDeleteConfirmation {
        user: String,
        selected: Option<String>,
    },
}

/// One per connection: interprets command lines, enforces authentication and
/// list-selection preconditions, and composes reply blocks. All store access
/// goes through the shared gate.
pub struct Session {
    state: SessionState,
    gate: Gate,
}

impl Session {
    pub fn new(gate: Gate) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            gate,
        }
    }

    /// Process one input line and produce the reply block body. Invalid
    /// input always yields guidance; it never ends the session.
    pub async fn handle_line(&mut self, line: &str) -> String {
        if matches!(self.state, SessionState::AwaitingDeleteConfirmation { .. }) {
            return self.handle_confirmation(line).await;
        }
        match parse(line) {
            Ok(cmd) => {
                if cmd.requires_auth() && !self.is_authenticated() {
                    return LOGIN_FIRST.to_string();
                }
                self.dispatch(cmd).await
            }
            Err(ParseError::Usage {
                usage,
                requires_auth,
            }) => {
                if requires_auth && !self.is_authenticated() {
                    LOGIN_FIRST.to_string()
                } else {
                    usage.to_string()
                }
            }
            Err(ParseError::Unknown) => {
                if self.is_authenticated() {
                    UNKNOWN_COMMAND.to_string()
                } else {
                    LOGIN_FIRST.to_string()
                }
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// Clone of the authenticated user and selection, if logged in.
    fn identity(&self) -> Option<(String, Option<String>)> {
        match &self.state {
            SessionState::Authenticated { user, selected } => {
                Some((user.clone(), selected.clone()))
            }
            _ => None,
        }
    }

    async fn dispatch(&mut self, cmd: Command) -> String {
        match cmd {
            Command::Help => WELCOME.to_string(),
            Command::Signup { username, password } => self.cmd_signup(username, password).await,
            Command::Login { username, password } => self.cmd_login(username, password).await,
            Command::Logout => {
                self.state = SessionState::Unauthenticated;
                "Logged out successfully.".to_string()
            }
            Command::DeleteAcc { password } => self.cmd_deleteacc(password).await,
            Command::NewList { name, code } => self.cmd_newlist(name, code).await,
            Command::JoinList { code } => self.cmd_joinlist(code).await,
            Command::UseList { code } => self.cmd_uselist(code).await,
            Command::MyLists => self.cmd_mylists().await,
            Command::Add { text } => self.cmd_add(text).await,
            Command::Done { id } => self.cmd_done(id).await,
            Command::Delete { id } => self.cmd_delete(id).await,
            Command::List => self.cmd_list().await,
        }
    }

    async fn cmd_signup(&mut self, username: String, password: String) -> String {
        if let Err(reason) = taskhub_auth::validate_username(&username) {
            return reason;
        }
        // Hashing happens outside the gate; the duplicate check inside it is
        // what keeps concurrent signups for one name from both succeeding.
        let digest = match taskhub_auth::hash_password(&password) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(err = %e, "password hashing failed");
                return "Server error, account not created.".to_string();
            }
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.create_account(&username, digest))
        };
        match result {
            Ok(()) => {
                if !self.is_authenticated() {
                    self.state = SessionState::Authenticated {
                        user: username,
                        selected: None,
                    };
                }
                "User created successfully.".to_string()
            }
            Err(e) => report(e),
        }
    }

    async fn cmd_login(&mut self, username: String, password: String) -> String {
        let verified = {
            let shared = self.gate.lock().await;
            taskhub_auth::login(shared.snapshot(), &username, &password)
        };
        match verified {
            Ok(()) => {
                let reply = format!("Welcome {username}!");
                // Switching identity drops the selection; it was
                // membership-checked for the previous user.
                self.state = SessionState::Authenticated {
                    user: username,
                    selected: None,
                };
                reply
            }
            Err(e) => e.to_string(),
        }
    }

    async fn cmd_deleteacc(&mut self, password: String) -> String {
        let Some((user, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let verified = {
            let shared = self.gate.lock().await;
            taskhub_auth::verify_for_deletion(shared.snapshot(), &user, &password)
        };
        match verified {
            Ok(()) => {
                self.state = SessionState::AwaitingDeleteConfirmation { user, selected };
                CONFIRM_PROMPT.to_string()
            }
            Err(_) => "Invalid password, account not deleted.".to_string(),
        }
    }

    async fn handle_confirmation(&mut self, line: &str) -> String {
        let SessionState::AwaitingDeleteConfirmation { user, selected } = &self.state else {
            return UNKNOWN_COMMAND.to_string();
        };
        let (user, selected) = (user.clone(), selected.clone());
        let token = line.trim().split_whitespace().next().unwrap_or("");
        match token.to_ascii_uppercase().as_str() {
            "Y" => {
                let result = {
                    let mut shared = self.gate.lock().await;
                    shared.mutate(|snap| snap.delete_account(&user))
                };
                match result {
                    Ok(()) => {
                        self.state = SessionState::Unauthenticated;
                        "Account deleted successfully. Bye!".to_string()
                    }
                    Err(e) => {
                        // Nothing committed; drop back to the logged-in state.
                        self.state = SessionState::Authenticated { user, selected };
                        report(e)
                    }
                }
            }
            "N" => {
                self.state = SessionState::Authenticated { user, selected };
                "Account deletion cancelled.".to_string()
            }
            _ => "Please confirm deletion with Y or N.".to_string(),
        }
    }

    async fn cmd_newlist(&mut self, name: String, code: String) -> String {
        let Some((user, _)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.create_list(&code, &name, &user))
        };
        match result {
            Ok(()) => format!("List '{name}' created with code {code}."),
            Err(e) => report(e),
        }
    }

    async fn cmd_joinlist(&mut self, code: String) -> String {
        let Some((user, _)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.join_list(&code, &user))
        };
        match result {
            Ok(()) => format!("Joined list {code}. Use USELIST {code} to switch."),
            Err(e) => report(e),
        }
    }

    async fn cmd_uselist(&mut self, code: String) -> String {
        let Some((user, _)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let name = {
            let shared = self.gate.lock().await;
            let snap = shared.snapshot();
            let Some(list) = snap.lists.get(&code) else {
                return DomainError::ListNotFound(code).to_string();
            };
            if !snap.is_member(&code, &user) {
                return DomainError::NotAMember(code).to_string();
            }
            list.name.clone()
        };
        self.state = SessionState::Authenticated {
            user,
            selected: Some(code.clone()),
        };
        format!("Now using list '{name}' ({code}).")
    }

    async fn cmd_mylists(&mut self) -> String {
        let Some((user, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let shared = self.gate.lock().await;
        let snap = shared.snapshot();
        let mut lines = Vec::new();
        for (code, list) in &snap.lists {
            if snap.is_member(code, &user) {
                let mark = if selected.as_deref() == Some(code.as_str()) {
                    '*'
                } else {
                    ' '
                };
                lines.push(format!("{mark} ({code}) {}", list.name));
            }
        }
        if lines.is_empty() {
            "No lists found.".to_string()
        } else {
            format!("Your lists:\n{}", lines.join("\n"))
        }
    }

    async fn cmd_add(&mut self, text: String) -> String {
        let Some((user, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let Some(code) = selected else {
            return NO_LIST_SELECTED.to_string();
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.add_task(&code, &text, &user))
        };
        match result {
            Ok(id) => format!("Task added with ID {id}."),
            Err(e) => report(e),
        }
    }

    async fn cmd_done(&mut self, id: String) -> String {
        let Some((_, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let Some(code) = selected else {
            return NO_LIST_SELECTED.to_string();
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.mark_done(&code, &id))
        };
        match result {
            Ok(MarkDone::Marked) => format!("Task {id} marked as done."),
            Ok(MarkDone::AlreadyDone) => format!("Task {id} is already done."),
            Err(e) => report(e),
        }
    }

    async fn cmd_delete(&mut self, id: String) -> String {
        let Some((_, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let Some(code) = selected else {
            return NO_LIST_SELECTED.to_string();
        };
        let result = {
            let mut shared = self.gate.lock().await;
            shared.mutate(|snap| snap.delete_task(&code, &id))
        };
        match result {
            Ok(()) => format!("Task {id} deleted."),
            Err(e) => report(e),
        }
    }

    async fn cmd_list(&mut self) -> String {
        let Some((_, selected)) = self.identity() else {
            return LOGIN_FIRST.to_string();
        };
        let Some(code) = selected else {
            return NO_LIST_SELECTED.to_string();
        };
        let shared = self.gate.lock().await;
        let snap = shared.snapshot();
        let Some(list) = snap.lists.get(&code) else {
            return DomainError::ListNotFound(code).to_string();
        };
        let lines: Vec<String> = list
            .tasks
            .iter()
            .map(|t| {
                format!(
                    "{} - [{}] {} (User: {})",
                    t.id,
                    if t.done { "x" } else { " " },
                    t.text,
                    t.user
                )
            })
            .collect();
        if lines.is_empty() {
            "Tasks:\nNo tasks found.".to_string()
        } else {
            format!("Tasks:\n{}", lines.join("\n"))
        }
    }
}

/// Map a failed mutation to its reply line, logging persistence failures.
fn report(e: MutateError) -> String {
    match e {
        MutateError::Domain(e) => e.to_string(),
        MutateError::Storage(e) => {
            tracing::error!(err = ?e, "failed to persist store");
            STORAGE_ERROR.to_string()
        }
    }
}

/// Drive one client connection: emit the welcome block, then loop reading
/// command lines and writing framed reply blocks until the peer disconnects.
/// Generic over the stream so a TLS wrapper (or an in-memory duplex in
/// tests) can stand in for a plain TCP socket.
pub async fn serve_connection<S>(stream: S, gate: Gate) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (r, w) = tokio::io::split(stream);
    let mut reader = FramedRead::new(r, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let mut writer = FramedWrite::new(w, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    send_block(&mut writer, WELCOME).await?;

    let mut session = Session::new(gate);
    while let Some(line) = reader.next().await {
        let line = line?;
        let reply = session.handle_line(&line).await;
        send_block(&mut writer, &reply).await?;
    }
    Ok(())
}

/// Write one reply block: each body line, then the blank end-of-block line.
async fn send_block<W>(
    writer: &mut FramedWrite<W, LinesCodec>,
    body: &str,
) -> Result<(), LinesCodecError>
where
    W: AsyncWrite + Unpin,
{
    for line in body.lines() {
        writer.send(line).await?;
    }
    writer.send("").await?;
    Ok(())
}
