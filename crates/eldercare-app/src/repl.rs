//! Line-oriented command loop over the [`Shell`].

use std::fmt::Write as _;
use std::path::PathBuf;

use eldercare_chat::{ChatError, Outgoing, SendOutcome, Shell};
use eldercare_core::types::{Message, UserRole};

use crate::devices::read_picked_file;

pub const HELP: &str = "\
Commands:
  <text>              send a message (parent) or ask about the day (child)
  /role parent|child  switch view
  /attach <path>      stage a photo, video or audio file
  /record             start recording from the microphone
  /stop               stop recording and stage the audio
  /send               send staged media without any text
  /location           share the current location
  /reset              start a fresh conversation
  /update [question]  ask for a status update
  /dashboard          show the dashboard cards
  /history            show the conversation
  /help               show this help
  /quit               exit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text(String),
    Role(UserRole),
    Attach(PathBuf),
    Record,
    Stop,
    Send,
    Location,
    Reset,
    Update(Option<String>),
    Dashboard,
    History,
    Help,
    Quit,
}

impl Command {
    /// Parse one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Text(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let cmd = match name {
            "role" => Command::Role(arg.parse().map_err(|e| format!("{}", e))?),
            "attach" if !arg.is_empty() => Command::Attach(PathBuf::from(arg)),
            "attach" => return Err("usage: /attach <path>".to_string()),
            "record" => Command::Record,
            "stop" => Command::Stop,
            "send" => Command::Send,
            "location" => Command::Location,
            "reset" => Command::Reset,
            "update" => Command::Update(Some(arg.to_string()).filter(|a| !a.is_empty())),
            "dashboard" => Command::Dashboard,
            "history" => Command::History,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: /{}", other)),
        };
        Ok(Some(cmd))
    }
}

/// Run one command against the shell and return what to print.
pub async fn execute(shell: &Shell, command: Command) -> Result<String, ChatError> {
    let out = match command {
        Command::Text(text) => match shell.role() {
            UserRole::Parent => render_outcome(shell.parent().send(Outgoing::text(text)).await),
            UserRole::Child => render_update(shell.dashboard().request_update(Some(&text)).await),
        },
        Command::Role(role) => {
            shell.switch_role(role);
            format!("Switched to {} view.", role)
        }
        Command::Attach(path) => {
            let file = read_picked_file(&path).await?;
            let media = shell.parent().attach_file(file).await?;
            format!(
                "Attached {} ({}). It will be sent with your next message, or /send it now.",
                media.display_handle.as_deref().unwrap_or("file"),
                media.mime_type()
            )
        }
        Command::Record => {
            shell.parent().start_recording().await?;
            "Recording... type /stop when done.".to_string()
        }
        Command::Stop => {
            let media = shell.parent().stop_recording().await?;
            format!(
                "Voice note ready ({} bytes). It will be sent with your next message, or /send it now.",
                media.decode().map(|b| b.len()).unwrap_or(0)
            )
        }
        Command::Send => render_outcome(shell.parent().send_draft().await),
        Command::Location => render_outcome(shell.parent().share_location().await?),
        Command::Reset => {
            shell.parent().reset();
            render_message(&shell.parent().messages()[0])
        }
        Command::Update(question) => {
            render_update(shell.dashboard().request_update(question.as_deref()).await)
        }
        Command::Dashboard => render_dashboard(shell),
        Command::History => shell
            .parent()
            .messages()
            .iter()
            .map(render_message)
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(out)
}

fn render_outcome(outcome: SendOutcome) -> String {
    match outcome {
        SendOutcome::Completed { reply, .. } => render_message(&reply),
        SendOutcome::Skipped => "Nothing to send.".to_string(),
        SendOutcome::Busy => "Still waiting for the last reply.".to_string(),
        SendOutcome::Discarded { .. } => "The conversation was reset.".to_string(),
    }
}

fn render_update(update: Option<String>) -> String {
    update.unwrap_or_else(|| "An update is already on its way.".to_string())
}

pub fn render_message(message: &Message) -> String {
    let mut line = format!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M"),
        message.speaker.label(),
        message.content
    );
    if let Some(ref media) = message.media {
        let _ = write!(line, " [attachment: {}]", media.mime_type());
    }
    if let Some(ref loc) = message.location {
        let _ = write!(line, " [location: {}]", loc);
    }
    line
}

pub fn render_dashboard(shell: &Shell) -> String {
    let dashboard = shell.dashboard();
    let summary = dashboard.summary();
    let compliance = dashboard.medicine_compliance();

    let mut out = String::new();
    let _ = writeln!(out, "Check-ins: {}", summary.entries);
    match summary.last_location {
        Some(loc) => {
            let _ = writeln!(out, "Last seen: {}", loc);
        }
        None => {
            let _ = writeln!(out, "Last seen: unknown");
        }
    }
    let _ = writeln!(out, "Media shared: {}", summary.media_count);
    let _ = writeln!(
        out,
        "Medicine: taken {} of {} reported",
        compliance.taken,
        compliance.reported()
    );
    if let Some(update) = dashboard.last_update() {
        let _ = writeln!(out, "Latest update: {}", update);
    }
    let _ = writeln!(out, "Recent activity:");
    if summary.timeline.is_empty() {
        let _ = write!(out, "  (nothing yet)");
    } else {
        let lines: Vec<_> = summary
            .timeline
            .iter()
            .map(|m| format!("  {}", render_message(m)))
            .collect();
        out.push_str(&lines.join("\n"));
    }
    out
}
