//! Line-based interactive chat.
//!
//! Each line is either a slash command or a prompt for the agent. The loop
//! waits for every reply before reading the next line; EOF ends the session.

use std::io::{self, Write};

use anyhow::{Context, Result};
use cloudeng_core::agent::AgentInvoker;
use cloudeng_core::render::Renderer;
use cloudeng_core::session::ChatSession;
use crossterm::style::Color;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::terminal;

const WELCOME: &str = "Welcome to cloudeng. Ask about your AWS resources, \
or type /tasks for common requests and /help for commands.";

const HELP: &str = "\
Commands:
  /help              Show this help
  /tasks             List predefined tasks
  /task <key|n>      Run a predefined task by key or number
  /history           Show the conversation so far
  /clear             Start a new conversation
  /quit, /exit       Leave the chat

Anything else is sent to the agent.";

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Empty,
    Help,
    Tasks,
    Task(&'a str),
    History,
    Clear,
    Quit,
    Unknown(&'a str),
    Prompt(&'a str),
}

impl<'a> ReplCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Prompt(line);
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));
        match name {
            "help" | "?" => ReplCommand::Help,
            "tasks" => ReplCommand::Tasks,
            "task" => ReplCommand::Task(arg),
            "history" => ReplCommand::History,
            "clear" => ReplCommand::Clear,
            "quit" | "exit" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line),
        }
    }
}

/// Runs the chat loop until `/quit` or end of input.
///
/// # Errors
/// Returns an error if input cannot be read or output cannot be written.
/// Agent failures are shown as replies and do not end the loop.
pub async fn run<A, R, W>(
    session: &mut ChatSession<A>,
    renderer: &Renderer,
    input: R,
    out: &mut W,
    styled: bool,
) -> Result<()>
where
    A: AgentInvoker,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    write_welcome(session, out)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("read input")? else {
            writeln!(out)?;
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Tasks => terminal::write_task_list(out)?,
            ReplCommand::Task("") => notice(out, "Usage: /task <key|n>", styled)?,
            ReplCommand::Task(selector) => match session.run_task(selector).await {
                Ok((task, reply)) => {
                    writeln!(out, "Task: {}", task.description)?;
                    write_reply(out, styled, renderer, &reply)?;
                }
                Err(e) => notice(out, &format!("{e:#}"), styled)?,
            },
            ReplCommand::History => {
                if session.transcript().is_empty() {
                    writeln!(out, "No messages yet.")?;
                }
                for message in session.transcript().messages() {
                    terminal::write_message(out, styled, renderer, message)?;
                    writeln!(out)?;
                }
            }
            ReplCommand::Clear => {
                session.clear().await;
                write_welcome(session, out)?;
            }
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => notice(
                out,
                &format!("Unknown command '{command}'. Type /help for commands."),
                styled,
            )?,
            ReplCommand::Prompt(prompt) => {
                let reply = session.submit(prompt).await;
                write_reply(out, styled, renderer, &reply)?;
            }
        }
    }

    tracing::info!(messages = session.transcript().len(), "chat ended");
    Ok(())
}

fn write_welcome<A: AgentInvoker>(session: &ChatSession<A>, out: &mut impl Write) -> io::Result<()> {
    if session.transcript().is_empty() {
        writeln!(out, "{WELCOME}")?;
    }
    Ok(())
}

fn write_reply(
    out: &mut impl Write,
    styled: bool,
    renderer: &Renderer,
    reply: &str,
) -> io::Result<()> {
    writeln!(
        out,
        "{}:",
        terminal::role_label(cloudeng_core::transcript::Role::Assistant, styled)
    )?;
    terminal::write_content(out, styled, renderer, reply)?;
    writeln!(out)
}

fn notice(out: &mut impl Write, text: &str, styled: bool) -> io::Result<()> {
    writeln!(out, "{}", terminal::paint(text.to_string(), Color::Red, styled))
}

#[cfg(test)]
mod tests {
    use cloudeng_core::agent::RawAgentResult;

    use super::*;

    /// Replies with the task wrapped the way a stringified message looks.
    struct EchoAgent;

    impl AgentInvoker for EchoAgent {
        async fn invoke(&self, task: &str) -> Result<RawAgentResult> {
            Ok(RawAgentResult::Text(format!(
                "<thinking>hmm</thinking>{{'role': 'assistant', 'content': [{{'text': 'echo: {task}'}}]}}"
            )))
        }
    }

    async fn drive(input: &str) -> (ChatSession<EchoAgent>, String) {
        let mut session = ChatSession::new(EchoAgent);
        let mut out = Vec::new();
        run(
            &mut session,
            &Renderer::default(),
            input.as_bytes(),
            &mut out,
            false,
        )
        .await
        .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("/help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("/task  ec2_status "), ReplCommand::Task("ec2_status"));
        assert_eq!(ReplCommand::parse("/task"), ReplCommand::Task(""));
        assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/nope x"), ReplCommand::Unknown("/nope x"));
        assert_eq!(
            ReplCommand::parse(" list my buckets "),
            ReplCommand::Prompt("list my buckets")
        );
    }

    #[tokio::test]
    async fn test_prompt_reply_is_normalized() {
        let (session, out) = drive("list buckets\n").await;
        assert!(out.starts_with(WELCOME));
        assert!(out.contains("Assistant:\necho: list buckets\n"), "{out}");
        assert!(!out.contains("hmm"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_task_by_number() {
        let (session, out) = drive("/task 1\n/quit\n").await;
        assert!(out.contains("Task: List all EC2 instances and their status"));
        assert!(out.contains("echo: List all EC2 instances and their status"));
        assert_eq!(
            session.transcript().messages()[0].content(),
            "Please list all ec2 instances and their status"
        );
    }

    #[tokio::test]
    async fn test_unknown_task_records_nothing() {
        let (session, out) = drive("/task nope\n").await;
        assert!(out.contains("Unknown task 'nope'"));
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_clear_shows_welcome_again() {
        let (session, out) = drive("hello\n/clear\n").await;
        assert_eq!(out.matches(WELCOME).count(), 2);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_history_and_quit_stop_reading() {
        let (_, out) = drive("/history\nhi\n/history\n/quit\nnever sent\n").await;
        assert!(out.contains("No messages yet."));
        assert!(out.contains("You:\nhi\n"));
        assert!(!out.contains("never sent"));
    }

    #[tokio::test]
    async fn test_unknown_command_and_help() {
        let (_, out) = drive("/bogus\n/help\n").await;
        assert!(out.contains("Unknown command '/bogus'. Type /help for commands."));
        assert!(out.contains("/task <key|n>"));
    }
}
