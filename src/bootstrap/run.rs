//! Console harness.
//!
//! Drives the gate from stdin in place of a real identity provider and UI:
//! each line is a command, each navigation change is printed.

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use lg_app::GateRuntime;
use lg_core::Identity;
use lg_infra::IdentityFeed;

use super::config::GateSettings;
use super::wiring::{wire_dependencies, Wiring};

const HELP: &str = "commands: sign-in <id> [email] | sign-out | fail <message> \
    | complete-onboarding | status | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SignIn(Identity),
    SignOut,
    Fail(String),
    CompleteOnboarding,
    Status,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name {
        "sign-in" => {
            let Some(id) = words.next() else {
                bail!("sign-in needs a user id");
            };
            let email = words.next().map(str::to_string);
            ConsoleCommand::SignIn(Identity::new(id, email))
        }
        "sign-out" => ConsoleCommand::SignOut,
        "fail" => {
            let message = words.collect::<Vec<_>>().join(" ");
            if message.is_empty() {
                ConsoleCommand::Fail("identity provider error".to_string())
            } else {
                ConsoleCommand::Fail(message)
            }
        }
        "complete-onboarding" => ConsoleCommand::CompleteOnboarding,
        "status" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => bail!("unknown command: {other}"),
    };
    Ok(Some(command))
}

/// Returns `false` when the loop should end.
fn apply(command: ConsoleCommand, runtime: &GateRuntime, feed: &IdentityFeed) -> bool {
    let pushed = match command {
        ConsoleCommand::SignIn(identity) => feed.push_identity(identity),
        ConsoleCommand::SignOut => feed.push_absent(),
        ConsoleCommand::Fail(message) => feed.push_error(message),
        ConsoleCommand::CompleteOnboarding => {
            runtime.mark_onboarding_complete();
            Ok(())
        }
        ConsoleCommand::Status => {
            let snapshot = runtime.snapshot();
            println!(
                "target={} resolution={:?} user={} onboarding_completed={}",
                snapshot.target,
                snapshot.resolution,
                snapshot
                    .identity
                    .as_ref()
                    .map(|identity| identity.id.as_str())
                    .unwrap_or("-"),
                snapshot.onboarding_completed
            );
            Ok(())
        }
        ConsoleCommand::Quit => return false,
    };
    if let Err(err) = pushed {
        warn!(error = %err, "identity feed rejected event");
    }
    true
}

/// Start the gate and serve console commands until `quit`, EOF or Ctrl-C.
pub async fn run_app(settings: GateSettings) -> anyhow::Result<()> {
    let Wiring { runtime, feed } = wire_dependencies(&settings);

    let mut watcher = runtime.navigation();
    println!("navigation: {}", watcher.last());
    let printer = tokio::spawn(async move {
        while let Some(target) = watcher.changed().await {
            info!(target = %target, "navigation");
            println!("navigation: {target}");
        }
    });

    runtime.start().await.context("Failed to start gate")?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if !apply(command, &runtime, &feed) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err}\n{HELP}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    runtime.shutdown().await;
    feed.close();
    printer.abort();
    Ok(())
}
