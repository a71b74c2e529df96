#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for one IMAP folder

use clap::{Parser, Subcommand};
use mailbox_client::{MailboxConfig, Message, Uid, with_session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailbox-cli")]
#[command(about = "Scan, read, upload, move and delete mail in one IMAP folder")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List headers of all undeleted mail, newest first
    Scan,

    /// Run an IMAP SEARCH and print the matching sequence numbers
    Search {
        /// IMAP search criteria (e.g. "FROM foo@bar.com")
        criteria: String,
    },

    /// Show a single email by UID
    Show {
        /// Email UID
        uid: Uid,
    },

    /// Append an RFC 2822 file to the folder
    Upload {
        /// Path to the message file
        file: PathBuf,
    },

    /// Move an email to another folder
    Move {
        /// Email UID
        uid: Uid,

        /// Destination folder
        destination: String,
    },

    /// Delete an email and expunge the folder
    Delete {
        /// Email UID
        uid: Uid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = MailboxConfig::from_env()?;

    match args.command {
        Command::Scan => {
            let messages =
                with_session(&config, |s| Box::pin(async move { s.scan_inbox().await }))
                    .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                print_message_table(&messages);
            }
        }
        Command::Search { criteria } => {
            let ids = with_session(&config, move |s| {
                Box::pin(async move { s.search(&criteria).await })
            })
            .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else if ids.is_empty() {
                println!("No matches.");
            } else {
                println!("{}", ids.join(" "));
            }
        }
        Command::Show { uid } => {
            let message =
                with_session(&config, move |s| Box::pin(async move { s.get_mail(&uid).await }))
                    .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&message)?);
            } else {
                print_message_detail(&message);
            }
        }
        Command::Upload { file } => {
            let raw = tokio::fs::read(&file).await?;
            with_session(&config, move |s| {
                Box::pin(async move { s.upload_mail(&raw).await })
            })
            .await?;
            println!("Uploaded {} to {}", file.display(), config.folder);
        }
        Command::Move { uid, destination } => {
            let target = destination.clone();
            with_session(&config, move |s| {
                Box::pin(async move { s.move_mail(&uid, &target).await })
            })
            .await?;
            println!("Moved to {destination}");
        }
        Command::Delete { uid } => {
            with_session(&config, move |s| {
                Box::pin(async move { s.delete_mail(&uid).await })
            })
            .await?;
            println!("Deleted");
        }
    }

    Ok(())
}

fn print_message_table(messages: &[Message]) {
    if messages.is_empty() {
        println!("No emails found.");
        return;
    }

    let header = format!("{:<8} {:<26} {}", "UID", "Date", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(80));

    for message in messages {
        println!(
            "{:<8} {:<26} {}",
            message.uid,
            message.date.format("%Y-%m-%d %H:%M %z"),
            truncate(message.subject(), 44),
        );
    }

    println!("\n{} email(s)", messages.len());
}

fn print_message_detail(message: &Message) {
    println!("UID:         {}", message.uid);
    println!("Date:        {}", message.date.format("%Y-%m-%d %H:%M:%S %z"));
    println!("Subject:     {}", message.subject());
    println!("Return-Path: {}", message.return_path());
    println!("Rcpt-To:     {}", message.recipients().join(", "));

    if let Some(cc) = message.text("cc") {
        println!("CC:          {cc}");
    }
    if let Some(reply_to) = message.text("reply-to") {
        println!("Reply-To:    {reply_to}");
    }

    println!("\n--- Raw ---\n");
    println!("{}", message.raw);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
