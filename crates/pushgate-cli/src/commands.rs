//! Command handlers for the pushgate CLI

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use pushgate_core::{DispatchWorker, InboundEvent, UndeliveredRecord};

use crate::{
    app::PushApp,
    cli::{Cli, Commands, UndeliveredAction},
    config::CliAppConfig,
    error::{CliError, Result},
};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: CliAppConfig) -> Result<()> {
        match cli.command {
            Commands::Dispatch {
                events,
                background,
                claim,
            } => Self::handle_dispatch_command(config, &events, background, claim).await,
            Commands::Undelivered { action } => match action {
                UndeliveredAction::List => Self::handle_list_command(&config),
                UndeliveredAction::Replay => Self::handle_replay_command(&config),
            },
            Commands::Config => Self::handle_config_command(&config),
        }
    }

    // ---- Command Implementations ----

    async fn handle_dispatch_command(
        config: CliAppConfig,
        events: &Path,
        background: bool,
        claim: bool,
    ) -> Result<()> {
        let events = read_events(events)?;
        info!("Dispatching {} events", events.len());

        let worker_config = config.push.worker.clone();
        let app = PushApp::new(config, !background, claim)?;
        let worker = DispatchWorker::spawn(Arc::clone(&app.dispatcher), &worker_config)?;

        let mut failures = 0usize;
        for (line, event) in events {
            match worker.dispatch(event).await {
                Ok(outcome) => println!("line {}: {}", line, outcome),
                Err(e) => {
                    failures += 1;
                    warn!("Event on line {} failed: {}", line, e);
                    println!("line {}: failed ({})", line, e);
                }
            }
        }

        worker.shutdown().await?;

        println!(
            "{} pending for in-app delivery, {} stored undelivered",
            app.pending.len(),
            app.dispatcher.store().count()?
        );
        if failures > 0 {
            println!("{} events failed", failures);
        }
        Ok(())
    }

    fn handle_list_command(config: &CliAppConfig) -> Result<()> {
        let store = PushApp::open_store(config)?;
        let records = store.entries()?;
        if records.is_empty() {
            println!("No undelivered messages");
            return Ok(());
        }
        println!("Undelivered messages ({}):", records.len());
        for record in &records {
            print_record(record);
        }
        Ok(())
    }

    fn handle_replay_command(config: &CliAppConfig) -> Result<()> {
        let store = PushApp::open_store(config)?;
        let records = store.take_all()?;
        if records.is_empty() {
            println!("No undelivered messages");
            return Ok(());
        }
        for record in &records {
            print_record(record);
        }
        info!("Replayed and cleared {} undelivered messages", records.len());
        Ok(())
    }

    fn handle_config_command(config: &CliAppConfig) -> Result<()> {
        print!("{}", config.to_toml()?);
        Ok(())
    }
}

/// Parse a JSON-lines event file, keeping 1-based line numbers. Blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<(usize, InboundEvent)>> {
    let text = std::fs::read_to_string(path)?;
    parse_events(&text)
}

fn parse_events(text: &str) -> Result<Vec<(usize, InboundEvent)>> {
    let mut events = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str::<InboundEvent>(raw).map_err(|e| {
            CliError::InvalidEvent {
                line,
                reason: e.to_string(),
            }
        })?;
        events.push((line, event));
    }
    Ok(events)
}

fn print_record(record: &UndeliveredRecord) {
    let message = &record.message;
    print!("  {} {}", record.sequence, message.alert);
    if let Some(id) = &message.id {
        print!(" [id {}]", id);
    }
    if let Some(url) = &message.url {
        print!(" <{}>", url);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events_skips_blank_lines() {
        let text = r#"{"payload": {"alert": "one"}}

{"message_type": "send_error", "payload": {"alert": "two"}}
{}
"#;
        let events = parse_events(text).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 1);
        assert_eq!(events[1].0, 3);
        assert_eq!(events[1].1.message_type.as_deref(), Some("send_error"));
        assert_eq!(events[2].0, 4);
        assert!(events[2].1.usable_payload().is_none());
    }

    #[test]
    fn test_parse_events_reports_line_number() {
        let text = "{\"payload\": {}}\nnot json\n";
        match parse_events(text) {
            Err(CliError::InvalidEvent { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid event error, got {:?}", other.map(|e| e.len())),
        }
    }

    #[tokio::test]
    async fn test_dispatch_command_persists_background_messages() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.jsonl");
        std::fs::write(
            &events,
            "{\"payload\": {\"alert\": \"a\", \"nid\": \"1\"}}\n{\"payload\": {\"alert\": \"b\"}}\n",
        )
        .unwrap();

        let mut config = CliAppConfig::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        CommandDispatcher::handle_dispatch_command(config.clone(), &events, true, false)
            .await
            .unwrap();

        let records = PushApp::open_store(&config).unwrap().entries().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.id.as_deref(), Some("1"));
        assert_eq!(records[1].message.alert, "b");

        CommandDispatcher::handle_replay_command(&config).unwrap();
        let store = PushApp::open_store(&config).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
