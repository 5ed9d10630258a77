use std::{error::Error, fs::File, io::Write};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, MovementListFilter};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "monogestion_admin")]
#[command(about = "Admin utilities for MonoGestión (users, ledger repair, exports)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./monogestion.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Ledger(Ledger),
    Export(Export),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Ledger {
    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Recreate missing movements, fix drifted ones and drop orphans.
    Reconcile(UserArg),
}

#[derive(Args, Debug)]
struct UserArg {
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct Export {
    #[command(subcommand)]
    command: ExportCommand,
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Write a user's movements as CSV, newest first.
    Movements(ExportMovementsArgs),
}

#[derive(Args, Debug)]
struct ExportMovementsArgs {
    #[arg(long)]
    user: String,
    /// Inclusive lower bound, RFC3339.
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// Exclusive upper bound, RFC3339.
    #[arg(long)]
    to: Option<DateTime<Utc>>,
    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<String>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[derive(Debug, Serialize)]
struct MovementRow {
    id: String,
    kind: &'static str,
    occurred_at: String,
    amount_minor: i64,
    description: String,
    source_id: String,
}

const EXPORT_PAGE_SIZE: u64 = 500;

/// Stream every movement matching `filter` into `writer`. Returns the row count.
async fn export_movements<W: Write>(
    engine: &Engine,
    user: &str,
    filter: &MovementListFilter,
    writer: W,
) -> Result<u64, Box<dyn Error + Send + Sync>> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut cursor: Option<String> = None;
    let mut rows = 0;

    loop {
        let page = engine
            .list_movements(user, filter, cursor.as_deref(), EXPORT_PAGE_SIZE)
            .await?;
        for movement in page.items {
            csv.serialize(MovementRow {
                id: movement.id.to_string(),
                kind: movement.kind().as_str(),
                occurred_at: movement.occurred_at.to_rfc3339(),
                amount_minor: movement.amount_minor,
                description: movement.description.unwrap_or_default(),
                source_id: movement.source.id().to_string(),
            })?;
            rows += 1;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    csv.flush()?;
    Ok(rows)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter("monogestion_admin=info,engine=warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            match engine.create_user(&args.username, &password).await {
                Ok(()) => println!("created user: {}", args.username),
                Err(EngineError::ExistingKey(_)) => {
                    eprintln!("user already exists: {}", args.username);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Reconcile(args),
        }) => {
            let report = engine.reconcile_ledger(&args.user).await?;
            println!(
                "reconciled ledger for {}: {} created, {} updated, {} removed",
                args.user, report.created, report.updated, report.removed
            );
        }
        Command::Export(Export {
            command: ExportCommand::Movements(args),
        }) => {
            let filter = MovementListFilter {
                from: args.from,
                to: args.to,
                kinds: None,
            };
            let rows = match args.output.as_deref() {
                Some(path) => {
                    export_movements(&engine, &args.user, &filter, File::create(path)?).await?
                }
                None => export_movements(&engine, &args.user, &filter, std::io::stdout()).await?,
            };
            tracing::info!(rows, "movements exported");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use engine::IncomeCmd;

    #[tokio::test]
    async fn export_writes_one_row_per_movement() {
        let db = connect_db("sqlite::memory:").await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        engine.create_user("alice", "password").await.unwrap();
        for day in 1..=3 {
            engine
                .create_income(
                    IncomeCmd::new(
                        "alice",
                        100 * i64::from(day),
                        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap(),
                    )
                    .description("Propina, mesa 4"),
                )
                .await
                .unwrap();
        }

        let mut out = Vec::new();
        let rows = export_movements(&engine, "alice", &MovementListFilter::default(), &mut out)
            .await
            .unwrap();
        assert_eq!(rows, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,kind,occurred_at,amount_minor,description,source_id"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains(",Ingreso,2026-03-03T09:00:00+00:00,300,\"Propina, mesa 4\","));
    }
}
