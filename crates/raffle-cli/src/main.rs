use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use raffle_core::Participant;
use raffle_mailer::{
    GraphCredentials, HttpClient, HttpMode, MailerError, RaffleConfig, RaffleRun,
    draw_assignments, template::notification_html,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amigo-secreto")]
#[command(about = "Draws the Amigo Secreto raffle and mails every giver their match", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Checks the raffle file and prints its groups.
    Validate {
        #[arg(long, value_name = "RAFFLE_JSON")]
        config: PathBuf,
    },
    /// Draws without sending anything. The output reveals every match.
    Draw {
        #[arg(long, value_name = "RAFFLE_JSON")]
        config: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Renders the notification a giver would receive.
    Preview {
        #[arg(long, value_name = "RAFFLE_JSON")]
        config: PathBuf,
        #[arg(long)]
        giver: String,
        #[arg(long)]
        receiver: String,
        #[arg(long, value_name = "HTML_FILE")]
        out: Option<PathBuf>,
    },
    /// Draws, records the ledger and mails every giver.
    Send {
        #[arg(long, value_name = "RAFFLE_JSON")]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Mock)]
        mode: ModeArg,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Mock,
    Real,
}

impl From<ModeArg> for HttpMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Mock => HttpMode::Mock,
            ModeArg::Real => HttpMode::Real,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Validate { config } => handle_validate(config),
        Command::Draw { config, seed } => handle_draw(config, seed),
        Command::Preview {
            config,
            giver,
            receiver,
            out,
        } => handle_preview(config, giver, receiver, out),
        Command::Send { config, mode, seed } => handle_send(config, mode, seed),
    }
}

fn load_config(path: &Path) -> Result<RaffleConfig, CliError> {
    RaffleConfig::load(path).map_err(|err| CliError::Config(path.to_path_buf(), err.into()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.into()))?;
    println!("{rendered}");
    Ok(())
}

fn handle_validate(config_path: PathBuf) -> Result<(), CliError> {
    let cfg = load_config(&config_path)?;
    let groups = cfg
        .groups()
        .map_err(|err| CliError::Config(config_path.clone(), err.into()))?;
    let summary: Vec<Value> = groups
        .iter()
        .map(|group| json!({ "name": group.name(), "participants": group.len() }))
        .collect();
    print_json(&json!({
        "valid": true,
        "groups": summary,
        "total": cfg.participant_count(),
        "ledger_recipient": cfg.ledger.recipient,
    }))
}

fn handle_draw(config_path: PathBuf, seed: Option<u64>) -> Result<(), CliError> {
    let cfg = load_config(&config_path)?;
    let mut rng = rng_from_seed(seed);
    let assignments = draw_assignments(&cfg, &mut rng)
        .map_err(|err| classify_mailer_error(&config_path, err))?;
    warn!("dry run output reveals every assignment; keep it away from participants");
    let rows: Vec<Value> = assignments
        .iter()
        .map(|a| {
            json!({
                "group": a.group,
                "giver": a.giver.name,
                "email": a.giver.email,
                "receiver": a.receiver.name,
            })
        })
        .collect();
    print_json(&json!({ "total": rows.len(), "assignments": rows }))
}

fn handle_preview(
    config_path: PathBuf,
    giver: String,
    receiver: String,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let cfg = load_config(&config_path)?;
    let groups = cfg
        .groups()
        .map_err(|err| CliError::Config(config_path.clone(), err.into()))?;
    let find = |name: &str| -> Result<Participant, CliError> {
        groups
            .iter()
            .find_map(|group| group.find(name).cloned())
            .ok_or_else(|| CliError::UnknownParticipant(name.trim().to_string()))
    };
    let giver = find(&giver)?;
    let receiver = find(&receiver)?;
    let html = notification_html(&cfg.event, &giver.name, &receiver.name);
    match out {
        Some(path) => {
            fs::write(&path, html).map_err(|err| CliError::Write(path.clone(), err.into()))?;
            info!(path = %path.display(), "preview written");
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn handle_send(config_path: PathBuf, mode: ModeArg, seed: Option<u64>) -> Result<(), CliError> {
    let cfg = load_config(&config_path)?;
    let creds = match mode {
        ModeArg::Real => {
            GraphCredentials::from_env().map_err(|err| CliError::Credentials(err.into()))?
        }
        ModeArg::Mock => GraphCredentials::from_env().unwrap_or_else(|_| {
            info!("graph credentials not set; using placeholders for mock transport");
            GraphCredentials::placeholder()
        }),
    };
    let client = HttpClient::new(mode.into());
    let mut rng = rng_from_seed(seed);
    let report = RaffleRun::new(&cfg, &client, &creds)
        .execute(&mut rng)
        .map_err(|err| classify_mailer_error(&config_path, err))?;

    let mut output = json!({
        "mode": mode.to_possible_value().map(|v| v.get_name().to_string()),
        "report": &report,
    });
    if mode == ModeArg::Mock {
        output["http_calls"] = json!(client.calls());
    }
    print_json(&output)?;

    if report.success() {
        Ok(())
    } else {
        Err(CliError::Delivery {
            failed: report.failed,
            total: report.total,
        })
    }
}

fn classify_mailer_error(config_path: &Path, err: MailerError) -> CliError {
    match err {
        MailerError::Config(err) => CliError::Config(config_path.to_path_buf(), err.into()),
        MailerError::Draw(err) => CliError::Draw(err.into()),
        other => CliError::Run(anyhow!(other)),
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("config invalid ({0}): {1}")]
    Config(PathBuf, #[source] anyhow::Error),
    #[error("participant {0} is not in any group")]
    UnknownParticipant(String),
    #[error("draw failed: {0}")]
    Draw(#[source] anyhow::Error),
    #[error("graph credentials unavailable: {0}")]
    Credentials(#[source] anyhow::Error),
    #[error("raffle run failed: {0}")]
    Run(#[source] anyhow::Error),
    #[error("{failed} of {total} notifications failed")]
    Delivery { failed: usize, total: usize },
    #[error("failed to render output: {0}")]
    Output(#[source] anyhow::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, #[source] anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_, _) => 2,
            CliError::UnknownParticipant(_) => 2,
            CliError::Draw(_) => 3,
            CliError::Credentials(_) => 4,
            CliError::Run(_) => 5,
            CliError::Delivery { .. } => 5,
            CliError::Output(_) => 6,
            CliError::Write(_, _) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raffle_core::{DerangementError, DrawError};
    use raffle_mailer::ConfigError;

    #[test]
    fn send_defaults_to_mock_transport() {
        let cli = Cli::try_parse_from(["amigo-secreto", "send", "--config", "raffle.json"]).unwrap();
        match cli.command {
            Command::Send { mode, seed, .. } => {
                assert_eq!(mode, ModeArg::Mock);
                assert_eq!(HttpMode::from(mode), HttpMode::Mock);
                assert_eq!(seed, None);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn preview_requires_both_names() {
        let parsed = Cli::try_parse_from([
            "amigo-secreto",
            "preview",
            "--config",
            "raffle.json",
            "--giver",
            "ANA",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn mailer_errors_map_to_exit_codes() {
        let path = Path::new("raffle.json");
        let draw = classify_mailer_error(
            path,
            MailerError::Draw(DrawError::Group {
                group: "A".into(),
                source: DerangementError::DerangementNotFound { attempts: 1000 },
            }),
        );
        assert_eq!(draw.exit_code(), 3);
        assert!(draw.to_string().contains("group A"));

        let config =
            classify_mailer_error(path, MailerError::Config(ConfigError::Invalid("x".into())));
        assert_eq!(config.exit_code(), 2);

        let token = classify_mailer_error(
            path,
            MailerError::Token {
                status: 401,
                body: "denied".into(),
            },
        );
        assert_eq!(token.exit_code(), 5);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let a: u64 = rng_from_seed(Some(7)).random();
        let b: u64 = rng_from_seed(Some(7)).random();
        assert_eq!(a, b);
    }
}
