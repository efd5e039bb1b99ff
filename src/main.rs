use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ezreq::{Session, SessionConfig, Verb};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ezreq", about = "Browse a site with managed origin/referer headers", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Extra session header, `name: value` (repeatable)
    #[arg(short = 'H', long = "header", global = true)]
    headers: Vec<String>,

    /// Connect retries for http/https (overrides config)
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print resolved URLs and navigation headers without sending anything
    Resolve {
        /// Absolute URL the session starts at
        base_url: String,

        /// Steps as `VERB:URL` or a bare URL (get)
        #[arg(required = true)]
        steps: Vec<String>,

        /// Emit one JSON object per step
        #[arg(long)]
        json: bool,
    },

    /// Send each step in order and print status and final URL
    Run {
        /// Absolute URL the session starts at
        base_url: String,

        /// Steps as `VERB:URL` or a bare URL (get)
        #[arg(required = true)]
        steps: Vec<String>,
    },
}

/// `post:/login` -> (Post, "/login"); anything without a verb prefix is a GET.
fn parse_step(step: &str) -> (Verb, &str) {
    match step.split_once(':') {
        Some((verb, url)) => match verb.parse::<Verb>() {
            Ok(verb) => (verb, url),
            Err(_) => (Verb::Get, step),
        },
        None => (Verb::Get, step),
    }
}

fn build_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = SessionConfig::load().context("Failed to load configuration")?;
    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header must be `name: value`, got {:?}", header))?;
        config = config.with_header(name.trim(), value.trim());
    }
    if let Some(max_retries) = cli.max_retries {
        config = config.with_max_retries(max_retries);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "ezreq=info,warn",
        1 => "ezreq=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = build_config(&cli)?;

    match &cli.command {
        Command::Resolve {
            base_url,
            steps,
            json,
        } => {
            let mut session = Session::with_config(base_url, &config)
                .with_context(|| format!("Cannot start session at {}", base_url))?;

            for step in steps {
                let (verb, url) = parse_step(step);
                let request = session
                    .build_with(verb, url, |req| req)
                    .with_context(|| format!("Cannot resolve {:?}", url))?;

                let origin = request.headers().get("origin").and_then(|v| v.to_str().ok());
                let referer = request.headers().get("referer").and_then(|v| v.to_str().ok());

                if *json {
                    let line = serde_json::json!({
                        "verb": verb.to_string(),
                        "input": url,
                        "url": request.url().as_str(),
                        "origin": origin,
                        "referer": referer,
                    });
                    println!("{}", line);
                } else {
                    println!("{:<5} {}", verb, request.url());
                    println!("      origin : {}", origin.unwrap_or("-"));
                    println!("      referer: {}", referer.unwrap_or("-"));
                }
            }
        }

        Command::Run { base_url, steps } => {
            let mut session = Session::with_config(base_url, &config)
                .with_context(|| format!("Cannot start session at {}", base_url))?;

            let mut errors = 0usize;
            for step in steps {
                let (verb, url) = parse_step(step);
                match session.send_with(verb, url, |req| req).await {
                    Ok(response) => {
                        println!("{:<5} {} {}", verb, response.status().as_u16(), response.url());
                    }
                    Err(e) => {
                        info!("{} {} failed: {:#}", verb, url, e);
                        println!("{:<5} ERR {}", verb, e);
                        errors += 1;
                    }
                }
            }

            info!("Done: {} steps, {} errors", steps.len(), errors);
            if errors > 0 {
                anyhow::bail!("{} of {} steps failed", errors, steps.len());
            }
        }
    }

    Ok(())
}
