//! unreal-speech CLI — synthesize speech from the command line
//!
//! Usage:
//!   unreal-speech-cli stream <text> [--voice <id>] [--out <file>]
//!   unreal-speech-cli speech <text> [--voice <id>]
//!   unreal-speech-cli task <text> [--voice <id>]
//!   unreal-speech-cli status <task-id>

use anyhow::{bail, Context};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use unreal_speech::tts::{FnProgressSink, PollProgress};
use unreal_speech::{
    ClientConfig, SpeechClient, SpeechOptions, StreamOptions, SynthesisOptions, TaskId,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "stream" => cmd_stream(&args[2..]).await,
        "speech" => cmd_speech(&args[2..]).await,
        "task" => cmd_task(&args[2..]).await,
        "status" => cmd_status(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("unreal-speech-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"unreal-speech-cli — text-to-speech from the command line

USAGE:
    unreal-speech-cli <COMMAND> [OPTIONS]

COMMANDS:
    stream <text> [--voice <id>] [--out <file>]   Stream audio into a file (default: out.mp3)
    speech <text> [--voice <id>]                  Single-shot synthesis, print output URIs
    task <text> [--voice <id>]                    Create a synthesis task and wait for it
    status <task-id>                              Show the current state of a task
    version                                       Show version information
    help                                          Show this help message

OPTIONS:
    --config <file>             YAML client configuration

ENVIRONMENT:
    UNREAL_SPEECH_API_KEY       Bearer token
    UNREAL_SPEECH_BASE_URL      Service base URL
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg.starts_with("--") {
            skip = true;
            continue;
        }
        return Some(arg);
    }
    None
}

fn client(args: &[String]) -> anyhow::Result<SpeechClient> {
    let mut builder = SpeechClient::builder().progress_sink(Arc::new(FnProgressSink(
        |p: &PollProgress| {
            eprintln!(
                "task {} still {} ({}/{})",
                p.task_id, p.status, p.attempt, p.max_attempts
            )
        },
    )));
    if let Some(path) = flag(args, "--config") {
        let cfg = ClientConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {path}"))?;
        builder = builder.config(cfg);
    }
    Ok(builder.build()?)
}

fn text_arg(args: &[String]) -> anyhow::Result<&str> {
    match positional(args) {
        Some(t) => Ok(t),
        None => bail!("missing <text> argument"),
    }
}

async fn cmd_stream(args: &[String]) -> anyhow::Result<()> {
    let text = text_arg(args)?;
    let mut options = StreamOptions::default();
    if let Some(voice) = flag(args, "--voice") {
        options = options.with_voice(voice);
    }
    let out = flag(args, "--out").unwrap_or("out.mp3");

    let audio = client(args)?.stream(text, &options).await?;
    tokio::fs::write(out, &audio.data)
        .await
        .with_context(|| format!("writing {out}"))?;
    println!("wrote {} bytes ({}) to {}", audio.len(), audio.format.mime_type(), out);
    Ok(())
}

async fn cmd_speech(args: &[String]) -> anyhow::Result<()> {
    let text = text_arg(args)?;
    let mut options = SpeechOptions::default();
    if let Some(voice) = flag(args, "--voice") {
        options = options.with_voice(voice);
    }
    let resp = client(args)?.speech(text, &options).await?;
    for uri in &resp.output_uri {
        println!("audio: {uri}");
    }
    for uri in &resp.timestamps_uri {
        println!("timestamps: {uri}");
    }
    Ok(())
}

async fn cmd_task(args: &[String]) -> anyhow::Result<()> {
    let text = text_arg(args)?;
    let mut options = SynthesisOptions::default();
    if let Some(voice) = flag(args, "--voice") {
        options = options.with_voice(voice);
    }
    let client = client(args)?;
    let task_id = client.create_task(text, &options).await?;
    println!("task: {task_id}");
    let task = client.await_completion(&task_id).await?;
    for uri in &task.output_uri {
        println!("audio: {uri}");
    }
    Ok(())
}

async fn cmd_status(args: &[String]) -> anyhow::Result<()> {
    let Some(id) = positional(args) else {
        bail!("missing <task-id> argument");
    };
    let task = client(args)?.fetch_task(&TaskId::new(id)).await?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
