//! Chat command - ask the gateway for fitness guidance.

use anyhow::Result;
use clap::Args;
use gateway_sdk::{ChatSession, Client, ProviderIdentity, TurnOutcome};
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message to send (if not provided, reads from stdin)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Content type selecting the guardrail policy
    #[arg(short = 'c', long, default_value = "general")]
    pub content_type: String,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Wait for the whole answer instead of streaming tokens
    #[arg(long)]
    pub no_stream: bool,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Never offer to retry a failed turn
    #[arg(long)]
    pub no_retry: bool,
}

/// One answered turn, for JSON output.
#[derive(Debug, Serialize)]
pub struct ChatOutput {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderIdentity>,
    pub fell_back: bool,
}

/// Execute the chat command.
pub async fn execute(
    args: ChatArgs,
    base_url: &str,
    api_key: Option<&str>,
    json: bool,
) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let client = build_client(base_url, api_key, &args.content_type)?;

    if args.interactive {
        run_interactive_mode(client, &args).await
    } else if args.no_stream || format == OutputFormat::Json {
        run_whole(&client, &args, format).await
    } else {
        run_single_message(client, &args).await
    }
}

fn build_client(base_url: &str, api_key: Option<&str>, content_type: &str) -> Result<Client> {
    let builder = Client::builder()
        .base_url(base_url)
        .default_content_type(content_type);

    let builder = if let Some(key) = api_key {
        builder.api_key(key)
    } else {
        builder
    };

    Ok(builder.build()?)
}

fn read_message(args: &ChatArgs) -> Result<String> {
    if let Some(ref msg) = args.message {
        return Ok(msg.clone());
    }
    Ok(output::read_line()?.unwrap_or_default())
}

fn new_session(client: Client, args: &ChatArgs) -> ChatSession<Client> {
    let session = ChatSession::new(client).with_content_type(args.content_type.clone());
    match &args.system {
        Some(system) => session.with_system(system.clone()),
        None => session,
    }
}

/// Stream one turn, echoing tokens. `None` retries the last turn.
async fn stream_turn(
    session: &mut ChatSession<Client>,
    prompt: Option<&str>,
) -> (TurnOutcome, String) {
    let mut shown = String::new();
    let on_token = |token: &str| {
        output::stream_text(token);
        shown.push_str(token);
    };
    let outcome = match prompt {
        Some(prompt) => session.send(prompt, on_token).await,
        None => session.retry_last(on_token).await,
    };
    (outcome, shown)
}

/// Report a turn. Returns `true` when the turn failed.
fn report(outcome: &TurnOutcome, shown: &str) -> bool {
    match outcome {
        TurnOutcome::Completed {
            text,
            provider,
            fell_back,
        } => {
            output::stream_newline();
            if text != shown {
                output::info("Filtered answer:");
                println!("{text}");
            }
            if *fell_back {
                let via = provider.map_or("secondary", ProviderIdentity::as_str);
                output::info(&format!("answered by the {via} model"));
            }
            false
        }
        TurnOutcome::Interrupted { message, .. } => {
            output::stream_newline();
            output::warning(&format!("response interrupted: {message}"));
            true
        }
        TurnOutcome::Failed { message } => {
            output::error(&format!("request failed: {message}"));
            true
        }
    }
}

/// Stream one message, offering retries after failures.
async fn run_single_message(client: Client, args: &ChatArgs) -> Result<()> {
    let message = read_message(args)?;
    if message.is_empty() {
        output::error("No message provided");
        return Ok(());
    }

    let mut session = new_session(client, args);
    let (mut outcome, mut shown) = stream_turn(&mut session, Some(&message)).await;

    while report(&outcome, &shown) {
        if args.no_retry || !output::offer_retry()? {
            anyhow::bail!("chat turn did not complete");
        }
        (outcome, shown) = stream_turn(&mut session, None).await;
    }

    Ok(())
}

/// Ask once and wait for the whole, cleared answer.
async fn run_whole(client: &Client, args: &ChatArgs, format: OutputFormat) -> Result<()> {
    let message = read_message(args)?;
    if message.is_empty() {
        CommandResult::<()>::failure("No message provided").print(format)?;
        return Ok(());
    }

    let mut builder = client.request(message);
    if let Some(system) = &args.system {
        builder = builder.system(system.clone());
    }
    let mut request = builder.build()?;

    loop {
        let spinner =
            (format == OutputFormat::Text).then(|| output::spinner("Generating response..."));
        let result = client.generate(&request).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match result {
            Ok(result) => {
                match format {
                    OutputFormat::Json => CommandResult::success(ChatOutput {
                        text: result.text,
                        provider: Some(result.provider_used),
                        fell_back: result.fell_back,
                    })
                    .print(format)?,
                    OutputFormat::Text => println!("{}", result.text),
                }
                return Ok(());
            }
            Err(e) => {
                let message = match e.provider() {
                    Some(provider) if e.is_provider_failure() => {
                        format!("request failed: {e} (last tried the {provider} model)")
                    }
                    _ => format!("request failed: {e}"),
                };
                if format == OutputFormat::Json {
                    CommandResult::<ChatOutput>::failure(message).print(format)?;
                    anyhow::bail!("request failed");
                }
                output::error(&message);
                if args.no_retry || !e.is_retryable() || !output::offer_retry()? {
                    anyhow::bail!("request failed");
                }
                request = request.retry();
            }
        }
    }
}

/// Run interactive chat mode.
async fn run_interactive_mode(client: Client, args: &ChatArgs) -> Result<()> {
    output::info(&format!(
        "Interactive chat ({}), type 'exit' to quit",
        args.content_type
    ));
    if let Some(ref system) = args.system {
        output::info(&format!("System: {system}"));
    }
    println!();

    let mut session = new_session(client, args);

    loop {
        output::speaker("You")?;
        let Some(input) = output::read_line()? else {
            break;
        };
        let input = input.as_str();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            output::info("Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        output::speaker("Coach")?;
        let (mut outcome, mut shown) = stream_turn(&mut session, Some(input)).await;

        while report(&outcome, &shown) && !args.no_retry && output::offer_retry()? {
            output::speaker("Coach")?;
            (outcome, shown) = stream_turn(&mut session, None).await;
        }

        println!();
    }

    Ok(())
}
