use std::io::{self, Write};

use cerebras_provider::{
    CerebrasAdapter, ChatRequest, Message, ProviderAdapter, ProviderConfig, StreamEvent,
};
use futures::StreamExt;

struct CliConfig {
    model: String,
    max_tokens: Option<u32>,
    stream: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = parse_config(std::env::args().skip(1).collect())?;
    let adapter = CerebrasAdapter::new()?;
    let provider_config = ProviderConfig::new(
        std::env::var("CEREBRAS_API_KEY").unwrap_or_default(),
    );

    eprintln!(
        "chat_cli: model={}, stream={}, commands=/exit /quit /clear",
        config.model, config.stream
    );

    let mut history: Vec<Message> = Vec::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        let bytes = stdin.read_line(&mut input)?;
        if bytes == 0 {
            break;
        }

        let user_text = input.trim();
        if user_text.is_empty() {
            continue;
        }

        if user_text.eq_ignore_ascii_case("/exit") || user_text.eq_ignore_ascii_case("/quit") {
            break;
        }

        if user_text.eq_ignore_ascii_case("/clear") {
            history.clear();
            println!("(history cleared)");
            continue;
        }

        let checkpoint_len = history.len();
        history.push(Message::user(user_text));

        let mut request = ChatRequest::new(config.model.clone(), history.clone());
        request.max_tokens = config.max_tokens;

        let assistant_text = if config.stream {
            run_streaming_turn(&adapter, &provider_config, &request).await
        } else {
            run_turn(&adapter, &provider_config, &request).await
        };

        match assistant_text {
            Ok(text) => {
                history.push(Message::assistant(text));
            }
            Err(error) => {
                eprintln!("error: {error}");
                history.truncate(checkpoint_len);
            }
        }
    }

    Ok(())
}

async fn run_turn(
    adapter: &CerebrasAdapter,
    config: &ProviderConfig,
    request: &ChatRequest,
) -> Result<String, Box<dyn std::error::Error>> {
    let response = adapter.chat(config, request).await?;
    let text = response.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        println!("[empty assistant output; finish_reason={:?}]", response.finish_reason);
    } else {
        println!("{text}");
    }
    Ok(text)
}

async fn run_streaming_turn(
    adapter: &CerebrasAdapter,
    config: &ProviderConfig,
    request: &ChatRequest,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut events = adapter.chat_stream(config, request).await?;
    let mut collected = String::new();

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Delta(delta) => {
                if let Some(content) = delta.content {
                    print!("{content}");
                    io::stdout().flush()?;
                    collected.push_str(&content);
                }
            }
            StreamEvent::Completed { finish_reason, usage } => {
                println!();
                eprintln!(
                    "[done; finish_reason={finish_reason:?}, total_tokens={}]",
                    usage.derived_total_tokens()
                );
            }
        }
    }

    Ok(collected)
}

fn parse_config(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut model = std::env::var("CEREBRAS_CLI_MODEL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "llama3.1-8b".to_string());

    let mut max_tokens = std::env::var("CEREBRAS_CLI_MAX_TOKENS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok());

    let mut stream = true;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--model" => {
                let value = args
                    .get(i + 1)
                    .ok_or("missing value for --model")?
                    .trim()
                    .to_string();
                if value.is_empty() {
                    return Err("--model must be non-empty".into());
                }
                model = value;
                i += 2;
            }
            "--max-tokens" => {
                let value = args.get(i + 1).ok_or("missing value for --max-tokens")?;
                max_tokens = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| "--max-tokens must be a positive integer")?,
                );
                i += 2;
            }
            "--no-stream" => {
                stream = false;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }

    Ok(CliConfig {
        model,
        max_tokens,
        stream,
    })
}

fn print_help() {
    println!(
        "Usage:\n  cargo run --bin chat_cli -- [--model MODEL] [--max-tokens N] [--no-stream]\n\nEnv:\n  CEREBRAS_API_KEY\n  CEREBRAS_CLI_MODEL\n  CEREBRAS_CLI_MAX_TOKENS\n\nCommands:\n  /clear   clear conversation history\n  /exit    quit\n  /quit    quit"
    );
}
