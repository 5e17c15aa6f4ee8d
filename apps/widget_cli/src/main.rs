use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::{JoinHandle, JoinSet},
};
use tracing_subscriber::EnvFilter;
use widget_core::{
    load_settings, DispatchOutcome, FileSessionStorage, HttpWidgetApi, ImageUpload,
    MemorySessionStorage, SessionStorage, UiAction, WidgetController,
};

mod render;

#[derive(Parser, Debug)]
#[command(about = "Terminal front-end for the fish chat widget")]
struct Args {
    /// Settings file; defaults to ./widget.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    /// Keep the session id in this file so later runs continue the conversation.
    #[arg(long)]
    session_file: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Action(UiAction),
    Image(PathBuf),
    Help,
    Quit,
}

fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some(("/image", path)) => Command::Image(PathBuf::from(path.trim())),
        _ => match trimmed {
            "/quit" | "/exit" => Command::Quit,
            "/help" => Command::Help,
            "/toggle" => Command::Action(UiAction::Toggle),
            "/close" => Command::Action(UiAction::Close),
            _ => Command::Action(UiAction::Submit(line.to_string())),
        },
    }
}

async fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(ImageUpload {
        bytes,
        file_name,
        mime_type,
    })
}

/// Waits for sends already in flight, then closes the event channel so the
/// renderer prints whatever is still queued before it returns.
async fn finish_session<W>(
    controller: WidgetController,
    mut in_flight: JoinSet<Option<DispatchOutcome>>,
    status_probe: JoinHandle<()>,
    renderer: JoinHandle<io::Result<W>>,
) -> Result<W> {
    while let Some(done) = in_flight.join_next().await {
        done.context("widget task panicked")?;
    }
    // A stalled status probe would otherwise keep the channel open.
    status_probe.abort();
    let _ = status_probe.await;
    drop(controller);

    renderer
        .await
        .context("renderer task panicked")?
        .context("failed to write to the terminal")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("failed to load widget settings")?;
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(path) = args.session_file {
        settings.session_file = Some(path);
    }

    let api = HttpWidgetApi::new(&settings.api_base_url)?;
    let storage: Arc<dyn SessionStorage> = match &settings.session_file {
        Some(path) => Arc::new(FileSessionStorage::open(path)),
        None => Arc::new(MemorySessionStorage::default()),
    };
    let controller = WidgetController::new(Arc::new(api), storage, &settings);

    let renderer = tokio::spawn(render::run(
        controller.subscribe_events(),
        settings.assistant_name.clone(),
        io::stdout(),
    ));
    let status_probe = controller.mount().await;
    controller.toggle().await;

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        while let Some(done) = in_flight.try_join_next() {
            done.context("widget task panicked")?;
        }

        let action = match parse_line(&line) {
            Command::Quit => break,
            Command::Help => {
                println!("{}", render::HELP);
                continue;
            }
            Command::Image(path) => match read_image(&path).await {
                Ok(upload) => UiAction::UploadImage(upload),
                Err(err) => {
                    eprintln!("{err:#}");
                    continue;
                }
            },
            Command::Action(action) => action,
        };

        let needs_open = matches!(action, UiAction::Submit(_) | UiAction::UploadImage(_));
        if needs_open && !controller.is_open().await {
            println!("chat is closed; type /toggle to open it");
            continue;
        }
        let worker = controller.clone();
        in_flight.spawn(async move { worker.handle(action).await });
    }

    let mut stdout = finish_session(controller, in_flight, status_probe, renderer).await?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use shared::protocol::{ChatRequest, ChatResponse, ClassifyRequest, ClassifyResponse};
    use widget_core::{ApiError, WidgetSettings};

    struct SlowStatusApi;

    #[async_trait]
    impl widget_core::WidgetApi for SlowStatusApi {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
            tokio::task::yield_now().await;
            Ok(ChatResponse::reply(format!("re: {}", request.message)))
        }

        async fn classify(
            &self,
            _request: ClassifyRequest,
        ) -> Result<ClassifyResponse, ApiError> {
            Ok(ClassifyResponse::failure("not used"))
        }

        async fn model_status(&self) -> Result<serde_json::Value, ApiError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn replies_in_flight_at_eof_are_still_rendered() {
        let settings = WidgetSettings {
            welcome_message: None,
            assistant_name: "FishAI".to_string(),
            ..WidgetSettings::default()
        };
        let controller = WidgetController::new(
            Arc::new(SlowStatusApi),
            Arc::new(MemorySessionStorage::default()),
            &settings,
        );
        let renderer = tokio::spawn(render::run(
            controller.subscribe_events(),
            settings.assistant_name.clone(),
            Vec::new(),
        ));
        let status_probe = controller.mount().await;

        let mut in_flight = JoinSet::new();
        let worker = controller.clone();
        in_flight.spawn(async move {
            worker
                .handle(UiAction::Submit("what is puti".to_string()))
                .await
        });

        let out = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            finish_session(controller, in_flight, status_probe, renderer),
        )
        .await
        .expect("shutdown must not hang on the status probe")
        .expect("finish session");

        let rendered = String::from_utf8(out).expect("utf8");
        assert!(
            rendered.ends_with("FishAI: re: what is puti\n"),
            "{rendered}"
        );
    }

    #[test]
    fn slash_commands_map_to_actions() {
        assert_eq!(parse_line("/quit"), Command::Quit);
        assert_eq!(parse_line(" /help "), Command::Help);
        assert_eq!(parse_line("/toggle"), Command::Action(UiAction::Toggle));
        assert_eq!(parse_line("/close"), Command::Action(UiAction::Close));
        assert_eq!(
            parse_line("/image ./photos/betta 1.png"),
            Command::Image(PathBuf::from("./photos/betta 1.png"))
        );
    }

    #[test]
    fn other_lines_are_sent_untouched() {
        assert_eq!(
            parse_line("  tell me about Puti  "),
            Command::Action(UiAction::Submit("  tell me about Puti  ".to_string()))
        );
    }

    #[tokio::test]
    async fn image_mime_type_is_guessed_from_extension() {
        let dir = std::env::temp_dir().join(format!("widget_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("betta.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).expect("write");

        let upload = read_image(&path).await.expect("read");
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.file_name, "betta.jpg");
        assert_eq!(upload.bytes, vec![0xFF, 0xD8, 0xFF]);

        std::fs::remove_dir_all(dir).expect("cleanup");
    }
}
