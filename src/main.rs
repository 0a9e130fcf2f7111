use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dialoguer::{Confirm, Password};
use gesture_studio::api::{ApiClient, AuthClient, GestureRegistryClient, TrainerClient};
use gesture_studio::camera::FolderCamera;
use gesture_studio::cli::{Cli, Commands};
use gesture_studio::config::Config;
use gesture_studio::events::{self, EventSink};
use gesture_studio::stream::{PredictionStreamClient, WsConnector};
use gesture_studio::training::TrainingProgressSimulator;
use gesture_studio::{logging, ui, CameraModeController};
use gesture_studio_common::ACTIONS;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    let config = Config::load()?;

    let (events, rx) = events::channel();
    let renderer = tokio::spawn(ui::render_events(rx));

    // events はここで消費され、コマンド終了時に送信側がすべて閉じる
    run(cli.command, config, events).await?;

    let summary = renderer.await.context("表示タスクが異常終了しました")?;
    if summary.errors > 0 {
        anyhow::bail!("{}件のエラーが発生しました", summary.errors);
    }
    Ok(())
}

async fn run(command: Commands, mut config: Config, events: EventSink) -> anyhow::Result<()> {
    let session = config.session();
    let api = ApiClient::new(config.request_timeout())?;

    match command {
        Commands::Login { email, password } => {
            let password = prompt_password(password)?;
            let auth = AuthClient::new(api, session);
            let logged_in = auth.login(&email, &password).await?;
            let token = logged_in.require_token()?.to_string();
            config.set_token(token)?;
            println!("✔ ログインしました");
        }

        Commands::Signup { email, password } => {
            let password = prompt_password(password)?;
            let auth = AuthClient::new(api, session);
            let message = auth.signup(&email, &password).await?;
            println!("✔ {}", message);
        }

        Commands::Logout => {
            config.clear_token()?;
            println!("✔ ログアウトしました");
        }

        Commands::List => {
            let registry = GestureRegistryClient::new(api, session);
            print_gestures(&registry).await?;
        }

        Commands::Delete { name, yes } => {
            let registry = GestureRegistryClient::new(api, session);
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("ジェスチャー「{}」を削除しますか？", name))
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("キャンセルしました");
                return Ok(());
            }

            registry.delete(&name).await?;
            println!("✔ 削除しました: {}", name);
            print_gestures(&registry).await?;
        }

        Commands::Actions => {
            println!("アクション:");
            for action in ACTIONS {
                println!("  {}", action);
            }
        }

        Commands::Collect {
            name,
            action,
            frames,
        } => {
            let camera = Arc::new(FolderCamera::open(&frames)?);
            println!("✔ {}枚のフレームを読み込み\n", camera.len());

            let registry = Arc::new(GestureRegistryClient::new(api, session.clone()));
            let stream =
                PredictionStreamClient::new(Arc::new(WsConnector), session, events.clone());
            let controller = CameraModeController::new(
                camera,
                registry,
                stream,
                events,
                config.capture_timing(),
            );

            // 失敗は通知として表示される
            if controller.enter_collect(&name, &action).await.is_ok() {
                controller.wait_idle().await;
            }
            controller.exit().await;
        }

        Commands::Predict { frames, seconds } => {
            let camera = Arc::new(FolderCamera::open(&frames)?);
            let registry = Arc::new(GestureRegistryClient::new(api, session.clone()));
            let stream =
                PredictionStreamClient::new(Arc::new(WsConnector), session, events.clone());
            let controller = CameraModeController::new(
                camera,
                registry,
                stream,
                events,
                config.capture_timing(),
            );

            if controller.enter_predict().await.is_ok() {
                println!("Ctrl+Cで終了します");
                let limit = async {
                    match seconds {
                        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = limit => {}
                    _ = controller.wait_idle() => {}
                }
            }
            controller.exit().await;

            let snapshot = controller.stream_snapshot().await;
            if let Some(prediction) = snapshot.last_prediction {
                println!("最後の予測: {}", prediction);
            }
        }

        Commands::Retrain => {
            let trainer = TrainerClient::new(api, session);
            let simulator = TrainingProgressSimulator::new(events);
            // 失敗は通知として表示される
            if let Ok(response) = simulator.run(trainer.retrain()).await {
                if !response.classes.is_empty() {
                    println!("クラス: {}", response.classes.join(", "));
                }
            }
        }

        Commands::Config { set_base_url, show } => {
            if let Some(base_url) = set_base_url {
                config.set_base_url(base_url)?;
                println!("✔ ベースURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  ベースURL: {}", config.base_url);
                println!("  タイムアウト: {}秒", config.request_timeout_seconds);
                println!("  カメラ起動待ち: {}ms", config.capture_mount_delay_ms);
                println!(
                    "  トークン: {}",
                    if config.token.is_some() { "設定済み" } else { "未設定" }
                );
            }
        }
    }

    Ok(())
}

fn prompt_password(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Ok(Password::new().with_prompt("パスワード").interact()?),
    }
}

async fn print_gestures(registry: &GestureRegistryClient) -> anyhow::Result<()> {
    let gestures = registry.list().await?;
    if gestures.is_empty() {
        println!("登録済みのジェスチャーはありません");
        return Ok(());
    }

    println!("登録済みジェスチャー ({}件):", gestures.len());
    for record in gestures {
        println!("  {} → {}", record.gesture_name, record.action);
    }
    Ok(())
}
