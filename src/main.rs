//! # QQMusic-Oxide 入口
//!
//! 通过标准输入输出提供QQ音乐工具：每行一个 JSON 请求，每行一个 JSON 回复。
//!
//! ## 主要功能
//! - 加载配置并初始化日志（日志写到 stderr，stdout 只用于回复）
//! - 逐行读取请求并分发到对应工具
//! - 收到 SIGINT/SIGTERM 或输入结束时关闭浏览器会话
//!
//! ## 环境变量
//! - `QQMUSIC_CONFIG`: TOML 配置文件路径（未设置时从环境变量读取配置）
//! - `QQMUSIC_PROFILE_DIR`: 浏览器用户目录（默认: browser_data）
//! - `QQMUSIC_HEADLESS`: 是否无头模式（默认: false）
//! - `RUST_LOG` / `QQMUSIC_LOG_LEVEL`: 日志级别（默认: info）

use anyhow::Context;
use qqmusic_oxide::{config::Config, portal::MusicPortal, transport};
use tokio::io::BufReader;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `RUST_LOG` directives win over the configured level
fn log_filter(rust_log: Option<&str>, configured: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            let level = configured.parse::<Level>().unwrap_or(Level::INFO);
            EnvFilter::new(level.to_string())
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("QQMUSIC_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading configuration from environment")?,
    };

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(rust_log.as_deref(), &config.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    info!("QQMusic-Oxide v{}", qqmusic_oxide::VERSION);
    info!(
        "Profile directory: {}, headless: {}",
        config.profile_dir.display(),
        config.headless
    );

    let portal = MusicPortal::from_config(&config);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = transport::serve(&portal, stdin, stdout) => {
            if let Err(e) = result {
                error!("Transport failed: {}", e);
            }
            info!("Input closed");
        }
        _ = shutdown_signal() => {}
    }

    info!("Closing browser session...");
    portal.session().close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT/SIGTERM; never resolves when signals cannot be watched
async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        error!("Failed to listen for shutdown signals: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM signal"),
            _ = sigint.recv() => info!("Received SIGINT signal"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C signal");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(log_filter(None, "debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(None, "loud").max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("qqmusic_oxide=trace"), "warn").max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(log_filter(Some("qqmusic_oxide=loudest"), "warn").max_level_hint(), Some(LevelFilter::WARN));
    }
}
