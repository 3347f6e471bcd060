//! 取消信号源
//!
//! 包装 CancellationToken，记录首个取消原因；可安装 Ctrl+C / SIGTERM 处理器，
//! 也可在给定时长后自动取消。引擎只看 token，原因供 CLI 与日志使用。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// 取消原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
    /// cancel_after 到期
    Deadline,
    Requested(String),
}

#[derive(Clone, Default)]
pub struct CancelSource {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交给 Engine::run_once 的 token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发取消；只保留第一次的原因
    pub fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().cloned()
    }

    /// 在 delay 之后取消（若此前未取消）
    pub fn cancel_after(&self, delay: Duration) {
        let source = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = source.token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    tracing::info!(?delay, "Cancel deadline reached");
                    source.cancel(CancelReason::Deadline);
                }
            }
        });
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(&self) {
        let source = self.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, cancelling run...");
                source.cancel(CancelReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let source = self.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, cancelling run...");
                    source.cancel(CancelReason::Signal);
                }
            });
        }
    }
}
