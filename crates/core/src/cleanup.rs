//! 정리 스택 — 생성 직후 등록되는 지연 해제 동작
//!
//! 리소스를 생성하는 즉시 그 삭제 동작을 [`CleanupStack::push`]로 등록하고,
//! 시나리오가 어떤 경로로 끝나든 [`CleanupStack::pop`]으로 등록의 역순(LIFO)으로
//! 하나씩 꺼내 [`PendingCleanup::run`]을 실행합니다. 호출자는 동작마다 별도의 제한
//! 시간을 걸 수 있고, 한 동작이 실패하거나 멈춰도 나머지 동작은 계속 실행됩니다.
//!
//! ```ignore
//! let mut cleanups = CleanupStack::new();
//! cleanups.push("encryption class", move || async move { crypto.delete(&class).await });
//! cleanups.push("claim", move || async move { cluster.delete_claim(&ns, &name).await });
//! // claim → encryption class 순서로 실행
//! while let Some(cleanup) = cleanups.pop() {
//!     cleanup.run().await?;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, error, warn};

use crate::error::HarnessError;
use crate::metrics as m;

/// `Send` 가능한 박싱된 Future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CleanupAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HarnessError>> + Send>;

/// 스택에서 꺼낸 단일 정리 동작
pub struct PendingCleanup {
    label: String,
    action: CleanupAction,
}

impl PendingCleanup {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 동작을 실행하고 결과를 메트릭에 기록합니다.
    pub async fn run(self) -> Result<(), HarnessError> {
        debug!(cleanup = %self.label, "running cleanup");
        let result = (self.action)().await;
        match &result {
            Ok(()) => {
                metrics::counter!(m::HARNESS_CLEANUPS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
            }
            Err(e) => {
                error!(cleanup = %self.label, error = %e, "cleanup failed");
                metrics::counter!(m::HARNESS_CLEANUPS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
            }
        }
        result
    }
}

impl std::fmt::Debug for PendingCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCleanup")
            .field("label", &self.label)
            .finish()
    }
}

/// 역순으로 실행되는 정리 동작 스택
#[derive(Default)]
pub struct CleanupStack {
    entries: Vec<PendingCleanup>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 정리 동작을 등록합니다. 나중에 등록된 동작이 먼저 실행됩니다.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let label = label.into();
        debug!(cleanup = %label, depth = self.entries.len() + 1, "cleanup registered");
        self.entries.push(PendingCleanup {
            label,
            action: Box::new(move || Box::pin(action())),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 실행 예정 순서의 라벨 목록
    pub fn pending(&self) -> Vec<&str> {
        self.entries.iter().rev().map(|e| e.label.as_str()).collect()
    }

    /// 가장 최근에 등록된 동작을 꺼냅니다.
    pub fn pop(&mut self) -> Option<PendingCleanup> {
        self.entries.pop()
    }
}

impl Drop for CleanupStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                pending = ?self.pending(),
                "cleanup stack dropped with pending actions"
            );
        }
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("pending", &self.pending())
            .finish()
    }
}
