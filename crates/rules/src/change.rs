//! 변경 감지 -- 조립된 출력의 SHA-256을 기준값과 비교
//!
//! 기준값은 두 가지입니다.
//! - 산출물 파일 경로가 있으면 그 파일 내용의 해시
//! - 없으면 직전 패스 출력의 해시 (메모리 보관)
//!
//! 파일을 읽지 못하면(없음 제외) 경고를 남기고 "변경됨"으로 취급합니다.
//!
//! 평가는 기준값을 바꾸지 않습니다. 호출자는 동작이 성공한 뒤에만
//! [`ChangeDetector::commit`]으로 기준값을 확정하고, 실패하면
//! [`ChangeDetector::mark_failed`]로 다음 평가를 "변경됨"으로 만듭니다.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// 출력 내용의 SHA-256 다이제스트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputDigest([u8; 32]);

impl OutputDigest {
    /// 바이트열의 다이제스트를 계산합니다.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for OutputDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// 변경으로 판정된 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// 비교할 기준값이 없음 (첫 패스 또는 산출물 파일 없음)
    NoBaseline,
    /// 기준값과 해시가 다름
    Differs,
    /// 산출물 파일을 읽지 못함
    BaselineUnreadable,
    /// 직전 동작이 실패해 다시 시도해야 함
    RetryAfterFailure,
}

/// 변경 감지 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Changed(ChangeReason),
    Unchanged,
}

impl ChangeStatus {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// 한 번의 평가 결과와 확정할 다이제스트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: ChangeStatus,
    pub digest: OutputDigest,
}

#[derive(Debug, Clone)]
enum Baseline {
    File(PathBuf),
    Memory(Option<OutputDigest>),
}

/// 출력 변경 감지기
///
/// 모니터 모드에서는 패스마다 같은 감지기를 재사용합니다.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    baseline: Baseline,
    retry: bool,
}

impl ChangeDetector {
    /// 산출물 파일 내용을 기준값으로 사용합니다.
    pub fn with_artifact(path: impl Into<PathBuf>) -> Self {
        Self {
            baseline: Baseline::File(path.into()),
            retry: false,
        }
    }

    /// 직전 패스의 출력을 기준값으로 사용합니다.
    pub fn in_memory() -> Self {
        Self {
            baseline: Baseline::Memory(None),
            retry: false,
        }
    }

    /// 산출물 경로가 있으면 파일 기준, 없으면 메모리 기준 감지기를 만듭니다.
    pub fn for_output(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::with_artifact(path),
            None => Self::in_memory(),
        }
    }

    /// 새 출력을 기준값과 비교합니다.
    ///
    /// 기준값은 그대로 둡니다. 직전 동작이 실패했다면 내용과 관계없이
    /// `RetryAfterFailure`를 반환합니다.
    pub async fn evaluate(&self, output: &str) -> Evaluation {
        let digest = OutputDigest::of(output.as_bytes());

        let status = if self.retry {
            ChangeStatus::Changed(ChangeReason::RetryAfterFailure)
        } else {
            match &self.baseline {
                Baseline::File(path) => compare_with_file(path, digest).await,
                Baseline::Memory(None) => ChangeStatus::Changed(ChangeReason::NoBaseline),
                Baseline::Memory(Some(prev)) if *prev == digest => ChangeStatus::Unchanged,
                Baseline::Memory(Some(_)) => ChangeStatus::Changed(ChangeReason::Differs),
            }
        };

        debug!(%digest, changed = status.is_changed(), "output change evaluated");
        Evaluation { status, digest }
    }

    /// 성공한 동작의 출력을 기준값으로 확정합니다.
    ///
    /// 파일 기준값은 산출물 쓰기가 곧 갱신이므로 재시도 표시만 지웁니다.
    pub fn commit(&mut self, digest: OutputDigest) {
        if let Baseline::Memory(previous) = &mut self.baseline {
            *previous = Some(digest);
        }
        self.retry = false;
    }

    /// 동작이 실패했음을 기록합니다. 다음 평가는 "변경됨"이 됩니다.
    pub fn mark_failed(&mut self) {
        self.retry = true;
    }
}

async fn compare_with_file(path: &Path, current: OutputDigest) -> ChangeStatus {
    match tokio::fs::read(path).await {
        Ok(existing) => {
            if OutputDigest::of(&existing) == current {
                ChangeStatus::Unchanged
            } else {
                ChangeStatus::Changed(ChangeReason::Differs)
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            ChangeStatus::Changed(ChangeReason::NoBaseline)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to read previous artifact, treating output as changed"
            );
            ChangeStatus::Changed(ChangeReason::BaselineUnreadable)
        }
    }
}
