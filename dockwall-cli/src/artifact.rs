//! 산출물 파일 쓰기 -- 임시 파일에 쓴 뒤 rename으로 교체
//!
//! 같은 디렉토리에 임시 파일을 만들어 권한을 설정하고 내용을 기록한 다음
//! 대상 경로로 원자적으로 교체합니다. 읽는 쪽은 이전 파일이나 새 파일 중
//! 하나만 보게 됩니다.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

/// 산출물 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// 실행 가능한 셸 스크립트 (0755)
    Script,
    /// `iptables-restore` 입력 (0644)
    Restore,
}

impl ArtifactFormat {
    /// 파일 권한 비트
    pub fn mode(&self) -> u32 {
        match self {
            Self::Script => 0o755,
            Self::Restore => 0o644,
        }
    }
}

/// 산출물을 원자적으로 기록합니다.
///
/// # Errors
///
/// 임시 파일 생성, 권한 설정, 쓰기, rename 중 하나라도 실패하면 I/O 에러를 반환합니다.
pub async fn write_artifact(
    path: &Path,
    content: &str,
    format: ArtifactFormat,
) -> std::io::Result<()> {
    let path = path.to_path_buf();
    let content = content.to_owned();

    tokio::task::spawn_blocking(move || write_atomic(&path, &content, format))
        .await
        .map_err(std::io::Error::other)?
}

fn write_atomic(path: &Path, content: &str, format: ArtifactFormat) -> std::io::Result<()> {
    let dir = parent_dir(path);
    let mut temp = NamedTempFile::new_in(&dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(format.mode());
        temp.as_file().set_permissions(perms)?;
    }

    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(
        path = %path.display(),
        bytes = content.len(),
        mode = %format!("{:o}", format.mode()),
        "artifact written"
    );
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
