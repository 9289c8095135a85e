// Pager
// Pipes text through an external pager process and waits for it to exit

use super::MetaError;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run `command` (a shell-style command line) with `text` on its stdin.
///
/// Spawn failures are reported before anything is written. Write errors are
/// ignored since the user may quit the pager early; closing the pipe and the
/// pager's exit status are reported.
pub async fn page(command: &str, text: &str) -> Result<(), MetaError> {
    let argv = shell_words::split(command)
        .map_err(|e| MetaError::PagerSpawn(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| MetaError::PagerSpawn(io::Error::new(io::ErrorKind::InvalidInput, "empty pager command")))?;

    debug!(pager = %program, "spawning pager");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(MetaError::PagerSpawn)?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(text.as_bytes()).await {
            debug!(error = %e, "pager stopped reading");
        }
        stdin.shutdown().await.map_err(MetaError::PagerIo)?;
    }

    let status = child.wait().await.map_err(MetaError::PagerIo)?;
    if !status.success() {
        warn!(%status, "pager exited unsuccessfully");
        return Err(MetaError::PagerIo(io::Error::new(
            io::ErrorKind::Other,
            format!("pager exited with {}", status),
        )));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipes_through_pager() {
        page("cat", "hello\n").await.unwrap();
        page("sh -c 'cat > /dev/null'", "hello\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = page("definitely-not-a-pager-7f3a", "x").await.unwrap_err();
        assert!(matches!(err, MetaError::PagerSpawn(_)));
        let err = page("less 'unterminated", "x").await.unwrap_err();
        assert!(matches!(err, MetaError::PagerSpawn(_)));
        let err = page("   ", "x").await.unwrap_err();
        assert!(matches!(err, MetaError::PagerSpawn(_)));
    }

    #[tokio::test]
    async fn test_failed_exit_is_pager_error() {
        let err = page("false", "x").await.unwrap_err();
        assert!(matches!(err, MetaError::PagerIo(_)));
    }
}
