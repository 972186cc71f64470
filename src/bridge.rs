//! Editor bridge
//!
//! The editor host forwards its callbacks as JSON lines, one [`EditorEvent`]
//! per line. Malformed lines are logged and skipped. End of input means the
//! host deactivated the extension.

use super::engine::EngineInput;
use super::EditorEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Parse one bridge line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<Result<EditorEvent, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Forward editor events from `reader` until EOF, then request shutdown.
///
/// Lines that are not valid UTF-8 are skipped like any other malformed line.
/// A read error ends the bridge the same way EOF does.
pub async fn forward_events<R>(reader: R, tx: mpsc::Sender<EngineInput>)
where
    R: AsyncBufRead + Unpin,
{
    let mut segments = reader.split(b'\n');
    let mut forwarded = 0u64;

    loop {
        let bytes = match segments.next_segment().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                warn!("Editor bridge read failed: {}", e);
                break;
            }
        };

        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
                warn!("Skipping non UTF-8 editor event: {}", truncate(&lossy, 80));
                continue;
            }
        };

        match parse_line(&line) {
            None => continue,
            Some(Ok(event)) => {
                debug!("Editor event: {:?}", event);
                forwarded += 1;
                if tx.send(EngineInput::Editor(event)).await.is_err() {
                    return;
                }
            }
            Some(Err(e)) => {
                warn!("Skipping malformed editor event: {} ({})", truncate(&line, 80), e)
            }
        }
    }

    info!("Editor bridge closed after {} events", forwarded);
    let _ = tx.send(EngineInput::Shutdown).await;
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_skips_garbage_and_shuts_down() {
        let input = concat!(
            "{\"type\":\"focus_change\",\"focused\":false}\n",
            "not json\n",
            "\n",
            "{\"type\":\"selection_change\",\"uri\":\"file:///a.rs\",\"selected\":10}\n",
        );
        let (tx, mut rx) = mpsc::channel(8);
        forward_events(input.as_bytes(), tx).await;

        assert_eq!(
            rx.recv().await,
            Some(EngineInput::Editor(EditorEvent::FocusChange { focused: false }))
        );
        assert_eq!(
            rx.recv().await,
            Some(EngineInput::Editor(EditorEvent::SelectionChange {
                uri: "file:///a.rs".to_string(),
                selected: 10,
            }))
        );
        assert_eq!(rx.recv().await, Some(EngineInput::Shutdown));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let input: &[u8] = b"{\"type\":\"focus_change\",\"focused\":false}\n\
            \xff\xfe garbage\n\
            {\"type\":\"focus_change\",\"focused\":true}\n";
        let (tx, mut rx) = mpsc::channel(8);
        forward_events(input, tx).await;

        assert_eq!(
            rx.recv().await,
            Some(EngineInput::Editor(EditorEvent::FocusChange { focused: false }))
        );
        assert_eq!(
            rx.recv().await,
            Some(EngineInput::Editor(EditorEvent::FocusChange { focused: true }))
        );
        assert_eq!(rx.recv().await, Some(EngineInput::Shutdown));
    }

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ").is_none());
        assert!(matches!(
            parse_line("{\"type\":\"configuration_changed\"}"),
            Some(Ok(EditorEvent::ConfigurationChanged))
        ));
        assert!(matches!(parse_line("{\"type\":\"teleport\"}"), Some(Err(_))));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h...");
        assert_eq!(truncate("short", 80), "short");
    }
}
