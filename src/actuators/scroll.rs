use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::hardware::{fit_line, CharDisplay};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Successive one-character shifts of a `width`-wide window over `text`.
/// Text that already fits yields a single padded frame.
pub fn scroll_frames(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return vec![fit_line(text, width)];
    }

    (0..=chars.len() - width)
        .map(|start| chars[start..start + width].iter().collect())
        .collect()
}

/// Scrolls `text` across `line`, holding the first frame for `pause` and each
/// later frame for `delay`, repeating until cancelled. Leaves the first frame
/// on the display when it returns.
pub async fn scroll_loop(
    display: Arc<dyn CharDisplay>,
    line: usize,
    text: String,
    delay: Duration,
    pause: Duration,
    cancel_token: CancellationToken,
) {
    let frames = scroll_frames(&text, display.width());
    let mut passes: u64 = 0;

    'passes: loop {
        for (index, frame) in frames.iter().enumerate() {
            show(display.as_ref(), line, frame);
            let hold = if index == 0 { pause } else { delay };
            tokio::select! {
                _ = tokio::time::sleep(hold) => {}
                _ = cancel_token.cancelled() => break 'passes,
            }
        }
        passes += 1;
    }

    show(display.as_ref(), line, &frames[0]);
    log_debug!("scroll loop stopped after {} passes", passes);
}

fn show(display: &dyn CharDisplay, line: usize, frame: &str) {
    if let Err(err) = display.write_line(line, frame) {
        log_warn!("display scroll write failed: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimDisplay;

    #[test]
    fn frames_shift_one_character_at_a_time() {
        let frames = scroll_frames("abcdef", 4);
        assert_eq!(frames, vec!["abcd", "bcde", "cdef"]);
    }

    #[test]
    fn short_text_is_a_single_padded_frame() {
        assert_eq!(scroll_frames("hi", 4), vec!["hi  "]);
        assert_eq!(scroll_frames("four", 4), vec!["four"]);
    }

    #[tokio::test]
    async fn cancelled_scroll_rests_on_first_frame() {
        let display = Arc::new(SimDisplay::new(16, 2));
        let token = CancellationToken::new();
        let handle = tokio::spawn(scroll_loop(
            display.clone(),
            1,
            "pick up the dry cleaning before six".into(),
            Duration::from_millis(2),
            Duration::from_millis(2),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(display.snapshot()[1], "pick up the dry");
    }
}
