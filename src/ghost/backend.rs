//! Completion backend seam and prompt construction.

use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::state::Document;
use crate::string_utils::{window_after, window_before};

/// A stream of completion text chunks.
pub type CompletionStream = BoxStream<'static, Result<String>>;

/// The host's streaming completion call.
///
/// Implementations should stop producing chunks once `cancel` fires; the
/// ghost writer also stops pulling on its own, so a backend that ignores the
/// token is still safe.
pub trait CompletionBackend: Send + Sync {
    fn stream_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: CancellationToken,
    ) -> CompletionStream;
}

/// Marks the caret inside the user prompt.
pub const CURSOR_MARKER: &str = "<|cursor|>";

pub const SYSTEM_PROMPT: &str = "You are a writing assistant embedded in a Markdown editor. \
Continue the user's document from the position marked <|cursor|>. Match the tone, language \
and formatting of the surrounding text. Reply with the continuation only, without repeating \
existing text and without commentary.";

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the prompt for continuing `doc` at `pos`, with at most
/// `before`/`after` bytes of context on each side of the caret.
pub fn build_prompt(doc: &Document, pos: usize, before: usize, after: usize) -> Prompt {
    let text = doc.text();
    let head = window_before(text, pos, before);
    let tail = window_after(text, pos, after);

    let mut user = String::with_capacity(head.len() + tail.len() + 64);
    user.push_str("Continue writing at the cursor.\n\n");
    user.push_str(head);
    user.push_str(CURSOR_MARKER);
    user.push_str(tail);

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
