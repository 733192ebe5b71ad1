//! Units written by the component tree and their text/byte conversions.

use std::borrow::Cow;

use bytes::Bytes;

use super::{context::RenderContext, types::ShortCircuit};

const DOCTYPE_MARKER: &[u8] = b"<!doctype html";

/// One unit of rendered output, written once and in document order.
#[derive(Debug)]
pub enum Chunk {
    /// Trusted markup, emitted verbatim.
    Html(String),
    /// Untrusted text, escaped on conversion.
    Text(String),
    Bytes(Bytes),
    Instruction(RenderInstruction),
    /// Only meaningful as a top-level result; see the adapters for how each
    /// treats one arriving mid-render.
    Response(ShortCircuit),
}

/// Output whose markup depends on per-render state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    /// The collected head fragments. Emitted at most once per render.
    Head,
    /// A shared inline script, emitted the first time its id is seen.
    Script { id: String, body: String },
}

impl Chunk {
    pub fn html(markup: impl Into<String>) -> Self {
        Self::Html(markup.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Chunk::Response(_))
    }

    /// Whether the emitted chunk already carries a doctype (ASCII
    /// case-insensitive). Text is escaped on conversion, so it never does.
    pub fn contains_doctype(&self) -> bool {
        match self {
            Chunk::Html(value) => contains_marker(value.as_bytes()),
            Chunk::Bytes(bytes) => contains_marker(bytes),
            Chunk::Text(_) | Chunk::Instruction(_) | Chunk::Response(_) => false,
        }
    }
}

impl From<&str> for Chunk {
    fn from(markup: &str) -> Self {
        Self::Html(markup.to_string())
    }
}

impl From<String> for Chunk {
    fn from(markup: String) -> Self {
        Self::Html(markup)
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<RenderInstruction> for Chunk {
    fn from(instruction: RenderInstruction) -> Self {
        Self::Instruction(instruction)
    }
}

/// The doctype unit for a context.
pub fn doctype(ctx: &RenderContext) -> &'static str {
    if ctx.compress_html() {
        "<!DOCTYPE html>"
    } else {
        "<!DOCTYPE html>\n"
    }
}

/// Convert a chunk into text. Responses convert to nothing.
pub fn chunk_to_string<'a>(ctx: &RenderContext, chunk: &'a Chunk) -> Cow<'a, str> {
    match chunk {
        Chunk::Html(markup) => Cow::Borrowed(markup.as_str()),
        Chunk::Text(text) => Cow::Owned(ammonia::clean_text(text)),
        Chunk::Bytes(bytes) => String::from_utf8_lossy(bytes),
        Chunk::Instruction(instruction) => Cow::Owned(render_instruction(ctx, instruction)),
        Chunk::Response(_) => Cow::Borrowed(""),
    }
}

/// Convert a chunk into bytes. Responses convert to nothing.
pub fn chunk_to_bytes(ctx: &RenderContext, chunk: Chunk) -> Bytes {
    match chunk {
        Chunk::Html(markup) => Bytes::from(markup),
        Chunk::Bytes(bytes) => bytes,
        Chunk::Response(_) => Bytes::new(),
        other => Bytes::from(chunk_to_string(ctx, &other).into_owned()),
    }
}

fn render_instruction(ctx: &RenderContext, instruction: &RenderInstruction) -> String {
    match instruction {
        RenderInstruction::Head => ctx.take_head_markup().unwrap_or_default(),
        RenderInstruction::Script { id, body } => {
            if ctx.claim_script(id) {
                format!("<script>{body}</script>")
            } else {
                String::new()
            }
        }
    }
}

fn contains_marker(haystack: &[u8]) -> bool {
    haystack
        .windows(DOCTYPE_MARKER.len())
        .any(|window| window.eq_ignore_ascii_case(DOCTYPE_MARKER))
}
