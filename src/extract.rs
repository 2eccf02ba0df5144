//! Content-source selection for one inbound message.

/// Opaque platform handle for an image (Telegram file id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(pub String);

/// Immutable snapshot of one platform event.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub is_forwarded: bool,
    pub source_channel: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub image: Option<ImageRef>,
}

/// What the pipeline should do with a message, decided without any
/// capability call.
#[derive(Debug, PartialEq, Eq)]
pub enum ContentPlan<'a> {
    UseCaption(&'a str),
    UsePlainText(&'a str),
    NeedsOcr(&'a ImageRef),
    NotApplicable(Prompt),
}

/// Static reply for messages the relay does not process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    ForwardText,
    ForwardImageWithText,
    ForwardAnything,
}

impl Prompt {
    pub fn text(&self) -> &'static str {
        match self {
            Prompt::ForwardText => "Please forward the message you want translated to me.",
            Prompt::ForwardImageWithText => {
                "Please forward a message containing text or an image with clear text."
            }
            Prompt::ForwardAnything => "Please forward a message containing text or an image.",
        }
    }
}

/// Textual payload resolved for a qualifying message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    FromCaption(String),
    FromPlainText(String),
    FromOcr(String),
    OcrEmpty,
    OcrFailed(String),
}

impl ExtractionResult {
    /// Text used as the "original" side of the relayed message. OCR
    /// misses and failures substitute a literal marker; the marker is
    /// still run through translation like any other text.
    pub fn original_text(&self) -> String {
        match self {
            ExtractionResult::FromCaption(text)
            | ExtractionResult::FromPlainText(text)
            | ExtractionResult::FromOcr(text) => text.clone(),
            ExtractionResult::OcrEmpty => "(no text detected in image)".to_string(),
            ExtractionResult::OcrFailed(detail) => format!("(OCR failed: {})", detail),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.as_str()).filter(|s| !s.is_empty())
}

/// Caption wins over plain text, plain text over OCR. Non-forwarded
/// messages and messages with neither text nor image get a prompt.
pub fn classify(msg: &InboundMessage) -> ContentPlan<'_> {
    let caption = non_empty(msg.caption.as_ref());
    let text = non_empty(msg.text.as_ref());

    if msg.is_forwarded {
        if msg.image.is_some() {
            if let Some(caption) = caption {
                return ContentPlan::UseCaption(caption);
            }
        }
        if let Some(text) = text {
            return ContentPlan::UsePlainText(text);
        }
        if let Some(image) = msg.image.as_ref() {
            return ContentPlan::NeedsOcr(image);
        }
        return ContentPlan::NotApplicable(Prompt::ForwardAnything);
    }

    if text.is_some() || caption.is_some() {
        ContentPlan::NotApplicable(Prompt::ForwardText)
    } else if msg.image.is_some() {
        ContentPlan::NotApplicable(Prompt::ForwardImageWithText)
    } else {
        ContentPlan::NotApplicable(Prompt::ForwardAnything)
    }
}
