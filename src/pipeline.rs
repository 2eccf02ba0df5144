//! Per-message relay pipeline: extract content, translate, format, send.
//!
//! One message is fully processed before the next; every capability call
//! is awaited in sequence and failures degrade into substituted text
//! rather than aborting, with one exception: an image that cannot be
//! fetched is fatal for that message and propagates to the dispatch loop.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::engine::TranslationEngine;
use crate::error::{FetchError, SendError};
use crate::extract::{classify, ContentPlan, ExtractionResult, ImageRef, InboundMessage, Prompt};
use crate::format::{self, FormatBudget};
use crate::ocr::OcrEngine;
use crate::translate::Translator;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
pub trait Sender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError>;
    async fn send_image_with_caption(
        &self,
        chat_id: i64,
        image: &ImageRef,
        caption: &str,
    ) -> Result<(), SendError>;
}

/// Fixed relay destination and output budget, set once at startup.
#[derive(Debug, Clone)]
pub struct RelayTarget {
    pub channel_id: i64,
    pub budget: FormatBudget,
}

pub struct Pipeline<F, O, E, S> {
    fetcher: F,
    ocr: O,
    translator: Translator<E>,
    sender: S,
    target: RelayTarget,
}

impl<F, O, E, S> Pipeline<F, O, E, S>
where
    F: ImageFetcher,
    O: OcrEngine,
    E: TranslationEngine,
    S: Sender,
{
    pub fn new(
        fetcher: F,
        ocr: O,
        translator: Translator<E>,
        sender: S,
        target: RelayTarget,
    ) -> Self {
        Self {
            fetcher,
            ocr,
            translator,
            sender,
            target,
        }
    }

    /// Process one inbound message to completion. Only a failed image
    /// fetch is returned to the caller; everything else is handled here.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Result<(), FetchError> {
        info!("received message from chat {}", msg.chat_id);

        let extraction = match classify(msg) {
            ContentPlan::NotApplicable(prompt) => {
                self.reply_prompt(msg.chat_id, prompt).await;
                return Ok(());
            }
            ContentPlan::UseCaption(caption) => {
                info!("detected image with caption");
                ExtractionResult::FromCaption(caption.to_string())
            }
            ContentPlan::UsePlainText(text) => {
                info!("detected text message");
                ExtractionResult::FromPlainText(text.to_string())
            }
            ContentPlan::NeedsOcr(image) => {
                info!("detected image without caption, running OCR");
                let bytes = self.fetcher.fetch(image).await?;
                self.recognize(&bytes)
            }
        };

        let original = extraction.original_text();
        let outcome = self.translator.translate(&original).await;
        let rendered = format::render(
            &msg.source_channel,
            &original,
            &outcome,
            self.translator.target_lang(),
            &self.target.budget,
        );

        let delivery = match msg.image.as_ref() {
            Some(image) => {
                self.sender
                    .send_image_with_caption(self.target.channel_id, image, &rendered)
                    .await
            }
            None => self.sender.send_text(self.target.channel_id, &rendered).await,
        };

        match delivery {
            Ok(()) => info!("relayed message from {}", msg.source_channel),
            Err(err) => {
                error!("failed to forward message: {}", err);
                self.report_failure(&original, &err).await;
            }
        }
        Ok(())
    }

    fn recognize(&self, bytes: &[u8]) -> ExtractionResult {
        match self.ocr.recognize_text(bytes) {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    info!("OCR found no text in image");
                    ExtractionResult::OcrEmpty
                } else {
                    info!("OCR recognized text");
                    ExtractionResult::FromOcr(trimmed.to_string())
                }
            }
            Err(err) => {
                error!("OCR failed: {}", err);
                ExtractionResult::OcrFailed(err.to_string())
            }
        }
    }

    /// Best-effort static reply to the originating chat.
    async fn reply_prompt(&self, chat_id: i64, prompt: Prompt) {
        info!("message does not qualify for relaying, replying with prompt");
        if let Err(err) = self.sender.send_text(chat_id, prompt.text()).await {
            warn!("prompt reply failed: {}", err);
        }
    }

    /// Best-effort failure report to the destination channel; its own
    /// failure is logged and discarded.
    async fn report_failure(&self, original: &str, detail: &SendError) {
        let report = format!(
            "❌ Failed to forward message:\n\n{}\n\nError: {}",
            original, detail
        );
        if let Err(err) = self.sender.send_text(self.target.channel_id, &report).await {
            error!("error report delivery failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, TranslationError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    const CHANNEL: i64 = -1_000_500;

    #[derive(Clone)]
    struct FakeFetcher {
        fail: bool,
    }

    #[async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, _image: &ImageRef) -> Result<Vec<u8>, FetchError> {
            if self.fail {
                Err(FetchError::MissingFilePath)
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    enum OcrBehavior {
        Text(&'static str),
        Fail(&'static str),
    }

    struct FakeOcr {
        behavior: OcrBehavior,
    }

    impl OcrEngine for FakeOcr {
        fn recognize_text(&self, _bytes: &[u8]) -> Result<String, OcrError> {
            match &self.behavior {
                OcrBehavior::Text(text) => Ok(text.to_string()),
                OcrBehavior::Fail(detail) => Err(OcrError::Engine(detail.to_string())),
            }
        }
    }

    #[derive(Clone)]
    struct EchoEngine {
        fail: bool,
    }

    #[async_trait]
    impl TranslationEngine for EchoEngine {
        async fn translate(
            &self,
            text: &str,
            _target_lang: &str,
        ) -> Result<String, TranslationError> {
            if self.fail {
                Err(TranslationError::Malformed("quota exceeded".to_string()))
            } else {
                Ok(format!("T:{}", text))
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text { chat_id: i64, text: String },
        Image { chat_id: i64, file_id: String, caption: String },
    }

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<Sent>>>,
        fail_next: Arc<AtomicBool>,
    }

    impl RecordingSender {
        fn failing_once() -> Self {
            let sender = Self::default();
            sender.fail_next.store(true, Ordering::SeqCst);
            sender
        }

        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }

        fn maybe_fail(&self) -> Result<(), SendError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                Err(SendError::Status {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    body: "caption rejected".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Sender for RecordingSender {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
            let result = self.maybe_fail();
            self.sent.lock().unwrap().push(Sent::Text {
                chat_id,
                text: text.to_string(),
            });
            result
        }

        async fn send_image_with_caption(
            &self,
            chat_id: i64,
            image: &ImageRef,
            caption: &str,
        ) -> Result<(), SendError> {
            let result = self.maybe_fail();
            self.sent.lock().unwrap().push(Sent::Image {
                chat_id,
                file_id: image.0.clone(),
                caption: caption.to_string(),
            });
            result
        }
    }

    fn pipeline(
        ocr: OcrBehavior,
        engine_fails: bool,
        fetch_fails: bool,
        sender: &RecordingSender,
    ) -> Pipeline<FakeFetcher, FakeOcr, EchoEngine, RecordingSender> {
        Pipeline::new(
            FakeFetcher { fail: fetch_fails },
            FakeOcr { behavior: ocr },
            Translator::new(EchoEngine { fail: engine_fails }, "id"),
            sender.clone(),
            RelayTarget {
                channel_id: CHANNEL,
                budget: FormatBudget::default(),
            },
        )
    }

    fn forwarded() -> InboundMessage {
        InboundMessage {
            chat_id: 42,
            is_forwarded: true,
            source_channel: "TechNews".to_string(),
            text: None,
            caption: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn forwarded_text_is_relayed_to_channel() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text(""), false, false, &sender);
        let mut msg = forwarded();
        msg.text = Some("Hello world".to_string());

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        let Sent::Text { chat_id, text } = &sent[0] else {
            panic!("expected text send");
        };
        assert_eq!(*chat_id, CHANNEL);
        assert_eq!(
            text,
            "📰 Forwarded message from TechNews:\n\n🔤 Original:\n\
             Hello world\n\n🇮🇩 Translation (ID):\nT:Hello world"
        );
    }

    #[tokio::test]
    async fn image_with_caption_is_sent_as_photo_with_caption() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text("never used"), false, false, &sender);
        let mut msg = forwarded();
        msg.image = Some(ImageRef("file-9".to_string()));
        msg.caption = Some("breaking news".to_string());
        msg.text = Some("ignored".to_string());

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        let Sent::Image { chat_id, file_id, caption } = &sent[0] else {
            panic!("expected image send");
        };
        assert_eq!(*chat_id, CHANNEL);
        assert_eq!(file_id, "file-9");
        assert!(caption.contains("🔤 Original:\nbreaking news"));
        assert!(caption.ends_with("T:breaking news"));
    }

    #[tokio::test]
    async fn ocr_text_feeds_the_translation() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text("  sign text \n"), false, false, &sender);
        let mut msg = forwarded();
        msg.image = Some(ImageRef("file-1".to_string()));

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        let Sent::Image { caption, .. } = &sent[0] else {
            panic!("expected image send");
        };
        assert!(caption.contains("🔤 Original:\nsign text"));
        assert!(caption.ends_with("T:sign text"));
    }

    #[tokio::test]
    async fn empty_ocr_substitutes_marker_text() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text("  \n "), false, false, &sender);
        let mut msg = forwarded();
        msg.image = Some(ImageRef("file-1".to_string()));

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        let Sent::Image { caption, .. } = &sent[0] else {
            panic!("expected image send");
        };
        assert!(caption.contains("(no text detected in image)"));
        assert!(caption.ends_with("T:(no text detected in image)"));
    }

    #[tokio::test]
    async fn ocr_failure_substitutes_marker_with_detail() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Fail("boom"), false, false, &sender);
        let mut msg = forwarded();
        msg.image = Some(ImageRef("file-1".to_string()));

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        let Sent::Image { caption, .. } = &sent[0] else {
            panic!("expected image send");
        };
        assert!(caption.contains("(OCR failed: tesseract failed: boom)"));
    }

    #[tokio::test]
    async fn translation_failure_still_relays_with_placeholder() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text(""), true, false, &sender);
        let mut msg = forwarded();
        msg.text = Some("Hello".to_string());

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        let Sent::Text { text, .. } = &sent[0] else {
            panic!("expected text send");
        };
        assert!(text.contains("[Translation failed: malformed translate response: quota exceeded]"));
    }

    #[tokio::test]
    async fn non_forwarded_text_gets_prompt_reply_only() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text(""), false, false, &sender);
        let mut msg = forwarded();
        msg.is_forwarded = false;
        msg.text = Some("translate me".to_string());

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        assert_eq!(
            sent,
            vec![Sent::Text {
                chat_id: 42,
                text: "Please forward the message you want translated to me.".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn failed_send_triggers_one_error_report() {
        let sender = RecordingSender::failing_once();
        let pipe = pipeline(OcrBehavior::Text(""), false, false, &sender);
        let mut msg = forwarded();
        msg.text = Some("Hello".to_string());

        pipe.handle_message(&msg).await.unwrap();

        let sent = sender.take();
        assert_eq!(sent.len(), 2);
        let Sent::Text { chat_id, text } = &sent[1] else {
            panic!("expected report send");
        };
        assert_eq!(*chat_id, CHANNEL);
        assert!(text.starts_with("❌ Failed to forward message:\n\nHello\n\nError: "));
        assert!(text.contains("caption rejected"));
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal_and_sends_nothing() {
        let sender = RecordingSender::default();
        let pipe = pipeline(OcrBehavior::Text("unused"), false, true, &sender);
        let mut msg = forwarded();
        msg.image = Some(ImageRef("file-1".to_string()));

        let result = pipe.handle_message(&msg).await;
        assert!(matches!(result, Err(FetchError::MissingFilePath)));
        assert!(sender.take().is_empty());
    }

    #[tokio::test]
    async fn prompt_reply_failure_is_swallowed() {
        let sender = RecordingSender::failing_once();
        let pipe = pipeline(OcrBehavior::Text(""), false, false, &sender);
        let mut msg = forwarded();
        msg.is_forwarded = false;
        msg.text = Some("hi".to_string());

        pipe.handle_message(&msg).await.unwrap();
        assert_eq!(sender.take().len(), 1);
    }
}
