//! Relay message template and the length-budget truncation rules.
//!
//! The destination platform caps captions at a fixed number of characters.
//! When the composed message does not fit, the original text is sacrificed
//! first and the translation kept intact; only when the translation alone
//! is over budget does it get cut.

use crate::translate::TranslationOutcome;

/// Hard output-length budget plus the literal appended to anything cut.
#[derive(Debug, Clone)]
pub struct FormatBudget {
    pub max_length: usize,
    pub marker: String,
}

impl Default for FormatBudget {
    fn default() -> Self {
        Self {
            max_length: 1024,
            marker: "...(truncated)".to_string(),
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn take_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn header(channel: &str) -> String {
    format!("📰 Forwarded message from {}:\n\n🔤 Original:\n", channel)
}

fn translation_label(lang: &str) -> String {
    format!("🇮🇩 Translation ({}):", lang.to_uppercase())
}

fn translated_text(outcome: &TranslationOutcome) -> String {
    match outcome {
        TranslationOutcome::Ok(text) => text.clone(),
        TranslationOutcome::Failed(detail) => format!("[Translation failed: {}]", detail),
    }
}

/// Compose the relayed message and fit it into the budget.
///
/// Deterministic and pure: the same inputs always yield the same bytes.
/// The result never exceeds `budget.max_length` characters.
pub fn render(
    channel: &str,
    original: &str,
    outcome: &TranslationOutcome,
    lang: &str,
    budget: &FormatBudget,
) -> String {
    let translated = translated_text(outcome);
    let header = header(channel);
    let label = translation_label(lang);
    let translation_block = format!("\n\n{}\n{}", label, translated);

    let full = format!("{header}{original}{translation_block}");
    if char_len(&full) <= budget.max_length {
        return full;
    }

    let header_len = char_len(&header);
    let block_len = char_len(&translation_block);
    let marker_len = char_len(&budget.marker);

    let available = budget
        .max_length
        .checked_sub(header_len + block_len + marker_len)
        .filter(|room| *room > 0);
    if let Some(available) = available {
        let rebuilt = format!(
            "{header}{}{}{translation_block}",
            take_chars(original, available),
            budget.marker
        );
        if char_len(&rebuilt) <= budget.max_length {
            return rebuilt;
        }
    }

    // No room for any original text: the translation block stands alone.
    let translation_only = format!("{}\n{}", label, translated);
    if char_len(&translation_only) <= budget.max_length {
        return translation_only;
    }

    if budget.max_length <= marker_len {
        return take_chars(&translation_only, budget.max_length).to_string();
    }
    format!(
        "{}{}",
        take_chars(&translation_only, budget.max_length - marker_len),
        budget.marker
    )
}
