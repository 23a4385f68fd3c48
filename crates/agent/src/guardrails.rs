/// Sent whenever a reply cannot be produced safely.
pub const FALLBACK_MESSAGE: &str = "I apologize, I'm having a brief technical moment! 😅 Could you send that again? I want to make sure I don't miss anything important!";

/// WhatsApp bodies longer than this are split by the carrier.
pub const MAX_REPLY_CHARS: usize = 1600;

const MARKDOWN_MARKERS: [&str; 3] = ["**", "__", "*"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow { text: String },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn text(&self) -> &str {
        match self {
            Self::Allow { text } => text,
            Self::Degrade { user_message, .. } => user_message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub strip_markdown: bool,
    pub max_reply_chars: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { strip_markdown: true, max_reply_chars: MAX_REPLY_CHARS }
    }
}

impl GuardrailPolicy {
    /// Cleans a generated reply for a plain-text chat channel.
    pub fn evaluate(&self, raw_reply: &str) -> GuardrailDecision {
        let mut text = raw_reply.to_string();
        if self.strip_markdown {
            for marker in MARKDOWN_MARKERS {
                text = text.replace(marker, "");
            }
        }

        let text = text.trim();
        if text.is_empty() {
            return self.fallback("empty_reply");
        }

        GuardrailDecision::Allow { text: truncate_on_word(text, self.max_reply_chars) }
    }

    pub fn fallback(&self, reason_code: &'static str) -> GuardrailDecision {
        GuardrailDecision::Degrade {
            reason_code,
            user_message: FALLBACK_MESSAGE.to_string(),
            fallback_path: "ask_lead_to_resend",
        }
    }
}

fn truncate_on_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(char::is_whitespace) {
        Some(boundary) if boundary > 0 => cut[..boundary].trim_end().to_string(),
        _ => cut,
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, GuardrailPolicy, FALLBACK_MESSAGE};

    #[test]
    fn markdown_emphasis_is_removed() {
        let decision = GuardrailPolicy::default()
            .evaluate("  **Great choice!** A *villa* in __Dubai Hills__ sounds lovely.  ");

        assert_eq!(
            decision,
            GuardrailDecision::Allow {
                text: "Great choice! A villa in Dubai Hills sounds lovely.".to_string()
            }
        );
    }

    #[test]
    fn markdown_is_kept_when_disabled() {
        let policy = GuardrailPolicy { strip_markdown: false, ..GuardrailPolicy::default() };
        assert_eq!(policy.evaluate("*hi*").text(), "*hi*");
    }

    #[test]
    fn blank_reply_degrades_to_fallback() {
        let decision = GuardrailPolicy::default().evaluate(" ** ");

        let GuardrailDecision::Degrade { reason_code, user_message, fallback_path } = decision
        else {
            panic!("expected degrade decision");
        };
        assert_eq!(reason_code, "empty_reply");
        assert_eq!(user_message, FALLBACK_MESSAGE);
        assert_eq!(fallback_path, "ask_lead_to_resend");
    }

    #[test]
    fn long_replies_are_cut_on_a_word_boundary() {
        let policy = GuardrailPolicy { max_reply_chars: 12, ..GuardrailPolicy::default() };
        assert_eq!(policy.evaluate("one two three four").text(), "one two");
        assert_eq!(policy.evaluate("abcdefghijklmnop").text(), "abcdefghijkl");
    }
}
