//! Splits a raw model reply into its reasoning and action parts.
//!
//! The model is asked for `<think>…</think><answer>…</answer>` but does not always
//! comply, so several layouts are accepted, tried in this order:
//!
//! 1. `finish(message=` present: text before it is reasoning.
//! 2. Both `<think>` and `<answer>` tag pairs present: their inner texts.
//! 3. `do(` present: split at its first occurrence.
//! 4. `finish(` present: split at its first occurrence.
//! 5. Otherwise the whole trimmed reply is the action.
//!
//! Rule 1 wins even when the reasoning itself mentions `do(`; the ordering is a
//! heuristic and replies mixing both markers may split unexpectedly.
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const FINISH_MARKER: &str = "finish(message=";
const DO_MARKER: &str = "do(";
const FINISH_CALL: &str = "finish(";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub reasoning: String,
    pub action_text: String,
    pub raw: String,
}

impl ModelReply {
    /// Assistant turn stored in the conversation after the step executes.
    pub fn to_tagged(&self) -> String {
        format!(
            "<think>{}</think><answer>{}</answer>",
            self.reasoning, self.action_text
        )
    }
}

fn think_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid regex"))
}

fn answer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<answer>(.*?)</answer>").expect("valid regex"))
}

pub fn split_reply(raw: &str) -> ModelReply {
    let (reasoning, action_text) = split_parts(raw);
    ModelReply {
        reasoning,
        action_text,
        raw: raw.to_string(),
    }
}

fn split_parts(raw: &str) -> (String, String) {
    if let Some(idx) = raw.find(FINISH_MARKER) {
        return split_at(raw, idx);
    }

    let think = think_regex().captures(raw).and_then(|c| c.get(1));
    let answer = answer_regex().captures(raw).and_then(|c| c.get(1));
    if let (Some(think), Some(answer)) = (think, answer) {
        return (
            think.as_str().trim().to_string(),
            answer.as_str().trim().to_string(),
        );
    }

    if let Some(idx) = raw.find(DO_MARKER) {
        return split_at(raw, idx);
    }

    if let Some(idx) = raw.find(FINISH_CALL) {
        return split_at(raw, idx);
    }

    (String::new(), raw.trim().to_string())
}

fn split_at(raw: &str, idx: usize) -> (String, String) {
    let (before, after) = raw.split_at(idx);
    (before.trim().to_string(), after.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_then_do_call() {
        let raw = "I will tap.\ndo(action=\"Tap\", element=[500,500])";
        let reply = split_reply(raw);
        assert_eq!(reply.reasoning, "I will tap.");
        assert_eq!(reply.action_text, "do(action=\"Tap\", element=[500,500])");
        assert_eq!(reply.raw, raw);
    }

    #[test]
    fn tagged_reply_uses_inner_text() {
        let reply = split_reply(concat!(
            "<think>\n  open settings first \n</think>\n",
            "<answer> do(action=\"Launch\", app=\"Settings\") </answer>",
        ));
        assert_eq!(reply.reasoning, "open settings first");
        assert_eq!(reply.action_text, "do(action=\"Launch\", app=\"Settings\")");
    }

    #[test]
    fn finish_marker_has_priority_over_tags() {
        let reply = split_reply("<think>done</think><answer>finish(message=\"ok\")</answer>");
        assert_eq!(reply.reasoning, "<think>done</think><answer>");
        assert_eq!(reply.action_text, "finish(message=\"ok\")</answer>");
    }

    #[test]
    fn finish_marker_wins_over_earlier_do_mention() {
        let reply = split_reply("I could do(something) but finish(message=\"stop\")");
        assert_eq!(reply.reasoning, "I could do(something) but");
        assert_eq!(reply.action_text, "finish(message=\"stop\")");
    }

    #[test]
    fn bare_finish_call_without_message_key() {
        let reply = split_reply("all set finish()");
        assert_eq!(reply.reasoning, "all set");
        assert_eq!(reply.action_text, "finish()");
    }

    #[test]
    fn untagged_reply_is_all_action() {
        let reply = split_reply("  no idea what to do  ");
        assert_eq!(reply.reasoning, "");
        assert_eq!(reply.action_text, "no idea what to do");
    }

    #[test]
    fn only_one_tag_pair_falls_through() {
        let reply = split_reply("<think>hmm</think> do(action=\"Back\")");
        assert_eq!(reply.reasoning, "<think>hmm</think>");
        assert_eq!(reply.action_text, "do(action=\"Back\")");
    }

    #[test]
    fn tagged_form_round_trips_through_split() {
        let reply = split_reply("<think>go back</think><answer>do(action=\"Back\")</answer>");
        let again = split_reply(&reply.to_tagged());
        assert_eq!(again.reasoning, reply.reasoning);
        assert_eq!(again.action_text, reply.action_text);
    }
}
