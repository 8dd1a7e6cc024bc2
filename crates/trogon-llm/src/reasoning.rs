//! Reasoning extraction: separates `<thinking>…</thinking>` content from the
//! visible answer.
//!
//! Successive reasoning (or text) segments that are interrupted by the other
//! kind are joined with a newline, in both the one-shot and streaming paths.

use std::collections::VecDeque;

use futures::StreamExt;
use futures::stream;

use crate::error::LlmError;
use crate::handle::LanguageModel;
use crate::types::{GenerateRequest, Generation, StreamPart, TokenStream};

const OPEN_TAG: &str = "<thinking>";
const CLOSE_TAG: &str = "</thinking>";
const SEPARATOR: &str = "\n";

/// Split a complete response into `(reasoning, visible text)`.
///
/// Tags are matched non-greedily; an opening tag without a closing tag is
/// left in the text.
pub fn extract_reasoning(text: &str) -> (Option<String>, String) {
    let mut matches: Vec<(usize, usize, &str)> = Vec::new();
    let mut pos = 0;
    while let Some(rel) = text[pos..].find(OPEN_TAG) {
        let inner_start = pos + rel + OPEN_TAG.len();
        let Some(rel_close) = text[inner_start..].find(CLOSE_TAG) else {
            break;
        };
        let inner_end = inner_start + rel_close;
        let end = inner_end + CLOSE_TAG.len();
        matches.push((pos + rel, end, &text[inner_start..inner_end]));
        pos = end;
    }

    if matches.is_empty() {
        return (None, text.to_string());
    }

    let reasoning = matches.iter().map(|(_, _, inner)| *inner).collect::<Vec<_>>().join(SEPARATOR);
    let mut visible = text.to_string();
    for (start, end, _) in matches.iter().rev() {
        let before = &visible[..*start];
        let after = &visible[*end..];
        let separator = if !before.is_empty() && !after.is_empty() { SEPARATOR } else { "" };
        visible = format!("{before}{separator}{after}");
    }
    (Some(reasoning), visible)
}

/// Index where `tag` starts in `text`, or where the longest suffix of `text`
/// that could still grow into `tag` begins.
fn potential_start(text: &str, tag: &str) -> Option<usize> {
    if let Some(index) = text.find(tag) {
        return Some(index);
    }
    (0..text.len())
        .filter(|i| text.is_char_boundary(*i))
        .find(|i| tag.starts_with(&text[*i..]))
}

/// Incremental tag splitter for streamed text deltas.
///
/// Text that might be the start of a tag is held back until the next delta
/// decides it; [`flush`](Self::flush) releases whatever is left at the end.
#[derive(Debug)]
pub struct ThinkingSplitter {
    buffer: String,
    in_reasoning: bool,
    first_reasoning: bool,
    first_text: bool,
    after_switch: bool,
}

impl Default for ThinkingSplitter {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            in_reasoning: false,
            first_reasoning: true,
            first_text: true,
            after_switch: false,
        }
    }
}

impl ThinkingSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &str) -> Vec<StreamPart> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();
        loop {
            let tag = if self.in_reasoning { CLOSE_TAG } else { OPEN_TAG };
            let Some(start) = potential_start(&self.buffer, tag) else {
                let rest = std::mem::take(&mut self.buffer);
                self.publish(&rest, &mut out);
                break;
            };

            let before = self.buffer[..start].to_string();
            self.publish(&before, &mut out);

            if start + tag.len() <= self.buffer.len() {
                self.buffer.drain(..start + tag.len());
                self.in_reasoning = !self.in_reasoning;
                self.after_switch = true;
            } else {
                self.buffer.drain(..start);
                break;
            }
        }
        out
    }

    /// Release held-back text in the current mode.
    pub fn flush(&mut self) -> Vec<StreamPart> {
        let mut out = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        self.publish(&rest, &mut out);
        out
    }

    fn publish(&mut self, text: &str, out: &mut Vec<StreamPart>) {
        if text.is_empty() {
            return;
        }
        let first = if self.in_reasoning { self.first_reasoning } else { self.first_text };
        let prefix = if self.after_switch && !first { SEPARATOR } else { "" };
        let text = format!("{prefix}{text}");
        if self.in_reasoning {
            out.push(StreamPart::ReasoningDelta { text });
            self.first_reasoning = false;
        } else {
            out.push(StreamPart::TextDelta { text });
            self.first_text = false;
        }
        self.after_switch = false;
    }
}

/// Wraps a model so `<thinking>` content is reported as reasoning.
pub struct ReasoningModel<M> {
    inner: M,
}

impl<M: LanguageModel> ReasoningModel<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

struct SplitState {
    inner: TokenStream,
    splitter: ThinkingSplitter,
    pending: VecDeque<Result<StreamPart, LlmError>>,
    done: bool,
}

impl<M: LanguageModel> LanguageModel for ReasoningModel<M> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, LlmError> {
        let mut generation = self.inner.generate(request).await?;
        let (extracted, visible) = extract_reasoning(&generation.text);
        generation.text = visible;
        generation.reasoning = match (generation.reasoning.take(), extracted) {
            (Some(native), Some(extracted)) => Some(format!("{native}{SEPARATOR}{extracted}")),
            (native, extracted) => native.or(extracted),
        };
        Ok(generation)
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TokenStream, LlmError> {
        let state = SplitState {
            inner: self.inner.stream(request).await?,
            splitter: ThinkingSplitter::new(),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.inner.next().await {
                    Some(Ok(StreamPart::TextDelta { text })) => {
                        state.pending.extend(state.splitter.push(&text).into_iter().map(Ok));
                    }
                    Some(Ok(finish @ StreamPart::Finish { .. })) => {
                        state.pending.extend(state.splitter.flush().into_iter().map(Ok));
                        state.pending.push_back(Ok(finish));
                    }
                    Some(Ok(other)) => state.pending.push_back(Ok(other)),
                    Some(Err(err)) => {
                        state.pending.push_back(Err(err));
                        state.done = true;
                    }
                    None => {
                        state.pending.extend(state.splitter.flush().into_iter().map(Ok));
                        state.done = true;
                    }
                }
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReason, collect_stream};

    fn reasoning(text: &str) -> StreamPart {
        StreamPart::ReasoningDelta { text: text.into() }
    }

    fn text(text: &str) -> StreamPart {
        StreamPart::TextDelta { text: text.into() }
    }

    #[test]
    fn extract_without_tags_is_identity() {
        assert_eq!(extract_reasoning("just text"), (None, "just text".to_string()));
    }

    #[test]
    fn extract_separates_leading_block() {
        let (r, t) = extract_reasoning("<thinking>plan it</thinking>The answer is 4.");
        assert_eq!(r.as_deref(), Some("plan it"));
        assert_eq!(t, "The answer is 4.");
    }

    #[test]
    fn extract_joins_multiple_blocks_and_surrounding_text() {
        let (r, t) = extract_reasoning("A<thinking>one</thinking>B<thinking>two</thinking>C");
        assert_eq!(r.as_deref(), Some("one\ntwo"));
        assert_eq!(t, "A\nB\nC");
    }

    #[test]
    fn extract_spans_newlines_and_is_non_greedy() {
        let (r, t) = extract_reasoning("<thinking>a\nb</thinking>x</thinking>");
        assert_eq!(r.as_deref(), Some("a\nb"));
        assert_eq!(t, "x</thinking>");
    }

    #[test]
    fn extract_leaves_unclosed_tag() {
        let (r, t) = extract_reasoning("hi <thinking>never closed");
        assert_eq!(r, None);
        assert_eq!(t, "hi <thinking>never closed");
    }

    #[test]
    fn splitter_handles_whole_tags_in_one_delta() {
        let mut s = ThinkingSplitter::new();
        assert_eq!(s.push("<thinking>abc</thinking>Hello"), vec![reasoning("abc"), text("Hello")]);
        assert!(s.flush().is_empty());
    }

    #[test]
    fn splitter_holds_back_partial_tags() {
        let mut s = ThinkingSplitter::new();
        assert!(s.push("<thi").is_empty());
        assert_eq!(s.push("nking>ab"), vec![reasoning("ab")]);
        assert_eq!(s.push("c</thin"), vec![reasoning("c")]);
        assert_eq!(s.push("king>Hi"), vec![text("Hi")]);
    }

    #[test]
    fn splitter_separates_resumed_segments() {
        let mut s = ThinkingSplitter::new();
        let parts = s.push("<thinking>a</thinking>x<thinking>b</thinking>y");
        assert_eq!(parts, vec![reasoning("a"), text("x"), reasoning("\nb"), text("\ny")]);
    }

    #[test]
    fn splitter_passes_lone_angle_brackets() {
        let mut s = ThinkingSplitter::new();
        assert_eq!(s.push("a < b"), vec![text("a < b")]);
    }

    #[test]
    fn flush_releases_held_back_prefix() {
        let mut s = ThinkingSplitter::new();
        assert_eq!(s.push("Hello <thi"), vec![text("Hello ")]);
        assert_eq!(s.flush(), vec![text("<thi")]);
    }

    struct Scripted {
        text: &'static str,
        deltas: Vec<&'static str>,
    }

    impl LanguageModel for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _: &GenerateRequest) -> Result<Generation, LlmError> {
            Ok(Generation {
                text: self.text.to_string(),
                ..Generation::default()
            })
        }

        async fn stream(&self, _: &GenerateRequest) -> Result<TokenStream, LlmError> {
            let mut parts: Vec<Result<StreamPart, LlmError>> =
                self.deltas.iter().map(|d| Ok(text(d))).collect();
            parts.push(Ok(StreamPart::Finish { reason: FinishReason::Stop }));
            Ok(Box::pin(stream::iter(parts)))
        }
    }

    #[tokio::test]
    async fn decorator_splits_one_shot_generation() {
        let model = ReasoningModel::new(Scripted {
            text: "<thinking>2+2</thinking>4",
            deltas: vec![],
        });
        let generation = model.generate(&GenerateRequest::default()).await.unwrap();
        assert_eq!(generation.text, "4");
        assert_eq!(generation.reasoning.as_deref(), Some("2+2"));
        assert_eq!(model.model_name(), "scripted");
    }

    #[tokio::test]
    async fn decorator_splits_stream_and_flushes_before_finish() {
        let model = ReasoningModel::new(Scripted {
            text: "",
            deltas: vec!["<think", "ing>2+2</th", "inking>4 <"],
        });
        let stream = model.stream(&GenerateRequest::default()).await.unwrap();
        let parts: Vec<StreamPart> = stream.map(|p| p.unwrap()).collect().await;
        assert_eq!(
            parts,
            vec![
                reasoning("2+2"),
                text("4 "),
                text("<"),
                StreamPart::Finish { reason: FinishReason::Stop },
            ]
        );
    }

    #[tokio::test]
    async fn streamed_and_one_shot_agree() {
        let raw = "<thinking>step one</thinking>Answer<thinking>check</thinking>Done";
        let one_shot = extract_reasoning(raw);

        let model = ReasoningModel::new(Scripted {
            text: "",
            deltas: vec!["<thinking>step ", "one</think", "ing>Answer<", "thinking>check</thinking>Done"],
        });
        let generation = collect_stream(model.stream(&GenerateRequest::default()).await.unwrap())
            .await
            .unwrap();
        assert_eq!(generation.reasoning, one_shot.0);
        assert_eq!(generation.text, one_shot.1);
    }
}
