use super::interpreter::StreamSignal;
use super::message::{Content, SERVER_ERROR_REPLY, ToolCallPart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Updated,
    /// The signal closed the turn (finish or server error).
    Closed,
    Unchanged,
}

/// Folds the signals of one turn, in arrival order, into the assistant content.
#[derive(Debug, Default)]
pub struct TurnReconciler {
    pending_tool_calls: Vec<ToolCallPart>,
    closed: bool,
}

impl TurnReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_tool_calls(&self) -> &[ToolCallPart] {
        &self.pending_tool_calls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn apply(&mut self, content: &mut Content, signal: StreamSignal) -> Reconciled {
        if self.closed {
            return Reconciled::Unchanged;
        }

        match signal {
            StreamSignal::TextDelta(text) => {
                *content = Content::with_tool_calls(text, self.pending_tool_calls.clone());
                Reconciled::Updated
            }
            StreamSignal::ToolCall(tool_call) => {
                self.apply_tool_call(content, tool_call);
                Reconciled::Updated
            }
            StreamSignal::Error(message) => {
                tracing::warn!(error = %message, "server reported an error for this turn");
                *content = Content::Text(SERVER_ERROR_REPLY.to_string());
                self.closed = true;
                Reconciled::Closed
            }
            StreamSignal::Finish => {
                self.closed = true;
                Reconciled::Closed
            }
            StreamSignal::ProfileUpdate(_) => Reconciled::Unchanged,
        }
    }

    fn apply_tool_call(&mut self, content: &mut Content, tool_call: ToolCallPart) {
        merge_tool_call(&mut self.pending_tool_calls, tool_call.clone());

        // Text and earlier calls are re-read from the content itself so an
        // interleaved text delta is never overwritten by a stale copy.
        let current_text = content.text();
        let mut tool_calls = content
            .tool_calls()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        merge_tool_call(&mut tool_calls, tool_call);

        *content = Content::with_tool_calls(current_text, tool_calls);
    }
}

fn merge_tool_call(tool_calls: &mut Vec<ToolCallPart>, tool_call: ToolCallPart) {
    match tool_calls
        .iter_mut()
        .find(|existing| existing.tool_call_id == tool_call.tool_call_id)
    {
        Some(existing) => existing.absorb(tool_call),
        None => tool_calls.push(tool_call),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::ContentPart;

    fn call(id: &str) -> ToolCallPart {
        ToolCallPart::new(id, "product_recommendation")
    }

    fn run(signals: Vec<StreamSignal>) -> (Content, TurnReconciler) {
        let mut reconciler = TurnReconciler::new();
        let mut content = Content::default();
        for signal in signals {
            reconciler.apply(&mut content, signal);
        }
        (content, reconciler)
    }

    #[test]
    fn cumulative_text_replaces_instead_of_appending() {
        let (content, _) = run(vec![
            StreamSignal::TextDelta("Hi".to_string()),
            StreamSignal::TextDelta("Hi there".to_string()),
        ]);
        assert_eq!(content.text(), "Hi there");
    }

    #[test]
    fn text_after_tool_call_keeps_the_call() {
        let (content, _) = run(vec![
            StreamSignal::ToolCall(call("t1").with_result(json!({"fund": "A"}))),
            StreamSignal::TextDelta("See above".to_string()),
        ]);

        assert_eq!(
            content.parts(),
            vec![
                ContentPart::Text {
                    text: "See above".to_string()
                },
                ContentPart::ToolCall(call("t1").with_result(json!({"fund": "A"}))),
            ]
        );
    }

    #[test]
    fn tool_call_after_text_keeps_the_text() {
        let (content, reconciler) = run(vec![
            StreamSignal::TextDelta("Let me check".to_string()),
            StreamSignal::ToolCall(call("t1")),
            StreamSignal::ToolCall(call("t2")),
        ]);

        assert_eq!(content.text(), "Let me check");
        let ids = content
            .tool_calls()
            .iter()
            .map(|call| call.tool_call_id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(reconciler.pending_tool_calls().len(), 2);
    }

    #[test]
    fn every_interleaving_keeps_each_call_once() {
        let text = |value: &str| StreamSignal::TextDelta(value.to_string());
        let tool = |id: &str| StreamSignal::ToolCall(call(id));
        let orders = vec![
            vec![text("a"), tool("t1"), text("ab"), tool("t2"), text("abc")],
            vec![tool("t1"), tool("t2"), text("a"), text("ab"), text("abc")],
            vec![text("a"), text("ab"), text("abc"), tool("t1"), tool("t2")],
            vec![tool("t1"), text("a"), text("ab"), text("abc"), tool("t2")],
        ];

        for order in orders {
            let (content, _) = run(order);
            let mut ids = content
                .tool_calls()
                .iter()
                .map(|call| call.tool_call_id.clone())
                .collect::<Vec<_>>();
            ids.sort();
            assert_eq!(ids, vec!["t1", "t2"]);
            assert_eq!(content.text(), "abc");
        }
    }

    #[test]
    fn repeated_id_attaches_result_in_place() {
        let (content, _) = run(vec![
            StreamSignal::ToolCall(call("t1")),
            StreamSignal::ToolCall(call("t2")),
            StreamSignal::ToolCall(call("t1").with_result(json!("done"))),
        ]);

        let calls = content.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool_call_id, "t1");
        assert_eq!(calls[0].result, Some(json!("done")));
    }

    #[test]
    fn error_replaces_everything_and_closes_turn() {
        let (content, reconciler) = run(vec![
            StreamSignal::TextDelta("partial".to_string()),
            StreamSignal::ToolCall(call("t1")),
            StreamSignal::Error("boom".to_string()),
            StreamSignal::TextDelta("ignored".to_string()),
        ]);

        assert_eq!(content, Content::Text(SERVER_ERROR_REPLY.to_string()));
        assert!(reconciler.is_closed());
    }

    #[test]
    fn finish_leaves_content_untouched() {
        let mut reconciler = TurnReconciler::new();
        let mut content = Content::with_tool_calls("done", vec![call("t1")]);
        let before = content.clone();

        assert_eq!(
            reconciler.apply(&mut content, StreamSignal::Finish),
            Reconciled::Closed
        );
        assert_eq!(content, before);
    }
}
