//! Widget events flowing into the conversation transcript.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use jarvis_bridge::{
    BridgeError, DocumentHost, ListenerId, NodeId, ObserverId, RawWidgetEvent, WidgetMount,
};
use jarvis_chat::{ChatError, ConversationController, NullPlayer, RelayClient, RelayReply};
use jarvis_core::config::{ConversationConfig, WidgetConfig};
use jarvis_core::events::notice_channel;
use jarvis_core::types::Speaker;

// =============================================================================
// Helpers
// =============================================================================

#[derive(Default)]
struct CountingDocument {
    next: AtomicU64,
}

impl CountingDocument {
    fn id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl DocumentHost for CountingDocument {
    fn insert_script(&self, _src: &str) -> Result<NodeId, BridgeError> {
        Ok(NodeId(self.id()))
    }
    fn insert_style(&self, _css: &str) -> Result<NodeId, BridgeError> {
        Ok(NodeId(self.id()))
    }
    fn insert_widget(&self, _tag: &str, _agent_id: &str) -> Result<NodeId, BridgeError> {
        Ok(NodeId(self.id()))
    }
    fn observe_subtree(&self, _root: NodeId) -> Result<ObserverId, BridgeError> {
        Ok(ObserverId(self.id()))
    }
    fn listen(&self, _event: &str) -> Result<ListenerId, BridgeError> {
        Ok(ListenerId(self.id()))
    }
    fn apply_overrides(&self, _node: NodeId, _css: &str) {}
    fn unlisten(&self, _listener: ListenerId) {}
    fn disconnect(&self, _observer: ObserverId) {}
    fn remove_node(&self, _node: NodeId) {}
}

struct UnusedRelay;

#[async_trait]
impl RelayClient for UnusedRelay {
    async fn send(&self, _text: &str) -> Result<RelayReply, ChatError> {
        Err(ChatError::Network("widget turns never reach the relay".into()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_widget_turns_append_and_raise_speaking() {
    let controller = ConversationController::new(
        &ConversationConfig::default(),
        Arc::new(UnusedRelay),
        Arc::new(NullPlayer),
        notice_channel(),
    );

    let sink = controller.clone();
    let mount = WidgetMount::mount(
        Arc::new(CountingDocument::default()),
        &WidgetConfig {
            agent_id: "agent_test".to_string(),
            ..WidgetConfig::default()
        },
        move |message| {
            sink.ingest_widget_message(&message.text, message.speaker);
        },
    )
    .unwrap();

    mount.dispatch(&RawWidgetEvent::PostMessage {
        data: json!({"type": "convai-user-message", "detail": {"text": "what's on today"}}),
    });
    assert!(!controller.is_speaking());

    mount.dispatch(&RawWidgetEvent::WindowEvent {
        name: "convai-ai-message".to_string(),
        detail: json!({"text": "Two meetings.", "message": "ignored"}),
    });

    let transcript = controller.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].speaker, Speaker::User);
    assert_eq!(transcript[2].content, "Two meetings.");
    assert!(controller.is_speaking());

    tokio::time::sleep(Duration::from_millis(3_001)).await;
    assert!(!controller.is_speaking());

    mount.unmount();
}
