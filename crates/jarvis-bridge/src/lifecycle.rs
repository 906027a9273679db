//! Scoped mount of the third-party voice widget.
//!
//! Mounting acquires, in order: the widget script tag, the style override
//! (when configured), the custom element, a subtree observer on the element
//! and the window event listeners. Everything acquired is released in
//! reverse order by [`WidgetMount::unmount`] or, failing that, on drop. A
//! mount that fails halfway releases what it already holds.

use std::sync::Arc;

use jarvis_core::config::WidgetConfig;

use crate::error::BridgeError;
use crate::normalize::{normalize, NormalizedMessage, RawWidgetEvent, WINDOW_EVENTS};

/// Handle to a node the host inserted into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Handle to a structural observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Handle to a window event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The document operations the bridge needs.
///
/// Release methods must tolerate handles that are already gone.
pub trait DocumentHost: Send + Sync {
    /// Append an async `<script src>` to the body.
    fn insert_script(&self, src: &str) -> Result<NodeId, BridgeError>;

    /// Append a `<style>` element with `css`.
    fn insert_style(&self, css: &str) -> Result<NodeId, BridgeError>;

    /// Create the widget element `<tag agent-id=...>`.
    fn insert_widget(&self, tag: &str, agent_id: &str) -> Result<NodeId, BridgeError>;

    /// Start observing child insertions under `root`. The host reports them
    /// through [`WidgetMount::on_nodes_added`].
    fn observe_subtree(&self, root: NodeId) -> Result<ObserverId, BridgeError>;

    /// Register a listener for a window event. Events are reported through
    /// [`WidgetMount::dispatch`].
    fn listen(&self, event: &str) -> Result<ListenerId, BridgeError>;

    /// Apply the cosmetic override to one node.
    fn apply_overrides(&self, node: NodeId, css: &str);

    fn unlisten(&self, listener: ListenerId);

    fn disconnect(&self, observer: ObserverId);

    fn remove_node(&self, node: NodeId);
}

/// Callback receiving normalized widget messages.
pub type MessageSink = Arc<dyn Fn(NormalizedMessage) + Send + Sync>;

/// Everything a live mount holds. Released in reverse acquisition order.
#[derive(Debug, Default)]
struct Resources {
    script: Option<NodeId>,
    style: Option<NodeId>,
    widget: Option<NodeId>,
    observer: Option<ObserverId>,
    listeners: Vec<ListenerId>,
}

/// A mounted widget. Dropping it unmounts.
pub struct WidgetMount {
    host: Arc<dyn DocumentHost>,
    style_overrides: String,
    sink: MessageSink,
    resources: Resources,
}

impl std::fmt::Debug for WidgetMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetMount")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl WidgetMount {
    /// Mount the widget described by `config`, routing messages to `on_message`.
    pub fn mount<F>(
        host: Arc<dyn DocumentHost>,
        config: &WidgetConfig,
        on_message: F,
    ) -> Result<Self, BridgeError>
    where
        F: Fn(NormalizedMessage) + Send + Sync + 'static,
    {
        if config.agent_id.trim().is_empty() {
            return Err(BridgeError::MissingAgentId);
        }

        let mut mount = Self {
            host,
            style_overrides: config.style_overrides.clone(),
            sink: Arc::new(on_message),
            resources: Resources::default(),
        };

        // Any early return drops `mount`, which releases what was acquired.
        mount.resources.script = Some(mount.host.insert_script(&config.script_src)?);
        if !mount.style_overrides.trim().is_empty() {
            mount.resources.style = Some(mount.host.insert_style(&mount.style_overrides)?);
        }
        let widget = mount
            .host
            .insert_widget(&config.element_tag, &config.agent_id)?;
        mount.resources.widget = Some(widget);
        mount.resources.observer = Some(mount.host.observe_subtree(widget)?);
        for event in WINDOW_EVENTS.iter().copied().chain(["message"]) {
            let listener = mount.host.listen(event)?;
            mount.resources.listeners.push(listener);
        }

        tracing::info!(
            element = %config.element_tag,
            script = %config.script_src,
            listeners = mount.resources.listeners.len(),
            "Voice widget mounted"
        );
        Ok(mount)
    }

    /// Reapply the style override to nodes the widget inserted late.
    ///
    /// Returns how many nodes were touched.
    pub fn on_nodes_added(&self, nodes: &[NodeId]) -> usize {
        if self.style_overrides.trim().is_empty() {
            return 0;
        }
        for node in nodes {
            self.host.apply_overrides(*node, &self.style_overrides);
        }
        tracing::trace!(count = nodes.len(), "Reapplied widget style overrides");
        nodes.len()
    }

    /// Normalize a raw widget event and forward it to the sink.
    ///
    /// Unrecognized shapes are dropped and `None` is returned.
    pub fn dispatch(&self, event: &RawWidgetEvent) -> Option<NormalizedMessage> {
        match normalize(event) {
            Some(message) => {
                tracing::debug!(
                    speaker = %message.speaker,
                    text_len = message.text.len(),
                    "Widget message received"
                );
                (self.sink)(message.clone());
                Some(message)
            }
            None => {
                tracing::trace!(?event, "Dropping unrecognized widget event");
                None
            }
        }
    }

    /// Release everything this mount holds.
    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let resources = std::mem::take(&mut self.resources);
        let held = resources.script.is_some();

        for listener in resources.listeners.into_iter().rev() {
            self.host.unlisten(listener);
        }
        if let Some(observer) = resources.observer {
            self.host.disconnect(observer);
        }
        if let Some(widget) = resources.widget {
            self.host.remove_node(widget);
        }
        if let Some(style) = resources.style {
            self.host.remove_node(style);
        }
        if let Some(script) = resources.script {
            self.host.remove_node(script);
        }

        if held {
            tracing::info!("Voice widget unmounted");
        }
    }
}

impl Drop for WidgetMount {
    fn drop(&mut self) {
        self.release();
    }
}
