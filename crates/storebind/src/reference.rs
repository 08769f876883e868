use crate::event::ChildEvent;
use crate::snapshot::Snapshot;

pub type ListenerId = u64;

pub type ChildListener = Box<dyn FnMut(ChildEvent) + Send + Sync>;
pub type ValueListener = Box<dyn FnMut(Snapshot) + Send + Sync>;

/// Handle to one node of a remote hierarchical source.
///
/// Implementations deliver events for a single node in emission order and
/// must stop calling a listener once `off` has returned for it.
pub trait RemoteReference: Send + Sync {
    /// Last path segment; `None` at the root.
    fn key(&self) -> Option<String>;

    fn path(&self) -> String;

    /// Current value of the node, `Null` when it holds no data.
    fn read(&self) -> Snapshot;

    /// Subscribes to child events. Existing children are reported as
    /// `Added`, followed by one `Loaded`.
    fn on_child_events(&self, listener: ChildListener) -> ListenerId;

    /// Subscribes to value events: the initial value and every change of the
    /// node or any descendant.
    fn on_value(&self, listener: ValueListener) -> ListenerId;

    fn off(&self, id: ListenerId);
}
