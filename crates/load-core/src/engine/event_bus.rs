//! Broadcast channel for engine events.

use load_types::LoadEvent;
use tokio::sync::broadcast;

/// Fan-out channel carrying [`LoadEvent`]s to any number of observers.
///
/// Publishing never blocks; observers that fall behind lose the oldest
/// events. Publishing with no observer is not an error for the engine, so
/// callers usually discard the result.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<LoadEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per observer.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Registers a new observer.
	pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to every current observer.
	pub fn publish(&self, event: LoadEvent) -> Result<usize, broadcast::error::SendError<LoadEvent>> {
		self.sender.send(event)
	}
}
