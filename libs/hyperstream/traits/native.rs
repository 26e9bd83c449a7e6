use crate::core::event::Event;
use futures::stream::BoxStream;
use reqwest::Url;

/// Signal surfaced by a host-provided event-stream primitive
///
/// Native primitives parse the wire format themselves, so frames arrive
/// already assembled into [`Event`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeSignal {
    /// The primitive reached its open state
    Open,
    /// A complete inbound frame of any type
    Frame(Event),
    /// The primitive reported an error
    ///
    /// `closed` mirrors the primitive's ready state: `true` when the
    /// primitive gave up and will deliver nothing more.
    Error { message: String, closed: bool },
    /// The primitive closed
    Closed,
}

/// Opaque streaming primitive used on the no-credential path
///
/// Opening is lazy: the returned stream connects when first polled.
/// Dropping the stream closes the primitive.
///
/// # Example
/// ```ignore
/// struct Fixed(Vec<NativeSignal>);
///
/// impl NativeConnector for Fixed {
///     fn open(&self, _url: &Url) -> BoxStream<'static, NativeSignal> {
///         futures::stream::iter(self.0.clone()).boxed()
///     }
/// }
/// ```
pub trait NativeConnector: Send + Sync {
    /// Open the primitive against `url`
    fn open(&self, url: &Url) -> BoxStream<'static, NativeSignal>;
}
