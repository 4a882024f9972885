//! Map subsystem: viewport geometry, feature normalization, the layer
//! store, and the debounced viewport sync that keeps them current.

pub mod advisory;
pub mod feature;
pub mod fetcher;
pub mod layer_store;
pub mod session;
pub mod style;
pub mod sync;
pub mod viewport;

pub use feature::FeatureId;
pub use layer_store::LayerStore;
pub use session::{PredisposedSink, SessionHandle, SessionStatus, spawn_session};
pub use sync::ViewportSync;
pub use viewport::{Bounds, LatLng, Viewport};
