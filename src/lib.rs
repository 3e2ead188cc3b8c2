//! ZestRack - LV2 plugins at any channel count
//!
//! Hosts fixed-arity LV2 plugins inside a host whose channel count is only
//! known at runtime.  Plugins are classified once at discovery, bound to a
//! channel count by running as many parallel copies as it takes, and driven
//! block by block through a rack.
//!
//! ## Architecture
//!
//! - `plugin` - Port classification, the copies solver, the registry and
//!   the instance manager, independent of any plugin ABI
//! - `lv2` - lilv discovery and the LV2 native backend
//! - `rack` - Ordered plugin chains and JSON rack presets
//! - `filter` - Processing slots: lazy binding, retry, padding, chunking,
//!   wet/dry and status readback
//! - `service` - Registrable units and their parameter metadata
//! - `properties` - Slot configuration, parameter input, status output

pub mod audio;
pub mod error;
pub mod filter;
pub mod lv2;
pub mod plugin;
pub mod properties;
pub mod rack;
pub mod service;

pub use error::RackError;
pub use filter::{FilterSlot, SlotKind, SlotPhase};
pub use rack::Rack;
pub use service::{ServiceFactory, ServiceKind};
