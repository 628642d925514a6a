//! Effect Controllers
//!
//! One controller per effect. Each owns its engine handle, its store and an
//! async mutex around its state, so operations on one controller never
//! interleave. Every mutation goes engine first, then store, then the
//! published configuration.

mod equalizer;
mod loudness;
mod strength;
mod supervisor;
mod volume;

use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::events::{Event, EventSender};
use crate::model::EffectDomain;

pub use equalizer::EqualizerController;
pub use loudness::LoudnessController;
pub use strength::{BassBoostController, StrengthController, VirtualizerController};
pub use supervisor::StartupState;
pub use volume::{VolumeController, VolumeLevel};

/// Publish the outcome of a controller operation on the event channel
///
/// Validation failures are only returned; nothing was touched.
fn report<T>(
    events: &EventSender,
    domain: EffectDomain,
    operation: &str,
    result: CoreResult<T>,
) -> CoreResult<T> {
    match &result {
        Ok(_) => events.send(Event::ConfigurationSaved { domain }),
        Err(e) if e.is_validation() => debug!("Rejected {} {}: {}", domain, operation, e),
        Err(e) => {
            warn!("{} {} failed: {}", domain, operation, e);
            events.send(Event::error(domain, e));
        }
    }
    result
}
