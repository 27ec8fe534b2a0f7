// ── Domain model ──
//
// The status report a device returns and the measurement attributes an
// entity derives from it.

mod attribute;
mod status;

pub use attribute::{
    ATTR_CURRENT, ATTR_CURRENT_CONSUMPTION, ATTR_VOLTAGE, AttributeValue, Attributes,
};
pub use status::{DpValue, StatusBlob};
