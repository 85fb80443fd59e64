use bytes::Bytes;
use stashbox_core::{CachedResponse, Raw};

use super::{Format, FormatError, FormatTypeId};

/// JSON format.
///
/// Unknown fields are ignored and absent optional fields take their
/// defaults, which keeps older entries decodable.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode(&self, value: &CachedResponse) -> Result<Raw, FormatError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        serde_json::from_slice(data).map_err(|e| {
            if e.is_eof() {
                FormatError::Truncated
            } else {
                FormatError::Deserialize(Box::new(e))
            }
        })
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Json
    }
}
