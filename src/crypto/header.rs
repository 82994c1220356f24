//! CBS header codec: `{PTY, GID, SID}` packed according to a [`HeaderType`].
//!
//! Two header types are recognized, trading addressable range for frame
//! size; the Client and its Server must agree on the same one out of band.

use crate::core::error::{ConfigError, FramingError};
use crate::core::types::{Gid, Sid};

/// Selects how the header's `{PTY, GID, SID}` triple is packed onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    /// Three full bytes: `gid`, `sid`, `pty`. Full `u8` range for both IDs.
    Standard,
    /// Two bytes: `gid` gets a full byte, `pty` and `sid` share the second
    /// (3 bits of payload type, 5 bits of SID), halving the SID range.
    Compact,
}

impl HeaderType {
    /// Decodes the wire discriminant used in the configuration file format.
    pub(crate) fn from_u8(raw: u8) -> Result<Self, ConfigError> {
        match raw {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Compact),
            other => Err(ConfigError::InvalidHeaderType(other)),
        }
    }

    /// Largest representable GID for this header type.
    #[must_use]
    pub const fn max_gid(self) -> u8 {
        u8::MAX
    }

    /// Largest representable SID for this header type.
    #[must_use]
    pub const fn max_sid(self) -> u8 {
        match self {
            Self::Standard => u8::MAX,
            Self::Compact => 0x1F,
        }
    }

    /// Length in bytes of the packed header.
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::Standard => 3,
            Self::Compact => 2,
        }
    }
}

/// Payload type carried by a frame, determining how the rest of the PDU is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// Unsecured application data: plaintext, unauthenticated.
    Uad,
    /// Handshake request.
    Req,
    /// Handshake response.
    Res,
    /// Session renewal notification.
    Srn,
    /// Secured (AEAD-authenticated, encrypted) application data.
    SadFd,
}

impl PayloadType {
    const fn to_raw(self) -> u8 {
        match self {
            Self::Uad => 0,
            Self::Req => 1,
            Self::Res => 2,
            Self::Srn => 3,
            Self::SadFd => 4,
        }
    }

    const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Uad),
            1 => Some(Self::Req),
            2 => Some(Self::Res),
            3 => Some(Self::Srn),
            4 => Some(Self::SadFd),
            _ => None,
        }
    }
}

/// A decoded header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload type of the frame.
    pub pty: PayloadType,
    /// Destination (or origin, for inbound) group.
    pub gid: Gid,
    /// Source of the frame.
    pub sid: Sid,
}

impl Header {
    /// Packs this header into `buf` according to `header_type`, returning the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::OutputBufferTooSmall`] if `buf` is shorter
    /// than [`HeaderType::header_len`].
    pub fn pack(&self, header_type: HeaderType, buf: &mut [u8]) -> Result<usize, FramingError> {
        let len = header_type.header_len();
        if buf.len() < len {
            return Err(FramingError::OutputBufferTooSmall);
        }
        match header_type {
            HeaderType::Standard => {
                buf[0] = self.gid.0;
                buf[1] = self.sid.0;
                buf[2] = self.pty.to_raw();
            }
            HeaderType::Compact => {
                buf[0] = self.gid.0;
                buf[1] = (self.pty.to_raw() << 5) | (self.sid.0 & 0x1F);
            }
        }
        Ok(len)
    }

    /// Unpacks a header from the front of `buf` according to `header_type`.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooShortPduForHeader`] if `buf` is shorter
    /// than the header, or [`FramingError::InvalidPayloadType`] if the PTY
    /// field does not match a known variant.
    pub fn unpack(header_type: HeaderType, buf: &[u8]) -> Result<Self, FramingError> {
        let len = header_type.header_len();
        if buf.len() < len {
            return Err(FramingError::TooShortPduForHeader);
        }
        let (gid, sid, pty_raw) = match header_type {
            HeaderType::Standard => (buf[0], buf[1], buf[2]),
            HeaderType::Compact => (buf[0], buf[1] & 0x1F, buf[1] >> 5),
        };
        let pty = PayloadType::from_raw(pty_raw).ok_or(FramingError::InvalidPayloadType(pty_raw))?;
        Ok(Self { pty, gid: Gid(gid), sid: Sid(sid) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_header_round_trips() {
        let h = Header { pty: PayloadType::SadFd, gid: Gid(7), sid: Sid(200) };
        let mut buf = [0u8; 3];
        let used = h.pack(HeaderType::Standard, &mut buf).unwrap();
        assert_eq!(used, 3);
        assert_eq!(Header::unpack(HeaderType::Standard, &buf).unwrap(), h);
    }

    #[test]
    fn compact_header_round_trips() {
        let h = Header { pty: PayloadType::Req, gid: Gid(42), sid: Sid(17) };
        let mut buf = [0u8; 2];
        let used = h.pack(HeaderType::Compact, &mut buf).unwrap();
        assert_eq!(used, 2);
        assert_eq!(Header::unpack(HeaderType::Compact, &buf).unwrap(), h);
    }

    #[test]
    fn compact_sid_overflow_is_caller_checked_not_codec_checked() {
        // The codec itself truncates; range checks happen at config validation time.
        assert_eq!(HeaderType::Compact.max_sid(), 0x1F);
    }

    #[test]
    fn unpack_rejects_short_buffer() {
        let buf = [0u8; 1];
        assert_eq!(
            Header::unpack(HeaderType::Compact, &buf),
            Err(FramingError::TooShortPduForHeader)
        );
    }

    #[test]
    fn unpack_rejects_unknown_payload_type() {
        let buf = [0x00, 0xFF];
        assert_eq!(
            Header::unpack(HeaderType::Compact, &buf),
            Err(FramingError::InvalidPayloadType(0xFF >> 5))
        );
    }
}
