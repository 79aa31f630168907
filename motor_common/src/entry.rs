//! Fieldbus entry codec.
//!
//! An [`Entry`] is a typed, fixed-width value identified by a semantic
//! interface id and a wire index/subindex. Its payload is always stored
//! little-endian in a 4-byte array regardless of host byte order; bytes
//! beyond the width of the declared [`ValueType`] are zero.
//!
//! [`encode`]/[`decode`] are total: any bit pattern decodes to a valid
//! value and `decode(encode(v)) == v` for every representable `v`.

use crate::error::{ConfigurationError, ProtocolError};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::fmt;
use std::str::FromStr;

/// Size of the payload array carried by every entry.
pub const MAX_DATA_SIZE: usize = 4;

const_assert_eq!(MAX_DATA_SIZE, core::mem::size_of::<u32>());

// ─── Interface Identifiers ──────────────────────────────────────────

/// Semantic meaning of a cyclic entry.
///
/// Ids 0..=3 are commands written by the manager, 4..=8 are feedback read
/// by the manager. 98 and 99 only appear in raw parameter lists, where
/// they mark the start of the receive (command) and transmit (feedback)
/// groups.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceId {
    /// CiA-402 control word.
    ControlWord = 0,
    /// Target position.
    TargetPosition = 1,
    /// Target velocity.
    TargetVelocity = 2,
    /// Target torque.
    TargetTorque = 3,
    /// CiA-402 status word.
    StatusWord = 4,
    /// Drive error code.
    ErrorCode = 5,
    /// Actual position.
    CurrentPosition = 6,
    /// Actual velocity.
    CurrentVelocity = 7,
    /// Actual torque.
    CurrentTorque = 8,
    /// Start of the receive (command) group.
    RxBoundary = 98,
    /// Start of the transmit (feedback) group.
    TxBoundary = 99,
}

impl InterfaceId {
    /// Convert from the raw id, `None` when outside the enumeration.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ControlWord),
            1 => Some(Self::TargetPosition),
            2 => Some(Self::TargetVelocity),
            3 => Some(Self::TargetTorque),
            4 => Some(Self::StatusWord),
            5 => Some(Self::ErrorCode),
            6 => Some(Self::CurrentPosition),
            7 => Some(Self::CurrentVelocity),
            8 => Some(Self::CurrentTorque),
            98 => Some(Self::RxBoundary),
            99 => Some(Self::TxBoundary),
            _ => None,
        }
    }

    /// Raw id.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Written by the manager every cycle.
    pub const fn is_command(self) -> bool {
        matches!(
            self,
            Self::ControlWord | Self::TargetPosition | Self::TargetVelocity | Self::TargetTorque
        )
    }

    /// Read by the manager every cycle.
    pub const fn is_feedback(self) -> bool {
        matches!(
            self,
            Self::StatusWord
                | Self::ErrorCode
                | Self::CurrentPosition
                | Self::CurrentVelocity
                | Self::CurrentTorque
        )
    }

    /// Wire type the manager encodes/decodes this interface with.
    pub const fn wire_type(self) -> Option<ValueType> {
        match self {
            Self::ControlWord | Self::StatusWord | Self::ErrorCode => Some(ValueType::U16),
            Self::TargetPosition
            | Self::TargetVelocity
            | Self::CurrentPosition
            | Self::CurrentVelocity => Some(ValueType::S32),
            Self::TargetTorque | Self::CurrentTorque => Some(ValueType::S16),
            Self::RxBoundary | Self::TxBoundary => None,
        }
    }
}

// ─── Value Types ────────────────────────────────────────────────────

/// Primitive wire types supported by the codec.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Unsigned 8-bit.
    U8 = 0,
    /// Unsigned 16-bit.
    U16 = 1,
    /// Unsigned 32-bit.
    U32 = 2,
    /// Signed 8-bit.
    S8 = 3,
    /// Signed 16-bit.
    S16 = 4,
    /// Signed 32-bit.
    S32 = 5,
}

impl ValueType {
    /// Width on the wire [bytes].
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 => 4,
        }
    }

    /// Width on the wire [bits], as used in PDO mapping.
    #[inline]
    pub const fn bit_length(self) -> u8 {
        (self.width() * 8) as u8
    }

    /// Two's-complement type.
    #[inline]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::S8 | Self::S16 | Self::S32)
    }

    /// Smallest representable value.
    pub const fn min_value(self) -> i64 {
        match self {
            Self::U8 | Self::U16 | Self::U32 => 0,
            Self::S8 => i8::MIN as i64,
            Self::S16 => i16::MIN as i64,
            Self::S32 => i32::MIN as i64,
        }
    }

    /// Largest representable value.
    pub const fn max_value(self) -> i64 {
        match self {
            Self::U8 => u8::MAX as i64,
            Self::U16 => u16::MAX as i64,
            Self::U32 => u32::MAX as i64,
            Self::S8 => i8::MAX as i64,
            Self::S16 => i16::MAX as i64,
            Self::S32 => i32::MAX as i64,
        }
    }

    /// Name used in parameter files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::S8 => "s8",
            Self::S16 => "s16",
            Self::S32 => "s32",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(Self::U8),
            "u16" | "uint16" => Ok(Self::U16),
            "u32" | "uint32" => Ok(Self::U32),
            "s8" | "i8" | "int8" => Ok(Self::S8),
            "s16" | "i16" | "int16" => Ok(Self::S16),
            "s32" | "i32" | "int32" => Ok(Self::S32),
            _ => Err(ConfigurationError::UnsupportedValueType(s.to_string())),
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::U8),
            1 => Ok(Self::U16),
            2 => Ok(Self::U32),
            3 => Ok(Self::S8),
            4 => Ok(Self::S16),
            5 => Ok(Self::S32),
            _ => Err(ProtocolError::UnsupportedType(tag)),
        }
    }
}

// ─── Codec ──────────────────────────────────────────────────────────

mod sealed {
    pub trait Sealed {}
}

/// Rust integer type with a wire representation.
pub trait WireValue: Copy + sealed::Sealed {
    /// Matching wire type tag.
    const VALUE_TYPE: ValueType;

    /// Read from the first `width` bytes, little-endian.
    fn read_le(bytes: &[u8]) -> Self;

    /// Write into the first `width` bytes, little-endian.
    fn write_le(self, bytes: &mut [u8]);

    /// Widen to `i64`, sign- or zero-extending.
    fn to_i64(self) -> i64;
}

macro_rules! impl_wire_value {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl WireValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$tag;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..core::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes[..core::mem::size_of::<$ty>()].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }
            }
        )*
    };
}

impl_wire_value!(u8 => U8, u16 => U16, u32 => U32, i8 => S8, i16 => S16, i32 => S32);

/// Interpret the first `size_of::<T>()` bytes as little-endian `T`.
#[inline]
pub fn decode<T: WireValue>(bytes: &[u8; MAX_DATA_SIZE]) -> T {
    T::read_le(bytes)
}

/// Pack `value` little-endian; trailing bytes are zero.
#[inline]
pub fn encode<T: WireValue>(value: T) -> [u8; MAX_DATA_SIZE] {
    let mut bytes = [0u8; MAX_DATA_SIZE];
    value.write_le(&mut bytes);
    bytes
}

/// Read a `T` at `offset` in a process-data buffer.
#[inline]
pub fn read_value<T: WireValue>(buf: &[u8], offset: usize) -> Result<T, ProtocolError> {
    let width = T::VALUE_TYPE.width();
    let slice = window(buf.len(), offset, width).map(|range| &buf[range])?;
    Ok(T::read_le(slice))
}

/// Write a `T` at `offset` in a process-data buffer.
#[inline]
pub fn write_value<T: WireValue>(buf: &mut [u8], offset: usize, value: T) -> Result<(), ProtocolError> {
    let width = T::VALUE_TYPE.width();
    let range = window(buf.len(), offset, width)?;
    value.write_le(&mut buf[range]);
    Ok(())
}

fn window(len: usize, offset: usize, width: usize) -> Result<core::ops::Range<usize>, ProtocolError> {
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(ProtocolError::OutOfBounds { offset, width, len }),
    }
}

// ─── Entry ──────────────────────────────────────────────────────────

/// A typed, little-endian encoded value bound to an object address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Raw interface id (see [`InterfaceId`]; one-time entries use their own ids).
    pub id: u8,
    /// Object index on the wire.
    pub index: u16,
    /// Object subindex on the wire.
    pub subindex: u8,
    /// Declared wire type.
    pub value_type: ValueType,
    data: [u8; MAX_DATA_SIZE],
}

impl Entry {
    /// Entry holding `value`; the type tag follows `T`.
    pub fn new<T: WireValue>(id: u8, index: u16, subindex: u8, value: T) -> Self {
        Self {
            id,
            index,
            subindex,
            value_type: T::VALUE_TYPE,
            data: encode(value),
        }
    }

    /// Entry of the given type holding zero.
    pub const fn zeroed(id: u8, index: u16, subindex: u8, value_type: ValueType) -> Self {
        Self {
            id,
            index,
            subindex,
            value_type,
            data: [0; MAX_DATA_SIZE],
        }
    }

    /// Entry of the given type holding `value`, range-checked.
    ///
    /// Returns `None` when `value` does not fit `value_type`.
    pub fn from_i64(id: u8, index: u16, subindex: u8, value_type: ValueType, value: i64) -> Option<Self> {
        if value < value_type.min_value() || value > value_type.max_value() {
            return None;
        }
        let data = match value_type {
            ValueType::U8 => encode(value as u8),
            ValueType::U16 => encode(value as u16),
            ValueType::U32 => encode(value as u32),
            ValueType::S8 => encode(value as i8),
            ValueType::S16 => encode(value as i16),
            ValueType::S32 => encode(value as i32),
        };
        Some(Self {
            id,
            index,
            subindex,
            value_type,
            data,
        })
    }

    /// Width on the wire [bytes].
    #[inline]
    pub const fn byte_size(&self) -> usize {
        self.value_type.width()
    }

    /// Raw little-endian payload.
    #[inline]
    pub const fn data(&self) -> &[u8; MAX_DATA_SIZE] {
        &self.data
    }

    /// Payload bytes actually carried on the wire.
    #[inline]
    pub fn wire_bytes(&self) -> &[u8] {
        &self.data[..self.byte_size()]
    }

    /// Decode the payload as `T`.
    #[inline]
    pub fn get<T: WireValue>(&self) -> T {
        decode(&self.data)
    }

    /// Decode per the declared type and widen to `i64`.
    pub fn to_i64(&self) -> i64 {
        match self.value_type {
            ValueType::U8 => self.get::<u8>().to_i64(),
            ValueType::U16 => self.get::<u16>().to_i64(),
            ValueType::U32 => self.get::<u32>().to_i64(),
            ValueType::S8 => self.get::<i8>().to_i64(),
            ValueType::S16 => self.get::<i16>().to_i64(),
            ValueType::S32 => self.get::<i32>().to_i64(),
        }
    }

    /// Copy of this entry with the payload read from `buf` at `offset`.
    pub fn read_from(&self, buf: &[u8], offset: usize) -> Result<Self, ProtocolError> {
        let range = window(buf.len(), offset, self.byte_size())?;
        let mut data = [0u8; MAX_DATA_SIZE];
        data[..self.byte_size()].copy_from_slice(&buf[range]);
        Ok(Self { data, ..*self })
    }

    /// Write the payload into `buf` at `offset`.
    pub fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<(), ProtocolError> {
        let range = window(buf.len(), offset, self.byte_size())?;
        buf[range].copy_from_slice(self.wire_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_sign_extends_signed_types() {
        assert_eq!(decode::<i8>(&[0xFF, 0, 0, 0]), -1);
        assert_eq!(decode::<i16>(&[0x00, 0x80, 0, 0]), i16::MIN);
        assert_eq!(decode::<i32>(&[0xFE, 0xFF, 0xFF, 0xFF]), -2);
        assert_eq!(decode::<u16>(&[0x00, 0x80, 0, 0]), 0x8000);
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(decode::<u8>(&[0x12, 0x34, 0x56, 0x78]), 0x12);
        assert_eq!(decode::<u16>(&[0x12, 0x34, 0x56, 0x78]), 0x3412);
        assert_eq!(decode::<u32>(&[0x12, 0x34, 0x56, 0x78]), 0x7856_3412);
    }

    #[test]
    fn encode_is_little_endian_and_clears_trailing_bytes() {
        assert_eq!(encode(0x3412u16), [0x12, 0x34, 0, 0]);
        assert_eq!(encode(-1i8), [0xFF, 0, 0, 0]);
        assert_eq!(encode(-1i16), [0xFF, 0xFF, 0, 0]);
        assert_eq!(encode(65536i32), [0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn decode_inverts_encode_at_extremes() {
        assert_eq!(decode::<u32>(&encode(u32::MAX)), u32::MAX);
        assert_eq!(decode::<i32>(&encode(i32::MIN)), i32::MIN);
        assert_eq!(decode::<i32>(&encode(i32::MAX)), i32::MAX);
    }

    fn assert_exact<T: WireValue + PartialEq + fmt::Debug + Into<i64>>(value: T) {
        let bytes = encode(value);
        assert_eq!(decode::<T>(&bytes), value);
        assert_eq!(value.to_i64(), Into::<i64>::into(value));
        assert!(
            bytes[T::VALUE_TYPE.width()..].iter().all(|&b| b == 0),
            "{value:?} -> {bytes:?}"
        );
    }

    #[test]
    fn codec_is_exact_for_every_8_and_16_bit_value() {
        (u8::MIN..=u8::MAX).for_each(assert_exact);
        (i8::MIN..=i8::MAX).for_each(assert_exact);
        (u16::MIN..=u16::MAX).for_each(assert_exact);
        (i16::MIN..=i16::MAX).for_each(assert_exact);
    }

    const VALUE_TYPES: [ValueType; 6] = [
        ValueType::U8,
        ValueType::U16,
        ValueType::U32,
        ValueType::S8,
        ValueType::S16,
        ValueType::S32,
    ];

    /// A wire type and a value it can hold.
    fn typed_value() -> impl Strategy<Value = (ValueType, i64)> {
        prop::sample::select(VALUE_TYPES.to_vec())
            .prop_flat_map(|t| (Just(t), t.min_value()..=t.max_value()))
    }

    proptest! {
        #[test]
        fn codec_is_exact_for_u32(value in any::<u32>()) {
            let bytes = encode(value);
            prop_assert_eq!(decode::<u32>(&bytes), value);
            prop_assert_eq!(value.to_i64(), i64::from(value));
        }

        #[test]
        fn codec_is_exact_for_i32(value in any::<i32>()) {
            let bytes = encode(value);
            prop_assert_eq!(decode::<i32>(&bytes), value);
            prop_assert_eq!(value.to_i64(), i64::from(value));
        }

        #[test]
        fn entry_from_i64_inverts_to_i64((value_type, value) in typed_value()) {
            let entry = Entry::from_i64(7, 0x6000, 0, value_type, value).unwrap();
            prop_assert_eq!(entry.value_type, value_type);
            prop_assert_eq!(entry.to_i64(), value);
            prop_assert!(entry.data()[value_type.width()..].iter().all(|&b| b == 0));
        }

        #[test]
        fn entry_from_i64_rejects_values_past_either_end(
            value_type in prop::sample::select(VALUE_TYPES.to_vec()),
            excess in 1..=(1i64 << 40),
        ) {
            prop_assert!(Entry::from_i64(7, 0x6000, 0, value_type, value_type.max_value() + excess).is_none());
            prop_assert!(Entry::from_i64(7, 0x6000, 0, value_type, value_type.min_value() - excess).is_none());
        }
    }

    #[test]
    fn value_type_widths_and_tags() {
        assert_eq!(ValueType::U8.width(), 1);
        assert_eq!(ValueType::S16.width(), 2);
        assert_eq!(ValueType::S32.bit_length(), 32);
        assert!(ValueType::S8.is_signed());
        assert!(!ValueType::U32.is_signed());
        assert_eq!(ValueType::try_from(4), Ok(ValueType::S16));
        assert_eq!(ValueType::try_from(6), Err(ProtocolError::UnsupportedType(6)));
    }

    #[test]
    fn value_type_parses_parameter_names() {
        assert_eq!("u16".parse::<ValueType>().unwrap(), ValueType::U16);
        assert_eq!("S32".parse::<ValueType>().unwrap(), ValueType::S32);
        assert_eq!("int8".parse::<ValueType>().unwrap(), ValueType::S8);
        assert!(matches!(
            "f32".parse::<ValueType>(),
            Err(ConfigurationError::UnsupportedValueType(t)) if t == "f32"
        ));
    }

    #[test]
    fn entry_from_i64_rejects_out_of_range() {
        assert!(Entry::from_i64(50, 0x6072, 0, ValueType::U16, 70_000).is_none());
        assert!(Entry::from_i64(51, 0x607D, 1, ValueType::U32, -1).is_none());

        let entry = Entry::from_i64(51, 0x607D, 1, ValueType::S32, -65536).unwrap();
        assert_eq!(entry.get::<i32>(), -65536);
        assert_eq!(entry.to_i64(), -65536);
    }

    #[test]
    fn entry_generic_dispatch_follows_type_tag() {
        let entry = Entry::new(8, 0x6077, 0, -300i16);
        assert_eq!(entry.value_type, ValueType::S16);
        assert_eq!(entry.byte_size(), 2);
        assert_eq!(entry.to_i64(), -300);
        assert_eq!(entry.data()[2..], [0, 0]);
    }

    #[test]
    fn entry_buffer_access_is_bounds_checked() {
        let mut buf = [0u8; 6];
        let entry = Entry::new(1, 0x607A, 0, 0x0403_0201i32);
        entry.write_to(&mut buf, 2).unwrap();
        assert_eq!(buf, [0, 0, 1, 2, 3, 4]);

        let read = Entry::zeroed(1, 0x607A, 0, ValueType::S32).read_from(&buf, 2).unwrap();
        assert_eq!(read, entry);

        assert_eq!(
            entry.write_to(&mut buf, 3),
            Err(ProtocolError::OutOfBounds {
                offset: 3,
                width: 4,
                len: 6
            })
        );
        assert_eq!(buf, [0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn read_and_write_value_helpers() {
        let mut buf = [0u8; 4];
        write_value(&mut buf, 1, 0x0237u16).unwrap();
        assert_eq!(read_value::<u16>(&buf, 1).unwrap(), 0x0237);
        assert!(read_value::<u32>(&buf, 1).is_err());
    }

    #[test]
    fn interface_id_groups() {
        assert_eq!(InterfaceId::from_u8(6), Some(InterfaceId::CurrentPosition));
        assert_eq!(InterfaceId::from_u8(42), None);
        assert!(InterfaceId::TargetTorque.is_command());
        assert!(InterfaceId::ErrorCode.is_feedback());
        assert!(!InterfaceId::RxBoundary.is_command());
        assert!(!InterfaceId::TxBoundary.is_feedback());
        assert_eq!(InterfaceId::CurrentTorque.wire_type(), Some(ValueType::S16));
        assert_eq!(InterfaceId::RxBoundary.wire_type(), None);
    }
}
