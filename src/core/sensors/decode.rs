//! Binary decoding of raw register and byte data.
//!
//! Pure functions, no state. Register decoding handles the generic numeric
//! kinds used by Modbus sensors; block decoding handles the byte layouts of
//! specific I2C sensor families. Scaling is never applied here — callers
//! multiply the decoded value by their per-sensor scaling factor afterwards.

use thiserror::Error;

/// A decode failure. The reading is dropped for the cycle; nothing else is
/// affected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input is shorter than the kind or family requires.
    #[error("insufficient data: needed {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The declared kind or sensor family is not recognized.
    #[error("unsupported data type: {0}")]
    UnsupportedKind(String),
}

/// Decodes Modbus holding registers into a value according to `kind`.
///
/// Supported kinds: `int16`, `uint16`, `int32`, `uint32`, `float32`.
/// Two-word kinds treat the first register as the high half and the second
/// as the low half, then reinterpret the packed big-endian buffer as the
/// target type. No rounding beyond native floating-point precision.
pub fn decode_registers(registers: &[u16], kind: &str) -> Result<f64, DecodeError> {
    match kind {
        "int16" => {
            let word = require_words(registers, 1)?[0];
            Ok(word as i16 as f64)
        }
        "uint16" => {
            let word = require_words(registers, 1)?[0];
            Ok(word as f64)
        }
        "int32" => {
            let raw = pack_u32(require_words(registers, 2)?);
            Ok(raw as i32 as f64)
        }
        "uint32" => {
            let raw = pack_u32(require_words(registers, 2)?);
            Ok(raw as f64)
        }
        "float32" => {
            let raw = pack_u32(require_words(registers, 2)?);
            Ok(f32::from_bits(raw) as f64)
        }
        other => Err(DecodeError::UnsupportedKind(other.to_string())),
    }
}

/// Encodes a value into holding registers, the inverse of
/// [`decode_registers`]. Used by the simulated register bus to build device
/// images and by the round-trip tests.
///
/// Integer kinds truncate toward zero; out-of-range values wrap the way a
/// sensor register would.
pub fn encode_registers(value: f64, kind: &str) -> Result<Vec<u16>, DecodeError> {
    match kind {
        "int16" => Ok(vec![value as i16 as u16]),
        "uint16" => Ok(vec![value as u16]),
        "int32" => Ok(split_u32(value as i32 as u32)),
        "uint32" => Ok(split_u32(value as u32)),
        "float32" => Ok(split_u32((value as f32).to_bits())),
        other => Err(DecodeError::UnsupportedKind(other.to_string())),
    }
}

/// Decodes an I2C block read according to the sensor family.
///
/// - `BMP280` / `BME280`: the first three bytes form the 20-bit raw pressure
///   (`b0<<12 | b1<<4 | b2>>4`), divided by 256.0 for an approximate hPa
///   value. The burst read spans the pressure and temperature registers, so
///   six bytes are required. This is a simplified decode: the true
///   conversion needs the per-device calibration constants, so the result is
///   an approximation.
/// - `BH1750`: two bytes as a big-endian u16, divided by 1.2 (high-res mode)
///   for lux.
/// - Any other family with at least two bytes: big-endian u16 of the first
///   two bytes, no scaling.
pub fn decode_block(data: &[u8], family: &str) -> Result<f64, DecodeError> {
    match family.to_ascii_uppercase().as_str() {
        "BMP280" | "BME280" => {
            require_bytes(data, 6)?;
            let adc = ((data[0] as u32) << 12) | ((data[1] as u32) << 4) | ((data[2] as u32) >> 4);
            Ok(adc as f64 / 256.0)
        }
        "BH1750" => {
            require_bytes(data, 2)?;
            let raw = u16::from_be_bytes([data[0], data[1]]);
            Ok(raw as f64 / 1.2)
        }
        _ => {
            require_bytes(data, 2)?;
            let raw = u16::from_be_bytes([data[0], data[1]]);
            Ok(raw as f64)
        }
    }
}

fn require_words(registers: &[u16], needed: usize) -> Result<&[u16], DecodeError> {
    if registers.len() < needed {
        return Err(DecodeError::InsufficientData {
            needed,
            got: registers.len(),
        });
    }
    Ok(registers)
}

fn require_bytes(data: &[u8], needed: usize) -> Result<(), DecodeError> {
    if data.len() < needed {
        return Err(DecodeError::InsufficientData {
            needed,
            got: data.len(),
        });
    }
    Ok(())
}

fn pack_u32(words: &[u16]) -> u32 {
    ((words[0] as u32) << 16) | words[1] as u32
}

fn split_u32(raw: u32) -> Vec<u16> {
    vec![(raw >> 16) as u16, raw as u16]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint16_is_exact() {
        assert_eq!(decode_registers(&[0], "uint16").unwrap(), 0.0);
        assert_eq!(decode_registers(&[1], "uint16").unwrap(), 1.0);
        assert_eq!(decode_registers(&[65535], "uint16").unwrap(), 65535.0);
    }

    #[test]
    fn int16_is_twos_complement() {
        assert_eq!(decode_registers(&[65436], "int16").unwrap(), -100.0);
        assert_eq!(decode_registers(&[0x8000], "int16").unwrap(), -32768.0);
        assert_eq!(decode_registers(&[0x7FFF], "int16").unwrap(), 32767.0);
        assert_eq!(decode_registers(&[0xFFFF], "int16").unwrap(), -1.0);
    }

    #[test]
    fn int32_packs_high_word_first() {
        // 0x0001_0000 = 65536
        assert_eq!(decode_registers(&[1, 0], "int32").unwrap(), 65536.0);
        // 0xFFFF_FFFF = -1
        assert_eq!(decode_registers(&[0xFFFF, 0xFFFF], "int32").unwrap(), -1.0);
    }

    #[test]
    fn uint32_packs_high_word_first() {
        assert_eq!(
            decode_registers(&[0xFFFF, 0xFFFF], "uint32").unwrap(),
            4294967295.0
        );
        assert_eq!(decode_registers(&[0, 42], "uint32").unwrap(), 42.0);
    }

    #[test]
    fn float32_decodes_big_endian_words() {
        // 1.0f32 = 0x3F80_0000
        assert_eq!(decode_registers(&[0x3F80, 0x0000], "float32").unwrap(), 1.0);
        // -2.5f32 = 0xC020_0000
        assert_eq!(
            decode_registers(&[0xC020, 0x0000], "float32").unwrap(),
            -2.5
        );
    }

    #[test]
    fn float32_round_trips_through_registers() {
        for value in [
            0.0_f32, 1.0, -1.0, 0.1, -273.15, 1013.25, 3.4e38, 1.2e-38, 65535.0,
        ] {
            let registers = encode_registers(value as f64, "float32").unwrap();
            let decoded = decode_registers(&registers, "float32").unwrap();
            assert_eq!(decoded as f32, value, "round trip failed for {value}");
        }
    }

    #[test]
    fn integer_kinds_round_trip_through_registers() {
        for (value, kind) in [
            (-100.0, "int16"),
            (65436.0, "uint16"),
            (-1_000_000.0, "int32"),
            (3_000_000_000.0, "uint32"),
        ] {
            let registers = encode_registers(value, kind).unwrap();
            assert_eq!(decode_registers(&registers, kind).unwrap(), value);
        }
    }

    #[test]
    fn short_register_input_is_insufficient_for_every_kind() {
        for kind in ["int16", "uint16"] {
            assert_eq!(
                decode_registers(&[], kind),
                Err(DecodeError::InsufficientData { needed: 1, got: 0 })
            );
        }
        for kind in ["int32", "uint32", "float32"] {
            assert_eq!(
                decode_registers(&[7], kind),
                Err(DecodeError::InsufficientData { needed: 2, got: 1 })
            );
        }
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        assert_eq!(
            decode_registers(&[1, 2], "float64"),
            Err(DecodeError::UnsupportedKind("float64".into()))
        );
        assert_eq!(
            encode_registers(1.0, "float64"),
            Err(DecodeError::UnsupportedKind("float64".into()))
        );
    }

    #[test]
    fn bh1750_divides_by_high_res_factor() {
        // 0x0168 = 360 raw counts -> 300 lux
        let lux = decode_block(&[0x01, 0x68], "BH1750").unwrap();
        assert!((lux - 300.0).abs() < 0.1);
    }

    #[test]
    fn bh1750_family_match_is_case_insensitive() {
        let lux = decode_block(&[0x01, 0x68], "bh1750").unwrap();
        assert!((lux - 300.0).abs() < 0.1);
    }

    #[test]
    fn bmp280_uses_twenty_bit_raw_pressure() {
        // adc = 0x65<<12 | 0x5A<<4 | 0xC0>>4 = 0x655AC
        let data = [0x65, 0x5A, 0xC0, 0x00, 0x00, 0x00];
        let expected = 0x655ACu32 as f64 / 256.0;
        assert_eq!(decode_block(&data, "BMP280").unwrap(), expected);
    }

    #[test]
    fn bmp280_requires_the_full_burst_read() {
        assert_eq!(
            decode_block(&[0x65, 0x5A, 0xC0], "BMP280"),
            Err(DecodeError::InsufficientData { needed: 6, got: 3 })
        );
    }

    #[test]
    fn unknown_family_falls_back_to_big_endian_u16() {
        assert_eq!(decode_block(&[0x01, 0x00], "SHT31").unwrap(), 256.0);
        assert_eq!(decode_block(&[0x00, 0x2A, 0xFF], "TMP102").unwrap(), 42.0);
    }

    #[test]
    fn short_block_is_insufficient() {
        assert_eq!(
            decode_block(&[0x01], "SHT31"),
            Err(DecodeError::InsufficientData { needed: 2, got: 1 })
        );
        assert_eq!(
            decode_block(&[], "BH1750"),
            Err(DecodeError::InsufficientData { needed: 2, got: 0 })
        );
    }
}
