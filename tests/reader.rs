//! Binary reader integration tests.
//!
//! Round-trips every supported numeric width through both byte orders, checks truncation
//! behaviour, and reads a module back from disk through the memory-mapped backend.

use std::{fmt::Debug, fs};

use strum::IntoEnumIterator;

use optcore::{
    file::io::{read_at, write_at, ByteIO},
    ByteOrder, Error, File, Reader, Result,
};

fn round_trip<T>(values: &[T])
where
    T: ByteIO + PartialEq + Debug,
{
    for order in ByteOrder::iter() {
        let width = std::mem::size_of::<T>();
        let mut buffer = vec![0u8; width * values.len()];

        let mut offset = 0;
        for &value in values {
            write_at(&mut buffer, &mut offset, value, order).unwrap();
        }
        assert_eq!(offset, buffer.len());

        let mut reader = Reader::with_order(&buffer, order);
        for &value in values {
            assert_eq!(reader.read_next::<T>().unwrap(), value, "{order:?}");
        }
        assert!(!reader.has_more_data());
    }
}

#[test]
fn round_trip_all_widths() {
    round_trip(&[0u8, 1, 0x7F, 0x80, u8::MAX]);
    round_trip(&[0i8, -1, i8::MIN, i8::MAX]);
    round_trip(&[0u16, 0x1234, u16::MAX]);
    round_trip(&[0i16, -2, i16::MIN, i16::MAX]);
    round_trip(&[0u32, 0xDEAD_BEEF, u32::MAX]);
    round_trip(&[0i32, -3, i32::MIN, i32::MAX]);
    round_trip(&[0u64, 0x0123_4567_89AB_CDEF, u64::MAX]);
    round_trip(&[0i64, -4, i64::MIN, i64::MAX]);
    round_trip(&[0usize, 42, usize::MAX]);
    round_trip(&[0isize, -5, isize::MIN, isize::MAX]);
    round_trip(&[0.0f32, -1.5, f32::MAX, f32::MIN_POSITIVE]);
    round_trip(&[0.0f64, 3.25, f64::MIN, f64::EPSILON]);
}

#[test]
fn round_trip_every_u16() {
    let values: Vec<u16> = (0..=u16::MAX).collect();
    round_trip(&values);
}

#[test]
fn byte_order_changes_the_value() {
    let data = [0x01, 0x02, 0x03, 0x04];
    let le: u32 = Reader::with_order(&data, ByteOrder::Little).read_next().unwrap();
    let be: u32 = Reader::with_order(&data, ByteOrder::Big).read_next().unwrap();
    assert_eq!(le, 0x0403_0201);
    assert_eq!(be, 0x0102_0304);
    assert_eq!(le.swap_bytes(), be);
}

#[test]
fn truncated_four_byte_read() {
    let data = [0x01, 0x00];
    let mut reader = Reader::new(&data);

    assert!(matches!(
        reader.read_next::<u32>(),
        Err(Error::TruncatedInput {
            needed: 4,
            available: 2
        })
    ));
    assert_eq!(reader.pos(), 0);

    // A narrower read still succeeds afterwards
    assert_eq!(reader.read_next::<u16>().unwrap(), 1);
}

#[test]
fn exact_four_byte_read_ends_at_end() {
    let data = [0x02, 0x00, 0x00, 0x00];
    let mut reader = Reader::new(&data);

    assert_eq!(reader.read_next::<u32>().unwrap(), 2);
    assert_eq!(reader.pos(), data.len());
    assert!(!reader.has_more_data());
    assert!(matches!(
        reader.read_next::<u8>(),
        Err(Error::TruncatedInput {
            needed: 1,
            available: 0
        })
    ));
}

#[test]
fn free_function_truncation_keeps_offset() {
    let data = [0xAA; 7];
    let mut offset = 0;

    let first: u32 = read_at(&data, &mut offset, ByteOrder::Big).unwrap();
    assert_eq!(first, 0xAAAA_AAAA);
    assert_eq!(offset, 4);

    assert!(read_at::<u64>(&data, &mut offset, ByteOrder::Big).is_err());
    assert_eq!(offset, 4);
}

#[test]
fn structured_decode_is_transactional() -> Result<()> {
    // Header: u16 version, prefixed name, u32 flags (cut short)
    let mut data = vec![];
    data.extend_from_slice(&3u16.to_be_bytes());
    data.push(4);
    data.extend_from_slice(b"main");
    data.extend_from_slice(&[0x00, 0x01]);

    let mut reader = Reader::with_order(&data, ByteOrder::Big);
    let header = reader.transactional(|r| {
        let version = r.read_next::<u16>()?;
        let name = r.read_prefixed_string_utf8()?;
        let flags = r.read_next::<u32>()?;
        Ok((version, name, flags))
    });

    assert!(matches!(header, Err(Error::TruncatedInput { .. })));
    assert_eq!(reader.pos(), 0);

    let version = reader.read_next::<u16>()?;
    let name = reader.read_prefixed_string_utf8()?;
    assert_eq!((version, name.as_str()), (3, "main"));
    assert_eq!(reader.remaining(), 2);
    Ok(())
}

#[test]
fn mapped_file_reads_like_memory() -> Result<()> {
    let mut bytes = Vec::new();
    for value in [1u32, 0x0102_0304, u32::MAX] {
        bytes.extend_from_slice(&value.to_bytes(ByteOrder::Big));
    }

    let path = std::env::temp_dir().join(format!("optcore-reader-{}.bin", std::process::id()));
    fs::write(&path, &bytes)?;

    let mapped = File::from_file(&path, ByteOrder::Big);
    let memory = File::from_mem(bytes, ByteOrder::Big)?;
    let _ = fs::remove_file(&path);
    let mapped = mapped?;

    assert_eq!(mapped.data(), memory.data());
    let mut a = mapped.reader();
    let mut b = memory.reader_at(4)?;
    a.advance_by(4)?;
    assert_eq!(a.read_next::<u32>()?, 0x0102_0304);
    assert_eq!(b.read_next::<u32>()?, 0x0102_0304);
    assert_eq!(mapped.data_slice(8, 4)?, &[0xFF; 4]);
    assert!(matches!(
        mapped.data_slice(10, 4),
        Err(Error::TruncatedInput { .. })
    ));
    Ok(())
}

#[test]
fn empty_inputs_are_rejected() {
    assert!(matches!(
        File::from_mem(Vec::new(), ByteOrder::Little),
        Err(Error::Empty)
    ));

    let path = std::env::temp_dir().join(format!("optcore-empty-{}.bin", std::process::id()));
    fs::write(&path, b"").unwrap();
    let result = File::from_file(&path, ByteOrder::Little);
    let _ = fs::remove_file(&path);
    assert!(matches!(result, Err(Error::Empty)));

    assert!(matches!(
        File::from_file("/nonexistent/optcore/module.bin", ByteOrder::Little),
        Err(Error::FileError(_))
    ));
}
