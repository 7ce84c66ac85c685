#![no_main]

use libfuzzer_sys::fuzz_target;
use optcore::{ByteOrder, File};

fuzz_target!(|data: &[u8]| {
    let Some((&tag, _)) = data.split_first() else {
        return;
    };
    let order = if tag & 1 == 0 {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let Ok(file) = File::from_mem(data.to_vec(), order) else {
        return;
    };

    let mut reader = file.reader();
    let _ = reader.read_next::<u8>();
    while reader.has_more_data() {
        let before = reader.pos();
        let _ = reader.read_7bit_encoded_int();
        let _ = reader.read_next::<u32>();
        let _ = reader.read_prefixed_string_utf8();
        let _ = reader.read_next::<f64>();
        if reader.pos() == before && reader.advance_by(1).is_err() {
            break;
        }
    }
});
