#![no_main]
use libfuzzer_sys::fuzz_target;

use amf_codec::amf0::Amf0Decoder;

fuzz_target!(|data: &[u8]| {
    let _ = Amf0Decoder::default().decode(data);
});
