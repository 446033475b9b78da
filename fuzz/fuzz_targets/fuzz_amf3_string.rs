#![no_main]
use libfuzzer_sys::fuzz_target;

use amf_codec::amf3::Amf3Decoder;

fuzz_target!(|data: &[u8]| {
    let mut decoder = Amf3Decoder::default();
    let _ = decoder.fuzz_parse_string(data);
});
