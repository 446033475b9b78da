#![no_main]
use libfuzzer_sys::fuzz_target;

use amf_codec::amf3::Amf3Decoder;

fuzz_target!(|data: &[u8]| {
    let _ = Amf3Decoder::default().decode(data);
});
