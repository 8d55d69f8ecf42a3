#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use hwlink_transport::frame::{encode_chunks, REPORT_LEN};
use hwlink_transport::{codec, ChunkTransport, MemoryLink};

#[derive(Debug, Arbitrary)]
struct Input {
    reports: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let mut link = MemoryLink::new();
    link.queue_reads(input.reports.into_iter().map(|mut report| {
        // Mostly well-sized reports so reassembly gets exercised
        if report.len() > REPORT_LEN / 2 {
            report.resize(REPORT_LEN, 0);
        }
        report
    }));
    let mut transport = ChunkTransport::new(link);

    while transport.link().pending_reads() > 0 {
        let message = match transport.read() {
            Ok(message) => message,
            Err(_) => continue,
        };

        // Whatever was read must frame back to the same message
        let chunks = encode_chunks(&message, REPORT_LEN).unwrap();
        let mut echo = ChunkTransport::new(MemoryLink::new());
        echo.link_mut().queue_reads(chunks);
        assert_eq!(echo.read().unwrap(), message);

        // Decoding must never panic
        if let Ok(decoded) = codec::decode(&message) {
            assert_eq!(decoded.message_type().tag(), message.message_type);
        }
    }
});
