use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if data.is_empty() {
                return;
            }
            let capacity = 1 + data[0] as usize;
            let encoder = bcur::Encoder::with_capacity(capacity).unwrap();
            let parts = encoder.encode_bytes(data).unwrap();
            let mut decoder = bcur::Decoder::default();
            for part in parts.iter().rev() {
                decoder.receive_part(part);
            }
            assert_eq!(decoder.message().unwrap(), data);
        });
    }
}
