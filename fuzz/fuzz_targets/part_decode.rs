use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &str| {
            let mut decoder = bcur::Decoder::default();
            for part in data.split('\n') {
                decoder.receive_part(part);
            }
            if decoder.is_success() {
                assert!(decoder.error_message().is_none());
                assert!(decoder.message().is_some());
            }
        });
    }
}
