use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(payload) = bcur::envelope::unwrap(data) {
                assert!(!payload.is_empty());
                assert!(payload.len() < data.len());
            }
        });
    }
}
