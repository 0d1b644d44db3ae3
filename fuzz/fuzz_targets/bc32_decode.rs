use honggfuzz::fuzz;

use bcur::bc32::{decode_data, decode_segwit_address};

fn main() {
    loop {
        fuzz!(|data: &str| {
            decode_data(data).ok();
            decode_segwit_address("bc", data).ok();
        });
    }
}
