use qrcode::QrCode;

use std::io::Write;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let payload = std::env::args().next_back().unwrap();
    let parts = bcur::Encoder::with_capacity(20)
        .unwrap()
        .encode_bytes(payload.as_bytes())
        .unwrap();
    let mut stdout = std::io::stdout();
    for ur in parts.iter().cycle() {
        let code = QrCode::new(ur).unwrap();
        let string = code
            .render::<char>()
            .quiet_zone(false)
            .module_dimensions(2, 1)
            .build();
        stdout.write_all(format!("{string}\n").as_bytes()).unwrap();
        stdout
            .write_all(format!("{ur}\n\n\n\n").as_bytes())
            .unwrap();
        stdout.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1000));
    }
}
