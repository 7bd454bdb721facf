use ledger_iota_wallet::{AddressOptions, DerivationPath, LedgerIota, SecurityLevel, TransportType};

fn main() {
    let host = std::env::var("LEDGER_TCP_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let mut ledger = LedgerIota::new(&TransportType::TCP(host, 9999)).unwrap_or_else(|e| {
        eprintln!("failed to connect: {e}");
        std::process::exit(1);
    });

    let path = DerivationPath::iota(0, 0);
    if let Err(e) = ledger.activate(&path, SecurityLevel::Medium) {
        eprintln!("activation failed: {e}");
        std::process::exit(1);
    }

    let options = AddressOptions {
        display: true,
        ..Default::default()
    };
    match ledger.get_address(0, options) {
        Ok(address) => println!("{path}/0: {address}"),
        Err(e) if e.is_user_rejected() => eprintln!("rejected on device"),
        Err(e) => eprintln!("address failed: {e}"),
    }
}
