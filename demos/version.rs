use ledger_iota_wallet::{LedgerIota, TransportType};

fn main() {
    let host = std::env::var("LEDGER_TCP_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let mut ledger = LedgerIota::new(&TransportType::TCP(host, 9999)).unwrap_or_else(|e| {
        eprintln!("failed to connect: {e}");
        std::process::exit(1);
    });

    match ledger.get_app_config() {
        Ok(config) => {
            println!("app version: {}", config.version);
            println!("flags: {:#04x}", config.flags.bits());
            match config.max_bundle_size {
                Some(size) => println!("max bundle size: {size}"),
                None => println!("max bundle size: not reported"),
            }
        }
        Err(e) => eprintln!("failed to read app config: {e}"),
    }
}
